use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use dog_cli::{FeaturePipeline, PyramidPair, features_to_json, save_overlay};
use dog_detect::{DetectorBuilder, DetectorConfig, ReferenceTrace};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dogkp")]
#[command(about = "Detect oriented DoG keypoints in a precomputed scale-space pyramid")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run detection on a serialized Gaussian/DoG pyramid pair
    #[command(name = "detect")]
    Detect(DetectArgs),
    /// Print a configuration preset as TOML
    #[command(name = "config")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct DetectArgs {
    /// JSON document `{ "gaussian": Pyramid, "dog": Pyramid }`
    #[arg(long, required = true)]
    input: PathBuf,
    /// Feature list output; printed to stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
    /// PNG overlay of features on the base Gaussian level
    #[arg(long)]
    overlay: Option<PathBuf>,
    /// Detector configuration (.toml or .json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Recorded reference trace (JSON) to compare against
    #[arg(long)]
    trace: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    parallel: bool,
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// reference, dense or sparse
    #[arg(long, default_value = "reference")]
    preset: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Detect(args) => run_detect(args),
        Command::Config(args) => run_config(args),
    }
}

fn run_detect(args: DetectArgs) -> Result<()> {
    let mut builder = DetectorBuilder::from_config(load_config(args.config.as_deref())?);
    if args.parallel {
        builder = builder.parallel(true);
    }
    match args.threads {
        Some(threads) => builder = builder.threads(threads),
        None if args.parallel => builder = builder.threads(dog_core::default_threads()),
        None => {}
    }
    let config = builder.to_config();
    info!("{}", config.summary());

    let pipeline = FeaturePipeline::new(config).context("building detector")?;
    let pyramids = PyramidPair::load(&args.input)
        .with_context(|| format!("loading pyramids from {}", args.input.display()))?;

    let t0 = Instant::now();
    let report = match &args.trace {
        Some(path) => {
            let mut trace = load_trace(path)?;
            let report = pipeline.detect_with_trace(&pyramids, &mut trace)?;
            info!(mismatches = trace.mismatches().len(), "trace comparison finished");
            report
        }
        None => pipeline.detect(&pyramids)?,
    };
    info!(elapsed = ?t0.elapsed(), features = report.features.len(), "detected features");

    let json = features_to_json(&report.features).context("serializing features")?;
    match &args.output {
        Some(path) => fs::write(path, json).with_context(|| format!("writing features {}", path.display()))?,
        None => println!("{json}"),
    }

    if let Some(path) = &args.overlay {
        let base = pyramids
            .base_image()
            .ok_or_else(|| anyhow!("Gaussian pyramid has no levels to draw on"))?;
        save_overlay(path, base, &report.features)
            .with_context(|| format!("saving overlay {}", path.display()))?;
        info!("Saved overlay as {}", path.display());
    }

    Ok(())
}

fn run_config(args: ConfigArgs) -> Result<()> {
    let config = match args.preset.as_str() {
        "reference" => DetectorConfig::reference(),
        "dense" => DetectorConfig::dense(),
        "sparse" => DetectorConfig::sparse(),
        other => bail!("unknown preset '{}' (expected reference, dense or sparse)", other),
    };
    let toml = config.to_toml().context("serializing configuration")?;
    println!("{toml}");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DetectorConfig> {
    let Some(path) = path else {
        return Ok(DetectorConfig::default());
    };
    if !path.exists() {
        bail!("config file does not exist: {}", path.display());
    }

    let loaded = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => DetectorConfig::load_json(path),
        _ => DetectorConfig::load_toml(path),
    };
    loaded.map_err(|e| anyhow!("loading config {}: {}", path.display(), e))
}

fn load_trace(path: &Path) -> Result<ReferenceTrace> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing trace json {}", path.display()))
}
