use std::time::Instant;

use dog_cli::{FeaturePipeline, PyramidPair, features_to_json, save_overlay};
use dog_core::synthetic::{Blob, blob_pyramids};
use dog_detect::DetectorBuilder;

const GAUSSIAN_SCALES: usize = 4;

/// Twelve blobs of mixed size and polarity over a flat background
fn blob_pair(width: usize, height: usize, octaves: usize) -> PyramidPair {
    let blobs: Vec<Blob> = (0..12)
        .map(|i| Blob {
            x: 30.0 + (i % 4) as f64 * 60.0 + 0.3,
            y: 30.0 + (i / 4) as f64 * 60.0 + 0.2,
            sigma: 2.0 + (i % 3) as f64,
            amplitude: if i % 2 == 0 { 180.0 } else { -180.0 },
        })
        .collect();
    let (gaussian, dog) = blob_pyramids(width, height, &blobs, octaves, GAUSSIAN_SCALES);
    PyramidPair { gaussian, dog }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let pyramids = blob_pair(240, 180, 3);
    let dir = std::env::temp_dir().join("dogkp_blobs_demo");
    std::fs::create_dir_all(&dir)?;

    let input = dir.join("pyramids.json");
    std::fs::write(&input, serde_json::to_string(&pyramids)?)?;
    println!("Wrote synthetic pyramid pair to {}", input.display());

    for (name, builder) in [
        ("reference", DetectorBuilder::new().preset_reference()),
        ("dense", DetectorBuilder::new().preset_dense()),
        ("sparse-parallel", DetectorBuilder::new().preset_sparse().parallel(true)),
    ] {
        let pipeline = FeaturePipeline::new(builder.to_config())?;
        let loaded = PyramidPair::load(&input)?;

        let t0 = Instant::now();
        let report = pipeline.detect(&loaded)?;
        println!(
            "{:>16}: {} candidates -> {} pruned -> {} oriented in {:.2?}",
            name,
            report.counts.candidates,
            report.counts.pruned,
            report.counts.oriented,
            t0.elapsed()
        );

        std::fs::write(dir.join(format!("{}_features.json", name)), features_to_json(&report.features)?)?;
        if let Some(base) = loaded.base_image() {
            save_overlay(dir.join(format!("{}_overlay.png", name)), base, &report.features)?;
        }
    }

    println!("Results saved in {}", dir.display());
    Ok(())
}
