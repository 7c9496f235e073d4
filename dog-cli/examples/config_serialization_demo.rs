use dog_detect::{DetectorBuilder, DetectorConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("DoG Detector Configuration Serialization Demo");
    println!("=============================================\n");

    let dir = std::env::temp_dir().join("dogkp_config_demo");
    std::fs::create_dir_all(&dir)?;

    // Demo 1: presets and a customised configuration
    println!("Demo 1: Creating Configurations");
    let reference = DetectorConfig::reference();
    let dense = DetectorConfig::dense();
    let custom = DetectorBuilder::new()
        .preset_sparse()
        .max_feature_points(300)
        .orientation_peak_threshold(0.9)
        .parallel(true)
        .to_config()
        .with_metadata("Custom", "Sparse preset with a larger budget and fewer orientation peaks");

    for config in [&reference, &dense, &custom] {
        println!("   - {}", config.summary());
    }

    // Demo 2: JSON
    println!("\nDemo 2: JSON Serialization");
    let json = dense.to_json()?;
    println!("{}", json);
    dense.save_json(dir.join("dense.json"))?;

    // Demo 3: TOML
    println!("\nDemo 3: TOML Serialization");
    let toml = custom.to_toml()?;
    println!("{}", toml);
    custom.save_toml(dir.join("custom.toml"))?;

    // Demo 4: load, validate, compare
    println!("\nDemo 4: Loading and Validation");
    let loaded_dense = DetectorConfig::load_json(dir.join("dense.json"))?;
    let loaded_custom = DetectorConfig::load_toml(dir.join("custom.toml"))?;
    println!("   dense roundtrip equal:  {}", loaded_dense == dense);
    println!("   custom roundtrip equal: {}", loaded_custom == custom);

    // Demo 5: invalid documents are rejected on load
    println!("\nDemo 5: Validation Errors");
    match DetectorConfig::from_toml("prune_buckets = 0") {
        Ok(_) => println!("   unexpectedly accepted"),
        Err(e) => println!("   rejected: {}", e),
    }

    println!("\nFiles written to {}", dir.display());
    Ok(())
}
