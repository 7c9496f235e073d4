use crate::error::{DetectError, DetectResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Complete detector configuration.
///
/// Defaults reproduce the ARToolKit-derived reference detector; changing any
/// threshold breaks numeric parity with it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectorConfig {
    /// Minimum squared DoG response, before and after refinement
    pub laplacian_sqr_threshold: f64,
    /// Maximum squared spatial offset of the sub-pixel update
    pub max_subpixel_distance_sqr: f64,
    /// Principal curvature ratio for edge rejection
    pub edge_threshold: f64,
    /// Global cap on candidates surviving pruning
    pub max_feature_points: usize,
    /// Pruning grid size per dimension
    pub prune_buckets: usize,
    pub orientation_bins: usize,
    /// Window sigma as a multiple of the octave-local feature sigma
    pub orientation_gaussian_expansion: f64,
    /// Window radius as a multiple of the window sigma
    pub orientation_region_expansion: f64,
    pub orientation_smoothing_iterations: usize,
    /// Fraction of the histogram maximum a peak must exceed
    pub orientation_peak_threshold: f64,
    /// Threads for the global rayon pool (0 leaves the pool untouched)
    pub n_threads: usize,
    /// Run per-level extrema search and per-point orientation on rayon
    pub parallel: bool,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub version: Option<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            laplacian_sqr_threshold: 3.0 * 3.0,
            max_subpixel_distance_sqr: 3.0 * 3.0,
            edge_threshold: 4.0,
            max_feature_points: 500,
            prune_buckets: 10,
            orientation_bins: 36,
            orientation_gaussian_expansion: 3.0,
            orientation_region_expansion: 1.5,
            orientation_smoothing_iterations: 5,
            orientation_peak_threshold: 0.8,
            n_threads: 0,
            parallel: false,
            name: None,
            description: None,
            version: None,
        }
    }
}

impl DetectorConfig {
    /// Reference settings (the defaults)
    pub fn reference() -> Self {
        Self::default().with_metadata("Reference", "Numerically pinned to the reference tracker")
    }

    /// More features for large or feature-poor targets
    pub fn dense() -> Self {
        Self {
            laplacian_sqr_threshold: 2.0 * 2.0,
            max_feature_points: 1500,
            ..Self::default()
        }
        .with_metadata("Dense", "Lower response threshold, larger feature budget")
    }

    /// Fewer, stronger features for constrained devices
    pub fn sparse() -> Self {
        Self {
            laplacian_sqr_threshold: 4.0 * 4.0,
            max_feature_points: 200,
            ..Self::default()
        }
        .with_metadata("Sparse", "Higher response threshold, small feature budget")
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self.version = Some("1.0".to_string());
        self
    }

    /// `(T + 1)^2 / T` for the edge threshold `T`
    pub fn edge_hessian_threshold(&self) -> f64 {
        let t = self.edge_threshold;
        (t + 1.0) * (t + 1.0) / t
    }

    /// Even share of the feature cap per pruning bucket
    pub fn points_per_bucket(&self) -> usize {
        self.max_feature_points / (self.prune_buckets * self.prune_buckets)
    }

    /// Convert to DetectorBuilder for further customization
    pub fn to_builder(self) -> crate::builder::DetectorBuilder {
        crate::builder::DetectorBuilder::from_config(self)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "DetectorConfig{}: laplacian^2>={}, subpixel^2<={}, edge={}, max_points={}, buckets={}x{}, bins={}, smoothing={}, peak={}, parallel={}",
            self.name.as_deref().map(|n| format!(" [{}]", n)).unwrap_or_default(),
            self.laplacian_sqr_threshold,
            self.max_subpixel_distance_sqr,
            self.edge_threshold,
            self.max_feature_points,
            self.prune_buckets,
            self.prune_buckets,
            self.orientation_bins,
            self.orientation_smoothing_iterations,
            self.orientation_peak_threshold,
            self.parallel
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> DetectResult<()> {
        let positive = [
            ("laplacian_sqr_threshold", self.laplacian_sqr_threshold),
            ("max_subpixel_distance_sqr", self.max_subpixel_distance_sqr),
            ("edge_threshold", self.edge_threshold),
            ("orientation_gaussian_expansion", self.orientation_gaussian_expansion),
            ("orientation_region_expansion", self.orientation_region_expansion),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(DetectError::InvalidConfig(format!("{} must be positive, got {}", name, value)));
            }
        }
        if self.max_feature_points == 0 {
            return Err(DetectError::InvalidConfig("max_feature_points must be > 0".to_string()));
        }
        if self.prune_buckets == 0 {
            return Err(DetectError::InvalidConfig("prune_buckets must be > 0".to_string()));
        }
        if self.orientation_bins == 0 {
            return Err(DetectError::InvalidConfig("orientation_bins must be > 0".to_string()));
        }
        if !(self.orientation_peak_threshold > 0.0 && self.orientation_peak_threshold <= 1.0) {
            return Err(DetectError::InvalidConfig(format!(
                "orientation_peak_threshold must be in (0, 1], got {}",
                self.orientation_peak_threshold
            )));
        }
        Ok(())
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
