use crate::config::DetectorConfig;
use crate::detector::KeypointDetector;
use crate::error::DetectResult;
use crate::resample::{BilinearResampler, Resampler};

/// Builder for creating a `KeypointDetector`
#[derive(Debug, Clone, Default)]
pub struct DetectorBuilder {
    config: DetectorConfig,
}

impl DetectorBuilder {
    /// Create a new builder with the reference settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum squared DoG response
    pub fn laplacian_threshold_sqr(mut self, threshold: f64) -> Self {
        self.config.laplacian_sqr_threshold = threshold;
        self
    }

    /// Set the Laplacian threshold from the unsquared response
    pub fn laplacian_threshold(self, threshold: f64) -> Self {
        self.laplacian_threshold_sqr(threshold * threshold)
    }

    /// Maximum squared spatial drift of the sub-pixel update
    pub fn max_subpixel_distance_sqr(mut self, distance_sqr: f64) -> Self {
        self.config.max_subpixel_distance_sqr = distance_sqr;
        self
    }

    /// Principal curvature ratio for edge rejection
    pub fn edge_threshold(mut self, threshold: f64) -> Self {
        self.config.edge_threshold = threshold;
        self
    }

    /// Global cap on candidates after pruning
    pub fn max_feature_points(mut self, max_points: usize) -> Self {
        self.config.max_feature_points = max_points;
        self
    }

    /// Pruning grid size per dimension
    pub fn prune_buckets(mut self, buckets: usize) -> Self {
        self.config.prune_buckets = buckets;
        self
    }

    pub fn orientation_bins(mut self, bins: usize) -> Self {
        self.config.orientation_bins = bins;
        self
    }

    pub fn orientation_gaussian_expansion(mut self, expansion: f64) -> Self {
        self.config.orientation_gaussian_expansion = expansion;
        self
    }

    pub fn orientation_region_expansion(mut self, expansion: f64) -> Self {
        self.config.orientation_region_expansion = expansion;
        self
    }

    pub fn orientation_smoothing_iterations(mut self, iterations: usize) -> Self {
        self.config.orientation_smoothing_iterations = iterations;
        self
    }

    pub fn orientation_peak_threshold(mut self, ratio: f64) -> Self {
        self.config.orientation_peak_threshold = ratio;
        self
    }

    /// Set the number of threads for the global rayon pool
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    /// Enable or disable per-level and per-candidate parallelism
    pub fn parallel(mut self, enable: bool) -> Self {
        self.config.parallel = enable;
        self
    }

    /// Apply the reference preset
    pub fn preset_reference(mut self) -> Self {
        self.config = self.keep_runtime(DetectorConfig::reference());
        self
    }

    /// Apply the dense preset
    pub fn preset_dense(mut self) -> Self {
        self.config = self.keep_runtime(DetectorConfig::dense());
        self
    }

    /// Apply the sparse preset
    pub fn preset_sparse(mut self) -> Self {
        self.config = self.keep_runtime(DetectorConfig::sparse());
        self
    }

    // Presets carry no threading preference
    fn keep_runtime(&self, preset: DetectorConfig) -> DetectorConfig {
        DetectorConfig {
            n_threads: self.config.n_threads,
            parallel: self.config.parallel,
            ..preset
        }
    }

    /// Build the `KeypointDetector` with the bilinear resampler
    pub fn build(self) -> DetectResult<KeypointDetector<BilinearResampler>> {
        KeypointDetector::new(self.config)
    }

    /// Build the `KeypointDetector` around a caller-supplied resampler
    pub fn build_with_resampler<R: Resampler>(self, resampler: R) -> DetectResult<KeypointDetector<R>> {
        KeypointDetector::with_resampler(self.config, resampler)
    }

    /// Generate a summary of the builder's configuration
    pub fn summary(&self) -> String {
        self.config.summary()
    }

    /// Create a builder from an existing `DetectorConfig`
    pub fn from_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Convert the builder into a `DetectorConfig`
    pub fn to_config(self) -> DetectorConfig {
        self.config
    }
}
