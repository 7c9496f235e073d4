use std::path::Path;

use dog_core::{FeaturePoint, Image, Pyramid};
use dog_detect::{DetectError, DetectionObserver, DetectorConfig, KeypointDetector, ReferenceTrace, StageCounts};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use dog_core;
pub use dog_detect::{self, DetectorConfig as Config};

const FEATURE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const TICK_COLOR: Rgba<u8> = Rgba([255, 255, 0, 255]);

#[derive(Debug)]
pub enum CliError {
    Detect(DetectError),
    Io(std::io::Error),
    Json(serde_json::Error),
    Image(image::ImageError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Detect(e) => write!(f, "Detection error: {}", e),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::Json(e) => write!(f, "JSON error: {}", e),
            CliError::Image(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<DetectError> for CliError {
    fn from(err: DetectError) -> Self {
        CliError::Detect(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Json(err)
    }
}

impl From<image::ImageError> for CliError {
    fn from(err: image::ImageError) -> Self {
        CliError::Image(err)
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// Gaussian pyramid and its DoG pyramid, as produced by the pyramid builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PyramidPair {
    pub gaussian: Pyramid,
    pub dog: Pyramid,
}

impl PyramidPair {
    pub fn from_json(json: &str) -> CliResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Full-resolution Gaussian level, used as the overlay background
    pub fn base_image(&self) -> Option<&Image> {
        self.gaussian.images.first()
    }
}

/// Result of one detection run
#[derive(Debug, Clone)]
pub struct DetectionReport {
    pub features: Vec<FeaturePoint>,
    pub counts: StageCounts,
}

/// High-level detector over serialized pyramid pairs
pub struct FeaturePipeline {
    detector: KeypointDetector,
}

impl FeaturePipeline {
    /// Create a pipeline with the given configuration
    pub fn new(config: DetectorConfig) -> CliResult<Self> {
        Ok(Self {
            detector: KeypointDetector::new(config)?,
        })
    }

    /// Detect features, recording stage sizes
    pub fn detect(&self, pyramids: &PyramidPair) -> CliResult<DetectionReport> {
        let mut counts = StageCounts::default();
        let features = self
            .detector
            .detect_with_observer(&pyramids.gaussian, &pyramids.dog, &mut counts)?;
        info!(
            candidates = counts.candidates,
            pruned = counts.pruned,
            oriented = counts.oriented,
            "detection finished"
        );
        Ok(DetectionReport { features, counts })
    }

    /// Detect features and compare every stage against a recorded trace
    pub fn detect_with_trace(&self, pyramids: &PyramidPair, trace: &mut ReferenceTrace) -> CliResult<DetectionReport> {
        let mut counts = StageCounts::default();
        let mut observers = Fanout(&mut counts, &mut *trace);
        let features = self
            .detector
            .detect_with_observer(&pyramids.gaussian, &pyramids.dog, &mut observers)?;
        if !trace.is_clean() {
            warn!(mismatches = trace.mismatches().len(), "output diverges from reference trace");
        }
        Ok(DetectionReport { features, counts })
    }

    /// Parse a `{ "gaussian": .., "dog": .. }` document and detect features
    pub fn detect_from_json(&self, json: &str) -> CliResult<DetectionReport> {
        let pyramids = PyramidPair::from_json(json)?;
        self.detect(&pyramids)
    }

    pub fn config(&self) -> &DetectorConfig {
        self.detector.config()
    }
}

/// Forwards every stage to two observers
struct Fanout<'a, A: DetectionObserver, B: DetectionObserver>(&'a mut A, &'a mut B);

impl<A: DetectionObserver, B: DetectionObserver> DetectionObserver for Fanout<'_, A, B> {
    fn on_candidates(&mut self, points: &[FeaturePoint]) {
        self.0.on_candidates(points);
        self.1.on_candidates(points);
    }

    fn on_pruned(&mut self, points: &[FeaturePoint]) {
        self.0.on_pruned(points);
        self.1.on_pruned(points);
    }

    fn on_oriented(&mut self, points: &[FeaturePoint]) {
        self.0.on_oriented(points);
        self.1.on_oriented(points);
    }
}

pub fn features_to_json(features: &[FeaturePoint]) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(features)?)
}

/// Base image stretched to 8 bits, with a circle of radius `max(2, sigma)`
/// and an orientation tick per feature
pub fn render_overlay(base: &Image, features: &[FeaturePoint]) -> RgbaImage {
    let (lo, hi) = base
        .data
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = if hi > lo { hi - lo } else { 1.0 };

    let mut output = RgbaImage::from_fn(base.width as u32, base.height as u32, |x, y| {
        let v = base.get(x as usize, y as usize);
        let g = (((v - lo) / range) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgba([g, g, g, 255])
    });

    for fp in features {
        let radius = fp.sigma.max(2.0);
        let center = (fp.x.round() as i32, fp.y.round() as i32);
        draw_hollow_circle_mut(&mut output, center, radius.round() as i32, FEATURE_COLOR);

        let tip = (fp.x + radius * fp.angle.cos(), fp.y + radius * fp.angle.sin());
        draw_line_segment_mut(
            &mut output,
            (fp.x as f32, fp.y as f32),
            (tip.0 as f32, tip.1 as f32),
            TICK_COLOR,
        );
    }

    output
}

pub fn save_overlay<P: AsRef<Path>>(path: P, base: &Image, features: &[FeaturePoint]) -> CliResult<()> {
    render_overlay(base, features).save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bump(width: usize, height: usize, amplitude: f64) -> Image {
        Image::from_fn(width, height, |x, y| {
            let dx = x as f64 - 12.0;
            let dy = y as f64 - 12.0;
            (amplitude * (-(dx * dx + dy * dy) / 4.5).exp()) as f32
        })
    }

    fn sample_pair() -> PyramidPair {
        PyramidPair {
            gaussian: Pyramid::new(
                (0..4)
                    .map(|s| Image::from_fn(24, 24, |x, y| (3 * x + y + s) as f32))
                    .collect(),
                4,
            ),
            dog: Pyramid::new(vec![bump(24, 24, 10.0), bump(24, 24, 40.0), bump(24, 24, 10.0)], 3),
        }
    }

    #[test]
    fn test_detect_from_json() {
        let json = serde_json::to_string(&sample_pair()).unwrap();
        let pipeline = FeaturePipeline::new(DetectorConfig::default()).unwrap();
        let report = pipeline.detect_from_json(&json).unwrap();

        assert_eq!(report.counts.candidates, 1);
        assert_eq!(report.features.len(), report.counts.oriented);
        assert!(!report.features.is_empty());
    }

    #[test]
    fn test_detect_from_bad_json() {
        let pipeline = FeaturePipeline::new(DetectorConfig::default()).unwrap();
        assert!(matches!(pipeline.detect_from_json("{\"dog\": []}"), Err(CliError::Json(_))));
    }

    #[test]
    fn test_malformed_pyramid_is_detect_error() {
        let mut pair = sample_pair();
        pair.dog.images.truncate(2);
        let pipeline = FeaturePipeline::new(DetectorConfig::default()).unwrap();
        assert!(matches!(
            pipeline.detect(&pair),
            Err(CliError::Detect(DetectError::TooFewLevels { .. }))
        ));
    }

    #[test]
    fn test_trace_replay() {
        let pair = sample_pair();
        let pipeline = FeaturePipeline::new(DetectorConfig::default()).unwrap();
        let first = pipeline.detect(&pair).unwrap();

        let mut trace = ReferenceTrace::new(Vec::new(), first.features.clone());
        let second = pipeline.detect_with_trace(&pair, &mut trace).unwrap();
        assert!(trace.is_clean());
        assert_eq!(first.features, second.features);
        assert_eq!(second.counts.oriented, first.features.len());
    }

    #[test]
    fn test_features_to_json() {
        let fp = FeaturePoint {
            octave: 1,
            scale: 2,
            octave_x: 4,
            octave_y: 5,
            x: 8.5,
            y: 10.5,
            sigma: 3.2,
            score: -12.0,
            angle: 1.0,
        };
        let json = features_to_json(&[fp]).unwrap();
        let restored: Vec<FeaturePoint> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, vec![fp]);
    }

    #[test]
    fn test_render_overlay_marks_feature() {
        let base = Image::filled(32, 32, 7.0);
        let fp = FeaturePoint {
            octave: 0,
            scale: 1,
            octave_x: 16,
            octave_y: 16,
            x: 16.0,
            y: 16.0,
            sigma: 4.0,
            score: 10.0,
            angle: 0.0,
        };
        let overlay = render_overlay(&base, &[fp]);
        assert_eq!(overlay.dimensions(), (32, 32));
        assert_eq!(*overlay.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*overlay.get_pixel(16, 12), FEATURE_COLOR);
        assert_eq!(*overlay.get_pixel(18, 16), TICK_COLOR);
    }
}
