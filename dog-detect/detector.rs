use dog_core::{init_thread_pool, FeaturePoint, Pyramid};
use rayon::prelude::*;
use tracing::{debug, info_span};

use crate::config::DetectorConfig;
use crate::error::{DetectError, DetectResult};
use crate::extrema::ExtremaDetector;
use crate::gradient::{compute_gradients, GradientField};
use crate::observer::{DetectionObserver, NoopObserver};
use crate::orientation::OrientationAssigner;
use crate::prune::prune_features;
use crate::resample::{BilinearResampler, Resampler};

/// Minimum DoG levels: one interior level with a neighbour on each side
pub const MIN_DOG_LEVELS: usize = 3;

/// DoG keypoint detector: extrema search, pruning, and orientation
/// assignment over a precomputed Gaussian/DoG pyramid pair.
#[derive(Debug, Clone)]
pub struct KeypointDetector<R: Resampler = BilinearResampler> {
    config: DetectorConfig,
    resampler: R,
    orientation: OrientationAssigner,
}

impl KeypointDetector<BilinearResampler> {
    /// Creates a detector with the bilinear resampler
    pub fn new(config: DetectorConfig) -> DetectResult<Self> {
        Self::with_resampler(config, BilinearResampler)
    }
}

impl<R: Resampler> KeypointDetector<R> {
    /// Creates a detector with validation
    pub fn with_resampler(config: DetectorConfig, resampler: R) -> DetectResult<Self> {
        config.validate()?;

        if config.n_threads > 0 {
            // The global pool can only be built once per process
            if let Err(err) = init_thread_pool(config.n_threads) {
                debug!(%err, "global thread pool already initialized");
            }
        }

        let orientation = OrientationAssigner::new(&config);
        Ok(Self {
            config,
            resampler,
            orientation,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn resampler(&self) -> &R {
        &self.resampler
    }

    /// Detect oriented feature points
    pub fn detect(&self, gaussian: &Pyramid, dog: &Pyramid) -> DetectResult<Vec<FeaturePoint>> {
        self.detect_with_observer(gaussian, dog, &mut NoopObserver)
    }

    /// Detect oriented feature points, reporting each stage to `observer`
    pub fn detect_with_observer<O: DetectionObserver + ?Sized>(
        &self,
        gaussian: &Pyramid,
        dog: &Pyramid,
        observer: &mut O,
    ) -> DetectResult<Vec<FeaturePoint>> {
        self.validate_pyramids(gaussian, dog)?;

        let span = info_span!("detect", levels = dog.len(), parallel = self.config.parallel);
        let _enter = span.enter();

        let extrema = ExtremaDetector::new(&self.config, &self.resampler, dog, gaussian.num_scales_per_octave);
        let (candidates, stats) = extrema.detect(self.config.parallel)?;
        debug!(
            extrema = stats.extrema,
            candidates = candidates.len(),
            rejected = stats.extrema - stats.accepted,
            "extrema refined"
        );
        observer.on_candidates(&candidates);

        let (base_width, base_height) = dog.base_dimensions().unwrap_or((0, 0));
        let pruned = prune_features(
            candidates,
            base_width,
            base_height,
            self.config.max_feature_points,
            self.config.prune_buckets,
        );
        observer.on_pruned(&pruned);

        let gradients = compute_gradients(gaussian, self.config.parallel);
        let oriented = self.orient(&pruned, &gradients, gaussian.num_scales_per_octave);
        debug!(pruned = pruned.len(), oriented = oriented.len(), "orientations assigned");
        observer.on_oriented(&oriented);

        Ok(oriented)
    }

    /// Orientation fan-out in candidate order, peaks in bin order
    fn orient(&self, points: &[FeaturePoint], gradients: &[GradientField], gaussian_scales: usize) -> Vec<FeaturePoint> {
        let assign = |fp: &FeaturePoint| {
            let field = &gradients[gaussian_index(fp, gaussian_scales)];
            self.orientation.assign(fp, field)
        };

        if self.config.parallel {
            let per_point: Vec<Vec<FeaturePoint>> = points.par_iter().map(assign).collect();
            per_point.concat()
        } else {
            points.iter().flat_map(assign).collect()
        }
    }

    /// Rejects pyramids that would break the scan loops
    pub fn validate_pyramids(&self, gaussian: &Pyramid, dog: &Pyramid) -> DetectResult<()> {
        if dog.len() < MIN_DOG_LEVELS {
            return Err(DetectError::TooFewLevels {
                levels: dog.len(),
                min: MIN_DOG_LEVELS,
            });
        }
        if gaussian.num_scales_per_octave < 2 {
            return Err(DetectError::InvalidScalesPerOctave(gaussian.num_scales_per_octave));
        }
        if dog.num_scales_per_octave < 1 {
            return Err(DetectError::InvalidScalesPerOctave(dog.num_scales_per_octave));
        }

        for pyramid in [gaussian, dog] {
            for (level, img) in pyramid.images.iter().enumerate() {
                if img.width == 0 || img.height == 0 {
                    return Err(DetectError::InvalidImageSize {
                        level,
                        width: img.width,
                        height: img.height,
                    });
                }
                if !img.is_consistent() {
                    return Err(DetectError::InvalidImageData {
                        level,
                        expected_len: img.width * img.height,
                        actual_len: img.data.len(),
                    });
                }
            }
        }

        // Every interior DoG level must have its Gaussian counterpart for orientation
        let required = (1..dog.len() - 1)
            .map(|k| dog.octave_of(k) * gaussian.num_scales_per_octave + dog.scale_of(k) + 1)
            .max()
            .unwrap_or(0);
        if gaussian.len() < required {
            return Err(DetectError::PyramidMismatch {
                gaussian_levels: gaussian.len(),
                required,
            });
        }

        Ok(())
    }
}

fn gaussian_index(fp: &FeaturePoint, gaussian_scales: usize) -> usize {
    fp.octave * gaussian_scales + fp.scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::StageCounts;
    use dog_core::Image;

    fn bump_level(width: usize, height: usize, cx: f64, cy: f64, amplitude: f64, sigma: f64) -> Image {
        Image::from_fn(width, height, |x, y| {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            (amplitude * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()) as f32
        })
    }

    /// One octave: 4 Gaussian levels sloping along (3, 1), 3 DoG levels with
    /// a bump in the middle one
    fn single_bump_pyramids() -> (Pyramid, Pyramid) {
        let (w, h) = (32, 32);
        let gaussian = Pyramid::new(
            (0..4)
                .map(|s| Image::from_fn(w, h, |x, y| (3 * x + y + 10 * s) as f32))
                .collect(),
            4,
        );
        let dog = Pyramid::new(
            vec![
                bump_level(w, h, 16.0, 16.0, 10.0, 1.5),
                bump_level(w, h, 16.0, 16.0, 40.0, 1.5),
                bump_level(w, h, 16.0, 16.0, 10.0, 1.5),
            ],
            3,
        );
        (gaussian, dog)
    }

    #[test]
    fn test_single_bump_end_to_end() {
        let (gaussian, dog) = single_bump_pyramids();
        let detector = KeypointDetector::new(DetectorConfig::default()).unwrap();
        let mut counts = StageCounts::default();
        let points = detector.detect_with_observer(&gaussian, &dog, &mut counts).unwrap();

        assert_eq!(counts.candidates, 1);
        assert_eq!(counts.pruned, 1);
        assert_eq!(points.len(), 1);

        let fp = points[0];
        assert_eq!((fp.octave, fp.scale), (0, 1));
        assert_eq!((fp.octave_x, fp.octave_y), (16, 16));
        assert!((fp.x - 16.0).abs() < 1e-9);
        assert!((fp.y - 16.0).abs() < 1e-9);
        assert!((fp.score - 40.0).abs() < 1e-3);

        // gradient (6, 2) everywhere in the window
        let expected = 2f64.atan2(6.0) + std::f64::consts::PI;
        assert!((fp.angle - expected).abs() < 2.0 * std::f64::consts::PI / 36.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (gaussian, dog) = single_bump_pyramids();
        let sequential = KeypointDetector::new(DetectorConfig::default()).unwrap();
        let parallel = KeypointDetector::new(DetectorConfig {
            parallel: true,
            ..DetectorConfig::default()
        })
        .unwrap();

        assert_eq!(
            sequential.detect(&gaussian, &dog).unwrap(),
            parallel.detect(&gaussian, &dog).unwrap()
        );
    }

    #[test]
    fn test_too_few_levels() {
        let (gaussian, mut dog) = single_bump_pyramids();
        dog.images.pop();
        let detector = KeypointDetector::new(DetectorConfig::default()).unwrap();
        assert_eq!(
            detector.detect(&gaussian, &dog).err(),
            Some(DetectError::TooFewLevels { levels: 2, min: 3 })
        );
    }

    #[test]
    fn test_gaussian_pyramid_too_short() {
        let (mut gaussian, dog) = single_bump_pyramids();
        gaussian.images.truncate(1);
        let detector = KeypointDetector::new(DetectorConfig::default()).unwrap();
        assert_eq!(
            detector.detect(&gaussian, &dog).err(),
            Some(DetectError::PyramidMismatch {
                gaussian_levels: 1,
                required: 2
            })
        );
    }

    #[test]
    fn test_malformed_level() {
        let (gaussian, mut dog) = single_bump_pyramids();
        dog.images[1].data.pop();
        let detector = KeypointDetector::new(DetectorConfig::default()).unwrap();
        assert_eq!(
            detector.detect(&gaussian, &dog).err(),
            Some(DetectError::InvalidImageData {
                level: 1,
                expected_len: 1024,
                actual_len: 1023
            })
        );

        dog.images[1] = Image::new(0, 32, Vec::new());
        assert!(matches!(
            detector.detect(&gaussian, &dog),
            Err(DetectError::InvalidImageSize { level: 1, width: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_scales_per_octave() {
        let (mut gaussian, dog) = single_bump_pyramids();
        gaussian.num_scales_per_octave = 1;
        let detector = KeypointDetector::new(DetectorConfig::default()).unwrap();
        assert_eq!(
            detector.detect(&gaussian, &dog).err(),
            Some(DetectError::InvalidScalesPerOctave(1))
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DetectorConfig {
            prune_buckets: 0,
            ..DetectorConfig::default()
        };
        assert!(matches!(KeypointDetector::new(config), Err(DetectError::InvalidConfig(_))));
    }

    #[test]
    fn test_thread_pool_already_built_is_not_an_error() {
        let config = DetectorConfig {
            parallel: true,
            n_threads: 2,
            ..DetectorConfig::default()
        };
        let first = KeypointDetector::new(config.clone()).unwrap();
        let second = KeypointDetector::new(DetectorConfig { n_threads: 3, ..config }).unwrap();

        let (gaussian, dog) = single_bump_pyramids();
        assert_eq!(first.detect(&gaussian, &dog).unwrap(), second.detect(&gaussian, &dog).unwrap());
    }
}
