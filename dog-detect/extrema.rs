use std::borrow::Cow;

use dog_core::{FeaturePoint, Image, Pyramid};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::config::DetectorConfig;
use crate::error::{DetectError, DetectResult};
use crate::refinement::{LevelStack, Refiner};
use crate::resample::Resampler;
use crate::types::{ScanBounds, ScanStats};

/// A DoG level with its two scale neighbours resampled to its resolution
#[derive(Debug, Clone)]
pub struct AlignedLevel<'a> {
    pub level: usize,
    pub octave: usize,
    pub scale: usize,
    pub below: Cow<'a, Image>,
    pub current: &'a Image,
    pub above: Cow<'a, Image>,
    pub bounds: ScanBounds,
}

impl AlignedLevel<'_> {
    pub fn stack(&self) -> LevelStack<'_> {
        LevelStack {
            below: &self.below.data,
            current: &self.current.data,
            above: &self.above.data,
            width: self.current.width,
        }
    }
}

/// Scale-space extrema search over every interior DoG level
pub struct ExtremaDetector<'a, R: Resampler> {
    dog: &'a Pyramid,
    resampler: &'a R,
    refiner: Refiner,
    laplacian_sqr_threshold: f64,
}

impl<'a, R: Resampler> ExtremaDetector<'a, R> {
    pub fn new(config: &DetectorConfig, resampler: &'a R, dog: &'a Pyramid, gaussian_scales_per_octave: usize) -> Self {
        let (base_width, base_height) = dog.base_dimensions().unwrap_or((0, 0));
        Self {
            dog,
            resampler,
            refiner: Refiner::new(
                config,
                base_width,
                base_height,
                gaussian_scales_per_octave,
                dog.num_scales_per_octave,
            ),
            laplacian_sqr_threshold: config.laplacian_sqr_threshold,
        }
    }

    /// Interior levels that have a neighbour on both sides
    pub fn interior_levels(&self) -> std::ops::Range<usize> {
        1..self.dog.len().saturating_sub(1)
    }

    /// Bring levels `k-1` and `k+1` to the resolution of level `k`.
    ///
    /// At an octave boundary the finer neighbour is downsampled and the
    /// coarser one upsampled (padded by one row/column when level `k` has an
    /// odd dimension).
    pub fn align_level(&self, k: usize) -> DetectResult<AlignedLevel<'a>> {
        let images = &self.dog.images;
        let current = &images[k];

        let mut below = Cow::Borrowed(&images[k - 1]);
        if below.width / 2 == current.width {
            below = Cow::Owned(self.resampler.downsample(&below));
        }

        let mut above = Cow::Borrowed(&images[k + 1]);
        let mut upsampled = false;
        let mut pad_one_width = false;
        let mut pad_one_height = false;
        if current.width / 2 == above.width {
            upsampled = true;
            pad_one_width = current.width % 2 == 1;
            pad_one_height = current.height % 2 == 1;
            above = Cow::Owned(self.resampler.upsample(&above, pad_one_width, pad_one_height));
        }

        for (level, img) in [(k - 1, &below), (k + 1, &above)] {
            if img.width != current.width || img.height != current.height {
                return Err(DetectError::LevelSizeMismatch {
                    level,
                    expected: (current.width, current.height),
                    actual: (img.width, img.height),
                });
            }
        }

        Ok(AlignedLevel {
            level: k,
            octave: self.dog.octave_of(k),
            scale: self.dog.scale_of(k),
            below,
            current,
            above,
            bounds: ScanBounds::new(current.width, current.height, upsampled, pad_one_width, pad_one_height),
        })
    }

    /// Refined feature points of level `k` in row-major scan order
    pub fn detect_level(&self, k: usize) -> DetectResult<(Vec<FeaturePoint>, ScanStats)> {
        let aligned = self.align_level(k)?;
        if aligned.bounds.is_empty() {
            debug!(level = k, width = aligned.current.width, height = aligned.current.height, "level too small to scan");
            return Ok((Vec::new(), ScanStats::default()));
        }
        let stack = aligned.stack();
        let width = stack.width as isize;
        let neighbours: [isize; 9] = [0, -1, 1, -width, -width - 1, -width + 1, width, width - 1, width + 1];

        let mut points = Vec::new();
        let mut stats = ScanStats::default();
        let b = aligned.bounds;

        for j in b.start_y..b.end_y {
            for i in b.start_x..b.end_x {
                let pos = j * stack.width + i;
                let v = stack.current[pos];
                let v64 = v as f64;
                if v64 * v64 < self.laplacian_sqr_threshold {
                    continue;
                }

                if !is_extremum(&stack, pos, v, &neighbours) {
                    continue;
                }
                stats.extrema += 1;

                match self.refiner.refine(&stack, i, j, aligned.octave, aligned.scale) {
                    Ok(fp) => {
                        stats.accepted += 1;
                        points.push(fp);
                    }
                    Err(reason) => {
                        trace!(level = k, i, j, ?reason, "extremum rejected");
                        stats.record(reason);
                    }
                }
            }
        }

        debug!(
            level = k,
            octave = aligned.octave,
            scale = aligned.scale,
            extrema = stats.extrema,
            accepted = stats.accepted,
            singular = stats.singular,
            unstable = stats.unstable,
            edge = stats.edge,
            low_contrast = stats.low_contrast,
            out_of_bounds = stats.out_of_bounds,
            "scanned DoG level"
        );

        Ok((points, stats))
    }

    /// Candidates from every interior level, level-major then row-major
    pub fn detect(&self, parallel: bool) -> DetectResult<(Vec<FeaturePoint>, ScanStats)> {
        let per_level: Vec<(Vec<FeaturePoint>, ScanStats)> = if parallel {
            self.interior_levels()
                .into_par_iter()
                .map(|k| self.detect_level(k))
                .collect::<DetectResult<_>>()?
        } else {
            self.interior_levels()
                .map(|k| self.detect_level(k))
                .collect::<DetectResult<_>>()?
        };

        let mut total = ScanStats::default();
        let mut points = Vec::new();
        for (level_points, stats) in per_level {
            total.merge(&stats);
            points.extend(level_points);
        }
        Ok((points, total))
    }
}

/// Strict maximum or minimum over the 26-neighbourhood spanning three levels
fn is_extremum(stack: &LevelStack<'_>, pos: usize, v: f32, neighbours: &[isize; 9]) -> bool {
    let at = |img: &[f32], d: isize| img[(pos as isize + d) as usize];

    let mut is_max = true;
    for (n, &d) in neighbours.iter().enumerate() {
        if v <= at(stack.below, d) || v <= at(stack.above, d) || (n != 0 && v <= at(stack.current, d)) {
            is_max = false;
            break;
        }
    }
    if is_max {
        return true;
    }

    for (n, &d) in neighbours.iter().enumerate() {
        if v >= at(stack.below, d) || v >= at(stack.above, d) || (n != 0 && v >= at(stack.current, d)) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resample::BilinearResampler;

    fn bump(width: usize, height: usize, cx: f32, cy: f32, amp: f32, sigma: f32) -> Image {
        Image::from_fn(width, height, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            amp * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
        })
    }

    fn single_octave(levels: Vec<Image>) -> Pyramid {
        let n = levels.len();
        Pyramid::new(levels, n)
    }

    #[test]
    fn test_single_bump_found() {
        let dog = single_octave(vec![
            bump(32, 32, 16.0, 16.0, 10.0, 2.0),
            bump(32, 32, 16.0, 16.0, 20.0, 2.0),
            bump(32, 32, 16.0, 16.0, 10.0, 2.0),
        ]);
        let detector = ExtremaDetector::new(&DetectorConfig::default(), &BilinearResampler, &dog, 4);
        let (points, stats) = detector.detect(false).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(stats.accepted, 1);
        assert!((points[0].x - 16.0).abs() < 0.5);
        assert!((points[0].y - 16.0).abs() < 0.5);
        assert!(points[0].is_maximum());
    }

    #[test]
    fn test_below_threshold_ignored() {
        let dog = single_octave(vec![
            bump(16, 16, 8.0, 8.0, 1.0, 2.0),
            bump(16, 16, 8.0, 8.0, 2.9, 2.0),
            bump(16, 16, 8.0, 8.0, 1.0, 2.0),
        ]);
        let detector = ExtremaDetector::new(&DetectorConfig::default(), &BilinearResampler, &dog, 4);
        let (points, stats) = detector.detect(false).unwrap();
        assert!(points.is_empty());
        assert_eq!(stats.extrema, 0);
    }

    #[test]
    fn test_plateau_is_not_extremum() {
        let flat = Image::filled(8, 8, 50.0);
        let dog = single_octave(vec![flat.clone(), flat.clone(), flat]);
        let detector = ExtremaDetector::new(&DetectorConfig::default(), &BilinearResampler, &dog, 4);
        let (points, stats) = detector.detect(false).unwrap();
        assert!(points.is_empty());
        assert_eq!(stats.extrema, 0);
    }

    #[test]
    fn test_octave_boundary_alignment() {
        // levels: 2 per octave -> k = 1 (octave 0) sits above a coarser k = 2
        let dog = Pyramid::new(
            vec![
                Image::filled(21, 20, 0.0),
                Image::filled(21, 20, 0.0),
                Image::filled(10, 10, 0.0),
                Image::filled(10, 10, 0.0),
            ],
            2,
        );
        let detector = ExtremaDetector::new(&DetectorConfig::default(), &BilinearResampler, &dog, 3);

        let lower = detector.align_level(1).unwrap();
        assert_eq!((lower.above.width, lower.above.height), (21, 20));
        assert!(matches!(lower.above, Cow::Owned(_)));
        assert!(matches!(lower.below, Cow::Borrowed(_)));
        assert_eq!((lower.bounds.start_x, lower.bounds.end_x), (2, 17));
        assert_eq!((lower.bounds.start_y, lower.bounds.end_y), (2, 17));

        let upper = detector.align_level(2).unwrap();
        assert_eq!((upper.below.width, upper.below.height), (10, 10));
        assert!(matches!(upper.below, Cow::Owned(_)));
        assert_eq!((upper.bounds.start_x, upper.bounds.end_x), (1, 9));
    }

    #[test]
    fn test_misaligned_levels_rejected() {
        let dog = single_octave(vec![
            Image::filled(12, 12, 0.0),
            Image::filled(12, 11, 0.0),
            Image::filled(12, 11, 0.0),
        ]);
        let detector = ExtremaDetector::new(&DetectorConfig::default(), &BilinearResampler, &dog, 4);
        assert!(matches!(
            detector.detect_level(1),
            Err(DetectError::LevelSizeMismatch { level: 0, .. })
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut levels = Vec::new();
        for s in 0..5 {
            levels.push(Image::from_fn(40, 40, |x, y| {
                let a = bump(40, 40, 12.0, 14.0, 15.0 + s as f32, 1.5).get(x, y);
                let b = bump(40, 40, 28.0, 25.0, -18.0 + s as f32, 1.8).get(x, y);
                a + b
            }));
        }
        let dog = single_octave(levels);
        let detector = ExtremaDetector::new(&DetectorConfig::default(), &BilinearResampler, &dog, 6);
        assert_eq!(detector.detect(true).unwrap(), detector.detect(false).unwrap());
    }
}
