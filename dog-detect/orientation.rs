use std::f64::consts::PI;

use dog_core::FeaturePoint;

use crate::config::DetectorConfig;
use crate::gradient::GradientField;
use crate::math::{fast_exp6, quadratic_3_points};

const ONE_OVER_2PI: f64 = 0.159154943091895;

/// 3-tap Gaussian (sigma = 1) applied circularly to the histogram
const SMOOTHING_KERNEL: [f64; 3] = [0.274068619061197, 0.451862761877606, 0.274068619061197];

/// Dominant gradient orientations around feature points
#[derive(Debug, Clone, Copy)]
pub struct OrientationAssigner {
    num_bins: usize,
    gaussian_expansion: f64,
    region_expansion: f64,
    smoothing_iterations: usize,
    peak_threshold: f64,
}

impl OrientationAssigner {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            num_bins: config.orientation_bins,
            gaussian_expansion: config.orientation_gaussian_expansion,
            region_expansion: config.orientation_region_expansion,
            smoothing_iterations: config.orientation_smoothing_iterations,
            peak_threshold: config.orientation_peak_threshold,
        }
    }

    /// Gaussian and magnitude weighted angle histogram over a disc centred on
    /// `(x, y)` in octave-local pixels.
    pub fn histogram(&self, x: i32, y: i32, octave_sigma: f64, field: &GradientField) -> Vec<f64> {
        let bins = self.num_bins;
        let mut histogram = vec![0.0; bins];
        if field.width == 0 || field.height == 0 {
            return histogram;
        }

        let gw_sigma = (self.gaussian_expansion * octave_sigma).max(1.0);
        let gw_scale = -1.0 / (2.0 * gw_sigma * gw_sigma);

        let radius = self.region_expansion * gw_sigma;
        let radius2 = (radius * radius - 0.5).ceil() as i64;
        let half = (radius + 0.5).floor() as i64;

        let (x, y) = (x as i64, y as i64);
        let x0 = (x - half).max(0);
        let x1 = (x + half).min(field.width as i64 - 1);
        let y0 = (y - half).max(0);
        let y1 = (y + half).min(field.height as i64 - 1);

        for yp in y0..=y1 {
            let dy = yp - y;
            let dy2 = dy * dy;

            for xp in x0..=x1 {
                let dx = xp - x;
                let r2 = dx * dx + dy2;
                if r2 > radius2 {
                    continue;
                }

                let g = field.get(xp as usize, yp as usize);
                let w = fast_exp6(r2 as f64 * gw_scale);

                let fbin = bins as f64 * g.angle * ONE_OVER_2PI;
                let bin = (fbin - 0.5).floor();
                let w2 = fbin - bin - 0.5;
                let w1 = 1.0 - w2;
                let b1 = (bin as i64).rem_euclid(bins as i64) as usize;
                let b2 = (bin as i64 + 1).rem_euclid(bins as i64) as usize;
                let magnitude = w * g.mag;

                histogram[b1] += w1 * magnitude;
                histogram[b2] += w2 * magnitude;
            }
        }

        histogram
    }

    /// Repeated circular 3-tap smoothing
    pub fn smooth(&self, histogram: &mut [f64]) {
        let n = histogram.len();
        if n == 0 {
            return;
        }
        let mut old = vec![0.0; n];
        for _ in 0..self.smoothing_iterations {
            old.copy_from_slice(histogram);
            for j in 0..n {
                histogram[j] = SMOOTHING_KERNEL[0] * old[(j + n - 1) % n]
                    + SMOOTHING_KERNEL[1] * old[j]
                    + SMOOTHING_KERNEL[2] * old[(j + 1) % n];
            }
        }
    }

    /// Angles in `[0, 2*PI)` of every histogram peak above the threshold,
    /// in bin order. Empty when the histogram is all zero.
    pub fn peaks(&self, histogram: &[f64]) -> Vec<f64> {
        let n = histogram.len();
        let max_height = histogram.iter().copied().fold(0.0, f64::max);
        if max_height == 0.0 {
            return Vec::new();
        }

        let mut angles = Vec::new();
        for i in 0..n {
            let prev = histogram[(i + n - 1) % n];
            let next = histogram[(i + 1) % n];
            let value = histogram[i];

            if value > self.peak_threshold * max_height && value > prev && value > next {
                let fi = i as f64;
                // falls back to the discrete bin when the fit is degenerate
                let fbin = quadratic_3_points((fi - 1.0, prev), (fi, value), (fi + 1.0, next))
                    .and_then(|q| q.vertex())
                    .unwrap_or(fi);

                let mut angle = 2.0 * PI * ((fbin + 0.5 + n as f64) / n as f64);
                while angle >= 2.0 * PI {
                    angle -= 2.0 * PI;
                }
                angles.push(angle);
            }
        }
        angles
    }

    /// Orientations for one feature point, using the gradient field of its
    /// own (octave, scale) level.
    pub fn orientations(&self, fp: &FeaturePoint, field: &GradientField) -> Vec<f64> {
        let octave_sigma = fp.sigma * (1.0 / 2f64.powi(fp.octave as i32));
        let mut histogram = self.histogram(fp.octave_x, fp.octave_y, octave_sigma, field);
        self.smooth(&mut histogram);
        self.peaks(&histogram)
    }

    /// One copy of `fp` per dominant orientation
    pub fn assign(&self, fp: &FeaturePoint, field: &GradientField) -> Vec<FeaturePoint> {
        self.orientations(fp, field)
            .into_iter()
            .map(|angle| fp.with_angle(angle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::Gradient;

    fn disc_field(size: usize, cx: i32, cy: i32, radius: f64, angle: f64) -> GradientField {
        let mut values = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                let dx = x as f64 - cx as f64;
                let dy = y as f64 - cy as f64;
                let mag = if dx * dx + dy * dy <= radius * radius { 1.0 } else { 0.0 };
                values.push(Gradient { angle, mag });
            }
        }
        GradientField { width: size, height: size, values }
    }

    fn feature(octave_x: i32, octave_y: i32, sigma: f64) -> FeaturePoint {
        FeaturePoint {
            octave: 0,
            scale: 1,
            octave_x,
            octave_y,
            x: octave_x as f64,
            y: octave_y as f64,
            sigma,
            score: 12.0,
            angle: 0.0,
        }
    }

    fn assigner() -> OrientationAssigner {
        OrientationAssigner::new(&DetectorConfig::default())
    }

    #[test]
    fn test_uniform_direction_single_peak() {
        // gw_sigma = 3, radius = 4.5; the angle sits inside a bin, not on a
        // boundary where two bins would tie
        let field = disc_field(31, 15, 15, 6.0, PI / 2.0 + 0.05);
        let angles = assigner().orientations(&feature(15, 15, 1.0), &field);
        assert_eq!(angles.len(), 1);
        let bin_width = 2.0 * PI / 36.0;
        assert!((angles[0] - PI / 2.0).abs() < bin_width, "angle {}", angles[0]);
    }

    #[test]
    fn test_direction_on_bin_boundary() {
        // PI/2 falls on the boundary between bins 8 and 9; the rounded bin
        // position leans to bin 8, so exactly one peak survives
        let field = disc_field(31, 15, 15, 6.0, PI / 2.0);
        let angles = assigner().orientations(&feature(15, 15, 1.0), &field);
        assert_eq!(angles.len(), 1, "angles {:?}", angles);
        assert!((angles[0] - PI / 2.0).abs() < 1e-9, "angle {}", angles[0]);
    }

    #[test]
    fn test_zero_magnitude_yields_nothing() {
        let field = disc_field(21, 10, 10, 0.0, 1.0);
        let field = GradientField {
            values: field.values.iter().map(|g| Gradient { mag: 0.0, ..*g }).collect(),
            ..field
        };
        assert!(assigner().assign(&feature(10, 10, 1.0), &field).is_empty());
    }

    #[test]
    fn test_two_directions_fan_out() {
        // left half points one way, right half the opposite way
        let size = 31;
        let mut values = Vec::new();
        for _y in 0..size {
            for x in 0..size {
                let angle = if x < 15 { PI / 4.0 } else if x > 15 { 5.0 * PI / 4.0 } else { 0.0 };
                let mag = if x == 15 { 0.0 } else { 1.0 };
                values.push(Gradient { angle, mag });
            }
        }
        let field = GradientField { width: size, height: size, values };
        let points = assigner().assign(&feature(15, 15, 1.0), &field);
        assert_eq!(points.len(), 2);
        assert!(points[0].angle < points[1].angle);
        assert!(points.iter().all(|p| p.score == 12.0 && p.octave_x == 15));
    }

    #[test]
    fn test_window_clipped_at_field_border() {
        let field = disc_field(10, 0, 0, 20.0, PI + 0.05);
        let angles = assigner().orientations(&feature(0, 0, 2.0), &field);
        assert_eq!(angles.len(), 1);
        assert!((angles[0] - PI).abs() < 2.0 * PI / 36.0);
    }

    #[test]
    fn test_histogram_bin_split() {
        // angle exactly on a bin centre goes entirely into that bin
        let a = assigner();
        let centre = 2.0 * PI * 10.5 / 36.0;
        let field = disc_field(3, 1, 1, 0.0, centre);
        let hist = a.histogram(1, 1, 0.1, &field);
        assert!((hist[10] - 1.0).abs() < 1e-6);
        assert!(hist.iter().enumerate().all(|(i, &v)| i == 10 || v.abs() < 1e-6));
    }

    #[test]
    fn test_smoothing_preserves_mass() {
        let a = assigner();
        let mut hist = vec![0.0; 36];
        hist[0] = 1.0;
        hist[20] = 3.0;
        a.smooth(&mut hist);
        let total: f64 = hist.iter().sum();
        assert!((total - 4.0 * (SMOOTHING_KERNEL[0] + SMOOTHING_KERNEL[1] + SMOOTHING_KERNEL[2]).powi(5)).abs() < 1e-12);
        // wrap-around reaches the last bin
        assert!(hist[35] > 0.0);
    }

    #[test]
    fn test_peak_angles_in_range() {
        let a = assigner();
        let mut hist = vec![0.0; 36];
        hist[35] = 1.0;
        hist[34] = 0.5;
        hist[0] = 0.5;
        let angles = a.peaks(&hist);
        assert_eq!(angles.len(), 1);
        assert!(angles[0] >= 0.0 && angles[0] < 2.0 * PI);
        assert!((angles[0] - 2.0 * PI * 35.5 / 36.0).abs() < 1e-9);
    }
}
