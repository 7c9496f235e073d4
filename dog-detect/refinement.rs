use dog_core::FeaturePoint;

use crate::config::DetectorConfig;
use crate::math::solve_symmetric33;
use crate::types::Rejection;

/// Sub-pixel refinement of DoG extrema and mapping back to base-image
/// coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Refiner {
    laplacian_sqr_threshold: f64,
    max_subpixel_distance_sqr: f64,
    edge_hessian_threshold: f64,
    base_width: f64,
    base_height: f64,
    /// Scale ratio between consecutive Gaussian levels
    mk: f64,
    max_scale: f64,
}

/// Three vertically adjacent DoG levels sharing one resolution
#[derive(Debug, Clone, Copy)]
pub struct LevelStack<'a> {
    pub below: &'a [f32],
    pub current: &'a [f32],
    pub above: &'a [f32],
    pub width: usize,
}

impl Refiner {
    pub fn new(
        config: &DetectorConfig,
        base_width: usize,
        base_height: usize,
        gaussian_scales_per_octave: usize,
        dog_scales_per_octave: usize,
    ) -> Self {
        Self {
            laplacian_sqr_threshold: config.laplacian_sqr_threshold,
            max_subpixel_distance_sqr: config.max_subpixel_distance_sqr,
            edge_hessian_threshold: config.edge_hessian_threshold(),
            base_width: base_width as f64,
            base_height: base_height as f64,
            mk: 2f64.powf(1.0 / (gaussian_scales_per_octave as f64 - 1.0)),
            max_scale: dog_scales_per_octave as f64,
        }
    }

    /// Fit a quadratic around the extremum at `(i, j)` and build the feature
    /// point, or report why the extremum is not stable enough to keep.
    ///
    /// `(i, j)` must be at least one pixel away from every border.
    pub fn refine(
        &self,
        stack: &LevelStack<'_>,
        i: usize,
        j: usize,
        octave: usize,
        scale: usize,
    ) -> Result<FeaturePoint, Rejection> {
        let w = stack.width;
        let pos = j * w + i;
        let cur = |p: usize| stack.current[p] as f64;
        let below = |p: usize| stack.below[p] as f64;
        let above = |p: usize| stack.above[p] as f64;

        let v = cur(pos);

        // spatial derivatives
        let dx = 0.5 * (cur(pos + 1) - cur(pos - 1));
        let dy = 0.5 * (cur(pos + w) - cur(pos - w));
        let dxx = cur(pos + 1) + cur(pos - 1) - 2.0 * v;
        let dyy = cur(pos + w) + cur(pos - w) - 2.0 * v;
        let dxy = 0.25 * (cur(pos - w - 1) + cur(pos + w + 1) - cur(pos - w + 1) - cur(pos + w - 1));

        // scale derivatives
        let ds = 0.5 * (above(pos) - below(pos));
        let dss = above(pos) + below(pos) - 2.0 * v;
        let dxs = 0.25 * ((below(pos - 1) - below(pos + 1)) + (-above(pos - 1) + above(pos + 1)));
        let dys = 0.25 * ((below(pos - w) - below(pos + w)) + (-above(pos - w) + above(pos + w)));

        let hessian = [dxx, dxy, dxs, dxy, dyy, dys, dxs, dys, dss];
        let b = [-dx, -dy, -ds];

        let u = solve_symmetric33(&hessian, &b).ok_or(Rejection::Singular)?;

        if u[0] * u[0] + u[1] * u[1] > self.max_subpixel_distance_sqr {
            return Err(Rejection::Unstable);
        }

        let det = dxx * dyy - dxy * dxy;
        if det == 0.0 {
            return Err(Rejection::Edge);
        }
        let edge_score = (dxx + dyy) * (dxx + dyy) / det;
        if edge_score.abs() >= self.edge_hessian_threshold {
            return Err(Rejection::Edge);
        }

        let score = v - (b[0] * u[0] + b[1] * u[1] + b[2] * u[2]);
        if score * score < self.laplacian_sqr_threshold {
            return Err(Rejection::LowContrast);
        }

        // octave pixel centre -> base image: x * 2^n + 2^(n-1) - 0.5
        let octave_scale = 2f64.powi(octave as i32);
        let half_octave_scale = 2f64.powi(octave as i32 - 1);
        let original_x = i as f64 * octave_scale + half_octave_scale - 0.5;
        let original_y = j as f64 * octave_scale + half_octave_scale - 0.5;

        let x = original_x + u[0] * octave_scale;
        let y = original_y + u[1] * octave_scale;
        if x < 0.0 || x >= self.base_width || y < 0.0 || y >= self.base_height {
            return Err(Rejection::OutOfBounds);
        }

        let sp_scale = (scale as f64 + u[2]).max(0.0).min(self.max_scale);
        let sigma = self.mk.powf(sp_scale) * octave_scale;

        let inv_scale = 1.0 / octave_scale;
        let octave_x = (x * inv_scale + 0.5 * inv_scale - 0.5 + 0.5).floor() as i32;
        let octave_y = (y * inv_scale + 0.5 * inv_scale - 0.5 + 0.5).floor() as i32;

        Ok(FeaturePoint {
            octave,
            scale,
            octave_x,
            octave_y,
            x,
            y,
            sigma,
            score,
            angle: 0.0,
        })
    }
}
