use dog_core::{Image, Pyramid};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Gradient direction and strength at one pixel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gradient {
    /// `atan2(dy, dx) + PI`, in `[0, 2*PI]`
    pub angle: f64,
    pub mag: f64,
}

/// Dense per-pixel gradients of one pyramid level
#[derive(Debug, Clone, PartialEq)]
pub struct GradientField {
    pub width: usize,
    pub height: usize,
    pub values: Vec<Gradient>,
}

impl GradientField {
    /// Gradients from central differences; neighbours are clamped at the
    /// border, so edge pixels use a one-sided difference.
    pub fn from_image(image: &Image) -> Self {
        let w = image.width;
        let h = image.height;
        let mut values = Vec::with_capacity(w * h);

        for j in 0..h {
            let prev_j = j.saturating_sub(1);
            let next_j = if j + 1 < h { j + 1 } else { j };

            for i in 0..w {
                let prev_i = i.saturating_sub(1);
                let next_i = if i + 1 < w { i + 1 } else { i };

                let dx = image.data[j * w + next_i] as f64 - image.data[j * w + prev_i] as f64;
                let dy = image.data[next_j * w + i] as f64 - image.data[prev_j * w + i] as f64;

                values.push(Gradient {
                    angle: dy.atan2(dx) + PI,
                    mag: (dx * dx + dy * dy).sqrt(),
                });
            }
        }

        Self { width: w, height: h, values }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Gradient {
        self.values[y * self.width + x]
    }
}

/// One gradient field per pyramid level, in level order
pub fn compute_gradients(pyramid: &Pyramid, parallel: bool) -> Vec<GradientField> {
    if parallel {
        pyramid.images.par_iter().map(GradientField::from_image).collect()
    } else {
        pyramid.images.iter().map(GradientField::from_image).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_ramp() {
        let img = Image::from_fn(5, 3, |x, _| 2.0 * x as f32);
        let field = GradientField::from_image(&img);

        // interior: dx = 4, dy = 0, angle = atan2(0, 4) + PI
        let g = field.get(2, 1);
        assert!((g.mag - 4.0).abs() < 1e-12);
        assert!((g.angle - PI).abs() < 1e-12);

        // clamped border only sees one neighbour
        let edge = field.get(0, 1);
        assert!((edge.mag - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_vertical_ramp_angle() {
        let img = Image::from_fn(3, 5, |_, y| y as f32);
        let g = GradientField::from_image(&img).get(1, 2);
        assert!((g.angle - 1.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_flat_image_has_zero_magnitude() {
        let field = GradientField::from_image(&Image::filled(4, 4, 3.0));
        assert!(field.values.iter().all(|g| g.mag == 0.0));
        assert!(field.values.iter().all(|g| g.angle >= 0.0 && g.angle <= 2.0 * PI));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let pyr = Pyramid::new(
            vec![
                Image::from_fn(8, 8, |x, y| ((x * 7 + y * 3) % 5) as f32),
                Image::from_fn(4, 4, |x, y| (x * y) as f32),
            ],
            1,
        );
        assert_eq!(compute_gradients(&pyr, true), compute_gradients(&pyr, false));
    }
}
