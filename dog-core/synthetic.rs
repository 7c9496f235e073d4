//! Analytically blurred blob images, for tests, benchmarks and demos.
//!
//! Blurring a Gaussian blob of width `s` by `t` gives a blob of width
//! `sqrt(s^2 + t^2)` with amplitude scaled by `s^2 / (s^2 + t^2)`, so every
//! pyramid level is exact without running a convolution.

use crate::{Image, Pyramid};

/// Blur of the first level of every octave, in octave-local pixels
pub const BASE_SIGMA: f64 = 1.6;
pub const BACKGROUND: f64 = 100.0;

/// A Gaussian blob on a flat background
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    pub x: f64,
    pub y: f64,
    pub sigma: f64,
    pub amplitude: f64,
}

/// Gaussian and DoG pyramids of a blob image.
///
/// Octave `o` halves the size `o` times and samples base-image pixel
/// centres at `x * 2^o + 2^(o-1) - 0.5`.
pub fn blob_pyramids(
    width: usize,
    height: usize,
    blobs: &[Blob],
    octaves: usize,
    gaussian_scales: usize,
) -> (Pyramid, Pyramid) {
    let mk = 2f64.powf(1.0 / (gaussian_scales as f64 - 1.0));
    let mut gaussian = Vec::with_capacity(octaves * gaussian_scales);
    let mut dog = Vec::with_capacity(octaves * (gaussian_scales - 1));

    for octave in 0..octaves {
        let step = 2f64.powi(octave as i32);
        let (w, h) = (width >> octave, height >> octave);
        let levels: Vec<Image> = (0..gaussian_scales)
            .map(|scale| {
                let blur = BASE_SIGMA * mk.powi(scale as i32) * step;
                Image::from_fn(w, h, |x, y| {
                    let bx = x as f64 * step + step / 2.0 - 0.5;
                    let by = y as f64 * step + step / 2.0 - 0.5;
                    let mut v = BACKGROUND;
                    for blob in blobs {
                        let s2 = blob.sigma * blob.sigma + blur * blur;
                        let r2 = (bx - blob.x).powi(2) + (by - blob.y).powi(2);
                        v += blob.amplitude * blob.sigma * blob.sigma / s2 * (-r2 / (2.0 * s2)).exp();
                    }
                    v as f32
                })
            })
            .collect();

        for pair in levels.windows(2) {
            let data = pair[1].data.iter().zip(&pair[0].data).map(|(a, b)| a - b).collect();
            dog.push(Image::new(w, h, data));
        }
        gaussian.extend(levels);
    }

    (
        Pyramid::new(gaussian, gaussian_scales),
        Pyramid::new(dog, gaussian_scales - 1),
    )
}

/// Blobs on a regular grid, alternating bright and dark. Centres sit off
/// the pixel grid so gradient histograms have no mirror ties.
pub fn blob_grid(width: usize, height: usize, spacing: usize, sigma: f64) -> Vec<Blob> {
    let mut blobs = Vec::new();
    let mut bright = true;
    let mut y = spacing;
    while y + spacing / 2 < height {
        let mut x = spacing;
        while x + spacing / 2 < width {
            blobs.push(Blob {
                x: x as f64 + 0.3,
                y: y as f64 + 0.15,
                sigma,
                amplitude: if bright { 200.0 } else { -200.0 },
            });
            bright = !bright;
            x += spacing;
        }
        y += spacing;
    }
    blobs
}
