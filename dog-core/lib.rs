#[cfg(feature = "synthetic")]
pub mod synthetic;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row-major single-channel floating point image
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Image {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Self {
        Self { width, height, data }
    }

    /// Image of the given size with every pixel set to `value`
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Build an image by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// True when the buffer length matches `width * height`
    pub fn is_consistent(&self) -> bool {
        self.width
            .checked_mul(self.height)
            .is_some_and(|len| len == self.data.len())
    }
}

/// Scale-space pyramid: `num_scales_per_octave` levels per octave, octaves
/// stored back to back, each octave at half the resolution of the previous one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pyramid {
    pub images: Vec<Image>,
    pub num_scales_per_octave: usize,
}

impl Pyramid {
    pub fn new(images: Vec<Image>, num_scales_per_octave: usize) -> Self {
        Self {
            images,
            num_scales_per_octave,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    #[inline]
    pub fn octave_of(&self, k: usize) -> usize {
        k / self.num_scales_per_octave
    }

    #[inline]
    pub fn scale_of(&self, k: usize) -> usize {
        k % self.num_scales_per_octave
    }

    /// Level at (octave, scale), if the pyramid holds it
    pub fn level(&self, octave: usize, scale: usize) -> Option<&Image> {
        self.images.get(octave * self.num_scales_per_octave + scale)
    }

    /// Dimensions of the first (full resolution) level
    pub fn base_dimensions(&self) -> Option<(usize, usize)> {
        self.images.first().map(|img| (img.width, img.height))
    }
}

/// Scale-space feature point.
///
/// `x`/`y` are in base-image coordinates, `octave_x`/`octave_y` are the
/// rounded pixel position at the octave's own resolution. `angle` is zero
/// until orientation assignment, which may clone a point once per dominant
/// orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeaturePoint {
    pub octave: usize,
    pub scale: usize,
    pub octave_x: i32,
    pub octave_y: i32,
    pub x: f64,
    pub y: f64,
    pub sigma: f64,
    pub score: f64,
    pub angle: f64,
}

impl FeaturePoint {
    /// Copy of this point carrying the given orientation
    pub fn with_angle(&self, angle: f64) -> Self {
        Self { angle, ..*self }
    }

    /// True for DoG maxima, false for minima
    pub fn is_maximum(&self) -> bool {
        self.score > 0.0
    }
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}

/// Number of logical CPUs, at least one
pub fn default_threads() -> usize {
    num_cpus::get().max(1)
}
