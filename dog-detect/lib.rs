//! Difference-of-Gaussians keypoint detection.
//!
//! Takes a precomputed Gaussian pyramid and its DoG pyramid, finds
//! scale-space extrema, refines them to sub-pixel precision, prunes them on
//! a spatial grid, and assigns one or more dominant orientations to each.

pub mod builder;
pub mod config;
pub mod detector;
pub mod error;
pub mod extrema;
pub mod gradient;
pub mod math;
pub mod observer;
pub mod orientation;
pub mod prune;
pub mod refinement;
pub mod resample;
pub mod types;

pub use builder::DetectorBuilder;
pub use config::DetectorConfig;
pub use detector::KeypointDetector;
pub use error::{DetectError, DetectResult};
pub use gradient::{compute_gradients, Gradient, GradientField};
pub use observer::{DetectionObserver, NoopObserver, ReferenceTrace, StageCounts, TraceMismatch, TraceStage};
pub use orientation::OrientationAssigner;
pub use prune::prune_features;
pub use resample::{BilinearResampler, Resampler};
pub use types::{Rejection, ScanStats};

pub use dog_core::{self, FeaturePoint, Image, Pyramid};
