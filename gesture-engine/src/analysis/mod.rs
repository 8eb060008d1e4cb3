//! Path analysis
//!
//! Converts noisy controller paths into comparable feature vectors using
//! arc-length resampling and translation/scale normalization.

pub mod normalize;

pub use normalize::{
    PathNormalizer, DEFAULT_RESAMPLE_POINTS, MIN_PATH_SAMPLES, RESAMPLE_POINTS_RANGE,
};
