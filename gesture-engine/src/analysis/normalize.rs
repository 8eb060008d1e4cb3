//! Path Normalization
//!
//! Turns a recorded path of any duration, position and size into a
//! fixed-length feature vector so that examples can be compared:
//!
//! 1. Arc-length resampling to a fixed number of evenly spaced points
//! 2. Translation so the centroid sits at the origin
//! 3. Uniform scaling so the largest axis-aligned extent is 1
//!
//! Training and classification must use the same normalizer settings; the
//! trained model records the point count it was built with.

use crate::capture::types::PathSample;
use glam::Vec3;
use std::ops::RangeInclusive;

/// Default number of resampled points per path
pub const DEFAULT_RESAMPLE_POINTS: usize = 11;

/// Minimum number of samples a path needs to be normalized
pub const MIN_PATH_SAMPLES: usize = 2;

/// Point counts a normalizer, and any model built on one, may use
pub const RESAMPLE_POINTS_RANGE: RangeInclusive<usize> = 2..=256;

/// Extents below this are treated as a stationary path
const DEGENERATE_EXTENT: f32 = 1e-6;

/// Deterministic path normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathNormalizer {
    /// Number of points after resampling (at least 2)
    pub points: usize,
}

impl PathNormalizer {
    /// Create a normalizer with the default point count
    pub fn new() -> Self {
        Self {
            points: DEFAULT_RESAMPLE_POINTS,
        }
    }

    /// Create a normalizer with a custom point count, clamped to at least 2
    pub fn with_points(points: usize) -> Self {
        Self {
            points: points.max(2),
        }
    }

    /// Length of the produced feature vector
    pub fn feature_len(&self) -> usize {
        self.points * 3
    }

    /// Normalize a path into a flat `[x0, y0, z0, x1, ...]` feature vector
    pub fn features(&self, samples: &[PathSample]) -> crate::Result<Vec<f32>> {
        let points = self.normalize(samples)?;
        Ok(points.iter().flat_map(|p| p.to_array()).collect())
    }

    /// Resample, center and scale a path
    pub fn normalize(&self, samples: &[PathSample]) -> crate::Result<Vec<Vec3>> {
        let mut points = self.resample(samples)?;

        let centroid = points.iter().copied().sum::<Vec3>() / points.len() as f32;
        for p in points.iter_mut() {
            *p -= centroid;
        }

        let extent = max_extent(&points);
        if extent > DEGENERATE_EXTENT {
            for p in points.iter_mut() {
                *p /= extent;
            }
        }

        Ok(points)
    }

    /// Resample a path to `self.points` positions evenly spaced along its length
    pub fn resample(&self, samples: &[PathSample]) -> crate::Result<Vec<Vec3>> {
        if samples.len() < MIN_PATH_SAMPLES {
            return Err(crate::Error::TooShort {
                samples: samples.len(),
                min: MIN_PATH_SAMPLES,
            });
        }

        let positions: Vec<Vec3> = samples.iter().map(|s| s.position).collect();
        let cumulative = cumulative_lengths(&positions);
        let total = cumulative[cumulative.len() - 1];
        let count = self.points.max(2);

        if total <= DEGENERATE_EXTENT {
            return Ok(vec![positions[0]; count]);
        }

        let step = total / (count - 1) as f32;
        let mut resampled = Vec::with_capacity(count);
        let mut segment = 0;

        for k in 0..count - 1 {
            let target = step * k as f32;
            while segment + 2 < positions.len() && cumulative[segment + 1] < target {
                segment += 1;
            }

            let seg_len = cumulative[segment + 1] - cumulative[segment];
            let t = if seg_len > 0.0 {
                ((target - cumulative[segment]) / seg_len).clamp(0.0, 1.0)
            } else {
                0.0
            };
            resampled.push(positions[segment].lerp(positions[segment + 1], t));
        }
        // Pin the last point to avoid accumulated float drift
        resampled.push(positions[positions.len() - 1]);

        Ok(resampled)
    }
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn cumulative_lengths(positions: &[Vec3]) -> Vec<f32> {
    let mut cumulative = Vec::with_capacity(positions.len());
    let mut total = 0.0;
    cumulative.push(total);
    for pair in positions.windows(2) {
        total += pair[0].distance(pair[1]);
        cumulative.push(total);
    }
    cumulative
}

fn max_extent(points: &[Vec3]) -> f32 {
    let (min, max) = points.iter().fold(
        (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
        |(min, max), p| (min.min(*p), max.max(*p)),
    );
    (max - min).max_element()
}
