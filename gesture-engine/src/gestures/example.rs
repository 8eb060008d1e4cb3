//! Recorded gesture examples

use crate::capture::types::PathSample;
use crate::time::timebase::Timestamp;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One recorded performance of a gesture.
///
/// Always non-empty with strictly increasing timestamps. Examples are frozen
/// once built: there is no API to push or edit samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GestureExample {
    samples: Vec<PathSample>,
}

impl GestureExample {
    /// Build an example, checking it is non-empty and time-ordered.
    pub fn from_samples(samples: Vec<PathSample>) -> crate::Result<Self> {
        if samples.is_empty() {
            return Err(crate::Error::EmptyExample);
        }
        if let Some(i) = samples
            .windows(2)
            .position(|pair| !pair[1].t.is_after(pair[0].t))
        {
            return Err(crate::Error::UnorderedSamples(i + 1));
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[PathSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed example; kept for API symmetry
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn started_at(&self) -> Timestamp {
        self.samples.first().map(|s| s.t).unwrap_or_default()
    }

    pub fn ended_at(&self) -> Timestamp {
        self.samples.last().map(|s| s.t).unwrap_or_default()
    }

    /// Time between the first and last sample
    pub fn duration(&self) -> Duration {
        self.ended_at().duration_since(self.started_at())
    }

    /// Total length of the polyline through all samples
    pub fn path_length(&self) -> f32 {
        self.samples
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]))
            .sum()
    }

    pub fn into_samples(self) -> Vec<PathSample> {
        self.samples
    }
}

// Deserialization goes through the validating constructor so that a hand
// edited bank file cannot smuggle in an empty or unordered example.
impl<'de> Deserialize<'de> for GestureExample {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            samples: Vec<PathSample>,
        }

        let raw = Raw::deserialize(deserializer)?;
        GestureExample::from_samples(raw.samples).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: u64) -> Vec<PathSample> {
        (0..n)
            .map(|i| PathSample::at(i as f32, 0.0, 0.0, Timestamp::from_millis(i * 10)))
            .collect()
    }

    #[test]
    fn test_from_samples_valid() {
        let example = GestureExample::from_samples(line(5)).unwrap();
        assert_eq!(example.len(), 5);
        assert!(!example.is_empty());
        assert_eq!(example.duration(), Duration::from_millis(40));
        assert!((example.path_length() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_samples_empty() {
        let result = GestureExample::from_samples(vec![]);
        assert!(matches!(result, Err(crate::Error::EmptyExample)));
    }

    #[test]
    fn test_from_samples_rejects_duplicate_timestamp() {
        let mut samples = line(4);
        samples[2].t = samples[1].t;
        let result = GestureExample::from_samples(samples);
        assert!(matches!(result, Err(crate::Error::UnorderedSamples(2))));
    }

    #[test]
    fn test_single_sample_example() {
        let example = GestureExample::from_samples(line(1)).unwrap();
        assert_eq!(example.duration(), Duration::ZERO);
        assert_eq!(example.path_length(), 0.0);
    }

    #[test]
    fn test_deserialize_validates() {
        let example = GestureExample::from_samples(line(3)).unwrap();
        let json = serde_json::to_string(&example).unwrap();
        let loaded: GestureExample = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, example);

        let empty = r#"{ "samples": [] }"#;
        assert!(serde_json::from_str::<GestureExample>(empty).is_err());
    }
}
