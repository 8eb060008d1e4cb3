//! Capture Sessions
//!
//! A session accumulates the samples of one trigger press. Samples must
//! arrive with strictly increasing timestamps; anything else is dropped and
//! counted rather than reported, since late or duplicated poses are normal
//! for tracked controllers.

use super::types::PathSample;
use crate::gestures::example::GestureExample;
use crate::time::timebase::Timestamp;
use tracing::trace;

/// Counters for a single session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Samples kept
    pub accepted: usize,
    /// Samples dropped for not being newer than the previous one
    pub out_of_order: usize,
}

/// An open capture of one path
#[derive(Debug, Clone)]
pub struct CaptureSession {
    target: Option<String>,
    samples: Vec<PathSample>,
    stats: SessionStats,
}

impl CaptureSession {
    /// Start a session recording into `target`, or an anonymous session
    /// (used for detection) when `target` is `None`.
    pub fn new(target: Option<String>) -> Self {
        Self {
            target,
            samples: Vec::new(),
            stats: SessionStats::default(),
        }
    }

    /// Gesture the finished path will be appended to
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Add a sample. Returns false if it was dropped.
    pub fn push(&mut self, sample: PathSample) -> bool {
        if let Some(last) = self.last_timestamp() {
            if !sample.t.is_after(last) {
                trace!(
                    t = sample.t.as_nanos(),
                    last = last.as_nanos(),
                    "Dropping out-of-order sample"
                );
                self.stats.out_of_order += 1;
                return false;
            }
        }
        self.samples.push(sample);
        self.stats.accepted += 1;
        true
    }

    /// Samples accepted so far
    pub fn samples(&self) -> &[PathSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    fn last_timestamp(&self) -> Option<Timestamp> {
        self.samples.last().map(|s| s.t)
    }

    /// Close the session and freeze its samples.
    ///
    /// Fewer than `min_samples` accepted samples yields `TooShort`.
    pub fn finish(self, min_samples: usize) -> crate::Result<GestureExample> {
        if self.samples.len() < min_samples || self.samples.is_empty() {
            return Err(crate::Error::TooShort {
                samples: self.samples.len(),
                min: min_samples,
            });
        }
        GestureExample::from_samples(self.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ms: u64) -> PathSample {
        PathSample::at(ms as f32, 0.0, 0.0, Timestamp::from_millis(ms))
    }

    #[test]
    fn test_session_accepts_increasing_samples() {
        let mut session = CaptureSession::new(Some("Swipe".to_string()));
        assert_eq!(session.target(), Some("Swipe"));
        for ms in 0..5 {
            assert!(session.push(sample(ms)));
        }
        assert_eq!(session.len(), 5);
        assert_eq!(session.stats().accepted, 5);
    }

    #[test]
    fn test_session_drops_out_of_order_samples() {
        let mut session = CaptureSession::new(None);
        assert!(session.push(sample(10)));
        assert!(!session.push(sample(10)));
        assert!(!session.push(sample(5)));
        assert!(session.push(sample(11)));

        assert_eq!(session.samples().len(), 2);
        assert_eq!(
            session.stats(),
            SessionStats {
                accepted: 2,
                out_of_order: 2
            }
        );
    }

    #[test]
    fn test_finish_below_threshold() {
        let mut session = CaptureSession::new(Some("Swipe".to_string()));
        for ms in 0..9 {
            session.push(sample(ms));
        }
        let result = session.finish(10);
        assert!(matches!(
            result,
            Err(crate::Error::TooShort { samples: 9, min: 10 })
        ));
    }

    #[test]
    fn test_finish_at_threshold() {
        let mut session = CaptureSession::new(Some("Swipe".to_string()));
        for ms in 0..10 {
            session.push(sample(ms));
        }
        let example = session.finish(10).unwrap();
        assert_eq!(example.len(), 10);
        assert_eq!(example.started_at(), Timestamp::from_millis(0));
    }

    #[test]
    fn test_finish_empty_with_zero_threshold() {
        let session = CaptureSession::new(None);
        assert!(matches!(
            session.finish(0),
            Err(crate::Error::TooShort { samples: 0, min: 0 })
        ));
    }
}
