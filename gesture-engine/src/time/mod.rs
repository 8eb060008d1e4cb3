//! Monotonic timing for pose samples
//!
//! Timestamps are plain nanosecond counts so they serialize compactly and
//! compare cheaply in the capture hot path.

pub mod timebase;

pub use timebase::{Clock, Timestamp};
