//! Pose capture module
//!
//! Path samples, per-press capture sessions, and the lock-free ring buffer
//! that carries poses from a device thread to the engine's owner thread.

pub mod types;
pub mod ring_buffer;
pub mod session;

pub use types::*;
pub use ring_buffer::{InputConsumer, InputProducer, InputRingBuffer, RingBufferStats};
pub use session::{CaptureSession, SessionStats};
