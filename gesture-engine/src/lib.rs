//! # Gesture Engine
//!
//! Capture, training and real-time recognition of 3D controller gestures for
//! VR hosts.
//!
//! ## Overview
//!
//! The engine records a tracked controller's path while a trigger is held,
//! stores those paths as labelled examples of named gestures, trains named
//! classifiers ("neural nets") from the examples on a worker thread, and
//! classifies new paths against the currently selected classifier.
//!
//! Rendering, menus and device input live in the host. The host feeds the
//! engine timestamped positions and trigger edges and listens to
//! [`EngineEvent`]s.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gesture_engine::{Config, RecognitionEngine, Timestamp};
//! use glam::Vec3;
//!
//! let mut engine = RecognitionEngine::new(Config::default()).unwrap();
//! let events = engine.subscribe();
//!
//! let name = engine.create_gesture(Some("Swipe")).unwrap();
//! engine.enter_recording_target(&name).unwrap();
//! engine.contact_engaged().unwrap();
//! for i in 0..20u64 {
//!     engine.push_pose(Vec3::new(i as f32 * 0.01, 0.0, 0.0), Timestamp::from_millis(i * 10));
//! }
//! engine.contact_released().unwrap();
//! engine.leave_to_main_menu().unwrap();
//!
//! engine.select_classifier("net1").unwrap();
//! engine.begin_training("net1").unwrap();
//! engine.wait_for_training(std::time::Duration::from_secs(5)).unwrap();
//!
//! for event in events.try_iter() {
//!     println!("{:?}", event);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`time`]: monotonic timestamps
//! - [`capture`]: path samples, capture sessions and the pose ring buffer
//! - [`gestures`]: examples, gestures, the gesture bank and persistence
//! - [`analysis`]: path normalization into fixed-length feature vectors
//! - [`classifier`]: the softmax model, classifiers, registry and training worker
//! - [`engine`]: the recognition state machine and its notifications
//! - [`app`]: CLI and configuration management
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ Pose stream │───▶│ Ring Buffer │───▶│   Capture   │───▶│   Gesture   │
//! │   (host)    │    │ (lock-free) │    │   Session   │    │    Bank     │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//!                                              │                  │
//!                                              ▼                  ▼
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ EngineEvent │◀───│  Classify   │◀───│  Normalize  │◀───│  Training   │
//! │ subscribers │    │  (softmax)  │    │ (resample)  │    │  (worker)   │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//! ```

pub mod time;
pub mod capture;
pub mod gestures;
pub mod analysis;
pub mod classifier;
pub mod engine;
pub mod app;

// Re-export commonly used types
pub use app::config::Config;
pub use capture::types::PathSample;
pub use classifier::{Classification, ClassifierRegistry, TrainedModel};
pub use engine::{EngineEvent, EngineState, RecognitionEngine, Subscription, Trigger};
pub use gestures::{Gesture, GestureBank, GestureExample, GestureStore, JsonStore, MemoryStore};
pub use time::timebase::Timestamp;

/// Result type alias for the gesture engine
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the gesture engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Name already in use: {0}")]
    DuplicateName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Example has no samples")]
    EmptyExample,

    #[error("Sample timestamps are not strictly increasing at index {0}")]
    UnorderedSamples(usize),

    #[error("Index {index} out of range for {len} examples")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Training needs at least one gesture with at least one example")]
    InsufficientData,

    #[error("Classifier '{0}' has no trained model")]
    NotTrained(String),

    #[error("'{0}' is in use")]
    Busy(String),

    #[error("Path too short: {samples} samples, need {min}")]
    TooShort { samples: usize, min: usize },

    #[error("Cannot handle {trigger} while {state}")]
    InvalidTransition {
        state: engine::EngineState,
        trigger: engine::Trigger,
    },

    #[error("No classifier selected")]
    NoClassifierSelected,

    #[error("Training cancelled")]
    Cancelled,

    #[error("Training error: {0}")]
    Training(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
