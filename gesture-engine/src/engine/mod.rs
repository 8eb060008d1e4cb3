//! Recognition engine
//!
//! The state machine tying capture, the gesture bank and classifiers
//! together, plus the typed notifications it emits.

pub mod state;
pub mod events;
pub mod engine;

pub use engine::RecognitionEngine;
pub use events::{EngineEvent, Subscription};
pub use state::{EngineState, Trigger};
