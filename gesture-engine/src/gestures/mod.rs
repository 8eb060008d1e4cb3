//! Gesture data
//!
//! Examples, named gestures, the gesture bank and its persistence.

pub mod example;
pub mod gesture;
pub mod bank;
pub mod storage;

pub use bank::{GestureBank, LabelledExamples, TrainingSet};
pub use example::GestureExample;
pub use gesture::Gesture;
pub use storage::{GestureStore, JsonStore, MemoryStore};
