//! Classification
//!
//! The softmax gesture model, named classifiers, the registry of classifiers
//! and background training.

pub mod model;
pub mod classifier;
pub mod registry;
pub mod training;

pub use classifier::{Classification, Classifier};
pub use model::{fit, ModelMetadata, TrainedModel, TrainingParams};
pub use registry::{ClassifierRegistry, SharedRegistry};
pub use training::{TrainingJob, TrainingReport};
