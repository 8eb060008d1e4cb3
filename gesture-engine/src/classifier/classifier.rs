//! Named classifiers

use super::model::TrainedModel;
use crate::capture::types::PathSample;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of classifying one path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Classification {
    /// Best label scored at or above the confidence floor
    Match { label: String, confidence: f32 },
    /// Nothing scored high enough; `best` is the closest label
    NoMatch { best: Option<String>, confidence: f32 },
}

impl Classification {
    pub fn is_match(&self) -> bool {
        matches!(self, Classification::Match { .. })
    }

    /// Matched label, if any
    pub fn label(&self) -> Option<&str> {
        match self {
            Classification::Match { label, .. } => Some(label),
            Classification::NoMatch { .. } => None,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            Classification::Match { confidence, .. } | Classification::NoMatch { confidence, .. } => {
                *confidence
            }
        }
    }
}

/// A named trainable model ("neural net")
#[derive(Debug, Clone)]
pub struct Classifier {
    name: String,
    model: Option<Arc<TrainedModel>>,
}

impl Classifier {
    /// Create an untrained classifier
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: None,
        }
    }

    /// Create a classifier around an already trained model
    pub fn with_model(name: impl Into<String>, model: TrainedModel) -> Self {
        Self {
            name: name.into(),
            model: Some(Arc::new(model)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    /// Shared handle to the trained model
    pub fn model(&self) -> Option<Arc<TrainedModel>> {
        self.model.clone()
    }

    /// Labels the classifier can produce (empty when untrained)
    pub fn labels(&self) -> &[String] {
        self.model.as_deref().map(|m| m.labels.as_slice()).unwrap_or(&[])
    }

    /// Classify a path. Scores below `confidence_floor` are reported as `NoMatch`.
    pub fn classify(&self, path: &[PathSample], confidence_floor: f32) -> crate::Result<Classification> {
        let model = self
            .model
            .as_deref()
            .ok_or_else(|| crate::Error::NotTrained(self.name.clone()))?;

        let (label, confidence) = model.predict(path)?;
        if confidence >= confidence_floor {
            Ok(Classification::Match {
                label: label.to_string(),
                confidence,
            })
        } else {
            Ok(Classification::NoMatch {
                best: Some(label.to_string()),
                confidence,
            })
        }
    }

    pub(crate) fn install(&mut self, model: Arc<TrainedModel>) {
        self.model = Some(model);
    }

    pub(crate) fn invalidate(&mut self) {
        self.model = None;
    }
}
