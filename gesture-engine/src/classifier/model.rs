//! Softmax Gesture Network
//!
//! A single-layer network mapping normalized path features to a probability
//! per gesture. It trains with full-batch gradient descent on cross-entropy,
//! starts from zero weights and has no random components, so identical
//! training sets always produce identical models.

use crate::analysis::normalize::PathNormalizer;
use crate::capture::types::PathSample;
use crate::gestures::bank::TrainingSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

/// Current trained-model format version
pub const MODEL_FORMAT_VERSION: &str = "1.0";

/// Hyperparameters for a training run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingParams {
    /// Maximum passes over the training set
    pub epochs: usize,
    /// Gradient descent step size
    pub learning_rate: f32,
    /// L2 penalty on weights
    pub weight_decay: f32,
    /// Stop early once mean cross-entropy falls below this
    pub target_loss: f32,
    /// Points per resampled path
    pub resample_points: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 400,
            learning_rate: 0.5,
            weight_decay: 1e-4,
            target_loss: 1e-3,
            resample_points: crate::analysis::DEFAULT_RESAMPLE_POINTS,
        }
    }
}

/// Training bookkeeping stored with the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelMetadata {
    pub id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub epochs_run: usize,
    pub final_loss: f32,
    pub example_count: usize,
    pub format_version: String,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            trained_at: Utc::now(),
            epochs_run: 0,
            final_loss: 0.0,
            example_count: 0,
            format_version: MODEL_FORMAT_VERSION.to_string(),
        }
    }
}

/// A trained classifier model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    /// Gesture names, one per output
    pub labels: Vec<String>,
    /// Points per resampled path the model was trained with
    pub resample_points: usize,
    /// Row-major `labels.len() x feature_len` weights
    pub weights: Vec<f32>,
    /// One bias per label
    pub bias: Vec<f32>,
    #[serde(default)]
    pub metadata: ModelMetadata,
}

impl TrainedModel {
    pub fn feature_len(&self) -> usize {
        self.resample_points * 3
    }

    pub fn normalizer(&self) -> PathNormalizer {
        PathNormalizer::with_points(self.resample_points)
    }

    /// Check the point count and that the weight shapes agree with the labels
    pub fn validate(&self) -> crate::Result<()> {
        let classes = self.labels.len();
        if classes == 0 {
            return Err(crate::Error::Training("model has no labels".to_string()));
        }
        if !crate::analysis::RESAMPLE_POINTS_RANGE.contains(&self.resample_points) {
            return Err(crate::Error::Training(format!(
                "model resample_points out of range: {}",
                self.resample_points
            )));
        }
        let expected = classes.checked_mul(self.feature_len());
        if expected != Some(self.weights.len()) || self.bias.len() != classes {
            return Err(crate::Error::Training(format!(
                "model shape mismatch: {} labels, {} weights, {} biases, {} features",
                classes,
                self.weights.len(),
                self.bias.len(),
                self.feature_len()
            )));
        }
        Ok(())
    }

    /// Class probabilities for an already normalized feature vector
    pub fn probabilities(&self, features: &[f32]) -> Vec<f32> {
        softmax(self.logits(features))
    }

    /// Class probabilities for a raw path
    pub fn evaluate(&self, path: &[PathSample]) -> crate::Result<Vec<f32>> {
        let features = self.normalizer().features(path)?;
        Ok(self.probabilities(&features))
    }

    /// Best label and its probability. Ties go to the earlier label.
    pub fn predict(&self, path: &[PathSample]) -> crate::Result<(&str, f32)> {
        let probs = self.evaluate(path)?;
        let (best, confidence) = argmax(&probs).ok_or_else(|| {
            crate::Error::Training("model has no labels".to_string())
        })?;
        Ok((self.labels[best].as_str(), confidence))
    }

    fn logits(&self, features: &[f32]) -> Vec<f32> {
        ModelView {
            weights: &self.weights,
            bias: &self.bias,
            width: self.feature_len(),
        }
        .logits(features)
    }
}

/// Fit a model to a training set.
///
/// `cancel` is checked before every epoch; when set the fit stops and returns
/// `Cancelled` without producing a model.
pub fn fit(
    set: &TrainingSet,
    params: &TrainingParams,
    cancel: &AtomicBool,
) -> crate::Result<TrainedModel> {
    let normalizer = PathNormalizer::with_points(params.resample_points);
    let width = normalizer.feature_len();

    let mut labels = Vec::new();
    let mut rows: Vec<(usize, Vec<f32>)> = Vec::new();
    for class in &set.classes {
        let class_index = labels.len();
        let mut usable = 0;
        for example in &class.examples {
            match normalizer.features(example.samples()) {
                Ok(features) => {
                    rows.push((class_index, features));
                    usable += 1;
                }
                Err(e) => warn!(gesture = %class.label, "Skipping example: {}", e),
            }
        }
        if usable > 0 {
            labels.push(class.label.clone());
        }
    }

    if rows.is_empty() {
        return Err(crate::Error::InsufficientData);
    }

    let classes = labels.len();
    let mut weights = vec![0.0f32; classes * width];
    let mut bias = vec![0.0f32; classes];
    let mut metadata = ModelMetadata {
        example_count: rows.len(),
        ..ModelMetadata::default()
    };

    if classes == 1 {
        // One-class model: softmax over a single output is always 1
        debug!(label = %labels[0], "Training degenerate one-class model");
        return Ok(TrainedModel {
            labels,
            resample_points: normalizer.points,
            weights,
            bias,
            metadata,
        });
    }

    let n = rows.len() as f32;
    let mut grad_w = vec![0.0f32; classes * width];
    let mut grad_b = vec![0.0f32; classes];
    let mut loss = f32::INFINITY;

    for epoch in 0..params.epochs {
        if cancel.load(Ordering::Acquire) {
            debug!(epoch, "Training cancelled");
            return Err(crate::Error::Cancelled);
        }

        grad_w.iter_mut().for_each(|g| *g = 0.0);
        grad_b.iter_mut().for_each(|g| *g = 0.0);
        let mut total_loss = 0.0;

        let model = ModelView {
            weights: &weights,
            bias: &bias,
            width,
        };
        for (target, features) in &rows {
            let probs = softmax(model.logits(features));
            total_loss -= probs[*target].max(f32::MIN_POSITIVE).ln();

            for (class, p) in probs.iter().enumerate() {
                let err = p - if class == *target { 1.0 } else { 0.0 };
                let row = &mut grad_w[class * width..(class + 1) * width];
                for (g, x) in row.iter_mut().zip(features) {
                    *g += err * x;
                }
                grad_b[class] += err;
            }
        }

        loss = total_loss / n;
        metadata.epochs_run = epoch + 1;
        if loss < params.target_loss {
            debug!(epoch, loss, "Reached target loss");
            break;
        }

        for (w, g) in weights.iter_mut().zip(&grad_w) {
            *w -= params.learning_rate * (g / n + params.weight_decay * *w);
        }
        for (b, g) in bias.iter_mut().zip(&grad_b) {
            *b -= params.learning_rate * g / n;
        }
    }

    metadata.final_loss = loss;
    metadata.trained_at = Utc::now();

    Ok(TrainedModel {
        labels,
        resample_points: normalizer.points,
        weights,
        bias,
        metadata,
    })
}

/// Borrowed weights, shared by inference and the training loop
struct ModelView<'a> {
    weights: &'a [f32],
    bias: &'a [f32],
    width: usize,
}

impl ModelView<'_> {
    fn logits(&self, features: &[f32]) -> Vec<f32> {
        self.weights
            .chunks(self.width)
            .zip(self.bias.iter())
            .map(|(row, b)| row.iter().zip(features).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect()
    }
}

fn softmax(logits: Vec<f32>) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut exps: Vec<f32> = logits.into_iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= f32::EPSILON {
        let uniform = 1.0 / exps.len().max(1) as f32;
        return vec![uniform; exps.len()];
    }
    for value in exps.iter_mut() {
        *value /= sum;
    }
    exps
}

fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((i, v)),
        })
}
