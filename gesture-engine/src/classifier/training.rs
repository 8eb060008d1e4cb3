//! Background Training
//!
//! A training run fits a model on its own thread from an owned snapshot of
//! the gesture bank. It never touches the bank or the registry; the result
//! goes back to the engine's owner thread over a channel and is installed
//! there.

use super::model::{fit, TrainedModel, TrainingParams};
use crate::gestures::bank::TrainingSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of one training run, sent back to the owner thread
#[derive(Debug)]
pub struct TrainingReport {
    /// Job that produced this report; stale reports are ignored
    pub job_id: u64,
    pub classifier: String,
    pub result: crate::Result<TrainedModel>,
}

/// Handle to an in-flight training run
pub struct TrainingJob {
    id: u64,
    classifier: String,
    cancel: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl TrainingJob {
    /// Start training `classifier` on a worker thread
    pub fn spawn(
        id: u64,
        classifier: &str,
        set: TrainingSet,
        params: TrainingParams,
        reports: flume::Sender<TrainingReport>,
    ) -> crate::Result<Self> {
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);
        let name = classifier.to_string();

        let handle = thread::Builder::new()
            .name(format!("training-{}", classifier))
            .spawn(move || {
                let started = Instant::now();
                let result = fit(&set, &params, &worker_cancel);
                match &result {
                    Ok(model) => info!(
                        classifier = %name,
                        epochs = model.metadata.epochs_run,
                        loss = model.metadata.final_loss,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Training finished"
                    ),
                    Err(e) => debug!(classifier = %name, "Training ended without a model: {}", e),
                }

                let report = TrainingReport {
                    job_id: id,
                    classifier: name,
                    result,
                };
                if reports.send(report).is_err() {
                    warn!("Training report dropped: engine is gone");
                }
            })
            .map_err(|e| crate::Error::Training(format!("Failed to spawn training thread: {}", e)))?;

        Ok(Self {
            id,
            classifier: classifier.to_string(),
            cancel,
            thread_handle: Some(handle),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    /// Whether the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| h.is_finished())
            .unwrap_or(true)
    }

    /// Ask the worker to stop and wait for it to exit
    pub fn cancel(&mut self) {
        self.cancel.store(true, Ordering::Release);
        self.join();
    }

    /// Wait for the worker to exit
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!(classifier = %self.classifier, "Training thread panicked");
            }
        }
    }
}

impl Drop for TrainingJob {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TrainingJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingJob")
            .field("id", &self.id)
            .field("classifier", &self.classifier)
            .field("finished", &self.is_finished())
            .finish()
    }
}
