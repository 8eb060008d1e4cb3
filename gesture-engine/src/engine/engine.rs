//! Recognition Engine
//!
//! Owns the gesture bank, the classifier registry and the state machine, and
//! is driven from a single owner thread. Training results arrive from the
//! worker over a channel and are installed when the owner calls
//! [`RecognitionEngine::poll`].

use super::events::{EngineEvent, Subscribers, Subscription};
use super::state::{EngineState, Trigger};
use crate::app::config::Config;
use crate::capture::ring_buffer::{InputConsumer, InputRingBuffer};
use crate::capture::session::CaptureSession;
use crate::capture::types::{ContactEdge, InputEvent, PathSample};
use crate::classifier::classifier::Classification;
use crate::classifier::model::TrainedModel;
use crate::classifier::registry::{ClassifierRegistry, SharedRegistry};
use crate::classifier::training::{TrainingJob, TrainingReport};
use crate::gestures::bank::GestureBank;
use crate::gestures::example::GestureExample;
use crate::gestures::storage::GestureStore;
use crate::time::timebase::Timestamp;
use glam::Vec3;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Gesture capture and recognition engine
pub struct RecognitionEngine {
    config: Config,
    state: EngineState,
    bank: GestureBank,
    registry: SharedRegistry,
    store: Option<Box<dyn GestureStore>>,
    recording_target: Option<String>,
    session: Option<CaptureSession>,
    job: Option<TrainingJob>,
    next_job_id: u64,
    reports_tx: flume::Sender<TrainingReport>,
    reports_rx: flume::Receiver<TrainingReport>,
    subscribers: Subscribers,
    detection_log: String,
}

impl RecognitionEngine {
    /// Create an engine with an empty bank and no persistence
    pub fn new(config: Config) -> crate::Result<Self> {
        config.validate()?;
        let registry = ClassifierRegistry::with_names(config.classifiers.default_names.iter().cloned());
        Ok(Self::build(config, GestureBank::new(), registry, None))
    }

    /// Create an engine backed by `store`, loading its bank and trained models
    pub fn open(config: Config, store: impl GestureStore + 'static) -> crate::Result<Self> {
        config.validate()?;
        let bank = store.load_bank()?;
        info!(
            gestures = bank.len(),
            examples = bank.example_count(),
            "Opened gesture store"
        );

        let mut engine = Self::build(config, bank, ClassifierRegistry::new(), Some(Box::new(store)));
        engine.refresh_classifiers()?;
        Ok(engine)
    }

    fn build(
        config: Config,
        bank: GestureBank,
        registry: ClassifierRegistry,
        store: Option<Box<dyn GestureStore>>,
    ) -> Self {
        let (reports_tx, reports_rx) = flume::unbounded();
        Self {
            config,
            state: EngineState::Idle,
            bank,
            registry: registry.into_shared(),
            store,
            recording_target: None,
            session: None,
            job: None,
            next_job_id: 0,
            reports_tx,
            reports_rx,
            subscribers: Subscribers::default(),
            detection_log: String::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn bank(&self) -> &GestureBank {
        &self.bank
    }

    /// Handle to the classifier registry for readers on other threads
    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    pub fn subscribe(&mut self) -> Subscription {
        self.subscribers.subscribe()
    }

    /// Stop delivering events to a subscription. Returns false for unknown ids.
    pub fn unsubscribe(&mut self, id: u64) -> bool {
        self.subscribers.unsubscribe(id)
    }

    // ---- gestures ----

    /// Create a gesture and return its name
    pub fn create_gesture(&mut self, name: Option<&str>) -> crate::Result<String> {
        let name = self.bank.create(name)?.name().to_string();
        info!(gesture = %name, "Created gesture");
        self.emit(EngineEvent::GestureCreated {
            gesture: name.clone(),
        });
        Ok(name)
    }

    /// Delete a gesture with all of its examples.
    ///
    /// Classifiers trained on it lose their model. The gesture currently
    /// targeted for recording cannot be deleted.
    pub fn delete_gesture(&mut self, name: &str) -> crate::Result<()> {
        if self.recording_target.as_deref() == Some(name) {
            return Err(crate::Error::Busy(name.to_string()));
        }
        let removed = self.bank.delete(name)?;
        info!(gesture = %name, examples = removed.example_count(), "Deleted gesture");

        let invalidated = self.registry.write().invalidate_label(name);
        self.emit(EngineEvent::GestureDeleted {
            gesture: name.to_string(),
        });
        if !invalidated.is_empty() {
            info!(classifiers = ?invalidated, "Classifiers need retraining");
            self.emit(EngineEvent::ClassifiersInvalidated {
                classifiers: invalidated,
            });
        }
        Ok(())
    }

    /// Gesture names in creation order
    pub fn list_gestures(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.bank.names()
    }

    /// Recorded examples of a gesture, oldest first
    pub fn examples(&self, gesture: &str) -> crate::Result<&[GestureExample]> {
        self.bank
            .get(gesture)
            .map(|g| g.examples())
            .ok_or_else(|| crate::Error::NotFound(format!("gesture '{}'", gesture)))
    }

    /// Delete one example by its position in [`examples`](Self::examples)
    pub fn delete_example(&mut self, gesture: &str, index: usize) -> crate::Result<GestureExample> {
        let example = self.bank.remove_example(gesture, index)?;
        debug!(gesture = %gesture, index, "Deleted example");
        self.emit(EngineEvent::ExampleDeleted {
            gesture: gesture.to_string(),
            index,
        });
        Ok(example)
    }

    // ---- classifiers ----

    /// Classifier names in registration order
    pub fn list_classifiers(&self) -> Vec<String> {
        self.registry.read().names().map(String::from).collect()
    }

    pub fn register_classifier(&mut self, name: &str) -> crate::Result<()> {
        self.registry.write().register(name)?;
        Ok(())
    }

    /// Remove a classifier and its saved model
    pub fn delete_classifier(&mut self, name: &str) -> crate::Result<()> {
        if self.job.as_ref().map(|j| j.classifier() == name).unwrap_or(false) {
            return Err(crate::Error::Busy(name.to_string()));
        }
        self.registry.write().remove(name)?;
        if let Some(store) = self.store.as_mut() {
            store.delete_model(name)?;
        }
        info!(classifier = %name, "Deleted classifier");
        Ok(())
    }

    pub fn select_classifier(&mut self, name: &str) -> crate::Result<()> {
        self.registry.write().select(name)?;
        self.emit(EngineEvent::ClassifierSelected {
            classifier: name.to_string(),
        });
        Ok(())
    }

    pub fn current_classifier(&self) -> Option<String> {
        self.registry.read().current().map(String::from)
    }

    /// Whether a classifier has a trained model
    pub fn is_trained(&self, name: &str) -> crate::Result<bool> {
        self.registry
            .read()
            .get(name)
            .map(|c| c.is_trained())
            .ok_or_else(|| crate::Error::NotFound(format!("classifier '{}'", name)))
    }

    /// Re-register the configured classifiers and load any saved models that
    /// are not already trained in memory. Returns the classifier names.
    pub fn refresh_classifiers(&mut self) -> crate::Result<Vec<String>> {
        let mut registry = self.registry.write();
        for name in &self.config.classifiers.default_names {
            if !registry.contains(name) {
                registry.register(name.clone())?;
            }
        }

        if let Some(store) = self.store.as_ref() {
            for name in store.list_models()? {
                if registry.get(&name).map(|c| c.is_trained()).unwrap_or(false) {
                    continue;
                }
                let loaded = store
                    .load_model(&name)
                    .and_then(|model| {
                        model.validate()?;
                        check_labels(&self.bank, &model)?;
                        Ok(model)
                    });
                match loaded {
                    Ok(model) => {
                        debug!(classifier = %name, labels = model.labels.len(), "Restored trained model");
                        registry.restore(&name, model);
                    }
                    Err(e) => warn!(classifier = %name, "Skipping saved model: {}", e),
                }
            }
        }

        Ok(registry.names().map(String::from).collect())
    }

    // ---- training ----

    /// Start training `classifier` on the current bank in the background.
    ///
    /// Fails with `Busy` if a run is already in flight (that run continues),
    /// and with `InsufficientData` if no gesture has an example.
    pub fn begin_training(&mut self, classifier: &str) -> crate::Result<()> {
        if let Some(job) = &self.job {
            return Err(crate::Error::Busy(job.classifier().to_string()));
        }
        self.state.next(Trigger::BeginTraining)?;
        if !self.registry.read().contains(classifier) {
            return Err(crate::Error::NotFound(format!("classifier '{}'", classifier)));
        }

        let set = self.bank.snapshot();
        if set.is_empty() {
            return Err(crate::Error::InsufficientData);
        }

        let id = self.next_job_id;
        self.next_job_id += 1;
        info!(
            classifier = %classifier,
            gestures = set.classes.len(),
            examples = set.example_count(),
            "Starting training"
        );
        let job = TrainingJob::spawn(
            id,
            classifier,
            set,
            self.config.training_params(),
            self.reports_tx.clone(),
        )?;
        self.job = Some(job);

        self.apply(Trigger::BeginTraining)?;
        self.emit(EngineEvent::TrainingStarted {
            classifier: classifier.to_string(),
        });
        Ok(())
    }

    /// Cancel the in-flight run and return to idle.
    ///
    /// The classifier keeps whatever model it had before training began.
    pub fn abort_training(&mut self) -> crate::Result<()> {
        self.state.next(Trigger::TrainingAborted)?;
        let classifier = match self.job.take() {
            Some(mut job) => {
                job.cancel();
                job.classifier().to_string()
            }
            None => String::new(),
        };

        info!(classifier = %classifier, "Training aborted");
        self.apply(Trigger::TrainingAborted)?;
        self.emit(EngineEvent::TrainingAborted { classifier });
        Ok(())
    }

    /// Install finished training results. Returns how many runs finished.
    pub fn poll(&mut self) -> usize {
        let mut finished = 0;
        while let Ok(report) = self.reports_rx.try_recv() {
            if self.handle_report(report) {
                finished += 1;
            }
        }
        finished
    }

    /// Block until the in-flight run finishes, then install it.
    ///
    /// Returns immediately when nothing is training. Fails with `Busy` if the
    /// run is still going when `timeout` elapses; the run is not cancelled.
    pub fn wait_for_training(&mut self, timeout: Duration) -> crate::Result<()> {
        let deadline = Instant::now() + timeout;
        while let Some(classifier) = self.job.as_ref().map(|j| j.classifier().to_string()) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.reports_rx.recv_timeout(remaining) {
                Ok(report) => {
                    self.handle_report(report);
                }
                Err(flume::RecvTimeoutError::Timeout) => {
                    return Err(crate::Error::Busy(classifier));
                }
                Err(flume::RecvTimeoutError::Disconnected) => {
                    return Err(crate::Error::Training("training channel closed".to_string()));
                }
            }
        }
        Ok(())
    }

    fn handle_report(&mut self, report: TrainingReport) -> bool {
        let current = self
            .job
            .as_ref()
            .map(|j| j.id() == report.job_id)
            .unwrap_or(false);
        if !current {
            debug!(job = report.job_id, classifier = %report.classifier, "Discarding stale training report");
            return false;
        }
        if let Some(mut job) = self.job.take() {
            job.join();
        }

        let classifier = report.classifier;
        let outcome = report
            .result
            .and_then(|model| self.install_model(&classifier, model));

        if let Err(e) = self.apply(Trigger::TrainingCompleted) {
            warn!("Unexpected state after training: {}", e);
        }
        match outcome {
            Ok(()) => {
                info!(classifier = %classifier, "Installed trained model");
                self.emit(EngineEvent::TrainingCompleted { classifier });
            }
            Err(e) => {
                warn!(classifier = %classifier, "Training failed: {}", e);
                self.emit(EngineEvent::TrainingFailed {
                    classifier,
                    reason: e.to_string(),
                });
            }
        }
        true
    }

    fn install_model(&mut self, classifier: &str, model: TrainedModel) -> crate::Result<()> {
        check_labels(&self.bank, &model)?;
        self.registry.write().install(classifier, Arc::new(model))
    }

    // ---- detection ----

    pub fn begin_detect(&mut self) -> crate::Result<()> {
        self.apply(Trigger::BeginDetect)?;
        self.detection_log.clear();
        Ok(())
    }

    /// Leave detection. An open capture is discarded.
    pub fn end_detect(&mut self) -> crate::Result<()> {
        self.apply(Trigger::EndDetect)?;
        self.session = None;
        Ok(())
    }

    /// Classify a path with the current classifier
    pub fn classify(&self, path: &[PathSample]) -> crate::Result<Classification> {
        let registry = self.registry.read();
        let classifier = registry
            .current_classifier()
            .ok_or(crate::Error::NoClassifierSelected)?;
        classifier.classify(path, self.config.detection.confidence_floor)
    }

    /// Classify the samples of the open capture so far
    pub fn classify_in_progress(&self) -> crate::Result<Classification> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| crate::Error::NotFound("open capture session".to_string()))?;
        self.classify(session.samples())
    }

    /// Human-readable result of the latest detection
    pub fn detection_log(&self) -> &str {
        &self.detection_log
    }

    // ---- recording ----

    /// Choose the gesture new captures are recorded into
    pub fn enter_recording_target(&mut self, gesture: &str) -> crate::Result<()> {
        self.state.next(Trigger::EnterRecordingTarget)?;
        if !self.bank.contains(gesture) {
            return Err(crate::Error::NotFound(format!("gesture '{}'", gesture)));
        }
        self.recording_target = Some(gesture.to_string());
        self.apply(Trigger::EnterRecordingTarget)?;
        debug!(gesture = %gesture, "Recording target set");
        Ok(())
    }

    pub fn leave_to_main_menu(&mut self) -> crate::Result<()> {
        self.apply(Trigger::LeaveToMainMenu)?;
        self.recording_target = None;
        Ok(())
    }

    /// The gesture captures are recorded into, if any
    pub fn recording_target(&self) -> Option<&str> {
        self.recording_target.as_deref()
    }

    /// Trigger pressed: start a capture
    pub fn contact_engaged(&mut self) -> crate::Result<()> {
        if self.state == EngineState::Detecting {
            if self.session.is_some() {
                return Err(crate::Error::InvalidTransition {
                    state: self.state,
                    trigger: Trigger::ContactEngaged,
                });
            }
            self.session = Some(CaptureSession::new(None));
            return Ok(());
        }

        self.apply(Trigger::ContactEngaged)?;
        self.session = Some(CaptureSession::new(self.recording_target.clone()));
        Ok(())
    }

    /// Trigger released: finish the capture.
    ///
    /// While recording, a long enough path becomes a new example; a short one
    /// is discarded and announced as `CaptureDiscarded`. While detecting, the
    /// path is classified and announced as `Detected` or `NoMatch`.
    pub fn contact_released(&mut self) -> crate::Result<()> {
        if self.state == EngineState::Detecting {
            return self.finish_detection();
        }

        self.apply(Trigger::ContactReleased)?;
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let stats = session.stats();
        let target = session.target().map(String::from);

        match session.finish(self.min_samples()) {
            Ok(example) => {
                let Some(gesture) = target else {
                    return Ok(());
                };
                let samples = example.len();
                let index = self.bank.append_example(&gesture, example)?;
                info!(
                    gesture = %gesture,
                    index,
                    samples,
                    dropped = stats.out_of_order,
                    "Recorded example"
                );
                self.emit(EngineEvent::ExampleRecorded {
                    gesture,
                    index,
                    samples,
                });
                Ok(())
            }
            Err(crate::Error::TooShort { samples, min }) => {
                info!(samples, min, "Capture too short, discarded");
                self.emit(EngineEvent::CaptureDiscarded { samples, min });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn finish_detection(&mut self) -> crate::Result<()> {
        let session = self.session.take().ok_or(crate::Error::InvalidTransition {
            state: self.state,
            trigger: Trigger::ContactReleased,
        })?;

        let min = self.min_samples();
        if session.len() < min {
            info!(samples = session.len(), min, "Detection path too short, discarded");
            self.detection_log = format!("Path too short ({} samples)", session.len());
            self.emit(EngineEvent::CaptureDiscarded {
                samples: session.len(),
                min,
            });
            return Ok(());
        }

        match self.classify(session.samples()) {
            Ok(Classification::Match { label, confidence }) => {
                info!(gesture = %label, confidence, "Detected gesture");
                self.detection_log = format!("{} ({:.2})", label, confidence);
                self.emit(EngineEvent::Detected { label, confidence });
                Ok(())
            }
            Ok(Classification::NoMatch { best, confidence }) => {
                debug!(best = ?best, confidence, "No gesture matched");
                self.detection_log = match &best {
                    Some(best) => format!("No match (closest {} at {:.2})", best, confidence),
                    None => "No match".to_string(),
                };
                self.emit(EngineEvent::NoMatch { best, confidence });
                Ok(())
            }
            Err(e) => {
                self.detection_log = e.to_string();
                Err(e)
            }
        }
    }

    /// Feed a controller position. Ignored unless a capture is open.
    pub fn push_pose(&mut self, position: Vec3, t: Timestamp) -> bool {
        self.push_sample(PathSample::new(position, t))
    }

    pub fn push_sample(&mut self, sample: PathSample) -> bool {
        match self.session.as_mut() {
            Some(session) => session.push(sample),
            None => false,
        }
    }

    /// Samples of the open capture, if any
    pub fn capture_in_progress(&self) -> Option<&[PathSample]> {
        self.session.as_ref().map(|s| s.samples())
    }

    /// A device input buffer sized by `capture.ring_buffer_size`.
    ///
    /// Hand the producer half to the device thread and pass the consumer
    /// to [`RecognitionEngine::drain_inputs`].
    pub fn input_buffer(&self) -> InputRingBuffer {
        InputRingBuffer::with_capacity(self.config.capture.ring_buffer_size)
    }

    /// Apply every queued input from a device thread, in order.
    ///
    /// Contact edges that make no sense in the current state are skipped.
    /// Returns the number of inputs consumed.
    pub fn drain_inputs(&mut self, inputs: &mut InputConsumer) -> usize {
        let mut consumed = 0;
        while let Some(slot) = inputs.pop() {
            consumed += 1;
            let result = match slot.event {
                InputEvent::Pose(sample) => {
                    self.push_sample(sample);
                    Ok(())
                }
                InputEvent::Contact(ContactEdge::Engaged) => self.contact_engaged(),
                InputEvent::Contact(ContactEdge::Released) => self.contact_released(),
            };
            match result {
                Ok(()) => {}
                Err(e @ crate::Error::InvalidTransition { .. }) => {
                    debug!(sequence = slot.sequence, "Ignoring input: {}", e)
                }
                Err(e) => warn!(sequence = slot.sequence, "Input failed: {}", e),
            }
        }
        consumed
    }

    // ---- persistence ----

    /// Write the bank and trained models to the store, if there is one
    pub fn save(&mut self) -> crate::Result<()> {
        let Some(store) = self.store.as_mut() else {
            return Ok(());
        };

        store.save_bank(&self.bank)?;
        let saved = store.list_models()?;
        let registry = self.registry.read();
        for classifier in registry.iter() {
            match classifier.model() {
                Some(model) => store.save_model(classifier.name(), &model)?,
                None if saved.iter().any(|n| n == classifier.name()) => {
                    store.delete_model(classifier.name())?
                }
                None => {}
            }
        }
        for name in saved.iter().filter(|n| !registry.contains(n)) {
            store.delete_model(name)?;
        }
        debug!(gestures = self.bank.len(), "Saved engine state");
        Ok(())
    }

    /// Cancel any training run and save
    pub fn shutdown(mut self) -> crate::Result<()> {
        if let Some(mut job) = self.job.take() {
            job.cancel();
        }
        self.save()
    }

    // ---- internals ----

    fn min_samples(&self) -> usize {
        self.config
            .capture
            .min_samples
            .max(crate::analysis::MIN_PATH_SAMPLES)
    }

    fn apply(&mut self, trigger: Trigger) -> crate::Result<()> {
        let from = self.state;
        let to = from.next(trigger)?;
        self.state = to;
        if from != to {
            debug!(%from, %to, %trigger, "State changed");
            self.emit(EngineEvent::StateChanged { from, to });
        }
        Ok(())
    }

    fn emit(&mut self, event: EngineEvent) {
        self.subscribers.emit(event);
    }
}

impl std::fmt::Debug for RecognitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionEngine")
            .field("state", &self.state)
            .field("gestures", &self.bank.len())
            .field("recording_target", &self.recording_target)
            .field("job", &self.job)
            .finish()
    }
}

fn check_labels(bank: &GestureBank, model: &TrainedModel) -> crate::Result<()> {
    match model.labels.iter().find(|l| !bank.contains(l)) {
        Some(missing) => Err(crate::Error::Training(format!(
            "gesture '{}' no longer exists",
            missing
        ))),
        None => Ok(()),
    }
}
