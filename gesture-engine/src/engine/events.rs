//! Engine notifications
//!
//! Every state change and asynchronous outcome is announced as an
//! [`EngineEvent`] on each subscriber's channel.

use super::state::EngineState;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Something the host may want to react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    StateChanged { from: EngineState, to: EngineState },
    GestureCreated { gesture: String },
    GestureDeleted { gesture: String },
    ExampleRecorded { gesture: String, index: usize, samples: usize },
    ExampleDeleted { gesture: String, index: usize },
    /// A capture ended with too few samples and was thrown away
    CaptureDiscarded { samples: usize, min: usize },
    ClassifierSelected { classifier: String },
    /// Classifiers reset because a gesture they knew was deleted
    ClassifiersInvalidated { classifiers: Vec<String> },
    TrainingStarted { classifier: String },
    TrainingCompleted { classifier: String },
    TrainingAborted { classifier: String },
    TrainingFailed { classifier: String, reason: String },
    Detected { label: String, confidence: f32 },
    NoMatch { best: Option<String>, confidence: f32 },
}

/// A subscriber's end of the event stream
#[derive(Debug)]
pub struct Subscription {
    pub id: u64,
    pub receiver: flume::Receiver<EngineEvent>,
}

impl Subscription {
    /// Events received so far, without blocking
    pub fn try_iter(&self) -> flume::TryIter<'_, EngineEvent> {
        self.receiver.try_iter()
    }

    /// Collect everything currently queued
    pub fn drain(&self) -> Vec<EngineEvent> {
        self.receiver.drain().collect()
    }
}

/// Fan-out list of subscriber channels
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    next_id: u64,
    senders: Vec<(u64, flume::Sender<EngineEvent>)>,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self) -> Subscription {
        let (sender, receiver) = flume::unbounded();
        let id = self.next_id;
        self.next_id += 1;
        self.senders.push((id, sender));
        Subscription { id, receiver }
    }

    /// Returns false if `id` was not subscribed
    pub(crate) fn unsubscribe(&mut self, id: u64) -> bool {
        let before = self.senders.len();
        self.senders.retain(|(sid, _)| *sid != id);
        self.senders.len() != before
    }

    /// Send to every subscriber, pruning those whose receiver is gone
    pub(crate) fn emit(&mut self, event: EngineEvent) {
        trace!(?event, "Emitting engine event");
        self.senders
            .retain(|(_, sender)| sender.send(event.clone()).is_ok());
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}
