//! Lock-Free Ring Buffer for Pose Capture
//!
//! Hosts usually sample controller poses on a device or render thread while
//! the engine is driven from the application thread. This SPSC (Single
//! Producer, Single Consumer) ring buffer connects the two without locks:
//!
//! - Producer (device thread): never blocks, drops the newest input when full
//! - Consumer (engine owner thread): drains inputs in order between frames
//!
//! The core queue is `rtrb`; this module adds sequencing and statistics.

use super::types::{ContactEdge, InputEvent, PathSample};
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default ring buffer capacity (power of 2)
pub const DEFAULT_CAPACITY: usize = 1024;

/// Input slot with its arrival sequence number
#[derive(Debug, Clone, Copy)]
pub struct InputSlot {
    /// The input itself
    pub event: InputEvent,
    /// Sequence number for ordering verification
    pub sequence: u64,
}

/// Ring buffer statistics for monitoring
#[derive(Debug, Default)]
pub struct RingBufferStats {
    /// Total inputs pushed
    pub events_pushed: AtomicU64,
    /// Inputs dropped due to full buffer
    pub events_dropped: AtomicU64,
    /// Inputs successfully consumed
    pub events_consumed: AtomicU64,
    /// Peak buffer occupancy
    pub peak_occupancy: AtomicU64,
}

/// Lock-free input queue between the device thread and the engine
pub struct InputRingBuffer {
    producer: Producer<InputSlot>,
    consumer: Consumer<InputSlot>,
    stats: Arc<RingBufferStats>,
    capacity: usize,
}

impl InputRingBuffer {
    /// Create a new ring buffer with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new ring buffer. Capacity is rounded up to a power of 2.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        let (producer, consumer) = RingBuffer::new(capacity);

        Self {
            producer,
            consumer,
            stats: Arc::new(RingBufferStats::default()),
            capacity,
        }
    }

    /// Split the ring buffer into producer and consumer halves
    pub fn split(self) -> (InputProducer, InputConsumer) {
        (
            InputProducer {
                inner: self.producer,
                sequence: 0,
                stats: Arc::clone(&self.stats),
                capacity: self.capacity,
            },
            InputConsumer {
                inner: self.consumer,
                stats: Arc::clone(&self.stats),
            },
        )
    }

    /// Get statistics
    pub fn stats(&self) -> Arc<RingBufferStats> {
        Arc::clone(&self.stats)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InputRingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half of the ring buffer (device thread)
pub struct InputProducer {
    inner: Producer<InputSlot>,
    sequence: u64,
    stats: Arc<RingBufferStats>,
    capacity: usize,
}

impl InputProducer {
    /// Push an input into the ring buffer.
    ///
    /// Never blocks. If the buffer is full the input is dropped and the drop
    /// counter is incremented. Returns true if the input was queued.
    #[inline]
    pub fn push(&mut self, event: InputEvent) -> bool {
        let slot = InputSlot {
            event,
            sequence: self.sequence,
        };

        match self.inner.push(slot) {
            Ok(()) => {
                self.sequence += 1;
                self.stats.events_pushed.fetch_add(1, Ordering::Relaxed);

                let occupied = (self.capacity - self.inner.slots()) as u64;
                self.stats.peak_occupancy.fetch_max(occupied, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.stats.events_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Push a pose sample
    #[inline]
    pub fn push_pose(&mut self, sample: PathSample) -> bool {
        self.push(InputEvent::Pose(sample))
    }

    /// Push a contact edge
    #[inline]
    pub fn push_contact(&mut self, edge: ContactEdge) -> bool {
        self.push(InputEvent::Contact(edge))
    }

    /// Check available slots without pushing
    #[inline]
    pub fn available_slots(&self) -> usize {
        self.inner.slots()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Number of inputs queued so far
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Consumer half of the ring buffer (engine owner thread)
pub struct InputConsumer {
    inner: Consumer<InputSlot>,
    stats: Arc<RingBufferStats>,
}

impl InputConsumer {
    /// Pop the oldest input
    #[inline]
    pub fn pop(&mut self) -> Option<InputSlot> {
        match self.inner.pop() {
            Ok(slot) => {
                self.stats.events_consumed.fetch_add(1, Ordering::Relaxed);
                Some(slot)
            }
            Err(_) => None,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of inputs waiting
    #[inline]
    pub fn available(&self) -> usize {
        self.inner.slots()
    }

    /// Pop up to `max_count` inputs at once
    pub fn pop_batch(&mut self, max_count: usize) -> Vec<InputSlot> {
        let mut batch = Vec::with_capacity(max_count.min(self.available()));
        while batch.len() < max_count {
            match self.pop() {
                Some(slot) => batch.push(slot),
                None => break,
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::timebase::Timestamp;

    fn pose(i: u64) -> InputEvent {
        InputEvent::Pose(PathSample::at(i as f32, 0.0, 0.0, Timestamp::from_millis(i)))
    }

    #[test]
    fn test_ring_buffer_creation() {
        let buffer = InputRingBuffer::new();
        assert_eq!(buffer.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_capacity_rounds_up_to_power_of_two() {
        assert_eq!(InputRingBuffer::with_capacity(100).capacity(), 128);
        assert_eq!(InputRingBuffer::with_capacity(0).capacity(), 1);
    }

    #[test]
    fn test_ring_buffer_split() {
        let buffer = InputRingBuffer::with_capacity(64);
        let (producer, consumer) = buffer.split();

        assert!(!producer.is_full());
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_push_and_pop_preserves_order() {
        let buffer = InputRingBuffer::with_capacity(64);
        let (mut producer, mut consumer) = buffer.split();

        assert!(producer.push(pose(0)));
        assert!(producer.push_contact(ContactEdge::Engaged));
        assert!(producer.push(pose(1)));

        let batch = consumer.pop_batch(10);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].sequence, 0);
        assert_eq!(batch[1].event, InputEvent::Contact(ContactEdge::Engaged));
        assert_eq!(batch[2].sequence, 2);
        assert!(consumer.pop().is_none());
    }

    #[test]
    fn test_full_buffer_drops_and_counts() {
        let buffer = InputRingBuffer::with_capacity(4);
        let stats = buffer.stats();
        let (mut producer, mut consumer) = buffer.split();

        for i in 0..6 {
            producer.push(pose(i));
        }

        assert!(producer.is_full());
        assert_eq!(stats.events_pushed.load(Ordering::Relaxed), 4);
        assert_eq!(stats.events_dropped.load(Ordering::Relaxed), 2);
        assert_eq!(stats.peak_occupancy.load(Ordering::Relaxed), 4);

        // Dropped inputs do not consume sequence numbers
        assert_eq!(producer.sequence(), 4);
        let batch = consumer.pop_batch(10);
        assert_eq!(batch.last().map(|s| s.sequence), Some(3));
        assert_eq!(stats.events_consumed.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_pop_batch_respects_limit() {
        let buffer = InputRingBuffer::with_capacity(16);
        let (mut producer, mut consumer) = buffer.split();
        for i in 0..10 {
            producer.push(pose(i));
        }

        assert_eq!(consumer.pop_batch(4).len(), 4);
        assert_eq!(consumer.available(), 6);
    }
}
