//! Fixed-capacity lossy event ring
//!
//! Multi-producer, single-consumer. Both cursors are monotonically
//! increasing counters reduced modulo the capacity only at slot access,
//! so repeated wrap-arounds stay consistent. `push` claims a sequence
//! number with one `fetch_add` and stores the packed event into its
//! slot; a full buffer simply overwrites the oldest unread entry.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

use crate::{Event, EventKind};

/// Wait-free notification ring shared between the real-time thread and
/// the control thread.
///
/// The queue is an explicitly constructed instance owned by the
/// application context and handed to producers and the single consumer
/// by `Arc`; there is no process-wide singleton.
pub struct EventQueue {
    slots: Box<[AtomicU64]>,
    capacity: u64,
    write: CachePadded<AtomicU64>,
    read: CachePadded<AtomicU64>,
}

impl EventQueue {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a queue holding at most `capacity` unread events.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event queue capacity must be non-zero");
        let slots = (0..capacity)
            .map(|_| AtomicU64::new(Event::NONE.pack()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            capacity: capacity as u64,
            write: CachePadded::new(AtomicU64::new(0)),
            read: CachePadded::new(AtomicU64::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Push an event. Never blocks, never allocates; callable from the
    /// real-time thread. When the buffer is full the oldest unread slot
    /// is overwritten.
    pub fn push(&self, kind: EventKind, value: i32) {
        let seq = self.write.fetch_add(1, Ordering::AcqRel);
        let slot = &self.slots[(seq % self.capacity) as usize];
        slot.store(Event::new(kind, value).pack(), Ordering::Release);
    }

    /// Pop the next unread event in FIFO order, or the `EventKind::None`
    /// sentinel when the queue is empty. Single consumer only.
    pub fn pop(&self) -> Event {
        let write = self.write.load(Ordering::Acquire);
        let mut read = self.read.load(Ordering::Relaxed);

        if read == write {
            return Event::NONE;
        }

        // Overflow: skip entries the writer has already reclaimed, so a
        // drain yields exactly the most recent `capacity` events.
        if write - read > self.capacity {
            read = write - self.capacity;
        }

        let event = Event::unpack(self.slots[(read % self.capacity) as usize].load(Ordering::Acquire));
        self.read.store(read + 1, Ordering::Release);
        event
    }

    /// Number of unread events, saturated at the capacity.
    pub fn len(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        (write - read).min(self.capacity) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
