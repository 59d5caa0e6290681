//! Deferred closure scheduling for the event loop.
//!
//! The scheduler defers closures to a later instant on the UI thread. It backs
//! [`Application::invoke_after`](crate::Application::invoke_after), which is
//! how delayed UI work (such as popping a progress dialog after a grace
//! period) is expressed without a dedicated timer callback table.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// A unique identifier for a scheduled closure.
    pub struct ScheduledId;
}

/// A boxed deferred closure.
type BoxedDeferred = Box<dyn FnOnce() + Send + 'static>;

/// Internal scheduled entry.
struct ScheduledEntry {
    /// When this closure should run.
    run_at: Instant,
    /// The closure, taken when due.
    deferred: Option<BoxedDeferred>,
}

/// An entry in the scheduler queue (min-heap by run time).
#[derive(Debug, Clone, Copy)]
struct SchedulerQueueEntry {
    id: ScheduledId,
    run_at: Instant,
}

impl PartialEq for SchedulerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.run_at == other.run_at
    }
}

impl Eq for SchedulerQueueEntry {}

impl PartialOrd for SchedulerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchedulerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other.run_at.cmp(&self.run_at)
    }
}

/// Manages closures deferred to a later instant.
pub(crate) struct DeferredScheduler {
    entries: SlotMap<ScheduledId, ScheduledEntry>,
    queue: BinaryHeap<SchedulerQueueEntry>,
}

impl DeferredScheduler {
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            queue: BinaryHeap::new(),
        }
    }

    /// Schedule a closure to run after `delay`.
    pub fn schedule<F>(&mut self, delay: Duration, deferred: F) -> ScheduledId
    where
        F: FnOnce() + Send + 'static,
    {
        let run_at = Instant::now() + delay;
        let id = self.entries.insert(ScheduledEntry {
            run_at,
            deferred: Some(Box::new(deferred)),
        });
        self.queue.push(SchedulerQueueEntry { id, run_at });
        id
    }

    /// Cancel a scheduled closure.
    ///
    /// Returns `true` if the closure had not run yet.
    pub fn cancel(&mut self, id: ScheduledId) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Get the duration until the next closure is due, if any.
    pub fn time_until_next(&mut self) -> Option<Duration> {
        // Clean up cancelled entries from the front of the queue.
        while let Some(entry) = self.queue.peek() {
            if !self.entries.contains_key(entry.id) {
                self.queue.pop();
            } else {
                break;
            }
        }

        self.queue.peek().map(|entry| {
            let now = Instant::now();
            if entry.run_at > now {
                entry.run_at - now
            } else {
                Duration::ZERO
            }
        })
    }

    /// Take all closures that are due now, in schedule order.
    pub fn take_due(&mut self) -> Vec<BoxedDeferred> {
        let now = Instant::now();
        let mut due = Vec::new();

        while let Some(entry) = self.queue.peek() {
            if entry.run_at > now {
                break;
            }

            let entry = self.queue.pop().unwrap();
            if let Some(slot) = self.entries.remove(entry.id)
                && let Some(deferred) = slot.deferred
            {
                due.push(deferred);
            }
        }

        due
    }

    /// Number of pending closures.
    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for DeferredScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// A thread-safe wrapper around `DeferredScheduler`.
pub(crate) struct SharedScheduler {
    inner: Mutex<DeferredScheduler>,
}

impl SharedScheduler {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DeferredScheduler::new()),
        }
    }

    pub fn schedule<F>(&self, delay: Duration, deferred: F) -> ScheduledId
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.lock().schedule(delay, deferred)
    }

    pub fn cancel(&self, id: ScheduledId) -> bool {
        self.inner.lock().cancel(id)
    }

    pub fn time_until_next(&self) -> Option<Duration> {
        self.inner.lock().time_until_next()
    }

    pub fn take_due(&self) -> Vec<BoxedDeferred> {
        self.inner.lock().take_due()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending_count()
    }
}
