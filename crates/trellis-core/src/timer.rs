//! Timer system for Trellis.
//!
//! Provides one-shot and repeating timers that integrate with the event queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::error::{Result, TimerError};

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

/// The type of timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fires once after the specified duration.
    OneShot,
    /// Fires repeatedly at the specified interval.
    Repeating,
}

/// Internal timer data.
#[derive(Debug)]
struct TimerData {
    /// When this timer should next fire.
    next_fire: Instant,
    /// The interval for repeating timers.
    interval: Duration,
    /// The kind of timer.
    kind: TimerKind,
    /// Whether this timer is active.
    active: bool,
}

/// An entry in the timer queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other.fire_time.cmp(&self.fire_time)
    }
}

/// Manages all timers for the application.
pub(crate) struct TimerManager {
    /// All registered timers.
    timers: SlotMap<TimerId, TimerData>,
    /// Priority queue of pending timer fires (min-heap by fire time).
    queue: BinaryHeap<TimerQueueEntry>,
}

impl TimerManager {
    /// Create a new timer manager.
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
            queue: BinaryHeap::new(),
        }
    }

    /// Start a one-shot timer that fires after the specified duration.
    pub fn start_one_shot(&mut self, duration: Duration) -> TimerId {
        self.start(duration, TimerKind::OneShot)
    }

    /// Start a repeating timer that fires at the specified interval.
    pub fn start_repeating(&mut self, interval: Duration) -> TimerId {
        self.start(interval, TimerKind::Repeating)
    }

    fn start(&mut self, interval: Duration, kind: TimerKind) -> TimerId {
        let next_fire = Instant::now() + interval;

        let data = TimerData {
            next_fire,
            interval,
            kind,
            active: true,
        };

        let id = self.timers.insert(data);
        self.queue.push(TimerQueueEntry {
            id,
            fire_time: next_fire,
        });

        id
    }

    /// Stop and remove a timer.
    pub fn stop(&mut self, id: TimerId) -> Result<()> {
        if let Some(timer) = self.timers.get_mut(id) {
            timer.active = false;
            self.timers.remove(id);
            Ok(())
        } else {
            Err(TimerError::InvalidTimerId.into())
        }
    }

    /// Check if a timer is currently active.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.get(id).is_some_and(|t| t.active)
    }

    /// Get the duration until the next timer fires, if any.
    pub fn time_until_next(&mut self) -> Option<Duration> {
        // Clean up any inactive timers from the front of the queue.
        while let Some(entry) = self.queue.peek() {
            if !self.timers.get(entry.id).is_some_and(|t| t.active) {
                self.queue.pop();
            } else {
                break;
            }
        }

        self.queue.peek().map(|entry| {
            let now = Instant::now();
            if entry.fire_time > now {
                entry.fire_time - now
            } else {
                Duration::ZERO
            }
        })
    }

    /// Collect all timers that should fire now.
    ///
    /// One-shot timers are removed; repeating timers are rescheduled.
    pub fn take_expired(&mut self) -> Vec<TimerId> {
        let now = Instant::now();
        let mut fired = Vec::new();

        while let Some(entry) = self.queue.peek() {
            if entry.fire_time > now {
                break;
            }

            let entry = self.queue.pop().unwrap();
            let id = entry.id;

            let Some(timer) = self.timers.get_mut(id) else {
                continue;
            };

            if !timer.active {
                continue;
            }

            tracing::trace!(target: "trellis_core::timer", ?id, "timer fired");
            fired.push(id);

            match timer.kind {
                TimerKind::OneShot => {
                    timer.active = false;
                    self.timers.remove(id);
                }
                TimerKind::Repeating => {
                    timer.next_fire = now + timer.interval;
                    self.queue.push(TimerQueueEntry {
                        id,
                        fire_time: timer.next_fire,
                    });
                }
            }
        }

        fired
    }

    /// Get the number of active timers.
    pub fn active_count(&self) -> usize {
        self.timers.iter().filter(|(_, t)| t.active).count()
    }
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}

/// A thread-safe wrapper around `TimerManager` for use from the application.
pub(crate) struct SharedTimerManager {
    inner: Mutex<TimerManager>,
}

impl SharedTimerManager {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TimerManager::new()),
        }
    }

    pub fn start_one_shot(&self, duration: Duration) -> TimerId {
        self.inner.lock().start_one_shot(duration)
    }

    pub fn start_repeating(&self, interval: Duration) -> TimerId {
        self.inner.lock().start_repeating(interval)
    }

    pub fn stop(&self, id: TimerId) -> Result<()> {
        self.inner.lock().stop(id)
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.inner.lock().is_active(id)
    }

    pub fn time_until_next(&self) -> Option<Duration> {
        self.inner.lock().time_until_next()
    }

    pub fn take_expired(&self) -> Vec<TimerId> {
        self.inner.lock().take_expired()
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().active_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_fires_once() {
        let mut manager = TimerManager::new();
        let id = manager.start_one_shot(Duration::from_millis(5));

        std::thread::sleep(Duration::from_millis(15));
        let fired = manager.take_expired();
        assert_eq!(fired, vec![id]);

        // The timer is gone after firing.
        assert!(!manager.is_active(id));
        assert!(manager.take_expired().is_empty());
    }

    #[test]
    fn repeating_reschedules() {
        let mut manager = TimerManager::new();
        let id = manager.start_repeating(Duration::from_millis(5));

        std::thread::sleep(Duration::from_millis(15));
        let fired = manager.take_expired();
        assert_eq!(fired, vec![id]);
        assert!(manager.is_active(id));

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(manager.take_expired(), vec![id]);
    }

    #[test]
    fn stop_removes_timer() {
        let mut manager = TimerManager::new();
        let id = manager.start_repeating(Duration::from_millis(5));

        manager.stop(id).unwrap();
        assert!(!manager.is_active(id));
        assert_eq!(manager.active_count(), 0);

        // Stopping again is an error.
        assert!(manager.stop(id).is_err());
    }

    #[test]
    fn time_until_next_skips_stopped() {
        let mut manager = TimerManager::new();
        let id = manager.start_one_shot(Duration::from_secs(60));
        assert!(manager.time_until_next().is_some());

        manager.stop(id).unwrap();
        assert!(manager.time_until_next().is_none());
    }
}
