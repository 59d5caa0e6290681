//! Event types for the Trellis event queue.

use std::fmt;

use crate::invocation::Invocation;
use crate::timer::TimerId;

/// Priority levels for internal events.
/// Higher priority events are processed first within the same queue pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Lowest priority - idle work.
    Low = 0,
    /// Normal priority - most application events.
    Normal = 1,
    /// High priority - timers and queued invocations.
    High = 2,
    /// Critical priority - shutdown.
    Critical = 3,
}

impl Default for EventPriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Internal events dispatched through the Trellis event queue.
pub enum AppEvent {
    /// A closure to execute on the UI thread (queued signal delivery,
    /// task lifecycle callbacks, blocker transitions).
    Invoke(Invocation),

    /// A timer has fired.
    Timer {
        /// The timer that fired.
        id: TimerId,
    },

    /// Request to quit the application.
    Quit,

    /// Wake up the event loop (for polling changes).
    WakeUp,
}

impl AppEvent {
    /// Get the priority of this event.
    pub fn priority(&self) -> EventPriority {
        match self {
            Self::Quit => EventPriority::Critical,
            Self::Invoke(_) => EventPriority::High,
            Self::Timer { .. } => EventPriority::High,
            Self::WakeUp => EventPriority::Normal,
        }
    }
}

// Manual Debug since `Invocation` holds an opaque closure.
impl fmt::Debug for AppEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invoke(inv) => f.debug_tuple("Invoke").field(inv).finish(),
            Self::Timer { id } => f.debug_struct("Timer").field("id", id).finish(),
            Self::Quit => write!(f, "Quit"),
            Self::WakeUp => write!(f, "WakeUp"),
        }
    }
}

/// A wrapper for prioritized events used in the internal queue.
#[derive(Debug)]
pub(crate) struct PrioritizedEvent {
    pub event: AppEvent,
    pub priority: EventPriority,
    /// Sequence number for stable ordering of same-priority events.
    pub sequence: u64,
}

impl PrioritizedEvent {
    pub fn new(event: AppEvent, sequence: u64) -> Self {
        let priority = event.priority();
        Self {
            event,
            priority,
            sequence,
        }
    }
}

impl PartialEq for PrioritizedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for PrioritizedEvent {}

impl PartialOrd for PrioritizedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrioritizedEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Higher priority first, then lower sequence (older) first.
        // Note: BinaryHeap is a max-heap, so higher priority must be "greater".
        match self.priority.cmp(&other.priority) {
            std::cmp::Ordering::Equal => other.sequence.cmp(&self.sequence),
            ord => ord,
        }
    }
}
