//! Signal/slot system for Trellis.
//!
//! This module provides a type-safe signal/slot mechanism for inter-object
//! communication. Signals are emitted when state changes, and connected slots
//! (callbacks) are invoked in response.
//!
//! # Connection Types
//!
//! - **Direct**: Slot is called immediately in the emitting thread
//! - **Queued**: Slot execution is deferred to the UI event loop (cross-thread safe)
//! - **Auto**: Direct if same thread, Queued otherwise (default)
//! - **BlockingQueued**: Like Queued, but blocks until the slot completes
//!
//! Queued delivery is how the framework upholds its threading guarantee:
//! a background thread emitting a signal whose slot lives on the UI thread
//! never runs that slot itself - the invocation is posted to the event queue
//! and executed by the UI thread in order.
//!
//! # Example
//!
//! ```
//! use trellis_core::Signal;
//!
//! let text_changed = Signal::<String>::new();
//!
//! let conn_id = text_changed.connect(|text| {
//!     println!("Text changed to: {}", text);
//! });
//!
//! text_changed.emit("Hello, World!".to_string());
//!
//! text_changed.disconnect(conn_id);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::app;
use crate::event::AppEvent;
use crate::invocation::{CompletionWaiter, Invocation, completion_pair};

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via
    /// [`Signal::disconnect`]. The ID remains valid until the connection is
    /// explicitly disconnected or the signal is dropped.
    pub struct ConnectionId;
}

/// Specifies how a connected slot should be invoked when the signal is emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionType {
    /// Invoke the slot immediately in the current thread.
    Direct,

    /// Queue the slot invocation to the UI event loop.
    Queued,

    /// Automatically choose Direct or Queued based on thread affinity.
    ///
    /// - Same thread as the connection: Direct invocation
    /// - Different thread: Queued invocation
    #[default]
    Auto,

    /// Like Queued, but blocks the emitting thread until the slot completes.
    ///
    /// # Warning
    ///
    /// Emitting with a `BlockingQueued` connection from the thread that will
    /// execute the slot deadlocks: the emit waits for the event loop, and the
    /// event loop waits for the emit to return.
    BlockingQueued,
}

/// Internal storage for a single connection.
struct Connection<Args> {
    /// The slot function to invoke (Arc-wrapped for safe cross-thread capture).
    slot: Arc<dyn Fn(&Args) + Send + Sync>,
    /// How to invoke this slot.
    connection_type: ConnectionType,
    /// The thread this connection was created on (for Auto).
    target_thread: ThreadId,
}

/// A type-safe signal that can have multiple connected slots.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for
///   signals with no arguments, or a tuple for multiple arguments.
///
/// # Thread Safety
///
/// `Signal<Args>` is `Send + Sync` and can be safely shared between threads.
/// The [`ConnectionType`] determines how slots are invoked across thread
/// boundaries.
pub struct Signal<Args> {
    /// All active connections.
    connections: Mutex<SlotMap<ConnectionId, Connection<Args>>>,
    /// Whether signal emission is temporarily blocked.
    blocked: AtomicBool,
}

impl<Args: Clone + Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Clone + Send + 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// The slot is invoked with `ConnectionType::Auto`: directly when the
    /// emitting thread matches the connecting thread, queued otherwise.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect later.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connect_with_type(slot, ConnectionType::Auto)
    }

    /// Connect a slot with a specific connection type.
    pub fn connect_with_type<F>(&self, slot: F, connection_type: ConnectionType) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let connection = Connection {
            slot: Arc::new(slot),
            connection_type,
            target_thread: std::thread::current().id(),
        };
        self.connections.lock().insert(connection)
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` do nothing. Useful during
    /// initialization or batch updates to prevent cascading notifications.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots.
    #[tracing::instrument(skip_all, target = "trellis_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: "trellis_core::signal", "signal blocked, skipping emit");
            return;
        }

        let current_thread = std::thread::current().id();
        let connections = self.connections.lock();
        tracing::trace!(
            target: "trellis_core::signal",
            connection_count = connections.len(),
            "emitting signal"
        );

        // Collect blocking waiters to wait on after releasing the lock.
        let mut blocking_waiters = Vec::new();

        for (_, conn) in connections.iter() {
            match conn.connection_type {
                ConnectionType::Direct => {
                    (conn.slot)(&args);
                }
                ConnectionType::Auto => {
                    if conn.target_thread == current_thread {
                        (conn.slot)(&args);
                    } else {
                        queue_invocation(conn.slot.clone(), args.clone());
                    }
                }
                ConnectionType::Queued => {
                    queue_invocation(conn.slot.clone(), args.clone());
                }
                ConnectionType::BlockingQueued => {
                    if let Some(waiter) = queue_invocation_blocking(conn.slot.clone(), args.clone())
                    {
                        blocking_waiters.push(waiter);
                    }
                }
            }
        }

        // Release the lock before waiting on blocking connections.
        drop(connections);

        for waiter in blocking_waiters {
            waiter.wait();
        }
    }

    /// Emit with explicit queuing through the event loop.
    ///
    /// Forces all slots to be invoked asynchronously regardless of their
    /// connection type. Useful to defer handling and avoid re-entrancy.
    ///
    /// Returns the number of slots queued, or 0 if the signal is blocked.
    pub fn emit_queued(&self, args: Args) -> usize {
        if self.is_blocked() {
            return 0;
        }

        let connections = self.connections.lock();
        let count = connections.len();

        for (_, conn) in connections.iter() {
            queue_invocation(conn.slot.clone(), args.clone());
        }

        count
    }
}

/// Queue a slot invocation onto the UI thread.
fn queue_invocation<Args: Clone + Send + 'static>(
    slot: Arc<dyn Fn(&Args) + Send + Sync>,
    args: Args,
) {
    app::post_invocation(move || {
        slot(&args);
    });
}

/// Queue a slot invocation with a blocking wait.
fn queue_invocation_blocking<Args: Clone + Send + 'static>(
    slot: Arc<dyn Fn(&Args) + Send + Sync>,
    args: Args,
) -> Option<CompletionWaiter> {
    let Some(application) = crate::Application::try_instance() else {
        // No event loop - execute immediately, nothing to wait for.
        tracing::trace!(
            target: "trellis_core::signal",
            "no event loop for blocking queued slot, executing inline"
        );
        slot(&args);
        return None;
    };

    let (handle, waiter) = completion_pair();
    let invocation = Invocation::with_completion(
        move || {
            slot(&args);
        },
        handle,
    );

    match application.post_event(AppEvent::Invoke(invocation)) {
        Ok(()) => Some(waiter),
        Err(_) => None,
    }
}

// Signal is Send + Sync when Args is Send.
unsafe impl<Args: Send> Send for Signal<Args> {}
unsafe impl<Args: Send> Sync for Signal<Args> {}

/// RAII guard that disconnects a signal connection when dropped.
///
/// Holds a reference to the signal, so the signal must outlive the guard.
///
/// # Example
///
/// ```
/// use trellis_core::Signal;
/// use trellis_core::signal::ConnectionGuard;
///
/// let signal = Signal::<i32>::new();
/// {
///     let _guard = ConnectionGuard::new(&signal, signal.connect(|_| {}));
///     assert_eq!(signal.connection_count(), 1);
/// }
/// assert_eq!(signal.connection_count(), 0);
/// ```
pub struct ConnectionGuard<'a, Args: Clone + Send + 'static> {
    signal: &'a Signal<Args>,
    id: Option<ConnectionId>,
}

impl<'a, Args: Clone + Send + 'static> ConnectionGuard<'a, Args> {
    /// Create a guard for an existing connection.
    pub fn new(signal: &'a Signal<Args>, id: ConnectionId) -> Self {
        Self {
            signal,
            id: Some(id),
        }
    }

    /// Release the connection without disconnecting it.
    pub fn release(mut self) -> ConnectionId {
        self.id.take().expect("guard already released")
    }
}

impl<Args: Clone + Send + 'static> Drop for ConnectionGuard<'_, Args> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.signal.disconnect(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn connect_and_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(AtomicI32::new(0));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.store(value, Ordering::SeqCst);
        });

        signal.emit(42);
        assert_eq!(received.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn disconnect_stops_delivery() {
        let signal = Signal::<i32>::new();
        let count = Arc::new(AtomicI32::new(0));

        let count_clone = count.clone();
        let id = signal.connect(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.emit(1);
        assert!(signal.disconnect(id));
        signal.emit(2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!signal.disconnect(id));
    }

    #[test]
    fn multiple_slots_all_invoked() {
        let signal = Signal::<()>::new();
        let count = Arc::new(AtomicI32::new(0));

        for _ in 0..3 {
            let count_clone = count.clone();
            signal.connect(move |_| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            });
        }

        signal.emit(());
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn blocked_signal_does_not_emit() {
        let signal = Signal::<i32>::new();
        let count = Arc::new(AtomicI32::new(0));

        let count_clone = count.clone();
        signal.connect(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.set_blocked(true);
        signal.emit(1);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        signal.set_blocked(false);
        signal.emit(2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn queued_without_event_loop_executes_inline() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(AtomicI32::new(0));

        let received_clone = received.clone();
        signal.connect_with_type(
            move |&value| {
                received_clone.store(value, Ordering::SeqCst);
            },
            ConnectionType::Queued,
        );

        // No Application in unit tests: the inline fallback delivers
        // synchronously.
        signal.emit(7);
        assert_eq!(received.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn auto_queues_across_threads() {
        let signal = Arc::new(Signal::<i32>::new());
        let received = Arc::new(AtomicI32::new(0));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.store(value, Ordering::SeqCst);
        });

        let signal_clone = signal.clone();
        let handle = std::thread::spawn(move || {
            signal_clone.emit(99);
        });
        handle.join().unwrap();

        // Inline fallback delivers before the thread exits.
        assert_eq!(received.load(Ordering::SeqCst), 99);
    }

    #[test]
    fn emit_queued_reports_count() {
        let signal = Signal::<()>::new();
        signal.connect(|_| {});
        signal.connect(|_| {});

        assert_eq!(signal.emit_queued(()), 2);

        signal.set_blocked(true);
        assert_eq!(signal.emit_queued(()), 0);
    }

    #[test]
    fn guard_disconnects_on_drop() {
        let signal = Signal::<i32>::new();
        {
            let _guard = ConnectionGuard::new(&signal, signal.connect(|_| {}));
            assert_eq!(signal.connection_count(), 1);
        }
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn guard_release_keeps_connection() {
        let signal = Signal::<i32>::new();
        let guard = ConnectionGuard::new(&signal, signal.connect(|_| {}));
        let id = guard.release();
        assert_eq!(signal.connection_count(), 1);
        assert!(signal.disconnect(id));
    }
}
