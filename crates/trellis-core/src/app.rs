//! The main Application struct and UI-thread event loop.
//!
//! Trellis owns its event queue outright: a single-consumer channel drained
//! by the thread that created the [`Application`]. Background threads deliver
//! work to the UI thread by posting [`AppEvent::Invoke`] messages; the loop
//! executes them in priority order, interleaved with due timers and deferred
//! closures. This is the backbone of the framework's threading guarantee:
//! UI state is only ever mutated from the UI thread.
//!
//! # Example
//!
//! ```no_run
//! use trellis_core::Application;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = Application::new()?;
//!
//!     app.invoke_later(|| {
//!         println!("runs on the UI thread");
//!     });
//!
//!     app.invoke_after(Duration::from_millis(500), || {
//!         Application::instance().quit();
//!     });
//!
//!     Ok(app.run()?)
//! }
//! ```
//!
//! # Without an application
//!
//! [`post_invocation`] falls back to executing the closure inline on the
//! calling thread when no `Application` exists. Unit tests and early
//! initialization rely on this: callback ordering is preserved, only the
//! thread affinity changes.

use std::collections::BinaryHeap;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::ThreadId;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::{Mutex, RwLock};

use crate::error::{CoreError, Result};
use crate::event::{AppEvent, PrioritizedEvent};
use crate::invocation::Invocation;
use crate::scheduler::{ScheduledId, SharedScheduler};
use crate::timer::{SharedTimerManager, TimerId};

/// Global application instance.
static APPLICATION: OnceLock<Application> = OnceLock::new();

/// The thread that created the application (the UI thread).
static MAIN_THREAD_ID: OnceLock<ThreadId> = OnceLock::new();

/// Longest single wait inside `run()`; bounds quit latency if a post is lost.
const MAX_IDLE_WAIT: Duration = Duration::from_millis(250);

/// Callback invoked on the UI thread when a timer fires.
pub type TimerHandler = Box<dyn Fn(TimerId) + Send + Sync>;

/// The single-consumer event queue feeding the UI thread.
///
/// Events arrive through a channel from any thread and are re-ordered by
/// priority (then FIFO) before dispatch.
pub(crate) struct EventQueue {
    sender: Sender<AppEvent>,
    receiver: Receiver<AppEvent>,
    heap: Mutex<BinaryHeap<PrioritizedEvent>>,
    sequence: AtomicU64,
}

impl EventQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            heap: Mutex::new(BinaryHeap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Post an event from any thread.
    pub fn post(&self, event: AppEvent) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| CoreError::EventQueueClosed)
    }

    /// Move everything that has arrived on the channel into the heap.
    fn drain(&self) {
        let mut heap = self.heap.lock();
        while let Ok(event) = self.receiver.try_recv() {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            heap.push(PrioritizedEvent::new(event, sequence));
        }
    }

    /// Pop the highest-priority pending event.
    fn pop(&self) -> Option<AppEvent> {
        self.heap.lock().pop().map(|p| p.event)
    }

    /// Block until an event arrives or the timeout elapses.
    fn wait(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => {
                let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
                self.heap.lock().push(PrioritizedEvent::new(event, sequence));
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

/// The main application struct, managing the event loop and global state.
///
/// This is a singleton - only one `Application` can exist per process.
pub struct Application {
    /// The UI-thread event queue.
    queue: EventQueue,
    /// Timer manager (thread-safe).
    timers: SharedTimerManager,
    /// Deferred closure scheduler (thread-safe).
    scheduler: SharedScheduler,
    /// Flag indicating the application should quit.
    should_quit: AtomicBool,
    /// User-provided handler for timer fires.
    timer_handler: RwLock<Option<TimerHandler>>,
}

impl Application {
    /// Create a new application instance.
    ///
    /// This must be called from the thread that will run the event loop
    /// (the UI thread) before any other Trellis operations that need it.
    /// Only one `Application` can exist per process.
    ///
    /// # Errors
    ///
    /// Returns an error if an `Application` has already been initialized.
    pub fn new() -> Result<&'static Application> {
        let app = Application {
            queue: EventQueue::new(),
            timers: SharedTimerManager::new(),
            scheduler: SharedScheduler::new(),
            should_quit: AtomicBool::new(false),
            timer_handler: RwLock::new(None),
        };

        APPLICATION
            .set(app)
            .map_err(|_| CoreError::ApplicationAlreadyInitialized)?;

        // The creating thread is the UI thread.
        let _ = MAIN_THREAD_ID.set(std::thread::current().id());

        tracing::debug!(target: "trellis_core::app", "application initialized");
        Ok(APPLICATION.get().unwrap())
    }

    /// Get the global application instance.
    ///
    /// # Panics
    ///
    /// Panics if `Application::new()` has not been called yet.
    pub fn instance() -> &'static Application {
        APPLICATION
            .get()
            .expect("Application not initialized. Call Application::new() first.")
    }

    /// Try to get the global application instance.
    ///
    /// Returns `None` if `Application::new()` has not been called yet.
    pub fn try_instance() -> Option<&'static Application> {
        APPLICATION.get()
    }

    /// Run the event loop until [`quit`](Self::quit) is called.
    #[tracing::instrument(skip(self), target = "trellis_core::app", level = "debug")]
    pub fn run(&self) -> Result<()> {
        tracing::info!(target: "trellis_core::app", "starting event loop");

        while !self.should_quit() {
            self.dispatch_ready();

            if self.should_quit() {
                break;
            }

            // Sleep until the next timer/deferred deadline or an event.
            let deadline = [
                self.timers.time_until_next(),
                self.scheduler.time_until_next(),
            ]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(MAX_IDLE_WAIT)
            .min(MAX_IDLE_WAIT);

            self.queue.wait(deadline);
        }

        tracing::info!(target: "trellis_core::app", "event loop exited");
        Ok(())
    }

    /// Process everything currently pending without blocking.
    ///
    /// Fires due timers, runs due deferred closures, and dispatches all
    /// queued events. Returns the number of events dispatched. Intended for
    /// tests and for embedding the loop into a host application.
    pub fn process_pending(&self) -> usize {
        self.dispatch_ready()
    }

    fn dispatch_ready(&self) -> usize {
        let mut dispatched = 0;

        for id in self.timers.take_expired() {
            self.handle_event(AppEvent::Timer { id });
            dispatched += 1;
        }

        for deferred in self.scheduler.take_due() {
            deferred();
            dispatched += 1;
        }

        self.queue.drain();
        while let Some(event) = self.queue.pop() {
            self.handle_event(event);
            dispatched += 1;
        }

        dispatched
    }

    fn handle_event(&self, event: AppEvent) {
        match event {
            AppEvent::Invoke(invocation) => invocation.execute(),
            AppEvent::Timer { id } => {
                if let Some(handler) = self.timer_handler.read().as_ref() {
                    handler(id);
                }
            }
            AppEvent::Quit => {
                self.should_quit.store(true, Ordering::SeqCst);
            }
            AppEvent::WakeUp => {}
        }
    }

    /// Request the application to quit.
    ///
    /// The quit is not immediate; `run()` returns on its next iteration.
    pub fn quit(&self) {
        tracing::info!(target: "trellis_core::app", "quit requested");
        self.should_quit.store(true, Ordering::SeqCst);
        let _ = self.queue.post(AppEvent::Quit);
    }

    /// Check if a quit has been requested.
    pub fn should_quit(&self) -> bool {
        self.should_quit.load(Ordering::SeqCst)
    }

    /// Post an event to the queue.
    ///
    /// This is thread-safe and can be called from any thread.
    pub fn post_event(&self, event: AppEvent) -> Result<()> {
        self.queue.post(event)
    }

    /// Queue a closure for execution on the UI thread.
    pub fn invoke_later<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let _ = self.queue.post(AppEvent::Invoke(Invocation::new(f)));
    }

    /// Schedule a closure to run on the UI thread after `delay`.
    ///
    /// Returns an id usable with [`cancel_invoke`](Self::cancel_invoke).
    pub fn invoke_after<F>(&self, delay: Duration, f: F) -> ScheduledId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.scheduler.schedule(delay, f);
        // Wake the loop so it recomputes its sleep deadline.
        let _ = self.queue.post(AppEvent::WakeUp);
        id
    }

    /// Cancel a closure scheduled with [`invoke_after`](Self::invoke_after).
    ///
    /// Returns `true` if the closure had not run yet.
    pub fn cancel_invoke(&self, id: ScheduledId) -> bool {
        self.scheduler.cancel(id)
    }

    // -------------------------------------------------------------------------
    // Timer API
    // -------------------------------------------------------------------------

    /// Start a one-shot timer. The timer handler receives the id when it fires.
    pub fn start_one_shot_timer(&self, duration: Duration) -> TimerId {
        let id = self.timers.start_one_shot(duration);
        let _ = self.queue.post(AppEvent::WakeUp);
        id
    }

    /// Start a repeating timer.
    pub fn start_repeating_timer(&self, interval: Duration) -> TimerId {
        let id = self.timers.start_repeating(interval);
        let _ = self.queue.post(AppEvent::WakeUp);
        id
    }

    /// Stop a timer.
    pub fn stop_timer(&self, id: TimerId) -> Result<()> {
        self.timers.stop(id)
    }

    /// Check whether a timer is still active.
    pub fn is_timer_active(&self, id: TimerId) -> bool {
        self.timers.is_active(id)
    }

    /// Set the handler invoked (on the UI thread) when any timer fires.
    pub fn set_timer_handler<F>(&self, handler: F)
    where
        F: Fn(TimerId) + Send + Sync + 'static,
    {
        *self.timer_handler.write() = Some(Box::new(handler));
    }

    /// Number of active timers.
    pub fn active_timer_count(&self) -> usize {
        self.timers.active_count()
    }

    /// Number of deferred closures not yet run.
    pub fn pending_deferred_count(&self) -> usize {
        self.scheduler.pending_count()
    }
}

// -----------------------------------------------------------------------------
// Thread discipline
// -----------------------------------------------------------------------------

/// Get the UI thread id, if an application has been created.
#[inline]
pub fn main_thread_id() -> Option<ThreadId> {
    MAIN_THREAD_ID.get().copied()
}

/// Check if the current thread is the main (UI) thread.
///
/// Returns `true` when no application exists yet (early initialization and
/// unit tests run without a UI thread).
#[inline]
pub fn is_main_thread() -> bool {
    match MAIN_THREAD_ID.get() {
        Some(&main_id) => std::thread::current().id() == main_id,
        None => true,
    }
}

/// Panics in debug builds if the current thread is not the UI thread.
#[macro_export]
macro_rules! debug_assert_main_thread {
    () => {
        debug_assert!(
            $crate::app::is_main_thread(),
            "operation must run on the UI thread"
        );
    };
    ($msg:expr) => {
        debug_assert!($crate::app::is_main_thread(), $msg);
    };
}

// -----------------------------------------------------------------------------
// Posting helpers
// -----------------------------------------------------------------------------

/// Queue a closure onto the UI thread.
///
/// When no [`Application`] exists the closure executes inline on the calling
/// thread. Ordering of invocations posted from one thread is preserved in
/// both modes.
pub fn post_invocation<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    match Application::try_instance() {
        Some(app) => app.invoke_later(f),
        None => {
            tracing::trace!(
                target: "trellis_core::app",
                "no event loop, executing invocation inline"
            );
            f();
        }
    }
}

/// Run a closure on the UI thread after `delay`.
///
/// With an [`Application`] this schedules through its event loop and returns
/// the id. Without one, a zero delay executes inline and a non-zero delay is
/// served by a detached thread; both return `None`.
pub fn post_delayed<F>(delay: Duration, f: F) -> Option<ScheduledId>
where
    F: FnOnce() + Send + 'static,
{
    match Application::try_instance() {
        Some(app) => Some(app.invoke_after(delay, f)),
        None if delay.is_zero() => {
            f();
            None
        }
        None => {
            std::thread::spawn(move || {
                std::thread::sleep(delay);
                f();
            });
            None
        }
    }
}

/// Cancel a delayed closure scheduled through [`post_delayed`].
pub fn cancel_delayed(id: ScheduledId) -> bool {
    Application::try_instance().is_some_and(|app| app.cancel_invoke(id))
}
