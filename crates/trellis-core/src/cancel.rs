//! Cooperative cancellation for background work.
//!
//! A [`CancellationToken`] is a shared flag that a task body polls at
//! reasonable intervals. Cancellation is cooperative, not preemptive:
//! responsiveness is bounded only by how often the body checks the token.
//! Bodies that need to wait can use [`CancellationToken::sleep`], which
//! returns early when the token is cancelled with waking enabled.
//!
//! # Example
//!
//! ```
//! use trellis_core::CancellationToken;
//! use std::time::Duration;
//!
//! let token = CancellationToken::new();
//! let worker_token = token.clone();
//!
//! let handle = std::thread::spawn(move || {
//!     let mut steps = 0;
//!     while !worker_token.is_cancelled() {
//!         steps += 1;
//!         if !worker_token.sleep(Duration::from_millis(5)) {
//!             break;
//!         }
//!     }
//!     steps
//! });
//!
//! token.cancel();
//! let _steps = handle.join().unwrap();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A cancellation token for cooperative task cancellation.
///
/// Cloning a token yields another handle to the same flag.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<CancelState>,
}

#[derive(Debug)]
struct CancelState {
    cancelled: AtomicBool,
    waiters: Mutex<Vec<Arc<Wakeup>>>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelState {
                cancelled: AtomicBool::new(false),
                waiters: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Check if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation and wake any blocked sleepers.
    ///
    /// This is the `may_interrupt` path: besides setting the flag, every
    /// waiter currently parked in [`sleep`](Self::sleep) is woken so blocking
    /// sections observe the cancellation promptly.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::Release) {
            let waiters = self.inner.waiters.lock();
            for waiter in waiters.iter() {
                waiter.wake();
            }
        }
    }

    /// Request cancellation without waking blocked sleepers.
    ///
    /// The flag is set, but a body parked in [`sleep`](Self::sleep) runs its
    /// wait to completion before observing it on the next poll.
    pub fn cancel_quietly(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Sleep for `duration`, waking early on cancellation.
    ///
    /// Returns `true` if the full duration elapsed, `false` if the sleep was
    /// interrupted by [`cancel`](Self::cancel). Returns `false` immediately
    /// when the token is already cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }

        let wakeup = Arc::new(Wakeup::new());
        self.register_waiter(wakeup.clone());

        let woken = wakeup.wait_timeout(duration);
        self.unregister_waiter(&wakeup);

        // Woken means cancel() fired while we were parked.
        !woken
    }

    fn register_waiter(&self, wakeup: Arc<Wakeup>) {
        if self.is_cancelled() {
            wakeup.wake();
        } else {
            self.inner.waiters.lock().push(wakeup);
        }
    }

    fn unregister_waiter(&self, wakeup: &Arc<Wakeup>) {
        self.inner
            .waiters
            .lock()
            .retain(|w| !Arc::ptr_eq(w, wakeup));
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal wakeup mechanism for blocked sleepers.
#[derive(Debug)]
struct Wakeup {
    ready: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl Wakeup {
    fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    fn wake(&self) {
        // Hold the lock while setting ready to avoid a lost-wakeup race.
        let _guard = self.mutex.lock();
        self.ready.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    /// Wait until woken or the timeout elapses. Returns `true` if woken.
    fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.mutex.lock();
        if self.ready.load(Ordering::Acquire) {
            return true;
        }
        let _ = self.condvar.wait_for(&mut guard, timeout);
        self.ready.load(Ordering::Acquire)
    }
}
