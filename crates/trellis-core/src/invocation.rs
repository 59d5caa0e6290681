//! Deferred closure invocations for cross-thread delivery.
//!
//! An [`Invocation`] wraps a closure that must execute on a different thread,
//! typically the main/UI thread. Invocations travel inside
//! [`AppEvent::Invoke`](crate::AppEvent::Invoke) through the application's
//! event queue, so no side registry is needed: the queue itself carries the
//! closure to the consuming thread.
//!
//! For blocking delivery
//! ([`ConnectionType::BlockingQueued`](crate::ConnectionType::BlockingQueued)),
//! an invocation carries a [`CompletionHandle`] so the posting thread can
//! wait on the paired [`CompletionWaiter`] until the closure has run.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A type-erased closure queued for execution on another thread.
pub struct Invocation {
    /// The actual invocation closure.
    invoke: Box<dyn FnOnce() + Send>,
    /// Optional completion notifier for blocking delivery.
    completion: Option<CompletionHandle>,
}

impl Invocation {
    /// Create a new invocation.
    pub fn new<F>(invoke: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            invoke: Box::new(invoke),
            completion: None,
        }
    }

    /// Create a new invocation with a completion handle for blocking delivery.
    pub fn with_completion<F>(invoke: F, completion: CompletionHandle) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            invoke: Box::new(invoke),
            completion: Some(completion),
        }
    }

    /// Execute the invocation.
    pub fn execute(self) {
        (self.invoke)();
        // Signal completion if a thread is blocked on this invocation.
        if let Some(completion) = self.completion {
            completion.signal_done();
        }
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("blocking", &self.completion.is_some())
            .finish()
    }
}

/// A handle for signaling completion of a blocking invocation.
pub struct CompletionHandle {
    inner: Arc<CompletionState>,
}

impl CompletionHandle {
    /// Signal that the invocation is complete.
    fn signal_done(self) {
        let mut done = self.inner.done.lock();
        *done = true;
        self.inner.condvar.notify_all();
    }
}

/// A waiter for blocking on invocation completion.
pub struct CompletionWaiter {
    inner: Arc<CompletionState>,
}

impl CompletionWaiter {
    /// Wait for the invocation to complete.
    ///
    /// # Warning
    ///
    /// Calling this from the thread the invocation is queued to will
    /// deadlock. Use with caution.
    pub fn wait(self) {
        let mut done = self.inner.done.lock();
        while !*done {
            self.inner.condvar.wait(&mut done);
        }
    }

    /// Wait for the invocation to complete with a timeout.
    ///
    /// Returns `true` if the invocation completed, `false` on timeout.
    pub fn wait_timeout(self, timeout: Duration) -> bool {
        let mut done = self.inner.done.lock();
        if *done {
            return true;
        }
        let result = self.inner.condvar.wait_for(&mut done, timeout);
        *done || !result.timed_out()
    }
}

struct CompletionState {
    done: Mutex<bool>,
    condvar: Condvar,
}

/// Create a completion handle/waiter pair for blocking invocations.
pub fn completion_pair() -> (CompletionHandle, CompletionWaiter) {
    let state = Arc::new(CompletionState {
        done: Mutex::new(false),
        condvar: Condvar::new(),
    });

    (
        CompletionHandle {
            inner: state.clone(),
        },
        CompletionWaiter { inner: state },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn execute_runs_closure() {
        let executed = Arc::new(AtomicBool::new(false));

        let executed_clone = executed.clone();
        let invocation = Invocation::new(move || {
            executed_clone.store(true, Ordering::SeqCst);
        });

        invocation.execute();
        assert!(executed.load(Ordering::SeqCst));
    }

    #[test]
    fn completion_pair_signals() {
        let (handle, waiter) = completion_pair();

        let thread = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            let invocation = Invocation::with_completion(|| {}, handle);
            invocation.execute();
        });

        waiter.wait();
        thread.join().unwrap();
    }

    #[test]
    fn completion_timeout_elapses() {
        let (_handle, waiter) = completion_pair();

        // Never signalled, so the wait must time out.
        let completed = waiter.wait_timeout(Duration::from_millis(10));
        assert!(!completed);
    }
}
