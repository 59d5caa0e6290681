//! Worker thread pool for background execution.
//!
//! A rayon-backed pool with work-stealing scheduling, sized for a desktop
//! application issuing bursty, human-triggered background operations rather
//! than server throughput. The pool installs a panic handler so a panicking
//! job never takes the process down; panic containment for managed tasks is
//! layered on top by [`TaskService`](crate::TaskService).
//!
//! # Example
//!
//! ```
//! use trellis_core::threadpool::{ThreadPool, ThreadPoolConfig};
//!
//! let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2)).unwrap();
//! let handle = pool.spawn(|| 40 + 2);
//! assert_eq!(handle.wait(), Some(42));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError, bounded};
use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool as RayonThreadPool, ThreadPoolBuilder};

use crate::cancel::CancellationToken;
use crate::error::ThreadPoolError;

/// Counter for unique spawn IDs.
static NEXT_SPAWN_ID: AtomicU64 = AtomicU64::new(1);

/// Configuration for creating a thread pool.
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Number of worker threads. `None` means use the number of CPU cores.
    pub num_threads: Option<usize>,
    /// Name prefix for worker threads.
    pub thread_name: String,
    /// Stack size for worker threads in bytes.
    pub stack_size: Option<usize>,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name: "trellis-worker".to_string(),
            stack_size: None,
        }
    }
}

impl ThreadPoolConfig {
    /// Create a new configuration with a custom thread count.
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
            ..Default::default()
        }
    }
}

/// Internal wakeup used by `SpawnHandle::wait`.
#[derive(Debug)]
struct SpawnWakeup {
    ready: Mutex<bool>,
    condvar: Condvar,
}

impl SpawnWakeup {
    fn new() -> Self {
        Self {
            ready: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn wake(&self) {
        let mut ready = self.ready.lock();
        *ready = true;
        self.condvar.notify_all();
    }

    fn wait(&self) {
        let mut ready = self.ready.lock();
        while !*ready {
            self.condvar.wait(&mut ready);
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut ready = self.ready.lock();
        if *ready {
            return true;
        }
        let _ = self.condvar.wait_for(&mut ready, timeout);
        *ready
    }
}

/// A handle to a spawned job that allows waiting for its result.
#[derive(Debug)]
pub struct SpawnHandle<T> {
    id: u64,
    receiver: Receiver<T>,
    wakeup: Arc<SpawnWakeup>,
    cancellation: Option<CancellationToken>,
}

impl<T> SpawnHandle<T> {
    /// Get the unique spawn ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Try to get the result without blocking.
    ///
    /// Returns `Some(result)` once the job has completed.
    pub fn try_get(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the job to complete and return its result.
    ///
    /// Returns `None` if the job panicked.
    pub fn wait(self) -> Option<T> {
        self.wakeup.wait();
        self.receiver.recv().ok()
    }

    /// Wait for the job with a timeout.
    ///
    /// Returns `None` if the timeout elapsed or the job panicked.
    pub fn wait_timeout(self, timeout: Duration) -> Option<T> {
        if self.wakeup.wait_timeout(timeout) {
            self.receiver.recv().ok()
        } else {
            None
        }
    }

    /// Request cancellation, if the job was spawned with a token.
    pub fn cancel(&self) {
        if let Some(ref token) = self.cancellation {
            token.cancel();
        }
    }

    /// Get a reference to the cancellation token, if any.
    pub fn cancellation_token(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }
}

/// A thread pool for executing background jobs.
pub struct ThreadPool {
    pool: RayonThreadPool,
    active_jobs: Arc<AtomicUsize>,
}

impl ThreadPool {
    /// Create a new thread pool with the given configuration.
    pub fn new(config: ThreadPoolConfig) -> Result<Self, ThreadPoolError> {
        let ThreadPoolConfig {
            num_threads,
            thread_name,
            stack_size,
        } = config;

        let panic_pool_name = thread_name.clone();
        let mut builder = ThreadPoolBuilder::new()
            .thread_name(move |index| format!("{thread_name}-{index}"))
            .panic_handler(move |_| {
                tracing::error!(
                    target: "trellis_core::threadpool",
                    pool = %panic_pool_name,
                    "worker job panicked"
                );
            });

        if let Some(num_threads) = num_threads {
            builder = builder.num_threads(num_threads);
        }

        if let Some(stack_size) = stack_size {
            builder = builder.stack_size(stack_size);
        }

        let pool = builder
            .build()
            .map_err(|e| ThreadPoolError::CreationFailed(e.to_string()))?;

        Ok(Self {
            pool,
            active_jobs: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Get the number of threads in the pool.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Get the number of currently active (running) jobs.
    pub fn active_jobs(&self) -> usize {
        self.active_jobs.load(Ordering::Acquire)
    }

    /// Spawn a job on the pool.
    ///
    /// Returns a handle that can be used to wait for the result.
    pub fn spawn<F, T>(&self, job: F) -> SpawnHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.spawn_internal(job, None)
    }

    /// Spawn a job with a cancellation token.
    ///
    /// The job receives a clone of the token and should periodically check
    /// `token.is_cancelled()` to support cooperative cancellation.
    pub fn spawn_cancellable<F, T>(&self, job: F) -> (SpawnHandle<T>, CancellationToken)
    where
        F: FnOnce(CancellationToken) -> T + Send + 'static,
        T: Send + 'static,
    {
        let token = CancellationToken::new();
        let token_for_job = token.clone();
        let handle = self.spawn_internal(move || job(token_for_job), Some(token.clone()));
        (handle, token)
    }

    fn spawn_internal<F, T>(&self, job: F, cancellation: Option<CancellationToken>) -> SpawnHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let id = NEXT_SPAWN_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = bounded(1);
        let wakeup = Arc::new(SpawnWakeup::new());
        let wakeup_clone = wakeup.clone();

        self.active_jobs.fetch_add(1, Ordering::AcqRel);
        let active_jobs = self.active_jobs.clone();

        self.pool.spawn(move || {
            // Balance the counter and wake waiters even if `job` panics;
            // the panic then propagates to the pool's panic handler.
            struct Done {
                active: Arc<AtomicUsize>,
                wakeup: Arc<SpawnWakeup>,
            }
            impl Drop for Done {
                fn drop(&mut self) {
                    self.active.fetch_sub(1, Ordering::AcqRel);
                    self.wakeup.wake();
                }
            }
            let _done = Done {
                active: active_jobs,
                wakeup: wakeup_clone,
            };

            let result = job();
            let _ = sender.send(result);
        });

        SpawnHandle {
            id,
            receiver,
            wakeup,
            cancellation,
        }
    }

    /// Execute a closure on the pool and block until completion.
    pub fn execute<F, T>(&self, job: F) -> T
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        self.pool.install(job)
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_threads", &self.num_threads())
            .field("active_jobs", &self.active_jobs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn spawn_and_wait() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2)).unwrap();
        let handle = pool.spawn(|| 42);
        assert_eq!(handle.wait(), Some(42));
    }

    #[test]
    fn wait_timeout_on_slow_job() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2)).unwrap();

        let handle = pool.spawn(|| {
            std::thread::sleep(Duration::from_millis(200));
            42
        });

        let result = handle.wait_timeout(Duration::from_millis(10));
        assert!(result.is_none() || result == Some(42));
    }

    #[test]
    fn cancellable_job_observes_token() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2)).unwrap();

        let (handle, token) = pool.spawn_cancellable(|token| {
            for _ in 0..200 {
                if token.is_cancelled() {
                    return -1;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            42
        });

        std::thread::sleep(Duration::from_millis(20));
        token.cancel();

        let result = handle.wait();
        assert!(result == Some(-1) || result == Some(42));
    }

    #[test]
    fn many_jobs_complete() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(4)).unwrap();
        let counter = Arc::new(AtomicI32::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let counter = counter.clone();
                pool.spawn(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.wait();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn panicking_job_does_not_poison_pool() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2)).unwrap();

        let bad = pool.spawn(|| {
            panic!("boom");
        });
        // The sender is dropped without a value; wait returns None.
        assert_eq!(bad.wait(), None);

        // The pool still works.
        let good = pool.spawn(|| 7);
        assert_eq!(good.wait(), Some(7));
    }

    #[test]
    fn execute_runs_synchronously() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2)).unwrap();
        assert_eq!(pool.execute(|| 42), 42);
    }
}
