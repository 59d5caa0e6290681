//! Task execution service: submission, bookkeeping, and input blocking.
//!
//! A [`TaskService`] owns a worker pool and the live list of tasks that have
//! been submitted but not yet finished. Submitting hands the body to the
//! pool; the service arms the task's input blocker (if any) on the UI
//! thread, and on the task's done transition removes it from the live list
//! and releases the blocker under the same lock acquisition.
//!
//! A task belongs to at most one service's list at a time, and is submitted
//! exactly once; violations are rejected with a [`ServiceError`].
//!
//! # Example
//!
//! ```
//! use trellis_core::{Task, TaskContext, TaskError, TaskHandle, TaskService};
//!
//! struct Sleep;
//!
//! impl Task for Sleep {
//!     type Output = ();
//!     type Chunk = ();
//!     fn run(&self, ctx: &TaskContext<()>) -> Result<(), TaskError> {
//!         ctx.cancellation_token().sleep(std::time::Duration::from_millis(10));
//!         Ok(())
//!     }
//! }
//!
//! let service = TaskService::new("io").unwrap();
//! let handle = TaskHandle::new(Sleep);
//! service.execute(&handle).unwrap();
//!
//! // Submitting the same task again is an error.
//! assert!(service.execute(&handle).is_err());
//! ```

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::app::post_invocation;
use crate::error::CoreError;
use crate::signal::Signal;
use crate::task::{BlockScope, ClaimError, Task, TaskContext, TaskError, TaskHandle, TaskId,
                  TaskShared, TaskState};
use crate::threadpool::{ThreadPool, ThreadPoolConfig};

/// Errors raised by [`TaskService::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The task was already submitted to a service.
    AlreadySubmitted,
    /// The task is not in the pending state.
    NotPending(&'static str),
    /// The service has been shut down.
    ShutDown,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySubmitted => {
                write!(f, "task was already submitted to a service")
            }
            Self::NotPending(state) => {
                write!(f, "task is not pending (state: {state})")
            }
            Self::ShutDown => write!(f, "task service has been shut down"),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Snapshot notification of a live-task list change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListChange {
    /// The live list before the change.
    pub old: Vec<TaskId>,
    /// The live list after the change.
    pub new: Vec<TaskId>,
}

/// Configuration for a [`TaskService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Service name, used for worker thread names and diagnostics.
    pub name: String,
    /// Worker thread count. `None` uses the number of CPU cores.
    pub threads: Option<usize>,
}

impl ServiceConfig {
    /// Create a configuration with the given service name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            threads: None,
        }
    }

    /// Set the worker thread count.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

struct ServiceInner {
    name: String,
    pool: ThreadPool,
    /// Tasks submitted but not yet finished. Guarded by one mutex; removal
    /// and blocker release happen under the same acquisition.
    tasks: Mutex<Vec<Arc<TaskShared>>>,
    tasks_changed: Signal<TaskListChange>,
    shut_down: AtomicBool,
}

impl ServiceInner {
    fn live_ids(tasks: &[Arc<TaskShared>]) -> Vec<TaskId> {
        tasks.iter().map(|t| t.id).collect()
    }

    /// Remove a finished task and release its blocker, atomically with
    /// respect to the live list.
    fn task_done(&self, shared: &Arc<TaskShared>) {
        let (old, new) = {
            let mut tasks = self.tasks.lock();
            let old = Self::live_ids(&tasks);
            tasks.retain(|t| t.id != shared.id);
            shared.release_blocker();
            (old, Self::live_ids(&tasks))
        };
        tracing::debug!(
            target: "trellis_core::service",
            service = %self.name,
            id = ?shared.id,
            live = new.len(),
            "task finished"
        );
        self.tasks_changed.emit(TaskListChange { old, new });
    }
}

/// An executor-backed work queue for [`Task`]s with UI input blocking.
pub struct TaskService {
    inner: Arc<ServiceInner>,
}

impl TaskService {
    /// Create a service with default pool sizing.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        Self::with_config(ServiceConfig::new(name))
    }

    /// Create a service with explicit configuration.
    pub fn with_config(config: ServiceConfig) -> Result<Self, CoreError> {
        let pool = ThreadPool::new(ThreadPoolConfig {
            num_threads: config.threads,
            thread_name: format!("{}-task", config.name),
            stack_size: None,
        })?;

        Ok(Self {
            inner: Arc::new(ServiceInner {
                name: config.name,
                pool,
                tasks: Mutex::new(Vec::new()),
                tasks_changed: Signal::new(),
                shut_down: AtomicBool::new(false),
            }),
        })
    }

    /// The service name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Submit a task for execution.
    ///
    /// Rejects tasks that are not pending or that were already submitted.
    /// On acceptance the task is added to the live list, its input blocker
    /// (scope other than `None`) is engaged on the UI thread, and the body
    /// is handed to the pool. This call never blocks on the work itself.
    #[tracing::instrument(skip_all, target = "trellis_core::service", level = "debug")]
    pub fn execute<T: Task>(&self, handle: &TaskHandle<T>) -> Result<(), ServiceError> {
        let shared = handle.shared.clone();

        shared.try_claim().map_err(|e| match e {
            ClaimError::AlreadySubmitted => ServiceError::AlreadySubmitted,
            ClaimError::NotPending(state) => ServiceError::NotPending(state.name()),
        })?;

        if self.inner.shut_down.load(Ordering::SeqCst) {
            // The lifecycle guarantee holds even for rejected tasks:
            // failed + finished still fire, on the UI thread.
            let rejected = handle.clone();
            post_invocation(move || {
                rejected.shared.set_state(TaskState::Failed);
                rejected.task.failed(TaskError::Rejected);
                rejected.task.finished();
                rejected.shared.set_done();
            });
            return Err(ServiceError::ShutDown);
        }

        let (old, new) = {
            let mut tasks = self.inner.tasks.lock();
            let old = ServiceInner::live_ids(&tasks);
            tasks.push(shared.clone());
            (old, ServiceInner::live_ids(&tasks))
        };
        tracing::debug!(
            target: "trellis_core::service",
            service = %self.inner.name,
            id = ?shared.id,
            live = new.len(),
            "task submitted"
        );
        self.inner.tasks_changed.emit(TaskListChange { old, new });

        if shared.block_scope() != BlockScope::None {
            let blocking = shared.clone();
            post_invocation(move || blocking.engage_blocker());
        }

        let job_handle = handle.clone();
        let job_inner = self.inner.clone();
        self.inner.pool.spawn(move || run_task(job_handle, job_inner));

        Ok(())
    }

    /// Ids of the tasks currently submitted but not finished.
    ///
    /// Returns a defensive snapshot; iteration never observes in-place
    /// mutation.
    pub fn live_tasks(&self) -> Vec<TaskId> {
        ServiceInner::live_ids(&self.inner.tasks.lock())
    }

    /// Number of live tasks.
    pub fn task_count(&self) -> usize {
        self.inner.tasks.lock().len()
    }

    /// Whether no tasks are live.
    pub fn is_idle(&self) -> bool {
        self.task_count() == 0
    }

    /// Signal emitted with old/new snapshots whenever the live list changes.
    pub fn tasks_changed(&self) -> &Signal<TaskListChange> {
        &self.inner.tasks_changed
    }

    /// Stop accepting new tasks. In-flight tasks run to completion.
    pub fn shutdown(&self) {
        tracing::info!(
            target: "trellis_core::service",
            service = %self.inner.name,
            "service shut down"
        );
        self.inner.shut_down.store(true, Ordering::SeqCst);
    }

    /// Whether the service has been shut down.
    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    /// Block until the live list is empty or the timeout elapses.
    ///
    /// Returns `true` when idle was reached. Intended for shutdown paths
    /// and tests; the UI thread should watch
    /// [`tasks_changed`](Self::tasks_changed) instead.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_idle() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        true
    }
}

impl fmt::Debug for TaskService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskService")
            .field("name", &self.inner.name)
            .field("live_tasks", &self.task_count())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Outcome of a single task execution.
enum Outcome<O> {
    Succeeded(O),
    Failed(TaskError),
    Cancelled,
}

/// Execute the task body on the pool thread, then marshal completion onto
/// the UI thread.
fn run_task<T: Task>(handle: TaskHandle<T>, service: Arc<ServiceInner>) {
    let shared = handle.shared.clone();

    let outcome = if shared.token.is_cancelled() {
        // Cancelled before the body ever started.
        Outcome::Cancelled
    } else {
        shared.set_state(TaskState::Running);
        shared.mark_started();

        let ctx = TaskContext::for_task(shared.clone(), handle.task.clone());
        let result = catch_unwind(AssertUnwindSafe(|| handle.task.run(&ctx)));
        shared.mark_finished();

        // A cancellation request wins over whatever the body returned.
        if shared.token.is_cancelled() {
            Outcome::Cancelled
        } else {
            match result {
                Ok(Ok(value)) => Outcome::Succeeded(value),
                Ok(Err(error)) => Outcome::Failed(error),
                Err(payload) => Outcome::Failed(TaskError::Panicked(panic_message(&payload))),
            }
        }
    };

    post_invocation(move || complete_task(handle, service, outcome));
}

/// Run the outcome hook, the finished hook, and the service bookkeeping.
/// Executes on the UI thread.
fn complete_task<T: Task>(
    handle: TaskHandle<T>,
    service: Arc<ServiceInner>,
    outcome: Outcome<T::Output>,
) {
    let shared = &handle.shared;

    match outcome {
        Outcome::Succeeded(value) => {
            shared.set_state(TaskState::Succeeded);
            handle.task.succeeded(value);
        }
        Outcome::Failed(error) => {
            shared.set_state(TaskState::Failed);
            handle.task.failed(error);
        }
        Outcome::Cancelled => {
            shared.set_state(TaskState::Cancelled);
            handle.task.cancelled();
        }
    }

    handle.task.finished();
    // Bookkeeping before the done flag flips: anyone woken by `is_done`
    // must observe the task already gone from the live list.
    service.task_done(shared);
    shared.set_done();
}

/// Extract a readable message from a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::InputBlocker;
    use std::sync::atomic::AtomicUsize;

    /// Poll until the task is done or the timeout elapses.
    fn wait_done<T: Task>(handle: &TaskHandle<T>, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while !handle.is_done() {
            assert!(Instant::now() < deadline, "task did not finish in time");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    /// A task whose hooks append to a shared log.
    struct LoggingTask {
        log: Arc<Mutex<Vec<&'static str>>>,
        body: Box<dyn Fn(&TaskContext<()>) -> Result<u32, TaskError> + Send + Sync>,
    }

    impl LoggingTask {
        fn new(
            log: Arc<Mutex<Vec<&'static str>>>,
            body: impl Fn(&TaskContext<()>) -> Result<u32, TaskError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                log,
                body: Box::new(body),
            }
        }
    }

    impl Task for LoggingTask {
        type Output = u32;
        type Chunk = ();

        fn run(&self, ctx: &TaskContext<()>) -> Result<u32, TaskError> {
            (self.body)(ctx)
        }

        fn succeeded(&self, _value: u32) {
            self.log.lock().push("succeeded");
        }

        fn failed(&self, _error: TaskError) {
            self.log.lock().push("failed");
        }

        fn cancelled(&self) {
            self.log.lock().push("cancelled");
        }

        fn finished(&self) {
            self.log.lock().push("finished");
        }
    }

    #[test]
    fn successful_task_runs_hooks_in_order() {
        let service = TaskService::new("test").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = TaskHandle::new(LoggingTask::new(log.clone(), |_| Ok(7)));

        service.execute(&handle).unwrap();
        wait_done(&handle, Duration::from_secs(5));

        assert_eq!(handle.state(), TaskState::Succeeded);
        assert_eq!(*log.lock(), vec!["succeeded", "finished"]);
        assert!(handle.execution_duration().is_some());
    }

    #[test]
    fn failing_task_routes_to_failed() {
        let service = TaskService::new("test").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = TaskHandle::new(LoggingTask::new(log.clone(), |_| Err("io error".into())));

        service.execute(&handle).unwrap();
        wait_done(&handle, Duration::from_secs(5));

        assert_eq!(handle.state(), TaskState::Failed);
        assert_eq!(*log.lock(), vec!["failed", "finished"]);
    }

    #[test]
    fn panicking_task_routes_to_failed() {
        let service = TaskService::new("test").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = TaskHandle::new(LoggingTask::new(log.clone(), |_| panic!("task blew up")));

        service.execute(&handle).unwrap();
        wait_done(&handle, Duration::from_secs(5));

        assert_eq!(handle.state(), TaskState::Failed);
        assert_eq!(*log.lock(), vec!["failed", "finished"]);

        // The service is still usable afterwards.
        let ok = TaskHandle::new(LoggingTask::new(Arc::new(Mutex::new(Vec::new())), |_| Ok(1)));
        service.execute(&ok).unwrap();
        wait_done(&ok, Duration::from_secs(5));
        assert_eq!(ok.state(), TaskState::Succeeded);
    }

    #[test]
    fn cancel_before_start_routes_to_cancelled_without_running() {
        let service = TaskService::new("test").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        let handle = TaskHandle::new(LoggingTask::new(log.clone(), move |_| {
            ran_clone.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }));

        handle.cancel(true);
        service.execute(&handle).unwrap();
        wait_done(&handle, Duration::from_secs(5));

        assert_eq!(handle.state(), TaskState::Cancelled);
        assert_eq!(*log.lock(), vec!["cancelled", "finished"]);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(handle.started_at().is_none());
    }

    #[test]
    fn cancel_during_run_wins_over_body_result() {
        let service = TaskService::new("test").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = TaskHandle::new(LoggingTask::new(log.clone(), |ctx| {
            // Wait out the cancellation request, then "succeed" anyway.
            while !ctx.is_cancelled() {
                std::thread::sleep(Duration::from_millis(2));
            }
            Ok(42)
        }));

        service.execute(&handle).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(handle.cancel(true));
        wait_done(&handle, Duration::from_secs(5));

        assert_eq!(handle.state(), TaskState::Cancelled);
        assert_eq!(*log.lock(), vec!["cancelled", "finished"]);
    }

    #[test]
    fn double_submit_is_rejected_without_duplicates() {
        let service = TaskService::new("test").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = TaskHandle::new(LoggingTask::new(log.clone(), |ctx| {
            ctx.cancellation_token().sleep(Duration::from_millis(50));
            Ok(0)
        }));

        service.execute(&handle).unwrap();
        assert_eq!(
            service.execute(&handle),
            Err(ServiceError::AlreadySubmitted)
        );
        assert_eq!(service.task_count(), 1);

        wait_done(&handle, Duration::from_secs(5));
        assert!(service.is_idle());

        // Re-submission after completion is still illegal, now as not-pending.
        assert_eq!(
            service.execute(&handle),
            Err(ServiceError::NotPending("succeeded"))
        );
    }

    #[test]
    fn submitting_to_two_services_is_rejected() {
        let a = TaskService::new("a").unwrap();
        let b = TaskService::new("b").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = TaskHandle::new(LoggingTask::new(log, |ctx| {
            ctx.cancellation_token().sleep(Duration::from_millis(50));
            Ok(0)
        }));

        a.execute(&handle).unwrap();
        assert_eq!(b.execute(&handle), Err(ServiceError::AlreadySubmitted));
        assert!(b.is_idle());
        wait_done(&handle, Duration::from_secs(5));
    }

    #[test]
    fn shutdown_rejects_but_notifies() {
        let service = TaskService::new("test").unwrap();
        service.shutdown();

        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = TaskHandle::new(LoggingTask::new(log.clone(), |_| Ok(0)));

        assert_eq!(service.execute(&handle), Err(ServiceError::ShutDown));
        wait_done(&handle, Duration::from_secs(5));

        assert_eq!(handle.state(), TaskState::Failed);
        assert_eq!(*log.lock(), vec!["failed", "finished"]);
        assert!(service.is_idle());
    }

    #[test]
    fn live_list_tracks_running_tasks() {
        let service = TaskService::with_config(ServiceConfig::new("test").threads(4)).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                TaskHandle::new(LoggingTask::new(Arc::new(Mutex::new(Vec::new())), |ctx| {
                    ctx.cancellation_token().sleep(Duration::from_millis(40));
                    Ok(0)
                }))
            })
            .collect();

        for handle in &handles {
            service.execute(handle).unwrap();
        }

        let live = service.live_tasks();
        assert_eq!(live.len(), 4);
        for handle in &handles {
            assert!(live.contains(&handle.id()));
        }

        assert!(service.wait_idle(Duration::from_secs(5)));
        for handle in &handles {
            wait_done(handle, Duration::from_secs(5));
        }
    }

    #[test]
    fn list_change_notifications_carry_snapshots() {
        let service = TaskService::new("test").unwrap();
        let changes = Arc::new(Mutex::new(Vec::new()));

        let changes_clone = changes.clone();
        service.tasks_changed().connect(move |change| {
            changes_clone.lock().push(change.clone());
        });

        let handle = TaskHandle::new(LoggingTask::new(Arc::new(Mutex::new(Vec::new())), |_| {
            Ok(0)
        }));
        service.execute(&handle).unwrap();
        wait_done(&handle, Duration::from_secs(5));
        assert!(service.wait_idle(Duration::from_secs(5)));

        let changes = changes.lock();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].old, Vec::<TaskId>::new());
        assert_eq!(changes[0].new, vec![handle.id()]);
        assert_eq!(changes[1].old, vec![handle.id()]);
        assert_eq!(changes[1].new, Vec::<TaskId>::new());
    }

    #[test]
    fn blocker_is_engaged_and_released_exactly_once() {
        struct CountingBlocker {
            blocks: Arc<AtomicUsize>,
            unblocks: Arc<AtomicUsize>,
        }

        impl InputBlocker for CountingBlocker {
            fn scope(&self) -> BlockScope {
                BlockScope::Action
            }
            fn block(&mut self) {
                self.blocks.fetch_add(1, Ordering::SeqCst);
            }
            fn unblock(&mut self) {
                self.unblocks.fetch_add(1, Ordering::SeqCst);
            }
        }

        let service = TaskService::new("test").unwrap();
        let blocks = Arc::new(AtomicUsize::new(0));
        let unblocks = Arc::new(AtomicUsize::new(0));

        let handle = TaskHandle::new(LoggingTask::new(Arc::new(Mutex::new(Vec::new())), |_| {
            std::thread::sleep(Duration::from_millis(20));
            Ok(0)
        }));
        handle.set_input_blocker(Box::new(CountingBlocker {
            blocks: blocks.clone(),
            unblocks: unblocks.clone(),
        }));

        service.execute(&handle).unwrap();
        // Without an event loop the blocker engages inline during execute.
        assert_eq!(blocks.load(Ordering::SeqCst), 1);
        assert_eq!(unblocks.load(Ordering::SeqCst), 0);

        wait_done(&handle, Duration::from_secs(5));
        assert!(service.wait_idle(Duration::from_secs(5)));
        assert_eq!(blocks.load(Ordering::SeqCst), 1);
        assert_eq!(unblocks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_submissions_keep_list_consistent() {
        let service = Arc::new(
            TaskService::with_config(ServiceConfig::new("stress").threads(4)).unwrap(),
        );
        let mut handles = Vec::new();

        for _ in 0..16 {
            let handle = TaskHandle::new(LoggingTask::new(
                Arc::new(Mutex::new(Vec::new())),
                |_| Ok(0),
            ));
            service.execute(&handle).unwrap();
            handles.push(handle);

            // The live list only ever contains non-finished tasks, with no
            // duplicates.
            let live = service.live_tasks();
            let mut sorted = live.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), live.len());
        }

        assert!(service.wait_idle(Duration::from_secs(10)));
        for handle in &handles {
            wait_done(handle, Duration::from_secs(5));
            assert_eq!(handle.state(), TaskState::Succeeded);
        }
    }
}
