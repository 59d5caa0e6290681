//! Cancellable, progress-reporting background tasks.
//!
//! A [`Task`] is a unit of asynchronous work with lifecycle hooks. The work
//! body runs on a pool thread; every hook (`process`, `succeeded`, `failed`,
//! `cancelled`, `finished`) is marshalled onto the UI thread. Exactly one of
//! the three outcome hooks fires, exactly once, before `finished` fires
//! exactly once - on every execution path, including panics in the body and
//! rejection at submission.
//!
//! Tasks are wrapped in a [`TaskHandle`] for submission to a
//! [`TaskService`](crate::TaskService); handle clones share state, so UI code
//! can observe progress and request cancellation while the body runs.
//!
//! # Example
//!
//! ```
//! use trellis_core::{Task, TaskContext, TaskError, TaskHandle, TaskService};
//!
//! struct CountLines {
//!     text: String,
//! }
//!
//! impl Task for CountLines {
//!     type Output = usize;
//!     type Chunk = ();
//!
//!     fn run(&self, ctx: &TaskContext<()>) -> Result<usize, TaskError> {
//!         let mut lines = 0;
//!         for (i, _) in self.text.lines().enumerate() {
//!             if ctx.is_cancelled() {
//!                 return Err(TaskError::Cancelled);
//!             }
//!             lines = i + 1;
//!         }
//!         Ok(lines)
//!     }
//!
//!     fn succeeded(&self, lines: usize) {
//!         println!("counted {} lines", lines);
//!     }
//! }
//!
//! let service = TaskService::new("demo").unwrap();
//! let handle = TaskHandle::new(CountLines { text: "a\nb".into() });
//! service.execute(&handle).unwrap();
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::app::post_invocation;
use crate::cancel::CancellationToken;
use crate::progress::ProgressTracker;
use crate::signal::Signal;

/// Counter for unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Lifecycle state of a task.
///
/// `Pending -> Running -> {Succeeded | Failed | Cancelled}`. The terminal
/// "done" flag (see [`TaskHandle::is_done`]) is set separately, after the
/// `finished` hook has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Constructed, not yet submitted or not yet started.
    Pending,
    /// The work body is executing on a pool thread.
    Running,
    /// The body returned a value.
    Succeeded,
    /// The body returned an error, panicked, or the task was rejected.
    Failed,
    /// Cancellation was requested before the body completed.
    Cancelled,
}

impl TaskState {
    /// Whether this is a terminal outcome state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Short state name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// The granularity at which UI input is suspended while a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockScope {
    /// No input blocking.
    #[default]
    None,
    /// Disable a single command object.
    Action,
    /// Disable a single UI control.
    Component,
    /// Block a whole window behind an input-eating overlay.
    Window,
    /// Block every window of the application.
    Application,
}

/// Suspends UI input at a given scope while a task runs.
///
/// `block()` and `unblock()` are called exactly once each per task
/// execution, on the UI thread, by the owning
/// [`TaskService`](crate::TaskService). Implementations live with the widget
/// layer; the service only needs this contract.
pub trait InputBlocker: Send {
    /// The scope this blocker operates at.
    fn scope(&self) -> BlockScope;

    /// Suspend input. Called on the UI thread when the task is accepted.
    fn block(&mut self);

    /// Restore input. Called on the UI thread when the task finishes.
    fn unblock(&mut self);
}

/// Error produced by or about a task execution.
#[derive(Debug)]
pub enum TaskError {
    /// The task observed a cancellation request and stopped early.
    Cancelled,
    /// The work body panicked; the payload message is preserved.
    Panicked(String),
    /// The task was rejected at submission (service shut down).
    Rejected,
    /// The work body failed with an application error.
    Failure(Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    /// Wrap an application error as a task failure.
    pub fn failure<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Failure(Box::new(error))
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "task was cancelled"),
            Self::Panicked(msg) => write!(f, "task body panicked: {msg}"),
            Self::Rejected => write!(f, "task was rejected at submission"),
            Self::Failure(err) => write!(f, "task failed: {err}"),
        }
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Failure(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self::Failure(message.into())
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self::Failure(message.into())
    }
}

/// A unit of background work with lifecycle hooks.
///
/// Implementations override [`run`](Self::run) (the work body, executed on a
/// pool thread) and whichever hooks they need. All hooks run on the UI
/// thread. Tasks must be `Sync` because the body and the hooks may be
/// invoked from different threads; use interior mutability for mutable
/// state.
pub trait Task: Send + Sync + 'static {
    /// Result type delivered to [`succeeded`](Self::succeeded).
    type Output: Send + 'static;
    /// Intermediate result type delivered to [`process`](Self::process).
    type Chunk: Send + 'static;

    /// The work body. Poll [`TaskContext::is_cancelled`] at reasonable
    /// intervals; cancellation is cooperative.
    fn run(&self, ctx: &TaskContext<Self::Chunk>) -> Result<Self::Output, TaskError>;

    /// Receive chunks published by the body, in publish order.
    fn process(&self, chunks: Vec<Self::Chunk>) {
        let _ = chunks;
    }

    /// The body returned a value and cancellation was not requested.
    fn succeeded(&self, value: Self::Output) {
        let _ = value;
    }

    /// The body returned an error or panicked, or the task was rejected.
    fn failed(&self, error: TaskError) {
        tracing::warn!(target: "trellis_core::task", %error, "task failed");
    }

    /// Cancellation was requested before the body completed.
    fn cancelled(&self) {}

    /// Always invoked once, after the outcome hook, on every path.
    fn finished(&self) {}

    /// Human-readable title, shown by progress dialogs.
    fn title(&self) -> &str {
        ""
    }

    /// Whether a progress dialog should offer a cancel button.
    fn user_cancellable(&self) -> bool {
        false
    }
}

/// Why a submission claim failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClaimError {
    /// The task is not in the pending state.
    NotPending(TaskState),
    /// The task already belongs to a service.
    AlreadySubmitted,
}

/// State shared between all clones of a [`TaskHandle`] and its service.
pub(crate) struct TaskShared {
    pub(crate) id: TaskId,
    state: Mutex<TaskState>,
    done: AtomicBool,
    pub(crate) token: CancellationToken,
    pub(crate) progress: ProgressTracker,
    started_at: Mutex<Option<Instant>>,
    finished_at: Mutex<Option<Instant>>,
    /// Set when a service accepts the task; a task is submitted to exactly
    /// one service, exactly once.
    pub(crate) claimed: AtomicBool,
    /// Whether the input blocker is currently engaged.
    blocked: AtomicBool,
    blocker: Mutex<Option<Box<dyn InputBlocker>>>,
    state_changed: Signal<TaskState>,
}

impl TaskShared {
    fn new() -> Self {
        Self {
            id: TaskId::next(),
            state: Mutex::new(TaskState::Pending),
            done: AtomicBool::new(false),
            token: CancellationToken::new(),
            progress: ProgressTracker::new(),
            started_at: Mutex::new(None),
            finished_at: Mutex::new(None),
            claimed: AtomicBool::new(false),
            blocked: AtomicBool::new(false),
            blocker: Mutex::new(None),
            state_changed: Signal::new(),
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        {
            let mut current = self.state.lock();
            if *current == state {
                return;
            }
            *current = state;
        }
        tracing::trace!(target: "trellis_core::task", id = ?self.id, state = state.name(), "state change");
        self.state_changed.emit(state);
    }

    /// Atomically check-and-set the pending state for submission.
    pub(crate) fn try_claim(&self) -> Result<(), ClaimError> {
        let state = self.state.lock();
        if *state != TaskState::Pending {
            return Err(ClaimError::NotPending(*state));
        }
        if self.claimed.swap(true, Ordering::SeqCst) {
            return Err(ClaimError::AlreadySubmitted);
        }
        Ok(())
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub(crate) fn set_done(&self) {
        self.done.store(true, Ordering::Release);
    }

    pub(crate) fn mark_started(&self) {
        *self.started_at.lock() = Some(Instant::now());
    }

    pub(crate) fn mark_finished(&self) {
        *self.finished_at.lock() = Some(Instant::now());
    }

    pub(crate) fn started_at(&self) -> Option<Instant> {
        *self.started_at.lock()
    }

    pub(crate) fn finished_at(&self) -> Option<Instant> {
        *self.finished_at.lock()
    }

    pub(crate) fn state_changed(&self) -> &Signal<TaskState> {
        &self.state_changed
    }

    pub(crate) fn set_blocker(&self, blocker: Box<dyn InputBlocker>) {
        *self.blocker.lock() = Some(blocker);
    }

    pub(crate) fn block_scope(&self) -> BlockScope {
        self.blocker
            .lock()
            .as_ref()
            .map(|b| b.scope())
            .unwrap_or(BlockScope::None)
    }

    /// Engage the input blocker. Ignores (with a warning) a second engage
    /// without an intervening release; double-block can arise from racy
    /// completion ordering and is a recoverable UI-consistency issue.
    pub(crate) fn engage_blocker(&self) {
        let mut guard = self.blocker.lock();
        let Some(blocker) = guard.as_mut() else {
            return;
        };
        if blocker.scope() == BlockScope::None {
            return;
        }
        if self.blocked.swap(true, Ordering::SeqCst) {
            tracing::warn!(
                target: "trellis_core::task",
                id = ?self.id,
                "block() while already blocked, ignoring"
            );
            return;
        }
        blocker.block();
    }

    /// Release the input blocker; the inverse of
    /// [`engage_blocker`](Self::engage_blocker) with the same tolerance for
    /// unpaired calls. The blocker is dropped afterwards - it holds a
    /// handle back to this task, and keeping it past completion would pin
    /// both alive.
    pub(crate) fn release_blocker(&self) {
        let mut guard = self.blocker.lock();
        let Some(blocker) = guard.as_mut() else {
            return;
        };
        if blocker.scope() == BlockScope::None {
            guard.take();
            return;
        }
        if !self.blocked.swap(false, Ordering::SeqCst) {
            tracing::warn!(
                target: "trellis_core::task",
                id = ?self.id,
                "unblock() while not blocked, ignoring"
            );
            return;
        }
        blocker.unblock();
        guard.take();
    }
}

/// A shareable handle around a [`Task`] implementation.
///
/// Clones share state: state machine, progress, cancellation token, and the
/// input blocker slot. Submit through
/// [`TaskService::execute`](crate::TaskService::execute).
pub struct TaskHandle<T: Task> {
    pub(crate) task: Arc<T>,
    pub(crate) shared: Arc<TaskShared>,
}

impl<T: Task> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<T: Task> TaskHandle<T> {
    /// Wrap a task for submission.
    pub fn new(task: T) -> Self {
        Self {
            task: Arc::new(task),
            shared: Arc::new(TaskShared::new()),
        }
    }

    /// The unique id of this task.
    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    /// Whether the `finished` hook has completed.
    pub fn is_done(&self) -> bool {
        self.shared.is_done()
    }

    /// Whether cancellation has been requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.shared.token.is_cancelled()
    }

    /// Request cooperative cancellation.
    ///
    /// With `may_interrupt`, sleepers parked on the task's cancellation
    /// token are woken; without it only the flag is set. Returns `false`
    /// when the task has already reached a terminal state.
    pub fn cancel(&self, may_interrupt: bool) -> bool {
        if self.shared.state().is_terminal() || self.shared.is_done() {
            return false;
        }
        tracing::debug!(
            target: "trellis_core::task",
            id = ?self.id(),
            may_interrupt,
            "cancellation requested"
        );
        if may_interrupt {
            self.shared.token.cancel();
        } else {
            self.shared.token.cancel_quietly();
        }
        true
    }

    /// Current progress percent (0-100).
    pub fn percent(&self) -> u8 {
        self.shared.progress.percent()
    }

    /// Current progress message, if any.
    pub fn message(&self) -> Option<String> {
        self.shared.progress.message()
    }

    /// When the body started executing.
    pub fn started_at(&self) -> Option<Instant> {
        self.shared.started_at()
    }

    /// When the body finished executing.
    pub fn finished_at(&self) -> Option<Instant> {
        self.shared.finished_at()
    }

    /// Wall-clock duration of the body execution, if it ran.
    pub fn execution_duration(&self) -> Option<Duration> {
        match (self.shared.started_at(), self.shared.finished_at()) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            (Some(start), None) => Some(start.elapsed()),
            _ => None,
        }
    }

    /// Signal emitted on every lifecycle state change.
    pub fn state_changed(&self) -> &Signal<TaskState> {
        self.shared.state_changed()
    }

    /// Signal emitted on progress changes.
    pub fn progress_changed(&self) -> &Signal<u8> {
        self.shared.progress.progress_changed()
    }

    /// Signal emitted on message changes.
    pub fn message_changed(&self) -> &Signal<String> {
        self.shared.progress.message_changed()
    }

    /// Whether any real progress value has been reported yet.
    pub fn has_progressed(&self) -> bool {
        self.shared.progress.has_progressed()
    }

    /// Install the input blocker used while this task runs.
    ///
    /// Must be set before submission to take effect; the service reads the
    /// scope at `execute` time.
    pub fn set_input_blocker(&self, blocker: Box<dyn InputBlocker>) {
        self.shared.set_blocker(blocker);
    }

    /// The blocking scope declared by the installed blocker.
    pub fn block_scope(&self) -> BlockScope {
        self.shared.block_scope()
    }

    /// Title of the underlying task.
    pub fn title(&self) -> &str {
        self.task.title()
    }

    /// Whether the underlying task allows user cancellation from a dialog.
    pub fn user_cancellable(&self) -> bool {
        self.task.user_cancellable()
    }
}

impl<T: Task> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.shared.id)
            .field("state", &self.shared.state())
            .field("done", &self.shared.is_done())
            .finish()
    }
}

/// The context handed to a task body while it runs.
///
/// Carries the cancellation token, progress reporting, and incremental
/// result publishing. Publishing marshals chunks onto the UI thread in
/// publish order, coalescing bursts into batches.
pub struct TaskContext<C: Send + 'static> {
    shared: Arc<TaskShared>,
    chunks: Arc<Mutex<Vec<C>>>,
    flush_pending: Arc<AtomicBool>,
    deliver: Arc<dyn Fn(Vec<C>) + Send + Sync>,
}

impl<C: Send + 'static> TaskContext<C> {
    /// Build a context for driving a task body without a service.
    ///
    /// Useful for custom executors and for exercising a body directly in
    /// tests; the context behaves exactly as it would under a
    /// [`TaskService`](crate::TaskService), minus lifecycle management.
    pub fn for_handle<T>(handle: &TaskHandle<T>) -> Self
    where
        T: Task<Chunk = C>,
    {
        Self::for_task(handle.shared.clone(), handle.task.clone())
    }

    /// Build the context for a task execution.
    pub(crate) fn for_task<T>(shared: Arc<TaskShared>, task: Arc<T>) -> Self
    where
        T: Task<Chunk = C>,
    {
        let deliver: Arc<dyn Fn(Vec<C>) + Send + Sync> =
            Arc::new(move |chunks| task.process(chunks));
        Self {
            shared,
            chunks: Arc::new(Mutex::new(Vec::new())),
            flush_pending: Arc::new(AtomicBool::new(false)),
            deliver,
        }
    }

    /// Whether cancellation has been requested. Poll this at reasonable
    /// intervals.
    pub fn is_cancelled(&self) -> bool {
        self.shared.token.is_cancelled()
    }

    /// The task's cancellation token, for interruptible waits.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.shared.token
    }

    /// Report progress as a percent (0-100).
    pub fn set_progress(&self, percent: u8) {
        self.shared.progress.set_percent(percent);
    }

    /// Report progress on an arbitrary odometer range.
    pub fn set_range_progress(&self, value: f64, min: f64, max: f64) {
        self.shared.progress.set_range_progress(value, min, max);
    }

    /// Update the progress message.
    pub fn set_message(&self, message: impl Into<String>) {
        self.shared.progress.set_message(message);
    }

    /// Publish an intermediate result.
    ///
    /// Chunks are delivered to [`Task::process`] on the UI thread in the
    /// order produced. Rapid publishes are coalesced into one delivery.
    pub fn publish(&self, chunk: C) {
        self.chunks.lock().push(chunk);

        if !self.flush_pending.swap(true, Ordering::AcqRel) {
            let chunks = self.chunks.clone();
            let flag = self.flush_pending.clone();
            let deliver = self.deliver.clone();
            post_invocation(move || {
                // Clear the flag first so a publish racing after the drain
                // schedules a fresh flush.
                flag.store(false, Ordering::Release);
                let batch = std::mem::take(&mut *chunks.lock());
                if !batch.is_empty() {
                    deliver(batch);
                }
            });
        }
    }
}
