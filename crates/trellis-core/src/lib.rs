//! Core systems for Trellis.
//!
//! This crate provides the foundational components of the Trellis desktop
//! application framework:
//!
//! - **Event Queue**: An explicit single-consumer UI-thread queue and event loop
//! - **Application**: Global application state and lifecycle management
//! - **Signal/Slot System**: Type-safe notification with cross-thread delivery
//! - **Property System**: Reactive values with change detection
//! - **Timers & Scheduling**: One-shot/repeating timers and deferred closures
//! - **Thread Pool**: rayon-backed background execution with cancellation
//! - **Tasks**: Cancellable, progress-reporting background work with
//!   UI-thread lifecycle hooks
//! - **Task Service**: Submission, live-task bookkeeping, and UI input
//!   blocking while work runs
//!
//! # Threading model
//!
//! One UI thread plus a bounded worker pool. Task bodies execute on pool
//! threads; every lifecycle hook and change notification is marshalled onto
//! the UI thread before it runs, so UI state is only ever mutated from the
//! UI thread. Without an [`Application`], queued work executes inline on the
//! posting thread - unit tests rely on this fallback.
//!
//! # Task Example
//!
//! ```
//! use trellis_core::{Task, TaskContext, TaskError, TaskHandle, TaskService};
//!
//! struct Checksum {
//!     data: Vec<u8>,
//! }
//!
//! impl Task for Checksum {
//!     type Output = u64;
//!     type Chunk = ();
//!
//!     fn run(&self, ctx: &TaskContext<()>) -> Result<u64, TaskError> {
//!         let mut sum = 0u64;
//!         for (i, &byte) in self.data.iter().enumerate() {
//!             if ctx.is_cancelled() {
//!                 return Err(TaskError::Cancelled);
//!             }
//!             sum = sum.wrapping_add(byte as u64);
//!             ctx.set_range_progress(i as f64, 0.0, self.data.len() as f64);
//!         }
//!         Ok(sum)
//!     }
//!
//!     fn succeeded(&self, sum: u64) {
//!         println!("checksum: {sum}");
//!     }
//! }
//!
//! let service = TaskService::new("hash").unwrap();
//! let handle = TaskHandle::new(Checksum { data: vec![1, 2, 3] });
//! service.execute(&handle).unwrap();
//! ```
//!
//! # Signal Example
//!
//! ```
//! use trellis_core::{Property, Signal};
//!
//! struct Counter {
//!     value: Property<i32>,
//!     value_changed: Signal<i32>,
//! }
//!
//! impl Counter {
//!     fn increment(&self) {
//!         let new_value = self.value.get() + 1;
//!         if self.value.set(new_value) {
//!             self.value_changed.emit(new_value);
//!         }
//!     }
//! }
//! ```

pub mod app;
mod cancel;
mod error;
mod event;
pub mod invocation;
#[cfg(feature = "logging")]
pub mod logging;
pub mod progress;
pub mod property;
mod scheduler;
mod service;
pub mod signal;
pub mod task;
pub mod threadpool;
mod timer;

pub use app::{Application, is_main_thread, main_thread_id, post_delayed, post_invocation};
pub use cancel::CancellationToken;
pub use error::{CoreError, Result, ThreadPoolError, TimerError};
pub use event::{AppEvent, EventPriority};
pub use progress::ProgressTracker;
pub use property::Property;
pub use scheduler::ScheduledId;
pub use service::{ServiceConfig, ServiceError, TaskListChange, TaskService};
pub use signal::{ConnectionGuard, ConnectionId, ConnectionType, Signal};
pub use task::{BlockScope, InputBlocker, Task, TaskContext, TaskError, TaskHandle, TaskId,
               TaskState};
pub use threadpool::{SpawnHandle, ThreadPool, ThreadPoolConfig};
pub use timer::TimerId;
