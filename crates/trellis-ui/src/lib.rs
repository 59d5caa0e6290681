//! Headless widget layer for Trellis.
//!
//! This crate provides the structural UI model the framework operates on:
//!
//! - **Widget Tree**: arena-based component trees with naming, enabled and
//!   visible state, client-property bags, and window chrome
//! - **Actions**: non-visual command objects shared by menus and toolbars
//! - **Input Blocking**: the standard
//!   [`InputBlocker`](trellis_core::InputBlocker) implementation - glass
//!   panes, menu-bar disabling, and a delayed modal progress dialog
//! - **Session Persistence**: window geometry saved and restored by name
//!
//! Nothing here renders; a rendering layer observes this model. That keeps
//! the injection and blocking machinery fully testable without a display.
//!
//! # Blocking Example
//!
//! ```
//! use std::time::Duration;
//! use trellis_core::{Task, TaskContext, TaskError, TaskHandle, TaskService};
//! use trellis_ui::{BlockTarget, BlockerConfig, DefaultInputBlocker, SharedWidgetTree};
//!
//! struct Reindex;
//!
//! impl Task for Reindex {
//!     type Output = ();
//!     type Chunk = ();
//!     fn run(&self, _ctx: &TaskContext<()>) -> Result<(), TaskError> {
//!         Ok(())
//!     }
//!     fn title(&self) -> &str {
//!         "Reindexing"
//!     }
//! }
//!
//! let tree = SharedWidgetTree::new();
//! let window = tree.write().create_window("Main");
//!
//! let handle = TaskHandle::new(Reindex);
//! DefaultInputBlocker::install(
//!     tree.clone(),
//!     BlockTarget::Window(window),
//!     BlockerConfig::with_dialog_delay(Duration::from_millis(250)),
//!     &handle,
//! );
//!
//! let service = TaskService::new("app").unwrap();
//! service.execute(&handle).unwrap();
//! ```

mod action;
mod blocker;
mod dialog;
mod error;
mod session;
mod widget;

pub use action::Action;
pub use blocker::{BlockTarget, BlockerConfig, DefaultInputBlocker};
pub use dialog::ProgressDialog;
pub use error::{Result, UiError};
pub use session::{SessionStore, WindowGeometry};
pub use widget::{
    AnyValue, Cursor, Rect, SharedWidgetTree, WidgetId, WidgetKind, WidgetTree,
};
