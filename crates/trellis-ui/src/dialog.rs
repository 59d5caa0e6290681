//! Headless modal progress dialog.
//!
//! The dialog models the user-facing surface of a long-running task: a
//! progress bar that starts indeterminate and switches to determinate once a
//! real progress value arrives, a status message line, and an optional
//! cancel button wired to the task's cooperative cancellation. It renders
//! nothing; a rendering layer observes its properties and signals.

use std::sync::Arc;

use parking_lot::Mutex;

use trellis_core::{Property, Signal, Task, TaskHandle};

/// Undo closure recorded while attached to a task.
type Detach = Box<dyn FnOnce() + Send>;

/// A modal progress dialog model, shown while a blocked task runs.
pub struct ProgressDialog {
    /// Dialog title, usually the task title.
    title: String,
    /// Whether the dialog blocks its owner (always true for task dialogs).
    modal: bool,
    /// Whether a cancel button is present.
    cancel_offered: bool,
    /// Whether the dialog is currently shown.
    visible: Property<bool>,
    /// Emitted when visibility changes.
    visible_changed: Signal<bool>,
    /// Whether the progress bar is in indeterminate (spinner) mode.
    indeterminate: Property<bool>,
    /// Progress percent, meaningful once determinate.
    progress: Property<u8>,
    /// Status message line.
    message: Property<String>,
    /// Emitted when the user presses the cancel button.
    cancel_requested: Signal<()>,
    /// Disconnect closures for the currently attached task.
    detach_hooks: Mutex<Vec<Detach>>,
}

impl ProgressDialog {
    /// Create a dialog. `cancel_offered` should mirror the task's
    /// [`user_cancellable`](trellis_core::Task::user_cancellable) flag.
    pub fn new(title: impl Into<String>, cancel_offered: bool) -> Arc<Self> {
        Arc::new(Self {
            title: title.into(),
            modal: true,
            cancel_offered,
            visible: Property::new(false),
            visible_changed: Signal::new(),
            indeterminate: Property::new(true),
            progress: Property::new(0),
            message: Property::new(String::new()),
            cancel_requested: Signal::new(),
            detach_hooks: Mutex::new(Vec::new()),
        })
    }

    /// The dialog title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Whether the dialog is modal.
    pub fn is_modal(&self) -> bool {
        self.modal
    }

    /// Whether a cancel button is present.
    pub fn offers_cancel(&self) -> bool {
        self.cancel_offered
    }

    /// Whether the dialog is currently shown.
    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    /// Whether the progress bar is in indeterminate mode.
    pub fn is_indeterminate(&self) -> bool {
        self.indeterminate.get()
    }

    /// Current progress percent.
    pub fn percent(&self) -> u8 {
        self.progress.get()
    }

    /// Current status message.
    pub fn message(&self) -> String {
        self.message.get()
    }

    /// Emitted when visibility changes.
    pub fn visible_changed(&self) -> &Signal<bool> {
        &self.visible_changed
    }

    /// Emitted when the user presses the cancel button.
    pub fn cancel_requested(&self) -> &Signal<()> {
        &self.cancel_requested
    }

    /// Show the dialog.
    pub fn show(&self) {
        if self.visible.set(true) {
            tracing::debug!(target: "trellis_ui::dialog", title = %self.title, "progress dialog shown");
            self.visible_changed.emit(true);
        }
    }

    /// Hide the dialog.
    pub fn hide(&self) {
        if self.visible.set(false) {
            tracing::debug!(target: "trellis_ui::dialog", title = %self.title, "progress dialog hidden");
            self.visible_changed.emit(false);
        }
    }

    /// Simulate the user pressing the cancel button.
    ///
    /// No-op when the dialog offers no cancel button.
    pub fn press_cancel(&self) {
        if !self.cancel_offered {
            return;
        }
        self.cancel_requested.emit(());
    }

    /// Wire a dialog to a task.
    ///
    /// Mirrors progress and message into the dialog properties, switches
    /// from indeterminate to determinate on the first real progress value,
    /// and routes the cancel button to `task.cancel(true)`. The connections
    /// are undone by [`detach`](Self::detach).
    pub fn attach<T: Task>(dialog: &Arc<Self>, task: &TaskHandle<T>) {
        // The task may have progressed before the dialog appears (the
        // dialog is popped after a grace delay).
        if task.has_progressed() {
            dialog.indeterminate.set_silent(false);
            dialog.progress.set_silent(task.percent());
        }
        if let Some(message) = task.message() {
            dialog.message.set_silent(message);
        }

        let mut hooks = dialog.detach_hooks.lock();

        let mirror = dialog.clone();
        let progress_conn = task.progress_changed().connect(move |&percent| {
            mirror.indeterminate.set_silent(false);
            mirror.progress.set_silent(percent);
        });
        let progress_task = task.clone();
        hooks.push(Box::new(move || {
            progress_task.progress_changed().disconnect(progress_conn);
        }));

        let mirror = dialog.clone();
        let message_conn = task.message_changed().connect(move |message| {
            mirror.message.set_silent(message.clone());
        });
        let message_task = task.clone();
        hooks.push(Box::new(move || {
            message_task.message_changed().disconnect(message_conn);
        }));

        if dialog.cancel_offered {
            let cancel_task = task.clone();
            let cancel_conn = dialog.cancel_requested.connect(move |_| {
                cancel_task.cancel(true);
            });
            let owner = dialog.clone();
            hooks.push(Box::new(move || {
                owner.cancel_requested.disconnect(cancel_conn);
            }));
        }
    }

    /// Undo every connection made by [`attach`](Self::attach).
    pub fn detach(&self) {
        for hook in self.detach_hooks.lock().drain(..) {
            hook();
        }
    }
}

impl Drop for ProgressDialog {
    fn drop(&mut self) {
        for hook in self.detach_hooks.lock().drain(..) {
            hook();
        }
    }
}

impl std::fmt::Debug for ProgressDialog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressDialog")
            .field("title", &self.title)
            .field("visible", &self.is_visible())
            .field("indeterminate", &self.is_indeterminate())
            .field("percent", &self.percent())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{TaskContext, TaskError};

    struct IdleTask;

    impl Task for IdleTask {
        type Output = ();
        type Chunk = ();

        fn run(&self, _ctx: &TaskContext<()>) -> Result<(), TaskError> {
            Ok(())
        }

        fn user_cancellable(&self) -> bool {
            true
        }
    }

    fn context_for(handle: &TaskHandle<IdleTask>) -> TaskContext<()> {
        // Drive progress the way a running body would.
        TaskContext::for_handle(handle)
    }

    #[test]
    fn starts_hidden_and_indeterminate() {
        let dialog = ProgressDialog::new("Copying", true);
        assert!(!dialog.is_visible());
        assert!(dialog.is_indeterminate());
        assert!(dialog.is_modal());
        assert!(dialog.offers_cancel());
    }

    #[test]
    fn show_hide_emit_once() {
        let dialog = ProgressDialog::new("Copying", false);
        let log = Arc::new(Mutex::new(Vec::new()));

        let log_clone = log.clone();
        dialog.visible_changed().connect(move |&v| {
            log_clone.lock().push(v);
        });

        dialog.show();
        dialog.show();
        dialog.hide();

        assert_eq!(*log.lock(), vec![true, false]);
    }

    #[test]
    fn switches_determinate_on_first_progress() {
        let dialog = ProgressDialog::new("Copying", false);
        let handle = TaskHandle::new(IdleTask);
        ProgressDialog::attach(&dialog, &handle);

        assert!(dialog.is_indeterminate());

        let ctx = context_for(&handle);
        ctx.set_progress(30);
        assert!(!dialog.is_indeterminate());
        assert_eq!(dialog.percent(), 30);

        ctx.set_message("halfway there");
        assert_eq!(dialog.message(), "halfway there");
    }

    #[test]
    fn attach_after_progress_starts_determinate() {
        let dialog = ProgressDialog::new("Copying", false);
        let handle = TaskHandle::new(IdleTask);

        let ctx = context_for(&handle);
        ctx.set_progress(60);

        ProgressDialog::attach(&dialog, &handle);
        assert!(!dialog.is_indeterminate());
        assert_eq!(dialog.percent(), 60);
    }

    #[test]
    fn cancel_button_cancels_task() {
        let dialog = ProgressDialog::new("Copying", true);
        let handle = TaskHandle::new(IdleTask);
        ProgressDialog::attach(&dialog, &handle);

        assert!(!handle.is_cancel_requested());
        dialog.press_cancel();
        assert!(handle.is_cancel_requested());
    }

    #[test]
    fn cancel_button_absent_when_not_cancellable() {
        let dialog = ProgressDialog::new("Copying", false);
        let handle = TaskHandle::new(IdleTask);
        ProgressDialog::attach(&dialog, &handle);

        dialog.press_cancel();
        assert!(!handle.is_cancel_requested());
    }

    #[test]
    fn detach_disconnects() {
        let dialog = ProgressDialog::new("Copying", false);
        let handle = TaskHandle::new(IdleTask);
        ProgressDialog::attach(&dialog, &handle);
        dialog.detach();

        let ctx = context_for(&handle);
        ctx.set_progress(80);

        // Updates no longer reach the dialog.
        assert!(dialog.is_indeterminate());
        assert_eq!(dialog.percent(), 0);
    }
}
