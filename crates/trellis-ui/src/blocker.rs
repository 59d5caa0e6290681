//! Scoped UI input blocking while background tasks run.
//!
//! [`DefaultInputBlocker`] implements the
//! [`InputBlocker`](trellis_core::InputBlocker) contract over the widget
//! tree. The scope decides the strategy:
//!
//! - `Action`: disable a single command object.
//! - `Component`: disable a single control (cursor untouched; a disabled
//!   control cannot show a busy cursor).
//! - `Window`/`Application`: install an input-eating glass pane with a wait
//!   cursor over the target window (or every window), disable menu bars,
//!   and pop a modal progress dialog after a grace delay.
//!
//! Unblocking reverses everything, restoring prior enablement and the
//! previous glass pane exactly. Unpaired block/unblock calls are logged and
//! ignored; they can arise from racy completion ordering and are
//! recoverable UI-consistency issues, not faults.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use trellis_core::app::{cancel_delayed, post_delayed};
use trellis_core::{BlockScope, InputBlocker, ScheduledId, Task, TaskHandle};

use crate::action::Action;
use crate::dialog::ProgressDialog;
use crate::widget::{SharedWidgetTree, WidgetId};

/// What a [`DefaultInputBlocker`] blocks.
#[derive(Clone)]
pub enum BlockTarget {
    /// Disable one command object.
    Action(Arc<Action>),
    /// Disable one control.
    Component(WidgetId),
    /// Block one window behind a glass pane.
    Window(WidgetId),
    /// Block every window of the application.
    Application,
}

impl std::fmt::Debug for BlockTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action(action) => f.debug_tuple("Action").field(&action.text()).finish(),
            Self::Component(id) => f.debug_tuple("Component").field(id).finish(),
            Self::Window(id) => f.debug_tuple("Window").field(id).finish(),
            Self::Application => write!(f, "Application"),
        }
    }
}

/// Configuration for [`DefaultInputBlocker`].
#[derive(Debug, Clone)]
pub struct BlockerConfig {
    /// Grace period before the modal progress dialog appears.
    pub dialog_delay: Duration,
    /// Whether to pop a progress dialog at all (window/application scope).
    pub show_dialog: bool,
}

impl Default for BlockerConfig {
    fn default() -> Self {
        Self {
            dialog_delay: Duration::from_millis(250),
            show_dialog: true,
        }
    }
}

impl BlockerConfig {
    /// Configuration with a custom dialog delay.
    pub fn with_dialog_delay(delay: Duration) -> Self {
        Self {
            dialog_delay: delay,
            ..Default::default()
        }
    }

    /// Configuration that never pops a dialog.
    pub fn without_dialog() -> Self {
        Self {
            show_dialog: false,
            ..Default::default()
        }
    }
}

/// What the blocker needs from the task it serves.
struct TaskLink {
    title: String,
    user_cancellable: bool,
    attach: Arc<dyn Fn(&Arc<ProgressDialog>) + Send + Sync>,
}

/// Saved state for one blocked window.
struct WindowBlock {
    window: WidgetId,
    pane: WidgetId,
    /// Menu bar id and its prior enabled state.
    menu_bar: Option<(WidgetId, bool)>,
}

/// State held while blocked.
enum Engaged {
    Action {
        previous: bool,
    },
    Component {
        widget: WidgetId,
        previous: bool,
    },
    Windows {
        blocks: Vec<WindowBlock>,
        dialog: Option<Arc<ProgressDialog>>,
        /// Cleared on unblock so a pending dialog never appears late.
        dialog_armed: Arc<AtomicBool>,
        scheduled: Option<ScheduledId>,
    },
}

/// The standard [`InputBlocker`] implementation over a widget tree.
pub struct DefaultInputBlocker {
    tree: SharedWidgetTree,
    target: BlockTarget,
    config: BlockerConfig,
    link: TaskLink,
    engaged: Option<Engaged>,
}

impl DefaultInputBlocker {
    /// Create a blocker for `task` over `target`.
    pub fn new<T: Task>(
        tree: SharedWidgetTree,
        target: BlockTarget,
        config: BlockerConfig,
        task: &TaskHandle<T>,
    ) -> Self {
        let title = if task.title().is_empty() {
            "Working".to_string()
        } else {
            task.title().to_string()
        };
        let attach_task = task.clone();

        Self {
            tree,
            target,
            config,
            link: TaskLink {
                title,
                user_cancellable: task.user_cancellable(),
                attach: Arc::new(move |dialog| ProgressDialog::attach(dialog, &attach_task)),
            },
            engaged: None,
        }
    }

    /// Create a blocker and install it on the task in one step.
    pub fn install<T: Task>(
        tree: SharedWidgetTree,
        target: BlockTarget,
        config: BlockerConfig,
        task: &TaskHandle<T>,
    ) {
        let blocker = Self::new(tree, target, config, task);
        task.set_input_blocker(Box::new(blocker));
    }

    /// The dialog, if one is currently created (shown or pending).
    pub fn dialog(&self) -> Option<Arc<ProgressDialog>> {
        match &self.engaged {
            Some(Engaged::Windows { dialog, .. }) => dialog.clone(),
            _ => None,
        }
    }

    fn block_windows(&self, windows: Vec<WidgetId>) -> Engaged {
        let mut blocks = Vec::with_capacity(windows.len());
        {
            let mut tree = self.tree.write();
            for window in windows {
                let pane = match tree.install_glass_pane(window) {
                    Ok(pane) => pane,
                    Err(error) => {
                        tracing::warn!(
                            target: "trellis_ui::blocker",
                            ?window,
                            %error,
                            "could not install glass pane"
                        );
                        continue;
                    }
                };

                let menu_bar = tree.menu_bar(window).ok().flatten().map(|bar| {
                    let previous = tree.is_enabled(bar);
                    let _ = tree.set_enabled(bar, false);
                    (bar, previous)
                });

                blocks.push(WindowBlock {
                    window,
                    pane,
                    menu_bar,
                });
            }
        }

        let dialog_armed = Arc::new(AtomicBool::new(false));
        let (dialog, scheduled) = if self.config.show_dialog {
            let dialog = ProgressDialog::new(&self.link.title, self.link.user_cancellable);
            dialog_armed.store(true, Ordering::Release);

            let armed = dialog_armed.clone();
            let attach = self.link.attach.clone();
            let pending = dialog.clone();
            let scheduled = post_delayed(self.config.dialog_delay, move || {
                if armed.load(Ordering::Acquire) {
                    attach(&pending);
                    pending.show();
                }
            });
            (Some(dialog), scheduled)
        } else {
            (None, None)
        };

        Engaged::Windows {
            blocks,
            dialog,
            dialog_armed,
            scheduled,
        }
    }

    fn unblock_windows(
        &self,
        blocks: Vec<WindowBlock>,
        dialog: Option<Arc<ProgressDialog>>,
        dialog_armed: Arc<AtomicBool>,
        scheduled: Option<ScheduledId>,
    ) {
        // Disarm first: a pending dialog must never pop after unblock.
        dialog_armed.store(false, Ordering::Release);
        if let Some(id) = scheduled {
            cancel_delayed(id);
        }
        if let Some(dialog) = dialog {
            dialog.hide();
            dialog.detach();
        }

        let mut tree = self.tree.write();
        for block in blocks {
            if let Err(error) = tree.remove_glass_pane(block.window, block.pane) {
                tracing::warn!(
                    target: "trellis_ui::blocker",
                    window = ?block.window,
                    %error,
                    "could not remove glass pane"
                );
            }
            if let Some((bar, previous)) = block.menu_bar {
                let _ = tree.set_enabled(bar, previous);
            }
        }
    }
}

impl InputBlocker for DefaultInputBlocker {
    fn scope(&self) -> BlockScope {
        match self.target {
            BlockTarget::Action(_) => BlockScope::Action,
            BlockTarget::Component(_) => BlockScope::Component,
            BlockTarget::Window(_) => BlockScope::Window,
            BlockTarget::Application => BlockScope::Application,
        }
    }

    fn block(&mut self) {
        if self.engaged.is_some() {
            tracing::warn!(
                target: "trellis_ui::blocker",
                target_kind = ?self.target,
                "block() while already blocked, ignoring"
            );
            return;
        }
        tracing::debug!(
            target: "trellis_ui::blocker",
            target_kind = ?self.target,
            "blocking input"
        );

        let engaged = match &self.target {
            BlockTarget::Action(action) => {
                let previous = action.is_enabled();
                action.set_enabled(false);
                Engaged::Action { previous }
            }
            BlockTarget::Component(widget) => {
                let widget = *widget;
                let mut tree = self.tree.write();
                let previous = tree.is_enabled(widget);
                if let Err(error) = tree.set_enabled(widget, false) {
                    tracing::warn!(
                        target: "trellis_ui::blocker",
                        ?widget,
                        %error,
                        "could not disable component"
                    );
                }
                // Cursor deliberately untouched at component scope.
                Engaged::Component { widget, previous }
            }
            BlockTarget::Window(window) => self.block_windows(vec![*window]),
            BlockTarget::Application => {
                let windows = self.tree.read().windows();
                self.block_windows(windows)
            }
        };

        self.engaged = Some(engaged);
    }

    fn unblock(&mut self) {
        let Some(engaged) = self.engaged.take() else {
            tracing::warn!(
                target: "trellis_ui::blocker",
                target_kind = ?self.target,
                "unblock() while not blocked, ignoring"
            );
            return;
        };
        tracing::debug!(
            target: "trellis_ui::blocker",
            target_kind = ?self.target,
            "unblocking input"
        );

        match engaged {
            Engaged::Action { previous } => {
                if let BlockTarget::Action(action) = &self.target {
                    action.set_enabled(previous);
                }
            }
            Engaged::Component { widget, previous } => {
                let _ = self.tree.write().set_enabled(widget, previous);
            }
            Engaged::Windows {
                blocks,
                dialog,
                dialog_armed,
                scheduled,
            } => {
                self.unblock_windows(blocks, dialog, dialog_armed, scheduled);
            }
        }
    }
}

static_assertions::assert_impl_all!(DefaultInputBlocker: Send);
