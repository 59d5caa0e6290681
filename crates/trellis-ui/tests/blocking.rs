//! End-to-end input blocking: a real service, a window-scoped task, and the
//! full block/dialog/unblock cycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use trellis_core::{Task, TaskContext, TaskError, TaskHandle, TaskService};
use trellis_ui::{BlockTarget, BlockerConfig, DefaultInputBlocker, SharedWidgetTree};

struct GatedTask {
    /// The body waits until this flips, so the test can observe the blocked
    /// UI state while the task is in flight.
    release: Arc<Mutex<bool>>,
    progress_steps: Vec<u8>,
}

impl Task for GatedTask {
    type Output = ();
    type Chunk = ();

    fn run(&self, ctx: &TaskContext<()>) -> Result<(), TaskError> {
        for &step in &self.progress_steps {
            ctx.set_progress(step);
        }
        while !*self.release.lock() {
            if ctx.is_cancelled() {
                return Err(TaskError::Cancelled);
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        Ok(())
    }

    fn title(&self) -> &str {
        "Synchronizing"
    }

    fn user_cancellable(&self) -> bool {
        true
    }
}

fn wait_done<T: Task>(handle: &TaskHandle<T>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !handle.is_done() {
        assert!(Instant::now() < deadline, "task did not finish in time");
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn window_scope_blocks_dialogs_and_restores() {
    let tree = SharedWidgetTree::new();
    let (window, button, bar) = {
        let mut tree = tree.write();
        let window = tree.create_window("Main");
        let button = tree.create(trellis_ui::WidgetKind::Button);
        tree.add_child(window, button).unwrap();
        let bar = tree.create(trellis_ui::WidgetKind::MenuBar);
        tree.set_menu_bar(window, bar).unwrap();
        (window, button, bar)
    };

    let release = Arc::new(Mutex::new(false));
    let handle = TaskHandle::new(GatedTask {
        release: release.clone(),
        progress_steps: vec![10, 40, 90],
    });

    DefaultInputBlocker::install(
        tree.clone(),
        BlockTarget::Window(window),
        BlockerConfig::with_dialog_delay(Duration::ZERO),
        &handle,
    );

    let service = TaskService::new("blocking").unwrap();
    service.execute(&handle).unwrap();

    // block() ran synchronously during execute (no event loop in tests):
    // overlay present, menu bar disabled, input does not reach the button.
    {
        let tree = tree.read();
        assert!(tree.active_glass_pane(window).unwrap().is_some());
        assert!(!tree.is_enabled(bar));
        assert!(!tree.dispatch_input(button));
    }

    // Let the task finish; the done transition releases the block.
    *release.lock() = true;
    wait_done(&handle);
    assert!(service.wait_idle(Duration::from_secs(5)));

    {
        let tree = tree.read();
        assert!(tree.active_glass_pane(window).unwrap().is_none());
        assert!(tree.is_enabled(bar));
        assert!(tree.dispatch_input(button));
    }
}

#[test]
fn action_scope_disables_only_the_action() {
    let tree = SharedWidgetTree::new();
    let window = tree.write().create_window("Main");
    let action = Arc::new(trellis_ui::Action::new("&Export"));

    let release = Arc::new(Mutex::new(false));
    let handle = TaskHandle::new(GatedTask {
        release: release.clone(),
        progress_steps: vec![],
    });

    DefaultInputBlocker::install(
        tree.clone(),
        BlockTarget::Action(action.clone()),
        BlockerConfig::without_dialog(),
        &handle,
    );

    let service = TaskService::new("blocking").unwrap();
    service.execute(&handle).unwrap();

    assert!(!action.is_enabled());
    // Window untouched at action scope.
    assert!(tree.read().active_glass_pane(window).unwrap().is_none());

    *release.lock() = true;
    wait_done(&handle);
    assert!(service.wait_idle(Duration::from_secs(5)));
    assert!(action.is_enabled());
}

#[test]
fn cancelled_blocked_task_still_releases_the_window() {
    let tree = SharedWidgetTree::new();
    let window = tree.write().create_window("Main");

    let release = Arc::new(Mutex::new(false));
    let handle = TaskHandle::new(GatedTask {
        release,
        progress_steps: vec![5],
    });

    DefaultInputBlocker::install(
        tree.clone(),
        BlockTarget::Window(window),
        BlockerConfig::with_dialog_delay(Duration::ZERO),
        &handle,
    );

    let service = TaskService::new("blocking").unwrap();
    service.execute(&handle).unwrap();
    assert!(tree.read().active_glass_pane(window).unwrap().is_some());

    // The gate never opens; only cancellation can finish the task.
    assert!(handle.cancel(true));

    wait_done(&handle);
    assert!(service.wait_idle(Duration::from_secs(5)));
    assert_eq!(handle.state(), trellis_core::TaskState::Cancelled);
    assert!(tree.read().active_glass_pane(window).unwrap().is_none());
}
