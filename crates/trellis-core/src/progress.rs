//! Progress reporting for background tasks.
//!
//! Progress is tracked on a 0-100 percent scale. Bodies working in other
//! units report through [`ProgressTracker::set_range_progress`], which
//! normalizes an arbitrary odometer range onto the percent scale. UI widgets
//! showing indeterminate spinners can switch to a determinate bar once
//! [`ProgressTracker::has_progressed`] reports that a real value arrived.
//!
//! # Example
//!
//! ```
//! use trellis_core::ProgressTracker;
//!
//! let progress = ProgressTracker::new();
//!
//! progress.progress_changed().connect(|&pct| {
//!     println!("{}%", pct);
//! });
//!
//! // 30 files of 120 processed.
//! progress.set_range_progress(30.0, 0.0, 120.0);
//! assert_eq!(progress.percent(), 25);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use parking_lot::Mutex;

use crate::signal::Signal;

/// Internal state shared between tracker handles.
struct ProgressTrackerInner {
    /// Progress percent, 0-100.
    percent: AtomicU8,
    /// Whether any real progress value has been reported yet.
    progressed: AtomicBool,
    /// Current status message.
    message: Mutex<Option<String>>,
    /// Signal emitted when the percent changes.
    progress_changed: Signal<u8>,
    /// Signal emitted when the message changes.
    message_changed: Signal<String>,
}

/// A thread-safe progress tracker for background tasks.
///
/// Cloning a tracker yields another handle to the same state, so a task body
/// on a pool thread and a progress bar on the UI thread observe one value.
/// Change signals use the standard connection types; connect with
/// `ConnectionType::Queued` (or rely on `Auto`) for UI-thread delivery.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<ProgressTrackerInner>,
}

impl ProgressTracker {
    /// Create a new tracker at 0 percent with no message.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ProgressTrackerInner {
                percent: AtomicU8::new(0),
                progressed: AtomicBool::new(false),
                message: Mutex::new(None),
                progress_changed: Signal::new(),
                message_changed: Signal::new(),
            }),
        }
    }

    /// Get the current progress percent (0-100).
    pub fn percent(&self) -> u8 {
        self.inner.percent.load(Ordering::Acquire)
    }

    /// Whether any real progress value has been reported.
    ///
    /// `false` until the first `set_percent`/`set_range_progress` call;
    /// drives the indeterminate-to-determinate switch in progress dialogs.
    pub fn has_progressed(&self) -> bool {
        self.inner.progressed.load(Ordering::Acquire)
    }

    /// Set the progress percent.
    ///
    /// Values above 100 are clamped with a warning. Emits `progress_changed`
    /// if the value actually changed.
    pub fn set_percent(&self, percent: u8) {
        let clamped = if percent > 100 {
            tracing::warn!(
                target: "trellis_core::progress",
                percent,
                "progress above 100, clamping"
            );
            100
        } else {
            percent
        };

        self.inner.progressed.store(true, Ordering::Release);
        let old = self.inner.percent.swap(clamped, Ordering::AcqRel);
        if old != clamped {
            self.inner.progress_changed.emit(clamped);
        }
    }

    /// Report progress on an arbitrary odometer range.
    ///
    /// Normalizes `value` within `min..=max` onto the 0-100 percent scale.
    /// A degenerate range (`min >= max`) or out-of-range value is clamped
    /// with a warning rather than raised: progress is advisory display
    /// state, not data.
    pub fn set_range_progress(&self, value: f64, min: f64, max: f64) {
        if min >= max {
            tracing::warn!(
                target: "trellis_core::progress",
                min,
                max,
                "degenerate progress range, ignoring"
            );
            return;
        }
        if value < min || value > max {
            tracing::warn!(
                target: "trellis_core::progress",
                value,
                min,
                max,
                "progress value outside range, clamping"
            );
        }

        let fraction = ((value - min) / (max - min)).clamp(0.0, 1.0);
        self.set_percent((fraction * 100.0).round() as u8);
    }

    /// Get the current status message.
    pub fn message(&self) -> Option<String> {
        self.inner.message.lock().clone()
    }

    /// Set the status message. Emits `message_changed`.
    pub fn set_message(&self, message: impl Into<String>) {
        let new_message = message.into();
        {
            let mut guard = self.inner.message.lock();
            *guard = Some(new_message.clone());
        }
        self.inner.message_changed.emit(new_message);
    }

    /// Signal emitted whenever the percent changes.
    pub fn progress_changed(&self) -> &Signal<u8> {
        &self.inner.progress_changed
    }

    /// Signal emitted whenever the message changes.
    pub fn message_changed(&self) -> &Signal<String> {
        &self.inner.message_changed
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("percent", &self.percent())
            .field("message", &self.message())
            .finish()
    }
}

static_assertions::assert_impl_all!(ProgressTracker: Send, Sync);
