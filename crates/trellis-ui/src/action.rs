//! Action system for menus, toolbars, and command dispatch.
//!
//! An [`Action`] is a non-visual object representing a user command. It
//! centralizes the command's text, tooltip, and enabled state so every
//! control bound to the command reflects one source of truth - and so input
//! blocking can disable the command in one place while a background task
//! runs.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_ui::Action;
//!
//! let save = Arc::new(Action::new("&Save"));
//! assert_eq!(save.text(), "Save");
//! assert_eq!(save.mnemonic(), Some('S'));
//!
//! save.triggered().connect(|_| {
//!     println!("saving...");
//! });
//!
//! save.trigger();
//! ```

use trellis_core::{Property, Signal};

/// A non-visual command object.
///
/// Thread-safe; typically shared as `Arc<Action>` between menu items,
/// toolbar buttons, and the input-blocking machinery.
pub struct Action {
    /// Display text with the mnemonic marker stripped.
    text: Property<String>,
    /// Mnemonic character, from a `&` marker in the constructor text.
    mnemonic: Property<Option<char>>,
    /// Tooltip text.
    tooltip: Property<Option<String>>,
    /// Whether the command can currently be triggered.
    enabled: Property<bool>,
    /// Emitted when the enabled state changes.
    enabled_changed: Signal<bool>,
    /// Emitted when the command is triggered.
    triggered: Signal<()>,
}

impl Action {
    /// Create an action from display text.
    ///
    /// A `&` before a character marks it as the mnemonic and is stripped
    /// from the visible text: `"&Save"` displays as "Save" with mnemonic
    /// `S`. A literal ampersand is written `&&`.
    pub fn new(text: impl Into<String>) -> Self {
        let (display, mnemonic) = parse_mnemonic(&text.into());
        Self {
            text: Property::new(display),
            mnemonic: Property::new(mnemonic),
            tooltip: Property::new(None),
            enabled: Property::new(true),
            enabled_changed: Signal::new(),
            triggered: Signal::new(),
        }
    }

    /// Set the tooltip, builder-style.
    pub fn with_tooltip(self, tooltip: impl Into<String>) -> Self {
        self.tooltip.set_silent(Some(tooltip.into()));
        self
    }

    /// The display text (mnemonic marker stripped).
    pub fn text(&self) -> String {
        self.text.get()
    }

    /// Replace the display text, re-parsing the mnemonic marker.
    pub fn set_text(&self, text: impl Into<String>) {
        let (display, mnemonic) = parse_mnemonic(&text.into());
        self.text.set_silent(display);
        self.mnemonic.set_silent(mnemonic);
    }

    /// The mnemonic character, if any.
    pub fn mnemonic(&self) -> Option<char> {
        self.mnemonic.get()
    }

    /// The tooltip text, if any.
    pub fn tooltip(&self) -> Option<String> {
        self.tooltip.get()
    }

    /// Set the tooltip text.
    pub fn set_tooltip(&self, tooltip: impl Into<String>) {
        self.tooltip.set_silent(Some(tooltip.into()));
    }

    /// Whether the command can currently be triggered.
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Enable or disable the command. Emits `enabled_changed` on change.
    pub fn set_enabled(&self, enabled: bool) {
        if self.enabled.set(enabled) {
            self.enabled_changed.emit(enabled);
        }
    }

    /// Signal emitted when the enabled state changes.
    pub fn enabled_changed(&self) -> &Signal<bool> {
        &self.enabled_changed
    }

    /// Signal emitted when the command is triggered.
    pub fn triggered(&self) -> &Signal<()> {
        &self.triggered
    }

    /// Trigger the command. Disabled actions ignore the trigger.
    pub fn trigger(&self) {
        if !self.is_enabled() {
            tracing::trace!(
                target: "trellis_ui::action",
                text = %self.text(),
                "trigger on disabled action ignored"
            );
            return;
        }
        self.triggered.emit(());
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("text", &self.text())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

static_assertions::assert_impl_all!(Action: Send, Sync);

/// Split `&`-marked text into display text and mnemonic. `&&` escapes a
/// literal ampersand.
fn parse_mnemonic(text: &str) -> (String, Option<char>) {
    let mut display = String::with_capacity(text.len());
    let mut mnemonic = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c == '&' {
            match chars.next() {
                Some('&') => display.push('&'),
                Some(next) => {
                    if mnemonic.is_none() {
                        mnemonic = Some(next);
                    }
                    display.push(next);
                }
                None => break,
            }
        } else {
            display.push(c);
        }
    }

    (display, mnemonic)
}
