//! Session persistence of window geometry.
//!
//! A [`SessionStore`] captures the geometry of named windows and restores it
//! on the next run, keyed by widget name. Storage is a small JSON file.
//!
//! # Example
//!
//! ```no_run
//! use trellis_ui::{SessionStore, SharedWidgetTree};
//!
//! let tree = SharedWidgetTree::new();
//! // ... build windows ...
//!
//! // On shutdown:
//! let mut session = SessionStore::new();
//! session.capture(&tree.read());
//! session.save("session.json").unwrap();
//!
//! // On next startup, after windows exist:
//! let session = SessionStore::load("session.json").unwrap();
//! session.restore(&mut tree.write());
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UiError};
use crate::widget::{Rect, WidgetId, WidgetTree};

/// Persisted geometry of one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub maximized: bool,
}

impl WindowGeometry {
    fn from_tree(tree: &WidgetTree, window: WidgetId) -> Option<Self> {
        let bounds = tree.bounds(window).ok()?;
        let maximized = tree.is_maximized(window).ok()?;
        Some(Self {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            maximized,
        })
    }
}

/// Window geometry keyed by widget name, serialized to JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStore {
    windows: BTreeMap<String, WindowGeometry>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Stored geometry for a window name.
    pub fn get(&self, name: &str) -> Option<&WindowGeometry> {
        self.windows.get(name)
    }

    /// Record the geometry of every named, visible window.
    ///
    /// Unnamed windows cannot be matched on restore and are skipped with a
    /// warning.
    pub fn capture(&mut self, tree: &WidgetTree) {
        for window in tree.windows() {
            if !tree.is_visible(window) {
                continue;
            }
            let name = tree.name(window).unwrap_or_default();
            if name.is_empty() {
                tracing::warn!(
                    target: "trellis_ui::session",
                    ?window,
                    "unnamed window skipped by session capture"
                );
                continue;
            }

            if let Some(geometry) = WindowGeometry::from_tree(tree, window) {
                self.windows.insert(name, geometry);
            }
        }
    }

    /// Re-apply stored geometry to windows matched by name.
    ///
    /// Returns the number of windows updated. Stored entries with no
    /// matching window are left untouched for a later restore.
    pub fn restore(&self, tree: &mut WidgetTree) -> usize {
        let mut applied = 0;
        for (name, geometry) in &self.windows {
            let Some(window) = tree.find_by_name(name) else {
                continue;
            };
            let bounds = Rect::new(geometry.x, geometry.y, geometry.width, geometry.height);
            if tree.set_bounds(window, bounds).is_ok()
                && tree.set_maximized(window, geometry.maximized).is_ok()
            {
                applied += 1;
            }
        }
        tracing::debug!(
            target: "trellis_ui::session",
            applied,
            stored = self.windows.len(),
            "session restored"
        );
        applied
    }

    /// Write the store to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| UiError::malformed(path, e))?;
        fs::write(path, json).map_err(|e| UiError::io(path, e))
    }

    /// Read a store from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| UiError::io(path, e))?;
        serde_json::from_str(&json).map_err(|e| UiError::malformed(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::WidgetKind;

    fn sized_window(tree: &mut WidgetTree, name: &str, rect: Rect) -> crate::widget::WidgetId {
        let window = tree.create_window(name);
        tree.set_name(window, name).unwrap();
        tree.set_bounds(window, rect).unwrap();
        tree.set_visible(window, true).unwrap();
        window
    }

    #[test]
    fn capture_and_restore_round_trip() {
        let mut tree = WidgetTree::new();
        let main = sized_window(&mut tree, "main", Rect::new(10.0, 20.0, 800.0, 600.0));
        tree.set_maximized(main, true).unwrap();

        let mut session = SessionStore::new();
        session.capture(&tree);
        assert_eq!(session.len(), 1);

        // Mutate, then restore.
        tree.set_bounds(main, Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        tree.set_maximized(main, false).unwrap();

        assert_eq!(session.restore(&mut tree), 1);
        assert_eq!(tree.bounds(main).unwrap(), Rect::new(10.0, 20.0, 800.0, 600.0));
        assert!(tree.is_maximized(main).unwrap());
    }

    #[test]
    fn unnamed_and_hidden_windows_are_skipped() {
        let mut tree = WidgetTree::new();
        // Window with no name.
        let unnamed = tree.create_window("Untitled");
        tree.set_visible(unnamed, true).unwrap();
        // Hidden named window.
        let hidden = sized_window(&mut tree, "hidden", Rect::new(0.0, 0.0, 10.0, 10.0));
        tree.set_visible(hidden, false).unwrap();

        let mut session = SessionStore::new();
        session.capture(&tree);
        assert!(session.is_empty());
    }

    #[test]
    fn restore_ignores_missing_windows() {
        let mut tree = WidgetTree::new();
        sized_window(&mut tree, "main", Rect::new(1.0, 2.0, 3.0, 4.0));

        let mut session = SessionStore::new();
        session.capture(&tree);

        // A fresh tree without that window: nothing applied, store intact.
        let mut other = WidgetTree::new();
        other.create(WidgetKind::Panel);
        assert_eq!(session.restore(&mut other), 0);
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut tree = WidgetTree::new();
        sized_window(&mut tree, "editor", Rect::new(5.0, 6.0, 640.0, 480.0));

        let mut session = SessionStore::new();
        session.capture(&tree);
        session.save(&path).unwrap();

        let loaded = SessionStore::load(&path).unwrap();
        assert_eq!(loaded.get("editor"), session.get("editor"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = SessionStore::load("/nonexistent/session.json").unwrap_err();
        assert!(matches!(err, UiError::Io { .. }));
    }

    #[test]
    fn load_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let err = SessionStore::load(&path).unwrap_err();
        assert!(matches!(err, UiError::Malformed { .. }));
    }
}
