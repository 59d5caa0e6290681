//! Error types for the widget layer.

use std::path::PathBuf;

/// Result type alias for widget-layer operations.
pub type Result<T> = std::result::Result<T, UiError>;

/// Errors that can occur in the widget layer.
#[derive(Debug, thiserror::Error)]
pub enum UiError {
    /// The widget ID is invalid or has been destroyed.
    #[error("Invalid or destroyed widget ID")]
    InvalidWidget,

    /// Attempted to make a widget its own parent or ancestor.
    #[error("Cannot make a widget its own parent or ancestor")]
    CircularParentage,

    /// A window operation was attempted on a non-window widget.
    #[error("Widget is not a window")]
    NotAWindow,

    /// An indexed child access was out of bounds.
    #[error("No child at index {index} (child count {len})")]
    NoSuchChild { index: usize, len: usize },

    /// Session file I/O error.
    #[error("Failed to access session file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Session file did not parse.
    #[error("Malformed session file '{path}': {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl UiError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a malformed-file error.
    pub fn malformed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Malformed {
            path: path.into(),
            source,
        }
    }
}
