//! Ambient state available to converters during injection.

use trellis_ui::WidgetId;

/// The three facts a converter may consult beyond the raw string: the root
/// of the object graph being configured, the immediate parent of the value
/// being set, and the active locale.
#[derive(Debug, Clone)]
pub struct InjectContext {
    /// Root of the object graph being configured.
    pub root: Option<WidgetId>,
    /// Immediate parent of the value being set.
    pub parent: Option<WidgetId>,
    /// Active locale, as a BCP 47 tag.
    pub locale: String,
}

impl InjectContext {
    /// Context with no graph and the default locale.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the graph root, builder-style.
    pub fn with_root(mut self, root: WidgetId) -> Self {
        self.root = Some(root);
        self
    }

    /// Set the immediate parent, builder-style.
    pub fn with_parent(mut self, parent: WidgetId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the locale, builder-style.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }
}

impl Default for InjectContext {
    fn default() -> Self {
        Self {
            root: None,
            parent: None,
            locale: "en-US".to_string(),
        }
    }
}
