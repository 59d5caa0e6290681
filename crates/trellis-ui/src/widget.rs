//! Headless widget object model.
//!
//! A [`WidgetTree`] is an arena of widgets with parent-child ownership,
//! naming, enabled/visible flags, client-property bags, and window chrome
//! (menu bar, glass panes, geometry). It deliberately renders nothing: it is
//! the structural substrate that resource injection and input blocking
//! operate on, and that a rendering layer would sit atop.
//!
//! The tree is passed around explicitly as a [`SharedWidgetTree`] handle;
//! there is no global registry.
//!
//! # Example
//!
//! ```
//! use trellis_ui::{SharedWidgetTree, WidgetKind};
//!
//! let tree = SharedWidgetTree::new();
//! let (window, button) = {
//!     let mut tree = tree.write();
//!     let window = tree.create_window("Main");
//!     let button = tree.create_named(WidgetKind::Button, "ok");
//!     tree.add_child(window, button).unwrap();
//!     (window, button)
//! };
//!
//! assert_eq!(tree.read().window_of(button), Some(window));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use slotmap::{SlotMap, new_key_type};

use crate::error::{Result, UiError};

new_key_type! {
    /// A unique identifier for a widget in the tree.
    ///
    /// Stable handle; becomes invalid when the widget is destroyed.
    pub struct WidgetId;
}

/// A dynamic value stored in client-property bags and produced by resource
/// conversion.
///
/// `Arc` rather than `Box` so reads hand out the stored value without
/// removing it, the way an object reference would.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// The concrete kind of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    /// Generic container.
    Panel,
    /// Push button.
    Button,
    /// Static text.
    Label,
    /// Menu holding menu items.
    Menu,
    /// Horizontal menu bar holding menus.
    MenuBar,
    /// Entry in a menu.
    MenuItem,
    /// Tabbed container holding pages.
    TabPane,
    /// One page of a tab pane.
    TabPage,
    /// Table holding columns.
    Table,
    /// One column of a table.
    Column,
    /// Progress bar.
    ProgressBar,
    /// Top-level window with chrome.
    Window,
    /// Input-eating overlay installed while input is blocked.
    GlassPane,
}

impl WidgetKind {
    /// Whether this kind holds arbitrary child widgets.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Self::Panel | Self::Window | Self::TabPage | Self::GlassPane
        )
    }
}

/// Widget geometry in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a rect from position and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Mouse cursor shown over a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    /// Platform default arrow.
    #[default]
    Default,
    /// Busy/wait cursor.
    Wait,
}

/// Chrome carried by `Window` widgets.
#[derive(Debug, Default)]
struct WindowChrome {
    title: String,
    icon: Option<String>,
    menu_bar: Option<WidgetId>,
    /// Installed glass panes, oldest first; the last entry is active.
    glass_panes: Vec<WidgetId>,
    maximized: bool,
}

/// Internal data stored for each widget.
struct WidgetData {
    name: String,
    kind: WidgetKind,
    parent: Option<WidgetId>,
    children: Vec<WidgetId>,
    enabled: bool,
    visible: bool,
    cursor: Cursor,
    bounds: Rect,
    text: Option<String>,
    /// Dynamic client properties (type-erased).
    client_props: HashMap<String, AnyValue>,
    /// Window chrome; `Some` only for `Window` widgets.
    chrome: Option<WindowChrome>,
}

impl WidgetData {
    fn new(kind: WidgetKind) -> Self {
        Self {
            name: String::new(),
            kind,
            parent: None,
            children: Vec::new(),
            enabled: true,
            visible: kind != WidgetKind::Window,
            cursor: Cursor::Default,
            bounds: Rect::default(),
            text: None,
            client_props: HashMap::new(),
            chrome: (kind == WidgetKind::Window).then(WindowChrome::default),
        }
    }
}

/// Arena of widgets with parent-child ownership.
pub struct WidgetTree {
    widgets: SlotMap<WidgetId, WidgetData>,
}

impl WidgetTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            widgets: SlotMap::with_key(),
        }
    }

    // -------------------------------------------------------------------------
    // Creation & destruction
    // -------------------------------------------------------------------------

    /// Create a widget of the given kind.
    pub fn create(&mut self, kind: WidgetKind) -> WidgetId {
        let id = self.widgets.insert(WidgetData::new(kind));
        tracing::trace!(target: "trellis_ui::widget", ?id, ?kind, "created widget");
        id
    }

    /// Create a named widget of the given kind.
    pub fn create_named(&mut self, kind: WidgetKind, name: impl Into<String>) -> WidgetId {
        let id = self.create(kind);
        self.widgets[id].name = name.into();
        id
    }

    /// Create a window with the given title. Windows start hidden.
    pub fn create_window(&mut self, title: impl Into<String>) -> WidgetId {
        let id = self.create(WidgetKind::Window);
        if let Some(chrome) = self.widgets[id].chrome.as_mut() {
            chrome.title = title.into();
        }
        id
    }

    /// Destroy a widget and all its descendants.
    pub fn destroy(&mut self, id: WidgetId) -> Result<()> {
        let descendants = self.collect_descendants(id)?;

        // Detach from parent, and from window chrome if referenced there.
        let parent_id = self.widgets.get(id).ok_or(UiError::InvalidWidget)?.parent;
        if let Some(parent_id) = parent_id
            && let Some(parent) = self.widgets.get_mut(parent_id)
        {
            parent.children.retain(|&child| child != id);
            if let Some(chrome) = parent.chrome.as_mut() {
                chrome.glass_panes.retain(|&p| p != id);
                if chrome.menu_bar == Some(id) {
                    chrome.menu_bar = None;
                }
            }
        }

        for child in descendants {
            self.widgets.remove(child);
        }
        self.widgets.remove(id);
        Ok(())
    }

    fn collect_descendants(&self, id: WidgetId) -> Result<Vec<WidgetId>> {
        let mut result = Vec::new();
        self.collect_descendants_recursive(id, &mut result)?;
        Ok(result)
    }

    fn collect_descendants_recursive(&self, id: WidgetId, result: &mut Vec<WidgetId>) -> Result<()> {
        let data = self.widgets.get(id).ok_or(UiError::InvalidWidget)?;
        for &child in &data.children {
            self.collect_descendants_recursive(child, result)?;
            result.push(child);
        }
        Ok(())
    }

    /// Whether the widget exists.
    pub fn contains(&self, id: WidgetId) -> bool {
        self.widgets.contains_key(id)
    }

    /// Total number of widgets.
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    // -------------------------------------------------------------------------
    // Hierarchy
    // -------------------------------------------------------------------------

    /// Append `child` to `parent`'s children, reparenting if needed.
    pub fn add_child(&mut self, parent: WidgetId, child: WidgetId) -> Result<()> {
        let len = self.child_count(parent)?;
        self.insert_child(parent, len, child)
    }

    /// Insert `child` at `index` in `parent`'s children.
    pub fn insert_child(&mut self, parent: WidgetId, index: usize, child: WidgetId) -> Result<()> {
        if !self.widgets.contains_key(child) {
            return Err(UiError::InvalidWidget);
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(UiError::CircularParentage);
        }

        let len = self.child_count(parent)?;
        if index > len {
            return Err(UiError::NoSuchChild { index, len });
        }

        // Detach from any previous parent first. When the widget moves
        // within the same parent this shrinks the list, so re-clamp the
        // insertion point.
        if let Some(old_parent) = self.widgets[child].parent
            && let Some(old) = self.widgets.get_mut(old_parent)
        {
            old.children.retain(|&c| c != child);
        }
        let index = index.min(self.widgets[parent].children.len());

        self.widgets[parent].children.insert(index, child);
        self.widgets[child].parent = Some(parent);
        Ok(())
    }

    /// Remove `child` from its parent without destroying it.
    pub fn remove_child(&mut self, parent: WidgetId, child: WidgetId) -> Result<()> {
        let parent_data = self.widgets.get_mut(parent).ok_or(UiError::InvalidWidget)?;
        parent_data.children.retain(|&c| c != child);
        if let Some(child_data) = self.widgets.get_mut(child) {
            child_data.parent = None;
        }
        Ok(())
    }

    /// Whether `ancestor` is an ancestor of `id`.
    fn is_ancestor(&self, ancestor: WidgetId, id: WidgetId) -> bool {
        let mut current = self.widgets.get(id).and_then(|d| d.parent);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.widgets.get(p).and_then(|d| d.parent);
        }
        false
    }

    /// The widget's parent.
    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.widgets.get(id).and_then(|d| d.parent)
    }

    /// Snapshot of the widget's children.
    pub fn children(&self, id: WidgetId) -> Vec<WidgetId> {
        self.widgets
            .get(id)
            .map(|d| d.children.clone())
            .unwrap_or_default()
    }

    /// Number of children.
    pub fn child_count(&self, id: WidgetId) -> Result<usize> {
        self.widgets
            .get(id)
            .map(|d| d.children.len())
            .ok_or(UiError::InvalidWidget)
    }

    /// Child at `index`.
    pub fn child_at(&self, parent: WidgetId, index: usize) -> Result<WidgetId> {
        let data = self.widgets.get(parent).ok_or(UiError::InvalidWidget)?;
        data.children
            .get(index)
            .copied()
            .ok_or(UiError::NoSuchChild {
                index,
                len: data.children.len(),
            })
    }

    /// The window containing `id`, walking up from any descendant.
    pub fn window_of(&self, id: WidgetId) -> Option<WidgetId> {
        let mut current = Some(id);
        while let Some(widget) = current {
            let data = self.widgets.get(widget)?;
            if data.kind == WidgetKind::Window {
                return Some(widget);
            }
            current = data.parent;
        }
        None
    }

    /// All windows in the tree.
    pub fn windows(&self) -> Vec<WidgetId> {
        self.widgets
            .iter()
            .filter(|(_, d)| d.kind == WidgetKind::Window)
            .map(|(id, _)| id)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    /// The widget's kind.
    pub fn kind(&self, id: WidgetId) -> Result<WidgetKind> {
        self.widgets.get(id).map(|d| d.kind).ok_or(UiError::InvalidWidget)
    }

    /// The widget's name.
    pub fn name(&self, id: WidgetId) -> Result<String> {
        self.widgets
            .get(id)
            .map(|d| d.name.clone())
            .ok_or(UiError::InvalidWidget)
    }

    /// Rename the widget.
    pub fn set_name(&mut self, id: WidgetId, name: impl Into<String>) -> Result<()> {
        self.widgets
            .get_mut(id)
            .map(|d| d.name = name.into())
            .ok_or(UiError::InvalidWidget)
    }

    /// First widget with the given name, if any.
    pub fn find_by_name(&self, name: &str) -> Option<WidgetId> {
        self.widgets
            .iter()
            .find(|(_, d)| d.name == name)
            .map(|(id, _)| id)
    }

    /// The widget's own enabled flag.
    pub fn is_enabled(&self, id: WidgetId) -> bool {
        self.widgets.get(id).is_some_and(|d| d.enabled)
    }

    /// Set the widget's own enabled flag.
    pub fn set_enabled(&mut self, id: WidgetId, enabled: bool) -> Result<()> {
        self.widgets
            .get_mut(id)
            .map(|d| d.enabled = enabled)
            .ok_or(UiError::InvalidWidget)
    }

    /// The widget's own visible flag.
    pub fn is_visible(&self, id: WidgetId) -> bool {
        self.widgets.get(id).is_some_and(|d| d.visible)
    }

    /// Set the widget's own visible flag.
    pub fn set_visible(&mut self, id: WidgetId, visible: bool) -> Result<()> {
        self.widgets
            .get_mut(id)
            .map(|d| d.visible = visible)
            .ok_or(UiError::InvalidWidget)
    }

    /// The widget's cursor.
    pub fn cursor(&self, id: WidgetId) -> Cursor {
        self.widgets.get(id).map(|d| d.cursor).unwrap_or_default()
    }

    /// Set the widget's cursor.
    pub fn set_cursor(&mut self, id: WidgetId, cursor: Cursor) -> Result<()> {
        self.widgets
            .get_mut(id)
            .map(|d| d.cursor = cursor)
            .ok_or(UiError::InvalidWidget)
    }

    /// The widget's bounds.
    pub fn bounds(&self, id: WidgetId) -> Result<Rect> {
        self.widgets.get(id).map(|d| d.bounds).ok_or(UiError::InvalidWidget)
    }

    /// Set the widget's bounds.
    pub fn set_bounds(&mut self, id: WidgetId, bounds: Rect) -> Result<()> {
        self.widgets
            .get_mut(id)
            .map(|d| d.bounds = bounds)
            .ok_or(UiError::InvalidWidget)
    }

    /// The widget's text, if any.
    pub fn text(&self, id: WidgetId) -> Option<String> {
        self.widgets.get(id).and_then(|d| d.text.clone())
    }

    /// Set the widget's text.
    pub fn set_text(&mut self, id: WidgetId, text: impl Into<String>) -> Result<()> {
        self.widgets
            .get_mut(id)
            .map(|d| d.text = Some(text.into()))
            .ok_or(UiError::InvalidWidget)
    }

    // -------------------------------------------------------------------------
    // Client properties
    // -------------------------------------------------------------------------

    /// Store a client property on the widget.
    pub fn set_client_prop(&mut self, id: WidgetId, key: impl Into<String>, value: AnyValue) -> Result<()> {
        self.widgets
            .get_mut(id)
            .map(|d| {
                d.client_props.insert(key.into(), value);
            })
            .ok_or(UiError::InvalidWidget)
    }

    /// Fetch a client property.
    pub fn client_prop(&self, id: WidgetId, key: &str) -> Option<AnyValue> {
        self.widgets
            .get(id)
            .and_then(|d| d.client_props.get(key).cloned())
    }

    /// Remove a client property, returning it.
    pub fn remove_client_prop(&mut self, id: WidgetId, key: &str) -> Option<AnyValue> {
        self.widgets.get_mut(id).and_then(|d| d.client_props.remove(key))
    }

    /// Names of all client properties on the widget.
    pub fn client_prop_keys(&self, id: WidgetId) -> Vec<String> {
        self.widgets
            .get(id)
            .map(|d| d.client_props.keys().cloned().collect())
            .unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Window chrome
    // -------------------------------------------------------------------------

    fn chrome(&self, window: WidgetId) -> Result<&WindowChrome> {
        self.widgets
            .get(window)
            .ok_or(UiError::InvalidWidget)?
            .chrome
            .as_ref()
            .ok_or(UiError::NotAWindow)
    }

    fn chrome_mut(&mut self, window: WidgetId) -> Result<&mut WindowChrome> {
        self.widgets
            .get_mut(window)
            .ok_or(UiError::InvalidWidget)?
            .chrome
            .as_mut()
            .ok_or(UiError::NotAWindow)
    }

    /// The window title.
    pub fn window_title(&self, window: WidgetId) -> Result<String> {
        Ok(self.chrome(window)?.title.clone())
    }

    /// Set the window title.
    pub fn set_window_title(&mut self, window: WidgetId, title: impl Into<String>) -> Result<()> {
        self.chrome_mut(window)?.title = title.into();
        Ok(())
    }

    /// The window icon name.
    pub fn window_icon(&self, window: WidgetId) -> Result<Option<String>> {
        Ok(self.chrome(window)?.icon.clone())
    }

    /// Set the window icon name.
    pub fn set_window_icon(&mut self, window: WidgetId, icon: Option<String>) -> Result<()> {
        self.chrome_mut(window)?.icon = icon;
        Ok(())
    }

    /// Whether the window is maximized.
    pub fn is_maximized(&self, window: WidgetId) -> Result<bool> {
        Ok(self.chrome(window)?.maximized)
    }

    /// Set the window maximized flag.
    pub fn set_maximized(&mut self, window: WidgetId, maximized: bool) -> Result<()> {
        self.chrome_mut(window)?.maximized = maximized;
        Ok(())
    }

    /// The window's menu bar, if set.
    pub fn menu_bar(&self, window: WidgetId) -> Result<Option<WidgetId>> {
        Ok(self.chrome(window)?.menu_bar)
    }

    /// Install a menu bar on the window.
    pub fn set_menu_bar(&mut self, window: WidgetId, menu_bar: WidgetId) -> Result<()> {
        self.add_child(window, menu_bar)?;
        self.chrome_mut(window)?.menu_bar = Some(menu_bar);
        Ok(())
    }

    /// Install an input-eating glass pane over the window.
    ///
    /// Panes stack; the most recently installed is active. The pane shows a
    /// wait cursor.
    pub fn install_glass_pane(&mut self, window: WidgetId) -> Result<WidgetId> {
        self.chrome(window)?;

        let pane = self.create(WidgetKind::GlassPane);
        self.widgets[pane].cursor = Cursor::Wait;
        self.add_child(window, pane)?;
        self.chrome_mut(window)?.glass_panes.push(pane);
        tracing::debug!(target: "trellis_ui::widget", ?window, ?pane, "glass pane installed");
        Ok(pane)
    }

    /// Remove a previously installed glass pane, restoring the one below it
    /// (if any) exactly.
    pub fn remove_glass_pane(&mut self, window: WidgetId, pane: WidgetId) -> Result<()> {
        let chrome = self.chrome_mut(window)?;
        let before = chrome.glass_panes.len();
        chrome.glass_panes.retain(|&p| p != pane);
        if chrome.glass_panes.len() == before {
            return Err(UiError::InvalidWidget);
        }
        self.destroy(pane)?;
        tracing::debug!(target: "trellis_ui::widget", ?window, ?pane, "glass pane removed");
        Ok(())
    }

    /// The window's active glass pane, if one is installed.
    pub fn active_glass_pane(&self, window: WidgetId) -> Result<Option<WidgetId>> {
        Ok(self.chrome(window)?.glass_panes.last().copied())
    }

    // -------------------------------------------------------------------------
    // Input
    // -------------------------------------------------------------------------

    /// Effective enabled state: the widget's own flag, every ancestor's
    /// flag, and no active glass pane over the owning window (glass panes
    /// themselves stay "enabled" so they can eat the input).
    pub fn effective_enabled(&self, id: WidgetId) -> bool {
        let Some(data) = self.widgets.get(id) else {
            return false;
        };
        if !data.enabled {
            return false;
        }

        let mut current = data.parent;
        while let Some(p) = current {
            let Some(parent) = self.widgets.get(p) else {
                return false;
            };
            if !parent.enabled {
                return false;
            }
            current = parent.parent;
        }

        if data.kind != WidgetKind::GlassPane
            && let Some(window) = self.window_of(id)
            && let Ok(Some(_)) = self.active_glass_pane(window)
        {
            return false;
        }

        true
    }

    /// Whether a synthetic input event would reach the widget.
    pub fn dispatch_input(&self, id: WidgetId) -> bool {
        self.is_visible(id) && self.effective_enabled(id)
    }
}

impl Default for WidgetTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WidgetTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetTree")
            .field("widgets", &self.widgets.len())
            .finish()
    }
}

/// A cloneable, thread-safe handle to a [`WidgetTree`].
///
/// Constructed once and passed down to whoever needs tree access; this is
/// the ownership story for the whole widget layer.
#[derive(Clone)]
pub struct SharedWidgetTree {
    inner: Arc<RwLock<WidgetTree>>,
}

impl SharedWidgetTree {
    /// Create a handle to a fresh tree.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(WidgetTree::new())),
        }
    }

    /// Lock the tree for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, WidgetTree> {
        self.inner.read()
    }

    /// Lock the tree for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, WidgetTree> {
        self.inner.write()
    }
}

impl Default for SharedWidgetTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedWidgetTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedWidgetTree")
            .field("widgets", &self.read().len())
            .finish()
    }
}

static_assertions::assert_impl_all!(SharedWidgetTree: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_destroy_cascades() {
        let mut tree = WidgetTree::new();
        let window = tree.create_window("Main");
        let panel = tree.create(WidgetKind::Panel);
        let button = tree.create(WidgetKind::Button);

        tree.add_child(window, panel).unwrap();
        tree.add_child(panel, button).unwrap();
        assert_eq!(tree.len(), 3);

        tree.destroy(window).unwrap();
        assert!(tree.is_empty());
        assert!(!tree.contains(button));
    }

    #[test]
    fn reparenting_moves_the_child() {
        let mut tree = WidgetTree::new();
        let a = tree.create(WidgetKind::Panel);
        let b = tree.create(WidgetKind::Panel);
        let child = tree.create(WidgetKind::Button);

        tree.add_child(a, child).unwrap();
        tree.add_child(b, child).unwrap();

        assert!(tree.children(a).is_empty());
        assert_eq!(tree.children(b), vec![child]);
        assert_eq!(tree.parent(child), Some(b));
    }

    #[test]
    fn circular_parentage_is_rejected() {
        let mut tree = WidgetTree::new();
        let a = tree.create(WidgetKind::Panel);
        let b = tree.create(WidgetKind::Panel);
        tree.add_child(a, b).unwrap();

        assert!(matches!(
            tree.add_child(b, a),
            Err(UiError::CircularParentage)
        ));
        assert!(matches!(
            tree.add_child(a, a),
            Err(UiError::CircularParentage)
        ));
    }

    #[test]
    fn indexed_child_access() {
        let mut tree = WidgetTree::new();
        let menu = tree.create(WidgetKind::Menu);
        let first = tree.create(WidgetKind::MenuItem);
        let second = tree.create(WidgetKind::MenuItem);
        let inserted = tree.create(WidgetKind::MenuItem);

        tree.add_child(menu, first).unwrap();
        tree.add_child(menu, second).unwrap();
        tree.insert_child(menu, 1, inserted).unwrap();

        assert_eq!(tree.child_at(menu, 0).unwrap(), first);
        assert_eq!(tree.child_at(menu, 1).unwrap(), inserted);
        assert_eq!(tree.child_at(menu, 2).unwrap(), second);
        assert!(matches!(
            tree.child_at(menu, 3),
            Err(UiError::NoSuchChild { index: 3, len: 3 })
        ));
    }

    #[test]
    fn move_to_end_within_same_parent() {
        let mut tree = WidgetTree::new();
        let panel = tree.create(WidgetKind::Panel);
        let a = tree.create(WidgetKind::Button);
        let b = tree.create(WidgetKind::Button);
        tree.add_child(panel, a).unwrap();
        tree.add_child(panel, b).unwrap();

        // Re-appending an existing child moves it to the end.
        tree.add_child(panel, a).unwrap();
        assert_eq!(tree.children(panel), vec![b, a]);
    }

    #[test]
    fn window_lookup_from_descendant() {
        let mut tree = WidgetTree::new();
        let window = tree.create_window("Main");
        let panel = tree.create(WidgetKind::Panel);
        let button = tree.create(WidgetKind::Button);
        tree.add_child(window, panel).unwrap();
        tree.add_child(panel, button).unwrap();

        assert_eq!(tree.window_of(button), Some(window));
        assert_eq!(tree.window_of(window), Some(window));

        let orphan = tree.create(WidgetKind::Label);
        assert_eq!(tree.window_of(orphan), None);
    }

    #[test]
    fn find_by_name() {
        let mut tree = WidgetTree::new();
        let button = tree.create_named(WidgetKind::Button, "save");
        assert_eq!(tree.find_by_name("save"), Some(button));
        assert_eq!(tree.find_by_name("missing"), None);
    }

    #[test]
    fn client_props_round_trip() {
        let mut tree = WidgetTree::new();
        let widget = tree.create(WidgetKind::Label);

        tree.set_client_prop(widget, "weight", Arc::new(42i32))
            .unwrap();

        let value = tree.client_prop(widget, "weight").unwrap();
        assert_eq!(value.downcast_ref::<i32>(), Some(&42));

        let removed = tree.remove_client_prop(widget, "weight").unwrap();
        assert_eq!(removed.downcast_ref::<i32>(), Some(&42));
        assert!(tree.client_prop(widget, "weight").is_none());
    }

    #[test]
    fn enabled_state_propagates_from_ancestors() {
        let mut tree = WidgetTree::new();
        let window = tree.create_window("Main");
        let panel = tree.create(WidgetKind::Panel);
        let button = tree.create(WidgetKind::Button);
        tree.add_child(window, panel).unwrap();
        tree.add_child(panel, button).unwrap();

        assert!(tree.effective_enabled(button));

        tree.set_enabled(panel, false).unwrap();
        assert!(!tree.effective_enabled(panel));
        assert!(!tree.effective_enabled(button));
        // Own flag is untouched.
        assert!(tree.is_enabled(button));
    }

    #[test]
    fn glass_pane_eats_input_and_stacks() {
        let mut tree = WidgetTree::new();
        let window = tree.create_window("Main");
        let button = tree.create(WidgetKind::Button);
        tree.add_child(window, button).unwrap();

        assert!(tree.effective_enabled(button));

        let first = tree.install_glass_pane(window).unwrap();
        assert_eq!(tree.active_glass_pane(window).unwrap(), Some(first));
        assert!(!tree.effective_enabled(button));
        assert_eq!(tree.cursor(first), Cursor::Wait);

        // A nested block stacks a second pane.
        let second = tree.install_glass_pane(window).unwrap();
        assert_eq!(tree.active_glass_pane(window).unwrap(), Some(second));

        // Removing the second restores the first exactly.
        tree.remove_glass_pane(window, second).unwrap();
        assert_eq!(tree.active_glass_pane(window).unwrap(), Some(first));
        assert!(!tree.effective_enabled(button));

        tree.remove_glass_pane(window, first).unwrap();
        assert_eq!(tree.active_glass_pane(window).unwrap(), None);
        assert!(tree.effective_enabled(button));
    }

    #[test]
    fn menu_bar_install() {
        let mut tree = WidgetTree::new();
        let window = tree.create_window("Main");
        let bar = tree.create(WidgetKind::MenuBar);
        tree.set_menu_bar(window, bar).unwrap();

        assert_eq!(tree.menu_bar(window).unwrap(), Some(bar));
        assert_eq!(tree.parent(bar), Some(window));

        // Chrome operations on non-windows fail.
        let label = tree.create(WidgetKind::Label);
        assert!(matches!(tree.menu_bar(label), Err(UiError::NotAWindow)));
    }

    #[test]
    fn dispatch_input_needs_visible_and_enabled() {
        let mut tree = WidgetTree::new();
        let window = tree.create_window("Main");
        let button = tree.create(WidgetKind::Button);
        tree.add_child(window, button).unwrap();

        assert!(tree.dispatch_input(button));

        tree.set_visible(button, false).unwrap();
        assert!(!tree.dispatch_input(button));

        tree.set_visible(button, true).unwrap();
        tree.set_enabled(button, false).unwrap();
        assert!(!tree.dispatch_input(button));
    }

    #[test]
    fn shared_tree_cross_thread_access() {
        let tree = SharedWidgetTree::new();
        let window = tree.write().create_window("Main");

        let tree_clone = tree.clone();
        let handle = std::thread::spawn(move || tree_clone.read().windows());
        assert_eq!(handle.join().unwrap(), vec![window]);
    }
}
