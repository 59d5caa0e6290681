//! Pseudo-property accessors over the widget tree.
//!
//! Widget trees expose heterogeneous child-access APIs: the Nth item of a
//! menu, the Nth page of a tab pane, a string-keyed client-property bag, a
//! window's icon. A [`PropertyAccessor`] unifies them behind one
//! injector-facing contract with three access modes; a mode an accessor
//! does not support fails with [`AccessError::NotApplicable`].
//!
//! Accessor selection is a closed match over widget kind and property name
//! ([`accessor_for`]), not open-ended reflection.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_inject::accessor_for;
//! use trellis_ui::{WidgetKind, WidgetTree};
//!
//! let mut tree = WidgetTree::new();
//! let menu = tree.create(WidgetKind::Menu);
//! let item = tree.create(WidgetKind::MenuItem);
//!
//! let items = accessor_for(WidgetKind::Menu, "items").unwrap();
//! items.set_indexed(&mut tree, menu, 0, Arc::new(item)).unwrap();
//!
//! let first = items.get_indexed(&tree, menu, 0).unwrap();
//! assert_eq!(first.downcast_ref(), Some(&item));
//! ```

use std::sync::Arc;

use trellis_ui::{Rect, UiError, WidgetId, WidgetKind, WidgetTree};

use crate::error::{AccessError, AccessResult};
use crate::types::{AnyValue, TypeKey};

/// How a pseudo-property is being accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Single-valued get/set.
    Scalar,
    /// Element access by position.
    Indexed,
    /// Element access by string key.
    Keyed,
}

impl AccessMode {
    fn name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Indexed => "indexed",
            Self::Keyed => "keyed",
        }
    }
}

fn not_applicable(property: &'static str, mode: AccessMode) -> AccessError {
    AccessError::NotApplicable {
        property,
        mode: mode.name(),
    }
}

fn tree_error(error: UiError) -> AccessError {
    match error {
        UiError::NoSuchChild { index, len } => AccessError::IndexOutOfBounds { index, len },
        _ => AccessError::InvalidWidget,
    }
}

/// Uniform get/set contract over a widget pseudo-property.
///
/// One accessor type may support scalar, indexed, or keyed access - or a
/// combination; `is_readable`/`is_writable` report which. Unsupported modes
/// fail with [`AccessError::NotApplicable`].
pub trait PropertyAccessor: Send + Sync + std::fmt::Debug {
    /// The property name this accessor serves.
    fn name(&self) -> &'static str;

    /// The element type, for documentation and validation.
    fn element_type(&self) -> TypeKey;

    /// Whether the given access mode can read.
    fn is_readable(&self, mode: AccessMode) -> bool;

    /// Whether the given access mode can write.
    fn is_writable(&self, mode: AccessMode) -> bool;

    /// Scalar read.
    fn get(&self, tree: &WidgetTree, target: WidgetId) -> AccessResult<AnyValue> {
        let _ = (tree, target);
        Err(not_applicable(self.name(), AccessMode::Scalar))
    }

    /// Scalar write.
    fn set(&self, tree: &mut WidgetTree, target: WidgetId, value: AnyValue) -> AccessResult<()> {
        let _ = (tree, target, value);
        Err(not_applicable(self.name(), AccessMode::Scalar))
    }

    /// Indexed read.
    fn get_indexed(&self, tree: &WidgetTree, target: WidgetId, index: usize) -> AccessResult<AnyValue> {
        let _ = (tree, target, index);
        Err(not_applicable(self.name(), AccessMode::Indexed))
    }

    /// Indexed write.
    fn set_indexed(
        &self,
        tree: &mut WidgetTree,
        target: WidgetId,
        index: usize,
        value: AnyValue,
    ) -> AccessResult<()> {
        let _ = (tree, target, index, value);
        Err(not_applicable(self.name(), AccessMode::Indexed))
    }

    /// Keyed read.
    fn get_keyed(&self, tree: &WidgetTree, target: WidgetId, key: &str) -> AccessResult<AnyValue> {
        let _ = (tree, target, key);
        Err(not_applicable(self.name(), AccessMode::Keyed))
    }

    /// Keyed write.
    fn set_keyed(
        &self,
        tree: &mut WidgetTree,
        target: WidgetId,
        key: &str,
        value: AnyValue,
    ) -> AccessResult<()> {
        let _ = (tree, target, key, value);
        Err(not_applicable(self.name(), AccessMode::Keyed))
    }
}

// -----------------------------------------------------------------------------
// Indexed children (containers, menus, tab panes, table columns)
// -----------------------------------------------------------------------------

/// Indexed access to a widget's children. One type serves several property
/// names; the selection layer decides which widget kinds each applies to.
#[derive(Debug)]
struct IndexedChildren {
    name: &'static str,
}

impl PropertyAccessor for IndexedChildren {
    fn name(&self) -> &'static str {
        self.name
    }

    fn element_type(&self) -> TypeKey {
        TypeKey::of::<WidgetId>()
    }

    fn is_readable(&self, mode: AccessMode) -> bool {
        mode == AccessMode::Indexed
    }

    fn is_writable(&self, mode: AccessMode) -> bool {
        mode == AccessMode::Indexed
    }

    fn get_indexed(&self, tree: &WidgetTree, target: WidgetId, index: usize) -> AccessResult<AnyValue> {
        let child = tree.child_at(target, index).map_err(tree_error)?;
        Ok(Arc::new(child))
    }

    fn set_indexed(
        &self,
        tree: &mut WidgetTree,
        target: WidgetId,
        index: usize,
        value: AnyValue,
    ) -> AccessResult<()> {
        let child = *value
            .downcast_ref::<WidgetId>()
            .ok_or(AccessError::ValueType {
                property: self.name,
            })?;
        tree.insert_child(target, index, child).map_err(tree_error)
    }
}

// -----------------------------------------------------------------------------
// Keyed client properties
// -----------------------------------------------------------------------------

/// Keyed access to the widget's client-property bag.
#[derive(Debug)]
struct ClientProps;

impl PropertyAccessor for ClientProps {
    fn name(&self) -> &'static str {
        "props"
    }

    fn element_type(&self) -> TypeKey {
        TypeKey::of::<AnyValue>()
    }

    fn is_readable(&self, mode: AccessMode) -> bool {
        mode == AccessMode::Keyed
    }

    fn is_writable(&self, mode: AccessMode) -> bool {
        mode == AccessMode::Keyed
    }

    fn get_keyed(&self, tree: &WidgetTree, target: WidgetId, key: &str) -> AccessResult<AnyValue> {
        if !tree.contains(target) {
            return Err(AccessError::InvalidWidget);
        }
        tree.client_prop(target, key).ok_or_else(|| AccessError::KeyMissing {
            key: key.to_string(),
        })
    }

    fn set_keyed(
        &self,
        tree: &mut WidgetTree,
        target: WidgetId,
        key: &str,
        value: AnyValue,
    ) -> AccessResult<()> {
        tree.set_client_prop(target, key, value)
            .map_err(|_| AccessError::InvalidWidget)
    }
}

// -----------------------------------------------------------------------------
// Scalar facades
// -----------------------------------------------------------------------------

/// A window's content pane: its first child that is neither chrome (menu
/// bar) nor overlay (glass pane).
#[derive(Debug)]
struct ContentPane;

impl ContentPane {
    fn find(tree: &WidgetTree, window: WidgetId) -> AccessResult<Option<WidgetId>> {
        if tree.kind(window).map_err(tree_error)? != WidgetKind::Window {
            return Err(AccessError::InvalidWidget);
        }
        let menu_bar = tree.menu_bar(window).map_err(tree_error)?;
        Ok(tree.children(window).into_iter().find(|&child| {
            Some(child) != menu_bar
                && tree.kind(child).is_ok_and(|k| k != WidgetKind::GlassPane)
        }))
    }
}

impl PropertyAccessor for ContentPane {
    fn name(&self) -> &'static str {
        "pane"
    }

    fn element_type(&self) -> TypeKey {
        TypeKey::of::<WidgetId>()
    }

    fn is_readable(&self, mode: AccessMode) -> bool {
        mode == AccessMode::Scalar
    }

    fn is_writable(&self, mode: AccessMode) -> bool {
        mode == AccessMode::Scalar
    }

    fn get(&self, tree: &WidgetTree, target: WidgetId) -> AccessResult<AnyValue> {
        let pane = Self::find(tree, target)?.ok_or_else(|| AccessError::KeyMissing {
            key: "pane".to_string(),
        })?;
        Ok(Arc::new(pane))
    }

    fn set(&self, tree: &mut WidgetTree, target: WidgetId, value: AnyValue) -> AccessResult<()> {
        let pane = *value
            .downcast_ref::<WidgetId>()
            .ok_or(AccessError::ValueType { property: "pane" })?;
        // Replace the previous content pane, if any.
        if let Some(previous) = Self::find(tree, target)? {
            tree.remove_child(target, previous).map_err(tree_error)?;
        }
        tree.add_child(target, pane).map_err(tree_error)
    }
}

/// A window's icon name.
#[derive(Debug)]
struct WindowIcon;

impl PropertyAccessor for WindowIcon {
    fn name(&self) -> &'static str {
        "icon"
    }

    fn element_type(&self) -> TypeKey {
        TypeKey::of::<String>()
    }

    fn is_readable(&self, mode: AccessMode) -> bool {
        mode == AccessMode::Scalar
    }

    fn is_writable(&self, mode: AccessMode) -> bool {
        mode == AccessMode::Scalar
    }

    fn get(&self, tree: &WidgetTree, target: WidgetId) -> AccessResult<AnyValue> {
        let icon = tree.window_icon(target).map_err(tree_error)?;
        Ok(Arc::new(icon))
    }

    fn set(&self, tree: &mut WidgetTree, target: WidgetId, value: AnyValue) -> AccessResult<()> {
        let icon = value
            .downcast_ref::<String>()
            .cloned()
            .ok_or(AccessError::ValueType { property: "icon" })?;
        tree.set_window_icon(target, Some(icon)).map_err(tree_error)
    }
}

/// Any widget's bounds rectangle.
#[derive(Debug)]
struct Bounds;

impl PropertyAccessor for Bounds {
    fn name(&self) -> &'static str {
        "bounds"
    }

    fn element_type(&self) -> TypeKey {
        TypeKey::of::<Rect>()
    }

    fn is_readable(&self, mode: AccessMode) -> bool {
        mode == AccessMode::Scalar
    }

    fn is_writable(&self, mode: AccessMode) -> bool {
        mode == AccessMode::Scalar
    }

    fn get(&self, tree: &WidgetTree, target: WidgetId) -> AccessResult<AnyValue> {
        let bounds = tree.bounds(target).map_err(tree_error)?;
        Ok(Arc::new(bounds))
    }

    fn set(&self, tree: &mut WidgetTree, target: WidgetId, value: AnyValue) -> AccessResult<()> {
        let bounds = *value
            .downcast_ref::<Rect>()
            .ok_or(AccessError::ValueType { property: "bounds" })?;
        tree.set_bounds(target, bounds).map_err(tree_error)
    }
}

// -----------------------------------------------------------------------------
// Selection
// -----------------------------------------------------------------------------

static CHILDREN: IndexedChildren = IndexedChildren { name: "children" };
static MENU_ITEMS: IndexedChildren = IndexedChildren { name: "items" };
static PAGES: IndexedChildren = IndexedChildren { name: "pages" };
static COLUMNS: IndexedChildren = IndexedChildren { name: "columns" };
static CLIENT_PROPS: ClientProps = ClientProps;
static CONTENT_PANE: ContentPane = ContentPane;
static WINDOW_ICON: WindowIcon = WindowIcon;
static BOUNDS: Bounds = Bounds;

/// Select the accessor for a widget kind / property name pair.
///
/// The match is closed over the known container kinds; unknown pairs yield
/// `None` (the injector reports them as configuration errors).
pub fn accessor_for(kind: WidgetKind, property: &str) -> Option<&'static dyn PropertyAccessor> {
    match (kind, property) {
        (kind, "children") if kind.is_container() => Some(&CHILDREN),
        (WidgetKind::Menu | WidgetKind::MenuBar, "items") => Some(&MENU_ITEMS),
        (WidgetKind::TabPane, "pages") => Some(&PAGES),
        (WidgetKind::Table, "columns") => Some(&COLUMNS),
        (WidgetKind::Window, "pane") => Some(&CONTENT_PANE),
        (WidgetKind::Window, "icon") => Some(&WINDOW_ICON),
        (_, "props") => Some(&CLIENT_PROPS),
        (_, "bounds") => Some(&BOUNDS),
        _ => None,
    }
}

/// Select the accessor for a live widget, reading its kind from the tree.
pub fn accessor_for_widget(
    tree: &WidgetTree,
    target: WidgetId,
    property: &str,
) -> AccessResult<&'static dyn PropertyAccessor> {
    let kind = tree.kind(target).map_err(tree_error)?;
    accessor_for(kind, property).ok_or_else(|| AccessError::UnknownProperty {
        property: property.to_string(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_contract_is_reported_and_enforced() {
        let mut tree = WidgetTree::new();
        let menu = tree.create(WidgetKind::Menu);

        let items = accessor_for(WidgetKind::Menu, "items").unwrap();
        assert!(items.is_readable(AccessMode::Indexed));
        assert!(items.is_writable(AccessMode::Indexed));
        assert!(!items.is_readable(AccessMode::Scalar));
        assert!(!items.is_readable(AccessMode::Keyed));

        // Unsupported modes fail with NotApplicable.
        assert!(matches!(
            items.get(&tree, menu),
            Err(AccessError::NotApplicable { mode: "scalar", .. })
        ));
        assert!(matches!(
            items.get_keyed(&tree, menu, "x"),
            Err(AccessError::NotApplicable { mode: "keyed", .. })
        ));
        assert!(matches!(
            items.set(&mut tree, menu, Arc::new(0i32)),
            Err(AccessError::NotApplicable { .. })
        ));
    }

    #[test]
    fn menu_items_indexed_round_trip() {
        let mut tree = WidgetTree::new();
        let menu = tree.create(WidgetKind::Menu);
        let open = tree.create(WidgetKind::MenuItem);
        let quit = tree.create(WidgetKind::MenuItem);

        let items = accessor_for(WidgetKind::Menu, "items").unwrap();
        items.set_indexed(&mut tree, menu, 0, Arc::new(open)).unwrap();
        items.set_indexed(&mut tree, menu, 1, Arc::new(quit)).unwrap();

        let first = items.get_indexed(&tree, menu, 0).unwrap();
        assert_eq!(first.downcast_ref(), Some(&open));

        assert!(matches!(
            items.get_indexed(&tree, menu, 5),
            Err(AccessError::IndexOutOfBounds { index: 5, len: 2 })
        ));
    }

    #[test]
    fn wrong_value_type_is_rejected() {
        let mut tree = WidgetTree::new();
        let menu = tree.create(WidgetKind::Menu);

        let items = accessor_for(WidgetKind::Menu, "items").unwrap();
        let err = items
            .set_indexed(&mut tree, menu, 0, Arc::new("not a widget id"))
            .unwrap_err();
        assert!(matches!(err, AccessError::ValueType { .. }));
    }

    #[test]
    fn client_props_keyed_round_trip() {
        let mut tree = WidgetTree::new();
        let label = tree.create(WidgetKind::Label);

        let props = accessor_for(WidgetKind::Label, "props").unwrap();
        props
            .set_keyed(&mut tree, label, "weight", Arc::new(3u32))
            .unwrap();

        let value = props.get_keyed(&tree, label, "weight").unwrap();
        assert_eq!(value.downcast_ref::<u32>(), Some(&3));

        assert!(matches!(
            props.get_keyed(&tree, label, "missing"),
            Err(AccessError::KeyMissing { .. })
        ));
    }

    #[test]
    fn content_pane_facade() {
        let mut tree = WidgetTree::new();
        let window = tree.create_window("Main");
        let bar = tree.create(WidgetKind::MenuBar);
        tree.set_menu_bar(window, bar).unwrap();

        let pane = accessor_for(WidgetKind::Window, "pane").unwrap();

        // No content yet: the menu bar does not count.
        assert!(matches!(
            pane.get(&tree, window),
            Err(AccessError::KeyMissing { .. })
        ));

        let panel = tree.create(WidgetKind::Panel);
        pane.set(&mut tree, window, Arc::new(panel)).unwrap();
        assert_eq!(pane.get(&tree, window).unwrap().downcast_ref(), Some(&panel));

        // Setting again replaces the previous content pane.
        let replacement = tree.create(WidgetKind::Panel);
        pane.set(&mut tree, window, Arc::new(replacement)).unwrap();
        assert_eq!(
            pane.get(&tree, window).unwrap().downcast_ref(),
            Some(&replacement)
        );
        assert_eq!(tree.parent(panel), None);
    }

    #[test]
    fn window_icon_facade() {
        let mut tree = WidgetTree::new();
        let window = tree.create_window("Main");

        let icon = accessor_for(WidgetKind::Window, "icon").unwrap();
        icon.set(&mut tree, window, Arc::new("app-icon".to_string()))
            .unwrap();

        let value = icon.get(&tree, window).unwrap();
        assert_eq!(
            value.downcast_ref::<Option<String>>(),
            Some(&Some("app-icon".to_string()))
        );
    }

    #[test]
    fn bounds_facade() {
        let mut tree = WidgetTree::new();
        let button = tree.create(WidgetKind::Button);

        let bounds = accessor_for(WidgetKind::Button, "bounds").unwrap();
        bounds
            .set(&mut tree, button, Arc::new(Rect::new(1.0, 2.0, 30.0, 40.0)))
            .unwrap();

        let value = bounds.get(&tree, button).unwrap();
        assert_eq!(
            value.downcast_ref::<Rect>(),
            Some(&Rect::new(1.0, 2.0, 30.0, 40.0))
        );
    }

    #[test]
    fn selection_is_kind_aware() {
        // "items" exists for menus, not for panels.
        assert!(accessor_for(WidgetKind::Menu, "items").is_some());
        assert!(accessor_for(WidgetKind::Panel, "items").is_none());

        // "children" only for containers.
        assert!(accessor_for(WidgetKind::Panel, "children").is_some());
        assert!(accessor_for(WidgetKind::Label, "children").is_none());

        // "props" and "bounds" for any kind.
        assert!(accessor_for(WidgetKind::Label, "props").is_some());
        assert!(accessor_for(WidgetKind::Label, "bounds").is_some());

        assert!(accessor_for(WidgetKind::Label, "nonsense").is_none());
    }

    #[test]
    fn accessor_for_widget_reads_kind_from_tree() {
        let mut tree = WidgetTree::new();
        let table = tree.create(WidgetKind::Table);

        let columns = accessor_for_widget(&tree, table, "columns").unwrap();
        assert_eq!(columns.name(), "columns");

        let err = accessor_for_widget(&tree, table, "pages").unwrap_err();
        assert!(matches!(err, AccessError::UnknownProperty { .. }));
    }
}
