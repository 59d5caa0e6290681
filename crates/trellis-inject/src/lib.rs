//! Resource injection engine for Trellis: type conversion and
//! pseudo-property access.
//!
//! Declarative resource injection walks an object graph and, for each
//! string-valued configuration entry, produces a typed value and sets it
//! back into the graph. This crate provides both halves of that machinery:
//!
//! - **Conversion** ([`ConverterRegistry`], [`TypeConverter`]): a
//!   type-directed dispatch system with explicit ancestor closures and
//!   most-specific-wins lookup, stock converters for primitives, collection
//!   placeholders, and enums, and a [`FromText`] fallback that constructs
//!   types through their own string parsing.
//! - **Pseudo-properties** ([`PropertyAccessor`], [`accessor_for`]):
//!   uniform scalar/indexed/keyed access over the widget tree's
//!   heterogeneous child APIs - menu items, tab pages, table columns,
//!   client-property bags, window facades.
//!
//! The injector that drives both is an application-level collaborator; the
//! pieces here are the reusable engine.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_inject::{ConverterRegistry, InjectContext, ValueList, accessor_for};
//! use trellis_ui::{WidgetKind, WidgetTree};
//!
//! let registry = ConverterRegistry::new();
//! let ctx = InjectContext::new();
//!
//! // "3" converts to a three-slot list placeholder...
//! let slots: ValueList = registry.convert(Some("3"), &ctx).unwrap();
//! assert_eq!(slots.len(), 3);
//!
//! // ...and typed values land in the tree through accessors.
//! let mut tree = WidgetTree::new();
//! let label = tree.create(WidgetKind::Label);
//! let props = accessor_for(WidgetKind::Label, "props").unwrap();
//! let timeout: i32 = registry.convert(Some("1500"), &ctx).unwrap();
//! props.set_keyed(&mut tree, label, "timeout", Arc::new(timeout)).unwrap();
//! ```

mod accessor;
mod context;
mod convert;
mod error;
mod types;

pub use accessor::{AccessMode, PropertyAccessor, accessor_for, accessor_for_widget};
pub use context::InjectContext;
pub use convert::{
    Collection, CollectionConverter, ConverterRegistry, EnumConverter, EnumText, FromText,
    PrimitiveConverter, TypeConverter, ValueList, ValueMap, ValueSet, collection_key,
    resolve_variant,
};
pub use error::{AccessError, AccessResult, ConvertError, ConvertResult};
pub use types::{AnyValue, TypeBinding, TypeKey, TypeKind};
