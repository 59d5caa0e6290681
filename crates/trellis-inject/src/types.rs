//! Runtime type descriptors for the conversion registry.
//!
//! The original design resolved conversion targets by reflecting over class
//! hierarchies at lookup time. Here the hierarchy is explicit: a
//! [`TypeKey`] identifies a target type, and a [`TypeBinding`] carries the
//! key together with its precomputed ancestor closure (the supertype and
//! interface chain), declared once at registration.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

pub use trellis_ui::AnyValue;

/// Whether a conversion target can be instantiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// An ordinary instantiable type.
    Concrete,
    /// An interface-like target (a trait object or marker); never
    /// instantiable by the generic fallback.
    Abstract,
}

/// Identifies a conversion target type at runtime.
///
/// Equality and hashing use the `TypeId` only; the name is diagnostic.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
    kind: TypeKind,
}

impl TypeKey {
    /// Key for a concrete type.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            kind: TypeKind::Concrete,
        }
    }

    /// Key for an interface-like target, usually a trait object.
    ///
    /// The display name is supplied by the caller since trait-object type
    /// names are unwieldy in error messages.
    pub fn interface<T: ?Sized + Any>(name: &'static str) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name,
            kind: TypeKind::Abstract,
        }
    }

    /// Diagnostic type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Concrete or abstract.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Whether the target is interface-like.
    pub fn is_abstract(&self) -> bool {
        self.kind == TypeKind::Abstract
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeKey")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// A conversion target plus its explicit ancestor closure.
///
/// Ancestors are the flattened supertype/interface chain; registration
/// propagates a converter along them as indirect entries.
#[derive(Debug, Clone)]
pub struct TypeBinding {
    /// The type the converter claims directly.
    pub key: TypeKey,
    /// Precomputed ancestor closure, nearest first.
    pub ancestors: Vec<TypeKey>,
}

impl TypeBinding {
    /// Binding with no ancestors.
    pub fn concrete(key: TypeKey) -> Self {
        Self {
            key,
            ancestors: Vec::new(),
        }
    }

    /// Binding with an explicit ancestor closure.
    pub fn with_ancestors(key: TypeKey, ancestors: Vec<TypeKey>) -> Self {
        Self { key, ancestors }
    }
}
