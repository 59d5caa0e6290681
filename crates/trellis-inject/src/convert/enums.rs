//! Enum conversion by declared variant name.
//!
//! Application enums opt in by implementing [`EnumText`], a declared table
//! of variant names. Resolution is a case-sensitive exact match; unknown
//! names fail listing the declared ones. This is the explicit-registry
//! replacement for resolving enum constants reflectively.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_inject::{ConverterRegistry, EnumConverter, EnumText, InjectContext, TypeKey};
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! enum Anchor {
//!     North,
//!     South,
//! }
//!
//! impl EnumText for Anchor {
//!     const VARIANTS: &'static [(&'static str, Self)] =
//!         &[("North", Self::North), ("South", Self::South)];
//! }
//!
//! let mut registry = ConverterRegistry::new();
//! registry.register(Arc::new(EnumConverter::<Anchor>::new()));
//!
//! let ctx = InjectContext::new();
//! let value = registry
//!     .convert_keyed(TypeKey::of::<Anchor>(), Some("North"), &ctx)
//!     .unwrap();
//! assert_eq!(value.downcast_ref::<Anchor>(), Some(&Anchor::North));
//! ```

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::InjectContext;
use crate::error::{ConvertError, ConvertResult};
use crate::types::{AnyValue, TypeBinding, TypeKey};

use super::TypeConverter;

/// An enum with a declared variant-name table.
pub trait EnumText: Any + Send + Sync + Copy {
    /// Declared variant names and values, in declaration order.
    const VARIANTS: &'static [(&'static str, Self)];

    /// Resolve a variant by exact, case-sensitive name.
    fn from_name(name: &str) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }
}

/// Resolve a variant from optional text, producing the standard conversion
/// errors. Shared by [`EnumConverter`] and the
/// [`from_text_via_variants!`](crate::from_text_via_variants) macro.
pub fn resolve_variant<E: EnumText>(value: Option<&str>) -> ConvertResult<E> {
    let type_name = std::any::type_name::<E>();
    let Some(name) = value else {
        return Err(ConvertError::MissingValue { type_name });
    };
    E::from_name(name).ok_or_else(|| ConvertError::UnknownVariant {
        type_name,
        name: name.to_string(),
        expected: E::VARIANTS
            .iter()
            .map(|(n, _)| *n)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Converter for one [`EnumText`] type.
pub struct EnumConverter<E: EnumText> {
    _marker: PhantomData<fn() -> E>,
}

impl<E: EnumText> EnumConverter<E> {
    /// Create the converter.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<E: EnumText> Default for EnumConverter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EnumText> TypeConverter for EnumConverter<E> {
    fn supported(&self) -> Vec<TypeBinding> {
        vec![TypeBinding::concrete(TypeKey::of::<E>())]
    }

    fn convert(
        &self,
        _target: TypeKey,
        value: Option<&str>,
        _ctx: &InjectContext,
    ) -> ConvertResult<AnyValue> {
        resolve_variant::<E>(value).map(|v| Arc::new(v) as AnyValue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConverterRegistry;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Align {
        Leading,
        Center,
        Trailing,
    }

    impl EnumText for Align {
        const VARIANTS: &'static [(&'static str, Self)] = &[
            ("Leading", Self::Leading),
            ("Center", Self::Center),
            ("Trailing", Self::Trailing),
        ];
    }

    fn registry() -> ConverterRegistry {
        let mut registry = ConverterRegistry::empty();
        registry.register(Arc::new(EnumConverter::<Align>::new()));
        registry
    }

    #[test]
    fn exact_name_resolves() {
        let ctx = InjectContext::new();
        let value = registry()
            .convert_keyed(TypeKey::of::<Align>(), Some("Center"), &ctx)
            .unwrap();
        assert_eq!(value.downcast_ref::<Align>(), Some(&Align::Center));
    }

    #[test]
    fn resolution_is_case_sensitive() {
        let ctx = InjectContext::new();
        let err = registry()
            .convert_keyed(TypeKey::of::<Align>(), Some("center"), &ctx)
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnknownVariant { .. }));
    }

    #[test]
    fn unknown_name_lists_declared_variants() {
        let ctx = InjectContext::new();
        let err = registry()
            .convert_keyed(TypeKey::of::<Align>(), Some("Middle"), &ctx)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Leading, Center, Trailing"));
    }

    #[test]
    fn absent_value_is_required() {
        let ctx = InjectContext::new();
        let err = registry()
            .convert_keyed(TypeKey::of::<Align>(), None, &ctx)
            .unwrap_err();
        assert!(matches!(err, ConvertError::MissingValue { .. }));
    }

    #[test]
    fn whitespace_is_not_stripped() {
        let ctx = InjectContext::new();
        assert!(
            registry()
                .convert_keyed(TypeKey::of::<Align>(), Some(" Center"), &ctx)
                .is_err()
        );
    }
}
