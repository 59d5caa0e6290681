//! String-to-typed-value conversion.
//!
//! A [`ConverterRegistry`] maps conversion target types to the
//! [`TypeConverter`] responsible for them. Registration installs a *direct*
//! entry for every type a converter claims and propagates the converter
//! along each claimed type's explicit ancestor closure as *indirect*
//! entries, skipping ancestors that already hold a direct claim. Lookup is
//! then a single map probe with most-specific-wins semantics: a direct
//! registration is never shadowed by a later indirect propagation.
//!
//! The registry is populated during single-threaded setup and read without
//! locking afterwards.
//!
//! # Example
//!
//! ```
//! use trellis_inject::{ConverterRegistry, InjectContext};
//!
//! let registry = ConverterRegistry::new();
//! let ctx = InjectContext::new();
//!
//! let port: i32 = registry.convert(Some("8080"), &ctx).unwrap();
//! assert_eq!(port, 8080);
//!
//! // Absent values produce the type's zero default...
//! let missing: i32 = registry.convert(None, &ctx).unwrap();
//! assert_eq!(missing, 0);
//!
//! // ...and `None` for boxed targets.
//! let boxed: Option<i32> = registry.convert(None, &ctx).unwrap();
//! assert_eq!(boxed, None);
//! ```

mod collection;
mod enums;
mod primitive;
mod text;

pub use collection::{Collection, CollectionConverter, ValueList, ValueMap, ValueSet, collection_key};
pub use enums::{EnumConverter, EnumText, resolve_variant};
pub use primitive::PrimitiveConverter;
pub use text::FromText;

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::InjectContext;
use crate::error::{ConvertError, ConvertResult};
use crate::types::{AnyValue, TypeBinding, TypeKey};

/// Converts strings into instances of the types it declares support for.
///
/// Converters are stateless or near-stateless strategy objects consulted
/// through a [`ConverterRegistry`].
pub trait TypeConverter: Send + Sync {
    /// The type bindings this converter claims. Consumed only at
    /// registration time.
    fn supported(&self) -> Vec<TypeBinding>;

    /// Convert `value` into an instance of `target`.
    ///
    /// `value` may be absent; what that means is type-specific (zero
    /// defaults for primitives, empty instances for collection
    /// placeholders, an error where a value is required).
    fn convert(
        &self,
        target: TypeKey,
        value: Option<&str>,
        ctx: &InjectContext,
    ) -> ConvertResult<AnyValue>;
}

/// A registry entry: the converter plus whether the type was claimed
/// directly or reached by ancestor propagation.
struct Registration {
    converter: Arc<dyn TypeConverter>,
    direct: bool,
}

/// Registry mapping conversion targets to converters.
pub struct ConverterRegistry {
    entries: HashMap<TypeKey, Registration>,
}

impl ConverterRegistry {
    /// Registry with the stock primitive and collection converters.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(PrimitiveConverter));
        registry.register(Arc::new(CollectionConverter));
        registry
    }

    /// Registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a converter for every binding it claims.
    ///
    /// The claimed type gets a direct entry (a later direct registration
    /// for the same type replaces an earlier one). Each ancestor in the
    /// binding's closure gets an indirect entry unless it already holds a
    /// direct claim.
    pub fn register(&mut self, converter: Arc<dyn TypeConverter>) {
        for binding in converter.supported() {
            if let Some(previous) = self.entries.insert(
                binding.key,
                Registration {
                    converter: converter.clone(),
                    direct: true,
                },
            ) && previous.direct
            {
                tracing::debug!(
                    target: "trellis_inject::convert",
                    type_name = binding.key.name(),
                    "replacing direct converter registration"
                );
            }

            for ancestor in &binding.ancestors {
                match self.entries.get(ancestor) {
                    Some(existing) if existing.direct => {
                        // A direct claim on the ancestor always wins.
                        continue;
                    }
                    _ => {
                        self.entries.insert(
                            *ancestor,
                            Registration {
                                converter: converter.clone(),
                                direct: false,
                            },
                        );
                    }
                }
            }
        }
    }

    /// Whether any converter (direct or indirect) handles `target`.
    pub fn handles(&self, target: TypeKey) -> bool {
        self.entries.contains_key(&target)
    }

    /// Dynamic conversion by type key.
    ///
    /// Fails with [`ConvertError::AbstractTarget`] for unregistered
    /// interface keys and [`ConvertError::NoConverter`] for unregistered
    /// concrete keys; there is no generic fallback on the dynamic path.
    pub fn convert_keyed(
        &self,
        target: TypeKey,
        value: Option<&str>,
        ctx: &InjectContext,
    ) -> ConvertResult<AnyValue> {
        if let Some(registration) = self.entries.get(&target) {
            return registration.converter.convert(target, value, ctx);
        }

        if target.is_abstract() {
            Err(ConvertError::AbstractTarget {
                type_name: target.name(),
            })
        } else {
            Err(ConvertError::NoConverter {
                type_name: target.name(),
            })
        }
    }

    /// Typed conversion with generic fallback.
    ///
    /// Uses the registered converter for `T` when one exists (checking the
    /// produced type), otherwise falls back to [`FromText`] - construction
    /// through the type's own string parsing.
    pub fn convert<T: FromText>(&self, value: Option<&str>, ctx: &InjectContext) -> ConvertResult<T> {
        let target = TypeKey::of::<T>();

        let Some(registration) = self.entries.get(&target) else {
            return T::from_text(value, ctx);
        };

        let produced = registration.converter.convert(target, value, ctx)?;
        let arc = produced
            .downcast::<T>()
            .map_err(|_| ConvertError::TypeMismatch {
                expected: target.name(),
            })?;
        Arc::try_unwrap(arc).map_err(|_| ConvertError::TypeMismatch {
            expected: target.name(),
        })
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}
