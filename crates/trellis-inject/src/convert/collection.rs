//! Collection placeholder conversion.
//!
//! Collection-valued injection entries carry no content, only a placeholder
//! to be filled in later by indexed or keyed injection. Conversion produces
//! an empty mutable instance - with one deliberate quirk preserved from the
//! original convention: a *list* placeholder accepts a string element
//! count, yielding that many empty slots. The count convention is not
//! extended to sets or maps; a non-empty value for those is a loud error.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::context::InjectContext;
use crate::error::{ConvertError, ConvertResult};
use crate::types::{AnyValue, TypeBinding, TypeKey};

use super::TypeConverter;

/// List placeholder: empty slots filled later by indexed injection.
pub type ValueList = Vec<Option<AnyValue>>;

/// Set placeholder. Elements are strings - the one hashable currency of
/// the injection layer.
pub type ValueSet = HashSet<String>;

/// Map placeholder, keyed by string.
pub type ValueMap = HashMap<String, AnyValue>;

/// Marker trait identifying the abstract "collection" conversion target.
pub trait Collection: Any {}

/// Key for the abstract "collection" target, the ancestor shared by list
/// and set placeholders (maps are deliberately not collections).
pub fn collection_key() -> TypeKey {
    TypeKey::interface::<dyn Collection>("collection")
}

/// Converter for the collection placeholder types.
pub struct CollectionConverter;

impl TypeConverter for CollectionConverter {
    fn supported(&self) -> Vec<TypeBinding> {
        vec![
            TypeBinding::with_ancestors(TypeKey::of::<ValueList>(), vec![collection_key()]),
            TypeBinding::with_ancestors(TypeKey::of::<ValueSet>(), vec![collection_key()]),
            TypeBinding::concrete(TypeKey::of::<ValueMap>()),
        ]
    }

    fn convert(
        &self,
        target: TypeKey,
        value: Option<&str>,
        _ctx: &InjectContext,
    ) -> ConvertResult<AnyValue> {
        let text = value.map(str::trim).filter(|s| !s.is_empty());

        // An abstract "collection" request resolves to a list, the most
        // general placeholder.
        if target == TypeKey::of::<ValueList>() || target == collection_key() {
            let list: ValueList = match text {
                None => Vec::new(),
                Some(s) => {
                    let count: usize = s
                        .parse()
                        .map_err(|e| ConvertError::invalid_value(target.name(), s, e))?;
                    (0..count).map(|_| None).collect()
                }
            };
            return Ok(Arc::new(list));
        }

        if target == TypeKey::of::<ValueSet>() {
            return match text {
                None => Ok(Arc::new(ValueSet::new())),
                Some(s) => Err(ConvertError::PlaceholderValue {
                    type_name: target.name(),
                    value: s.to_string(),
                }),
            };
        }

        if target == TypeKey::of::<ValueMap>() {
            return match text {
                None => Ok(Arc::new(ValueMap::new())),
                Some(s) => Err(ConvertError::PlaceholderValue {
                    type_name: target.name(),
                    value: s.to_string(),
                }),
            };
        }

        Err(ConvertError::NoConverter {
            type_name: target.name(),
        })
    }
}
