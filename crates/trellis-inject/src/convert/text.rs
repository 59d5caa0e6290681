//! Generic fallback construction from text.
//!
//! [`FromText`] is the typed counterpart of the registry's dynamic path:
//! when no converter is registered for a requested type, the type
//! constructs itself from the string - through its own `FromStr` for
//! parseable types, the analogue of instantiating through a single-string
//! constructor. Parsing therefore matches the platform's native rules
//! exactly, including edge-case acceptance and error wording.

use std::any::Any;

use crate::context::InjectContext;
use crate::error::{ConvertError, ConvertResult};

/// Fallback construction of `Self` from an optional string.
pub trait FromText: Any + Send + Sync + Sized {
    /// Construct from text when no converter is registered for the type.
    fn from_text(value: Option<&str>, ctx: &InjectContext) -> ConvertResult<Self>;
}

/// Implement [`FromText`] through `FromStr`, with a zero default for absent
/// values.
macro_rules! from_text_via_parse {
    ($($ty:ty => $zero:expr),+ $(,)?) => {$(
        impl FromText for $ty {
            fn from_text(value: Option<&str>, _ctx: &InjectContext) -> ConvertResult<Self> {
                match value {
                    None => Ok($zero),
                    Some(s) => s.parse::<$ty>().map_err(|e| {
                        ConvertError::invalid_value(std::any::type_name::<$ty>(), s, e)
                    }),
                }
            }
        }
    )+};
}

from_text_via_parse! {
    bool => false,
    i16 => 0,
    i32 => 0,
    i64 => 0,
    f32 => 0.0,
    f64 => 0.0,
}

impl FromText for String {
    fn from_text(value: Option<&str>, _ctx: &InjectContext) -> ConvertResult<Self> {
        Ok(value.unwrap_or_default().to_string())
    }
}

/// Boxed form: absent becomes `None` instead of a zero default.
impl<T: FromText> FromText for Option<T> {
    fn from_text(value: Option<&str>, ctx: &InjectContext) -> ConvertResult<Self> {
        match value {
            None => Ok(None),
            Some(s) => T::from_text(Some(s), ctx).map(Some),
        }
    }
}

/// Sized-slot vectors: the string is an element *count*, not content. The
/// resulting vector holds that many empty slots for later indexed
/// injection. Absent or empty text yields an empty vector.
impl<T: Any + Send + Sync> FromText for Vec<Option<T>> {
    fn from_text(value: Option<&str>, _ctx: &InjectContext) -> ConvertResult<Self> {
        let text = value.map(str::trim).filter(|s| !s.is_empty());
        match text {
            None => Ok(Vec::new()),
            Some(s) => {
                let count: usize = s.parse().map_err(|e| {
                    ConvertError::invalid_value(std::any::type_name::<Self>(), s, e)
                })?;
                Ok((0..count).map(|_| None).collect())
            }
        }
    }
}

/// Implement [`FromText`] for an [`EnumText`](crate::EnumText) type:
/// case-sensitive exact variant-name resolution.
#[macro_export]
macro_rules! from_text_via_variants {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::FromText for $ty {
            fn from_text(
                value: Option<&str>,
                _ctx: &$crate::InjectContext,
            ) -> std::result::Result<Self, $crate::ConvertError> {
                $crate::resolve_variant::<$ty>(value)
            }
        }
    )+};
}
