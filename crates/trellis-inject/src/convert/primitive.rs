//! Primitive and string conversion.
//!
//! Parsing goes through each type's own `FromStr` so acceptance and error
//! text match the native rules exactly (leading `+` on integers, exact
//! `true`/`false` booleans, and so on). Absent values yield the type's zero
//! default for plain targets and `None` for boxed (`Option`) targets.

use std::str::FromStr;
use std::sync::Arc;

use crate::context::InjectContext;
use crate::error::{ConvertError, ConvertResult};
use crate::types::{AnyValue, TypeBinding, TypeKey};

use super::TypeConverter;

/// Converter for `bool`, the numeric primitives, `String`, and their boxed
/// `Option` forms.
pub struct PrimitiveConverter;

impl PrimitiveConverter {
    fn parse_plain<T>(target: TypeKey, value: Option<&str>, zero: T) -> ConvertResult<AnyValue>
    where
        T: FromStr + Send + Sync + 'static,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match value {
            None => Ok(Arc::new(zero)),
            Some(s) => s
                .parse::<T>()
                .map(|v| Arc::new(v) as AnyValue)
                .map_err(|e| ConvertError::invalid_value(target.name(), s, e)),
        }
    }

    fn parse_boxed<T>(target: TypeKey, value: Option<&str>) -> ConvertResult<AnyValue>
    where
        T: FromStr + Send + Sync + 'static,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match value {
            None => Ok(Arc::new(None::<T>)),
            Some(s) => s
                .parse::<T>()
                .map(|v| Arc::new(Some(v)) as AnyValue)
                .map_err(|e| ConvertError::invalid_value(target.name(), s, e)),
        }
    }
}

/// Expands to the dispatch arm pair (plain + boxed) for one primitive.
macro_rules! primitive_arm {
    ($target:ident, $value:ident, $ty:ty, $zero:expr) => {
        if $target == TypeKey::of::<$ty>() {
            return Self::parse_plain::<$ty>($target, $value, $zero);
        }
        if $target == TypeKey::of::<Option<$ty>>() {
            return Self::parse_boxed::<$ty>($target, $value);
        }
    };
}

impl TypeConverter for PrimitiveConverter {
    fn supported(&self) -> Vec<TypeBinding> {
        vec![
            TypeBinding::concrete(TypeKey::of::<bool>()),
            TypeBinding::concrete(TypeKey::of::<i16>()),
            TypeBinding::concrete(TypeKey::of::<i32>()),
            TypeBinding::concrete(TypeKey::of::<i64>()),
            TypeBinding::concrete(TypeKey::of::<f32>()),
            TypeBinding::concrete(TypeKey::of::<f64>()),
            TypeBinding::concrete(TypeKey::of::<String>()),
            TypeBinding::concrete(TypeKey::of::<Option<bool>>()),
            TypeBinding::concrete(TypeKey::of::<Option<i16>>()),
            TypeBinding::concrete(TypeKey::of::<Option<i32>>()),
            TypeBinding::concrete(TypeKey::of::<Option<i64>>()),
            TypeBinding::concrete(TypeKey::of::<Option<f32>>()),
            TypeBinding::concrete(TypeKey::of::<Option<f64>>()),
            TypeBinding::concrete(TypeKey::of::<Option<String>>()),
        ]
    }

    fn convert(
        &self,
        target: TypeKey,
        value: Option<&str>,
        _ctx: &InjectContext,
    ) -> ConvertResult<AnyValue> {
        primitive_arm!(target, value, bool, false);
        primitive_arm!(target, value, i16, 0);
        primitive_arm!(target, value, i32, 0);
        primitive_arm!(target, value, i64, 0);
        primitive_arm!(target, value, f32, 0.0);
        primitive_arm!(target, value, f64, 0.0);

        if target == TypeKey::of::<String>() {
            return Ok(Arc::new(value.unwrap_or_default().to_string()));
        }
        if target == TypeKey::of::<Option<String>>() {
            return Ok(Arc::new(value.map(str::to_string)));
        }

        Err(ConvertError::NoConverter {
            type_name: target.name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(target: TypeKey, value: Option<&str>) -> ConvertResult<AnyValue> {
        PrimitiveConverter.convert(target, value, &InjectContext::new())
    }

    #[test]
    fn absent_values_yield_zero_defaults() {
        let b = convert(TypeKey::of::<bool>(), None).unwrap();
        assert_eq!(b.downcast_ref::<bool>(), Some(&false));

        let s = convert(TypeKey::of::<i16>(), None).unwrap();
        assert_eq!(s.downcast_ref::<i16>(), Some(&0));

        let i = convert(TypeKey::of::<i32>(), None).unwrap();
        assert_eq!(i.downcast_ref::<i32>(), Some(&0));

        let l = convert(TypeKey::of::<i64>(), None).unwrap();
        assert_eq!(l.downcast_ref::<i64>(), Some(&0));

        let f = convert(TypeKey::of::<f32>(), None).unwrap();
        assert_eq!(f.downcast_ref::<f32>(), Some(&0.0));

        let d = convert(TypeKey::of::<f64>(), None).unwrap();
        assert_eq!(d.downcast_ref::<f64>(), Some(&0.0));

        let text = convert(TypeKey::of::<String>(), None).unwrap();
        assert_eq!(text.downcast_ref::<String>().map(String::as_str), Some(""));
    }

    #[test]
    fn absent_boxed_values_yield_none() {
        let b = convert(TypeKey::of::<Option<bool>>(), None).unwrap();
        assert_eq!(b.downcast_ref::<Option<bool>>(), Some(&None));

        let s = convert(TypeKey::of::<Option<i16>>(), None).unwrap();
        assert_eq!(s.downcast_ref::<Option<i16>>(), Some(&None));

        let i = convert(TypeKey::of::<Option<i32>>(), None).unwrap();
        assert_eq!(i.downcast_ref::<Option<i32>>(), Some(&None));

        let l = convert(TypeKey::of::<Option<i64>>(), None).unwrap();
        assert_eq!(l.downcast_ref::<Option<i64>>(), Some(&None));

        let f = convert(TypeKey::of::<Option<f32>>(), None).unwrap();
        assert_eq!(f.downcast_ref::<Option<f32>>(), Some(&None));

        let d = convert(TypeKey::of::<Option<f64>>(), None).unwrap();
        assert_eq!(d.downcast_ref::<Option<f64>>(), Some(&None));

        let text = convert(TypeKey::of::<Option<String>>(), None).unwrap();
        assert_eq!(text.downcast_ref::<Option<String>>(), Some(&None));
    }

    #[test]
    fn present_values_parse_natively() {
        let i = convert(TypeKey::of::<i32>(), Some("+19")).unwrap();
        assert_eq!(i.downcast_ref::<i32>(), Some(&19));

        let boxed = convert(TypeKey::of::<Option<i32>>(), Some("19")).unwrap();
        assert_eq!(boxed.downcast_ref::<Option<i32>>(), Some(&Some(19)));

        let f = convert(TypeKey::of::<f64>(), Some("2.5")).unwrap();
        assert_eq!(f.downcast_ref::<f64>(), Some(&2.5));
    }

    #[test]
    fn malformed_values_error_with_cause() {
        let err = convert(TypeKey::of::<i32>(), Some("12x")).unwrap_err();
        match err {
            ConvertError::InvalidValue { value, .. } => assert_eq!(value, "12x"),
            other => panic!("unexpected error: {other}"),
        }

        assert!(convert(TypeKey::of::<bool>(), Some("yes")).is_err());
        assert!(convert(TypeKey::of::<i16>(), Some("99999")).is_err());
    }

    #[test]
    fn string_target_passes_text_through() {
        let s = convert(TypeKey::of::<String>(), Some("hello world")).unwrap();
        assert_eq!(
            s.downcast_ref::<String>().map(String::as_str),
            Some("hello world")
        );
    }

    #[test]
    fn unrelated_target_is_rejected() {
        struct Odd;
        let err = convert(TypeKey::of::<Odd>(), Some("x")).unwrap_err();
        assert!(matches!(err, ConvertError::NoConverter { .. }));
    }
}
