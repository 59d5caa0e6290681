//! Error types for conversion and pseudo-property access.
//!
//! Conversion errors are configuration errors: they surface immediately and
//! synchronously with a descriptive message and the underlying parse
//! failure attached. Nothing is silently defaulted.

use trellis_ui::WidgetKind;

/// Result type alias for conversion operations.
pub type ConvertResult<T> = std::result::Result<T, ConvertError>;

/// Errors raised while converting a string to a typed value.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The string could not be parsed into the target type.
    #[error("Invalid value '{value}' for type {type_name}: {source}")]
    InvalidValue {
        type_name: &'static str,
        value: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No converter is registered for the target type.
    #[error("No converter registered for type {type_name}")]
    NoConverter { type_name: &'static str },

    /// The target is interface-like and cannot be instantiated.
    #[error("Type {type_name} is an interface and cannot be instantiated")]
    AbstractTarget { type_name: &'static str },

    /// The target type requires a value but none was given.
    #[error("A value is required for type {type_name}")]
    MissingValue { type_name: &'static str },

    /// An enum name did not match any declared variant.
    #[error("Unknown variant '{name}' for {type_name} (expected one of: {expected})")]
    UnknownVariant {
        type_name: &'static str,
        name: String,
        expected: String,
    },

    /// A registered converter produced a value of an unexpected type.
    #[error("Converter for {expected} produced a value of a different type")]
    TypeMismatch { expected: &'static str },

    /// A placeholder type that takes no value received one.
    #[error("Placeholder type {type_name} takes no value, got '{value}'")]
    PlaceholderValue {
        type_name: &'static str,
        value: String,
    },
}

impl ConvertError {
    /// Wrap a parse failure with the offending value and target type.
    pub fn invalid_value<E>(type_name: &'static str, value: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::InvalidValue {
            type_name,
            value: value.into(),
            source: Box::new(source),
        }
    }
}

/// Result type alias for pseudo-property access.
pub type AccessResult<T> = std::result::Result<T, AccessError>;

/// Errors raised by pseudo-property accessors.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// The accessor does not support the requested access mode.
    #[error("Property '{property}' does not support {mode} access")]
    NotApplicable {
        property: &'static str,
        mode: &'static str,
    },

    /// No accessor exists for this widget kind / property name pair.
    #[error("No pseudo-property '{property}' for widget kind {kind:?}")]
    UnknownProperty { property: String, kind: WidgetKind },

    /// The widget id is invalid or destroyed.
    #[error("Invalid or destroyed widget")]
    InvalidWidget,

    /// Indexed access out of bounds.
    #[error("Index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Keyed access found no entry.
    #[error("No entry for key '{key}'")]
    KeyMissing { key: String },

    /// The supplied value has the wrong type for the property.
    #[error("Value has the wrong type for property '{property}'")]
    ValueType { property: &'static str },
}
