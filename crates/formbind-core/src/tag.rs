//! # Rule Tags — Declarative Conversion and Validation Metadata
//!
//! A rule tag is the unit of declarative configuration attached to a
//! property: either a conversion-format specification or a validation
//! check. Tags carry a kind string (the registry dispatch key) and a
//! bundle of named parameters.
//!
//! ## Design
//!
//! Tags are declared once through the schema builder, read once during
//! rule resolution, and immutable afterwards. Structural conversions
//! (nested objects and lists of objects) are modelled as explicit
//! [`Conversion`] variants rather than tag kinds, so the orchestrator can
//! recognize recursion points without consulting a strategy registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind identifiers for the built-in conversion strategies.
pub mod convert_kind {
    /// Plain text, with optional refiner extension.
    pub const TEXT: &str = "text";
    /// Integral number with digit-format validation.
    pub const LONG: &str = "long";
    /// Decimal number with integer/fraction digit-format validation.
    pub const DECIMAL: &str = "decimal";
    /// Boolean from common textual spellings.
    pub const BOOLEAN: &str = "boolean";
    /// Calendar date parsed with a chrono format string.
    pub const DATE: &str = "date";
}

/// Kind identifiers for the built-in validation checks.
pub mod check_kind {
    /// Converted value present and non-empty.
    pub const REQUIRED: &str = "required";
    /// String length within bounds.
    pub const LENGTH: &str = "length";
    /// Numeric value within bounds.
    pub const RANGE: &str = "range";
    /// String matches a regular expression.
    pub const PATTERN: &str = "pattern";
}

/// Named parameters attached to a rule tag.
///
/// Keys are ordered (BTreeMap) so parameter interpolation into failure
/// messages is deterministic. Accessors are typed and lenient: a missing
/// key and a wrong-typed value both read as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagParams(BTreeMap<String, Value>);

impl TagParams {
    /// Create an empty parameter bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, returning self for chaining.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Raw access to a parameter value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Read a parameter as a string slice.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Read a parameter as an i64.
    pub fn i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    /// Read a parameter as a u32 (digit counts, lengths).
    pub fn u32(&self, key: &str) -> Option<u32> {
        self.0
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }

    /// Read a parameter as an f64.
    pub fn f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    /// Read a parameter as a bool.
    pub fn bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// True when no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render parameters as display-ready (key, value) argument pairs for
    /// message interpolation. String values render unquoted.
    pub fn as_args(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| {
                let rendered = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), rendered)
            })
            .collect()
    }
}

impl FromIterator<(String, Value)> for TagParams {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A conversion-format tag: strategy kind plus named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertTag {
    /// Registry dispatch key (see [`convert_kind`]).
    pub kind: String,
    /// Strategy parameters (digit counts, formats, flags).
    pub params: TagParams,
}

impl ConvertTag {
    /// Create a tag for the given strategy kind with no parameters.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: TagParams::new(),
        }
    }

    /// Add a parameter, returning self for chaining.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params = self.params.with(key, value);
        self
    }

    /// Plain text conversion.
    pub fn text() -> Self {
        Self::new(convert_kind::TEXT)
    }

    /// Integral conversion with up to `integer` digits.
    pub fn long(integer: u32) -> Self {
        Self::new(convert_kind::LONG).with("integer", integer)
    }

    /// Decimal conversion with up to `integer`.`fraction` digits.
    pub fn decimal(integer: u32, fraction: u32) -> Self {
        Self::new(convert_kind::DECIMAL)
            .with("integer", integer)
            .with("fraction", fraction)
    }

    /// Boolean conversion.
    pub fn boolean() -> Self {
        Self::new(convert_kind::BOOLEAN)
    }

    /// Date conversion with a chrono format string.
    pub fn date(format: impl Into<String>) -> Self {
        Self::new(convert_kind::DATE).with("format", format.into())
    }
}

/// A validation-check tag: strategy kind plus named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckTag {
    /// Registry dispatch key (see [`check_kind`]).
    pub kind: String,
    /// Check parameters, interpolated into failure messages.
    pub params: TagParams,
}

impl CheckTag {
    /// Create a tag for the given check kind with no parameters.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: TagParams::new(),
        }
    }

    /// Add a parameter, returning self for chaining.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params = self.params.with(key, value);
        self
    }

    /// Presence check.
    pub fn required() -> Self {
        Self::new(check_kind::REQUIRED)
    }

    /// String length bounds.
    pub fn length(min: u32, max: u32) -> Self {
        Self::new(check_kind::LENGTH)
            .with("min", min)
            .with("max", max)
    }

    /// Numeric range bounds.
    pub fn range(min: i64, max: i64) -> Self {
        Self::new(check_kind::RANGE).with("min", min).with("max", max)
    }

    /// Regular-expression match.
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::new(check_kind::PATTERN).with("pattern", pattern.into())
    }
}

/// Length policy for a list-of-objects property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ListLength {
    /// Always exactly this many elements.
    Fixed(usize),
    /// Read the element count from a sibling input field at validation
    /// time. `max_digits` bounds the accepted digit length of the raw
    /// size value; longer or non-numeric values report an invalid-size
    /// failure and read as zero.
    SizeKey {
        /// Input name of the size field, resolved under the same prefix
        /// as the list property.
        key: String,
        /// Maximum accepted digit count of the raw size value.
        max_digits: usize,
    },
}

/// A property's conversion specification.
///
/// Scalar conversions dispatch through the converter registry; nested and
/// list conversions are recursion points handled by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Conversion {
    /// Direct value conversion via a registered strategy.
    Scalar(ConvertTag),
    /// A single nested object validated against its own schema.
    Nested {
        /// Schema name of the nested object.
        schema: String,
    },
    /// A repeated sub-structure validated element-wise.
    List {
        /// Schema name of each element.
        schema: String,
        /// How the element count is determined.
        length: ListLength,
    },
}

impl Conversion {
    /// Shorthand for a scalar conversion.
    pub fn scalar(tag: ConvertTag) -> Self {
        Self::Scalar(tag)
    }

    /// Shorthand for a nested-object conversion.
    pub fn nested(schema: impl Into<String>) -> Self {
        Self::Nested {
            schema: schema.into(),
        }
    }

    /// Shorthand for a fixed-length list conversion.
    pub fn list_fixed(schema: impl Into<String>, len: usize) -> Self {
        Self::List {
            schema: schema.into(),
            length: ListLength::Fixed(len),
        }
    }

    /// Shorthand for a size-key list conversion.
    pub fn list_sized(
        schema: impl Into<String>,
        key: impl Into<String>,
        max_digits: usize,
    ) -> Self {
        Self::List {
            schema: schema.into(),
            length: ListLength::SizeKey {
                key: key.into(),
                max_digits,
            },
        }
    }

    /// True for nested/list conversions that require recursive descent.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_typed_accessors() {
        let params = TagParams::new()
            .with("min", 8)
            .with("label", "id")
            .with("grouping", true);
        assert_eq!(params.u32("min"), Some(8));
        assert_eq!(params.i64("min"), Some(8));
        assert_eq!(params.str("label"), Some("id"));
        assert_eq!(params.bool("grouping"), Some(true));
        assert_eq!(params.u32("missing"), None);
        // Wrong-typed reads are lenient.
        assert_eq!(params.u32("label"), None);
    }

    #[test]
    fn params_as_args_renders_strings_unquoted() {
        let params = TagParams::new().with("min", 8).with("label", "id");
        let args = params.as_args();
        assert!(args.contains(&("label".into(), "id".into())));
        assert!(args.contains(&("min".into(), "8".into())));
    }

    #[test]
    fn convert_tag_constructors() {
        let tag = ConvertTag::decimal(5, 2);
        assert_eq!(tag.kind, convert_kind::DECIMAL);
        assert_eq!(tag.params.u32("integer"), Some(5));
        assert_eq!(tag.params.u32("fraction"), Some(2));
    }

    #[test]
    fn check_tag_constructors() {
        let tag = CheckTag::length(8, 8);
        assert_eq!(tag.kind, check_kind::LENGTH);
        assert_eq!(tag.params.u32("min"), Some(8));
        assert_eq!(tag.params.u32("max"), Some(8));
    }

    #[test]
    fn conversion_structural_classification() {
        assert!(!Conversion::scalar(ConvertTag::text()).is_structural());
        assert!(Conversion::nested("address").is_structural());
        assert!(Conversion::list_fixed("line", 3).is_structural());
        assert!(Conversion::list_sized("line", "lineCount", 3).is_structural());
    }

    #[test]
    fn tags_serde_roundtrip() {
        let conversion = Conversion::list_sized("line", "lineCount", 3);
        let json = serde_json::to_value(&conversion).unwrap();
        let back: Conversion = serde_json::from_value(json).unwrap();
        assert_eq!(conversion, back);

        let check = CheckTag::pattern("^[a-z]+$");
        let json = serde_json::to_value(&check).unwrap();
        let back: CheckTag = serde_json::from_value(json).unwrap();
        assert_eq!(check, back);
    }

    #[test]
    fn params_get_returns_raw_value() {
        let params = TagParams::new().with("shape", json!({"w": 1}));
        assert_eq!(params.get("shape"), Some(&json!({"w": 1})));
    }
}
