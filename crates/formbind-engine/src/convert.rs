//! # Conversion Strategies
//!
//! One [`Converter`] per target kind. Admissibility and conversion are
//! split: `is_convertible` decides (and records the failure message on
//! rejection), `convert` produces the typed value and must not fail for
//! input that passed admissibility — malformed-but-admissible input
//! degrades to a null value, logged at `warn`.
//!
//! ## Accepted Shapes
//!
//! Form layers deliver values as single strings or one-element string
//! arrays interchangeably; both shapes are accepted everywhere. The
//! numeric strategies additionally accept compatible JSON numbers, and
//! a missing value is admissible unless the tag sets `nullable = false`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;

use formbind_core::{ConfigError, ConvertTag, NumericLocale};

use crate::context::Context;

/// Default chrono format for the date strategy.
const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// A conversion strategy for one tag kind.
pub trait Converter: Send + Sync {
    /// Registry dispatch key.
    fn kind(&self) -> &str;

    /// Decide whether the raw value can be converted, appending a
    /// failure message to the context on rejection.
    fn is_convertible(
        &self,
        ctx: &mut Context,
        property: &str,
        display: &str,
        raw: Option<&Value>,
        tag: &ConvertTag,
    ) -> bool;

    /// Convert an admissible raw value. `Ok(None)` means there is
    /// nothing to store (absent input); a degraded `Value::Null` records
    /// that conversion ran and produced nothing usable.
    ///
    /// # Errors
    ///
    /// Only structural-configuration errors (e.g. an unregistered text
    /// refiner); never data-dependent failures.
    fn convert(
        &self,
        property: &str,
        raw: Option<&Value>,
        tag: &ConvertTag,
    ) -> Result<Option<Value>, ConfigError>;
}

/// Read a value as a single text: a string, or a one-element string
/// array.
pub(crate) fn single_text(raw: &Value) -> Option<&str> {
    match raw {
        Value::String(s) => Some(s),
        Value::Array(items) => match items.as_slice() {
            [Value::String(s)] => Some(s),
            _ => None,
        },
        _ => None,
    }
}

fn nullable(tag: &ConvertTag) -> bool {
    tag.params.bool("nullable").unwrap_or(true)
}

fn failure_args(display: &str, tag: &ConvertTag) -> Vec<(String, String)> {
    let mut args = vec![("name".to_string(), display.to_string())];
    args.extend(tag.params.as_args());
    args
}

// ---------------------------------------------------------------------------
// Digit-format matching
// ---------------------------------------------------------------------------

/// Digit-count constraints for numeric raw text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigitFormat {
    /// Maximum integer digits; unlimited when `None`.
    pub integer: Option<u32>,
    /// Maximum fraction digits; no fraction part allowed when `None`.
    pub fraction: Option<u32>,
    /// Whether grouping separators are permitted in the integer part.
    pub grouping: bool,
}

impl DigitFormat {
    fn integral(tag: &ConvertTag) -> Self {
        Self {
            integer: tag.params.u32("integer"),
            fraction: None,
            grouping: tag.params.bool("grouping").unwrap_or(false),
        }
    }

    fn decimal(tag: &ConvertTag) -> Self {
        Self {
            fraction: tag.params.u32("fraction"),
            ..Self::integral(tag)
        }
    }
}

/// Match raw numeric text against a digit format under a locale.
///
/// Accepts an optional leading minus, an integer part (grouped in
/// threes when grouping is permitted), and a fraction part only when
/// the format allows one. Digit counts exclude separators.
pub fn matches_digit_format(text: &str, format: &DigitFormat, locale: NumericLocale) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    if unsigned.is_empty() {
        return false;
    }

    let (integer_part, fraction_part) =
        match unsigned.split_once(locale.decimal_separator) {
            Some((int, frac)) => (int, Some(frac)),
            None => (unsigned, None),
        };

    if let Some(frac) = fraction_part {
        let Some(max_fraction) = format.fraction else {
            return false;
        };
        if frac.is_empty()
            || !frac.chars().all(|c| c.is_ascii_digit())
            || frac.chars().count() > max_fraction as usize
        {
            return false;
        }
    }

    let groups: Vec<&str> = integer_part.split(locale.grouping_separator).collect();
    if groups.len() > 1 {
        // Grouped form: 1-3 digits in the first group, exactly 3 after.
        if !format.grouping {
            return false;
        }
        if groups[0].is_empty() || groups[0].len() > 3 {
            return false;
        }
        if !groups.iter().all(|g| g.chars().all(|c| c.is_ascii_digit())) {
            return false;
        }
        if !groups[1..].iter().all(|g| g.len() == 3) {
            return false;
        }
    } else if integer_part.is_empty()
        || !integer_part.chars().all(|c| c.is_ascii_digit())
    {
        return false;
    }

    let integer_digits: usize = groups.iter().map(|g| g.len()).sum();
    match format.integer {
        Some(max) => integer_digits <= max as usize,
        None => true,
    }
}

fn strip_grouping(text: &str, locale: NumericLocale) -> String {
    text.chars()
        .filter(|&c| c != locale.grouping_separator)
        .collect()
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Secondary refinement applied after a successful primary string
/// conversion, keyed by the tag's `extension` parameter.
pub trait TextRefiner: Send + Sync {
    /// Refine the primary string into the stored value.
    fn refine(&self, value: &str) -> Value;
}

struct FnRefiner<F>(F);

impl<F> TextRefiner for FnRefiner<F>
where
    F: Fn(&str) -> Value + Send + Sync,
{
    fn refine(&self, value: &str) -> Value {
        (self.0)(value)
    }
}

/// Build the default refiner registry: `trim`, `uppercase`, `lowercase`.
pub(crate) fn default_refiners() -> HashMap<String, Arc<dyn TextRefiner>> {
    let mut refiners: HashMap<String, Arc<dyn TextRefiner>> = HashMap::new();
    refiners.insert(
        "trim".to_string(),
        Arc::new(FnRefiner(|s: &str| Value::String(s.trim().to_string()))),
    );
    refiners.insert(
        "uppercase".to_string(),
        Arc::new(FnRefiner(|s: &str| Value::String(s.to_uppercase()))),
    );
    refiners.insert(
        "lowercase".to_string(),
        Arc::new(FnRefiner(|s: &str| Value::String(s.to_lowercase()))),
    );
    refiners
}

/// Plain-text conversion with optional refinement.
pub struct TextConverter {
    refiners: HashMap<String, Arc<dyn TextRefiner>>,
}

impl TextConverter {
    pub(crate) fn new(refiners: HashMap<String, Arc<dyn TextRefiner>>) -> Self {
        Self { refiners }
    }
}

impl Converter for TextConverter {
    fn kind(&self) -> &str {
        formbind_core::convert_kind::TEXT
    }

    fn is_convertible(
        &self,
        ctx: &mut Context,
        property: &str,
        display: &str,
        raw: Option<&Value>,
        tag: &ConvertTag,
    ) -> bool {
        match raw {
            None => {
                if nullable(tag) {
                    true
                } else {
                    ctx.add_failure(property, "convert.text", failure_args(display, tag));
                    false
                }
            }
            Some(value) => {
                if single_text(value).is_some() {
                    true
                } else {
                    ctx.add_failure(property, "convert.text", failure_args(display, tag));
                    false
                }
            }
        }
    }

    fn convert(
        &self,
        _property: &str,
        raw: Option<&Value>,
        tag: &ConvertTag,
    ) -> Result<Option<Value>, ConfigError> {
        let Some(text) = raw.and_then(single_text) else {
            return Ok(None);
        };
        match tag.params.str("extension") {
            Some(name) => {
                let refiner = self.refiners.get(name).ok_or_else(|| {
                    ConfigError::UnregisteredRefiner(name.to_string())
                })?;
                Ok(Some(refiner.refine(text)))
            }
            None => Ok(Some(Value::String(text.to_string()))),
        }
    }
}

// ---------------------------------------------------------------------------
// Long
// ---------------------------------------------------------------------------

/// Integral conversion with digit-format validation.
pub struct LongConverter {
    locale: NumericLocale,
}

impl LongConverter {
    pub(crate) fn new(locale: NumericLocale) -> Self {
        Self { locale }
    }
}

impl Converter for LongConverter {
    fn kind(&self) -> &str {
        formbind_core::convert_kind::LONG
    }

    fn is_convertible(
        &self,
        ctx: &mut Context,
        property: &str,
        display: &str,
        raw: Option<&Value>,
        tag: &ConvertTag,
    ) -> bool {
        let format = DigitFormat::integral(tag);
        let admissible = match raw {
            None => nullable(tag),
            Some(Value::Number(n)) => {
                n.is_i64() && matches_digit_format(&n.to_string(), &format, self.locale)
            }
            Some(value) => match single_text(value) {
                Some(text) => matches_digit_format(text, &format, self.locale),
                None => false,
            },
        };
        if !admissible {
            ctx.add_failure(property, "convert.long", failure_args(display, tag));
        }
        admissible
    }

    fn convert(
        &self,
        property: &str,
        raw: Option<&Value>,
        _tag: &ConvertTag,
    ) -> Result<Option<Value>, ConfigError> {
        let Some(value) = raw else {
            return Ok(None);
        };
        if let Value::Number(n) = value {
            return Ok(n.as_i64().map(Value::from));
        }
        let Some(text) = single_text(value) else {
            return Ok(None);
        };
        match strip_grouping(text, self.locale).parse::<i64>() {
            Ok(parsed) => Ok(Some(Value::from(parsed))),
            Err(_) => {
                tracing::warn!(
                    property = %property,
                    raw = %text,
                    "admissible integral text failed to parse, degrading to null"
                );
                Ok(Some(Value::Null))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Decimal
// ---------------------------------------------------------------------------

/// Decimal conversion with integer/fraction digit-format validation.
pub struct DecimalConverter {
    locale: NumericLocale,
}

impl DecimalConverter {
    pub(crate) fn new(locale: NumericLocale) -> Self {
        Self { locale }
    }
}

impl Converter for DecimalConverter {
    fn kind(&self) -> &str {
        formbind_core::convert_kind::DECIMAL
    }

    fn is_convertible(
        &self,
        ctx: &mut Context,
        property: &str,
        display: &str,
        raw: Option<&Value>,
        tag: &ConvertTag,
    ) -> bool {
        let format = DigitFormat::decimal(tag);
        let admissible = match raw {
            None => nullable(tag),
            Some(Value::Number(_)) => true,
            Some(value) => match single_text(value) {
                Some(text) => matches_digit_format(text, &format, self.locale),
                None => false,
            },
        };
        if !admissible {
            ctx.add_failure(property, "convert.decimal", failure_args(display, tag));
        }
        admissible
    }

    fn convert(
        &self,
        property: &str,
        raw: Option<&Value>,
        _tag: &ConvertTag,
    ) -> Result<Option<Value>, ConfigError> {
        let Some(value) = raw else {
            return Ok(None);
        };
        if let Value::Number(n) = value {
            return Ok(Some(Value::Number(n.clone())));
        }
        let Some(text) = single_text(value) else {
            return Ok(None);
        };
        let normalized = strip_grouping(text, self.locale)
            .replace(self.locale.decimal_separator, ".");
        match normalized.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            Some(number) => Ok(Some(Value::Number(number))),
            None => {
                tracing::warn!(
                    property = %property,
                    raw = %text,
                    "admissible decimal text failed to parse, degrading to null"
                );
                Ok(Some(Value::Null))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Boolean
// ---------------------------------------------------------------------------

/// Boolean conversion from common textual spellings.
pub struct BooleanConverter;

fn parse_boolean(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

impl Converter for BooleanConverter {
    fn kind(&self) -> &str {
        formbind_core::convert_kind::BOOLEAN
    }

    fn is_convertible(
        &self,
        ctx: &mut Context,
        property: &str,
        display: &str,
        raw: Option<&Value>,
        tag: &ConvertTag,
    ) -> bool {
        let admissible = match raw {
            None => nullable(tag),
            Some(Value::Bool(_)) => true,
            Some(value) => single_text(value).and_then(parse_boolean).is_some(),
        };
        if !admissible {
            ctx.add_failure(property, "convert.boolean", failure_args(display, tag));
        }
        admissible
    }

    fn convert(
        &self,
        _property: &str,
        raw: Option<&Value>,
        _tag: &ConvertTag,
    ) -> Result<Option<Value>, ConfigError> {
        Ok(match raw {
            None => None,
            Some(Value::Bool(b)) => Some(Value::Bool(*b)),
            Some(value) => single_text(value)
                .and_then(parse_boolean)
                .map(Value::Bool),
        })
    }
}

// ---------------------------------------------------------------------------
// Date
// ---------------------------------------------------------------------------

/// Calendar-date conversion via a chrono format string.
pub struct DateConverter;

impl DateConverter {
    fn format<'t>(tag: &'t ConvertTag) -> &'t str {
        tag.params.str("format").unwrap_or(DEFAULT_DATE_FORMAT)
    }
}

impl Converter for DateConverter {
    fn kind(&self) -> &str {
        formbind_core::convert_kind::DATE
    }

    fn is_convertible(
        &self,
        ctx: &mut Context,
        property: &str,
        display: &str,
        raw: Option<&Value>,
        tag: &ConvertTag,
    ) -> bool {
        let admissible = match raw {
            None => nullable(tag),
            Some(value) => match single_text(value) {
                Some(text) => NaiveDate::parse_from_str(text, Self::format(tag)).is_ok(),
                None => false,
            },
        };
        if !admissible {
            let mut args = failure_args(display, tag);
            if !args.iter().any(|(k, _)| k == "format") {
                args.push(("format".to_string(), Self::format(tag).to_string()));
            }
            ctx.add_failure(property, "convert.date", args);
        }
        admissible
    }

    fn convert(
        &self,
        _property: &str,
        raw: Option<&Value>,
        tag: &ConvertTag,
    ) -> Result<Option<Value>, ConfigError> {
        let Some(text) = raw.and_then(single_text) else {
            return Ok(None);
        };
        // Stored in ISO form so chrono's serde impl deserializes it.
        Ok(NaiveDate::parse_from_str(text, Self::format(tag))
            .ok()
            .map(|date| Value::String(date.format(DEFAULT_DATE_FORMAT).to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn format(integer: Option<u32>, fraction: Option<u32>, grouping: bool) -> DigitFormat {
        DigitFormat {
            integer,
            fraction,
            grouping,
        }
    }

    #[test]
    fn digit_format_plain_integers() {
        let fmt = format(Some(3), None, false);
        let locale = NumericLocale::default();
        assert!(matches_digit_format("101", &fmt, locale));
        assert!(matches_digit_format("-101", &fmt, locale));
        assert!(matches_digit_format("7", &fmt, locale));
        assert!(!matches_digit_format("1234", &fmt, locale));
        assert!(!matches_digit_format("1.5", &fmt, locale));
        assert!(!matches_digit_format("abc", &fmt, locale));
        assert!(!matches_digit_format("", &fmt, locale));
        assert!(!matches_digit_format("-", &fmt, locale));
    }

    #[test]
    fn digit_format_grouping() {
        let grouped = format(Some(7), None, true);
        let plain = format(Some(7), None, false);
        let locale = NumericLocale::default();
        assert!(matches_digit_format("1,234,567", &grouped, locale));
        assert!(!matches_digit_format("1,234,567", &plain, locale));
        assert!(!matches_digit_format("12,34", &grouped, locale));
        assert!(!matches_digit_format(",234", &grouped, locale));
        assert!(!matches_digit_format("1234,567", &grouped, locale));
    }

    #[test]
    fn digit_format_fractions() {
        let fmt = format(Some(5), Some(2), false);
        let locale = NumericLocale::default();
        assert!(matches_digit_format("123.45", &fmt, locale));
        assert!(matches_digit_format("123", &fmt, locale));
        assert!(!matches_digit_format("123.456", &fmt, locale));
        assert!(!matches_digit_format("123.", &fmt, locale));
        assert!(!matches_digit_format(".45", &fmt, locale));
    }

    #[test]
    fn digit_format_comma_decimal_locale() {
        let fmt = format(Some(7), Some(2), true);
        let locale = NumericLocale::comma_decimal();
        assert!(matches_digit_format("1.234,56", &fmt, locale));
        assert!(!matches_digit_format("1,234.56", &fmt, locale));
    }

    #[test]
    fn single_text_shapes() {
        assert_eq!(single_text(&serde_json::json!("a")), Some("a"));
        assert_eq!(single_text(&serde_json::json!(["a"])), Some("a"));
        assert_eq!(single_text(&serde_json::json!(["a", "b"])), None);
        assert_eq!(single_text(&serde_json::json!(7)), None);
        assert_eq!(single_text(&serde_json::json!([7])), None);
    }

    #[test]
    fn boolean_spellings() {
        for text in ["true", "TRUE", "1", "on", "Yes"] {
            assert_eq!(parse_boolean(text), Some(true), "{text}");
        }
        for text in ["false", "0", "off", "NO"] {
            assert_eq!(parse_boolean(text), Some(false), "{text}");
        }
        assert_eq!(parse_boolean("maybe"), None);
    }

    proptest! {
        #[test]
        fn any_small_number_matches_unlimited_format(n in 0u64..1_000_000_000) {
            let fmt = format(None, None, false);
            prop_assert!(matches_digit_format(
                &n.to_string(),
                &fmt,
                NumericLocale::default()
            ));
        }

        #[test]
        fn digit_cap_is_respected(n in 0u64..1_000_000_000) {
            let text = n.to_string();
            let fmt = format(Some(3), None, false);
            let matched = matches_digit_format(&text, &fmt, NumericLocale::default());
            prop_assert_eq!(matched, text.len() <= 3);
        }

        #[test]
        fn non_numeric_text_never_matches(text in "[a-zA-Z]{1,12}") {
            let fmt = format(None, Some(4), true);
            prop_assert!(!matches_digit_format(&text, &fmt, NumericLocale::default()));
        }
    }
}
