//! # Validation Checks
//!
//! One [`Checker`] per check kind. A checker reads the property's
//! converted value from the context — conversion has always run first —
//! and appends a failure message (display name and tag parameters
//! interpolated) on rejection.
//!
//! ## Absent Values
//!
//! Every check except `required` passes on an absent or null value:
//! presence is `required`'s concern, and bounds checks on nothing would
//! double-report a single root cause.

use dashmap::DashMap;
use regex::Regex;
use serde_json::Value;

use formbind_core::{check_kind, CheckTag, ConfigError};

use crate::context::Context;

/// A validation strategy for one check kind.
pub trait Checker: Send + Sync {
    /// Registry dispatch key.
    fn kind(&self) -> &str;

    /// Check the property's converted value, appending a failure message
    /// on rejection. Returns whether the check passed.
    ///
    /// # Errors
    ///
    /// Only structural-configuration errors (e.g. an uncompilable
    /// pattern); never data-dependent failures.
    fn check(
        &self,
        ctx: &mut Context,
        property: &str,
        display: &str,
        tag: &CheckTag,
    ) -> Result<bool, ConfigError>;
}

fn failure_args(display: &str, tag: &CheckTag) -> Vec<(String, String)> {
    let mut args = vec![("name".to_string(), display.to_string())];
    args.extend(tag.params.as_args());
    args
}

/// Converted value as text, for length and pattern checks. Numbers
/// check against their canonical rendering.
fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// required
// ---------------------------------------------------------------------------

/// Converted value present, non-null, and (for strings) non-empty.
pub struct RequiredChecker;

impl Checker for RequiredChecker {
    fn kind(&self) -> &str {
        check_kind::REQUIRED
    }

    fn check(
        &self,
        ctx: &mut Context,
        property: &str,
        display: &str,
        tag: &CheckTag,
    ) -> Result<bool, ConfigError> {
        let present = match ctx.converted_value(property) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        };
        if !present {
            ctx.add_failure(property, "check.required", failure_args(display, tag));
        }
        Ok(present)
    }
}

// ---------------------------------------------------------------------------
// length
// ---------------------------------------------------------------------------

/// String length within the tag's `min`/`max` bounds (characters).
pub struct LengthChecker;

impl Checker for LengthChecker {
    fn kind(&self) -> &str {
        check_kind::LENGTH
    }

    fn check(
        &self,
        ctx: &mut Context,
        property: &str,
        display: &str,
        tag: &CheckTag,
    ) -> Result<bool, ConfigError> {
        let Some(text) = ctx.converted_value(property).and_then(value_as_text) else {
            return Ok(true);
        };
        let min = tag.params.u32("min").unwrap_or(0) as usize;
        let max = tag.params.u32("max").map(|m| m as usize).unwrap_or(usize::MAX);
        let length = text.chars().count();
        let ok = (min..=max).contains(&length);
        if !ok {
            ctx.add_failure(property, "check.length", failure_args(display, tag));
        }
        Ok(ok)
    }
}

// ---------------------------------------------------------------------------
// range
// ---------------------------------------------------------------------------

/// Numeric value within the tag's `min`/`max` bounds.
pub struct RangeChecker;

impl Checker for RangeChecker {
    fn kind(&self) -> &str {
        check_kind::RANGE
    }

    fn check(
        &self,
        ctx: &mut Context,
        property: &str,
        display: &str,
        tag: &CheckTag,
    ) -> Result<bool, ConfigError> {
        let Some(number) = ctx
            .converted_value(property)
            .and_then(Value::as_f64)
        else {
            return Ok(true);
        };
        let min = tag.params.f64("min").unwrap_or(f64::NEG_INFINITY);
        let max = tag.params.f64("max").unwrap_or(f64::INFINITY);
        let ok = number >= min && number <= max;
        if !ok {
            ctx.add_failure(property, "check.range", failure_args(display, tag));
        }
        Ok(ok)
    }
}

// ---------------------------------------------------------------------------
// pattern
// ---------------------------------------------------------------------------

/// String matches the tag's `pattern` regular expression.
///
/// Compiled patterns are cached; the same expression is compiled once
/// per checker regardless of how many properties share it.
pub struct PatternChecker {
    compiled: DashMap<String, Regex>,
}

impl PatternChecker {
    pub(crate) fn new() -> Self {
        Self {
            compiled: DashMap::new(),
        }
    }

    fn regex_for(&self, property: &str, pattern: &str) -> Result<Regex, ConfigError> {
        if let Some(hit) = self.compiled.get(pattern) {
            return Ok(hit.clone());
        }
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            property: property.to_string(),
            reason: e.to_string(),
        })?;
        self.compiled.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }
}

impl Checker for PatternChecker {
    fn kind(&self) -> &str {
        check_kind::PATTERN
    }

    fn check(
        &self,
        ctx: &mut Context,
        property: &str,
        display: &str,
        tag: &CheckTag,
    ) -> Result<bool, ConfigError> {
        let Some(pattern) = tag.params.str("pattern") else {
            return Err(ConfigError::InvalidPattern {
                property: property.to_string(),
                reason: "missing 'pattern' parameter".to_string(),
            });
        };
        let regex = self.regex_for(property, pattern)?;
        let Some(text) = ctx.converted_value(property).and_then(value_as_text) else {
            return Ok(true);
        };
        let ok = regex.is_match(&text);
        if !ok {
            ctx.add_failure(property, "check.pattern", failure_args(display, tag));
        }
        Ok(ok)
    }
}
