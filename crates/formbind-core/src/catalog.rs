//! # Message Catalog — Failure Messages and Template Resolution
//!
//! Failure messages are resolved at append time: the recording site
//! supplies a message key and named arguments, the catalog supplies the
//! template, and the rendered text is stored alongside the key and
//! arguments on the [`Message`] record.
//!
//! ## Design
//!
//! The catalog is a collaborator contract ([`MessageCatalog`]); message
//! storage policy and locale negotiation live behind it. The bundled
//! [`StaticCatalog`] is an in-memory map with English defaults for the
//! built-in strategies — enough for tests and for callers that do not
//! plug in their own catalog.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Resolves message keys to raw templates.
///
/// Implementations must be thread-safe; lookups are synchronous. A `None`
/// return is a catalog miss — call sites degrade per their own policy
/// (display names fall back to the property name, failure messages fall
/// back to a key+arguments rendering).
pub trait MessageCatalog: Send + Sync {
    /// Look up the raw template for a key.
    fn resolve(&self, key: &str) -> Option<String>;
}

/// A recorded validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Prefix-qualified property path (e.g. `"lines[2].amount"`).
    pub path: String,
    /// Catalog key the text was resolved from.
    pub key: String,
    /// Named arguments that were interpolated.
    pub args: Vec<(String, String)>,
    /// Rendered, caller-visible text.
    pub text: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.text)
    }
}

/// Interpolate `{name}` placeholders in a template from named arguments.
///
/// Unknown placeholders are left in place so a malformed template stays
/// diagnosable in the rendered output.
pub fn format_template(template: &str, args: &[(String, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in args {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

/// Resolve and render a message key against a catalog.
///
/// On a catalog miss the key itself plus its arguments are rendered, so
/// the failure stays attributable even without a template.
pub fn render_message(
    catalog: &dyn MessageCatalog,
    key: &str,
    args: &[(String, String)],
) -> String {
    match catalog.resolve(key) {
        Some(template) => format_template(&template, args),
        None => {
            if args.is_empty() {
                key.to_string()
            } else {
                let rendered: Vec<String> =
                    args.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("{key} [{}]", rendered.join(", "))
            }
        }
    }
}

/// In-memory message catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    templates: HashMap<String, String>,
}

impl StaticCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog pre-populated with English templates for every
    /// built-in conversion and check strategy.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        for (key, template) in [
            ("convert.text", "{name} cannot be read as text"),
            ("convert.long", "{name} must be a whole number"),
            ("convert.decimal", "{name} must be a number"),
            ("convert.boolean", "{name} must be a boolean value"),
            ("convert.date", "{name} must be a date matching {format}"),
            ("check.required", "{name} is required"),
            (
                "check.length",
                "{name} must be between {min} and {max} characters",
            ),
            ("check.range", "{name} must be between {min} and {max}"),
            ("check.pattern", "{name} does not match the expected format"),
            ("list.size-key", "{name} has an invalid element count"),
        ] {
            catalog.define(key, template);
        }
        catalog
    }

    /// Define or replace a template.
    pub fn define(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(key.into(), template.into());
    }

    /// Number of defined templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True when no templates are defined.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl MessageCatalog for StaticCatalog {
    fn resolve(&self, key: &str) -> Option<String> {
        self.templates.get(key).cloned()
    }
}
