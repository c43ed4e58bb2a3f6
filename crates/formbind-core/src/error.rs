//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types used throughout formbind. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - [`ConfigError`] covers structural-configuration defects: unknown
//!   schemas, dangling base references, unregistered strategies, bad
//!   dispatch wiring. These indicate a programming error, are raised at
//!   registration/resolution/first-use time, and are never recovered.
//! - [`BuildError`] covers typed result construction. Construction runs
//!   only on explicit caller request and fails loudly.
//! - Per-property conversion and validation failures are NOT errors —
//!   they are recorded as messages on the validation context and the
//!   pass continues with sibling properties.

use thiserror::Error;

/// Top-level error type for the formbind workspace.
#[derive(Error, Debug)]
pub enum FormbindError {
    /// Structural-configuration defect.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Typed result construction failed.
    #[error("build error: {0}")]
    Build(#[from] BuildError),
}

/// Structural-configuration errors.
///
/// Every variant indicates a defect in how schemas, strategies, or
/// dispatch groups were wired together. They surface as `Err` the first
/// time the broken piece is touched and must not be caught and ignored.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A schema name was requested that was never registered.
    #[error("unknown schema '{0}'")]
    UnknownSchema(String),

    /// The same schema name was registered twice.
    #[error("duplicate schema registration for '{0}'")]
    DuplicateSchema(String),

    /// A schema name was empty or whitespace-only.
    #[error("schema name must be non-empty")]
    EmptySchemaName,

    /// One schema declared the same property twice.
    #[error("duplicate property '{property}' on schema '{schema}'")]
    DuplicateProperty {
        /// Owning schema name.
        schema: String,
        /// The property declared twice.
        property: String,
    },

    /// A schema names a base schema that was never registered.
    #[error("schema '{schema}' extends unknown base '{base}'")]
    UnknownBase {
        /// The schema carrying the dangling reference.
        schema: String,
        /// The missing base name.
        base: String,
    },

    /// Base references form a cycle.
    #[error("base-reference cycle involving schema '{0}'")]
    BaseCycle(String),

    /// A dispatch group name was invoked that the schema does not declare.
    #[error("unknown dispatch group '{dispatch}' on schema '{schema}'")]
    UnknownDispatch {
        /// The schema the dispatch was invoked against.
        schema: String,
        /// The unknown group name.
        dispatch: String,
    },

    /// An explicit property name does not exist on the resolved rule set.
    #[error("property '{property}' is not declared on schema '{schema}'")]
    UnknownProperty {
        /// The schema that was searched.
        schema: String,
        /// The missing property name.
        property: String,
    },

    /// No converter is registered for a conversion tag kind.
    #[error("no converter registered for kind '{0}'")]
    UnregisteredConverter(String),

    /// No checker is registered for a validation tag kind.
    #[error("no checker registered for kind '{0}'")]
    UnregisteredChecker(String),

    /// No text refiner is registered under a tag's extension name.
    #[error("no text refiner registered for name '{0}'")]
    UnregisteredRefiner(String),

    /// A second converter was registered for an already-covered kind.
    #[error("a converter for kind '{0}' is already registered")]
    DuplicateConverter(String),

    /// A second checker was registered for an already-covered kind.
    #[error("a checker for kind '{0}' is already registered")]
    DuplicateChecker(String),

    /// A second text refiner was registered under the same name.
    #[error("a text refiner named '{0}' is already registered")]
    DuplicateRefiner(String),

    /// A list size key resolved to a value that is neither a string nor a
    /// single-element string array. Wrong-shape values indicate a wiring
    /// defect in the producing layer; wrong-content strings are recorded
    /// as recoverable messages instead.
    #[error("size key '{key}' for list property '{property}' has a non-text shape")]
    MalformedSizeKey {
        /// The list property whose length was being resolved.
        property: String,
        /// The size-key input name.
        key: String,
    },

    /// A pattern check carries a regular expression that does not compile.
    #[error("invalid pattern for property '{property}': {reason}")]
    InvalidPattern {
        /// The property the pattern check is attached to.
        property: String,
        /// Compiler error text from the regex engine.
        reason: String,
    },
}

/// Errors from typed result construction.
#[derive(Error, Debug)]
pub enum BuildError {
    /// `build_result` was called on a context holding failure messages.
    #[error("context holds {failures} failure message(s); check is_valid() before building")]
    ContextInvalid {
        /// Number of failure messages on the context.
        failures: usize,
    },

    /// The converted-value map could not be deserialized into the target
    /// type. This is fatal for the dirty build variant as well.
    #[error("cannot construct {type_name} from converted values: {source}")]
    Construction {
        /// Rust type name of the requested target.
        type_name: &'static str,
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_includes_names() {
        let err = ConfigError::UnknownDispatch {
            schema: "user".into(),
            dispatch: "insert".into(),
        };
        let text = err.to_string();
        assert!(text.contains("insert"));
        assert!(text.contains("user"));
    }

    #[test]
    fn top_level_error_wraps_config() {
        let err: FormbindError = ConfigError::UnknownSchema("order".into()).into();
        assert!(matches!(err, FormbindError::Config(_)));
        assert!(err.to_string().contains("order"));
    }

    #[test]
    fn build_error_reports_failure_count() {
        let err = BuildError::ContextInvalid { failures: 3 };
        assert!(err.to_string().contains('3'));
    }
}
