//! # formbind-engine — Declarative Conversion and Validation
//!
//! The engine turns an untyped, string-keyed input map into a
//! strongly-typed, validated result, driven by the per-property rules
//! resolved by `formbind-schema`. One [`Engine`] is built once with its
//! collaborators injected and shared freely; one [`Context`] is created
//! per validation pass and owned exclusively by it.
//!
//! ## Pipeline
//!
//! For each property in resolved order: fetch the raw value under the
//! context prefix, run the conversion strategy (admissibility, then
//! conversion), store the typed value, then run the declared checks in
//! order, stopping at the first failure. Nested-object and list
//! properties recurse instead, spawning child contexts with extended
//! prefixes and absorbing their failures into the parent.
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use formbind_core::{CheckTag, Conversion, ConvertTag};
//! use formbind_engine::Engine;
//! use formbind_schema::{PropertyDef, RuleResolver, SchemaDef};
//!
//! #[derive(serde::Deserialize)]
//! struct User {
//!     id: String,
//!     age: i64,
//! }
//!
//! # fn main() -> Result<(), formbind_core::FormbindError> {
//! let resolver = Arc::new(
//!     RuleResolver::builder()
//!         .register(
//!             SchemaDef::builder("user")
//!                 .property(
//!                     PropertyDef::new("id")
//!                         .convert(Conversion::scalar(ConvertTag::text()))
//!                         .check(CheckTag::required())
//!                         .check(CheckTag::length(8, 8)),
//!                 )
//!                 .property(
//!                     PropertyDef::new("age")
//!                         .convert(Conversion::scalar(ConvertTag::long(3)))
//!                         .check(CheckTag::required()),
//!                 )
//!                 .build(),
//!         )
//!         .build()?,
//! );
//! let engine = Engine::builder(resolver).build()?;
//!
//! let mut input = HashMap::new();
//! input.insert("id".to_string(), serde_json::json!(["12345678"]));
//! input.insert("age".to_string(), serde_json::json!(["41"]));
//!
//! let ctx = engine.validate_and_convert("", "user", input, None)?;
//! assert!(ctx.is_valid());
//! let user: User = ctx.build_result().expect("valid context builds");
//! assert_eq!(user.age, 41);
//! # Ok(())
//! # }
//! ```

pub mod check;
pub mod context;
pub mod convert;
pub mod engine;

// Re-export primary types.
pub use check::{Checker, LengthChecker, PatternChecker, RangeChecker, RequiredChecker};
pub use context::Context;
pub use convert::{
    matches_digit_format, BooleanConverter, Converter, DateConverter, DecimalConverter,
    DigitFormat, LongConverter, TextConverter, TextRefiner,
};
pub use engine::{Engine, EngineBuilder};
