//! # formbind-core — Foundational Types for formbind
//!
//! This crate is the leaf of the formbind workspace. It defines the
//! declarative rule-tag data model, the message-catalog contract, and the
//! structured error hierarchy that the schema and engine crates build on.
//! It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Tags are data.** A conversion format or a validation check is a
//!    kind string plus a named-parameter bundle ([`TagParams`]). Strategy
//!    dispatch happens in the engine through explicit registries keyed by
//!    kind — there is no reflection and no global lookup.
//!
//! 2. **`serde_json::Value` is the value currency.** Raw input values and
//!    converted values are both `Value`; typed results are produced by
//!    serde deserialization over the converted map.
//!
//! 3. **Recoverable failures are data, not errors.** Conversion and
//!    validation failures become [`Message`] records on a context. `Err`
//!    is reserved for [`ConfigError`] (wiring defects) and [`BuildError`]
//!    (result construction).
//!
//! ## Crate Policy
//!
//! - No dependencies on other `formbind-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod catalog;
pub mod display;
pub mod error;
pub mod locale;
pub mod path;
pub mod tag;

// Re-export primary types for ergonomic imports.
pub use catalog::{format_template, render_message, Message, MessageCatalog, StaticCatalog};
pub use display::{resolve_display, DisplaySource};
pub use error::{BuildError, ConfigError, FormbindError};
pub use locale::NumericLocale;
pub use tag::{check_kind, convert_kind, CheckTag, Conversion, ConvertTag, ListLength, TagParams};
