//! # formbind-schema — Schema Declarations and Rule Resolution
//!
//! Target types are described by explicit schema declarations: one
//! [`PropertyDef`] per property in declaration order, an optional base
//! schema reference, and named dispatch groups. A registration-time pass
//! replaces the reflective mutator discovery a runtime-introspection
//! design would use — every property the engine will ever touch is
//! enumerated here, once.
//!
//! ## Resolution
//!
//! [`RuleResolver::resolve`] turns a declaration into an immutable
//! [`RuleSet`], merging against the recursively-resolved base schema:
//! a redeclared property that omits its conversion specification, or
//! declares no checks, inherits those pieces from the base's resolved
//! record. Resolved rule sets are cached in a concurrent map — safe for
//! racing first-time resolution, shared read-only afterwards.
//!
//! ## Invariants
//!
//! - Declaration order is preserved: base properties first (redeclared
//!   ones keep their base position), new properties appended in the
//!   order they were declared.
//! - Dispatch groups accumulate, duplicates included: base steps first,
//!   then the declaring schema's steps, per group name.
//! - Dispatch-step property names are verified at resolution time; an
//!   unknown name is a fatal configuration error.

pub mod def;
pub mod resolve;

// Re-export primary types.
pub use def::{DispatchStep, PropertyDef, SchemaDef, SchemaDefBuilder};
pub use resolve::{PropertyRule, RuleResolver, RuleResolverBuilder, RuleSet};
