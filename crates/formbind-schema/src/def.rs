//! # Schema Declarations
//!
//! Builder-constructed descriptions of target types: properties with
//! their rule tags, an optional base-schema reference, and dispatch
//! groups. Declarations are inert data — validation and merging happen
//! in [`crate::resolve`].

use serde::{Deserialize, Serialize};

use formbind_core::{CheckTag, Conversion, DisplaySource};

/// One step of a dispatch group.
///
/// A dispatch group is an ordered list of steps; each step names the
/// properties it covers. Steps are executed in declaration order when
/// the group is invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DispatchStep {
    /// Validate every property of the schema.
    All,
    /// Validate exactly the named properties.
    Only(Vec<String>),
    /// Validate every property except the named ones.
    Except(Vec<String>),
}

/// Declarative rule bundle for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Property name, also the input-map key under the context prefix.
    pub name: String,
    /// Display-name source; `None` falls back to the property name.
    pub display: Option<DisplaySource>,
    /// Conversion specification; `None` inherits from the base schema's
    /// record for the same property, or defaults to plain text.
    pub conversion: Option<Conversion>,
    /// Ordered validation checks; an empty list inherits from the base
    /// schema's record for the same property.
    pub checks: Vec<CheckTag>,
}

impl PropertyDef {
    /// Start declaring a property.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display: None,
            conversion: None,
            checks: Vec::new(),
        }
    }

    /// Fixed display name.
    pub fn display_literal(mut self, text: impl Into<String>) -> Self {
        self.display = Some(DisplaySource::Literal(text.into()));
        self
    }

    /// Catalog-key display name.
    pub fn display_key(mut self, key: impl Into<String>) -> Self {
        self.display = Some(DisplaySource::CatalogKey(key.into()));
        self
    }

    /// Attach the conversion specification.
    pub fn convert(mut self, conversion: Conversion) -> Self {
        self.conversion = Some(conversion);
        self
    }

    /// Append a validation check.
    pub fn check(mut self, tag: CheckTag) -> Self {
        self.checks.push(tag);
        self
    }
}

/// A complete schema declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    /// Schema name, the resolver registry key.
    pub name: String,
    /// Base schema to merge against, by name.
    pub base: Option<String>,
    /// Properties in declaration order.
    pub properties: Vec<PropertyDef>,
    /// Dispatch groups: (group name, step), duplicates retained in
    /// declaration order.
    pub dispatches: Vec<(String, DispatchStep)>,
}

impl SchemaDef {
    /// Start declaring a schema.
    pub fn builder(name: impl Into<String>) -> SchemaDefBuilder {
        SchemaDefBuilder {
            def: SchemaDef {
                name: name.into(),
                base: None,
                properties: Vec::new(),
                dispatches: Vec::new(),
            },
        }
    }
}

/// Fluent builder for [`SchemaDef`].
#[derive(Debug, Clone)]
pub struct SchemaDefBuilder {
    def: SchemaDef,
}

impl SchemaDefBuilder {
    /// Declare the base schema this one derives from.
    pub fn base(mut self, name: impl Into<String>) -> Self {
        self.def.base = Some(name.into());
        self
    }

    /// Declare a property.
    pub fn property(mut self, property: PropertyDef) -> Self {
        self.def.properties.push(property);
        self
    }

    /// Append a step to a dispatch group. Calling this repeatedly with
    /// the same group name accumulates steps in declaration order.
    pub fn dispatch(mut self, group: impl Into<String>, step: DispatchStep) -> Self {
        self.def.dispatches.push((group.into(), step));
        self
    }

    /// Finish the declaration.
    pub fn build(self) -> SchemaDef {
        self.def
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formbind_core::{CheckTag, Conversion, ConvertTag};

    #[test]
    fn builder_preserves_declaration_order() {
        let def = SchemaDef::builder("user")
            .property(PropertyDef::new("id").convert(Conversion::scalar(ConvertTag::text())))
            .property(PropertyDef::new("age").convert(Conversion::scalar(ConvertTag::long(3))))
            .build();
        let names: Vec<&str> = def.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["id", "age"]);
    }

    #[test]
    fn dispatch_steps_accumulate_per_group() {
        let def = SchemaDef::builder("user")
            .dispatch("insert", DispatchStep::Only(vec!["id".into()]))
            .dispatch("update", DispatchStep::All)
            .dispatch("insert", DispatchStep::Except(vec!["age".into()]))
            .build();
        let insert_steps: Vec<&DispatchStep> = def
            .dispatches
            .iter()
            .filter(|(name, _)| name == "insert")
            .map(|(_, step)| step)
            .collect();
        assert_eq!(insert_steps.len(), 2);
        assert!(matches!(insert_steps[0], DispatchStep::Only(_)));
        assert!(matches!(insert_steps[1], DispatchStep::Except(_)));
    }

    #[test]
    fn property_def_collects_checks_in_order() {
        let def = PropertyDef::new("id")
            .check(CheckTag::required())
            .check(CheckTag::length(8, 8));
        assert_eq!(def.checks[0].kind, "required");
        assert_eq!(def.checks[1].kind, "length");
    }
}
