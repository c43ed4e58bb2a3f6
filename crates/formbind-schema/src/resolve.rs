//! # Rule Resolution
//!
//! Turns [`SchemaDef`] declarations into immutable [`RuleSet`]s: one
//! override-aware [`PropertyRule`] per property plus the dispatch-group
//! index. Merging against the base schema is a pure function over the
//! declaration and the base's already-resolved rule set — no hierarchy
//! walking beyond the explicit base reference.
//!
//! ## Concurrency
//!
//! Resolution is lazy and cached in a `DashMap` keyed by schema name.
//! Two threads racing on first-time resolution may both build the rule
//! set; the first insert wins and both observe the same published
//! `Arc<RuleSet>`. Resolution is deterministic, so the discarded build
//! is equivalent to the published one. Once cached, rule sets are
//! immutable and freely shared.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use formbind_core::{CheckTag, ConfigError, Conversion, DisplaySource};

use crate::def::{DispatchStep, PropertyDef, SchemaDef};

/// Resolved, override-aware rule record for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRule {
    /// Property name.
    pub name: String,
    /// Display-name source as declared on the owning schema. Not copied
    /// from the base on redeclaration — only conversion and checks are.
    pub display: Option<DisplaySource>,
    /// Conversion specification; `None` when neither the schema nor its
    /// base declares one.
    pub conversion: Option<Conversion>,
    /// Validation checks in execution order.
    pub checks: Vec<CheckTag>,
}

impl From<&PropertyDef> for PropertyRule {
    fn from(def: &PropertyDef) -> Self {
        Self {
            name: def.name.clone(),
            display: def.display.clone(),
            conversion: def.conversion.clone(),
            checks: def.checks.clone(),
        }
    }
}

/// An immutable, resolved rule set for one schema.
#[derive(Debug, Clone)]
pub struct RuleSet {
    name: String,
    properties: Vec<PropertyRule>,
    index: HashMap<String, usize>,
    dispatches: HashMap<String, Vec<DispatchStep>>,
}

impl RuleSet {
    /// Schema name this rule set was resolved for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All property rules in resolved order.
    pub fn properties(&self) -> &[PropertyRule] {
        &self.properties
    }

    /// Property names in resolved order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    /// Look up a property rule by name.
    pub fn rule(&self, property: &str) -> Option<&PropertyRule> {
        self.index.get(property).map(|&i| &self.properties[i])
    }

    /// Look up a property rule by name, failing on unknown names.
    ///
    /// Explicit-name APIs treat a miss as a configuration defect.
    pub fn require(&self, property: &str) -> Result<&PropertyRule, ConfigError> {
        self.rule(property).ok_or_else(|| ConfigError::UnknownProperty {
            schema: self.name.clone(),
            property: property.to_string(),
        })
    }

    /// Steps of a named dispatch group, declaration order, duplicates
    /// retained.
    pub fn dispatch(&self, group: &str) -> Option<&[DispatchStep]> {
        self.dispatches.get(group).map(Vec::as_slice)
    }

    /// True when the schema declares (or inherits) the dispatch group.
    pub fn has_dispatch(&self, group: &str) -> bool {
        self.dispatches.contains_key(group)
    }
}

/// Merge a schema declaration against its resolved base.
///
/// Base properties come first and keep their positions; a redeclared
/// property replaces the base record in place, inheriting the base's
/// conversion when it declares none and the base's checks when it
/// declares an empty list. New properties append in declaration order.
/// Dispatch groups concatenate base steps before the declaring schema's.
fn merge(def: &SchemaDef, base: Option<&RuleSet>) -> Result<RuleSet, ConfigError> {
    let mut properties: Vec<PropertyRule> =
        base.map(|b| b.properties.clone()).unwrap_or_default();
    let mut index: HashMap<String, usize> = properties
        .iter()
        .enumerate()
        .map(|(i, p)| (p.name.clone(), i))
        .collect();

    for prop in &def.properties {
        match index.get(prop.name.as_str()).copied() {
            Some(i) => {
                let inherited = &properties[i];
                let merged = PropertyRule {
                    name: prop.name.clone(),
                    display: prop.display.clone(),
                    conversion: prop
                        .conversion
                        .clone()
                        .or_else(|| inherited.conversion.clone()),
                    checks: if prop.checks.is_empty() {
                        inherited.checks.clone()
                    } else {
                        prop.checks.clone()
                    },
                };
                properties[i] = merged;
            }
            None => {
                index.insert(prop.name.clone(), properties.len());
                properties.push(PropertyRule::from(prop));
            }
        }
    }

    let mut dispatches: HashMap<String, Vec<DispatchStep>> =
        base.map(|b| b.dispatches.clone()).unwrap_or_default();
    for (group, step) in &def.dispatches {
        if let DispatchStep::Only(names) | DispatchStep::Except(names) = step {
            for name in names {
                if !index.contains_key(name.as_str()) {
                    return Err(ConfigError::UnknownProperty {
                        schema: def.name.clone(),
                        property: name.clone(),
                    });
                }
            }
        }
        dispatches
            .entry(group.clone())
            .or_default()
            .push(step.clone());
    }

    Ok(RuleSet {
        name: def.name.clone(),
        properties,
        index,
        dispatches,
    })
}

/// Registry of schema declarations with a cached resolver.
#[derive(Debug)]
pub struct RuleResolver {
    defs: HashMap<String, SchemaDef>,
    cache: DashMap<String, Arc<RuleSet>>,
}

impl RuleResolver {
    /// Start registering schema declarations.
    pub fn builder() -> RuleResolverBuilder {
        RuleResolverBuilder {
            defs: HashMap::new(),
            error: None,
        }
    }

    /// True when a schema name was registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Registered schema names, sorted.
    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.defs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a schema's rule set, building and caching it on first use.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownSchema` for unregistered names,
    /// `ConfigError::UnknownBase` for dangling base references,
    /// `ConfigError::BaseCycle` for cyclic base chains, and
    /// `ConfigError::UnknownProperty` for dispatch steps naming
    /// unresolvable properties.
    pub fn resolve(&self, name: &str) -> Result<Arc<RuleSet>, ConfigError> {
        let mut stack = Vec::new();
        self.resolve_inner(name, &mut stack)
    }

    fn resolve_inner(
        &self,
        name: &str,
        stack: &mut Vec<String>,
    ) -> Result<Arc<RuleSet>, ConfigError> {
        if let Some(hit) = self.cache.get(name) {
            return Ok(Arc::clone(hit.value()));
        }
        if stack.iter().any(|seen| seen == name) {
            return Err(ConfigError::BaseCycle(name.to_string()));
        }
        let def = self
            .defs
            .get(name)
            .ok_or_else(|| ConfigError::UnknownSchema(name.to_string()))?;

        // Resolve the base before touching the cache entry for `name`,
        // so recursive resolution never holds a shard lock.
        let base = match &def.base {
            Some(base_name) => {
                stack.push(name.to_string());
                let resolved =
                    self.resolve_inner(base_name, stack).map_err(|e| match e {
                        ConfigError::UnknownSchema(_) => ConfigError::UnknownBase {
                            schema: name.to_string(),
                            base: base_name.clone(),
                        },
                        other => other,
                    });
                stack.pop();
                Some(resolved?)
            }
            None => None,
        };

        let built = Arc::new(merge(def, base.as_deref())?);
        let published = self
            .cache
            .entry(name.to_string())
            .or_insert(built)
            .value()
            .clone();
        Ok(published)
    }
}

/// Builder collecting schema declarations, surfacing registration
/// defects when the resolver is built.
#[derive(Debug)]
pub struct RuleResolverBuilder {
    defs: HashMap<String, SchemaDef>,
    error: Option<ConfigError>,
}

impl RuleResolverBuilder {
    /// Register one schema declaration.
    ///
    /// Registration defects (empty name, duplicate schema, duplicate
    /// property within the declaration) are remembered and surfaced by
    /// [`build`](Self::build); later registrations still chain.
    pub fn register(mut self, def: SchemaDef) -> Self {
        if self.error.is_some() {
            return self;
        }
        if def.name.trim().is_empty() {
            self.error = Some(ConfigError::EmptySchemaName);
            return self;
        }
        let mut seen = HashMap::new();
        for prop in &def.properties {
            if seen.insert(prop.name.as_str(), ()).is_some() {
                self.error = Some(ConfigError::DuplicateProperty {
                    schema: def.name.clone(),
                    property: prop.name.clone(),
                });
                return self;
            }
        }
        if self.defs.contains_key(&def.name) {
            self.error = Some(ConfigError::DuplicateSchema(def.name.clone()));
            return self;
        }
        self.defs.insert(def.name.clone(), def);
        self
    }

    /// Finish registration.
    pub fn build(self) -> Result<RuleResolver, ConfigError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(RuleResolver {
                defs: self.defs,
                cache: DashMap::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::PropertyDef;
    use formbind_core::{CheckTag, ConvertTag};

    fn base_user() -> SchemaDef {
        SchemaDef::builder("user")
            .property(
                PropertyDef::new("id")
                    .convert(Conversion::scalar(ConvertTag::text()))
                    .check(CheckTag::required())
                    .check(CheckTag::length(8, 8)),
            )
            .property(
                PropertyDef::new("age")
                    .convert(Conversion::scalar(ConvertTag::long(3)))
                    .check(CheckTag::required()),
            )
            .dispatch("insert", DispatchStep::All)
            .build()
    }

    #[test]
    fn resolves_flat_schema() {
        let resolver = RuleResolver::builder().register(base_user()).build().unwrap();
        let rules = resolver.resolve("user").unwrap();
        assert_eq!(rules.name(), "user");
        let names: Vec<&str> = rules.property_names().collect();
        assert_eq!(names, ["id", "age"]);
        assert_eq!(rules.rule("id").unwrap().checks.len(), 2);
    }

    #[test]
    fn redeclared_checks_keep_base_conversion() {
        // Derived schema redeclares only the checks; the conversion must
        // come from the base record.
        let derived = SchemaDef::builder("admin")
            .base("user")
            .property(PropertyDef::new("age").check(CheckTag::range(18, 65)))
            .build();
        let resolver = RuleResolver::builder()
            .register(base_user())
            .register(derived)
            .build()
            .unwrap();
        let rules = resolver.resolve("admin").unwrap();
        let age = rules.rule("age").unwrap();
        assert_eq!(
            age.conversion,
            Some(Conversion::scalar(ConvertTag::long(3)))
        );
        assert_eq!(age.checks, vec![CheckTag::range(18, 65)]);
    }

    #[test]
    fn redeclaring_both_replaces_both() {
        let derived = SchemaDef::builder("admin")
            .base("user")
            .property(
                PropertyDef::new("age")
                    .convert(Conversion::scalar(ConvertTag::long(2)))
                    .check(CheckTag::range(18, 65)),
            )
            .build();
        let resolver = RuleResolver::builder()
            .register(base_user())
            .register(derived)
            .build()
            .unwrap();
        let age = resolver.resolve("admin").unwrap().rule("age").unwrap().clone();
        assert_eq!(age.conversion, Some(Conversion::scalar(ConvertTag::long(2))));
        assert_eq!(age.checks, vec![CheckTag::range(18, 65)]);
    }

    #[test]
    fn empty_checks_inherit_base_checks() {
        let derived = SchemaDef::builder("admin")
            .base("user")
            .property(
                PropertyDef::new("id").convert(Conversion::scalar(ConvertTag::text())),
            )
            .build();
        let resolver = RuleResolver::builder()
            .register(base_user())
            .register(derived)
            .build()
            .unwrap();
        let id = resolver.resolve("admin").unwrap().rule("id").unwrap().clone();
        assert_eq!(id.checks.len(), 2, "base checks should be inherited");
    }

    #[test]
    fn base_order_kept_and_new_properties_append() {
        let derived = SchemaDef::builder("admin")
            .base("user")
            .property(PropertyDef::new("role").check(CheckTag::required()))
            .property(PropertyDef::new("id").check(CheckTag::length(4, 4)))
            .build();
        let resolver = RuleResolver::builder()
            .register(base_user())
            .register(derived)
            .build()
            .unwrap();
        let names: Vec<String> = resolver
            .resolve("admin")
            .unwrap()
            .property_names()
            .map(str::to_string)
            .collect();
        assert_eq!(names, ["id", "age", "role"]);
    }

    #[test]
    fn dispatch_groups_accumulate_base_first() {
        let derived = SchemaDef::builder("admin")
            .base("user")
            .dispatch("insert", DispatchStep::Only(vec!["age".into()]))
            .build();
        let resolver = RuleResolver::builder()
            .register(base_user())
            .register(derived)
            .build()
            .unwrap();
        let rules = resolver.resolve("admin").unwrap();
        let steps = rules.dispatch("insert").unwrap();
        assert_eq!(steps.len(), 2);
        assert!(matches!(steps[0], DispatchStep::All));
        assert!(matches!(steps[1], DispatchStep::Only(_)));
    }

    #[test]
    fn dispatch_step_with_unknown_property_is_fatal() {
        let def = SchemaDef::builder("user")
            .property(PropertyDef::new("id"))
            .dispatch("insert", DispatchStep::Only(vec!["missing".into()]))
            .build();
        let resolver = RuleResolver::builder().register(def).build().unwrap();
        let err = resolver.resolve("user").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProperty { .. }));
    }

    #[test]
    fn unknown_schema_and_dangling_base() {
        let resolver = RuleResolver::builder().register(base_user()).build().unwrap();
        assert!(matches!(
            resolver.resolve("order").unwrap_err(),
            ConfigError::UnknownSchema(_)
        ));

        let dangling = SchemaDef::builder("admin").base("ghost").build();
        let resolver = RuleResolver::builder()
            .register(base_user())
            .register(dangling)
            .build()
            .unwrap();
        assert!(matches!(
            resolver.resolve("admin").unwrap_err(),
            ConfigError::UnknownBase { .. }
        ));
    }

    #[test]
    fn base_cycle_detected() {
        let a = SchemaDef::builder("a").base("b").build();
        let b = SchemaDef::builder("b").base("a").build();
        let resolver = RuleResolver::builder()
            .register(a)
            .register(b)
            .build()
            .unwrap();
        assert!(matches!(
            resolver.resolve("a").unwrap_err(),
            ConfigError::BaseCycle(_)
        ));
    }

    #[test]
    fn duplicate_registrations_rejected() {
        let err = RuleResolver::builder()
            .register(base_user())
            .register(base_user())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSchema(_)));

        let dup_prop = SchemaDef::builder("x")
            .property(PropertyDef::new("id"))
            .property(PropertyDef::new("id"))
            .build();
        let err = RuleResolver::builder().register(dup_prop).build().unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateProperty { .. }));
    }

    #[test]
    fn cache_returns_same_rule_set() {
        let resolver = RuleResolver::builder().register(base_user()).build().unwrap();
        let first = resolver.resolve("user").unwrap();
        let second = resolver.resolve("user").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn concurrent_first_resolution_publishes_one_rule_set() {
        let resolver = std::sync::Arc::new(
            RuleResolver::builder().register(base_user()).build().unwrap(),
        );
        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = std::sync::Arc::clone(&resolver);
            handles.push(std::thread::spawn(move || {
                resolver.resolve("user").unwrap()
            }));
        }
        let resolved: Vec<Arc<RuleSet>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        for other in &resolved[1..] {
            assert!(Arc::ptr_eq(&resolved[0], other));
        }
    }

    #[test]
    fn require_reports_unknown_property() {
        let resolver = RuleResolver::builder().register(base_user()).build().unwrap();
        let rules = resolver.resolve("user").unwrap();
        assert!(rules.require("id").is_ok());
        assert!(matches!(
            rules.require("ghost").unwrap_err(),
            ConfigError::UnknownProperty { .. }
        ));
    }
}
