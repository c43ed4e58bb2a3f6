//! # Orchestrator
//!
//! The [`Engine`] drives one validation pass: per property it runs the
//! conversion strategy, then the declared checks in order, and for
//! structural properties it descends recursively with an extended key
//! prefix. All collaborators — resolver, strategy registries, message
//! catalog — are injected through [`EngineBuilder`]; there is no global
//! state.
//!
//! ## Per-Property State Machine
//!
//! ```text
//! Unprocessed → (mark processed) → fetch raw value
//!     structural? → recursive descent into child contexts
//!     else        → Converting: admissibility, convert, store
//!                   → Validating: checks in order, stop at first failure
//!                   → Done
//! ```
//!
//! A failed admissibility check leaves the property unconverted and
//! skips its checks; sibling properties always continue. Fatal errors
//! (`ConfigError`) abort the pass — they indicate broken wiring, not
//! bad input.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use formbind_core::{
    path, resolve_display, CheckTag, ConfigError, Conversion, ConvertTag, FormbindError,
    ListLength, MessageCatalog, NumericLocale, StaticCatalog, TagParams,
};
use formbind_schema::{DispatchStep, PropertyRule, RuleResolver, RuleSet};

use crate::check::{
    Checker, LengthChecker, PatternChecker, RangeChecker, RequiredChecker,
};
use crate::context::Context;
use crate::convert::{
    default_refiners, single_text, BooleanConverter, Converter, DateConverter,
    DecimalConverter, LongConverter, TextConverter, TextRefiner,
};

/// The validation orchestrator.
///
/// `Engine` is `Send + Sync`; share it behind an `Arc` across threads.
/// Each validation invocation owns its [`Context`] exclusively.
pub struct Engine {
    resolver: Arc<RuleResolver>,
    converters: HashMap<String, Arc<dyn Converter>>,
    checkers: HashMap<String, Arc<dyn Checker>>,
    catalog: Arc<dyn MessageCatalog>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("converters", &self.converters.len())
            .field("checkers", &self.checkers.len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Start building an engine around a resolver.
    pub fn builder(resolver: Arc<RuleResolver>) -> EngineBuilder {
        EngineBuilder {
            resolver,
            locale: NumericLocale::default(),
            catalog: None,
            converters: Vec::new(),
            checkers: Vec::new(),
            refiners: Vec::new(),
        }
    }

    /// Create a fresh context for a schema over an input map.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownSchema` (and friends) when the schema cannot
    /// be resolved.
    pub fn new_context(
        &self,
        prefix: &str,
        schema: &str,
        input: HashMap<String, Value>,
        dispatch: Option<&str>,
    ) -> Result<Context, ConfigError> {
        let rules = self.resolver.resolve(schema)?;
        Ok(Context::new(
            prefix.to_string(),
            rules,
            Arc::new(input),
            dispatch.map(str::to_string),
            Arc::clone(&self.catalog),
        ))
    }

    /// Run a full pass: validate-all when `dispatch` is `None`, the
    /// named dispatch group otherwise. Returns the context carrying
    /// converted values and any failure messages.
    pub fn validate_and_convert(
        &self,
        prefix: &str,
        schema: &str,
        input: HashMap<String, Value>,
        dispatch: Option<&str>,
    ) -> Result<Context, FormbindError> {
        let mut ctx = self.new_context(prefix, schema, input, dispatch)?;
        self.run_pass(&mut ctx)?;
        Ok(ctx)
    }

    fn run_pass(&self, ctx: &mut Context) -> Result<(), FormbindError> {
        match ctx.dispatch_name().map(str::to_string) {
            Some(group) => self.run_dispatch(ctx, &group),
            None => self.validate_all(ctx),
        }
    }

    /// Validate every property of the context's schema, resolved order.
    pub fn validate_all(&self, ctx: &mut Context) -> Result<(), FormbindError> {
        let rules = Arc::clone(ctx.rules());
        for rule in rules.properties() {
            self.process_property(ctx, rule)?;
        }
        Ok(())
    }

    /// Validate exactly the named properties.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownProperty` for names absent from the resolved
    /// rule set.
    pub fn validate_only(
        &self,
        ctx: &mut Context,
        properties: &[&str],
    ) -> Result<(), FormbindError> {
        let rules = Arc::clone(ctx.rules());
        for name in properties {
            let rule = rules.require(name)?;
            self.process_property(ctx, rule)?;
        }
        Ok(())
    }

    /// Validate every property except the named ones.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownProperty` for excluded names absent from the
    /// resolved rule set — an exclusion that excludes nothing is a
    /// configuration defect.
    pub fn validate_except(
        &self,
        ctx: &mut Context,
        excluded: &[&str],
    ) -> Result<(), FormbindError> {
        let rules = Arc::clone(ctx.rules());
        for name in excluded {
            rules.require(name)?;
        }
        for rule in rules.properties() {
            if excluded.contains(&rule.name.as_str()) {
                continue;
            }
            self.process_property(ctx, rule)?;
        }
        Ok(())
    }

    /// Execute a named dispatch group's steps in declaration order.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownDispatch` when the schema does not declare
    /// the group.
    pub fn run_dispatch(&self, ctx: &mut Context, group: &str) -> Result<(), FormbindError> {
        let rules = Arc::clone(ctx.rules());
        let steps = rules
            .dispatch(group)
            .ok_or_else(|| ConfigError::UnknownDispatch {
                schema: ctx.schema_name().to_string(),
                dispatch: group.to_string(),
            })?;
        for step in steps {
            match step {
                DispatchStep::All => self.validate_all(ctx)?,
                DispatchStep::Only(names) => {
                    let names: Vec<&str> = names.iter().map(String::as_str).collect();
                    self.validate_only(ctx, &names)?;
                }
                DispatchStep::Except(names) => {
                    let names: Vec<&str> = names.iter().map(String::as_str).collect();
                    self.validate_except(ctx, &names)?;
                }
            }
        }
        Ok(())
    }

    /// Run a single check directly from a named-parameter bundle,
    /// outside the declarative pass, against the already-converted
    /// value. Returns whether the check passed.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownProperty` for unresolvable names and
    /// `ConfigError::UnregisteredChecker` for unknown check kinds.
    pub fn check_value(
        &self,
        ctx: &mut Context,
        property: &str,
        kind: &str,
        params: TagParams,
    ) -> Result<bool, FormbindError> {
        let rules = Arc::clone(ctx.rules());
        let rule = rules.require(property)?;
        let display = resolve_display(rule.display.as_ref(), property, self.catalog.as_ref());
        let checker = self
            .checkers
            .get(kind)
            .ok_or_else(|| ConfigError::UnregisteredChecker(kind.to_string()))?;
        let tag = CheckTag {
            kind: kind.to_string(),
            params,
        };
        Ok(checker.check(ctx, property, &display, &tag)?)
    }

    // -- Per-property processing ------------------------------------------

    fn process_property(
        &self,
        ctx: &mut Context,
        rule: &PropertyRule,
    ) -> Result<(), FormbindError> {
        if !ctx.mark_processed(&rule.name) {
            return Ok(());
        }
        let display =
            resolve_display(rule.display.as_ref(), &rule.name, self.catalog.as_ref());
        match &rule.conversion {
            Some(Conversion::Nested { schema }) => self.process_nested(ctx, rule, schema),
            Some(Conversion::List { schema, length }) => {
                self.process_list(ctx, rule, &display, schema, length)
            }
            Some(Conversion::Scalar(tag)) => self.process_scalar(ctx, rule, &display, tag),
            // No conversion declared anywhere in the schema chain: the
            // value flows through as plain text and checks still run.
            None => self.process_scalar(ctx, rule, &display, &ConvertTag::text()),
        }
    }

    fn process_scalar(
        &self,
        ctx: &mut Context,
        rule: &PropertyRule,
        display: &str,
        tag: &ConvertTag,
    ) -> Result<(), FormbindError> {
        let converter = self
            .converters
            .get(&tag.kind)
            .ok_or_else(|| ConfigError::UnregisteredConverter(tag.kind.clone()))?;

        let raw = ctx.raw_value(&rule.name).cloned();
        if !converter.is_convertible(ctx, &rule.name, display, raw.as_ref(), tag) {
            // Inadmissible: property stays unconverted, checks are skipped.
            return Ok(());
        }
        if let Some(value) = converter.convert(&rule.name, raw.as_ref(), tag)? {
            ctx.set_converted(&rule.name, value);
        }
        self.run_checks(ctx, rule, display)
    }

    fn run_checks(
        &self,
        ctx: &mut Context,
        rule: &PropertyRule,
        display: &str,
    ) -> Result<(), FormbindError> {
        for tag in &rule.checks {
            let checker = self
                .checkers
                .get(&tag.kind)
                .ok_or_else(|| ConfigError::UnregisteredChecker(tag.kind.clone()))?;
            if !checker.check(ctx, &rule.name, display, tag)? {
                break;
            }
        }
        Ok(())
    }

    // -- Structural descent -----------------------------------------------

    /// Dispatch name for a child pass: the parent's group when the child
    /// schema declares it, validate-all otherwise.
    fn child_dispatch<'e>(&self, parent: &'e Context, child_rules: &RuleSet) -> Option<&'e str> {
        parent
            .dispatch_name()
            .filter(|group| child_rules.has_dispatch(group))
    }

    fn child_context(
        &self,
        parent: &Context,
        prefix: String,
        schema: &str,
    ) -> Result<Context, FormbindError> {
        let rules = self.resolver.resolve(schema)?;
        let dispatch = self.child_dispatch(parent, &rules).map(str::to_string);
        Ok(Context::new(
            prefix,
            rules,
            Arc::clone(parent.input()),
            dispatch,
            Arc::clone(&self.catalog),
        ))
    }

    fn process_nested(
        &self,
        ctx: &mut Context,
        rule: &PropertyRule,
        schema: &str,
    ) -> Result<(), FormbindError> {
        let prefix = path::nested_prefix(ctx.prefix(), &rule.name);
        let mut child = self.child_context(ctx, prefix, schema)?;
        self.run_pass(&mut child)?;
        if child.is_valid() {
            ctx.set_converted(&rule.name, Value::Object(child.into_converted_object()));
        } else {
            ctx.absorb(child);
        }
        Ok(())
    }

    fn process_list(
        &self,
        ctx: &mut Context,
        rule: &PropertyRule,
        display: &str,
        schema: &str,
        length: &ListLength,
    ) -> Result<(), FormbindError> {
        let count = match length {
            ListLength::Fixed(n) => *n,
            ListLength::SizeKey { key, max_digits } => {
                match self.resolve_size_key(ctx, rule, display, key, *max_digits)? {
                    Some(n) => n,
                    // Invalid size key: one failure recorded, no children.
                    None => return Ok(()),
                }
            }
        };

        let mut children = Vec::with_capacity(count);
        for index in 0..count {
            let prefix = path::indexed_prefix(ctx.prefix(), &rule.name, index);
            let mut child = self.child_context(ctx, prefix, schema)?;
            self.run_pass(&mut child)?;
            children.push(child);
        }

        if children.iter().all(Context::is_valid) {
            let elements: Vec<Value> = children
                .into_iter()
                .map(|child| Value::Object(child.into_converted_object()))
                .collect();
            ctx.set_converted(&rule.name, Value::Array(elements));
        } else {
            // All-or-nothing: absorb every child's messages and leave
            // the list unconverted.
            for child in children {
                ctx.absorb(child);
            }
        }
        Ok(())
    }

    /// Resolve a list's element count from its size key.
    ///
    /// `Ok(None)` means an invalid-size failure was recorded (absent
    /// key, non-numeric text, or too many digits) and the effective
    /// length is zero. A present value that is neither a string nor a
    /// one-element string array is a fatal configuration error — that
    /// shape cannot come from a form layer.
    fn resolve_size_key(
        &self,
        ctx: &mut Context,
        rule: &PropertyRule,
        display: &str,
        key: &str,
        max_digits: usize,
    ) -> Result<Option<usize>, FormbindError> {
        let failure_args = vec![
            ("name".to_string(), display.to_string()),
            ("key".to_string(), key.to_string()),
        ];
        let Some(raw) = ctx.raw_value(key).cloned() else {
            ctx.add_failure(&rule.name, "list.size-key", failure_args);
            return Ok(None);
        };
        let Some(text) = single_text(&raw) else {
            return Err(ConfigError::MalformedSizeKey {
                property: rule.name.clone(),
                key: key.to_string(),
            }
            .into());
        };
        if text.is_empty()
            || text.len() > max_digits
            || !text.chars().all(|c| c.is_ascii_digit())
        {
            ctx.add_failure(&rule.name, "list.size-key", failure_args);
            return Ok(None);
        }
        match text.parse::<usize>() {
            Ok(count) => Ok(Some(count)),
            Err(_) => {
                ctx.add_failure(&rule.name, "list.size-key", failure_args);
                Ok(None)
            }
        }
    }
}

/// Builder wiring an [`Engine`]'s collaborators.
///
/// Built-in strategies are registered first; additional strategies may
/// be added for new kinds. Registering a second strategy for an
/// already-covered kind is a configuration error.
pub struct EngineBuilder {
    resolver: Arc<RuleResolver>,
    locale: NumericLocale,
    catalog: Option<Arc<dyn MessageCatalog>>,
    converters: Vec<Arc<dyn Converter>>,
    checkers: Vec<Arc<dyn Checker>>,
    refiners: Vec<(String, Arc<dyn TextRefiner>)>,
}

impl EngineBuilder {
    /// Use a custom message catalog (default: [`StaticCatalog`] with the
    /// built-in English templates).
    pub fn catalog(mut self, catalog: Arc<dyn MessageCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Numeric separators for the digit-format matcher.
    pub fn locale(mut self, locale: NumericLocale) -> Self {
        self.locale = locale;
        self
    }

    /// Register an additional conversion strategy.
    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converters.push(converter);
        self
    }

    /// Register an additional validation check strategy.
    pub fn checker(mut self, checker: Arc<dyn Checker>) -> Self {
        self.checkers.push(checker);
        self
    }

    /// Register a text refiner under an extension name.
    pub fn refiner(mut self, name: impl Into<String>, refiner: Arc<dyn TextRefiner>) -> Self {
        self.refiners.push((name.into(), refiner));
        self
    }

    /// Assemble the engine.
    ///
    /// # Errors
    ///
    /// `ConfigError::DuplicateConverter` / `DuplicateChecker` /
    /// `DuplicateRefiner` when a registration collides with a built-in
    /// or earlier registration.
    pub fn build(self) -> Result<Engine, ConfigError> {
        let mut refiners = default_refiners();
        for (name, refiner) in self.refiners {
            if refiners.insert(name.clone(), refiner).is_some() {
                return Err(ConfigError::DuplicateRefiner(name));
            }
        }

        let mut converters: HashMap<String, Arc<dyn Converter>> = HashMap::new();
        let builtins: Vec<Arc<dyn Converter>> = vec![
            Arc::new(TextConverter::new(refiners)),
            Arc::new(LongConverter::new(self.locale)),
            Arc::new(DecimalConverter::new(self.locale)),
            Arc::new(BooleanConverter),
            Arc::new(DateConverter),
        ];
        for converter in builtins.into_iter().chain(self.converters) {
            let kind = converter.kind().to_string();
            if converters.insert(kind.clone(), converter).is_some() {
                return Err(ConfigError::DuplicateConverter(kind));
            }
        }

        let mut checkers: HashMap<String, Arc<dyn Checker>> = HashMap::new();
        let builtins: Vec<Arc<dyn Checker>> = vec![
            Arc::new(RequiredChecker),
            Arc::new(LengthChecker),
            Arc::new(RangeChecker),
            Arc::new(PatternChecker::new()),
        ];
        for checker in builtins.into_iter().chain(self.checkers) {
            let kind = checker.kind().to_string();
            if checkers.insert(kind.clone(), checker).is_some() {
                return Err(ConfigError::DuplicateChecker(kind));
            }
        }

        Ok(Engine {
            resolver: self.resolver,
            converters,
            checkers,
            catalog: self
                .catalog
                .unwrap_or_else(|| Arc::new(StaticCatalog::with_defaults())),
        })
    }
}
