//! # Validation Context
//!
//! One [`Context`] carries the state of a single validation pass: the
//! key prefix, the shared raw-input map, converted values, ordered
//! failure messages, and the hierarchically-expanded invalid-path set.
//! Recursive descent creates one child context per nested object or list
//! element; a failed child is absorbed back into its parent wholesale.
//!
//! ## Invariants
//!
//! - `is_valid()` ⇔ the failure-message list is empty.
//! - Every dot-delimited ancestor of a failing path (prefix-stripped) is
//!   in the invalid set; descendants of a failing composite are not.
//! - A property is processed at most once per context; re-processing is
//!   a no-op enforced by the orchestrator via [`Context::mark_processed`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use formbind_core::{
    path, render_message, BuildError, Message, MessageCatalog,
};
use formbind_schema::RuleSet;

/// State of one validation pass over one schema.
pub struct Context {
    prefix: String,
    rules: Arc<RuleSet>,
    input: Arc<HashMap<String, Value>>,
    dispatch: Option<String>,
    catalog: Arc<dyn MessageCatalog>,
    messages: Vec<Message>,
    converted: HashMap<String, Value>,
    invalid: HashSet<String>,
    processed: HashSet<String>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("prefix", &self.prefix)
            .field("schema", &self.rules.name())
            .field("dispatch", &self.dispatch)
            .field("messages", &self.messages.len())
            .field("converted", &self.converted.len())
            .finish_non_exhaustive()
    }
}

impl Context {
    pub(crate) fn new(
        prefix: String,
        rules: Arc<RuleSet>,
        input: Arc<HashMap<String, Value>>,
        dispatch: Option<String>,
        catalog: Arc<dyn MessageCatalog>,
    ) -> Self {
        Self {
            prefix,
            rules,
            input,
            dispatch,
            catalog,
            messages: Vec::new(),
            converted: HashMap::new(),
            invalid: HashSet::new(),
            processed: HashSet::new(),
        }
    }

    /// The key prefix of this pass (empty, or ending with `"."`).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Name of the schema this context validates against.
    pub fn schema_name(&self) -> &str {
        self.rules.name()
    }

    /// The resolved rule set for this pass.
    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    /// The dispatch-group name this pass runs under, if any.
    pub fn dispatch_name(&self) -> Option<&str> {
        self.dispatch.as_deref()
    }

    pub(crate) fn input(&self) -> &Arc<HashMap<String, Value>> {
        &self.input
    }

    pub(crate) fn catalog(&self) -> &Arc<dyn MessageCatalog> {
        &self.catalog
    }

    /// Raw input value for a property, looked up under this context's
    /// prefix. `Value::Null` reads as absent.
    pub fn raw_value(&self, property: &str) -> Option<&Value> {
        self.input
            .get(&path::qualify(&self.prefix, property))
            .filter(|v| !v.is_null())
    }

    /// True when no failure message has been recorded.
    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }

    /// True when the (prefix-relative) path or any recorded descendant
    /// of it has failed.
    pub fn is_invalid(&self, property_path: &str) -> bool {
        self.invalid.contains(property_path)
    }

    /// All failure messages in recording order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Record a leaf failure for a property of this context.
    ///
    /// The message text is resolved through the catalog at append time;
    /// the path is prefix-qualified and its ancestors are marked invalid.
    pub fn add_failure(&mut self, property: &str, key: &str, args: Vec<(String, String)>) {
        let full_path = path::qualify(&self.prefix, property);
        let text = render_message(self.catalog.as_ref(), key, &args);
        self.mark_invalid(&full_path);
        self.messages.push(Message {
            path: full_path,
            key: key.to_string(),
            args,
            text,
        });
    }

    /// Mark a fully-qualified path (and its prefix-relative ancestors)
    /// invalid without recording a message.
    fn mark_invalid(&mut self, full_path: &str) {
        let relative = path::strip_prefix(full_path, &self.prefix);
        for ancestor in path::ancestors(relative) {
            self.invalid.insert(ancestor.to_string());
        }
    }

    /// Absorb a failed child context: its messages append to this
    /// context (paths already qualified by construction) and their
    /// ancestors are marked invalid relative to this context.
    pub fn absorb(&mut self, child: Context) {
        for message in child.messages {
            self.mark_invalid(&message.path);
            self.messages.push(message);
        }
    }

    /// Mark a property as processed. Returns `false` when it already
    /// was, making repeated passes over the same name a no-op.
    pub fn mark_processed(&mut self, property: &str) -> bool {
        self.processed.insert(property.to_string())
    }

    /// True when the property was already handled in this pass.
    pub fn is_processed(&self, property: &str) -> bool {
        self.processed.contains(property)
    }

    /// Converted value for a property, when conversion succeeded.
    pub fn converted_value(&self, property: &str) -> Option<&Value> {
        self.converted.get(property)
    }

    /// Store a property's converted value.
    pub fn set_converted(&mut self, property: &str, value: Value) {
        self.converted.insert(property.to_string(), value);
    }

    /// The full converted-value map.
    pub fn converted_values(&self) -> &HashMap<String, Value> {
        &self.converted
    }

    pub(crate) fn into_converted_object(self) -> serde_json::Map<String, Value> {
        self.converted.into_iter().collect()
    }

    /// Construct the typed result from the converted-value map.
    ///
    /// # Errors
    ///
    /// `BuildError::ContextInvalid` when failure messages exist — check
    /// [`is_valid`](Self::is_valid) first. `BuildError::Construction`
    /// when the target type cannot be deserialized from the map; this is
    /// fatal and indicates a broken target type or schema.
    pub fn build_result<T: DeserializeOwned>(&self) -> Result<T, BuildError> {
        if !self.is_valid() {
            return Err(BuildError::ContextInvalid {
                failures: self.messages.len(),
            });
        }
        self.build_dirty_result()
    }

    /// Construct the typed result without checking validity, so
    /// partially-converted data stays inspectable after a failed pass.
    /// Properties whose conversion failed are absent from the map; the
    /// target type must tolerate that (optional/defaulted fields) or
    /// this fails with `BuildError::Construction`.
    pub fn build_dirty_result<T: DeserializeOwned>(&self) -> Result<T, BuildError> {
        let object: serde_json::Map<String, Value> = self
            .converted
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        serde_json::from_value(Value::Object(object)).map_err(|source| {
            BuildError::Construction {
                type_name: std::any::type_name::<T>(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formbind_core::StaticCatalog;
    use formbind_schema::{RuleResolver, SchemaDef};
    use serde::Deserialize;
    use serde_json::json;

    fn empty_rules(name: &str) -> Arc<RuleSet> {
        let resolver = RuleResolver::builder()
            .register(SchemaDef::builder(name).build())
            .build()
            .unwrap();
        resolver.resolve(name).unwrap()
    }

    fn context(prefix: &str) -> Context {
        Context::new(
            prefix.to_string(),
            empty_rules("test"),
            Arc::new(HashMap::new()),
            None,
            Arc::new(StaticCatalog::with_defaults()),
        )
    }

    #[test]
    fn fresh_context_is_valid() {
        let ctx = context("");
        assert!(ctx.is_valid());
        assert!(ctx.messages().is_empty());
    }

    #[test]
    fn add_failure_marks_ancestors_invalid() {
        let mut ctx = context("");
        ctx.add_failure("a.b.c", "check.required", vec![]);
        assert!(!ctx.is_valid());
        assert!(ctx.is_invalid("a"));
        assert!(ctx.is_invalid("a.b"));
        assert!(ctx.is_invalid("a.b.c"));
        assert!(!ctx.is_invalid("b"));
        assert!(!ctx.is_invalid("c"));
    }

    #[test]
    fn add_failure_qualifies_path_with_prefix() {
        let mut ctx = context("order.");
        ctx.add_failure("total", "check.range", vec![]);
        assert_eq!(ctx.messages()[0].path, "order.total");
        // Invalid paths are prefix-relative.
        assert!(ctx.is_invalid("total"));
        assert!(!ctx.is_invalid("order.total"));
    }

    #[test]
    fn absorb_restates_child_paths_relative_to_parent() {
        let mut parent = context("");
        let mut child = Context::new(
            "address.".to_string(),
            empty_rules("address"),
            Arc::new(HashMap::new()),
            None,
            Arc::new(StaticCatalog::with_defaults()),
        );
        child.add_failure("city", "check.required", vec![]);
        parent.absorb(child);
        assert!(!parent.is_valid());
        assert!(parent.is_invalid("address"));
        assert!(parent.is_invalid("address.city"));
        assert_eq!(parent.messages().len(), 1);
        assert_eq!(parent.messages()[0].path, "address.city");
    }

    #[test]
    fn mark_processed_is_idempotent() {
        let mut ctx = context("");
        assert!(ctx.mark_processed("id"));
        assert!(!ctx.mark_processed("id"));
        assert!(ctx.is_processed("id"));
        assert!(!ctx.is_processed("age"));
    }

    #[test]
    fn raw_value_treats_null_as_absent() {
        let input: HashMap<String, Value> =
            [("id".to_string(), Value::Null)].into_iter().collect();
        let ctx = Context::new(
            String::new(),
            empty_rules("test"),
            Arc::new(input),
            None,
            Arc::new(StaticCatalog::with_defaults()),
        );
        assert!(ctx.raw_value("id").is_none());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: String,
        age: i64,
    }

    #[test]
    fn build_result_constructs_typed_instance() {
        let mut ctx = context("");
        ctx.set_converted("id", json!("12345678"));
        ctx.set_converted("age", json!(41));
        let user: User = ctx.build_result().unwrap();
        assert_eq!(
            user,
            User {
                id: "12345678".into(),
                age: 41
            }
        );
    }

    #[test]
    fn build_result_refuses_invalid_context() {
        let mut ctx = context("");
        ctx.set_converted("id", json!("12345678"));
        ctx.set_converted("age", json!(41));
        ctx.add_failure("id", "check.length", vec![]);
        let err = ctx.build_result::<User>().unwrap_err();
        assert!(matches!(err, BuildError::ContextInvalid { failures: 1 }));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct DirtyUser {
        id: Option<String>,
        age: Option<i64>,
    }

    #[test]
    fn dirty_build_tolerates_missing_properties() {
        let mut ctx = context("");
        ctx.set_converted("age", json!(41));
        ctx.add_failure("id", "convert.text", vec![]);
        let user: DirtyUser = ctx.build_dirty_result().unwrap();
        assert_eq!(user.id, None);
        assert_eq!(user.age, Some(41));
    }

    #[test]
    fn dirty_build_still_fails_on_broken_target() {
        let mut ctx = context("");
        ctx.add_failure("id", "convert.text", vec![]);
        // User requires both fields; the dirty map has neither.
        let err = ctx.build_dirty_result::<User>().unwrap_err();
        assert!(matches!(err, BuildError::Construction { .. }));
    }
}
