//! Attribute Engine
//!
//! Registry of named appliers, and the ordered application of a node's
//! attributes to a constructed element. Attributes are applied in four
//! passes, each in document order:
//! 1. `id`
//! 2. every attribute that is not a layout constraint
//! 3. layout constraints (`layout_constraint*`) other than bias/weight
//! 4. constraint bias and weight (`..._bias`, `..._weight`), which only mean
//!    something once the constraint itself is in place
//!
//! A `None` value is present-but-null: skipped and counted, never an error.
//! Failures are logged and collected in the [`ApplyReport`]; in fail-fast
//! mode the first one is returned instead.

pub mod value;

pub use value::{Color, Dimension, Reference, Unit, Value, ValueKind, MATCH_PARENT, WRAP_CONTENT};

use crate::element::{BuildContext, Element};
use crate::error::{AttributeError, BoxError, PropertyError};
use crate::log::LogSink;
use crate::render::NodePath;
use crate::tree::Attributes;
use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Applier signature: element, attribute name, converted value, context
pub type ApplyFn =
    dyn Fn(&mut dyn Element, &str, Value, &mut ApplyContext<'_>) -> Result<(), AttributeError> + Send + Sync;

/// Application pass an attribute belongs to, in application order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pass {
    Identifier,
    Plain,
    Constraint,
    ConstraintBias,
}

impl Pass {
    pub const ORDER: [Pass; 4] = [Pass::Identifier, Pass::Plain, Pass::Constraint, Pass::ConstraintBias];

    /// Pass for an attribute name
    pub fn of(name: &str) -> Pass {
        if name == "id" {
            Pass::Identifier
        } else if name.starts_with("layout_constraint") {
            if name.ends_with("_bias") || name.ends_with("_weight") {
                Pass::ConstraintBias
            } else {
                Pass::Constraint
            }
        } else {
            Pass::Plain
        }
    }
}

/// Background result for one deferred property, applied on the UI thread
#[derive(Debug)]
pub struct DeferredUpdate {
    pub path: NodePath,
    pub property: String,
    pub outcome: Result<Value, String>,
}

/// Per-element state handed to appliers
pub struct ApplyContext<'a> {
    build: &'a BuildContext,
    path: &'a NodePath,
    deferred: &'a Sender<DeferredUpdate>,
    log: &'a dyn LogSink,
    spawned: usize,
}

impl<'a> ApplyContext<'a> {
    pub fn new(
        build: &'a BuildContext,
        path: &'a NodePath,
        deferred: &'a Sender<DeferredUpdate>,
        log: &'a dyn LogSink,
    ) -> Self {
        ApplyContext {
            build,
            path,
            deferred,
            log,
            spawned: 0,
        }
    }

    pub fn build(&self) -> &BuildContext {
        self.build
    }

    /// Path of the element being configured
    pub fn path(&self) -> &NodePath {
        self.path
    }

    pub fn log(&self) -> &dyn LogSink {
        self.log
    }

    /// Run `work` on the worker pool; its value is written to `property` of
    /// this element when the render output is pumped on the UI thread
    pub fn defer<F>(&mut self, property: impl Into<String>, work: F)
    where
        F: FnOnce() -> Result<Value, BoxError> + Send + 'static,
    {
        let sender = self.deferred.clone();
        let path = self.path.clone();
        let property = property.into();
        self.spawned += 1;
        rayon::spawn(move || {
            let outcome = work().map_err(|e| e.to_string());
            // Receiver gone means the render output was dropped
            let _ = sender.send(DeferredUpdate {
                path,
                property,
                outcome,
            });
        });
    }

    /// Deferred tasks started through this context
    pub fn deferred_count(&self) -> usize {
        self.spawned
    }
}

/// Outcome of applying one node's attributes
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Applied attribute names, in application order
    pub applied: Vec<String>,
    /// Present-but-null attributes skipped
    pub skipped_null: usize,
    pub errors: Vec<AttributeError>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Clone)]
struct Applier {
    kind: ValueKind,
    apply: Arc<ApplyFn>,
}

/// Named applier registry
pub struct AttributeEngine {
    appliers: HashMap<String, Applier>,
    fail_fast: bool,
}

impl AttributeEngine {
    pub fn new() -> Self {
        AttributeEngine {
            appliers: HashMap::new(),
            fail_fast: false,
        }
    }

    /// Stop at a node's first failing attribute and return it
    pub fn set_fail_fast(&mut self, fail_fast: bool) {
        self.fail_fast = fail_fast;
    }

    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Register `apply` for `name`; raw values are converted to `kind` first
    pub fn register<F>(&mut self, name: impl Into<String>, kind: ValueKind, apply: F)
    where
        F: Fn(&mut dyn Element, &str, Value, &mut ApplyContext<'_>) -> Result<(), AttributeError>
            + Send
            + Sync
            + 'static,
    {
        self.appliers.insert(
            name.into(),
            Applier {
                kind,
                apply: Arc::new(apply),
            },
        );
    }

    /// Register an applier that writes the converted value to the element
    /// property of the same name
    pub fn register_property(&mut self, name: impl Into<String>, kind: ValueKind) {
        self.register(name, kind, move |element, name, value, _| set_property(element, name, value, kind));
    }

    pub fn has_applier(&self, name: &str) -> bool {
        self.appliers.contains_key(name)
    }

    /// Kind an attribute converts to, if registered
    pub fn kind_of(&self, name: &str) -> Option<ValueKind> {
        self.appliers.get(name).map(|a| a.kind)
    }

    pub fn len(&self) -> usize {
        self.appliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appliers.is_empty()
    }

    /// Registered attribute names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.appliers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Apply `attributes` to `element` in pass order
    pub fn apply(
        &self,
        element: &mut dyn Element,
        attributes: &[(&str, Option<&str>)],
        ctx: &mut ApplyContext<'_>,
    ) -> Result<ApplyReport, AttributeError> {
        let mut report = ApplyReport::default();

        for pass in Pass::ORDER {
            for &(name, value) in attributes.iter().filter(|(name, _)| Pass::of(name) == pass) {
                let Some(raw) = value else {
                    report.skipped_null += 1;
                    continue;
                };

                match self.apply_one(element, name, raw, ctx) {
                    Ok(()) => report.applied.push(name.to_string()),
                    Err(err) => {
                        ctx.log().warn(
                            &format!("{} at {}: attribute {} not applied", element.type_name(), ctx.path(), name),
                            Some(&err),
                        );
                        if self.fail_fast {
                            return Err(err);
                        }
                        report.errors.push(err);
                    }
                }
            }
        }

        Ok(report)
    }

    /// Apply a node's attribute map, nulls included
    pub fn apply_attributes(
        &self,
        element: &mut dyn Element,
        attributes: &Attributes,
        ctx: &mut ApplyContext<'_>,
    ) -> Result<ApplyReport, AttributeError> {
        let entries: Vec<(&str, Option<&str>)> = attributes.entries().collect();
        self.apply(element, &entries, ctx)
    }

    fn apply_one(
        &self,
        element: &mut dyn Element,
        name: &str,
        raw: &str,
        ctx: &mut ApplyContext<'_>,
    ) -> Result<(), AttributeError> {
        let applier = self
            .appliers
            .get(name)
            .ok_or_else(|| AttributeError::UnknownAttribute(name.to_string()))?;

        let value = Value::parse(applier.kind, raw, ctx.build()).ok_or_else(|| AttributeError::TypeMismatch {
            name: name.to_string(),
            expected: applier.kind,
            found: raw.to_string(),
        })?;

        (applier.apply)(element, name, value, ctx)
    }
}

impl Default for AttributeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AttributeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeEngine")
            .field("appliers", &self.appliers.len())
            .field("fail_fast", &self.fail_fast)
            .finish()
    }
}

/// Write a property, mapping element refusals to attribute errors
pub fn set_property(element: &mut dyn Element, name: &str, value: Value, kind: ValueKind) -> Result<(), AttributeError> {
    element.set_property(name, value).map_err(|e| match e {
        PropertyError::Unsupported { element, name } => AttributeError::NotApplicable { name, element },
        PropertyError::Rejected { name, reason, .. } => AttributeError::TypeMismatch {
            name,
            expected: kind,
            found: reason,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Widget;
    use crate::log::{MemorySink, NoopSink};
    use parking_lot::Mutex;

    struct Harness {
        build: BuildContext,
        path: NodePath,
        sender: Sender<DeferredUpdate>,
        receiver: crossbeam_channel::Receiver<DeferredUpdate>,
    }

    impl Harness {
        fn new() -> Self {
            let (sender, receiver) = crossbeam_channel::unbounded();
            Harness {
                build: BuildContext::default(),
                path: NodePath::root(),
                sender,
                receiver,
            }
        }

        fn ctx<'a>(&'a self, log: &'a dyn LogSink) -> ApplyContext<'a> {
            ApplyContext::new(&self.build, &self.path, &self.sender, log)
        }
    }

    /// Engine whose appliers record the order they ran in
    fn recording_engine(names: &[&str]) -> (AttributeEngine, Arc<Mutex<Vec<String>>>) {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut engine = AttributeEngine::new();
        for &name in names {
            let order = Arc::clone(&order);
            engine.register(name, ValueKind::String, move |_, name, _, _| {
                order.lock().push(name.to_string());
                Ok(())
            });
        }
        (engine, order)
    }

    #[test]
    fn test_pass_classification() {
        assert_eq!(Pass::of("id"), Pass::Identifier);
        assert_eq!(Pass::of("text"), Pass::Plain);
        assert_eq!(Pass::of("layout_weight"), Pass::Plain);
        assert_eq!(Pass::of("layout_constraintTop_toTopOf"), Pass::Constraint);
        assert_eq!(Pass::of("layout_constraintHorizontal_bias"), Pass::ConstraintBias);
        assert_eq!(Pass::of("layout_constraintVertical_weight"), Pass::ConstraintBias);
    }

    #[test]
    fn test_constraint_applied_before_bias() {
        let names = [
            "layout_constraintHorizontal_bias",
            "layout_constraintStart_toStartOf",
            "text",
            "id",
        ];
        let (engine, order) = recording_engine(&names);
        let harness = Harness::new();
        let mut ctx = harness.ctx(&NoopSink);
        let mut element = Widget::leaf("View");
        let attrs: Vec<_> = names.iter().map(|&n| (n, Some("x"))).collect();

        let report = engine.apply(&mut element, &attrs, &mut ctx).unwrap();
        assert_eq!(
            *order.lock(),
            ["id", "text", "layout_constraintStart_toStartOf", "layout_constraintHorizontal_bias"]
        );
        assert_eq!(report.applied, *order.lock());
    }

    #[test]
    fn test_null_values_skipped() {
        let (engine, order) = recording_engine(&["text"]);
        let harness = Harness::new();
        let mut ctx = harness.ctx(&NoopSink);
        let mut element = Widget::leaf("View");

        let report = engine
            .apply(&mut element, &[("text", None), ("unregistered", None)], &mut ctx)
            .unwrap();
        assert_eq!(report.skipped_null, 2);
        assert!(report.is_clean());
        assert!(order.lock().is_empty());
    }

    #[test]
    fn test_best_effort_collects_errors() {
        let mut engine = AttributeEngine::new();
        engine.register_property("alpha", ValueKind::Float);
        engine.register_property("text", ValueKind::String);
        let harness = Harness::new();
        let sink = MemorySink::new();
        let mut ctx = harness.ctx(&sink);
        let mut element = Widget::leaf("View");

        let report = engine
            .apply(
                &mut element,
                &[("tetx", Some("typo")), ("alpha", Some("opaque")), ("text", Some("hi"))],
                &mut ctx,
            )
            .unwrap();

        assert_eq!(report.applied, ["text"]);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0], AttributeError::UnknownAttribute("tetx".into()));
        assert!(matches!(
            &report.errors[1],
            AttributeError::TypeMismatch { name, expected: ValueKind::Float, found } if name == "alpha" && found == "opaque"
        ));
        assert_eq!(sink.records().len(), 2);
        assert_eq!(element.property("text"), Some(&Value::String("hi".into())));
    }

    #[test]
    fn test_fail_fast_stops_node() {
        let mut engine = AttributeEngine::new();
        engine.register_property("text", ValueKind::String);
        engine.set_fail_fast(true);
        let harness = Harness::new();
        let mut ctx = harness.ctx(&NoopSink);
        let mut element = Widget::leaf("View");

        let err = engine
            .apply(&mut element, &[("bogus", Some("1")), ("text", Some("hi"))], &mut ctx)
            .unwrap_err();
        assert_eq!(err, AttributeError::UnknownAttribute("bogus".into()));
        assert!(element.property("text").is_none());
    }

    #[test]
    fn test_applier_may_reject_value() {
        let mut engine = AttributeEngine::new();
        engine.register("orientation", ValueKind::Enum, |element, name, value, _| match value.as_str() {
            Some("vertical") | Some("horizontal") => set_property(element, name, value, ValueKind::Enum),
            _ => Err(AttributeError::TypeMismatch {
                name: name.to_string(),
                expected: ValueKind::Enum,
                found: value.to_string(),
            }),
        });
        let harness = Harness::new();
        let mut ctx = harness.ctx(&NoopSink);
        let mut element = Widget::leaf("LinearLayout");
        let report = engine
            .apply(&mut element, &[("orientation", Some("diagonal"))], &mut ctx)
            .unwrap();
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_defer_delivers_over_channel() {
        let mut engine = AttributeEngine::new();
        engine.register("src", ValueKind::String, |_, _, value, ctx| {
            let payload = value.to_string();
            ctx.defer("src", move || Ok(Value::Bytes(Arc::from(payload.as_bytes()))));
            Ok(())
        });
        let harness = Harness::new();
        let mut ctx = harness.ctx(&NoopSink);
        let mut element = Widget::leaf("ImageView");
        engine.apply(&mut element, &[("src", Some("abc"))], &mut ctx).unwrap();
        assert_eq!(ctx.deferred_count(), 1);

        let update = harness
            .receiver
            .recv_timeout(std::time::Duration::from_secs(5))
            .unwrap();
        assert_eq!(update.property, "src");
        assert_eq!(update.outcome.unwrap(), Value::Bytes(Arc::from(&b"abc"[..])));
    }
}
