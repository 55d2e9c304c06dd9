//! Renderer
//!
//! Walks a node tree depth-first and builds the live element tree: for each
//! node the factory constructs an element, the attribute engine configures
//! it, then its children are rendered and handed to it in document order.
//!
//! Factory and containment failures abort the enclosing subtree and surface
//! with the failing node's [`NodePath`]. Attribute failures are collected per
//! node unless the engine is fail-fast.

use crate::attrs::{set_property, ApplyContext, AttributeEngine, DeferredUpdate};
use crate::cancel::{CancellationToken, CancellationTokenExt};
use crate::element::{descendant_mut, BuildContext, Element};
use crate::error::{AttributeError, RenderError};
use crate::factory::ElementFactory;
use crate::log::LogSink;
use crate::tree::Node;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::time::{Duration, Instant};

/// Child indices from the root to a node; empty for the root itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        NodePath(indices)
    }

    pub fn push(&mut self, index: usize) {
        self.0.push(index);
    }

    pub fn pop(&mut self) -> Option<usize> {
        self.0.pop()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        NodePath(indices)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

/// Attribute failure recorded during a best-effort render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeIssue {
    pub path: NodePath,
    pub error: AttributeError,
}

impl fmt::Display for AttributeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}

/// A rendered element tree plus its outstanding background work
pub struct RenderOutput {
    root: Box<dyn Element>,
    issues: Vec<AttributeIssue>,
    deferred: Receiver<DeferredUpdate>,
    pending: usize,
    skipped_null: usize,
}

impl RenderOutput {
    pub fn root(&self) -> &dyn Element {
        self.root.as_ref()
    }

    pub fn root_mut(&mut self) -> &mut dyn Element {
        self.root.as_mut()
    }

    /// Take the tree; undelivered deferred values are dropped
    pub fn into_root(self) -> Box<dyn Element> {
        self.root
    }

    pub fn issues(&self) -> &[AttributeIssue] {
        &self.issues
    }

    /// Present-but-null attributes skipped across the tree
    pub fn skipped_null(&self) -> usize {
        self.skipped_null
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Deferred values not yet delivered
    pub fn pending_deferred(&self) -> usize {
        self.pending
    }

    /// Apply every deferred value that has arrived, without blocking.
    /// Call on the UI thread. Returns how many were delivered.
    pub fn pump_deferred(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(update) = self.deferred.try_recv() {
            self.deliver(update);
            delivered += 1;
        }
        delivered
    }

    /// Block until every deferred value is delivered or `timeout` passes
    pub fn wait_deferred(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut delivered = 0;
        while self.pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.deferred.recv_timeout(remaining) {
                Ok(update) => {
                    self.deliver(update);
                    delivered += 1;
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        delivered
    }

    fn deliver(&mut self, update: DeferredUpdate) {
        self.pending = self.pending.saturating_sub(1);
        let DeferredUpdate { path, property, outcome } = update;

        let error = match (outcome, descendant_mut(self.root.as_mut(), path.indices())) {
            (Err(reason), _) => Some(AttributeError::DeferredFailed { name: property, reason }),
            (Ok(_), None) => Some(AttributeError::DeferredFailed {
                name: property,
                reason: format!("no element at {}", path),
            }),
            (Ok(value), Some(element)) => {
                let kind = value.kind();
                set_property(element, &property, value, kind).err()
            }
        };

        if let Some(error) = error {
            self.issues.push(AttributeIssue { path, error });
        }
    }
}

impl fmt::Debug for RenderOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOutput")
            .field("root", &self.root)
            .field("issues", &self.issues)
            .field("pending", &self.pending)
            .finish()
    }
}

struct RenderState<'a> {
    build: &'a BuildContext,
    cancel: Option<&'a CancellationToken>,
    sender: Sender<DeferredUpdate>,
    issues: Vec<AttributeIssue>,
    pending: usize,
    skipped_null: usize,
}

/// Node tree to element tree
pub struct Renderer<'a> {
    factory: &'a ElementFactory,
    engine: &'a AttributeEngine,
    log: &'a dyn LogSink,
}

impl<'a> Renderer<'a> {
    pub fn new(factory: &'a ElementFactory, engine: &'a AttributeEngine, log: &'a dyn LogSink) -> Self {
        Renderer { factory, engine, log }
    }

    /// Build the element tree for `node`
    pub fn render(
        &self,
        node: &Node,
        build: &BuildContext,
        cancel: Option<&CancellationToken>,
    ) -> Result<RenderOutput, RenderError> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut state = RenderState {
            build,
            cancel,
            sender,
            issues: Vec::new(),
            pending: 0,
            skipped_null: 0,
        };

        let mut path = NodePath::root();
        let root = self.render_node(node, &mut path, &mut state)?;

        self.log.debug(&format!(
            "rendered {} ({} nodes, {} attribute issues, {} deferred)",
            node.kind(),
            node.subtree_len(),
            state.issues.len(),
            state.pending
        ));

        Ok(RenderOutput {
            root,
            issues: state.issues,
            deferred: receiver,
            pending: state.pending,
            skipped_null: state.skipped_null,
        })
    }

    fn render_node(
        &self,
        node: &Node,
        path: &mut NodePath,
        state: &mut RenderState<'_>,
    ) -> Result<Box<dyn Element>, RenderError> {
        if let Some(cancel) = state.cancel {
            cancel.check_render()?;
        }

        let mut element = self
            .factory
            .create(node.kind(), state.build, node.attributes())
            .map_err(|source| {
                self.log
                    .error(&format!("cannot construct {} at {}", node.kind(), path), Some(&source));
                RenderError::Factory {
                    path: path.clone(),
                    source,
                }
            })?;

        let mut ctx = ApplyContext::new(state.build, path, &state.sender, self.log);
        let report = self
            .engine
            .apply_attributes(element.as_mut(), node.attributes(), &mut ctx)
            .map_err(|source| RenderError::Attribute {
                path: path.clone(),
                source,
            })?;
        let deferred = ctx.deferred_count();
        state.pending += deferred;
        state.skipped_null += report.skipped_null;
        state
            .issues
            .extend(report.errors.into_iter().map(|error| AttributeIssue {
                path: path.clone(),
                error,
            }));

        if node.children().is_empty() {
            return Ok(element);
        }
        if !element.is_container() {
            self.log.warn(
                &format!(
                    "{} at {} is not a container; {} children skipped",
                    node.kind(),
                    path,
                    node.children().len()
                ),
                None,
            );
            return Ok(element);
        }

        for (index, child) in node.children().iter().enumerate() {
            path.push(index);
            let adopted = self.render_node(child, path, state).and_then(|rendered| {
                element
                    .append_child(rendered)
                    .map_err(|source| RenderError::Containment {
                        path: path.clone(),
                        source,
                    })
            });
            path.pop();
            adopted?;
        }

        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::{Value, ValueKind};
    use crate::error::FactoryError;
    use crate::factory::TypeCatalog;
    use crate::host::{self, Widget};
    use crate::log::{MemorySink, NoopSink};
    use crate::tree::Attributes;
    use std::sync::Arc;

    fn node(kind: &str, attrs: &[(&str, &str)], children: Vec<Node>) -> Node {
        let attributes: Attributes = attrs.iter().map(|&(k, v)| (k, v)).collect();
        Node::with_children(kind, attributes, children)
    }

    fn setup() -> (ElementFactory, AttributeEngine) {
        (host::standard_factory(), host::standard_engine())
    }

    #[test]
    fn test_node_path_display() {
        assert_eq!(NodePath::root().to_string(), "/");
        assert_eq!(NodePath::root().child(0).child(2).to_string(), "/0/2");
    }

    #[test]
    fn test_renders_tree_in_order() {
        let (factory, engine) = setup();
        let tree = node(
            "LinearLayout",
            &[("orientation", "vertical")],
            vec![
                node("TextView", &[("text", "first")], vec![]),
                node("Button", &[("text", "second")], vec![]),
            ],
        );

        let output = Renderer::new(&factory, &engine, &NoopSink)
            .render(&tree, &BuildContext::default(), None)
            .unwrap();
        let root = output.root();
        assert_eq!(root.type_name(), "LinearLayout");
        assert_eq!(root.child_count(), 2);
        assert_eq!(root.child(0).unwrap().property("text"), Some(&Value::String("first".into())));
        assert_eq!(root.child(1).unwrap().type_name(), "Button");
        assert!(!output.has_issues());
    }

    #[test]
    fn test_factory_error_carries_path() {
        let (factory, engine) = setup();
        let tree = node(
            "FrameLayout",
            &[],
            vec![node("FrameLayout", &[], vec![node("View", &[], vec![]), node("Nonexistent", &[], vec![])])],
        );
        let sink = MemorySink::new();
        let err = Renderer::new(&factory, &engine, &sink)
            .render(&tree, &BuildContext::default(), None)
            .unwrap_err();
        match err {
            RenderError::Factory { path, source } => {
                assert_eq!(path.indices(), [0, 1]);
                assert!(matches!(source, FactoryError::TypeNotFound(ref n) if n == "Nonexistent"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn test_attribute_issues_are_collected() {
        let (factory, engine) = setup();
        let tree = node(
            "FrameLayout",
            &[("bogus", "1")],
            vec![node("TextView", &[("textColor", "blue-ish"), ("text", "ok")], vec![])],
        );
        let output = Renderer::new(&factory, &engine, &NoopSink)
            .render(&tree, &BuildContext::default(), None)
            .unwrap();

        let issues = output.issues();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].path.is_root());
        assert_eq!(issues[0].error, AttributeError::UnknownAttribute("bogus".into()));
        assert_eq!(issues[1].path.indices(), [0]);
        assert_eq!(issues[1].error.attribute(), "textColor");
        assert_eq!(
            output.root().child(0).unwrap().property("text"),
            Some(&Value::String("ok".into()))
        );
    }

    #[test]
    fn test_fail_fast_aborts_render() {
        let factory = host::standard_factory();
        let mut engine = host::standard_engine();
        engine.set_fail_fast(true);
        let tree = node("FrameLayout", &[], vec![node("View", &[("alpha", "half")], vec![])]);
        let err = Renderer::new(&factory, &engine, &NoopSink)
            .render(&tree, &BuildContext::default(), None)
            .unwrap_err();
        assert!(matches!(err, RenderError::Attribute { ref path, .. } if path.indices() == [0]));
    }

    #[test]
    fn test_children_of_leaf_are_skipped() {
        let (factory, engine) = setup();
        let tree = node("TextView", &[], vec![node("View", &[], vec![])]);
        let sink = MemorySink::new();
        let output = Renderer::new(&factory, &engine, &sink)
            .render(&tree, &BuildContext::default(), None)
            .unwrap();
        assert_eq!(output.root().child_count(), 0);
        assert_eq!(sink.at_least(tracing::Level::WARN).len(), 1);
    }

    #[test]
    fn test_containment_refusal() {
        let (factory, engine) = setup();
        let tree = node(
            "ScrollView",
            &[],
            vec![node("View", &[], vec![]), node("View", &[], vec![])],
        );
        let err = Renderer::new(&factory, &engine, &NoopSink)
            .render(&tree, &BuildContext::default(), None)
            .unwrap_err();
        assert!(matches!(err, RenderError::Containment { ref path, .. } if path.indices() == [1]));
    }

    #[test]
    fn test_cancelled_render() {
        let (factory, engine) = setup();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = Renderer::new(&factory, &engine, &NoopSink)
            .render(&node("View", &[], vec![]), &BuildContext::default(), Some(&cancel))
            .unwrap_err();
        assert!(matches!(err, RenderError::Cancelled));
    }

    #[test]
    fn test_deferred_values_are_delivered() {
        let factory = ElementFactory::new(Arc::new(TypeCatalog::new()));
        factory.register("Row", |_, _| Ok(Box::new(Widget::container("Row")) as Box<dyn Element>));
        factory.register("Image", |_, _| Ok(Box::new(Widget::leaf("Image")) as Box<dyn Element>));
        let mut engine = AttributeEngine::new();
        engine.register("src", ValueKind::String, |_, name, value, ctx| {
            let text = value.to_string();
            ctx.defer(name, move || Ok(Value::Bytes(Arc::from(text.into_bytes()))));
            Ok(())
        });
        engine.register("broken", ValueKind::String, |_, name, _, ctx| {
            ctx.defer(name, || Err("decoder crashed".into()));
            Ok(())
        });

        let tree = node(
            "Row",
            &[],
            vec![node("Image", &[("src", "pixels")], vec![]), node("Image", &[("broken", "x")], vec![])],
        );
        let mut output = Renderer::new(&factory, &engine, &NoopSink)
            .render(&tree, &BuildContext::default(), None)
            .unwrap();
        assert_eq!(output.pending_deferred(), 2);

        let delivered = output.wait_deferred(Duration::from_secs(10));
        assert_eq!(delivered, 2);
        assert_eq!(output.pending_deferred(), 0);
        assert_eq!(
            output.root().child(0).unwrap().property("src"),
            Some(&Value::Bytes(Arc::from(&b"pixels"[..])))
        );
        assert_eq!(output.issues().len(), 1);
        assert!(matches!(
            &output.issues()[0].error,
            AttributeError::DeferredFailed { name, reason } if name == "broken" && reason == "decoder crashed"
        ));
    }
}
