//! Layout Node
//!
//! Immutable representation of one markup element and its subtree.

use super::attributes::Attributes;
use serde::{Deserialize, Serialize};

/// One element of a parsed layout document
///
/// Serializes to the `{ "type", "attributes", "children" }` JSON shape, with
/// empty attribute maps and child lists left out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Element type name, namespace prefix stripped
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    attributes: Attributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Node>,
}

impl Node {
    /// Create a leaf node
    pub fn new(kind: impl Into<String>, attributes: Attributes) -> Self {
        Node {
            kind: kind.into(),
            attributes,
            children: Vec::new(),
        }
    }

    /// Create a node with children
    pub fn with_children(kind: impl Into<String>, attributes: Attributes, children: Vec<Node>) -> Self {
        Node {
            kind: kind.into(),
            attributes,
            children,
        }
    }

    /// Element type name
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Number of nodes in this subtree, including this one
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }

    /// Depth of this subtree (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Node::depth).max().unwrap_or(0)
    }

    /// Append a child during tree construction
    pub(crate) fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Node {
        Node::new("Text", [("value", value)].into_iter().collect())
    }

    #[test]
    fn test_deep_equality() {
        let a = Node::with_children("Row", Attributes::new(), vec![text("hi")]);
        let b = Node::with_children("Row", Attributes::new(), vec![text("hi")]);
        let c = Node::with_children("Row", Attributes::new(), vec![text("ho")]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_subtree_metrics() {
        let inner = Node::with_children("Column", Attributes::new(), vec![text("a"), text("b")]);
        let root = Node::with_children("Row", Attributes::new(), vec![inner, text("c")]);
        assert_eq!(root.subtree_len(), 5);
        assert_eq!(root.depth(), 3);
    }

    #[test]
    fn test_json_shape_omits_empty() {
        let node = Node::new("View", Attributes::new());
        assert_eq!(serde_json::to_string(&node).unwrap(), r#"{"type":"View"}"#);
    }
}
