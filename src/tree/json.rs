//! JSON and XML Forms of a Node Tree
//!
//! The JSON form is one object per element:
//!
//! ```json
//! {
//!     "type": "Row",
//!     "attributes": { "id": "r1" },
//!     "children": [ { "type": "Text", "attributes": { "value": "hi" } } ]
//! }
//! ```
//!
//! `attributes` and `children` are omitted when empty. A `null` attribute
//! value is kept as present-but-null; the XML form drops it.

use super::node::Node;
use crate::core::entities::encode_attribute;
use crate::error::ParseError;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fmt::Write;

/// Read a tree from its JSON form
pub fn parse_json(input: &[u8]) -> Result<Node, ParseError> {
    serde_json::from_slice(input).map_err(|e| ParseError::InvalidJson(e.to_string()))
}

/// Pretty JSON with a four-space indent
pub fn to_json(node: &Node) -> serde_json::Result<String> {
    let mut out = Vec::with_capacity(node.subtree_len() * 64);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    node.serialize(&mut serializer)?;
    // serde_json only writes valid UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Compact single-line JSON
pub fn to_json_compact(node: &Node) -> serde_json::Result<String> {
    serde_json::to_string(node)
}

/// Serialize a tree back to markup, one element per line
pub fn to_xml(node: &Node) -> String {
    let mut out = String::with_capacity(node.subtree_len() * 48);
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    write_element(&mut out, node, 0);
    out
}

fn write_element(out: &mut String, node: &Node, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
    out.push('<');
    out.push_str(node.kind());
    for (name, value) in node.attributes() {
        // infallible for String
        let _ = write!(out, " {}=\"{}\"", name, encode_attribute(value));
    }

    if node.children().is_empty() {
        out.push_str("/>\n");
        return;
    }

    out.push_str(">\n");
    for child in node.children() {
        write_element(out, child, depth + 1);
    }
    for _ in 0..depth {
        out.push_str("    ");
    }
    out.push_str("</");
    out.push_str(node.kind());
    out.push_str(">\n");
}
