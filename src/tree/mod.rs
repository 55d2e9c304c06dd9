//! Layout Node Trees
//!
//! - Node / Attributes: the immutable parsed form of a document
//! - Builder: token stream to tree
//! - Json: JSON load and export, markup re-serialization

pub mod attributes;
pub mod builder;
pub mod json;
pub mod node;

pub use attributes::Attributes;
pub use builder::{build_tree, TreeBuilder};
pub use node::Node;

use crate::core::hash::ContentHash;
use crate::core::tokenizer::Tokenizer;
use crate::error::ParseError;
use std::io::Read;

/// Tokenize a markup source and build its tree in one pass, returning the
/// root and the content hash of every byte read
pub fn parse_markup<R: Read>(reader: R, chunk_size: usize) -> Result<(Node, ContentHash), ParseError> {
    let mut tokenizer = Tokenizer::with_chunk_size(reader, chunk_size);
    let root = build_tree(tokenizer.by_ref())?;
    let hash = tokenizer.content_hash().ok_or(ParseError::ParseFailed)?;
    Ok((root, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markup_scenario() {
        let source = br#"<Row id="r1"><Text value="hi"/></Row>"#;
        let (root, hash) = parse_markup(&source[..], 16).unwrap();
        let expected = Node::with_children(
            "Row",
            [("id", "r1")].into_iter().collect(),
            vec![Node::new("Text", [("value", "hi")].into_iter().collect())],
        );
        assert_eq!(root, expected);
        assert_eq!(hash, ContentHash::of(source));
    }

    #[test]
    fn test_parse_markup_is_idempotent() {
        let source = b"<A><B/><C><D x=\"1\"/></C></A>";
        let first = parse_markup(&source[..], 8192).unwrap();
        let second = parse_markup(&source[..], 8192).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_bytes_different_hash() {
        let (_, a) = parse_markup(&b"<A/>"[..], 8192).unwrap();
        let (_, b) = parse_markup(&b"<A />"[..], 8192).unwrap();
        assert_ne!(a, b);
    }
}
