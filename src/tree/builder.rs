//! Tree Builder
//!
//! Assembles a [`Node`] hierarchy from a token stream with a stack of
//! in-progress nodes. Text tokens are dropped: layout nodes carry no
//! character data.

use super::node::Node;
use crate::error::ParseError;
use crate::reader::events::Token;

/// Stack-based node assembler
#[derive(Debug, Default)]
pub struct TreeBuilder {
    stack: Vec<Node>,
    root: Option<Node>,
    /// Set on a second top-level element or an unmatched end tag
    unbalanced: bool,
    finished: bool,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one token. Returns the root once `EndDocument` arrives; `None`
    /// until then, and also when the document has no single complete root.
    pub fn push(&mut self, token: Token) -> Option<Node> {
        match token {
            Token::StartElement { name, attributes } => {
                self.stack.push(Node::new(name, attributes));
                None
            }
            Token::EndElement { .. } => {
                let Some(node) = self.stack.pop() else {
                    self.unbalanced = true;
                    return None;
                };
                match self.stack.last_mut() {
                    Some(parent) => parent.push_child(node),
                    None if self.root.is_none() => self.root = Some(node),
                    None => self.unbalanced = true,
                }
                None
            }
            Token::Text(_) => None,
            Token::EndDocument => self.finish(),
        }
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn finish(&mut self) -> Option<Node> {
        if self.finished {
            return None;
        }
        self.finished = true;
        if !self.stack.is_empty() || self.unbalanced {
            self.stack.clear();
            self.root = None;
            return None;
        }
        self.root.take()
    }
}

/// Build a tree from a complete token sequence
pub fn build_tree<I>(tokens: I) -> Result<Node, ParseError>
where
    I: IntoIterator<Item = Result<Token, ParseError>>,
{
    let mut builder = TreeBuilder::new();
    for token in tokens {
        let token = token?;
        let done = matches!(token, Token::EndDocument);
        if let Some(root) = builder.push(token) {
            return Ok(root);
        }
        if done {
            break;
        }
    }
    Err(ParseError::ParseFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Attributes;

    fn start(name: &str) -> Token {
        Token::StartElement {
            name: name.to_string(),
            attributes: Attributes::new(),
        }
    }

    fn end(name: &str) -> Token {
        Token::EndElement { name: name.to_string() }
    }

    fn ok(tokens: Vec<Token>) -> Vec<Result<Token, ParseError>> {
        tokens.into_iter().map(Ok).collect()
    }

    #[test]
    fn test_children_in_document_order() {
        let tokens = ok(vec![
            start("Row"),
            start("A"),
            end("A"),
            Token::Text("ignored".into()),
            start("B"),
            start("C"),
            end("C"),
            end("B"),
            end("Row"),
            Token::EndDocument,
        ]);
        let root = build_tree(tokens).unwrap();
        assert_eq!(root.kind(), "Row");
        let kinds: Vec<_> = root.children().iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, ["A", "B"]);
        assert_eq!(root.children()[1].children()[0].kind(), "C");
    }

    #[test]
    fn test_empty_stream_has_no_root() {
        let result = build_tree(ok(vec![Token::EndDocument]));
        assert!(matches!(result, Err(ParseError::ParseFailed)));
    }

    #[test]
    fn test_unclosed_element_has_no_root() {
        let result = build_tree(ok(vec![start("Row"), start("A"), end("A"), Token::EndDocument]));
        assert!(matches!(result, Err(ParseError::ParseFailed)));
    }

    #[test]
    fn test_two_roots_is_not_a_tree() {
        let tokens = ok(vec![start("A"), end("A"), start("B"), end("B"), Token::EndDocument]);
        assert!(matches!(build_tree(tokens), Err(ParseError::ParseFailed)));
    }

    #[test]
    fn test_error_token_aborts() {
        let tokens = vec![
            Ok(start("Row")),
            Err(ParseError::malformed("mismatched tag", 1, 8)),
        ];
        assert!(matches!(build_tree(tokens), Err(ParseError::MalformedMarkup { .. })));
    }
}
