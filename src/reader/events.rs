//! Token Types
//!
//! Structural tokens emitted by the tokenizer, in document order.

use crate::tree::Attributes;

/// Structural markup token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Opening tag: `<name attrs...>` or the first half of `<name/>`
    StartElement { name: String, attributes: Attributes },
    /// Closing tag: `</name>` or the second half of `<name/>`
    EndElement { name: String },
    /// Character data that is not only whitespace
    Text(String),
    /// End of document; the content hash is final from here on
    EndDocument,
}

impl Token {
    pub fn is_start_element(&self) -> bool {
        matches!(self, Token::StartElement { .. })
    }

    pub fn is_end_element(&self) -> bool {
        matches!(self, Token::EndElement { .. })
    }

    /// Element name for start and end tokens
    pub fn name(&self) -> Option<&str> {
        match self {
            Token::StartElement { name, .. } | Token::EndElement { name } => Some(name),
            Token::Text(_) | Token::EndDocument => None,
        }
    }
}
