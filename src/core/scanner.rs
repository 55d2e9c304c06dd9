//! Delimiter scanning inside a buffered markup window
//!
//! Tag ends, comment terminators and declaration ends are located with
//! memchr/memmem, which use SIMD where the target has it.
//!
//! The scanner works over whatever part of the source is currently buffered;
//! a `None` from a `find_*` method means "not in this buffer yet".

use super::attributes::{is_name_char, is_name_start_char};
use memchr::{memchr, memchr3, memmem};

/// Scanner for markup delimiter detection
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given input
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    /// Get the current position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get remaining bytes
    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Advance by n bytes
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Find the '>' closing the current tag, skipping any inside quotes
    pub fn find_tag_end_quoted(&self) -> Option<usize> {
        let mut pos = self.pos;
        let mut quote: Option<u8> = None;

        loop {
            let rest = &self.input[pos..];
            match quote {
                Some(q) => {
                    let offset = memchr(q, rest)?;
                    pos += offset + 1;
                    quote = None;
                }
                None => {
                    let offset = memchr3(b'>', b'"', b'\'', rest)?;
                    let b = rest[offset];
                    if b == b'>' {
                        return Some(pos + offset);
                    }
                    quote = Some(b);
                    pos += offset + 1;
                }
            }
        }
    }

    /// Find the start of `needle` at or after the current position
    #[inline]
    pub fn find_seq(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(&self.input[self.pos..], needle).map(|i| self.pos + i)
    }

    /// Find the '>' closing a `<!DOCTYPE ...>` declaration, stepping over an
    /// internal subset in brackets and quoted literals
    pub fn find_declaration_end(&self) -> Option<usize> {
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;

        for (i, &b) in self.input[self.pos..].iter().enumerate() {
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"') | (None, b'\'') => quote = Some(b),
                (None, b'[') => depth += 1,
                (None, b']') => depth = depth.saturating_sub(1),
                (None, b'>') if depth == 0 => return Some(self.pos + i),
                _ => {}
            }
        }
        None
    }

    /// Read a markup name, or `None` if the current byte cannot start one
    pub fn read_name(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        let first = *self.input.get(start)?;
        if !is_name_start_char(first) {
            return None;
        }

        self.pos += 1;
        while self.pos < self.input.len() && is_name_char(self.input[self.pos]) {
            self.pos += 1;
        }

        Some(&self.input[start..self.pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tag_end_quoted() {
        let scanner = Scanner::new(b"<a attr=\">test\">content");
        assert_eq!(scanner.find_tag_end_quoted(), Some(15));
        let scanner = Scanner::new(b"<a attr='>");
        assert_eq!(scanner.find_tag_end_quoted(), None);
    }

    #[test]
    fn test_find_declaration_end() {
        let scanner = Scanner::new(b"<!DOCTYPE a [<!ENTITY x \">\">]><a/>");
        assert_eq!(scanner.find_declaration_end(), Some(29));
    }

    #[test]
    fn test_read_name() {
        let mut scanner = Scanner::new(b"android.widget.TextView>");
        assert_eq!(scanner.read_name(), Some(b"android.widget.TextView" as &[u8]));
        assert_eq!(scanner.position(), 23);
        let mut scanner = Scanner::new(b"1abc");
        assert_eq!(scanner.read_name(), None);
    }

    #[test]
    fn test_find_seq() {
        let mut scanner = Scanner::new(b"<!-- note -->rest");
        scanner.advance(4);
        assert_eq!(scanner.find_seq(b"-->"), Some(10));
    }
}
