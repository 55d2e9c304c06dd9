//! Tag Attribute Parsing
//!
//! Parses the attribute list of a start tag. Strict: every attribute needs a
//! quoted value, and values may not contain `<` or a bare `&`.

use super::entities::decode_text;
use memchr::memchr;
use std::borrow::Cow;

/// A parsed attribute, borrowed from the tag bytes where possible
#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: &'a [u8],
    /// Attribute value (entities decoded)
    pub value: Cow<'a, [u8]>,
    /// Local name (after colon, if namespaced)
    pub local_name: &'a [u8],
    /// Namespace prefix (before colon), if any
    pub prefix: Option<&'a [u8]>,
}

impl<'a> Attribute<'a> {
    pub fn new(name: &'a [u8], value: Cow<'a, [u8]>) -> Self {
        let (prefix, local_name) = split_name(name);
        Attribute {
            name,
            value,
            local_name,
            prefix,
        }
    }

    /// Namespace declarations (`xmlns`, `xmlns:p`) are not element attributes
    pub fn is_namespace_declaration(&self) -> bool {
        self.name == b"xmlns" || self.prefix == Some(b"xmlns")
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }

    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(self.value.as_ref()).ok()
    }

    pub fn local_name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.local_name).ok()
    }
}

/// Split a name into prefix and local name at the colon
#[inline]
pub fn split_name(name: &[u8]) -> (Option<&[u8]>, &[u8]) {
    if let Some(colon_pos) = memchr(b':', name) {
        (Some(&name[..colon_pos]), &name[colon_pos + 1..])
    } else {
        (None, name)
    }
}

/// Parse attributes from raw tag content (between the element name and
/// `>` or `/>`)
///
/// Returns the byte offset within `input` and a diagnostic on failure.
pub fn parse_attributes(input: &[u8]) -> Result<Vec<Attribute<'_>>, (usize, &'static str)> {
    let mut attrs: Vec<Attribute<'_>> = Vec::new();
    let mut pos = 0;

    loop {
        let before_ws = pos;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() {
            break;
        }

        // Attributes must be separated by whitespace
        if pos == before_ws && !attrs.is_empty() {
            return Err((pos, "not well-formed (invalid token)"));
        }

        if !is_name_start_char(input[pos]) {
            return Err((pos, "not well-formed (invalid token)"));
        }

        let name_start = pos;
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() || input[pos] != b'=' {
            return Err((pos, "not well-formed (invalid token)"));
        }
        pos += 1;

        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() {
            return Err((pos, "not well-formed (invalid token)"));
        }

        let quote = input[pos];
        if quote != b'"' && quote != b'\'' {
            return Err((pos, "not well-formed (invalid token)"));
        }
        pos += 1;
        let value_start = pos;

        let Some(len) = memchr(quote, &input[value_start..]) else {
            return Err((value_start, "unclosed token"));
        };
        let raw = &input[value_start..value_start + len];
        if let Some(lt) = memchr(b'<', raw) {
            return Err((value_start + lt, "not well-formed (invalid token)"));
        }
        if let Some(amp) = find_bare_ampersand(raw) {
            return Err((value_start + amp, "not well-formed (invalid token)"));
        }
        let value = decode_text(raw).map_err(|msg| (value_start, msg))?;

        if attrs.iter().any(|a| a.name == name) {
            return Err((name_start, "duplicate attribute"));
        }
        attrs.push(Attribute::new(name, value));
        pos = value_start + len + 1;
    }

    Ok(attrs)
}

/// Position of an `&` that does not start a reference, if any
fn find_bare_ampersand(value: &[u8]) -> Option<usize> {
    let mut pos = 0;
    while let Some(offset) = memchr(b'&', &value[pos..]) {
        let amp = pos + offset;
        let rest = &value[amp + 1..];
        let Some(semi) = memchr(b';', rest) else {
            return Some(amp);
        };
        let body = &rest[..semi];
        let valid = match body.first() {
            Some(b'#') => body.len() > 1,
            Some(&b) => is_name_start_char(b) && body.iter().all(|&c| is_name_char(c)),
            None => false,
        };
        if !valid {
            return Some(amp);
        }
        pos = amp + 1 + semi + 1;
    }
    None
}

/// Check if byte is a valid XML NameStartChar (ASCII only, non-ASCII handled elsewhere)
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

/// Check if byte is whitespace
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Check if byte is valid in XML name
#[inline]
pub fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}
