//! Entity Decoding and Escaping
//!
//! Handles the five predefined XML entities and numeric character
//! references. Uses Cow for zero-copy when no entities are present.
//! Any other named entity is undefined: there is no DTD to declare it.

use memchr::memchr;
use std::borrow::Cow;

/// Decode character data or an attribute value
///
/// Returns Borrowed if no entities are present, Owned if any were decoded.
/// Fails on control characters and on character references to invalid
/// XML characters.
pub fn decode_text(input: &[u8]) -> Result<Cow<'_, [u8]>, &'static str> {
    if input.iter().any(|&b| !is_valid_xml_byte(b)) {
        return Err("not well-formed (invalid token)");
    }

    // Fast path: no entities
    if memchr(b'&', input).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode_entities(input).map(Cow::Owned)
}

fn decode_entities(input: &[u8]) -> Result<Vec<u8>, &'static str> {
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while pos < input.len() {
        let Some(amp_pos) = memchr(b'&', &input[pos..]) else {
            result.extend_from_slice(&input[pos..]);
            break;
        };

        result.extend_from_slice(&input[pos..pos + amp_pos]);
        pos += amp_pos;

        let semi_offset = memchr(b';', &input[pos..]).ok_or(INVALID_TOKEN)?;
        let decoded = decode_entity(&input[pos + 1..pos + semi_offset])?;
        let mut utf8 = [0u8; 4];
        result.extend_from_slice(decoded.encode_utf8(&mut utf8).as_bytes());
        pos += semi_offset + 1;
    }

    Ok(result)
}

const INVALID_TOKEN: &str = "not well-formed (invalid token)";

/// Decode a single entity body (without `&` and `;`)
fn decode_entity(entity: &[u8]) -> Result<char, &'static str> {
    if let Some(number) = entity.strip_prefix(b"#") {
        return decode_numeric_entity(number).ok_or("reference to invalid character number");
    }

    match entity {
        b"lt" => Ok('<'),
        b"gt" => Ok('>'),
        b"amp" => Ok('&'),
        b"quot" => Ok('"'),
        b"apos" => Ok('\''),
        _ if is_entity_name(entity) => Err("undefined entity"),
        _ => Err(INVALID_TOKEN),
    }
}

fn is_entity_name(name: &[u8]) -> bool {
    let Some((&first, rest)) = name.split_first() else {
        return false;
    };
    let starts = |b: u8| b.is_ascii_alphabetic() || matches!(b, b'_' | b':') || b >= 0x80;
    starts(first) && rest.iter().all(|&b| starts(b) || b.is_ascii_digit() || matches!(b, b'-' | b'.'))
}

/// Decode a numeric character reference body: `123` or `x7B`
fn decode_numeric_entity(entity: &[u8]) -> Option<char> {
    if entity.is_empty() {
        return None;
    }

    let codepoint = if entity[0] == b'x' || entity[0] == b'X' {
        let hex = std::str::from_utf8(&entity[1..]).ok()?;
        u32::from_str_radix(hex, 16).ok()?
    } else {
        let dec = std::str::from_utf8(entity).ok()?;
        dec.parse::<u32>().ok()?
    };

    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Check if a byte may appear in XML content
/// Bytes 0x80+ are UTF-8 sequence bytes, validated when converting to str
#[inline]
pub fn is_valid_xml_byte(b: u8) -> bool {
    matches!(b, 0x9 | 0xA | 0xD | 0x20..=0x7F) || b >= 0x80
}

/// Escape text for markup output
pub fn encode_text(input: &str) -> Cow<'_, str> {
    if !input.bytes().any(|b| matches!(b, b'<' | b'>' | b'&' | b'"' | b'\'')) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Escape text for use in attribute values
pub fn encode_attribute(input: &str) -> Cow<'_, str> {
    encode_text(input)
}
