//! Streaming Markup Tokenizer
//!
//! Pull tokenizer over any `Read` source:
//! - Reads fixed-size chunks through [`ChunkReader`], hashing as it goes
//! - Reassembles tags, comments and CDATA that span chunk boundaries
//! - Emits start/end element, text and end-of-document tokens
//! - Skips comments, processing instructions, the XML declaration and DOCTYPE
//!
//! Checks structure only (tag balance, single root, tag and attribute
//! syntax). Diagnostics follow Expat's wording and carry a 1-based line and
//! byte column.

use super::attributes::{is_whitespace, parse_attributes, split_name};
use super::entities::{decode_text, is_valid_xml_byte};
use super::hash::ContentHash;
use super::scanner::Scanner;
use crate::error::ParseError;
use crate::reader::buffered::{ChunkReader, DEFAULT_CHUNK_SIZE};
use crate::reader::events::Token;
use crate::tree::Attributes;
use memchr::{memchr, memchr_iter, memrchr};
use std::io::Read;

/// Longest markup prefix needed to classify a construct (`<![CDATA[`)
const CLASSIFY_LEN: usize = 9;

/// Tokenizer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Producing tokens
    Running,
    /// `EndDocument` has been emitted
    Done,
    /// An error has been raised; every later call repeats it
    Failed,
}

/// Chunked pull tokenizer with an inline content hash
pub struct Tokenizer<R: Read> {
    source: ChunkReader<R>,
    /// Bytes read but not yet consumed start at `pos`
    buf: Vec<u8>,
    pos: usize,
    line: usize,
    column: usize,
    /// Raw (prefixed) names of open elements, for end tag matching
    open: Vec<Vec<u8>>,
    /// End token owed by a self-closing tag
    pending_end: Option<String>,
    seen_root: bool,
    root_closed: bool,
    bom_checked: bool,
    /// Anything past the BOM has been consumed
    started: bool,
    state: ParseState,
    error: Option<ParseError>,
    hash: Option<ContentHash>,
    /// Iterator has yielded its last item
    fused: bool,
}

impl<R: Read> Tokenizer<R> {
    /// Create a tokenizer with the default chunk size
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Create a tokenizer reading `chunk_size` bytes at a time
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        let source = ChunkReader::with_chunk_size(reader, chunk_size);
        Tokenizer {
            buf: Vec::with_capacity(source.chunk_size()),
            source,
            pos: 0,
            line: 1,
            column: 1,
            open: Vec::with_capacity(16),
            pending_end: None,
            seen_root: false,
            root_closed: false,
            bom_checked: false,
            started: false,
            state: ParseState::Running,
            error: None,
            hash: None,
            fused: false,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Current (line, column) in the source
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    /// Bytes read from the source so far
    pub fn bytes_read(&self) -> u64 {
        self.source.bytes_read()
    }

    /// Content hash of the whole source; set once `EndDocument` is emitted
    pub fn content_hash(&self) -> Option<ContentHash> {
        self.hash
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        match self.state {
            ParseState::Done => return Ok(Token::EndDocument),
            ParseState::Failed => {
                return Err(self.error.clone().unwrap_or(ParseError::ParseFailed));
            }
            ParseState::Running => {}
        }

        match self.advance_token() {
            Ok(token) => {
                if token == Token::EndDocument {
                    self.state = ParseState::Done;
                }
                Ok(token)
            }
            Err(e) => {
                self.state = ParseState::Failed;
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn advance_token(&mut self) -> Result<Token, ParseError> {
        if let Some(name) = self.pending_end.take() {
            return Ok(Token::EndElement { name });
        }

        loop {
            if !self.bom_checked {
                self.check_bom()?;
            }
            if self.pos >= self.buf.len() && !self.fill()? {
                return self.finish();
            }

            let token = if self.buf[self.pos] == b'<' {
                self.read_markup()?
            } else {
                self.read_text()?
            };
            if let Some(token) = token {
                return Ok(token);
            }
        }
    }

    // ------------------------------------------------------------------
    // Buffer management
    // ------------------------------------------------------------------

    /// Drop consumed bytes and append the next chunk. `Ok(false)` at EOF.
    fn fill(&mut self) -> Result<bool, ParseError> {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        match self.source.next_chunk()? {
            Some(chunk) => {
                self.buf.extend_from_slice(chunk);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Read until at least `n` unconsumed bytes are buffered, or EOF
    fn ensure(&mut self, n: usize) -> Result<(), ParseError> {
        while self.buf.len() - self.pos < n {
            if !self.fill()? {
                break;
            }
        }
        Ok(())
    }

    /// Run `find` over the unconsumed bytes (offset by `skip`), reading more
    /// chunks until it matches. Returns the match offset relative to `pos`.
    fn scan_for<F>(&mut self, skip: usize, find: F) -> Result<usize, ParseError>
    where
        F: Fn(&Scanner<'_>) -> Option<usize>,
    {
        loop {
            let mut scanner = Scanner::new(&self.buf[self.pos..]);
            scanner.advance(skip);
            if let Some(found) = find(&scanner) {
                return Ok(found);
            }
            if !self.fill()? {
                return Err(self.error_at(0, "unclosed token"));
            }
        }
    }

    /// Advance past `n` bytes, tracking line and column
    fn consume(&mut self, n: usize) {
        let (line, column) = self.locate(n);
        self.line = line;
        self.column = column;
        self.pos += n;
        self.started = true;
    }

    /// Line and column of the byte `offset` past `pos`
    fn locate(&self, offset: usize) -> (usize, usize) {
        let end = (self.pos + offset).min(self.buf.len());
        let bytes = &self.buf[self.pos..end];
        match memrchr(b'\n', bytes) {
            Some(last) => (
                self.line + memchr_iter(b'\n', bytes).count(),
                bytes.len() - last,
            ),
            None => (self.line, self.column + bytes.len()),
        }
    }

    fn error_at(&self, offset: usize, message: &str) -> ParseError {
        let (line, column) = self.locate(offset);
        ParseError::malformed(message, line, column)
    }

    fn check_bom(&mut self) -> Result<(), ParseError> {
        self.ensure(3)?;
        let head = &self.buf[self.pos..];
        if head.starts_with(&[0xEF, 0xBB, 0xBF]) {
            // UTF-8 BOM: hashed, not tokenized, not counted as a column
            self.pos += 3;
        } else if head.starts_with(&[0xFE, 0xFF]) || head.starts_with(&[0xFF, 0xFE]) {
            return Err(self.error_at(0, "unsupported encoding"));
        }
        self.bom_checked = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Constructs
    // ------------------------------------------------------------------

    fn read_text(&mut self) -> Result<Option<Token>, ParseError> {
        let mut scanned = 0;
        let end = loop {
            if let Some(i) = memchr(b'<', &self.buf[self.pos + scanned..]) {
                break scanned + i;
            }
            scanned = self.buf.len() - self.pos;
            if !self.fill()? {
                break self.buf.len() - self.pos;
            }
        };

        let raw = &self.buf[self.pos..self.pos + end];
        let lead = raw.iter().take_while(|&&b| is_whitespace(b)).count();
        if lead == raw.len() {
            self.consume(end);
            return Ok(None);
        }

        if self.open.is_empty() {
            let message = if self.root_closed {
                "junk after document element"
            } else {
                "syntax error"
            };
            return Err(self.error_at(lead, message));
        }

        let text = decode_text(raw)
            .map_err(|msg| self.error_at(lead, msg))
            .and_then(|decoded| {
                String::from_utf8(decoded.into_owned())
                    .map_err(|_| self.error_at(lead, "not well-formed (invalid token)"))
            })?;
        self.consume(end);
        Ok(Some(Token::Text(text)))
    }

    fn read_markup(&mut self) -> Result<Option<Token>, ParseError> {
        self.ensure(CLASSIFY_LEN)?;
        let rest = &self.buf[self.pos..];

        if rest.starts_with(b"<!--") {
            let end = self.scan_for(4, |s| s.find_seq(b"-->"))?;
            self.consume(end + 3);
            Ok(None)
        } else if rest.starts_with(b"<![CDATA[") {
            self.read_cdata()
        } else if rest.starts_with(b"<!DOCTYPE") {
            if self.seen_root {
                return Err(self.error_at(0, "syntax error"));
            }
            let end = self.scan_for(2, |s| s.find_declaration_end())?;
            self.consume(end + 1);
            Ok(None)
        } else if rest.starts_with(b"<!") {
            Err(self.error_at(0, "not well-formed (invalid token)"))
        } else if rest.starts_with(b"<?") {
            let end = self.scan_for(2, |s| s.find_seq(b"?>"))?;
            self.check_pi_target(end)?;
            self.consume(end + 2);
            Ok(None)
        } else if rest.starts_with(b"</") {
            self.read_end_tag().map(Some)
        } else {
            self.read_start_tag().map(Some)
        }
    }

    /// The XML declaration may only open the document; other spellings of
    /// `xml` are reserved. `end` is the offset of the closing `?>`.
    fn check_pi_target(&self, end: usize) -> Result<(), ParseError> {
        let mut scanner = Scanner::new(&self.buf[self.pos..self.pos + end]);
        scanner.advance(2);
        let target = scanner
            .read_name()
            .ok_or_else(|| self.error_at(2, "not well-formed (invalid token)"))?;
        if target == b"xml" {
            if self.started {
                return Err(self.error_at(0, "XML or text declaration not at start of entity"));
            }
        } else if target.eq_ignore_ascii_case(b"xml") {
            return Err(self.error_at(2, "not well-formed (invalid token)"));
        }
        Ok(())
    }

    fn read_cdata(&mut self) -> Result<Option<Token>, ParseError> {
        let end = self.scan_for(CLASSIFY_LEN, |s| s.find_seq(b"]]>"))?;
        if self.open.is_empty() {
            return Err(self.error_at(0, "syntax error"));
        }

        let content = &self.buf[self.pos + CLASSIFY_LEN..self.pos + end];
        let token = if content.iter().all(|&b| is_whitespace(b)) {
            None
        } else {
            if !content.iter().all(|&b| is_valid_xml_byte(b)) {
                return Err(self.error_at(CLASSIFY_LEN, "not well-formed (invalid token)"));
            }
            let text = std::str::from_utf8(content)
                .map_err(|_| self.error_at(CLASSIFY_LEN, "not well-formed (invalid token)"))?;
            Some(Token::Text(text.to_owned()))
        };
        self.consume(end + 3);
        Ok(token)
    }

    fn read_start_tag(&mut self) -> Result<Token, ParseError> {
        let end = self.scan_for(1, |s| s.find_tag_end_quoted())?;
        let tag = parse_start_tag(&self.buf[self.pos..=self.pos + end])
            .map_err(|(offset, msg)| self.error_at(offset, msg))?;

        if self.root_closed {
            return Err(self.error_at(0, "junk after document element"));
        }
        self.seen_root = true;

        if tag.self_closing {
            self.pending_end = Some(tag.name.clone());
            if self.open.is_empty() {
                self.root_closed = true;
            }
        } else {
            self.open.push(tag.raw_name);
        }

        self.consume(end + 1);
        Ok(Token::StartElement {
            name: tag.name,
            attributes: tag.attributes,
        })
    }

    fn read_end_tag(&mut self) -> Result<Token, ParseError> {
        let end = self.scan_for(2, |s| s.find_tag_end_quoted())?;
        let (raw_name, name) = parse_end_tag(&self.buf[self.pos..=self.pos + end])
            .map_err(|(offset, msg)| self.error_at(offset, msg))?;

        match self.open.last().map(|open| *open == raw_name) {
            Some(true) => {
                self.open.pop();
            }
            Some(false) => return Err(self.error_at(2, "mismatched tag")),
            None if self.root_closed => {
                return Err(self.error_at(0, "junk after document element"));
            }
            None => return Err(self.error_at(0, "syntax error")),
        }
        if self.open.is_empty() {
            self.root_closed = true;
        }

        self.consume(end + 1);
        Ok(Token::EndElement { name })
    }

    fn finish(&mut self) -> Result<Token, ParseError> {
        if !self.seen_root || !self.open.is_empty() {
            return Err(self.error_at(0, "no element found"));
        }
        self.hash = self.source.content_hash();
        Ok(Token::EndDocument)
    }
}

impl<R: Read> Iterator for Tokenizer<R> {
    type Item = Result<Token, ParseError>;

    /// Yields every token up to and including `EndDocument`, or up to and
    /// including the first error
    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        let item = self.next_token();
        if matches!(item, Ok(Token::EndDocument) | Err(_)) {
            self.fused = true;
        }
        Some(item)
    }
}

/// Owned result of parsing one start tag
struct StartTag {
    raw_name: Vec<u8>,
    name: String,
    attributes: Attributes,
    self_closing: bool,
}

/// Parse `<name attr="v" ...>` or `<name .../>`. Errors carry the byte offset
/// within the tag.
fn parse_start_tag(tag: &[u8]) -> Result<StartTag, (usize, &'static str)> {
    const INVALID: &str = "not well-formed (invalid token)";

    let self_closing = tag.len() >= 3 && tag.ends_with(b"/>");
    let body_end = if self_closing { tag.len() - 2 } else { tag.len() - 1 };

    let mut scanner = Scanner::new(&tag[..body_end]);
    scanner.advance(1);
    let raw_name = scanner.read_name().ok_or((1, INVALID))?;
    let name_end = scanner.position();
    let name = local_name(raw_name).ok_or((1, INVALID))?;

    let attr_bytes = &tag[name_end..body_end];
    if attr_bytes.first().is_some_and(|&b| !is_whitespace(b)) {
        return Err((name_end, INVALID));
    }

    let parsed = parse_attributes(attr_bytes).map_err(|(offset, msg)| (name_end + offset, msg))?;
    let mut attributes = Attributes::with_capacity(parsed.len());
    for attr in parsed {
        if attr.is_namespace_declaration() {
            continue;
        }
        let key = local_name(attr.name).ok_or((name_end, INVALID))?;
        let value = String::from_utf8(attr.value.into_owned()).map_err(|_| (name_end, INVALID))?;
        attributes.insert(key, value);
    }

    Ok(StartTag {
        raw_name: raw_name.to_vec(),
        name,
        attributes,
        self_closing,
    })
}

/// Parse `</name>`, returning the raw and the prefix-stripped name
fn parse_end_tag(tag: &[u8]) -> Result<(Vec<u8>, String), (usize, &'static str)> {
    const INVALID: &str = "not well-formed (invalid token)";

    let body = &tag[..tag.len() - 1];
    let mut scanner = Scanner::new(body);
    scanner.advance(2);
    let raw_name = scanner.read_name().ok_or((2, INVALID))?;
    if !scanner.remaining().iter().all(|&b| is_whitespace(b)) {
        return Err((scanner.position(), INVALID));
    }
    let name = local_name(raw_name).ok_or((2, INVALID))?;
    Ok((raw_name.to_vec(), name))
}

/// Name with any namespace prefix removed; `None` if empty or not UTF-8
fn local_name(raw: &[u8]) -> Option<String> {
    let (_, local) = split_name(raw);
    if local.is_empty() {
        return None;
    }
    std::str::from_utf8(local).ok().map(str::to_owned)
}

/// Tokenize an in-memory document, returning every token up to
/// `EndDocument` and the content hash
pub fn tokenize(input: &[u8]) -> Result<(Vec<Token>, ContentHash), ParseError> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();
    for token in tokenizer.by_ref() {
        tokens.push(token?);
    }
    let hash = tokenizer.content_hash().ok_or(ParseError::ParseFailed)?;
    Ok((tokens, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input.as_bytes()).unwrap().0
    }

    fn error(input: &str) -> (String, usize, usize) {
        match tokenize(input.as_bytes()) {
            Err(ParseError::MalformedMarkup { message, line, column }) => (message, line, column),
            other => panic!("expected MalformedMarkup, got {:?}", other),
        }
    }

    fn start(name: &str, attrs: &[(&str, &str)]) -> Token {
        Token::StartElement {
            name: name.to_string(),
            attributes: attrs.iter().copied().collect(),
        }
    }

    fn end(name: &str) -> Token {
        Token::EndElement { name: name.to_string() }
    }

    #[test]
    fn test_row_with_text_child() {
        let toks = tokens(r#"<Row id="r1"><Text value="hi"/></Row>"#);
        assert_eq!(
            toks,
            vec![
                start("Row", &[("id", "r1")]),
                start("Text", &[("value", "hi")]),
                end("Text"),
                end("Row"),
                Token::EndDocument,
            ]
        );
    }

    #[test]
    fn test_namespace_prefixes_stripped() {
        let toks = tokens(
            r#"<androidx.constraintlayout.widget.ConstraintLayout
                xmlns:android="http://schemas.android.com/apk/res/android"
                xmlns:app="http://schemas.android.com/apk/res-auto"
                android:layout_width="match_parent"
                app:layout_constraintTop_toTopOf="parent"/>"#,
        );
        assert_eq!(
            toks[0],
            start(
                "androidx.constraintlayout.widget.ConstraintLayout",
                &[("layout_width", "match_parent"), ("layout_constraintTop_toTopOf", "parent")]
            )
        );
        let toks = tokens("<ui:Row/>");
        assert_eq!(toks[0], start("Row", &[]));
        assert_eq!(toks[1], end("Row"));
    }

    #[test]
    fn test_text_runs() {
        let toks = tokens("<Text>\n  hello &amp; bye\n</Text>");
        assert_eq!(toks[1], Token::Text("\n  hello & bye\n".into()));
        // whitespace-only runs are not reported
        let toks = tokens("<Row>\n   <A/>\n</Row>");
        assert!(toks.iter().all(|t| !matches!(t, Token::Text(_))));
    }

    #[test]
    fn test_skips_prolog_comments_and_pis() {
        let toks = tokens(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE Row>\n<!-- layout -->\n<Row><?hint x?><!-- <Fake/> --></Row>\n<!-- trailing -->",
        );
        assert_eq!(toks, vec![start("Row", &[]), end("Row"), Token::EndDocument]);
    }

    #[test]
    fn test_cdata_is_text() {
        let toks = tokens("<Text><![CDATA[a < b]]></Text>");
        assert_eq!(toks[1], Token::Text("a < b".into()));
    }

    #[test]
    fn test_chunk_boundaries_do_not_matter() {
        let doc = br#"<?xml version="1.0"?><Column id="c" note="a > b"><!-- comment spanning chunks --><Text value="one"/><Text value="two">x</Text><![CDATA[raw]]></Column>"#;
        let (expected, expected_hash) = tokenize(doc).unwrap();
        for chunk in [16, 17, 23, 64, 4096] {
            let mut tokenizer = Tokenizer::with_chunk_size(&doc[..], chunk);
            let toks: Vec<_> = tokenizer.by_ref().collect::<Result<_, _>>().unwrap();
            assert_eq!(toks, expected, "chunk size {}", chunk);
            assert_eq!(tokenizer.content_hash(), Some(expected_hash));
        }
    }

    #[test]
    fn test_hash_covers_whole_stream() {
        let doc = b"<Row/>\n<!-- after -->\n";
        let (_, hash) = tokenize(doc).unwrap();
        assert_eq!(hash, ContentHash::of(doc));
    }

    #[test]
    fn test_hash_unavailable_before_end() {
        let mut tokenizer = Tokenizer::new(&b"<Row></Row>"[..]);
        tokenizer.next_token().unwrap();
        assert!(tokenizer.content_hash().is_none());
    }

    #[test]
    fn test_unclosed_tag() {
        let (message, _, _) = error("<Row><Text value=\"hi\"/>");
        assert_eq!(message, "no element found");
        let (message, line, column) = error("<Row><Text value=\"hi\"");
        assert_eq!(message, "unclosed token");
        assert_eq!((line, column), (1, 6));
    }

    #[test]
    fn test_mismatched_tag() {
        let (message, line, column) = error("<Row>\n  <Text></Row>");
        assert_eq!(message, "mismatched tag");
        assert_eq!((line, column), (2, 11));
    }

    #[test]
    fn test_junk_after_root() {
        assert_eq!(error("<A/><B/>").0, "junk after document element");
        assert_eq!(error("<A></A>text").0, "junk after document element");
    }

    #[test]
    fn test_xml_declaration_only_at_start() {
        let (message, line, column) = error("<?xml version=\"1.0\"?><a/><?xml version=\"1.0\"?>");
        assert_eq!(message, "XML or text declaration not at start of entity");
        assert_eq!((line, column), (1, 26));
        assert_eq!(error("\n<?xml version=\"1.0\"?><a/>").0, "XML or text declaration not at start of entity");
        assert_eq!(error("<a><?XML x?></a>").0, "not well-formed (invalid token)");
        // a BOM does not count as content
        assert!(tokenize(b"\xEF\xBB\xBF<?xml version=\"1.0\"?><a/>").is_ok());
        assert!(tokenize(b"<a><?xml-stylesheet href=\"s.css\"?></a>").is_ok());
    }

    #[test]
    fn test_undefined_entity() {
        let (message, line, column) = error("<Text value=\"&bogus;\"/>");
        assert_eq!(message, "undefined entity");
        assert_eq!((line, column), (1, 14));
        assert_eq!(error("<Text>fish &chips;</Text>").0, "undefined entity");
        assert_eq!(error("<Text>fish & chips</Text>").0, "not well-formed (invalid token)");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(error("").0, "no element found");
        assert_eq!(error("  <!-- only -->  ").0, "no element found");
    }

    #[test]
    fn test_text_before_root() {
        assert_eq!(error("hello<Row/>").0, "syntax error");
    }

    #[test]
    fn test_bad_attribute_syntax() {
        assert_eq!(error("<Row id=r1/>").0, "not well-formed (invalid token)");
        assert_eq!(error("<Row id=\"a\" id=\"b\"/>").0, "duplicate attribute");
    }

    #[test]
    fn test_prefixed_duplicates_collapse() {
        let toks = tokens(r#"<Row android:id="a" app:id="b"/>"#);
        assert_eq!(toks[0], start("Row", &[("id", "b")]));
    }

    #[test]
    fn test_error_is_sticky() {
        let mut tokenizer = Tokenizer::new(&b"<A></B>"[..]);
        assert!(tokenizer.next_token().is_ok());
        let first = tokenizer.next_token().unwrap_err();
        let second = tokenizer.next_token().unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(tokenizer.state(), ParseState::Failed);
    }

    #[test]
    fn test_utf8_bom_skipped_utf16_rejected() {
        let toks = tokenize(b"\xEF\xBB\xBF<Row/>").unwrap().0;
        assert_eq!(toks[0], start("Row", &[]));
        assert!(tokenize(b"\xFF\xFE<\x00").is_err());
    }

    #[test]
    fn test_iterator_stops_after_end() {
        let mut tokenizer = Tokenizer::new(&b"<Row/>"[..]);
        assert_eq!(tokenizer.by_ref().count(), 3);
        assert!(tokenizer.next().is_none());
    }
}
