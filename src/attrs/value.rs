//! Typed Attribute Values
//!
//! Raw attribute strings are converted to a [`Value`] of the kind the applier
//! was registered with before the applier sees them.

use crate::element::{BuildContext, ResourceId};
use std::fmt;
use std::sync::Arc;

/// Kinds of value an applier can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    /// `#RGB`, `#ARGB`, `#RRGGBB` or `#AARRGGBB`
    Color,
    /// `16dp`, `12sp`, `match_parent`, `wrap_content`, ...
    Dimension,
    /// `@kind/name`, `@+id/name`, `@pkg:kind/name`
    Reference,
    /// Identifier, optionally `|`-joined flags
    Enum,
    /// Binary payload; only produced by deferred work, never parsed
    Bytes,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
            ValueKind::Color => "color",
            ValueKind::Dimension => "dimension",
            ValueKind::Reference => "reference",
            ValueKind::Enum => "enum",
            ValueKind::Bytes => "bytes",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ARGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    /// Parse `#RGB`, `#ARGB`, `#RRGGBB` or `#AARRGGBB`. Missing alpha is opaque.
    pub fn parse(raw: &str) -> Option<Color> {
        let hex = raw.strip_prefix('#')?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        let expand = |nibbles: u32, count: u32| -> u32 {
            (0..count).rev().fold(0, |acc, i| {
                let n = (nibbles >> (i * 4)) & 0xF;
                (acc << 8) | (n << 4) | n
            })
        };
        match hex.len() {
            3 => Some(Color(0xFF00_0000 | expand(value, 3))),
            4 => Some(Color(expand(value, 4))),
            6 => Some(Color(0xFF00_0000 | value)),
            8 => Some(Color(value)),
            _ => None,
        }
    }

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

/// Dimension units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Dp,
    Sp,
    Px,
    Pt,
    In,
    Mm,
}

impl Unit {
    fn parse(suffix: &str) -> Option<Unit> {
        Some(match suffix {
            "dp" | "dip" => Unit::Dp,
            "sp" => Unit::Sp,
            "px" => Unit::Px,
            "pt" => Unit::Pt,
            "in" => Unit::In,
            "mm" => Unit::Mm,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            Unit::Dp => "dp",
            Unit::Sp => "sp",
            Unit::Px => "px",
            Unit::Pt => "pt",
            Unit::In => "in",
            Unit::Mm => "mm",
        }
    }
}

/// Pixel value of `match_parent`
pub const MATCH_PARENT: f32 = -1.0;
/// Pixel value of `wrap_content`
pub const WRAP_CONTENT: f32 = -2.0;

/// Baseline density: one dp is one pixel at 160 dpi
const BASE_DPI: f32 = 160.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    MatchParent,
    WrapContent,
    Exact(f32, Unit),
}

impl Dimension {
    pub fn parse(raw: &str) -> Option<Dimension> {
        match raw {
            "match_parent" | "fill_parent" => return Some(Dimension::MatchParent),
            "wrap_content" => return Some(Dimension::WrapContent),
            _ => {}
        }
        let split = raw.find(|c: char| c.is_ascii_alphabetic())?;
        let (number, suffix) = raw.split_at(split);
        let unit = Unit::parse(suffix)?;
        let value: f32 = number.parse().ok()?;
        value.is_finite().then_some(Dimension::Exact(value, unit))
    }

    /// Pixels at `density` pixels per dp. `match_parent` and `wrap_content`
    /// map to their negative sentinels.
    pub fn to_px(self, density: f32) -> f32 {
        match self {
            Dimension::MatchParent => MATCH_PARENT,
            Dimension::WrapContent => WRAP_CONTENT,
            Dimension::Exact(v, Unit::Px) => v,
            Dimension::Exact(v, Unit::Dp | Unit::Sp) => v * density,
            Dimension::Exact(v, Unit::Pt) => v * density * BASE_DPI / 72.0,
            Dimension::Exact(v, Unit::In) => v * density * BASE_DPI,
            Dimension::Exact(v, Unit::Mm) => v * density * BASE_DPI / 25.4,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::MatchParent => f.write_str("match_parent"),
            Dimension::WrapContent => f.write_str("wrap_content"),
            Dimension::Exact(v, unit) => write!(f, "{}{}", v, unit.as_str()),
        }
    }
}

/// A resolved `@kind/name` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub package: Option<String>,
    pub kind: String,
    pub name: String,
    /// Written as `@+id/...`
    pub create: bool,
    /// [`ResourceId::NOT_FOUND`] when nothing resolved it
    pub id: ResourceId,
}

impl Reference {
    /// Split `@[+][pkg:]kind/name` without resolving it
    pub fn parse_unresolved(raw: &str) -> Option<Reference> {
        let body = raw.strip_prefix('@')?;
        let (create, body) = match body.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        let (qualified_kind, name) = body.split_once('/')?;
        let (package, kind) = match qualified_kind.split_once(':') {
            Some((pkg, kind)) => (Some(pkg.to_string()), kind),
            None => (None, qualified_kind),
        };
        if kind.is_empty() || name.is_empty() || (create && kind != "id") {
            return None;
        }
        Some(Reference {
            package,
            kind: kind.to_string(),
            name: name.to_string(),
            create,
            id: ResourceId::NOT_FOUND,
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.create { "@+" } else { "@" })?;
        if let Some(pkg) = &self.package {
            write!(f, "{}:", pkg)?;
        }
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f32),
    Boolean(bool),
    Color(Color),
    Dimension(Dimension),
    Reference(Reference),
    Enum(String),
    Bytes(Arc<[u8]>),
}

impl Value {
    /// Convert a raw attribute string to `kind`, resolving references through
    /// `ctx`. `None` when the text is not a value of that kind.
    pub fn parse(kind: ValueKind, raw: &str, ctx: &BuildContext) -> Option<Value> {
        let raw_trimmed = raw.trim();
        Some(match kind {
            ValueKind::String => Value::String(raw.to_string()),
            ValueKind::Integer => Value::Integer(parse_integer(raw_trimmed)?),
            ValueKind::Float => {
                let v: f32 = raw_trimmed.parse().ok()?;
                Value::Float(v)
            }
            ValueKind::Boolean => match raw_trimmed {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                _ => return None,
            },
            ValueKind::Color => Value::Color(Color::parse(raw_trimmed)?),
            ValueKind::Dimension => Value::Dimension(Dimension::parse(raw_trimmed)?),
            ValueKind::Reference => {
                let mut reference = Reference::parse_unresolved(raw_trimmed)?;
                reference.id = ctx.resolve(&reference.kind, &reference.name, reference.create);
                Value::Reference(reference)
            }
            ValueKind::Enum => {
                if !is_enum_literal(raw_trimmed) {
                    return None;
                }
                Value::Enum(raw_trimmed.to_string())
            }
            ValueKind::Bytes => return None,
        })
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Color(_) => ValueKind::Color,
            Value::Dimension(_) => ValueKind::Dimension,
            Value::Reference(_) => ValueKind::Reference,
            Value::Enum(_) => ValueKind::Enum,
            Value::Bytes(_) => ValueKind::Bytes,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_dimension(&self) -> Option<Dimension> {
        match self {
            Value::Dimension(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::Enum(s) => f.write_str(s),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Color(c) => write!(f, "{}", c),
            Value::Dimension(d) => write!(f, "{}", d),
            Value::Reference(r) => write!(f, "{}", r),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Decimal, or hex with a `0x` prefix
fn parse_integer(raw: &str) -> Option<i64> {
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn is_enum_literal(raw: &str) -> bool {
    !raw.is_empty()
        && raw.split('|').all(|flag| {
            let mut chars = flag.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::MapResources;

    fn parse(kind: ValueKind, raw: &str) -> Option<Value> {
        Value::parse(kind, raw, &BuildContext::default())
    }

    #[test]
    fn test_colors() {
        assert_eq!(Color::parse("#F00"), Some(Color(0xFFFF_0000)));
        assert_eq!(Color::parse("#8F00"), Some(Color(0x88FF_0000)));
        assert_eq!(Color::parse("#00FF00"), Some(Color(0xFF00_FF00)));
        assert_eq!(Color::parse("#80112233"), Some(Color(0x8011_2233)));
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("red"), None);
        assert_eq!(Color(0x8011_2233).alpha(), 0x80);
        assert_eq!(Color(0xFF00_FF00).to_string(), "#FF00FF00");
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(Dimension::parse("16dp"), Some(Dimension::Exact(16.0, Unit::Dp)));
        assert_eq!(Dimension::parse("1.5dip"), Some(Dimension::Exact(1.5, Unit::Dp)));
        assert_eq!(Dimension::parse("fill_parent"), Some(Dimension::MatchParent));
        assert_eq!(Dimension::parse("16"), None);
        assert_eq!(Dimension::parse("16em"), None);
        assert_eq!(Dimension::Exact(16.0, Unit::Dp).to_px(2.0), 32.0);
        assert_eq!(Dimension::Exact(1.0, Unit::In).to_px(1.0), 160.0);
        assert_eq!(Dimension::WrapContent.to_px(3.0), WRAP_CONTENT);
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse(ValueKind::Integer, "0x10"), Some(Value::Integer(16)));
        assert_eq!(parse(ValueKind::Integer, "-3"), Some(Value::Integer(-3)));
        assert_eq!(parse(ValueKind::Integer, "3.5"), None);
        assert_eq!(parse(ValueKind::Float, "0.25"), Some(Value::Float(0.25)));
        assert_eq!(parse(ValueKind::Boolean, "true"), Some(Value::Boolean(true)));
        assert_eq!(parse(ValueKind::Boolean, "yes"), None);
        assert_eq!(parse(ValueKind::String, " keep spaces "), Some(Value::String(" keep spaces ".into())));
    }

    #[test]
    fn test_enums() {
        assert_eq!(parse(ValueKind::Enum, "top|start"), Some(Value::Enum("top|start".into())));
        assert_eq!(parse(ValueKind::Enum, "vertical"), Some(Value::Enum("vertical".into())));
        assert_eq!(parse(ValueKind::Enum, "top||start"), None);
        assert_eq!(parse(ValueKind::Enum, "9lives"), None);
    }

    #[test]
    fn test_references() {
        let resources: MapResources = [("string", "title", ResourceId(7))].into_iter().collect();
        let ctx = BuildContext::new(std::sync::Arc::new(resources), 1.0);

        let title = Value::parse(ValueKind::Reference, "@string/title", &ctx).unwrap();
        assert_eq!(title.as_reference().unwrap().id, ResourceId(7));

        let missing = Value::parse(ValueKind::Reference, "@android:color/white", &ctx).unwrap();
        let missing = missing.as_reference().unwrap();
        assert_eq!(missing.package.as_deref(), Some("android"));
        assert_eq!(missing.id, ResourceId::NOT_FOUND);

        let declared = Value::parse(ValueKind::Reference, "@+id/go", &ctx).unwrap();
        let used = Value::parse(ValueKind::Reference, "@id/go", &ctx).unwrap();
        assert!(declared.as_reference().unwrap().id.is_found());
        assert_eq!(declared.as_reference().unwrap().id, used.as_reference().unwrap().id);

        assert!(Value::parse(ValueKind::Reference, "@+string/x", &ctx).is_none());
        assert!(Value::parse(ValueKind::Reference, "plain", &ctx).is_none());
    }

    #[test]
    fn test_bytes_never_parse() {
        assert_eq!(parse(ValueKind::Bytes, "abc"), None);
        let v = Value::Bytes(Arc::from(&b"abc"[..]));
        assert_eq!(v.kind(), ValueKind::Bytes);
        assert_eq!(v.to_string(), "<3 bytes>");
    }
}
