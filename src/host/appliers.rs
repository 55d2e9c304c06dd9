//! Standard attribute appliers
//!
//! Covers the common layout attributes of the standard widget set. Plain
//! attributes store their converted value under the attribute's own name;
//! the rest validate or resolve first.

use crate::attrs::{set_property, ApplyContext, AttributeEngine, Value, ValueKind};
use crate::element::Element;
use crate::error::AttributeError;
use std::sync::Arc;

const DIMENSIONS: &[&str] = &[
    "layout_width",
    "layout_height",
    "layout_margin",
    "layout_marginLeft",
    "layout_marginTop",
    "layout_marginRight",
    "layout_marginBottom",
    "layout_marginStart",
    "layout_marginEnd",
    "padding",
    "paddingLeft",
    "paddingTop",
    "paddingRight",
    "paddingBottom",
    "paddingStart",
    "paddingEnd",
    "minWidth",
    "minHeight",
    "textSize",
    "elevation",
];

const BOOLEANS: &[&str] = &["enabled", "clickable", "focusable", "checked"];

const ENUMS: &[(&str, &[&str])] = &[
    ("orientation", &["vertical", "horizontal"]),
    ("visibility", &["visible", "invisible", "gone"]),
    (
        "scaleType",
        &["center", "centerCrop", "centerInside", "fitCenter", "fitEnd", "fitStart", "fitXY", "matrix"],
    ),
    ("textStyle", &["normal", "bold", "italic", "bold|italic"]),
];

/// Constraint sides that can anchor to each other
const CONSTRAINT_SIDES: &[&[&str]] = &[&["Left", "Right"], &["Top", "Bottom"], &["Start", "End"]];

/// Register the standard appliers on `engine`
pub fn register_standard_appliers(engine: &mut AttributeEngine) {
    engine.register("id", ValueKind::String, apply_id);

    for &name in DIMENSIONS {
        engine.register_property(name, ValueKind::Dimension);
    }
    for &name in BOOLEANS {
        engine.register_property(name, ValueKind::Boolean);
    }
    for &(name, allowed) in ENUMS {
        engine.register(name, ValueKind::Enum, move |element, name, value, _| {
            one_of(element, name, value, allowed)
        });
    }
    engine.register_property("gravity", ValueKind::Enum);
    engine.register_property("layout_gravity", ValueKind::Enum);
    engine.register_property("maxLines", ValueKind::Integer);
    engine.register_property("layout_weight", ValueKind::Float);
    engine.register_property("rotation", ValueKind::Float);
    engine.register("alpha", ValueKind::Float, |element, name, value, _| unit_interval(element, name, value));
    engine.register_property("textColor", ValueKind::Color);
    engine.register_property("tag", ValueKind::String);

    engine.register_property("value", ValueKind::String);
    for name in ["text", "hint", "contentDescription"] {
        engine.register(name, ValueKind::String, apply_text);
    }
    engine.register("background", ValueKind::String, apply_background);
    engine.register("src", ValueKind::String, apply_src);

    for group in CONSTRAINT_SIDES {
        for &side in group.iter() {
            for &target in group.iter() {
                let name = format!("layout_constraint{}_to{}Of", side, target);
                engine.register(name, ValueKind::String, apply_anchor);
            }
        }
    }
    engine.register("layout_constraintBaseline_toBaselineOf", ValueKind::String, apply_anchor);
    engine.register_property("layout_constraintDimensionRatio", ValueKind::String);

    for axis in ["Horizontal", "Vertical"] {
        engine.register(
            format!("layout_constraint{}_bias", axis),
            ValueKind::Float,
            |element, name, value, _| unit_interval(element, name, value),
        );
        engine.register_property(format!("layout_constraint{}_weight", axis), ValueKind::Float);
    }
}

fn mismatch(name: &str, expected: ValueKind, found: impl ToString) -> AttributeError {
    AttributeError::TypeMismatch {
        name: name.to_string(),
        expected,
        found: found.to_string(),
    }
}

/// `@+id/name`, `@id/name`, or a bare `name` declared as `@+id/name`.
/// Other resource kinds are rejected.
fn apply_id(
    element: &mut dyn Element,
    name: &str,
    value: Value,
    ctx: &mut ApplyContext<'_>,
) -> Result<(), AttributeError> {
    let raw = value.as_str().map(str::trim).unwrap_or_default();
    let reference = if raw.starts_with('@') {
        Value::parse(ValueKind::Reference, raw, ctx.build())
    } else if is_identifier(raw) {
        Value::parse(ValueKind::Reference, &format!("@+id/{}", raw), ctx.build())
    } else {
        None
    };
    match reference {
        Some(id) if id.as_reference().map_or(false, |r| r.kind == "id") => {
            set_property(element, name, id, ValueKind::Reference)
        }
        _ => Err(mismatch(name, ValueKind::Reference, raw)),
    }
}

fn is_identifier(raw: &str) -> bool {
    let mut chars = raw.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn one_of(element: &mut dyn Element, name: &str, value: Value, allowed: &[&str]) -> Result<(), AttributeError> {
    match value.as_str() {
        Some(literal) if allowed.contains(&literal) => set_property(element, name, value, ValueKind::Enum),
        _ => Err(mismatch(name, ValueKind::Enum, value)),
    }
}

fn unit_interval(element: &mut dyn Element, name: &str, value: Value) -> Result<(), AttributeError> {
    match value.as_f32() {
        Some(v) if (0.0..=1.0).contains(&v) => set_property(element, name, value, ValueKind::Float),
        _ => Err(mismatch(name, ValueKind::Float, value)),
    }
}

/// Literal text, or a `@string/` style reference
fn apply_text(
    element: &mut dyn Element,
    name: &str,
    value: Value,
    ctx: &mut ApplyContext<'_>,
) -> Result<(), AttributeError> {
    let Some(raw) = value.as_str().filter(|s| s.starts_with('@')) else {
        return set_property(element, name, value, ValueKind::String);
    };
    let reference =
        Value::parse(ValueKind::Reference, raw, ctx.build()).ok_or_else(|| mismatch(name, ValueKind::Reference, raw))?;
    set_property(element, name, reference, ValueKind::Reference)
}

/// A color literal or a drawable reference
fn apply_background(
    element: &mut dyn Element,
    name: &str,
    value: Value,
    ctx: &mut ApplyContext<'_>,
) -> Result<(), AttributeError> {
    let raw = value.as_str().unwrap_or_default();
    let converted = Value::parse(ValueKind::Color, raw, ctx.build())
        .or_else(|| Value::parse(ValueKind::Reference, raw, ctx.build()))
        .ok_or_else(|| mismatch(name, ValueKind::Color, raw))?;
    let kind = converted.kind();
    set_property(element, name, converted, kind)
}

/// `@drawable/` references apply at once; `file:` paths are read in the
/// background and delivered as bytes
fn apply_src(
    element: &mut dyn Element,
    name: &str,
    value: Value,
    ctx: &mut ApplyContext<'_>,
) -> Result<(), AttributeError> {
    let raw = value.as_str().unwrap_or_default();
    if let Some(path) = raw.strip_prefix("file:") {
        let path = path.to_string();
        ctx.defer(name, move || {
            let bytes = std::fs::read(&path)?;
            Ok(Value::Bytes(Arc::from(bytes)))
        });
        return Ok(());
    }
    let reference =
        Value::parse(ValueKind::Reference, raw, ctx.build()).ok_or_else(|| mismatch(name, ValueKind::Reference, raw))?;
    set_property(element, name, reference, ValueKind::Reference)
}

/// `parent` or a sibling id
fn apply_anchor(
    element: &mut dyn Element,
    name: &str,
    value: Value,
    ctx: &mut ApplyContext<'_>,
) -> Result<(), AttributeError> {
    let raw = value.as_str().map(str::trim).unwrap_or_default();
    if raw == "parent" {
        return set_property(element, name, Value::Enum(raw.to_string()), ValueKind::Enum);
    }
    match Value::parse(ValueKind::Reference, raw, ctx.build()) {
        Some(anchor) if anchor.as_reference().map_or(false, |r| r.kind == "id") => {
            set_property(element, name, anchor, ValueKind::Reference)
        }
        _ => Err(mismatch(name, ValueKind::Reference, raw)),
    }
}
