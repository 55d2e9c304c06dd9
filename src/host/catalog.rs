//! Standard widget catalog

use super::widget::{Profile, Widget};
use crate::element::Element;
use crate::factory::{Constructor, TypeCatalog, TypeDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Leaf,
    Container,
    /// Container holding at most one child
    Single,
}

/// (qualified name, shape, profile, context-only constructor)
const STANDARD_TYPES: &[(&str, Shape, Profile, bool)] = &[
    ("android.widget.LinearLayout", Shape::Container, Profile::Linear, false),
    ("android.widget.FrameLayout", Shape::Container, Profile::Generic, false),
    ("android.widget.RelativeLayout", Shape::Container, Profile::Generic, false),
    ("android.widget.ScrollView", Shape::Single, Profile::Generic, false),
    ("android.widget.HorizontalScrollView", Shape::Single, Profile::Generic, false),
    ("android.widget.TextView", Shape::Leaf, Profile::Text, false),
    ("android.widget.Button", Shape::Leaf, Profile::Text, false),
    ("android.widget.EditText", Shape::Leaf, Profile::Text, false),
    ("android.widget.CheckBox", Shape::Leaf, Profile::Checkable, false),
    ("android.widget.RadioButton", Shape::Leaf, Profile::Checkable, false),
    ("android.widget.Switch", Shape::Leaf, Profile::Checkable, false),
    ("android.widget.ImageView", Shape::Leaf, Profile::Image, false),
    ("android.widget.ImageButton", Shape::Leaf, Profile::Image, false),
    ("android.widget.ProgressBar", Shape::Leaf, Profile::Generic, false),
    ("android.widget.Space", Shape::Leaf, Profile::Generic, true),
    ("android.view.View", Shape::Leaf, Profile::Generic, false),
    ("android.webkit.WebView", Shape::Leaf, Profile::Generic, true),
    ("androidx.constraintlayout.widget.ConstraintLayout", Shape::Container, Profile::Generic, false),
    ("Row", Shape::Container, Profile::Generic, false),
    ("Column", Shape::Container, Profile::Linear, false),
    ("Text", Shape::Leaf, Profile::Text, false),
];

fn widget(simple_name: &str, shape: Shape, profile: Profile) -> Widget {
    let widget = match shape {
        Shape::Leaf => Widget::leaf(simple_name),
        Shape::Container => Widget::container(simple_name),
        Shape::Single => Widget::container(simple_name).with_max_children(1),
    };
    widget.with_profile(profile)
}

/// Catalog of the standard widget set, built as [`Widget`]s named by their
/// simple type name
pub fn standard_catalog() -> TypeCatalog {
    let mut catalog = TypeCatalog::new();
    for &(name, shape, profile, context_only) in STANDARD_TYPES {
        let simple = name.rsplit('.').next().unwrap_or(name);
        let constructor = if context_only {
            Constructor::with_context(move |_| Ok(Box::new(widget(simple, shape, profile)) as Box<dyn Element>))
        } else {
            Constructor::with_context_and_attributes(move |_, _| {
                Ok(Box::new(widget(simple, shape, profile)) as Box<dyn Element>)
            })
        };
        catalog.insert(TypeDescriptor::new(name).constructor(constructor));
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::BuildContext;
    use crate::factory::TypeResolver;
    use crate::tree::Attributes;

    #[test]
    fn test_standard_types_build() {
        let catalog = standard_catalog();
        assert_eq!(catalog.len(), STANDARD_TYPES.len());

        let build = catalog
            .resolve("android.widget.ScrollView")
            .and_then(|d| d.select_builder())
            .unwrap();
        let element = build(&BuildContext::default(), &Attributes::new()).unwrap();
        assert_eq!(element.type_name(), "ScrollView");
        assert!(element.is_container());
    }

    #[test]
    fn test_context_only_types_resolve() {
        let catalog = standard_catalog();
        let descriptor = catalog.resolve("android.webkit.WebView").unwrap();
        assert_eq!(descriptor.constructors()[0].signature(), "(Context)");
        assert!(descriptor.select_builder().is_some());
    }
}
