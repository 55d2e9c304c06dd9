//! Type Catalog
//!
//! Static registry of constructible element types, keyed by fully qualified
//! name. Each type lists the constructor shapes it offers; the factory picks
//! one. This stands in for runtime type lookup: hosts fill a catalog at
//! startup instead of reflecting over classes.

use crate::element::{BuildContext, Element};
use crate::error::BoxError;
use crate::tree::Attributes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builder taking the construction context only
pub type ContextFn = dyn Fn(&BuildContext) -> Result<Box<dyn Element>, BoxError> + Send + Sync;

/// Builder taking the construction context and the node's attributes
pub type BuildFn = dyn Fn(&BuildContext, &Attributes) -> Result<Box<dyn Element>, BoxError> + Send + Sync;

/// One way to construct a type
#[derive(Clone)]
pub enum Constructor {
    WithContext(Arc<ContextFn>),
    WithContextAndAttributes(Arc<BuildFn>),
    /// Any other parameter list; never selected
    Other { params: Vec<String> },
}

impl Constructor {
    pub fn with_context<F>(f: F) -> Self
    where
        F: Fn(&BuildContext) -> Result<Box<dyn Element>, BoxError> + Send + Sync + 'static,
    {
        Constructor::WithContext(Arc::new(f))
    }

    pub fn with_context_and_attributes<F>(f: F) -> Self
    where
        F: Fn(&BuildContext, &Attributes) -> Result<Box<dyn Element>, BoxError> + Send + Sync + 'static,
    {
        Constructor::WithContextAndAttributes(Arc::new(f))
    }

    /// Short description of the parameter list
    pub fn signature(&self) -> String {
        match self {
            Constructor::WithContext(_) => "(Context)".to_string(),
            Constructor::WithContextAndAttributes(_) => "(Context, AttributeSet)".to_string(),
            Constructor::Other { params } => format!("({})", params.join(", ")),
        }
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constructor{}", self.signature())
    }
}

/// A constructible type and its constructor shapes
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: String,
    constructors: Vec<Constructor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        TypeDescriptor {
            name: name.into(),
            constructors: Vec::new(),
        }
    }

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// The builder the factory should cache: the two-argument shape if
    /// offered, else the context-only shape adapted to ignore attributes.
    pub fn select_builder(&self) -> Option<Arc<BuildFn>> {
        let with_attrs = self.constructors.iter().find_map(|c| match c {
            Constructor::WithContextAndAttributes(f) => Some(Arc::clone(f)),
            _ => None,
        });
        if with_attrs.is_some() {
            return with_attrs;
        }

        self.constructors.iter().find_map(|c| match c {
            Constructor::WithContext(f) => {
                let f = Arc::clone(f);
                let adapted: Arc<BuildFn> = Arc::new(move |ctx: &BuildContext, _: &Attributes| f(ctx));
                Some(adapted)
            }
            _ => None,
        })
    }
}

/// Dynamic type lookup by fully qualified name
pub trait TypeResolver: Send + Sync {
    fn resolve(&self, qualified_name: &str) -> Option<TypeDescriptor>;
}

/// Map-backed resolver filled at startup
#[derive(Debug, Default, Clone)]
pub struct TypeCatalog {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a type
    pub fn insert(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, descriptor: TypeDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.types.contains_key(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl TypeResolver for TypeCatalog {
    fn resolve(&self, qualified_name: &str) -> Option<TypeDescriptor> {
        self.types.get(qualified_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Widget;

    fn widget(_ctx: &BuildContext) -> Result<Box<dyn Element>, BoxError> {
        Ok(Box::new(Widget::leaf("Plain")))
    }

    #[test]
    fn test_prefers_two_argument_constructor() {
        let descriptor = TypeDescriptor::new("x.Both")
            .constructor(Constructor::with_context(widget))
            .constructor(Constructor::with_context_and_attributes(|_, attrs| {
                let mut w = Widget::leaf("WithAttrs");
                w.set_tag(attrs.len().to_string());
                Ok(Box::new(w) as Box<dyn Element>)
            }));
        let build = descriptor.select_builder().unwrap();
        let attrs: Attributes = [("a", "1"), ("b", "2")].into_iter().collect();
        let element = build(&BuildContext::default(), &attrs).unwrap();
        assert_eq!(element.type_name(), "WithAttrs");
    }

    #[test]
    fn test_context_only_is_adapted() {
        let descriptor = TypeDescriptor::new("x.Ctx").constructor(Constructor::with_context(widget));
        let build = descriptor.select_builder().unwrap();
        let element = build(&BuildContext::default(), &Attributes::new()).unwrap();
        assert_eq!(element.type_name(), "Plain");
    }

    #[test]
    fn test_other_shapes_unusable() {
        let descriptor = TypeDescriptor::new("x.Odd").constructor(Constructor::Other {
            params: vec!["int".into(), "String".into()],
        });
        assert!(descriptor.select_builder().is_none());
        assert_eq!(descriptor.constructors()[0].signature(), "(int, String)");
    }

    #[test]
    fn test_catalog_resolves_exact_names() {
        let catalog = TypeCatalog::new().with(TypeDescriptor::new("android.widget.TextView"));
        assert!(catalog.resolve("android.widget.TextView").is_some());
        assert!(catalog.resolve("TextView").is_none());
        assert_eq!(catalog.len(), 1);
    }
}
