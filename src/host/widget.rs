//! Headless widget: a property bag with optional children

use crate::attrs::Value;
use crate::element::Element;
use crate::error::{ContainmentError, PropertyError};
use std::any::Any;

/// Which property families a widget understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Accepts any property
    Generic,
    Text,
    Checkable,
    Image,
    Linear,
}

impl Profile {
    pub fn supports(self, property: &str) -> bool {
        match property {
            "text" | "value" | "textSize" | "textColor" | "hint" | "maxLines" | "textStyle" => {
                matches!(self, Profile::Generic | Profile::Text | Profile::Checkable)
            }
            "checked" => matches!(self, Profile::Generic | Profile::Checkable),
            "src" | "scaleType" => matches!(self, Profile::Generic | Profile::Image),
            "orientation" => matches!(self, Profile::Generic | Profile::Linear),
            _ => true,
        }
    }
}

/// In-memory element for tests and non-graphical hosts
#[derive(Debug)]
pub struct Widget {
    type_name: String,
    profile: Profile,
    properties: Vec<(String, Value)>,
    history: Vec<String>,
    children: Option<Vec<Box<dyn Element>>>,
    max_children: Option<usize>,
}

impl Widget {
    /// Childless widget accepting any property
    pub fn leaf(type_name: impl Into<String>) -> Self {
        Self::build(type_name.into(), Profile::Generic, None)
    }

    /// Container accepting any property and any number of children
    pub fn container(type_name: impl Into<String>) -> Self {
        Self::build(type_name.into(), Profile::Generic, Some(Vec::new()))
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Limit a container's children; further appends are refused
    pub fn with_max_children(mut self, max: usize) -> Self {
        self.max_children = Some(max);
        self
    }

    fn build(type_name: String, profile: Profile, children: Option<Vec<Box<dyn Element>>>) -> Self {
        Widget {
            type_name,
            profile,
            properties: Vec::new(),
            history: Vec::new(),
            children,
            max_children: None,
        }
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.store("tag", Value::String(tag.into()));
    }

    pub fn tag(&self) -> Option<&str> {
        self.property("tag").and_then(Value::as_str)
    }

    /// Property names in the order they were written, repeats included
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn store(&mut self, name: &str, value: Value) {
        self.history.push(name.to_string());
        match self.properties.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((name.to_string(), value)),
        }
    }
}

impl Element for Widget {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), PropertyError> {
        if !self.profile.supports(name) {
            return Err(PropertyError::Unsupported {
                element: self.type_name.clone(),
                name: name.to_string(),
            });
        }
        self.store(name, value);
        Ok(())
    }

    fn property(&self, name: &str) -> Option<&Value> {
        self.properties.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    fn is_container(&self) -> bool {
        self.children.is_some()
    }

    fn append_child(&mut self, child: Box<dyn Element>) -> Result<(), ContainmentError> {
        let Some(children) = self.children.as_mut() else {
            return Err(ContainmentError::NotAContainer {
                parent: self.type_name.clone(),
            });
        };
        if let Some(max) = self.max_children {
            if children.len() >= max {
                return Err(ContainmentError::Refused {
                    parent: self.type_name.clone(),
                    child: child.type_name().to_string(),
                    reason: format!("holds at most {} children", max),
                });
            }
        }
        children.push(child);
        Ok(())
    }

    fn child_count(&self) -> usize {
        self.children.as_ref().map_or(0, Vec::len)
    }

    fn child(&self, index: usize) -> Option<&dyn Element> {
        let child = self.children.as_ref()?.get(index)?;
        Some(child.as_ref())
    }

    fn child_mut(&mut self, index: usize) -> Option<&mut dyn Element> {
        let child = self.children.as_mut()?.get_mut(index)?;
        Some(child.as_mut())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
