//! Ordered Attribute Map
//!
//! Attribute names are unique and keep insertion order. Layout documents carry
//! a handful of attributes per element, so a flat vector beats hashing.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Insertion-ordered map of attribute name to value.
///
/// An attribute may be present with a `null` value, which only the JSON form
/// can express. [`get`](Self::get) and [`iter`](Self::iter) see values only;
/// [`entries`](Self::entries) sees nulls too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Attributes {
    entries: Vec<(String, Option<String>)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Attributes {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Insert an attribute. An existing name keeps its position and takes the
    /// new value; the old value is returned.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.set(name.into(), Some(value.into()))
    }

    /// Mark an attribute present-but-null
    pub fn insert_null(&mut self, name: impl Into<String>) -> Option<String> {
        self.set(name.into(), None)
    }

    fn set(&mut self, name: String, value: Option<String>) -> Option<String> {
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            return std::mem::replace(&mut slot.1, value);
        }
        self.entries.push((name, value));
        None
    }

    /// Get an attribute value by name. Null attributes have no value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Present, with or without a value
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn is_null(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, v)| n == name && v.is_none())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attributes with a value, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(n, v)| v.as_deref().map(|v| (n.as_str(), v)))
    }

    /// Every attribute in insertion order, nulls as `None`
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    /// Attribute names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AttributesVisitor)
    }
}

struct AttributesVisitor;

impl<'de> Visitor<'de> for AttributesVisitor {
    type Value = Attributes;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of attribute names to string or null values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Attributes, A::Error> {
        let mut attrs = Attributes::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, value)) = access.next_entry::<String, Option<String>>()? {
            attrs.set(name, value);
        }
        Ok(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order() {
        let mut attrs = Attributes::new();
        attrs.insert("id", "r1");
        attrs.insert("orientation", "vertical");
        attrs.insert("background", "#fff");
        let names: Vec<_> = attrs.names().collect();
        assert_eq!(names, ["id", "orientation", "background"]);
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let mut attrs = Attributes::new();
        attrs.insert("text", "a");
        attrs.insert("id", "x");
        assert_eq!(attrs.insert("text", "b"), Some("a".to_string()));
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.iter().next(), Some(("text", "b")));
    }

    #[test]
    fn test_json_null_is_kept() {
        let attrs: Attributes = serde_json::from_str(r#"{"id":"a","text":null}"#).unwrap();
        assert_eq!(attrs.get("id"), Some("a"));
        assert!(attrs.contains("text"));
        assert!(attrs.is_null("text"));
        assert_eq!(attrs.get("text"), None);
        assert_eq!(attrs.iter().count(), 1);
        assert_eq!(serde_json::to_string(&attrs).unwrap(), r#"{"id":"a","text":null}"#);

        let mut built = Attributes::new();
        built.insert("id", "a");
        built.insert_null("text");
        assert_eq!(built, attrs);
    }

    #[test]
    fn test_serialize_preserves_order() {
        let attrs: Attributes = [("z", "1"), ("a", "2")].into_iter().collect();
        assert_eq!(serde_json::to_string(&attrs).unwrap(), r#"{"z":"1","a":"2"}"#);
    }
}
