//! Tag metadata attached to example groups and examples.
//!
//! Tags are free-form `name => value` pairs. Filters and hook criteria are matched against them by
//! equality, so values are kept to a small comparable set.

use std::collections::BTreeMap;
use std::fmt;

/// A single tag value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Int(i) => write!(f, "{}", i),
            MetadataValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        MetadataValue::Int(i64::from(value))
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Str(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Str(value)
    }
}

/// Ordered tag map of a group or example.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    tags: BTreeMap<String, MetadataValue>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tag.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<MetadataValue>) {
        self.tags.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&MetadataValue> {
        self.tags.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.tags.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<MetadataValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (name, value) in iter {
            metadata.insert(name, value);
        }
        metadata
    }
}
