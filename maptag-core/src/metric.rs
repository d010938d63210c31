//! Metric record model
//!
//! A metric carries string tags (mutable, enrichment adds to them) and an
//! ordered namespace. Namespace elements are either static (empty name, fixed
//! value) or dynamic (named, value filled in per measurement).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One element of a metric namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceElement {
    /// Element value
    pub value: String,

    /// Element name, empty for static elements
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl NamespaceElement {
    /// A static element
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            ..Default::default()
        }
    }

    /// A dynamic element; its value starts as `"*"` until filled in
    pub fn dynamic(name: &str, description: &str) -> Self {
        Self {
            value: "*".to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    /// Whether this element is dynamic
    pub fn is_dynamic(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Ordered metric namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(Vec<NamespaceElement>);

impl Namespace {
    /// Build a namespace of static elements
    pub fn new(values: &[&str]) -> Self {
        Self(values.iter().map(|v| NamespaceElement::new(v)).collect())
    }

    /// Append a dynamic element
    pub fn add_dynamic_element(mut self, name: &str, description: &str) -> Self {
        self.0.push(NamespaceElement::dynamic(name, description));
        self
    }

    /// Append static elements
    pub fn add_static_elements(mut self, values: &[&str]) -> Self {
        self.0.extend(values.iter().map(|v| NamespaceElement::new(v)));
        self
    }

    /// Element values in order
    pub fn strings(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.value.as_str()).collect()
    }

    /// Iterate over elements
    pub fn iter(&self) -> std::slice::Iter<'_, NamespaceElement> {
        self.0.iter()
    }

    /// Mutable access to one element
    pub fn get_mut(&mut self, index: usize) -> Option<&mut NamespaceElement> {
        self.0.get_mut(index)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the namespace has no elements
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Namespace {
    type Item = &'a NamespaceElement;
    type IntoIter = std::slice::Iter<'a, NamespaceElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<NamespaceElement>> for Namespace {
    fn from(elements: Vec<NamespaceElement>) -> Self {
        Self(elements)
    }
}

impl std::ops::Index<usize> for Namespace {
    type Output = NamespaceElement;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// A single measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Where the measurement lives
    pub namespace: Namespace,

    /// Measured value
    #[serde(default)]
    pub data: serde_json::Value,

    /// Descriptive tags
    #[serde(default)]
    pub tags: HashMap<String, String>,

    /// Unit of measure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// When the measurement was taken
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    /// Create a metric with no tags, null data and the current time
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            data: serde_json::Value::Null,
            tags: HashMap::new(),
            unit: None,
            timestamp: Utc::now(),
        }
    }

    /// Set the measured value
    pub fn with_data(mut self, data: impl Into<serde_json::Value>) -> Self {
        self.data = data.into();
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Tag value, if present
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}
