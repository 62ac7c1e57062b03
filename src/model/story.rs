use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::link::RemoteLink;

/// A VersionOne work item read through its type name and attribute names,
/// whatever its concrete asset type.
pub trait StorySource {
    fn type_name(&self) -> &str;
    /// `None` when the asset has no such attribute.
    fn get_field(&self, name: &str) -> Option<&Value>;
}

/// A VersionOne asset (Story, Defect, ...) as returned by a select query.
#[derive(Debug, Clone, PartialEq)]
pub struct V1Story {
    /// Asset OID, e.g. `Story:1234`.
    pub oid: String,
    pub type_name: String,
    pub attributes: Map<String, Value>,
    pub links: Vec<RemoteLink>,
    pub url: String,
    pending: BTreeMap<String, Value>,
}

impl V1Story {
    pub fn new(oid: impl Into<String>, type_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            type_name: type_name.into(),
            attributes: Map::new(),
            links: Vec::new(),
            url: url.into(),
            pending: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    #[cfg(test)]
    pub fn with_link(mut self, title: &str, url: &str) -> Self {
        self.links.push(RemoteLink::new(title, url));
        self
    }

    /// Numeric part of the OID, used in REST paths.
    pub fn id(&self) -> &str {
        self.oid
            .split_once(':')
            .map(|(_, id)| id)
            .unwrap_or(self.oid.as_str())
    }

    /// Record an attribute write. Nothing reaches VersionOne until the
    /// story is committed.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        self.attributes.insert(name.to_string(), value.clone());
        self.pending.insert(name.to_string(), value);
    }

    pub fn pending(&self) -> &BTreeMap<String, Value> {
        &self.pending
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }
}

impl StorySource for V1Story {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn get_field(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Type-agnostic view of a story: normalized field name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    fields: BTreeMap<String, Value>,
}

impl NormalizedRecord {
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The field rendered as text; `None` for null, missing or blank values.
    pub fn text(&self, name: &str) -> Option<String> {
        let text = match self.fields.get(name)? {
            Value::Null => return None,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}
