//! Dotted field paths (`attributes.agility`) into a record document

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::parse("field path cannot be empty"));
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(DomainError::parse(format!(
                "field path '{}' has an empty segment",
                raw
            )));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Look the path up in a document.
    pub fn get<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(doc, |node, segment| node.as_object()?.get(segment))
    }

    /// Write `value` at the path, creating (or replacing non-object)
    /// intermediate nodes as objects.
    pub fn set(&self, doc: &mut Value, value: Value) {
        set_in(doc, &self.segments, value);
    }

    /// A minimal patch document holding only `value` at this path.
    pub fn to_patch(&self, value: Value) -> Value {
        let mut patch = Value::Object(Map::new());
        self.set(&mut patch, value);
        patch
    }
}

fn set_in(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        set_in(child, rest, value);
    } else {
        let mut child = Value::Null;
        set_in(&mut child, rest, value);
        let mut map = Map::new();
        map.insert(head.clone(), child);
        *node = Value::Object(map);
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for FieldPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
