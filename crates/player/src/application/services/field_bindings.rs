//! Field bindings - presentation fields mapped onto record paths
//!
//! A binding pairs a dotted record path with a live value source and a
//! coercion. Bindings are registered once and read on every save; they are
//! never persisted.

use std::fmt;
use std::sync::Arc;

use duality_domain::{deep_merge, FieldPath, Hope, Tracker};
use serde::Serialize;
use serde_json::{Map, Value};

/// Reads the raw value of a presentation field.
pub type ValueSource = Box<dyn Fn() -> Value + Send + Sync>;

/// Reads out-of-band tracker state.
pub type TrackerSource = Box<dyn Fn() -> TrackerSnapshot + Send + Sync>;

/// Conversion from a raw field value to the stored value
#[derive(Clone)]
pub enum Coercion {
    /// Strings as-is; numbers and booleans rendered as text.
    Text,
    /// Like `Text`, with surrounding whitespace removed.
    Trimmed,
    /// Leading integer of the text; anything unparseable becomes 0.
    Integer,
    Boolean,
    /// Text parsed as JSON; unparseable text is kept as a string.
    Json,
    Custom(Arc<dyn Fn(&Value) -> Value + Send + Sync>),
}

impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coercion::Text => write!(f, "Text"),
            Coercion::Trimmed => write!(f, "Trimmed"),
            Coercion::Integer => write!(f, "Integer"),
            Coercion::Boolean => write!(f, "Boolean"),
            Coercion::Json => write!(f, "Json"),
            Coercion::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Coercion {
    pub fn custom(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn apply(&self, path: &FieldPath, raw: &Value) -> Value {
        match self {
            Coercion::Text => Value::String(as_text(raw)),
            Coercion::Trimmed => Value::String(as_text(raw).trim().to_string()),
            Coercion::Integer => Value::from(as_integer(path, raw)),
            Coercion::Boolean => Value::Bool(as_bool(raw)),
            Coercion::Json => match raw {
                Value::String(text) => serde_json::from_str(text).unwrap_or_else(|e| {
                    tracing::warn!(path = %path.as_str(), error = %e, "Field is not valid JSON, keeping text");
                    raw.clone()
                }),
                other => other.clone(),
            },
            Coercion::Custom(f) => f(raw),
        }
    }
}

fn as_text(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Record integers are `i32`; out-of-range values saturate.
fn as_integer(path: &FieldPath, raw: &Value) -> i32 {
    let parsed = match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(text) => leading_integer(text),
        Value::Null => return 0,
        _ => None,
    };
    let Some(value) = parsed else {
        if !matches!(raw, Value::String(s) if s.trim().is_empty()) {
            tracing::warn!(path = %path.as_str(), raw = %raw, "Field is not an integer, using 0");
        }
        return 0;
    };
    let clamped = value.clamp(i64::from(i32::MIN), i64::from(i32::MAX));
    if clamped != value {
        tracing::warn!(path = %path.as_str(), value, "Integer out of range, clamping");
    }
    clamped as i32
}

/// Optional sign followed by digits, after leading whitespace.
fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() {
        return None;
    }
    // Only overflow can fail past this point.
    Some(digits.parse::<i64>().map_or(sign * i64::MAX, |n| sign * n))
}

fn as_bool(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "true" | "on" | "yes" | "1" | "checked"
        ),
        _ => false,
    }
}

/// Live tracker state held outside the bound fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerSnapshot {
    pub hp: Tracker,
    pub stress: Tracker,
    pub armor: Tracker,
    pub hope: Hope,
}

impl TrackerSnapshot {
    pub fn to_patch(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize tracker snapshot");
            Value::Object(Map::new())
        })
    }
}

pub struct FieldBinding {
    path: FieldPath,
    source: ValueSource,
    coercion: Coercion,
}

impl FieldBinding {
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn coercion(&self) -> &Coercion {
        &self.coercion
    }

    /// Current coerced value.
    pub fn read(&self) -> Value {
        self.coercion.apply(&self.path, &(self.source)())
    }
}

/// Registration table of bindings plus the tracker source
#[derive(Default)]
pub struct FieldBindings {
    bindings: Vec<FieldBinding>,
    trackers: Option<TrackerSource>,
}

impl FieldBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding. Re-binding a path replaces the earlier binding.
    pub fn bind(&mut self, path: FieldPath, source: ValueSource, coercion: Coercion) {
        self.bindings.retain(|b| b.path != path);
        self.bindings.push(FieldBinding {
            path,
            source,
            coercion,
        });
    }

    pub fn bind_trackers(&mut self, source: TrackerSource) {
        self.trackers = Some(source);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.bindings.iter().any(|b| b.path.as_str() == path)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.trackers.is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldBinding> {
        self.bindings.iter()
    }

    /// Read every binding and the tracker source into one patch document.
    pub fn collect_patch(&self) -> Value {
        let mut patch = Value::Object(Map::new());
        for binding in &self.bindings {
            binding.path.set(&mut patch, binding.read());
        }
        if let Some(trackers) = &self.trackers {
            deep_merge(&mut patch, &trackers().to_patch());
        }
        patch
    }
}
