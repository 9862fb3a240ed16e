//! Nested typed documents produced from one input row.
//!
//! A [`Document`] is either a [`Scalar`] or an [`Object`]. Objects are backed
//! by a `BTreeMap`, so two objects holding the same key/value pairs compare
//! and hash identically no matter which order their keys were inserted in.
//! Keys are interned `Arc<str>` handles shared with the compiled schema.

use std::{
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

pub type Key = Arc<str>;
pub type Object = BTreeMap<Key, Document>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Scalar {
    String(String),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Bool(bool),
    Float32(f32),
}

impl Scalar {
    /// True when the value equals the zero value of its type.
    pub fn is_zero(&self) -> bool {
        match self {
            Scalar::String(s) => s.is_empty(),
            Scalar::Int32(v) => *v == 0,
            Scalar::Uint32(v) => *v == 0,
            Scalar::Int64(v) => *v == 0,
            Scalar::Uint64(v) => *v == 0,
            Scalar::Bool(v) => !*v,
            Scalar::Float32(v) => *v == 0.0,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Scalar::String(s) => JsonValue::String(s.clone()),
            Scalar::Int32(v) => JsonValue::from(*v),
            Scalar::Uint32(v) => JsonValue::from(*v),
            Scalar::Int64(v) => JsonValue::from(*v),
            Scalar::Uint64(v) => JsonValue::from(*v),
            Scalar::Bool(v) => JsonValue::Bool(*v),
            // Go through the shortest decimal form so 0.1f32 renders as 0.1.
            Scalar::Float32(v) => v
                .to_string()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::String(a), Scalar::String(b)) => a == b,
            (Scalar::Int32(a), Scalar::Int32(b)) => a == b,
            (Scalar::Uint32(a), Scalar::Uint32(b)) => a == b,
            (Scalar::Int64(a), Scalar::Int64(b)) => a == b,
            (Scalar::Uint64(a), Scalar::Uint64(b)) => a == b,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Float32(a), Scalar::Float32(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

// Floats compare by bit pattern, which keeps Eq and Hash consistent.
impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Scalar::String(s) => s.hash(state),
            Scalar::Int32(v) => v.hash(state),
            Scalar::Uint32(v) => v.hash(state),
            Scalar::Int64(v) => v.hash(state),
            Scalar::Uint64(v) => v.hash(state),
            Scalar::Bool(v) => v.hash(state),
            Scalar::Float32(v) => v.to_bits().hash(state),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => write!(f, "{s}"),
            Scalar::Int32(v) => write!(f, "{v}"),
            Scalar::Uint32(v) => write!(f, "{v}"),
            Scalar::Int64(v) => write!(f, "{v}"),
            Scalar::Uint64(v) => write!(f, "{v}"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Float32(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Document {
    Scalar(Scalar),
    Object(Object),
}

impl From<Scalar> for Document {
    fn from(value: Scalar) -> Self {
        Document::Scalar(value)
    }
}

impl From<Object> for Document {
    fn from(value: Object) -> Self {
        Document::Object(value)
    }
}

impl Document {
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Document::Object(map) => Some(map),
            Document::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Document::Scalar(value) => Some(value),
            Document::Object(_) => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Document::Object(_))
    }

    pub fn get(&self, key: &str) -> Option<&Document> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Follows a dotted path such as `location.country.iso`.
    pub fn get_path(&self, path: &str) -> Option<&Document> {
        path.split('.')
            .try_fold(self, |node, segment| node.get(segment))
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Document::Scalar(value) => value.to_json(),
            Document::Object(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| (key.to_string(), value.to_json()))
                    .collect::<JsonMap<_, _>>(),
            ),
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
