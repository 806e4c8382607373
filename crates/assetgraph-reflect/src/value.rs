//! Slot values, keys and indices.

use crate::ids::Identifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arena address of an object inside one `ObjectGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectHandle(u32);

impl ObjectHandle {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The content of a member, item or dictionary value slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Edge to another object in the same graph.
    Object(ObjectHandle),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<ObjectHandle> {
        match self {
            Value::Object(handle) => Some(*handle),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<ObjectHandle> for Value {
    fn from(value: ObjectHandle) -> Self {
        Value::Object(value)
    }
}

/// Dictionary key, or the identity of a set element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Bool(bool),
    Int(i64),
    Str(String),
    Id(Identifier),
    Object(ObjectHandle),
}

impl Key {
    /// Key under which a set stores `value`. `Null` and floats have none.
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::Int(i) => Some(Key::Int(*i)),
            Value::Str(s) => Some(Key::Str(s.clone())),
            Value::Object(h) => Some(Key::Object(*h)),
            Value::Null | Value::Float(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Bool(b) => write!(f, "{b}"),
            Key::Int(i) => write!(f, "{i}"),
            Key::Str(s) => write!(f, "\"{s}\""),
            Key::Id(id) => write!(f, "{{{id}}}"),
            Key::Object(h) => write!(f, "{h}"),
        }
    }
}

/// Position of an item inside a container.
///
/// Collections and arrays are addressed by `Position`, dictionaries and sets
/// by `Key`. `Empty` addresses nothing and only appears on non-container
/// references.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Index {
    Empty,
    Position(usize),
    Key(Key),
}

impl Index {
    pub fn is_empty(&self) -> bool {
        matches!(self, Index::Empty)
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            Index::Position(p) => Some(*p),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&Key> {
        match self {
            Index::Key(k) => Some(k),
            _ => None,
        }
    }
}

impl From<usize> for Index {
    fn from(value: usize) -> Self {
        Index::Position(value)
    }
}

impl From<Key> for Index {
    fn from(value: Key) -> Self {
        Index::Key(value)
    }
}

/// Bracketed form: `[3]` for positions, `[=key]` for keys, `[]` for empty.
impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::Empty => write!(f, "[]"),
            Index::Position(p) => write!(f, "[{p}]"),
            Index::Key(k) => write!(f, "[={k}]"),
        }
    }
}
