use crate::graph::ShapeKind;
use crate::value::{Index, Key, ObjectHandle};

pub type Result<T> = std::result::Result<T, ReflectError>;

/// Errors raised by structural queries and edits on an `ObjectGraph`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReflectError {
    #[error("unknown object handle {0}")]
    UnknownHandle(ObjectHandle),

    #[error("object {handle} has no member `{member}`")]
    UnknownMember { handle: ObjectHandle, member: String },

    #[error("object {handle} is a {actual}, expected {expected}")]
    ShapeMismatch {
        handle: ObjectHandle,
        expected: &'static str,
        actual: ShapeKind,
    },

    #[error("index {index} is not valid for object {handle}")]
    IndexOutOfRange { handle: ObjectHandle, index: Index },

    #[error("key {key} already present in object {handle}")]
    DuplicateKey { handle: ObjectHandle, key: Key },

    #[error("value cannot be used as a set or dictionary key")]
    UnkeyableValue,

    #[error("{0} does not support item identifiers")]
    ItemIdsUnsupported(ShapeKind),
}
