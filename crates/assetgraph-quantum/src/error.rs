use assetgraph_reflect::{Identifier, ObjectHandle, ReflectError};

pub type Result<T> = std::result::Result<T, GraphError>;

/// Failures of the property-graph layer.
///
/// Every variant is a contract violation by the caller or corrupted data;
/// there is nothing transient to retry. A missing base/derived counterpart is
/// not an error and is reported as `None` by the registry instead.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A required node, path or graph argument is missing or belongs to a
    /// different graph instance.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The live graph does not have the shape a path step expects, which
    /// means the path was produced against another version of the graph.
    #[error("structural mismatch at `{path}`: {message}")]
    StructuralMismatch { path: String, message: String },

    #[error("unrecognized path step `{0}`")]
    UnrecognizedStep(String),

    #[error("identifier {id} is carried by both {first} and {second}")]
    IdentifierCollision {
        id: Identifier,
        first: ObjectHandle,
        second: ObjectHandle,
    },

    #[error("traversal exceeded the maximum depth of {0}")]
    DepthExceeded(usize),

    #[error(transparent)]
    Reflect(#[from] ReflectError),
}

impl GraphError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        GraphError::InvalidArgument(message.into())
    }

    pub(crate) fn mismatch(path: impl ToString, message: impl Into<String>) -> Self {
        GraphError::StructuralMismatch {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
