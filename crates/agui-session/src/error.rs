use thiserror::Error;

/// Reasons a state delta is rejected. Any of them rejects the whole delta.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("Patch path targets the document root: {0:?}")]
    RootPath(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Cannot descend into a non-container value at {0}")]
    NotAContainer(String),

    #[error("Invalid array index {index:?} in {path}")]
    InvalidIndex { path: String, index: String },

    #[error("Array index {index} out of bounds (len {len}) in {path}")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Malformed patch operation at {position}: {reason}")]
    MalformedOp { position: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, PatchError>;
