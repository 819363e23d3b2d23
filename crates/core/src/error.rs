//! Error types for path parsing and evaluation.

/// Result type for path operations.
pub type PathResult<T> = Result<T, PathError>;

/// Errors raised by the path parser and evaluator.
///
/// The `at` fields hold the rendered path prefix of the node where the
/// walk stopped (empty for the root).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Malformed path syntax.
    #[error("invalid path at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// An object has no entry for the requested key.
    #[error("key not found: '{key}' at '{at}'")]
    KeyNotFound { key: String, at: String },

    /// An array index is outside the array bounds.
    #[error("index {index} out of range for array of length {len} at '{at}'")]
    IndexOutOfRange { index: i64, len: usize, at: String },

    /// The path component does not fit the node kind.
    #[error("type mismatch at '{at}': expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
        at: String,
    },

    /// A wildcard appeared in a write path.
    #[error("cannot set value with wildcard selector")]
    WildcardNotSettable,
}

impl PathError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }
}
