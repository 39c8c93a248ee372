//! Error type for path mapping and containment.

use std::path::PathBuf;

/// Errors raised by [`map_path`](crate::map_path) and
/// [`contained_join`](crate::contained_join).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The mapper was handed a path with no usable segments.
    #[error("invalid input path {path:?}: {reason}")]
    InvalidInput { path: String, reason: &'static str },

    /// A relative path resolved outside the root it was joined onto.
    #[error("path {path:?} escapes root {root:?}")]
    EscapesRoot { root: PathBuf, path: PathBuf },
}

/// Convenience alias for this crate.
pub type Result<T> = std::result::Result<T, PathError>;

impl PathError {
    pub(crate) fn invalid(path: &str, reason: &'static str) -> Self {
        Self::InvalidInput {
            path: path.to_string(),
            reason,
        }
    }
}
