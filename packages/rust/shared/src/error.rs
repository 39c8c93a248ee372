//! Error types for site2skill.
//!
//! Library crates use [`Site2SkillError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use site2skill_paths::PathError;

/// Top-level error type for all site2skill operations.
#[derive(Debug, thiserror::Error)]
pub enum Site2SkillError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Site mirroring failed (tool missing, nothing downloaded, ...).
    #[error("fetch error: {0}")]
    Fetch(String),

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Skill bundle failed validation.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Archive creation error.
    #[error("package error: {0}")]
    Package(String),

    /// Two crawled files mapped to the same output path and the run was
    /// configured to fail instead of overwrite.
    #[error("output collision at {path}")]
    Collision { path: String },

    /// Path mapping or containment error.
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, Site2SkillError>;

impl Site2SkillError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
