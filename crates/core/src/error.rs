//! Error types for rasterfn

use thiserror::Error;

/// Main error type for raster function operations.
///
/// The first five variants mirror the failure taxonomy of the plugin
/// contract. Binding, compatibility and license failures abort a session
/// before any tile is requested; kernel failures only ever affect one tile.
#[derive(Error, Debug)]
pub enum Error {
    #[error("binding failed for parameter `{name}`: {reason}")]
    Binding { name: String, reason: String },

    #[error("incompatible input: {0}")]
    Compatibility(String),

    #[error("key metadata error: {0}")]
    Metadata(String),

    #[error("kernel error: {0}")]
    Kernel(String),

    #[error("not licensed: {0}")]
    License(String),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("Block size mismatch: expected {expected:?}, got {actual:?}")]
    SizeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a binding failure on `name`.
    pub fn binding(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Binding {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error ends the session rather than a single tile.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Binding { .. } | Error::Compatibility(_) | Error::License(_) | Error::Json(_)
        )
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(e: ndarray::ShapeError) -> Self {
        Error::Other(e.to_string())
    }
}

/// Result type alias for raster function operations
pub type Result<T> = std::result::Result<T, Error>;
