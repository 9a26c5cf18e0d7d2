//! Clip catalog error types.

use thiserror::Error;

/// Errors that can occur while building the clip catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A clip key contains characters outside `[a-z0-9_-]`.
    #[error("invalid clip key: {0:?}")]
    InvalidKey(String),

    /// The same key was registered twice.
    #[error("duplicate clip key: {0}")]
    DuplicateKey(String),

    /// The catalog override file could not be read.
    #[error("failed to read catalog file: {0}")]
    Read(#[from] std::io::Error),

    /// The catalog override file is not valid JSON.
    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CatalogError {
    /// Returns true if this error came from the catalog file rather than its content.
    #[must_use]
    pub fn is_file_error(&self) -> bool {
        matches!(self, Self::Read(_) | Self::Parse(_))
    }
}
