//! Error types for vectorboard.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, VectorboardError>;

/// Errors that can occur while building or running a grid search.
#[derive(Error, Debug)]
pub enum VectorboardError {
    /// A required parameter is absent from the grid.
    #[error("param_grid must contain {0}")]
    MissingGridKey(&'static str),

    /// The grid is present but one of its values is unusable.
    #[error("Invalid parameter grid: {0}")]
    InvalidGrid(String),

    /// Neither a document list nor a loader was supplied.
    #[error("Either documents or loader must be provided")]
    MissingDocuments,

    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A document could not be loaded.
    #[error("Document error: {0}")]
    Document(String),

    /// Index file does not exist.
    #[error("Index file not found at '{0}'")]
    IndexNotFound(PathBuf),

    /// Configuration file or value error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// Embedding backend error.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Dashboard failed to bind its listener.
    #[error("Failed to bind dashboard on {0}: {1}")]
    Bind(String, #[source] std::io::Error),

    /// Dashboard server failure after startup.
    #[error("Dashboard error: {0}")]
    Dashboard(String),

    /// Operation called in the wrong lifecycle phase.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl VectorboardError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was raised while validating setup, before any experiment ran.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingGridKey(_) | Self::InvalidGrid(_) | Self::MissingDocuments | Self::Config(_)
        )
    }
}

impl From<reqwest::Error> for VectorboardError {
    fn from(err: reqwest::Error) -> Self {
        VectorboardError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for VectorboardError {
    fn from(err: serde_json::Error) -> Self {
        VectorboardError::LlmParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_message_names_key() {
        let err = VectorboardError::MissingGridKey("chunk_size");
        assert_eq!(err.to_string(), "param_grid must contain chunk_size");
        assert!(err.is_config_error());
    }

    #[test]
    fn test_delegated_errors_are_not_config_errors() {
        assert!(!VectorboardError::Http("timeout".into()).is_config_error());
        assert!(!VectorboardError::Embedding("bad".into()).is_config_error());
        assert!(VectorboardError::MissingDocuments.is_config_error());
    }
}
