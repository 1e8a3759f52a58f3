//! Error types for the graph gateway

use ripple_domain::ErrorCode;
use thiserror::Error;

/// Errors that can occur while querying or writing the dependency graph
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Graph store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid edge list: {0}")]
    InvalidEdgeList(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(String),
}

impl GraphError {
    /// Create an unavailability error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        GraphError::Unavailable(msg.into())
    }

    /// Error code surfaced to callers, if this error has one
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            GraphError::Unavailable(_) => Some(ErrorCode::GraphUnavailable),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for GraphError {
    fn from(err: serde_yaml::Error) -> Self {
        GraphError::YamlError(err.to_string())
    }
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
