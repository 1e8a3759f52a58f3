//! Error types for the analysis pipeline

use ripple_advisor::AdvisorError;
use ripple_discovery::DiscoveryError;
use ripple_domain::ErrorCode;
use ripple_graph::GraphError;
use thiserror::Error;
use uuid::Uuid;

/// Errors that abort an analysis or a query surface
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Dependency lookup failed for {entity}: {source}")]
    DependencyLookupFailed {
        entity: String,
        #[source]
        source: GraphError,
    },

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Analysis not found: {0}")]
    NotFound(Uuid),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(String),
}

impl AnalysisError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        AnalysisError::MalformedEvent(msg.into())
    }

    pub fn lookup_failed(entity: impl ToString, source: GraphError) -> Self {
        AnalysisError::DependencyLookupFailed {
            entity: entity.to_string(),
            source,
        }
    }

    /// Error code surfaced to callers, if this error has one
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AnalysisError::MalformedEvent(_) => Some(ErrorCode::MalformedEvent),
            AnalysisError::DependencyLookupFailed { .. } => Some(ErrorCode::DependencyLookupFailed),
            AnalysisError::Graph(err) => err.code(),
            _ => None,
        }
    }

    /// Whether resubmitting the same event may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalysisError::Cancelled => true,
            other => other.code().is_some_and(|code| code.is_retryable()),
        }
    }
}

impl From<serde_yaml::Error> for AnalysisError {
    fn from(err: serde_yaml::Error) -> Self {
        AnalysisError::YamlError(err.to_string())
    }
}

impl From<DiscoveryError> for AnalysisError {
    fn from(err: DiscoveryError) -> Self {
        AnalysisError::Configuration(format!("consumer discovery: {}", err))
    }
}

impl From<AdvisorError> for AnalysisError {
    fn from(err: AdvisorError) -> Self {
        AnalysisError::Configuration(format!("semantic advisor: {}", err))
    }
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
