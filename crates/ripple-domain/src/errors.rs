//! Domain errors and the engine-wide error code catalogue

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error codes surfaced to callers and recorded on degraded analyses.
///
/// The string forms are part of the public contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The inbound event could not be normalized
    MalformedEvent,
    /// The graph store could not answer a dependency query
    DependencyLookupFailed,
    /// Consumer discovery finished with at least one repository unsearched
    SearchIncomplete,
    /// The semantic advisor failed after its retry
    SemanticAdvisorDegraded,
    /// A computed risk score left its band before clamping
    ScoreOutOfRange,
    /// The graph store is unreachable
    GraphUnavailable,
}

impl ErrorCode {
    /// Get the wire representation of this code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MalformedEvent => "MALFORMED_EVENT",
            ErrorCode::DependencyLookupFailed => "DEPENDENCY_LOOKUP_FAILED",
            ErrorCode::SearchIncomplete => "SEARCH_INCOMPLETE",
            ErrorCode::SemanticAdvisorDegraded => "SEMANTIC_ADVISOR_DEGRADED",
            ErrorCode::ScoreOutOfRange => "SCORE_OUT_OF_RANGE",
            ErrorCode::GraphUnavailable => "GRAPH_UNAVAILABLE",
        }
    }

    /// Whether a caller may resubmit the same event after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::DependencyLookupFailed | ErrorCode::GraphUnavailable
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while constructing or validating domain values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid entity reference: {reason}")]
    InvalidEntityRef { reason: String },

    #[error("Invalid API spec: {reason}")]
    InvalidApiSpec { reason: String },

    #[error("Validation error: {field} - {reason}")]
    ValidationError { field: String, reason: String },
}

impl DomainError {
    /// Create a validation error for a named field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
