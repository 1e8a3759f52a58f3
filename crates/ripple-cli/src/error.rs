//! CLI errors

use ripple_analysis::AnalysisError;
use ripple_domain::RiskLevel;
use ripple_graph::GraphError;
use thiserror::Error;

/// Errors surfaced by `ripple` commands
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Risk level {level} reached the --fail-on threshold {threshold}")]
    RiskThreshold { level: RiskLevel, threshold: RiskLevel },
}

impl CliError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        CliError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        CliError::Io {
            path: path.into(),
            source,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!("Invalid argument: {}\n\nRun 'ripple --help' for usage information.", message)
            }
            CliError::Io { path, source } => format!("Cannot access {}: {}", path, source),
            CliError::Analysis(e @ AnalysisError::MalformedEvent(_)) => {
                format!("{}\n\nCheck the event file against the expected change event shape.", e)
            }
            CliError::Analysis(e @ AnalysisError::Configuration(_)) => {
                format!("{}\n\nCheck .ripple/config.yaml and RIPPLE_* environment variables.", e)
            }
            CliError::Analysis(e) if e.is_retryable() => {
                format!("{}\n\nThe analysis can be retried.", e)
            }
            CliError::Analysis(e) => e.to_string(),
            CliError::Graph(e) => format!("Graph error: {}\n\nCheck the --edges file.", e),
            CliError::Serialization(e) => format!("Failed to render output: {}", e),
            CliError::RiskThreshold { .. } => self.to_string(),
        }
    }

    /// Get technical details for verbose mode
    pub fn technical_details(&self) -> String {
        format!("{:?}", self)
    }

    /// Process exit code; 2 is reserved for a risk threshold hit
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::RiskThreshold { .. } => 2,
            CliError::Analysis(e) if e.is_retryable() => 75,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
