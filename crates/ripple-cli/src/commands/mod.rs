// Command handlers for the ripple CLI

pub mod analyze;
pub mod classify;
pub mod graph;

pub use analyze::AnalyzeCommand;
pub use classify::ClassifyCommand;
pub use graph::GraphCommand;

use std::path::Path;

use serde::Serialize;

use crate::error::{CliError, Result};

/// Trait for command handlers
#[async_trait::async_trait]
pub trait Command: Send + Sync {
    /// Execute the command, printing its result to stdout
    async fn execute(&self) -> Result<()>;
}

pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| CliError::io(path.display().to_string(), e))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
