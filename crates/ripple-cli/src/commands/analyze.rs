// Run the impact analysis pipeline on one event file

use std::path::PathBuf;
use std::sync::Arc;

use ripple_analysis::{AnalysisError, EngineConfig, ImpactEngine};
use ripple_domain::{Analysis, RiskLevel};
use ripple_graph::InMemoryGraphStore;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{print_json, read_file, Command};
use crate::error::{CliError, Result};

/// `ripple analyze`
#[derive(Debug, Clone)]
pub struct AnalyzeCommand {
    pub event: PathBuf,
    pub edges: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub save_edges: Option<PathBuf>,
    pub fail_on: Option<RiskLevel>,
}

impl AnalyzeCommand {
    /// Run the analysis without printing it.
    ///
    /// Ctrl-C cancels the analysis.
    pub async fn run(&self) -> Result<Analysis> {
        let config = match &self.config {
            Some(path) => EngineConfig::load_from(path)?,
            None => EngineConfig::load_with_precedence()?,
        };

        let store = Arc::new(match &self.edges {
            Some(path) => InMemoryGraphStore::from_edge_list(path)?,
            None => InMemoryGraphStore::new(),
        });
        let edge_count = store.edge_count().await;
        info!(edges = edge_count, "Graph loaded");

        let content = read_file(&self.event)?;
        let event: Value = serde_json::from_str(&content)
            .map_err(|e| AnalysisError::malformed(format!("event is not valid JSON: {}", e)))?;

        let engine = ImpactEngine::new(&config, store.clone())?;
        let cancel = CancellationToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling analysis");
                    cancel.cancel();
                }
            })
        };
        let result = engine.analyze_with_cancellation(&event, cancel).await;
        interrupt.abort();
        let analysis = result?;

        if let Some(path) = &self.save_edges {
            store.save_edge_list(path).await?;
            info!(path = %path.display(), "Saved graph edges");
        }
        Ok(analysis)
    }

    /// Fail when the analysis reaches the `--fail-on` level
    pub fn check_threshold(&self, analysis: &Analysis) -> Result<()> {
        match self.fail_on {
            Some(threshold) if analysis.risk_score.level >= threshold => Err(CliError::RiskThreshold {
                level: analysis.risk_score.level,
                threshold,
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl Command for AnalyzeCommand {
    async fn execute(&self) -> Result<()> {
        let analysis = self.run().await?;
        print_json(&analysis)?;
        self.check_threshold(&analysis)
    }
}
