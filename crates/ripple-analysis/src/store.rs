//! Analysis persistence port

use std::collections::HashMap;

use async_trait::async_trait;
use ripple_domain::{Analysis, GraphView};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AnalysisError, Result};

/// Where assembled analyses live.
///
/// The engine never deletes; lifecycle belongs to the implementation.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Store `analysis` unless one with the same id exists, returning the
    /// analysis that is stored afterwards
    async fn insert_if_absent(&self, analysis: Analysis) -> Result<Analysis>;

    async fn get(&self, id: Uuid) -> Result<Option<Analysis>>;

    /// Cache the visualization enrichment on a stored analysis
    async fn set_visualization(&self, id: Uuid, view: GraphView) -> Result<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryAnalysisStore {
    analyses: RwLock<HashMap<Uuid, Analysis>>,
}

impl InMemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.analyses.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.analyses.read().await.is_empty()
    }
}

#[async_trait]
impl AnalysisStore for InMemoryAnalysisStore {
    async fn insert_if_absent(&self, analysis: Analysis) -> Result<Analysis> {
        let mut analyses = self.analyses.write().await;
        Ok(analyses.entry(analysis.id).or_insert(analysis).clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Analysis>> {
        Ok(self.analyses.read().await.get(&id).cloned())
    }

    async fn set_visualization(&self, id: Uuid, view: GraphView) -> Result<()> {
        let mut analyses = self.analyses.write().await;
        let analysis = analyses.get_mut(&id).ok_or(AnalysisError::NotFound(id))?;
        analysis.visualization = Some(view);
        Ok(())
    }
}
