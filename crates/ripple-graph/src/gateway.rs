//! Graph gateway port

use async_trait::async_trait;
use ripple_domain::{DependencyEdge, Direction, EdgeKind, EntityRef, GraphView};

use crate::error::Result;

/// Query/write interface to the store holding code, schema and API edges.
///
/// Implementations must allow concurrent readers and writers; the engine
/// holds no locks across calls. Connectivity loss is reported as
/// [`GraphError::Unavailable`](crate::GraphError::Unavailable).
#[async_trait]
pub trait GraphGateway: Send + Sync {
    /// Return every edge reachable from `entity` within `max_hops`, walking
    /// in `direction` and following only `kinds` (all kinds when empty).
    ///
    /// Each edge appears once and no node is expanded twice.
    async fn query_edges(
        &self,
        entity: &EntityRef,
        direction: Direction,
        kinds: &[EdgeKind],
        max_hops: u32,
    ) -> Result<Vec<DependencyEdge>>;

    /// Insert or replace the edge keyed by its `(from, to, kind)` triple
    async fn upsert_edge(&self, edge: DependencyEdge) -> Result<()>;
}

/// Node/edge subset around `entity` for the visualization collaborator,
/// covering `hops` in both directions and every edge kind
pub async fn neighbourhood_view(
    gateway: &dyn GraphGateway,
    entity: &EntityRef,
    hops: u32,
) -> Result<GraphView> {
    let edges = gateway.query_edges(entity, Direction::Both, &[], hops).await?;
    Ok(GraphView::from_edges(&edges))
}
