//! In-memory multigraph store

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use ripple_domain::{DependencyEdge, Direction, EdgeKey, EdgeKind, EntityRef};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{GraphError, Result};
use crate::gateway::GraphGateway;

/// Edge list as emitted by the static dependency analyzer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeList {
    pub edges: Vec<DependencyEdge>,
}

#[derive(Debug, Default)]
struct GraphState {
    edges: HashMap<EdgeKey, DependencyEdge>,
    /// Outgoing edge keys per node, in insertion order
    outgoing: HashMap<EntityRef, Vec<EdgeKey>>,
    /// Incoming edge keys per node, in insertion order
    incoming: HashMap<EntityRef, Vec<EdgeKey>>,
}

impl GraphState {
    fn upsert(&mut self, edge: DependencyEdge) -> bool {
        let key = edge.key();
        let is_new = self.edges.insert(key.clone(), edge).is_none();
        if is_new {
            self.outgoing
                .entry(key.from.clone())
                .or_default()
                .push(key.clone());
            self.incoming.entry(key.to.clone()).or_default().push(key);
        }
        is_new
    }

    fn adjacent<'a>(
        &'a self,
        node: &EntityRef,
        direction: Direction,
    ) -> impl Iterator<Item = &'a DependencyEdge> + 'a {
        let outgoing = match direction {
            Direction::Outgoing | Direction::Both => self.outgoing.get(node),
            Direction::Incoming => None,
        };
        let incoming = match direction {
            Direction::Incoming | Direction::Both => self.incoming.get(node),
            Direction::Outgoing => None,
        };
        outgoing
            .into_iter()
            .flatten()
            .chain(incoming.into_iter().flatten())
            .filter_map(move |key| self.edges.get(key))
    }

    /// Breadth-first walk bounded by `max_hops`, with a visited set so cycles
    /// terminate and each node is expanded once
    fn traverse(
        &self,
        start: &EntityRef,
        direction: Direction,
        kinds: &[EdgeKind],
        max_hops: u32,
    ) -> Vec<DependencyEdge> {
        let mut visited: HashSet<EntityRef> = HashSet::new();
        let mut seen_edges: HashSet<EdgeKey> = HashSet::new();
        let mut result = Vec::new();
        let mut frontier = vec![start.clone()];
        visited.insert(start.clone());

        for _ in 0..max_hops {
            let mut next = Vec::new();
            for node in &frontier {
                for edge in self.adjacent(node, direction) {
                    if !kinds.is_empty() && !kinds.contains(&edge.kind) {
                        continue;
                    }
                    if !seen_edges.insert(edge.key()) {
                        continue;
                    }
                    result.push(edge.clone());

                    let far = if edge.from == *node { &edge.to } else { &edge.from };
                    if visited.insert(far.clone()) {
                        next.push(far.clone());
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        result
    }
}

/// Thread-safe in-memory implementation of [`GraphGateway`]
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    state: RwLock<GraphState>,
}

impl InMemoryGraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with edges; duplicates collapse by key
    pub fn with_edges(edges: impl IntoIterator<Item = DependencyEdge>) -> Self {
        let mut state = GraphState::default();
        for edge in edges {
            state.upsert(edge);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Load an edge list file (JSON, or YAML for `.yaml`/`.yml`).
    ///
    /// Accepts either a bare array of edges or an object with an `edges` array.
    pub fn from_edge_list(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let edges = parse_edge_list(&content, is_yaml(path))?;
        info!(path = %path.display(), edges = edges.len(), "Loaded edge list");
        Ok(Self::with_edges(edges))
    }

    /// Write every edge to a JSON edge list file
    pub async fn save_edge_list(&self, path: impl AsRef<Path>) -> Result<()> {
        let list = EdgeList {
            edges: self.edges().await,
        };
        let content = serde_json::to_string_pretty(&list)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Snapshot of all edges, ordered by key
    pub async fn edges(&self) -> Vec<DependencyEdge> {
        let state = self.state.read().await;
        let mut edges: Vec<DependencyEdge> = state.edges.values().cloned().collect();
        edges.sort_by(|a, b| a.key().cmp(&b.key()));
        edges
    }

    pub async fn edge_count(&self) -> usize {
        self.state.read().await.edges.len()
    }
}

#[async_trait]
impl GraphGateway for InMemoryGraphStore {
    async fn query_edges(
        &self,
        entity: &EntityRef,
        direction: Direction,
        kinds: &[EdgeKind],
        max_hops: u32,
    ) -> Result<Vec<DependencyEdge>> {
        let state = self.state.read().await;
        let edges = state.traverse(entity, direction, kinds, max_hops);
        debug!(
            entity = %entity,
            direction = ?direction,
            max_hops,
            edges = edges.len(),
            "Queried edges"
        );
        Ok(edges)
    }

    async fn upsert_edge(&self, edge: DependencyEdge) -> Result<()> {
        let mut state = self.state.write().await;
        let from = edge.from.clone();
        let to = edge.to.clone();
        let kind = edge.kind;
        let inserted = state.upsert(edge);
        debug!(from = %from, to = %to, kind = %kind, inserted, "Upserted edge");
        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Parse edge list content in either accepted shape
pub fn parse_edge_list(content: &str, yaml: bool) -> Result<Vec<DependencyEdge>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Bare(Vec<DependencyEdge>),
        Wrapped(EdgeList),
    }

    let shape: Shape = if yaml {
        serde_yaml::from_str(content)?
    } else {
        serde_json::from_str(content)?
    };
    let edges = match shape {
        Shape::Bare(edges) => edges,
        Shape::Wrapped(list) => list.edges,
    };

    if let Some(bad) = edges.iter().find(|e| !e.weight.is_finite() || e.weight < 0.0) {
        return Err(GraphError::InvalidEdgeList(format!(
            "edge {} -> {} has invalid weight {}",
            bad.from, bad.to, bad.weight
        )));
    }
    Ok(edges)
}
