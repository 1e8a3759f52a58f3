//! Dependency graph vocabulary: entities, typed edges and visualization views

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Kind of node in the dependency graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    File,
    Module,
    Table,
    Collection,
    Endpoint,
}

impl EntityKind {
    /// Get the wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::File => "FILE",
            EntityKind::Module => "MODULE",
            EntityKind::Table => "TABLE",
            EntityKind::Collection => "COLLECTION",
            EntityKind::Endpoint => "ENDPOINT",
        }
    }

    /// Whether nodes of this kind hold source code
    pub fn is_code(&self) -> bool {
        matches!(self, EntityKind::File | EntityKind::Module)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FILE" => Ok(EntityKind::File),
            "MODULE" => Ok(EntityKind::Module),
            "TABLE" => Ok(EntityKind::Table),
            "COLLECTION" => Ok(EntityKind::Collection),
            "ENDPOINT" => Ok(EntityKind::Endpoint),
            other => Err(DomainError::InvalidEntityRef {
                reason: format!("unknown entity kind '{}'", other),
            }),
        }
    }
}

/// Reference to a node in the dependency graph.
///
/// Identifiers are opaque and unique within their kind, so two refs are the
/// same node exactly when both kind and identifier match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub identifier: String,
}

impl EntityRef {
    /// Create a new entity reference
    pub fn new(kind: EntityKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::new(EntityKind::File, path)
    }

    pub fn module(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Module, name)
    }

    pub fn table(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Table, name)
    }

    pub fn collection(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Collection, name)
    }

    /// Reference an API endpoint by method and path, e.g. `POST /api/stocks/buy`
    pub fn endpoint(method: &str, path: &str) -> Self {
        Self::new(
            EntityKind::Endpoint,
            format!("{} {}", method.to_ascii_uppercase(), path),
        )
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.identifier)
    }
}

impl FromStr for EntityRef {
    type Err = DomainError;

    /// Parse the `KIND:identifier` form produced by `Display`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, identifier) = s.split_once(':').ok_or_else(|| DomainError::InvalidEntityRef {
            reason: format!("expected KIND:identifier, got '{}'", s),
        })?;
        if identifier.is_empty() {
            return Err(DomainError::InvalidEntityRef {
                reason: "identifier cannot be empty".to_string(),
            });
        }
        Ok(Self::new(kind.parse()?, identifier))
    }
}

/// Relationship carried by a dependency edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Calls,
    ReferencesTable,
    ReferencesCollection,
    ForeignKey,
    ApiConsumer,
}

impl EdgeKind {
    /// Edge kinds followed when resolving dependents of a code change
    pub const CODE_DEPENDENCIES: &'static [EdgeKind] = &[
        EdgeKind::Calls,
        EdgeKind::ReferencesTable,
        EdgeKind::ReferencesCollection,
    ];

    /// Edge kinds that describe relationships around a schema entity
    pub const SCHEMA_RELATIONSHIPS: &'static [EdgeKind] = &[
        EdgeKind::ReferencesTable,
        EdgeKind::ReferencesCollection,
        EdgeKind::ForeignKey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Calls => "CALLS",
            EdgeKind::ReferencesTable => "REFERENCES_TABLE",
            EdgeKind::ReferencesCollection => "REFERENCES_COLLECTION",
            EdgeKind::ForeignKey => "FOREIGN_KEY",
            EdgeKind::ApiConsumer => "API_CONSUMER",
        }
    }

    /// Whether this edge is a code-to-schema reference
    pub fn is_schema_reference(&self) -> bool {
        matches!(
            self,
            EdgeKind::ReferencesTable | EdgeKind::ReferencesCollection
        )
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_weight() -> f64 {
    1.0
}

/// Directed, typed edge between two entities.
///
/// The graph is a multigraph: several edges of different kinds may connect
/// the same pair, and an edge's identity is its `(from, to, kind)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: EntityRef,
    pub to: EntityRef,
    pub kind: EdgeKind,
    /// Relative strength of the relationship; for code-to-schema references
    /// this is the number of call sites the edge stands for
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// Identity of an edge for idempotent upserts
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub from: EntityRef,
    pub to: EntityRef,
    pub kind: EdgeKind,
}

impl DependencyEdge {
    /// Create an edge with the default weight of 1
    pub fn new(from: EntityRef, to: EntityRef, kind: EdgeKind) -> Self {
        Self {
            from,
            to,
            kind,
            weight: default_weight(),
        }
    }

    /// Set the weight of the edge
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Get the upsert key of this edge
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            from: self.from.clone(),
            to: self.to.clone(),
            kind: self.kind,
        }
    }

    /// The endpoint on the far side of the edge when walking in `direction`
    pub fn far_end(&self, direction: Direction) -> &EntityRef {
        match direction {
            Direction::Incoming => &self.from,
            Direction::Outgoing | Direction::Both => &self.to,
        }
    }
}

/// Traversal direction relative to the queried entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Follow edges whose `from` is the entity
    Outgoing,
    /// Follow edges whose `to` is the entity
    Incoming,
    /// Follow edges in either direction
    Both,
}

/// Node of a visualization view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub entity: EntityRef,
    pub label: String,
}

/// Edge of a visualization view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub weight: f64,
}

/// Node/edge subset handed to the graph visualization collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphLink>,
}

impl GraphView {
    /// Build a view from edges, listing every endpoint once in first-seen order
    pub fn from_edges<'a, I>(edges: I) -> Self
    where
        I: IntoIterator<Item = &'a DependencyEdge>,
    {
        let mut view = GraphView::default();
        let mut seen_nodes = HashSet::new();
        let mut seen_edges = HashSet::new();

        for edge in edges {
            if !seen_edges.insert(edge.key()) {
                continue;
            }
            for entity in [&edge.from, &edge.to] {
                if seen_nodes.insert(entity.clone()) {
                    view.nodes.push(GraphNode {
                        id: entity.to_string(),
                        entity: entity.clone(),
                        label: entity.identifier.clone(),
                    });
                }
            }
            view.edges.push(GraphLink {
                source: edge.from.to_string(),
                target: edge.to.to_string(),
                kind: edge.kind,
                weight: edge.weight,
            });
        }

        view
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
