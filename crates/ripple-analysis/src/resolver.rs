//! Dependency resolution over the graph gateway
//!
//! Traversal is breadth-first and expands one hop per gateway query, so a
//! cancelled analysis stops before the next hop and a cycle never revisits
//! a node.

use std::collections::HashSet;
use std::sync::Arc;

use ripple_domain::{
    CodeDependencies, CodeDependency, DatabaseKind, DependencyEdge, DependentEntity, Direction,
    EdgeKind, EntityRef, SchemaRelationships,
};
use ripple_graph::GraphGateway;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ResolverConfig;
use crate::error::{AnalysisError, Result};

/// Computes dependents of a changed file or schema entity
pub struct DependencyResolver {
    gateway: Arc<dyn GraphGateway>,
    max_hops: u32,
}

impl DependencyResolver {
    pub fn new(gateway: Arc<dyn GraphGateway>, config: &ResolverConfig) -> Self {
        Self {
            gateway,
            max_hops: config.max_hops.max(1),
        }
    }

    pub fn max_hops(&self) -> u32 {
        self.max_hops
    }

    /// Direct, indirect and reverse dependents of a source file.
    ///
    /// Direct entries are one hop away; indirect ones are reachable within
    /// `max_hops` and never repeat a direct entry. A gateway failure is
    /// returned as `DependencyLookupFailed`, never as an empty result.
    pub async fn resolve_for_code(
        &self,
        file_path: &str,
        cancel: &CancellationToken,
    ) -> Result<CodeDependencies> {
        let entity = EntityRef::file(file_path);
        let forward = self
            .walk(&entity, Direction::Outgoing, EdgeKind::CODE_DEPENDENCIES, self.max_hops, cancel)
            .await?;
        let reverse = self
            .walk(&entity, Direction::Incoming, EdgeKind::CODE_DEPENDENCIES, self.max_hops, cancel)
            .await?;

        let (direct, indirect) = split_by_hops(forward);
        let (reverse_direct, reverse_indirect) = split_by_hops(reverse);
        let dependencies = CodeDependencies {
            direct,
            indirect,
            reverse_direct,
            reverse_indirect,
        };

        info!(
            entity = %entity,
            direct = dependencies.direct.len(),
            indirect = dependencies.indirect.len(),
            reverse_direct = dependencies.reverse_direct.len(),
            reverse_indirect = dependencies.reverse_indirect.len(),
            "Resolved code dependencies"
        );
        Ok(dependencies)
    }

    /// Code references and foreign-key relationships of a table or collection
    pub async fn resolve_for_schema(
        &self,
        entity_name: &str,
        database_kind: DatabaseKind,
        cancel: &CancellationToken,
    ) -> Result<SchemaRelationships> {
        let entity = EntityRef::new(database_kind.entity_kind(), entity_name);

        check_cancelled(cancel)?;
        let references = self
            .query(&entity, Direction::Incoming, &[database_kind.reference_edge_kind()])
            .await?;
        let code_dependencies = usage_by_file(&references);

        check_cancelled(cancel)?;
        let forward_relationships = self
            .query(&entity, Direction::Outgoing, &[EdgeKind::ForeignKey])
            .await?;
        check_cancelled(cancel)?;
        let reverse_relationships = self
            .query(&entity, Direction::Incoming, &[EdgeKind::ForeignKey])
            .await?;

        let affected_entities = self
            .walk(&entity, Direction::Both, &[EdgeKind::ForeignKey], self.max_hops, cancel)
            .await?
            .into_iter()
            .map(|dependent| dependent.entity)
            .collect::<Vec<_>>();

        let relationships = SchemaRelationships {
            code_dependencies,
            affected_entities,
            forward_relationships,
            reverse_relationships,
        };

        info!(
            entity = %entity,
            code_dependencies = relationships.code_dependencies.len(),
            total_usage = relationships.total_usage(),
            affected_entities = relationships.affected_entities.len(),
            "Resolved schema relationships"
        );
        Ok(relationships)
    }

    async fn query(
        &self,
        entity: &EntityRef,
        direction: Direction,
        kinds: &[EdgeKind],
    ) -> Result<Vec<DependencyEdge>> {
        self.gateway
            .query_edges(entity, direction, kinds, 1)
            .await
            .map_err(|e| AnalysisError::lookup_failed(entity, e))
    }

    /// Breadth-first walk from `start`, one gateway query per node and hop
    async fn walk(
        &self,
        start: &EntityRef,
        direction: Direction,
        kinds: &[EdgeKind],
        max_hops: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<DependentEntity>> {
        let mut visited: HashSet<EntityRef> = HashSet::from([start.clone()]);
        let mut frontier = vec![start.clone()];
        let mut found = Vec::new();

        for hop in 1..=max_hops {
            if frontier.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for node in &frontier {
                check_cancelled(cancel)?;
                let edges = self.query(node, direction, kinds).await?;
                for edge in edges {
                    let far = far_end(&edge, node);
                    if !visited.insert(far.clone()) {
                        continue;
                    }
                    found.push(DependentEntity {
                        entity: far.clone(),
                        edge_kind: edge.kind,
                        hops: hop,
                        via: (hop > 1).then(|| node.clone()),
                    });
                    next.push(far.clone());
                }
            }
            debug!(start = %start, hop, reached = next.len(), "Expanded dependency hop");
            frontier = next;
        }

        Ok(found)
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }
    Ok(())
}

/// The end of `edge` that is not `node`
fn far_end<'e>(edge: &'e DependencyEdge, node: &EntityRef) -> &'e EntityRef {
    if &edge.from == node {
        &edge.to
    } else {
        &edge.from
    }
}

fn split_by_hops(found: Vec<DependentEntity>) -> (Vec<DependentEntity>, Vec<DependentEntity>) {
    found.into_iter().partition(|dependent| dependent.hops == 1)
}

/// Per-file call-site counts; each edge stands for `max(1, round(weight))`
fn usage_by_file(references: &[DependencyEdge]) -> Vec<CodeDependency> {
    let mut usage: Vec<CodeDependency> = Vec::new();
    for edge in references {
        let sites = if edge.weight.is_finite() {
            edge.weight.round().max(1.0) as u32
        } else {
            1
        };
        match usage.iter_mut().find(|dep| dep.file == edge.from) {
            Some(dep) => dep.usage_count = dep.usage_count.saturating_add(sites),
            None => usage.push(CodeDependency {
                file: edge.from.clone(),
                usage_count: sites,
            }),
        }
    }
    usage
}
