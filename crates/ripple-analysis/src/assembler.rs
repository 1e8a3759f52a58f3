//! Analysis assembly and graph write-back

use std::sync::Arc;

use chrono::Utc;
use ripple_domain::{
    Analysis, ChangeDescriptor, ChangePayload, ConsumerReport, DegradationFlags, DependencyEdge,
    EdgeKind, EntityRef, ImpactDetails, RiskScore, SemanticInsights, SummaryCounts,
};
use ripple_graph::GraphGateway;
use tracing::{debug, info, warn};

/// Stage outputs handed to the assembler
#[derive(Debug, Clone)]
pub struct StageOutputs {
    pub descriptor: ChangeDescriptor,
    pub impact: ImpactDetails,
    pub consumers: Option<ConsumerReport>,
    pub insights: SemanticInsights,
    pub risk: RiskScore,
    pub score_out_of_range: bool,
}

/// Builds the `Analysis` aggregate and records newly observed edges
pub struct AnalysisAssembler {
    gateway: Arc<dyn GraphGateway>,
}

impl AnalysisAssembler {
    pub fn new(gateway: Arc<dyn GraphGateway>) -> Self {
        Self { gateway }
    }

    /// Compose the final analysis.
    ///
    /// Write-back failures are absorbed into `graph_writeback_failed`.
    pub async fn assemble(&self, outputs: StageOutputs) -> Analysis {
        let StageOutputs {
            descriptor,
            impact,
            consumers,
            insights,
            risk,
            score_out_of_range,
        } = outputs;

        let summary_counts = summary_counts(&impact, consumers.as_ref(), &insights);
        let edges = consumer_edges(&descriptor, &impact, consumers.as_ref());
        let graph_writeback_failed = !self.write_back(&edges).await;

        let flags = DegradationFlags {
            search_incomplete: consumers.as_ref().is_some_and(|c| c.search_incomplete),
            semantic_advisor_degraded: insights.advisor_degraded,
            semantic_parse_degraded: insights.semantic_parse_degraded,
            graph_writeback_failed,
            score_out_of_range,
        };

        let analysis = Analysis {
            id: descriptor.analysis_id(),
            analysis_type: descriptor.analysis_type(),
            change: descriptor,
            impact,
            consumers,
            semantic_insights: insights,
            risk_score: risk,
            summary_counts,
            flags,
            created_at: Utc::now(),
            visualization: None,
        };

        info!(
            analysis_id = %analysis.id,
            analysis_type = %analysis.analysis_type,
            score = analysis.risk_score.score,
            level = %analysis.risk_score.level,
            degraded = analysis.flags.is_degraded(),
            "Assembled analysis"
        );
        analysis
    }

    async fn write_back(&self, edges: &[DependencyEdge]) -> bool {
        let mut ok = true;
        for edge in edges {
            if let Err(e) = self.gateway.upsert_edge(edge.clone()).await {
                warn!(from = %edge.from, to = %edge.to, kind = %edge.kind, error = %e, "Graph write-back failed");
                ok = false;
                break;
            }
        }
        if ok && !edges.is_empty() {
            debug!(edges = edges.len(), "Wrote discovered edges back to the graph");
        }
        ok
    }
}

/// Totals for downstream consumers of an analysis
pub fn summary_counts(
    impact: &ImpactDetails,
    consumers: Option<&ConsumerReport>,
    insights: &SemanticInsights,
) -> SummaryCounts {
    let mut counts = SummaryCounts::default();
    match impact {
        ImpactDetails::Dependencies(deps) => {
            counts.direct_dependencies = deps.direct.len();
            counts.indirect_dependencies = deps.indirect.len();
            counts.reverse_dependencies = deps.reverse_direct.len() + deps.reverse_indirect.len();
        }
        ImpactDetails::SchemaRelationships(rels) => {
            counts.code_dependencies = rels.code_dependencies.len();
            counts.affected_entities = rels.affected_entities.len();
        }
        ImpactDetails::ApiChanges(items) => counts.count_api_changes(items),
    }
    if let Some(report) = consumers {
        counts.consumers = report.total_consumers();
        counts.consumer_repositories = report.repository_count();
    }
    counts.risks = insights.risks.len();
    counts
}

/// Graph node for a consumer file, qualified by repository
pub fn consumer_file(repository: &str, file_path: &str) -> EntityRef {
    EntityRef::file(format!("{}:{}", repository, file_path))
}

/// Edges for the consumers found in this run.
///
/// API changes yield `ENDPOINT -> FILE` `API_CONSUMER` edges; schema changes
/// yield `FILE -> TABLE|COLLECTION` reference edges. Weight is the number of
/// consumer lines in the file.
pub fn consumer_edges(
    descriptor: &ChangeDescriptor,
    impact: &ImpactDetails,
    consumers: Option<&ConsumerReport>,
) -> Vec<DependencyEdge> {
    let Some(report) = consumers else {
        return Vec::new();
    };
    let mut edges = Vec::new();

    match (descriptor.change(), impact) {
        (ChangePayload::ApiContract(_), ImpactDetails::ApiChanges(items)) => {
            for item in items {
                let Some(target) = report.target(&item.endpoint_key()) else {
                    continue;
                };
                let endpoint = item.entity_ref();
                for repo in &target.repositories {
                    for file in &repo.files {
                        edges.push(
                            DependencyEdge::new(
                                endpoint.clone(),
                                consumer_file(&repo.repository, &file.file_path),
                                EdgeKind::ApiConsumer,
                            )
                            .with_weight(file.consumers.len() as f64),
                        );
                    }
                }
            }
        }
        (ChangePayload::Schema(schema), _) => {
            let entity = schema.entity_ref();
            let kind = schema.database_kind.reference_edge_kind();
            if let Some(target) = report.target(&schema.entity_name) {
                for repo in &target.repositories {
                    for file in &repo.files {
                        edges.push(
                            DependencyEdge::new(
                                consumer_file(&repo.repository, &file.file_path),
                                entity.clone(),
                                kind,
                            )
                            .with_weight(file.consumers.len() as f64),
                        );
                    }
                }
            }
        }
        _ => {}
    }
    edges
}
