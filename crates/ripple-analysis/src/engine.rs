//! Impact analysis pipeline
//!
//! One call to [`ImpactEngine::analyze`] runs, in order: normalization,
//! the type-specific structural stage (dependency resolution or contract
//! classification), consumer discovery, the semantic advisor, risk scoring
//! and assembly. Structural failures abort with an error; degradations are
//! recorded on the returned analysis.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use ripple_advisor::{AdvisoryService, ContextPayload};
use ripple_discovery::{ConsumerDiscovery, SearchPattern};
use ripple_domain::{
    Analysis, ApiChangeItem, ChangeDescriptor, ChangePayload, CodeDependencies, ConsumerReport,
    DependentEntity, EntityRef, GraphNode, GraphView, ImpactDetails, SchemaRelationships,
};
use ripple_graph::{neighbourhood_view, GraphGateway};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assembler::{consumer_edges, AnalysisAssembler, StageOutputs};
use crate::classifier::classify;
use crate::config::EngineConfig;
use crate::error::{AnalysisError, Result};
use crate::normalizer::normalize;
use crate::resolver::DependencyResolver;
use crate::risk::{RiskScorer, RiskSignals};
use crate::store::{AnalysisStore, InMemoryAnalysisStore};

/// Hops shown around an entity by [`ImpactEngine::get_dependency_graph`]
pub const DEPENDENCY_GRAPH_HOPS: u32 = 2;

/// Output of the type-specific structural stage
struct Structure {
    impact: ImpactDetails,
    consumers: Option<ConsumerReport>,
    signals: RiskSignals,
    payload: ContextPayload,
}

/// Inbound entry point of the change impact analysis engine
pub struct ImpactEngine {
    gateway: Arc<dyn GraphGateway>,
    resolver: DependencyResolver,
    discovery: ConsumerDiscovery,
    advisor: AdvisoryService,
    scorer: RiskScorer,
    assembler: AnalysisAssembler,
    store: Arc<dyn AnalysisStore>,
}

impl ImpactEngine {
    /// Build an engine from validated configuration, backed by an in-memory
    /// analysis store
    pub fn new(config: &EngineConfig, gateway: Arc<dyn GraphGateway>) -> Result<Self> {
        config.validate()?;
        let discovery = ConsumerDiscovery::from_config(config.discovery.clone())?;
        let advisor = AdvisoryService::from_config(&config.advisor)?;
        let scorer = RiskScorer::new(&config.risk)?;

        info!(
            max_hops = config.resolver.max_hops,
            repositories = config.discovery.repositories.len(),
            advisor_enabled = advisor.is_enabled(),
            "Impact engine ready"
        );

        Ok(Self {
            resolver: DependencyResolver::new(gateway.clone(), &config.resolver),
            assembler: AnalysisAssembler::new(gateway.clone()),
            gateway,
            discovery,
            advisor,
            scorer,
            store: Arc::new(InMemoryAnalysisStore::new()),
        })
    }

    pub fn with_store(mut self, store: Arc<dyn AnalysisStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_discovery(mut self, discovery: ConsumerDiscovery) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn with_advisor(mut self, advisor: AdvisoryService) -> Self {
        self.advisor = advisor;
        self
    }

    /// Analyze one raw change event.
    ///
    /// Resubmitting an event with the same analysis id returns the stored
    /// analysis without re-running the pipeline.
    pub async fn analyze(&self, raw: &Value) -> Result<Analysis> {
        self.analyze_with_cancellation(raw, CancellationToken::new())
            .await
    }

    /// [`analyze`](Self::analyze), stopping with `Cancelled` once `cancel` fires
    pub async fn analyze_with_cancellation(
        &self,
        raw: &Value,
        cancel: CancellationToken,
    ) -> Result<Analysis> {
        let descriptor = normalize(raw)?;
        let analysis_id = descriptor.analysis_id();

        if let Some(existing) = self.store.get(analysis_id).await? {
            info!(analysis_id = %analysis_id, "Change already analyzed, returning stored analysis");
            return Ok(existing);
        }

        info!(
            analysis_id = %analysis_id,
            analysis_type = %descriptor.analysis_type(),
            "Starting impact analysis"
        );

        let structure = match descriptor.change() {
            ChangePayload::Code(code) => {
                let deps = self.resolver.resolve_for_code(&code.file_path, &cancel).await?;
                self.code_structure(&descriptor, deps)
            }
            ChangePayload::Schema(schema) => {
                let rels = self
                    .resolver
                    .resolve_for_schema(&schema.entity_name, schema.database_kind, &cancel)
                    .await?;
                let patterns = build_patterns([SearchPattern::for_entity(&schema.entity_name)]);
                let report = until_cancelled(&cancel, self.discovery.discover(&patterns)).await?;
                self.schema_structure(&descriptor, rels, report)
            }
            ChangePayload::ApiContract(api) => {
                check_cancelled(&cancel)?;
                let items = classify(&api.before_spec, &api.after_spec);
                info!(
                    analysis_id = %analysis_id,
                    items = items.len(),
                    breaking = items.iter().filter(|i| i.breaking).count(),
                    "Classified API contract changes"
                );
                let patterns = build_patterns(items.iter().map(SearchPattern::for_api_change));
                let report = until_cancelled(&cancel, self.discovery.discover(&patterns)).await?;
                self.api_structure(&descriptor, items, report)
            }
        };

        if let Some(report) = &structure.consumers {
            if report.search_incomplete {
                warn!(
                    analysis_id = %analysis_id,
                    failed = report.failed_repositories.len(),
                    "Consumer search incomplete"
                );
            }
        }

        let insights = until_cancelled(&cancel, self.advisor.advise(&structure.payload)).await?;
        if insights.advisor_degraded {
            warn!(analysis_id = %analysis_id, "Semantic advisor degraded");
        }

        check_cancelled(&cancel)?;
        let outcome = self.scorer.score(&structure.signals, &insights);

        let analysis = self
            .assembler
            .assemble(StageOutputs {
                descriptor,
                impact: structure.impact,
                consumers: structure.consumers,
                insights,
                risk: outcome.score,
                score_out_of_range: outcome.out_of_range,
            })
            .await;

        self.store.insert_if_absent(analysis).await
    }

    /// Stored analysis by id
    pub async fn get_analysis(&self, analysis_id: Uuid) -> Result<Option<Analysis>> {
        self.store.get(analysis_id).await
    }

    /// Neighbourhood of an entity for visualization.
    ///
    /// `identifier` is either `KIND:identifier` or a bare file path.
    pub async fn get_dependency_graph(&self, identifier: &str) -> Result<GraphView> {
        let entity = parse_entity(identifier);
        let view = neighbourhood_view(self.gateway.as_ref(), &entity, DEPENDENCY_GRAPH_HOPS)
            .await
            .map_err(|e| AnalysisError::lookup_failed(&entity, e))?;
        debug!(entity = %entity, nodes = view.nodes.len(), edges = view.edges.len(), "Built dependency graph view");
        Ok(view)
    }

    /// Endpoints of an API analysis linked to their consumer files.
    ///
    /// The view is cached on the stored analysis after the first call.
    pub async fn get_api_contract_graph(&self, analysis_id: Uuid) -> Result<GraphView> {
        let analysis = self
            .store
            .get(analysis_id)
            .await?
            .ok_or(AnalysisError::NotFound(analysis_id))?;
        if let Some(view) = analysis.visualization {
            return Ok(view);
        }

        let edges = consumer_edges(&analysis.change, &analysis.impact, analysis.consumers.as_ref());
        let mut view = GraphView::from_edges(&edges);
        let mut seen: HashSet<String> = view.nodes.iter().map(|n| n.id.clone()).collect();
        for item in analysis.impact.api_changes() {
            let entity = item.entity_ref();
            if seen.insert(entity.to_string()) {
                view.nodes.push(GraphNode {
                    id: entity.to_string(),
                    label: entity.identifier.clone(),
                    entity,
                });
            }
        }

        self.store.set_visualization(analysis_id, view.clone()).await?;
        Ok(view)
    }

    fn code_structure(&self, descriptor: &ChangeDescriptor, deps: CodeDependencies) -> Structure {
        let direct = distinct(&[&deps.direct, &deps.reverse_direct]);
        let indirect = distinct(&[&deps.indirect, &deps.reverse_indirect]);

        let mut entities = descriptor.changed_entity().into_iter().collect::<Vec<_>>();
        entities.extend(direct.iter().cloned());
        entities.extend(indirect.iter().cloned());

        let payload = ContextPayload::for_change(descriptor).with_code_dependencies(&deps);
        Structure {
            signals: RiskSignals {
                direct_count: direct.len(),
                indirect_count: indirect.len(),
                entities,
                ..Default::default()
            },
            impact: ImpactDetails::Dependencies(deps),
            consumers: None,
            payload,
        }
    }

    fn schema_structure(
        &self,
        descriptor: &ChangeDescriptor,
        rels: SchemaRelationships,
        report: ConsumerReport,
    ) -> Structure {
        let mut entities = descriptor.changed_entity().into_iter().collect::<Vec<_>>();
        entities.extend(rels.affected_entities.iter().cloned());
        entities.extend(rels.code_dependencies.iter().map(|d| d.file.clone()));

        let payload = ContextPayload::for_change(descriptor)
            .with_schema_relationships(&rels)
            .with_consumers(&report);
        Structure {
            signals: RiskSignals {
                direct_count: rels.total_usage() as usize,
                indirect_count: rels.affected_entities.len(),
                entities,
                breaking_changes: 0,
                consumer_locations: report.total_consumers(),
            },
            impact: ImpactDetails::SchemaRelationships(rels),
            consumers: Some(report),
            payload,
        }
    }

    fn api_structure(
        &self,
        descriptor: &ChangeDescriptor,
        items: Vec<ApiChangeItem>,
        report: ConsumerReport,
    ) -> Structure {
        let locations = report.total_consumers();
        let payload = ContextPayload::for_change(descriptor)
            .with_api_changes(&items)
            .with_consumers(&report);
        Structure {
            signals: RiskSignals {
                direct_count: locations,
                indirect_count: report.repository_count().saturating_sub(1),
                entities: items.iter().map(ApiChangeItem::entity_ref).collect(),
                breaking_changes: items.iter().filter(|i| i.breaking).count(),
                consumer_locations: locations,
            },
            impact: ImpactDetails::ApiChanges(items),
            consumers: Some(report),
            payload,
        }
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }
    Ok(())
}

/// Run `stage` unless `cancel` fires first
async fn until_cancelled<T>(cancel: &CancellationToken, stage: impl Future<Output = T>) -> Result<T> {
    check_cancelled(cancel)?;
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
        value = stage => Ok(value),
    }
}

/// Keep the patterns that could be built, logging the rest
fn build_patterns<I>(patterns: I) -> Vec<SearchPattern>
where
    I: IntoIterator<Item = ripple_discovery::Result<SearchPattern>>,
{
    patterns
        .into_iter()
        .filter_map(|pattern| match pattern {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!(error = %e, "Skipping consumer search pattern");
                None
            }
        })
        .collect()
}

fn distinct(groups: &[&Vec<DependentEntity>]) -> Vec<EntityRef> {
    let mut seen = HashSet::new();
    groups
        .iter()
        .flat_map(|group| group.iter())
        .filter(|dep| seen.insert(dep.entity.clone()))
        .map(|dep| dep.entity.clone())
        .collect()
}

/// `KIND:identifier`, or a file path when no kind prefix parses
pub fn parse_entity(identifier: &str) -> EntityRef {
    identifier
        .parse()
        .unwrap_or_else(|_| EntityRef::file(identifier))
}
