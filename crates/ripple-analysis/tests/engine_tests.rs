//! End-to-end pipeline tests over the in-memory graph with scripted
//! discovery and advisor collaborators

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ripple_advisor::{AdvisoryService, ContextPayload, SemanticAdvisor};
use ripple_analysis::{AnalysisError, EngineConfig, ImpactEngine};
use ripple_discovery::{
    ConsumerDiscovery, DiscoveryConfig, RepositoryConfig, SearchBackend, SearchHits,
    SearchPattern,
};
use ripple_domain::{
    AnalysisType, ChangeType, Consumer, DependencyEdge, Direction, EdgeKind, EntityRef,
    ErrorCode, ImpactDetails, RiskLevel,
};
use ripple_graph::{GraphError, GraphGateway, InMemoryGraphStore};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

/// Finds one consumer line per pattern in every repository except `down`
#[derive(Default)]
struct FixedBackend {
    calls: AtomicUsize,
    hang: bool,
}

#[async_trait]
impl SearchBackend for FixedBackend {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn search_repository(
        &self,
        repository: &RepositoryConfig,
        pattern: &SearchPattern,
    ) -> ripple_discovery::Result<SearchHits> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if repository.id == "down" {
            return Err(ripple_discovery::DiscoveryError::RepositoryUnavailable(
                repository.id.clone(),
            ));
        }
        Ok(SearchHits::complete(vec![Consumer {
            repository: repository.id.clone(),
            file_path: "src/client.ts".to_string(),
            line_number: 12,
            context_snippet: pattern.target().to_string(),
            source_url: None,
        }]))
    }
}

struct CannedAdvisor(&'static str);

#[async_trait]
impl SemanticAdvisor for CannedAdvisor {
    async fn advise(&self, _payload: &ContextPayload) -> ripple_advisor::Result<String> {
        Ok(self.0.to_string())
    }
}

struct UnreachableGraph;

#[async_trait]
impl GraphGateway for UnreachableGraph {
    async fn query_edges(
        &self,
        _entity: &EntityRef,
        _direction: Direction,
        _kinds: &[EdgeKind],
        _max_hops: u32,
    ) -> ripple_graph::Result<Vec<DependencyEdge>> {
        Err(GraphError::unavailable("connection refused"))
    }

    async fn upsert_edge(&self, _edge: DependencyEdge) -> ripple_graph::Result<()> {
        Err(GraphError::unavailable("connection refused"))
    }
}

const TWO_HIGH_RISKS: &str = r#"```json
{"summary": "Buy orders now need an account id.",
 "risks": [{"title": "Clients rejected", "severity": "high"},
           {"title": "Orders lost", "severity": "high"}],
 "recommendations": ["Version the endpoint", "Default accountId"]}
```"#;

fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.advisor.enabled = false;
    config
}

fn discovery(backend: Arc<FixedBackend>, repos: &[&str]) -> ConsumerDiscovery {
    let config = DiscoveryConfig {
        repositories: repos
            .iter()
            .map(|id| RepositoryConfig::local(*id, format!("/srv/{}", id)))
            .collect(),
        ..Default::default()
    };
    ConsumerDiscovery::new(config, backend)
}

fn buy_event() -> Value {
    json!({
        "kind": "api_contract_change",
        "repository": "acme/trading-api",
        "commit_sha": "abc123",
        "before": [
            {"method": "POST", "path": "/api/stocks/buy",
             "parameters": [{"name": "symbol", "required": true, "type": "string"}]}
        ],
        "after": [
            {"method": "POST", "path": "/api/stocks/buy",
             "parameters": [{"name": "symbol", "required": true, "type": "string"},
                            {"name": "accountId", "required": true, "type": "string"}]}
        ]
    })
}

fn code_event(file: &str) -> Value {
    json!({
        "kind": "code_change",
        "file_path": file,
        "diff": "-old\n+new",
        "commit_sha": "def456"
    })
}

fn calls(from: &str, to: &str) -> DependencyEdge {
    DependencyEdge::new(EntityRef::file(from), EntityRef::file(to), EdgeKind::Calls)
}

#[tokio::test]
async fn test_api_change_with_partial_discovery() {
    let graph = Arc::new(InMemoryGraphStore::new());
    let backend = Arc::new(FixedBackend::default());
    let advisor = AdvisoryService::new(
        Arc::new(CannedAdvisor(TWO_HIGH_RISKS)),
        Duration::from_secs(5),
        Duration::ZERO,
    );
    let engine = ImpactEngine::new(&config(), graph.clone())
        .unwrap()
        .with_discovery(discovery(backend, &["web", "mobile", "down"]))
        .with_advisor(advisor);

    let analysis = engine.analyze(&buy_event()).await.unwrap();

    assert_eq!(analysis.analysis_type, AnalysisType::ApiContract);
    let items = analysis.impact.api_changes();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].change_type, ChangeType::Breaking);

    let consumers = analysis.consumers.as_ref().unwrap();
    assert_eq!(consumers.repository_count(), 2);
    assert!(consumers.search_incomplete);
    assert_eq!(consumers.failed_repositories[0].repository, "down");
    assert!(analysis.flags.search_incomplete);
    assert!(!analysis.flags.semantic_advisor_degraded);
    assert_eq!(analysis.semantic_insights.risks.len(), 2);
    assert_eq!(analysis.summary_counts.risks, 2);
    assert!(analysis.risk_score.breakdown.breaking_multiplier > 1.0);

    // consumers are written back as API_CONSUMER edges
    let edges = graph.edges().await;
    assert_eq!(edges.len(), 2);
    assert!(edges.iter().all(|e| e.kind == EdgeKind::ApiConsumer));
}

#[tokio::test]
async fn test_resubmission_returns_stored_analysis() {
    let backend = Arc::new(FixedBackend::default());
    let engine = ImpactEngine::new(&config(), Arc::new(InMemoryGraphStore::new()))
        .unwrap()
        .with_discovery(discovery(backend.clone(), &["web"]));

    let first = engine.analyze(&buy_event()).await.unwrap();
    let calls_after_first = backend.calls.load(Ordering::SeqCst);
    let second = engine.analyze(&buy_event()).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(backend.calls.load(Ordering::SeqCst), calls_after_first);
    assert!(engine.get_analysis(first.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_malformed_event_is_rejected_before_any_stage() {
    let engine = ImpactEngine::new(&config(), Arc::new(UnreachableGraph)).unwrap();
    let err = engine
        .analyze(&json!({"file_path": "src/a.ts", "diff": ""}))
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::MalformedEvent(_)));
    assert_eq!(err.code(), Some(ErrorCode::MalformedEvent));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_graph_outage_aborts_with_lookup_failure() {
    let engine = ImpactEngine::new(&config(), Arc::new(UnreachableGraph)).unwrap();
    let err = engine.analyze(&code_event("src/a.ts")).await.unwrap_err();
    assert!(matches!(err, AnalysisError::DependencyLookupFailed { .. }));
    assert_eq!(err.code(), Some(ErrorCode::DependencyLookupFailed));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_code_change_scores_fan_out() {
    let graph = Arc::new(InMemoryGraphStore::with_edges(vec![
        calls("src/a.ts", "src/b.ts"),
        calls("src/b.ts", "src/c.ts"),
        calls("src/z.ts", "src/a.ts"),
    ]));
    let engine = ImpactEngine::new(&config(), graph).unwrap();
    let analysis = engine.analyze(&code_event("src/a.ts")).await.unwrap();

    let ImpactDetails::Dependencies(deps) = &analysis.impact else {
        panic!("expected code dependencies");
    };
    assert_eq!(deps.direct.len(), 1);
    assert_eq!(deps.indirect.len(), 1);
    assert_eq!(deps.reverse_direct.len(), 1);
    assert!(analysis.consumers.is_none());
    assert_eq!(analysis.summary_counts.direct_dependencies, 1);
    assert_eq!(analysis.summary_counts.reverse_dependencies, 1);
    assert!(analysis.flags.semantic_advisor_degraded);
    assert_eq!(analysis.risk_score.breakdown.semantic, 0.0);
    assert!(analysis.risk_score.breakdown.technical > 0.0);
    assert_eq!(analysis.risk_score.breakdown.breaking_multiplier, 1.0);
}

#[tokio::test]
async fn test_schema_change_counts_usage_and_searches_entity() {
    let graph = Arc::new(InMemoryGraphStore::with_edges(vec![
        DependencyEdge::new(
            EntityRef::file("src/repo.ts"),
            EntityRef::table("accounts"),
            EdgeKind::ReferencesTable,
        )
        .with_weight(4.0),
        DependencyEdge::new(EntityRef::table("trades"), EntityRef::table("accounts"), EdgeKind::ForeignKey),
    ]));
    let backend = Arc::new(FixedBackend::default());
    let engine = ImpactEngine::new(&config(), graph.clone())
        .unwrap()
        .with_discovery(discovery(backend, &["reporting"]));

    let event = json!({
        "kind": "schema_change",
        "table": "accounts",
        "field_name": "balance",
        "ddl": "ALTER TABLE accounts DROP COLUMN balance"
    });
    let analysis = engine.analyze(&event).await.unwrap();

    assert_eq!(analysis.analysis_type, AnalysisType::Schema);
    assert_eq!(analysis.summary_counts.code_dependencies, 1);
    assert_eq!(analysis.summary_counts.affected_entities, 1);
    assert_eq!(analysis.summary_counts.consumers, 1);

    let written = graph
        .edges()
        .await
        .into_iter()
        .filter(|e| e.from.identifier == "reporting:src/client.ts")
        .count();
    assert_eq!(written, 1);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let engine = ImpactEngine::new(&config(), Arc::new(InMemoryGraphStore::new())).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = engine
        .analyze_with_cancellation(&code_event("src/a.ts"), cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Cancelled));
    assert!(err.code().is_none());
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_cancellation_interrupts_discovery() {
    let backend = Arc::new(FixedBackend {
        hang: true,
        ..Default::default()
    });
    let engine = ImpactEngine::new(&config(), Arc::new(InMemoryGraphStore::new()))
        .unwrap()
        .with_discovery(discovery(backend, &["web"]));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        engine.analyze_with_cancellation(&buy_event(), cancel),
    )
    .await
    .expect("cancellation should end the analysis promptly");
    assert!(matches!(result, Err(AnalysisError::Cancelled)));
}

#[tokio::test]
async fn test_dependency_graph_view() {
    let graph = Arc::new(InMemoryGraphStore::with_edges(vec![
        calls("src/a.ts", "src/b.ts"),
        calls("src/b.ts", "src/c.ts"),
        calls("src/c.ts", "src/d.ts"),
    ]));
    let engine = ImpactEngine::new(&config(), graph).unwrap();

    let view = engine.get_dependency_graph("src/a.ts").await.unwrap();
    let ids: Vec<&str> = view.nodes.iter().map(|n| n.entity.identifier.as_str()).collect();
    assert!(ids.contains(&"src/a.ts"));
    assert!(ids.contains(&"src/c.ts"));
    assert!(!ids.contains(&"src/d.ts"));

    let same = engine.get_dependency_graph("FILE:src/a.ts").await.unwrap();
    assert_eq!(view, same);
}

#[tokio::test]
async fn test_dependency_graph_view_on_outage() {
    let engine = ImpactEngine::new(&config(), Arc::new(UnreachableGraph)).unwrap();
    let err = engine.get_dependency_graph("TABLE:accounts").await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::DependencyLookupFailed));
}

#[tokio::test]
async fn test_api_contract_graph_is_built_and_cached() {
    let backend = Arc::new(FixedBackend::default());
    let engine = ImpactEngine::new(&config(), Arc::new(InMemoryGraphStore::new()))
        .unwrap()
        .with_discovery(discovery(backend, &["web", "mobile"]));
    let analysis = engine.analyze(&buy_event()).await.unwrap();

    let view = engine.get_api_contract_graph(analysis.id).await.unwrap();
    assert_eq!(view.nodes.len(), 3);
    assert_eq!(view.edges.len(), 2);
    assert!(view
        .nodes
        .iter()
        .any(|n| n.entity == EntityRef::endpoint("POST", "/api/stocks/buy")));

    let stored = engine.get_analysis(analysis.id).await.unwrap().unwrap();
    assert_eq!(stored.visualization.as_ref(), Some(&view));
    assert_eq!(engine.get_api_contract_graph(analysis.id).await.unwrap(), view);
}

#[tokio::test]
async fn test_api_contract_graph_for_unknown_analysis() {
    let engine = ImpactEngine::new(&config(), Arc::new(InMemoryGraphStore::new())).unwrap();
    let id = uuid::Uuid::new_v4();
    let err = engine.get_api_contract_graph(id).await.unwrap_err();
    assert!(matches!(err, AnalysisError::NotFound(missing) if missing == id));
}

#[tokio::test]
async fn test_optional_parameter_is_low_risk() {
    let engine = ImpactEngine::new(&config(), Arc::new(InMemoryGraphStore::new())).unwrap();
    let event = json!({
        "kind": "api_contract_change",
        "repository": "acme/trading-api",
        "before": [{"method": "GET", "path": "/api/stocks/{id}"}],
        "after": [{"method": "GET", "path": "/api/stocks/{id}",
                   "parameters": [{"name": "currency", "required": false}]}]
    });
    let analysis = engine.analyze(&event).await.unwrap();
    let items = analysis.impact.api_changes();
    assert_eq!(items[0].change_type, ChangeType::Added);
    assert!(!items[0].breaking);
    assert!(analysis.risk_score.level <= RiskLevel::Medium);
}
