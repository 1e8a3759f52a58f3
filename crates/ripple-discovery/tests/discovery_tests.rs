//! Consumer discovery fan-out tests with a scripted backend

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ripple_discovery::{
    ConsumerDiscovery, DiscoveryConfig, DiscoveryError, RepositoryConfig, SearchBackend,
    SearchHits, SearchPattern,
};
use ripple_domain::Consumer;

#[derive(Clone, Copy)]
enum Script {
    Lines(&'static [u32]),
    Incomplete(&'static [u32]),
    Fail,
    /// Lines for every target except the named one, which is rate limited
    LimitedOn(&'static str, &'static [u32]),
    Hang,
}

#[derive(Default)]
struct ScriptedBackend {
    scripts: HashMap<String, Script>,
    delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedBackend {
    fn with(scripts: &[(&str, Script)]) -> Self {
        Self {
            scripts: scripts
                .iter()
                .map(|(id, script)| (id.to_string(), *script))
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SearchBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn search_repository(
        &self,
        repository: &RepositoryConfig,
        pattern: &SearchPattern,
    ) -> ripple_discovery::Result<SearchHits> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        let consumers = |lines: &[u32]| -> Vec<Consumer> {
            lines
                .iter()
                .map(|line| Consumer {
                    repository: repository.id.clone(),
                    file_path: "src/client.ts".to_string(),
                    line_number: *line,
                    context_snippet: pattern.target().to_string(),
                    source_url: None,
                })
                .collect()
        };

        match self.scripts.get(&repository.id).copied().unwrap_or(Script::Lines(&[])) {
            Script::Lines(lines) => Ok(SearchHits::complete(consumers(lines))),
            Script::Incomplete(lines) => Ok(SearchHits {
                consumers: consumers(lines),
                incomplete: true,
            }),
            Script::Fail => Err(DiscoveryError::RateLimited("HTTP 429".to_string())),
            Script::LimitedOn(target, _) if pattern.target() == target => {
                Err(DiscoveryError::RateLimited("HTTP 429".to_string()))
            }
            Script::LimitedOn(_, lines) => Ok(SearchHits::complete(consumers(lines))),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(SearchHits::default())
            }
        }
    }
}

fn config(ids: &[&str], max_concurrency: usize) -> DiscoveryConfig {
    DiscoveryConfig {
        repositories: ids
            .iter()
            .map(|id| RepositoryConfig::local(*id, "/unused"))
            .collect(),
        max_concurrency,
        repository_timeout_secs: 1,
        ..Default::default()
    }
}

fn buy() -> SearchPattern {
    SearchPattern::for_endpoint("POST", "/api/stocks/buy").unwrap()
}

#[tokio::test]
async fn test_consumers_grouped_in_repository_order() {
    let backend = ScriptedBackend::with(&[
        ("web", Script::Lines(&[10, 4, 10])),
        ("mobile", Script::Lines(&[7])),
    ]);
    let discovery = ConsumerDiscovery::new(config(&["web", "mobile"], 4), Arc::new(backend));

    let report = discovery.discover(&[buy()]).await;
    let target = report.target("POST /api/stocks/buy").unwrap();

    assert_eq!(target.repositories.len(), 2);
    assert_eq!(target.repositories[0].repository, "web");
    let lines: Vec<u32> = target.repositories[0].files[0]
        .consumers
        .iter()
        .map(|c| c.line_number)
        .collect();
    assert_eq!(lines, vec![10, 4]);
    assert_eq!(report.total_consumers(), 3);
    assert!(!report.search_incomplete);
}

#[tokio::test]
async fn test_failed_repository_degrades_to_partial_report() {
    let backend = ScriptedBackend::with(&[
        ("web", Script::Lines(&[1])),
        ("legacy", Script::Fail),
        ("mobile", Script::Lines(&[2])),
    ]);
    let discovery = ConsumerDiscovery::new(config(&["web", "legacy", "mobile"], 2), Arc::new(backend));

    let report = discovery.discover(&[buy()]).await;

    assert!(report.search_incomplete);
    assert_eq!(report.repository_count(), 2);
    assert_eq!(report.failed_repositories.len(), 1);
    assert_eq!(report.failed_repositories[0].repository, "legacy");
    assert!(report.failed_repositories[0].reason.contains("Rate limit"));
}

#[tokio::test]
async fn test_timed_out_repository_does_not_block_others() {
    let backend = ScriptedBackend::with(&[("slow", Script::Hang), ("web", Script::Lines(&[3]))]);
    let discovery = ConsumerDiscovery::new(config(&["slow", "web"], 2), Arc::new(backend));

    let started = std::time::Instant::now();
    let report = discovery.discover(&[buy()]).await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(report.search_incomplete);
    assert_eq!(report.total_consumers(), 1);
    assert!(report.failed_repositories[0].reason.contains("timed out"));
}

#[tokio::test]
async fn test_incomplete_hits_are_kept_and_flagged() {
    let backend = ScriptedBackend::with(&[("web", Script::Incomplete(&[5]))]);
    let discovery = ConsumerDiscovery::new(config(&["web"], 1), Arc::new(backend));

    let report = discovery.discover(&[buy()]).await;
    assert!(report.search_incomplete);
    assert!(report.failed_repositories.is_empty());
    assert_eq!(report.total_consumers(), 1);
}

#[tokio::test]
async fn test_rate_limit_midway_keeps_earlier_hits() {
    let quote = SearchPattern::for_endpoint("GET", "/api/stocks/{id}").unwrap();
    let backend = ScriptedBackend::with(&[(
        "web",
        Script::LimitedOn("GET /api/stocks/{id}", &[6]),
    )]);
    let discovery = ConsumerDiscovery::new(config(&["web"], 1), Arc::new(backend));

    let report = discovery.discover(&[buy(), quote]).await;

    assert_eq!(report.total_consumers(), 1);
    assert_eq!(report.target("POST /api/stocks/buy").unwrap().consumer_count(), 1);
    assert!(report.search_incomplete);
    assert!(report.failed_repositories.is_empty());
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let ids = ["r1", "r2", "r3", "r4", "r5", "r6"];
    let backend = Arc::new(ScriptedBackend {
        delay: Duration::from_millis(50),
        ..Default::default()
    });
    let discovery = ConsumerDiscovery::new(config(&ids, 2), backend.clone());

    discovery.discover(&[buy()]).await;
    let peak = backend.peak.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= 2, "peak concurrency was {}", peak);
}

#[tokio::test]
async fn test_no_repositories_yields_empty_complete_report() {
    let discovery = ConsumerDiscovery::new(config(&[], 2), Arc::new(ScriptedBackend::default()));
    let report = discovery.discover(&[buy()]).await;
    assert_eq!(report.total_consumers(), 0);
    assert!(!report.search_incomplete);
}
