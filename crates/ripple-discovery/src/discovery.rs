//! Bounded-concurrency consumer discovery across configured repositories

use std::sync::Arc;

use ripple_domain::ConsumerReport;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::backend::{SearchBackend, SearchHits};
use crate::clone_grep::CloneGrepBackend;
use crate::config::{DiscoveryConfig, SearchStrategy};
use crate::error::Result;
use crate::pattern::SearchPattern;
use crate::remote::RemoteSearchBackend;

/// Outcome of searching one repository
enum RepositoryOutcome {
    Searched(Vec<SearchHits>),
    Failed(String),
}

/// Aborts repository searches still running when discovery is dropped
#[derive(Default)]
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Finds consumers of endpoints and entities in the configured repositories.
///
/// Each instance owns its configuration, so concurrent analyses may use
/// different repository sets.
pub struct ConsumerDiscovery {
    config: DiscoveryConfig,
    backend: Arc<dyn SearchBackend>,
}

impl ConsumerDiscovery {
    /// Create discovery with an explicit backend
    pub fn new(config: DiscoveryConfig, backend: Arc<dyn SearchBackend>) -> Self {
        Self { config, backend }
    }

    /// Create discovery with the backend selected by `config.strategy`
    pub fn from_config(config: DiscoveryConfig) -> Result<Self> {
        config.validate()?;
        let backend: Arc<dyn SearchBackend> = match config.strategy {
            SearchStrategy::CloneGrep => Arc::new(CloneGrepBackend::from_config(&config)),
            SearchStrategy::RemoteSearch => Arc::new(RemoteSearchBackend::from_config(&config)?),
        };
        Ok(Self::new(config, backend))
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Search every configured repository for every pattern.
    ///
    /// Repositories run concurrently up to `max_concurrency`. A repository
    /// that fails or exceeds its timeout is recorded in
    /// `failed_repositories` and marks the report incomplete; it never fails
    /// the whole search. Consumers are grouped in configured repository order.
    pub async fn discover(&self, patterns: &[SearchPattern]) -> ConsumerReport {
        let mut report = ConsumerReport::default();
        for pattern in patterns {
            report.target_mut(pattern.target());
        }
        if patterns.is_empty() || self.config.repositories.is_empty() {
            return report;
        }

        info!(
            backend = self.backend.name(),
            repositories = self.config.repositories.len(),
            patterns = patterns.len(),
            max_concurrency = self.config.max_concurrency,
            "Starting consumer discovery"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let patterns = Arc::new(patterns.to_vec());
        let repo_timeout = self.config.repository_timeout();
        let mut handles = Vec::new();
        let mut in_flight = AbortOnDrop::default();

        for repo in &self.config.repositories {
            let repo = repo.clone();
            let repo_id = repo.id.clone();
            let backend = self.backend.clone();
            let semaphore = semaphore.clone();
            let patterns = patterns.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await;
                debug!(repository = %repo.id, "Repository search started");

                match timeout(repo_timeout, backend.search_repository_all(&repo, &patterns)).await {
                    Ok(Ok(hits)) => RepositoryOutcome::Searched(hits),
                    Ok(Err(e)) => {
                        warn!(repository = %repo.id, error = %e, "Repository search failed");
                        RepositoryOutcome::Failed(e.to_string())
                    }
                    Err(_) => {
                        warn!(
                            repository = %repo.id,
                            timeout_secs = repo_timeout.as_secs(),
                            "Repository search timed out"
                        );
                        RepositoryOutcome::Failed(format!(
                            "timed out after {}s",
                            repo_timeout.as_secs()
                        ))
                    }
                }
            });
            in_flight.0.push(handle.abort_handle());
            handles.push((repo_id, handle));
        }

        for (repo_id, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => RepositoryOutcome::Failed(format!("search task error: {}", e)),
            };

            match outcome {
                RepositoryOutcome::Searched(results) => {
                    for (pattern, hits) in patterns.iter().zip(results) {
                        if hits.incomplete {
                            report.search_incomplete = true;
                        }
                        let target = report.target_mut(pattern.target());
                        for consumer in hits.consumers {
                            target.push(consumer);
                        }
                    }
                }
                RepositoryOutcome::Failed(reason) => report.mark_failed(repo_id, reason),
            }
        }

        info!(
            consumers = report.total_consumers(),
            repositories = report.repository_count(),
            failed = report.failed_repositories.len(),
            search_incomplete = report.search_incomplete,
            "Consumer discovery completed"
        );
        report
    }
}
