//! Search backend port

use async_trait::async_trait;
use ripple_domain::Consumer;
use tracing::warn;

use crate::config::RepositoryConfig;
use crate::error::Result;
use crate::pattern::SearchPattern;

/// Consumers found for one pattern in one repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHits {
    pub consumers: Vec<Consumer>,
    /// The backend could only search part of the repository
    pub incomplete: bool,
}

impl SearchHits {
    pub fn complete(consumers: Vec<Consumer>) -> Self {
        Self {
            consumers,
            incomplete: false,
        }
    }

    /// No hits from a search that did not run to the end
    pub fn incomplete() -> Self {
        Self {
            consumers: Vec::new(),
            incomplete: true,
        }
    }
}

/// A strategy for finding consumers inside one repository.
///
/// Both strategies produce the same `Consumer` shape so they are
/// interchangeable behind discovery.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Search one repository for one pattern
    async fn search_repository(
        &self,
        repository: &RepositoryConfig,
        pattern: &SearchPattern,
    ) -> Result<SearchHits>;

    /// Search one repository for several patterns, one result per pattern in
    /// the same order. Backends that can share work across patterns override
    /// this.
    ///
    /// A rate limit after at least one pattern was searched keeps the hits
    /// gathered so far; the remaining patterns come back empty and marked
    /// incomplete.
    async fn search_repository_all(
        &self,
        repository: &RepositoryConfig,
        patterns: &[SearchPattern],
    ) -> Result<Vec<SearchHits>> {
        let mut results = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            match self.search_repository(repository, pattern).await {
                Ok(hits) => results.push(hits),
                Err(e) if e.is_rate_limit() && !results.is_empty() => {
                    warn!(
                        repository = %repository.id,
                        searched = results.len(),
                        remaining = patterns.len() - results.len(),
                        error = %e,
                        "Rate limited, keeping partial results"
                    );
                    results.resize(patterns.len(), SearchHits::incomplete());
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(results)
    }
}
