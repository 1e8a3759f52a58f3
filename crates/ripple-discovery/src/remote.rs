//! Hosted code-search backend
//!
//! Uses the code-search REST endpoint to find candidate files, then fetches
//! each file's raw content to recover exact line numbers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use ripple_domain::Consumer;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::backend::{SearchBackend, SearchHits};
use crate::config::{DiscoveryConfig, RepositoryConfig};
use crate::error::{DiscoveryError, Result};
use crate::pattern::SearchPattern;

#[derive(Debug, Deserialize)]
struct CodeSearchResponse {
    #[serde(default)]
    incomplete_results: bool,
    #[serde(default)]
    items: Vec<CodeSearchItem>,
}

#[derive(Debug, Deserialize)]
struct CodeSearchItem {
    path: String,
    #[serde(default)]
    html_url: Option<String>,
}

/// Searches repositories through a hosted code-search API
#[derive(Debug, Clone)]
pub struct RemoteSearchBackend {
    client: Client,
    api_base_url: String,
    token: Option<String>,
    max_results: usize,
}

impl RemoteSearchBackend {
    pub fn new(api_base_url: impl Into<String>, token: Option<String>, max_results: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("ripple/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            token,
            max_results,
        })
    }

    /// Build from configuration, reading the token from `token_env`
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env).ok().filter(|t| !t.is_empty());
        if token.is_none() {
            debug!(token_env = %config.token_env, "No search token set, using anonymous requests");
        }
        Self::new(
            config.api_base_url.clone(),
            token,
            config.max_results_per_repository,
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn search_code(&self, repo: &RepositoryConfig, pattern: &SearchPattern) -> Result<CodeSearchResponse> {
        let url = format!("{}/search/code", self.api_base_url);
        let query = format!("\"{}\" repo:{}", pattern.query(), repo.id);
        let per_page = self.max_results.to_string();
        let request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .query(&[("q", query.as_str()), ("per_page", per_page.as_str())]);

        let response = check_status(self.authorize(request).send().await?).await?;
        Ok(response.json::<CodeSearchResponse>().await?)
    }

    async fn fetch_raw(&self, repo: &RepositoryConfig, path: &str) -> Result<String> {
        let url = format!("{}/repos/{}/contents/{}", self.api_base_url, repo.id, path);
        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.raw");
        if let Some(branch) = &repo.branch {
            request = request.query(&[("ref", branch.as_str())]);
        }

        let response = check_status(self.authorize(request).send().await?).await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SearchBackend for RemoteSearchBackend {
    fn name(&self) -> &'static str {
        "remote_search"
    }

    async fn search_repository(
        &self,
        repository: &RepositoryConfig,
        pattern: &SearchPattern,
    ) -> Result<SearchHits> {
        let found = self.search_code(repository, pattern).await?;
        debug!(
            repository = %repository.id,
            target = %pattern.target(),
            candidates = found.items.len(),
            incomplete = found.incomplete_results,
            "Code search returned"
        );

        let mut hits = SearchHits {
            consumers: Vec::new(),
            incomplete: found.incomplete_results,
        };

        for item in found.items {
            let content = match self.fetch_raw(repository, &item.path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(
                        repository = %repository.id,
                        path = %item.path,
                        error = %e,
                        "Failed to fetch file content, keeping partial results"
                    );
                    hits.incomplete = true;
                    if e.is_rate_limit() {
                        break;
                    }
                    continue;
                }
            };

            for (line_number, context_snippet) in pattern.matching_lines(&content) {
                hits.consumers.push(Consumer {
                    repository: repository.id.clone(),
                    file_path: item.path.clone(),
                    line_number,
                    context_snippet,
                    source_url: item
                        .html_url
                        .as_ref()
                        .map(|url| format!("{}#L{}", url, line_number)),
                });
            }
        }

        Ok(hits)
    }
}

/// Map rate limiting and other non-success statuses to errors
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(DiscoveryError::RateLimited(format!("HTTP {}: {}", status.as_u16(), body)));
    }
    Err(DiscoveryError::api_error(status.as_u16(), body))
}
