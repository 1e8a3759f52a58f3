//! Consumer discovery configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, Result};

/// How candidate repositories are searched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Fetch repository contents locally, then pattern-match
    #[default]
    CloneGrep,
    /// Query a hosted code-search API
    RemoteSearch,
}

/// One candidate consumer repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Repository id; `owner/name` for remote search
    pub id: String,
    /// Local checkout to search in place
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Clone URL, used when no local path is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Browse URL used to build consumer source links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
}

impl RepositoryConfig {
    /// Repository searched in place at a local path
    pub fn local(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: Some(path.into()),
            url: None,
            branch: None,
            web_url: None,
        }
    }

    /// Repository cloned from a URL into the cache directory
    pub fn remote(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: None,
            url: Some(url.into()),
            branch: None,
            web_url: None,
        }
    }

    pub fn with_web_url(mut self, web_url: impl Into<String>) -> Self {
        self.web_url = Some(web_url.into());
        self
    }
}

/// Consumer discovery settings, passed to discovery at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub strategy: SearchStrategy,
    pub repositories: Vec<RepositoryConfig>,
    /// Repositories searched at once (default: 4)
    pub max_concurrency: usize,
    /// Per-repository search budget in seconds (default: 30)
    pub repository_timeout_secs: u64,
    /// Where clone-and-grep keeps its checkouts
    pub cache_dir: PathBuf,
    /// Files larger than this are skipped (default: 1 MiB)
    pub max_file_size_bytes: u64,
    /// Hosted code-search API root (default: https://api.github.com)
    pub api_base_url: String,
    /// Environment variable holding the search API token
    pub token_env: String,
    /// Hits requested per repository and pattern (default: 100)
    pub max_results_per_repository: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::CloneGrep,
            repositories: Vec::new(),
            max_concurrency: 4,
            repository_timeout_secs: 30,
            cache_dir: default_cache_dir(),
            max_file_size_bytes: 1024 * 1024,
            api_base_url: "https://api.github.com".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            max_results_per_repository: 100,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("ripple").join("repositories")
}

impl DiscoveryConfig {
    pub fn repository_timeout(&self) -> Duration {
        Duration::from_secs(self.repository_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(DiscoveryError::ConfigError(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.repository_timeout_secs == 0 {
            return Err(DiscoveryError::ConfigError(
                "repository_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let mut ids = std::collections::HashSet::new();
        for repo in &self.repositories {
            if repo.id.trim().is_empty() {
                return Err(DiscoveryError::ConfigError(
                    "repository id cannot be empty".to_string(),
                ));
            }
            if !ids.insert(repo.id.as_str()) {
                return Err(DiscoveryError::ConfigError(format!(
                    "duplicate repository id '{}'",
                    repo.id
                )));
            }
            if self.strategy == SearchStrategy::CloneGrep && repo.path.is_none() && repo.url.is_none()
            {
                return Err(DiscoveryError::ConfigError(format!(
                    "repository '{}' needs a path or url for clone_grep",
                    repo.id
                )));
            }
            if self.strategy == SearchStrategy::RemoteSearch && !repo.id.contains('/') {
                return Err(DiscoveryError::ConfigError(format!(
                    "repository '{}' must be owner/name for remote_search",
                    repo.id
                )));
            }
        }

        if self.strategy == SearchStrategy::RemoteSearch && self.api_base_url.is_empty() {
            return Err(DiscoveryError::ConfigError(
                "api_base_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
