//! Cross-repository consumers and their grouped report

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A code location that invokes or depends on an endpoint or entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub repository: String,
    pub file_path: String,
    pub line_number: u32,
    pub context_snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Consumers of one target within one file, in first-seen line order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConsumers {
    pub file_path: String,
    pub consumers: Vec<Consumer>,
}

/// Consumers of one target within one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConsumers {
    pub repository: String,
    pub files: Vec<FileConsumers>,
}

impl RepositoryConsumers {
    pub fn consumer_count(&self) -> usize {
        self.files.iter().map(|f| f.consumers.len()).sum()
    }
}

/// All consumers of one endpoint key or entity name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConsumers {
    /// Endpoint key such as `POST /api/stocks/buy`, or an entity name
    pub target: String,
    pub repositories: Vec<RepositoryConsumers>,
}

impl TargetConsumers {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            repositories: Vec::new(),
        }
    }

    /// Add a consumer, suppressing duplicate (file, line) pairs in the same
    /// repository. Returns whether the consumer was new.
    pub fn push(&mut self, consumer: Consumer) -> bool {
        let repo_index = match self
            .repositories
            .iter()
            .position(|r| r.repository == consumer.repository)
        {
            Some(index) => index,
            None => {
                self.repositories.push(RepositoryConsumers {
                    repository: consumer.repository.clone(),
                    files: Vec::new(),
                });
                self.repositories.len() - 1
            }
        };
        let repo = &mut self.repositories[repo_index];

        let file_index = match repo
            .files
            .iter()
            .position(|f| f.file_path == consumer.file_path)
        {
            Some(index) => index,
            None => {
                repo.files.push(FileConsumers {
                    file_path: consumer.file_path.clone(),
                    consumers: Vec::new(),
                });
                repo.files.len() - 1
            }
        };
        let file = &mut repo.files[file_index];

        if file
            .consumers
            .iter()
            .any(|c| c.line_number == consumer.line_number)
        {
            return false;
        }
        file.consumers.push(consumer);
        true
    }

    pub fn consumer_count(&self) -> usize {
        self.repositories.iter().map(|r| r.consumer_count()).sum()
    }

    /// Iterate every consumer in repository, file, line order
    pub fn iter(&self) -> impl Iterator<Item = &Consumer> {
        self.repositories
            .iter()
            .flat_map(|r| r.files.iter())
            .flat_map(|f| f.consumers.iter())
    }
}

/// A repository that could not be searched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRepository {
    pub repository: String,
    pub reason: String,
}

/// Result of consumer discovery across the configured repositories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerReport {
    pub targets: Vec<TargetConsumers>,
    /// At least one repository timed out, failed or returned partial results
    pub search_incomplete: bool,
    #[serde(default)]
    pub failed_repositories: Vec<FailedRepository>,
}

impl ConsumerReport {
    /// Get or create the group for a target
    pub fn target_mut(&mut self, target: &str) -> &mut TargetConsumers {
        let index = match self.targets.iter().position(|t| t.target == target) {
            Some(index) => index,
            None => {
                self.targets.push(TargetConsumers::new(target));
                self.targets.len() - 1
            }
        };
        &mut self.targets[index]
    }

    pub fn target(&self, target: &str) -> Option<&TargetConsumers> {
        self.targets.iter().find(|t| t.target == target)
    }

    /// Number of distinct consumer locations across all targets
    pub fn total_consumers(&self) -> usize {
        self.targets
            .iter()
            .flat_map(|t| t.iter())
            .map(|c| (c.repository.as_str(), c.file_path.as_str(), c.line_number))
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Number of distinct repositories holding at least one consumer
    pub fn repository_count(&self) -> usize {
        let mut repos: Vec<&str> = self
            .targets
            .iter()
            .flat_map(|t| t.repositories.iter())
            .filter(|r| r.consumer_count() > 0)
            .map(|r| r.repository.as_str())
            .collect();
        repos.sort_unstable();
        repos.dedup();
        repos.len()
    }

    pub fn mark_failed(&mut self, repository: impl Into<String>, reason: impl Into<String>) {
        self.search_incomplete = true;
        self.failed_repositories.push(FailedRepository {
            repository: repository.into(),
            reason: reason.into(),
        });
    }
}
