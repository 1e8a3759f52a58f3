//! Clone-and-grep search backend
//!
//! Resolves each repository to a local checkout (searched in place, or cloned
//! into the cache directory and refreshed on reuse) and scans its text files
//! line by line.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use git2::Repository as GitRepository;
use ignore::WalkBuilder;
use ripple_domain::Consumer;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::backend::{SearchBackend, SearchHits};
use crate::config::{DiscoveryConfig, RepositoryConfig};
use crate::error::{DiscoveryError, Result};
use crate::pattern::SearchPattern;

/// Bytes inspected when sniffing for binary content
const BINARY_SNIFF_LEN: usize = 8000;

/// Blocking checkouts allowed at once unless configured otherwise
const DEFAULT_MAX_WORKERS: usize = 4;

/// Raised when the caller stops waiting, so blocking work winds down
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// A repository resolved to a directory on disk
#[derive(Debug, Clone)]
struct Checkout {
    root: PathBuf,
    revision: Option<String>,
}

/// Searches local or cloned checkouts with regex line matching.
///
/// Checkouts run on blocking threads, at most `max_workers` at a time. A
/// worker keeps its permit until its thread finishes, even when the caller
/// has already given up on it.
#[derive(Debug, Clone)]
pub struct CloneGrepBackend {
    cache_dir: PathBuf,
    max_file_size_bytes: u64,
    workers: Arc<Semaphore>,
}

impl CloneGrepBackend {
    pub fn new(cache_dir: impl Into<PathBuf>, max_file_size_bytes: u64) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            max_file_size_bytes,
            workers: Arc::new(Semaphore::new(DEFAULT_MAX_WORKERS)),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.workers = Arc::new(Semaphore::new(max_workers.max(1)));
        self
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.cache_dir.clone(), config.max_file_size_bytes)
            .with_max_workers(config.max_concurrency)
    }

    fn checkout(&self, repo: &RepositoryConfig, cancelled: &Arc<AtomicBool>) -> Result<Checkout> {
        if let Some(path) = &repo.path {
            if !path.is_dir() {
                return Err(DiscoveryError::RepositoryUnavailable(format!(
                    "{}: {} is not a directory",
                    repo.id,
                    path.display()
                )));
            }
            return Ok(Checkout {
                root: path.clone(),
                revision: head_revision(path),
            });
        }

        let url = repo.url.as_deref().ok_or_else(|| {
            DiscoveryError::ConfigError(format!("repository '{}' has no path or url", repo.id))
        })?;
        let dest = self.cache_dir.join(cache_key(&repo.id));

        if dest.join(".git").exists() {
            refresh_clone(&dest, repo, cancelled)?;
        } else {
            std::fs::create_dir_all(&self.cache_dir)?;
            debug!(repository = %repo.id, url = %url, dest = %dest.display(), "Cloning repository");
            let mut builder = git2::build::RepoBuilder::new();
            builder.fetch_options(fetch_options(cancelled));
            if let Some(branch) = &repo.branch {
                builder.branch(branch);
            }
            builder.clone(url, &dest).map_err(|e| {
                DiscoveryError::RepositoryUnavailable(format!(
                    "{}: clone of {} failed: {}",
                    repo.id, url, e
                ))
            })?;
            info!(repository = %repo.id, "Cloned repository");
        }

        Ok(Checkout {
            revision: head_revision(&dest),
            root: dest,
        })
    }

    fn grep(
        &self,
        checkout: &Checkout,
        repo: &RepositoryConfig,
        patterns: &[SearchPattern],
        cancelled: &AtomicBool,
    ) -> Vec<SearchHits> {
        let mut results = vec![SearchHits::default(); patterns.len()];
        let walker = WalkBuilder::new(&checkout.root)
            .hidden(true)
            .git_ignore(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut scanned = 0usize;
        for entry in walker {
            if cancelled.load(Ordering::Relaxed) {
                debug!(repository = %repo.id, files = scanned, "Search abandoned by caller");
                break;
            }
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!(repository = %repo.id, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            let path = entry.path();
            match entry.metadata() {
                Ok(meta) if meta.len() <= self.max_file_size_bytes => {}
                Ok(meta) => {
                    debug!(path = %path.display(), size = meta.len(), "Skipping oversized file");
                    continue;
                }
                Err(_) => continue,
            }

            let Some(content) = read_text(path) else {
                continue;
            };
            scanned += 1;

            let relative = relative_path(&checkout.root, path);
            for (pattern, hits) in patterns.iter().zip(results.iter_mut()) {
                for (line_number, context_snippet) in pattern.matching_lines(&content) {
                    hits.consumers.push(Consumer {
                        repository: repo.id.clone(),
                        file_path: relative.clone(),
                        line_number,
                        context_snippet,
                        source_url: source_url(repo, checkout.revision.as_deref(), &relative, line_number),
                    });
                }
            }
        }

        debug!(
            repository = %repo.id,
            files = scanned,
            hits = results.iter().map(|h| h.consumers.len()).sum::<usize>(),
            "Scanned checkout"
        );
        results
    }
}

#[async_trait]
impl SearchBackend for CloneGrepBackend {
    fn name(&self) -> &'static str {
        "clone_grep"
    }

    async fn search_repository(
        &self,
        repository: &RepositoryConfig,
        pattern: &SearchPattern,
    ) -> Result<SearchHits> {
        let mut results = self
            .search_repository_all(repository, std::slice::from_ref(pattern))
            .await?;
        Ok(results.pop().unwrap_or_default())
    }

    async fn search_repository_all(
        &self,
        repository: &RepositoryConfig,
        patterns: &[SearchPattern],
    ) -> Result<Vec<SearchHits>> {
        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| DiscoveryError::TaskFailed(e.to_string()))?;
        let cancelled = Arc::new(AtomicBool::new(false));
        let _cancel_on_drop = CancelOnDrop(cancelled.clone());

        let backend = self.clone();
        let repository = repository.clone();
        let patterns = patterns.to_vec();

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let checkout = backend.checkout(&repository, &cancelled)?;
            Ok(backend.grep(&checkout, &repository, &patterns, &cancelled))
        })
        .await
        .map_err(|e| DiscoveryError::TaskFailed(e.to_string()))?
    }
}

/// Fetch origin and hard-reset to the tracked branch; a failed fetch keeps
/// the existing checkout
fn refresh_clone(dest: &Path, repo: &RepositoryConfig, cancelled: &Arc<AtomicBool>) -> Result<()> {
    let git = GitRepository::open(dest)?;
    let branch = repo
        .branch
        .clone()
        .or_else(|| git.head().ok().and_then(|h| h.shorthand().map(str::to_string)));

    let fetched = {
        let mut remote = git.find_remote("origin")?;
        remote.fetch(&[] as &[&str], Some(&mut fetch_options(cancelled)), None)
    };
    if let Err(e) = fetched {
        warn!(repository = %repo.id, error = %e, "Fetch failed, searching cached checkout");
        return Ok(());
    }

    if let Some(branch) = branch {
        let name = format!("refs/remotes/origin/{}", branch);
        if let Ok(reference) = git.find_reference(&name) {
            let target = reference.peel(git2::ObjectType::Commit)?;
            git.reset(&target, git2::ResetType::Hard, None)?;
            debug!(repository = %repo.id, branch = %branch, "Refreshed cached clone");
        }
    }
    Ok(())
}

/// Transfers abort once `cancelled` is raised
fn fetch_options(cancelled: &Arc<AtomicBool>) -> git2::FetchOptions<'static> {
    let cancelled = cancelled.clone();
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.transfer_progress(move |_| !cancelled.load(Ordering::Relaxed));
    let mut options = git2::FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}

fn head_revision(path: &Path) -> Option<String> {
    let git = GitRepository::open(path).ok()?;
    let commit = git.head().ok()?.peel_to_commit().ok()?;
    Some(commit.id().to_string())
}

fn cache_key(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

/// Read a file as UTF-8 text, rejecting binary content
fn read_text(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    if bytes.iter().take(BINARY_SNIFF_LEN).any(|b| *b == 0) {
        return None;
    }
    String::from_utf8(bytes).ok()
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn source_url(repo: &RepositoryConfig, revision: Option<&str>, path: &str, line: u32) -> Option<String> {
    repo.web_url.as_ref().map(|base| {
        format!(
            "{}/blob/{}/{}#L{}",
            base.trim_end_matches('/'),
            revision.unwrap_or("HEAD"),
            path,
            line
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_filesystem_safe() {
        assert_eq!(cache_key("acme/web-app"), "acme_web-app");
        assert_eq!(cache_key("git@host:x"), "git_host_x");
    }

    #[test]
    fn test_source_url_uses_revision() {
        let repo = RepositoryConfig::local("web", "/tmp").with_web_url("https://git.example.com/acme/web/");
        assert_eq!(
            source_url(&repo, Some("abc"), "src/a.ts", 7).as_deref(),
            Some("https://git.example.com/acme/web/blob/abc/src/a.ts#L7")
        );
        assert_eq!(
            source_url(&RepositoryConfig::local("web", "/tmp"), None, "a", 1),
            None
        );
    }

    #[test]
    fn test_cancelled_grep_stops_scanning() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.ts"), "fetch('/api/stocks/buy')").unwrap();
        let backend = CloneGrepBackend::new(dir.path().join("cache"), 1024);
        let repo = RepositoryConfig::local("web", dir.path());
        let patterns = vec![SearchPattern::for_endpoint("POST", "/api/stocks/buy").unwrap()];
        let checkout = Checkout {
            root: dir.path().to_path_buf(),
            revision: None,
        };

        let live = backend.grep(&checkout, &repo, &patterns, &AtomicBool::new(false));
        assert_eq!(live[0].consumers.len(), 1);
        let abandoned = backend.grep(&checkout, &repo, &patterns, &AtomicBool::new(true));
        assert!(abandoned[0].consumers.is_empty());
    }

    #[tokio::test]
    async fn test_blocking_workers_are_bounded() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.ts"), "fetch('/api/stocks/buy')").unwrap();
        let backend = CloneGrepBackend::new(dir.path().join("cache"), 1024).with_max_workers(1);
        let repo = RepositoryConfig::local("web", dir.path());
        let patterns = vec![SearchPattern::for_endpoint("POST", "/api/stocks/buy").unwrap()];

        let busy = backend.workers.clone().acquire_owned().await.unwrap();
        let waiting = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            backend.search_repository_all(&repo, &patterns),
        )
        .await;
        assert!(waiting.is_err());

        drop(busy);
        let hits = backend.search_repository_all(&repo, &patterns).await.unwrap();
        assert_eq!(hits[0].consumers.len(), 1);
    }

    #[test]
    fn test_read_text_rejects_binary() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = dir.path().join("blob.bin");
        std::fs::write(&bin, [0x50u8, 0x00, 0x41]).unwrap();
        assert!(read_text(&bin).is_none());

        let txt = dir.path().join("a.txt");
        std::fs::write(&txt, "hello").unwrap();
        assert_eq!(read_text(&txt).as_deref(), Some("hello"));
    }
}
