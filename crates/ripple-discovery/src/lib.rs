//! Ripple Discovery
//!
//! Finds cross-repository consumers of changed endpoints and schema entities:
//! - Endpoint and entity search patterns
//! - Clone-and-grep backend over local or cached git checkouts
//! - Remote backend over a hosted code-search API
//! - Bounded-concurrency fan-out with per-repository timeouts; failures
//!   degrade to a partial, flagged report

pub mod backend;
pub mod clone_grep;
pub mod config;
pub mod discovery;
pub mod error;
pub mod pattern;
pub mod remote;

pub use backend::{SearchBackend, SearchHits};
pub use clone_grep::CloneGrepBackend;
pub use config::{DiscoveryConfig, RepositoryConfig, SearchStrategy};
pub use discovery::ConsumerDiscovery;
pub use error::{DiscoveryError, Result};
pub use pattern::SearchPattern;
pub use remote::RemoteSearchBackend;
