//! Ripple Advisor
//!
//! Semantic enrichment for impact analyses:
//! - Context payloads describing a change and its structural impact
//! - An OpenAI-compatible chat-completions client behind the `SemanticAdvisor` port
//! - A timed, single-retry advisory service that degrades instead of failing
//! - A reconciler that repairs untrusted model output into `SemanticInsights`

pub mod advisor;
pub mod config;
pub mod context;
pub mod error;
pub mod reconciler;
pub mod service;

pub use advisor::{HttpSemanticAdvisor, SemanticAdvisor};
pub use config::AdvisorConfig;
pub use context::{ContextPayload, SYSTEM_PROMPT};
pub use error::{AdvisorError, Result};
pub use reconciler::reconcile;
pub use service::AdvisoryService;
