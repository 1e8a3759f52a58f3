//! Ripple Analysis
//!
//! The change impact analysis pipeline:
//! - Normalization of raw change events into `ChangeDescriptor`s
//! - Bounded, cancellation-safe dependency resolution over the graph gateway
//! - Breaking-change classification of API contract diffs
//! - Deterministic multi-factor risk scoring
//! - Analysis assembly with graph write-back
//! - `ImpactEngine`, the inbound entry point, with idempotent re-submission
//!   and visualization query surfaces
//! - Layered YAML + environment configuration

pub mod assembler;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod normalizer;
pub mod openapi;
pub mod resolver;
pub mod risk;
pub mod store;

pub use assembler::{consumer_edges, summary_counts, AnalysisAssembler, StageOutputs};
pub use classifier::{classify, parameter_similarity, RENAME_SIMILARITY};
pub use config::{EngineConfig, ResolverConfig, RiskConfig, TagRule};
pub use engine::{parse_entity, ImpactEngine, DEPENDENCY_GRAPH_HOPS};
pub use error::{AnalysisError, Result};
pub use normalizer::{derive_analysis_id, normalize, normalize_str};
pub use openapi::parse_api_spec;
pub use resolver::DependencyResolver;
pub use risk::{RiskScorer, RiskSignals, ScoreOutcome};
pub use store::{AnalysisStore, InMemoryAnalysisStore};
