//! Ripple Domain
//!
//! Core data model shared by every stage of the change impact pipeline:
//! - Change descriptors for code diffs, schema mutations and API contract diffs
//! - Dependency graph entities, typed edges and visualization views
//! - API contract definitions and classified change items
//! - Cross-repository consumers grouped by target, repository and file
//! - Risk scores, semantic insights and the `Analysis` aggregate
//!
//! # Examples
//!
//! ```ignore
//! use ripple_domain::{EntityRef, RiskLevel};
//!
//! let table = EntityRef::table("accounts");
//! assert_eq!(table.to_string(), "TABLE:accounts");
//! assert_eq!(RiskLevel::from_score(7.0), RiskLevel::High);
//! ```

pub mod analysis;
pub mod change;
pub mod consumer;
pub mod contract;
pub mod errors;
pub mod graph;
pub mod insights;
pub mod risk;

pub use analysis::{
    Analysis, CodeDependencies, CodeDependency, DegradationFlags, DependentEntity, ImpactDetails,
    SchemaRelationships, SummaryCounts,
};
pub use change::{
    AnalysisType, ApiContractChange, ChangeDescriptor, ChangePayload, CodeChange, DatabaseKind,
    SchemaChange,
};
pub use consumer::{
    Consumer, ConsumerReport, FailedRepository, FileConsumers, RepositoryConsumers,
    TargetConsumers,
};
pub use contract::{
    ApiChangeItem, ApiSpec, ChangeDetails, ChangeType, EndpointKey, EndpointSpec, Modification,
    ModificationKind, ParameterSpec, StructuredDetails,
};
pub use errors::{DomainError, DomainResult, ErrorCode};
pub use graph::{
    DependencyEdge, Direction, EdgeKey, EdgeKind, EntityKind, EntityRef, GraphLink, GraphNode,
    GraphView,
};
pub use insights::{InsightSeverity, RiskInsight, SemanticInsights, FALLBACK_SUMMARY};
pub use risk::{RiskBreakdown, RiskLevel, RiskScore, MAX_SCORE};
