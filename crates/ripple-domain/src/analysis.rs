//! The `Analysis` aggregate and the per-type impact sections it carries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::change::{AnalysisType, ChangeDescriptor};
use crate::consumer::ConsumerReport;
use crate::contract::{ApiChangeItem, ChangeType};
use crate::errors::ErrorCode;
use crate::graph::{DependencyEdge, EdgeKind, EntityRef, GraphView};
use crate::insights::SemanticInsights;
use crate::risk::RiskScore;

/// An entity reached while walking the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentEntity {
    pub entity: EntityRef,
    /// Kind of the edge that first reached this entity
    pub edge_kind: EdgeKind,
    /// Distance from the changed entity
    pub hops: u32,
    /// Entity the traversal came from, absent at hop 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<EntityRef>,
}

/// Dependents of a changed source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDependencies {
    pub direct: Vec<DependentEntity>,
    pub indirect: Vec<DependentEntity>,
    pub reverse_direct: Vec<DependentEntity>,
    pub reverse_indirect: Vec<DependentEntity>,
}

impl CodeDependencies {
    pub fn total(&self) -> usize {
        self.direct.len() + self.indirect.len() + self.reverse_direct.len() + self.reverse_indirect.len()
    }
}

/// A code file referencing a schema entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDependency {
    pub file: EntityRef,
    /// Distinct call sites in the file referencing the entity
    pub usage_count: u32,
}

/// Relationships around a changed table or collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaRelationships {
    pub code_dependencies: Vec<CodeDependency>,
    /// Other schema entities linked through foreign keys
    pub affected_entities: Vec<EntityRef>,
    /// Foreign keys declared by the changed entity
    pub forward_relationships: Vec<DependencyEdge>,
    /// Foreign keys pointing at the changed entity
    pub reverse_relationships: Vec<DependencyEdge>,
}

impl SchemaRelationships {
    pub fn total_usage(&self) -> u32 {
        self.code_dependencies
            .iter()
            .fold(0u32, |total, d| total.saturating_add(d.usage_count))
    }
}

/// Type-specific impact section of an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactDetails {
    Dependencies(CodeDependencies),
    SchemaRelationships(SchemaRelationships),
    ApiChanges(Vec<ApiChangeItem>),
}

impl ImpactDetails {
    pub fn api_changes(&self) -> &[ApiChangeItem] {
        match self {
            ImpactDetails::ApiChanges(items) => items,
            ImpactDetails::Dependencies(_) | ImpactDetails::SchemaRelationships(_) => &[],
        }
    }

    pub fn has_breaking_change(&self) -> bool {
        self.api_changes().iter().any(|item| item.breaking)
    }
}

/// Totals used by downstream consumers of an analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    pub direct_dependencies: usize,
    pub indirect_dependencies: usize,
    pub reverse_dependencies: usize,
    pub affected_entities: usize,
    pub code_dependencies: usize,
    pub api_changes: usize,
    pub breaking_changes: usize,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub consumers: usize,
    pub consumer_repositories: usize,
    pub risks: usize,
}

impl SummaryCounts {
    /// Tally an API change list into the change-type counters
    pub fn count_api_changes(&mut self, items: &[ApiChangeItem]) {
        self.api_changes = items.len();
        for item in items {
            if item.breaking {
                self.breaking_changes += 1;
            }
            match item.change_type {
                ChangeType::Added => self.added += 1,
                ChangeType::Removed => self.removed += 1,
                ChangeType::Modified => self.modified += 1,
                ChangeType::Breaking => {}
            }
        }
    }
}

/// Recoverable failures absorbed during the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradationFlags {
    pub search_incomplete: bool,
    pub semantic_advisor_degraded: bool,
    pub semantic_parse_degraded: bool,
    pub graph_writeback_failed: bool,
    pub score_out_of_range: bool,
}

impl DegradationFlags {
    /// Error codes corresponding to the raised flags
    pub fn codes(&self) -> Vec<ErrorCode> {
        let mut codes = Vec::new();
        if self.search_incomplete {
            codes.push(ErrorCode::SearchIncomplete);
        }
        if self.semantic_advisor_degraded {
            codes.push(ErrorCode::SemanticAdvisorDegraded);
        }
        if self.score_out_of_range {
            codes.push(ErrorCode::ScoreOutOfRange);
        }
        codes
    }

    pub fn is_degraded(&self) -> bool {
        self.search_incomplete
            || self.semantic_advisor_degraded
            || self.semantic_parse_degraded
            || self.graph_writeback_failed
    }
}

/// Aggregate root of one impact analysis.
///
/// Built once by the assembler; afterwards only `visualization` may be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub analysis_type: AnalysisType,
    pub change: ChangeDescriptor,
    pub impact: ImpactDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumers: Option<ConsumerReport>,
    pub semantic_insights: SemanticInsights,
    pub risk_score: RiskScore,
    pub summary_counts: SummaryCounts,
    #[serde(default)]
    pub flags: DegradationFlags,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization: Option<GraphView>,
}

impl Analysis {
    pub fn is_breaking(&self) -> bool {
        self.impact.has_breaking_change()
    }
}
