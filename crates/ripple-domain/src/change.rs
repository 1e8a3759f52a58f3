//! Canonical change descriptor produced by normalization

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contract::ApiSpec;
use crate::graph::{EdgeKind, EntityKind, EntityRef};

/// Storage family of a schema change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseKind {
    Relational,
    Document,
}

impl DatabaseKind {
    /// Graph node kind holding entities of this database family
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            DatabaseKind::Relational => EntityKind::Table,
            DatabaseKind::Document => EntityKind::Collection,
        }
    }

    /// Edge kind a code file uses to reference an entity of this family
    pub fn reference_edge_kind(&self) -> EdgeKind {
        match self {
            DatabaseKind::Relational => EdgeKind::ReferencesTable,
            DatabaseKind::Document => EdgeKind::ReferencesCollection,
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::Relational => f.write_str("relational"),
            DatabaseKind::Document => f.write_str("document"),
        }
    }
}

/// A source file diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChange {
    pub file_path: String,
    pub diff: String,
    pub commit_sha: String,
    pub commit_message: String,
}

/// A table or collection mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaChange {
    pub database_kind: DatabaseKind,
    pub entity_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    pub ddl_or_operation: String,
}

impl SchemaChange {
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.database_kind.entity_kind(), self.entity_name.clone())
    }
}

/// A before/after pair of API contracts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiContractChange {
    pub before_spec: ApiSpec,
    pub after_spec: ApiSpec,
    pub repository: String,
    pub commit_sha: String,
}

/// Exactly one populated change variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangePayload {
    #[serde(rename = "code_change")]
    Code(CodeChange),
    #[serde(rename = "schema_change")]
    Schema(SchemaChange),
    #[serde(rename = "api_contract_change")]
    ApiContract(ApiContractChange),
}

/// Which pipeline branch an analysis follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Code,
    Schema,
    ApiContract,
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisType::Code => f.write_str("code"),
            AnalysisType::Schema => f.write_str("schema"),
            AnalysisType::ApiContract => f.write_str("api_contract"),
        }
    }
}

/// Normalized change event.
///
/// Identity and timestamp are fixed at creation and the descriptor is never
/// mutated afterwards; stages only read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDescriptor {
    analysis_id: Uuid,
    timestamp: DateTime<Utc>,
    change: ChangePayload,
}

impl ChangeDescriptor {
    pub fn new(analysis_id: Uuid, timestamp: DateTime<Utc>, change: ChangePayload) -> Self {
        Self {
            analysis_id,
            timestamp,
            change,
        }
    }

    /// Create a descriptor with a random id, stamped now
    pub fn fresh(change: ChangePayload) -> Self {
        Self::new(Uuid::new_v4(), Utc::now(), change)
    }

    pub fn analysis_id(&self) -> Uuid {
        self.analysis_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn change(&self) -> &ChangePayload {
        &self.change
    }

    pub fn analysis_type(&self) -> AnalysisType {
        match self.change {
            ChangePayload::Code(_) => AnalysisType::Code,
            ChangePayload::Schema(_) => AnalysisType::Schema,
            ChangePayload::ApiContract(_) => AnalysisType::ApiContract,
        }
    }

    /// The graph entity the change lands on, if it maps to a single node
    pub fn changed_entity(&self) -> Option<EntityRef> {
        match &self.change {
            ChangePayload::Code(code) => Some(EntityRef::file(code.file_path.clone())),
            ChangePayload::Schema(schema) => Some(schema.entity_ref()),
            ChangePayload::ApiContract(_) => None,
        }
    }
}
