//! Change event normalization
//!
//! Converts a raw event from any source adapter into a [`ChangeDescriptor`].
//! The `kind` discriminator is mandatory and an event that carries fields of
//! more than one change kind is rejected instead of coerced.

use chrono::{DateTime, Utc};
use ripple_domain::{
    ApiContractChange, ChangeDescriptor, ChangePayload, CodeChange, DatabaseKind, SchemaChange,
};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AnalysisError, Result};
use crate::openapi::parse_api_spec;

const CODE_FIELDS: &[&str] = &["file_path", "filePath", "diff", "commit_message", "commitMessage"];
const SCHEMA_FIELDS: &[&str] = &[
    "database_kind",
    "databaseKind",
    "entity_name",
    "entityName",
    "table",
    "collection",
    "field_name",
    "fieldName",
    "ddl_or_operation",
    "ddlOrOperation",
    "ddl",
    "operation",
    "operationType",
];
const API_FIELDS: &[&str] = &[
    "before_spec",
    "beforeSpec",
    "after_spec",
    "afterSpec",
    "before",
    "after",
];

/// Namespace for analysis ids derived from event content
fn analysis_namespace() -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, b"urn:ripple:analysis")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Code,
    Schema,
    ApiContract,
}

impl EventKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "code_change" | "code" => Some(EventKind::Code),
            "schema_change" | "schema" => Some(EventKind::Schema),
            "api_contract_change" | "api_contract" | "api" => Some(EventKind::ApiContract),
            _ => None,
        }
    }

    fn fields(&self) -> &'static [&'static str] {
        match self {
            EventKind::Code => CODE_FIELDS,
            EventKind::Schema => SCHEMA_FIELDS,
            EventKind::ApiContract => API_FIELDS,
        }
    }

    fn all() -> [EventKind; 3] {
        [EventKind::Code, EventKind::Schema, EventKind::ApiContract]
    }
}

/// Normalize a raw JSON event text
pub fn normalize_str(raw: &str) -> Result<ChangeDescriptor> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AnalysisError::malformed(format!("event is not valid JSON: {}", e)))?;
    normalize(&value)
}

/// Normalize a raw event into a change descriptor.
///
/// Returns `MalformedEvent` when the discriminator is missing or unknown,
/// when a required field of the variant is absent, or when the event mixes
/// fields of several variants.
pub fn normalize(raw: &Value) -> Result<ChangeDescriptor> {
    let event = raw
        .as_object()
        .ok_or_else(|| AnalysisError::malformed("event must be a JSON object"))?;

    let kind_label = event
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| AnalysisError::malformed("missing `kind` discriminator"))?;
    let kind = EventKind::parse(kind_label)
        .ok_or_else(|| AnalysisError::malformed(format!("unknown event kind '{}'", kind_label)))?;

    for other in EventKind::all().into_iter().filter(|k| *k != kind) {
        if let Some(field) = other.fields().iter().find(|f| event.contains_key(**f)) {
            return Err(AnalysisError::malformed(format!(
                "{} event carries `{}`, which belongs to another change kind",
                kind_label, field
            )));
        }
    }

    let change = match kind {
        EventKind::Code => ChangePayload::Code(code_change(event)?),
        EventKind::Schema => ChangePayload::Schema(schema_change(event)?),
        EventKind::ApiContract => ChangePayload::ApiContract(api_change(event)?),
    };

    let analysis_id = match event.get("analysis_id").or_else(|| event.get("analysisId")) {
        Some(Value::String(id)) => Uuid::parse_str(id)
            .map_err(|e| AnalysisError::malformed(format!("invalid analysis_id '{}': {}", id, e)))?,
        Some(other) => {
            return Err(AnalysisError::malformed(format!(
                "analysis_id must be a string, got {}",
                other
            )))
        }
        None => derive_analysis_id(&change)?,
    };

    let timestamp = match event.get("timestamp") {
        Some(Value::String(ts)) => DateTime::parse_from_rfc3339(ts)
            .map_err(|e| AnalysisError::malformed(format!("invalid timestamp '{}': {}", ts, e)))?
            .with_timezone(&Utc),
        Some(other) => {
            return Err(AnalysisError::malformed(format!(
                "timestamp must be an RFC 3339 string, got {}",
                other
            )))
        }
        None => Utc::now(),
    };

    let descriptor = ChangeDescriptor::new(analysis_id, timestamp, change);
    debug!(
        analysis_id = %descriptor.analysis_id(),
        analysis_type = %descriptor.analysis_type(),
        "Normalized change event"
    );
    Ok(descriptor)
}

/// Content-derived id, stable across resubmissions of the same change
pub fn derive_analysis_id(change: &ChangePayload) -> Result<Uuid> {
    let canonical = serde_json::to_vec(change)
        .map_err(|e| AnalysisError::malformed(format!("cannot canonicalize event: {}", e)))?;
    Ok(Uuid::new_v5(&analysis_namespace(), &canonical))
}

fn field<'a>(event: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| event.get(*name))
}

fn required_string(event: &Map<String, Value>, names: &[&str]) -> Result<String> {
    match field(event, names) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(AnalysisError::malformed(format!("`{}` cannot be empty", names[0]))),
        Some(_) => Err(AnalysisError::malformed(format!("`{}` must be a string", names[0]))),
        None => Err(AnalysisError::malformed(format!("missing `{}`", names[0]))),
    }
}

fn optional_string(event: &Map<String, Value>, names: &[&str]) -> Result<Option<String>> {
    match field(event, names) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(AnalysisError::malformed(format!("`{}` must be a string", names[0]))),
    }
}

fn code_change(event: &Map<String, Value>) -> Result<CodeChange> {
    let diff = match field(event, &["diff"]) {
        Some(Value::String(diff)) => diff.clone(),
        Some(_) => return Err(AnalysisError::malformed("`diff` must be a string")),
        None => return Err(AnalysisError::malformed("missing `diff`")),
    };
    Ok(CodeChange {
        file_path: required_string(event, &["file_path", "filePath"])?,
        diff,
        commit_sha: optional_string(event, &["commit_sha", "commitSha"])?.unwrap_or_default(),
        commit_message: optional_string(event, &["commit_message", "commitMessage"])?.unwrap_or_default(),
    })
}

fn schema_change(event: &Map<String, Value>) -> Result<SchemaChange> {
    let has_table = event.contains_key("table");
    let has_collection = event.contains_key("collection");
    if has_table && has_collection {
        return Err(AnalysisError::malformed(
            "schema event names both a table and a collection",
        ));
    }

    let declared = optional_string(event, &["database_kind", "databaseKind"])?
        .map(|label| parse_database_kind(&label))
        .transpose()?;
    let implied = if has_table {
        Some(DatabaseKind::Relational)
    } else if has_collection {
        Some(DatabaseKind::Document)
    } else {
        None
    };
    let database_kind = match (declared, implied) {
        (Some(declared), Some(implied)) if declared != implied => {
            return Err(AnalysisError::malformed(format!(
                "database_kind '{}' contradicts the entity field",
                declared
            )))
        }
        (Some(kind), _) | (None, Some(kind)) => kind,
        (None, None) => return Err(AnalysisError::malformed("missing `database_kind`")),
    };

    Ok(SchemaChange {
        database_kind,
        entity_name: required_string(event, &["entity_name", "entityName", "table", "collection"])?,
        field_name: optional_string(event, &["field_name", "fieldName"])?,
        ddl_or_operation: required_string(
            event,
            &["ddl_or_operation", "ddlOrOperation", "ddl", "operation", "operationType"],
        )?,
    })
}

fn parse_database_kind(label: &str) -> Result<DatabaseKind> {
    match label.to_ascii_lowercase().as_str() {
        "relational" | "sql" | "postgres" | "postgresql" | "mysql" => Ok(DatabaseKind::Relational),
        "document" | "mongo" | "mongodb" => Ok(DatabaseKind::Document),
        other => Err(AnalysisError::malformed(format!("unknown database_kind '{}'", other))),
    }
}

fn api_change(event: &Map<String, Value>) -> Result<ApiContractChange> {
    let before = field(event, &["before_spec", "beforeSpec", "before"])
        .ok_or_else(|| AnalysisError::malformed("missing `before_spec`"))?;
    let after = field(event, &["after_spec", "afterSpec", "after"])
        .ok_or_else(|| AnalysisError::malformed("missing `after_spec`"))?;

    Ok(ApiContractChange {
        before_spec: parse_api_spec(before)?,
        after_spec: parse_api_spec(after)?,
        repository: optional_string(event, &["repository"])?.unwrap_or_default(),
        commit_sha: optional_string(event, &["commit_sha", "commitSha"])?.unwrap_or_default(),
    })
}
