//! API contract model and classified API change items

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::EntityRef;

/// A single parameter of an endpoint definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "type", alias = "param_type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, required: bool, param_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            required,
            param_type: param_type.map(str::to_string),
            default: None,
        }
    }

    /// Whether existing callers must start sending this parameter
    pub fn is_mandatory(&self) -> bool {
        self.required && self.default.is_none()
    }
}

/// Matching key of an endpoint: upper-cased method plus literal path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub method: String,
    pub path: String,
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// One endpoint definition of an API contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default, alias = "responseType", skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
}

impl EndpointSpec {
    pub fn new(method: &str, path: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.into(),
            parameters: Vec::new(),
            response_type: None,
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_response_type(mut self, response_type: impl Into<String>) -> Self {
        self.response_type = Some(response_type.into());
        self
    }

    pub fn key(&self) -> EndpointKey {
        EndpointKey {
            method: self.method.to_ascii_uppercase(),
            path: self.path.clone(),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Ordered collection of endpoint definitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiSpec {
    pub endpoints: Vec<EndpointSpec>,
}

impl ApiSpec {
    pub fn new(endpoints: Vec<EndpointSpec>) -> Self {
        Self { endpoints }
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Classification of one changed API unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
    Breaking,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeType::Added => "ADDED",
            ChangeType::Removed => "REMOVED",
            ChangeType::Modified => "MODIFIED",
            ChangeType::Breaking => "BREAKING",
        };
        f.write_str(label)
    }
}

/// What moved inside a matched endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationKind {
    EndpointAdded,
    EndpointRemoved,
    ParameterAdded,
    ParameterRemoved,
    ParameterTypeChanged,
    ParameterBecameRequired,
    ParameterBecameOptional,
    ResponseTypeChanged,
    ResponseTypeRemoved,
    ResponseTypeAdded,
}

/// A single parameter or response delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    pub kind: ModificationKind,
    /// Parameter name, or `response` for response type deltas
    pub target: String,
    pub breaking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// Structured explanation of an API change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDetails {
    pub reason: String,
    #[serde(default)]
    pub modifications: Vec<Modification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<EndpointSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<EndpointSpec>,
    /// Old path this endpoint most likely replaces, when the classifier
    /// paired a removal and an addition by parameter shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possible_rename_of: Option<String>,
}

/// Details of an API change: free text or a structured delta record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeDetails {
    Text(String),
    Structured(StructuredDetails),
}

impl ChangeDetails {
    /// Human-readable reason regardless of representation
    pub fn reason(&self) -> &str {
        match self {
            ChangeDetails::Text(text) => text,
            ChangeDetails::Structured(details) => &details.reason,
        }
    }

    pub fn modifications(&self) -> &[Modification] {
        match self {
            ChangeDetails::Text(_) => &[],
            ChangeDetails::Structured(details) => &details.modifications,
        }
    }
}

/// A classified change to one endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiChangeItem {
    pub endpoint: String,
    pub method: String,
    pub change_type: ChangeType,
    /// Whether existing consumers break; always true for REMOVED and BREAKING
    pub breaking: bool,
    pub details: ChangeDetails,
}

impl ApiChangeItem {
    /// Create an item; the breaking flag follows from the change type
    pub fn new(
        endpoint: impl Into<String>,
        method: &str,
        change_type: ChangeType,
        details: ChangeDetails,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.to_ascii_uppercase(),
            change_type,
            breaking: matches!(change_type, ChangeType::Removed | ChangeType::Breaking),
            details,
        }
    }

    /// Grouping key used for consumers, e.g. `POST /api/stocks/buy`
    pub fn endpoint_key(&self) -> String {
        format!("{} {}", self.method, self.endpoint)
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::endpoint(&self.method, &self.endpoint)
    }
}
