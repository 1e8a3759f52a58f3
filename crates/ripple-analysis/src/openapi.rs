//! API contract parsing
//!
//! Accepts an ordered array of endpoint definitions, an object wrapping
//! one under `endpoints`, or an OpenAPI-style document with `paths`. Any of
//! these may also arrive as a JSON or YAML string.

use ripple_domain::{ApiSpec, EndpointSpec, ParameterSpec};
use serde_json::{Map, Value};

use crate::error::{AnalysisError, Result};

const HTTP_METHODS: [&str; 8] = ["get", "put", "post", "delete", "patch", "head", "options", "trace"];

/// Parse one side of an API contract change
pub fn parse_api_spec(value: &Value) -> Result<ApiSpec> {
    match value {
        Value::String(text) => {
            let parsed = parse_text(text)?;
            if parsed.is_string() {
                return Err(AnalysisError::malformed("API spec string does not contain a document"));
            }
            parse_api_spec(&parsed)
        }
        Value::Array(_) => parse_endpoint_list(value),
        Value::Object(object) => {
            if let Some(paths) = object.get("paths") {
                parse_openapi(value, paths)
            } else if let Some(endpoints) = object.get("endpoints") {
                parse_endpoint_list(endpoints)
            } else {
                Err(AnalysisError::malformed(
                    "API spec object needs `paths` or `endpoints`",
                ))
            }
        }
        _ => Err(AnalysisError::malformed("API spec must be an array, object or string")),
    }
}

fn parse_text(text: &str) -> Result<Value> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        serde_json::from_str(text)
            .map_err(|e| AnalysisError::malformed(format!("invalid JSON API spec: {}", e)))
    } else {
        serde_yaml::from_str(text)
            .map_err(|e| AnalysisError::malformed(format!("invalid YAML API spec: {}", e)))
    }
}

fn parse_endpoint_list(value: &Value) -> Result<ApiSpec> {
    let endpoints: Vec<EndpointSpec> = serde_json::from_value(value.clone())
        .map_err(|e| AnalysisError::malformed(format!("invalid endpoint list: {}", e)))?;
    Ok(ApiSpec::new(
        endpoints
            .into_iter()
            .map(|mut endpoint| {
                endpoint.method = endpoint.method.to_ascii_uppercase();
                endpoint
            })
            .collect(),
    ))
}

fn parse_openapi(document: &Value, paths: &Value) -> Result<ApiSpec> {
    let paths = paths
        .as_object()
        .ok_or_else(|| AnalysisError::malformed("OpenAPI `paths` must be an object"))?;

    let mut endpoints = Vec::new();
    for (path, item) in paths {
        let Some(item) = resolve(document, item).as_object() else {
            continue;
        };
        let shared = parameter_list(document, item.get("parameters"));

        for method in HTTP_METHODS {
            let Some(operation) = item.get(method).map(|op| resolve(document, op)) else {
                continue;
            };
            let Some(operation) = operation.as_object() else {
                continue;
            };

            let mut endpoint = EndpointSpec::new(method, path.clone());
            let own = parameter_list(document, operation.get("parameters"));
            for parameter in shared.iter().chain(own.iter()) {
                match endpoint.parameters.iter_mut().find(|p| p.name == parameter.name) {
                    Some(existing) => *existing = parameter.clone(),
                    None => endpoint.parameters.push(parameter.clone()),
                }
            }
            endpoint
                .parameters
                .extend(request_body_parameters(document, operation));
            endpoint.response_type = response_type(document, operation);
            endpoints.push(endpoint);
        }
    }
    Ok(ApiSpec::new(endpoints))
}

/// Follow a local `$ref` such as `#/components/schemas/Order`
fn resolve<'a>(document: &'a Value, value: &'a Value) -> &'a Value {
    let mut current = value;
    for _ in 0..8 {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            break;
        };
        match reference
            .strip_prefix('#')
            .and_then(|pointer| document.pointer(pointer))
        {
            Some(target) => current = target,
            None => break,
        }
    }
    current
}

fn parameter_list(document: &Value, value: Option<&Value>) -> Vec<ParameterSpec> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let item = resolve(document, item);
            let name = item.get("name")?.as_str()?;
            let schema = item.get("schema");
            let param_type = schema
                .and_then(|s| type_name(document, s))
                .or_else(|| item.get("type").and_then(Value::as_str).map(str::to_string));
            let mut parameter = ParameterSpec::new(
                name,
                item.get("required").and_then(Value::as_bool).unwrap_or(false),
                None,
            );
            parameter.param_type = param_type;
            parameter.default = schema
                .and_then(|s| resolve(document, s).get("default"))
                .or_else(|| item.get("default"))
                .cloned();
            Some(parameter)
        })
        .collect()
}

/// Top-level properties of a JSON request body become body parameters
fn request_body_parameters(document: &Value, operation: &Map<String, Value>) -> Vec<ParameterSpec> {
    let Some(body) = operation.get("requestBody").map(|b| resolve(document, b)) else {
        return Vec::new();
    };
    let body_required = body.get("required").and_then(Value::as_bool).unwrap_or(false);
    let Some(schema) = first_media_schema(body).map(|s| resolve(document, s)) else {
        return Vec::new();
    };
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, property)| {
            let mut parameter = ParameterSpec::new(
                name.clone(),
                body_required && required.contains(&name.as_str()),
                None,
            );
            parameter.param_type = type_name(document, property);
            parameter.default = resolve(document, property).get("default").cloned();
            parameter
        })
        .collect()
}

/// Schema type of the first 2xx response, or `default`
fn response_type(document: &Value, operation: &Map<String, Value>) -> Option<String> {
    let responses = operation.get("responses")?.as_object()?;
    let mut codes: Vec<&String> = responses.keys().filter(|code| code.starts_with('2')).collect();
    codes.sort();
    let code = codes.first().copied().or_else(|| {
        responses.keys().find(|code| code.as_str() == "default")
    })?;
    let response = resolve(document, responses.get(code)?);
    type_name(document, first_media_schema(response)?)
}

/// Unresolved schema node of the JSON media type, or of the first one listed
fn first_media_schema(holder: &Value) -> Option<&Value> {
    let content = holder.get("content")?.as_object()?;
    let media = content
        .get("application/json")
        .or_else(|| content.values().next())?;
    media.get("schema")
}

/// Readable type name: referenced schema name, `array<T>` or the JSON type
fn type_name(document: &Value, schema: &Value) -> Option<String> {
    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
        return reference.rsplit('/').next().map(str::to_string);
    }
    match schema.get("type").and_then(Value::as_str) {
        Some("array") => {
            let items = schema
                .get("items")
                .and_then(|items| {
                    items
                        .get("$ref")
                        .and_then(Value::as_str)
                        .and_then(|r| r.rsplit('/').next().map(str::to_string))
                        .or_else(|| type_name(document, resolve(document, items)))
                })
                .unwrap_or_else(|| "any".to_string());
            Some(format!("array<{}>", items))
        }
        Some(other) => match schema.get("format").and_then(Value::as_str) {
            Some(format) => Some(format!("{}:{}", other, format)),
            None => Some(other.to_string()),
        },
        None => None,
    }
}
