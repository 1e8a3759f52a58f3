//! Reconciles the advisor's free-text output into structured insights
//!
//! The model is asked for `{summary, risks[], recommendations[]}` JSON but
//! the reply is untrusted: it may be fenced, prefixed with a stray token,
//! carry raw control characters inside strings, or be cut off mid-object.
//! Recovery runs strict parse, then control-character escaping, then
//! balanced-block extraction, and finally per-field pattern extraction.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use ripple_domain::{InsightSeverity, RiskInsight, SemanticInsights, FALLBACK_SUMMARY};
use serde_json::{Map, Value};
use tracing::{debug, warn};

fn summary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)"summary"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("Invalid regex")
    })
}

/// HTTP verbs that lost their first letter in the model's output channel
fn truncated_verb_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(^|[^A-Za-z])(OST|ET|UT|ATCH|ELETE)(\s+/)").expect("Invalid regex")
    })
}

/// Fields pulled out of an advisor reply before normalization
#[derive(Debug, Default)]
struct Recovered {
    summary: Option<String>,
    risks: Vec<Value>,
    recommendations: Vec<Value>,
}

impl Recovered {
    fn from_object(object: &Map<String, Value>) -> Self {
        let list = |key: &str| match object.get(key) {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![Value::String(s.clone())],
            _ => Vec::new(),
        };
        Self {
            summary: object.get("summary").and_then(Value::as_str).map(str::to_string),
            risks: list("risks"),
            recommendations: list("recommendations"),
        }
    }

    /// Field-level extraction for replies that do not parse as a whole
    fn scan(text: &str) -> Self {
        Self {
            summary: extract_summary(text),
            risks: extract_array(text, "risks"),
            recommendations: extract_array(text, "recommendations"),
        }
    }

    fn into_insights(self) -> SemanticInsights {
        let summary = self
            .summary
            .map(|s| repair_text(&s))
            .filter(|s| !s.trim().is_empty());
        let semantic_parse_degraded = summary.is_none();

        let mut risks: Vec<RiskInsight> = self.risks.iter().filter_map(normalize_risk).collect();
        let recommendations: Vec<String> = self
            .recommendations
            .iter()
            .filter_map(normalize_recommendation)
            .collect();

        for (risk, recommendation) in risks.iter_mut().zip(&recommendations) {
            if risk.recommendation.is_none() {
                risk.recommendation = Some(recommendation.clone());
            }
        }

        SemanticInsights {
            summary: summary.unwrap_or_else(|| FALLBACK_SUMMARY.to_string()),
            risks,
            recommendations,
            semantic_parse_degraded,
            advisor_degraded: false,
        }
    }
}

/// Turn raw advisor text into `SemanticInsights`.
///
/// Never fails: when no summary can be recovered the fixed fallback is used
/// and `semantic_parse_degraded` is set.
pub fn reconcile(raw: &str) -> SemanticInsights {
    let recovered = match parse_strict(raw) {
        Some(object) => Recovered::from_object(&object),
        None => {
            let cleaned = strip_wrappers(raw);
            match parse_object(cleaned) {
                Some(object) => Recovered::from_object(&object),
                None => {
                    debug!(length = raw.len(), "Advisor reply is not valid JSON, scanning fields");
                    Recovered::scan(cleaned)
                }
            }
        }
    };

    let insights = recovered.into_insights();
    if insights.semantic_parse_degraded {
        warn!("No summary recovered from advisor reply, using fallback");
    }
    insights
}

/// The reply as-is, or from its first `{`, when that parses without repair
fn parse_strict(raw: &str) -> Option<Map<String, Value>> {
    let text = raw.trim();
    as_object(text).or_else(|| as_object(text[text.find('{')?..].trim_end()))
}

/// Drop a code fence that opens the reply, its closing fence, and any
/// token before the first `{`
pub fn strip_wrappers(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(inner) = text.strip_prefix("```") {
        let inner = match inner.find('\n') {
            Some(newline) if inner[..newline].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
                &inner[newline + 1..]
            }
            _ => inner,
        };
        text = inner.trim_end().strip_suffix("```").unwrap_or(inner);
    }

    if let Some(brace) = text.find('{') {
        text = &text[brace..];
    }
    text.trim()
}

fn as_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    if let Some(map) = as_object(text) {
        return Some(map);
    }
    let escaped = escape_control_chars(text);
    if let Some(map) = as_object(&escaped) {
        debug!("Advisor reply parsed after escaping control characters");
        return Some(map);
    }
    let start = escaped.find('{')?;
    let block = balanced_block(&escaped, start, '{', '}')?;
    as_object(block)
}

/// Escape raw control characters that appear inside JSON string literals
pub fn escape_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                c if c.is_control() => push_escaped_control(&mut out, c),
                c => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }
    out
}

fn push_escaped_control(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c => out.push_str(&format!("\\u{:04x}", c as u32)),
    }
}

/// Slice from `start` (which must hold `open`) to its matching `close`,
/// ignoring delimiters inside string literals
fn balanced_block(text: &str, start: usize, open: char, close: char) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(&text[start..start + offset + c.len_utf8()]);
            }
        }
    }
    None
}

/// Recover the `summary` string even when the surrounding object is broken
pub fn extract_summary(text: &str) -> Option<String> {
    let captured = summary_regex().captures(text)?.get(1)?.as_str();

    let mut fragment = String::with_capacity(captured.len() + 2);
    fragment.push('"');
    for c in captured.chars() {
        if c.is_control() {
            push_escaped_control(&mut fragment, c);
        } else {
            fragment.push(c);
        }
    }
    fragment.push('"');

    match serde_json::from_str::<String>(&fragment) {
        Ok(summary) => Some(summary),
        Err(_) => Some(
            captured
                .replace("\\\"", "\"")
                .replace("\\n", "\n")
                .replace("\\t", "\t")
                .replace("\\\\", "\\"),
        ),
    }
}

fn extract_array(text: &str, key: &str) -> Vec<Value> {
    let Ok(re) = Regex::new(&format!(r#""{}"\s*:\s*\["#, regex::escape(key))) else {
        return Vec::new();
    };
    let Some(found) = re.find(text) else {
        return Vec::new();
    };
    let start = found.end() - 1;
    let Some(block) = balanced_block(text, start, '[', ']') else {
        return Vec::new();
    };
    serde_json::from_str::<Vec<Value>>(&escape_control_chars(block)).unwrap_or_default()
}

/// Apply the enumerated output-channel repairs
pub fn repair_text(text: &str) -> String {
    truncated_verb_regex()
        .replace_all(text, |caps: &Captures| {
            let verb = match &caps[2] {
                "OST" => "POST",
                "ET" => "GET",
                "UT" => "PUT",
                "ATCH" => "PATCH",
                "ELETE" => "DELETE",
                other => other,
            };
            format!("{}{}{}", &caps[1], verb, &caps[3])
        })
        .into_owned()
}

fn text_of(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(text_of)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(repair_text(&text))
    }
}

fn first_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(text_of)
}

fn normalize_risk(value: &Value) -> Option<RiskInsight> {
    match value {
        Value::Object(object) => {
            let technical_context = first_text(
                object,
                &["technical_context", "technicalContext", "technical", "context"],
            );
            let title = first_text(object, &["title", "risk", "name", "description", "summary"])
                .or_else(|| technical_context.clone())?;

            Some(RiskInsight {
                title,
                technical_context,
                business_impact: first_text(object, &["business_impact", "businessImpact", "impact"]),
                cascading_effects: first_text(
                    object,
                    &["cascading_effects", "cascadingEffects", "cascading", "effects"],
                ),
                recommendation: first_text(object, &["recommendation", "mitigation"]),
                severity: first_text(object, &["severity", "level", "priority"])
                    .and_then(|s| InsightSeverity::parse(&s)),
            })
        }
        other => text_of(other).map(RiskInsight::titled),
    }
}

fn normalize_recommendation(value: &Value) -> Option<String> {
    match value {
        Value::Object(object) => first_text(
            object,
            &["recommendation", "title", "action", "description", "text"],
        ),
        other => text_of(other),
    }
}
