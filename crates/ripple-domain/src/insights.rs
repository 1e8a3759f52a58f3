//! Reconciled output of the semantic advisor

use serde::{Deserialize, Serialize};

/// Summary used when nothing usable could be recovered from the advisor
pub const FALLBACK_SUMMARY: &str =
    "Semantic analysis unavailable; review the structural impact and risk score.";

/// Severity the advisor attached to a risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl InsightSeverity {
    /// Parse a free-form severity label; unknown labels yield `None`
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" | "minor" => Some(InsightSeverity::Low),
            "medium" | "moderate" => Some(InsightSeverity::Medium),
            "high" | "major" => Some(InsightSeverity::High),
            "critical" | "severe" | "blocker" => Some(InsightSeverity::Critical),
            _ => None,
        }
    }
}

/// One risk in uniform shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskInsight {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_impact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cascading_effects: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<InsightSeverity>,
}

impl RiskInsight {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Structured `{summary, risks, recommendations}` record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticInsights {
    pub summary: String,
    #[serde(default)]
    pub risks: Vec<RiskInsight>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// The summary is the fallback placeholder
    #[serde(default)]
    pub semantic_parse_degraded: bool,
    /// The advisor call failed after its retry
    #[serde(default)]
    pub advisor_degraded: bool,
}

impl SemanticInsights {
    /// Insights for an advisor that could not be reached or was disabled
    pub fn degraded() -> Self {
        Self {
            summary: FALLBACK_SUMMARY.to_string(),
            risks: Vec::new(),
            recommendations: Vec::new(),
            semantic_parse_degraded: true,
            advisor_degraded: true,
        }
    }
}
