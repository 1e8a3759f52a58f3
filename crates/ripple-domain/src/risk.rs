//! Risk score and severity levels

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound of every risk score
pub const MAX_SCORE: f64 = 10.0;

/// Severity level derived from a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Map a score to its level using the fixed thresholds 4, 6.5 and 8.5
    pub fn from_score(score: f64) -> Self {
        if score < 4.0 {
            RiskLevel::Low
        } else if score < 6.5 {
            RiskLevel::Medium
        } else if score < 8.5 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-factor contributions to a score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    /// Dependency fan-out contribution (0-4)
    pub technical: f64,
    /// Criticality tag contribution (0-3)
    pub domain: f64,
    /// Advisor-identified risk contribution (0-2)
    pub semantic: f64,
    /// 1.0 when nothing is breaking, up to 1.5 otherwise
    pub breaking_multiplier: f64,
}

impl Default for RiskBreakdown {
    fn default() -> Self {
        Self {
            technical: 0.0,
            domain: 0.0,
            semantic: 0.0,
            breaking_multiplier: 1.0,
        }
    }
}

impl RiskBreakdown {
    pub fn base_sum(&self) -> f64 {
        self.technical + self.domain + self.semantic
    }
}

/// Final 0-10 score with its level and explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub score: f64,
    pub level: RiskLevel,
    pub breakdown: RiskBreakdown,
    #[serde(default)]
    pub rationale: Vec<String>,
}

impl RiskScore {
    /// Build a score, clamping to [0, 10] and deriving the level.
    ///
    /// Non-finite inputs collapse to 0.
    pub fn new(raw_score: f64, breakdown: RiskBreakdown, rationale: Vec<String>) -> Self {
        let score = if raw_score.is_finite() {
            raw_score.clamp(0.0, MAX_SCORE)
        } else {
            0.0
        };
        Self {
            score,
            level: RiskLevel::from_score(score),
            breakdown,
            rationale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(3.99), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(4.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(6.49), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(6.5), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(8.49), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(8.5), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(10.0), RiskLevel::Critical);
    }

    #[test]
    fn test_score_is_clamped() {
        let high = RiskScore::new(12.3, RiskBreakdown::default(), vec![]);
        assert_eq!(high.score, 10.0);
        assert_eq!(high.level, RiskLevel::Critical);

        let low = RiskScore::new(-1.0, RiskBreakdown::default(), vec![]);
        assert_eq!(low.score, 0.0);

        let nan = RiskScore::new(f64::NAN, RiskBreakdown::default(), vec![]);
        assert_eq!(nan.score, 0.0);
        assert_eq!(nan.level, RiskLevel::Low);
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::Medium > RiskLevel::Low);
    }
}
