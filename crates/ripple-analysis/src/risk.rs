//! Risk scoring
//!
//! `score = (technical + domain + semantic) * breaking_multiplier`, clamped
//! to [0, 10]:
//! - technical (0-4): `min(4, log2(1 + direct + 0.5 * indirect))`
//! - domain (0-3): highest weight among the criticality tags matched by the
//!   changed or affected entities
//! - semantic (0-2): severity-weighted count of advisor risks
//! - breaking multiplier: `1 + 0.1 * min(consumer locations, 5)` when any
//!   change is breaking, otherwise 1
//!
//! Level thresholds are fixed in [`RiskLevel::from_score`].

use std::collections::{BTreeMap, BTreeSet};

use globset::{Glob, GlobMatcher};
use ripple_domain::{EntityRef, InsightSeverity, RiskBreakdown, RiskScore, SemanticInsights};
use tracing::{debug, error};

use crate::config::RiskConfig;
use crate::error::{AnalysisError, Result};

pub const TECHNICAL_MAX: f64 = 4.0;
pub const DOMAIN_MAX: f64 = 3.0;
pub const SEMANTIC_MAX: f64 = 2.0;
/// Consumer count beyond which the breaking multiplier stops growing
pub const BREAKING_CONSUMER_CAP: usize = 5;

/// Structural inputs to a score, gathered by the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskSignals {
    pub direct_count: usize,
    pub indirect_count: usize,
    /// Changed entity plus every affected entity, for tag lookup
    pub entities: Vec<EntityRef>,
    pub breaking_changes: usize,
    pub consumer_locations: usize,
}

/// A score plus whether the bug signal fired while computing it
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    pub score: RiskScore,
    pub out_of_range: bool,
}

/// Deterministic multi-factor risk scorer
#[derive(Debug, Clone)]
pub struct RiskScorer {
    rules: Vec<(GlobMatcher, Vec<String>)>,
    tag_weights: BTreeMap<String, f64>,
}

impl RiskScorer {
    pub fn new(config: &RiskConfig) -> Result<Self> {
        config.validate()?;
        let rules = config
            .tag_rules
            .iter()
            .map(|rule| {
                Glob::new(&rule.pattern)
                    .map(|glob| (glob.compile_matcher(), rule.tags.clone()))
                    .map_err(|e| {
                        AnalysisError::Configuration(format!(
                            "invalid tag rule '{}': {}",
                            rule.pattern, e
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            tag_weights: config.tag_weights.clone(),
        })
    }

    /// Fan-out contribution
    pub fn technical(direct: usize, indirect: usize) -> f64 {
        let fan_out = 1.0 + direct as f64 + 0.5 * indirect as f64;
        fan_out.log2().min(TECHNICAL_MAX)
    }

    /// Criticality tags carried by `entities`, sorted
    pub fn tags_for(&self, entities: &[EntityRef]) -> Vec<String> {
        let mut tags = BTreeSet::new();
        for entity in entities {
            let qualified = entity.to_string();
            for (matcher, rule_tags) in &self.rules {
                if matcher.is_match(&qualified) || matcher.is_match(&entity.identifier) {
                    tags.extend(rule_tags.iter().cloned());
                }
            }
        }
        tags.into_iter().collect()
    }

    /// Domain contribution: the heaviest matched tag, capped
    pub fn domain(&self, tags: &[String]) -> f64 {
        tags.iter()
            .filter_map(|tag| self.tag_weights.get(tag))
            .fold(0.0_f64, |max, weight| max.max(*weight))
            .min(DOMAIN_MAX)
    }

    /// Semantic contribution; nothing when the advisor was unavailable
    pub fn semantic(insights: &SemanticInsights) -> f64 {
        if insights.advisor_degraded {
            return 0.0;
        }
        insights
            .risks
            .iter()
            .map(|risk| severity_weight(risk.severity))
            .sum::<f64>()
            .min(SEMANTIC_MAX)
    }

    pub fn breaking_multiplier(breaking_changes: usize, consumer_locations: usize) -> f64 {
        if breaking_changes == 0 {
            return 1.0;
        }
        1.0 + 0.1 * consumer_locations.min(BREAKING_CONSUMER_CAP) as f64
    }

    /// Score an analysis from its structural signals and advisor insights
    pub fn score(&self, signals: &RiskSignals, insights: &SemanticInsights) -> ScoreOutcome {
        let tags = self.tags_for(&signals.entities);
        let breakdown = RiskBreakdown {
            technical: Self::technical(signals.direct_count, signals.indirect_count),
            domain: self.domain(&tags),
            semantic: Self::semantic(insights),
            breaking_multiplier: Self::breaking_multiplier(
                signals.breaking_changes,
                signals.consumer_locations,
            ),
        };

        let mut rationale = vec![
            format!(
                "Technical {:.2}/4: {} direct and {} indirect dependents",
                breakdown.technical, signals.direct_count, signals.indirect_count
            ),
            if tags.is_empty() {
                format!("Domain {:.2}/3: no criticality tags", breakdown.domain)
            } else {
                format!("Domain {:.2}/3: tagged {}", breakdown.domain, tags.join(", "))
            },
            if insights.advisor_degraded {
                format!("Semantic {:.2}/2: advisor unavailable", breakdown.semantic)
            } else {
                format!(
                    "Semantic {:.2}/2: {} advisor-identified risks",
                    breakdown.semantic,
                    insights.risks.len()
                )
            },
        ];
        if signals.breaking_changes > 0 {
            rationale.push(format!(
                "Breaking x{:.2}: {} breaking changes, {} consumer locations",
                breakdown.breaking_multiplier, signals.breaking_changes, signals.consumer_locations
            ));
        }

        Self::compose(breakdown, rationale)
    }

    /// Combine a breakdown into a clamped score.
    ///
    /// A component outside its band, a pre-multiplier sum outside [0, 9] or
    /// a non-finite value raises the `SCORE_OUT_OF_RANGE` signal; the score is
    /// clamped regardless.
    pub fn compose(breakdown: RiskBreakdown, mut rationale: Vec<String>) -> ScoreOutcome {
        let in_band = |value: f64, max: f64| value.is_finite() && (0.0..=max).contains(&value);
        let base = breakdown.base_sum();
        let out_of_range = !(in_band(breakdown.technical, TECHNICAL_MAX)
            && in_band(breakdown.domain, DOMAIN_MAX)
            && in_band(breakdown.semantic, SEMANTIC_MAX)
            && in_band(base, TECHNICAL_MAX + DOMAIN_MAX + SEMANTIC_MAX)
            && breakdown.breaking_multiplier.is_finite()
            && (1.0..=1.0 + 0.1 * BREAKING_CONSUMER_CAP as f64 + f64::EPSILON)
                .contains(&breakdown.breaking_multiplier));

        if out_of_range {
            error!(
                code = "SCORE_OUT_OF_RANGE",
                technical = breakdown.technical,
                domain = breakdown.domain,
                semantic = breakdown.semantic,
                breaking_multiplier = breakdown.breaking_multiplier,
                "Risk score component outside its band, clamping"
            );
        }

        let raw = base * breakdown.breaking_multiplier;
        let score = RiskScore::new(raw, breakdown, Vec::new());
        rationale.push(format!("Score {:.2} ({})", score.score, score.level));
        debug!(score = score.score, level = %score.level, raw, "Computed risk score");

        ScoreOutcome {
            score: RiskScore { rationale, ..score },
            out_of_range,
        }
    }
}

fn severity_weight(severity: Option<InsightSeverity>) -> f64 {
    match severity {
        Some(InsightSeverity::Critical) => 1.0,
        Some(InsightSeverity::High) => 0.75,
        Some(InsightSeverity::Medium) | None => 0.5,
        Some(InsightSeverity::Low) => 0.25,
    }
}
