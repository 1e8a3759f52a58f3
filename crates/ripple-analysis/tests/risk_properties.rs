//! Property tests for the risk formula

use proptest::prelude::*;
use ripple_analysis::{RiskConfig, RiskScorer, RiskSignals};
use ripple_domain::{RiskBreakdown, RiskLevel, SemanticInsights};

proptest! {
    #[test]
    fn prop_score_is_clamped_for_any_components(
        technical in prop::num::f64::ANY,
        domain in prop::num::f64::ANY,
        semantic in prop::num::f64::ANY,
        multiplier in prop::num::f64::ANY,
    ) {
        let outcome = RiskScorer::compose(
            RiskBreakdown { technical, domain, semantic, breaking_multiplier: multiplier },
            Vec::new(),
        );
        prop_assert!((0.0..=10.0).contains(&outcome.score.score));
        prop_assert_eq!(outcome.score.level, RiskLevel::from_score(outcome.score.score));
    }

    #[test]
    fn prop_in_band_components_never_signal(
        technical in 0.0f64..=4.0,
        domain in 0.0f64..=3.0,
        semantic in 0.0f64..=2.0,
        consumers in 0usize..20,
    ) {
        let outcome = RiskScorer::compose(
            RiskBreakdown {
                technical,
                domain,
                semantic,
                breaking_multiplier: RiskScorer::breaking_multiplier(1, consumers),
            },
            Vec::new(),
        );
        prop_assert!(!outcome.out_of_range);
    }

    #[test]
    fn prop_score_monotonic_in_fan_out(
        direct in 0usize..200,
        indirect in 0usize..200,
        extra_direct in 0usize..50,
        extra_indirect in 0usize..50,
        breaking in 0usize..3,
        consumers in 0usize..10,
    ) {
        let scorer = RiskScorer::new(&RiskConfig::default()).unwrap();
        let insights = SemanticInsights::degraded();
        let signals = RiskSignals {
            direct_count: direct,
            indirect_count: indirect,
            breaking_changes: breaking,
            consumer_locations: consumers,
            ..Default::default()
        };
        let wider = RiskSignals {
            direct_count: direct + extra_direct,
            indirect_count: indirect + extra_indirect,
            ..signals.clone()
        };
        let low = scorer.score(&signals, &insights).score.score;
        let high = scorer.score(&wider, &insights).score.score;
        prop_assert!(high >= low);
    }
}
