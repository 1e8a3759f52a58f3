//! Property tests for advisor output reconciliation

use proptest::prelude::*;
use ripple_advisor::reconcile;
use ripple_domain::FALLBACK_SUMMARY;
use serde_json::json;

proptest! {
    /// Valid JSON with a non-empty summary reconciles to exactly that summary
    #[test]
    fn prop_valid_summary_is_preserved(summary in "[a-z][a-z0-9 ,.!?\"\\\\\n]{0,80}", fenced in any::<bool>()) {
        let body = json!({"summary": summary, "risks": [], "recommendations": []}).to_string();
        let raw = if fenced { format!("```json\n{}\n```", body) } else { body };

        let insights = reconcile(&raw);
        prop_assert_eq!(&insights.summary, &summary);
        prop_assert!(!insights.semantic_parse_degraded);
    }

    /// Text without any JSON object yields the fallback
    #[test]
    fn prop_text_without_json_falls_back(text in "[^{}\"]{0,120}") {
        let insights = reconcile(&text);
        prop_assert_eq!(insights.summary.as_str(), FALLBACK_SUMMARY);
        prop_assert!(insights.semantic_parse_degraded);
        prop_assert!(insights.risks.is_empty());
    }

    /// A recoverable summary survives truncation of everything after it
    #[test]
    fn prop_summary_survives_truncated_tail(summary in "[a-z][a-z0-9 ,.]{0,60}", tail in "[a-z\\[{:, ]{0,30}") {
        let raw = format!(
            "{{\"summary\": {}, \"risks\": [{}",
            serde_json::to_string(&summary).unwrap(),
            tail
        );
        let insights = reconcile(&raw);
        prop_assert_eq!(&insights.summary, &summary);
        prop_assert!(!insights.semantic_parse_degraded);
    }
}
