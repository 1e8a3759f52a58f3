//! Error handling tests
//!
//! User-facing messages and exit codes of CLI errors.

use ripple_analysis::AnalysisError;
use ripple_cli::CliError;
use ripple_domain::RiskLevel;
use ripple_graph::GraphError;

#[test]
fn test_malformed_event_user_message() {
    let error = CliError::from(AnalysisError::malformed("missing `kind` discriminator"));
    let msg = error.user_message();
    assert!(msg.contains("missing `kind` discriminator"));
    assert!(msg.contains("event file"));
    assert_eq!(error.exit_code(), 1);
}

#[test]
fn test_configuration_error_user_message() {
    let error = CliError::from(AnalysisError::Configuration("max_hops must be greater than 0".to_string()));
    let msg = error.user_message();
    assert!(msg.contains("max_hops"));
    assert!(msg.contains(".ripple/config.yaml"));
}

#[test]
fn test_lookup_failure_is_retryable() {
    let error = CliError::from(AnalysisError::lookup_failed(
        "FILE:src/a.ts",
        GraphError::unavailable("connection refused"),
    ));
    assert!(error.user_message().contains("can be retried"));
    assert_eq!(error.exit_code(), 75);
}

#[test]
fn test_risk_threshold_message() {
    let error = CliError::RiskThreshold {
        level: RiskLevel::High,
        threshold: RiskLevel::Medium,
    };
    let msg = error.user_message();
    assert!(msg.contains("HIGH"));
    assert!(msg.contains("MEDIUM"));
    assert_eq!(error.exit_code(), 2);
}

#[test]
fn test_invalid_argument_points_to_help() {
    let error = CliError::invalid_argument("--hops must be at least 1");
    assert!(error.user_message().contains("ripple --help"));
    assert!(error.technical_details().contains("InvalidArgument"));
}
