//! Command handler tests over temporary files

use std::fs;
use std::path::PathBuf;

use ripple_cli::commands::{AnalyzeCommand, ClassifyCommand, GraphCommand};
use ripple_cli::CliError;
use ripple_domain::{AnalysisType, ChangeType, RiskLevel};
use tempfile::TempDir;

const EDGES: &str = r#"{"edges": [
  {"from": {"kind": "FILE", "identifier": "src/orders.ts"},
   "to": {"kind": "FILE", "identifier": "src/pricing.ts"}, "kind": "CALLS"},
  {"from": {"kind": "FILE", "identifier": "src/pricing.ts"},
   "to": {"kind": "TABLE", "identifier": "prices"}, "kind": "REFERENCES_TABLE", "weight": 2.0},
  {"from": {"kind": "FILE", "identifier": "src/checkout.ts"},
   "to": {"kind": "FILE", "identifier": "src/orders.ts"}, "kind": "CALLS"}
]}"#;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn offline_config(dir: &TempDir) -> PathBuf {
    write(dir, "ripple.yaml", "advisor:\n  enabled: false\n")
}

fn analyze(dir: &TempDir, event: &str) -> AnalyzeCommand {
    AnalyzeCommand {
        event: write(dir, "event.json", event),
        edges: Some(write(dir, "edges.json", EDGES)),
        config: Some(offline_config(dir)),
        save_edges: None,
        fail_on: None,
    }
}

#[tokio::test]
async fn test_analyze_code_change() {
    let dir = TempDir::new().unwrap();
    let command = analyze(
        &dir,
        r#"{"kind": "code_change", "file_path": "src/orders.ts", "diff": "+discount"}"#,
    );

    let analysis = command.run().await.unwrap();
    assert_eq!(analysis.analysis_type, AnalysisType::Code);
    assert_eq!(analysis.summary_counts.direct_dependencies, 1);
    assert_eq!(analysis.summary_counts.reverse_dependencies, 1);
    assert!(analysis.flags.semantic_advisor_degraded);
    assert!(command.check_threshold(&analysis).is_ok());
}

#[tokio::test]
async fn test_analyze_fail_on_threshold() {
    let dir = TempDir::new().unwrap();
    let mut command = analyze(
        &dir,
        r#"{"kind": "code_change", "file_path": "src/orders.ts", "diff": "+discount"}"#,
    );
    command.fail_on = Some(RiskLevel::Low);

    let analysis = command.run().await.unwrap();
    let err = command.check_threshold(&analysis).unwrap_err();
    assert!(matches!(err, CliError::RiskThreshold { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_analyze_saves_edges() {
    let dir = TempDir::new().unwrap();
    let mut command = analyze(
        &dir,
        r#"{"kind": "schema_change", "table": "prices", "ddl": "DROP TABLE prices"}"#,
    );
    let saved = dir.path().join("saved.json");
    command.save_edges = Some(saved.clone());

    let analysis = command.run().await.unwrap();
    assert_eq!(analysis.summary_counts.code_dependencies, 1);
    let content = fs::read_to_string(saved).unwrap();
    assert!(content.contains("REFERENCES_TABLE"));
}

#[tokio::test]
async fn test_analyze_rejects_invalid_json_event() {
    let dir = TempDir::new().unwrap();
    let err = analyze(&dir, "{not json").run().await.unwrap_err();
    assert!(matches!(
        err,
        CliError::Analysis(ripple_analysis::AnalysisError::MalformedEvent(_))
    ));
    assert_eq!(err.exit_code(), 1);
    assert!(err.user_message().contains("event file"));
}

#[tokio::test]
async fn test_analyze_missing_event_file() {
    let dir = TempDir::new().unwrap();
    let command = AnalyzeCommand {
        event: dir.path().join("missing.json"),
        edges: None,
        config: Some(offline_config(&dir)),
        save_edges: None,
        fail_on: None,
    };
    let err = command.run().await.unwrap_err();
    assert!(matches!(err, CliError::Io { .. }));
    assert!(err.user_message().contains("missing.json"));
}

#[tokio::test]
async fn test_graph_command() {
    let dir = TempDir::new().unwrap();
    let command = GraphCommand {
        edges: write(&dir, "edges.json", EDGES),
        entity: "TABLE:prices".to_string(),
        hops: 1,
    };
    let view = command.run().await.unwrap();
    assert_eq!(view.nodes.len(), 2);
    assert_eq!(view.edges.len(), 1);

    let wider = GraphCommand { hops: 3, ..command };
    assert_eq!(wider.run().await.unwrap().nodes.len(), 4);
}

#[tokio::test]
async fn test_graph_rejects_zero_hops() {
    let dir = TempDir::new().unwrap();
    let command = GraphCommand {
        edges: write(&dir, "edges.json", EDGES),
        entity: "src/orders.ts".to_string(),
        hops: 0,
    };
    assert!(matches!(
        command.run().await.unwrap_err(),
        CliError::InvalidArgument { .. }
    ));
}

#[tokio::test]
async fn test_classify_yaml_and_json_contracts() {
    let dir = TempDir::new().unwrap();
    let before = write(
        &dir,
        "before.yaml",
        r#"
paths:
  /api/orders:
    get:
      responses:
        "200":
          content:
            application/json:
              schema:
                type: array
                items:
                  type: object
  "/api/orders/{id}":
    delete:
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: string
"#,
    );
    let after = write(
        &dir,
        "after.json",
        r#"[{"method": "GET", "path": "/api/orders",
             "parameters": [{"name": "status", "required": false, "type": "string"}],
             "response_type": "array<object>"}]"#,
    );

    let items = ClassifyCommand { before, after }.run().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].endpoint, "/api/orders");
    assert_eq!(items[0].change_type, ChangeType::Added);
    assert_eq!(items[1].change_type, ChangeType::Removed);
    assert!(items[1].breaking);
}
