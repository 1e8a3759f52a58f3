//! Integration tests for the in-memory graph store

use std::sync::Arc;

use ripple_domain::{DependencyEdge, Direction, EdgeKind, EntityRef};
use ripple_graph::{neighbourhood_view, GraphGateway, InMemoryGraphStore};
use tempfile::TempDir;

#[tokio::test]
async fn test_edge_list_file_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edges.json");

    let store = InMemoryGraphStore::with_edges(vec![
        DependencyEdge::new(
            EntityRef::file("src/orders.ts"),
            EntityRef::table("orders"),
            EdgeKind::ReferencesTable,
        )
        .with_weight(4.0),
        DependencyEdge::new(
            EntityRef::file("src/api.ts"),
            EntityRef::file("src/orders.ts"),
            EdgeKind::Calls,
        ),
    ]);
    store.save_edge_list(&path).await.unwrap();

    let reloaded = InMemoryGraphStore::from_edge_list(&path).unwrap();
    assert_eq!(reloaded.edges().await, store.edges().await);
}

#[tokio::test]
async fn test_yaml_edge_list_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edges.yaml");
    std::fs::write(
        &path,
        "- from: {kind: TABLE, identifier: trades}\n  to: {kind: TABLE, identifier: accounts}\n  kind: FOREIGN_KEY\n",
    )
    .unwrap();

    let store = InMemoryGraphStore::from_edge_list(&path).unwrap();
    let edges = store
        .query_edges(&EntityRef::table("accounts"), Direction::Incoming, &[EdgeKind::ForeignKey], 1)
        .await
        .unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].from, EntityRef::table("trades"));
}

#[tokio::test]
async fn test_missing_edge_list_is_io_error() {
    let result = InMemoryGraphStore::from_edge_list("/definitely/not/here.json");
    assert!(matches!(result, Err(ripple_graph::GraphError::IoError(_))));
}

#[tokio::test]
async fn test_concurrent_upserts_and_reads() {
    let store = Arc::new(InMemoryGraphStore::new());
    let mut handles = Vec::new();

    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let edge = DependencyEdge::new(
                EntityRef::endpoint("GET", "/api/stocks/{id}"),
                EntityRef::file(format!("web:src/page{}.ts", i % 4)),
                EdgeKind::ApiConsumer,
            );
            store.upsert_edge(edge).await.unwrap();
            store
                .query_edges(
                    &EntityRef::endpoint("GET", "/api/stocks/{id}"),
                    Direction::Outgoing,
                    &[EdgeKind::ApiConsumer],
                    1,
                )
                .await
                .unwrap()
                .len()
        }));
    }

    for handle in handles {
        let seen = handle.await.unwrap();
        assert!(seen >= 1 && seen <= 4);
    }
    assert_eq!(store.edge_count().await, 4);
}

#[tokio::test]
async fn test_neighbourhood_view_spans_both_directions() {
    let store = InMemoryGraphStore::with_edges(vec![
        DependencyEdge::new(EntityRef::file("a"), EntityRef::file("b"), EdgeKind::Calls),
        DependencyEdge::new(EntityRef::file("b"), EntityRef::file("c"), EdgeKind::Calls),
        DependencyEdge::new(EntityRef::file("z"), EntityRef::file("a"), EdgeKind::Calls),
        DependencyEdge::new(EntityRef::file("c"), EntityRef::file("d"), EdgeKind::Calls),
    ]);

    let view = neighbourhood_view(&store, &EntityRef::file("a"), 2).await.unwrap();
    let ids: Vec<&str> = view.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["FILE:a", "FILE:b", "FILE:z", "FILE:c"]);
    assert_eq!(view.edges.len(), 3);
}
