//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use txgraph_core::{
    config::SessionConfig,
    event::Notification,
    nodekey::NodeKey,
    properties::{Node, RelationData, Tag},
    session::Session,
    transport::fixture::{Dataset, FixtureTransport},
};

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[allow(dead_code)]
pub fn address(id: &str) -> NodeKey {
    NodeKey::address("btc", id)
}

#[allow(dead_code)]
pub fn entity(id: &str) -> NodeKey {
    NodeKey::entity("btc", id)
}

/// A small cluster around entity `E1`:
///
/// - `A1` and `A2` belong to `E1`, `A9` has no entity
/// - `E0 -> E1 -> E2`, `A0 -> A1 -> A2`
/// - `E1` is tagged "exchange", `A1` is tagged "hot wallet"
#[allow(dead_code)]
pub fn cluster() -> Dataset {
    Dataset::default()
        .with_node(
            Node::new(entity("E1"))
                .with_degrees(1, 1)
                .with_tags(vec![Tag::new("exchange")]),
        )
        .with_node(Node::new(entity("E0")).with_degrees(0, 1))
        .with_node(Node::new(entity("E2")).with_degrees(1, 0))
        .with_node(
            Node::new(address("A1"))
                .with_degrees(1, 1)
                .with_entity("E1")
                .with_tags(vec![Tag::new("hot wallet")]),
        )
        .with_node(Node::new(address("A2")).with_degrees(1, 0).with_entity("E1"))
        .with_node(Node::new(address("A0")).with_degrees(0, 1).with_entity("E0"))
        .with_node(Node::new(address("A9")).with_degrees(0, 0))
        .with_relation(&entity("E0"), &entity("E1"), RelationData::default())
        .with_relation(&entity("E1"), &entity("E2"), RelationData::default())
        .with_relation(&address("A0"), &address("A1"), RelationData::default())
        .with_relation(&address("A1"), &address("A2"), RelationData::default())
}

#[allow(dead_code)]
pub fn session(dataset: Dataset) -> (Session<FixtureTransport>, UnboundedReceiver<Notification>) {
    session_with(SessionConfig::default(), dataset)
}

#[allow(dead_code)]
pub fn session_with(
    config: SessionConfig,
    dataset: Dataset,
) -> (Session<FixtureTransport>, UnboundedReceiver<Notification>) {
    init_logging();
    let (tx, rx) = unbounded_channel();
    let session = Session::new(config, FixtureTransport::new(dataset))
        .unwrap()
        .with_notifications(tx);
    (session, rx)
}

/// Everything sent so far.
#[allow(dead_code)]
pub fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

#[allow(dead_code)]
pub fn failures(notifications: &[Notification]) -> Vec<&Notification> {
    notifications
        .iter()
        .filter(|n| matches!(n, Notification::Failure { .. }))
        .collect()
}
