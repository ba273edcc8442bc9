//! Degree excursions, egonets and entity address expansion.

mod common;

use common::{address, cluster, drain, entity, failures, session, session_with};
use test_log::test;
use txgraph_core::{
    commands::Command,
    config::SessionConfig,
    event::Notification,
    graph::GraphView,
    nodekey::NodeKey,
    properties::{Direction, Node, RelationData, Tag},
    session::{Document, Session},
    store::StoredRelation,
    transport::fixture::{Dataset, FixtureTransport, TransportCall},
};

async fn add(session: &mut Session<FixtureTransport>, key: &NodeKey) {
    session
        .submit(Command::AddNode {
            key: key.clone(),
            anchor: None,
        })
        .unwrap();
    session.run_until_idle().await.unwrap();
}

#[test(tokio::test)]
async fn high_degree_and_complete_nodes_are_not_expanded() {
    let e7 = entity("E7");
    let e8 = entity("E8");
    let document = Document::new(
        vec![
            Node::new(e7.clone())
                .with_degrees(150, 1)
                .with_tags(Vec::new()),
            Node::new(e8.clone()).with_degrees(1, 0),
        ],
        vec![StoredRelation {
            source: e7.clone(),
            target: e8.clone(),
            data: RelationData::default(),
        }],
        GraphView::new(),
    );
    let (mut session, _rx) = session(Dataset::default());
    session.submit(Command::Load(Box::new(document))).unwrap();

    add(&mut session, &e7).await;

    assert!(session.transport().calls().is_empty());
    assert!(session.graph().contains(&e7));
}

#[test(tokio::test)]
async fn threshold_comes_from_config() {
    let config = SessionConfig {
        degree_threshold: 1,
        ..SessionConfig::default()
    };
    let (mut session, _rx) = session_with(config, cluster());
    let e1 = entity("E1");

    add(&mut session, &e1).await;

    assert_eq!(
        session.transport().calls(),
        vec![TransportCall::Node(e1.clone()), TransportCall::Tags(e1)]
    );
}

#[test(tokio::test)]
async fn only_same_type_neighbors_are_linked() {
    let e1 = entity("E1");
    let dataset = cluster().with_relation(&address("A1"), &e1, RelationData::default());
    let (mut session, _rx) = session(dataset);

    add(&mut session, &e1).await;

    let store = session.store();
    assert_eq!(store.incoming_count(&e1), 1);
    assert!(store.relations().get(&entity("E0"), &e1).is_some());
    assert!(store.relations().get(&address("A1"), &e1).is_none());
    assert!(store.relations().get(&e1, &entity("E2")).is_some());
}

#[test(tokio::test)]
async fn failed_excursion_fetch_does_not_block_insertion() {
    let (mut session, mut rx) = session(cluster());
    let e1 = entity("E1");
    session.transport().fail_next(TransportCall::Neighbors {
        key: e1.clone(),
        direction: Direction::Incoming,
        limit: 100,
    });

    add(&mut session, &e1).await;

    assert!(session.graph().contains(&e1));
    assert_eq!(session.store().incoming_count(&e1), 0);
    assert_eq!(session.store().outgoing_count(&e1), 1);
    let notifications = drain(&mut rx);
    let failed = failures(&notifications);
    assert_eq!(failed.len(), 1);
    assert!(matches!(failed[0], Notification::Failure { retry: None, .. }));
}

#[test(tokio::test)]
async fn egonet_places_neighbors_next_to_the_node() {
    let (mut session, _rx) = session(cluster());
    let e1 = entity("E1");
    let e2 = entity("E2");
    add(&mut session, &e1).await;

    session
        .submit(Command::LoadEgonet {
            key: e1.clone(),
            outgoing: true,
            limit: None,
        })
        .unwrap();
    session.run_until_idle().await.unwrap();

    let graph = session.graph();
    let anchor = graph.placement(&e1).unwrap();
    let neighbor = graph.placement(&e2).unwrap();
    assert_eq!(neighbor.layer, anchor.layer + 1);
    assert_eq!(neighbor.anchor.as_ref().map(|a| &a.node), Some(&e1));
    assert_eq!(graph.visible_edges(session.store()).len(), 1);
    assert!(session.loading().next().is_none());
}

#[test(tokio::test)]
async fn egonet_of_an_uncached_node_is_an_error() {
    let (mut session, _rx) = session(cluster());

    let result = session.submit(Command::LoadEgonet {
        key: entity("E2"),
        outgoing: false,
        limit: None,
    });

    assert!(result.is_err());
}

#[test(tokio::test)]
async fn entity_addresses_are_drawn_inside_the_entity() {
    let (mut session, mut rx) = session(cluster());
    let e1 = entity("E1");
    add(&mut session, &e1).await;
    drain(&mut rx);

    session
        .submit(Command::LoadEntityAddresses {
            entity: e1.clone(),
            limit: None,
        })
        .unwrap();
    session.run_until_idle().await.unwrap();

    let placed = session.graph().entity_addresses(&e1);
    assert_eq!(placed, vec![&address("A1"), &address("A2")]);
    assert_eq!(
        session.store().get(&address("A1")).unwrap().tags,
        Some(vec![Tag::new("hot wallet")])
    );
    assert!(drain(&mut rx).iter().any(|n| matches!(
        n,
        Notification::EntityAddresses { entity, addresses } if entity == &e1 && addresses.len() == 2
    )));

    session
        .submit(Command::RemoveEntityAddresses(e1.clone()))
        .unwrap();
    assert!(session.graph().entity_addresses(&e1).is_empty());
    assert!(session.graph().contains(&e1));
}
