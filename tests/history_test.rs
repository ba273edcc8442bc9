//! Undo/redo of the visual graph through the session.

mod common;

use common::{cluster, drain, entity, session, session_with};
use test_log::test;
use txgraph_core::{commands::Command, config::SessionConfig, event::Notification};

#[test(tokio::test)]
async fn undo_and_redo_walk_the_history() {
    let (mut session, mut rx) = session(cluster());
    let e1 = entity("E1");
    let e2 = entity("E2");

    assert!(!session.can_undo());
    for key in [&e1, &e2] {
        session
            .submit(Command::AddNode {
                key: key.clone(),
                anchor: None,
            })
            .unwrap();
        session.run_until_idle().await.unwrap();
    }
    assert_eq!(session.graph().len(), 2);

    session.submit(Command::Undo).unwrap();
    assert!(session.graph().contains(&e1));
    assert!(!session.graph().contains(&e2));
    assert!(session.can_redo());

    session.submit(Command::Undo).unwrap();
    assert!(session.graph().is_empty());
    assert!(!session.can_undo());

    // Nothing left: a no-op that still reports the history state.
    session.submit(Command::Undo).unwrap();
    assert!(session.graph().is_empty());

    session.submit(Command::Redo).unwrap();
    session.submit(Command::Redo).unwrap();
    assert_eq!(session.graph().len(), 2);
    assert!(!session.can_redo());

    assert!(drain(&mut rx).iter().any(|n| matches!(
        n,
        Notification::HistoryChanged {
            can_undo: true,
            can_redo: false
        }
    )));
}

#[test(tokio::test)]
async fn new_snapshot_discards_redo() {
    let (mut session, _rx) = session(cluster());
    let e1 = entity("E1");
    session
        .submit(Command::AddNode {
            key: e1.clone(),
            anchor: None,
        })
        .unwrap();
    session.run_until_idle().await.unwrap();

    session.submit(Command::Undo).unwrap();
    assert!(session.can_redo());
    session
        .submit(Command::AddNode {
            key: entity("E2"),
            anchor: None,
        })
        .unwrap();
    session.run_until_idle().await.unwrap();

    assert!(!session.can_redo());
    assert!(!session.graph().contains(&e1));
}

#[test(tokio::test)]
async fn dragging_snapshots_only_on_release() {
    let (mut session, mut rx) = session(cluster());
    let e1 = entity("E1");
    session
        .submit(Command::AddNode {
            key: e1.clone(),
            anchor: None,
        })
        .unwrap();
    session.run_until_idle().await.unwrap();
    drain(&mut rx);

    session
        .submit(Command::DragNode {
            key: e1.clone(),
            dx: 4.0,
            dy: -2.0,
        })
        .unwrap();
    session
        .submit(Command::DragNode {
            key: e1.clone(),
            dx: 1.0,
            dy: 0.0,
        })
        .unwrap();
    session.submit(Command::DragNodeEnd(e1.clone())).unwrap();

    let placement = session.graph().placement(&e1).unwrap();
    assert_eq!((placement.dx, placement.dy), (5.0, -2.0));
    let snapshots = drain(&mut rx)
        .into_iter()
        .filter(|n| matches!(n, Notification::SnapshotCreated))
        .count();
    assert_eq!(snapshots, 1);

    session.submit(Command::Undo).unwrap();
    let placement = session.graph().placement(&e1).unwrap();
    assert_eq!((placement.dx, placement.dy), (0.0, 0.0));
}

#[test(tokio::test)]
async fn history_depth_is_bounded() {
    let config = SessionConfig {
        snapshot_depth: 2,
        ..SessionConfig::default()
    };
    let (mut session, _rx) = session_with(config, cluster());
    for id in ["E0", "E1", "E2"] {
        session
            .submit(Command::AddNode {
                key: entity(id),
                anchor: None,
            })
            .unwrap();
        session.run_until_idle().await.unwrap();
    }

    session.submit(Command::Undo).unwrap();
    assert_eq!(session.graph().len(), 2);
    assert!(!session.can_undo());
}

#[test(tokio::test)]
async fn blank_resets_workspace_and_history() {
    let (mut session, _rx) = session(cluster());
    let before = session.document_id();
    session
        .submit(Command::AddNode {
            key: entity("E1"),
            anchor: None,
        })
        .unwrap();
    session.run_until_idle().await.unwrap();

    session.submit(Command::Blank).unwrap();

    assert!(session.graph().is_empty());
    assert!(session.store().is_empty());
    assert!(!session.can_undo());
    assert_ne!(session.document_id(), before);
}
