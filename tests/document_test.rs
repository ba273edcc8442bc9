//! Saving and loading workspaces and annotations.

mod common;

use common::{address, cluster, drain, entity, session};
use tempfile::TempDir;
use test_log::test;
use txgraph_core::{
    commands::Command,
    event::Notification,
    properties::Tag,
    session::{Document, NotesDocument},
    transport::fixture::Dataset,
};

#[test(tokio::test)]
async fn workspace_survives_a_round_trip_through_disk() {
    let (mut session, _rx) = session(cluster());
    let a1 = address("A1");
    session
        .submit(Command::AddNode {
            key: a1.clone(),
            anchor: None,
        })
        .unwrap();
    session.run_until_idle().await.unwrap();
    session
        .submit(Command::InputNotes {
            key: a1.clone(),
            note: "seen in ransom note".into(),
        })
        .unwrap();

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("workspace.json");
    std::fs::write(&path, session.serialize().to_json().unwrap()).unwrap();

    let document = Document::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(document.id, session.document_id());
    let (mut restored, mut rx) = common::session(Dataset::default());
    restored.submit(Command::Load(Box::new(document))).unwrap();

    assert_eq!(restored.document_id(), session.document_id());
    assert_eq!(restored.graph(), session.graph());
    assert_eq!(restored.store().len(), session.store().len());
    assert_eq!(
        restored.store().relations().edge_count(),
        session.store().relations().edge_count()
    );
    assert_eq!(
        restored.store().get(&a1).unwrap().notes.as_deref(),
        Some("seen in ransom note")
    );
    assert!(restored.store().get(&entity("E1")).unwrap().addresses.contains("A1"));
    assert!(!restored.can_undo());
    assert!(drain(&mut rx)
        .iter()
        .any(|n| matches!(n, Notification::GraphChanged)));
}

#[test(tokio::test)]
async fn loading_abandons_requests_in_flight() {
    let (mut session, _rx) = session(cluster());
    let e1 = entity("E1");
    session
        .submit(Command::AddNode {
            key: e1.clone(),
            anchor: None,
        })
        .unwrap();
    assert_eq!(session.in_flight(), 1);

    session
        .submit(Command::Load(Box::new(Document::new(
            Vec::new(),
            Vec::new(),
            Default::default(),
        ))))
        .unwrap();

    assert!(session.is_idle());
    assert!(!session.is_pending(&e1));
    session.run_until_idle().await.unwrap();
    assert!(session.graph().is_empty());
}

#[test]
fn documents_placing_unknown_nodes_are_rejected() {
    let (mut session, _rx) = session(cluster());
    let mut document = Document::new(Vec::new(), Vec::new(), Default::default());
    document.version = "0".into();

    assert!(session.deserialize(document).is_err());
    let json = r#"{
        "version": "1",
        "id": "6f1c1f7e-4f5e-4d0a-9c53-3c1f1b7c2a10",
        "nodes": [],
        "view": {"placements": [{"key": {"keyspace": "btc", "type": "entity", "id": "E1"}, "layer": 0}]}
    }"#;
    let document = Document::from_json(json).unwrap();
    assert!(document.validate().is_err());
}

#[test(tokio::test)]
async fn notes_and_user_tags_travel_separately() {
    let (mut session, _rx) = session(cluster());
    let e1 = entity("E1");
    let a2 = address("A2");
    session
        .submit(Command::AddNode {
            key: e1.clone(),
            anchor: None,
        })
        .unwrap();
    session.run_until_idle().await.unwrap();
    session
        .submit(Command::SetLabels {
            key: e1.clone(),
            labels: vec![Tag::user("suspect")],
        })
        .unwrap();
    session
        .submit(Command::InputNotes {
            key: e1.clone(),
            note: "check with compliance".into(),
        })
        .unwrap();

    let notes = session.serialize_notes();
    assert_eq!(notes.notes.len(), 1);
    assert_eq!(notes.notes[0].tags, vec![Tag::user("suspect")]);
    let json = serde_json::to_string(&notes).unwrap();

    // A fresh workspace only takes annotations for nodes it has cached.
    let (mut fresh, _rx) = common::session(cluster());
    fresh
        .submit(Command::AddNode {
            key: e1.clone(),
            anchor: None,
        })
        .unwrap();
    fresh.run_until_idle().await.unwrap();
    let mut notes: NotesDocument = serde_json::from_str(&json).unwrap();
    notes.notes.push(txgraph_core::session::NoteEntry {
        key: a2.clone(),
        notes: Some("never loaded".into()),
        tags: Vec::new(),
    });

    assert_eq!(fresh.deserialize_notes(notes).unwrap(), 1);
    let stored = fresh.store().get(&e1).unwrap();
    assert_eq!(stored.notes.as_deref(), Some("check with compliance"));
    let labels: Vec<&str> = stored
        .tags
        .iter()
        .flatten()
        .map(|t| t.label.as_str())
        .collect();
    assert_eq!(labels, vec!["exchange", "suspect"]);
    assert!(!fresh.store().contains(&a2));
}
