use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::{
    error::GraphError,
    graph::GraphView,
    nodekey::NodeKey,
    properties::{Node, Tag},
    session::Session,
    store::{NodeStore, StoredRelation},
    transport::Transport,
};

pub const DOCUMENT_VERSION: &str = "1";

/// A saved workspace: every cached node and relation plus the visual graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: String,
    pub id: Uuid,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub relations: Vec<StoredRelation>,
    #[serde(default)]
    pub view: GraphView,
}

impl Document {
    pub fn new(nodes: Vec<Node>, relations: Vec<StoredRelation>, view: GraphView) -> Self {
        Document {
            version: DOCUMENT_VERSION.to_string(),
            id: Uuid::new_v4(),
            nodes,
            relations,
            view,
        }
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> Result<Document, GraphError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Check the document can be loaded: known version, and everything the view places is
    /// among the saved nodes.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.version != DOCUMENT_VERSION {
            return Err(GraphError::Serialization(format!(
                "unsupported document version {}, expected {DOCUMENT_VERSION}",
                self.version
            )));
        }
        let known: BTreeSet<&NodeKey> = self.nodes.iter().map(|n| &n.key).collect();
        if let Some(missing) = self.view.keys().find(|k| !known.contains(k)) {
            return Err(GraphError::Serialization(format!(
                "document places {missing} but does not contain it"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    pub key: NodeKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Only the analyst's annotations: notes and user-defined tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesDocument {
    pub version: String,
    pub notes: Vec<NoteEntry>,
}

impl<T: Transport> Session<T> {
    pub fn serialize(&self) -> Document {
        Document {
            version: DOCUMENT_VERSION.to_string(),
            id: self.document_id,
            nodes: self.store.nodes().cloned().collect(),
            relations: self.store.relations().to_stored(),
            view: self.graph.clone(),
        }
    }

    /// Replace the workspace with `document`. Anything in flight is abandoned.
    pub fn deserialize(&mut self, document: Document) -> Result<(), GraphError> {
        document.validate()?;
        tracing::info!(
            "Loading document {} ({} nodes, {} relations)",
            document.id,
            document.nodes.len(),
            document.relations.len()
        );
        let store = NodeStore::from_parts(document.nodes, document.relations);
        self.document_id = document.id;
        self.reset_workspace(store, document.view);
        Ok(())
    }

    pub fn serialize_notes(&self) -> NotesDocument {
        let notes = self
            .store
            .nodes()
            .filter_map(|node| {
                let tags: Vec<Tag> = node
                    .tags
                    .iter()
                    .flatten()
                    .filter(|t| t.user_defined)
                    .cloned()
                    .collect();
                if node.notes.is_none() && tags.is_empty() {
                    return None;
                }
                Some(NoteEntry {
                    key: node.key.clone(),
                    notes: node.notes.clone(),
                    tags,
                })
            })
            .collect();
        NotesDocument {
            version: DOCUMENT_VERSION.to_string(),
            notes,
        }
    }

    /// Merge annotations into cached nodes. Entries for nodes not in the store are skipped.
    /// Returns how many entries were applied.
    pub fn deserialize_notes(&mut self, notes: NotesDocument) -> Result<usize, GraphError> {
        if notes.version != DOCUMENT_VERSION {
            return Err(GraphError::Serialization(format!(
                "unsupported notes version {}",
                notes.version
            )));
        }
        let mut applied = 0;
        for entry in notes.notes {
            if !self.store.contains(&entry.key) {
                tracing::debug!("[Session::deserialize_notes] {} is not cached, skipping", entry.key);
                continue;
            }
            if let Some(text) = entry.notes {
                self.store.set_notes(&entry.key, text)?;
            }
            if !entry.tags.is_empty() {
                self.store.add_tags(&entry.key, entry.tags)?;
            }
            applied += 1;
        }
        Ok(applied)
    }
}
