use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc::UnboundedSender;

use crate::{commands::Command, nodekey::NodeKey, properties::Anchor, properties::NodeType};

/// Human-readable progress messages for the status bar. Every message is also logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatusMessage {
    Loading(NodeKey),
    Loaded(NodeKey),
    LoadingTagsFor(NodeKey),
    LoadedTagsFor(NodeKey),
    LoadingEntityFor(NodeKey),
    LoadedEntityFor(NodeKey),
    NoEntityFor(NodeKey),
    LoadingNeighbors {
        key: NodeKey,
        outgoing: bool,
    },
    LoadedNeighbors {
        key: NodeKey,
        outgoing: bool,
        count: usize,
    },
    LoadingEntityAddresses {
        entity: NodeKey,
        limit: usize,
    },
    LoadedEntityAddresses {
        entity: NodeKey,
        count: usize,
    },
    RemovedNode(NodeKey),
    Searching {
        key: NodeKey,
        criterion: String,
    },
    SearchResult {
        count: usize,
        criterion: String,
    },
    Error(String),
}

impl Display for StatusMessage {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            StatusMessage::Loading(k) => write!(f, "Loading {} {} ...", k.node_type, k.id),
            StatusMessage::Loaded(k) => write!(f, "Loaded {} {}", k.node_type, k.id),
            StatusMessage::LoadingTagsFor(k) => {
                write!(f, "Loading tags for {} {} ...", k.node_type, k.id)
            }
            StatusMessage::LoadedTagsFor(k) => write!(f, "Loaded tags for {} {}", k.node_type, k.id),
            StatusMessage::LoadingEntityFor(k) => write!(f, "Loading entity for {} ...", k.id),
            StatusMessage::LoadedEntityFor(k) => write!(f, "Loaded entity for {}", k.id),
            StatusMessage::NoEntityFor(k) => write!(f, "No entity for {}", k.id),
            StatusMessage::LoadingNeighbors { key, outgoing } => write!(
                f,
                "Loading {} neighbors of {} {} ...",
                if *outgoing { "outgoing" } else { "incoming" },
                key.node_type,
                key.id
            ),
            StatusMessage::LoadedNeighbors {
                key,
                outgoing,
                count,
            } => write!(
                f,
                "Loaded {count} {} neighbors of {} {}",
                if *outgoing { "outgoing" } else { "incoming" },
                key.node_type,
                key.id
            ),
            StatusMessage::LoadingEntityAddresses { entity, limit } => {
                write!(f, "Loading up to {limit} addresses of entity {} ...", entity.id)
            }
            StatusMessage::LoadedEntityAddresses { entity, count } => {
                write!(f, "Loaded {count} addresses of entity {}", entity.id)
            }
            StatusMessage::RemovedNode(k) => write!(f, "Removed {} {}", k.node_type, k.id),
            StatusMessage::Searching { key, criterion } => {
                write!(f, "Searching neighbors of {} {} for {criterion} ...", key.node_type, key.id)
            }
            StatusMessage::SearchResult { count, criterion } => {
                write!(f, "Found {count} paths to {criterion}")
            }
            StatusMessage::Error(msg) => write!(f, "Error: {msg}"),
        }
    }
}

/// Everything the session tells the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notification {
    LoadingStarted(String),
    LoadingStopped(String),
    /// A node finished acquisition and is in the visual graph.
    NodeReady {
        key: NodeKey,
        anchor: Option<Anchor>,
    },
    GraphChanged,
    TagsUpdated(NodeKey),
    /// The browser pane should show this node; carries the history fragment to push.
    Focused {
        key: NodeKey,
        fragment: String,
    },
    /// Details of a transaction, block or label.
    Detail {
        key: NodeKey,
        value: serde_json::Value,
    },
    EntityAddresses {
        entity: NodeKey,
        addresses: Vec<NodeKey>,
    },
    SearchCompleted {
        root: NodeKey,
        count: usize,
    },
    HistoryChanged {
        can_undo: bool,
        can_redo: bool,
    },
    SnapshotCreated,
    SnapshotRestored,
    Status(StatusMessage),
    /// A request failed. `retry`, when present, is the command that repeats it.
    Failure {
        message: String,
        retry: Option<Box<Command>>,
    },
}

impl Display for Notification {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Notification::LoadingStarted(l) => write!(f, "LoadingStarted({l})"),
            Notification::LoadingStopped(l) => write!(f, "LoadingStopped({l})"),
            Notification::NodeReady { key, .. } => write!(f, "NodeReady({key})"),
            Notification::GraphChanged => write!(f, "GraphChanged"),
            Notification::TagsUpdated(k) => write!(f, "TagsUpdated({k})"),
            Notification::Focused { fragment, .. } => write!(f, "Focused({fragment})"),
            Notification::Detail { key, .. } => write!(f, "Detail({key})"),
            Notification::EntityAddresses { entity, addresses } => {
                write!(f, "EntityAddresses({entity}, {})", addresses.len())
            }
            Notification::SearchCompleted { root, count } => {
                write!(f, "SearchCompleted({root}, {count})")
            }
            Notification::HistoryChanged { can_undo, can_redo } => {
                write!(f, "HistoryChanged(undo: {can_undo}, redo: {can_redo})")
            }
            Notification::SnapshotCreated => write!(f, "SnapshotCreated"),
            Notification::SnapshotRestored => write!(f, "SnapshotRestored"),
            Notification::Status(msg) => write!(f, "Status({msg})"),
            Notification::Failure { message, retry } => match retry {
                Some(cmd) => write!(f, "Failure({message}, retry: {cmd})"),
                None => write!(f, "Failure({message})"),
            },
        }
    }
}

/// Sending half of the notification channel. A session without a receiver still runs; its
/// notifications only reach the log.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<UnboundedSender<Notification>>,
}

impl Notifier {
    pub fn new(tx: UnboundedSender<Notification>) -> Self {
        Notifier { tx: Some(tx) }
    }

    pub fn silent() -> Self {
        Notifier { tx: None }
    }

    pub fn send(&self, notification: Notification) {
        if let Some(tx) = self.tx.as_ref() {
            if let Err(e) = tx.send(notification) {
                tracing::debug!("[Notifier] receiver dropped, discarding {}", e.0);
            }
        }
    }

    pub fn status(&self, message: StatusMessage) {
        match &message {
            StatusMessage::Error(_) => tracing::warn!("{message}"),
            _ => tracing::info!("{message}"),
        }
        self.send(Notification::Status(message));
    }

    pub fn failure(&self, message: String, retry: Option<Command>) {
        tracing::warn!("{message}");
        self.send(Notification::Status(StatusMessage::Error(message.clone())));
        self.send(Notification::Failure {
            message,
            retry: retry.map(Box::new),
        });
    }
}

/// Label under which a node's acquisition shows as loading.
pub fn loading_label(node_type: NodeType, id: &str) -> String {
    format!("{node_type}:{id}")
}
