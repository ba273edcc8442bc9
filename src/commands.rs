use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{
    error::GraphError,
    nodekey::NodeKey,
    properties::{Anchor, Neighbor, Node, RelationData, Tag},
    session::{Acquisition, Document, Excursion},
    transport::{AddressesPage, NeighborsPage, SearchRequest, SearchResult},
};

/// The focus node a fetched node should be linked to once it arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusLink {
    pub key: NodeKey,
    pub outgoing: bool,
    #[serde(default)]
    pub relation: RelationData,
}

/// What to do with a node once [Command::ResultNode] delivers it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<FocusLink>,
}

/// Every action the session performs, whether triggered by the analyst or by a transport reply.
///
/// Commands are the only way into a [crate::session::Session]. Replies carry the transport
/// result and whatever continuation state the next step needs, so handlers never capture
/// closures over session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "camelCase")]
pub enum Command {
    /// Open a search hit: graph nodes are fetched and added, other types are shown in the
    /// browser.
    ClickSearchResult {
        key: NodeKey,
    },
    ClickAddress {
        keyspace: String,
        address: String,
    },
    /// Add a neighbor listed in the browser, linked to the browsed focus node.
    SelectNeighbor {
        neighbor: Neighbor,
        focus: NodeKey,
        outgoing: bool,
    },
    AddNode {
        key: NodeKey,
        #[serde(default)]
        anchor: Option<Anchor>,
    },
    LoadTags(NodeKey),
    LoadEgonet {
        key: NodeKey,
        outgoing: bool,
        #[serde(default)]
        limit: Option<usize>,
    },
    LoadEntityAddresses {
        entity: NodeKey,
        #[serde(default)]
        limit: Option<usize>,
    },
    RemoveEntityAddresses(NodeKey),
    RemoveNode(NodeKey),
    InputNotes {
        key: NodeKey,
        note: String,
    },
    SetLabels {
        key: NodeKey,
        labels: Vec<Tag>,
    },
    SelectNode(NodeKey),
    Deselect,
    DragNode {
        key: NodeKey,
        dx: f64,
        dy: f64,
    },
    DragNodeEnd(NodeKey),
    SearchNeighbors(SearchRequest),
    RedrawGraph,
    CreateSnapshot,
    Undo,
    Redo,
    DisableUndoRedo,
    Blank,
    Load(Box<Document>),

    ResultNode {
        key: NodeKey,
        #[serde(default)]
        context: NodeContext,
        result: Result<Node, GraphError>,
    },
    ResultDetail {
        key: NodeKey,
        result: Result<serde_json::Value, GraphError>,
    },
    ResultTags {
        key: NodeKey,
        result: Result<Vec<Tag>, GraphError>,
    },
    ResultEgonet {
        key: NodeKey,
        outgoing: bool,
        result: Result<NeighborsPage, GraphError>,
    },
    ResultEntityAddresses {
        entity: NodeKey,
        result: Result<AddressesPage, GraphError>,
    },
    ResultSearchNeighbors {
        request: SearchRequest,
        result: Result<SearchResult, GraphError>,
    },
    AcquireNode(Acquisition),
    DegreeExcursion(Excursion),
}

impl Command {
    /// Decode a command from its JSON form. Unknown command names are rejected here, before
    /// anything reaches a session.
    pub fn from_json(content: &str) -> Result<Command, GraphError> {
        serde_json::from_str(content).map_err(|e| GraphError::Command(format!("{e}")))
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Command::ClickSearchResult { key } => write!(f, "ClickSearchResult({key})"),
            Command::ClickAddress { keyspace, address } => {
                write!(f, "ClickAddress({keyspace}/{address})")
            }
            Command::SelectNeighbor {
                neighbor, focus, ..
            } => write!(f, "SelectNeighbor({}, focus: {focus})", neighbor.key()),
            Command::AddNode { key, anchor } => match anchor {
                Some(a) => write!(f, "AddNode({key}, anchor: {})", a.node),
                None => write!(f, "AddNode({key})"),
            },
            Command::LoadTags(key) => write!(f, "LoadTags({key})"),
            Command::LoadEgonet { key, outgoing, .. } => {
                write!(f, "LoadEgonet({key}, outgoing: {outgoing})")
            }
            Command::LoadEntityAddresses { entity, .. } => {
                write!(f, "LoadEntityAddresses({entity})")
            }
            Command::RemoveEntityAddresses(key) => write!(f, "RemoveEntityAddresses({key})"),
            Command::RemoveNode(key) => write!(f, "RemoveNode({key})"),
            Command::InputNotes { key, .. } => write!(f, "InputNotes({key})"),
            Command::SetLabels { key, labels } => {
                write!(f, "SetLabels({key}, {} label(s))", labels.len())
            }
            Command::SelectNode(key) => write!(f, "SelectNode({key})"),
            Command::Deselect => write!(f, "Deselect"),
            Command::DragNode { key, .. } => write!(f, "DragNode({key})"),
            Command::DragNodeEnd(key) => write!(f, "DragNodeEnd({key})"),
            Command::SearchNeighbors(request) => {
                write!(f, "SearchNeighbors({}, {})", request.key, request.criterion)
            }
            Command::RedrawGraph => write!(f, "RedrawGraph"),
            Command::CreateSnapshot => write!(f, "CreateSnapshot"),
            Command::Undo => write!(f, "Undo"),
            Command::Redo => write!(f, "Redo"),
            Command::DisableUndoRedo => write!(f, "DisableUndoRedo"),
            Command::Blank => write!(f, "Blank"),
            Command::Load(doc) => write!(f, "Load({})", doc.id),
            Command::ResultNode { key, result, .. } => {
                write!(f, "ResultNode({key}, ok: {})", result.is_ok())
            }
            Command::ResultDetail { key, result } => {
                write!(f, "ResultDetail({key}, ok: {})", result.is_ok())
            }
            Command::ResultTags { key, result } => {
                write!(f, "ResultTags({key}, ok: {})", result.is_ok())
            }
            Command::ResultEgonet { key, result, .. } => {
                write!(f, "ResultEgonet({key}, ok: {})", result.is_ok())
            }
            Command::ResultEntityAddresses { entity, result } => {
                write!(f, "ResultEntityAddresses({entity}, ok: {})", result.is_ok())
            }
            Command::ResultSearchNeighbors { request, result } => {
                write!(f, "ResultSearchNeighbors({}, ok: {})", request.key, result.is_ok())
            }
            Command::AcquireNode(acquisition) => {
                write!(f, "AcquireNode({}, {})", acquisition.key, acquisition.stage)
            }
            Command::DegreeExcursion(excursion) => {
                write!(f, "DegreeExcursion({}, {})", excursion.key, excursion.stage)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_round_trip_through_json() {
        let cmd = Command::AddNode {
            key: NodeKey::address("btc", "1A"),
            anchor: Some(Anchor::new(NodeKey::entity("btc", "9"), true)),
        };
        let json = cmd.to_json().unwrap();
        assert!(json.contains("\"command\":\"addNode\""));
        assert_eq!(Command::from_json(&json).unwrap(), cmd);
        assert_eq!(
            Command::from_json(r#"{"command":"undo"}"#).unwrap(),
            Command::Undo
        );
    }

    #[test]
    fn unknown_commands_are_rejected_before_dispatch() {
        let err = Command::from_json(r#"{"command":"formatDisk","payload":{}}"#).unwrap_err();
        assert!(matches!(err, GraphError::Command(_)));
    }
}
