pub use enumset::EnumSet;
/// [crate::properties] contains the data model shared by the store, the visual graph and the
/// transport: node types, nodes, tags and relation metadata.
use enumset::{enum_set, EnumSetType};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::{error::GraphError, nodekey::NodeKey};

/// Object types served by the data service. Only [GRAPH_TYPES] are ever placed in the visual
/// graph; the rest are shown in the browser pane.
#[derive(Debug, Serialize, Deserialize, PartialOrd, Ord, Hash, EnumSetType)]
#[serde(rename_all = "lowercase")]
#[enumset(repr = "u32")]
pub enum NodeType {
    Address,
    Entity,
    Transaction,
    Block,
    Label,
}

pub const GRAPH_TYPES: EnumSet<NodeType> = enum_set!(NodeType::Address | NodeType::Entity);

impl NodeType {
    pub fn is_graph_type(&self) -> bool {
        GRAPH_TYPES.contains(*self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Address => "address",
            NodeType::Entity => "entity",
            NodeType::Transaction => "transaction",
            NodeType::Block => "block",
            NodeType::Label => "label",
        }
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim() {
            "address" => Ok(NodeType::Address),
            "entity" => Ok(NodeType::Entity),
            "transaction" | "tx" => Ok(NodeType::Transaction),
            "block" => Ok(NodeType::Block),
            "label" => Ok(NodeType::Label),
            other => Err(GraphError::Serialization(format!(
                "unknown node type '{other}'"
            ))),
        }
    }
}

/// Relation direction, as seen from the node whose neighbors are requested.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn from_outgoing(outgoing: bool) -> Direction {
        if outgoing {
            Direction::Outgoing
        } else {
            Direction::Incoming
        }
    }

    pub fn is_outgoing(&self) -> bool {
        *self == Direction::Outgoing
    }
}

impl From<Direction> for petgraph::Direction {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Incoming => petgraph::Direction::Incoming,
            Direction::Outgoing => petgraph::Direction::Outgoing,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Direction::Incoming => write!(f, "incoming"),
            Direction::Outgoing => write!(f, "outgoing"),
        }
    }
}

/// An attribution label attached to an address or entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abuse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Tags entered by the analyst rather than served by the data service.
    #[serde(default, skip_serializing_if = "is_false")]
    pub user_defined: bool,
}

impl Tag {
    pub fn new(label: impl Into<String>) -> Tag {
        Tag {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn user(label: impl Into<String>) -> Tag {
        Tag {
            label: label.into(),
            user_defined: true,
            ..Default::default()
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Where a newly acquired node attaches in the visual graph. `outgoing` records the direction
/// of the relation from the anchor to the new node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub node: NodeKey,
    pub outgoing: bool,
}

impl Anchor {
    pub fn new(node: NodeKey, outgoing: bool) -> Anchor {
        Anchor { node, outgoing }
    }
}

/// Free-form relation metadata (transferred values, transaction counts, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationData {
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl RelationData {
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.payload
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), GraphError> {
        self.payload
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn with<T: Serialize>(mut self, key: &str, value: T) -> Result<Self, GraphError> {
        self.set(key, value)?;
        Ok(self)
    }

    /// Later metadata wins key by key.
    pub fn merge(&mut self, other: RelationData) {
        self.payload.extend(other.payload);
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// A neighbor entry as returned by a neighbor listing: the neighbor's identity plus the metadata
/// of the relation connecting it to the requested node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub node: Node,
    #[serde(default)]
    pub relation: RelationData,
}

impl Neighbor {
    pub fn key(&self) -> &NodeKey {
        &self.node.key
    }
}

/// A graph object cached in the [crate::store::NodeStore].
///
/// `tags == None` means the tags were never loaded, `Some(vec![])` means they were loaded and
/// there are none. Degrees are the totals reported by the data service; the number of relations
/// held locally is usually lower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub key: NodeKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default)]
    pub in_degree: u64,
    #[serde(default)]
    pub out_degree: u64,
    /// Owning entity id, for addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Synthesized stand-in for an address the service could not attribute to an entity.
    #[serde(default, skip_serializing_if = "is_false")]
    pub mockup: bool,
    /// Member address ids, for entities.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub addresses: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,
}

pub const MOCKUP_PREFIX: &str = "mockup";

impl Node {
    pub fn new(key: NodeKey) -> Node {
        Node {
            key,
            tags: None,
            in_degree: 0,
            out_degree: 0,
            entity: None,
            mockup: false,
            addresses: BTreeSet::new(),
            notes: None,
            payload: Map::new(),
        }
    }

    pub fn with_degrees(mut self, in_degree: u64, out_degree: u64) -> Node {
        self.in_degree = in_degree;
        self.out_degree = out_degree;
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Node {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Node {
        self.tags = Some(tags);
        self
    }

    /// Stand-in entity for an address with no known owner. Its tags count as loaded since the
    /// service has nothing to say about a synthetic id.
    pub fn mockup_entity(address: &NodeKey) -> Node {
        let mut node = Node::new(
            address.sibling(NodeType::Entity, format!("{MOCKUP_PREFIX}{}", address.id)),
        );
        node.mockup = true;
        node.tags = Some(Vec::new());
        node.addresses.insert(address.id.clone());
        node
    }

    pub fn entity_key(&self) -> Option<NodeKey> {
        match self.key.node_type {
            NodeType::Entity => Some(self.key.clone()),
            _ => self
                .entity
                .as_ref()
                .map(|id| self.key.sibling(NodeType::Entity, id.clone())),
        }
    }

    pub fn tags_loaded(&self) -> bool {
        self.tags.is_some()
    }

    /// Fold a newer observation of the same object into this one. Values present in `incoming`
    /// win; values it lacks (tags, notes, owning entity) are kept; member addresses are unioned.
    /// Incoming tags replace the service tags only; user-defined labels survive.
    pub fn merge(&mut self, incoming: Node) {
        debug_assert_eq!(self.key, incoming.key);
        if let Some(tags) = incoming.tags {
            let (user, service): (Vec<Tag>, Vec<Tag>) =
                tags.into_iter().partition(|t| t.user_defined);
            self.set_service_tags(service);
            self.add_user_tags(user);
        }
        if incoming.entity.is_some() {
            self.entity = incoming.entity;
        }
        if incoming.notes.is_some() {
            self.notes = incoming.notes;
        }
        if incoming.in_degree > 0 || incoming.out_degree > 0 {
            self.in_degree = incoming.in_degree;
            self.out_degree = incoming.out_degree;
        }
        self.mockup = incoming.mockup;
        self.addresses.extend(incoming.addresses);
        self.payload.extend(incoming.payload);
    }

    /// Replace the service-provided tags, keeping the ones the analyst entered.
    pub fn set_service_tags(&mut self, tags: Vec<Tag>) {
        let mut merged: Vec<Tag> = self
            .tags
            .take()
            .unwrap_or_default()
            .into_iter()
            .filter(|t| t.user_defined)
            .collect();
        merged.extend(tags.into_iter().filter(|t| !t.user_defined));
        self.tags = Some(merged);
    }

    pub fn add_user_tags(&mut self, labels: Vec<Tag>) {
        let tags = self.tags.get_or_insert_with(Vec::new);
        for mut label in labels {
            label.user_defined = true;
            if !tags.iter().any(|t| t.user_defined && t.label == label.label) {
                tags.push(label);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_types_are_address_and_entity() {
        assert!(NodeType::Address.is_graph_type());
        assert!(NodeType::Entity.is_graph_type());
        assert!(!NodeType::Transaction.is_graph_type());
        assert_eq!("tx".parse::<NodeType>().unwrap(), NodeType::Transaction);
    }

    #[test]
    fn mockup_entity_identity() {
        let address = NodeKey::address("btc", "1Lonely");
        let mockup = Node::mockup_entity(&address);
        assert_eq!(mockup.key, NodeKey::entity("btc", "mockup1Lonely"));
        assert!(mockup.mockup);
        assert!(mockup.tags_loaded());
        assert!(mockup.addresses.contains("1Lonely"));
    }

    #[test]
    fn merge_keeps_what_the_newcomer_lacks() {
        let key = NodeKey::address("btc", "1A");
        let mut cached = Node::new(key.clone())
            .with_degrees(3, 4)
            .with_entity("77")
            .with_tags(vec![Tag::new("exchange")]);
        cached.notes = Some("watch".into());

        let mut fresh = Node::new(key).with_degrees(5, 6);
        fresh.payload.insert("balance".into(), Value::from(12));
        cached.merge(fresh);

        assert_eq!((cached.in_degree, cached.out_degree), (5, 6));
        assert_eq!(cached.entity.as_deref(), Some("77"));
        assert_eq!(cached.tags.as_ref().map(Vec::len), Some(1));
        assert_eq!(cached.notes.as_deref(), Some("watch"));
        assert_eq!(cached.payload.get("balance"), Some(&Value::from(12)));
    }

    #[test]
    fn service_tags_keep_user_labels() {
        let mut node = Node::new(NodeKey::entity("btc", "5"));
        node.add_user_tags(vec![Tag::new("suspect")]);
        node.set_service_tags(vec![Tag::new("mixer")]);
        let labels: Vec<_> = node
            .tags
            .iter()
            .flatten()
            .map(|t| (t.label.as_str(), t.user_defined))
            .collect();
        assert_eq!(labels, vec![("suspect", true), ("mixer", false)]);
    }

    #[test]
    fn merge_with_service_tags_keeps_user_labels() {
        let key = NodeKey::entity("btc", "5");
        let mut cached = Node::new(key.clone()).with_tags(vec![Tag::new("exchange")]);
        cached.add_user_tags(vec![Tag::user("suspect")]);

        cached.merge(Node::new(key).with_tags(vec![Tag::new("mixer")]));

        let labels: Vec<_> = cached
            .tags
            .iter()
            .flatten()
            .map(|t| (t.label.as_str(), t.user_defined))
            .collect();
        assert_eq!(labels, vec![("suspect", true), ("mixer", false)]);
    }

    #[test]
    fn relation_data_accessors() {
        let mut data = RelationData::default().with("no_txs", 3u32).unwrap();
        data.merge(RelationData::default().with("no_txs", 4u32).unwrap());
        assert_eq!(data.get::<u32>("no_txs"), Some(4));
        assert_eq!(data.get::<u32>("value"), None);
    }
}
