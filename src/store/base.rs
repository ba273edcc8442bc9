use std::collections::BTreeMap;

use crate::{
    error::GraphError,
    nodekey::NodeKey,
    properties::{Direction, Node, NodeType, RelationData, Tag},
    store::relations::{RelationGraph, StoredRelation},
};

/// Deduplicated cache of every node and relation the session has seen.
///
/// Adding a node whose key is already present merges into the existing state (see
/// [Node::merge]), so callers may re-add freely. Address/entity membership is kept symmetric:
/// registering an entity with member addresses sets each cached address's owning entity, and
/// registering an address with an owning entity adds it to the cached entity's members.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    states: BTreeMap<NodeKey, Node>,
    relations: RelationGraph,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts<I>(nodes: I, relations: Vec<StoredRelation>) -> Self
    where
        I: IntoIterator<Item = Node>,
    {
        let mut store = NodeStore::new();
        for node in nodes {
            store.add(node);
        }
        store.relations = RelationGraph::from_edges(relations);
        store
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.states.contains_key(key)
    }

    pub fn get(&self, key: &NodeKey) -> Option<&Node> {
        self.states.get(key)
    }

    pub fn get_mut(&mut self, key: &NodeKey) -> Option<&mut Node> {
        self.states.get_mut(key)
    }

    /// Like [NodeStore::get], for callers that only run once the node must be cached.
    pub fn require(&self, key: &NodeKey) -> Result<&Node, GraphError> {
        self.states
            .get(key)
            .ok_or_else(|| GraphError::NotFound(format!("{key} is not in the node store")))
    }

    pub fn require_mut(&mut self, key: &NodeKey) -> Result<&mut Node, GraphError> {
        self.states
            .get_mut(key)
            .ok_or_else(|| GraphError::NotFound(format!("{key} is not in the node store")))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.states.values()
    }

    pub fn relations(&self) -> &RelationGraph {
        &self.relations
    }

    /// Register `node`, merging with any cached state for the same key. Returns the stored
    /// state.
    pub fn add(&mut self, node: Node) -> &Node {
        let key = node.key.clone();
        match node.key.node_type {
            NodeType::Entity => {
                for address in node.addresses.iter() {
                    let address_key = key.sibling(NodeType::Address, address.clone());
                    if let Some(cached) = self.states.get_mut(&address_key) {
                        cached.entity = Some(key.id.clone());
                    }
                }
            }
            NodeType::Address => {
                if let Some(entity_key) = node.entity_key() {
                    if let Some(entity) = self.states.get_mut(&entity_key) {
                        entity.addresses.insert(key.id.clone());
                    }
                }
            }
            _ => {}
        }
        match self.states.get_mut(&key) {
            Some(cached) => cached.merge(node),
            None => {
                tracing::trace!("[NodeStore::add] caching {key}");
                self.states.insert(key.clone(), node);
            }
        }
        &self.states[&key]
    }

    /// The cached owner of an address, if any. Mockup entities are returned too.
    pub fn entity_of(&self, address: &NodeKey) -> Option<&Node> {
        self.states
            .get(address)
            .and_then(Node::entity_key)
            .and_then(|entity_key| self.states.get(&entity_key))
    }

    /// True when the address has an owning entity that is cached (real or mockup).
    pub fn has_entity(&self, address: &NodeKey) -> bool {
        self.entity_of(address).is_some()
    }

    /// Link `source -> target`. Relations are unique per pair; re-linking merges metadata.
    /// Returns true when a new relation was created.
    pub fn link_outgoing(&mut self, source: &NodeKey, target: &NodeKey, data: RelationData) -> bool {
        self.relations.link(source, target, data)
    }

    pub fn outgoing_count(&self, key: &NodeKey) -> usize {
        self.relations.degree(key, Direction::Outgoing)
    }

    pub fn incoming_count(&self, key: &NodeKey) -> usize {
        self.relations.degree(key, Direction::Incoming)
    }

    pub fn set_tags(&mut self, key: &NodeKey, tags: Vec<Tag>) -> Result<(), GraphError> {
        self.require_mut(key)?.set_service_tags(tags);
        Ok(())
    }

    pub fn add_tags(&mut self, key: &NodeKey, labels: Vec<Tag>) -> Result<(), GraphError> {
        self.require_mut(key)?.add_user_tags(labels);
        Ok(())
    }

    pub fn set_notes(&mut self, key: &NodeKey, notes: String) -> Result<(), GraphError> {
        let node = self.require_mut(key)?;
        node.notes = if notes.trim().is_empty() {
            None
        } else {
            Some(notes)
        };
        Ok(())
    }
}
