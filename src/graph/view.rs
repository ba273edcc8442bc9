use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{
    error::GraphError,
    nodekey::NodeKey,
    properties::{Anchor, NodeType, RelationData},
    store::NodeStore,
};

/// Where a node sits in the visual graph.
///
/// Entities are laid out in layers: an entity attached to an anchor sits one layer to the right
/// of it when reached through an outgoing relation, one layer to the left otherwise. Addresses
/// are drawn inside their owning entity (`parent`) and share its layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub key: NodeKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeKey>,
    pub layer: i32,
    /// Offset applied by dragging.
    #[serde(default)]
    pub dx: f64,
    #[serde(default)]
    pub dy: f64,
}

impl Placement {
    fn new(key: NodeKey, anchor: Option<Anchor>, parent: Option<NodeKey>, layer: i32) -> Self {
        Placement {
            key,
            anchor,
            parent,
            layer,
            dx: 0.0,
            dy: 0.0,
        }
    }
}

/// The visual graph: the subset of the [NodeStore] the analyst has placed, in insertion order,
/// plus selection. Cloned wholesale into undo snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    placements: Vec<Placement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selected: Option<NodeKey>,
}

impl GraphView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.position(key).is_some()
    }

    pub fn placement(&self, key: &NodeKey) -> Option<&Placement> {
        self.position(key).map(|idx| &self.placements[idx])
    }

    pub fn placements(&self) -> impl Iterator<Item = &Placement> + '_ {
        self.placements.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> + '_ {
        self.placements.iter().map(|p| &p.key)
    }

    pub fn selected(&self) -> Option<&NodeKey> {
        self.selected.as_ref()
    }

    fn position(&self, key: &NodeKey) -> Option<usize> {
        self.placements.iter().position(|p| &p.key == key)
    }

    fn layer_for(&self, anchor: Option<&Anchor>) -> i32 {
        match anchor {
            None => 0,
            Some(anchor) => {
                let base = self.placement(&anchor.node).map(|p| p.layer).unwrap_or(0);
                if anchor.outgoing {
                    base + 1
                } else {
                    base - 1
                }
            }
        }
    }

    /// Place `key` (which must be cached in `store`) at `anchor`. Placing an address also
    /// places its owning entity. Already placed nodes keep their placement. Returns the key of
    /// the placed node.
    pub fn add(
        &mut self,
        store: &NodeStore,
        key: &NodeKey,
        anchor: Option<&Anchor>,
    ) -> Result<NodeKey, GraphError> {
        let node = store.require(key)?;
        if self.contains(key) {
            return Ok(key.clone());
        }
        let layer = self.layer_for(anchor);
        match node.key.node_type {
            NodeType::Entity => {
                self.placements
                    .push(Placement::new(key.clone(), anchor.cloned(), None, layer));
            }
            NodeType::Address => {
                let parent = store.entity_of(key).map(|entity| entity.key.clone());
                let mut address_layer = layer;
                if let Some(entity_key) = parent.as_ref() {
                    match self.placement(entity_key) {
                        Some(entity) => address_layer = entity.layer,
                        None => self.placements.push(Placement::new(
                            entity_key.clone(),
                            anchor.cloned(),
                            None,
                            layer,
                        )),
                    }
                }
                self.placements.push(Placement::new(
                    key.clone(),
                    anchor.cloned(),
                    parent,
                    address_layer,
                ));
            }
            other => {
                return Err(GraphError::Command(format!(
                    "{other} {} cannot be placed in the graph",
                    key.id
                )))
            }
        }
        tracing::trace!("[GraphView::add] placed {key} at layer {layer}");
        Ok(key.clone())
    }

    /// Remove a node. Removing an entity removes the addresses drawn inside it. Returns every
    /// removed key.
    pub fn remove(&mut self, key: &NodeKey) -> Vec<NodeKey> {
        if !self.contains(key) {
            return Vec::new();
        }
        let mut removed = Vec::new();
        self.placements.retain(|p| {
            let drop = &p.key == key || p.parent.as_ref() == Some(key);
            if drop {
                removed.push(p.key.clone());
            }
            !drop
        });
        if self
            .selected
            .as_ref()
            .is_some_and(|selected| removed.contains(selected))
        {
            self.selected = None;
        }
        removed
    }

    pub fn entity_addresses(&self, entity: &NodeKey) -> Vec<&NodeKey> {
        self.placements
            .iter()
            .filter(|p| p.parent.as_ref() == Some(entity))
            .map(|p| &p.key)
            .collect()
    }

    /// Draw `addresses` inside the placed `entity`. Returns how many were newly placed.
    pub fn set_entity_addresses(
        &mut self,
        entity: &NodeKey,
        addresses: &[NodeKey],
    ) -> Result<usize, GraphError> {
        let layer = self
            .placement(entity)
            .map(|p| p.layer)
            .ok_or_else(|| GraphError::NotFound(format!("{entity} is not in the graph")))?;
        let mut added = 0;
        for address in addresses {
            if self.contains(address) {
                continue;
            }
            self.placements.push(Placement::new(
                address.clone(),
                None,
                Some(entity.clone()),
                layer,
            ));
            added += 1;
        }
        Ok(added)
    }

    pub fn remove_entity_addresses(&mut self, entity: &NodeKey) -> Vec<NodeKey> {
        let children: Vec<NodeKey> = self
            .entity_addresses(entity)
            .into_iter()
            .cloned()
            .collect();
        for child in children.iter() {
            self.remove(child);
        }
        children
    }

    /// Returns false when the node is not placed.
    pub fn select(&mut self, key: &NodeKey) -> bool {
        if self.contains(key) {
            self.selected = Some(key.clone());
            true
        } else {
            false
        }
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn drag(&mut self, key: &NodeKey, dx: f64, dy: f64) -> bool {
        match self.position(key) {
            Some(idx) => {
                let placement = &mut self.placements[idx];
                placement.dx += dx;
                placement.dy += dy;
                true
            }
            None => false,
        }
    }

    /// Relations from `store` whose endpoints are both placed.
    pub fn visible_edges<'a>(
        &self,
        store: &'a NodeStore,
    ) -> Vec<(&'a NodeKey, &'a NodeKey, &'a RelationData)> {
        let placed: BTreeSet<&NodeKey> = self.keys().collect();
        store
            .relations()
            .edges()
            .filter(|(source, target, _)| placed.contains(source) && placed.contains(target))
            .collect()
    }

    pub fn clear(&mut self) {
        self.placements.clear();
        self.selected = None;
    }
}
