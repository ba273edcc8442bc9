//! Directed relation storage.
//!
//! [`RelationGraph`] wraps a `petgraph::Graph` whose node weights are [`NodeKey`]s, with a side
//! index from key to graph index. Relations are unique per `(source, target)` pair: linking an
//! existing pair merges the metadata into the existing edge.

use petgraph::{graph::NodeIndex, visit::EdgeRef, IntoWeightedEdge};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    nodekey::NodeKey,
    properties::{Direction, RelationData},
};

/// Serialized form of a single relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRelation {
    pub source: NodeKey,
    pub target: NodeKey,
    #[serde(default)]
    pub data: RelationData,
}

impl IntoWeightedEdge<RelationData> for StoredRelation {
    type NodeId = NodeKey;
    fn into_weighted_edge(self) -> (NodeKey, NodeKey, RelationData) {
        (self.source, self.target, self.data)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    graph: petgraph::Graph<NodeKey, RelationData>,
    key_to_index: BTreeMap<NodeKey, NodeIndex>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<I>(iterable: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoWeightedEdge<RelationData, NodeId = NodeKey>,
    {
        let mut relations = RelationGraph::new();
        for edge in iterable {
            let (source, target, data) = edge.into_weighted_edge();
            relations.link(&source, &target, data);
        }
        relations
    }

    pub fn as_graph(&self) -> &petgraph::Graph<NodeKey, RelationData> {
        &self.graph
    }

    fn index_of(&mut self, key: &NodeKey) -> NodeIndex {
        if let Some(idx) = self.key_to_index.get(key) {
            return *idx;
        }
        let idx = self.graph.add_node(key.clone());
        self.key_to_index.insert(key.clone(), idx);
        idx
    }

    /// Returns true when a new relation was created, false when an existing one was updated.
    pub fn link(&mut self, source: &NodeKey, target: &NodeKey, data: RelationData) -> bool {
        let source_idx = self.index_of(source);
        let target_idx = self.index_of(target);
        match self.graph.find_edge(source_idx, target_idx) {
            Some(edge) => {
                self.graph[edge].merge(data);
                false
            }
            None => {
                self.graph.add_edge(source_idx, target_idx, data);
                true
            }
        }
    }

    pub fn get(&self, source: &NodeKey, target: &NodeKey) -> Option<&RelationData> {
        let source_idx = self.key_to_index.get(source)?;
        let target_idx = self.key_to_index.get(target)?;
        self.graph
            .find_edge(*source_idx, *target_idx)
            .map(|edge| &self.graph[edge])
    }

    /// Neighbors of `key` in the given direction, with the connecting relation's metadata.
    pub fn neighbors(
        &self,
        key: &NodeKey,
        direction: Direction,
    ) -> Vec<(&NodeKey, &RelationData)> {
        let Some(idx) = self.key_to_index.get(key) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(*idx, direction.into())
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (&self.graph[other], edge.weight())
            })
            .collect()
    }

    pub fn degree(&self, key: &NodeKey, direction: Direction) -> usize {
        self.key_to_index
            .get(key)
            .map(|idx| self.graph.edges_directed(*idx, direction.into()).count())
            .unwrap_or(0)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All relations in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&NodeKey, &NodeKey, &RelationData)> + '_ {
        self.graph.raw_edges().iter().map(|edge| {
            (
                &self.graph[edge.source()],
                &self.graph[edge.target()],
                &edge.weight,
            )
        })
    }

    pub fn to_stored(&self) -> Vec<StoredRelation> {
        self.edges()
            .map(|(source, target, data)| StoredRelation {
                source: source.clone(),
                target: target.clone(),
                data: data.clone(),
            })
            .collect()
    }
}
