use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{
    error::GraphError,
    nodekey::NodeKey,
    properties::{Direction, Neighbor, Node, NodeType, RelationData, Tag},
    store::StoredRelation,
    transport::{AddressesPage, NeighborsPage, SearchRequest, SearchResult, Transport},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureSearch {
    pub root: NodeKey,
    pub result: SearchResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureDetail {
    pub key: NodeKey,
    pub value: serde_json::Value,
}

/// Everything a [FixtureTransport] can serve.
///
/// Nodes are stored the way the session would cache them. Responses are shaped the way the data
/// service shapes them: node lookups carry neither tags nor the owning entity nor member
/// addresses; those come from their own requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub nodes: Vec<Node>,
    pub relations: Vec<StoredRelation>,
    pub searches: Vec<FixtureSearch>,
    pub details: Vec<FixtureDetail>,
}

impl Dataset {
    pub fn from_json(content: &str) -> Result<Dataset, GraphError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_relation(mut self, source: &NodeKey, target: &NodeKey, data: RelationData) -> Self {
        self.relations.push(StoredRelation {
            source: source.clone(),
            target: target.clone(),
            data,
        });
        self
    }

    pub fn with_search(mut self, root: &NodeKey, result: SearchResult) -> Self {
        self.searches.push(FixtureSearch {
            root: root.clone(),
            result,
        });
        self
    }

    pub fn with_detail(mut self, key: &NodeKey, value: serde_json::Value) -> Self {
        self.details.push(FixtureDetail {
            key: key.clone(),
            value,
        });
        self
    }

    fn node(&self, key: &NodeKey) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.key == key)
    }
}

/// A request as seen by a [FixtureTransport], in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Node(NodeKey),
    EntityForAddress(NodeKey),
    Tags(NodeKey),
    Neighbors {
        key: NodeKey,
        direction: Direction,
        limit: usize,
    },
    EntityAddresses {
        entity: NodeKey,
        limit: usize,
    },
    GuidedSearch(NodeKey),
    Detail(NodeKey),
}

impl TransportCall {
    pub fn is_tags(&self) -> bool {
        matches!(self, TransportCall::Tags(_))
    }
}

impl Display for TransportCall {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            TransportCall::Node(k) => write!(f, "Node({k})"),
            TransportCall::EntityForAddress(k) => write!(f, "EntityForAddress({k})"),
            TransportCall::Tags(k) => write!(f, "Tags({k})"),
            TransportCall::Neighbors {
                key,
                direction,
                limit,
            } => write!(f, "Neighbors({key}, {direction}, {limit})"),
            TransportCall::EntityAddresses { entity, limit } => {
                write!(f, "EntityAddresses({entity}, {limit})")
            }
            TransportCall::GuidedSearch(k) => write!(f, "GuidedSearch({k})"),
            TransportCall::Detail(k) => write!(f, "Detail({k})"),
        }
    }
}

/// In-memory [Transport] over a [Dataset]. Records every request and can be told to fail
/// specific ones, each injected failure firing once.
#[derive(Debug, Default)]
pub struct FixtureTransport {
    dataset: Dataset,
    calls: Mutex<Vec<TransportCall>>,
    failures: Mutex<Vec<TransportCall>>,
}

impl FixtureTransport {
    pub fn new(dataset: Dataset) -> Self {
        FixtureTransport {
            dataset,
            ..Default::default()
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Make the next request equal to `call` fail with a transport error.
    pub fn fail_next(&self, call: TransportCall) {
        self.failures.lock().push(call);
    }

    fn record(&self, call: TransportCall) -> Result<(), GraphError> {
        tracing::trace!("[FixtureTransport] {call}");
        self.calls.lock().push(call.clone());
        let mut failures = self.failures.lock();
        match failures.iter().position(|f| f == &call) {
            Some(idx) => {
                failures.remove(idx);
                Err(GraphError::Transport(format!("injected failure for {call}")))
            }
            None => Ok(()),
        }
    }

    fn served(node: &Node) -> Node {
        let mut served = node.clone();
        served.tags = None;
        served.entity = None;
        served.notes = None;
        served.addresses.clear();
        served
    }

    fn lookup(&self, key: &NodeKey) -> Result<&Node, GraphError> {
        self.dataset
            .node(key)
            .ok_or_else(|| GraphError::Transport(format!("service has no {key}")))
    }

    fn node(&self, key: &NodeKey) -> Result<Node, GraphError> {
        self.record(TransportCall::Node(key.clone()))?;
        self.lookup(key).map(Self::served)
    }

    fn entity_for_address(&self, address: &NodeKey) -> Result<Option<Node>, GraphError> {
        self.record(TransportCall::EntityForAddress(address.clone()))?;
        let Some(entity_key) = self.lookup(address)?.entity_key() else {
            return Ok(None);
        };
        Ok(self.dataset.node(&entity_key).map(Self::served))
    }

    fn tags(&self, key: &NodeKey) -> Result<Vec<Tag>, GraphError> {
        self.record(TransportCall::Tags(key.clone()))?;
        Ok(self
            .dataset
            .node(key)
            .and_then(|n| n.tags.clone())
            .unwrap_or_default())
    }

    fn neighbors(
        &self,
        key: &NodeKey,
        direction: Direction,
        limit: usize,
    ) -> Result<NeighborsPage, GraphError> {
        self.record(TransportCall::Neighbors {
            key: key.clone(),
            direction,
            limit,
        })?;
        let neighbors = self
            .dataset
            .relations
            .iter()
            .filter_map(|r| match direction {
                Direction::Outgoing if &r.source == key => Some((&r.target, &r.data)),
                Direction::Incoming if &r.target == key => Some((&r.source, &r.data)),
                _ => None,
            })
            .take(limit)
            .map(|(other, data)| Neighbor {
                node: self
                    .dataset
                    .node(other)
                    .map(Self::served)
                    .unwrap_or_else(|| Node::new(other.clone())),
                relation: data.clone(),
            })
            .collect();
        Ok(NeighborsPage {
            neighbors,
            next_page: None,
        })
    }

    fn entity_addresses(&self, entity: &NodeKey, limit: usize) -> Result<AddressesPage, GraphError> {
        self.record(TransportCall::EntityAddresses {
            entity: entity.clone(),
            limit,
        })?;
        let addresses = self
            .dataset
            .nodes
            .iter()
            .filter(|n| {
                n.key.node_type == NodeType::Address
                    && n.key.keyspace == entity.keyspace
                    && n.entity.as_deref() == Some(entity.id.as_str())
            })
            .take(limit)
            .map(Self::served)
            .collect();
        Ok(AddressesPage {
            addresses,
            next_page: None,
        })
    }

    fn guided_search(&self, request: &SearchRequest) -> Result<SearchResult, GraphError> {
        self.record(TransportCall::GuidedSearch(request.key.clone()))?;
        Ok(self
            .dataset
            .searches
            .iter()
            .find(|s| s.root == request.key)
            .map(|s| s.result.clone())
            .unwrap_or_else(|| SearchResult {
                keyspace: request.key.keyspace.clone(),
                paths: Vec::new(),
            }))
    }

    fn detail(&self, key: &NodeKey) -> Result<serde_json::Value, GraphError> {
        self.record(TransportCall::Detail(key.clone()))?;
        self.dataset
            .details
            .iter()
            .find(|d| &d.key == key)
            .map(|d| d.value.clone())
            .ok_or_else(|| GraphError::Transport(format!("service has no details for {key}")))
    }
}

impl Transport for FixtureTransport {
    fn fetch_node(
        &self,
        key: &NodeKey,
    ) -> impl std::future::Future<Output = Result<Node, GraphError>> + Send {
        let result = self.node(key);
        async move { result }
    }

    fn fetch_entity_for_address(
        &self,
        keyspace: &str,
        address: &str,
    ) -> impl std::future::Future<Output = Result<Option<Node>, GraphError>> + Send {
        let result = self.entity_for_address(&NodeKey::address(keyspace, address));
        async move { result }
    }

    fn fetch_tags(
        &self,
        key: &NodeKey,
    ) -> impl std::future::Future<Output = Result<Vec<Tag>, GraphError>> + Send {
        let result = self.tags(key);
        async move { result }
    }

    fn fetch_neighbors(
        &self,
        key: &NodeKey,
        direction: Direction,
        limit: usize,
        _page: Option<String>,
    ) -> impl std::future::Future<Output = Result<NeighborsPage, GraphError>> + Send {
        let result = self.neighbors(key, direction, limit);
        async move { result }
    }

    fn fetch_entity_addresses(
        &self,
        entity: &NodeKey,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<AddressesPage, GraphError>> + Send {
        let result = self.entity_addresses(entity, limit);
        async move { result }
    }

    fn fetch_guided_search(
        &self,
        request: &SearchRequest,
    ) -> impl std::future::Future<Output = Result<SearchResult, GraphError>> + Send {
        let result = self.guided_search(request);
        async move { result }
    }

    fn fetch_detail(
        &self,
        key: &NodeKey,
    ) -> impl std::future::Future<Output = Result<serde_json::Value, GraphError>> + Send {
        let result = self.detail(key);
        async move { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn dataset() -> Dataset {
        let a = NodeKey::address("btc", "1A");
        let e = NodeKey::entity("btc", "9");
        let f = NodeKey::entity("btc", "10");
        Dataset::default()
            .with_node(
                Node::new(a.clone())
                    .with_entity("9")
                    .with_tags(vec![Tag::new("pool")]),
            )
            .with_node(Node::new(e.clone()).with_degrees(0, 1))
            .with_node(Node::new(f.clone()).with_degrees(1, 0))
            .with_relation(&e, &f, RelationData::default())
    }

    #[test(tokio::test)]
    async fn serves_service_shaped_responses() {
        let transport = FixtureTransport::new(dataset());
        let a = NodeKey::address("btc", "1A");

        let node = transport.fetch_node(&a).await.unwrap();
        assert!(node.entity.is_none());
        assert!(node.tags.is_none());

        let entity = transport.fetch_entity_for_address("btc", "1A").await.unwrap();
        assert_eq!(entity.map(|e| e.key.id), Some("9".to_string()));
        assert_eq!(transport.fetch_tags(&a).await.unwrap().len(), 1);

        let page = transport
            .fetch_neighbors(&NodeKey::entity("btc", "10"), Direction::Incoming, 100, None)
            .await
            .unwrap();
        assert_eq!(page.neighbors[0].key(), &NodeKey::entity("btc", "9"));
        assert_eq!(transport.calls().len(), 4);
    }

    #[test(tokio::test)]
    async fn injected_failures_fire_once() {
        let transport = FixtureTransport::new(dataset());
        let a = NodeKey::address("btc", "1A");
        transport.fail_next(TransportCall::Node(a.clone()));

        assert!(matches!(
            transport.fetch_node(&a).await,
            Err(GraphError::Transport(_))
        ));
        assert!(transport.fetch_node(&a).await.is_ok());
        assert!(transport
            .fetch_node(&NodeKey::address("btc", "missing"))
            .await
            .is_err());
    }
}
