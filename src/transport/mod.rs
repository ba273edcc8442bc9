//! The boundary to the remote data service.
//!
//! [`Transport`] is the asynchronous, keyspace-scoped request surface the session drives. The
//! real HTTP client lives outside this crate; [`fixture::FixtureTransport`] serves an in-memory
//! dataset for tests and offline exploration.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{
    config::SessionConfig,
    error::GraphError,
    nodekey::NodeKey,
    properties::{Direction, Neighbor, Node, RelationData, Tag},
};

pub mod fixture;

pub const DEFAULT_SEARCH_DEPTH: u32 = 2;
pub const DEFAULT_SEARCH_BREADTH: u32 = 20;
pub const DEFAULT_SKIP_NUM_ADDRESSES: u32 = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NeighborsPage {
    pub neighbors: Vec<Neighbor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressesPage {
    pub addresses: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
}

/// What a guided search looks for along the paths it explores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchCriterion {
    /// Entities carrying a tag of this category.
    Category(String),
    /// Entities owning any of these addresses.
    Addresses(Vec<String>),
}

impl Display for SearchCriterion {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            SearchCriterion::Category(c) => write!(f, "category {c}"),
            SearchCriterion::Addresses(a) => write!(f, "{} address(es)", a.len()),
        }
    }
}

/// A multi-hop neighbor search rooted at `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub key: NodeKey,
    pub outgoing: bool,
    pub depth: u32,
    pub breadth: u32,
    pub skip_num_addresses: u32,
    pub criterion: SearchCriterion,
}

impl SearchRequest {
    pub fn new(key: NodeKey, outgoing: bool, criterion: SearchCriterion) -> Self {
        SearchRequest {
            key,
            outgoing,
            depth: DEFAULT_SEARCH_DEPTH,
            breadth: DEFAULT_SEARCH_BREADTH,
            skip_num_addresses: DEFAULT_SKIP_NUM_ADDRESSES,
            criterion,
        }
    }

    pub fn validate(&self, config: &SessionConfig) -> Result<(), GraphError> {
        if self.depth == 0 || self.depth > config.max_search_depth {
            return Err(GraphError::Command(format!(
                "search depth must be between 1 and {}, got {}",
                config.max_search_depth, self.depth
            )));
        }
        if self.breadth == 0 || self.breadth > config.max_search_breadth {
            return Err(GraphError::Command(format!(
                "search breadth must be between 1 and {}, got {}",
                config.max_search_breadth, self.breadth
            )));
        }
        if self.skip_num_addresses < self.breadth {
            return Err(GraphError::Command(format!(
                "skipNumAddresses ({}) must not be lower than the breadth ({})",
                self.skip_num_addresses, self.breadth
            )));
        }
        match &self.criterion {
            SearchCriterion::Category(c) if c.trim().is_empty() => {
                Err(GraphError::Command("search category is empty".into()))
            }
            SearchCriterion::Addresses(a) if a.is_empty() => {
                Err(GraphError::Command("search address list is empty".into()))
            }
            _ => Ok(()),
        }
    }
}

/// One hop of a guided search result tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathNode {
    pub node: Node,
    #[serde(default)]
    pub relation: RelationData,
    #[serde(default)]
    pub matching_addresses: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<PathNode>>,
}

impl PathNode {
    pub fn leaf(node: Node) -> Self {
        PathNode {
            node,
            relation: RelationData::default(),
            matching_addresses: Vec::new(),
            paths: None,
        }
    }

    pub fn with_children(mut self, children: Vec<PathNode>) -> Self {
        self.paths = Some(children);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.paths.as_ref().map_or(true, Vec::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub keyspace: String,
    #[serde(default)]
    pub paths: Vec<PathNode>,
}

/// Asynchronous request surface of the data service.
///
/// Futures must be `Send` and must not borrow from the call arguments beyond the call itself;
/// the session boxes them and awaits replies out of order.
pub trait Transport: Send + Sync + 'static {
    fn fetch_node(
        &self,
        key: &NodeKey,
    ) -> impl std::future::Future<Output = Result<Node, GraphError>> + Send;

    /// The owning entity of an address, or None when the service has none.
    fn fetch_entity_for_address(
        &self,
        keyspace: &str,
        address: &str,
    ) -> impl std::future::Future<Output = Result<Option<Node>, GraphError>> + Send;

    fn fetch_tags(
        &self,
        key: &NodeKey,
    ) -> impl std::future::Future<Output = Result<Vec<Tag>, GraphError>> + Send;

    fn fetch_neighbors(
        &self,
        key: &NodeKey,
        direction: Direction,
        limit: usize,
        page: Option<String>,
    ) -> impl std::future::Future<Output = Result<NeighborsPage, GraphError>> + Send;

    fn fetch_entity_addresses(
        &self,
        entity: &NodeKey,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<AddressesPage, GraphError>> + Send;

    fn fetch_guided_search(
        &self,
        request: &SearchRequest,
    ) -> impl std::future::Future<Output = Result<SearchResult, GraphError>> + Send;

    /// Raw details of a transaction, block or label for the browser pane. Default
    /// implementation reports the request as unsupported.
    fn fetch_detail(
        &self,
        key: &NodeKey,
    ) -> impl std::future::Future<Output = Result<serde_json::Value, GraphError>> + Send {
        tracing::warn!("This Transport impl does not serve details for {key}");
        let err = GraphError::Transport(format!("details for {} are not served", key.node_type));
        async move { Err(err) }
    }
}
