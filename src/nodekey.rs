/// [crate::nodekey] contains [NodeKey], the `(keyspace, type, id)` identity shared by the
/// [crate::store::NodeStore], the visual graph and every transport request, plus the history
/// fragment (`#!keyspace/type/id`) the dashboard writes into the location bar.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::{error::GraphError, properties::NodeType};

static FRAGMENT: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^#!(?P<keyspace>[^/]+)/(?P<type>[^/]+)/(?P<id>.+)$"));

/// Identity of a graph object. Two objects with the same key are the same object; the
/// [crate::store::NodeStore] never holds more than one node per key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub keyspace: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub id: String,
}

impl NodeKey {
    pub fn new(keyspace: impl Into<String>, node_type: NodeType, id: impl Into<String>) -> Self {
        NodeKey {
            keyspace: keyspace.into(),
            node_type,
            id: id.into(),
        }
    }

    pub fn address(keyspace: impl Into<String>, id: impl Into<String>) -> Self {
        NodeKey::new(keyspace, NodeType::Address, id)
    }

    pub fn entity(keyspace: impl Into<String>, id: impl Into<String>) -> Self {
        NodeKey::new(keyspace, NodeType::Entity, id)
    }

    /// Key of a sibling object in the same keyspace.
    pub fn sibling(&self, node_type: NodeType, id: impl Into<String>) -> Self {
        NodeKey::new(self.keyspace.clone(), node_type, id)
    }

    pub fn is_address(&self) -> bool {
        self.node_type == NodeType::Address
    }

    pub fn is_entity(&self) -> bool {
        self.node_type == NodeType::Entity
    }

    pub fn to_fragment(&self) -> String {
        format!("#!{self}")
    }

    pub fn from_fragment(fragment: &str) -> Result<NodeKey, GraphError> {
        let re = FRAGMENT
            .as_ref()
            .map_err(|e| GraphError::Serialization(format!("fragment pattern: {e}")))?;
        let caps = re.captures(fragment).ok_or_else(|| {
            GraphError::Serialization(format!("'{fragment}' is not a history fragment"))
        })?;
        Ok(NodeKey {
            keyspace: caps["keyspace"].to_string(),
            node_type: caps["type"].parse()?,
            id: caps["id"].to_string(),
        })
    }
}

impl Display for NodeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.keyspace, self.node_type, self.id)
    }
}

impl FromStr for NodeKey {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(keyspace), Some(node_type), Some(id)) if !keyspace.is_empty() && !id.is_empty() => {
                Ok(NodeKey::new(keyspace, node_type.parse()?, id))
            }
            _ => Err(GraphError::Serialization(format!(
                "'{s}' is not of the form keyspace/type/id"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let key = NodeKey::address("btc", "1Archive");
        assert_eq!(key.to_string(), "btc/address/1Archive");
        assert_eq!("btc/address/1Archive".parse::<NodeKey>().unwrap(), key);
    }

    #[test]
    fn parse_rejects_partial_keys() {
        assert!("btc/address".parse::<NodeKey>().is_err());
        assert!("btc/wallet/x".parse::<NodeKey>().is_err());
        assert!("/entity/12".parse::<NodeKey>().is_err());
    }

    #[test]
    fn fragment_round_trip() {
        let key = NodeKey::entity("ltc", "2718");
        assert_eq!(key.to_fragment(), "#!ltc/entity/2718");
        assert_eq!(NodeKey::from_fragment("#!ltc/entity/2718").unwrap(), key);
        assert!(NodeKey::from_fragment("ltc/entity/2718").is_err());
    }
}
