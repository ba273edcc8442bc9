use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

use crate::{error::GraphError, graph::DEFAULT_SNAPSHOT_DEPTH};

/// Tunables for a [crate::session::Session]. Every field has a default, so a config file only
/// needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Keyspaces (currencies) the data service serves. Clicks on other keyspaces are ignored.
    pub keyspaces: Vec<String>,
    /// Nodes with at least this many relations in a direction skip neighbor prefetching in
    /// that direction; below it, up to this many neighbors are fetched.
    pub degree_threshold: u64,
    pub max_search_depth: u32,
    pub max_search_breadth: u32,
    /// Undo history length.
    pub snapshot_depth: usize,
    pub egonet_limit: usize,
    pub entity_addresses_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            keyspaces: vec!["btc".to_string()],
            degree_threshold: 100,
            max_search_depth: 7,
            max_search_breadth: 100,
            snapshot_depth: DEFAULT_SNAPSHOT_DEPTH,
            egonet_limit: 100,
            entity_addresses_limit: 100,
        }
    }
}

impl SessionConfig {
    pub fn from_toml(content: &str) -> Result<SessionConfig, GraphError> {
        let config: SessionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, GraphError> {
        Ok(toml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if self.keyspaces.is_empty() {
            return Err(GraphError::Config("at least one keyspace is required".into()));
        }
        if self.degree_threshold == 0 {
            return Err(GraphError::Config("degree_threshold must be positive".into()));
        }
        if self.max_search_depth == 0 || self.max_search_breadth == 0 {
            return Err(GraphError::Config(
                "search depth and breadth limits must be positive".into(),
            ));
        }
        if self.snapshot_depth == 0 {
            return Err(GraphError::Config("snapshot_depth must be positive".into()));
        }
        Ok(())
    }

    pub fn supports_keyspace(&self, keyspace: &str) -> bool {
        self.keyspaces.iter().any(|k| k == keyspace)
    }
}

pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<SessionConfig, GraphError>;
    fn set_config(&self, config: &SessionConfig) -> Result<(), GraphError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<SessionConfig, GraphError> {
        tracing::debug!("Attempting to read session config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(SessionConfig::default());
        }
        SessionConfig::from_toml(&read_to_string(&self.path)?)
    }

    fn set_config(&self, config: &SessionConfig) -> Result<(), GraphError> {
        tracing::debug!("Attempting to write session config to: {:?}", &self.path);
        config.validate()?;
        write(&self.path, config.to_toml()?)?;
        Ok(())
    }
}
