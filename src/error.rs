use std::{fmt, io};

use http::status::StatusCode;
use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum GraphError {
    #[error("Invalid Command: {0}")]
    Command(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("Operation cancelled")]
    OperationCancelled,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Transport error: {0}")]
    Transport(String),
}

impl GraphError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GraphError::Command(_) => StatusCode::BAD_REQUEST,
            GraphError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GraphError::Custom(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GraphError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GraphError::NotFound(_) => StatusCode::NOT_FOUND,
            GraphError::OperationCancelled => StatusCode::NO_CONTENT,
            GraphError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GraphError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Errors that mean the session's own bookkeeping is broken. Everything else is reported to
    /// the user and the session keeps running.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GraphError::NotFound(_) | GraphError::Custom(_))
    }
}

impl From<toml::de::Error> for GraphError {
    fn from(src: toml::de::Error) -> GraphError {
        GraphError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for GraphError {
    fn from(src: toml::ser::Error) -> GraphError {
        GraphError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for GraphError {
    fn from(src: JsonError) -> GraphError {
        GraphError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<uuid::Error> for GraphError {
    fn from(src: uuid::Error) -> GraphError {
        GraphError::Serialization(format!("UUID conversion failed: {src}"))
    }
}

impl From<io::Error> for GraphError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => GraphError::NotFound(format!("{x}")),
            _ => GraphError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for GraphError {
    fn from(x: fmt::Error) -> Self {
        GraphError::Custom(format!("{x}"))
    }
}

impl From<RegexError> for GraphError {
    fn from(x: RegexError) -> Self {
        GraphError::Serialization(format!("Regex parse failed: {x}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_fatal_transport_is_not() {
        assert!(GraphError::NotFound("btc/address/a1".into()).is_fatal());
        assert!(!GraphError::Transport("timeout".into()).is_fatal());
        assert_eq!(
            GraphError::Transport("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err: GraphError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, GraphError::NotFound(_)));
    }
}
