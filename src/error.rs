use crate::model::EntityKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollabStreamError {
    #[error("API error: {0}")]
    Api(String),

    #[error("{kind} entity not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed {kind} payload: {reason}")]
    MalformedPayload { kind: EntityKind, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CollabStreamError>;
