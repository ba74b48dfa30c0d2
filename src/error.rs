use crate::model::{ModelError, ObjectKind};
use crate::provenance::SourceIdentity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Object model error: {0}")]
    Model(#[from] ModelError),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("{kind} [{id}] not found")]
    NotFound { kind: ObjectKind, id: i64 },

    #[error("No destination object registered for {identity}")]
    Unresolved { identity: SourceIdentity },
}

impl MigrateError {
    pub fn store(message: impl Into<String>) -> Self {
        MigrateError::Store {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
