use thiserror::Error;

use crate::NodeId;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("Tools service request failed: {0}")]
    Rpc(String),

    #[error("Timed out waiting for {operation}")]
    Timeout { operation: String },

    #[error("Credential store error: {0}")]
    Credential(String),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tree node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ExplorerError {
    pub fn rpc(message: impl Into<String>) -> Self {
        Self::Rpc(message.into())
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }
}
