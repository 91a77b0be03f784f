use sqlharbor_core::ExplorerError;

#[derive(thiserror::Error, Debug)]
pub enum RpcError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },
    #[error("tools service closed the connection")]
    Closed,
    #[error("timeout")]
    Timeout,
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Protocol(err.to_string())
    }
}

impl From<RpcError> for ExplorerError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Timeout => ExplorerError::timeout("tools service response"),
            RpcError::Io(e) => ExplorerError::IoError(e),
            other => ExplorerError::rpc(other.to_string()),
        }
    }
}
