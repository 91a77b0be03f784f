//! JSON-RPC 2.0 message shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::RpcError;

pub const JSONRPC_VERSION: &str = "2.0";

pub mod methods {
    pub const CREATE_SESSION: &str = "objectexplorer/createsession";
    pub const EXPAND: &str = "objectexplorer/expand";
    pub const REFRESH: &str = "objectexplorer/refresh";
    pub const CLOSE_SESSION: &str = "objectexplorer/closesession";

    pub const SESSION_CREATED: &str = "objectexplorer/sessioncreated";
    pub const EXPAND_COMPLETED: &str = "objectexplorer/expandCompleted";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl RpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RemoteError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// The result payload, or the remote error. A response with neither
    /// carries `null`.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(RpcError::Remote {
                code: error.code,
                message: error.message,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// Anything the service can send us.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    Response(RpcResponse),
    Notification(RpcNotification),
    /// A request from the service. The client does not serve any.
    Request(RpcRequest),
}

impl IncomingMessage {
    pub fn parse(bytes: &[u8]) -> Result<Self, RpcError> {
        let value: Value = serde_json::from_slice(bytes)?;

        let has_id = value.get("id").is_some_and(|id| !id.is_null());
        let has_method = value.get("method").is_some();

        match (has_id, has_method) {
            (true, true) => Ok(IncomingMessage::Request(serde_json::from_value(value)?)),
            (true, false) => Ok(IncomingMessage::Response(serde_json::from_value(value)?)),
            (false, true) => Ok(IncomingMessage::Notification(serde_json::from_value(
                value,
            )?)),
            (false, false) => Err(RpcError::Protocol(
                "Message has neither id nor method".into(),
            )),
        }
    }
}
