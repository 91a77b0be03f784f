pub mod client;
pub mod envelope;
pub mod error;
pub mod framing;
pub mod launcher;

pub use client::RpcClient;
pub use envelope::{
    IncomingMessage, JSONRPC_VERSION, RemoteError, RpcNotification, RpcRequest, RpcResponse,
    methods,
};
pub use error::RpcError;
pub use framing::{read_message, write_message};
pub use launcher::{ToolsServiceProcess, launch};
