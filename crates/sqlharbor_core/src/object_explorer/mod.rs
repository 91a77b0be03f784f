mod connection_node;
mod pending;
mod provider;
mod retry;
mod service;
mod tree_node;
mod tree_store;

pub use connection_node::{ConnectedState, ConnectionNode, ConnectionStatus};
pub use pending::{PendingMap, Registration};
pub use provider::{ChannelRefresher, ObjectExplorerProvider, TreeItem};
pub use retry::{
    CERTIFICATE_ERROR_NUMBER, FIREWALL_ERROR_NUMBER, FailureKind, RetryPolicy, SessionOutcome,
    classify_failure, is_certificate_error, needs_account_refresh,
};
pub use service::{ObjectExplorerDeps, ObjectExplorerService};
pub use tree_node::{
    ACCOUNT_SIGN_IN_NODE_TYPE, ADD_CONNECTION_NODE_TYPE, CONNECT_NODE_TYPE, CollapsibleState,
    ERROR_NODE_TYPE, NodeContext, NodeId, NodeKind, SERVER_NODE_TYPE, TreeNode,
};
pub use tree_store::ObjectTree;
