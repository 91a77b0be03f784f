mod app_config;
mod contracts;
mod credential_store;
mod error;
mod profile;
mod secrets;
mod store;
mod traits;

pub mod object_explorer;
pub mod schema_designer;

pub use app_config::{
    AppConfig, AppConfigStore, DEFAULT_ACCOUNT_REFRESH_MARKERS, ObjectExplorerSettings,
    ToolsServiceConfig,
};
pub use contracts::{
    CloseSessionParams, CloseSessionResponse, ConnectionDetails, CreateSessionResponse,
    ExpandParams, ExpandResponse, NodeFilter, NodeFilterOperator, NodeFilterProperty, NodeInfo,
    ObjectMetadata, SessionCreatedNotification, ToolsNotification,
};
pub use credential_store::{CredentialStore, ProfileCredentialStore};
pub use error::ExplorerError;
pub use object_explorer::{
    ChannelRefresher, CollapsibleState, ConnectionStatus, NodeId, NodeKind,
    ObjectExplorerDeps, ObjectExplorerProvider, ObjectExplorerService, RetryPolicy,
    SessionOutcome, TreeItem, TreeNode,
};
pub use profile::{AuthenticationType, ConnectionProfile, ProfileIdentity};
pub use secrets::{
    KeyringSecretStore, MemorySecretStore, NoopSecretStore, SecretStore, connection_secret_ref,
    create_secret_store,
};
pub use store::ProfileStore;
pub use traits::{
    AzureAccount, AzureIdentity, AzureToken, ConnectionPrompter, NoAzureIdentity, ToolsService,
    TreeRefresher,
};
