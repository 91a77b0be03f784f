use crate::{
    CloseSessionParams, CloseSessionResponse, ConnectionDetails, ConnectionProfile,
    CreateSessionResponse, ExpandParams, ExplorerError, NodeId,
};
use async_trait::async_trait;
use secrecy::SecretString;

/// Client side of the out-of-process tools service.
///
/// `create_session`, `expand` and `refresh` only acknowledge the request. The
/// outcome arrives later as a `ToolsNotification` that the host routes back
/// into `ObjectExplorerService`.
#[async_trait]
pub trait ToolsService: Send + Sync {
    async fn create_session(
        &self,
        details: ConnectionDetails,
    ) -> Result<CreateSessionResponse, ExplorerError>;

    /// Returns `false` when the service refused to start the expansion.
    async fn expand(&self, params: ExpandParams) -> Result<bool, ExplorerError>;

    /// Same contract as `expand`, but bypasses the service-side cache.
    async fn refresh(&self, params: ExpandParams) -> Result<bool, ExplorerError>;

    async fn close_session(
        &self,
        params: CloseSessionParams,
    ) -> Result<CloseSessionResponse, ExplorerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureAccount {
    pub id: String,
    pub display_name: String,
    pub tenant_id: Option<String>,
}

#[derive(Clone)]
pub struct AzureToken {
    pub token: SecretString,
    /// Unix timestamp in seconds.
    pub expires_on: i64,
}

impl std::fmt::Debug for AzureToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureToken")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

#[async_trait]
pub trait AzureIdentity: Send + Sync {
    async fn find_account(&self, account_id: &str) -> Option<AzureAccount>;

    async fn is_account_cached(&self, account: &AzureAccount) -> bool;

    async fn refresh_token(
        &self,
        account: &AzureAccount,
        tenant_id: Option<&str>,
    ) -> Result<AzureToken, ExplorerError>;
}

/// Identity provider for hosts without Microsoft Entra support.
pub struct NoAzureIdentity;

#[async_trait]
impl AzureIdentity for NoAzureIdentity {
    async fn find_account(&self, _account_id: &str) -> Option<AzureAccount> {
        None
    }

    async fn is_account_cached(&self, _account: &AzureAccount) -> bool {
        false
    }

    async fn refresh_token(
        &self,
        account: &AzureAccount,
        _tenant_id: Option<&str>,
    ) -> Result<AzureToken, ExplorerError> {
        Err(ExplorerError::Credential(format!(
            "Account {} cannot be refreshed: no identity provider configured",
            account.display_name
        )))
    }
}

/// Every user interaction the object explorer needs.
///
/// `None`/`false` answers mean the user cancelled; they are not errors.
#[async_trait]
pub trait ConnectionPrompter: Send + Sync {
    async fn prompt_for_connection(&self) -> Option<ConnectionProfile>;

    async fn prompt_for_password(&self, profile: &ConnectionProfile) -> Option<SecretString>;

    async fn confirm_remove(&self, label: &str) -> bool;

    /// Offers a fix for a certificate validation failure, usually trusting
    /// the server certificate. Returns the corrected profile.
    async fn prompt_ssl_remediation(
        &self,
        profile: &ConnectionProfile,
        error_message: &str,
    ) -> Option<ConnectionProfile>;

    /// Runs the firewall-rule creation flow. `true` once a rule was added.
    async fn handle_firewall_rule(
        &self,
        profile: &ConnectionProfile,
        error_number: i64,
        error_message: &str,
    ) -> bool;

    /// Asks whether to sign in again after a failed token refresh.
    async fn prompt_account_refresh(&self, profile: &ConnectionProfile) -> bool;

    async fn show_error(&self, message: &str);
}

/// Repaint callback into the host tree view. `None` repaints everything.
pub trait TreeRefresher: Send + Sync {
    fn refresh(&self, node: Option<&NodeId>);
}
