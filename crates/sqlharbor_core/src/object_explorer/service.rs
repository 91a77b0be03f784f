use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::{
    AppConfig, AuthenticationType, AzureIdentity, CloseSessionParams, ConnectionDetails,
    ConnectionPrompter, ConnectionProfile, CredentialStore, ExpandParams, ExpandResponse,
    ExplorerError, NodeFilter, ObjectExplorerSettings, SessionCreatedNotification,
    ToolsNotification, ToolsService, TreeRefresher,
};

use super::connection_node::{ConnectedState, ConnectionStatus};
use super::pending::{PendingMap, expand_key, is_session_key};
use super::retry::{FailureKind, RetryPolicy, SessionOutcome, classify_failure};
use super::tree_node::{NodeId, TreeNode};
use super::tree_store::ObjectTree;

/// Collaborators injected into the service.
#[derive(Clone)]
pub struct ObjectExplorerDeps {
    pub tools: Arc<dyn ToolsService>,
    pub credentials: Arc<dyn CredentialStore>,
    pub azure: Arc<dyn AzureIdentity>,
    pub prompter: Arc<dyn ConnectionPrompter>,
    pub refresher: Arc<dyn TreeRefresher>,
}

enum AzureResolution {
    Ready,
    SignInRequired,
    Cancelled,
    Failed(String),
}

/// Session and expansion state machine behind the object explorer tree.
///
/// Session creation and expansion are two-phase: the RPC call only
/// acknowledges the request, the outcome arrives as a `ToolsNotification`
/// that the host feeds back through `handle_notification` (or
/// `run_notification_loop`).
pub struct ObjectExplorerService {
    tools: Arc<dyn ToolsService>,
    credentials: Arc<dyn CredentialStore>,
    azure: Arc<dyn AzureIdentity>,
    prompter: Arc<dyn ConnectionPrompter>,
    refresher: Arc<dyn TreeRefresher>,
    settings: ObjectExplorerSettings,
    retry_policy: RetryPolicy,
    refresh_markers: Vec<String>,
    tree: Mutex<ObjectTree>,
    session_waiters: PendingMap<SessionCreatedNotification>,
    expand_waiters: PendingMap<ExpandResponse>,
}

impl ObjectExplorerService {
    pub fn new(deps: ObjectExplorerDeps, config: &AppConfig) -> Self {
        Self {
            tools: deps.tools,
            credentials: deps.credentials,
            azure: deps.azure,
            prompter: deps.prompter,
            refresher: deps.refresher,
            settings: config.object_explorer.clone(),
            retry_policy: RetryPolicy::new(config.object_explorer.max_session_retries),
            refresh_markers: config.account_refresh_markers.clone(),
            tree: Mutex::new(ObjectTree::new()),
            // The created notification can beat the create-session response.
            session_waiters: PendingMap::parking(
                "session",
                config.object_explorer.session_timeout(),
            ),
            expand_waiters: PendingMap::new("expand"),
        }
    }

    fn tree(&self) -> MutexGuard<'_, ObjectTree> {
        match self.tree.lock() {
            Ok(guard) => guard,
            Err(poison_err) => {
                warn!("Object explorer tree mutex poisoned, recovering...");
                poison_err.into_inner()
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Loads root nodes from the saved profiles and repaints the tree.
    pub fn initialize(&self) -> Result<(), ExplorerError> {
        let count = self.load_root_nodes()?;
        info!("Object explorer initialized with {} connections", count);
        self.refresher.refresh(None);
        Ok(())
    }

    /// Closes every live session and drops all pending completions.
    pub async fn shutdown(&self) {
        let sessions: Vec<(NodeId, String)> = {
            let tree = self.tree();
            tree.roots()
                .into_iter()
                .filter_map(|node| node.session_id.clone().map(|sid| (node.id, sid)))
                .collect()
        };

        let closing = sessions
            .iter()
            .map(|(_, session_id)| self.close_remote_session(session_id));
        futures::future::join_all(closing).await;

        {
            let mut tree = self.tree();
            for (id, _) in &sessions {
                if let Some(node) = tree.get_mut(id) {
                    node.update_to_disconnected_state();
                }
            }
        }

        self.session_waiters.clear();
        self.expand_waiters.clear();
        info!("Object explorer shut down");
    }

    fn load_root_nodes(&self) -> Result<usize, ExplorerError> {
        let profiles = self.credentials.load_profiles()?;

        let mut tree = self.tree();
        tree.set_roots(Vec::new());
        for profile in profiles {
            tree.upsert_connection(profile);
        }

        Ok(tree.root_ids().len())
    }

    /// Children of `node`, or the root connection nodes when `node` is `None`.
    pub async fn get_children(
        &self,
        node: Option<&NodeId>,
    ) -> Result<Vec<TreeNode>, ExplorerError> {
        let Some(id) = node else {
            return self.root_children();
        };

        let (is_connection, session_id, cached) = {
            let mut tree = self.tree();
            let node = tree
                .get(id)
                .ok_or_else(|| ExplorerError::NodeNotFound(id.clone()))?;
            let should_refresh = node.should_refresh;
            let is_connection = node.is_connection();
            let session_id = node.session_id.clone();

            if should_refresh {
                debug!("Purging cached children of {}", id);
                tree.clear_children(id);
            }

            (is_connection, session_id, tree.children(id))
        };

        if let Some(children) = cached {
            return Ok(children);
        }

        match session_id {
            Some(session_id) => self.expand_node(id, &session_id).await,
            None if is_connection => self.get_or_create_node_children_with_session(id).await,
            None => Ok(Vec::new()),
        }
    }

    fn root_children(&self) -> Result<Vec<TreeNode>, ExplorerError> {
        let loaded = self.tree().roots_loaded();
        if !loaded {
            self.load_root_nodes()?;
        }

        let roots = self.tree().roots();
        if roots.is_empty() {
            return Ok(vec![TreeNode::add_connection()]);
        }

        Ok(roots)
    }

    /// Drops cached children and connects again. Backs the reconnect and
    /// sign-in affordances.
    pub async fn reconnect_node(&self, id: &NodeId) -> Result<Vec<TreeNode>, ExplorerError> {
        self.tree().clear_children(id);
        self.get_children(Some(id)).await
    }

    async fn get_or_create_node_children_with_session(
        &self,
        id: &NodeId,
    ) -> Result<Vec<TreeNode>, ExplorerError> {
        let profile = self
            .tree()
            .get(id)
            .and_then(|node| node.connection_profile().cloned())
            .ok_or_else(|| ExplorerError::NodeNotFound(id.clone()))?;

        let mut candidate = profile;
        let mut retries = 0;

        loop {
            match self.create_session(Some(candidate)).await? {
                SessionOutcome::Created {
                    session_id,
                    node_id,
                } => return self.expand_node(&node_id, &session_id).await,
                SessionOutcome::Retry(profile) if self.retry_policy.allows(retries) => {
                    retries += 1;
                    info!(
                        "Retrying session creation for {} (attempt {}/{})",
                        profile.display_label(),
                        retries,
                        self.retry_policy.max_attempts
                    );
                    candidate = profile;
                    tokio::task::yield_now().await;
                }
                SessionOutcome::Retry(profile) => {
                    warn!(
                        "Session creation for {} still failing after {} retries",
                        profile.display_label(),
                        retries
                    );
                    return Ok(Vec::new());
                }
                SessionOutcome::SignInRequired { node_id } => {
                    return Ok(self.tree().children(&node_id).unwrap_or_default());
                }
                SessionOutcome::Cancelled | SessionOutcome::Failed { .. } => {
                    return Ok(Vec::new());
                }
            }
        }
    }

    /// Creates a session for `profile`, prompting for a new profile when none
    /// is given.
    pub async fn create_session(
        &self,
        profile: Option<ConnectionProfile>,
    ) -> Result<SessionOutcome, ExplorerError> {
        let mut profile = match profile {
            Some(profile) => profile,
            None => match self.prompter.prompt_for_connection().await {
                Some(profile) => {
                    self.credentials.save_profile(&profile)?;
                    profile
                }
                None => return Ok(SessionOutcome::Cancelled),
            },
        };

        match profile.authentication_type {
            AuthenticationType::SqlLogin if profile.password.is_none() => {
                let password = match self.credentials.lookup_password(&profile) {
                    Some(password) => Some(password),
                    None => self.prompter.prompt_for_password(&profile).await,
                };

                match password {
                    Some(password) => profile.password = Some(password),
                    None => {
                        debug!("Password prompt dismissed for {}", profile.display_label());
                        return Ok(SessionOutcome::Cancelled);
                    }
                }
            }
            AuthenticationType::SqlLogin => {}
            AuthenticationType::AzureMfa => match self.resolve_azure_token(&mut profile).await {
                AzureResolution::Ready => {}
                AzureResolution::SignInRequired => {
                    let node_id = self.show_sign_in(profile);
                    return Ok(SessionOutcome::SignInRequired { node_id });
                }
                AzureResolution::Cancelled => return Ok(SessionOutcome::Cancelled),
                AzureResolution::Failed(message) => {
                    self.prompter.show_error(&message).await;
                    return Ok(SessionOutcome::Failed { message });
                }
            },
            AuthenticationType::Integrated => profile.clear_azure_token(),
        }

        let node_id = {
            let mut tree = self.tree();
            let node_id = tree.upsert_connection(profile.clone());
            if let Some(node) = tree.get_mut(&node_id) {
                node.set_connection_status(ConnectionStatus::SessionPending);
            }
            node_id
        };
        self.refresher.refresh(None);

        let response = match self
            .tools
            .create_session(ConnectionDetails::from_profile(&profile))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Create session request failed: {}", e);
                self.revert_connection_node(&node_id);
                let message = e.to_string();
                self.prompter.show_error(&message).await;
                return Ok(SessionOutcome::Failed { message });
            }
        };

        let session_id = response.session_id;
        let registration = self.session_waiters.register(&session_id);

        let notification =
            match timeout(self.settings.session_timeout(), registration.receiver).await {
                Ok(Ok(notification)) => notification,
                Ok(Err(_)) => {
                    warn!("Session {} completion dropped", session_id);
                    self.revert_connection_node(&node_id);
                    return Ok(SessionOutcome::Failed {
                        message: format!("Session {session_id} was cancelled"),
                    });
                }
                Err(_) => {
                    self.session_waiters.cancel(&session_id);
                    self.revert_connection_node(&node_id);
                    let message = ExplorerError::timeout("session creation").to_string();
                    error!("{} ({})", message, profile.display_label());
                    self.prompter.show_error(&message).await;
                    return Ok(SessionOutcome::Failed { message });
                }
            };

        match notification {
            SessionCreatedNotification {
                success: true,
                root_node: Some(root_node),
                ..
            } => {
                {
                    let mut tree = self.tree();
                    let Some(node) = tree.get_mut(&node_id) else {
                        return Err(ExplorerError::NodeNotFound(node_id));
                    };
                    node.update_to_connected_state(ConnectedState {
                        node_info: &root_node,
                        session_id: &session_id,
                        parent: None,
                        profile: profile.clone(),
                    });
                }

                info!(
                    "Session {} created for {}",
                    session_id,
                    profile.display_label()
                );
                self.refresher.refresh(Some(&node_id));

                Ok(SessionOutcome::Created {
                    session_id,
                    node_id,
                })
            }
            notification => {
                self.handle_session_failure(&node_id, profile, notification)
                    .await
            }
        }
    }

    async fn handle_session_failure(
        &self,
        node_id: &NodeId,
        mut profile: ConnectionProfile,
        notification: SessionCreatedNotification,
    ) -> Result<SessionOutcome, ExplorerError> {
        let message = notification
            .error_message
            .unwrap_or_else(|| "Failed to create session".to_string());
        let error_number = notification.error_number;

        warn!(
            "Session creation failed for {}: {}",
            profile.display_label(),
            message
        );
        self.revert_connection_node(node_id);

        match classify_failure(&profile, error_number, &message, &self.refresh_markers) {
            FailureKind::Certificate => {
                match self.prompter.prompt_ssl_remediation(&profile, &message).await {
                    Some(updated) => {
                        if let Err(e) = self.credentials.save_profile(&updated) {
                            error!("Failed to save remediated profile: {}", e);
                        }
                        if let Some(node) = self.tree().get_mut(node_id) {
                            node.replace_profile(updated.clone());
                        }
                        Ok(SessionOutcome::Retry(updated))
                    }
                    None => Ok(SessionOutcome::Failed { message }),
                }
            }
            FailureKind::Firewall => {
                let number = error_number.unwrap_or_default();
                if self
                    .prompter
                    .handle_firewall_rule(&profile, number, &message)
                    .await
                {
                    Ok(SessionOutcome::Retry(profile))
                } else {
                    Ok(SessionOutcome::Failed { message })
                }
            }
            FailureKind::AccountRefresh => match self.refresh_account_token(&mut profile).await {
                Ok(()) => Ok(SessionOutcome::Retry(profile)),
                Err(e) => {
                    let message = e.to_string();
                    self.prompter.show_error(&message).await;
                    Ok(SessionOutcome::Failed { message })
                }
            },
            FailureKind::Terminal => {
                self.prompter.show_error(&message).await;
                Ok(SessionOutcome::Failed { message })
            }
        }
    }

    fn revert_connection_node(&self, node_id: &NodeId) {
        if let Some(node) = self.tree().get_mut(node_id) {
            node.update_to_unrealized_state();
        }
        self.refresher.refresh(Some(node_id));
    }

    fn show_sign_in(&self, profile: ConnectionProfile) -> NodeId {
        let profile_id = profile.id;
        let node_id = {
            let mut tree = self.tree();
            let node_id = tree.upsert_connection(profile);
            if let Some(node) = tree.get_mut(&node_id) {
                node.set_connection_status(ConnectionStatus::Unrealized);
            }
            let sign_in = TreeNode::account_sign_in(&node_id, profile_id);
            tree.set_children(&node_id, vec![sign_in]);
            node_id
        };

        info!("Azure account sign-in required for profile {}", profile_id);
        self.refresher.refresh(Some(&node_id));
        node_id
    }

    async fn resolve_azure_token(&self, profile: &mut ConnectionProfile) -> AzureResolution {
        let account = match profile.account_id.as_deref() {
            Some(account_id) => self.azure.find_account(account_id).await,
            None => None,
        };

        let Some(account) = account else {
            return AzureResolution::SignInRequired;
        };

        if !self.azure.is_account_cached(&account).await {
            return AzureResolution::SignInRequired;
        }

        if !profile.azure_token_expired() {
            return AzureResolution::Ready;
        }

        let first = self
            .azure
            .refresh_token(&account, profile.tenant_id.as_deref())
            .await;

        let token = match first {
            Ok(token) => token,
            Err(e) => {
                warn!("Token refresh failed for {}: {}", account.display_name, e);

                if !self.prompter.prompt_account_refresh(profile).await {
                    return AzureResolution::Cancelled;
                }

                match self
                    .azure
                    .refresh_token(&account, profile.tenant_id.as_deref())
                    .await
                {
                    Ok(token) => token,
                    Err(e) => return AzureResolution::Failed(e.to_string()),
                }
            }
        };

        profile.azure_account_token = Some(token.token);
        profile.expires_on = Some(token.expires_on);
        AzureResolution::Ready
    }

    async fn refresh_account_token(
        &self,
        profile: &mut ConnectionProfile,
    ) -> Result<(), ExplorerError> {
        let account_id = profile.account_id.clone().ok_or_else(|| {
            ExplorerError::Credential("Profile has no Azure account".to_string())
        })?;

        let account = self.azure.find_account(&account_id).await.ok_or_else(|| {
            ExplorerError::Credential(format!("Azure account {account_id} not found"))
        })?;

        let token = self
            .azure
            .refresh_token(&account, profile.tenant_id.as_deref())
            .await?;

        profile.azure_account_token = Some(token.token);
        profile.expires_on = Some(token.expires_on);
        Ok(())
    }

    /// Requests the children of a node bound to `session_id`.
    ///
    /// A second call for the same session and path joins the in-flight
    /// request. Remote failures become a single error child.
    pub async fn expand_node(
        &self,
        id: &NodeId,
        session_id: &str,
    ) -> Result<Vec<TreeNode>, ExplorerError> {
        let (node_path, should_refresh, filters) = {
            let tree = self.tree();
            let node = tree
                .get(id)
                .ok_or_else(|| ExplorerError::NodeNotFound(id.clone()))?;
            (
                node.node_path.clone(),
                node.should_refresh,
                node.filters.clone(),
            )
        };

        let key = expand_key(session_id, &node_path);
        let registration = self.expand_waiters.register(&key);

        if registration.is_first {
            let params = ExpandParams {
                session_id: session_id.to_string(),
                node_path: node_path.clone(),
                filters,
            };

            let sent = if should_refresh {
                self.tools.refresh(params).await
            } else {
                self.tools.expand(params).await
            };

            let failure = match sent {
                Ok(true) => None,
                Ok(false) => Some(format!("The server refused to expand {node_path}")),
                Err(e) => Some(e.to_string()),
            };

            if let Some(message) = failure {
                error!("Expand request for {} failed: {}", node_path, message);
                self.expand_waiters.cancel(&key);
                return self.finish_expand(id, session_id, Err(message));
            }
        }

        let outcome = match timeout(self.settings.expand_timeout(), registration.receiver).await {
            Ok(Ok(response)) => match response.error_message {
                Some(message) => Err(message),
                None => Ok(response.nodes),
            },
            Ok(Err(_)) => Err(format!("Expansion of {node_path} was cancelled")),
            Err(_) => {
                self.expand_waiters.cancel(&key);
                Err(ExplorerError::timeout(format!("expansion of {node_path}")).to_string())
            }
        };

        if let Err(message) = &outcome {
            warn!("Expansion of {} failed: {}", node_path, message);
        }

        self.finish_expand(id, session_id, outcome)
    }

    fn finish_expand(
        &self,
        id: &NodeId,
        session_id: &str,
        outcome: Result<Vec<crate::NodeInfo>, String>,
    ) -> Result<Vec<TreeNode>, ExplorerError> {
        let children = {
            let mut tree = self.tree();

            let Some(node) = tree.get_mut(id) else {
                return Ok(Vec::new());
            };
            node.should_refresh = false;

            if node.session_id.as_deref() != Some(session_id) {
                debug!("Discarding expansion of {}: session changed", id);
                return Ok(Vec::new());
            }

            // A joined waiter already stored this round's children.
            if let Some(existing) = tree.children(id) {
                return Ok(existing);
            }

            let profile_id = tree.get(id).and_then(|node| node.profile_id);
            let children = match outcome {
                Ok(infos) => infos
                    .iter()
                    .map(|info| TreeNode::from_node_info(info, session_id, Some(id), profile_id, None))
                    .collect(),
                Err(message) => vec![TreeNode::error(Some(id), message)],
            };

            tree.set_children(id, children)
        };

        self.refresher.refresh(Some(id));
        Ok(children)
    }

    /// Asks for confirmation, then disconnects and forgets the connection.
    /// Returns false when the user declined.
    pub async fn remove_node(&self, id: &NodeId) -> Result<bool, ExplorerError> {
        let (root_id, label, profile) = self.connection_of(id)?;

        if !self.prompter.confirm_remove(&label).await {
            return Ok(false);
        }

        let session_id = self.tree().get(&root_id).and_then(|n| n.session_id.clone());
        if let Some(session_id) = session_id {
            self.close_remote_session(&session_id).await;
        }

        self.tree().remove_root(&root_id);
        self.credentials.remove_profile(&profile)?;

        info!("Removed connection {}", label);
        self.refresher.refresh(None);
        Ok(true)
    }

    /// Closes the session of the connection owning `id` and leaves a
    /// reconnect affordance as its only child.
    pub async fn disconnect_node(&self, id: &NodeId) -> Result<(), ExplorerError> {
        let (root_id, label, profile) = self.connection_of(id)?;

        let session_id = self.tree().get(&root_id).and_then(|n| n.session_id.clone());
        if let Some(session_id) = session_id {
            self.close_remote_session(&session_id).await;
        }

        {
            let mut tree = self.tree();
            if let Some(node) = tree.get_mut(&root_id) {
                node.update_to_disconnected_state();
            }
            let affordance = TreeNode::connect_affordance(&root_id, profile.id);
            tree.set_children(&root_id, vec![affordance]);
        }

        info!("Disconnected {}", label);
        self.refresher.refresh(Some(&root_id));
        Ok(())
    }

    async fn close_remote_session(&self, session_id: &str) {
        self.expand_waiters
            .cancel_where(|key| is_session_key(key, session_id));

        match self
            .tools
            .close_session(CloseSessionParams {
                session_id: session_id.to_string(),
            })
            .await
        {
            Ok(response) if !response.success => {
                warn!("Tools service did not close session {}", session_id);
            }
            Ok(_) => debug!("Closed session {}", session_id),
            Err(e) => error!("Failed to close session {}: {}", session_id, e),
        }
    }

    fn connection_of(
        &self,
        id: &NodeId,
    ) -> Result<(NodeId, String, ConnectionProfile), ExplorerError> {
        let tree = self.tree();
        let root = tree
            .connection_root_of(id)
            .ok_or_else(|| ExplorerError::NodeNotFound(id.clone()))?;
        let profile = root
            .connection_profile()
            .cloned()
            .ok_or_else(|| ExplorerError::NodeNotFound(id.clone()))?;

        Ok((root.id.clone(), root.label.clone(), profile))
    }

    /// Stores filters on a node and schedules a refresh of its children.
    pub fn set_node_filters(
        &self,
        id: &NodeId,
        filters: Vec<NodeFilter>,
    ) -> Result<(), ExplorerError> {
        {
            let mut tree = self.tree();
            let node = tree
                .get_mut(id)
                .ok_or_else(|| ExplorerError::NodeNotFound(id.clone()))?;
            node.context.has_filters = !filters.is_empty();
            node.filters = filters;
            node.should_refresh = true;
        }

        self.refresher.refresh(Some(id));
        Ok(())
    }

    pub fn clear_node_filters(&self, id: &NodeId) -> Result<(), ExplorerError> {
        self.set_node_filters(id, Vec::new())
    }

    /// Marks a node stale. The next `get_children` purges its cache.
    pub fn refresh_node(&self, id: &NodeId) -> Result<(), ExplorerError> {
        {
            let mut tree = self.tree();
            let node = tree
                .get_mut(id)
                .ok_or_else(|| ExplorerError::NodeNotFound(id.clone()))?;
            node.should_refresh = true;
        }

        self.refresher.refresh(Some(id));
        Ok(())
    }

    pub fn upsert_connection_node(&self, profile: ConnectionProfile) -> NodeId {
        let id = self.tree().upsert_connection(profile);
        self.refresher.refresh(None);
        id
    }

    pub fn handle_notification(&self, notification: ToolsNotification) {
        match notification {
            ToolsNotification::SessionCreated(created) => self.handle_session_created(created),
            ToolsNotification::ExpandCompleted(response) => self.handle_expand_completed(response),
        }
    }

    pub fn handle_session_created(&self, notification: SessionCreatedNotification) {
        let session_id = notification.session_id.clone();
        if !self.session_waiters.resolve(&session_id, notification) {
            debug!("Session {} completed before its request returned", session_id);
        }
    }

    pub fn handle_expand_completed(&self, response: ExpandResponse) {
        let key = expand_key(&response.session_id, &response.node_path);
        if !self.expand_waiters.resolve(&key, response) {
            debug!("Dropped expand completion nobody waits for: {}", key);
        }
    }

    /// Dispatches notifications until the sender side closes.
    pub async fn run_notification_loop(
        self: Arc<Self>,
        mut notifications: mpsc::UnboundedReceiver<ToolsNotification>,
    ) {
        while let Some(notification) = notifications.recv().await {
            self.handle_notification(notification);
        }

        debug!("Notification channel closed");
    }

    pub fn node(&self, id: &NodeId) -> Option<TreeNode> {
        self.tree().get(id).cloned()
    }

    pub fn parent_of(&self, id: &NodeId) -> Option<TreeNode> {
        self.tree().parent_of(id).cloned()
    }

    pub fn cached_children(&self, id: &NodeId) -> Option<Vec<TreeNode>> {
        self.tree().children(id)
    }

    pub fn root_connection_nodes(&self) -> Vec<TreeNode> {
        self.tree().roots()
    }

    pub fn connection_node_for_profile(&self, profile: &ConnectionProfile) -> Option<TreeNode> {
        self.tree().find_connection(profile).cloned()
    }

    pub fn root_node_count(&self) -> usize {
        self.tree().root_ids().len()
    }

    pub fn pending_session_count(&self) -> usize {
        self.session_waiters.len()
    }

    pub fn pending_expand_count(&self) -> usize {
        self.expand_waiters.len()
    }
}
