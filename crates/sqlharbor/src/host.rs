use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use sqlharbor_core::{
    AppConfig, AppConfigStore, ChannelRefresher, CloseSessionParams, CloseSessionResponse,
    ConnectionDetails, CreateSessionResponse, CredentialStore, ExpandParams, ExplorerError,
    NoAzureIdentity, ObjectExplorerDeps, ObjectExplorerProvider, ObjectExplorerService,
    ProfileCredentialStore, ProfileStore, ToolsService, create_secret_store,
};
use tokio::task::JoinHandle;

use crate::prompter::TerminalPrompter;

/// Stand-in for commands that never talk to a server.
pub struct OfflineToolsService;

fn offline() -> ExplorerError {
    ExplorerError::rpc("tools service not running")
}

#[async_trait]
impl ToolsService for OfflineToolsService {
    async fn create_session(
        &self,
        _details: ConnectionDetails,
    ) -> Result<CreateSessionResponse, ExplorerError> {
        Err(offline())
    }

    async fn expand(&self, _params: ExpandParams) -> Result<bool, ExplorerError> {
        Err(offline())
    }

    async fn refresh(&self, _params: ExpandParams) -> Result<bool, ExplorerError> {
        Err(offline())
    }

    async fn close_session(
        &self,
        _params: CloseSessionParams,
    ) -> Result<CloseSessionResponse, ExplorerError> {
        Err(offline())
    }
}

/// Where the config and profile files live.
#[derive(Debug, Clone, Default)]
pub struct HostPaths {
    pub config: Option<PathBuf>,
    pub profiles: Option<PathBuf>,
}

impl HostPaths {
    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        let store = match &self.config {
            Some(path) => AppConfigStore::from_path(path.clone()),
            None => AppConfigStore::new()?,
        };

        store
            .load()
            .with_context(|| format!("loading {}", store.path().display()))
    }

    fn profile_store(&self) -> anyhow::Result<ProfileStore> {
        Ok(match &self.profiles {
            Some(path) => ProfileStore::from_path(path.clone()),
            None => ProfileStore::new()?,
        })
    }
}

/// The object explorer wired to terminal prompts and on-disk profiles.
pub struct Host {
    pub service: Arc<ObjectExplorerService>,
    pub provider: ObjectExplorerProvider,
    pub credentials: Arc<dyn CredentialStore>,
    repaint_task: JoinHandle<()>,
}

impl Host {
    /// Must be called inside a tokio runtime.
    pub fn open(
        paths: &HostPaths,
        config: &AppConfig,
        tools: Arc<dyn ToolsService>,
    ) -> anyhow::Result<Self> {
        let credentials: Arc<dyn CredentialStore> = Arc::new(ProfileCredentialStore::new(
            paths.profile_store()?,
            create_secret_store(),
        ));

        Ok(Self::with_credentials(credentials, config, tools))
    }

    pub fn with_credentials(
        credentials: Arc<dyn CredentialStore>,
        config: &AppConfig,
        tools: Arc<dyn ToolsService>,
    ) -> Self {
        let (refresher, mut repaints) = ChannelRefresher::new();
        let repaint_task = tokio::spawn(async move {
            while let Some(node) = repaints.recv().await {
                match node {
                    Some(id) => debug!("Repaint {}", id),
                    None => debug!("Repaint tree"),
                }
            }
        });

        let deps = ObjectExplorerDeps {
            tools,
            credentials: credentials.clone(),
            azure: Arc::new(NoAzureIdentity),
            prompter: Arc::new(TerminalPrompter),
            refresher: Arc::new(refresher),
        };

        let service = Arc::new(ObjectExplorerService::new(deps, config));
        let provider = ObjectExplorerProvider::new(service.clone());

        Self {
            service,
            provider,
            credentials,
            repaint_task,
        }
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.repaint_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_service_refuses_every_call() {
        let tools = OfflineToolsService;
        let err = tools
            .expand(ExpandParams {
                session_id: "s".into(),
                node_path: "srv".into(),
                filters: Vec::new(),
            })
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not running"));
    }

    #[test]
    fn explicit_config_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"object_explorer": {"max_session_retries": 9}}"#).unwrap();

        let paths = HostPaths {
            config: Some(path),
            profiles: None,
        };

        let err = paths.load_config().unwrap_err();
        assert!(format!("{err:#}").contains("config.json"));
    }
}
