use sqlharbor_core::{
    AppConfig, ConnectionProfile, ObjectExplorerDeps, ObjectExplorerService,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::fixtures;
use crate::{
    FakeAzureIdentity, FakePrompter, FakeToolsService, InMemoryCredentialStore,
    RecordingRefresher,
};

/// An `ObjectExplorerService` wired to fakes, with its notification loop
/// running. Must be built inside a tokio runtime.
pub struct ExplorerHarness {
    pub service: Arc<ObjectExplorerService>,
    pub tools: FakeToolsService,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub prompter: Arc<FakePrompter>,
    pub azure: Arc<FakeAzureIdentity>,
    pub refresher: Arc<RecordingRefresher>,
    notification_loop: JoinHandle<()>,
}

impl ExplorerHarness {
    pub fn new(profiles: Vec<ConnectionProfile>) -> Self {
        Self::build(
            InMemoryCredentialStore::new(profiles),
            FakePrompter::new(),
            FakeAzureIdentity::new(),
            fixtures::test_config(),
        )
    }

    pub fn build(
        credentials: InMemoryCredentialStore,
        prompter: FakePrompter,
        azure: FakeAzureIdentity,
        config: AppConfig,
    ) -> Self {
        let (tools, notifications) = FakeToolsService::new();
        let credentials = Arc::new(credentials);
        let prompter = Arc::new(prompter);
        let azure = Arc::new(azure);
        let refresher = Arc::new(RecordingRefresher::new());

        let deps = ObjectExplorerDeps {
            tools: tools.as_service_arc(),
            credentials: credentials.clone(),
            azure: azure.clone(),
            prompter: prompter.clone(),
            refresher: refresher.clone(),
        };

        let service = Arc::new(ObjectExplorerService::new(deps, &config));
        let notification_loop = tokio::spawn(service.clone().run_notification_loop(notifications));

        Self {
            service,
            tools,
            credentials,
            prompter,
            azure,
            refresher,
            notification_loop,
        }
    }
}

impl Drop for ExplorerHarness {
    fn drop(&mut self) {
        self.notification_loop.abort();
    }
}
