use async_trait::async_trait;
use secrecy::SecretString;
use sqlharbor_core::{
    AzureAccount, AzureIdentity, AzureToken, ConnectionPrompter, ConnectionProfile,
    CredentialStore, ExplorerError, NodeId, TreeRefresher,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

use crate::fake_tools::mutex_lock;

/// Credential store kept entirely in memory.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    profiles: Mutex<Vec<ConnectionProfile>>,
    passwords: Mutex<HashMap<Uuid, String>>,
    removed: Mutex<Vec<Uuid>>,
}

impl InMemoryCredentialStore {
    pub fn new(profiles: Vec<ConnectionProfile>) -> Self {
        Self {
            profiles: Mutex::new(profiles),
            ..Self::default()
        }
    }

    pub fn with_password(self, profile_id: Uuid, password: impl Into<String>) -> Self {
        mutex_lock(&self.passwords).insert(profile_id, password.into());
        self
    }

    pub fn profiles(&self) -> Vec<ConnectionProfile> {
        mutex_lock(&self.profiles).clone()
    }

    pub fn removed(&self) -> Vec<Uuid> {
        mutex_lock(&self.removed).clone()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load_profiles(&self) -> Result<Vec<ConnectionProfile>, ExplorerError> {
        Ok(self.profiles())
    }

    fn save_profile(&self, profile: &ConnectionProfile) -> Result<(), ExplorerError> {
        let mut profiles = mutex_lock(&self.profiles);
        match profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile.clone(),
            None => profiles.push(profile.clone()),
        }
        Ok(())
    }

    fn remove_profile(&self, profile: &ConnectionProfile) -> Result<bool, ExplorerError> {
        let mut profiles = mutex_lock(&self.profiles);
        let before = profiles.len();
        profiles.retain(|p| p.id != profile.id);
        mutex_lock(&self.removed).push(profile.id);
        Ok(profiles.len() != before)
    }

    fn lookup_password(&self, profile: &ConnectionProfile) -> Option<SecretString> {
        mutex_lock(&self.passwords)
            .get(&profile.id)
            .map(|p| SecretString::from(p.as_str()))
    }
}

/// Scripted answers for every prompt, plus a record of shown errors.
#[derive(Default)]
pub struct FakePrompter {
    new_connection: Mutex<Option<ConnectionProfile>>,
    password: Mutex<Option<String>>,
    confirm_remove: Mutex<bool>,
    trust_certificate: Mutex<bool>,
    firewall_rule_added: Mutex<bool>,
    account_refresh: Mutex<bool>,
    errors: Mutex<Vec<String>>,
    password_prompts: Mutex<usize>,
    ssl_prompts: Mutex<usize>,
    firewall_prompts: Mutex<Vec<i64>>,
}

impl FakePrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_new_connection(self, profile: ConnectionProfile) -> Self {
        *mutex_lock(&self.new_connection) = Some(profile);
        self
    }

    pub fn with_password(self, password: impl Into<String>) -> Self {
        *mutex_lock(&self.password) = Some(password.into());
        self
    }

    pub fn confirming_removal(self) -> Self {
        *mutex_lock(&self.confirm_remove) = true;
        self
    }

    /// Answers SSL remediation prompts by trusting the server certificate.
    pub fn trusting_certificates(self) -> Self {
        *mutex_lock(&self.trust_certificate) = true;
        self
    }

    pub fn adding_firewall_rules(self) -> Self {
        *mutex_lock(&self.firewall_rule_added) = true;
        self
    }

    pub fn accepting_account_refresh(self) -> Self {
        *mutex_lock(&self.account_refresh) = true;
        self
    }

    pub fn errors(&self) -> Vec<String> {
        mutex_lock(&self.errors).clone()
    }

    pub fn password_prompts(&self) -> usize {
        *mutex_lock(&self.password_prompts)
    }

    pub fn ssl_prompts(&self) -> usize {
        *mutex_lock(&self.ssl_prompts)
    }

    pub fn firewall_prompts(&self) -> Vec<i64> {
        mutex_lock(&self.firewall_prompts).clone()
    }
}

#[async_trait]
impl ConnectionPrompter for FakePrompter {
    async fn prompt_for_connection(&self) -> Option<ConnectionProfile> {
        mutex_lock(&self.new_connection).clone()
    }

    async fn prompt_for_password(&self, _profile: &ConnectionProfile) -> Option<SecretString> {
        *mutex_lock(&self.password_prompts) += 1;
        mutex_lock(&self.password)
            .as_deref()
            .map(SecretString::from)
    }

    async fn confirm_remove(&self, _label: &str) -> bool {
        *mutex_lock(&self.confirm_remove)
    }

    async fn prompt_ssl_remediation(
        &self,
        profile: &ConnectionProfile,
        _error_message: &str,
    ) -> Option<ConnectionProfile> {
        *mutex_lock(&self.ssl_prompts) += 1;

        if !*mutex_lock(&self.trust_certificate) {
            return None;
        }

        let mut remediated = profile.clone();
        remediated.trust_server_certificate = true;
        Some(remediated)
    }

    async fn handle_firewall_rule(
        &self,
        _profile: &ConnectionProfile,
        error_number: i64,
        _error_message: &str,
    ) -> bool {
        mutex_lock(&self.firewall_prompts).push(error_number);
        *mutex_lock(&self.firewall_rule_added)
    }

    async fn prompt_account_refresh(&self, _profile: &ConnectionProfile) -> bool {
        *mutex_lock(&self.account_refresh)
    }

    async fn show_error(&self, message: &str) {
        mutex_lock(&self.errors).push(message.to_string());
    }
}

/// Identity provider with a fixed account list and scripted refreshes.
#[derive(Default)]
pub struct FakeAzureIdentity {
    accounts: Mutex<Vec<AzureAccount>>,
    cached: Mutex<bool>,
    refresh_failures: Mutex<VecDeque<String>>,
    refresh_calls: Mutex<usize>,
}

impl FakeAzureIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cached_account(self, id: impl Into<String>) -> Self {
        let id = id.into();
        mutex_lock(&self.accounts).push(AzureAccount {
            display_name: id.clone(),
            id,
            tenant_id: None,
        });
        *mutex_lock(&self.cached) = true;
        self
    }

    /// The next refresh fails with `message`.
    pub fn failing_next_refresh(self, message: impl Into<String>) -> Self {
        mutex_lock(&self.refresh_failures).push_back(message.into());
        self
    }

    pub fn refresh_calls(&self) -> usize {
        *mutex_lock(&self.refresh_calls)
    }
}

#[async_trait]
impl AzureIdentity for FakeAzureIdentity {
    async fn find_account(&self, account_id: &str) -> Option<AzureAccount> {
        mutex_lock(&self.accounts)
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
    }

    async fn is_account_cached(&self, _account: &AzureAccount) -> bool {
        *mutex_lock(&self.cached)
    }

    async fn refresh_token(
        &self,
        _account: &AzureAccount,
        _tenant_id: Option<&str>,
    ) -> Result<AzureToken, ExplorerError> {
        *mutex_lock(&self.refresh_calls) += 1;

        if let Some(message) = mutex_lock(&self.refresh_failures).pop_front() {
            return Err(ExplorerError::Credential(message));
        }

        Ok(AzureToken {
            token: SecretString::from("fresh-token"),
            expires_on: i64::MAX / 2,
        })
    }
}

/// Records every repaint request.
#[derive(Default)]
pub struct RecordingRefresher {
    calls: Mutex<Vec<Option<NodeId>>>,
}

impl RecordingRefresher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Option<NodeId>> {
        mutex_lock(&self.calls).clone()
    }

    pub fn count(&self) -> usize {
        mutex_lock(&self.calls).len()
    }
}

impl TreeRefresher for RecordingRefresher {
    fn refresh(&self, node: Option<&NodeId>) {
        mutex_lock(&self.calls).push(node.cloned());
    }
}
