use crate::{ConnectionProfile, ExplorerError, ProfileStore, SecretStore};
use log::{error, info, warn};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Persistence for connection profiles and their saved passwords.
pub trait CredentialStore: Send + Sync {
    fn load_profiles(&self) -> Result<Vec<ConnectionProfile>, ExplorerError>;

    /// Inserts or replaces the profile with the same id. Persists the password
    /// only when the profile asks for it.
    fn save_profile(&self, profile: &ConnectionProfile) -> Result<(), ExplorerError>;

    fn remove_profile(&self, profile: &ConnectionProfile) -> Result<bool, ExplorerError>;

    fn lookup_password(&self, profile: &ConnectionProfile) -> Option<SecretString>;
}

/// `CredentialStore` backed by the JSON profile file and the system keyring.
pub struct ProfileCredentialStore {
    store: ProfileStore,
    secrets: Box<dyn SecretStore>,
    profiles: Mutex<Vec<ConnectionProfile>>,
}

impl ProfileCredentialStore {
    pub fn new(store: ProfileStore, secrets: Box<dyn SecretStore>) -> Self {
        let profiles = store.load().unwrap_or_else(|e| {
            error!("Failed to load profiles: {:?}", e);
            Vec::new()
        });
        info!("Loaded {} profiles from disk", profiles.len());

        Self {
            store,
            secrets,
            profiles: Mutex::new(profiles),
        }
    }

    fn profiles(&self) -> MutexGuard<'_, Vec<ConnectionProfile>> {
        match self.profiles.lock() {
            Ok(guard) => guard,
            Err(poison_err) => {
                warn!("Profile list mutex poisoned, recovering...");
                poison_err.into_inner()
            }
        }
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<ConnectionProfile> {
        self.profiles().iter().find(|p| p.id == id).cloned()
    }
}

impl CredentialStore for ProfileCredentialStore {
    fn load_profiles(&self) -> Result<Vec<ConnectionProfile>, ExplorerError> {
        Ok(self.profiles().clone())
    }

    fn save_profile(&self, profile: &ConnectionProfile) -> Result<(), ExplorerError> {
        let mut profiles = self.profiles();

        match profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile.clone(),
            None => profiles.push(profile.clone()),
        }

        self.store.save(&profiles)?;
        info!("Saved {} profiles to disk", profiles.len());

        if profile.save_password
            && let Some(password) = &profile.password
            && self.secrets.is_available()
        {
            self.secrets
                .set(&profile.secret_ref(), password.expose_secret())?;
        }

        Ok(())
    }

    fn remove_profile(&self, profile: &ConnectionProfile) -> Result<bool, ExplorerError> {
        let mut profiles = self.profiles();
        let before = profiles.len();
        profiles.retain(|p| p.id != profile.id);

        if profiles.len() == before {
            return Ok(false);
        }

        self.store.save(&profiles)?;

        if let Err(e) = self.secrets.delete(&profile.secret_ref()) {
            error!("Failed to delete password: {:?}", e);
        }

        Ok(true)
    }

    fn lookup_password(&self, profile: &ConnectionProfile) -> Option<SecretString> {
        if !profile.save_password || !self.secrets.is_available() {
            return None;
        }

        match self.secrets.get(&profile.secret_ref()) {
            Ok(secret) => secret.map(SecretString::from),
            Err(e) => {
                error!("Failed to get password: {:?}", e);
                None
            }
        }
    }
}
