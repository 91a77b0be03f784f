//! Password storage outside the profile file.

use std::collections::HashMap;
use std::sync::Mutex;

use log::{info, warn};
use uuid::Uuid;

use crate::ExplorerError;

const KEYRING_SERVICE: &str = "sqlharbor";
const KEYRING_CHECK_ENTRY: &str = "__sqlharbor_check__";

/// Where saved connection passwords live.
///
/// Writes and deletes are no-ops on an unavailable store; reads find nothing.
pub trait SecretStore: Send + Sync {
    fn is_available(&self) -> bool;
    fn get(&self, secret_ref: &str) -> Result<Option<String>, ExplorerError>;
    fn set(&self, secret_ref: &str, value: &str) -> Result<(), ExplorerError>;
    fn delete(&self, secret_ref: &str) -> Result<(), ExplorerError>;
}

/// Key under which a profile's password is stored.
pub fn connection_secret_ref(profile_id: &Uuid) -> String {
    format!("sqlharbor:conn:{profile_id}")
}

/// Keyring-backed store when the platform has one, otherwise a no-op store.
pub fn create_secret_store() -> Box<dyn SecretStore> {
    let keyring = KeyringSecretStore::new();
    if keyring.is_available() {
        info!("Saved passwords use the system keyring");
        return Box::new(keyring);
    }

    warn!("System keyring unavailable; saved passwords will not persist");
    Box::new(NoopSecretStore)
}

pub struct NoopSecretStore;

impl SecretStore for NoopSecretStore {
    fn is_available(&self) -> bool {
        false
    }

    fn get(&self, _secret_ref: &str) -> Result<Option<String>, ExplorerError> {
        Ok(None)
    }

    fn set(&self, _secret_ref: &str, _value: &str) -> Result<(), ExplorerError> {
        Ok(())
    }

    fn delete(&self, _secret_ref: &str) -> Result<(), ExplorerError> {
        Ok(())
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemorySecretStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_values<R>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> R) -> R {
        let mut guard = match self.values.lock() {
            Ok(guard) => guard,
            Err(poison_err) => {
                warn!("Secret map mutex poisoned, recovering...");
                poison_err.into_inner()
            }
        };
        f(&mut guard)
    }
}

impl SecretStore for MemorySecretStore {
    fn is_available(&self) -> bool {
        true
    }

    fn get(&self, secret_ref: &str) -> Result<Option<String>, ExplorerError> {
        Ok(self.with_values(|values| values.get(secret_ref).cloned()))
    }

    fn set(&self, secret_ref: &str, value: &str) -> Result<(), ExplorerError> {
        self.with_values(|values| values.insert(secret_ref.to_string(), value.to_string()));
        Ok(())
    }

    fn delete(&self, secret_ref: &str) -> Result<(), ExplorerError> {
        self.with_values(|values| values.remove(secret_ref));
        Ok(())
    }
}

fn keyring_error(err: keyring::Error) -> ExplorerError {
    ExplorerError::Credential(err.to_string())
}

/// Platform keyring (Secret Service, Keychain, Credential Manager).
pub struct KeyringSecretStore {
    available: bool,
}

impl KeyringSecretStore {
    /// Checks the keyring once; a missing backend marks the store unavailable.
    pub fn new() -> Self {
        let available = match keyring::Entry::new(KEYRING_SERVICE, KEYRING_CHECK_ENTRY) {
            Ok(entry) => !matches!(
                entry.get_password(),
                Err(keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_))
            ),
            Err(_) => false,
        };

        Self { available }
    }

    fn entry(&self, secret_ref: &str) -> Result<Option<keyring::Entry>, ExplorerError> {
        if !self.available {
            return Ok(None);
        }

        keyring::Entry::new(KEYRING_SERVICE, secret_ref)
            .map(Some)
            .map_err(keyring_error)
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringSecretStore {
    fn is_available(&self) -> bool {
        self.available
    }

    fn get(&self, secret_ref: &str) -> Result<Option<String>, ExplorerError> {
        let Some(entry) = self.entry(secret_ref)? else {
            return Ok(None);
        };

        match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_error(e)),
        }
    }

    fn set(&self, secret_ref: &str, value: &str) -> Result<(), ExplorerError> {
        match self.entry(secret_ref)? {
            Some(entry) => entry.set_password(value).map_err(keyring_error),
            None => Ok(()),
        }
    }

    fn delete(&self, secret_ref: &str) -> Result<(), ExplorerError> {
        let Some(entry) = self.entry(secret_ref)? else {
            return Ok(());
        };

        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_refs_are_scoped_per_profile() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(connection_secret_ref(&a), format!("sqlharbor:conn:{a}"));
        assert_ne!(connection_secret_ref(&a), connection_secret_ref(&b));
    }

    #[test]
    fn memory_store_round_trips_and_forgets() {
        let store = MemorySecretStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.delete("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn noop_store_never_remembers() {
        let store = NoopSecretStore;
        store.set("k", "v").unwrap();
        assert!(!store.is_available());
        assert!(store.get("k").unwrap().is_none());
    }
}
