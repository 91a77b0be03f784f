use chrono::Utc;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seconds before token expiry at which an Azure token is treated as stale.
const TOKEN_EXPIRY_BUFFER_SECS: i64 = 120;

/// How a profile authenticates against SQL Server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AuthenticationType {
    /// SQL login with user name and password.
    #[default]
    SqlLogin,

    /// Windows / Kerberos integrated security. No password, no token.
    Integrated,

    /// Microsoft Entra ID interactive (MFA) with an account token.
    AzureMfa,
}

impl AuthenticationType {
    pub fn display_name(&self) -> &'static str {
        match self {
            AuthenticationType::SqlLogin => "SQL Login",
            AuthenticationType::Integrated => "Windows Authentication",
            AuthenticationType::AzureMfa => "Microsoft Entra ID - Universal with MFA",
        }
    }

    /// Wire name understood by the tools service.
    pub fn wire_name(&self) -> &'static str {
        match self {
            AuthenticationType::SqlLogin => "SqlLogin",
            AuthenticationType::Integrated => "Integrated",
            AuthenticationType::AzureMfa => "AzureMFA",
        }
    }
}

/// The fields that decide whether two profiles point at the same target.
///
/// At most one root connection node exists per identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfileIdentity {
    pub server: String,
    pub database: Option<String>,
    pub authentication_type: AuthenticationType,
    pub container_name: Option<String>,
}

/// Saved connection profile.
///
/// Persisted to disk as JSON. Passwords and account tokens are never
/// serialized: passwords live in the system keyring (when `save_password`
/// is set) and tokens are fetched from the identity provider on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    pub id: Uuid,

    /// User-defined name shown in the tree. Falls back to a server label.
    #[serde(default)]
    pub profile_name: Option<String>,

    pub server: String,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub authentication_type: AuthenticationType,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(skip)]
    pub password: Option<SecretString>,

    #[serde(default)]
    pub save_password: bool,

    /// Set when the server runs in a local Docker container.
    #[serde(default)]
    pub container_name: Option<String>,

    #[serde(default)]
    pub account_id: Option<String>,

    #[serde(default)]
    pub tenant_id: Option<String>,

    #[serde(skip)]
    pub azure_account_token: Option<SecretString>,

    /// Unix timestamp (seconds) at which `azure_account_token` expires.
    #[serde(default)]
    pub expires_on: Option<i64>,

    #[serde(default = "default_encrypt")]
    pub encrypt: bool,

    #[serde(default)]
    pub trust_server_certificate: bool,

    #[serde(default)]
    pub group_id: Option<String>,
}

fn default_encrypt() -> bool {
    true
}

impl ConnectionProfile {
    pub fn new(server: impl Into<String>, authentication_type: AuthenticationType) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile_name: None,
            server: server.into(),
            database: None,
            authentication_type,
            user: None,
            password: None,
            save_password: false,
            container_name: None,
            account_id: None,
            tenant_id: None,
            azure_account_token: None,
            expires_on: None,
            encrypt: true,
            trust_server_certificate: false,
            group_id: None,
        }
    }

    pub fn sql_login(
        server: impl Into<String>,
        user: impl Into<String>,
        database: Option<String>,
    ) -> Self {
        let mut profile = Self::new(server, AuthenticationType::SqlLogin);
        profile.user = Some(user.into());
        profile.database = database;
        profile
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.profile_name = Some(name.into());
        self
    }

    pub fn identity(&self) -> ProfileIdentity {
        ProfileIdentity {
            server: self.server.clone(),
            database: self.database.clone().filter(|db| !db.is_empty()),
            authentication_type: self.authentication_type,
            container_name: self.container_name.clone(),
        }
    }

    pub fn same_target(&self, other: &ConnectionProfile) -> bool {
        self.identity() == other.identity()
    }

    /// Label shown on the root connection node.
    pub fn display_label(&self) -> String {
        if let Some(name) = self.profile_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }

        let mut label = self.server.clone();

        if let Some(database) = self.database.as_deref().filter(|db| !db.is_empty()) {
            label.push_str(", ");
            label.push_str(database);
        }

        match self.authentication_type {
            AuthenticationType::SqlLogin => {
                if let Some(user) = self.user.as_deref().filter(|u| !u.is_empty()) {
                    label.push_str(&format!(" ({user})"));
                }
            }
            AuthenticationType::AzureMfa => {
                if let Some(account) = self.account_id.as_deref() {
                    label.push_str(&format!(" ({account})"));
                }
            }
            AuthenticationType::Integrated => {}
        }

        label
    }

    /// True when the profile targets a specific database other than `master`.
    pub fn targets_database(&self) -> bool {
        self.database
            .as_deref()
            .is_some_and(|db| !db.is_empty() && !db.eq_ignore_ascii_case("master"))
    }

    pub fn is_containerized(&self) -> bool {
        self.container_name.as_deref().is_some_and(|c| !c.is_empty())
    }

    pub fn needs_password(&self) -> bool {
        self.authentication_type == AuthenticationType::SqlLogin && self.password.is_none()
    }

    /// True when the Azure token is missing or within the expiry buffer.
    pub fn azure_token_expired(&self) -> bool {
        if self.azure_account_token.is_none() {
            return true;
        }

        match self.expires_on {
            Some(expires_on) => expires_on - TOKEN_EXPIRY_BUFFER_SECS <= Utc::now().timestamp(),
            None => true,
        }
    }

    pub fn clear_azure_token(&mut self) {
        self.azure_account_token = None;
        self.expires_on = None;
    }

    pub fn secret_ref(&self) -> String {
        crate::secrets::connection_secret_ref(&self.id)
    }
}
