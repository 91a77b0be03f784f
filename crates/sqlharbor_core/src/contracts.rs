//! Request, response and notification shapes exchanged with the tools service.
//!
//! Field names follow the service's camelCase JSON.

use crate::{AuthenticationType, ConnectionProfile};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection parameters sent with `objectexplorer/createsession`.
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    pub server: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    pub authentication_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_account_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<i64>,

    pub encrypt: bool,

    pub trust_server_certificate: bool,

    pub application_name: String,
}

impl ConnectionDetails {
    pub fn from_profile(profile: &ConnectionProfile) -> Self {
        let (password, token) = match profile.authentication_type {
            AuthenticationType::SqlLogin => (
                profile
                    .password
                    .as_ref()
                    .map(|p| p.expose_secret().to_string()),
                None,
            ),
            AuthenticationType::AzureMfa => (
                None,
                profile
                    .azure_account_token
                    .as_ref()
                    .map(|t| t.expose_secret().to_string()),
            ),
            AuthenticationType::Integrated => (None, None),
        };

        Self {
            server: profile.server.clone(),
            database: profile.database.clone().filter(|db| !db.is_empty()),
            authentication_type: profile.authentication_type.wire_name().to_string(),
            user: match profile.authentication_type {
                AuthenticationType::Integrated => None,
                _ => profile.user.clone(),
            },
            password,
            azure_account_token: token,
            expires_on: profile.expires_on,
            encrypt: profile.encrypt,
            trust_server_certificate: profile.trust_server_certificate,
            application_name: "sqlharbor".to_string(),
        }
    }
}

impl fmt::Debug for ConnectionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDetails")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("authentication_type", &self.authentication_type)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field(
                "azure_account_token",
                &self.azure_account_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("encrypt", &self.encrypt)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreatedNotification {
    pub session_id: String,
    pub success: bool,

    #[serde(default)]
    pub root_node: Option<NodeInfo>,

    #[serde(default)]
    pub error_message: Option<String>,

    #[serde(default)]
    pub error_number: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandParams {
    pub session_id: String,
    pub node_path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<NodeFilter>,
}

/// Completion of an expand or refresh request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandResponse {
    pub session_id: String,
    pub node_path: String,

    #[serde(default)]
    pub nodes: Vec<NodeInfo>,

    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSessionParams {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSessionResponse {
    pub success: bool,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    #[serde(default)]
    pub metadata_type_name: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub urn: Option<String>,
}

/// A property the server allows filtering a node's children on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilterProperty {
    pub name: String,
    pub display_name: String,

    #[serde(rename = "type")]
    pub property_type: String,

    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeFilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    LessThan,
    GreaterThan,
    Between,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilter {
    pub name: String,
    pub operator: NodeFilterOperator,
    pub value: serde_json::Value,
}

/// Node description returned by the tools service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub node_path: String,
    pub node_type: String,
    pub label: String,

    #[serde(default)]
    pub node_sub_type: Option<String>,

    #[serde(default)]
    pub node_status: Option<String>,

    #[serde(default)]
    pub is_leaf: bool,

    #[serde(default)]
    pub metadata: Option<ObjectMetadata>,

    #[serde(default)]
    pub error_message: Option<String>,

    #[serde(default)]
    pub object_type: Option<String>,

    #[serde(default)]
    pub filterable_properties: Vec<NodeFilterProperty>,
}

/// Out-of-band messages pushed by the tools service.
#[derive(Debug, Clone)]
pub enum ToolsNotification {
    SessionCreated(SessionCreatedNotification),
    ExpandCompleted(ExpandResponse),
}
