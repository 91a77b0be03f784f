use crate::ExplorerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// AAD error codes after which an account token refresh is worth one retry.
///
/// These come from the identity provider and change between versions, so they
/// are configuration rather than logic.
pub const DEFAULT_ACCOUNT_REFRESH_MARKERS: &[&str] = &[
    "AADSTS70043",
    "AADSTS50173",
    "AADSTS50020",
    "AADSTS50078",
    "AADSTS50076",
    "AADSTS700082",
    "AADSTS70008",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub tools_service: ToolsServiceConfig,

    #[serde(default)]
    pub object_explorer: ObjectExplorerSettings,

    #[serde(default = "default_refresh_markers")]
    pub account_refresh_markers: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tools_service: ToolsServiceConfig::default(),
            object_explorer: ObjectExplorerSettings::default(),
            account_refresh_markers: default_refresh_markers(),
        }
    }
}

fn default_refresh_markers() -> Vec<String> {
    DEFAULT_ACCOUNT_REFRESH_MARKERS
        .iter()
        .map(|m| m.to_string())
        .collect()
}

/// How to launch the out-of-process tools service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsServiceConfig {
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default)]
    pub startup_timeout_ms: Option<u64>,
}

impl ToolsServiceConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms.unwrap_or(10_000))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectExplorerSettings {
    #[serde(default = "default_timeout_ms")]
    pub session_timeout_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub expand_timeout_ms: u64,

    /// Retries of session creation after a recoverable failure.
    #[serde(default = "default_max_retries")]
    pub max_session_retries: u32,
}

fn default_timeout_ms() -> u64 {
    45_000
}

fn default_max_retries() -> u32 {
    1
}

impl Default for ObjectExplorerSettings {
    fn default() -> Self {
        Self {
            session_timeout_ms: default_timeout_ms(),
            expand_timeout_ms: default_timeout_ms(),
            max_session_retries: default_max_retries(),
        }
    }
}

impl ObjectExplorerSettings {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn expand_timeout(&self) -> Duration {
        Duration::from_millis(self.expand_timeout_ms)
    }
}

pub struct AppConfigStore {
    path: PathBuf,
}

impl AppConfigStore {
    pub fn new() -> Result<Self, ExplorerError> {
        Ok(Self {
            path: crate::store::app_config_dir()?.join("config.json"),
        })
    }

    pub fn from_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<AppConfig, ExplorerError> {
        if !self.path.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| ExplorerError::InvalidConfig(e.to_string()))?;

        if config.object_explorer.max_session_retries > 3 {
            return Err(ExplorerError::InvalidConfig(format!(
                "max_session_retries must be at most 3, got {}",
                config.object_explorer.max_session_retries
            )));
        }

        Ok(config)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
