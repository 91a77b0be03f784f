use crate::{ConnectionProfile, ExplorerError};
use std::fs;
use std::path::PathBuf;

pub(crate) fn app_config_dir() -> Result<PathBuf, ExplorerError> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        ExplorerError::IoError(std::io::Error::other("Could not find config directory"))
    })?;

    let app_dir = config_dir.join("sqlharbor");
    fs::create_dir_all(&app_dir)?;

    Ok(app_dir)
}

pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new() -> Result<Self, ExplorerError> {
        Ok(Self {
            path: app_config_dir()?.join("profiles.json"),
        })
    }

    pub fn from_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<Vec<ConnectionProfile>, ExplorerError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let profiles: Vec<ConnectionProfile> = serde_json::from_str(&content)
            .map_err(|e| ExplorerError::InvalidProfile(e.to_string()))?;

        Ok(profiles)
    }

    pub fn save(&self, profiles: &[ConnectionProfile]) -> Result<(), ExplorerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(profiles)?;
        fs::write(&self.path, content)?;

        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
