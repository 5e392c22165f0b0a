//! Persisted configuration.
//!
//! Holds the login credentials, the default output directory, endpoint
//! overrides and the most recent session cookie. Stored as JSON at
//! `~/.config/edms-export/config.json` unless another path is given.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::client::{Endpoints, REQUEST_TIMEOUT_SECS};
use crate::auth::SessionToken;
use crate::export::TokenStore;

/// Application name used for the config directory path
const APP_NAME: &str = "edms-export";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Directory that relative output file names are placed in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Production endpoints with any overrides from the file applied
    pub fn endpoints(&self) -> Endpoints {
        let mut endpoints = Endpoints::default();
        if let Some(ref url) = self.auth_url {
            endpoints.auth_url = url.clone();
        }
        if let Some(ref url) = self.export_base_url {
            endpoints.export_base_url = url.clone();
        }
        endpoints
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(REQUEST_TIMEOUT_SECS),
        )
    }

    /// Place a relative output file under `output_dir` when one is configured
    pub fn resolve_output(&self, file: &Path) -> PathBuf {
        match self.output_dir {
            Some(ref dir) if file.is_relative() => dir.join(file),
            _ => file.to_path_buf(),
        }
    }
}

/// A `Config` together with the file it was read from.
pub struct ConfigFile {
    path: PathBuf,
    pub config: Config,
}

impl ConfigFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = Config::load_from(&path)?;
        Ok(Self { path, config })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Config::default_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        self.config.save_to(&self.path)
    }
}

impl TokenStore for ConfigFile {
    fn store_token(&mut self, token: &SessionToken) -> Result<()> {
        self.config.session = Some(token.clone());
        self.save()?;
        debug!(path = %self.path.display(), "Saved refreshed session cookie");
        Ok(())
    }
}
