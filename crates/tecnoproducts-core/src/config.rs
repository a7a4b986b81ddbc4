//! Application configuration management.
//!
//! Configuration lives at `~/.config/tecnoproducts/config.json` and holds the
//! backend URL, request timeout, where tokens are kept, and the last username.
//! `TECNOPRODUCTS_API_URL` and `TECNOPRODUCTS_CREDENTIAL_BACKEND` override the
//! file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::api::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::auth::{CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "tecnoproducts";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const ENV_API_URL: &str = "TECNOPRODUCTS_API_URL";
const ENV_CREDENTIAL_BACKEND: &str = "TECNOPRODUCTS_CREDENTIAL_BACKEND";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl FromStr for CredentialBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(CredentialBackend::File),
            "keyring" => Ok(CredentialBackend::Keyring),
            "memory" => Ok(CredentialBackend::Memory),
            other => Err(anyhow::anyhow!("Unknown credential backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub credential_backend: CredentialBackend,
    /// Renew the access token once and retry when a request comes back 401
    pub auto_refresh: bool,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            credential_backend: CredentialBackend::default(),
            auto_refresh: false,
            last_username: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        if let Ok(backend) = std::env::var(ENV_CREDENTIAL_BACKEND) {
            self.credential_backend = backend.parse()?;
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `host_port` of the API origin; stored tokens are namespaced by it.
    pub fn origin_key(&self) -> Result<String> {
        let url = Url::parse(&self.api_base_url)
            .with_context(|| format!("Invalid API URL: {}", self.api_base_url))?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("API URL has no host: {}", self.api_base_url))?;
        let port = url.port_or_known_default().unwrap_or(0);
        let key: String = format!("{}_{}", host, port)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' { c } else { '-' })
            .collect();
        Ok(key)
    }

    /// Per-origin directory for persisted tokens and logs
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(self.origin_key()?))
    }

    /// Open the configured credential backend
    pub fn open_credential_store(&self) -> Result<Arc<dyn CredentialStore>> {
        let store: Arc<dyn CredentialStore> = match self.credential_backend {
            CredentialBackend::File => Arc::new(FileCredentialStore::new(self.data_dir()?)),
            CredentialBackend::Keyring => {
                if !KeyringCredentialStore::is_supported() {
                    anyhow::bail!("The keyring backend is not available on this platform");
                }
                Arc::new(KeyringCredentialStore::new(self.origin_key()?))
            }
            CredentialBackend::Memory => Arc::new(MemoryCredentialStore::new()),
        };
        Ok(store)
    }
}
