use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Token file name in the data directory
const TOKENS_FILE: &str = "tokens.json";

/// Keyring service name
const SERVICE_NAME: &str = "tecnoproducts";

const ACCESS_KEY: &str = "accessToken";
const REFRESH_KEY: &str = "refreshToken";

/// Access and refresh tokens issued by `POST /token/`. Both are opaque.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CredentialPair {
    #[serde(rename = "accessToken")]
    pub access: String,
    #[serde(rename = "refreshToken")]
    pub refresh: String,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// Same refresh token, new access token
    pub fn with_access(&self, access: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: self.refresh.clone(),
        }
    }
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access token file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse token file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Durable storage for the credential pair.
///
/// A stored pair whose access half is empty reads back as absent.
pub trait CredentialStore: Send + Sync {
    fn write(&self, pair: &CredentialPair) -> Result<(), StoreError>;
    fn read(&self) -> Result<Option<CredentialPair>, StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

fn non_empty(pair: CredentialPair) -> Option<CredentialPair> {
    if pair.access.is_empty() {
        None
    } else {
        Some(pair)
    }
}

// ============================================================================
// File
// ============================================================================

/// Tokens kept as JSON in a per-origin data directory.
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENS_FILE)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl CredentialStore for FileCredentialStore {
    fn write(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path();
        let contents = serde_json::to_string_pretty(pair)?;
        std::fs::write(&path, contents)?;
        restrict_permissions(&path)?;
        debug!(path = %path.display(), "Tokens written");
        Ok(())
    }

    fn read(&self) -> Result<Option<CredentialPair>, StoreError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let pair: CredentialPair = serde_json::from_str(&contents)?;
        Ok(non_empty(pair))
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Keyring
// ============================================================================

/// Tokens kept in the OS keychain, one entry per token, namespaced by origin.
pub struct KeyringCredentialStore {
    origin: String,
}

impl KeyringCredentialStore {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
        }
    }

    /// Whether a native keystore is compiled in for this target. Elsewhere
    /// keyring falls back to a mock that keeps nothing between entries.
    pub const fn is_supported() -> bool {
        cfg!(any(target_os = "linux", target_os = "macos", target_os = "windows"))
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Ok(Entry::new(SERVICE_NAME, &format!("{}:{}", self.origin, key))?)
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn write(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        self.entry(ACCESS_KEY)?.set_password(&pair.access)?;
        self.entry(REFRESH_KEY)?.set_password(&pair.refresh)?;
        Ok(())
    }

    fn read(&self) -> Result<Option<CredentialPair>, StoreError> {
        let Some(access) = self.get(ACCESS_KEY)? else {
            return Ok(None);
        };
        let refresh = self.get(REFRESH_KEY)?.unwrap_or_default();
        Ok(non_empty(CredentialPair::new(access, refresh)))
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.remove(ACCESS_KEY)?;
        self.remove(REFRESH_KEY)
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryCredentialStore {
    pair: Mutex<Option<CredentialPair>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn write(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        *self.pair.lock().unwrap_or_else(PoisonError::into_inner) = Some(pair.clone());
        Ok(())
    }

    fn read(&self) -> Result<Option<CredentialPair>, StoreError> {
        let guard = self.pair.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone().and_then(non_empty))
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.pair.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
