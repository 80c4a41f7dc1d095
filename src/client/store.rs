use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HOME environment variable not set")]
    NoHome,
}

/// The two opaque credentials, held together under fixed keys. An absent
/// access token means the unauthenticated state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

/// File-backed credential storage for the CLI, one JSON document in the user
/// config directory.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at `$POCKETLEDGER_CONFIG_DIR/credentials.json`, defaulting to
    /// `~/.config/pocketledger/cli/credentials.json`.
    pub fn open_default() -> Result<Self, StoreError> {
        let config_dir = if let Ok(custom_dir) = std::env::var("POCKETLEDGER_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            let home = std::env::var("HOME").map_err(|_| StoreError::NoHome)?;
            PathBuf::from(home)
                .join(".config")
                .join("pocketledger")
                .join("cli")
        };

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        Ok(Self {
            path: config_dir.join("credentials.json"),
        })
    }

    /// Store backed by an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn credentials(&self) -> Result<StoredCredentials, StoreError> {
        if !self.path.exists() {
            return Ok(StoredCredentials::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let credentials: StoredCredentials = serde_json::from_str(&content)?;
        Ok(credentials)
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.credentials()?.access)
    }

    pub fn is_authenticated(&self) -> Result<bool, StoreError> {
        Ok(self.credentials()?.access.is_some())
    }

    /// Persist both credentials, as returned by a login exchange.
    pub fn save(&self, access: &str, refresh: &str) -> Result<(), StoreError> {
        self.write(&StoredCredentials {
            access: Some(access.to_string()),
            refresh: Some(refresh.to_string()),
        })
    }

    /// Replace only the access token, keeping the refresh token, as returned
    /// by a refresh exchange.
    pub fn save_access(&self, access: &str) -> Result<(), StoreError> {
        let mut credentials = self.credentials()?;
        credentials.access = Some(access.to_string());
        self.write(&credentials)
    }

    /// Both credentials are cleared together, on logout or irrecoverable
    /// refresh failure.
    pub fn clear(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn write(&self, credentials: &StoredCredentials) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(credentials)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
