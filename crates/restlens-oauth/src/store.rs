//! Per-server credential persistence.
//!
//! Credentials live in a single JSON document:
//!
//! ```json
//! {
//!   "servers": {
//!     "https://restlens.com": {
//!       "accessToken": "...",
//!       "refreshToken": "...",
//!       "expiresAt": 1735689600000
//!     }
//!   }
//! }
//! ```
//!
//! Earlier releases stored a single server at the top level
//! (`{server, accessToken, refreshToken, expiresAt}`). That shape is still
//! read and mapped into `servers`; it is only replaced on the next save.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, Result};

/// Directory name under the user's home directory.
pub const CONFIG_DIR_NAME: &str = ".restlens";

/// Credential file name within the config directory.
pub const AUTH_FILE: &str = "auth.json";

/// Credentials for one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAuth {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

/// Root of the persisted credential document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub servers: BTreeMap<String, ServerAuth>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyConfig {
    server: String,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredConfig {
    Current(AuthConfig),
    Legacy(LegacyConfig),
}

impl From<LegacyConfig> for AuthConfig {
    fn from(legacy: LegacyConfig) -> Self {
        let mut servers = BTreeMap::new();
        if let Some(access_token) = legacy.access_token {
            servers.insert(
                legacy.server,
                ServerAuth {
                    access_token,
                    refresh_token: legacy.refresh_token,
                    expires_at: legacy.expires_at,
                },
            );
        }
        Self { servers }
    }
}

/// Get the default config directory (`~/.restlens`).
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME))
}

/// File-backed credential store keyed by exact server URL.
///
/// Every operation re-reads the file; there is no in-process cache and no
/// cross-process lock, so concurrent invocations resolve as last write wins.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Create a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the credential file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(AUTH_FILE)
    }

    /// Load all credentials. Never fails: unreadable or corrupt files yield an
    /// empty store so that a broken file never blocks re-authentication.
    pub fn load(&self) -> AuthConfig {
        let path = self.path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return AuthConfig::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read credentials");
                return AuthConfig::default();
            }
        };

        match serde_json::from_str::<StoredConfig>(&content) {
            Ok(StoredConfig::Current(config)) => config,
            Ok(StoredConfig::Legacy(legacy)) => {
                tracing::debug!(server = %legacy.server, "Read legacy single-server credentials");
                legacy.into()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unparseable credentials");
                AuthConfig::default()
            }
        }
    }

    /// Credentials for a single server, if any.
    pub fn get(&self, server: &str) -> Option<ServerAuth> {
        self.load().servers.remove(server)
    }

    /// Persist the full document, replacing the file atomically.
    pub fn save(&self, config: &AuthConfig) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            OAuthError::Storage(format!(
                "Failed to create {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let json = serde_json::to_string_pretty(config)
            .map_err(|e| OAuthError::Serialization(format!("Failed to serialize credentials: {}", e)))?;

        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| OAuthError::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&tmp, perms).map_err(|e| {
                OAuthError::Storage(format!("Failed to restrict {}: {}", tmp.display(), e))
            })?;
        }

        std::fs::rename(&tmp, &path)
            .map_err(|e| OAuthError::Storage(format!("Failed to replace {}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Insert or replace the credentials for `server`.
    pub fn upsert_server(&self, server: &str, auth: ServerAuth) -> Result<()> {
        let mut config = self.load();
        config.servers.insert(server.to_string(), auth);
        self.save(&config)?;
        tracing::info!(server = %server, "Credentials saved");
        Ok(())
    }

    /// Remove the credentials for `server`. Returns whether an entry existed.
    pub fn remove_server(&self, server: &str) -> Result<bool> {
        let mut config = self.load();
        let existed = config.servers.remove(server).is_some();
        if existed {
            self.save(&config)?;
        }
        Ok(existed)
    }

    /// Delete the credential file entirely.
    pub fn clear_all(&self) -> Result<()> {
        match std::fs::remove_file(self.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OAuthError::Storage(format!(
                "Failed to delete {}: {}",
                self.path().display(),
                e
            ))),
        }
    }
}
