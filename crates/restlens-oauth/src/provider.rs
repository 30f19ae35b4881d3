//! Access token resolution with transparent refresh.

use crate::error::{OAuthError, Result};
use crate::oauth::{OAuthConfig, now_millis, refresh_access_token};
use crate::store::{CredentialStore, ServerAuth};

/// Server used when neither a flag nor the environment names one.
pub const DEFAULT_SERVER: &str = "https://restlens.com";

/// Environment variable selecting the default server.
pub const SERVER_ENV: &str = "RESTLENS_SERVER";

/// Refresh this long before the recorded expiry (5 minutes in milliseconds).
const REFRESH_BUFFER_MS: u64 = 5 * 60 * 1000;

/// Resolve the target server: explicit override, then `RESTLENS_SERVER`,
/// then [`DEFAULT_SERVER`].
pub fn resolve_server(server_override: Option<&str>) -> String {
    resolve_server_with(server_override, std::env::var(SERVER_ENV).ok())
}

fn resolve_server_with(server_override: Option<&str>, env_value: Option<String>) -> String {
    if let Some(server) = server_override.filter(|s| !s.is_empty()) {
        return server.to_string();
    }
    env_value
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SERVER.to_string())
}

/// The command that fixes missing or expired credentials for `server`.
pub fn login_hint(server: &str) -> String {
    if server == DEFAULT_SERVER {
        "Run: restlens auth".to_string()
    } else {
        format!("Run: restlens auth --server {}", server)
    }
}

/// Whether the token should be refreshed before use.
///
/// Entries without an expiry are never considered expiring.
pub fn is_expiring(auth: &ServerAuth, now_ms: u64) -> bool {
    match auth.expires_at {
        Some(expires_at) => now_ms > expires_at.saturating_sub(REFRESH_BUFFER_MS),
        None => false,
    }
}

/// A usable bearer token and the server it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token: String,
    pub server: String,
}

/// Resolves access tokens from the credential store, refreshing them when
/// they are about to expire.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    store: CredentialStore,
    http: reqwest::Client,
}

impl TokenProvider {
    /// Create a provider backed by `store`.
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            http: reqwest::Client::new(),
        }
    }

    /// Use a specific HTTP client for refresh calls.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// The underlying credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Resolve the server (see [`resolve_server`]) and return a valid token for it.
    pub async fn resolve_access_token(&self, server_override: Option<&str>) -> Result<ResolvedToken> {
        let server = resolve_server(server_override);
        self.token_for_server(&server).await
    }

    /// Return a valid token for exactly `server`.
    pub async fn token_for_server(&self, server: &str) -> Result<ResolvedToken> {
        let auth = self
            .store
            .get(server)
            .ok_or_else(|| OAuthError::NotAuthenticated {
                server: server.to_string(),
                hint: login_hint(server),
            })?;

        if !is_expiring(&auth, now_millis()) {
            return Ok(ResolvedToken {
                token: auth.access_token,
                server: server.to_string(),
            });
        }

        tracing::info!(server = %server, "Token expiring, refreshing");
        let refreshed = self.refresh(server, auth).await.map_err(|e| {
            tracing::warn!(server = %server, error = %e, "Token refresh failed");
            OAuthError::TokenExpired {
                server: server.to_string(),
                hint: login_hint(server),
            }
        })?;

        let token = refreshed.access_token.clone();
        self.store.upsert_server(server, refreshed)?;
        tracing::info!(server = %server, "Token refreshed successfully");

        Ok(ResolvedToken {
            token,
            server: server.to_string(),
        })
    }

    async fn refresh(&self, server: &str, current: ServerAuth) -> Result<ServerAuth> {
        let refresh_token = current
            .refresh_token
            .ok_or_else(|| OAuthError::Backend("no refresh token stored".to_string()))?;

        let config = OAuthConfig::for_server(server);
        let tokens = refresh_access_token(&self.http, &config, &refresh_token).await?;

        Ok(ServerAuth {
            expires_at: tokens.expires_at(now_millis()),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.or(Some(refresh_token)),
        })
    }
}
