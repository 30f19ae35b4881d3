//! OAuth 2.0 PKCE primitives and token endpoint calls for REST Lens.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{OAuthError, Result};

/// Public client identifier registered for the CLI.
pub const CLIENT_ID: &str = "restlens-cli";

const AUTHORIZE_PATH: &str = "/api/mcp/authorize";
const TOKEN_PATH: &str = "/api/oauth/token";
const LEGACY_TOKEN_PATH: &str = "/api/mcp/token";

/// OAuth endpoints for one REST Lens server.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub token_url: String,
    /// Older servers only expose the token endpoint under the MCP prefix.
    pub legacy_token_url: Option<String>,
}

impl OAuthConfig {
    /// Endpoints for the given server base URL.
    pub fn for_server(server: &str) -> Self {
        let base = server.trim_end_matches('/');
        Self {
            client_id: CLIENT_ID.to_string(),
            authorize_url: format!("{base}{AUTHORIZE_PATH}"),
            token_url: format!("{base}{TOKEN_PATH}"),
            legacy_token_url: Some(format!("{base}{LEGACY_TOKEN_PATH}")),
        }
    }
}

/// PKCE code verifier and challenge pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge pair from 32 random bytes.
    pub fn generate() -> Self {
        let mut verifier_bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut verifier_bytes);
        Self::from_verifier(URL_SAFE_NO_PAD.encode(verifier_bytes))
    }

    /// Build the pair for an existing verifier.
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// S256 challenge: base64url(SHA-256(verifier)).
pub fn challenge_for(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a random state string for CSRF protection.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Build the browser-facing authorization URL.
pub fn build_authorization_url(
    config: &OAuthConfig,
    redirect_uri: &str,
    challenge: &str,
    state: &str,
) -> String {
    let params = [
        ("response_type", "code"),
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("code_challenge", challenge),
        ("code_challenge_method", "S256"),
        ("state", state),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", config.authorize_url, query)
}

/// Successful token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl OAuthTokens {
    /// Absolute expiry in epoch milliseconds, relative to `now_ms`.
    pub fn expires_at(&self, now_ms: u64) -> Option<u64> {
        self.expires_in
            .map(|secs| now_ms.saturating_add(secs.saturating_mul(1000)))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    grant_type: &'static str,
    code: &'a str,
    redirect_uri: &'a str,
    client_id: &'a str,
    code_verifier: &'a str,
}

#[derive(Debug, Serialize)]
struct TokenRefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    client_id: &'a str,
}

/// Exchange an authorization code for OAuth tokens.
pub async fn exchange_code_for_tokens(
    http: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
    redirect_uri: &str,
    verifier: &str,
) -> Result<OAuthTokens> {
    let form = TokenExchangeRequest {
        grant_type: "authorization_code",
        code,
        redirect_uri,
        client_id: &config.client_id,
        code_verifier: verifier,
    };

    let response = post_token_form(http, config, &form)
        .await
        .map_err(|e| OAuthError::TokenExchangeFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(OAuthError::TokenExchangeFailed(
            describe_error(response).await,
        ));
    }

    response
        .json()
        .await
        .map_err(|e| OAuthError::TokenExchangeFailed(format!("invalid token response: {}", e)))
}

/// Refresh an access token using a refresh token.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    config: &OAuthConfig,
    refresh_token: &str,
) -> Result<OAuthTokens> {
    let form = TokenRefreshRequest {
        grant_type: "refresh_token",
        refresh_token,
        client_id: &config.client_id,
    };

    let response = post_token_form(http, config, &form).await?;

    if !response.status().is_success() {
        return Err(OAuthError::Backend(format!(
            "Token refresh failed: {}",
            describe_error(response).await
        )));
    }

    response
        .json()
        .await
        .map_err(|e| OAuthError::Backend(format!("Failed to parse refresh response: {}", e)))
}

/// POST a form to the token endpoint, falling back to the legacy path on 404.
async fn post_token_form<B: Serialize + ?Sized>(
    http: &reqwest::Client,
    config: &OAuthConfig,
    form: &B,
) -> Result<reqwest::Response> {
    let response = http.post(&config.token_url).form(form).send().await?;

    match &config.legacy_token_url {
        Some(legacy) if response.status() == reqwest::StatusCode::NOT_FOUND => {
            tracing::debug!(url = %legacy, "Token endpoint not found, using legacy path");
            Ok(http.post(legacy).form(form).send().await?)
        }
        _ => Ok(response),
    }
}

/// Best human-readable description of a failed token response.
async fn describe_error(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if let Ok(err) = serde_json::from_str::<ErrorResponse>(&body)
        && let Some(message) = err.error_description.or(err.error)
    {
        return message;
    }

    if body.trim().is_empty() {
        status.to_string()
    } else {
        body
    }
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
