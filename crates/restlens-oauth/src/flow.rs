//! The browser-based PKCE authorization-code flow.
//!
//! ```text
//! Idle -> ListenerBound -> BrowserOpened -> AwaitingCallback
//!      -> (CallbackReceived | TimedOut) -> ExchangingToken -> (Authenticated | Failed)
//! ```
//!
//! [`AuthorizationFlow::start`] binds the loopback listener and builds the
//! authorization URL. The caller shows or opens that URL, then drives the rest
//! with [`PendingAuthorization::complete`]. Credentials are written only after
//! a successful token exchange.

use std::time::Duration;

use crate::callback::{CallbackResult, CallbackServer};
use crate::error::{OAuthError, Result};
use crate::oauth::{
    OAuthConfig, PkceChallenge, build_authorization_url, exchange_code_for_tokens,
    generate_state, now_millis,
};
use crate::store::{CredentialStore, ServerAuth};

/// How long to wait for the browser redirect unless configured otherwise.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowState {
    Idle,
    ListenerBound,
    BrowserOpened,
    AwaitingCallback,
    CallbackReceived,
    TimedOut,
    ExchangingToken,
    Authenticated,
    Failed,
}

fn enter(server: &str, state: FlowState) {
    tracing::debug!(server = %server, state = ?state, "Authorization flow transition");
}

/// Configures a login against one server.
pub struct AuthorizationFlow {
    server: String,
    store: CredentialStore,
    http: reqwest::Client,
    callback_timeout: Option<Duration>,
}

impl AuthorizationFlow {
    pub fn new(server: impl Into<String>, store: CredentialStore) -> Self {
        Self {
            server: server.into(),
            store,
            http: reqwest::Client::new(),
            callback_timeout: Some(DEFAULT_CALLBACK_TIMEOUT),
        }
    }

    /// Use a specific HTTP client for the token exchange.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Set the callback wait limit; `None` waits indefinitely.
    pub fn with_callback_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.callback_timeout = timeout;
        self
    }

    /// Bind the loopback listener and prepare the authorization URL.
    pub async fn start(self) -> Result<PendingAuthorization> {
        enter(&self.server, FlowState::Idle);

        let listener = CallbackServer::bind().await?;
        enter(&self.server, FlowState::ListenerBound);

        let config = OAuthConfig::for_server(&self.server);
        let pkce = PkceChallenge::generate();
        let state = generate_state();
        let redirect_uri = listener.redirect_uri();
        let authorize_url = build_authorization_url(&config, &redirect_uri, &pkce.challenge, &state);

        Ok(PendingAuthorization {
            server: self.server,
            store: self.store,
            http: self.http,
            callback_timeout: self.callback_timeout,
            config,
            pkce,
            state,
            redirect_uri,
            authorize_url,
            listener,
        })
    }
}

/// A flow whose listener is bound and which is waiting to be completed.
///
/// Dropping it without calling [`complete`](Self::complete) tears the
/// listener down.
pub struct PendingAuthorization {
    server: String,
    store: CredentialStore,
    http: reqwest::Client,
    callback_timeout: Option<Duration>,
    config: OAuthConfig,
    pkce: PkceChallenge,
    state: String,
    redirect_uri: String,
    authorize_url: String,
    listener: CallbackServer,
}

impl PendingAuthorization {
    /// URL the user must visit.
    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Wait for the redirect, exchange the code and persist the credentials.
    pub async fn complete(self) -> Result<ServerAuth> {
        let Self {
            server,
            store,
            http,
            callback_timeout,
            config,
            pkce,
            state,
            redirect_uri,
            listener,
            ..
        } = self;

        enter(&server, FlowState::BrowserOpened);
        enter(&server, FlowState::AwaitingCallback);

        let callback = match listener.wait(callback_timeout).await {
            Ok(callback) => callback,
            Err(e) => {
                let state = match e {
                    OAuthError::CallbackTimeout(_) => FlowState::TimedOut,
                    _ => FlowState::Failed,
                };
                enter(&server, state);
                return Err(e);
            }
        };
        enter(&server, FlowState::CallbackReceived);

        let result = match validate_callback(callback, &state) {
            Ok(code) => {
                enter(&server, FlowState::ExchangingToken);
                exchange_code_for_tokens(&http, &config, &code, &redirect_uri, &pkce.verifier)
                    .await
            }
            Err(e) => Err(e),
        };

        let tokens = match result {
            Ok(tokens) => tokens,
            Err(e) => {
                enter(&server, FlowState::Failed);
                return Err(e);
            }
        };

        let auth = ServerAuth {
            expires_at: tokens.expires_at(now_millis()),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        };
        store.upsert_server(&server, auth.clone())?;
        enter(&server, FlowState::Authenticated);

        Ok(auth)
    }
}

/// Check a callback against the state we generated and extract the code.
///
/// An `error` wins over everything else; a missing or different `state` is a
/// mismatch even when a code is present.
pub fn validate_callback(result: CallbackResult, expected_state: &str) -> Result<String> {
    match result {
        CallbackResult::Denied { error, description } => {
            Err(OAuthError::AuthorizationDenied(description.unwrap_or(error)))
        }
        CallbackResult::Authorized { code, state } => {
            let state_ok = state
                .as_deref()
                .is_some_and(|received| constant_time_eq(received, expected_state));
            if !state_ok {
                return Err(OAuthError::StateMismatch);
            }
            code.ok_or_else(|| {
                OAuthError::TokenExchangeFailed("No authorization code received".to_string())
            })
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
