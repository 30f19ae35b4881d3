//! Error types for login and credential handling.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur while authenticating or resolving tokens.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// No credentials are stored for the resolved server.
    #[error("Not authenticated with {server}. {hint}")]
    NotAuthenticated { server: String, hint: String },

    /// Stored credentials expired and could not be refreshed.
    #[error("Token expired for {server}. {hint}")]
    TokenExpired { server: String, hint: String },

    /// The redirect carried a state that does not match the one we generated.
    #[error("State mismatch: the authorization response did not come from this login attempt")]
    StateMismatch,

    /// The user or the server declined the authorization request.
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Exchanging the authorization code for tokens failed.
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// The local callback listener could not be started or stopped unexpectedly.
    #[error("Callback server error: {0}")]
    CallbackServer(String),

    /// No redirect arrived before the callback timeout.
    #[error("Timed out after {0} seconds waiting for the browser to complete login")]
    CallbackTimeout(u64),

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// Token endpoint returned something we could not use.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Credential file could not be written or removed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}
