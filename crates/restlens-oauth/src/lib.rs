//! Authentication for the REST Lens CLI.
//!
//! # Components
//!
//! - [`oauth`]: PKCE primitives, authorization URL, token exchange and refresh
//! - [`callback`]: one-shot loopback listener capturing the browser redirect
//! - [`flow`]: the end-to-end authorization-code flow
//! - [`store`]: per-server credential persistence with legacy-format reads
//! - [`provider`]: server resolution and access tokens with automatic refresh

pub mod callback;
pub mod error;
pub mod flow;
pub mod oauth;
pub mod provider;
pub mod store;

pub use callback::{CallbackResult, CallbackServer};
pub use error::{OAuthError, Result};
pub use flow::{AuthorizationFlow, DEFAULT_CALLBACK_TIMEOUT, PendingAuthorization, validate_callback};
pub use oauth::{OAuthConfig, OAuthTokens, PkceChallenge};
pub use provider::{DEFAULT_SERVER, ResolvedToken, SERVER_ENV, TokenProvider, login_hint, resolve_server};
pub use store::{AuthConfig, CredentialStore, ServerAuth, default_config_dir};
