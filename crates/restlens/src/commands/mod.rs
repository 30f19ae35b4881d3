//! CLI command handlers.

pub mod auth;
pub mod eval;
pub mod logout;
pub mod projects;
pub mod status;
pub mod upload;
pub mod violations;

use std::path::PathBuf;

use anyhow::Result;
use restlens_client::RestLensClient;
use restlens_oauth::{CredentialStore, TokenProvider};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Server given with `--server`, if any.
    pub server_override: Option<String>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Per-user configuration directory holding credentials and logs.
    pub config_dir: PathBuf,
}

/// An API client bound to the server its token was resolved for.
pub struct Session {
    pub client: RestLensClient,
    pub server: String,
}

impl Context {
    pub fn store(&self) -> CredentialStore {
        CredentialStore::new(&self.config_dir)
    }

    /// The server commands talk to.
    pub fn server(&self) -> String {
        restlens_oauth::resolve_server(self.server_override.as_deref())
    }

    /// Resolve a token (refreshing it if needed) and build a client.
    pub async fn session(&self) -> Result<Session> {
        let resolved = TokenProvider::new(self.store())
            .resolve_access_token(self.server_override.as_deref())
            .await?;

        tracing::debug!(server = %resolved.server, "Using stored credentials");

        let client = RestLensClient::builder()
            .base_url(&resolved.server)
            .auth_token(resolved.token)
            .build()?;

        Ok(Session {
            client,
            server: resolved.server,
        })
    }
}
