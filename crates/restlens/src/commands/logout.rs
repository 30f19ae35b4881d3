//! Logout command - remove stored credentials.

use anyhow::Result;
use clap::Args;

use super::Context;

/// Arguments for the logout command.
#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Remove credentials for every server, even when --server is given
    #[arg(long)]
    pub all: bool,
}

/// Run the logout command.
///
/// With `--server` only that server's entry is removed; otherwise the whole
/// credential file is deleted.
pub async fn run(args: LogoutArgs, ctx: &Context) -> Result<()> {
    let store = ctx.store();

    match ctx.server_override.as_deref() {
        Some(server) if !args.all => {
            let removed = store.remove_server(server)?;
            if ctx.json_output {
                println!("{}", serde_json::json!({ "server": server, "removed": removed }));
            } else if removed {
                println!("Logged out of {}.", server);
            } else {
                println!("No credentials stored for {}.", server);
            }
        }
        _ => {
            store.clear_all()?;
            if ctx.json_output {
                println!("{}", serde_json::json!({ "removed": "all" }));
            } else {
                println!("Logged out successfully.");
            }
        }
    }

    Ok(())
}
