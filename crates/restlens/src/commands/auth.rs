//! Auth command - browser login via OAuth PKCE.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use console::style;
use restlens_oauth::AuthorizationFlow;
use serde::Serialize;

use super::Context;

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    /// Seconds to wait for the browser to finish (0 waits indefinitely)
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Print the login URL without trying to open a browser
    #[arg(long)]
    pub no_browser: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthOutput {
    server: String,
    authenticated: bool,
    expires_at: Option<u64>,
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    let server = ctx.server();
    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));

    if !ctx.json_output {
        println!("Authenticating with {}...", server);
    }

    let pending = AuthorizationFlow::new(&server, ctx.store())
        .with_callback_timeout(timeout)
        .start()
        .await?;

    // The URL goes to stderr in JSON mode so stdout stays machine-readable.
    let url = pending.authorize_url().to_string();
    if ctx.json_output {
        eprintln!("Visit: {}", url);
    } else {
        println!();
        println!("Opening browser for authentication...");
        println!("If the browser doesn't open, visit:");
        println!("  {}", url);
        println!();
        if ctx.verbose {
            println!("Listening for the redirect on {}", pending.redirect_uri());
            println!();
        }
    }

    if !args.no_browser
        && let Err(e) = open_url(&url)
    {
        tracing::warn!(error = %e, "Could not open browser");
        if !ctx.json_output {
            println!("(Could not open browser automatically)");
        }
    }

    if !ctx.json_output {
        println!("Waiting for authentication...");
    }

    let auth = pending.complete().await?;

    if ctx.json_output {
        let output = AuthOutput {
            server,
            authenticated: true,
            expires_at: auth.expires_at,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!();
        println!("{}", style("Authentication successful!").green().bold());
        println!("Logged in to: {}", server);
    }

    Ok(())
}

/// Try to open a URL in the default browser.
fn open_url(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    let command = {
        let mut cmd = std::process::Command::new("open");
        cmd.arg(url);
        cmd
    };
    #[cfg(target_os = "linux")]
    let command = {
        let mut cmd = std::process::Command::new("xdg-open");
        cmd.arg(url);
        cmd
    };
    #[cfg(target_os = "windows")]
    let command = {
        let mut cmd = std::process::Command::new("cmd");
        cmd.args(["/C", "start", url]);
        cmd
    };
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        let _ = url;
        return Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "no browser launcher for this platform",
        ));
    }

    #[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
    run_launcher(command)
}

/// Run a browser launcher; a non-zero exit counts as failure.
fn run_launcher(mut command: std::process::Command) -> std::io::Result<()> {
    let status = command
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!(
            "{:?} exited with {}",
            command.get_program(),
            status
        )))
    }
}
