//! Status command - shows stored credentials per server.

use anyhow::Result;
use chrono::{Local, TimeZone};
use clap::Args;
use console::{Style, style};
use restlens_oauth::ServerAuth;
use serde::Serialize;

use super::Context;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {}

/// One stored server for JSON output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerStatus<'a> {
    server: &'a str,
    expires_at: Option<u64>,
    expired: bool,
    refreshable: bool,
}

/// Run the status command.
pub async fn run(_args: StatusArgs, ctx: &Context) -> Result<()> {
    let config = ctx.store().load();
    let now = restlens_oauth::oauth::now_millis();

    if ctx.json_output {
        let servers: Vec<_> = config
            .servers
            .iter()
            .map(|(server, auth)| ServerStatus {
                server,
                expires_at: auth.expires_at,
                expired: auth.expires_at.is_some_and(|at| at <= now),
                refreshable: auth.refresh_token.is_some(),
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "servers": servers }))?
        );
        return Ok(());
    }

    if config.servers.is_empty() {
        println!(
            "Not authenticated. {}",
            restlens_oauth::login_hint(&ctx.server())
        );
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{}", style("Authentication Status").bold());
    println!("{}", dim.apply_to("─".repeat(40)));

    for (server, auth) in &config.servers {
        println!("Authenticated to: {}", server);
        println!("  {} {}", dim.apply_to("Token expires:"), describe_expiry(auth, now));
    }

    Ok(())
}

fn describe_expiry(auth: &ServerAuth, now_ms: u64) -> String {
    let Some(expires_at) = auth.expires_at else {
        return "no expiry".to_string();
    };

    let when = i64::try_from(expires_at)
        .ok()
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| expires_at.to_string());

    if expires_at <= now_ms {
        if auth.refresh_token.is_some() {
            format!("{} (expired, will refresh on next use)", when)
        } else {
            format!("{} (expired)", when)
        }
    } else {
        when
    }
}
