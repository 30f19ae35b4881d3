//! REST Lens CLI
//!
//! Main entry point for the `restlens` command.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

mod commands;
mod output;
mod spec_file;

use commands::{auth, eval, logout, projects, status, upload, violations};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// REST Lens - evaluate OpenAPI specifications from the command line
#[derive(Parser)]
#[command(name = "restlens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// REST Lens server URL (default: $RESTLENS_SERVER or https://restlens.com)
    #[arg(long, global = true)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authenticate with REST Lens (opens browser)
    Auth(auth::AuthArgs),

    /// Upload an OpenAPI specification for evaluation
    Upload(upload::UploadArgs),

    /// Upload a spec, wait for evaluation, and show violations
    #[command(alias = "evaluate")]
    Eval(eval::EvalArgs),

    /// Show violations for the latest specification
    Violations(violations::ViolationsArgs),

    /// List accessible projects
    Projects(projects::ProjectsArgs),

    /// Show stored credentials
    Status(status::StatusArgs),

    /// Clear stored credentials
    Logout(logout::LogoutArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir =
        restlens_oauth::default_config_dir().context("Could not determine home directory")?;

    // Console (human-readable, stderr) + daily JSON file
    let filter = if cli.verbose {
        "restlens=debug,restlens_oauth=debug,restlens_client=debug,info"
    } else {
        "restlens=info,restlens_oauth=info,restlens_client=info,warn"
    };
    let console_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let file_appender = tracing_appender::rolling::daily(config_dir.join("logs"), "restlens.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(cli.verbose)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "restlens=debug,restlens_oauth=debug,restlens_client=debug,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        server_override: cli.server,
        json_output: cli.json,
        verbose: cli.verbose,
        config_dir,
    };

    match cli.command {
        Commands::Auth(args) => auth::run(args, &ctx).await,
        Commands::Upload(args) => upload::run(args, &ctx).await,
        Commands::Eval(args) => eval::run(args, &ctx).await,
        Commands::Violations(args) => violations::run(args, &ctx).await,
        Commands::Projects(args) => projects::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Logout(args) => logout::run(args, &ctx).await,
    }
}
