//! Violations command - show results for the latest specification.

use anyhow::{Context as _, Result};
use clap::Args;
use restlens_client::{EVALUATING, ViolationsQuery};

use super::Context;
use crate::output::print_violations;
use crate::spec_file::parse_project;

/// Arguments for the violations command.
#[derive(Args, Debug)]
pub struct ViolationsArgs {
    /// Project in org/name format
    #[arg(short, long, value_name = "ORG/NAME")]
    pub project: String,

    /// Filter by severity (error, warning, info)
    #[arg(long)]
    pub severity: Option<String>,

    /// Max violations to show
    #[arg(long, default_value_t = 50)]
    pub limit: u32,
}

/// Run the violations command.
pub async fn run(args: ViolationsArgs, ctx: &Context) -> Result<()> {
    let project = parse_project(&args.project)?;
    let session = ctx.session().await?;
    let specs = session.client.specifications(&project.org, &project.name);

    if !ctx.json_output {
        println!("Fetching violations for {}...", project);
        println!();
    }

    let listing = specs.list().await.map_err(|e| {
        if e.is_not_found() {
            anyhow::anyhow!("Project not found or no access")
        } else {
            anyhow::Error::new(e).context("Failed to fetch specifications")
        }
    })?;

    let Some(latest) = listing.specifications.first() else {
        if ctx.json_output {
            println!("{}", serde_json::json!({ "specifications": [] }));
        } else {
            println!("No specifications found for this project.");
            println!("Upload one with: restlens upload <file> -p {}", project);
        }
        return Ok(());
    };

    let status = latest.evaluation_status.as_deref();
    if !ctx.json_output {
        println!("Latest specification: v{} ({})", latest.version, latest.id);
        println!("Status: {}", status.unwrap_or("unknown"));
        println!();
    }

    if status == Some(EVALUATING) {
        if ctx.json_output {
            println!("{}", serde_json::to_string_pretty(latest)?);
        } else {
            println!("Evaluation still in progress. Try again in a few seconds.");
        }
        return Ok(());
    }

    let query = ViolationsQuery {
        severity: args.severity,
        limit: Some(args.limit),
    };
    let result = specs
        .violations(&latest.id, &query)
        .await
        .context("Failed to fetch violations")?;

    print_violations(&result, ctx.json_output)
}
