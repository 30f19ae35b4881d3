//! Eval command - upload, wait for the evaluation, then show violations.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use restlens_client::{Transport, ViolationsQuery, WaitOptions, WaitOutcome};
use serde::Serialize;

use super::Context;
use crate::output::{EvaluationSpinner, print_violations};
use crate::spec_file::{parse_project, read_and_parse_spec};

/// Arguments for the eval command.
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// OpenAPI document (JSON or YAML)
    pub file: PathBuf,

    /// Project in org/name format
    #[arg(short, long, value_name = "ORG/NAME")]
    pub project: String,

    /// Version tag (e.g., v1.0.0)
    #[arg(long)]
    pub tag: Option<String>,

    /// Max seconds to wait for the evaluation
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// Poll the specification status instead of streaming events
    #[arg(long)]
    pub poll: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingOutput<'a> {
    specification_id: &'a str,
    completed: bool,
}

/// Run the eval command.
pub async fn run(args: EvalArgs, ctx: &Context) -> Result<()> {
    let project = parse_project(&args.project)?;
    let spec = read_and_parse_spec(&args.file)?;
    let session = ctx.session().await?;
    let specs = session.client.specifications(&project.org, &project.name);

    if !ctx.json_output {
        println!("Uploading {} to {}...", args.file.display(), project);
    }
    let uploaded = specs.upload(&spec, args.tag.as_deref()).await?;
    let spec_id = uploaded.specification.id;

    if !ctx.json_output {
        println!("Uploaded. Specification ID: {}", spec_id);
        println!();
        println!("Waiting for evaluation (timeout: {}s)...", args.timeout);
    }

    let options = WaitOptions {
        timeout: Duration::from_secs(args.timeout),
        transport: if args.poll {
            Transport::Poll
        } else {
            Transport::Stream
        },
        ..Default::default()
    };

    let spinner = EvaluationSpinner::new("Evaluating...", ctx.json_output);
    let outcome = specs.wait_for_completion(&spec_id, &options, &spinner).await;
    spinner.finish();

    if outcome? == WaitOutcome::TimedOut {
        if ctx.json_output {
            let output = PendingOutput {
                specification_id: &spec_id,
                completed: false,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!();
            println!("Evaluation still in progress. Check back with:");
            println!("  restlens violations -p {}", project);
        }
        return Ok(());
    }

    if !ctx.json_output {
        println!();
        println!("Evaluation complete!");
    }

    let violations = specs
        .violations(&spec_id, &ViolationsQuery::default())
        .await
        .context("Failed to fetch violations")?;

    print_violations(&violations, ctx.json_output)
}
