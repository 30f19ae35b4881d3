//! Upload command - send a specification for evaluation.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use console::style;

use super::Context;
use crate::spec_file::{parse_project, read_and_parse_spec};

/// Arguments for the upload command.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// OpenAPI document (JSON or YAML)
    pub file: PathBuf,

    /// Project in org/name format
    #[arg(short, long, value_name = "ORG/NAME")]
    pub project: String,

    /// Version tag (e.g., v1.0.0)
    #[arg(long)]
    pub tag: Option<String>,
}

/// Run the upload command.
pub async fn run(args: UploadArgs, ctx: &Context) -> Result<()> {
    let project = parse_project(&args.project)?;
    let spec = read_and_parse_spec(&args.file)?;
    let session = ctx.session().await?;

    if !ctx.json_output {
        println!("Uploading {} to {}...", args.file.display(), project);
    }

    let result = session
        .client
        .specifications(&project.org, &project.name)
        .upload(&spec, args.tag.as_deref())
        .await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!("{}", style("Upload successful!").green().bold());
    println!("  Specification ID: {}", result.specification.id);
    println!("  Version: {}", result.specification.version);

    if result.is_evaluating() {
        println!();
        println!("Evaluation started. Check status with:");
        println!("  restlens violations -p {}", project);
    }

    Ok(())
}
