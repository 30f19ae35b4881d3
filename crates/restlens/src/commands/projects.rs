//! Projects command - list accessible projects by organization.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use console::style;
use restlens_client::Project;

use super::Context;

/// Organization label for projects without one.
const PERSONAL: &str = "personal";

/// Arguments for the projects command.
#[derive(Args, Debug)]
pub struct ProjectsArgs {
    /// Filter by organization
    #[arg(long)]
    pub org: Option<String>,
}

/// Run the projects command.
pub async fn run(args: ProjectsArgs, ctx: &Context) -> Result<()> {
    let session = ctx.session().await?;
    let response = session
        .client
        .projects()
        .list(args.org.as_deref())
        .await
        .map_err(|e| {
            if e.is_auth_error() {
                anyhow::anyhow!(
                    "Not authenticated with {}. {}",
                    session.server,
                    restlens_oauth::login_hint(&session.server)
                )
            } else {
                anyhow::Error::new(e).context("Failed to fetch projects")
            }
        })?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    println!("Your projects:");
    println!();

    for (org, projects) in group_by_org(&response.projects) {
        println!("{}", style(org).bold());
        for project in projects {
            println!("  {}/{}", org, project.name);
            if let Some(description) = project.description.as_deref().filter(|d| !d.is_empty()) {
                println!("    {}", style(description).dim());
            }
        }
        println!();
    }

    println!("Total: {} project(s)", response.projects.len());
    Ok(())
}

fn group_by_org(projects: &[Project]) -> BTreeMap<&str, Vec<&Project>> {
    let mut groups: BTreeMap<&str, Vec<&Project>> = BTreeMap::new();
    for project in projects {
        let org = project.organization_slug.as_deref().unwrap_or(PERSONAL);
        groups.entry(org).or_default().push(project);
    }
    groups
}
