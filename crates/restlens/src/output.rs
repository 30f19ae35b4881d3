//! Console rendering shared by several commands.

use std::fmt::Write as _;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use restlens_client::{ProgressSink, ViolationsResponse};
use serde::Serialize;

/// Per-severity counts of the violations that were printed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViolationSummary {
    pub errors: u64,
    pub warnings: u64,
    pub info: u64,
}

/// Render violations grouped by location, followed by a summary line.
pub fn render_violations(result: &ViolationsResponse) -> (String, ViolationSummary) {
    let mut out = String::new();
    let mut summary = ViolationSummary::default();

    let total = result.total();
    if total == 0 {
        out.push_str("No violations found!\n");
        return (out, summary);
    }

    let _ = writeln!(out, "Found {} violation(s):\n", total);

    for group in &result.violations {
        let location = group.key.location();
        for violation in &group.value {
            let icon = match violation.severity.as_str() {
                "error" => {
                    summary.errors += 1;
                    style("✗").red()
                }
                "warning" => {
                    summary.warnings += 1;
                    style("⚠").yellow()
                }
                _ => {
                    summary.info += 1;
                    style("ℹ").blue()
                }
            };
            let _ = writeln!(out, "{} [Rule {}] {}", icon, violation.rule_id, location);
            let _ = writeln!(out, "  {}\n", violation.message);
        }
    }

    out.push_str("---\n");
    let _ = writeln!(
        out,
        "Summary: {} errors, {} warnings, {} info",
        summary.errors, summary.warnings, summary.info
    );

    (out, summary)
}

/// Print violations as text or JSON.
pub fn print_violations(result: &ViolationsResponse, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", render_violations(result).0);
    }
    Ok(())
}

/// Spinner advanced by the completion wait.
pub struct EvaluationSpinner {
    bar: ProgressBar,
}

impl EvaluationSpinner {
    pub fn new(message: &str, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(template.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        bar.set_message(message.to_string());
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for EvaluationSpinner {
    fn tick(&self) {
        self.bar.tick();
    }
}
