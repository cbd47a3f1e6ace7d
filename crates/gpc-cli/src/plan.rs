//! # Plan Subcommand
//!
//! Runs the scan pass only and prints the deduplicated build set. Schemas
//! are still materialized, since discovering them requires copying them.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use crate::report::{resolve_generated_at, BuildReport};
use crate::session::BuildSession;
use crate::{load_settings, GlobalOptions, EXIT_BUILD_FAILURE, EXIT_SUCCESS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    Text,
    Json,
}

/// Arguments for the `gpc plan` subcommand.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = PlanFormat::Text)]
    pub format: PlanFormat,

    /// Override the generated_at timestamp.
    #[arg(long)]
    pub generated_at: Option<String>,
}

/// Execute the plan subcommand.
///
/// Returns exit code: 0 when every document scanned, 1 otherwise.
pub fn run_plan(args: &PlanArgs, options: &GlobalOptions) -> Result<u8> {
    let report = plan_report(args, options)?;
    match args.format {
        PlanFormat::Text => print!("{}", report.render_text()),
        PlanFormat::Json => println!(
            "{}",
            report.to_json().context("failed to serialize plan")?
        ),
    }
    Ok(if report.success {
        EXIT_SUCCESS
    } else {
        EXIT_BUILD_FAILURE
    })
}

/// Scan pass for the configuration in `options`.
pub fn plan_report(args: &PlanArgs, options: &GlobalOptions) -> Result<BuildReport> {
    let settings = load_settings(options)?;
    let mut session = BuildSession::new(settings)?;
    session.scan_all()?;
    Ok(session.report(resolve_generated_at(args.generated_at.as_deref())))
}
