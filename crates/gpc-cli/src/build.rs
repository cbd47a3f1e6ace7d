//! # Build Subcommand
//!
//! Full run: scan every configuration document, then compile the
//! deduplicated build set. The run fails (exit 1) if any document failed
//! scanning or anything failed to compile; every independent unit is still
//! attempted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use gpc_core::GpcError;
use tracing::{error, info};

use crate::compiler::{CommandCompiler, Compiler};
use crate::config::BuildSettings;
use crate::report::resolve_generated_at;
use crate::session::BuildSession;
use crate::{load_settings, GlobalOptions, EXIT_BUILD_FAILURE, EXIT_SUCCESS};

/// Arguments for the `gpc build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Write a JSON build report to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Override the report's generated_at timestamp for deterministic output.
    #[arg(long)]
    pub generated_at: Option<String>,
}

/// Execute the build subcommand.
///
/// Returns exit code: 0 on success, 1 on build failure; configuration and
/// operational errors are returned as `Err`.
pub fn run_build(args: &BuildArgs, options: &GlobalOptions) -> Result<u8> {
    let settings = load_settings(options)?;
    let compiler = settings.compiler.as_ref().ok_or_else(|| {
        GpcError::Configuration("compiler.program is required to build".into())
    })?;
    let mut compiler = CommandCompiler::from_config(compiler);
    run_build_with(args, settings, &mut compiler)
}

/// Build `settings` with the given compiler.
pub fn run_build_with(
    args: &BuildArgs,
    settings: BuildSettings,
    compiler: &mut dyn Compiler,
) -> Result<u8> {
    let mut session = BuildSession::new(settings)?;
    session.scan_all()?;
    session.compile(compiler);

    let report = session.report(resolve_generated_at(args.generated_at.as_deref()));
    if let Some(path) = &args.report {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = report.to_json().context("failed to serialize build report")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report: {}", path.display()))?;
        info!(path = %path.display(), "build report written");
    }

    if report.success {
        info!(
            transforms = report.transforms.len(),
            configs = report.configs.len(),
            "build succeeded"
        );
        Ok(EXIT_SUCCESS)
    } else {
        error!(
            failed_documents = report.failed_documents.len(),
            compile_failures = report.compile_failures.len(),
            "build failed"
        );
        Ok(EXIT_BUILD_FAILURE)
    }
}
