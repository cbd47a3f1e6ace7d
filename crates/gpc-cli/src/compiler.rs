//! The compiler capability and its external-command implementation.

use std::path::{Path, PathBuf};
use std::process::Command;

use gpc_core::{GpcError, GpcResult, SystemId};
use tracing::{debug, info};

use crate::config::CompilerConfig;

/// Compiles transforms and configuration documents.
///
/// Called only during the compile pass, once per transform unit and once per
/// configuration set.
pub trait Compiler {
    /// Compile the transform at `source` into `target`.
    fn compile_transform(&mut self, source: &SystemId, target: &Path) -> GpcResult<()>;

    /// Compile the configuration document at `source` into `target`, with
    /// its sorted schema access URIs and optional post-processing transform.
    fn compile_config(
        &mut self,
        source: &SystemId,
        target: &Path,
        schemas: &[String],
        post_processor: Option<&Path>,
    ) -> GpcResult<()>;
}

/// Runs a configured program:
///
/// ```text
/// <program> <args..> transform <source> <target>
/// <program> <args..> config <source> <target> [--post-processor <file>] [--schema <uri>]...
/// ```
///
/// Local sources are passed as paths, archive entries as their URI.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn run(&self, source: &SystemId, target: &Path, extra: Vec<String>) -> GpcResult<()> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut command = Command::new(&self.program);
        command.args(&self.args).args(extra);
        debug!(command = ?command, "running compiler");

        let output = command.output().map_err(|e| {
            GpcError::compile(source.as_str(), format!("cannot run {}: {e}", self.program))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(GpcError::compile(
                source.as_str(),
                if detail.is_empty() {
                    format!("{} exited with {}", self.program, output.status)
                } else {
                    format!("{} exited with {}: {detail}", self.program, output.status)
                },
            ));
        }
        info!(source = %source, target = %target.display(), "compiled");
        Ok(())
    }
}

impl Compiler for CommandCompiler {
    fn compile_transform(&mut self, source: &SystemId, target: &Path) -> GpcResult<()> {
        self.run(
            source,
            target,
            vec![
                "transform".into(),
                source_argument(source),
                target.display().to_string(),
            ],
        )
    }

    fn compile_config(
        &mut self,
        source: &SystemId,
        target: &Path,
        schemas: &[String],
        post_processor: Option<&Path>,
    ) -> GpcResult<()> {
        let mut extra = vec![
            "config".into(),
            source_argument(source),
            target.display().to_string(),
        ];
        if let Some(post) = post_processor {
            extra.push("--post-processor".into());
            extra.push(post.display().to_string());
        }
        for schema in schemas {
            extra.push("--schema".into());
            extra.push(schema.clone());
        }
        self.run(source, target, extra)
    }
}

fn source_argument(source: &SystemId) -> String {
    source
        .to_file_path()
        .map(|p: PathBuf| p.display().to_string())
        .unwrap_or_else(|| source.as_str().to_string())
}
