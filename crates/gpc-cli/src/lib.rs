//! # gpc-cli — The `gpc` Command
//!
//! Drives a whole build of gaulois-pipe configuration documents: loads the
//! YAML build configuration, enumerates configuration documents, runs the
//! scan pass (reference resolution, deduplication, schema materialization)
//! and the compile pass (each distinct transform once, then each
//! configuration document with its schemas).
//!
//! ## Subcommands
//!
//! - `gpc build`: scan and compile; optional JSON report.
//! - `gpc plan`: scan only; print the deduplicated build set.
//!
//! ## Exit codes
//!
//! | code | meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | a document failed scanning or something failed to compile |
//! | 2 | configuration or operational error |

pub mod build;
pub mod compiler;
pub mod config;
pub mod fileset;
pub mod plan;
pub mod report;
pub mod session;

use std::path::{Path, PathBuf};

use gpc_core::GpcResult;

use crate::config::{BuildConfig, BuildSettings};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_BUILD_FAILURE: u8 = 1;
pub const EXIT_CONFIGURATION: u8 = 2;

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Build configuration file.
    pub config: PathBuf,
    /// Overrides the configured output directory.
    pub output_dir: Option<PathBuf>,
}

/// Load the configuration file and resolve it against its own directory.
pub fn load_settings(options: &GlobalOptions) -> GpcResult<BuildSettings> {
    let config = BuildConfig::load(&options.config)?;
    let cwd = std::env::current_dir()?;
    let base = match options.config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => resolve_path(parent, &cwd),
        _ => cwd.clone(),
    };
    let output_dir = options.output_dir.as_deref().map(|dir| resolve_path(dir, &cwd));
    config.into_settings(&base, output_dir.as_deref())
}

/// `path` if absolute, else `path` under `base`.
pub fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
