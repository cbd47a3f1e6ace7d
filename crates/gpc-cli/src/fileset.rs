//! Directory filesets: glob includes and excludes over a sorted walk.
//!
//! Patterns match `/`-separated paths relative to the fileset directory;
//! `*` stays within one segment and `**` spans any number of them.

use std::io;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use gpc_core::{GpcError, GpcResult};

/// Files under `dir` matching at least one include and no exclude, sorted.
pub fn collect_files(dir: &Path, includes: &[String], excludes: &[String]) -> GpcResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(GpcError::Configuration(format!(
            "fileset directory {} does not exist",
            dir.display()
        )));
    }
    let includes = compile_globset(includes)?;
    let excludes = compile_globset(excludes)?;

    let mut files = Vec::new();
    walk(dir, &mut files)?;
    Ok(files
        .into_iter()
        .filter(|path| {
            let relative = relative_slash_path(dir, path);
            includes.is_match(&relative) && !excludes.is_match(&relative)
        })
        .collect())
}

/// `path` relative to `dir`, `/`-separated.
pub fn relative_slash_path(dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(dir).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn compile_globset(patterns: &[String]) -> GpcResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| GpcError::Configuration(format!("invalid pattern {pattern:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| GpcError::Configuration(e.to_string()))
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            walk(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}
