//! Classpath entries: archives and directories probed for `cp:/` resources
//! that no search root and no catalog entry provide.

use std::io;
use std::path::{Path, PathBuf};

use gpc_core::{GpcError, SystemId};
use tracing::debug;

use crate::resource::{read_archive_entry, ResolvedResource, SourceKind};

/// One element of the classpath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClasspathEntry {
    /// A `.jar` or `.zip` archive.
    Archive(PathBuf),
    /// A directory of resources.
    Directory(PathBuf),
}

impl ClasspathEntry {
    /// Classify by extension: `.jar`/`.zip` are archives, anything else is
    /// a directory.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_archive = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jar") || e.eq_ignore_ascii_case("zip"));
        if is_archive {
            Self::Archive(path)
        } else {
            Self::Directory(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Archive(p) | Self::Directory(p) => p,
        }
    }

    /// Look for `path` (relative, `/`-separated) in this entry.
    ///
    /// `Ok(None)` when the entry does not contain it; `Err` when the entry
    /// exists but could not be read.
    pub fn probe(&self, path: &str) -> io::Result<Option<ResolvedResource>> {
        match self {
            Self::Archive(archive) => {
                if !archive.is_file() {
                    return Ok(None);
                }
                match read_archive_entry(archive, path) {
                    Ok(_) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                    Err(e) => return Err(e),
                }
                let identity = SystemId::archive_entry(archive, path).map_err(into_io)?;
                debug!(identity = %identity, "found in classpath archive");
                Ok(Some(ResolvedResource::new(identity, SourceKind::ClasspathEntry)))
            }
            Self::Directory(dir) => {
                let candidate = dir.join(path);
                if !candidate.is_file() {
                    return Ok(None);
                }
                let identity = SystemId::from_path(&candidate).map_err(into_io)?;
                debug!(identity = %identity, "found in classpath directory");
                Ok(Some(ResolvedResource::new(identity, SourceKind::ClasspathEntry)))
            }
        }
    }
}

fn into_io(err: GpcError) -> io::Error {
    match err {
        GpcError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}
