//! # Resource Identities and Target Paths
//!
//! A [`SystemId`] is the resolved system identifier of a resource. Local
//! files are identified by the `file:` URI of their canonical path, so two
//! spellings of the same file collapse to one identity. Entries inside an
//! archive use the `jar:<archive uri>!/<entry>` form.
//!
//! A [`TargetPath`] is where the compiled form of a resource is written.
//! It is derived from the resource's logical path by dropping the archive
//! part of a `jar:` URI, keeping the directory, and replacing the
//! extension of the base name with [`COMPILED_EXTENSION`].

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GpcError, GpcResult};

/// Extension of compiled transforms.
pub const COMPILED_EXTENSION: &str = "sef";

/// Separates an archive location from the entry path inside it.
pub const ARCHIVE_SEPARATOR: char = '!';

/// Prefix of logical-root references.
pub const CLASSPATH_SCHEME: &str = "cp:/";

const ARCHIVE_SCHEME: &str = "jar:";

const ENTRY_SEPARATOR: &str = "!/";

/// Stable, globally unique identifier of a resolved resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemId(String);

impl SystemId {
    /// Wrap an already-resolved identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity of a local file: the `file:` URI of its canonical path.
    ///
    /// Fails if the file does not exist.
    pub fn from_path(path: &Path) -> GpcResult<Self> {
        let canonical = std::fs::canonicalize(path)?;
        let url = Url::from_file_path(&canonical).map_err(|()| {
            GpcError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} cannot be expressed as a file URI", canonical.display()),
            ))
        })?;
        Ok(Self(url.to_string()))
    }

    /// Identity of `entry` inside the archive at `archive`.
    pub fn archive_entry(archive: &Path, entry: &str) -> GpcResult<Self> {
        let archive_id = Self::from_path(archive)?;
        Ok(Self(format!(
            "{ARCHIVE_SCHEME}{}{ARCHIVE_SEPARATOR}/{}",
            archive_id.0,
            entry.trim_start_matches('/')
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split an archive identity into the archive's URI and the entry path
    /// (without leading slash).
    pub fn archive_parts(&self) -> Option<(&str, &str)> {
        let rest = self.0.strip_prefix(ARCHIVE_SCHEME)?;
        let (archive, entry) = rest.split_once(ENTRY_SEPARATOR)?;
        Some((archive, entry.trim_start_matches('/')))
    }

    pub fn is_archive_entry(&self) -> bool {
        self.archive_parts().is_some()
    }

    /// Local path of a `file:` identity.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if self.0.starts_with(ARCHIVE_SCHEME) {
            return None;
        }
        let url = Url::parse(&self.0).ok()?;
        if url.scheme() != "file" {
            return None;
        }
        url.to_file_path().ok()
    }
}

impl std::fmt::Display for SystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SystemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Output location of a compiled resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetPath(PathBuf);

impl TargetPath {
    /// Use `path` verbatim (configuration documents keep their extension).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Derive the compiled-form location of a transform from its logical
    /// path.
    ///
    /// `a/b/t.xsl`, `cp:/a/b/t.xsl` and `jar:file:/x.jar!/a/b/t.xsl` all map
    /// to `<output_root>/a/b/t.sef`. `..` segments never climb above
    /// `output_root`.
    pub fn derive(output_root: &Path, logical_path: &str) -> Self {
        let inner = logical_path
            .strip_prefix(ARCHIVE_SCHEME)
            .and_then(|rest| rest.split_once(ENTRY_SEPARATOR))
            .map_or(logical_path, |(_, entry)| entry);
        let inner = inner.strip_prefix(CLASSPATH_SCHEME).unwrap_or(inner);

        let mut segments: Vec<&str> = Vec::new();
        for segment in inner.split(|c: char| c == '/' || c == '\\') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }

        let file_name = segments.pop().unwrap_or_default();
        let base_name = match file_name.rfind('.') {
            Some(idx) if idx > 0 => &file_name[..idx],
            _ => file_name,
        };

        let mut path = output_root.to_path_buf();
        for segment in segments {
            path.push(segment);
        }
        path.push(format!("{base_name}.{COMPILED_EXTENSION}"));
        Self(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl std::fmt::Display for TargetPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for TargetPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Lexically normalize a path: drop `.` and resolve `..` against preceding
/// components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
