//! Resolved resources and opening them by system identifier.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;

use gpc_core::{GpcResult, SystemId};
use url::Url;

/// How a resource was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A file under one of the search roots.
    LocalFile,
    /// Returned by the catalog resolver.
    CatalogResolved,
    /// Found in a classpath archive or directory.
    ClasspathEntry,
}

/// A concrete resource behind a symbolic reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    identity: SystemId,
    source_kind: SourceKind,
}

impl ResolvedResource {
    pub fn new(identity: SystemId, source_kind: SourceKind) -> Self {
        Self {
            identity,
            source_kind,
        }
    }

    pub fn identity(&self) -> &SystemId {
        &self.identity
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    /// Open a fresh stream over the resource's bytes.
    pub fn open(&self) -> io::Result<Box<dyn Read>> {
        open_system_id(&self.identity)
    }

    pub fn into_identity(self) -> SystemId {
        self.identity
    }
}

/// Open the bytes behind a `file:` or `jar:file:...!/entry` identifier.
pub fn open_system_id(identity: &SystemId) -> io::Result<Box<dyn Read>> {
    if let Some((archive_uri, entry)) = identity.archive_parts() {
        let archive = local_path_of(archive_uri)?;
        let bytes = read_archive_entry(&archive, entry)?;
        return Ok(Box::new(Cursor::new(bytes)));
    }
    let path = local_path_of(identity.as_str())?;
    Ok(Box::new(File::open(path)?))
}

/// Resolve an absolute `file:` or `jar:` URI (optionally relative to `base`)
/// to an existing resource. Used by catalog resolvers as their final step.
pub(crate) fn resolve_direct(href: &str, base: &str) -> Option<ResolvedResource> {
    let uri = if href.starts_with("jar:") {
        href.to_string()
    } else {
        match Url::parse(href) {
            Ok(url) => url.to_string(),
            Err(_) if !base.is_empty() => Url::parse(base).ok()?.join(href).ok()?.to_string(),
            Err(_) => return None,
        }
    };
    resource_for_uri(&uri).ok().flatten()
}

/// Build a catalog-resolved resource from a concrete URI, if it exists.
pub(crate) fn resource_for_uri(uri: &str) -> GpcResult<Option<ResolvedResource>> {
    let candidate = SystemId::new(uri);
    if let Some((archive_uri, entry)) = candidate.archive_parts() {
        let Ok(archive) = local_path_of(archive_uri) else {
            return Ok(None);
        };
        if !archive.is_file() {
            return Ok(None);
        }
        let identity = SystemId::archive_entry(&archive, entry)?;
        return Ok(match open_system_id(&identity) {
            Ok(_) => Some(ResolvedResource::new(identity, SourceKind::CatalogResolved)),
            Err(_) => None,
        });
    }
    match candidate.to_file_path() {
        Some(path) if path.is_file() => Ok(Some(ResolvedResource::new(
            SystemId::from_path(&path)?,
            SourceKind::CatalogResolved,
        ))),
        _ => Ok(None),
    }
}

fn local_path_of(uri: &str) -> io::Result<PathBuf> {
    let url = Url::parse(uri).map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("invalid URI {uri}: {e}"))
    })?;
    if url.scheme() != "file" {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("unsupported system identifier {uri}"),
        ));
    }
    url.to_file_path().map_err(|()| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{uri} does not denote a local path"),
        )
    })
}

pub(crate) fn read_archive_entry(archive: &std::path::Path, entry: &str) -> io::Result<Vec<u8>> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(zip_error)?;
    let mut entry = zip.by_name(entry).map_err(zip_error)?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn zip_error(err: zip::result::ZipError) -> io::Error {
    match err {
        zip::result::ZipError::FileNotFound => {
            io::Error::new(io::ErrorKind::NotFound, "entry not found in archive")
        }
        zip::result::ZipError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    /// Write a zip archive holding `entries` (name, content).
    pub(crate) fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn opens_local_file_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xsl");
        std::fs::write(&path, b"<xsl:stylesheet/>").unwrap();
        let id = SystemId::from_path(&path).unwrap();

        let mut content = String::new();
        open_system_id(&id).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "<xsl:stylesheet/>");
    }

    #[test]
    fn opens_archive_entry_identity() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        write_zip(&jar, &[("xsl/t.xsl", "<from-jar/>")]);
        let id = SystemId::archive_entry(&jar, "xsl/t.xsl").unwrap();

        let mut content = String::new();
        open_system_id(&id).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "<from-jar/>");
    }

    #[test]
    fn missing_archive_entry_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        write_zip(&jar, &[("a.xsl", "<a/>")]);
        let id = SystemId::archive_entry(&jar, "b.xsl").unwrap();
        let err = open_system_id(&id).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn non_file_schemes_are_unsupported() {
        let err = open_system_id(&SystemId::new("http://example.org/t.xsl"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn resolve_direct_accepts_existing_file_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xsl");
        std::fs::write(&path, b"<x/>").unwrap();
        let uri = Url::from_file_path(std::fs::canonicalize(&path).unwrap()).unwrap();

        let resolved = resolve_direct(uri.as_str(), "").unwrap();
        assert_eq!(resolved.source_kind(), SourceKind::CatalogResolved);
        assert_eq!(resolved.identity().as_str(), uri.as_str());
        assert!(resolve_direct("urn:nothing", "").is_none());
        assert!(resolve_direct("relative.xsl", "").is_none());
    }
}
