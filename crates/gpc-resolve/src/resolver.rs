//! # Resource Resolver
//!
//! Resolves symbolic references to concrete resources. The strategies for
//! `cp:/<path>` are tried in a fixed order and the first hit wins:
//!
//! 1. search roots, in configuration order (first root wins, not best
//!    match);
//! 2. the catalog resolver, called with the original href and an empty base;
//! 3. classpath entries, in configuration order.
//!
//! Every other reference is handed to the catalog resolver only.
//!
//! The resolver also owns the identity → logical path mapping used to
//! derive target paths, because the search roots it was configured with
//! decide which part of a local path is "logical".

use std::path::{Path, PathBuf};

use gpc_core::{GpcError, GpcResult, SystemId, TargetPath};
use tracing::{debug, warn};
use url::Url;

use crate::catalog::{CatalogResolver, NoCatalog};
use crate::classpath::ClasspathEntry;
use crate::reference::SymbolicReference;
use crate::resource::{ResolvedResource, SourceKind};

const UNSUPPORTED_REFERENCE: &str =
    "only cp:/ references, or references the catalog can resolve, are supported";

/// Multi-strategy resolver for `cp:/` and catalog references.
#[derive(Debug)]
pub struct ResourceResolver {
    search_roots: Vec<PathBuf>,
    classpath: Vec<ClasspathEntry>,
    catalog: Box<dyn CatalogResolver>,
}

impl ResourceResolver {
    /// Create a resolver.
    ///
    /// Search roots that exist are canonicalized so that logical paths can
    /// be computed from canonical file identities; missing roots are kept
    /// as given and simply never match.
    pub fn new(
        search_roots: Vec<PathBuf>,
        classpath: Vec<ClasspathEntry>,
        catalog: Box<dyn CatalogResolver>,
    ) -> Self {
        let search_roots = search_roots
            .into_iter()
            .map(|root| std::fs::canonicalize(&root).unwrap_or(root))
            .collect();
        let classpath = classpath
            .into_iter()
            .map(|entry| match entry {
                ClasspathEntry::Directory(dir) => {
                    ClasspathEntry::Directory(std::fs::canonicalize(&dir).unwrap_or(dir))
                }
                archive => archive,
            })
            .collect();
        Self {
            search_roots,
            classpath,
            catalog,
        }
    }

    /// Resolver with search roots only.
    pub fn with_search_roots(search_roots: Vec<PathBuf>) -> Self {
        Self::new(search_roots, Vec::new(), Box::new(NoCatalog))
    }

    pub fn search_roots(&self) -> &[PathBuf] {
        &self.search_roots
    }

    pub fn classpath(&self) -> &[ClasspathEntry] {
        &self.classpath
    }

    /// Resolve `href`.
    ///
    /// # Errors
    ///
    /// [`GpcError::ReferenceResolution`] when no strategy finds the resource.
    /// Whether that is fatal is the caller's decision.
    pub fn resolve(&self, href: &str) -> GpcResult<ResolvedResource> {
        match SymbolicReference::parse(href) {
            SymbolicReference::Classpath { href, path } => self.resolve_classpath(&href, &path),
            SymbolicReference::Opaque(href) => {
                debug!(href = %href, "resolving through catalog");
                self.catalog
                    .resolve(&href, "")
                    .ok_or_else(|| GpcError::unresolved(href, UNSUPPORTED_REFERENCE))
            }
        }
    }

    fn resolve_classpath(&self, href: &str, path: &str) -> GpcResult<ResolvedResource> {
        debug!(href, "searching search roots");
        for root in &self.search_roots {
            let candidate = root.join(path);
            if candidate.is_file() {
                let identity = SystemId::from_path(&candidate)?;
                debug!(href, identity = %identity, "found under search root");
                return Ok(ResolvedResource::new(identity, SourceKind::LocalFile));
            }
        }

        if let Some(resource) = self.catalog.resolve(href, "") {
            debug!(href, identity = %resource.identity(), "resolved by catalog");
            return Ok(resource);
        }

        debug!(href, "searching classpath");
        for entry in &self.classpath {
            match entry.probe(path) {
                Ok(Some(resource)) => return Ok(resource),
                Ok(None) => {}
                Err(e) => {
                    warn!(href, entry = %entry.path().display(), error = %e, "unreadable classpath entry");
                }
            }
        }

        Err(GpcError::unresolved(
            href,
            "not found in search roots, catalog or classpath",
        ))
    }

    /// The logical (output-relative) path of a resolved identity.
    ///
    /// - archive entries: the path inside the archive;
    /// - local files under search roots or classpath directories: the path
    ///   relative to the innermost one containing it, so nested roots agree
    ///   with the `cp:/` path that found the file;
    /// - anything else: the URI path.
    ///
    /// Pure with respect to the identity for a given resolver.
    pub fn logical_path(&self, identity: &SystemId) -> String {
        if let Some((_, entry)) = identity.archive_parts() {
            return entry.to_string();
        }
        if let Some(path) = identity.to_file_path() {
            let dirs = self.search_roots.iter().map(PathBuf::as_path).chain(
                self.classpath.iter().filter_map(|entry| match entry {
                    ClasspathEntry::Directory(dir) => Some(dir.as_path()),
                    ClasspathEntry::Archive(_) => None,
                }),
            );
            let relative = dirs
                .filter_map(|dir| path.strip_prefix(dir).ok())
                .min_by_key(|relative| relative.components().count());
            return match relative {
                Some(relative) => to_slash(relative),
                None => to_slash(&path).trim_start_matches('/').to_string(),
            };
        }
        match Url::parse(identity.as_str()) {
            Ok(url) => url.path().trim_start_matches('/').to_string(),
            Err(_) => identity.as_str().to_string(),
        }
    }

    /// Target path of the compiled form of `identity` under `output_root`.
    pub fn target_path(&self, output_root: &Path, identity: &SystemId) -> TargetPath {
        TargetPath::derive(output_root, &self.logical_path(identity))
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::XmlCatalog;
    use crate::resource::tests::write_zip;
    use gpc_core::ErrorKind;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn first_search_root_wins() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        write(&a.join("x/t.xsl"), "<from-a/>");
        write(&b.join("x/t.xsl"), "<from-b/>");

        let resolver = ResourceResolver::with_search_roots(vec![a.clone(), b]);
        let resolved = resolver.resolve("cp:/x/t.xsl").unwrap();
        assert_eq!(resolved.source_kind(), SourceKind::LocalFile);
        assert_eq!(
            resolved.identity(),
            &SystemId::from_path(&a.join("x/t.xsl")).unwrap()
        );
    }

    #[test]
    fn later_root_is_used_when_earlier_lacks_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        write(&b.join("t.xsl"), "<from-b/>");

        let resolver = ResourceResolver::with_search_roots(vec![a, b.clone()]);
        let resolved = resolver.resolve("cp:/t.xsl").unwrap();
        assert_eq!(resolved.identity(), &SystemId::from_path(&b.join("t.xsl")).unwrap());
    }

    #[test]
    fn catalog_is_tried_before_classpath() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("cat/t.xsl"), "<from-catalog/>");
        write(
            &dir.path().join("catalog.xml"),
            r#"<catalog><rewriteURI uriStartString="cp:/" rewritePrefix="cat/"/></catalog>"#,
        );
        let jar = dir.path().join("lib.jar");
        write_zip(&jar, &[("t.xsl", "<from-jar/>")]);

        let resolver = ResourceResolver::new(
            vec![dir.path().join("missing-root")],
            vec![ClasspathEntry::from_path(&jar)],
            Box::new(XmlCatalog::load(&dir.path().join("catalog.xml")).unwrap()),
        );
        let resolved = resolver.resolve("cp:/t.xsl").unwrap();
        assert_eq!(resolved.source_kind(), SourceKind::CatalogResolved);
    }

    #[test]
    fn classpath_is_last_resort_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.jar");
        let second = dir.path().join("second.jar");
        write_zip(&first, &[("other.xsl", "<o/>")]);
        write_zip(&second, &[("xsl/t.xsl", "<t/>")]);

        let resolver = ResourceResolver::new(
            Vec::new(),
            vec![
                ClasspathEntry::from_path(&first),
                ClasspathEntry::from_path(&second),
            ],
            Box::new(NoCatalog),
        );
        let resolved = resolver.resolve("cp:/xsl/t.xsl").unwrap();
        assert_eq!(resolved.source_kind(), SourceKind::ClasspathEntry);
        assert!(resolved.identity().as_str().contains("second.jar!/xsl/t.xsl"));
        assert_eq!(resolver.logical_path(resolved.identity()), "xsl/t.xsl");
    }

    #[test]
    fn unresolvable_classpath_reference_is_reported() {
        let resolver = ResourceResolver::with_search_roots(Vec::new());
        let err = resolver.resolve("cp:/x/y.xsl").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReferenceResolution);
        assert_eq!(err.identity(), Some("cp:/x/y.xsl"));
    }

    #[test]
    fn opaque_reference_needs_catalog() {
        let resolver = ResourceResolver::with_search_roots(Vec::new());
        let err = resolver.resolve("urn:efl:unknown").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReferenceResolution);
    }

    #[test]
    fn logical_path_is_relative_to_containing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src/main/xsl");
        write(&root.join("steps/norm.xsl"), "<x/>");

        let resolver = ResourceResolver::with_search_roots(vec![root.clone()]);
        let id = resolver.resolve("cp:/steps/norm.xsl").unwrap().into_identity();
        assert_eq!(resolver.logical_path(&id), "steps/norm.xsl");
        assert_eq!(
            resolver.target_path(Path::new("/out"), &id).as_path(),
            Path::new("/out/steps/norm.sef")
        );
    }

    #[test]
    fn logical_path_uses_innermost_of_nested_roots() {
        let dir = tempfile::tempdir().unwrap();
        let outer = dir.path().join("src");
        let inner = outer.join("main/xsl");
        write(&inner.join("t.xsl"), "<x/>");

        let resolver = ResourceResolver::with_search_roots(vec![outer, inner]);
        let id = resolver.resolve("cp:/t.xsl").unwrap().into_identity();
        assert_eq!(resolver.logical_path(&id), "t.xsl");

        let same = resolver.resolve("cp:/main/xsl/t.xsl").unwrap().into_identity();
        assert_eq!(same, id);
        assert_eq!(
            resolver.target_path(Path::new("/out"), &same).as_path(),
            Path::new("/out/t.sef")
        );
    }

    #[test]
    fn target_path_is_stable_for_an_identity() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("r/t.xsl"), "<x/>");
        let resolver = ResourceResolver::with_search_roots(vec![dir.path().join("r")]);
        let id = resolver.resolve("cp:/t.xsl").unwrap().into_identity();
        let first = resolver.target_path(Path::new("/out"), &id);
        let second = resolver.target_path(Path::new("/out"), &id);
        assert_eq!(first, second);
    }
}
