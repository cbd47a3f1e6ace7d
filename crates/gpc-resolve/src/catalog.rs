//! # Catalog Resolution
//!
//! The catalog resolver is the fallback for `cp:/` references that are not
//! found under a search root, and the only strategy for every other
//! reference. [`XmlCatalog`] reads an OASIS XML catalog file; [`NoCatalog`]
//! is used when none is configured.
//!
//! Both accept an absolute `file:` or `jar:` URI of an existing resource
//! when no catalog entry matches.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use gpc_core::{GpcError, GpcResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};
use url::Url;

use crate::resource::{resolve_direct, resource_for_uri, ResolvedResource};
use crate::xml::{attribute, local_name};

/// Externally supplied `(href, base) → resource` capability.
pub trait CatalogResolver: std::fmt::Debug {
    /// Resolve `href`, relative to `base` when it is not absolute. `None`
    /// means the resolver does not know the reference.
    fn resolve(&self, href: &str, base: &str) -> Option<ResolvedResource>;
}

/// Resolver used when no catalog file is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCatalog;

impl CatalogResolver for NoCatalog {
    fn resolve(&self, href: &str, base: &str) -> Option<ResolvedResource> {
        resolve_direct(href, base)
    }
}

/// An OASIS XML catalog loaded from disk.
///
/// Supported entries: `uri`, `system`, `rewriteURI`, `rewriteSystem`,
/// `nextCatalog`, and `xml:base` on any element.
#[derive(Debug, Clone)]
pub struct XmlCatalog {
    location: PathBuf,
    /// Exact `(name, target uri)` mappings, in document order.
    exact: Vec<(String, String)>,
    /// `(start string, rewrite prefix)` mappings, in document order.
    rewrites: Vec<(String, String)>,
    next: Vec<XmlCatalog>,
}

impl XmlCatalog {
    /// Load a catalog file and every catalog it chains to.
    ///
    /// # Errors
    ///
    /// [`GpcError::Configuration`] if the file cannot be read or parsed.
    /// Missing `nextCatalog` targets are only logged.
    pub fn load(path: &Path) -> GpcResult<Self> {
        let mut visited = HashSet::new();
        Self::load_inner(path, &mut visited)
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// The target URI the catalog maps `href` to, if any.
    ///
    /// Exact matches win over rewrites; among rewrites the longest start
    /// string wins; chained catalogs are consulted last.
    pub fn lookup(&self, href: &str) -> Option<String> {
        if let Some((_, target)) = self.exact.iter().find(|(name, _)| name == href) {
            return Some(target.clone());
        }
        let best = self
            .rewrites
            .iter()
            .filter(|(start, _)| href.starts_with(start.as_str()))
            .max_by_key(|(start, _)| start.len());
        if let Some((start, prefix)) = best {
            return Some(format!("{prefix}{}", &href[start.len()..]));
        }
        self.next.iter().find_map(|catalog| catalog.lookup(href))
    }

    fn load_inner(path: &Path, visited: &mut HashSet<PathBuf>) -> GpcResult<Self> {
        let load_error = |reason: String| {
            GpcError::Configuration(format!("cannot load catalog {}: {reason}", path.display()))
        };
        let canonical = std::fs::canonicalize(path).map_err(|e| load_error(e.to_string()))?;
        visited.insert(canonical.clone());
        let document_base = Url::from_file_path(&canonical)
            .map_err(|()| load_error("not a local path".to_string()))?;

        let mut reader = Reader::from_file(&canonical).map_err(|e| load_error(e.to_string()))?;
        let mut buf = Vec::new();
        let mut bases: Vec<Url> = vec![document_base.clone()];
        let mut exact = Vec::new();
        let mut rewrites = Vec::new();
        let mut next_locations = Vec::new();

        loop {
            buf.clear();
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| load_error(e.to_string()))?;
            let (element, is_empty) = match &event {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(_) => {
                    bases.pop();
                    continue;
                }
                Event::Eof => break,
                _ => continue,
            };

            let current = bases.last().cloned().unwrap_or_else(|| document_base.clone());
            let base = match attribute(element, "xml:base").map_err(load_error)? {
                Some(b) => current.join(&b).map_err(|e| load_error(e.to_string()))?,
                None => current,
            };
            let absolute = |target: &str| -> GpcResult<String> {
                base.join(target)
                    .map(|u| u.to_string())
                    .map_err(|e| load_error(e.to_string()))
            };

            let name = local_name(element);
            match name.as_str() {
                "uri" | "system" => {
                    let key_attr = if name == "uri" { "name" } else { "systemId" };
                    let key = attribute(element, key_attr).map_err(load_error)?;
                    let target = attribute(element, "uri").map_err(load_error)?;
                    if let (Some(key), Some(target)) = (key, target) {
                        exact.push((key, absolute(&target)?));
                    }
                }
                "rewriteURI" | "rewriteSystem" => {
                    let key_attr = if name == "rewriteURI" {
                        "uriStartString"
                    } else {
                        "systemIdStartString"
                    };
                    let start = attribute(element, key_attr).map_err(load_error)?;
                    let prefix = attribute(element, "rewritePrefix").map_err(load_error)?;
                    if let (Some(start), Some(prefix)) = (start, prefix) {
                        rewrites.push((start, absolute(&prefix)?));
                    }
                }
                "nextCatalog" => {
                    if let Some(target) = attribute(element, "catalog").map_err(load_error)? {
                        next_locations.push(absolute(&target)?);
                    }
                }
                _ => {}
            }

            if !is_empty {
                bases.push(base);
            }
        }

        let mut next = Vec::new();
        for location in next_locations {
            let Some(next_path) = Url::parse(&location).ok().and_then(|u| u.to_file_path().ok())
            else {
                warn!(catalog = %location, "ignoring non-local nextCatalog");
                continue;
            };
            match std::fs::canonicalize(&next_path) {
                Ok(p) if visited.contains(&p) => {
                    debug!(catalog = %p.display(), "catalog already loaded");
                }
                Ok(p) => next.push(Self::load_inner(&p, visited)?),
                Err(e) => {
                    warn!(catalog = %next_path.display(), error = %e, "nextCatalog not found");
                }
            }
        }

        debug!(
            catalog = %canonical.display(),
            exact = exact.len(),
            rewrites = rewrites.len(),
            "loaded catalog"
        );
        Ok(Self {
            location: canonical,
            exact,
            rewrites,
            next,
        })
    }
}

impl CatalogResolver for XmlCatalog {
    fn resolve(&self, href: &str, base: &str) -> Option<ResolvedResource> {
        match self.lookup(href) {
            Some(target) => match resource_for_uri(&target) {
                Ok(Some(resource)) => Some(resource),
                Ok(None) => {
                    debug!(href, target = %target, "catalog target does not exist");
                    None
                }
                Err(e) => {
                    debug!(href, target = %target, error = %e, "catalog target unusable");
                    None
                }
            },
            None => resolve_direct(href, base),
        }
    }
}
