//! Static dependency-tree extraction.
//!
//! Reads XSL and XSD documents without compiling them and follows every
//! import, include and schema reference. Locations are resolved against the
//! declaring document; `cp:/` locations go through the resource resolver, as
//! do absolute URIs that are neither `file:` nor `jar:` (so a catalog can map
//! them to local copies).

use std::collections::HashSet;
use std::fmt::Debug;
use std::io::{self, BufReader};

use gpc_core::{GpcError, GpcResult, SystemId};
use gpc_resolve::xml::attribute;
use gpc_resolve::{open_system_id, ResourceResolver, SymbolicReference};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::debug;
use url::Url;

use crate::tree::{DependencyKind, DependencyNode, DependencyTree, FileNode, NodeInfo};

/// Produces the dependency tree of a transform.
pub trait DependencyExtractor: Debug {
    /// Build the tree rooted at `identity`.
    ///
    /// With `filter_duplicates`, each resolved location is expanded at most
    /// once per tree and later occurrences are dropped.
    ///
    /// # Errors
    ///
    /// [`GpcError::Discovery`] when the root document cannot be read.
    fn extract(&self, identity: &SystemId, filter_duplicates: bool) -> GpcResult<DependencyTree>;
}

/// Native extractor reading declarations with a streaming parser.
#[derive(Debug, Clone, Copy)]
pub struct StaticDependencyExtractor<'r> {
    resolver: &'r ResourceResolver,
}

impl<'r> StaticDependencyExtractor<'r> {
    pub fn new(resolver: &'r ResourceResolver) -> Self {
        Self { resolver }
    }

    fn locate(&self, base: &str, location: &str) -> String {
        let via_resolver = match SymbolicReference::parse(location) {
            SymbolicReference::Classpath { .. } => true,
            SymbolicReference::Opaque(_) => Url::parse(location)
                .map(|url| url.scheme().len() > 1 && !matches!(url.scheme(), "file" | "jar"))
                .unwrap_or(false),
        };
        if via_resolver {
            if let Ok(resource) = self.resolver.resolve(location) {
                return resource.into_identity().as_str().to_string();
            }
        }
        join_location(base, location).unwrap_or_else(|| location.to_string())
    }

    fn expand(
        &self,
        base: &str,
        declarations: Vec<(DependencyKind, String)>,
        filter_duplicates: bool,
        seen: &mut HashSet<String>,
        ancestors: &mut Vec<String>,
    ) -> Vec<DependencyNode> {
        let mut nodes = Vec::new();
        for (kind, uri) in declarations {
            let abs_uri = self.locate(base, &uri);
            if filter_duplicates && !seen.insert(abs_uri.clone()) {
                debug!(abs_uri = %abs_uri, "duplicate dependency dropped");
                continue;
            }
            let mut info = NodeInfo::new(kind, uri, abs_uri.clone());
            if !ancestors.contains(&abs_uri) {
                match declarations_of(&abs_uri) {
                    Ok(nested) => {
                        ancestors.push(abs_uri.clone());
                        info.children =
                            self.expand(&abs_uri, nested, filter_duplicates, seen, ancestors);
                        ancestors.pop();
                    }
                    Err(e) => debug!(abs_uri = %abs_uri, error = %e, "dependency not readable"),
                }
            }
            nodes.push(DependencyNode::from_info(info));
        }
        nodes
    }
}

impl DependencyExtractor for StaticDependencyExtractor<'_> {
    fn extract(&self, identity: &SystemId, filter_duplicates: bool) -> GpcResult<DependencyTree> {
        let root = identity.as_str().to_string();
        let declarations = declarations_of(&root)
            .map_err(|e| GpcError::discovery(identity.as_str(), e.to_string()))?;

        let mut seen = HashSet::from([root.clone()]);
        let mut ancestors = vec![root.clone()];
        let children = self.expand(&root, declarations, filter_duplicates, &mut seen, &mut ancestors);
        Ok(DependencyTree {
            files: vec![FileNode {
                abs_uri: root,
                children,
            }],
        })
    }
}

/// Read the dependency declarations of one document, in document order.
fn declarations_of(identity: &str) -> io::Result<Vec<(DependencyKind, String)>> {
    let stream = open_system_id(&SystemId::new(identity))?;
    let mut reader = NsReader::from_reader(BufReader::new(stream));
    let mut buf = Vec::new();
    let mut found = Vec::new();
    loop {
        buf.clear();
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ResolveResult::Bound(Namespace(ns)), Event::Start(e) | Event::Empty(e))) => {
                let Some(kind) = DependencyKind::from_element(ns, e.local_name().as_ref()) else {
                    continue;
                };
                match attribute(&e, kind.location_attribute()) {
                    Ok(Some(location)) if !location.is_empty() => found.push((kind, location)),
                    Ok(_) => {}
                    Err(reason) => return Err(io::Error::new(io::ErrorKind::InvalidData, reason)),
                }
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e.to_string())),
        }
    }
    Ok(found)
}

/// Resolve `location` against the identity of the document declaring it.
///
/// Absolute locations are returned unchanged. Relative locations inside an
/// archive stay inside that archive.
pub fn join_location(base: &str, location: &str) -> Option<String> {
    if let Ok(url) = Url::parse(location) {
        if url.scheme().len() > 1 {
            return Some(location.to_string());
        }
    }
    let base_id = SystemId::new(base);
    if let Some((archive, entry)) = base_id.archive_parts() {
        let dir = entry.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
        if location.starts_with('/') {
            segments.clear();
        }
        for segment in location.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
        return Some(format!("jar:{archive}!/{}", segments.join("/")));
    }
    Url::parse(base)
        .ok()?
        .join(location)
        .ok()
        .map(String::from)
}

/// Hoist the schema imports reachable through stylesheet imports and
/// includes onto each file node, dropping the stylesheet nodes.
///
/// Schema nodes keep their own subtrees. A schema reachable through several
/// stylesheet modules is kept once, at its first occurrence.
pub fn filter_schemas(tree: DependencyTree) -> DependencyTree {
    let files = tree
        .files
        .into_iter()
        .map(|file| {
            let mut hoisted = Vec::new();
            let mut kept = HashSet::new();
            collect_schemas(file.children, &mut hoisted, &mut kept);
            FileNode {
                abs_uri: file.abs_uri,
                children: hoisted,
            }
        })
        .collect();
    DependencyTree { files }
}

fn collect_schemas(
    nodes: Vec<DependencyNode>,
    hoisted: &mut Vec<DependencyNode>,
    kept: &mut HashSet<String>,
) {
    for node in nodes {
        match node {
            DependencyNode::SchemaImport(info) => {
                if kept.insert(info.abs_uri.clone()) {
                    hoisted.push(DependencyNode::SchemaImport(info));
                }
            }
            DependencyNode::Other(info) => collect_schemas(info.children, hoisted, kept),
        }
    }
}
