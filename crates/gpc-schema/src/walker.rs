//! # Schema Discovery Walker
//!
//! Materializes the schemas a transform depends on:
//!
//! - top-level schema imports go to `<schemas destination>/<name>`;
//! - nested schemas go to `<parent's materialized directory>/<declared
//!   location>`, lexically normalized, so relative references between
//!   schema files keep working in the output tree.
//!
//! Each materialized file is addressed by `cp:/<path relative to the output
//! root>`. A schema that cannot be copied is a warning: it and its subtree
//! are skipped and the walk continues with its siblings.
//!
//! Every file written is claimed in the [`BuildSetRegistry`] with its
//! source URI, so two different schemas never share a file. A top-level
//! schema whose name is already taken by another source moves to
//! `<schemas destination>/<transform's directory>/<name>`; any other clash
//! is a warning and the schema is skipped.

use std::path::{Component, Path, PathBuf};

use gpc_core::{
    normalize_lexically, BuildSetRegistry, Diagnostics, GpcError, GpcResult, SystemId,
    CLASSPATH_SCHEME,
};
use gpc_resolve::copy_resource;
use tracing::{debug, info, warn};
use url::Url;

use crate::extract::{filter_schemas, DependencyExtractor};
use crate::tree::{DependencyNode, NodeInfo};

/// Schemas destination relative to the output root when none is configured.
pub const DEFAULT_SCHEMAS_DIR: &str = "gc/schemas";

/// One schema copied under the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedSchema {
    /// `cp:/` URI the compiled configuration uses to load the schema.
    pub access_uri: String,
    pub file: PathBuf,
    /// Where the bytes came from.
    pub source: String,
}

/// Result of discovering the schemas of one transform.
#[derive(Debug, Default)]
pub struct Discovery {
    pub schemas: Vec<MaterializedSchema>,
    pub warnings: Diagnostics,
}

impl Discovery {
    pub fn access_uris(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(|s| s.access_uri.as_str())
    }
}

/// Walks dependency trees and copies schemas under the output root.
#[derive(Debug)]
pub struct SchemaWalker<'a> {
    output_root: PathBuf,
    schemas_destination: PathBuf,
    extractor: &'a dyn DependencyExtractor,
}

impl<'a> SchemaWalker<'a> {
    pub fn new(
        output_root: impl Into<PathBuf>,
        schemas_destination: impl Into<PathBuf>,
        extractor: &'a dyn DependencyExtractor,
    ) -> Self {
        Self {
            output_root: output_root.into(),
            schemas_destination: schemas_destination.into(),
            extractor,
        }
    }

    /// Walker writing schemas to `<output_root>/gc/schemas`.
    pub fn with_default_destination(
        output_root: impl Into<PathBuf>,
        extractor: &'a dyn DependencyExtractor,
    ) -> Self {
        let output_root = output_root.into();
        let schemas_destination = output_root.join(DEFAULT_SCHEMAS_DIR);
        Self::new(output_root, schemas_destination, extractor)
    }

    pub fn schemas_destination(&self) -> &Path {
        &self.schemas_destination
    }

    /// Discover and materialize every schema `transform` depends on.
    ///
    /// `base_dir` is the transform's output directory relative to the output
    /// root; it separates same-named schemas of different transforms.
    ///
    /// # Errors
    ///
    /// [`GpcError::Discovery`] when the dependency tree cannot be built.
    /// Per-schema failures are returned as warnings instead.
    pub fn discover(
        &self,
        transform: &SystemId,
        base_dir: &Path,
        claims: &mut BuildSetRegistry,
    ) -> GpcResult<Discovery> {
        let tree = self
            .extractor
            .extract(transform, true)
            .map_err(|e| match e {
                GpcError::Discovery { .. } => e,
                other => GpcError::discovery(transform.as_str(), other.to_string()),
            })?;

        let mut discovery = Discovery::default();
        let Some(file) = filter_schemas(tree).files.into_iter().next() else {
            return Ok(discovery);
        };
        for node in &file.children {
            if let DependencyNode::SchemaImport(info) = node {
                let dest = normalize_lexically(&self.schemas_destination.join(&info.name));
                let dest = match claims.claim_schema_file(&dest, &info.abs_uri) {
                    Ok(()) => dest,
                    Err(_) => {
                        let moved = normalize_lexically(
                            &self.schemas_destination.join(base_dir).join(&info.name),
                        );
                        info!(
                            schema = %info.abs_uri,
                            dest = %moved.display(),
                            "schema name already taken, placed under the transform's directory"
                        );
                        moved
                    }
                };
                self.materialize(info, dest, claims, &mut discovery);
            }
        }
        debug!(
            identity = %transform,
            schemas = discovery.schemas.len(),
            "schema discovery finished"
        );
        Ok(discovery)
    }

    fn materialize(
        &self,
        info: &NodeInfo,
        dest: PathBuf,
        claims: &mut BuildSetRegistry,
        discovery: &mut Discovery,
    ) {
        let Some(access_uri) = self.access_uri(&dest) else {
            let err = GpcError::discovery(
                info.abs_uri.as_str(),
                format!("{} is outside the output directory", dest.display()),
            );
            warn!(schema = %info.abs_uri, dest = %dest.display(), "schema destination outside output");
            discovery.warnings.warn(&err);
            return;
        };

        if let Err(err) = claims.claim_schema_file(&dest, &info.abs_uri) {
            warn!(schema = %info.abs_uri, dest = %dest.display(), "schema file already holds another schema");
            discovery.warnings.warn(&err);
            return;
        }

        if let Err(e) = copy_resource(&SystemId::new(info.abs_uri.as_str()), &dest) {
            let err = GpcError::discovery(
                info.abs_uri.as_str(),
                format!("cannot copy schema to {}: {e}", dest.display()),
            );
            warn!(schema = %info.abs_uri, error = %e, "schema not materialized, schema list degraded");
            discovery.warnings.warn(&err);
            return;
        }
        debug!(schema = %info.abs_uri, access_uri = %access_uri, "schema materialized");
        discovery.schemas.push(MaterializedSchema {
            access_uri,
            file: dest.clone(),
            source: info.abs_uri.clone(),
        });

        let parent = dest.parent().map(Path::to_path_buf).unwrap_or_default();
        for child in &info.children {
            if let DependencyNode::SchemaImport(nested) = child {
                let nested_dest = if is_absolute_uri(&nested.uri) {
                    parent.join(&nested.name)
                } else {
                    normalize_lexically(&parent.join(&nested.uri))
                };
                self.materialize(nested, nested_dest, claims, discovery);
            }
        }
    }

    fn access_uri(&self, dest: &Path) -> Option<String> {
        let dest = normalize_lexically(dest);
        let root = normalize_lexically(&self.output_root);
        let relative = dest.strip_prefix(&root).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Option<_>>()?;
        if segments.is_empty() {
            return None;
        }
        Some(format!("{CLASSPATH_SCHEME}{}", segments.join("/")))
    }
}

fn is_absolute_uri(location: &str) -> bool {
    Url::parse(location).is_ok_and(|url| url.scheme().len() > 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::StaticDependencyExtractor;
    use crate::tree::{DependencyKind, DependencyTree, FileNode};
    use gpc_core::ErrorKind;
    use gpc_resolve::ResourceResolver;

    const XSL: &str = "http://www.w3.org/1999/XSL/Transform";
    const XSD: &str = "http://www.w3.org/2001/XMLSchema";

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn stylesheet(body: &str) -> String {
        format!(r#"<xsl:stylesheet xmlns:xsl="{XSL}" version="3.0">{body}</xsl:stylesheet>"#)
    }

    fn schema(body: &str) -> String {
        format!(r#"<xs:schema xmlns:xs="{XSD}">{body}</xs:schema>"#)
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        src: PathBuf,
        out: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        std::fs::create_dir_all(&src).unwrap();
        Fixture { _dir: dir, src, out }
    }

    fn discover(fx: &Fixture, transform: &str) -> Discovery {
        let resolver = ResourceResolver::with_search_roots(vec![fx.src.clone()]);
        let extractor = StaticDependencyExtractor::new(&resolver);
        let walker = SchemaWalker::with_default_destination(&fx.out, &extractor);
        let mut claims = BuildSetRegistry::new();
        walker
            .discover(
                &SystemId::from_path(&fx.src.join(transform)).unwrap(),
                Path::new(""),
                &mut claims,
            )
            .unwrap()
    }

    #[test]
    fn top_level_schema_goes_to_destination() {
        let fx = fixture();
        write(
            &fx.src.join("t.xsl"),
            &stylesheet(r#"<xsl:import-schema schema-location="xsd/a.xsd"/>"#),
        );
        write(&fx.src.join("xsd/a.xsd"), &schema(""));

        let discovery = discover(&fx, "t.xsl");
        assert!(discovery.warnings.is_empty());
        let uris: Vec<&str> = discovery.access_uris().collect();
        assert_eq!(uris, ["cp:/gc/schemas/a.xsd"]);
        assert!(fx.out.join("gc/schemas/a.xsd").is_file());
    }

    #[test]
    fn nested_schemas_follow_parent_directory() {
        let fx = fixture();
        write(
            &fx.src.join("t.xsl"),
            &stylesheet(r#"<xsl:import-schema schema-location="xsd/a.xsd"/>"#),
        );
        write(
            &fx.src.join("xsd/a.xsd"),
            &schema(
                r#"<xs:include schemaLocation="inc/b.xsd"/>
                   <xs:import namespace="urn:c" schemaLocation="../common/c.xsd"/>"#,
            ),
        );
        write(&fx.src.join("xsd/inc/b.xsd"), &schema(""));
        write(&fx.src.join("common/c.xsd"), &schema(""));

        let discovery = discover(&fx, "t.xsl");
        let uris: Vec<&str> = discovery.access_uris().collect();
        assert_eq!(
            uris,
            [
                "cp:/gc/schemas/a.xsd",
                "cp:/gc/schemas/inc/b.xsd",
                "cp:/gc/common/c.xsd"
            ]
        );
        assert!(fx.out.join("gc/schemas/inc/b.xsd").is_file());
        assert!(fx.out.join("gc/common/c.xsd").is_file());
    }

    #[test]
    fn schemas_of_imported_modules_are_discovered() {
        let fx = fixture();
        write(&fx.src.join("t.xsl"), &stylesheet(r#"<xsl:include href="lib/m.xsl"/>"#));
        write(
            &fx.src.join("lib/m.xsl"),
            &stylesheet(r#"<xsl:import-schema schema-location="m.xsd"/>"#),
        );
        write(&fx.src.join("lib/m.xsd"), &schema(""));

        let discovery = discover(&fx, "t.xsl");
        let uris: Vec<&str> = discovery.access_uris().collect();
        assert_eq!(uris, ["cp:/gc/schemas/m.xsd"]);
    }

    #[test]
    fn missing_schema_is_a_warning_and_siblings_continue() {
        let fx = fixture();
        write(
            &fx.src.join("t.xsl"),
            &stylesheet(
                r#"<xsl:import-schema schema-location="gone.xsd"/>
                   <xsl:import-schema schema-location="ok.xsd"/>"#,
            ),
        );
        write(&fx.src.join("ok.xsd"), &schema(""));

        let discovery = discover(&fx, "t.xsl");
        let uris: Vec<&str> = discovery.access_uris().collect();
        assert_eq!(uris, ["cp:/gc/schemas/ok.xsd"]);
        assert_eq!(discovery.warnings.warnings().count(), 1);
        assert_eq!(
            discovery.warnings.iter().next().unwrap().kind,
            ErrorKind::Discovery
        );
        assert!(!fx.out.join("gc/schemas/gone.xsd").exists());
    }

    #[test]
    fn transform_without_schemas_discovers_nothing() {
        let fx = fixture();
        write(&fx.src.join("t.xsl"), &stylesheet(r#"<xsl:template match="/"/>"#));
        let discovery = discover(&fx, "t.xsl");
        assert!(discovery.schemas.is_empty());
        assert!(discovery.warnings.is_empty());
    }

    #[test]
    fn unreadable_transform_is_discovery_error() {
        let resolver = ResourceResolver::with_search_roots(Vec::new());
        let extractor = StaticDependencyExtractor::new(&resolver);
        let walker = SchemaWalker::with_default_destination("/tmp/out", &extractor);
        let err = walker
            .discover(
                &SystemId::new("file:///nonexistent/t.xsl"),
                Path::new(""),
                &mut BuildSetRegistry::new(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Discovery);
    }

    #[derive(Debug)]
    struct FixedTree(DependencyTree);

    impl DependencyExtractor for FixedTree {
        fn extract(&self, _: &SystemId, _: bool) -> GpcResult<DependencyTree> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn destination_outside_output_is_a_warning() {
        let fx = fixture();
        write(&fx.src.join("a.xsd"), &schema(""));
        let abs = SystemId::from_path(&fx.src.join("a.xsd")).unwrap();
        let extractor = FixedTree(DependencyTree {
            files: vec![FileNode {
                abs_uri: "file:///t.xsl".into(),
                children: vec![DependencyNode::from_info(NodeInfo::new(
                    DependencyKind::ImportSchema,
                    "a.xsd",
                    abs.as_str(),
                ))],
            }],
        });
        let elsewhere = fx.out.parent().unwrap().join("elsewhere");
        let walker = SchemaWalker::new(&fx.out, &elsewhere, &extractor);

        let discovery = walker
            .discover(
                &SystemId::new("file:///t.xsl"),
                Path::new(""),
                &mut BuildSetRegistry::new(),
            )
            .unwrap();
        assert!(discovery.schemas.is_empty());
        assert_eq!(discovery.warnings.len(), 1);
    }

    #[test]
    fn same_named_schemas_of_two_transforms_do_not_overwrite() {
        let fx = fixture();
        for dir in ["a", "b"] {
            write(
                &fx.src.join(format!("{dir}/t.xsl")),
                &stylesheet(r#"<xsl:import-schema schema-location="common.xsd"/>"#),
            );
            write(
                &fx.src.join(format!("{dir}/common.xsd")),
                &format!("<schema-from-{dir}/>"),
            );
        }
        let resolver = ResourceResolver::with_search_roots(vec![fx.src.clone()]);
        let extractor = StaticDependencyExtractor::new(&resolver);
        let walker = SchemaWalker::with_default_destination(&fx.out, &extractor);
        let mut claims = BuildSetRegistry::new();

        let first = walker
            .discover(
                &SystemId::from_path(&fx.src.join("a/t.xsl")).unwrap(),
                Path::new("a"),
                &mut claims,
            )
            .unwrap();
        let second = walker
            .discover(
                &SystemId::from_path(&fx.src.join("b/t.xsl")).unwrap(),
                Path::new("b"),
                &mut claims,
            )
            .unwrap();

        assert_eq!(first.access_uris().collect::<Vec<_>>(), ["cp:/gc/schemas/common.xsd"]);
        assert_eq!(
            second.access_uris().collect::<Vec<_>>(),
            ["cp:/gc/schemas/b/common.xsd"]
        );
        assert_eq!(
            std::fs::read_to_string(fx.out.join("gc/schemas/common.xsd")).unwrap(),
            "<schema-from-a/>"
        );
        assert_eq!(
            std::fs::read_to_string(fx.out.join("gc/schemas/b/common.xsd")).unwrap(),
            "<schema-from-b/>"
        );
    }

    #[test]
    fn clashing_nested_schema_is_a_warning() {
        let fx = fixture();
        write(
            &fx.src.join("t.xsl"),
            &stylesheet(r#"<xsl:import-schema schema-location="xsd/a.xsd"/>"#),
        );
        write(
            &fx.src.join("xsd/a.xsd"),
            &schema(r#"<xs:include schemaLocation="inc/b.xsd"/>"#),
        );
        write(&fx.src.join("xsd/inc/b.xsd"), &schema(""));

        let resolver = ResourceResolver::with_search_roots(vec![fx.src.clone()]);
        let extractor = StaticDependencyExtractor::new(&resolver);
        let walker = SchemaWalker::with_default_destination(&fx.out, &extractor);
        let mut claims = BuildSetRegistry::new();
        let taken = normalize_lexically(&fx.out.join("gc/schemas/inc/b.xsd"));
        claims
            .claim_schema_file(&taken, "file:///elsewhere/b.xsd")
            .unwrap();

        let discovery = walker
            .discover(
                &SystemId::from_path(&fx.src.join("t.xsl")).unwrap(),
                Path::new(""),
                &mut claims,
            )
            .unwrap();
        assert_eq!(discovery.access_uris().collect::<Vec<_>>(), ["cp:/gc/schemas/a.xsd"]);
        assert_eq!(discovery.warnings.warnings().count(), 1);
        assert!(!taken.exists());
    }
}
