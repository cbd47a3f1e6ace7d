//! # gpc-schema — Schema Discovery
//!
//! A transform may import schemas (`xsl:import-schema`), and those schemas
//! may import or include further schemas. The compiled configuration needs
//! every one of them available under the output tree, addressable by a
//! `cp:/` access URI.
//!
//! - [`tree`]: the immutable dependency tree, with schema imports and other
//!   dependencies as distinct variants.
//! - [`extract`]: the [`DependencyExtractor`] seam and its native
//!   implementation, plus [`filter_schemas`], which hoists schema imports
//!   declared by imported stylesheet modules onto the transform itself.
//! - [`walker`]: the [`SchemaWalker`], which copies every schema node to its
//!   destination and returns the access URIs to record on the transform.

pub mod extract;
pub mod tree;
pub mod walker;

pub use extract::{filter_schemas, join_location, DependencyExtractor, StaticDependencyExtractor};
pub use tree::{DependencyKind, DependencyNode, DependencyTree, FileNode, NodeInfo};
pub use walker::{Discovery, MaterializedSchema, SchemaWalker, DEFAULT_SCHEMAS_DIR};
