//! # gpc-resolve — Reference Resolution
//!
//! Turns a symbolic reference found in a configuration or transform
//! document into a concrete, openable resource with a stable identity.
//!
//! ## Resolution order
//!
//! For `cp:/<path>` references ([`ResourceResolver::resolve`]):
//!
//! 1. every search root in order, first existing `<root>/<path>` wins;
//! 2. the catalog resolver;
//! 3. every classpath entry in order (archives and directories).
//!
//! Any other reference goes to the catalog resolver only.
//!
//! ## Materialization
//!
//! [`copy_resource`] copies the bytes behind a system identifier to a local
//! file, creating parent directories and renaming a fully written temporary
//! file into place.

pub mod catalog;
pub mod classpath;
pub mod materialize;
pub mod reference;
pub mod resolver;
pub mod resource;
pub mod xml;

pub use catalog::{CatalogResolver, NoCatalog, XmlCatalog};
pub use classpath::ClasspathEntry;
pub use materialize::copy_resource;
pub use reference::SymbolicReference;
pub use resolver::ResourceResolver;
pub use resource::{open_system_id, ResolvedResource, SourceKind};
