//! # gpc-core — Foundational Types for the Gaulois-Pipe Compiler
//!
//! This crate is the leaf of the workspace DAG. It defines the identity
//! and bookkeeping types every other `gpc-*` crate builds on.
//!
//! ## Key Design Principles
//!
//! 1. **Identity is the deduplication key.** A [`SystemId`] is the resolved,
//!    stable identifier of a resource. Two references spelled differently
//!    that resolve to the same `SystemId` are the same compilation unit.
//!
//! 2. **Target paths are derived once.** [`TargetPath::derive`] is a pure
//!    function, and the [`BuildSetRegistry`] stores the path assigned on first
//!    registration so later lookups never re-derive it.
//!
//! 3. **One error enum.** [`GpcError`] has one variant per failure origin
//!    (resolution, scan, discovery, compile, configuration). Per-document and
//!    per-transform failures become [`Diagnostic`] values and are accumulated
//!    instead of aborting the run.
//!
//! 4. **No ambient state.** The registry is an explicit value owned by the
//!    build session, so independent builds (and tests) never share tables.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `gpc-*` crates.
//! - No I/O beyond path canonicalization in [`SystemId::from_path`].
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod diagnostic;
pub mod error;
pub mod identity;
pub mod registry;

// Re-export primary types for ergonomic imports.
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error::{ErrorKind, GpcError, GpcResult};
pub use identity::{
    normalize_lexically, SystemId, TargetPath, ARCHIVE_SEPARATOR, CLASSPATH_SCHEME,
    COMPILED_EXTENSION,
};
pub use registry::{BuildSetRegistry, ConfigSet, TransformUnit};
