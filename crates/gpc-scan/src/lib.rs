//! # gpc-scan — Configuration Document Scanning
//!
//! Scanning is split in two phases:
//!
//! - [`ReferenceExtractor`] streams a configuration document and lazily
//!   yields every transform reference (`<xslt href="..."/>` in the pipeline
//!   configuration namespace). It does no resolution and holds no state
//!   beyond the parser.
//! - [`ConfigScanner`] consumes those references, resolves each one, and
//!   applies the failure policy: an unresolved `cp:/` reference is a warning
//!   and is dropped; any other unresolved reference fails the document, with
//!   at most [`MAX_URI_ERRORS`] diagnostics recorded per document.
//!
//! The result is a [`ScanOutcome`]. Registering it into the build-set
//! registry is the caller's job, so a failed document never leaves partial
//! state behind.

pub mod extractor;
pub mod scanner;

pub use extractor::{ReferenceExtractor, TransformReference, PIPE_CONFIG_NS, TRANSFORM_ELEMENT};
pub use scanner::{ConfigScanner, ScanOutcome, MAX_URI_ERRORS};
