//! # Config Scanner
//!
//! Resolves the references a [`ReferenceExtractor`] yields and decides, per
//! reference, whether a resolution failure is tolerable:
//!
//! | reference      | unresolved means                                  |
//! |----------------|---------------------------------------------------|
//! | `cp:/<path>`   | warning; the reference is dropped                 |
//! | anything else  | error; the document fails (diagnostics capped)    |
//!
//! A scan error (malformed XML, missing `href`) fails the document and stops
//! reading it. The scanner never touches the registry.

use std::collections::HashSet;
use std::io::{BufRead, BufReader};

use gpc_core::{Diagnostics, GpcError, GpcResult, SystemId};
use gpc_resolve::{ResolvedResource, ResourceResolver, SymbolicReference};
use tracing::{debug, error, warn};

use crate::extractor::{ReferenceExtractor, TransformReference};

/// Maximum number of resolution errors recorded for one document.
pub const MAX_URI_ERRORS: usize = 10;

/// Result of scanning one configuration document.
#[derive(Debug)]
pub struct ScanOutcome {
    pub document: SystemId,
    /// The document must not be registered or compiled.
    pub failed: bool,
    pub diagnostics: Diagnostics,
    /// Resolved transforms, in order of first reference, without duplicates.
    pub transforms: Vec<ResolvedResource>,
}

impl ScanOutcome {
    fn new(document: SystemId) -> Self {
        Self {
            document,
            failed: false,
            diagnostics: Diagnostics::new(),
            transforms: Vec::new(),
        }
    }

    fn fail(&mut self, err: &GpcError) {
        self.failed = true;
        self.diagnostics.error(err);
    }
}

/// Scans configuration documents against one resolver.
#[derive(Debug, Clone, Copy)]
pub struct ConfigScanner<'a> {
    resolver: &'a ResourceResolver,
}

impl<'a> ConfigScanner<'a> {
    pub fn new(resolver: &'a ResourceResolver) -> Self {
        Self { resolver }
    }

    /// Open and scan a resolved configuration document.
    pub fn scan_resource(&self, document: &ResolvedResource) -> ScanOutcome {
        match document.open() {
            Ok(stream) => self.scan_reader(document.identity(), BufReader::new(stream)),
            Err(e) => {
                let mut outcome = ScanOutcome::new(document.identity().clone());
                let err = GpcError::scan(document.identity().as_str(), e.to_string());
                error!(identity = %document.identity(), error = %e, "cannot read configuration document");
                outcome.fail(&err);
                outcome
            }
        }
    }

    /// Scan a document from an already opened stream.
    pub fn scan_reader<R: BufRead>(&self, document: &SystemId, reader: R) -> ScanOutcome {
        let references = ReferenceExtractor::new(reader, document.as_str());
        self.scan_references(document, references)
    }

    /// Resolve a stream of extracted references for `document`.
    pub fn scan_references<I>(&self, document: &SystemId, references: I) -> ScanOutcome
    where
        I: IntoIterator<Item = GpcResult<TransformReference>>,
    {
        let mut outcome = ScanOutcome::new(document.clone());
        let mut seen = HashSet::new();

        for reference in references {
            let reference = match reference {
                Ok(reference) => reference,
                Err(err) => {
                    error!(identity = %document, error = %err, "configuration document is invalid");
                    outcome.fail(&err);
                    break;
                }
            };
            debug!(identity = %document, href = %reference.href, "transform reference");

            match self.resolver.resolve(&reference.href) {
                Ok(resource) => {
                    if seen.insert(resource.identity().clone()) {
                        outcome.transforms.push(resource);
                    }
                }
                Err(err) if SymbolicReference::parse(&reference.href).is_classpath() => {
                    warn!(href = %reference.href, identity = %document, "transform not found, it won't be compiled");
                    outcome.diagnostics.warn(&err);
                }
                Err(err) => {
                    outcome.failed = true;
                    if outcome.diagnostics.error_capped(&err, MAX_URI_ERRORS) {
                        error!(href = %reference.href, identity = %document, "unresolvable reference");
                    }
                }
            }
        }

        if outcome.failed {
            error!(identity = %document, "configuration document failed scanning");
        }
        outcome
    }
}
