//! Accumulated diagnostics.
//!
//! Per-document and per-transform failures are collected rather than
//! raised, so one run reports as many problems as possible.

use serde::Serialize;

use crate::error::{ErrorKind, GpcError};

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Degrades the output but does not fail the build.
    Warning,
    /// Fails the enclosing unit of work.
    Error,
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: ErrorKind,
    /// Offending reference or identity, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    pub message: String,
}

impl Diagnostic {
    /// Build a diagnostic of the given severity from an error.
    pub fn from_error(severity: Severity, err: &GpcError) -> Self {
        Self {
            severity,
            kind: err.kind(),
            identity: err.identity().map(str::to_string),
            message: err.to_string(),
        }
    }

    pub fn warning(err: &GpcError) -> Self {
        Self::from_error(Severity::Warning, err)
    }

    pub fn error(err: &GpcError) -> Self {
        Self::from_error(Severity::Error, err)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{level}] {}: {}", self.kind, self.message)
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Record `err` as a warning.
    pub fn warn(&mut self, err: &GpcError) {
        self.push(Diagnostic::warning(err));
    }

    /// Record `err` as an error.
    pub fn error(&mut self, err: &GpcError) {
        self.push(Diagnostic::error(err));
    }

    /// Record `err` as an error unless `cap` errors of the same kind are
    /// already present. Returns whether it was recorded.
    pub fn error_capped(&mut self, err: &GpcError, cap: usize) -> bool {
        let kind = err.kind();
        let already = self
            .entries
            .iter()
            .filter(|d| d.is_error() && d.kind == kind)
            .count();
        if already >= cap {
            return false;
        }
        self.error(err);
        true
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| !d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
