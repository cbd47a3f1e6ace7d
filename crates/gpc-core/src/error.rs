//! # Error Types — Unified Failure Taxonomy
//!
//! Every failure the compiler can report falls into exactly one
//! [`ErrorKind`]. [`GpcError`] carries the kind as its variant together with
//! the offending identity (a reference, a system identifier, or a path) and
//! a human-readable message.
//!
//! ## Severity is decided by the caller
//!
//! The same variant can be fatal or not depending on where it is raised:
//! an unresolved `cp:/` reference is only a warning for the scanner, while
//! an unresolved catalog reference fails the enclosing document. Callers
//! turn errors into [`Diagnostic`](crate::Diagnostic)s with the severity
//! their policy requires.

use serde::Serialize;
use thiserror::Error;

/// Failure origin, used to tag diagnostics and to cap repeated errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A symbolic reference could not be resolved by any strategy.
    ReferenceResolution,
    /// A configuration document is malformed or misses a required attribute.
    Scan,
    /// Dependency-tree extraction or schema materialization failed.
    Discovery,
    /// The external compiler rejected a resource.
    Compile,
    /// The build itself is misconfigured.
    Configuration,
    /// Unclassified I/O failure.
    Io,
}

impl ErrorKind {
    /// Stable lowercase label used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReferenceResolution => "reference-resolution",
            Self::Scan => "scan",
            Self::Discovery => "discovery",
            Self::Compile => "compile",
            Self::Configuration => "configuration",
            Self::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for the gaulois-pipe compiler.
#[derive(Error, Debug)]
pub enum GpcError {
    /// A `cp:/` or catalog reference could not be resolved.
    #[error("{reference} could not be resolved: {message}")]
    ReferenceResolution {
        /// The reference as written in the document.
        reference: String,
        /// Why resolution failed.
        message: String,
    },

    /// A configuration document could not be scanned.
    #[error("while scanning {identity}: {message}")]
    Scan {
        /// System identifier of the document.
        identity: String,
        /// What was wrong with it.
        message: String,
    },

    /// Schema discovery for a transform failed or was incomplete.
    #[error("schema discovery for {identity}: {message}")]
    Discovery {
        /// System identifier of the transform or schema.
        identity: String,
        /// What failed.
        message: String,
    },

    /// The external compiler rejected a resource.
    #[error("while compiling {identity}: {message}")]
    Compile {
        /// System identifier of the compiled resource.
        identity: String,
        /// Compiler failure detail.
        message: String,
    },

    /// The build configuration is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GpcError {
    /// The taxonomy tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ReferenceResolution { .. } => ErrorKind::ReferenceResolution,
            Self::Scan { .. } => ErrorKind::Scan,
            Self::Discovery { .. } => ErrorKind::Discovery,
            Self::Compile { .. } => ErrorKind::Compile,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// The offending reference or identity, when the error has one.
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::ReferenceResolution { reference, .. } => Some(reference),
            Self::Scan { identity, .. }
            | Self::Discovery { identity, .. }
            | Self::Compile { identity, .. } => Some(identity),
            Self::Configuration(_) | Self::Io(_) => None,
        }
    }

    /// Shorthand for a [`GpcError::Scan`].
    pub fn scan(identity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scan {
            identity: identity.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`GpcError::Discovery`].
    pub fn discovery(identity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Discovery {
            identity: identity.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`GpcError::Compile`].
    pub fn compile(identity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Compile {
            identity: identity.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`GpcError::ReferenceResolution`].
    pub fn unresolved(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReferenceResolution {
            reference: reference.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for compiler operations.
pub type GpcResult<T> = Result<T, GpcError>;
