//! Symbolic references as written in documents.

use gpc_core::CLASSPATH_SCHEME;

/// A reference read from an `href` (or similar) attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolicReference {
    /// `cp:/<path>`: resolved against search roots, the catalog, then the
    /// classpath.
    Classpath {
        href: String,
        /// Path after `cp:/`, without leading slashes.
        path: String,
    },
    /// Anything else: only the catalog can resolve it.
    Opaque(String),
}

impl SymbolicReference {
    pub fn parse(href: &str) -> Self {
        match href.strip_prefix(CLASSPATH_SCHEME) {
            Some(path) => Self::Classpath {
                href: href.to_string(),
                path: path.trim_start_matches('/').to_string(),
            },
            None => Self::Opaque(href.to_string()),
        }
    }

    pub fn href(&self) -> &str {
        match self {
            Self::Classpath { href, .. } => href,
            Self::Opaque(href) => href,
        }
    }

    pub fn is_classpath(&self) -> bool {
        matches!(self, Self::Classpath { .. })
    }
}

impl std::fmt::Display for SymbolicReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.href())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classpath_reference_keeps_relative_path() {
        let r = SymbolicReference::parse("cp:/steps/normalize.xsl");
        assert!(r.is_classpath());
        match r {
            SymbolicReference::Classpath { href, path } => {
                assert_eq!(href, "cp:/steps/normalize.xsl");
                assert_eq!(path, "steps/normalize.xsl");
            }
            SymbolicReference::Opaque(_) => unreachable!(),
        }
    }

    #[test]
    fn extra_slashes_are_dropped() {
        match SymbolicReference::parse("cp:///a.xsl") {
            SymbolicReference::Classpath { path, .. } => assert_eq!(path, "a.xsl"),
            SymbolicReference::Opaque(_) => unreachable!(),
        }
    }

    #[test]
    fn other_schemes_are_opaque() {
        let r = SymbolicReference::parse("urn:efl:xsl:normalize");
        assert!(!r.is_classpath());
        assert_eq!(r.href(), "urn:efl:xsl:normalize");
        // "cp:" without the slash is not the logical-root form.
        assert!(!SymbolicReference::parse("cp:a.xsl").is_classpath());
    }
}
