//! Dependency tree of a transform.
//!
//! Built once by an extractor and never mutated afterwards; filtering
//! produces a new tree.

/// XSLT namespace.
pub const XSL_NS: &str = "http://www.w3.org/1999/XSL/Transform";

/// XML Schema namespace.
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Declaration that introduced a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// `xsl:import`
    XslImport,
    /// `xsl:include`
    XslInclude,
    /// `xsl:import-schema`
    ImportSchema,
    /// `xs:import`
    XsdImport,
    /// `xs:include`
    XsdInclude,
    /// `xs:redefine`
    XsdRedefine,
    /// `xs:override`
    XsdOverride,
}

impl DependencyKind {
    /// Classify an element by namespace and local name.
    pub fn from_element(namespace: &[u8], local_name: &[u8]) -> Option<Self> {
        if namespace == XSL_NS.as_bytes() {
            match local_name {
                b"import" => Some(Self::XslImport),
                b"include" => Some(Self::XslInclude),
                b"import-schema" => Some(Self::ImportSchema),
                _ => None,
            }
        } else if namespace == XSD_NS.as_bytes() {
            match local_name {
                b"import" => Some(Self::XsdImport),
                b"include" => Some(Self::XsdInclude),
                b"redefine" => Some(Self::XsdRedefine),
                b"override" => Some(Self::XsdOverride),
                _ => None,
            }
        } else {
            None
        }
    }

    /// Attribute holding the dependency's location.
    pub fn location_attribute(self) -> &'static str {
        match self {
            Self::XslImport | Self::XslInclude => "href",
            Self::ImportSchema => "schema-location",
            Self::XsdImport | Self::XsdInclude | Self::XsdRedefine | Self::XsdOverride => {
                "schemaLocation"
            }
        }
    }

    /// Whether the dependency is a schema document.
    pub fn is_schema(self) -> bool {
        !matches!(self, Self::XslImport | Self::XslInclude)
    }
}

/// Payload shared by every dependency node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub kind: DependencyKind,
    /// Location as declared in the parent document.
    pub uri: String,
    /// Location resolved against the parent document.
    pub abs_uri: String,
    /// Last segment of the declared location.
    pub name: String,
    pub children: Vec<DependencyNode>,
}

impl NodeInfo {
    pub fn new(kind: DependencyKind, uri: impl Into<String>, abs_uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let name = file_name(&uri).to_string();
        Self {
            kind,
            uri,
            abs_uri: abs_uri.into(),
            name,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<DependencyNode>) -> Self {
        self.children = children;
        self
    }
}

/// A node of the tree: schemas are materialized, everything else is only
/// traversed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyNode {
    SchemaImport(NodeInfo),
    Other(NodeInfo),
}

impl DependencyNode {
    /// Tag `info` according to its kind.
    pub fn from_info(info: NodeInfo) -> Self {
        if info.kind.is_schema() {
            Self::SchemaImport(info)
        } else {
            Self::Other(info)
        }
    }

    pub fn info(&self) -> &NodeInfo {
        match self {
            Self::SchemaImport(info) | Self::Other(info) => info,
        }
    }

    pub fn into_info(self) -> NodeInfo {
        match self {
            Self::SchemaImport(info) | Self::Other(info) => info,
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, Self::SchemaImport(_))
    }
}

/// Root of a tree: one analyzed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub abs_uri: String,
    pub children: Vec<DependencyNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyTree {
    pub files: Vec<FileNode>,
}

/// Last path segment of a location, without query or fragment.
fn file_name(location: &str) -> &str {
    let end = location.find(|c: char| c == '?' || c == '#').unwrap_or(location.len());
    let path = &location[..end];
    path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_elements() {
        assert_eq!(
            DependencyKind::from_element(XSL_NS.as_bytes(), b"import-schema"),
            Some(DependencyKind::ImportSchema)
        );
        assert_eq!(
            DependencyKind::from_element(XSD_NS.as_bytes(), b"redefine"),
            Some(DependencyKind::XsdRedefine)
        );
        assert_eq!(DependencyKind::from_element(b"urn:other", b"import"), None);
        assert_eq!(DependencyKind::from_element(XSL_NS.as_bytes(), b"template"), None);
    }

    #[test]
    fn name_is_last_segment() {
        let info = NodeInfo::new(DependencyKind::XsdInclude, "../common/types.xsd?v=2", "x");
        assert_eq!(info.name, "types.xsd");
        let info = NodeInfo::new(DependencyKind::ImportSchema, "plain.xsd", "x");
        assert_eq!(info.name, "plain.xsd");
    }

    #[test]
    fn nodes_are_tagged_by_kind() {
        let schema = DependencyNode::from_info(NodeInfo::new(DependencyKind::XsdImport, "a", "a"));
        let other = DependencyNode::from_info(NodeInfo::new(DependencyKind::XslInclude, "b", "b"));
        assert!(schema.is_schema());
        assert!(!other.is_schema());
    }
}
