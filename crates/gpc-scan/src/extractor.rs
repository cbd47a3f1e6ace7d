//! Streaming extraction of transform references.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use gpc_core::{GpcError, GpcResult};
use gpc_resolve::xml::attribute;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

/// Namespace of pipeline configuration documents.
pub const PIPE_CONFIG_NS: &str = "http://efl.fr/chaine/saxon-pipe/config";

/// Local name of the transform reference element.
pub const TRANSFORM_ELEMENT: &str = "xslt";

/// One `<xslt href="..."/>` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformReference {
    pub href: String,
    /// Byte offset of the element in the document.
    pub position: u64,
}

/// Lazy iterator over the transform references of one document.
///
/// Yields `Err` once, then stops, when the document is malformed or an
/// `xslt` element has no `href`.
pub struct ReferenceExtractor<R: BufRead> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    document: String,
    done: bool,
}

impl ReferenceExtractor<BufReader<File>> {
    /// Stream the document at `path`; `document` names it in errors.
    pub fn from_file(path: &Path, document: impl Into<String>) -> GpcResult<Self> {
        let document = document.into();
        let file = File::open(path).map_err(|e| GpcError::scan(&document, e.to_string()))?;
        Ok(Self::new(BufReader::new(file), document))
    }
}

impl<R: BufRead> ReferenceExtractor<R> {
    pub fn new(reader: R, document: impl Into<String>) -> Self {
        Self {
            reader: NsReader::from_reader(reader),
            buf: Vec::new(),
            document: document.into(),
            done: false,
        }
    }

    fn fail(&mut self, message: String) -> Option<GpcResult<TransformReference>> {
        self.done = true;
        Some(Err(GpcError::scan(&self.document, message)))
    }
}

impl<R: BufRead> Iterator for ReferenceExtractor<R> {
    type Item = GpcResult<TransformReference>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.buf.clear();
            let position = self.reader.buffer_position() as u64;
            let href = match self.reader.read_resolved_event_into(&mut self.buf) {
                Err(e) => Err(format!("malformed XML near byte {position}: {e}")),
                Ok((_, Event::Eof)) => {
                    self.done = true;
                    return None;
                }
                Ok((ResolveResult::Bound(Namespace(ns)), Event::Start(e) | Event::Empty(e)))
                    if ns == PIPE_CONFIG_NS.as_bytes()
                        && e.local_name().as_ref() == TRANSFORM_ELEMENT.as_bytes() =>
                {
                    match attribute(&e, "href") {
                        Ok(Some(href)) => Ok(href),
                        Ok(None) => Err(format!(
                            "{TRANSFORM_ELEMENT} element near byte {position} has no href attribute"
                        )),
                        Err(reason) => Err(format!("bad attribute near byte {position}: {reason}")),
                    }
                }
                Ok(_) => continue,
            };
            return match href {
                Ok(href) => Some(Ok(TransformReference { href, position })),
                Err(message) => self.fail(message),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpc_core::ErrorKind;

    fn extract(xml: &str) -> Vec<GpcResult<TransformReference>> {
        ReferenceExtractor::new(xml.as_bytes(), "file:///p.xml").collect()
    }

    #[test]
    fn yields_references_in_document_order() {
        let refs = extract(
            r#"<config xmlns="http://efl.fr/chaine/saxon-pipe/config">
                 <pipe>
                   <xslt href="cp:/a.xsl"/>
                   <xslt href="urn:efl:b"><param name="x" value="1"/></xslt>
                 </pipe>
               </config>"#,
        );
        let hrefs: Vec<String> = refs.into_iter().map(|r| r.unwrap().href).collect();
        assert_eq!(hrefs, ["cp:/a.xsl", "urn:efl:b"]);
    }

    #[test]
    fn ignores_xslt_elements_in_other_namespaces() {
        let refs = extract(
            r#"<config xmlns="http://efl.fr/chaine/saxon-pipe/config" xmlns:o="urn:other">
                 <o:xslt href="cp:/ignored.xsl"/>
                 <xslt href="cp:/kept.xsl"/>
               </config>"#,
        );
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].as_ref().unwrap().href, "cp:/kept.xsl");
    }

    #[test]
    fn prefixed_namespace_is_recognized() {
        let refs = extract(
            r#"<g:config xmlns:g="http://efl.fr/chaine/saxon-pipe/config">
                 <g:xslt href="cp:/p.xsl"/>
               </g:config>"#,
        );
        assert_eq!(refs[0].as_ref().unwrap().href, "cp:/p.xsl");
    }

    #[test]
    fn missing_href_ends_extraction_with_scan_error() {
        let refs = extract(
            r#"<config xmlns="http://efl.fr/chaine/saxon-pipe/config">
                 <xslt/>
                 <xslt href="cp:/never-reached.xsl"/>
               </config>"#,
        );
        assert_eq!(refs.len(), 1);
        let err = refs.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Scan);
        assert!(err.to_string().contains("no href"));
    }

    #[test]
    fn malformed_document_is_scan_error() {
        let refs = extract(
            r#"<config xmlns="http://efl.fr/chaine/saxon-pipe/config"><xslt href="cp:/a.xsl"/></wrong>"#,
        );
        assert!(refs.last().unwrap().is_err());
    }

    #[test]
    fn missing_file_is_scan_error() {
        let err = ReferenceExtractor::from_file(Path::new("/nonexistent/p.xml"), "p.xml")
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Scan);
    }
}
