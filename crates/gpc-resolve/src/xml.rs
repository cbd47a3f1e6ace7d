//! Small helpers over `quick-xml` shared by the catalog loader, the config
//! scanner and the dependency-tree extractor.

use quick_xml::events::BytesStart;

/// Unescaped value of attribute `name` (qualified name as written).
///
/// The error is the parser's message.
pub fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, String> {
    match element.try_get_attribute(name) {
        Ok(Some(attr)) => attr
            .unescape_value()
            .map(|value| Some(value.into_owned()))
            .map_err(|e| e.to_string()),
        Ok(None) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}

/// Local name of an element as an owned string.
pub fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}
