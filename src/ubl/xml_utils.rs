use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::core::IngestError;

/// Callbacks for a streaming walk over an XML document.
///
/// `path` holds the local names (namespace prefix stripped) of the open
/// elements, root first. For `start` and `text` it includes the current
/// element; for `end` the closed element has already been popped.
pub trait XmlVisitor {
    fn start(&mut self, _path: &[String], _element: &BytesStart<'_>) {}

    fn text(&mut self, path: &[String], text: &str);

    fn end(&mut self, _path: &[String], _name: &str) {}
}

/// Walk `xml`, feeding every element and non-empty text node to `visitor`.
///
/// Returns the local name of the root element. Fails on malformed markup,
/// unbalanced elements, or a document without a root element.
pub fn walk<V: XmlVisitor>(xml: &str, visitor: &mut V) -> Result<String, IngestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut root: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e);
                if path.is_empty() && root.replace(name.clone()).is_some() {
                    return Err(IngestError::Parse("multiple root elements".into()));
                }
                path.push(name);
                visitor.start(&path, e);
            }
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e);
                if path.is_empty() && root.replace(name.clone()).is_some() {
                    return Err(IngestError::Parse("multiple root elements".into()));
                }
                path.push(name);
                visitor.start(&path, e);
                let name = path.pop().unwrap_or_default();
                visitor.end(&path, &name);
            }
            Ok(Event::Text(ref e)) => {
                let text = match e.unescape() {
                    Ok(t) => t.into_owned(),
                    Err(_) => String::from_utf8_lossy(e).into_owned(),
                };
                if path.is_empty() {
                    if !text.trim().is_empty() {
                        return Err(IngestError::Parse(format!(
                            "text outside the root element at byte {}",
                            reader.buffer_position()
                        )));
                    }
                } else if !text.is_empty() {
                    visitor.text(&path, &text);
                }
            }
            Ok(Event::CData(ref e)) => {
                let raw: &[u8] = e;
                if !path.is_empty() {
                    visitor.text(&path, &String::from_utf8_lossy(raw));
                }
            }
            Ok(Event::End(_)) => {
                let name = path.pop().unwrap_or_default();
                visitor.end(&path, &name);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(IngestError::Parse(format!(
                    "XML parse error at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    if !path.is_empty() {
        return Err(IngestError::Parse(format!(
            "unexpected end of document inside <{}>",
            path.join("/")
        )));
    }
    root.ok_or_else(|| IngestError::Parse("document has no root element".into()))
}

/// Local name of an element, without namespace prefix.
pub fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Trimmed value of the attribute with the given local name.
pub fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.trim().to_string()))
}

/// Whether `path` ends with the element names in `tail`.
pub fn ends_with(path: &[String], tail: &[&str]) -> bool {
    path.len() >= tail.len()
        && path[path.len() - tail.len()..]
            .iter()
            .zip(tail)
            .all(|(a, b)| a.as_str() == *b)
}

/// Index of the innermost open element called `name`.
pub fn position_of(path: &[String], name: &str) -> Option<usize> {
    path.iter().rposition(|p| p == name)
}
