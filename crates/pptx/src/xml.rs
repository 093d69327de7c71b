//! Small helpers on top of quick-xml for locating and rewriting elements
//! inside part XML without building a full DOM.

use akl_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::ops::Range;

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Value of the attribute whose qualified name is exactly `key`.
pub(crate) fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| match a.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

/// Value of a namespaced attribute (`r:id`, `r:embed`), whatever its prefix.
pub(crate) fn prefixed_attr(e: &BytesStart, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref().contains(&b':') && local_name(a.key.as_ref()) == local)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Escape text for use in element content or attribute values.
pub(crate) fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

/// Byte offset of the `<` that opens the tag whose event started at `pos`.
///
/// Depending on the preceding event the reader may or may not have consumed
/// the `<` already, so look around `pos` for it.
pub(crate) fn tag_start(xml: &str, pos: usize) -> usize {
    let bytes = xml.as_bytes();
    if pos > 0 && bytes.get(pos) != Some(&b'<') && bytes[pos - 1] == b'<' {
        return pos - 1;
    }
    xml[pos..].find('<').map_or(pos, |offset| pos + offset)
}

/// Byte range of the first element named `local` (ignoring the prefix).
pub(crate) fn find_element(xml: &str, local: &[u8]) -> Result<Option<Range<usize>>> {
    let mut reader = Reader::from_str(xml);
    let mut start: Option<usize> = None;
    let mut depth = 0usize;

    loop {
        let before = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if start.is_some() {
                    depth += 1;
                } else if local_name(e.name().as_ref()) == local {
                    start = Some(tag_start(xml, before));
                    depth = 1;
                }
            }
            Ok(Event::Empty(ref e)) => {
                if start.is_none() && local_name(e.name().as_ref()) == local {
                    return Ok(Some(tag_start(xml, before)..reader.buffer_position()));
                }
            }
            Ok(Event::End(_)) => {
                if let Some(s) = start {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Some(s..reader.buffer_position()));
                    }
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error scanning for <{}>: {}",
                    String::from_utf8_lossy(local),
                    e
                )));
            }
            _ => {}
        }
    }
}

/// Slice of the first element named `local`, if any.
pub(crate) fn element_slice<'a>(xml: &'a str, local: &[u8]) -> Result<Option<&'a str>> {
    Ok(find_element(xml, local)?.map(|r| &xml[r]))
}
