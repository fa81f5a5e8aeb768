//! Thin convenience layer over the `quick-xml` event reader.
//!
//! EPUB files in the wild are frequently malformed; readers produced here
//! are configured leniently so mismatched or stray end tags do not abort
//! parsing. Strictness is re-introduced selectively by the callers.

use crate::errors::{Error, Result};
use crate::util::str::StringExt;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Creates a lenient event reader over `data`.
pub(crate) fn reader(data: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(data);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    reader
}

pub(crate) trait XmlElementExt {
    /// Compares the element name without its namespace prefix.
    fn is_local(&self, name: &str) -> bool;

    /// Whether the element name carries the given namespace prefix.
    fn has_prefix(&self, prefix: &str) -> bool;

    /// Returns the value of the first attribute whose local name matches
    /// `name`, ignoring any namespace prefix (`opf:role` matches `role`).
    fn attr(&self, name: &str) -> Option<String>;
}

impl XmlElementExt for BytesStart<'_> {
    fn is_local(&self, name: &str) -> bool {
        self.local_name().as_ref() == name.as_bytes()
    }

    fn has_prefix(&self, prefix: &str) -> bool {
        self.name()
            .prefix()
            .is_some_and(|p| p.as_ref() == prefix.as_bytes())
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.attributes()
            .with_checks(false)
            .filter_map(|attribute| attribute.ok())
            .find(|attribute| attribute.key.local_name().as_ref() == name.as_bytes())
            .map(|attribute| match attribute.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&attribute.value).into_owned(),
            })
    }
}

/// Collects the trimmed text content of `start`, up to its matching end tag.
///
/// Nested markup is skipped over; its text is included. A truncated
/// document yields whatever text was gathered before EOF.
pub(crate) fn element_text(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    context: &'static str,
) -> Result<String> {
    let name = start.name().as_ref().to_vec();
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(el)) if el.name().as_ref() == name.as_slice() => depth += 1,
            Ok(Event::End(el)) if el.name().as_ref() == name.as_slice() => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Ok(Event::Text(t)) => match t.unescape() {
                Ok(value) => text.push_str(&value),
                Err(_) => text.push_str(&String::from_utf8_lossy(t.as_ref())),
            },
            Ok(Event::CData(cdata)) => {
                text.push_str(&String::from_utf8_lossy(cdata.as_ref()));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(Error::parse(context, error)),
        }
    }

    text.trim_in_place();
    Ok(text)
}
