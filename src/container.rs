//! Locating the package document inside the container.

use crate::archive::{Archive, strip_bom};
use crate::consts::ocf;
use crate::errors::{Error, Result};
use crate::xml::{self, XmlElementExt};
use quick_xml::events::Event;

/// Returns the archive path of the package (`.opf`) document.
///
/// `META-INF/container.xml` is consulted first (case-insensitive lookup).
/// When the container file is absent the entries are scanned for the first
/// `.opf` file instead, which recovers a surprising number of archives
/// produced by sloppy tooling.
pub(crate) fn locate_package(archive: &Archive) -> Result<String> {
    if let Some(index) = archive.find(ocf::CONTAINER_PATH) {
        let data = archive.read_index(index)?;
        return parse_container(&data);
    }

    log::debug!("container.xml missing; scanning entries for a package document");
    archive
        .entries()
        .iter()
        .find(|entry| entry.name.to_lowercase().ends_with(ocf::OPF_EXTENSION))
        .map(|entry| entry.name.clone())
        .ok_or_else(|| Error::invalid("no package document found in archive"))
}

/// Parses `container.xml` and selects a `rootfile` path.
fn parse_container(data: &[u8]) -> Result<String> {
    let data = strip_bom(data);
    let mut reader = xml::reader(data);
    let mut rootfiles = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(el) | Event::Empty(el)) if el.is_local(ocf::ROOT_FILE) => {
                rootfiles.push((
                    el.attr(ocf::MEDIA_TYPE).unwrap_or_default(),
                    el.attr(ocf::FULL_PATH).unwrap_or_default(),
                ));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(Error::parse("container.xml", error)),
        }
    }

    if rootfiles.is_empty() {
        return Err(Error::invalid("container.xml has no rootfile entries"));
    }

    // Multiple rootfiles may exist; the package media type designates the
    // default rendition. Entries without a full-path are unusable.
    let mut fallback = None;
    for (media_type, full_path) in &rootfiles {
        let full_path = full_path.trim();
        if full_path.is_empty() {
            continue;
        }
        if media_type.trim().eq_ignore_ascii_case(ocf::OEBPS_PACKAGE) {
            return Ok(full_path.to_owned());
        }
        fallback.get_or_insert(full_path);
    }

    fallback
        .map(str::to_owned)
        .ok_or_else(|| Error::invalid("container.xml rootfile has empty full-path"))
}
