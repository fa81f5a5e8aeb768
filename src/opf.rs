//! Decoding of the package (`.opf`) document.
//!
//! The decoder is a single streaming pass that collects the metadata,
//! manifest, spine, and guide children in document order. Document order is
//! load-bearing: cover heuristics and the nav-document lookup pick the
//! first matching manifest item.

use crate::archive::strip_bom;
use crate::consts::{dc, opf};
use crate::entities;
use crate::errors::{Error, Result};
use crate::xml::{self, XmlElementExt};
use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// The decoded package document.
#[derive(Debug, Default)]
pub(crate) struct Package {
    /// EPUB version; `"2.0"` when the attribute is absent.
    pub(crate) version: String,
    pub(crate) unique_identifier: String,
    pub(crate) metadata: RawMetadata,
    /// Manifest items in document order.
    pub(crate) manifest: Vec<ManifestItem>,
    pub(crate) spine: RawSpine,
    pub(crate) guide: Vec<GuideReference>,
}

/// Raw `<metadata>` children, prior to aggregation.
#[derive(Debug, Default)]
pub(crate) struct RawMetadata {
    pub(crate) titles: Vec<DcElement>,
    pub(crate) creators: Vec<DcElement>,
    pub(crate) languages: Vec<DcElement>,
    pub(crate) identifiers: Vec<DcElement>,
    pub(crate) publishers: Vec<DcElement>,
    pub(crate) dates: Vec<DcElement>,
    pub(crate) descriptions: Vec<DcElement>,
    pub(crate) subjects: Vec<DcElement>,
    pub(crate) rights: Vec<DcElement>,
    pub(crate) sources: Vec<DcElement>,
    pub(crate) metas: Vec<MetaEntry>,
}

/// A Dublin Core element with the attributes EPUB 2 places directly on it.
/// EPUB 3 expresses the same data through refining `<meta>` entries.
#[derive(Debug, Default)]
pub(crate) struct DcElement {
    pub(crate) value: String,
    pub(crate) id: String,
    pub(crate) file_as: String,
    pub(crate) role: String,
    pub(crate) scheme: String,
}

/// A `<meta>` element in either dialect.
///
/// EPUB 2: `<meta name="…" content="…"/>`.
/// EPUB 3: `<meta property="…" refines="#…">value</meta>`.
#[derive(Debug, Default)]
pub(crate) struct MetaEntry {
    pub(crate) name: String,
    pub(crate) content: String,
    pub(crate) property: String,
    pub(crate) refines: String,
    pub(crate) value: String,
}

/// A manifest `<item>`. `href` is kept package-relative, exactly as stored.
#[derive(Debug, Clone, Default)]
pub(crate) struct ManifestItem {
    pub(crate) id: String,
    pub(crate) href: String,
    pub(crate) media_type: String,
    /// Space-separated property tokens (`nav`, `cover-image`, …).
    pub(crate) properties: String,
}

#[derive(Debug, Default)]
pub(crate) struct RawSpine {
    /// Manifest id of the NCX document, from the `toc` attribute.
    pub(crate) toc: String,
    pub(crate) itemrefs: Vec<SpineRef>,
}

#[derive(Debug)]
pub(crate) struct SpineRef {
    pub(crate) idref: String,
    pub(crate) linear: String,
}

/// A spine entry with its manifest reference resolved.
///
/// When the `idref` does not resolve, the resolved fields stay empty and
/// the entry keeps its spine position.
#[derive(Debug, Clone, Default)]
pub(crate) struct SpineItem {
    pub(crate) id: String,
    pub(crate) idref: String,
    pub(crate) href: String,
    pub(crate) media_type: String,
    pub(crate) linear: bool,
}

/// A typed pointer from the legacy EPUB 2 `<guide>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuideReference {
    /// The reference type, e.g. `cover`, `toc`, `text`.
    pub kind: String,
    /// Human-readable label.
    pub title: String,
    /// Target href, as stored (package-relative).
    pub href: String,
}

#[derive(Copy, Clone, PartialEq)]
enum Section {
    None,
    Metadata,
    Manifest,
    Spine,
    Guide,
}

/// Decodes a package document.
pub(crate) fn parse_package(data: &[u8]) -> Result<Package> {
    let data = entities::preprocess(data);
    let data = strip_bom(&data);

    let mut reader = xml::reader(data);
    let mut package = Package::default();
    let mut section = Section::None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(el)) if el.is_local(opf::PACKAGE) => {
                package.version = el.attr(opf::VERSION).unwrap_or_default();
                package.unique_identifier = el.attr(opf::UNIQUE_ID).unwrap_or_default();
            }
            Ok(Event::Start(el)) if el.is_local(opf::METADATA) => section = Section::Metadata,
            Ok(Event::Start(el)) if el.is_local(opf::MANIFEST) => section = Section::Manifest,
            Ok(Event::Start(el)) if el.is_local(opf::SPINE) => {
                section = Section::Spine;
                package.spine.toc = el.attr(opf::TOC).unwrap_or_default();
            }
            Ok(Event::Start(el)) if el.is_local(opf::GUIDE) => section = Section::Guide,
            Ok(Event::Empty(el)) if el.is_local(opf::SPINE) => {
                package.spine.toc = el.attr(opf::TOC).unwrap_or_default();
            }
            Ok(Event::End(el)) => {
                let name = el.local_name();
                if [
                    opf::METADATA.as_bytes(),
                    opf::MANIFEST.as_bytes(),
                    opf::SPINE.as_bytes(),
                    opf::GUIDE.as_bytes(),
                ]
                .contains(&name.as_ref())
                {
                    section = Section::None;
                }
            }
            Ok(Event::Start(el)) => match section {
                Section::Metadata => handle_metadata_child(&mut reader, &el, false, &mut package)?,
                Section::Manifest if el.is_local(opf::ITEM) => push_item(&el, &mut package),
                Section::Spine if el.is_local(opf::ITEMREF) => push_itemref(&el, &mut package),
                Section::Guide if el.is_local(opf::REFERENCE) => push_reference(&el, &mut package),
                _ => {}
            },
            Ok(Event::Empty(el)) => match section {
                Section::Metadata => handle_metadata_child(&mut reader, &el, true, &mut package)?,
                Section::Manifest if el.is_local(opf::ITEM) => push_item(&el, &mut package),
                Section::Spine if el.is_local(opf::ITEMREF) => push_itemref(&el, &mut package),
                Section::Guide if el.is_local(opf::REFERENCE) => push_reference(&el, &mut package),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(Error::parse("package document", error)),
        }
    }

    if package.version.trim().is_empty() {
        package.version = "2.0".to_owned();
    }
    Ok(package)
}

fn handle_metadata_child(
    reader: &mut Reader<&[u8]>,
    el: &BytesStart<'_>,
    is_empty: bool,
    package: &mut Package,
) -> Result<()> {
    if el.has_prefix(dc::PREFIX) {
        let value = if is_empty {
            String::new()
        } else {
            xml::element_text(reader, el, "package document")?
        };
        push_dc_element(el, value, &mut package.metadata);
    } else if el.is_local(opf::META) {
        let value = if is_empty {
            String::new()
        } else {
            xml::element_text(reader, el, "package document")?
        };
        package.metadata.metas.push(MetaEntry {
            name: el.attr(opf::NAME).unwrap_or_default(),
            content: el.attr(opf::CONTENT).unwrap_or_default(),
            property: el.attr(opf::PROPERTY).unwrap_or_default(),
            refines: el.attr(opf::REFINES).unwrap_or_default(),
            value,
        });
    }
    Ok(())
}

fn push_dc_element(el: &BytesStart<'_>, value: String, metadata: &mut RawMetadata) {
    let group = match el.local_name().as_ref() {
        name if name == dc::TITLE.as_bytes() => &mut metadata.titles,
        name if name == dc::CREATOR.as_bytes() => &mut metadata.creators,
        name if name == dc::LANGUAGE.as_bytes() => &mut metadata.languages,
        name if name == dc::IDENTIFIER.as_bytes() => &mut metadata.identifiers,
        name if name == dc::PUBLISHER.as_bytes() => &mut metadata.publishers,
        name if name == dc::DATE.as_bytes() => &mut metadata.dates,
        name if name == dc::DESCRIPTION.as_bytes() => &mut metadata.descriptions,
        name if name == dc::SUBJECT.as_bytes() => &mut metadata.subjects,
        name if name == dc::RIGHTS.as_bytes() => &mut metadata.rights,
        name if name == dc::SOURCE.as_bytes() => &mut metadata.sources,
        _ => return,
    };

    group.push(DcElement {
        value,
        id: el.attr(opf::ID).unwrap_or_default(),
        file_as: el.attr(opf::FILE_AS).unwrap_or_default(),
        role: el.attr(opf::ROLE).unwrap_or_default(),
        scheme: el.attr(opf::SCHEME).unwrap_or_default(),
    });
}

fn push_item(el: &BytesStart<'_>, package: &mut Package) {
    package.manifest.push(ManifestItem {
        id: el.attr(opf::ID).unwrap_or_default(),
        href: el.attr(opf::HREF).unwrap_or_default(),
        media_type: el.attr(opf::MEDIA_TYPE).unwrap_or_default(),
        properties: el.attr(opf::PROPERTIES).unwrap_or_default(),
    });
}

fn push_itemref(el: &BytesStart<'_>, package: &mut Package) {
    package.spine.itemrefs.push(SpineRef {
        idref: el.attr(opf::IDREF).unwrap_or_default(),
        linear: el.attr(opf::LINEAR).unwrap_or_default(),
    });
}

fn push_reference(el: &BytesStart<'_>, package: &mut Package) {
    package.guide.push(GuideReference {
        kind: el.attr(opf::TYPE).unwrap_or_default(),
        title: el.attr(opf::TITLE).unwrap_or_default(),
        href: el.attr(opf::HREF).unwrap_or_default(),
    });
}

/// Builds id and href lookup maps over the manifest, keyed into the
/// document-order item slice. First insertion wins on duplicates.
pub(crate) fn build_manifest_maps(
    items: &[ManifestItem],
) -> (IndexMap<String, usize>, IndexMap<String, usize>) {
    let mut by_id = IndexMap::with_capacity(items.len());
    let mut by_href = IndexMap::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        by_id.entry(item.id.clone()).or_insert(index);
        by_href.entry(item.href.clone()).or_insert(index);
    }

    (by_id, by_href)
}

/// Resolves each spine `itemref` against the manifest.
///
/// `linear` is `true` unless the attribute is literally `"no"`. Unresolved
/// idrefs keep their spine position with empty resolved fields.
pub(crate) fn build_spine(
    spine: &RawSpine,
    items: &[ManifestItem],
    by_id: &IndexMap<String, usize>,
) -> Vec<SpineItem> {
    spine
        .itemrefs
        .iter()
        .map(|itemref| {
            let mut entry = SpineItem {
                idref: itemref.idref.clone(),
                linear: itemref.linear != opf::NO,
                ..SpineItem::default()
            };
            match by_id.get(&itemref.idref).map(|&index| &items[index]) {
                Some(item) => {
                    entry.id = item.id.clone();
                    entry.href = item.href.clone();
                    entry.media_type = item.media_type.clone();
                }
                None => log::debug!("spine itemref `{}` has no manifest item", entry.idref),
            }
            entry
        })
        .collect()
}
