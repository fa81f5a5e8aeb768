//! Aggregated bibliographic metadata.
//!
//! EPUB 2 and 3 express the same facts in different dialects: version 2
//! hangs `opf:file-as`/`opf:role`/`opf:scheme` attributes directly on the
//! Dublin Core elements, while version 3 attaches refining `<meta>`
//! statements. Aggregation folds both into one ordered view, with the
//! element attribute taking precedence over a refinement.

use crate::consts::opf;
use crate::opf::{DcElement, MetaEntry, Package};
use std::collections::HashMap;

/// Bibliographic metadata extracted from the package document.
///
/// Sequence fields preserve document order (or `display-seq` order for
/// titles); singleton fields hold the first non-empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// The EPUB specification version, e.g. `"2.0"` or `"3.0"`.
    /// Never empty; defaults to `"2.0"` when the package omits it.
    pub version: String,
    /// All `dc:title` values. The first entry is the primary title.
    pub titles: Vec<String>,
    /// All `dc:creator` entries.
    pub authors: Vec<Author>,
    /// All `dc:language` values (BCP 47 tags).
    pub languages: Vec<String>,
    /// All `dc:identifier` entries (ISBN, UUID, URI, …).
    pub identifiers: Vec<Identifier>,
    pub publisher: String,
    /// Publication date, as written in the package document.
    pub date: String,
    pub description: String,
    pub subjects: Vec<String>,
    pub rights: String,
    pub source: String,
}

/// A `dc:creator` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    /// Sort form, e.g. `"Dickens, Charles"`.
    pub file_as: String,
    /// MARC relator code, e.g. `"aut"`, `"edt"`.
    pub role: String,
}

/// A `dc:identifier` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifier {
    pub value: String,
    /// Identifier system, e.g. `"ISBN"`; from the `opf:scheme` attribute
    /// or an `identifier-type` refinement.
    pub scheme: String,
    /// The element's XML id.
    pub id: String,
}

type RefinesMap<'a> = HashMap<&'a str, Vec<&'a MetaEntry>>;

/// Folds the raw package metadata into its public form.
pub(crate) fn aggregate(package: &Package) -> Metadata {
    let raw = &package.metadata;
    let refines = build_refines_map(&raw.metas);

    let mut metadata = Metadata {
        version: package.version.clone(),
        titles: extract_titles(&raw.titles, &refines),
        authors: extract_authors(&raw.creators, &refines),
        ..Metadata::default()
    };

    for language in &raw.languages {
        let value = language.value.trim();
        if !value.is_empty() {
            metadata.languages.push(value.to_owned());
        }
    }

    for identifier in &raw.identifiers {
        let value = identifier.value.trim();
        if value.is_empty() {
            continue;
        }
        let mut scheme = identifier.scheme.clone();
        if scheme.is_empty() && !identifier.id.is_empty() {
            if let Some(refined) = find_refine(&refines, &identifier.id, opf::IDENTIFIER_TYPE) {
                scheme = refined;
            }
        }
        metadata.identifiers.push(Identifier {
            value: value.to_owned(),
            scheme,
            id: identifier.id.clone(),
        });
    }

    for subject in &raw.subjects {
        let value = subject.value.trim();
        if !value.is_empty() {
            metadata.subjects.push(value.to_owned());
        }
    }

    metadata.publisher = first_non_empty(&raw.publishers);
    metadata.date = first_non_empty(&raw.dates);
    metadata.description = first_non_empty(&raw.descriptions);
    metadata.rights = first_non_empty(&raw.rights);
    metadata.source = first_non_empty(&raw.sources);

    metadata
}

/// Maps element id → the `<meta>` statements refining it
/// (those whose `refines` is a `#id` reference).
fn build_refines_map(metas: &[MetaEntry]) -> RefinesMap<'_> {
    let mut map: RefinesMap = HashMap::new();
    for meta in metas {
        if let Some(id) = meta.refines.strip_prefix('#') {
            map.entry(id).or_default().push(meta);
        }
    }
    map
}

/// Looks up a single refining property value for the given element id.
fn find_refine(refines: &RefinesMap<'_>, id: &str, property: &str) -> Option<String> {
    refines.get(id)?.iter().find_map(|meta| {
        let value = meta.value.trim();
        (meta.property == property && !value.is_empty()).then(|| value.to_owned())
    })
}

fn first_non_empty(elements: &[DcElement]) -> String {
    elements
        .iter()
        .map(|element| element.value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_default()
}

/// Orders titles by their `display-seq` refinement when any title carries
/// one; document order otherwise.
fn extract_titles(titles: &[DcElement], refines: &RefinesMap<'_>) -> Vec<String> {
    struct TitleEntry {
        value: String,
        seq: i64,
        index: usize,
    }

    let mut entries = Vec::with_capacity(titles.len());
    let mut has_seq = false;

    for (index, title) in titles.iter().enumerate() {
        let value = title.value.trim();
        if value.is_empty() {
            continue;
        }
        let mut entry = TitleEntry {
            value: value.to_owned(),
            seq: 0,
            index,
        };
        if !title.id.is_empty() {
            if let Some(seq) = find_refine(refines, &title.id, opf::DISPLAY_SEQ) {
                if let Ok(seq) = seq.parse() {
                    entry.seq = seq;
                    has_seq = true;
                }
            }
        }
        entries.push(entry);
    }

    if has_seq {
        // Titles without a sequence (seq 0) sort after sequenced ones;
        // ties keep document order (the sort is stable).
        entries.sort_by(|a, b| match (a.seq, b.seq) {
            (0, 0) => a.index.cmp(&b.index),
            (0, _) => std::cmp::Ordering::Greater,
            (_, 0) => std::cmp::Ordering::Less,
            (sa, sb) => sa.cmp(&sb),
        });
    }

    entries.into_iter().map(|entry| entry.value).collect()
}

fn extract_authors(creators: &[DcElement], refines: &RefinesMap<'_>) -> Vec<Author> {
    let mut authors = Vec::with_capacity(creators.len());

    for creator in creators {
        let name = creator.value.trim();
        if name.is_empty() {
            continue;
        }

        let mut author = Author {
            name: name.to_owned(),
            file_as: creator.file_as.clone(),
            role: creator.role.clone(),
        };

        if !creator.id.is_empty() {
            if author.file_as.is_empty() {
                if let Some(file_as) = find_refine(refines, &creator.id, opf::FILE_AS) {
                    author.file_as = file_as;
                }
            }
            if author.role.is_empty() {
                if let Some(role) = find_refine(refines, &creator.id, opf::ROLE) {
                    author.role = role;
                }
            }
        }

        authors.push(author);
    }
    authors
}
