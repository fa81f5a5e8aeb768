//! Navigation parsing and spine reconciliation.
//!
//! Two source formats produce the same [`TocItem`] tree: the DAISY-derived
//! NCX document (EPUB 2) and the XHTML nav document (EPUB 3). After
//! parsing, entries are matched against the spine and each matched entry is
//! assigned the half-open spine range it covers.

use crate::archive::strip_bom;
use crate::consts::{ncx, xhtml};
use crate::entities;
use crate::errors::{Error, Result};
use crate::util::uri;
use crate::xml::{self, XmlElementExt};
use ego_tree::NodeRef;
use quick_xml::events::Event;
use scraper::{Html, Node};
use std::collections::{BTreeSet, HashMap};

/// An entry in the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocItem {
    /// Display text of the entry.
    pub title: String,
    /// Archive-root path of the target, possibly carrying a `#fragment`.
    /// Empty when the entry has no resolvable target.
    pub href: String,
    /// Nested entries, in document order.
    pub children: Vec<TocItem>,
    /// Index of the matching spine item, or `-1` when the entry points
    /// outside the spine.
    pub spine_index: isize,
    /// Exclusive end of the covered spine range
    /// `[spine_index, spine_end_index)`, or `-1` when unmatched.
    pub spine_end_index: isize,
}

impl Default for TocItem {
    fn default() -> Self {
        Self {
            title: String::new(),
            href: String::new(),
            children: Vec::new(),
            spine_index: -1,
            spine_end_index: -1,
        }
    }
}

/// Parses an NCX document into a navigation tree.
///
/// `ncx_path` is the archive path of the NCX file itself; `src` references
/// are resolved against it.
pub(crate) fn parse_ncx(data: &[u8], ncx_path: &str) -> Result<Vec<TocItem>> {
    let data = entities::preprocess(data);
    let data = strip_bom(&data);

    let mut reader = xml::reader(data);
    let mut roots = Vec::new();
    let mut stack: Vec<TocItem> = Vec::new();
    let mut in_nav_map = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(el)) if el.is_local(ncx::NAV_MAP) => in_nav_map = true,
            Ok(Event::Start(el)) if in_nav_map && el.is_local(ncx::NAV_POINT) => {
                stack.push(TocItem::default());
            }
            Ok(Event::Start(el)) if in_nav_map && el.is_local(ncx::NAV_LABEL) => {
                let label = xml::element_text(&mut reader, &el, "ncx document")?;
                if let Some(entry) = stack.last_mut() {
                    entry.title = label;
                }
            }
            Ok(Event::Start(el) | Event::Empty(el)) if in_nav_map && el.is_local(ncx::CONTENT) => {
                if let Some(entry) = stack.last_mut() {
                    let src = el.attr(ncx::SRC).unwrap_or_default();
                    if !src.trim().is_empty() {
                        let resolved = uri::resolve(ncx_path, &src);
                        if !resolved.is_empty() {
                            entry.href = resolved;
                        }
                    }
                }
            }
            Ok(Event::End(el)) => match el.local_name().as_ref() {
                name if name == ncx::NAV_MAP.as_bytes() => in_nav_map = false,
                name if name == ncx::NAV_POINT.as_bytes() => {
                    if let Some(entry) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(entry),
                            None => roots.push(entry),
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(Error::parse("ncx document", error)),
        }
    }

    Ok(roots)
}

/// The navigation roles recognized in an XHTML nav document.
#[derive(Debug, Default)]
pub(crate) struct NavDocument {
    pub(crate) toc: Option<Vec<TocItem>>,
    pub(crate) landmarks: Option<Vec<TocItem>>,
}

/// Parses an EPUB 3 XHTML nav document.
///
/// Every `<nav>` is classified by the tokens of its `epub:type` attribute;
/// `toc` and `landmarks` roles are converted from their first descendant
/// `<ol>`. `base_path` is the archive path of the nav document.
pub(crate) fn parse_nav_document(data: &[u8], base_path: &str) -> NavDocument {
    let text = String::from_utf8_lossy(data);
    let doc = Html::parse_document(&text);
    let mut result = NavDocument::default();

    for node in doc.tree.root().descendants() {
        let Some(el) = node.value().as_element() else {
            continue;
        };
        if el.name() != xhtml::NAV {
            continue;
        }

        let epub_type = el.attr(xhtml::EPUB_TYPE).unwrap_or_default();
        let Some(ol) = first_descendant_element(node, xhtml::ORDERED_LIST) else {
            continue;
        };

        if has_token(epub_type, xhtml::TOC) {
            result.toc = Some(parse_nav_ol(ol, base_path));
        } else if has_token(epub_type, xhtml::LANDMARKS) {
            result.landmarks = Some(parse_nav_ol(ol, base_path));
        }
    }

    result
}

fn has_token(value: &str, token: &str) -> bool {
    value.split_whitespace().any(|candidate| candidate == token)
}

fn first_descendant_element<'a>(
    node: NodeRef<'a, Node>,
    name: &str,
) -> Option<NodeRef<'a, Node>> {
    node.descendants()
        .skip(1)
        .find(|candidate| {
            candidate
                .value()
                .as_element()
                .is_some_and(|el| el.name() == name)
        })
}

fn parse_nav_ol(ol: NodeRef<'_, Node>, base_path: &str) -> Vec<TocItem> {
    ol.children()
        .filter(|child| {
            child
                .value()
                .as_element()
                .is_some_and(|el| el.name() == xhtml::LIST_ITEM)
        })
        .map(|li| parse_nav_li(li, base_path))
        .collect()
}

/// Converts one `<li>`: the first `<a>` provides href and title, a `<span>`
/// stands in for the title on heading-only entries, and a nested `<ol>`
/// becomes the children.
fn parse_nav_li(li: NodeRef<'_, Node>, base_path: &str) -> TocItem {
    let mut item = TocItem::default();

    for child in li.children() {
        let Some(el) = child.value().as_element() else {
            continue;
        };
        match el.name() {
            xhtml::ANCHOR => {
                if item.href.is_empty() {
                    if let Some(href) = el.attr(xhtml::HREF).filter(|href| !href.is_empty()) {
                        let resolved = uri::resolve(base_path, href);
                        if !resolved.is_empty() {
                            item.href = resolved;
                        }
                    }
                    item.title = text_content(child).trim().to_owned();
                }
            }
            xhtml::SPAN => {
                if item.title.is_empty() {
                    item.title = text_content(child).trim().to_owned();
                }
            }
            xhtml::ORDERED_LIST => item.children = parse_nav_ol(child, base_path),
            _ => {}
        }
    }

    item
}

fn text_content(node: NodeRef<'_, Node>) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        if let Some(fragment) = descendant.value().as_text() {
            text.push_str(fragment);
        }
    }
    text
}

/// The href with its `#fragment` removed.
pub(crate) fn href_without_fragment(href: &str) -> &str {
    href.find('#').map_or(href, |index| &href[..index])
}

/// Matches each entry's href (fragment stripped) against the spine and
/// records the spine index on hits. Misses keep `-1`.
pub(crate) fn assign_spine_indices(items: &mut [TocItem], spine_map: &HashMap<String, usize>) {
    for item in items {
        if !item.href.is_empty() {
            if let Some(&index) = spine_map.get(href_without_fragment(&item.href)) {
                item.spine_index = index as isize;
            }
        }
        assign_spine_indices(&mut item.children, spine_map);
    }
}

/// Assigns each matched entry the half-open spine range it covers.
///
/// An entry's range ends where the next distinct matched index begins; the
/// highest matched index runs to `spine_len`. Ranges of distinct entries
/// therefore never overlap, and unmatched entries stay at `-1`/`-1`.
pub(crate) fn compute_spine_ranges(items: &mut [TocItem], spine_len: usize) {
    let mut indices = BTreeSet::new();
    collect_spine_indices(items, &mut indices);
    if indices.is_empty() {
        return;
    }

    let sorted: Vec<isize> = indices.into_iter().collect();
    let mut ends = HashMap::with_capacity(sorted.len());
    for (position, &index) in sorted.iter().enumerate() {
        let end = sorted
            .get(position + 1)
            .copied()
            .unwrap_or(spine_len as isize);
        ends.insert(index, end);
    }

    apply_spine_ranges(items, &ends);
}

fn collect_spine_indices(items: &[TocItem], indices: &mut BTreeSet<isize>) {
    for item in items {
        if item.spine_index >= 0 {
            indices.insert(item.spine_index);
        }
        collect_spine_indices(&item.children, indices);
    }
}

fn apply_spine_ranges(items: &mut [TocItem], ends: &HashMap<isize, isize>) {
    for item in items {
        item.spine_end_index = match ends.get(&item.spine_index) {
            Some(&end) if item.spine_index >= 0 => end,
            _ => -1,
        };
        apply_spine_ranges(&mut item.children, ends);
    }
}

/// Flattens the tree (preorder) into a map from href-without-fragment to
/// title; the first entry for a path wins.
pub(crate) fn build_title_map(items: &[TocItem]) -> HashMap<String, String> {
    fn walk(items: &[TocItem], map: &mut HashMap<String, String>) {
        for item in items {
            if !item.href.is_empty() {
                let path = href_without_fragment(&item.href);
                if !map.contains_key(path) {
                    map.insert(path.to_owned(), item.title.clone());
                }
            }
            walk(&item.children, map);
        }
    }

    let mut map = HashMap::new();
    walk(items, &mut map);
    map
}
