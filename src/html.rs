//! Chapter content processing: plain-text extraction, body sanitization,
//! and image-path rewriting.
//!
//! Text extraction runs over the streaming XML tokenizer so that multi-
//! megabyte chapters never materialize a DOM. The sanitizer and the image
//! rewriter do need one (attributes are validated and rewritten in place),
//! so they parse with `scraper` and serialize the modified tree.

use crate::archive::strip_bom;
use crate::consts::xhtml;
use crate::entities;
use crate::errors::{Error, Result};
use crate::util::str::StrExt;
use crate::util::uri;
use crate::xml;
use ego_tree::NodeId;
use quick_xml::events::Event;
use scraper::{ElementRef, Html, Node};

/// Tags that terminate a line during text extraction.
const BLOCK_TAGS: &[&str] = &[
    "p",
    "br",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "li",
    "tr",
    "blockquote",
    "hr",
];

/// Tags whose content never reaches the text output.
const SKIP_TAGS: &[&str] = &["script", "style"];

fn is_block_tag(name: &[u8]) -> bool {
    BLOCK_TAGS
        .iter()
        .any(|tag| tag.as_bytes().eq_ignore_ascii_case(name))
}

fn is_skip_tag(name: &[u8]) -> bool {
    SKIP_TAGS
        .iter()
        .any(|tag| tag.as_bytes().eq_ignore_ascii_case(name))
}

/// Extracts the plain text of an XHTML chapter.
///
/// Block-level tags produce line breaks, whitespace runs collapse to single
/// spaces, and `<script>`/`<style>` content is discarded. A self-closing
/// script or style tag is zero-width and must not swallow the rest of the
/// document.
pub(crate) fn extract_text(data: &[u8]) -> Result<String> {
    let data = entities::preprocess(data);
    let data = strip_bom(&data);

    let mut reader = xml::reader(data);
    let mut buf = String::new();
    let mut skip_depth = 0usize;
    let mut last_was_newline = true;

    loop {
        match reader.read_event() {
            Ok(Event::Start(el)) => {
                let name = el.local_name();
                if is_skip_tag(name.as_ref()) {
                    skip_depth += 1;
                    continue;
                }
                if skip_depth > 0 {
                    continue;
                }
                if is_block_tag(name.as_ref()) {
                    push_block_break(&mut buf, &mut last_was_newline);
                }
            }
            Ok(Event::Empty(el)) => {
                if skip_depth > 0 {
                    continue;
                }
                if is_block_tag(el.local_name().as_ref()) {
                    push_block_break(&mut buf, &mut last_was_newline);
                }
            }
            Ok(Event::End(el)) => {
                if is_skip_tag(el.local_name().as_ref()) && skip_depth > 0 {
                    skip_depth -= 1;
                }
            }
            Ok(Event::Text(t)) => {
                if skip_depth > 0 {
                    continue;
                }
                let raw = match t.unescape() {
                    Ok(value) => value.into_owned(),
                    Err(_) => String::from_utf8_lossy(t.as_ref()).into_owned(),
                };
                push_text(&mut buf, &raw, &mut last_was_newline);
            }
            Ok(Event::CData(cdata)) => {
                if skip_depth > 0 {
                    continue;
                }
                let raw = String::from_utf8_lossy(cdata.as_ref()).into_owned();
                push_text(&mut buf, &raw, &mut last_was_newline);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(Error::parse("chapter content", error)),
        }
    }

    Ok(buf.trim().to_owned())
}

fn push_block_break(buf: &mut String, last_was_newline: &mut bool) {
    if !buf.is_empty() && !*last_was_newline {
        buf.push('\n');
        *last_was_newline = true;
    }
}

fn push_text(buf: &mut String, raw: &str, last_was_newline: &mut bool) {
    let text = collapse_whitespace(raw);
    if !text.is_empty() {
        *last_was_newline = text.ends_with('\n');
        buf.push_str(&text);
    }
}

/// Collapses runs of whitespace (space, tab, CR, LF) into single spaces.
///
/// Leading and trailing whitespace each survive as one space so inline
/// elements concatenate with correct inter-word spacing; all-whitespace
/// input collapses to nothing.
fn collapse_whitespace(s: &str) -> String {
    const WHITESPACE: [char; 4] = [' ', '\t', '\n', '\r'];

    let mut buf = String::with_capacity(s.len());
    let mut in_space = false;
    let mut has_content = false;

    for c in s.chars() {
        if WHITESPACE.contains(&c) {
            in_space = true;
        } else {
            if in_space && !buf.is_empty() {
                buf.push(' ');
            }
            buf.push(c);
            in_space = false;
            has_content = true;
        }
    }

    if !has_content {
        return String::new();
    }
    if s.starts_with(WHITESPACE) {
        buf.insert(0, ' ');
    }
    if in_space {
        buf.push(' ');
    }
    buf
}

/// Extracts the inner HTML of the first `<body>`, sanitized.
///
/// `<script>` and `<style>` subtrees are removed, `on*` event-handler
/// attributes are dropped, and URI-carrying attributes must pass
/// [`is_safe_uri`]. Returns an empty string when the document has no body.
pub(crate) fn extract_body_html(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    let mut doc = Html::parse_document(&text);

    let Some(body_id) = find_element(&doc, xhtml::BODY) else {
        return String::new();
    };

    sanitize_subtree(&mut doc, body_id);

    doc.tree
        .get(body_id)
        .and_then(ElementRef::wrap)
        .map(|body| body.inner_html().trim().to_owned())
        .unwrap_or_default()
}

fn find_element(doc: &Html, name: &str) -> Option<NodeId> {
    doc.tree.root().descendants().find_map(|node| {
        node.value()
            .as_element()
            .filter(|el| el.name() == name)
            .map(|_| node.id())
    })
}

fn sanitize_subtree(doc: &mut Html, root: NodeId) {
    let mut removals = Vec::new();
    let mut elements = Vec::new();

    if let Some(root) = doc.tree.get(root) {
        for node in root.descendants() {
            let Some(el) = node.value().as_element() else {
                continue;
            };
            if SKIP_TAGS.contains(&el.name()) {
                removals.push(node.id());
            } else {
                elements.push(node.id());
            }
        }
    }

    for id in removals {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }

    for id in elements {
        let Some(mut node) = doc.tree.get_mut(id) else {
            continue;
        };
        let Node::Element(el) = node.value() else {
            continue;
        };
        el.attrs.retain(|name, value| {
            let local = name.local.to_ascii_lowercase();
            if local.starts_with("on") {
                return false;
            }
            !(is_uri_attr(&local) && !is_safe_uri(value))
        });
    }
}

/// Attributes that may carry a URL and are protocol-validated.
fn is_uri_attr(local: &str) -> bool {
    matches!(local, "href" | "src" | "xlink:href")
}

/// Validates a URI value on a sanitized attribute.
///
/// Allowed: empty values, fragments, relative forms (`/`, `./`, `../`,
/// `?`), scheme-less paths, `http`/`https`/`mailto`, and `data:` URIs whose
/// media type is an image.
pub(crate) fn is_safe_uri(raw: &str) -> bool {
    let value = raw.trim();
    if value.is_empty() {
        return true;
    }
    if value.starts_with('#')
        || value.starts_with('/')
        || value.starts_with("./")
        || value.starts_with("../")
        || value.starts_with('?')
    {
        return true;
    }

    let Some(scheme) = uri_scheme(value) else {
        return true;
    };
    match scheme.to_ascii_lowercase().as_str() {
        "http" | "https" | "mailto" => true,
        "data" => value.starts_with_ignore_case("data:image/"),
        _ => false,
    }
}

/// Returns the URI scheme of `s`, when it has one (`mailto`,
/// `javascript`, …). Single-letter prefixes are not schemes, which keeps
/// Windows-style `C:` out.
fn uri_scheme(s: &str) -> Option<&str> {
    let s = s.trim();
    let first = s.as_bytes().first()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }

    for (index, byte) in s.bytes().enumerate() {
        match byte {
            b':' => return (index > 1).then(|| &s[..index]),
            b'+' | b'-' | b'.' => {}
            byte if byte.is_ascii_alphanumeric() => {}
            _ => return None,
        }
    }
    None
}

pub(crate) fn has_uri_scheme(s: &str) -> bool {
    uri_scheme(s).is_some()
}

/// Rewrites relative image references to archive-root paths.
///
/// Covers `<img src>` and the SVG `<image href>`/`<image xlink:href>`
/// forms. Absolute URLs, `data:` URIs, and anything else carrying a scheme
/// stay untouched. The document is returned unchanged when nothing needed
/// rewriting.
pub(crate) fn rewrite_image_paths(data: &[u8], base_path: &str) -> String {
    let text = String::from_utf8_lossy(data).into_owned();
    let mut doc = Html::parse_document(&text);
    let mut rewrites = Vec::new();

    for node in doc.tree.root().descendants() {
        let Some(el) = node.value().as_element() else {
            continue;
        };
        let targets: &[&str] = match el.name() {
            xhtml::IMG => &[xhtml::SRC],
            xhtml::IMAGE => &[xhtml::HREF, xhtml::XLINK_HREF],
            _ => continue,
        };
        for (name, value) in el.attrs() {
            if !targets.contains(&name) {
                continue;
            }
            if value.is_empty()
                || value.starts_with("http://")
                || value.starts_with("https://")
                || value.starts_with("data:")
                || has_uri_scheme(value)
            {
                continue;
            }
            let resolved = uri::resolve(base_path, value);
            if !resolved.is_empty() {
                rewrites.push((node.id(), name.to_owned(), resolved));
            }
        }
    }

    if rewrites.is_empty() {
        return text;
    }

    for (id, attr_name, resolved) in rewrites {
        let Some(mut node) = doc.tree.get_mut(id) else {
            continue;
        };
        let Node::Element(el) = node.value() else {
            continue;
        };
        // `Element::attrs` exposes local names, so foreign-content
        // `xlink:href` was collected as plain `href`; match on the local
        // name here as well.
        for (name, value) in el.attrs.iter_mut() {
            if &*name.local == attr_name {
                *value = resolved.as_str().into();
            }
        }
    }

    doc.root_element().html()
}

/// Returns the archive path of the first image reference in an XHTML
/// document, resolved against `base_path`; empty when none is found.
///
/// Matches `<img src>` first and the SVG `<image href|xlink:href>` forms,
/// in document order.
pub(crate) fn find_first_image(data: &[u8], base_path: &str) -> String {
    let text = String::from_utf8_lossy(data);
    let doc = Html::parse_document(&text);

    for node in doc.tree.root().descendants() {
        let Some(el) = node.value().as_element() else {
            continue;
        };
        match el.name() {
            xhtml::IMG => {
                // The HTML tree builder rewrites a stray `<image>` into
                // `<img>`, carrying its attributes along; fall back to the
                // href forms so such covers are still found.
                let src = el
                    .attr(xhtml::SRC)
                    .or_else(|| el.attr(xhtml::HREF))
                    .or_else(|| el.attr(xhtml::XLINK_HREF))
                    .filter(|src| !src.is_empty());
                if let Some(src) = src {
                    return uri::resolve(base_path, src);
                }
            }
            xhtml::IMAGE => {
                let href = el
                    .attr(xhtml::HREF)
                    .or_else(|| el.attr(xhtml::XLINK_HREF))
                    .filter(|href| !href.is_empty());
                if let Some(href) = href {
                    return uri::resolve(base_path, href);
                }
            }
            _ => {}
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_inline_spacing() {
        let text = extract_text(b"<p>This is <b>bold</b> text</p>").unwrap();

        assert_eq!("This is bold text", text);
    }

    #[test]
    fn test_extract_text_blocks() {
        let data = b"<html><body><h1>Title</h1>\n<p>One</p>\n<p>Two</p><hr/><p>Three</p></body></html>";

        assert_eq!("Title\nOne\nTwo\nThree", extract_text(data).unwrap());
    }

    #[test]
    fn test_extract_text_collapses_whitespace() {
        let data = b"<p>spread\n   across\t\tlines</p>";

        assert_eq!("spread across lines", extract_text(data).unwrap());
    }

    #[test]
    fn test_extract_text_skips_script_and_style() {
        let data = b"<body><p>a</p><script>var hidden = 1;</script>\
            <style>p { color: red }</style><p>b</p></body>";

        assert_eq!("a\nb", extract_text(data).unwrap());
    }

    #[test]
    fn test_self_closing_script_is_zero_width() {
        let data = br#"<body><script src="app.js"/><p>visible</p></body>"#;

        assert_eq!("visible", extract_text(data).unwrap());
    }

    #[test]
    fn test_extract_text_decodes_entities() {
        let data = b"<p>Fish &amp; Chips&mdash;daily</p>";

        assert_eq!("Fish & Chips\u{2014}daily", extract_text(data).unwrap());
    }

    #[test]
    fn test_collapse_whitespace() {
        #[rustfmt::skip]
        let expected = [
            ("a b c", "a b c"),
            ("a b", "a \n\t b"),
            (" a ", "  a  "),
            ("", "   \n\t "),
            ("", ""),
            ("a ", "a\n"),
            (" a", "\ta"),
        ];

        for (expect, input) in expected {
            assert_eq!(expect, collapse_whitespace(input), "input {input:?}");
        }
    }

    #[test]
    fn test_body_html_strips_scripts_and_handlers() {
        let data = br#"<html><head><title>t</title></head><body>
            <p onclick="steal()" class="keep">Hello</p>
            <script>alert(1)</script>
            <style>p {}</style>
            <a href="javascript:alert(1)">bad link</a>
            <a href="chapter2.xhtml#top">good link</a>
          </body></html>"#;

        let body = extract_body_html(data);

        assert!(!body.contains("script"));
        assert!(!body.contains("style"));
        assert!(!body.contains("onclick"));
        assert!(!body.contains("javascript:"));
        assert!(body.contains(r#"<p class="keep">Hello</p>"#));
        assert!(body.contains(r#"href="chapter2.xhtml#top""#));
    }

    #[test]
    fn test_body_html_without_body_content() {
        assert_eq!("", extract_body_html(b""));
    }

    #[test]
    fn test_is_safe_uri() {
        #[rustfmt::skip]
        let safe = [
            "", "#fragment", "/root/path.xhtml", "./sibling.xhtml",
            "../up.xhtml", "?query=1", "images/pic.png",
            "http://example.com/a", "HTTPS://example.com", "mailto:a@b.c",
            "data:image/png;base64,AAAA",
        ];
        #[rustfmt::skip]
        let unsafe_ = [
            "javascript:alert(1)", "JAVASCRIPT:alert(1)", "vbscript:x",
            "data:text/html;base64,AAAA", "file:///etc/passwd", "ftp://host/x",
        ];

        for uri in safe {
            assert!(is_safe_uri(uri), "expected safe: {uri:?}");
        }
        for uri in unsafe_ {
            assert!(!is_safe_uri(uri), "expected unsafe: {uri:?}");
        }
    }

    #[test]
    fn test_has_uri_scheme() {
        assert!(has_uri_scheme("mailto:x@y.z"));
        assert!(has_uri_scheme("custom+scheme://x"));
        assert!(!has_uri_scheme("images/pic.png"));
        assert!(!has_uri_scheme("C:/windows/path"));
        assert!(!has_uri_scheme("a b: not a scheme"));
        assert!(!has_uri_scheme(""));
    }

    #[test]
    fn test_rewrite_image_paths() {
        let data = br#"<html><body>
            <img src="images/fig1.png"/>
            <img src="http://example.com/remote.png"/>
            <img src="data:image/png;base64,AAAA"/>
            <svg><image xlink:href="../shared/fig2.svg"/></svg>
          </body></html>"#;

        let out = rewrite_image_paths(data, "OEBPS/text/c1.xhtml");

        assert!(out.contains("OEBPS/text/images/fig1.png"));
        assert!(out.contains("OEBPS/shared/fig2.svg"));
        assert!(out.contains("http://example.com/remote.png"));
        assert!(out.contains("data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_rewrite_leaves_unparsable_references() {
        let data = br#"<body><img src="../../outside.png"/></body>"#;

        // Escaping references resolve to nothing and stay as written.
        let out = rewrite_image_paths(data, "c1.xhtml");
        assert!(out.contains("../../outside.png"));
    }

    #[test]
    fn test_find_first_image() {
        let img = br#"<body><p>x</p><img src="pics/cover.jpg"/><img src="later.png"/></body>"#;
        assert_eq!(
            "OEBPS/pics/cover.jpg",
            find_first_image(img, "OEBPS/cover.xhtml")
        );

        let svg = br#"<body><svg><image xlink:href="cover.png"/></svg></body>"#;
        assert_eq!("cover.png", find_first_image(svg, "title.xhtml"));

        assert_eq!("", find_first_image(b"<body><p>none</p></body>", "a.xhtml"));
    }
}
