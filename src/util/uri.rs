//! Archive-internal path handling.
//!
//! All paths are forward-slash separated, relative to the container root.

use percent_encoding::percent_decode_str;
use std::borrow::Cow;

/// Returns the directory component of `path`, or `""` when `path`
/// has no directory component.
pub(crate) fn parent(path: &str) -> &str {
    path.rfind('/').map_or("", |index| &path[..index])
}

/// Percent-decodes `encoded` once. Malformed sequences or non-UTF-8
/// results leave the input unchanged.
pub(crate) fn decode(encoded: &str) -> Cow<'_, str> {
    match percent_decode_str(encoded).decode_utf8() {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(encoded),
    }
}

/// Resolves `href` against the directory of `base_path` and canonicalizes
/// the result.
///
/// Returns an empty string when `href` is archive-absolute (leading `/`)
/// or when the canonical result escapes the container root.
pub(crate) fn resolve(base_path: &str, href: &str) -> String {
    let href = href.trim();
    if href.starts_with('/') {
        return String::new();
    }
    let href = decode(href);
    let joined = normalize_segments(parent(base_path), &href);

    if escapes_root(&joined) {
        return String::new();
    }
    joined
}

/// Whether `path` is a ZIP entry name that stays within the archive root.
///
/// Absolute names and names that traverse above the root
/// (`../…` after canonicalization) are unsafe.
pub(crate) fn is_safe(path: &str) -> bool {
    if path.starts_with('/') {
        return false;
    }
    !escapes_root(&normalize_segments("", path))
}

fn escapes_root(canonical: &str) -> bool {
    canonical == ".." || canonical.starts_with("../")
}

/// Joins `dir` and `href` with `/` semantics, dropping `.` and empty
/// segments and resolving `..` without consuming leading `..` segments.
fn normalize_segments(dir: &str, href: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();

    for segment in dir.split('/').chain(href.split('/')) {
        match segment {
            "" | "." => {}
            ".." => match stack.last() {
                None | Some(&"..") => stack.push(".."),
                Some(_) => {
                    stack.pop();
                }
            },
            _ => stack.push(segment),
        }
    }
    stack.join("/")
}
