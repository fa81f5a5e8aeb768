//! Replacement of named HTML entities with numeric character references.
//!
//! The XML decoder only accepts the five predefined XML entities and
//! numeric references, while OPF and NCX files in the wild frequently carry
//! HTML names such as `&nbsp;`. A fixed set of known names is rewritten to
//! numeric form before decoding; everything else passes through untouched.

use std::borrow::Cow;

/// Longest recognized entity name (`iquest`, `middot`, …).
const MAX_NAME_LEN: usize = 6;

/// Rewrites known named entities in `data` to numeric character references.
///
/// Matching is ASCII case-insensitive over the name between `&` and `;`.
/// The XML-predefined entities (`amp`, `lt`, `gt`, `quot`, `apos`) and
/// numeric references are never touched, which also makes this
/// preprocessing idempotent.
pub(crate) fn preprocess(data: &[u8]) -> Cow<'_, [u8]> {
    let mut out = Vec::new();
    let mut copied = 0;
    let mut index = 0;

    while index < data.len() {
        if data[index] == b'&' {
            if let Some((name_len, replacement)) = match_entity(&data[index + 1..]) {
                out.extend_from_slice(&data[copied..index]);
                out.extend_from_slice(replacement.as_bytes());
                index += name_len + 2;
                copied = index;
                continue;
            }
        }
        index += 1;
    }

    if copied == 0 {
        return Cow::Borrowed(data);
    }
    out.extend_from_slice(&data[copied..]);
    Cow::Owned(out)
}

/// Attempts to match a `name;` sequence at the start of `rest`.
/// Returns the name length and its numeric replacement.
fn match_entity(rest: &[u8]) -> Option<(usize, &'static str)> {
    let terminator = rest
        .iter()
        .take(MAX_NAME_LEN + 1)
        .position(|&byte| byte == b';')?;
    let name = &rest[..terminator];

    if name.is_empty() || !name.iter().all(u8::is_ascii_alphabetic) {
        return None;
    }

    let mut lower = [0u8; MAX_NAME_LEN];
    lower[..name.len()].copy_from_slice(name);
    lower.make_ascii_lowercase();

    numeric_reference(&lower[..name.len()]).map(|replacement| (name.len(), replacement))
}

fn numeric_reference(name: &[u8]) -> Option<&'static str> {
    Some(match name {
        b"nbsp" => "&#160;",
        b"mdash" => "&#8212;",
        b"ndash" => "&#8211;",
        b"hellip" => "&#8230;",
        b"lsquo" => "&#8216;",
        b"rsquo" => "&#8217;",
        b"ldquo" => "&#8220;",
        b"rdquo" => "&#8221;",
        b"copy" => "&#169;",
        b"reg" => "&#174;",
        b"trade" => "&#8482;",
        b"bull" => "&#8226;",
        b"middot" => "&#183;",
        b"eacute" => "&#233;",
        b"egrave" => "&#232;",
        b"ecirc" => "&#234;",
        b"euml" => "&#235;",
        b"aacute" => "&#225;",
        b"agrave" => "&#224;",
        b"acirc" => "&#226;",
        b"auml" => "&#228;",
        b"iacute" => "&#237;",
        b"igrave" => "&#236;",
        b"icirc" => "&#238;",
        b"iuml" => "&#239;",
        b"oacute" => "&#243;",
        b"ograve" => "&#242;",
        b"ocirc" => "&#244;",
        b"ouml" => "&#246;",
        b"uacute" => "&#250;",
        b"ugrave" => "&#249;",
        b"ucirc" => "&#251;",
        b"uuml" => "&#252;",
        b"ntilde" => "&#241;",
        b"ccedil" => "&#231;",
        b"times" => "&#215;",
        b"divide" => "&#247;",
        b"deg" => "&#176;",
        b"para" => "&#182;",
        b"sect" => "&#167;",
        b"laquo" => "&#171;",
        b"raquo" => "&#187;",
        b"iexcl" => "&#161;",
        b"iquest" => "&#191;",
        _ => return None,
    })
}
