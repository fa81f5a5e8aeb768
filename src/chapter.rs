//! Chapter handles and license-page detection.

use crate::archive::strip_bom;
use crate::book::Book;
use crate::errors::{Error, Result};
use crate::html;

/// Case-insensitive patterns that identify a Project Gutenberg license page.
const GUTENBERG_PATTERNS: &[&str] = &[
    "project gutenberg license",
    "gutenberg.org/license",
    "start of the project gutenberg license",
    "end of the project gutenberg license",
    "start of this project gutenberg ebook",
    "end of this project gutenberg ebook",
];

/// Pattern pairs that only together identify a license page.
const GUTENBERG_COMBO_PATTERNS: &[(&str, &str)] = &[
    ("project gutenberg", "terms of use"),
    ("full license", "gutenberg"),
];

/// Whether raw XHTML content is a Project Gutenberg license page.
///
/// The match runs over extracted plain text so markup and attributes cannot
/// produce false positives; when extraction fails the lowercased raw bytes
/// are searched instead.
pub(crate) fn is_gutenberg_license(data: &[u8]) -> bool {
    let text = match html::extract_text(data) {
        Ok(text) => text.to_lowercase(),
        Err(_) => String::from_utf8_lossy(data).to_lowercase(),
    };

    GUTENBERG_PATTERNS
        .iter()
        .any(|pattern| text.contains(pattern))
        || GUTENBERG_COMBO_PATTERNS
            .iter()
            .any(|(first, second)| text.contains(first) && text.contains(second))
}

/// The cached per-spine-entry state owned by the book.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChapterData {
    pub(crate) id: String,
    pub(crate) href: String,
    pub(crate) title: String,
    pub(crate) linear: bool,
    pub(crate) is_license: bool,
}

/// A handle to one spine entry of an open [`Book`].
///
/// Content is not embedded: [`raw_content`](Chapter::raw_content) and
/// friends fetch it lazily through the owning book, so handles stay cheap
/// to clone and hand around. The back-reference is a plain borrow and never
/// extends the book's lifetime.
#[derive(Debug, Clone, Default)]
pub struct Chapter<'book> {
    /// Manifest id of the chapter resource; empty when the spine reference
    /// did not resolve.
    pub id: String,
    /// Archive path of the chapter content.
    pub href: String,
    /// Title of the first navigation entry targeting this chapter
    /// (fragment ignored); empty when the chapter is not in the TOC.
    pub title: String,
    /// Whether the chapter is part of the linear reading order.
    pub linear: bool,
    /// Whether the chapter was identified as a Project Gutenberg license
    /// page. Populated by [`Book::content_chapters`]; `false` before the
    /// first license scan.
    pub is_license: bool,
    book: Option<&'book Book>,
}

impl<'book> Chapter<'book> {
    pub(crate) fn new(data: &ChapterData, book: &'book Book) -> Self {
        Self {
            id: data.id.clone(),
            href: data.href.clone(),
            title: data.title.clone(),
            linear: data.linear,
            is_license: data.is_license,
            book: Some(book),
        }
    }

    /// Reads the chapter's raw XHTML bytes, with a leading UTF-8 BOM
    /// stripped.
    ///
    /// # Errors
    /// [`InvalidChapter`](Error::InvalidChapter) on an unbound handle;
    /// otherwise the archive read errors.
    pub fn raw_content(&self) -> Result<Vec<u8>> {
        let book = self.book.ok_or(Error::InvalidChapter)?;
        let data = book.read_file(&self.href)?;

        Ok(strip_bom(&data).to_vec())
    }

    /// Extracts the chapter's plain text.
    ///
    /// Block-level elements produce line breaks; script and style content
    /// is skipped.
    pub fn text_content(&self) -> Result<String> {
        let data = self.raw_content()?;
        html::extract_text(&data)
    }

    /// Returns the sanitized inner HTML of the chapter's `<body>`.
    ///
    /// Relative image references are rewritten to archive-root paths,
    /// scripts and styles are removed, and event-handler attributes and
    /// unsafe URI schemes are stripped.
    pub fn body_html(&self) -> Result<String> {
        let data = self.raw_content()?;
        // Rewrite on the full document so the parser sees complete XHTML,
        // then reduce to the body.
        let rewritten = html::rewrite_image_paths(&data, &self.href);

        Ok(html::extract_body_html(rewritten.as_bytes()))
    }
}
