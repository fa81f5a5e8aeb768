//! Cover image detection.
//!
//! No single convention survived the format's history: EPUB 3 defines a
//! `cover-image` manifest property, EPUB 2 used a `cover` meta entry or a
//! guide reference to a cover page, and plenty of books rely on naming
//! alone. Detection runs a prioritized cascade over all of them; a strategy
//! whose pick turns out to be unreadable falls through to the next.

use crate::book::Book;
use crate::consts::{opf, xhtml};
use crate::errors::{Error, Result};
use crate::html;
use crate::util::str::StrExt;
use crate::util::uri;

/// A detected cover image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    /// Archive path of the image file.
    pub path: String,
    /// MIME type as declared by the manifest, e.g. `image/jpeg`.
    pub media_type: String,
    /// The raw image bytes.
    pub data: Vec<u8>,
}

impl Book {
    /// Detects and returns the cover image.
    ///
    /// Strategies, first hit wins:
    /// 1. manifest item with the `cover-image` property (EPUB 3)
    /// 2. `<meta name="cover">` resolved through the manifest (EPUB 2),
    ///    following an XHTML cover page to its first image if needed
    /// 3. guide reference of type `cover`, parsed for its first image
    /// 4. manifest item with an image media type and `cover` in its id or
    ///    href
    /// 5. first image of the first spine document
    ///
    /// # Errors
    /// [`NoCover`](Error::NoCover) when every strategy comes up empty.
    pub fn cover(&self) -> Result<CoverImage> {
        let strategies: [(&str, fn(&Self) -> Option<usize>); 5] = [
            ("manifest cover-image property", Self::cover_from_manifest_properties),
            ("meta cover reference", Self::cover_from_meta),
            ("guide cover reference", Self::cover_from_guide),
            ("manifest name heuristic", Self::cover_from_manifest_heuristic),
            ("first spine image", Self::cover_from_first_spine),
        ];

        for (label, strategy) in strategies {
            let Some(index) = strategy(self) else {
                continue;
            };
            match self.load_cover_image(index) {
                Ok(cover) => return Ok(cover),
                Err(error) => {
                    // An unreachable pick disqualifies the strategy, not
                    // the whole cascade.
                    log::debug!("cover strategy `{label}` failed to load: {error}");
                }
            }
        }

        Err(Error::NoCover)
    }

    /// Strategy 1: the EPUB 3 `cover-image` manifest property, in
    /// manifest document order.
    fn cover_from_manifest_properties(&self) -> Option<usize> {
        self.package.manifest.iter().position(|item| {
            item.properties
                .split_whitespace()
                .any(|property| property == opf::COVER_IMAGE)
        })
    }

    /// Strategy 2: `<meta name="cover" content="id"/>`. A non-image target
    /// is treated as an XHTML cover page and followed to its first image.
    fn cover_from_meta(&self) -> Option<usize> {
        for meta in &self.package.metadata.metas {
            if !meta.name.eq_ignore_ascii_case(opf::COVER) || meta.content.is_empty() {
                continue;
            }
            let Some(&index) = self.manifest_by_id.get(&meta.content) else {
                continue;
            };
            if is_image_media_type(&self.package.manifest[index].media_type) {
                return Some(index);
            }

            let href = self.package.manifest[index].href.clone();
            if let Some(image) = self.first_image_of_page(&href) {
                return Some(image);
            }
        }
        None
    }

    /// Strategy 3: a guide reference of type `cover`, followed to the
    /// first image of the referenced page.
    fn cover_from_guide(&self) -> Option<usize> {
        for reference in &self.guide {
            if !reference.kind.eq_ignore_ascii_case(opf::COVER) {
                continue;
            }
            let href = crate::toc::href_without_fragment(&reference.href);
            if let Some(image) = self.first_image_of_page(href) {
                return Some(image);
            }
        }
        None
    }

    /// Strategy 4: an image manifest item named like a cover, in manifest
    /// document order.
    fn cover_from_manifest_heuristic(&self) -> Option<usize> {
        self.package.manifest.iter().position(|item| {
            is_image_media_type(&item.media_type)
                && (item.id.contains_ignore_case(opf::COVER)
                    || item.href.contains_ignore_case(opf::COVER))
        })
    }

    /// Strategy 5: the first image of the first spine document.
    fn cover_from_first_spine(&self) -> Option<usize> {
        let first = self.spine.first()?;
        if first.href.is_empty() {
            return None;
        }
        self.first_image_of_page(&first.href)
    }

    /// Reads the XHTML page at the package-relative `href` and resolves
    /// its first image reference to a manifest item.
    fn first_image_of_page(&self, href: &str) -> Option<usize> {
        let page_path = self.resolve_opf(href);
        let data = self.archive.read(&page_path).ok()?;

        let image_path = html::find_first_image(&data, &page_path);
        if image_path.is_empty() {
            return None;
        }
        self.resolve_image_item(&image_path)
    }

    /// Resolves an archive-root image path back to a manifest item,
    /// retrying case-insensitively when the exact href misses.
    fn resolve_image_item(&self, image_path: &str) -> Option<usize> {
        let package_dir = uri::parent(&self.package_path);
        let relative = if package_dir.is_empty() {
            image_path
        } else {
            image_path
                .strip_prefix(package_dir)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(image_path)
        };

        for key in [relative, image_path] {
            if let Some(&index) = self.manifest_by_href.get(key) {
                if is_image_media_type(&self.package.manifest[index].media_type) {
                    return Some(index);
                }
            }
        }

        // Last resort: scan the manifest comparing hrefs without case.
        self.package.manifest.iter().position(|item| {
            is_image_media_type(&item.media_type)
                && (item.href.eq_ignore_ascii_case(relative)
                    || item.href.eq_ignore_ascii_case(image_path)
                    || self.resolve_opf(&item.href).eq_ignore_ascii_case(image_path))
        })
    }

    /// Reads the selected manifest item's bytes into a [`CoverImage`].
    fn load_cover_image(&self, index: usize) -> Result<CoverImage> {
        let item = &self.package.manifest[index];
        let path = self.resolve_opf(&item.href);
        let data = self.archive.read(&path)?;

        Ok(CoverImage {
            path,
            media_type: item.media_type.clone(),
            data,
        })
    }
}

fn is_image_media_type(media_type: &str) -> bool {
    media_type
        .trim()
        .starts_with_ignore_case(xhtml::IMAGE_MEDIA_PREFIX)
}
