//! The [`Book`] façade: opening, orchestration, and cached views.

use crate::archive::{Archive, DEFAULT_MAX_ENTRY_SIZE, ReadSeek};
use crate::chapter::{Chapter, ChapterData, is_gutenberg_license};
use crate::consts::{ocf, opf};
use crate::container;
use crate::drm;
use crate::errors::{Error, Result};
use crate::metadata::{self, Metadata};
use crate::opf::{GuideReference, Package, SpineItem, build_manifest_maps, build_spine, parse_package};
use crate::toc::{self, TocItem};
use crate::util::uri;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// Parsing and resource limits applied when opening a [`Book`].
#[derive(Clone, Debug)]
pub struct Settings {
    /// Maximum decompressed size of a single archive entry, in bytes.
    ///
    /// This is the primary defense against decompression bombs; reads that
    /// would exceed it fail with [`EntryTooLarge`](Error::EntryTooLarge).
    ///
    /// Default: 256 MiB.
    pub max_entry_size: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        }
    }
}

/// An opened EPUB publication.
///
/// A `Book` exposes the structured data needed to list a publication:
/// aggregated [`Metadata`], the navigation tree, chapters in spine order,
/// and a best-guess cover image. It never renders, mutates, or decrypts
/// anything.
///
/// Metadata and navigation are decoded eagerly while opening; chapter
/// content and license detection are lazy. Accessors return owned copies,
/// so holding onto the returned data never ties up the book.
///
/// A `Book` is not safe for concurrent use; wrap it in external
/// synchronization when sharing across threads.
///
/// # Examples
/// ```no_run
/// # fn main() -> colophon::Result<()> {
/// let book = colophon::Book::open("example.epub")?;
///
/// println!("{}", book.metadata().titles.join(" / "));
/// for chapter in book.chapters() {
///     println!("{}: {}", chapter.href, chapter.title);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Book {
    pub(crate) archive: Archive,
    /// Archive path of the package document.
    pub(crate) package_path: String,
    pub(crate) package: Package,
    /// Manifest lookups keyed into `package.manifest`; insertion ordered,
    /// first item wins on duplicate keys.
    pub(crate) manifest_by_id: IndexMap<String, usize>,
    pub(crate) manifest_by_href: IndexMap<String, usize>,
    pub(crate) spine: Vec<SpineItem>,
    pub(crate) guide: Vec<GuideReference>,
    metadata: Metadata,
    toc: Vec<TocItem>,
    landmarks: Vec<TocItem>,
    chapters: RefCell<Option<Vec<ChapterData>>>,
    warnings: Vec<String>,
    license_scan_done: Cell<bool>,
}

impl Book {
    /// Opens an EPUB file at the given path with default [`Settings`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, Settings::default())
    }

    /// Opens an EPUB file at the given path.
    ///
    /// # Errors
    /// - [`Io`](Error::Io) / [`Archive`](Error::Archive): the file is
    ///   missing or not a readable ZIP.
    /// - [`DrmProtected`](Error::DrmProtected): real DRM was detected.
    /// - [`InvalidEpub`](Error::InvalidEpub): no usable package document.
    /// - [`Parse`](Error::Parse): the package document is malformed.
    pub fn open_with(path: impl AsRef<Path>, settings: Settings) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_boxed_reader(Box::new(BufReader::new(file)), settings)
    }

    /// Opens an EPUB from any random-access reader with default
    /// [`Settings`].
    ///
    /// The reader is consumed and released when the book is
    /// [closed](Self::close) or dropped.
    pub fn from_reader<R: Read + Seek + 'static>(reader: R) -> Result<Self> {
        Self::from_reader_with(reader, Settings::default())
    }

    /// Opens an EPUB from any random-access reader.
    ///
    /// See [`Self::open_with`] for the error contract.
    pub fn from_reader_with<R: Read + Seek + 'static>(
        reader: R,
        settings: Settings,
    ) -> Result<Self> {
        Self::from_boxed_reader(Box::new(reader), settings)
    }

    fn from_boxed_reader(reader: Box<dyn ReadSeek>, settings: Settings) -> Result<Self> {
        let archive = Archive::new(reader, settings.max_entry_size)?;
        Self::init(archive)
    }

    /// Common initialization: mimetype validation, container resolution,
    /// DRM detection, package decoding, then metadata and navigation.
    fn init(archive: Archive) -> Result<Self> {
        let mut warnings = Vec::new();
        validate_mimetype(&archive, &mut warnings);

        let package_path = container::locate_package(&archive)?;

        let font_obfuscation = drm::check_drm(&archive)?;
        if font_obfuscation {
            warnings.push(
                "font obfuscation detected; obfuscated fonts may not render correctly".to_owned(),
            );
        }

        let data = archive.read(&package_path).map_err(|error| match error {
            Error::EntryNotFound(name) => {
                Error::invalid(format!("package document not found in archive: {name}"))
            }
            other => other,
        })?;
        let package = parse_package(&data)?;

        let (manifest_by_id, manifest_by_href) = build_manifest_maps(&package.manifest);
        let spine = build_spine(&package.spine, &package.manifest, &manifest_by_id);
        let guide = package.guide.clone();
        let metadata = metadata::aggregate(&package);

        let mut book = Self {
            archive,
            package_path,
            package,
            manifest_by_id,
            manifest_by_href,
            spine,
            guide,
            metadata,
            toc: Vec::new(),
            landmarks: Vec::new(),
            chapters: RefCell::new(None),
            warnings,
            license_scan_done: Cell::new(false),
        };
        // Navigation problems are never fatal; the toc stays empty.
        book.parse_toc();

        Ok(book)
    }

    /// Releases the underlying reader. Idempotent.
    ///
    /// Accessors over already-decoded data keep working afterwards; fresh
    /// archive reads fail with [`Closed`](Error::Closed).
    pub fn close(&self) {
        self.archive.close();
    }

    /// The archive path of the package (`.opf`) document.
    pub fn package_path(&self) -> &str {
        &self.package_path
    }

    /// The aggregated bibliographic metadata.
    pub fn metadata(&self) -> Metadata {
        self.metadata.clone()
    }

    /// The table of contents, as a tree in document order.
    ///
    /// Matched entries carry their spine index and the half-open spine
    /// range they cover; unmatched entries hold `-1` for both.
    pub fn toc(&self) -> Vec<TocItem> {
        self.toc.clone()
    }

    /// Whether the publication carries a non-empty table of contents.
    pub fn has_toc(&self) -> bool {
        !self.toc.is_empty()
    }

    /// The landmarks of an EPUB 3 nav document. Empty for EPUB 2 files
    /// and when the nav document defines none.
    pub fn landmarks(&self) -> Vec<TocItem> {
        self.landmarks.clone()
    }

    /// The legacy EPUB 2 guide references, in document order.
    pub fn guide(&self) -> Vec<GuideReference> {
        self.guide.clone()
    }

    /// The `unique-identifier` attribute of the package element: the XML
    /// id of the identifier that names this publication. May be empty.
    pub fn unique_identifier(&self) -> &str {
        &self.package.unique_identifier
    }

    /// Non-fatal problems encountered while opening, as a snapshot.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.clone()
    }

    /// Reads an archive entry by its path. The lookup falls back to a
    /// case-insensitive match.
    ///
    /// # Errors
    /// [`EntryNotFound`](Error::EntryNotFound), [`UnsafePath`](Error::UnsafePath),
    /// [`EntryTooLarge`](Error::EntryTooLarge), or [`Closed`](Error::Closed).
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        self.archive.read(name)
    }

    /// The chapters in spine order.
    ///
    /// Chapter handles are lightweight; content loads lazily through the
    /// book. Titles come from the first navigation entry pointing at the
    /// chapter. The list is built once and cached.
    ///
    /// `is_license` is not populated here; call
    /// [`content_chapters`](Self::content_chapters) to run license
    /// detection, after which handles returned from this method carry the
    /// updated flag as well.
    pub fn chapters(&self) -> Vec<Chapter<'_>> {
        self.ensure_chapters();

        let cache = self.chapters.borrow();
        cache
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|data| Chapter::new(data, self))
            .collect()
    }

    /// The chapters in spine order, excluding detected Project Gutenberg
    /// license pages.
    ///
    /// The first call reads every chapter to run the detection; later
    /// calls reuse the cached outcome.
    pub fn content_chapters(&self) -> Vec<Chapter<'_>> {
        self.detect_licenses();

        let cache = self.chapters.borrow();
        cache
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|data| !data.is_license)
            .map(|data| Chapter::new(data, self))
            .collect()
    }

    /// Resolves a package-relative href to an archive-root path.
    pub(crate) fn resolve_opf(&self, href: &str) -> String {
        if href.trim().is_empty() {
            return String::new();
        }
        uri::resolve(&self.package_path, href)
    }

    fn ensure_chapters(&self) {
        let mut cache = self.chapters.borrow_mut();
        if cache.is_some() {
            return;
        }

        let titles = toc::build_title_map(&self.toc);
        let chapters = self
            .spine
            .iter()
            .map(|item| {
                let href = self.resolve_opf(&item.href);
                let title = titles.get(&href).cloned().unwrap_or_default();
                ChapterData {
                    id: item.id.clone(),
                    href,
                    title,
                    linear: item.linear,
                    is_license: false,
                }
            })
            .collect();

        *cache = Some(chapters);
    }

    /// Reads every chapter once and flags Gutenberg license pages.
    fn detect_licenses(&self) {
        if self.license_scan_done.get() {
            return;
        }
        self.ensure_chapters();

        let mut cache = self.chapters.borrow_mut();
        if let Some(chapters) = cache.as_mut() {
            for chapter in chapters.iter_mut() {
                if let Ok(raw) = self.archive.read(&chapter.href) {
                    chapter.is_license = is_gutenberg_license(&raw);
                }
            }
        }

        self.license_scan_done.set(true);
    }

    ////////////////////////////////////////////////////////////////////////
    // Navigation selection
    ////////////////////////////////////////////////////////////////////////

    /// Chooses and parses the navigation source.
    ///
    /// EPUB 3 prefers the XHTML nav document and falls back to the NCX
    /// when it is absent, unreadable, or defines no toc nav; EPUB 2 goes
    /// straight to the NCX. Failures leave the toc empty.
    fn parse_toc(&mut self) {
        let spine_map = self.build_spine_map();
        let spine_len = self.spine.len();

        if self.metadata.version.starts_with('3') {
            if let Some(nav) = self.load_nav_document() {
                if let Some(mut landmarks) = nav.landmarks {
                    toc::assign_spine_indices(&mut landmarks, &spine_map);
                    toc::compute_spine_ranges(&mut landmarks, spine_len);
                    self.landmarks = landmarks;
                }
                if let Some(mut entries) = nav.toc {
                    toc::assign_spine_indices(&mut entries, &spine_map);
                    toc::compute_spine_ranges(&mut entries, spine_len);
                    self.toc = entries;
                    return;
                }
                log::debug!("nav document defines no toc nav; trying ncx");
            }
        }

        if let Some(mut entries) = self.load_ncx() {
            toc::assign_spine_indices(&mut entries, &spine_map);
            toc::compute_spine_ranges(&mut entries, spine_len);
            self.toc = entries;
        }
    }

    /// Maps each spine item's archive path to its spine position.
    fn build_spine_map(&self) -> HashMap<String, usize> {
        let mut map = HashMap::with_capacity(self.spine.len());
        for (index, item) in self.spine.iter().enumerate() {
            let href = self.resolve_opf(&item.href);
            if !href.is_empty() {
                map.insert(href, index);
            }
        }
        map
    }

    /// Locates, reads, and parses the EPUB 3 nav document.
    fn load_nav_document(&mut self) -> Option<toc::NavDocument> {
        // Manifest document order decides between multiple nav candidates.
        let nav_item = self.package.manifest.iter().find(|item| {
            item.properties
                .split_whitespace()
                .any(|property| property == opf::NAV_PROPERTY)
        })?;

        let nav_path = self.resolve_opf(&nav_item.href);
        self.archive.find(&nav_path)?;

        let data = match self.archive.read(&nav_path) {
            Ok(data) => data,
            Err(error) => {
                self.warnings
                    .push(format!("failed to read nav document: {error}"));
                return None;
            }
        };

        Some(toc::parse_nav_document(&data, &nav_path))
    }

    /// Locates, reads, and parses the NCX named by the spine `toc`
    /// attribute, with spine indices left unassigned.
    fn load_ncx(&mut self) -> Option<Vec<TocItem>> {
        let toc_id = self.package.spine.toc.as_str();
        if toc_id.is_empty() {
            return None;
        }

        let item = self
            .manifest_by_id
            .get(toc_id)
            .map(|&index| &self.package.manifest[index])?;
        let ncx_path = self.resolve_opf(&item.href);
        self.archive.find(&ncx_path)?;

        let data = match self.archive.read(&ncx_path) {
            Ok(data) => data,
            Err(error) => {
                self.warnings
                    .push(format!("failed to read ncx document: {error}"));
                return None;
            }
        };

        match toc::parse_ncx(&data, &ncx_path) {
            Ok(entries) => Some(entries),
            Err(error) => {
                self.warnings
                    .push(format!("failed to parse ncx document: {error}"));
                None
            }
        }
    }
}

impl Debug for Book {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("Book")
            .field("package_path", &self.package_path)
            .field("metadata", &self.metadata)
            .field("spine_len", &self.spine.len())
            .field("toc_len", &self.toc.len())
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

/// Checks the `mimetype` entry: it should be the archive's first entry and
/// contain exactly `application/epub+zip`. Deviations are warnings, never
/// fatal.
fn validate_mimetype(archive: &Archive, warnings: &mut Vec<String>) {
    let Some(first) = archive.entries().first() else {
        warnings.push("empty archive; mimetype entry missing".to_owned());
        return;
    };
    if first.name != ocf::MIMETYPE_PATH {
        warnings.push(format!("first archive entry is not \"mimetype\": {:?}", first.name));
        return;
    }

    match archive.read_index(0) {
        Ok(data) => {
            if data != ocf::MIMETYPE.as_bytes() {
                warnings.push(format!(
                    "unexpected mimetype: {:?}",
                    String::from_utf8_lossy(&data)
                ));
            }
        }
        Err(error) => warnings.push(format!("cannot read mimetype entry: {error}")),
    }
}
