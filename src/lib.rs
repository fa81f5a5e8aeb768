//! # colophon
//!
//! A read-only inspection library for packaged electronic publications in
//! the EPUB family (versions 2 and 3).
//!
//! `colophon` opens the ZIP container, resolves and decodes the package
//! document, and exposes the structured data an application needs to list
//! a book, without interpreting or rendering anything:
//!
//! - aggregated bibliographic [`Metadata`] across both EPUB metadata
//!   dialects
//! - the navigation tree ([`Book::toc`], [`Book::landmarks`]) reconciled
//!   with the spine
//! - chapters in reading order, with lazy plain-text and sanitized HTML
//!   content
//! - a best-guess [cover image](Book::cover) found through a prioritized
//!   fallback cascade
//!
//! Real-world archives are treated leniently: missing attributes,
//! duplicate entries, stray BOMs, and unexpected casing are tolerated, and
//! recoverable oddities accumulate as [warnings](Book::warnings). DRM is
//! detected and rejected at open; font obfuscation is detected and
//! reported while the book stays readable.
//!
//! ## Examples
//! Opening a book and listing its chapters:
//! ```no_run
//! # fn main() -> colophon::Result<()> {
//! let book = colophon::Book::open("example.epub")?;
//!
//! let metadata = book.metadata();
//! println!("{} ({})", metadata.titles.join(" / "), metadata.version);
//!
//! for chapter in book.chapters() {
//!     println!("{}\t{}", chapter.href, chapter.title);
//! }
//! # Ok(())
//! # }
//! ```
//! Reading chapter content:
//! ```no_run
//! # fn main() -> colophon::Result<()> {
//! # let book = colophon::Book::open("example.epub")?;
//! for chapter in book.content_chapters() {
//!     let text = chapter.text_content()?;
//!     println!("{} words", text.split_whitespace().count());
//! }
//! # Ok(())
//! # }
//! ```

mod archive;
mod book;
mod chapter;
mod consts;
mod container;
mod cover;
mod drm;
mod entities;
pub mod errors;
mod html;
mod metadata;
mod opf;
mod toc;
mod util;
mod xml;

pub use self::book::{Book, Settings};
pub use self::chapter::Chapter;
pub use self::cover::CoverImage;
pub use self::errors::{Error, Result};
pub use self::metadata::{Author, Identifier, Metadata};
pub use self::opf::GuideReference;
pub use self::toc::TocItem;
