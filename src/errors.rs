//! Error-related types for a [`Book`](crate::Book).

use std::io;

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Possible errors when opening or reading a [`Book`](crate::Book).
///
/// Fatal while opening: [`DrmProtected`](Error::DrmProtected),
/// [`InvalidEpub`](Error::InvalidEpub), and any archive, I/O, or parse
/// failure on the package file itself. Everything else is surfaced
/// per call; recoverable oddities become [warnings](crate::Book::warnings)
/// instead.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The publication is protected by DRM (Adobe ADEPT, Apple FairPlay,
    /// Readium LCP, or an unrecognized encryption scheme) and cannot be read.
    ///
    /// Font obfuscation alone does not trigger this; it is reported as a
    /// warning while the book remains readable.
    #[error("file is DRM protected")]
    DrmProtected,

    /// Structural prerequisites are unmet, such as a missing package
    /// document or a container with no usable `rootfile` entry.
    #[error("invalid epub: {0}")]
    InvalidEpub(String),

    /// A [`Chapter`](crate::Chapter) handle is not bound to an open
    /// [`Book`](crate::Book) (for example, a default-constructed handle).
    #[error("chapter handle is not bound to a book")]
    InvalidChapter,

    /// The requested entry does not exist in the archive.
    #[error("entry not found in archive: {0}")]
    EntryNotFound(String),

    /// No cover image could be located by any detection strategy.
    #[error("no cover image found")]
    NoCover,

    /// An entry name or reference attempts path traversal or is absolute.
    #[error("unsafe archive path: {0}")]
    UnsafePath(String),

    /// Decompressing an entry would exceed the configured size limit.
    #[error("entry `{name}` exceeds the decompression limit of {limit} bytes")]
    EntryTooLarge {
        /// Name of the offending entry.
        name: String,
        /// The configured limit, in bytes.
        limit: u64,
    },

    /// The underlying XML decoder rejected the input.
    #[error("malformed {context}: {source}")]
    Parse {
        /// Which document failed to decode.
        context: &'static str,
        /// The decoder's diagnostic.
        source: quick_xml::Error,
    },

    /// The archive itself is unreadable: not a ZIP, truncated, or corrupt.
    #[error("unreadable archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Filesystem access failed while opening the book.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// An entry read was attempted after [`close`](crate::Book::close).
    ///
    /// Accessors over cached data keep working after close; only fresh
    /// archive reads fail with this.
    #[error("book is closed")]
    Closed,
}

impl Error {
    pub(crate) fn parse(context: &'static str, source: quick_xml::Error) -> Self {
        Error::Parse { context, source }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidEpub(message.into())
    }
}
