//! In-memory EPUB assembly for integration tests.

use colophon::{Book, Settings};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Builds a ZIP archive from `(path, content)` pairs.
///
/// A `mimetype` entry is written first and stored uncompressed, matching
/// the layout a conformant packager produces.
pub fn build_epub(files: &[(&str, &str)]) -> Cursor<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    if let Some((name, content)) = files.iter().find(|(name, _)| *name == "mimetype") {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file(name.to_owned(), options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }

    for (name, content) in files {
        if *name == "mimetype" {
            continue;
        }
        writer
            .start_file(name.to_owned(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }

    writer.finish().unwrap()
}

pub fn open_book(files: &[(&str, &str)]) -> colophon::Result<Book> {
    Book::from_reader(build_epub(files))
}

pub fn open_book_with(files: &[(&str, &str)], settings: Settings) -> colophon::Result<Book> {
    Book::from_reader_with(build_epub(files), settings)
}

pub const MIMETYPE: (&str, &str) = ("mimetype", "application/epub+zip");

pub const CONTAINER: (&str, &str) = (
    "META-INF/container.xml",
    r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
);

pub fn chapter_xhtml(title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>{title}</title></head>
<body>{body}</body>
</html>"#
    )
}
