mod common;

use colophon::{Error, Settings};
use common::{CONTAINER, MIMETYPE, chapter_xhtml, open_book, open_book_with};

const EPUB2_OPF: (&str, &str) = (
    "OEBPS/content.opf",
    r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="uid" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"
            xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Voyage of the Paper Skiff</dc:title>
    <dc:creator opf:file-as="Mariner, Ada" opf:role="aut">Ada Mariner</dc:creator>
    <dc:creator opf:file-as="Quill, Ben" opf:role="ill">Ben Quill</dc:creator>
    <dc:identifier id="uid" opf:scheme="UUID">urn:uuid:8c272a40-0001</dc:identifier>
    <dc:language>en</dc:language>
    <dc:publisher>Driftwood Press</dc:publisher>
    <dc:date>1921</dc:date>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/>
    <item id="c2" href="c2.xhtml" media-type="application/xhtml+xml"/>
    <item id="c3" href="c3.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="c1"/>
    <itemref idref="c2"/>
    <itemref idref="c3" linear="no"/>
  </spine>
</package>"#,
);

const EPUB2_NCX: (&str, &str) = (
    "OEBPS/toc.ncx",
    r#"<?xml version="1.0" encoding="utf-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:8c272a40-0001"/></head>
  <docTitle><text>Voyage of the Paper Skiff</text></docTitle>
  <navMap>
    <navPoint id="n1" playOrder="1">
      <navLabel><text>Setting Sail</text></navLabel>
      <content src="c1.xhtml"/>
    </navPoint>
    <navPoint id="n2" playOrder="2">
      <navLabel><text>Open Water</text></navLabel>
      <content src="c2.xhtml"/>
    </navPoint>
    <navPoint id="n3" playOrder="3">
      <navLabel><text>Appendix</text></navLabel>
      <content src="c3.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#,
);

fn epub2_files() -> Vec<(&'static str, String)> {
    vec![
        (MIMETYPE.0, MIMETYPE.1.to_owned()),
        (CONTAINER.0, CONTAINER.1.to_owned()),
        (EPUB2_OPF.0, EPUB2_OPF.1.to_owned()),
        (EPUB2_NCX.0, EPUB2_NCX.1.to_owned()),
        ("OEBPS/c1.xhtml", chapter_xhtml("One", "<p>Setting sail.</p>")),
        ("OEBPS/c2.xhtml", chapter_xhtml("Two", "<p>Open water.</p>")),
        ("OEBPS/c3.xhtml", chapter_xhtml("Three", "<p>Appendix.</p>")),
    ]
}

fn as_pairs<'a>(files: &'a [(&'a str, String)]) -> Vec<(&'a str, &'a str)> {
    files
        .iter()
        .map(|(name, content)| (*name, content.as_str()))
        .collect()
}

#[test]
fn test_epub2_happy_path() {
    let files = epub2_files();
    let book = open_book(&as_pairs(&files)).unwrap();

    let metadata = book.metadata();
    assert_eq!("2.0", metadata.version);
    assert_eq!(vec!["Voyage of the Paper Skiff"], metadata.titles);
    assert_eq!(2, metadata.authors.len());
    assert_eq!("Ada Mariner", metadata.authors[0].name);
    assert_eq!("Mariner, Ada", metadata.authors[0].file_as);
    assert_eq!("aut", metadata.authors[0].role);
    assert_eq!("ill", metadata.authors[1].role);
    assert_eq!("UUID", metadata.identifiers[0].scheme);
    assert_eq!("Driftwood Press", metadata.publisher);
    assert_eq!("1921", metadata.date);

    assert_eq!("OEBPS/content.opf", book.package_path());
    assert!(book.warnings().is_empty(), "{:?}", book.warnings());

    let chapters = book.chapters();
    assert_eq!(3, chapters.len());
    assert_eq!(
        vec![true, true, false],
        chapters.iter().map(|c| c.linear).collect::<Vec<_>>()
    );
    assert_eq!("OEBPS/c1.xhtml", chapters[0].href);
    assert_eq!("Setting Sail", chapters[0].title);
    assert_eq!("c2", chapters[1].id);

    assert!(book.has_toc());
    let toc = book.toc();
    assert_eq!(3, toc.len());
    assert_eq!(
        vec![(0, 1), (1, 2), (2, 3)],
        toc.iter()
            .map(|entry| (entry.spine_index, entry.spine_end_index))
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_chapter_content() {
    let files = epub2_files();
    let book = open_book(&as_pairs(&files)).unwrap();
    let chapters = book.chapters();

    let raw = chapters[0].raw_content().unwrap();
    assert!(raw.starts_with(b"<?xml"));

    // The head's title text is part of the document text.
    assert_eq!("One\nSetting sail.", chapters[0].text_content().unwrap());
    assert_eq!("<p>Open water.</p>", chapters[1].body_html().unwrap());
}

#[test]
fn test_epub3_display_seq_reorders_titles() {
    let opf = r##"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="uid" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title id="t1">A Companion Volume</dc:title>
    <dc:title id="t2">The Main Event</dc:title>
    <dc:identifier id="uid">urn:uuid:0002</dc:identifier>
    <dc:language>en</dc:language>
    <meta refines="#t1" property="display-seq">2</meta>
    <meta refines="#t2" property="display-seq">1</meta>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="c1"/></spine>
</package>"##;
    let nav = r#"<html xmlns:epub="http://www.idpf.org/2007/ops"><body>
<nav epub:type="toc"><ol><li><a href="c1.xhtml">One</a></li></ol></nav>
</body></html>"#;
    let c1 = chapter_xhtml("One", "<p>content</p>");
    let files = [
        MIMETYPE,
        CONTAINER,
        ("OEBPS/content.opf", opf),
        ("OEBPS/nav.xhtml", nav),
        ("OEBPS/c1.xhtml", c1.as_str()),
    ];

    let book = open_book(&files).unwrap();

    assert_eq!(
        vec!["The Main Event", "A Companion Volume"],
        book.metadata().titles
    );
}

#[test]
fn test_epub3_nav_document() {
    let opf = r#"<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Navigated</dc:title>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/>
    <item id="c2" href="c2.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="c1"/>
    <itemref idref="c2"/>
  </spine>
</package>"#;
    let nav = r#"<html xmlns:epub="http://www.idpf.org/2007/ops"><body>
<nav epub:type="toc">
  <h1>Contents</h1>
  <ol>
    <li><a href="c1.xhtml">Part One</a>
      <ol><li><a href="c2.xhtml#start">Part Two</a></li></ol>
    </li>
  </ol>
</nav>
<nav epub:type="landmarks">
  <ol>
    <li><a epub:type="bodymatter" href="c1.xhtml">Start of Content</a></li>
  </ol>
</nav>
</body></html>"#;
    let c1 = chapter_xhtml("One", "<p>one</p>");
    let c2 = chapter_xhtml("Two", "<p>two</p>");
    let files = [
        MIMETYPE,
        CONTAINER,
        ("OEBPS/content.opf", opf),
        ("OEBPS/nav.xhtml", nav),
        ("OEBPS/c1.xhtml", c1.as_str()),
        ("OEBPS/c2.xhtml", c2.as_str()),
    ];

    let book = open_book(&files).unwrap();

    let toc = book.toc();
    assert_eq!(1, toc.len());
    assert_eq!("Part One", toc[0].title);
    assert_eq!((0, 1), (toc[0].spine_index, toc[0].spine_end_index));
    let child = &toc[0].children[0];
    assert_eq!("OEBPS/c2.xhtml#start", child.href);
    assert_eq!((1, 2), (child.spine_index, child.spine_end_index));

    let landmarks = book.landmarks();
    assert_eq!(1, landmarks.len());
    assert_eq!("Start of Content", landmarks[0].title);
    assert_eq!((0, 2), (landmarks[0].spine_index, landmarks[0].spine_end_index));
}

#[test]
fn test_sparse_toc_ranges() {
    let opf = r#"<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Sparse</dc:title><dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/>
    <item id="c2" href="c2.xhtml" media-type="application/xhtml+xml"/>
    <item id="c3" href="c3.xhtml" media-type="application/xhtml+xml"/>
    <item id="c4" href="c4.xhtml" media-type="application/xhtml+xml"/>
    <item id="c5" href="c5.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="c1"/><itemref idref="c2"/><itemref idref="c3"/>
    <itemref idref="c4"/><itemref idref="c5"/>
  </spine>
</package>"#;
    let ncx = r#"<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/">
  <navMap>
    <navPoint id="n1"><navLabel><text>Front</text></navLabel><content src="c1.xhtml"/></navPoint>
    <navPoint id="n2"><navLabel><text>Back</text></navLabel><content src="c4.xhtml"/></navPoint>
  </navMap>
</ncx>"#;
    let page = chapter_xhtml("p", "<p>x</p>");
    let files = [
        MIMETYPE,
        CONTAINER,
        ("OEBPS/content.opf", opf),
        ("OEBPS/toc.ncx", ncx),
        ("OEBPS/c1.xhtml", page.as_str()),
        ("OEBPS/c2.xhtml", page.as_str()),
        ("OEBPS/c3.xhtml", page.as_str()),
        ("OEBPS/c4.xhtml", page.as_str()),
        ("OEBPS/c5.xhtml", page.as_str()),
    ];

    let book = open_book(&files).unwrap();
    let toc = book.toc();

    assert_eq!((0, 3), (toc[0].spine_index, toc[0].spine_end_index));
    assert_eq!((3, 5), (toc[1].spine_index, toc[1].spine_end_index));
}

#[test]
fn test_cover_priority_manifest_property_wins() {
    let opf = r#"<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Covered</dc:title><dc:language>en</dc:language>
    <meta name="cover" content="meta-cover"/>
  </metadata>
  <manifest>
    <item id="meta-cover" href="meta-cover.jpg" media-type="image/jpeg"/>
    <item id="prop-cover" href="prop-cover.png" media-type="image/png" properties="cover-image"/>
    <item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="c1"/></spine>
</package>"#;
    let c1 = chapter_xhtml("One", "<p>x</p>");
    let files = [
        MIMETYPE,
        CONTAINER,
        ("OEBPS/content.opf", opf),
        ("OEBPS/meta-cover.jpg", "jpeg-bytes"),
        ("OEBPS/prop-cover.png", "png-bytes"),
        ("OEBPS/c1.xhtml", c1.as_str()),
    ];

    let book = open_book(&files).unwrap();
    let cover = book.cover().unwrap();

    assert_eq!("OEBPS/prop-cover.png", cover.path);
    assert_eq!("image/png", cover.media_type);
    assert_eq!(b"png-bytes", cover.data.as_slice());
}

#[test]
fn test_cover_from_meta_xhtml_page() {
    let opf = r#"<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Covered</dc:title><dc:language>en</dc:language>
    <meta name="cover" content="cover-page"/>
  </metadata>
  <manifest>
    <item id="cover-page" href="title.xhtml" media-type="application/xhtml+xml"/>
    <item id="art" href="images/frontispiece.png" media-type="image/png"/>
    <item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="c1"/></spine>
</package>"#;
    let title_page = chapter_xhtml("Cover", r#"<img src="images/frontispiece.png"/>"#);
    let c1 = chapter_xhtml("One", "<p>x</p>");
    let files = [
        MIMETYPE,
        CONTAINER,
        ("OEBPS/content.opf", opf),
        ("OEBPS/title.xhtml", title_page.as_str()),
        ("OEBPS/images/frontispiece.png", "png-bytes"),
        ("OEBPS/c1.xhtml", c1.as_str()),
    ];

    let book = open_book(&files).unwrap();
    let cover = book.cover().unwrap();

    assert_eq!("OEBPS/images/frontispiece.png", cover.path);
    assert_eq!("image/png", cover.media_type);
}

#[test]
fn test_no_cover() {
    let files = epub2_files();
    let book = open_book(&as_pairs(&files)).unwrap();

    assert!(matches!(book.cover(), Err(Error::NoCover)));
}

#[test]
fn test_drm_rejection() {
    let mut files = epub2_files();
    files.push(("META-INF/sinf.xml", "<sinf/>".to_owned()));

    assert!(matches!(
        open_book(&as_pairs(&files)),
        Err(Error::DrmProtected)
    ));
}

#[test]
fn test_font_obfuscation_warning() {
    let encryption = r#"<encryption xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <EncryptedData xmlns="http://www.w3.org/2001/04/xmlenc#">
    <EncryptionMethod Algorithm="http://www.idpf.org/2008/embedding"/>
    <CipherData><CipherReference URI="Fonts/serif.otf"/></CipherData>
  </EncryptedData>
</encryption>"#;
    let mut files = epub2_files();
    files.push(("META-INF/encryption.xml", encryption.to_owned()));

    let book = open_book(&as_pairs(&files)).unwrap();

    assert!(
        book.warnings()
            .iter()
            .any(|warning| warning.contains("font obfuscation")),
        "{:?}",
        book.warnings()
    );
}

#[test]
fn test_mimetype_warnings() {
    let mut files = epub2_files();
    files[0] = ("mimetype", "application/zip".to_owned());

    let book = open_book(&as_pairs(&files)).unwrap();
    assert!(
        book.warnings()
            .iter()
            .any(|warning| warning.contains("unexpected mimetype"))
    );

    // Without a mimetype entry the first entry has the wrong name.
    let files = epub2_files();
    let book = open_book(&as_pairs(&files)[1..]).unwrap();
    assert!(
        book.warnings()
            .iter()
            .any(|warning| warning.contains("mimetype"))
    );
}

#[test]
fn test_container_fallback_scans_for_opf() {
    let files = epub2_files();
    let without_container: Vec<_> = as_pairs(&files)
        .into_iter()
        .filter(|(name, _)| *name != CONTAINER.0)
        .collect();

    let book = open_book(&without_container).unwrap();

    assert_eq!("OEBPS/content.opf", book.package_path());
    assert_eq!(vec!["Voyage of the Paper Skiff"], book.metadata().titles);
}

#[test]
fn test_invalid_epub_without_package() {
    let files = [MIMETYPE, ("OEBPS/c1.xhtml", "<html/>")];

    assert!(matches!(open_book(&files), Err(Error::InvalidEpub(_))));
}

#[test]
fn test_case_insensitive_read() {
    let files = epub2_files();
    let book = open_book(&as_pairs(&files)).unwrap();

    let exact = book.read_file("OEBPS/c1.xhtml").unwrap();
    let fallback = book.read_file("oebps/C1.XHTML").unwrap();

    assert_eq!(exact, fallback);
    assert!(matches!(
        book.read_file("OEBPS/void.xhtml"),
        Err(Error::EntryNotFound(_))
    ));
}

#[test]
fn test_entry_size_limit() {
    let files = epub2_files();

    let result = open_book_with(&as_pairs(&files), Settings { max_entry_size: 64 });

    assert!(matches!(result, Err(Error::EntryTooLarge { limit: 64, .. })));
}

#[test]
fn test_close_is_idempotent() {
    let files = epub2_files();
    let book = open_book(&as_pairs(&files)).unwrap();

    book.close();
    book.close();

    // Cached views keep working; fresh reads are refused.
    assert_eq!("2.0", book.metadata().version);
    assert_eq!(3, book.toc().len());
    assert!(matches!(
        book.read_file("OEBPS/c1.xhtml"),
        Err(Error::Closed)
    ));
}

#[test]
fn test_defensive_copies() {
    let files = epub2_files();
    let book = open_book(&as_pairs(&files)).unwrap();

    let mut metadata = book.metadata();
    assert_eq!(metadata, book.metadata());
    metadata.titles.push("Injected".to_owned());
    assert_eq!(vec!["Voyage of the Paper Skiff"], book.metadata().titles);

    let mut toc = book.toc();
    toc[0].title = "Tampered".to_owned();
    assert_eq!("Setting Sail", book.toc()[0].title);
}

#[test]
fn test_content_chapters_filters_license_pages() {
    let license = chapter_xhtml(
        "License",
        "<p>*** START OF THE PROJECT GUTENBERG LICENSE ***</p>",
    );
    let mut files = epub2_files();
    files[6] = ("OEBPS/c3.xhtml", license);

    let book = open_book(&as_pairs(&files)).unwrap();

    // Before the scan the flag is unset.
    assert!(book.chapters().iter().all(|chapter| !chapter.is_license));

    let content = book.content_chapters();
    assert_eq!(2, content.len());
    assert!(content.iter().all(|chapter| !chapter.is_license));

    // After the scan, the full list reflects the flag.
    let chapters = book.chapters();
    assert_eq!(3, chapters.len());
    assert!(chapters[2].is_license);
}

#[test]
fn test_body_html_rewrites_images() {
    let page = chapter_xhtml(
        "Art",
        r#"<p onload="x()">Figure:</p><img src="images/fig.png"/><script>x()</script>"#,
    );
    let mut files = epub2_files();
    files[4] = ("OEBPS/c1.xhtml", page);

    let book = open_book(&as_pairs(&files)).unwrap();
    let body = book.chapters()[0].body_html().unwrap();

    assert!(body.contains(r#"src="OEBPS/images/fig.png""#), "{body}");
    assert!(!body.contains("script"));
    assert!(!body.contains("onload"));
}

#[test]
fn test_unresolved_spine_reference_keeps_position() {
    let opf = r#"<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Holes</dc:title><dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="missing"/>
    <itemref idref="c1"/>
  </spine>
</package>"#;
    let c1 = chapter_xhtml("One", "<p>x</p>");
    let files = [
        MIMETYPE,
        CONTAINER,
        ("OEBPS/content.opf", opf),
        ("OEBPS/c1.xhtml", c1.as_str()),
    ];

    let book = open_book(&files).unwrap();
    let chapters = book.chapters();

    assert_eq!(2, chapters.len());
    assert_eq!("", chapters[0].href);
    assert_eq!("OEBPS/c1.xhtml", chapters[1].href);
}

#[test]
fn test_empty_spine() {
    let opf = r#"<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Empty</dc:title><dc:language>en</dc:language>
  </metadata>
  <manifest/>
  <spine/>
</package>"#;
    let files = [MIMETYPE, CONTAINER, ("OEBPS/content.opf", opf)];

    let book = open_book(&files).unwrap();

    assert!(book.chapters().is_empty());
    assert!(book.content_chapters().is_empty());
    assert!(!book.has_toc());
    assert!(book.toc().is_empty());
    assert!(matches!(book.cover(), Err(Error::NoCover)));
}

#[test]
fn test_version_defaults_to_2() {
    let opf = r#"<package xmlns="http://www.idpf.org/2007/opf">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Undated</dc:title><dc:language>en</dc:language>
  </metadata>
  <manifest/><spine/>
</package>"#;
    let files = [MIMETYPE, CONTAINER, ("OEBPS/content.opf", opf)];

    let book = open_book(&files).unwrap();

    assert_eq!("2.0", book.metadata().version);
}
