// Shared general constants //
const _CONTENT: &str = "content";
const _HREF: &str = "href";
const _MEDIA_TYPE: &str = "media-type";
const _TYPE: &str = "type";

pub(crate) mod xml {
    pub(crate) const ID: &str = "id";
}

pub(crate) mod ocf {
    // Paths
    pub(crate) const CONTAINER_PATH: &str = "META-INF/container.xml";
    pub(crate) const MIMETYPE_PATH: &str = "mimetype";

    // Expected mimetype entry content
    pub(crate) const MIMETYPE: &str = "application/epub+zip";
    /// Package descriptor media type within the container `rootfile`.
    pub(crate) const OEBPS_PACKAGE: &str = "application/oebps-package+xml";

    // Elements
    pub(crate) const ROOT_FILE: &str = "rootfile";

    // Rootfile attribute keys
    pub(crate) const FULL_PATH: &str = "full-path";
    pub(crate) const MEDIA_TYPE: &str = super::_MEDIA_TYPE;

    pub(crate) const OPF_EXTENSION: &str = ".opf";
}

pub(crate) mod enc {
    // Paths
    pub(crate) const ENCRYPTION_PATH: &str = "META-INF/encryption.xml";
    /// Apple FairPlay marker file.
    pub(crate) const SINF_PATH: &str = "META-INF/sinf.xml";

    // Elements
    pub(crate) const ENCRYPTED_DATA: &str = "EncryptedData";
    pub(crate) const ENCRYPTION_METHOD: &str = "EncryptionMethod";
    pub(crate) const KEY_INFO: &str = "KeyInfo";

    // Attribute keys
    pub(crate) const ALGORITHM: &str = "Algorithm";

    /// Algorithms that scramble fonts only; not DRM.
    pub(crate) const FONT_OBFUSCATION_ALGORITHMS: &[&str] = &[
        "http://www.idpf.org/2008/embedding",
        "http://ns.adobe.com/pdf/enc#RC",
    ];

    /// Namespaces found in the algorithm URI or `KeyInfo` payload of
    /// DRM-encrypted entries.
    pub(crate) const DRM_SIGNATURES: &[&str] = &[
        "http://ns.adobe.com/adept",
        "http://readium.org/2014/01/lcp",
    ];
}

pub(crate) mod dc {
    pub(crate) const PREFIX: &str = "dc";

    // Element local names
    pub(crate) const TITLE: &str = "title";
    pub(crate) const CREATOR: &str = "creator";
    pub(crate) const LANGUAGE: &str = "language";
    pub(crate) const IDENTIFIER: &str = "identifier";
    pub(crate) const PUBLISHER: &str = "publisher";
    pub(crate) const DATE: &str = "date";
    pub(crate) const DESCRIPTION: &str = "description";
    pub(crate) const SUBJECT: &str = "subject";
    pub(crate) const RIGHTS: &str = "rights";
    pub(crate) const SOURCE: &str = "source";
}

pub(crate) mod opf {
    // Elements
    pub(crate) const PACKAGE: &str = "package";
    pub(crate) const METADATA: &str = "metadata";
    pub(crate) const META: &str = "meta";
    pub(crate) const MANIFEST: &str = "manifest";
    pub(crate) const SPINE: &str = "spine";
    pub(crate) const GUIDE: &str = "guide";
    pub(crate) const ITEM: &str = "item";
    pub(crate) const ITEMREF: &str = "itemref";
    pub(crate) const REFERENCE: &str = "reference";

    // Package attribute keys
    pub(crate) const VERSION: &str = "version";
    pub(crate) const UNIQUE_ID: &str = "unique-identifier";

    // Legacy EPUB 2 meta attribute keys
    pub(crate) const NAME: &str = "name";
    pub(crate) const CONTENT: &str = super::_CONTENT;

    // EPUB 3 meta attribute keys
    pub(crate) const PROPERTY: &str = "property";
    pub(crate) const REFINES: &str = "refines";
    pub(crate) const SCHEME: &str = "scheme";

    // Metadata refinements
    pub(crate) const FILE_AS: &str = "file-as";
    pub(crate) const ROLE: &str = "role";
    pub(crate) const IDENTIFIER_TYPE: &str = "identifier-type";
    pub(crate) const DISPLAY_SEQ: &str = "display-seq";

    // Metadata attribute values
    /// Legacy EPUB 2 cover image reference.
    pub(crate) const COVER: &str = "cover";

    // Manifest item properties
    pub(crate) const COVER_IMAGE: &str = "cover-image";
    pub(crate) const NAV_PROPERTY: &str = "nav";

    // Spine attribute keys
    pub(crate) const TOC: &str = "toc";
    pub(crate) const IDREF: &str = "idref";
    pub(crate) const LINEAR: &str = "linear";

    // Spine attribute values
    pub(crate) const NO: &str = "no";

    // Guide attribute keys
    pub(crate) const TITLE: &str = "title";
    pub(crate) const TYPE: &str = super::_TYPE;

    // Attribute keys
    pub(crate) const MEDIA_TYPE: &str = super::_MEDIA_TYPE;
    pub(crate) const PROPERTIES: &str = "properties";
    pub(crate) const HREF: &str = super::_HREF;
    pub(crate) const ID: &str = super::xml::ID;
}

pub(crate) mod ncx {
    // Elements
    pub(crate) const NAV_MAP: &str = "navMap";
    pub(crate) const NAV_POINT: &str = "navPoint";
    pub(crate) const NAV_LABEL: &str = "navLabel";
    pub(crate) const CONTENT: &str = super::_CONTENT;

    // Attribute keys
    pub(crate) const SRC: &str = "src";
}

pub(crate) mod xhtml {
    // Elements
    pub(crate) const NAV: &str = "nav";
    pub(crate) const ORDERED_LIST: &str = "ol";
    pub(crate) const LIST_ITEM: &str = "li";
    pub(crate) const ANCHOR: &str = "a";
    pub(crate) const SPAN: &str = "span";
    pub(crate) const BODY: &str = "body";
    pub(crate) const IMG: &str = "img";
    /// SVG image element.
    pub(crate) const IMAGE: &str = "image";

    // Attribute keys
    pub(crate) const HREF: &str = super::_HREF;
    pub(crate) const SRC: &str = "src";
    pub(crate) const EPUB_TYPE: &str = "epub:type";
    pub(crate) const XLINK_HREF: &str = "xlink:href";

    // `epub:type` tokens
    pub(crate) const TOC: &str = "toc";
    pub(crate) const LANDMARKS: &str = "landmarks";

    /// Media type prefix identifying image resources.
    pub(crate) const IMAGE_MEDIA_PREFIX: &str = "image/";
}
