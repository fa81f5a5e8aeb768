//! DRM detection.
//!
//! The encryption descriptor is classified into three outcomes: no
//! encryption, font obfuscation only (readable, reported as a warning), or
//! real DRM (fatal). Decryption is out of scope; the goal is to fail fast
//! with a precise error instead of handing garbage bytes to the caller.

use crate::archive::{Archive, strip_bom};
use crate::consts::enc;
use crate::errors::{Error, Result};
use crate::xml::{self, XmlElementExt};
use quick_xml::events::Event;

/// Inspects the archive for DRM markers.
///
/// Returns whether font obfuscation was detected.
///
/// # Errors
/// [`DrmProtected`](Error::DrmProtected) when an Apple FairPlay marker
/// exists, when any encrypted entry is not plain font obfuscation, or when
/// the encryption descriptor cannot be parsed (treated conservatively as
/// protected content).
pub(crate) fn check_drm(archive: &Archive) -> Result<bool> {
    if archive.find(enc::SINF_PATH).is_some() {
        log::debug!("FairPlay marker {} present", enc::SINF_PATH);
        return Err(Error::DrmProtected);
    }

    let Some(index) = archive.find(enc::ENCRYPTION_PATH) else {
        return Ok(false);
    };
    let data = archive.read_index(index)?;

    classify_encryption(&data)
}

fn classify_encryption(data: &[u8]) -> Result<bool> {
    let data = strip_bom(data);
    let mut reader = xml::reader(data);
    let mut font_obfuscation = false;

    // Per-entry state, populated between EncryptedData start and end tags.
    let mut in_encrypted_data = false;
    let mut algorithm = String::new();
    let mut key_info = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(el)) if el.is_local(enc::ENCRYPTED_DATA) => {
                in_encrypted_data = true;
                algorithm.clear();
                key_info.clear();
            }
            // A childless EncryptedData names no algorithm at all.
            Ok(Event::Empty(el)) if el.is_local(enc::ENCRYPTED_DATA) => {
                return Err(Error::DrmProtected);
            }
            Ok(Event::Start(el) | Event::Empty(el))
                if in_encrypted_data && el.is_local(enc::ENCRYPTION_METHOD) =>
            {
                algorithm = el.attr(enc::ALGORITHM).unwrap_or_default();
            }
            Ok(Event::Start(el)) if in_encrypted_data && el.is_local(enc::KEY_INFO) => {
                let name = el.name().as_ref().to_vec();
                match reader.read_to_end(quick_xml::name::QName(&name)) {
                    Ok(span) => {
                        key_info =
                            String::from_utf8_lossy(&data[span.start as usize..span.end as usize])
                                .into_owned();
                    }
                    Err(_) => return Err(Error::DrmProtected),
                }
            }
            Ok(Event::End(el)) if el.local_name().as_ref() == enc::ENCRYPTED_DATA.as_bytes() => {
                in_encrypted_data = false;

                if enc::FONT_OBFUSCATION_ALGORITHMS.contains(&algorithm.as_str()) {
                    font_obfuscation = true;
                    continue;
                }
                if let Some(signature) = drm_signature(&algorithm).or_else(|| drm_signature(&key_info)) {
                    log::debug!("DRM scheme detected: {signature}");
                }
                // Every encrypted entry that is not font obfuscation makes
                // the content unreadable, known scheme or not.
                return Err(Error::DrmProtected);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            // An unparsable encryption descriptor is treated as protected.
            Err(_) => return Err(Error::DrmProtected),
        }
    }

    Ok(font_obfuscation)
}

fn drm_signature(haystack: &str) -> Option<&'static str> {
    enc::DRM_SIGNATURES
        .iter()
        .find(|signature| haystack.contains(*signature))
        .copied()
}
