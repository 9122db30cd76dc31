use pixa_types::Fingerprint;

use crate::error::{IdentityError, IdentityResult};
use crate::hasher::ContentHasher;
use crate::sniff::sniff;

/// Media types accepted for storage.
pub const ALLOWED_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/tiff",
    "image/svg+xml",
];

/// Returns `true` if `media_type` is on the image allow-list.
pub fn is_allowed_media_type(media_type: &str) -> bool {
    ALLOWED_MEDIA_TYPES.contains(&media_type)
}

/// The identity of an asset as derived from its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetIdentity {
    pub media_type: &'static str,
    pub fingerprint: Fingerprint,
    pub size_bytes: u64,
}

/// Sniff, gate and fingerprint `data`.
///
/// Fails with [`IdentityError::InvalidAssetType`] before hashing if the
/// detected media type is not an allowed image format.
pub fn identify(data: &[u8]) -> IdentityResult<AssetIdentity> {
    let media_type = sniff(data);
    if !is_allowed_media_type(media_type) {
        return Err(IdentityError::InvalidAssetType {
            detected: media_type.to_string(),
        });
    }
    Ok(AssetIdentity {
        media_type,
        fingerprint: ContentHasher::fingerprint(data),
        size_bytes: data.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifies_png() {
        let data = b"\x89PNG\r\n\x1a\n rest of file";
        let id = identify(data).unwrap();
        assert_eq!(id.media_type, "image/png");
        assert_eq!(id.size_bytes, data.len() as u64);
        assert_eq!(id.fingerprint, ContentHasher::fingerprint(data));
    }

    #[test]
    fn rejects_text() {
        let err = identify(b"definitely not an image").unwrap_err();
        assert_eq!(
            err,
            IdentityError::InvalidAssetType {
                detected: "text/plain; charset=utf-8".into()
            }
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert!(identify(b"").is_err());
    }

    #[test]
    fn rejects_recognised_but_disallowed_image() {
        let err = identify(&[0x00, 0x00, 0x01, 0x00, 0x01]).unwrap_err();
        assert!(err.to_string().contains("image/x-icon"));
    }

    #[test]
    fn every_allowed_type_is_an_image() {
        for t in ALLOWED_MEDIA_TYPES {
            assert!(t.starts_with("image/"));
            assert!(is_allowed_media_type(t));
        }
        assert!(!is_allowed_media_type("application/pdf"));
    }
}
