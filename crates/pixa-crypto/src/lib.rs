//! Content identity for Pixa.
//!
//! Given the raw bytes of an asset this crate decides two things, neither of
//! which is ever taken from caller-supplied metadata:
//!
//! - the **fingerprint**, a BLAKE3 digest over the exact byte sequence
//!   ([`ContentHasher`], [`FingerprintWriter`]);
//! - the **media type**, sniffed from leading magic bytes ([`sniff`]) and
//!   gated against a fixed allow-list of image formats ([`ALLOWED_MEDIA_TYPES`]).
//!
//! [`identify`] combines both and is the precondition gate of every store.

pub mod error;
pub mod hasher;
pub mod identify;
pub mod sniff;

pub use error::{IdentityError, IdentityResult};
pub use hasher::{ContentHasher, FingerprintWriter};
pub use identify::{identify, is_allowed_media_type, AssetIdentity, ALLOWED_MEDIA_TYPES};
pub use sniff::sniff;
