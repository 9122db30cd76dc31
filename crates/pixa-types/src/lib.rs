//! Foundation types for Pixa, the content-addressed image asset store.
//!
//! Every other Pixa crate depends on `pixa-types`.
//!
//! # Key Types
//!
//! - [`AssetId`] — Externally visible asset identifier, generated once
//! - [`StorageKey`] — Opaque handle of a blob inside the blob repository
//! - [`Fingerprint`] — Content digest used as the deduplication key
//! - [`AssetRecord`] — Catalog entry tying the three together
//! - [`IdGenerator`] — Source of fresh asset IDs and storage keys

pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod record;

pub use error::TypeError;
pub use fingerprint::Fingerprint;
pub use identity::{AssetId, IdGenerator, StorageKey, UuidV7Generator};
pub use record::{AssetRecord, CustomMetadata};
