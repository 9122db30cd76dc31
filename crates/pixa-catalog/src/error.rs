//! Error types for catalog operations.

use pixa_types::{AssetId, Fingerprint};
use thiserror::Error;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Another record already carries this fingerprint.
    #[error("duplicate fingerprint {fingerprint} (held by asset {existing})")]
    DuplicateFingerprint {
        fingerprint: Fingerprint,
        existing: AssetId,
    },

    /// A record with this asset ID already exists.
    #[error("duplicate asset id: {0}")]
    DuplicateId(AssetId),

    /// The backend could not serve the request.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error during file-based catalog operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Returns `true` if the error is a uniqueness violation on fingerprint.
    pub fn is_duplicate_fingerprint(&self) -> bool {
        matches!(self, Self::DuplicateFingerprint { .. })
    }
}

/// Convenience type alias for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
