use pixa_blob::BlobError;
use pixa_catalog::CatalogError;
use pixa_crypto::IdentityError;
use pixa_types::{AssetId, Fingerprint, StorageKey};
use thiserror::Error;

/// Errors returned by [`AssetStore`](crate::AssetStore) operations.
///
/// A duplicate upload is not an error: it is reported as
/// [`StoreOutcome::AlreadyExists`](crate::StoreOutcome::AlreadyExists).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The content is not an allowed image type. Nothing was written.
    #[error("invalid asset type: detected {detected}")]
    InvalidAssetType { detected: String },

    /// No record exists for the asset ID.
    #[error("asset not found: {0}")]
    NotFound(AssetId),

    /// No record carries the fingerprint.
    #[error("no asset with fingerprint {0}")]
    FingerprintNotFound(Fingerprint),

    /// The blob repository failed.
    #[error("storage failure during {op}: {source}")]
    StorageFailure {
        op: &'static str,
        #[source]
        source: BlobError,
    },

    /// The metadata catalog failed.
    #[error("catalog failure during {op}: {source}")]
    CatalogFailure {
        op: &'static str,
        #[source]
        source: CatalogError,
    },

    /// A record exists but its blob does not.
    #[error("integrity violation: asset {asset_id} references missing blob {storage_key}")]
    IntegrityViolation {
        asset_id: AssetId,
        storage_key: StorageKey,
    },

    /// A blob's bytes no longer hash to the recorded fingerprint.
    #[error("content mismatch for asset {asset_id}: expected {expected}, read {actual}")]
    ContentMismatch {
        asset_id: AssetId,
        expected: Fingerprint,
        actual: Fingerprint,
    },

    /// The operation's deadline passed before the step completed.
    #[error("deadline exceeded during {op}")]
    DeadlineExceeded { op: &'static str },

    /// Local filesystem or input stream error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn storage(op: &'static str) -> impl FnOnce(BlobError) -> Self {
        move |source| Self::StorageFailure { op, source }
    }

    pub(crate) fn catalog(op: &'static str) -> impl FnOnce(CatalogError) -> Self {
        move |source| Self::CatalogFailure { op, source }
    }

    /// Returns `true` for the not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::FingerprintNotFound(_))
    }
}

impl From<IdentityError> for StoreError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::InvalidAssetType { detected } => Self::InvalidAssetType { detected },
        }
    }
}

/// Result alias for asset store operations.
pub type StoreResult<T> = Result<T, StoreError>;
