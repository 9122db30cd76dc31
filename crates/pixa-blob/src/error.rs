use pixa_types::StorageKey;

/// Errors from blob repository operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// No blob is stored under the key.
    #[error("blob not found: {0}")]
    NotFound(StorageKey),

    /// A blob is already stored under the key.
    #[error("blob already exists: {0}")]
    AlreadyExists(StorageKey),

    /// The key cannot be mapped onto this backend.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobError {
    /// Returns `true` for [`BlobError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for blob operations.
pub type BlobResult<T> = Result<T, BlobError>;
