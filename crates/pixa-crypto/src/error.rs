/// Errors from content identification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The sniffed media type is not on the image allow-list.
    #[error("invalid asset type: detected {detected}")]
    InvalidAssetType { detected: String },
}

/// Result alias for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;
