use pixa_types::{AssetId, CustomMetadata};
use serde::Serialize;

/// Successful result of a store call.
///
/// `AlreadyExists` is a soft success: identical content is already stored
/// and the caller receives its existing ID instead of a new one. Callers
/// can treat duplicate uploads as idempotent.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum StoreOutcome {
    /// The asset was written and catalogued under a new ID.
    Stored(AssetId),
    /// Identical content was already stored under this ID. Nothing was written.
    AlreadyExists(AssetId),
}

impl StoreOutcome {
    /// The usable asset ID, new or existing.
    pub fn asset_id(&self) -> &AssetId {
        match self {
            Self::Stored(id) | Self::AlreadyExists(id) => id,
        }
    }

    pub fn into_asset_id(self) -> AssetId {
        match self {
            Self::Stored(id) | Self::AlreadyExists(id) => id,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

/// Caller-supplied descriptive fields for a new asset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssetUpload {
    pub original_name: String,
    pub tags: Vec<String>,
    pub custom_metadata: CustomMetadata,
}

impl AssetUpload {
    pub fn named(original_name: impl Into<String>) -> Self {
        Self {
            original_name: original_name.into(),
            ..Self::default()
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom_metadata.insert(key.into(), value);
        self
    }
}

/// Catalog-wide statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AssetStats {
    pub total_count: u64,
    pub total_size: u64,
    pub avg_size: f64,
}
