use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::identity::{AssetId, StorageKey};

/// Caller-supplied metadata attached to an asset.
pub type CustomMetadata = BTreeMap<String, serde_json::Value>;

/// A catalog entry describing one stored asset.
///
/// `asset_id`, `storage_key`, `fingerprint` and `size_bytes` are fixed at
/// creation. Only `tags` and `custom_metadata` change afterwards, and every
/// change advances `updated_at`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub asset_id: AssetId,
    pub storage_key: StorageKey,
    pub original_name: String,
    pub media_type: String,
    pub size_bytes: u64,
    pub fingerprint: Fingerprint,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_metadata: CustomMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssetRecord {
    /// Returns `true` if any of `wanted` appears among this record's tags.
    ///
    /// An empty `wanted` set matches every record.
    pub fn has_any_tag(&self, wanted: &[String]) -> bool {
        wanted.is_empty() || self.tags.iter().any(|t| wanted.contains(t))
    }

    /// Advance `updated_at` to `now`, never moving it before `created_at`
    /// or backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.updated_at).max(self.created_at);
    }
}
