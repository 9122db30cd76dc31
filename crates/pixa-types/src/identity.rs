use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Externally visible identifier of a stored asset.
///
/// Generated once by an [`IdGenerator`] when the asset is first stored and
/// never reused or mutated afterwards.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

/// Opaque handle identifying a blob inside the blob repository.
///
/// Deliberately distinct from [`AssetId`]: callers address assets, the store
/// addresses blobs.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            /// Wrap an existing identifier string.
            pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(TypeError::EmptyIdentifier);
                }
                Ok(Self(value))
            }

            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Short representation (first 8 characters).
            pub fn short_id(&self) -> &str {
                let end = self
                    .0
                    .char_indices()
                    .nth(8)
                    .map(|(i, _)| i)
                    .unwrap_or(self.0.len());
                &self.0[..end]
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.short_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(AssetId);
string_id!(StorageKey);

/// Source of fresh, never-reused identifiers.
///
/// Used for both asset IDs and storage keys. Implementations must be safe to
/// share across tasks.
pub trait IdGenerator: Send + Sync {
    /// A fresh opaque unique string.
    fn new_id(&self) -> String;

    /// A fresh asset identifier.
    fn new_asset_id(&self) -> AssetId {
        AssetId(self.new_id())
    }

    /// A fresh storage key.
    fn new_storage_key(&self) -> StorageKey {
        StorageKey(self.new_id())
    }
}

/// Default generator: time-ordered UUID v7 in simple (unhyphenated) form.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidV7Generator;

impl IdGenerator for UuidV7Generator {
    fn new_id(&self) -> String {
        uuid::Uuid::now_v7().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn empty_identifier_is_rejected() {
        assert_eq!(AssetId::new("").unwrap_err(), TypeError::EmptyIdentifier);
        assert_eq!(StorageKey::new("").unwrap_err(), TypeError::EmptyIdentifier);
    }

    #[test]
    fn short_id_truncates_to_8_chars() {
        let id = AssetId::new("0123456789abcdef").unwrap();
        assert_eq!(id.short_id(), "01234567");
        let short = StorageKey::new("abc").unwrap();
        assert_eq!(short.short_id(), "abc");
    }

    #[test]
    fn debug_and_display() {
        let id = AssetId::new("0123456789abcdef").unwrap();
        assert_eq!(format!("{id:?}"), "AssetId(01234567)");
        assert_eq!(format!("{id}"), "0123456789abcdef");
    }

    #[test]
    fn serde_is_transparent() {
        let key = StorageKey::new("k1").unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"k1\"");
        let parsed: StorageKey = serde_json::from_str("\"k1\"").unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn uuid_generator_is_unique_and_simple_form() {
        let generator = UuidV7Generator;
        let ids: HashSet<String> = (0..1000).map(|_| generator.new_id()).collect();
        assert_eq!(ids.len(), 1000);
        for id in &ids {
            assert_eq!(id.len(), 32);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn asset_ids_and_storage_keys_differ() {
        let generator = UuidV7Generator;
        let asset = generator.new_asset_id();
        let key = generator.new_storage_key();
        assert_ne!(asset.as_str(), key.as_str());
    }
}
