use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use pixa_types::StorageKey;
use tokio::io::AsyncRead;

use crate::error::BlobResult;

/// Owned read handle on a stored blob.
///
/// Dropping the reader releases whatever the backend holds open for it.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Byte-stream store addressed by storage key.
///
/// All implementations must satisfy these invariants:
/// - `create` fails with `AlreadyExists` rather than replacing a blob.
/// - A blob becomes visible to `open_read` and `list_keys` only once fully
///   written.
/// - `delete` and `open_read` report a missing key as `NotFound`.
/// - `list_keys` enumerates keys only; it carries no metadata.
#[async_trait]
pub trait BlobRepository: Send + Sync {
    /// Store `data` under `key`.
    async fn create(&self, key: &StorageKey, data: Bytes) -> BlobResult<()>;

    /// Open a streaming reader on the blob stored under `key`.
    async fn open_read(&self, key: &StorageKey) -> BlobResult<BlobReader>;

    /// Remove the blob stored under `key`.
    async fn delete(&self, key: &StorageKey) -> BlobResult<()>;

    /// Enumerate every stored key, in no particular order.
    async fn list_keys(&self) -> BlobResult<Vec<StorageKey>>;

    /// Find leftovers of writes that never completed and are at least
    /// `older_than` old, removing them unless `dry_run` is set. Returns how
    /// many were found.
    ///
    /// Leftovers are never visible as keys. Backends whose writes cannot
    /// leave any keep the default.
    async fn purge_incomplete(&self, _older_than: Duration, _dry_run: bool) -> BlobResult<u64> {
        Ok(0)
    }

    /// Check whether a blob is stored under `key`.
    ///
    /// Default implementation opens and immediately drops a reader.
    /// Backends may override with a cheaper check.
    async fn exists(&self, key: &StorageKey) -> BlobResult<bool> {
        match self.open_read(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
