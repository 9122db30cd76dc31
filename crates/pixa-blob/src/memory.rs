use std::collections::HashMap;
use std::io::{self, Cursor};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use pixa_types::StorageKey;

use crate::error::{BlobError, BlobResult};
use crate::traits::{BlobReader, BlobRepository};

/// In-memory, HashMap-based blob repository.
///
/// Intended for tests and embedding. Blobs are held as [`Bytes`] behind a
/// `RwLock`, so readers share the stored buffer instead of copying it.
///
/// Failures can be injected with [`fail_next_creates`](Self::fail_next_creates)
/// and [`fail_next_deletes`](Self::fail_next_deletes) to exercise partial-write
/// handling in callers.
pub struct InMemoryBlobRepository {
    blobs: RwLock<HashMap<StorageKey, Bytes>>,
    failing_creates: AtomicU32,
    failing_deletes: AtomicU32,
}

impl InMemoryBlobRepository {
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            failing_creates: AtomicU32::new(0),
            failing_deletes: AtomicU32::new(0),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no blob is stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Returns `true` if a blob is stored under `key`.
    pub fn contains(&self, key: &StorageKey) -> bool {
        self.blobs.read().expect("lock poisoned").contains_key(key)
    }

    /// Make the next `n` calls to `create` fail with an I/O error.
    pub fn fail_next_creates(&self, n: u32) {
        self.failing_creates.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` calls to `delete` fail with an I/O error.
    pub fn fail_next_deletes(&self, n: u32) {
        self.failing_deletes.store(n, Ordering::SeqCst);
    }

    fn take_fault(counter: &AtomicU32, op: &str) -> BlobResult<()> {
        let injected = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(BlobError::Io(io::Error::other(format!(
                "injected {op} failure"
            ))));
        }
        Ok(())
    }
}

impl Default for InMemoryBlobRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobRepository for InMemoryBlobRepository {
    async fn create(&self, key: &StorageKey, data: Bytes) -> BlobResult<()> {
        Self::take_fault(&self.failing_creates, "create")?;
        let mut map = self.blobs.write().expect("lock poisoned");
        if map.contains_key(key) {
            return Err(BlobError::AlreadyExists(key.clone()));
        }
        map.insert(key.clone(), data);
        Ok(())
    }

    async fn open_read(&self, key: &StorageKey) -> BlobResult<BlobReader> {
        let map = self.blobs.read().expect("lock poisoned");
        let data = map
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(key.clone()))?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn delete(&self, key: &StorageKey) -> BlobResult<()> {
        Self::take_fault(&self.failing_deletes, "delete")?;
        let mut map = self.blobs.write().expect("lock poisoned");
        map.remove(key)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(key.clone()))
    }

    async fn list_keys(&self) -> BlobResult<Vec<StorageKey>> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.keys().cloned().collect())
    }

    async fn exists(&self, key: &StorageKey) -> BlobResult<bool> {
        Ok(self.contains(key))
    }
}

impl std::fmt::Debug for InMemoryBlobRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobRepository")
            .field("blob_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn key(s: &str) -> StorageKey {
        StorageKey::new(s).unwrap()
    }

    async fn read_all(repo: &InMemoryBlobRepository, k: &StorageKey) -> Vec<u8> {
        let mut reader = repo.open_read(k).await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn create_and_read_back() {
        let repo = InMemoryBlobRepository::new();
        repo.create(&key("k1"), Bytes::from_static(b"hello"))
            .await
            .unwrap();
        assert_eq!(read_all(&repo, &key("k1")).await, b"hello");
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn create_never_overwrites() {
        let repo = InMemoryBlobRepository::new();
        repo.create(&key("k1"), Bytes::from_static(b"first"))
            .await
            .unwrap();
        let err = repo
            .create(&key("k1"), Bytes::from_static(b"second"))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::AlreadyExists(_)));
        assert_eq!(read_all(&repo, &key("k1")).await, b"first");
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let repo = InMemoryBlobRepository::new();
        assert!(repo.open_read(&key("nope")).await.err().unwrap().is_not_found());
        assert!(repo.delete(&key("nope")).await.unwrap_err().is_not_found());
        assert!(!repo.exists(&key("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_blob() {
        let repo = InMemoryBlobRepository::new();
        repo.create(&key("k1"), Bytes::from_static(b"x")).await.unwrap();
        assert!(repo.exists(&key("k1")).await.unwrap());
        repo.delete(&key("k1")).await.unwrap();
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn list_keys_enumerates_everything() {
        let repo = InMemoryBlobRepository::new();
        for k in ["a", "b", "c"] {
            repo.create(&key(k), Bytes::from_static(b"x")).await.unwrap();
        }
        let mut keys = repo.list_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec![key("a"), key("b"), key("c")]);
    }

    #[tokio::test]
    async fn injected_faults_are_consumed() {
        let repo = InMemoryBlobRepository::new();
        repo.fail_next_creates(1);
        assert!(matches!(
            repo.create(&key("k1"), Bytes::from_static(b"x")).await,
            Err(BlobError::Io(_))
        ));
        repo.create(&key("k1"), Bytes::from_static(b"x")).await.unwrap();

        repo.fail_next_deletes(2);
        assert!(repo.delete(&key("k1")).await.is_err());
        assert!(repo.delete(&key("k1")).await.is_err());
        repo.delete(&key("k1")).await.unwrap();
    }

    #[test]
    fn debug_format() {
        let repo = InMemoryBlobRepository::new();
        let debug = format!("{repo:?}");
        assert!(debug.contains("InMemoryBlobRepository"));
        assert!(debug.contains("blob_count"));
    }
}
