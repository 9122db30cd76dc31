//! In-memory catalog for testing and ephemeral use.
//!
//! [`InMemoryCatalog`] keeps a [`CatalogState`] behind a `RwLock`. It
//! implements the full [`MetadataCatalog`] trait, including fingerprint
//! uniqueness, and is suitable for unit tests and short-lived processes.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use pixa_types::{AssetId, AssetRecord, Fingerprint};

use crate::error::{CatalogError, CatalogResult};
use crate::query::{CatalogFilter, CatalogQuery, RecordUpdate, SizeAggregate};
use crate::state::CatalogState;
use crate::traits::MetadataCatalog;

/// An in-memory implementation of [`MetadataCatalog`].
///
/// Data is lost when the catalog is dropped. Backend failures can be
/// injected with [`fail_next_inserts`](Self::fail_next_inserts) and
/// [`fail_next_counts`](Self::fail_next_counts).
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
    failing_inserts: AtomicU32,
    failing_counts: AtomicU32,
}

impl InMemoryCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Returns `true` if the catalog holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next `n` calls to `insert` fail as if the backend were down.
    pub fn fail_next_inserts(&self, n: u32) {
        self.failing_inserts.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` calls to `count` fail as if the backend were down.
    pub fn fail_next_counts(&self, n: u32) {
        self.failing_counts.store(n, Ordering::SeqCst);
    }

    fn take_fault(counter: &AtomicU32, op: &str) -> CatalogResult<()> {
        let injected = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(CatalogError::Unavailable(format!("injected {op} failure")));
        }
        Ok(())
    }

    fn read(&self) -> CatalogResult<std::sync::RwLockReadGuard<'_, CatalogState>> {
        self.state
            .read()
            .map_err(|e| CatalogError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> CatalogResult<std::sync::RwLockWriteGuard<'_, CatalogState>> {
        self.state
            .write()
            .map_err(|e| CatalogError::Unavailable(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl MetadataCatalog for InMemoryCatalog {
    async fn insert(&self, record: &AssetRecord) -> CatalogResult<()> {
        Self::take_fault(&self.failing_inserts, "insert")?;
        self.write()?.insert(record.clone())
    }

    async fn find_by_id(&self, id: &AssetId) -> CatalogResult<Option<AssetRecord>> {
        Ok(self.read()?.find_by_id(id))
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> CatalogResult<Option<AssetRecord>> {
        Ok(self.read()?.find_by_fingerprint(fingerprint))
    }

    async fn find(&self, query: &CatalogQuery) -> CatalogResult<Vec<AssetRecord>> {
        Ok(self.read()?.find(query))
    }

    async fn update(&self, id: &AssetId, update: &RecordUpdate) -> CatalogResult<u64> {
        Ok(self.write()?.update(id, update))
    }

    async fn delete(&self, id: &AssetId) -> CatalogResult<u64> {
        Ok(self.write()?.delete(id))
    }

    async fn count(&self, filter: &CatalogFilter) -> CatalogResult<u64> {
        Self::take_fault(&self.failing_counts, "count")?;
        Ok(self.read()?.count(filter))
    }

    async fn aggregate_size_stats(&self) -> CatalogResult<SizeAggregate> {
        Ok(self.read()?.aggregate_size_stats())
    }
}
