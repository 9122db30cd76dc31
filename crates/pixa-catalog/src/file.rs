//! JSON-file catalog for durable single-node use.
//!
//! The whole catalog is one snapshot file:
//!
//! ```text
//! {
//!   "version": 1,
//!   "records": [ { "assetId": "...", "storageKey": "...", ... }, ... ]
//! }
//! ```
//!
//! Records appear in insertion order. Every mutation is applied to a copy of
//! the state, written to a temporary file in the same directory, fsynced and
//! renamed over the snapshot. The in-memory state is replaced only after the
//! rename succeeds, so a failed write leaves both disk and memory unchanged.
//!
//! Persist and install run together on a spawned task. Dropping the caller's
//! future (for example on a deadline) does not stop that task, so a mutation
//! that reaches disk always reaches memory as well.
//!
//! Each mutation clones the state and rewrites the full snapshot, so a write
//! costs time proportional to the catalog size. The backend is meant for a
//! single process with catalogs of up to tens of thousands of records.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use pixa_types::{AssetId, AssetRecord, Fingerprint};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::query::{CatalogFilter, CatalogQuery, RecordUpdate, SizeAggregate};
use crate::state::{CatalogSnapshot, CatalogState};
use crate::traits::MetadataCatalog;

/// A [`MetadataCatalog`] persisted as a single JSON snapshot file.
#[derive(Debug)]
pub struct FileCatalog {
    path: Arc<PathBuf>,
    state: Arc<RwLock<CatalogState>>,
}

impl FileCatalog {
    /// Open the catalog at `path`, loading the snapshot if one exists.
    ///
    /// A missing file is an empty catalog; it is created on first mutation.
    pub async fn open(path: impl Into<PathBuf>) -> CatalogResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: CatalogSnapshot = serde_json::from_slice(&bytes)
                    .map_err(|e| CatalogError::Serialization(e.to_string()))?;
                CatalogState::from_snapshot(snapshot)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CatalogState::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), records = state.len(), "catalog opened");
        Ok(Self {
            path: Arc::new(path),
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutate` to a copy of the state, persist it, then install it.
    ///
    /// The work runs on its own task, which completes even if the returned
    /// future is dropped.
    async fn mutate<T, F>(&self, mutate: F) -> CatalogResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut CatalogState) -> CatalogResult<T> + Send + 'static,
    {
        let path = Arc::clone(&self.path);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut guard = state.write().await;
            let mut next = guard.clone();
            let out = mutate(&mut next)?;
            persist(path.to_path_buf(), next.snapshot()).await?;
            *guard = next;
            Ok(out)
        })
        .await
        .map_err(|e| CatalogError::Unavailable(format!("catalog mutation task failed: {e}")))?
    }
}

async fn persist(path: PathBuf, snapshot: CatalogSnapshot) -> CatalogResult<()> {
    let bytes = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| CatalogError::Serialization(e.to_string()))?;
    tokio::task::spawn_blocking(move || -> CatalogResult<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| CatalogError::Io(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| CatalogError::Unavailable(format!("persist task failed: {e}")))??;
    debug!(records = snapshot.records.len(), "catalog snapshot written");
    Ok(())
}

#[async_trait]
impl MetadataCatalog for FileCatalog {
    async fn insert(&self, record: &AssetRecord) -> CatalogResult<()> {
        let record = record.clone();
        self.mutate(move |state| state.insert(record)).await
    }

    async fn find_by_id(&self, id: &AssetId) -> CatalogResult<Option<AssetRecord>> {
        Ok(self.state.read().await.find_by_id(id))
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> CatalogResult<Option<AssetRecord>> {
        Ok(self.state.read().await.find_by_fingerprint(fingerprint))
    }

    async fn find(&self, query: &CatalogQuery) -> CatalogResult<Vec<AssetRecord>> {
        Ok(self.state.read().await.find(query))
    }

    async fn update(&self, id: &AssetId, update: &RecordUpdate) -> CatalogResult<u64> {
        if self.state.read().await.find_by_id(id).is_none() {
            return Ok(0);
        }
        let (id, update) = (id.clone(), update.clone());
        self.mutate(move |state| Ok(state.update(&id, &update))).await
    }

    async fn delete(&self, id: &AssetId) -> CatalogResult<u64> {
        if self.state.read().await.find_by_id(id).is_none() {
            return Ok(0);
        }
        let id = id.clone();
        self.mutate(move |state| Ok(state.delete(&id))).await
    }

    async fn count(&self, filter: &CatalogFilter) -> CatalogResult<u64> {
        Ok(self.state.read().await.count(filter))
    }

    async fn aggregate_size_stats(&self) -> CatalogResult<SizeAggregate> {
        Ok(self.state.read().await.aggregate_size_stats())
    }
}
