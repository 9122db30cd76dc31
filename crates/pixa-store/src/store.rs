use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use pixa_blob::BlobRepository;
use pixa_catalog::{CatalogError, CatalogFilter, CatalogQuery, MetadataCatalog, RecordUpdate};
use pixa_crypto::{identify, FingerprintWriter};
use pixa_types::{
    AssetId, AssetRecord, CustomMetadata, Fingerprint, IdGenerator, StorageKey, UuidV7Generator,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::deadline::Deadline;
use crate::error::{StoreError, StoreResult};
use crate::metrics::StoreMetrics;
use crate::outcome::{AssetStats, AssetUpload, StoreOutcome};
use crate::stream::AssetStream;

const COPY_BUF_LEN: usize = 64 * 1024;

/// Content-addressed asset store.
///
/// Coordinates content identity, the blob repository and the metadata
/// catalog. The store holds no state between calls and takes no locks; it
/// can be shared freely across tasks (`Arc<AssetStore>`).
///
/// Consistency rules upheld by every operation:
/// - A blob is written before its record is inserted, and deleted before its
///   record is removed, so a visible record always has a blob behind it.
/// - When the insert fails after the blob write, the blob is deleted again
///   on a best-effort basis. Anything left behind is an orphan that
///   [`sweep_orphans`](Self::sweep_orphans) removes later.
/// - Fingerprint uniqueness is decided by the catalog. A uniqueness
///   violation on insert means another writer stored the same content
///   first and is reported as [`StoreOutcome::AlreadyExists`].
pub struct AssetStore {
    pub(crate) blobs: Arc<dyn BlobRepository>,
    pub(crate) catalog: Arc<dyn MetadataCatalog>,
    ids: Arc<dyn IdGenerator>,
    pub(crate) config: StoreConfig,
    pub(crate) metrics: StoreMetrics,
}

impl AssetStore {
    /// Create a store over the given backends with the default ID generator
    /// and configuration.
    pub fn new(blobs: Arc<dyn BlobRepository>, catalog: Arc<dyn MetadataCatalog>) -> Self {
        Self {
            blobs,
            catalog,
            ids: Arc::new(UuidV7Generator),
            config: StoreConfig::default(),
            metrics: StoreMetrics::default(),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    pub(crate) fn deadline(&self) -> Deadline {
        Deadline::after(self.config.operation_timeout)
    }

    // ---- Store ----

    /// Store an asset from a file. The file's base name becomes the
    /// asset's original name unless `upload` already carries one.
    pub async fn store_file(
        &self,
        path: impl AsRef<Path>,
        mut upload: AssetUpload,
    ) -> StoreResult<StoreOutcome> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        if upload.original_name.is_empty() {
            upload.original_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        self.store_reader(file, upload).await
    }

    /// Store an asset read to completion from `reader`.
    ///
    /// The content has to be fingerprinted before either write begins, so
    /// the stream is fully buffered first.
    pub async fn store_reader<R>(&self, mut reader: R, upload: AssetUpload) -> StoreResult<StoreOutcome>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        self.store_bytes(data, upload).await
    }

    /// Store an asset held in memory.
    pub async fn store_bytes(
        &self,
        data: impl Into<Bytes>,
        upload: AssetUpload,
    ) -> StoreResult<StoreOutcome> {
        let data: Bytes = data.into();
        let deadline = self.deadline();

        let identity = identify(&data)?;

        let existing = deadline
            .run(
                "fingerprint lookup",
                self.catalog.find_by_fingerprint(&identity.fingerprint),
            )
            .await?
            .map_err(StoreError::catalog("fingerprint lookup"))?;
        if let Some(existing) = existing {
            debug!(asset_id = %existing.asset_id, fingerprint = %identity.fingerprint.short_hex(), "duplicate content");
            self.metrics.record_duplicate();
            return Ok(StoreOutcome::AlreadyExists(existing.asset_id));
        }

        let asset_id = self.ids.new_asset_id();
        let storage_key = self.ids.new_storage_key();

        deadline
            .run("blob write", self.blobs.create(&storage_key, data))
            .await?
            .map_err(StoreError::storage("blob write"))?;

        let now = Utc::now();
        let record = AssetRecord {
            asset_id: asset_id.clone(),
            storage_key: storage_key.clone(),
            original_name: upload.original_name,
            media_type: identity.media_type.to_string(),
            size_bytes: identity.size_bytes,
            fingerprint: identity.fingerprint,
            tags: upload.tags,
            custom_metadata: upload.custom_metadata,
            created_at: now,
            updated_at: now,
        };

        match deadline.run("record insert", self.catalog.insert(&record)).await {
            Ok(Ok(())) => {}
            Ok(Err(CatalogError::DuplicateFingerprint { existing, .. })) => {
                self.compensate_blob_write(&storage_key, &deadline, &"duplicate fingerprint")
                    .await;
                debug!(asset_id = %existing, "lost duplicate-content race");
                self.metrics.record_duplicate();
                return Ok(StoreOutcome::AlreadyExists(existing));
            }
            Ok(Err(e)) => {
                self.compensate_blob_write(&storage_key, &deadline, &e).await;
                return Err(StoreError::CatalogFailure {
                    op: "record insert",
                    source: e,
                });
            }
            Err(e) => {
                // The insert may still have committed; deleting the blob
                // now could leave a record without content.
                warn!(storage_key = %storage_key, "record insert timed out; blob left for reconciliation");
                return Err(e);
            }
        }

        self.metrics.record_stored();
        info!(
            asset_id = %asset_id,
            size = record.size_bytes,
            media_type = %record.media_type,
            "stored asset"
        );
        Ok(StoreOutcome::Stored(asset_id))
    }

    /// Best-effort removal of a blob whose record was never inserted.
    ///
    /// A failure here is logged and counted but never returned: the caller
    /// reports the error that made compensation necessary, and the sweep
    /// collects the orphan later.
    async fn compensate_blob_write(
        &self,
        storage_key: &StorageKey,
        deadline: &Deadline,
        cause: &(dyn std::fmt::Display + Sync),
    ) {
        let result = match deadline
            .run("compensating blob delete", self.blobs.delete(storage_key))
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match result {
            Ok(()) => {
                self.metrics.record_compensation(true);
                debug!(storage_key = %storage_key, "compensating blob delete succeeded");
            }
            Err(error) => {
                self.metrics.record_compensation(false);
                warn!(
                    storage_key = %storage_key,
                    %cause,
                    %error,
                    "compensating blob delete failed; orphan left for reconciliation"
                );
            }
        }
    }

    // ---- Retrieve ----

    /// Look up an asset's record.
    pub async fn get_asset_meta(&self, asset_id: &AssetId) -> StoreResult<AssetRecord> {
        let deadline = self.deadline();
        self.find_record(asset_id, &deadline).await
    }

    /// Look up an asset's record by content fingerprint.
    pub async fn get_asset_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> StoreResult<AssetRecord> {
        self.deadline()
            .run(
                "fingerprint lookup",
                self.catalog.find_by_fingerprint(fingerprint),
            )
            .await?
            .map_err(StoreError::catalog("fingerprint lookup"))?
            .ok_or(StoreError::FingerprintNotFound(*fingerprint))
    }

    async fn find_record(&self, asset_id: &AssetId, deadline: &Deadline) -> StoreResult<AssetRecord> {
        deadline
            .run("record lookup", self.catalog.find_by_id(asset_id))
            .await?
            .map_err(StoreError::catalog("record lookup"))?
            .ok_or_else(|| StoreError::NotFound(asset_id.clone()))
    }

    /// Open a stream on an asset's bytes, paired with its record.
    ///
    /// The asset is not buffered. A record whose blob is missing is reported
    /// as [`StoreError::IntegrityViolation`] and left untouched.
    pub async fn get_asset_data(&self, asset_id: &AssetId) -> StoreResult<(AssetStream, AssetRecord)> {
        let deadline = self.deadline();
        self.open_asset(asset_id, &deadline).await
    }

    async fn open_asset(
        &self,
        asset_id: &AssetId,
        deadline: &Deadline,
    ) -> StoreResult<(AssetStream, AssetRecord)> {
        let record = self.find_record(asset_id, deadline).await?;
        let reader = deadline
            .run("blob open", self.blobs.open_read(&record.storage_key))
            .await?
            .map_err(|e| {
                if e.is_not_found() {
                    warn!(asset_id = %record.asset_id, storage_key = %record.storage_key, "record references missing blob");
                    StoreError::IntegrityViolation {
                        asset_id: record.asset_id.clone(),
                        storage_key: record.storage_key.clone(),
                    }
                } else {
                    StoreError::StorageFailure {
                        op: "blob open",
                        source: e,
                    }
                }
            })?;
        Ok((AssetStream::new(reader, record.size_bytes), record))
    }

    /// Copy an asset into a new file at `path`, creating parent directories.
    ///
    /// The bytes are fingerprinted while they are copied. Returns the number
    /// of bytes written, or [`StoreError::ContentMismatch`] if the blob no
    /// longer matches the recorded fingerprint. The written file is left in
    /// place on any failure.
    pub async fn download_to_path(
        &self,
        asset_id: &AssetId,
        path: impl AsRef<Path>,
    ) -> StoreResult<u64> {
        let path = path.as_ref();
        let deadline = self.deadline();
        let (mut stream, record) = self.open_asset(asset_id, &deadline).await?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(path).await?;
        let mut hasher = FingerprintWriter::new();
        let copy = async {
            let mut buf = vec![0u8; COPY_BUF_LEN];
            loop {
                let n = stream.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
                file.write_all(&buf[..n]).await?;
            }
            file.flush().await
        };
        deadline.run("download copy", copy).await??;
        drop(stream);

        let actual = hasher.finalize();
        if actual != record.fingerprint {
            warn!(
                asset_id = %asset_id,
                expected = %record.fingerprint.short_hex(),
                actual = %actual.short_hex(),
                "downloaded content does not match fingerprint"
            );
            return Err(StoreError::ContentMismatch {
                asset_id: asset_id.clone(),
                expected: record.fingerprint,
                actual,
            });
        }

        let copied = hasher.bytes_written();
        info!(asset_id = %asset_id, path = %path.display(), size = copied, "downloaded asset");
        Ok(copied)
    }

    // ---- Delete ----

    /// Delete an asset: blob first, then record.
    ///
    /// If the blob delete fails the record stays, so the asset remains
    /// retrievable. A blob that is already gone counts as deleted.
    pub async fn delete_asset(&self, asset_id: &AssetId) -> StoreResult<()> {
        let deadline = self.deadline();
        let record = self.find_record(asset_id, &deadline).await?;

        match deadline
            .run("blob delete", self.blobs.delete(&record.storage_key))
            .await?
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!(asset_id = %asset_id, storage_key = %record.storage_key, "blob already missing at delete");
            }
            Err(e) => {
                return Err(StoreError::StorageFailure {
                    op: "blob delete",
                    source: e,
                })
            }
        }

        let deleted = deadline
            .run("record delete", self.catalog.delete(asset_id))
            .await?
            .map_err(StoreError::catalog("record delete"))?;
        if deleted == 0 {
            return Err(StoreError::NotFound(asset_id.clone()));
        }

        self.metrics.record_deleted();
        info!(asset_id = %asset_id, "deleted asset");
        Ok(())
    }

    // ---- Update ----

    /// Replace an asset's tags.
    pub async fn update_tags(&self, asset_id: &AssetId, tags: Vec<String>) -> StoreResult<()> {
        self.update_asset(asset_id, RecordUpdate::at(Utc::now()).with_tags(tags))
            .await
    }

    /// Replace an asset's custom metadata.
    pub async fn update_metadata(
        &self,
        asset_id: &AssetId,
        metadata: CustomMetadata,
    ) -> StoreResult<()> {
        self.update_asset(asset_id, RecordUpdate::at(Utc::now()).with_metadata(metadata))
            .await
    }

    /// Apply a partial update to an asset's mutable fields.
    pub async fn update_asset(&self, asset_id: &AssetId, update: RecordUpdate) -> StoreResult<()> {
        let matched = self
            .deadline()
            .run("record update", self.catalog.update(asset_id, &update))
            .await?
            .map_err(StoreError::catalog("record update"))?;
        if matched == 0 {
            return Err(StoreError::NotFound(asset_id.clone()));
        }
        debug!(asset_id = %asset_id, "updated asset");
        Ok(())
    }

    // ---- List & statistics ----

    /// List assets tagged with any of `tags` (all assets if empty), newest
    /// first. `limit` of 0 means unlimited.
    pub async fn list_assets(
        &self,
        tags: &[String],
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<AssetRecord>> {
        let query = CatalogQuery::new(CatalogFilter::any_tag(tags.iter().cloned()))
            .limit(limit)
            .offset(offset);
        self.query_assets(&query).await
    }

    /// Run an arbitrary catalog query.
    pub async fn query_assets(&self, query: &CatalogQuery) -> StoreResult<Vec<AssetRecord>> {
        self.deadline()
            .run("record listing", self.catalog.find(query))
            .await?
            .map_err(StoreError::catalog("record listing"))
    }

    /// Count, total size and mean size over all assets, from a single
    /// catalog aggregate.
    pub async fn stats(&self) -> StoreResult<AssetStats> {
        let agg = self
            .deadline()
            .run("size aggregate", self.catalog.aggregate_size_stats())
            .await?
            .map_err(StoreError::catalog("size aggregate"))?;
        Ok(AssetStats {
            total_count: agg.count,
            total_size: agg.total_bytes,
            avg_size: agg.average_bytes,
        })
    }
}

impl std::fmt::Debug for AssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetStore")
            .field("config", &self.config)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}
