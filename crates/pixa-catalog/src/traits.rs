//! The [`MetadataCatalog`] trait defining the record store interface.
//!
//! Any backend (in-memory, file, database) implements this trait to serve
//! asset records to the asset store.

use async_trait::async_trait;
use pixa_types::{AssetId, AssetRecord, Fingerprint};

use crate::error::CatalogResult;
use crate::query::{CatalogFilter, CatalogQuery, RecordUpdate, SizeAggregate};

/// Queryable record store keyed by asset ID.
///
/// Implementations must be thread-safe (`Send + Sync`) and must enforce
/// uniqueness of both `asset_id` and `fingerprint` at insert time: this is
/// the only place where the at-most-one-record-per-content invariant can be
/// upheld across concurrent writers.
#[async_trait]
pub trait MetadataCatalog: Send + Sync {
    /// Insert a new record.
    ///
    /// Fails with `DuplicateFingerprint` or `DuplicateId` on a uniqueness
    /// violation.
    async fn insert(&self, record: &AssetRecord) -> CatalogResult<()>;

    /// Point lookup by asset ID. Returns `Ok(None)` if absent.
    async fn find_by_id(&self, id: &AssetId) -> CatalogResult<Option<AssetRecord>>;

    /// Point lookup by fingerprint. Returns `Ok(None)` if absent.
    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> CatalogResult<Option<AssetRecord>>;

    /// Filtered, ordered, paginated listing.
    async fn find(&self, query: &CatalogQuery) -> CatalogResult<Vec<AssetRecord>>;

    /// Apply a partial update. Returns the number of matched records.
    async fn update(&self, id: &AssetId, update: &RecordUpdate) -> CatalogResult<u64>;

    /// Delete a record. Returns the number of deleted records.
    async fn delete(&self, id: &AssetId) -> CatalogResult<u64>;

    /// Number of records selected by `filter`.
    async fn count(&self, filter: &CatalogFilter) -> CatalogResult<u64>;

    /// Count, total and mean of `size_bytes` over all records, computed in
    /// one pass by the backend.
    async fn aggregate_size_stats(&self) -> CatalogResult<SizeAggregate>;
}
