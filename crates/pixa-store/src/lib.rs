//! Content-addressed asset store for Pixa.
//!
//! [`AssetStore`] is the entry point for applications embedding Pixa. It
//! validates and fingerprints uploaded images, deduplicates them by content,
//! writes the bytes to a [`BlobRepository`] and the description to a
//! [`MetadataCatalog`], and keeps the two consistent across failures.
//!
//! ```no_run
//! # async fn demo() -> pixa_store::StoreResult<()> {
//! use std::sync::Arc;
//! use pixa_store::{AssetStore, AssetUpload, InMemoryBlobRepository, InMemoryCatalog};
//!
//! let store = AssetStore::new(
//!     Arc::new(InMemoryBlobRepository::new()),
//!     Arc::new(InMemoryCatalog::new()),
//! );
//! let png = std::fs::read("cat.png")?;
//! let outcome = store.store_bytes(png, AssetUpload::named("cat.png")).await?;
//! let record = store.get_asset_meta(outcome.asset_id()).await?;
//! println!("{} {}", record.media_type, record.fingerprint);
//! # Ok(())
//! # }
//! ```

pub mod config;
mod deadline;
pub mod error;
pub mod metrics;
pub mod outcome;
pub mod reconcile;
pub mod store;
pub mod stream;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use metrics::{MetricsSnapshot, StoreMetrics};
pub use outcome::{AssetStats, AssetUpload, StoreOutcome};
pub use reconcile::{IntegrityReport, SweepFailure, SweepOptions, SweepReport};
pub use store::AssetStore;
pub use stream::AssetStream;

// Re-export the backend seams and core types
pub use pixa_blob::{BlobError, BlobRepository, FsBlobRepository, InMemoryBlobRepository};
pub use pixa_catalog::{
    CatalogError, CatalogFilter, CatalogQuery, FileCatalog, InMemoryCatalog, MetadataCatalog,
    RecordUpdate, SortOrder,
};
pub use pixa_types::{AssetId, AssetRecord, CustomMetadata, Fingerprint, IdGenerator, StorageKey};
