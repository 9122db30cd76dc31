//! Metadata catalog for Pixa.
//!
//! The catalog is the queryable record store of the asset system: one
//! [`AssetRecord`](pixa_types::AssetRecord) per stored asset, keyed by asset
//! ID, with point lookup by fingerprint, tag-filtered paginated listing,
//! partial field updates, counts and size aggregates.
//!
//! The catalog is the authority on fingerprint uniqueness. Two concurrent
//! stores of identical content can both miss each other in a lookup; the
//! backend rejects the second insert with
//! [`CatalogError::DuplicateFingerprint`], which callers treat as a duplicate
//! upload rather than a failure.
//!
//! # Backends
//!
//! - [`InMemoryCatalog`] -- `RwLock`-guarded state for tests and embedding
//! - [`FileCatalog`] -- JSON snapshot file rewritten atomically on every mutation

pub mod error;
pub mod file;
pub mod memory;
pub mod query;
pub mod state;
pub mod traits;

pub use error::{CatalogError, CatalogResult};
pub use file::FileCatalog;
pub use memory::InMemoryCatalog;
pub use query::{CatalogFilter, CatalogQuery, RecordUpdate, SizeAggregate, SortOrder};
pub use traits::MetadataCatalog;
