//! Blob repository for Pixa.
//!
//! A blob repository is a byte-stream store addressed by an internally
//! generated [`StorageKey`](pixa_types::StorageKey). It never interprets the
//! bytes and knows nothing about assets, fingerprints or the catalog.
//!
//! # Backends
//!
//! All backends implement the [`BlobRepository`] trait:
//!
//! - [`InMemoryBlobRepository`] -- `HashMap`-based store for tests and embedding
//! - [`FsBlobRepository`] -- one file per blob under a sharded directory tree
//!
//! # Design Rules
//!
//! 1. `create` never overwrites: a key is written at most once.
//! 2. A blob is either fully visible under its key or not visible at all.
//! 3. Reads are streamed; the repository hands out an owned reader and the
//!    underlying handle is released when the reader is dropped.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{BlobError, BlobResult};
pub use fs::FsBlobRepository;
pub use memory::InMemoryBlobRepository;
pub use traits::{BlobReader, BlobRepository};
