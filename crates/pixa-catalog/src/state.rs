//! Backend-independent catalog state shared by the in-process backends.
//!
//! [`CatalogState`] holds the records, the fingerprint uniqueness index and an
//! insertion sequence used to break creation-time ties. It performs no
//! locking and no I/O; [`InMemoryCatalog`](crate::InMemoryCatalog) and
//! [`FileCatalog`](crate::FileCatalog) wrap it with their own synchronization
//! and persistence.

use std::collections::HashMap;

use pixa_types::{AssetId, AssetRecord, Fingerprint};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};
use crate::query::{CatalogFilter, CatalogQuery, RecordUpdate, SizeAggregate, SortOrder};

#[derive(Clone, Debug)]
struct Entry {
    seq: u64,
    record: AssetRecord,
}

/// Records plus the indexes that enforce catalog invariants.
#[derive(Clone, Debug, Default)]
pub struct CatalogState {
    records: HashMap<AssetId, Entry>,
    by_fingerprint: HashMap<Fingerprint, AssetId>,
    next_seq: u64,
}

/// Serialized form of a [`CatalogState`]: records in insertion order.
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub version: u32,
    pub records: Vec<AssetRecord>,
}

impl CatalogSnapshot {
    pub const VERSION: u32 = 1;
}

impl CatalogState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from a snapshot, re-checking uniqueness.
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> CatalogResult<Self> {
        if snapshot.version != CatalogSnapshot::VERSION {
            return Err(CatalogError::Serialization(format!(
                "unsupported catalog snapshot version {}",
                snapshot.version
            )));
        }
        let mut state = Self::new();
        for record in snapshot.records {
            state.insert(record)?;
        }
        Ok(state)
    }

    /// Capture all records in insertion order.
    pub fn snapshot(&self) -> CatalogSnapshot {
        let mut entries: Vec<&Entry> = self.records.values().collect();
        entries.sort_by_key(|e| e.seq);
        CatalogSnapshot {
            version: CatalogSnapshot::VERSION,
            records: entries.into_iter().map(|e| e.record.clone()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a new record, enforcing asset-ID and fingerprint uniqueness.
    pub fn insert(&mut self, record: AssetRecord) -> CatalogResult<()> {
        if self.records.contains_key(&record.asset_id) {
            return Err(CatalogError::DuplicateId(record.asset_id));
        }
        if let Some(existing) = self.by_fingerprint.get(&record.fingerprint) {
            return Err(CatalogError::DuplicateFingerprint {
                fingerprint: record.fingerprint,
                existing: existing.clone(),
            });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_fingerprint
            .insert(record.fingerprint, record.asset_id.clone());
        self.records
            .insert(record.asset_id.clone(), Entry { seq, record });
        Ok(())
    }

    pub fn find_by_id(&self, id: &AssetId) -> Option<AssetRecord> {
        self.records.get(id).map(|e| e.record.clone())
    }

    pub fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Option<AssetRecord> {
        self.by_fingerprint
            .get(fingerprint)
            .and_then(|id| self.find_by_id(id))
    }

    pub fn find(&self, query: &CatalogQuery) -> Vec<AssetRecord> {
        let mut matched: Vec<&Entry> = self
            .records
            .values()
            .filter(|e| query.filter.matches(&e.record))
            .collect();
        matched.sort_by(|a, b| {
            let asc = a
                .record
                .created_at
                .cmp(&b.record.created_at)
                .then(a.seq.cmp(&b.seq));
            match query.sort {
                SortOrder::CreatedAsc => asc,
                SortOrder::CreatedDesc => asc.reverse(),
            }
        });
        let page = matched.into_iter().skip(query.offset);
        let page: Vec<&Entry> = match query.effective_limit() {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        };
        page.into_iter().map(|e| e.record.clone()).collect()
    }

    /// Apply a partial update. Returns the number of matched records (0 or 1).
    pub fn update(&mut self, id: &AssetId, update: &RecordUpdate) -> u64 {
        match self.records.get_mut(id) {
            Some(entry) => {
                update.apply(&mut entry.record);
                1
            }
            None => 0,
        }
    }

    /// Remove a record. Returns the number of deleted records (0 or 1).
    pub fn delete(&mut self, id: &AssetId) -> u64 {
        match self.records.remove(id) {
            Some(entry) => {
                self.by_fingerprint.remove(&entry.record.fingerprint);
                1
            }
            None => 0,
        }
    }

    pub fn count(&self, filter: &CatalogFilter) -> u64 {
        self.records
            .values()
            .filter(|e| filter.matches(&e.record))
            .count() as u64
    }

    pub fn aggregate_size_stats(&self) -> SizeAggregate {
        SizeAggregate::from_sizes(self.records.values().map(|e| e.record.size_bytes))
    }
}
