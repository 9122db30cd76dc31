//! Background reconciliation between the blob repository and the catalog.
//!
//! [`AssetStore::sweep_orphans`] removes blobs that no record references.
//! Such blobs are left behind when a store fails after its blob write and the
//! compensating delete also fails. The sweep only ever deletes blobs. It
//! also purges temporary files of blob writes that never completed, once they
//! are older than the grace window.
//!
//! [`AssetStore::audit_integrity`] walks the catalog the other way and
//! reports records whose blob is missing. It repairs nothing.

use std::time::Duration;

use pixa_catalog::{CatalogFilter, CatalogQuery, SortOrder};
use pixa_types::{AssetId, StorageKey};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::AssetStore;

/// Options for [`AssetStore::sweep_orphans`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepOptions {
    /// Report orphans without deleting them.
    pub dry_run: bool,
    /// Wait this long and re-count candidates before deleting them. A store
    /// that has written its blob but not yet its record is not swept while
    /// it completes within the window.
    pub grace: Duration,
}

impl SweepOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

/// A blob the sweep could not check or delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub storage_key: StorageKey,
    pub error: String,
}

/// Outcome of one orphan sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Blob keys enumerated.
    pub scanned: u64,
    /// Keys with no referencing record.
    pub orphans_found: u64,
    /// Orphans deleted. Always zero on a dry run.
    pub orphans_removed: u64,
    /// Leftovers of interrupted blob writes found, and removed unless this
    /// was a dry run.
    pub incomplete_writes: u64,
    pub failures: Vec<SweepFailure>,
}

/// Outcome of an integrity audit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Records examined.
    pub checked: u64,
    /// Records whose blob is missing.
    pub missing: Vec<AssetId>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
    }
}

impl AssetStore {
    /// Delete blobs that no catalog record references.
    ///
    /// Per-item lookup or delete failures are collected in the report and do
    /// not stop the sweep. Only failing to enumerate the blob keys is an
    /// error. Without a grace window the sweep must not run concurrently
    /// with stores.
    pub async fn sweep_orphans(&self, options: SweepOptions) -> StoreResult<SweepReport> {
        let keys = self
            .deadline()
            .run("blob listing", self.blobs.list_keys())
            .await?
            .map_err(StoreError::storage("blob listing"))?;

        let mut report = SweepReport {
            scanned: keys.len() as u64,
            incomplete_writes: self.purge_incomplete(options).await,
            ..SweepReport::default()
        };

        let mut candidates = Vec::new();
        for key in keys {
            match self.reference_count(&key).await {
                Ok(0) => candidates.push(key),
                Ok(_) => {}
                Err(e) => report.fail(key, e),
            }
        }

        if !options.grace.is_zero() && !candidates.is_empty() {
            debug!(candidates = candidates.len(), grace_ms = options.grace.as_millis() as u64, "waiting out sweep grace window");
            tokio::time::sleep(options.grace).await;
            let mut confirmed = Vec::with_capacity(candidates.len());
            for key in candidates {
                match self.reference_count(&key).await {
                    Ok(0) => confirmed.push(key),
                    Ok(_) => debug!(storage_key = %key, "candidate claimed during grace window"),
                    Err(e) => report.fail(key, e),
                }
            }
            candidates = confirmed;
        }

        report.orphans_found = candidates.len() as u64;
        if options.dry_run {
            for key in &candidates {
                info!(storage_key = %key, "orphan blob (dry run)");
            }
            return Ok(report);
        }

        for key in candidates {
            let deleted = self
                .deadline()
                .run("orphan delete", self.blobs.delete(&key))
                .await
                .and_then(|r| r.map_err(StoreError::storage("orphan delete")));
            match deleted {
                Ok(()) => {
                    debug!(storage_key = %key, "removed orphan blob");
                    report.orphans_removed += 1;
                }
                Err(e) => report.fail(key, e),
            }
        }

        self.metrics.record_orphans_removed(report.orphans_removed);
        info!(
            scanned = report.scanned,
            orphans_found = report.orphans_found,
            orphans_removed = report.orphans_removed,
            incomplete_writes = report.incomplete_writes,
            failures = report.failures.len(),
            "orphan sweep finished"
        );
        Ok(report)
    }

    async fn purge_incomplete(&self, options: SweepOptions) -> u64 {
        let purged = self
            .deadline()
            .run(
                "incomplete write purge",
                self.blobs.purge_incomplete(options.grace, options.dry_run),
            )
            .await
            .and_then(|r| r.map_err(StoreError::storage("incomplete write purge")));
        match purged {
            Ok(n) => n,
            Err(error) => {
                warn!(%error, "could not purge incomplete blob writes");
                0
            }
        }
    }

    async fn reference_count(&self, key: &StorageKey) -> StoreResult<u64> {
        self.deadline()
            .run(
                "reference count",
                self.catalog.count(&CatalogFilter::StorageKey(key.clone())),
            )
            .await?
            .map_err(StoreError::catalog("reference count"))
    }

    /// Check that every catalog record's blob exists.
    ///
    /// Records are read in pages of `scan_page_size`, oldest first. Each page
    /// runs under its own deadline.
    pub async fn audit_integrity(&self) -> StoreResult<IntegrityReport> {
        let page_size = self.config.scan_page_size.max(1);
        let mut report = IntegrityReport::default();
        let mut offset = 0;

        loop {
            let deadline = self.deadline();
            let query = CatalogQuery::new(CatalogFilter::All)
                .sort(SortOrder::CreatedAsc)
                .limit(page_size)
                .offset(offset);
            let page = deadline
                .run("record scan", self.catalog.find(&query))
                .await?
                .map_err(StoreError::catalog("record scan"))?;

            for record in &page {
                let exists = deadline
                    .run("blob check", self.blobs.exists(&record.storage_key))
                    .await?
                    .map_err(StoreError::storage("blob check"))?;
                report.checked += 1;
                if !exists {
                    warn!(asset_id = %record.asset_id, storage_key = %record.storage_key, "record references missing blob");
                    report.missing.push(record.asset_id.clone());
                }
            }

            if page.len() < page_size {
                break;
            }
            offset += page.len();
        }

        info!(checked = report.checked, missing = report.missing.len(), "integrity audit finished");
        Ok(report)
    }
}

impl SweepReport {
    fn fail(&mut self, storage_key: StorageKey, error: StoreError) {
        warn!(storage_key = %storage_key, %error, "sweep item failed");
        self.failures.push(SweepFailure {
            storage_key,
            error: error.to_string(),
        });
    }
}
