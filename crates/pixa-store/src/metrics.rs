use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonic counters kept by an [`AssetStore`](crate::AssetStore).
///
/// Compensating deletes are counted separately from the operations that
/// trigger them so that a failing compensation is visible even though the
/// caller only ever sees the primary error.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    stored: AtomicU64,
    duplicates: AtomicU64,
    deleted: AtomicU64,
    compensations: AtomicU64,
    compensation_failures: AtomicU64,
    orphans_removed: AtomicU64,
}

/// Point-in-time copy of [`StoreMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub stored: u64,
    pub duplicates: u64,
    pub deleted: u64,
    pub compensations: u64,
    pub compensation_failures: u64,
    pub orphans_removed: u64,
}

impl StoreMetrics {
    pub(crate) fn record_stored(&self) {
        self.stored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compensation(&self, succeeded: bool) {
        self.compensations.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.compensation_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_orphans_removed(&self, n: u64) {
        self.orphans_removed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            stored: self.stored.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            compensations: self.compensations.load(Ordering::Relaxed),
            compensation_failures: self.compensation_failures.load(Ordering::Relaxed),
            orphans_removed: self.orphans_removed.load(Ordering::Relaxed),
        }
    }
}
