//! Query, update and aggregate types accepted by [`MetadataCatalog`](crate::MetadataCatalog).

use chrono::{DateTime, Utc};
use pixa_types::{AssetRecord, CustomMetadata, StorageKey};
use serde::{Deserialize, Serialize};

/// Record selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CatalogFilter {
    /// Every record.
    #[default]
    All,
    /// Records whose tags intersect the given set. An empty set selects
    /// every record.
    AnyTag(Vec<String>),
    /// Records referencing the given blob.
    StorageKey(StorageKey),
}

impl CatalogFilter {
    /// Build a tag filter, collapsing an empty tag set to [`CatalogFilter::All`].
    pub fn any_tag(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        if tags.is_empty() {
            Self::All
        } else {
            Self::AnyTag(tags)
        }
    }

    /// Returns `true` if `record` is selected by this filter.
    pub fn matches(&self, record: &AssetRecord) -> bool {
        match self {
            Self::All => true,
            Self::AnyTag(tags) => record.has_any_tag(tags),
            Self::StorageKey(key) => record.storage_key == *key,
        }
    }
}

/// Ordering of listed records by creation time.
///
/// Records created at the same instant are ordered by insertion, so the
/// later insert sorts first under `CreatedDesc`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    CreatedDesc,
    CreatedAsc,
}

/// A filtered, ordered, paginated listing request.
///
/// `offset` and `limit` apply after ordering. `limit` of `None` or `Some(0)`
/// means unlimited. Pages are not a stable cursor: concurrent inserts shift
/// page boundaries between calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub filter: CatalogFilter,
    pub sort: SortOrder,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl CatalogQuery {
    pub fn new(filter: CatalogFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// The effective page size, `None` meaning unlimited.
    pub fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|&n| n > 0)
    }
}

/// Partial update of the mutable fields of a record.
///
/// Fields left as `None` are not touched. `updated_at` is always applied.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordUpdate {
    pub tags: Option<Vec<String>>,
    pub custom_metadata: Option<CustomMetadata>,
    pub updated_at: DateTime<Utc>,
}

impl RecordUpdate {
    /// An update that only advances `updated_at` to `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            tags: None,
            custom_metadata: None,
            updated_at: now,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_metadata(mut self, metadata: CustomMetadata) -> Self {
        self.custom_metadata = Some(metadata);
        self
    }

    /// Apply to `record` in place.
    pub fn apply(&self, record: &mut AssetRecord) {
        if let Some(tags) = &self.tags {
            record.tags = tags.clone();
        }
        if let Some(metadata) = &self.custom_metadata {
            record.custom_metadata = metadata.clone();
        }
        record.touch(self.updated_at);
    }
}

/// Count and size aggregate over the whole catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeAggregate {
    pub count: u64,
    pub total_bytes: u64,
    /// Mean record size; `0.0` for an empty catalog.
    pub average_bytes: f64,
}

impl SizeAggregate {
    /// Fold record sizes into an aggregate.
    pub fn from_sizes(sizes: impl IntoIterator<Item = u64>) -> Self {
        let (count, total_bytes) = sizes
            .into_iter()
            .fold((0u64, 0u64), |(n, sum), size| (n + 1, sum + size));
        let average_bytes = if count == 0 {
            0.0
        } else {
            total_bytes as f64 / count as f64
        };
        Self {
            count,
            total_bytes,
            average_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tag_filter_collapses_to_all() {
        assert_eq!(CatalogFilter::any_tag(Vec::<String>::new()), CatalogFilter::All);
        assert_eq!(
            CatalogFilter::any_tag(["x"]),
            CatalogFilter::AnyTag(vec!["x".into()])
        );
    }

    #[test]
    fn zero_limit_means_unlimited() {
        assert_eq!(CatalogQuery::default().effective_limit(), None);
        assert_eq!(CatalogQuery::default().limit(0).effective_limit(), None);
        assert_eq!(CatalogQuery::default().limit(5).effective_limit(), Some(5));
    }

    #[test]
    fn aggregate_of_sizes() {
        let agg = SizeAggregate::from_sizes([100, 300, 500]);
        assert_eq!(agg.count, 3);
        assert_eq!(agg.total_bytes, 900);
        assert_eq!(agg.average_bytes, 300.0);
    }

    #[test]
    fn aggregate_of_nothing() {
        let agg = SizeAggregate::from_sizes([]);
        assert_eq!(agg, SizeAggregate::default());
    }
}
