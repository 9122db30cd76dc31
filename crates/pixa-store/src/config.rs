use std::time::Duration;

/// Tunables for an [`AssetStore`](crate::AssetStore).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Deadline applied to every operation as a whole. Each backend call runs
    /// against the time remaining; `None` disables the deadline.
    pub operation_timeout: Option<Duration>,
    /// Page size used when walking the whole catalog.
    pub scan_page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Some(Duration::from_secs(30)),
            scan_page_size: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.operation_timeout, Some(Duration::from_secs(30)));
        assert_eq!(c.scan_page_size, 500);
    }
}
