//! Table configuration.
//!
//! Defaults: 128 buckets, a 1 MiB reclaim threshold, and an accountant that
//! eats 5 retired values per bucket every 50ms.

use crate::error::{Result, TableError};
use std::time::Duration;

/// Default number of buckets (shards) per table.
pub const DEFAULT_BUCKET_COUNT: usize = 128;

/// Default garbage estimate (bytes) that triggers a collection cycle.
pub const DEFAULT_RECLAIM_THRESHOLD: u64 = 1024 * 1024;

/// Default number of retired values the accountant processes per bucket per pass.
pub const DEFAULT_RECLAIM_BATCH: usize = 5;

/// Configuration for a table and its background threads.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Number of buckets; fixed for the table's lifetime (default: 128)
    pub bucket_count: usize,

    /// Combined garbage estimate that wakes the collector (default: 1 MiB)
    pub reclaim_threshold: u64,

    /// Retired values accounted per bucket per accountant pass (default: 5)
    pub reclaim_batch: usize,

    /// Sleep between accountant passes (default: 50ms)
    pub reclaim_interval: Duration,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            bucket_count: DEFAULT_BUCKET_COUNT,
            reclaim_threshold: DEFAULT_RECLAIM_THRESHOLD,
            reclaim_batch: DEFAULT_RECLAIM_BATCH,
            reclaim_interval: Duration::from_millis(50),
        }
    }
}

impl TableConfig {
    /// Checks that the configuration describes a usable table.
    pub fn validate(&self) -> Result<()> {
        if self.bucket_count == 0 {
            return Err(TableError::InvalidConfig(
                "bucket_count must be at least 1".to_string(),
            ));
        }
        if self.reclaim_threshold == 0 {
            return Err(TableError::InvalidConfig(
                "reclaim_threshold must be non-zero".to_string(),
            ));
        }
        if self.reclaim_batch == 0 {
            return Err(TableError::InvalidConfig(
                "reclaim_batch must be at least 1".to_string(),
            ));
        }
        if self.reclaim_interval.is_zero() {
            return Err(TableError::InvalidConfig(
                "reclaim_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
