//! Per-manager gather statistics.

use contextkeeper_cache::CacheStats;
use serde::{Deserialize, Serialize};

/// Snapshot returned by `ContextManager::stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextStats {
    /// Fresh gathers performed (cache hits are counted by the cache)
    pub total_gatherings: u64,
    /// Provider failures and timeouts across all gathers
    pub total_errors: u64,
    /// Running mean duration of fresh gathers
    pub avg_gather_time_ms: f64,
    /// Registered providers
    pub providers: usize,
    pub enabled_providers: usize,
    pub cache: CacheStats,
}

/// Running totals, owned by one manager.
#[derive(Debug, Default)]
pub(crate) struct GatherCounters {
    pub total_gatherings: u64,
    pub total_errors: u64,
    pub avg_gather_time_ms: f64,
}

impl GatherCounters {
    /// Fold one completed gather into the totals.
    pub fn record(&mut self, duration_ms: f64, errors: usize) {
        self.total_gatherings += 1;
        self.total_errors += errors as u64;
        self.avg_gather_time_ms +=
            (duration_ms - self.avg_gather_time_ms) / self.total_gatherings as f64;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
