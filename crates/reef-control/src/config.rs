//! Configuration for the adaptive placement services.

use std::time::Duration;

use serde::Deserialize;

/// `[adaptive_placement]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Interval between manager publish cycles and agent reloads.
    pub update_interval_ms: u64,
    /// EWMA half-life for the per-shard usage rates.
    pub stats_aggregation_window_ms: u64,
    /// Counters untouched for this long are dropped from the stats.
    pub stats_retention_period_ms: u64,
    /// The manager does not publish rules until it has been collecting
    /// for this long, so a fresh window cannot narrow placements.
    pub stats_confidence_period_ms: u64,
    /// Allocator state for datasets absent from stats is evicted after
    /// this period.
    pub placement_retention_period_ms: u64,
    /// Upper bound on any single store call.
    pub store_timeout_ms: u64,
    /// Export per-(tenant, dataset) shard-limit and usage gauges.
    pub export_dataset_metrics: bool,
    /// Export the per-(tenant, dataset, shard, owner) usage breakdown.
    pub export_shard_breakdown: bool,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 15_000,
            stats_aggregation_window_ms: 60_000,
            stats_retention_period_ms: 15 * 60_000,
            stats_confidence_period_ms: 60_000,
            placement_retention_period_ms: 15 * 60_000,
            store_timeout_ms: 5_000,
            export_dataset_metrics: false,
            export_shard_breakdown: false,
        }
    }
}

impl AdaptiveConfig {
    /// A config suitable for fast test execution.
    pub fn test_config() -> Self {
        Self {
            update_interval_ms: 20,
            stats_aggregation_window_ms: 1_000,
            stats_retention_period_ms: 10_000,
            stats_confidence_period_ms: 0,
            placement_retention_period_ms: 10_000,
            store_timeout_ms: 1_000,
            export_dataset_metrics: true,
            export_shard_breakdown: true,
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn stats_aggregation_window(&self) -> Duration {
        Duration::from_millis(self.stats_aggregation_window_ms)
    }

    pub fn stats_retention_period(&self) -> Duration {
        Duration::from_millis(self.stats_retention_period_ms)
    }

    pub fn stats_confidence_period(&self) -> Duration {
        Duration::from_millis(self.stats_confidence_period_ms)
    }

    pub fn placement_retention_period(&self) -> Duration {
        Duration::from_millis(self.placement_retention_period_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
