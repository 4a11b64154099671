//! Prometheus metrics for the placement manager.

use std::sync::Arc;

use prometheus::{GaugeVec, IntGauge, IntGaugeVec, Opts, Registry};

use reef_types::{PlacementRules, StatsSnapshot};

/// Metrics exported by the manager after each publish cycle.
#[derive(Clone)]
pub struct PlacementMetrics {
    /// Unix seconds of the last successful rules publish.
    pub last_update_timestamp: IntGauge,
    /// Seconds since the last successful publish, refreshed every
    /// cycle so the value keeps growing while publishes fail.
    pub update_lag_seconds: IntGauge,
    pub rule_tenants: IntGauge,
    pub rule_datasets: IntGauge,
    pub stat_datasets: IntGauge,
    pub stat_shards: IntGauge,
    /// Per-dataset shard limit, exported only when enabled in config.
    pub dataset_shard_limit: IntGaugeVec,
    /// Per-dataset usage rate, exported only when enabled in config.
    pub dataset_usage: GaugeVec,
    /// Per-shard usage breakdown, exported only when enabled in config.
    pub shard_usage: GaugeVec,
}

impl PlacementMetrics {
    pub fn new(registry: Option<&Registry>) -> Arc<Self> {
        let last_update_timestamp = IntGauge::new(
            "placement_rules_last_update_timestamp_seconds",
            "Unix time of the last successful placement rules publish",
        )
        .expect("placement_rules_last_update_timestamp_seconds");

        let update_lag_seconds = IntGauge::new(
            "placement_rules_update_lag_seconds",
            "Seconds since the last successful placement rules publish",
        )
        .expect("placement_rules_update_lag_seconds");

        let rule_tenants = IntGauge::new(
            "placement_rules_tenants",
            "Tenant entries in the last published rules document",
        )
        .expect("placement_rules_tenants");

        let rule_datasets = IntGauge::new(
            "placement_rules_datasets",
            "Dataset entries in the last published rules document",
        )
        .expect("placement_rules_datasets");

        let stat_datasets = IntGauge::new(
            "placement_stats_datasets",
            "Dataset rows in the last built stats snapshot",
        )
        .expect("placement_stats_datasets");

        let stat_shards = IntGauge::new(
            "placement_stats_shards",
            "Shard rows in the last built stats snapshot",
        )
        .expect("placement_stats_shards");

        let dataset_shard_limit = IntGaugeVec::new(
            Opts::new(
                "placement_dataset_shard_limit",
                "Shard limit assigned to a dataset",
            ),
            &["tenant", "dataset"],
        )
        .expect("placement_dataset_shard_limit");

        let dataset_usage = GaugeVec::new(
            Opts::new(
                "placement_dataset_usage_bytes_per_second",
                "Smoothed usage rate of a dataset",
            ),
            &["tenant", "dataset"],
        )
        .expect("placement_dataset_usage_bytes_per_second");

        let shard_usage = GaugeVec::new(
            Opts::new(
                "placement_shard_usage_bytes_per_second",
                "Smoothed usage rate of a single dataset shard",
            ),
            &["tenant", "dataset", "shard", "owner"],
        )
        .expect("placement_shard_usage_bytes_per_second");

        if let Some(reg) = registry {
            let _ = reg.register(Box::new(last_update_timestamp.clone()));
            let _ = reg.register(Box::new(update_lag_seconds.clone()));
            let _ = reg.register(Box::new(rule_tenants.clone()));
            let _ = reg.register(Box::new(rule_datasets.clone()));
            let _ = reg.register(Box::new(stat_datasets.clone()));
            let _ = reg.register(Box::new(stat_shards.clone()));
            let _ = reg.register(Box::new(dataset_shard_limit.clone()));
            let _ = reg.register(Box::new(dataset_usage.clone()));
            let _ = reg.register(Box::new(shard_usage.clone()));
        }

        Arc::new(Self {
            last_update_timestamp,
            update_lag_seconds,
            rule_tenants,
            rule_datasets,
            stat_datasets,
            stat_shards,
            dataset_shard_limit,
            dataset_usage,
            shard_usage,
        })
    }

    /// Record a successful publish.
    pub fn publish(&self, rules: &PlacementRules, stats: &StatsSnapshot) {
        self.last_update_timestamp.set(rules.created_at_ms / 1000);
        self.update_lag_seconds.set(0);
        self.rule_tenants.set(rules.tenants.len() as i64);
        self.rule_datasets.set(rules.datasets.len() as i64);
        self.stat_datasets.set(stats.datasets.len() as i64);
        self.stat_shards.set(stats.shards.len() as i64);
    }

    /// Refresh the publish lag. Called once per cycle whether or not
    /// the publish succeeds; zero before the first publish.
    pub fn observe_lag(&self, now_s: i64) {
        let last = self.last_update_timestamp.get();
        if last > 0 {
            self.update_lag_seconds.set((now_s - last).max(0));
        }
    }

    /// Export the flag-gated per-dataset gauges. The vectors are reset
    /// first so rows for evicted datasets do not linger.
    pub fn export_datasets(&self, rules: &PlacementRules, stats: &StatsSnapshot) {
        self.dataset_shard_limit.reset();
        self.dataset_usage.reset();
        for dataset in &rules.datasets {
            let Some(tenant) = rules.tenants.get(dataset.tenant as usize) else {
                continue;
            };
            self.dataset_shard_limit
                .with_label_values(&[&tenant.tenant_id, &dataset.name])
                .set(dataset.shard_limit as i64);
        }
        for dataset in &stats.datasets {
            let Some(tenant) = stats.tenants.get(dataset.tenant as usize) else {
                continue;
            };
            let usage: u64 = dataset.usage.iter().sum();
            self.dataset_usage
                .with_label_values(&[&tenant.tenant_id, &dataset.name])
                .set(usage as f64);
        }
    }

    /// Export the flag-gated per-shard usage breakdown.
    pub fn export_shards(&self, stats: &StatsSnapshot) {
        self.shard_usage.reset();
        for dataset in &stats.datasets {
            let Some(tenant) = stats.tenants.get(dataset.tenant as usize) else {
                continue;
            };
            for (i, &shard_ref) in dataset.shards.iter().enumerate() {
                let Some(shard) = stats.shards.get(shard_ref as usize) else {
                    continue;
                };
                let usage = dataset.usage.get(i).copied().unwrap_or_default();
                self.shard_usage
                    .with_label_values(&[
                        &tenant.tenant_id,
                        &dataset.name,
                        &shard.id.to_string(),
                        &shard.owner,
                    ])
                    .set(usage as f64);
            }
        }
    }
}
