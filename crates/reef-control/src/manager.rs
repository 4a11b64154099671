//! Periodic rules writer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use prometheus::Registry;
use reef_ruler::Ruler;
use reef_stats::StatsCollector;
use reef_store::PlacementStore;
use reef_types::{LimitsProvider, PlacementRules, StatsSnapshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::clock::unix_nanos;
use crate::config::AdaptiveConfig;
use crate::error::ControlError;
use crate::metrics::PlacementMetrics;

const NANOS_PER_MS: i64 = 1_000_000;

/// Builds and publishes placement rules on an interval.
///
/// On the first successful cycle the manager warm-starts from the
/// store: persisted rules seed the ruler's allocators and a persisted
/// stats snapshot seeds the collector, so a failed-over manager does
/// not republish from a cold window. Publish failures are logged and
/// the next cycle recomputes everything; rules are rebuilt wholesale,
/// so a retried cycle cannot accumulate partial state.
pub struct Manager {
    config: AdaptiveConfig,
    store: Arc<dyn PlacementStore>,
    ruler: Ruler,
    stats: Arc<StatsCollector>,
    metrics: Arc<PlacementMetrics>,
    loaded: AtomicBool,
    started_at_ns: i64,
}

impl Manager {
    pub fn new(
        config: AdaptiveConfig,
        store: Arc<dyn PlacementStore>,
        limits: Arc<dyn LimitsProvider>,
        stats: Arc<StatsCollector>,
        registry: Option<&Registry>,
    ) -> Self {
        Self {
            config,
            store,
            ruler: Ruler::new(limits),
            stats,
            metrics: PlacementMetrics::new(registry),
            loaded: AtomicBool::new(false),
            started_at_ns: unix_nanos(),
        }
    }

    /// One manager cycle: load persisted state if not done yet, then
    /// expire, rebuild, and publish. Never fails; errors are logged and
    /// the next cycle retries.
    pub async fn run_once(&self) {
        let now_ns = unix_nanos();
        if !self.loaded.load(Ordering::Acquire) {
            match self.load(now_ns).await {
                Ok(()) => self.loaded.store(true, Ordering::Release),
                Err(e) => {
                    warn!(error = %e, "failed to load placement state, retrying next cycle");
                    return;
                }
            }
        }
        self.cycle(now_ns).await;
    }

    async fn load(&self, now_ns: i64) -> Result<(), ControlError> {
        let rules = match timeout(self.config.store_timeout(), self.store.load_rules()).await {
            Err(_) => return Err(ControlError::Timeout("load_rules")),
            Ok(Err(e)) if e.is_not_found() => PlacementRules::empty(now_ns / NANOS_PER_MS),
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(rules)) => rules,
        };
        self.ruler.load(&rules, now_ns);

        // Warm-start the stats window. A missing snapshot is a fresh
        // deployment; any other failure just means a cold start.
        match timeout(self.config.store_timeout(), self.store.load_stats()).await {
            Ok(Ok(snapshot)) => self.stats.load(&snapshot, now_ns),
            Ok(Err(e)) if e.is_not_found() => {}
            Ok(Err(e)) => warn!(error = %e, "failed to load stats snapshot, starting cold"),
            Err(_) => warn!("stats snapshot load timed out, starting cold"),
        }

        info!(
            rules_created_at = rules.created_at_ms,
            allocators = self.ruler.len(),
            counters = self.stats.len(),
            "placement state loaded"
        );
        Ok(())
    }

    async fn cycle(&self, now_ns: i64) {
        self.metrics.observe_lag(now_ns / NANOS_PER_MS / 1000);
        self.ruler
            .expire(now_ns - self.config.placement_retention_period_ms as i64 * NANOS_PER_MS);
        self.stats
            .expire(now_ns - self.config.stats_retention_period_ms as i64 * NANOS_PER_MS);

        let snapshot = self.stats.build(now_ns);
        let rules = self.ruler.build_rules(&snapshot, now_ns);

        if now_ns - self.started_at_ns
            < self.config.stats_confidence_period_ms as i64 * NANOS_PER_MS
        {
            debug!("inside confidence period, skipping publish");
            return;
        }
        if let Err(e) = self.publish(&rules, &snapshot).await {
            warn!(error = %e, "failed to publish placement rules");
            return;
        }

        self.metrics.publish(&rules, &snapshot);
        if self.config.export_dataset_metrics {
            self.metrics.export_datasets(&rules, &snapshot);
        }
        if self.config.export_shard_breakdown {
            self.metrics.export_shards(&snapshot);
        }
        debug!(
            created_at = rules.created_at_ms,
            tenants = rules.tenants.len(),
            datasets = rules.datasets.len(),
            "published placement rules"
        );
    }

    async fn publish(
        &self,
        rules: &PlacementRules,
        snapshot: &StatsSnapshot,
    ) -> Result<(), ControlError> {
        timeout(self.config.store_timeout(), self.store.store_rules(rules))
            .await
            .map_err(|_| ControlError::Timeout("store_rules"))??;
        timeout(self.config.store_timeout(), self.store.store_stats(snapshot))
            .await
            .map_err(|_| ControlError::Timeout("store_stats"))??;
        Ok(())
    }

    /// Starts the publish loop.
    pub fn spawn(self) -> ManagerHandle {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
        let task = tokio::spawn(async move {
            info!("placement manager started");
            let mut interval = tokio::time::interval(self.config.update_interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => self.run_once().await,
                    _ = shutdown_rx.changed() => break,
                }
            }
            info!("placement manager stopped");
        });
        ManagerHandle { shutdown_tx, task }
    }
}

/// Handle to a running [`Manager`].
pub struct ManagerHandle {
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl ManagerHandle {
    /// Signal shutdown and wait for the publish loop to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}
