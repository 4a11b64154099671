//! End-to-end reconciliation: samples recorded on the manager side flow
//! through the store to an agent, whose placement table then shapes the
//! distributor's decisions on the write path.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reef_control::{AdaptiveConfig, AdaptivePlacement, Agent, Manager};
use reef_placement::{Distributor, PlacementPolicy};
use reef_stats::StatsCollector;
use reef_store::{MemoryStore, PlacementStore};
use reef_types::{Key, LabelPair, PlacementLimits};
use reef_tests::{init_tracing, sample, three_node_ring, unix_nanos};

const SEC: i64 = 1_000_000_000;

fn limits() -> Arc<PlacementLimits> {
    Arc::new(PlacementLimits {
        unit_size_bytes: 100,
        min_dataset_shards: 1,
        max_dataset_shards: 8,
        ..PlacementLimits::default()
    })
}

#[tokio::test]
async fn test_samples_shape_placement_through_the_store() -> Result<()> {
    init_tracing();
    let config = AdaptiveConfig::test_config();
    let store = Arc::new(MemoryStore::new());
    let stats = Arc::new(StatsCollector::new(
        config.stats_aggregation_window(),
        config.stats_retention_period(),
    ));
    let manager = Manager::new(config.clone(), store.clone(), limits(), stats.clone(), None);

    // A steady 500 B/s on one dataset, observed for long enough that
    // the EWMA carries the full rate.
    let now = unix_nanos();
    for i in 0..30 {
        stats.record_stats(
            &[sample("t-a", "svc-1", 1, "node-a", 500)],
            now - (30 - i) * SEC,
        );
    }
    manager.run_once().await;

    let placement = Arc::new(AdaptivePlacement::new());
    let agent = Agent::new(config, store.clone(), placement.clone());
    agent.sync().await?;

    // 500 B/s over 100-byte units: the dataset gets several shards.
    let key = Key::for_labels("t-a", &[LabelPair::new("service_name", "svc-1")]);
    let policy = placement.policy(&key);
    assert!(
        policy.dataset_shards >= 3,
        "dataset_shards = {}",
        policy.dataset_shards
    );

    // The distributor serves placements from the agent's table.
    let ring = three_node_ring();
    let distributor =
        Distributor::new(placement.clone()).with_max_age(Duration::from_secs(3600));
    let first = distributor.distribute(&key, ring.as_ref())?;
    let second = distributor.distribute(&key, ring.as_ref())?;
    assert_eq!(first.shard, second.shard);

    let candidates: Vec<String> = first
        .instances()
        .take(5)
        .map(|i| i.id.clone())
        .collect();
    assert_eq!(candidates.len(), 5);

    // An unknown dataset falls back to the tenant default width.
    let other = Key::for_labels("t-a", &[LabelPair::new("service_name", "svc-9")]);
    assert_eq!(placement.policy(&other).dataset_shards, 2);
    Ok(())
}

#[tokio::test]
async fn test_quiet_dataset_scales_back_in() -> Result<()> {
    init_tracing();
    let config = AdaptiveConfig {
        stats_retention_period_ms: 300,
        placement_retention_period_ms: 300,
        ..AdaptiveConfig::test_config()
    };
    let store = Arc::new(MemoryStore::new());
    let stats = Arc::new(StatsCollector::new(
        config.stats_aggregation_window(),
        config.stats_retention_period(),
    ));
    let manager = Manager::new(config, store.clone(), limits(), stats.clone(), None);

    let now = unix_nanos();
    for i in 0..30 {
        stats.record_stats(
            &[sample("t-a", "svc-1", 1, "node-a", 500)],
            now - (29 - i) * SEC,
        );
    }
    manager.run_once().await;
    let busy = store.load_rules().await?;
    assert!(busy.datasets[0].shard_limit >= 3);

    // Past the retention period the counters are swept, and the next
    // cycle drops the dataset from the rules entirely.
    tokio::time::sleep(Duration::from_millis(500)).await;
    manager.run_once().await;
    let quiet = store.load_rules().await?;
    assert!(quiet.datasets.is_empty());
    assert!(quiet.created_at_ms >= busy.created_at_ms);
    Ok(())
}
