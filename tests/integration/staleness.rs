//! Stale-write protection and last-good-state serving on the agent.

use std::sync::Arc;

use reef_control::{AdaptiveConfig, AdaptivePlacement, Agent};
use reef_store::{MemoryStore, PlacementStore};
use reef_types::{
    DatasetPlacement, LoadBalancing, PlacementRules, RuleDefaults, TenantPlacement,
};
use reef_tests::FlakyStore;

fn rules(created_at_ms: i64, shard_limit: u32) -> PlacementRules {
    PlacementRules {
        created_at_ms,
        defaults: RuleDefaults::default(),
        tenants: vec![TenantPlacement {
            tenant_id: "t-a".to_owned(),
            tenant_shards: 0,
            default_dataset_shards: 2,
            load_balancing: LoadBalancing::Dynamic,
        }],
        datasets: vec![DatasetPlacement {
            tenant: 0,
            name: "svc-1".to_owned(),
            shard_limit,
            load_balancing: LoadBalancing::Fingerprint,
        }],
    }
}

fn shard_limit_served(placement: &AdaptivePlacement) -> u32 {
    let key = reef_types::Key::for_labels(
        "t-a",
        &[reef_types::LabelPair::new("service_name", "svc-1")],
    );
    reef_placement::PlacementPolicy::policy(placement, &key).dataset_shards
}

#[tokio::test]
async fn test_rolled_back_document_is_ignored() {
    let store = Arc::new(MemoryStore::new());
    let placement = Arc::new(AdaptivePlacement::new());
    let agent = Agent::new(AdaptiveConfig::test_config(), store.clone(), placement.clone());

    store.store_rules(&rules(200, 4)).await.unwrap();
    agent.sync().await.unwrap();
    assert_eq!(shard_limit_served(&placement), 4);

    // A lagging store replica serves an older document: ignored.
    store.store_rules(&rules(100, 9)).await.unwrap();
    agent.sync().await.unwrap();
    assert_eq!(placement.created_at_ms(), 200);
    assert_eq!(shard_limit_served(&placement), 4);

    // A genuinely newer document replaces the table.
    store.store_rules(&rules(300, 6)).await.unwrap();
    agent.sync().await.unwrap();
    assert_eq!(shard_limit_served(&placement), 6);
}

#[tokio::test]
async fn test_outage_serves_last_good_rules() {
    let store = Arc::new(FlakyStore::new());
    let placement = Arc::new(AdaptivePlacement::new());
    let agent = Agent::new(AdaptiveConfig::test_config(), store.clone(), placement.clone());

    store.store_rules(&rules(100, 4)).await.unwrap();
    agent.sync().await.unwrap();
    assert_eq!(shard_limit_served(&placement), 4);

    store.set_down(true);
    assert!(agent.sync().await.is_err());
    // The table is untouched; the write path keeps being served.
    assert_eq!(shard_limit_served(&placement), 4);

    store.set_down(false);
    store.store_rules(&rules(200, 7)).await.unwrap();
    agent.sync().await.unwrap();
    assert_eq!(shard_limit_served(&placement), 7);
}

#[tokio::test]
async fn test_deleted_rules_reset_to_defaults() {
    // NotFound is not an outage: the agent applies a fresh empty
    // ruleset, so deleting the document resets placement to defaults.
    let store = Arc::new(MemoryStore::new());
    let placement = Arc::new(AdaptivePlacement::new());
    let agent = Agent::new(AdaptiveConfig::test_config(), store.clone(), placement.clone());

    agent.sync().await.unwrap();
    assert!(placement.created_at_ms() > 0);
    assert_eq!(shard_limit_served(&placement), 0);
}
