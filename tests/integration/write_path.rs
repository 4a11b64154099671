//! Write-path behavior of the distributor against a live ring.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use reef_placement::{
    Distributor, DistributorError, InstanceDesc, StaticPlacement,
};
use reef_types::{Key, LabelPair};
use reef_tests::MockRing;

fn key(tenant: &str, service: &str) -> Key {
    Key::for_labels(tenant, &[LabelPair::new("service_name", service)])
}

#[tokio::test]
async fn test_identical_keys_place_identically() {
    let ring = MockRing::new(&["node-a", "node-b", "node-c"], 4);
    let distributor = Distributor::new(Arc::new(StaticPlacement));

    let k = key("t-a", "svc-1");
    let first = distributor.distribute(&k, &ring).unwrap();
    let second = distributor.distribute(&k, &ring).unwrap();
    assert_eq!(first.shard, second.shard);
    let a: Vec<String> = first.instances().take(5).map(|i| i.id.clone()).collect();
    let b: Vec<String> = second.instances().take(5).map(|i| i.id.clone()).collect();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_every_instance_is_eventually_a_candidate() {
    let ring = MockRing::new(&["node-a", "node-b", "node-c"], 4);
    let distributor = Distributor::new(Arc::new(StaticPlacement));

    let placement = distributor.distribute(&key("t-a", "svc-1"), &ring).unwrap();
    let all: HashSet<String> = placement.instances().map(|i| i.id.clone()).collect();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_empty_ring_is_an_error_and_recovers() {
    let ring = MockRing::default();
    let distributor = Distributor::new(Arc::new(StaticPlacement));

    let err = distributor.distribute(&key("t-a", "svc-1"), &ring).unwrap_err();
    assert!(matches!(err, DistributorError::Ring(_)));

    ring.set(vec![InstanceDesc::new("node-a", "node-a:4040", 4)]);
    let placement = distributor.distribute(&key("t-a", "svc-1"), &ring).unwrap();
    assert_eq!(placement.instances().next().unwrap().id, "node-a");
}

#[tokio::test]
async fn test_ring_growth_is_picked_up_on_refresh() {
    let ring = MockRing::new(&["node-a", "node-b", "node-c"], 4);
    let distributor = Distributor::new(Arc::new(StaticPlacement))
        .with_max_age(Duration::from_nanos(0));

    let placement = distributor.distribute(&key("t-a", "svc-1"), &ring).unwrap();
    assert_eq!(placement.instances().count(), 12);

    // A fourth instance joins; the expired snapshot is rebuilt on the
    // next call and the new node becomes a candidate.
    ring.set(
        ["node-a", "node-b", "node-c", "node-d"]
            .iter()
            .map(|n| InstanceDesc::new(*n, format!("{n}:4040"), 4))
            .collect(),
    );
    let placement = distributor.distribute(&key("t-a", "svc-1"), &ring).unwrap();
    let all: HashSet<String> = placement.instances().map(|i| i.id.clone()).collect();
    assert_eq!(all.len(), 4);
    assert!(all.contains("node-d"));
}
