//! Shared harness for Reef integration tests.
//!
//! Provides a mock membership ring, a store wrapper with failure
//! injection, and sample helpers so tests can drive the full pipeline:
//! samples → stats → manager → store → agent → placement → distributor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reef_placement::{InstanceDesc, RingError, RingReader};
use reef_store::{MemoryStore, PlacementStore, StoreError};
use reef_types::{PlacementRules, Sample, StatsSnapshot};

/// In-memory membership ring with mutable instance set.
#[derive(Default)]
pub struct MockRing {
    instances: Mutex<Vec<InstanceDesc>>,
}

impl MockRing {
    /// A ring with one instance per name, each holding `tokens` tokens.
    /// Instance `x` gets the address `x:4040`.
    pub fn new(names: &[&str], tokens: usize) -> Self {
        let ring = Self::default();
        ring.set(
            names
                .iter()
                .map(|n| InstanceDesc::new(*n, format!("{n}:4040"), tokens))
                .collect(),
        );
        ring
    }

    pub fn set(&self, instances: Vec<InstanceDesc>) {
        match self.instances.lock() {
            Ok(mut guard) => *guard = instances,
            Err(poisoned) => *poisoned.into_inner() = instances,
        }
    }
}

impl RingReader for MockRing {
    fn healthy_instances(&self) -> Result<Vec<InstanceDesc>, RingError> {
        let instances = match self.instances.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if instances.is_empty() {
            return Err(RingError::EmptyRing);
        }
        Ok(instances)
    }
}

/// Memory-backed store with an unreachability switch.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    down: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::Release);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::Acquire) {
            return Err(std::io::Error::other("bucket unreachable").into());
        }
        Ok(())
    }
}

#[async_trait]
impl PlacementStore for FlakyStore {
    async fn load_rules(&self) -> Result<PlacementRules, StoreError> {
        self.check()?;
        self.inner.load_rules().await
    }

    async fn load_stats(&self) -> Result<StatsSnapshot, StoreError> {
        self.check()?;
        self.inner.load_stats().await
    }

    async fn store_rules(&self, rules: &PlacementRules) -> Result<(), StoreError> {
        self.check()?;
        self.inner.store_rules(rules).await
    }

    async fn store_stats(&self, stats: &StatsSnapshot) -> Result<(), StoreError> {
        self.check()?;
        self.inner.store_stats(stats).await
    }
}

/// Install a compact test subscriber once per binary. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn sample(tenant: &str, dataset: &str, shard: u32, owner: &str, size: u64) -> Sample {
    Sample {
        tenant_id: tenant.to_owned(),
        dataset_name: dataset.to_owned(),
        shard_id: shard,
        shard_owner: owner.to_owned(),
        size,
    }
}

/// Unix time in nanoseconds, for feeding collectors directly.
pub fn unix_nanos() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}

/// A `MockRing` paired with nothing else; shorthand for the common
/// three-node ring used across the integration tests.
pub fn three_node_ring() -> Arc<MockRing> {
    Arc::new(MockRing::new(&["node-a", "node-b", "node-c"], 4))
}
