//! Builds the placement-rules document from stats snapshots.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use reef_types::{
    DatasetPlacement, LimitsProvider, LoadBalancing, PlacementRules, RuleDefaults, StatsSnapshot,
    TenantPlacement,
};

use crate::allocator::ShardAllocator;

/// Keeps one [`ShardAllocator`] per (tenant, dataset) across builds and
/// renders full [`PlacementRules`] documents.
///
/// Limits are fetched from the provider on every build, so limit
/// changes apply to the next cycle without a restart. The limits an
/// allocator was created with stay with it until the allocator is
/// evicted.
pub struct Ruler {
    limits: Arc<dyn LimitsProvider>,
    allocators: Mutex<HashMap<(String, String), ShardAllocator>>,
}

impl Ruler {
    pub fn new(limits: Arc<dyn LimitsProvider>) -> Self {
        Self {
            limits,
            allocators: Mutex::new(HashMap::new()),
        }
    }

    /// Seeds the allocator map from a previously persisted rules
    /// document. Rebuilding from unchanged stats afterwards returns the
    /// same limits.
    pub fn load(&self, rules: &PlacementRules, now_ns: i64) {
        let mut allocators = self.lock();
        for dataset in &rules.datasets {
            let Some(tenant) = rules.tenants.get(dataset.tenant as usize) else {
                warn!(tenant = dataset.tenant, dataset = %dataset.name, "rules row references unknown tenant");
                continue;
            };
            let key = (tenant.tenant_id.clone(), dataset.name.clone());
            let limits = self.limits.placement_limits(&tenant.tenant_id);
            let mut allocator = ShardAllocator::restored(limits, dataset.shard_limit);
            allocator.touch(now_ns);
            allocators.insert(key, allocator);
        }
    }

    /// Renders a rules document from the snapshot, advancing each
    /// touched allocator by one observation.
    pub fn build_rules(&self, stats: &StatsSnapshot, now_ns: i64) -> PlacementRules {
        let mut allocators = self.lock();
        let defaults = self.limits.placement_limits("");
        let mut rules = PlacementRules {
            created_at_ms: now_ns / 1_000_000,
            defaults: RuleDefaults {
                tenant_shards: defaults.tenant_shards,
                dataset_shards: defaults.default_dataset_shards,
                load_balancing: defaults.load_balancing,
            },
            tenants: Vec::with_capacity(stats.tenants.len()),
            datasets: Vec::with_capacity(stats.datasets.len()),
        };

        for tenant in &stats.tenants {
            let limits = self.limits.placement_limits(&tenant.tenant_id);
            rules.tenants.push(TenantPlacement {
                tenant_id: tenant.tenant_id.clone(),
                tenant_shards: limits.tenant_shards,
                default_dataset_shards: limits.default_dataset_shards,
                load_balancing: limits.load_balancing,
            });
        }

        for dataset in &stats.datasets {
            let Some(tenant) = stats.tenants.get(dataset.tenant as usize) else {
                warn!(tenant = dataset.tenant, dataset = %dataset.name, "stats row references unknown tenant");
                continue;
            };
            let limits = self.limits.placement_limits(&tenant.tenant_id);
            let key = (tenant.tenant_id.clone(), dataset.name.clone());
            let allocator = allocators
                .entry(key)
                .or_insert_with(|| ShardAllocator::new(limits.clone()));

            let usage: u64 = dataset.usage.iter().sum();
            let shard_limit = allocator.observe(usage, now_ns);

            let load_balancing = match limits.load_balancing {
                LoadBalancing::Dynamic => resolve_dynamic(&dataset.usage, limits.unit_size_bytes),
                mode => mode,
            };
            rules.datasets.push(DatasetPlacement {
                tenant: dataset.tenant,
                name: dataset.name.clone(),
                shard_limit,
                load_balancing,
            });
        }
        rules
    }

    /// Evicts allocators for datasets not seen since `cutoff_ns`.
    pub fn expire(&self, cutoff_ns: i64) {
        self.lock().retain(|_, a| a.last_seen_ns() >= cutoff_ns);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, String), ShardAllocator>> {
        match self.allocators.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Resolves [`LoadBalancing::Dynamic`] from the spread of per-shard
/// usage: an even distribution keeps deterministic fingerprint routing,
/// a skewed one switches the dataset to round-robin to level it out.
fn resolve_dynamic(usage: &[u64], unit_size: u64) -> LoadBalancing {
    if usage.is_empty() {
        return LoadBalancing::Fingerprint;
    }
    let n = usage.len() as f64;
    let mean = usage.iter().sum::<u64>() as f64 / n;
    let variance = usage
        .iter()
        .map(|&u| {
            let d = u as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    if variance.sqrt() <= unit_size as f64 / 2.0 {
        LoadBalancing::Fingerprint
    } else {
        LoadBalancing::RoundRobin
    }
}
