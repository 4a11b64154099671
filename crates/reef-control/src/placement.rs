//! The tenant → dataset → policy table served on the write path.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use reef_placement::{PlacementPolicy, Policy, ShardPicker};
use reef_types::{Key, LoadBalancing, PlacementRules};

#[derive(Debug, Clone, Copy)]
struct DatasetEntry {
    shard_limit: u32,
    load_balancing: LoadBalancing,
}

struct TenantEntry {
    tenant_shards: u32,
    default_dataset_shards: u32,
    load_balancing: LoadBalancing,
    datasets: HashMap<String, DatasetEntry>,
}

struct Table {
    created_at_ms: i64,
    tenant_shards: u32,
    dataset_shards: u32,
    load_balancing: LoadBalancing,
    tenants: HashMap<String, TenantEntry>,
}

/// Policy lookup backed by the last loaded rules document.
///
/// The whole table is replaced atomically on update; a reader holds the
/// table only for the duration of one lookup, so a concurrent update
/// never tears a policy.
pub struct AdaptivePlacement {
    table: RwLock<Arc<Table>>,
}

impl Default for AdaptivePlacement {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptivePlacement {
    /// An empty table: every key resolves to the built-in defaults
    /// until the first rules document is applied.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Arc::new(Table {
                created_at_ms: i64::MIN,
                tenant_shards: 0,
                dataset_shards: 0,
                load_balancing: LoadBalancing::Dynamic,
                tenants: HashMap::new(),
            })),
        }
    }

    /// Creation timestamp of the rules currently served. `i64::MIN`
    /// before the first update.
    pub fn created_at_ms(&self) -> i64 {
        self.read().created_at_ms
    }

    /// Replaces the served table with one built from `rules`.
    pub fn update(&self, rules: &PlacementRules) {
        let mut tenants = HashMap::with_capacity(rules.tenants.len());
        for tenant in &rules.tenants {
            tenants.insert(
                tenant.tenant_id.clone(),
                TenantEntry {
                    tenant_shards: tenant.tenant_shards,
                    default_dataset_shards: tenant.default_dataset_shards,
                    load_balancing: tenant.load_balancing,
                    datasets: HashMap::new(),
                },
            );
        }
        for dataset in &rules.datasets {
            let Some(tenant) = rules.tenants.get(dataset.tenant as usize) else {
                continue;
            };
            if let Some(entry) = tenants.get_mut(&tenant.tenant_id) {
                entry.datasets.insert(
                    dataset.name.clone(),
                    DatasetEntry {
                        shard_limit: dataset.shard_limit,
                        load_balancing: dataset.load_balancing,
                    },
                );
            }
        }
        let table = Arc::new(Table {
            created_at_ms: rules.created_at_ms,
            tenant_shards: rules.defaults.tenant_shards,
            dataset_shards: rules.defaults.dataset_shards,
            load_balancing: rules.defaults.load_balancing,
            tenants,
        });
        match self.table.write() {
            Ok(mut guard) => *guard = table,
            Err(poisoned) => *poisoned.into_inner() = table,
        }
    }

    fn read(&self) -> Arc<Table> {
        match self.table.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl PlacementPolicy for AdaptivePlacement {
    fn policy(&self, key: &Key) -> Policy {
        let table = self.read();
        let (tenant_shards, dataset_shards, mode) = match table.tenants.get(&key.tenant_id) {
            Some(tenant) => match tenant.datasets.get(&key.dataset_name) {
                Some(dataset) => (
                    tenant.tenant_shards,
                    dataset.shard_limit,
                    dataset.load_balancing,
                ),
                None => (
                    tenant.tenant_shards,
                    tenant.default_dataset_shards,
                    tenant.load_balancing,
                ),
            },
            None => (
                table.tenant_shards,
                table.dataset_shards,
                table.load_balancing,
            ),
        };
        let picker = match mode {
            LoadBalancing::RoundRobin => ShardPicker::RoundRobin,
            // Dynamic only survives on fallback paths; resolved datasets
            // always carry a concrete mode.
            LoadBalancing::Fingerprint | LoadBalancing::Dynamic => ShardPicker::Fingerprint,
        };
        Policy {
            tenant_shards,
            dataset_shards,
            picker,
        }
    }
}
