//! Shared types for the Reef adaptive sharding core.
//!
//! This crate defines the value types used across the Reef workspace:
//! routing keys ([`Key`], [`LabelPair`]), per-tenant sharding limits
//! ([`PlacementLimits`], [`LimitsProvider`]), the persisted documents
//! exchanged between the placement manager and agents ([`PlacementRules`],
//! [`StatsSnapshot`]), and the raw usage [`Sample`] fed into the
//! distribution statistics.

use serde::{Deserialize, Serialize};

/// The well-known label whose value names the dataset a profile belongs to.
pub const DATASET_LABEL: &str = "service_name";

/// A single label: name/value pair attached to an ingested profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPair {
    pub name: String,
    pub value: String,
}

impl LabelPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Hash arbitrary bytes to a u64: first 8 bytes of blake3, little-endian.
pub fn hash64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[..8].try_into().expect("8 bytes");
    u64::from_le_bytes(bytes)
}

/// Routing key for a single write, derived once from the tenant and the
/// profile's label set. Immutable after construction.
///
/// `tenant_hash` and `dataset_hash` drive the nested subring selection;
/// `fingerprint` covers the full canonicalized label set and is used for
/// fine-grained deterministic shard picking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub tenant_id: String,
    pub dataset_name: String,
    pub tenant_hash: u64,
    pub dataset_hash: u64,
    pub fingerprint: u64,
}

impl Key {
    /// Build a key from a tenant ID and the profile's labels.
    ///
    /// The dataset name is the value of [`DATASET_LABEL`] (empty if the
    /// label is absent). The fingerprint hashes the label set sorted by
    /// name, so label order does not affect placement.
    pub fn for_labels(tenant_id: impl Into<String>, labels: &[LabelPair]) -> Self {
        let tenant_id = tenant_id.into();
        let dataset_name = labels
            .iter()
            .find(|l| l.name == DATASET_LABEL)
            .map(|l| l.value.clone())
            .unwrap_or_default();

        let mut sorted: Vec<&LabelPair> = labels.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.value.cmp(&b.value)));
        let mut buf = Vec::with_capacity(64);
        for l in sorted {
            buf.extend_from_slice(l.name.as_bytes());
            buf.push(b'=');
            buf.extend_from_slice(l.value.as_bytes());
            buf.push(0);
        }

        let tenant_hash = hash64(tenant_id.as_bytes());
        let dataset_hash = hash64(dataset_name.as_bytes());
        let fingerprint = hash64(&buf);
        Self {
            tenant_id,
            dataset_name,
            tenant_hash,
            dataset_hash,
            fingerprint,
        }
    }

    /// Build a key directly from precomputed hashes.
    ///
    /// Used by callers that carry their own label hashing, and by tests
    /// that need full control over ring positions.
    pub fn from_hashes(tenant_hash: u64, dataset_hash: u64, fingerprint: u64) -> Self {
        Self {
            tenant_id: String::new(),
            dataset_name: String::new(),
            tenant_hash,
            dataset_hash,
            fingerprint,
        }
    }
}

/// How keys within a dataset are spread over its shards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancing {
    /// Deterministic: the key's fingerprint modulo the shard count.
    Fingerprint,
    /// Pseudo-random shard per call.
    RoundRobin,
    /// Resolved per dataset by the ruler from the observed usage spread.
    #[default]
    Dynamic,
}

/// Per-tenant (or per-dataset, via overrides) sharding limits.
///
/// Hot-reloadable: the ruler fetches limits through [`LimitsProvider`] on
/// every build, so changes apply without a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementLimits {
    /// Upper bound on shards a tenant's data spreads over. 0 = unlimited.
    pub tenant_shards: u32,
    /// Shards assigned to a dataset with no placement rule yet.
    pub default_dataset_shards: u32,
    /// Lower bound for the allocator's target.
    pub min_dataset_shards: u32,
    /// Upper bound for the allocator's target. 0 = unlimited.
    pub max_dataset_shards: u32,
    /// Usage volume one shard is expected to absorb, bytes per second.
    pub unit_size_bytes: u64,
    /// Window within which consecutive scale-outs compound.
    pub burst_window_ms: u64,
    /// Window the shard count is retained after load subsides.
    pub decay_window_ms: u64,
    pub load_balancing: LoadBalancing,
}

impl Default for PlacementLimits {
    fn default() -> Self {
        Self {
            tenant_shards: 0,
            default_dataset_shards: 2,
            min_dataset_shards: 1,
            max_dataset_shards: 64,
            unit_size_bytes: 128 << 20,
            burst_window_ms: 17 * 60 * 1000,
            decay_window_ms: 19 * 60 * 1000,
            load_balancing: LoadBalancing::Dynamic,
        }
    }
}

/// Source of per-tenant placement limits.
pub trait LimitsProvider: Send + Sync {
    fn placement_limits(&self, tenant_id: &str) -> PlacementLimits;
}

/// A fixed set of limits applied to every tenant. Used when no per-tenant
/// override machinery is wired in, and throughout the tests.
impl LimitsProvider for PlacementLimits {
    fn placement_limits(&self, _tenant_id: &str) -> PlacementLimits {
        self.clone()
    }
}

/// One observed write: how many bytes landed on a shard for a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub tenant_id: String,
    pub dataset_name: String,
    pub shard_id: u32,
    /// Instance that owned the shard when the sample was taken.
    pub shard_owner: String,
    pub size: u64,
}

// ---------------------------------------------------------------------------
// Persisted documents
// ---------------------------------------------------------------------------

/// Defaults applied when a tenant has no entry in the rules document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefaults {
    pub tenant_shards: u32,
    pub dataset_shards: u32,
    pub load_balancing: LoadBalancing,
}

/// Tenant-level entry in the rules document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantPlacement {
    pub tenant_id: String,
    pub tenant_shards: u32,
    pub default_dataset_shards: u32,
    pub load_balancing: LoadBalancing,
}

/// Dataset-level entry in the rules document.
///
/// `tenant` indexes into [`PlacementRules::tenants`]. `load_balancing` is
/// always resolved here: never [`LoadBalancing::Dynamic`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetPlacement {
    pub tenant: u32,
    pub name: String,
    pub shard_limit: u32,
    pub load_balancing: LoadBalancing,
}

/// The full placement-rules document, rebuilt wholesale every manager
/// cycle and swapped in atomically by consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRules {
    /// Unix milliseconds at build time. Consumers discard documents older
    /// than the one they hold.
    pub created_at_ms: i64,
    pub defaults: RuleDefaults,
    pub tenants: Vec<TenantPlacement>,
    pub datasets: Vec<DatasetPlacement>,
}

impl PlacementRules {
    /// An empty ruleset stamped with the given time. Synthesized on first
    /// run when the store has nothing yet.
    pub fn empty(created_at_ms: i64) -> Self {
        Self {
            created_at_ms,
            ..Default::default()
        }
    }
}

/// Tenant row of a stats snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantStats {
    pub tenant_id: String,
}

/// Dataset row of a stats snapshot.
///
/// `tenant` indexes into [`StatsSnapshot::tenants`]; `shards` indexes into
/// [`StatsSnapshot::shards`]; `usage` is parallel to `shards` and holds the
/// smoothed bytes-per-second rate per shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub tenant: u32,
    pub name: String,
    pub shards: Vec<u32>,
    pub usage: Vec<u64>,
}

/// Shard row of a stats snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardStats {
    pub id: u32,
    pub owner: String,
}

/// Compact aggregate of the distribution statistics, persisted alongside
/// the rules so a failed-over manager starts from a warm window.
///
/// Indices are assigned per build, in first-encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub created_at_ms: i64,
    pub tenants: Vec<TenantStats>,
    pub datasets: Vec<DatasetStats>,
    pub shards: Vec<ShardStats>,
}

impl StatsSnapshot {
    pub fn empty(created_at_ms: i64) -> Self {
        Self {
            created_at_ms,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty() && self.datasets.is_empty() && self.shards.is_empty()
    }
}
