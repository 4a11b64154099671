//! Placement policy: the per-key shard-count limits and picking mode.

use rand::Rng;
use reef_types::Key;

/// How the shard offset within a dataset subring is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardPicker {
    /// Deterministic: the key's fingerprint modulo the shard count.
    Fingerprint,
    /// Pseudo-random per call; spreads a skewed dataset over its shards.
    RoundRobin,
    /// A fixed offset. Used to pin placement in tooling and tests.
    Fixed(u32),
}

impl ShardPicker {
    /// Pick an offset for `key` among `n` shards. `n` must be non-zero.
    pub fn pick(&self, key: &Key, n: u32) -> u32 {
        match self {
            ShardPicker::Fingerprint => (key.fingerprint % u64::from(n)) as u32,
            ShardPicker::RoundRobin => rand::thread_rng().gen_range(0..n),
            ShardPicker::Fixed(offset) => *offset,
        }
    }
}

/// Resolved placement policy for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Shards the tenant may occupy. 0 = the full ring.
    pub tenant_shards: u32,
    /// Shards the dataset may occupy within the tenant subring. 0 = all.
    pub dataset_shards: u32,
    pub picker: ShardPicker,
}

/// Source of placement policies for the write path.
///
/// Implemented by the adaptive placement table maintained by the control
/// plane, and by [`StaticPlacement`] when adaptive sharding is disabled.
pub trait PlacementPolicy: Send + Sync {
    fn policy(&self, key: &Key) -> Policy;
}

/// The default policy: no shard limits, fingerprint picking.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticPlacement;

impl PlacementPolicy for StaticPlacement {
    fn policy(&self, _key: &Key) -> Policy {
        Policy {
            tenant_shards: 0,
            dataset_shards: 0,
            picker: ShardPicker::Fingerprint,
        }
    }
}
