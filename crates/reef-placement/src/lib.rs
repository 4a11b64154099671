//! Deterministic shard placement for the Reef write path.
//!
//! Given a routing key and a snapshot of healthy instances, the
//! [`Distributor`] picks a storage shard and an ordered sequence of
//! candidate instances. Placement is fully deterministic while the
//! distribution is unchanged, and membership changes move only the
//! minimal fraction of keys:
//!
//! - [`jump`] — classic jump consistent hash.
//! - [`Subring`] — nested, size-bounded windows over the flat shard
//!   array (all shards → tenant → dataset).
//! - [`shuffle`] — a fixed-seed permutation decorrelating shard
//!   positions from instance order.
//! - [`Policy`] — the per-key shard-count limits and picking mode,
//!   served by a [`PlacementPolicy`] implementation (static fallback or
//!   the adaptive table maintained by the control plane).

mod distribution;
mod distributor;
mod error;
mod jump;
mod policy;
mod ring;
mod shuffle;

pub use distribution::{Distribution, Locations, Shard, Subring};
pub use distributor::{Distributor, Placement, DEFAULT_MAX_AGE};
pub use error::DistributorError;
pub use jump::jump;
pub use policy::{PlacementPolicy, Policy, ShardPicker, StaticPlacement};
pub use ring::{InstanceDesc, InstanceState, RingError, RingReader};
pub use shuffle::permutation;
