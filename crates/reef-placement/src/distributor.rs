//! The distributor: answers "where does this key go".

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reef_types::Key;
use tracing::debug;

use crate::distribution::{Distribution, Locations, Subring};
use crate::error::DistributorError;
use crate::policy::PlacementPolicy;
use crate::ring::RingReader;

/// How long a distribution snapshot is served before it is rebuilt from
/// the ring.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5);

/// Placement decision for one key: the shard and the ordered candidate
/// instances. The first instance is the primary; the rest are fallbacks.
#[derive(Debug)]
pub struct Placement {
    pub shard: u32,
    dist: Arc<Distribution>,
    ring: Subring,
    offset: u32,
}

impl Placement {
    /// Candidate instances in fallback order. Lazy; callers typically
    /// take `locations_per_key` (5 by default in the write path).
    pub fn instances(&self) -> Locations<'_> {
        self.dist.locations(self.ring, self.offset)
    }
}

/// Deterministic key-to-shard distributor.
///
/// Holds the current [`Distribution`] snapshot behind a reader/writer
/// lock and lazily refreshes it from the ring when it exceeds `max_age`.
/// The refresh is double-checked: staleness is tested under the read
/// lock, re-tested under the write lock, and concurrent callers reuse
/// the single rebuilt snapshot.
pub struct Distributor {
    placement: Arc<dyn PlacementPolicy>,
    distribution: RwLock<Option<Arc<Distribution>>>,
    max_age: Duration,
}

impl Distributor {
    pub fn new(placement: Arc<dyn PlacementPolicy>) -> Self {
        Self {
            placement,
            distribution: RwLock::new(None),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Pick the shard and candidate instances for `key`.
    ///
    /// Fails with [`DistributorError::EmptyRing`] when no healthy
    /// instances exist; in that case no distribution is installed and
    /// the next call retries. Identical keys produce identical
    /// placements while the distribution is unchanged.
    pub fn distribute(
        &self,
        key: &Key,
        ring: &dyn RingReader,
    ) -> Result<Placement, DistributorError> {
        let dist = self.current(ring)?;
        Ok(self.distribute_in(key, dist))
    }

    /// Force a rebuild of the distribution from the ring.
    ///
    /// On error the previous snapshot is left in place.
    pub fn refresh(&self, ring: &dyn RingReader) -> Result<(), DistributorError> {
        let rebuilt = Arc::new(Distribution::from_ring(ring.healthy_instances()?)?);
        *self.write_guard() = Some(rebuilt);
        Ok(())
    }

    fn current(&self, ring: &dyn RingReader) -> Result<Arc<Distribution>, DistributorError> {
        {
            let guard = match self.distribution.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(dist) = guard.as_ref() {
                if !dist.is_expired(self.max_age) {
                    return Ok(Arc::clone(dist));
                }
            }
        }
        let mut guard = self.write_guard();
        // Another caller may have refreshed while we waited.
        if let Some(dist) = guard.as_ref() {
            if !dist.is_expired(self.max_age) {
                return Ok(Arc::clone(dist));
            }
        }
        let rebuilt = Arc::new(Distribution::from_ring(ring.healthy_instances()?)?);
        debug!(shards = rebuilt.len(), "distribution refreshed");
        *guard = Some(Arc::clone(&rebuilt));
        Ok(rebuilt)
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<Distribution>>> {
        match self.distribution.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn distribute_in(&self, key: &Key, dist: Arc<Distribution>) -> Placement {
        let policy = self.placement.policy(key);
        let width = dist.len() as u32;
        let tenant_size = available(policy.tenant_shards, width);
        let dataset_size = available(policy.dataset_shards, tenant_size);

        let all = Subring::full(width as usize);
        let tenant = all.subring(key.tenant_hash, tenant_size as usize);
        let dataset = tenant.subring(key.dataset_hash, dataset_size as usize);

        let offset = policy.picker.pick(key, dataset_size);
        let position = dataset.at(offset as usize % dataset_size as usize);
        Placement {
            shard: dist.shard(position).id,
            dist,
            ring: dataset,
            offset,
        }
    }
}

/// Clamp a requested shard count to the available width.
/// 0 means "unlimited" and uses the full width.
fn available(requested: u32, width: u32) -> u32 {
    if requested == 0 || requested > width {
        width
    } else {
        requested
    }
}
