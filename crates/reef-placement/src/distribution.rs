//! The shard distribution: a snapshot of the ring flattened into an
//! ordered shard array, plus the nested-window arithmetic used to walk it.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::DistributorError;
use crate::jump::jump;
use crate::ring::InstanceDesc;
use crate::shuffle::permutation;

/// One entry of the flat shard array.
///
/// `id` 0 is the invalid sentinel; valid ids are `position + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
    pub id: u32,
    /// Index into the distribution's instance array.
    pub instance: u32,
}

/// A nested window over a flat shard array of size `n`.
///
/// `[a, b)` is the parent window, `[c, d)` the own window. Offsets may
/// exceed `n`; [`Subring::at`] confines wraparound to the parent window
/// regardless of nesting depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Subring {
    pub(crate) n: usize,
    pub(crate) a: usize,
    pub(crate) b: usize,
    pub(crate) c: usize,
    pub(crate) d: usize,
}

impl Subring {
    /// The whole ring of `n` shards as a single window.
    pub fn full(n: usize) -> Self {
        Self {
            n,
            a: 0,
            b: n,
            c: 0,
            d: n,
        }
    }

    /// Derive a nested window of `size` shards, positioned inside this
    /// window by jump-hashing `key` over the window width.
    pub fn subring(self, key: u64, size: usize) -> Self {
        let a = self.c;
        let b = self.d;
        let c = a + jump(key, (b - a) as u32) as usize;
        Self {
            n: self.n,
            a,
            b,
            c,
            d: c + size,
        }
    }

    /// Absolute shard position for relative offset `i` in the own window.
    pub fn at(&self, i: usize) -> usize {
        ((self.c + i - self.a) % (self.b - self.a) + self.a) % self.n
    }

    fn size(&self) -> usize {
        self.d - self.c
    }
}

/// An immutable snapshot of the ring: the shuffled shard array and the
/// instance descriptors it points into. Replaced wholesale on refresh.
#[derive(Debug)]
pub struct Distribution {
    created: Instant,
    shards: Vec<Shard>,
    instances: Vec<InstanceDesc>,
}

impl Distribution {
    /// Build a distribution from a ring snapshot.
    ///
    /// Instances are ordered by id; each token contributes one shard.
    /// Shard-to-instance assignment is shuffled by the fixed-seed
    /// permutation so adjacent shards do not collapse onto one instance.
    pub fn from_ring(mut instances: Vec<InstanceDesc>) -> Result<Self, DistributorError> {
        instances.sort_by(|x, y| x.id.cmp(&y.id));
        let mut owners: Vec<u32> = Vec::new();
        for (i, instance) in instances.iter().enumerate() {
            for _ in &instance.tokens {
                owners.push(i as u32);
            }
        }
        if owners.is_empty() {
            return Err(DistributorError::EmptyRing);
        }
        let perm = permutation(owners.len());
        let shards = perm
            .iter()
            .enumerate()
            .map(|(i, &p)| Shard {
                id: i as u32 + 1,
                instance: owners[p as usize],
            })
            .collect::<Vec<_>>();
        debug!(
            shards = shards.len(),
            instances = instances.len(),
            "rebuilt shard distribution"
        );
        Ok(Self {
            created: Instant::now(),
            shards,
            instances,
        })
    }

    /// Test constructor with an explicit shard-to-instance mapping.
    #[cfg(test)]
    pub(crate) fn from_parts(owners: &[u32], instances: Vec<InstanceDesc>) -> Self {
        let shards = owners
            .iter()
            .enumerate()
            .map(|(i, &o)| Shard {
                id: i as u32 + 1,
                instance: o,
            })
            .collect();
        Self {
            created: Instant::now(),
            shards,
            instances,
        }
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    pub fn shard(&self, position: usize) -> Shard {
        self.shards[position]
    }

    pub fn is_expired(&self, max_age: Duration) -> bool {
        self.created.elapsed() > max_age
    }

    /// Candidate instances for a key placed at `offset` within the
    /// dataset window of `ring`, in fallback order.
    ///
    /// Walks three levels: the dataset window (cyclic from the offset),
    /// the unvisited remainder of the tenant window (cyclic from the
    /// dataset window's end), then the unvisited remainder of the whole
    /// ring (from the tenant window's end). Every shard position is
    /// yielded exactly once.
    pub fn locations(&self, ring: Subring, offset: u32) -> Locations<'_> {
        let size = ring.size();
        let start = if size > 0 { offset as usize % size } else { 0 };
        Locations {
            dist: self,
            ring,
            visited: vec![false; ring.n],
            phase: Phase::Dataset,
            start,
            i: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Dataset,
    Tenant,
    Ring,
    Done,
}

/// Lazy iterator over candidate instances. See [`Distribution::locations`].
pub struct Locations<'a> {
    dist: &'a Distribution,
    ring: Subring,
    visited: Vec<bool>,
    phase: Phase,
    start: usize,
    i: usize,
}

impl<'a> Locations<'a> {
    fn yield_at(&mut self, pos: usize) -> Option<&'a InstanceDesc> {
        self.visited[pos] = true;
        let shard = self.dist.shards[pos];
        Some(&self.dist.instances[shard.instance as usize])
    }
}

impl<'a> Iterator for Locations<'a> {
    type Item = &'a InstanceDesc;

    fn next(&mut self) -> Option<Self::Item> {
        let r = self.ring;
        loop {
            match self.phase {
                Phase::Dataset => {
                    let size = r.size();
                    if self.i >= size {
                        self.phase = Phase::Tenant;
                        self.i = 0;
                        continue;
                    }
                    let pos = r.at((self.start + self.i) % size);
                    self.i += 1;
                    return self.yield_at(pos);
                }
                Phase::Tenant => {
                    let width = r.b - r.a;
                    if self.i >= width {
                        self.phase = Phase::Ring;
                        self.i = 0;
                        continue;
                    }
                    // Continue within the parent window from the end of
                    // the dataset window.
                    let pos = ((r.d - r.a + self.i) % width + r.a) % r.n;
                    self.i += 1;
                    if self.visited[pos] {
                        continue;
                    }
                    return self.yield_at(pos);
                }
                Phase::Ring => {
                    if self.i >= r.n {
                        self.phase = Phase::Done;
                        continue;
                    }
                    let pos = (r.b + self.i) % r.n;
                    self.i += 1;
                    if self.visited[pos] {
                        continue;
                    }
                    return self.yield_at(pos);
                }
                Phase::Done => return None,
            }
        }
    }
}
