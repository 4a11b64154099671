//! Per-dataset shard-count control loop.

use reef_types::PlacementLimits;

const NANOS_PER_MS: i64 = 1_000_000;

/// Converts a smoothed usage rate into a shard-count target.
///
/// Scale-out is aggressive: consecutive increases inside the burst
/// window compound through a doubling multiplier. Scale-in is
/// conservative: the returned count never drops below the highest
/// target seen within the trailing decay window.
#[derive(Debug, Clone)]
pub struct ShardAllocator {
    limits: PlacementLimits,
    /// Last returned (post-clamp) target.
    target: u64,
    multiplier: u64,
    burst_start_ns: Option<i64>,
    decay_start_ns: Option<i64>,
    prev_min: u64,
    cur_min: u64,
    last_seen_ns: i64,
}

impl ShardAllocator {
    /// An allocator for a dataset first seen now, starting at the
    /// minimum shard count. `limits` are captured for the allocator's
    /// lifetime.
    pub fn new(limits: PlacementLimits) -> Self {
        Self {
            target: limits.min_dataset_shards as u64,
            multiplier: 1,
            burst_start_ns: None,
            decay_start_ns: None,
            prev_min: 0,
            cur_min: 0,
            last_seen_ns: 0,
            limits,
        }
    }

    /// An allocator restored from a persisted shard limit. Seeding both
    /// the target and the current window minimum makes an immediate
    /// rebuild from unchanged stats return the same limit.
    pub fn restored(limits: PlacementLimits, shard_limit: u32) -> Self {
        Self {
            target: shard_limit as u64,
            cur_min: shard_limit as u64,
            ..Self::new(limits)
        }
    }

    /// Feeds one usage observation (bytes per second) and returns the
    /// shard count the dataset should run with.
    pub fn observe(&mut self, usage: u64, now_ns: i64) -> u32 {
        let unit = self.limits.unit_size_bytes.max(1);
        let mut target = usage / unit + 1;

        let delta = target as i64 - self.target as i64;
        if delta > 0 {
            let burst_window = self.limits.burst_window_ms as i64 * NANOS_PER_MS;
            match self.burst_start_ns {
                Some(start) if now_ns - start < burst_window => {
                    self.multiplier *= 2;
                    target = (2 * target).min(target + delta as u64 * self.multiplier);
                }
                _ => self.multiplier = 1,
            }
            self.burst_start_ns = Some(now_ns);
        }

        let decay_window = self.limits.decay_window_ms as i64 * NANOS_PER_MS;
        match self.decay_start_ns {
            None => self.decay_start_ns = Some(now_ns),
            Some(start) if now_ns - start >= decay_window => {
                self.prev_min = self.cur_min;
                self.cur_min = target;
                self.decay_start_ns = Some(now_ns);
            }
            Some(_) => {}
        }
        self.cur_min = self.cur_min.max(target);

        let mut limit = (self.limits.min_dataset_shards as u64)
            .max(self.prev_min)
            .max(self.cur_min);
        if self.limits.max_dataset_shards > 0 {
            limit = limit.min(self.limits.max_dataset_shards as u64);
        }
        self.target = limit;
        self.last_seen_ns = now_ns;
        limit.min(u32::MAX as u64) as u32
    }

    pub(crate) fn touch(&mut self, now_ns: i64) {
        self.last_seen_ns = now_ns;
    }

    pub(crate) fn last_seen_ns(&self) -> i64 {
        self.last_seen_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: i64 = NANOS_PER_MS;

    fn limits() -> PlacementLimits {
        PlacementLimits {
            unit_size_bytes: 10,
            min_dataset_shards: 1,
            max_dataset_shards: 5,
            burst_window_ms: 50,
            decay_window_ms: 50,
            ..PlacementLimits::default()
        }
    }

    #[test]
    fn test_burst_and_decay_sequence() {
        let mut a = ShardAllocator::new(limits());
        let trace = [
            (0u64, 0i64, 1u32),   // idle dataset stays at the minimum
            (10, 3, 2),           // first scale-out, multiplier still 1
            (20, 6, 5),           // inside burst window, boosted and capped
            (5, 51, 5),           // load gone, previous window minimum holds
            (5, 101, 1),          // second decay rotation releases the shards
            (100, 151, 5),        // fresh burst after quiet period
        ];
        for (usage, now_ms, want) in trace {
            assert_eq!(
                a.observe(usage, now_ms * MS),
                want,
                "observe({usage}, {now_ms})"
            );
        }
    }

    #[test]
    fn test_never_below_min_or_above_max() {
        let mut a = ShardAllocator::new(limits());
        assert_eq!(a.observe(0, 0), 1);
        assert_eq!(a.observe(1_000_000, 1), 5);
    }

    #[test]
    fn test_zero_max_means_unlimited() {
        let mut a = ShardAllocator::new(PlacementLimits {
            max_dataset_shards: 0,
            ..limits()
        });
        assert_eq!(a.observe(990, 0), 100);
    }

    #[test]
    fn test_restored_allocator_is_stable() {
        // Usage consistent with the persisted limit does not move it.
        let mut a = ShardAllocator::restored(limits(), 4);
        assert_eq!(a.observe(30, 0), 4);
        assert_eq!(a.observe(30, 10 * MS), 4);
    }
}
