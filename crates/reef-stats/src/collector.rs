//! Aggregation of ingest samples into per-shard usage rates.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::warn;

use reef_types::{DatasetStats, Sample, ShardStats, StatsSnapshot, TenantStats};

use crate::dict::Dictionary;
use crate::ewma::Rate;

#[derive(Clone, PartialEq, Eq, Hash)]
struct CounterKey {
    tenant: Arc<str>,
    dataset: Arc<str>,
    owner: Arc<str>,
    shard: u32,
}

struct Counter {
    rate: Rate,
    updated_ns: i64,
}

struct Inner {
    dict: Dictionary,
    counters: HashMap<CounterKey, Counter>,
}

/// Aggregates ingest samples into a smoothed bytes-per-second rate per
/// (tenant, dataset, shard, owner) and renders them as compact
/// snapshots for the ruler.
///
/// All strings are interned through a ref-counted [`Dictionary`]: when
/// the last counter naming a tenant is swept, its name is dropped too.
pub struct StatsCollector {
    window: Duration,
    retention: Duration,
    inner: Mutex<Inner>,
}

impl StatsCollector {
    /// `window` is the EWMA half-life; counters untouched for longer
    /// than `retention` are swept on [`build`](Self::build).
    pub fn new(window: Duration, retention: Duration) -> Self {
        Self {
            window,
            retention,
            inner: Mutex::new(Inner {
                dict: Dictionary::new(),
                counters: HashMap::new(),
            }),
        }
    }

    /// Folds a batch of samples into the counters.
    pub fn record_stats(&self, samples: &[Sample], now_ns: i64) {
        let inner = &mut *self.lock();
        for sample in samples {
            let key = CounterKey {
                tenant: inner.dict.acquire(&sample.tenant_id),
                dataset: inner.dict.acquire(&sample.dataset_name),
                owner: inner.dict.acquire(&sample.shard_owner),
                shard: sample.shard_id,
            };
            match inner.counters.entry(key) {
                Entry::Occupied(mut e) => {
                    // The existing key already holds references.
                    inner.dict.release(&sample.tenant_id);
                    inner.dict.release(&sample.dataset_name);
                    inner.dict.release(&sample.shard_owner);
                    let c = e.get_mut();
                    c.rate.add(sample.size as f64, now_ns);
                    c.updated_ns = now_ns;
                }
                Entry::Vacant(e) => {
                    let mut rate = Rate::with_half_life(self.window);
                    rate.add(sample.size as f64, now_ns);
                    e.insert(Counter {
                        rate,
                        updated_ns: now_ns,
                    });
                }
            }
        }
    }

    /// Drops counters not updated since `cutoff_ns`.
    pub fn expire(&self, cutoff_ns: i64) {
        sweep(&mut self.lock(), cutoff_ns);
    }

    /// Sweeps counters past retention and renders the remainder as a
    /// snapshot. Row indices are assigned in sorted key order, so two
    /// builds over the same counters produce identical documents.
    pub fn build(&self, now_ns: i64) -> StatsSnapshot {
        let inner = &mut *self.lock();
        sweep(inner, now_ns - self.retention.as_nanos() as i64);

        let mut keys: Vec<&CounterKey> = inner.counters.keys().collect();
        keys.sort_by(|x, y| {
            (&*x.tenant, &*x.dataset, x.shard, &*x.owner)
                .cmp(&(&*y.tenant, &*y.dataset, y.shard, &*y.owner))
        });

        let mut snapshot = StatsSnapshot::empty(now_ns / 1_000_000);
        let mut tenants: HashMap<&str, u32> = HashMap::new();
        let mut shards: HashMap<(u32, &str), u32> = HashMap::new();
        let mut datasets: HashMap<(u32, &str), usize> = HashMap::new();
        for key in keys {
            let tenant = *tenants.entry(&*key.tenant).or_insert_with(|| {
                snapshot.tenants.push(TenantStats {
                    tenant_id: key.tenant.to_string(),
                });
                snapshot.tenants.len() as u32 - 1
            });
            let shard = *shards.entry((key.shard, &*key.owner)).or_insert_with(|| {
                snapshot.shards.push(ShardStats {
                    id: key.shard,
                    owner: key.owner.to_string(),
                });
                snapshot.shards.len() as u32 - 1
            });
            let row = *datasets.entry((tenant, &*key.dataset)).or_insert_with(|| {
                snapshot.datasets.push(DatasetStats {
                    tenant,
                    name: key.dataset.to_string(),
                    shards: Vec::new(),
                    usage: Vec::new(),
                });
                snapshot.datasets.len() - 1
            });
            let usage = inner.counters[key].rate.value();
            snapshot.datasets[row].shards.push(shard);
            snapshot.datasets[row].usage.push(usage as u64);
        }
        snapshot
    }

    /// Seeds the counters from a persisted snapshot, so a restarted
    /// manager resumes with a warm window instead of ramping from zero.
    pub fn load(&self, snapshot: &StatsSnapshot, now_ns: i64) {
        let inner = &mut *self.lock();
        for row in &snapshot.datasets {
            let Some(tenant) = snapshot.tenants.get(row.tenant as usize) else {
                warn!(tenant = row.tenant, dataset = %row.name, "stats row references unknown tenant");
                continue;
            };
            for (i, &shard_ref) in row.shards.iter().enumerate() {
                let Some(shard) = snapshot.shards.get(shard_ref as usize) else {
                    warn!(shard = shard_ref, dataset = %row.name, "stats row references unknown shard");
                    continue;
                };
                let usage = row.usage.get(i).copied().unwrap_or_default();
                let key = CounterKey {
                    tenant: inner.dict.acquire(&tenant.tenant_id),
                    dataset: inner.dict.acquire(&row.name),
                    owner: inner.dict.acquire(&shard.owner),
                    shard: shard.id,
                };
                match inner.counters.entry(key) {
                    Entry::Occupied(_) => {
                        inner.dict.release(&tenant.tenant_id);
                        inner.dict.release(&row.name);
                        inner.dict.release(&shard.owner);
                    }
                    Entry::Vacant(e) => {
                        e.insert(Counter {
                            rate: Rate::with_half_life(self.window).seeded(usage as f64, now_ns),
                            updated_ns: now_ns,
                        });
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn sweep(inner: &mut Inner, cutoff_ns: i64) {
    let stale: Vec<CounterKey> = inner
        .counters
        .iter()
        .filter(|(_, c)| c.updated_ns < cutoff_ns)
        .map(|(k, _)| k.clone())
        .collect();
    for key in stale {
        inner.counters.remove(&key);
        inner.dict.release(&key.tenant);
        inner.dict.release(&key.dataset);
        inner.dict.release(&key.owner);
    }
}
