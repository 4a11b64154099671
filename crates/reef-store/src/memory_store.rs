//! In-memory placement storage.

use std::sync::Mutex;

use reef_types::{PlacementRules, StatsSnapshot};

use crate::error::StoreError;
use crate::traits::PlacementStore;

#[derive(Default)]
struct Slots {
    rules: Option<Vec<u8>>,
    stats: Option<Vec<u8>>,
}

/// Keeps both documents in memory. Used in tests and single-process
/// setups where persistence across restarts does not matter.
///
/// Documents are held postcard-encoded so the store round-trips exactly
/// like a real backend.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<Slots>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait::async_trait]
impl PlacementStore for MemoryStore {
    async fn load_rules(&self) -> Result<PlacementRules, StoreError> {
        match &self.lock().rules {
            Some(data) => Ok(postcard::from_bytes(data)?),
            None => Err(StoreError::NotFound("placement_rules")),
        }
    }

    async fn load_stats(&self) -> Result<StatsSnapshot, StoreError> {
        match &self.lock().stats {
            Some(data) => Ok(postcard::from_bytes(data)?),
            None => Err(StoreError::NotFound("distribution_stats")),
        }
    }

    async fn store_rules(&self, rules: &PlacementRules) -> Result<(), StoreError> {
        let data = postcard::to_allocvec(rules)?;
        self.lock().rules = Some(data);
        Ok(())
    }

    async fn store_stats(&self, stats: &StatsSnapshot) -> Result<(), StoreError> {
        let data = postcard::to_allocvec(stats)?;
        self.lock().stats = Some(data);
        Ok(())
    }
}
