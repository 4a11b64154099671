//! Null placement storage.

use reef_types::{PlacementRules, StatsSnapshot};

use crate::error::StoreError;
use crate::traits::PlacementStore;

/// A store that persists nothing.
///
/// Every load reports not-found, so consumers fall back to synthesized
/// empty documents; writes are accepted and dropped. Used when adaptive
/// placement runs without a shared bucket.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyStore;

#[async_trait::async_trait]
impl PlacementStore for EmptyStore {
    async fn load_rules(&self) -> Result<PlacementRules, StoreError> {
        Err(StoreError::NotFound("placement_rules"))
    }

    async fn load_stats(&self) -> Result<StatsSnapshot, StoreError> {
        Err(StoreError::NotFound("distribution_stats"))
    }

    async fn store_rules(&self, _rules: &PlacementRules) -> Result<(), StoreError> {
        Ok(())
    }

    async fn store_stats(&self, _stats: &StatsSnapshot) -> Result<(), StoreError> {
        Ok(())
    }
}
