//! Core trait for placement persistence.

use reef_types::{PlacementRules, StatsSnapshot};

use crate::error::StoreError;

/// Persistence for the two placement documents.
///
/// The manager stores both every cycle; agents load the rules
/// periodically; a restarted manager loads both once to warm-start.
/// Implementations must be `Send + Sync` for use across async tasks,
/// and cancel-safe: an interrupted call leaves the store with either
/// the old document or the new one, never a torn write.
#[async_trait::async_trait]
pub trait PlacementStore: Send + Sync {
    /// Load the current rules document.
    async fn load_rules(&self) -> Result<PlacementRules, StoreError>;

    /// Load the last persisted stats snapshot.
    async fn load_stats(&self) -> Result<StatsSnapshot, StoreError>;

    /// Replace the rules document.
    async fn store_rules(&self, rules: &PlacementRules) -> Result<(), StoreError>;

    /// Replace the stats snapshot.
    async fn store_stats(&self, stats: &StatsSnapshot) -> Result<(), StoreError>;
}
