//! Directory-backed placement storage.

use std::path::{Path, PathBuf};

use reef_types::{PlacementRules, StatsSnapshot};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::PlacementStore;

const RULES_PATH: &str = "adaptive_placement/placement_rules";
const STATS_PATH: &str = "adaptive_placement/distribution_stats";

/// Stores both placement documents as postcard-encoded files under a
/// base directory, sharable with other consumers of the bucket.
///
/// Writes are atomic: data is written to a temporary file first, then
/// renamed into place, so readers never observe a torn document.
pub struct BucketStore {
    base_dir: PathBuf,
}

impl BucketStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    async fn load<T: DeserializeOwned>(&self, rel: &'static str) -> Result<T, StoreError> {
        let path = self.base_dir.join(rel);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(rel));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        Ok(postcard::from_bytes(&data)?)
    }

    async fn store<T: Serialize>(&self, rel: &'static str, doc: &T) -> Result<(), StoreError> {
        let path = self.base_dir.join(rel);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = postcard::to_allocvec(doc)?;

        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        debug!(path = %path.display(), size = data.len(), "stored placement document");
        Ok(())
    }
}

#[async_trait::async_trait]
impl PlacementStore for BucketStore {
    async fn load_rules(&self) -> Result<PlacementRules, StoreError> {
        self.load(RULES_PATH).await
    }

    async fn load_stats(&self) -> Result<StatsSnapshot, StoreError> {
        self.load(STATS_PATH).await
    }

    async fn store_rules(&self, rules: &PlacementRules) -> Result<(), StoreError> {
        self.store(RULES_PATH, rules).await
    }

    async fn store_stats(&self, stats: &StatsSnapshot) -> Result<(), StoreError> {
        self.store(STATS_PATH, stats).await
    }
}
