//! Periodic rules reader serving the write path.

use std::sync::Arc;

use reef_store::PlacementStore;
use reef_types::PlacementRules;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::clock::unix_millis;
use crate::config::AdaptiveConfig;
use crate::error::ControlError;
use crate::placement::AdaptivePlacement;

/// Loads the rules document on an interval and applies it to the shared
/// [`AdaptivePlacement`] table.
///
/// Load failures after startup are logged and the previously loaded
/// table keeps being served; a document older than the one held is
/// discarded, so a lagging replica of the store cannot roll placement
/// back.
pub struct Agent {
    config: AdaptiveConfig,
    store: Arc<dyn PlacementStore>,
    placement: Arc<AdaptivePlacement>,
}

impl Agent {
    pub fn new(
        config: AdaptiveConfig,
        store: Arc<dyn PlacementStore>,
        placement: Arc<AdaptivePlacement>,
    ) -> Self {
        Self {
            config,
            store,
            placement,
        }
    }

    /// One reload. A missing document counts as an empty ruleset
    /// stamped with the current time.
    pub async fn sync(&self) -> Result<(), ControlError> {
        let rules = match timeout(self.config.store_timeout(), self.store.load_rules()).await {
            Err(_) => return Err(ControlError::Timeout("load_rules")),
            Ok(Err(e)) if e.is_not_found() => PlacementRules::empty(unix_millis()),
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(rules)) => rules,
        };
        let held = self.placement.created_at_ms();
        if rules.created_at_ms < held {
            warn!(
                loaded = rules.created_at_ms,
                held, "discarding placement rules older than the ones held"
            );
            return Ok(());
        }
        debug!(
            created_at = rules.created_at_ms,
            tenants = rules.tenants.len(),
            datasets = rules.datasets.len(),
            "applied placement rules"
        );
        self.placement.update(&rules);
        Ok(())
    }

    /// Performs the initial load and starts the reload loop. Fails only
    /// if no ruleset could be obtained at startup.
    pub async fn spawn(self) -> Result<AgentHandle, ControlError> {
        self.sync().await?;

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
        let task = tokio::spawn(async move {
            info!("placement agent started");
            let mut interval = tokio::time::interval(self.config.update_interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.sync().await {
                            warn!(error = %e, "placement rules reload failed, serving previous rules");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            info!("placement agent stopped");
        });
        Ok(AgentHandle { shutdown_tx, task })
    }
}

/// Handle to a running [`Agent`].
pub struct AgentHandle {
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl AgentHandle {
    /// Signal shutdown and wait for the reload loop to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}
