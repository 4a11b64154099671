//! Control plane for adaptive placement.
//!
//! Two periodic services reconcile through the store: the [`Manager`]
//! aggregates usage, runs the ruler, and publishes rules; the [`Agent`]
//! loads published rules and serves them through [`AdaptivePlacement`]
//! to the write path's distributor.

mod agent;
mod clock;
mod config;
mod error;
mod manager;
mod metrics;
mod placement;

pub use agent::{Agent, AgentHandle};
pub use config::AdaptiveConfig;
pub use error::ControlError;
pub use manager::{Manager, ManagerHandle};
pub use metrics::PlacementMetrics;
pub use placement::AdaptivePlacement;
