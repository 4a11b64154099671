//! Usage-rate aggregation for adaptive placement.
//!
//! Raw ingestion samples are folded into per-(tenant, dataset, shard)
//! EWMA counters by the [`StatsCollector`]; tenant, dataset and owner
//! strings are interned through a ref-counted [`Dictionary`] to bound
//! memory under high cardinality. Periodic builds produce the compact
//! [`StatsSnapshot`] consumed by the ruler and persisted for failover.
//!
//! [`StatsSnapshot`]: reef_types::StatsSnapshot

mod collector;
mod dict;
mod ewma;

pub use collector::StatsCollector;
pub use dict::Dictionary;
pub use ewma::Rate;
