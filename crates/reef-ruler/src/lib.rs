//! Turns observed usage into placement rules.
//!
//! The [`ShardAllocator`] is the per-dataset control loop deciding how
//! many shards a dataset gets; the [`Ruler`] runs one allocator per
//! (tenant, dataset) and renders the full rules document from a stats
//! snapshot.

mod allocator;
mod ruler;

pub use allocator::ShardAllocator;
pub use ruler::Ruler;
