//! Persistence for placement rules and stats snapshots.
//!
//! This crate defines the [`PlacementStore`] trait the manager writes
//! through and the agent reads through, along with three backends:
//!
//! - [`BucketStore`] — directory-backed storage with atomic writes.
//! - [`MemoryStore`] — in-memory storage, used in tests.
//! - [`EmptyStore`] — persists nothing; every load reports not-found.

mod bucket_store;
mod empty_store;
mod error;
mod memory_store;
mod traits;

pub use bucket_store::BucketStore;
pub use empty_store::EmptyStore;
pub use error::StoreError;
pub use memory_store::MemoryStore;
pub use traits::PlacementStore;
