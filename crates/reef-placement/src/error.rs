//! Error types for the placement crate.

use crate::ring::RingError;

/// Errors produced by the distributor.
#[derive(Debug, thiserror::Error)]
pub enum DistributorError {
    /// The ring has no healthy instances; no distribution was installed
    /// and the next call will retry.
    #[error("empty ring")]
    EmptyRing,

    /// The ring snapshot could not be read.
    #[error("ring read failed: {0}")]
    Ring(#[from] RingError),
}
