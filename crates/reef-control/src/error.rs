//! Error types for the control-plane services.

use reef_store::StoreError;

/// Errors surfaced by the manager and agent services.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A store operation exceeded the configured timeout.
    #[error("store operation timed out: {0}")]
    Timeout(&'static str),
}
