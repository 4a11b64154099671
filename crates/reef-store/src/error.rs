//! Error types for placement storage operations.

/// Errors that can occur loading or storing placement documents.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested document does not exist in the store.
    ///
    /// Consumers treat this as a normal first-run condition, not a
    /// failure: the manager synthesizes an empty document instead.
    #[error("document not found: {0}")]
    NotFound(&'static str),

    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] postcard::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
