//! Interface to the cluster-membership ring.
//!
//! The gossip/membership layer is an external collaborator: the
//! distributor only needs a snapshot of healthy instances and their
//! token counts, obtained through [`RingReader`].

/// Lifecycle state of a ring instance, as reported by the membership
/// layer. Only instances considered healthy for writes are returned by
/// [`RingReader::healthy_instances`]; the state is carried through for
/// callers that want to deprioritize leaving instances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstanceState {
    #[default]
    Active,
    Joining,
    Leaving,
    Left,
}

/// Descriptor of one cluster instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceDesc {
    pub id: String,
    pub addr: String,
    /// Ring tokens; each token contributes one shard to the distribution.
    pub tokens: Vec<u32>,
    pub state: InstanceState,
}

impl InstanceDesc {
    pub fn new(id: impl Into<String>, addr: impl Into<String>, token_count: usize) -> Self {
        Self {
            id: id.into(),
            addr: addr.into(),
            tokens: vec![0; token_count],
            state: InstanceState::Active,
        }
    }
}

/// Errors from the membership collaborator.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    /// No healthy instances exist.
    #[error("empty ring")]
    EmptyRing,

    /// The ring could not be read (gossip not ready, transport failure).
    #[error("ring unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the cluster ring.
pub trait RingReader: Send + Sync {
    /// Snapshot of all instances currently healthy for write operations.
    fn healthy_instances(&self) -> Result<Vec<InstanceDesc>, RingError>;
}
