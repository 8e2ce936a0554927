//! Failure modes of slot acquisition and node allocation.

use thiserror::Error;

/// Errors surfaced by the reclamation domain and the structures built on it.
///
/// CAS contention is never reported here; it is always retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Every hazard slot of the domain is owned. Back off and retry: a thread
    /// already holding slots may be the one keeping the table full.
    #[error("hazard slots exhausted: all {capacity} slots are owned")]
    CapacityExhausted {
        /// Number of slots in the exhausted domain.
        capacity: usize,
    },
    /// The global allocator returned null for a node or payload.
    #[error("allocation of {size} bytes failed")]
    AllocationFailure {
        /// Size of the rejected allocation request.
        size: usize,
    },
}

impl Error {
    /// Whether the operation may succeed if retried after backing off.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::CapacityExhausted { .. })
    }
}
