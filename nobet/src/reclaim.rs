//! Reclamation sweep.
//!
//! A sweep takes a snapshot of every published address and splits the
//! retired records against it: unpublished records are destroyed, published
//! ones wait for the next sweep. No lock is taken and no slot is written.

use alloc::vec::Vec;

use crate::retired::Retired;

/// Default retirement list length that triggers a sweep.
pub const DEFAULT_RETIRE_THRESHOLD: usize = 100;

/// Outcome of splitting a retirement list against a hazard snapshot.
pub(crate) struct Partition {
    /// Still published somewhere; kept for a later sweep.
    pub(crate) deferred: Vec<Retired>,
    /// Not published; safe to destroy.
    pub(crate) unprotected: Vec<Retired>,
}

/// Split `retired` against `hazards`, which must be sorted.
pub(crate) fn partition(retired: Vec<Retired>, hazards: &[*mut ()]) -> Partition {
    debug_assert!(hazards.is_sorted());
    let (deferred, unprotected) = retired
        .into_iter()
        .partition(|record| hazards.binary_search(&record.address()).is_ok());
    Partition {
        deferred,
        unprotected,
    }
}

/// Destroy every record in `records`, returning how many were freed.
///
/// # Safety
///
/// None of the addresses may be reachable or published.
pub(crate) unsafe fn free_all(records: Vec<Retired>) -> usize {
    let count = records.len();
    for record in records {
        unsafe { record.reclaim() };
    }
    count
}
