//! Hazard slot table.
//!
//! A domain owns a fixed number of slots. Each slot publishes at most one
//! address and belongs to at most one owner at a time. Ownership moves from
//! [`FREE`] to an owner id through a CAS and returns to [`FREE`] with a
//! release store, after the published address has been cleared.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicU64, Ordering, fence};
use crossbeam_utils::CachePadded;

use crate::error::Error;
use crate::handle::OwnerId;

/// Owner id of an unowned slot.
pub(crate) const FREE: u64 = 0;

/// Default number of hazard slots in a domain.
pub const DEFAULT_CAPACITY: usize = 100;

/// One published-address/owner pair.
pub(crate) struct HazardSlot {
    pointer: AtomicPtr<()>,
    owner: AtomicU64,
}

impl HazardSlot {
    const fn new() -> Self {
        Self {
            pointer: AtomicPtr::new(ptr::null_mut()),
            owner: AtomicU64::new(FREE),
        }
    }

    /// Claim the slot for `owner` if nobody holds it.
    #[inline]
    fn try_claim(&self, owner: OwnerId) -> bool {
        // Plain load first so an owned slot costs no RMW.
        self.owner.load(Ordering::Relaxed) == FREE
            && self
                .owner
                .compare_exchange(FREE, owner.get(), Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
    }

    /// Publish `addr`. The fence orders the store before the caller's
    /// validating re-load, pairing with the fence in [`SlotTable::snapshot`].
    #[inline]
    pub(crate) fn publish(&self, addr: *mut ()) {
        self.pointer.store(addr, Ordering::Release);
        fence(Ordering::SeqCst);
    }

    #[inline]
    pub(crate) fn clear(&self) {
        self.pointer.store(ptr::null_mut(), Ordering::Release);
    }

    #[inline]
    pub(crate) fn published(&self) -> *mut () {
        self.pointer.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn owner(&self) -> u64 {
        self.owner.load(Ordering::Acquire)
    }

    /// Clear the address, then give up ownership.
    #[inline]
    pub(crate) fn release(&self) {
        self.clear();
        self.owner.store(FREE, Ordering::Release);
    }
}

/// Fixed-capacity table of hazard slots shared by every handle of a domain.
pub(crate) struct SlotTable {
    slots: Box<[CachePadded<HazardSlot>]>,
}

impl SlotTable {
    pub(crate) fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| CachePadded::new(HazardSlot::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { slots }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Scan for an unowned slot and claim it for `owner`.
    ///
    /// Losing a race for one slot moves on to the next; the table never
    /// grows and the call never blocks.
    pub(crate) fn acquire(&self, owner: OwnerId) -> Result<&HazardSlot, Error> {
        self.slots
            .iter()
            .map(|slot| &**slot)
            .find(|slot| slot.try_claim(owner))
            .ok_or(Error::CapacityExhausted {
                capacity: self.capacity(),
            })
    }

    /// Number of slots currently owned.
    pub(crate) fn in_use(&self) -> usize {
        self.slots.iter().filter(|slot| slot.owner() != FREE).count()
    }

    /// Number of slots owned by `owner`.
    pub(crate) fn owned_by(&self, owner: OwnerId) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.owner() == owner.get())
            .count()
    }

    /// Sorted, deduplicated set of every address currently published.
    ///
    /// A plain read of the table, no slot is written. Anything retired
    /// before this call and published at any point up to it is included.
    pub(crate) fn snapshot(&self) -> Vec<*mut ()> {
        fence(Ordering::SeqCst);
        let mut hazards: Vec<*mut ()> = self
            .slots
            .iter()
            .map(|slot| slot.published())
            .filter(|addr| !addr.is_null())
            .collect();
        hazards.sort_unstable();
        hazards.dedup();
        hazards
    }
}
