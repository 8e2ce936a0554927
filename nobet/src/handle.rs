//! Per-thread reclamation context.
//!
//! A [`Handle`] is the explicit "current execution context" of the hazard
//! protocol: it owns an id that hazard slots are claimed under, and a private
//! retirement list that only it ever reads or writes.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::mem;

use crate::domain::Domain;
use crate::error::Error;
use crate::guard::Guard;
use crate::reclaim::{self, Partition};
use crate::retired::{DestructorFn, Retired, drop_boxed};

/// Identity under which a handle claims hazard slots. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

impl OwnerId {
    #[inline]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        debug_assert!(raw != crate::slot::FREE);
        Self(raw)
    }

    /// Raw id value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Reclamation context registered with a [`Domain`].
///
/// Obtain one with [`Domain::register`], or borrow the calling thread's
/// cached one through [`Domain::with_local`]. A handle can be moved to
/// another thread but not shared between threads.
pub struct Handle {
    domain: Arc<Domain>,
    id: OwnerId,
    retired: RefCell<Vec<Retired>>,
}

impl Handle {
    pub(crate) fn new(domain: Arc<Domain>) -> Self {
        let id = domain.next_owner();
        let threshold = domain.retire_threshold();
        Self {
            domain,
            id,
            retired: RefCell::new(Vec::with_capacity(threshold)),
        }
    }

    /// Domain this handle belongs to.
    #[inline]
    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    /// Owner id used for slot ownership.
    #[inline]
    pub fn id(&self) -> OwnerId {
        self.id
    }

    /// Claim a hazard slot, wrapped in a guard that releases it on drop.
    ///
    /// Fails with [`Error::CapacityExhausted`] when every slot of the domain
    /// is owned. The call does not retry.
    pub fn acquire(&self) -> Result<Guard<'_>, Error> {
        let slot = self.domain.slots().acquire(self.id)?;
        Ok(Guard::new(self, slot))
    }

    /// Number of slots this handle currently owns.
    pub fn slots_owned(&self) -> usize {
        self.domain.slots().owned_by(self.id)
    }

    /// Number of records in this handle's retirement list.
    pub fn retired_len(&self) -> usize {
        self.retired.borrow().len()
    }

    /// Retire a boxed value, freeing it once no slot publishes its address.
    ///
    /// # Safety
    ///
    /// - `ptr` must come from `Box::<T>::into_raw`.
    /// - It must already be unreachable for threads that have not protected
    ///   it yet, and must not be retired twice.
    pub unsafe fn retire<T: Send + 'static>(&self, ptr: *mut T) {
        unsafe { self.retire_with(ptr.cast(), drop_boxed::<T>) }
    }

    /// Retire `ptr` with a custom destructor.
    ///
    /// Appends to the private list; once the list reaches the domain's
    /// threshold a sweep runs on this thread. Null is ignored.
    ///
    /// # Safety
    ///
    /// Same as [`Handle::retire`]; in addition `destructor` must be sound to
    /// call on `ptr` exactly once, from any thread.
    pub unsafe fn retire_with(&self, ptr: *mut (), destructor: DestructorFn) {
        if ptr.is_null() {
            return;
        }
        let len = {
            let mut retired = self.retired.borrow_mut();
            retired.push(Retired::new(ptr, destructor));
            retired.len()
        };
        if len >= self.domain.retire_threshold() {
            self.reclaim();
        }
    }

    /// Run a sweep now. Returns the number of records freed.
    ///
    /// Orphans parked in the domain are adopted first. Records whose address
    /// is in the hazard snapshot stay in the list for the next sweep.
    pub fn reclaim(&self) -> usize {
        let mut pending = mem::take(&mut *self.retired.borrow_mut());
        self.domain.orphans().adopt_into(&mut pending);
        if pending.is_empty() {
            return 0;
        }

        let hazards = self.domain.slots().snapshot();
        let Partition {
            deferred,
            unprotected,
        } = reclaim::partition(pending, &hazards);
        self.retired.borrow_mut().extend(deferred);

        // Destructors run with no borrow held: they may retire again.
        // SAFETY: retired records are unreachable, and none is published.
        unsafe { reclaim::free_all(unprotected) }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.reclaim();
        let leftover = mem::take(self.retired.get_mut());
        self.domain.orphans().push_all(leftover);
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("retired", &self.retired_len())
            .finish_non_exhaustive()
    }
}
