//! Retirement records.
//!
//! A record pairs the address of a detached object with a type-erased
//! destructor. Records live in the private list of the handle that retired
//! them (or in the domain's orphan list once that handle is gone) until a
//! sweep proves no slot publishes the address.

use alloc::boxed::Box;

/// Type-erased destructor invoked with the retired address.
pub type DestructorFn = unsafe fn(*mut ());

/// A retired object awaiting reclamation.
pub(crate) struct Retired {
    ptr: *mut (),
    destructor: DestructorFn,
}

impl Retired {
    #[inline]
    pub(crate) fn new(ptr: *mut (), destructor: DestructorFn) -> Self {
        Self { ptr, destructor }
    }

    #[inline]
    pub(crate) fn address(&self) -> *mut () {
        self.ptr
    }

    /// Run the destructor, consuming the record.
    ///
    /// # Safety
    ///
    /// The address must be unreachable from shared state and absent from
    /// every hazard slot. Each record is reclaimed at most once, which
    /// consuming `self` enforces.
    #[inline]
    pub(crate) unsafe fn reclaim(self) {
        unsafe { (self.destructor)(self.ptr) }
    }
}

// SAFETY: a record is only an address plus a function pointer. `retire`
// requires `T: Send` for boxed values, and `retire_with` puts the same
// obligation on the caller, so running the destructor on another thread
// (orphan adoption, domain drop) is sound.
unsafe impl Send for Retired {}

/// Destructor for values allocated with `Box<T>`.
///
/// # Safety
///
/// `ptr` must come from `Box::<T>::into_raw` and not be freed yet.
pub unsafe fn drop_boxed<T>(ptr: *mut ()) {
    unsafe { drop(Box::from_raw(ptr.cast::<T>())) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tracked(Arc<AtomicUsize>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn reclaim_runs_the_boxed_destructor_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        let ptr = Box::into_raw(Box::new(Tracked(drops.clone())));
        let record = Retired::new(ptr.cast(), drop_boxed::<Tracked>);
        assert_eq!(record.address(), ptr.cast());

        unsafe { record.reclaim() };
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
