//! Scope-bound hazard protection.
//!
//! A [`Guard`] owns exactly one hazard slot for as long as it lives. Reading
//! a shared pointer through [`Guard::protect`] publishes it in that slot, so
//! no sweep frees the object until the guard is reset, re-targeted, or gone.

use core::fmt;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::handle::Handle;
use crate::slot::HazardSlot;

/// RAII owner of one hazard slot.
///
/// Guards move but never clone, so two protections can never share a slot.
/// Dropping the guard clears the published address and releases the slot,
/// on every exit path including unwinding.
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::AtomicPtr;
/// use nobet::Domain;
///
/// let domain = Arc::new(Domain::new());
/// let handle = domain.register();
/// let shared = AtomicPtr::new(Box::into_raw(Box::new(7u32)));
///
/// let guard = handle.acquire()?;
/// let ptr = guard.protect(&shared);
/// assert_eq!(unsafe { *ptr }, 7);
/// drop(guard);
///
/// unsafe { handle.retire(shared.into_inner()) };
/// # Ok::<(), nobet::Error>(())
/// ```
pub struct Guard<'h> {
    handle: &'h Handle,
    slot: &'h HazardSlot,
}

impl<'h> Guard<'h> {
    #[inline]
    pub(crate) fn new(handle: &'h Handle, slot: &'h HazardSlot) -> Self {
        Self { handle, slot }
    }

    /// Load `src` and publish the loaded address until a re-load agrees.
    ///
    /// The returned pointer stays valid for dereferencing while it remains
    /// published, provided the object is only ever freed through retirement
    /// in this guard's domain. A null result publishes null.
    pub fn protect<T>(&self, src: &AtomicPtr<T>) -> *mut T {
        let mut ptr = src.load(Ordering::Relaxed);
        loop {
            self.slot.publish(ptr.cast());
            let current = src.load(Ordering::Acquire);
            if current == ptr {
                return ptr;
            }
            ptr = current;
        }
    }

    /// Publish `ptr` without validating it against any source.
    ///
    /// The caller must re-check afterwards that `ptr` is still reachable,
    /// otherwise the object may already have been retired and freed.
    #[inline]
    pub fn protect_raw<T>(&self, ptr: *mut T) {
        self.slot.publish(ptr.cast());
    }

    /// Stop protecting anything while keeping the slot.
    #[inline]
    pub fn reset(&self) {
        self.slot.clear();
    }

    /// Address currently published by this guard.
    #[inline]
    pub fn published(&self) -> *mut () {
        self.slot.published()
    }

    /// Handle the slot was acquired through.
    #[inline]
    pub fn handle(&self) -> &'h Handle {
        self.handle
    }

    /// Release the slot now. Same as dropping the guard.
    #[inline]
    pub fn release(self) {}
}

impl Drop for Guard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.slot.release();
    }
}

impl fmt::Debug for Guard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("owner", &self.handle.id())
            .field("published", &self.published())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Domain, Error};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicPtr, Ordering};

    #[test]
    fn protect_follows_the_source() {
        let domain = Arc::new(Domain::new());
        let handle = domain.register();
        let mut a = 1u8;
        let mut b = 2u8;
        let src = AtomicPtr::new(&mut a as *mut u8);

        let guard = handle.acquire().unwrap();
        assert_eq!(guard.protect(&src), &mut a as *mut u8);
        assert_eq!(guard.published(), (&mut a as *mut u8).cast());

        src.store(&mut b, Ordering::SeqCst);
        assert_eq!(guard.protect(&src), &mut b as *mut u8);
        assert_eq!(guard.published(), (&mut b as *mut u8).cast());

        guard.reset();
        assert!(guard.published().is_null());
        assert_eq!(handle.slots_owned(), 1);
    }

    #[test]
    fn guards_release_on_drop_and_on_move() {
        let domain = Arc::new(Domain::builder().capacity(1).build());
        let handle = domain.register();

        let guard = handle.acquire().unwrap();
        assert_eq!(
            handle.acquire().unwrap_err(),
            Error::CapacityExhausted { capacity: 1 }
        );

        // Moving transfers the one slot, it does not duplicate it.
        let moved = guard;
        assert_eq!(domain.slots_in_use(), 1);
        moved.release();
        assert_eq!(domain.slots_in_use(), 0);

        let again = handle.acquire();
        assert!(again.is_ok());
    }

    #[test]
    fn guard_released_while_unwinding() {
        let domain = Arc::new(Domain::builder().capacity(1).build());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let handle = domain.register();
            let _guard = handle.acquire().unwrap();
            panic!("reader failed mid-read");
        }));
        assert!(result.is_err());
        assert_eq!(domain.slots_in_use(), 0);
    }
}
