//! Queue nodes and fallible allocation.

use alloc::alloc::{Layout, alloc};
use alloc::boxed::Box;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use nobet::Error;

/// Link in the queue's chain.
///
/// `data` holds a separately boxed payload until a dequeue takes it; the
/// sentinel and every consumed node carry null. `next` is only ever changed
/// from null to a successor, never back.
pub(crate) struct Node<T> {
    pub(crate) data: AtomicPtr<T>,
    pub(crate) next: AtomicPtr<Node<T>>,
}

impl<T> Node<T> {
    /// Payload-free node used as the initial sentinel.
    pub(crate) fn sentinel() -> *mut Self {
        Box::into_raw(Box::new(Self {
            data: AtomicPtr::new(ptr::null_mut()),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }

    /// Allocate a node owning `value`. On failure the value is handed back.
    pub(crate) fn alloc(value: T) -> Result<*mut Self, (T, Error)> {
        let data = try_box(value)?;
        let node = Self {
            data: AtomicPtr::new(data),
            next: AtomicPtr::new(ptr::null_mut()),
        };
        try_box(node).map_err(|(node, err)| {
            let data = node.data.swap(ptr::null_mut(), Ordering::Relaxed);
            // SAFETY: `data` came from `try_box` above and was never shared.
            (unsafe { *Box::from_raw(data) }, err)
        })
    }
}

impl<T> Drop for Node<T> {
    fn drop(&mut self) {
        let data = *self.data.get_mut();
        if !data.is_null() {
            // SAFETY: a non-null payload is still owned by the node.
            unsafe { drop(Box::from_raw(data)) };
        }
    }
}

/// Move `value` to the heap, handing it back if the allocator returns null.
///
/// Memory comes from the global allocator with `Layout::new::<T>()`, so the
/// pointer may later be released with `Box::from_raw`.
pub(crate) fn try_box<T>(value: T) -> Result<*mut T, (T, Error)> {
    let layout = Layout::new::<T>();
    if layout.size() == 0 {
        return Ok(Box::into_raw(Box::new(value)));
    }
    // SAFETY: the layout has a non-zero size.
    let ptr = unsafe { alloc(layout) }.cast::<T>();
    if ptr.is_null() {
        return Err((value, Error::AllocationFailure {
            size: layout.size(),
        }));
    }
    // SAFETY: freshly allocated for a `T`.
    unsafe { ptr.write(value) };
    Ok(ptr)
}
