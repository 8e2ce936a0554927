//! Orphaned retirement records.
//!
//! When a handle is dropped with records still protected somewhere, they
//! are parked here and adopted by the next sweep of any handle. The list is
//! guarded by a test-test-and-set flag: it is touched once per sweep and once
//! per handle teardown, never on the protect path.

use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use crossbeam_utils::Backoff;

use crate::retired::Retired;

pub(crate) struct Orphans {
    locked: AtomicBool,
    /// Length mirror so adopters can skip the flag when nothing is parked.
    len: AtomicUsize,
    records: UnsafeCell<Vec<Retired>>,
}

// SAFETY: `records` is only accessed while `locked` is held.
unsafe impl Send for Orphans {}
unsafe impl Sync for Orphans {}

impl Orphans {
    pub(crate) const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            len: AtomicUsize::new(0),
            records: UnsafeCell::new(Vec::new()),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Park `records`.
    pub(crate) fn push_all(&self, records: Vec<Retired>) {
        if records.is_empty() {
            return;
        }
        self.with_locked(|parked| {
            parked.extend(records);
            parked.len()
        });
    }

    /// Move every parked record into `into`.
    pub(crate) fn adopt_into(&self, into: &mut Vec<Retired>) {
        if self.len() == 0 {
            return;
        }
        self.with_locked(|parked| {
            into.append(parked);
            0
        });
    }

    /// Take every parked record with exclusive access.
    pub(crate) fn drain(&mut self) -> Vec<Retired> {
        self.len.store(0, Ordering::Relaxed);
        core::mem::take(self.records.get_mut())
    }

    /// Run `f` on the parked list; `f` returns the new length.
    fn with_locked(&self, f: impl FnOnce(&mut Vec<Retired>) -> usize) {
        let backoff = Backoff::new();
        loop {
            // Test phase: spin on a relaxed load so the line stays shared.
            while self.locked.load(Ordering::Relaxed) {
                backoff.snooze();
            }
            if !self.locked.swap(true, Ordering::Acquire) {
                break;
            }
        }
        // SAFETY: the flag is held.
        let len = f(unsafe { &mut *self.records.get() });
        self.len.store(len, Ordering::Release);
        self.locked.store(false, Ordering::Release);
    }
}
