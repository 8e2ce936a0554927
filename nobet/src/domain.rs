//! Reclamation domain: the hazard-pointer registry.
//!
//! A [`Domain`] is an explicitly constructed context shared through an
//! [`Arc`]. It holds the fixed slot table, the owner-id allocator and the
//! orphan list. Queues and guards reach it through that `Arc`, never through
//! a hidden global; [`Domain::global`] is only a lazily built default
//! instance for callers that do not care to create one.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use once_cell::race::OnceBox;

use crate::handle::{Handle, OwnerId};
use crate::orphans::Orphans;
use crate::reclaim::{self, DEFAULT_RETIRE_THRESHOLD};
use crate::slot::{DEFAULT_CAPACITY, SlotTable};

/// Limits of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of hazard slots; at most this many protections can be live at
    /// once across every thread.
    pub capacity: usize,
    /// Retirement list length at which a handle sweeps.
    pub retire_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            retire_threshold: DEFAULT_RETIRE_THRESHOLD,
        }
    }
}

/// Builder for [`Domain`].
#[derive(Debug, Clone, Default)]
pub struct DomainBuilder {
    config: Config,
}

impl DomainBuilder {
    /// Number of hazard slots.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Retirement list length that triggers a sweep.
    pub fn retire_threshold(mut self, threshold: usize) -> Self {
        self.config.retire_threshold = threshold;
        self
    }

    /// Build the domain.
    pub fn build(self) -> Domain {
        Domain::with_config(self.config)
    }

    /// Build the domain behind an `Arc`, ready to be shared.
    pub fn build_shared(self) -> Arc<Domain> {
        Arc::new(self.build())
    }
}

/// Hazard-pointer registry shared by every handle registered with it.
pub struct Domain {
    config: Config,
    slots: SlotTable,
    next_owner: AtomicU64,
    orphans: Orphans,
}

thread_local! {
    /// Handles this thread registered through `Domain::with_local`.
    static LOCAL: RefCell<Vec<Rc<Handle>>> = const { RefCell::new(Vec::new()) };
}

static GLOBAL: OnceBox<Arc<Domain>> = OnceBox::new();

impl Domain {
    /// Domain with the default limits (100 slots, sweep every 100 retires).
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Domain with explicit limits.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            slots: SlotTable::new(config.capacity),
            next_owner: AtomicU64::new(1),
            orphans: Orphans::new(),
        }
    }

    /// Start configuring a domain.
    pub fn builder() -> DomainBuilder {
        DomainBuilder::default()
    }

    /// Process-wide default domain, built on first use.
    pub fn global() -> &'static Arc<Domain> {
        GLOBAL.get_or_init(|| Box::new(Arc::new(Domain::new())))
    }

    /// Limits this domain was built with.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of hazard slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Retirement list length that triggers a sweep.
    #[inline]
    pub fn retire_threshold(&self) -> usize {
        self.config.retire_threshold
    }

    /// Number of slots owned right now. Racy under concurrent use.
    pub fn slots_in_use(&self) -> usize {
        self.slots.in_use()
    }

    /// Records parked by dropped handles, waiting for adoption.
    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    /// Register a new reclamation context with a fresh owner id.
    pub fn register(self: &Arc<Self>) -> Handle {
        Handle::new(Arc::clone(self))
    }

    /// Run `f` with the calling thread's cached handle for this domain.
    ///
    /// The handle is registered on first use and kept in a thread local, so
    /// retirements made through it accumulate across calls. Cached handles of
    /// domains nobody else references any more are dropped on the way. During
    /// thread teardown, when the cache is gone, a temporary handle is used.
    pub fn with_local<R>(self: &Arc<Self>, f: impl FnOnce(&Handle) -> R) -> R {
        match self.local_handle() {
            Some(handle) => f(&handle),
            None => f(&self.register()),
        }
    }

    fn local_handle(self: &Arc<Self>) -> Option<Rc<Handle>> {
        LOCAL
            .try_with(|local| {
                let (handle, stale) = {
                    let mut local = local.try_borrow_mut().ok()?;
                    // Only the cache references these domains; without a
                    // stale entry the cache is left untouched.
                    let mut stale = Vec::new();
                    if local.iter().any(|h| Arc::strong_count(h.domain()) == 1) {
                        let mut i = 0;
                        while i < local.len() {
                            if Arc::strong_count(local[i].domain()) == 1 {
                                stale.push(local.swap_remove(i));
                            } else {
                                i += 1;
                            }
                        }
                    }

                    let handle = match local.iter().find(|h| Arc::ptr_eq(h.domain(), self)) {
                        Some(handle) => Rc::clone(handle),
                        None => {
                            let handle = Rc::new(self.register());
                            local.push(Rc::clone(&handle));
                            handle
                        }
                    };
                    (handle, stale)
                };
                // Dropping a stale handle sweeps and may run destructors;
                // the cache borrow is already released.
                drop(stale);
                Some(handle)
            })
            .ok()
            .flatten()
    }

    #[inline]
    pub(crate) fn slots(&self) -> &SlotTable {
        &self.slots
    }

    #[inline]
    pub(crate) fn orphans(&self) -> &Orphans {
        &self.orphans
    }

    pub(crate) fn next_owner(&self) -> OwnerId {
        OwnerId::from_raw(self.next_owner.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Domain {
    fn drop(&mut self) {
        // Every handle holds an `Arc<Domain>`, so none (and no guard) is left.
        let orphans = self.orphans.drain();
        // SAFETY: no slot can publish anything once the last handle is gone.
        unsafe { reclaim::free_all(orphans) };
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("config", &self.config)
            .field("slots_in_use", &self.slots_in_use())
            .field("orphans", &self.orphan_count())
            .finish()
    }
}
