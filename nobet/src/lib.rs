//! Nöbet: hazard-pointer memory reclamation for lock-free data structures.
//!
//! A thread that is about to dereference a shared pointer publishes it in a
//! hazard slot first; a thread that unlinks an object retires it instead of
//! freeing it, and the object is destroyed only once a sweep finds its
//! address in no slot.
//!
//! # Key Features
//!
//! - **Fixed slot table**: a domain holds a bounded number of slots;
//!   running out is reported as [`Error::CapacityExhausted`], never blocked on
//! - **Explicit contexts**: slots are owned by [`Handle`]s, not by OS thread
//!   ids, and domains are shared `Arc`s injected where they are needed
//! - **Private retirement lists**: retiring is an unsynchronized push; a
//!   sweep only reads the shared table
//! - **Scope-bound protection**: a [`Guard`] releases its slot on every exit
//!   path
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicPtr, Ordering};
//! use nobet::Domain;
//!
//! let domain = Arc::new(Domain::new());
//! let handle = domain.register();
//! let shared = AtomicPtr::new(Box::into_raw(Box::new(42)));
//!
//! // Publish before reading
//! let guard = handle.acquire()?;
//! let ptr = guard.protect(&shared);
//! assert_eq!(unsafe { *ptr }, 42);
//!
//! // Unlink and retire; freed once no guard publishes it
//! let old = shared.swap(Box::into_raw(Box::new(43)), Ordering::AcqRel);
//! unsafe { handle.retire(old) };
//! drop(guard);
//! handle.reclaim();
//!
//! # unsafe { drop(Box::from_raw(shared.into_inner())) };
//! # Ok::<(), nobet::Error>(())
//! ```

#![warn(missing_docs)]

extern crate alloc;

mod domain;
mod error;
mod guard;
mod handle;
mod orphans;
mod reclaim;
mod retired;
mod slot;

pub use domain::{Config, Domain, DomainBuilder};
pub use error::Error;
pub use guard::Guard;
pub use handle::{Handle, OwnerId};
pub use reclaim::DEFAULT_RETIRE_THRESHOLD;
pub use retired::{DestructorFn, drop_boxed};
pub use slot::DEFAULT_CAPACITY;

// Re-export for convenience
pub use core::sync::atomic::Ordering;
