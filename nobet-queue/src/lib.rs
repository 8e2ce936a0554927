//! Lock-free MPMC queue for Nöbet.
//!
//! ## Features
//!
//! - `Queue`: unbounded Michael–Scott queue; dequeued nodes are reclaimed
//!   through `nobet` hazard pointers.
//! - `backoff`: tunable pause between CAS retries.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use nobet::Domain;
//! use nobet_queue::Queue;
//!
//! let domain = Arc::new(Domain::new());
//! let queue = Queue::with_domain(domain.clone());
//!
//! queue.enqueue(1)?;
//! queue.enqueue(2)?;
//! assert_eq!(queue.dequeue()?, Some(1));
//!
//! // Or pass the context explicitly.
//! let handle = domain.register();
//! assert_eq!(queue.dequeue_with(&handle)?, Some(2));
//! assert_eq!(queue.dequeue_with(&handle)?, None);
//! # Ok::<(), nobet::Error>(())
//! ```

extern crate alloc;

pub mod backoff;
mod error;
mod node;
pub mod queue;

pub use backoff::{BackoffStrategy, BusySpinBackoff, ExponentialBackoff, NoBackoff};
pub use error::EnqueueError;
pub use queue::{Queue, QueueBuilder};
