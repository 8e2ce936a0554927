//! Michael–Scott lock-free queue with hazard-pointer reclamation.
//!
//! The chain always starts with a sentinel: `head` points at it and the
//! first real element is its successor. `tail` may lag behind the last node
//! by at most the links not yet swung; any thread that notices the lag
//! swings it before retrying. Shared structure is only ever mutated by CAS on
//! `head`, `tail` and a node's `next`.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;
use core::marker::PhantomData;
use core::ptr;
use core::sync::atomic::{AtomicIsize, AtomicPtr, Ordering};

use crossbeam_utils::CachePadded;
use nobet::{Domain, Error, Handle, drop_boxed};

use crate::backoff::{BackoffStrategy, ExponentialBackoff};
use crate::error::EnqueueError;
use crate::node::Node;

/// Unbounded MPMC FIFO queue.
///
/// Operations never block on another thread. A dequeued node is retired to
/// the calling handle and freed by a later sweep once no hazard slot
/// publishes it.
pub struct Queue<T> {
    head: CachePadded<AtomicPtr<Node<T>>>,
    tail: CachePadded<AtomicPtr<Node<T>>>,
    /// Advisory element count. Signed: a dequeue may decrement before the
    /// matching enqueue has incremented.
    len: CachePadded<AtomicIsize>,
    domain: Arc<Domain>,
    backoff: Box<dyn BackoffStrategy>,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Send> Sync for Queue<T> {}

/// Builder for [`Queue`].
///
/// The element type is fixed by the queue being built, so
/// `Queue::builder()...build()` infers it from how the queue is used.
pub struct QueueBuilder<T> {
    domain: Option<Arc<Domain>>,
    backoff: Box<dyn BackoffStrategy>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> QueueBuilder<T> {
    /// Builder with a private domain and exponential backoff.
    pub fn new() -> Self {
        Self {
            domain: None,
            backoff: Box::new(ExponentialBackoff::default()),
            _marker: PhantomData,
        }
    }

    /// Reclamation domain shared with other structures. Without one the
    /// queue builds a private domain with default limits.
    pub fn domain(mut self, domain: Arc<Domain>) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Pause applied between CAS retries.
    pub fn backoff<B: BackoffStrategy + 'static>(mut self, strategy: B) -> Self {
        self.backoff = Box::new(strategy);
        self
    }

    /// Build an empty queue.
    pub fn build(self) -> Queue<T> {
        let sentinel = Node::sentinel();
        Queue {
            head: CachePadded::new(AtomicPtr::new(sentinel)),
            tail: CachePadded::new(AtomicPtr::new(sentinel)),
            len: CachePadded::new(AtomicIsize::new(0)),
            domain: self.domain.unwrap_or_else(|| Arc::new(Domain::new())),
            backoff: self.backoff,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for QueueBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for QueueBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueBuilder")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> {
    /// Empty queue with a private domain and default backoff.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Empty queue reclaiming through `domain`.
    pub fn with_domain(domain: Arc<Domain>) -> Self {
        Self::builder().domain(domain).build()
    }

    /// Start configuring a queue.
    pub fn builder() -> QueueBuilder<T> {
        QueueBuilder::new()
    }

    /// Domain nodes are retired to.
    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    /// Relaxed snapshot of the element count.
    ///
    /// Eventually consistent with concurrent operations and exact once they
    /// are quiescent. Do not use it to decide emptiness: only a dequeue
    /// returning `None` says the queue was empty.
    pub fn approximate_len(&self) -> usize {
        self.len.load(Ordering::Relaxed).max(0) as usize
    }

    /// Append `value` using the calling thread's cached handle.
    pub fn enqueue(&self, value: T) -> Result<(), EnqueueError<T>> {
        self.domain.with_local(|handle| self.enqueue_with(handle, value))
    }

    /// Remove the oldest element using the calling thread's cached handle.
    pub fn dequeue(&self) -> Result<Option<T>, Error> {
        self.domain.with_local(|handle| self.dequeue_with(handle))
    }

    /// Append `value`, protecting the tail through `handle`.
    ///
    /// Needs one hazard slot. On failure the value is returned inside the
    /// error.
    ///
    /// # Panics
    ///
    /// If `handle` belongs to another domain.
    pub fn enqueue_with(&self, handle: &Handle, value: T) -> Result<(), EnqueueError<T>> {
        self.check_domain(handle);
        let guard = match handle.acquire() {
            Ok(guard) => guard,
            Err(err) => return Err(EnqueueError::new(value, err)),
        };
        let node = Node::alloc(value).map_err(|(value, err)| EnqueueError::new(value, err))?;

        let mut attempt = 0u32;
        loop {
            let last = guard.protect(&self.tail);
            // SAFETY: `last` is published and `tail` is never null.
            let last_next = unsafe { &(*last).next };
            let next = last_next.load(Ordering::Acquire);

            if last == self.tail.load(Ordering::Acquire) {
                if next.is_null() {
                    if last_next
                        .compare_exchange(next, node, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        // Best effort; a lagging tail is swung by whoever sees it next.
                        let _ = self.tail.compare_exchange(
                            last,
                            node,
                            Ordering::AcqRel,
                            Ordering::Relaxed,
                        );
                        self.len.fetch_add(1, Ordering::Relaxed);
                        return Ok(());
                    }
                } else {
                    // Another enqueue linked but has not swung tail yet.
                    let _ =
                        self.tail
                            .compare_exchange(last, next, Ordering::AcqRel, Ordering::Relaxed);
                }
            }

            self.backoff.backoff(attempt);
            attempt = attempt.saturating_add(1);
        }
    }

    /// Remove the oldest element, reading through hazard slots of `handle`.
    ///
    /// Needs two hazard slots: one for `head`, one for `tail` and then for
    /// head's successor. Returns `Ok(None)` when the queue is empty.
    ///
    /// # Panics
    ///
    /// If `handle` belongs to another domain.
    pub fn dequeue_with(&self, handle: &Handle) -> Result<Option<T>, Error> {
        self.check_domain(handle);
        let head_guard = handle.acquire()?;
        let aux_guard = handle.acquire()?;

        let mut attempt = 0u32;
        loop {
            let first = head_guard.protect(&self.head);
            let last = aux_guard.protect(&self.tail);
            // SAFETY: `first` is published and `head` is never null.
            let next = unsafe { (*first).next.load(Ordering::Acquire) };

            if first == self.head.load(Ordering::Acquire) {
                if first == last {
                    if next.is_null() {
                        return Ok(None);
                    }
                    // Tail lags behind a linked node: help, then retry.
                    let _ =
                        self.tail
                            .compare_exchange(last, next, Ordering::AcqRel, Ordering::Relaxed);
                } else if !next.is_null() {
                    // Tail is no longer needed; protect the successor instead.
                    // While `first` is still head, `next` cannot be retired.
                    aux_guard.protect_raw(next);
                    if first == self.head.load(Ordering::Acquire) {
                        // SAFETY: `next` is published and still linked.
                        let data = unsafe { (*next).data.load(Ordering::Acquire) };
                        if !data.is_null()
                            && self
                                .head
                                .compare_exchange(
                                    first,
                                    next,
                                    Ordering::AcqRel,
                                    Ordering::Acquire,
                                )
                                .is_ok()
                        {
                            // Only the thread that moved head onto `next` takes its data.
                            let data =
                                unsafe { (*next).data.swap(ptr::null_mut(), Ordering::AcqRel) };
                            debug_assert!(!data.is_null());
                            self.len.fetch_sub(1, Ordering::Relaxed);

                            drop(aux_guard);
                            drop(head_guard);
                            // SAFETY: `first` is unlinked, payload-free and retired once,
                            // by the winner of the CAS that detached it.
                            unsafe { handle.retire_with(first.cast(), drop_boxed::<Node<T>>) };
                            // SAFETY: `data` was boxed by `Node::alloc` and is now ours.
                            return Ok(Some(unsafe { *Box::from_raw(data) }));
                        }
                    }
                }
            }

            self.backoff.backoff(attempt);
            attempt = attempt.saturating_add(1);
        }
    }

    fn check_domain(&self, handle: &Handle) {
        assert!(
            Arc::ptr_eq(handle.domain(), &self.domain),
            "nobet-queue: handle registered with a different domain"
        );
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        // Exclusive access: no reader can hold any node of the chain.
        let mut curr = *self.head.get_mut();
        while !curr.is_null() {
            // SAFETY: every linked node is owned by the queue and freed once
            // here; already retired nodes are no longer linked.
            let mut node = unsafe { Box::from_raw(curr) };
            curr = *node.next.get_mut();
        }
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("approximate_len", &self.approximate_len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::NoBackoff;

    #[test]
    fn sentinel_stays_after_draining() {
        let queue = Queue::builder().backoff(NoBackoff).build();
        let handle = queue.domain().register();
        for i in 0..3 {
            queue.enqueue_with(&handle, i).unwrap();
        }
        while queue.dequeue_with(&handle).unwrap().is_some() {}

        let head = queue.head.load(Ordering::Relaxed);
        assert_eq!(head, queue.tail.load(Ordering::Relaxed));
        assert!(!head.is_null());
        assert!(unsafe { (*head).next.load(Ordering::Relaxed) }.is_null());
        assert!(unsafe { (*head).data.load(Ordering::Relaxed) }.is_null());
    }

    #[test]
    fn builder_infers_the_element_type() {
        let strings = Queue::builder().build();
        strings.enqueue("a".to_string()).unwrap();
        assert_eq!(strings.dequeue(), Ok(Some("a".to_string())));

        let domain = Domain::builder().capacity(4).build_shared();
        let numbers = QueueBuilder::default()
            .domain(domain.clone())
            .backoff(NoBackoff)
            .build();
        numbers.enqueue(1u64).unwrap();
        assert!(Arc::ptr_eq(numbers.domain(), &domain));
        assert_eq!(numbers.approximate_len(), 1);
    }

    #[test]
    fn lagging_tail_is_swung_by_dequeue() {
        let queue: Queue<u32> = Queue::new();
        let handle = queue.domain().register();

        // Link a node behind the sentinel without moving tail.
        let node = Node::alloc(9).ok().unwrap();
        let sentinel = queue.head.load(Ordering::Relaxed);
        unsafe { (*sentinel).next.store(node, Ordering::Release) };
        queue.len.fetch_add(1, Ordering::Relaxed);

        assert_eq!(queue.dequeue_with(&handle).unwrap(), Some(9));
        assert_eq!(queue.tail.load(Ordering::Relaxed), node);
        assert_eq!(queue.dequeue_with(&handle).unwrap(), None);
    }

    #[test]
    fn lagging_tail_is_swung_by_enqueue() {
        let queue: Queue<u32> = Queue::new();
        let handle = queue.domain().register();

        let node = Node::alloc(1).ok().unwrap();
        let sentinel = queue.head.load(Ordering::Relaxed);
        unsafe { (*sentinel).next.store(node, Ordering::Release) };
        queue.len.fetch_add(1, Ordering::Relaxed);

        queue.enqueue_with(&handle, 2).unwrap();
        assert_eq!(queue.dequeue_with(&handle).unwrap(), Some(1));
        assert_eq!(queue.dequeue_with(&handle).unwrap(), Some(2));
    }

    #[test]
    fn dequeued_nodes_go_to_the_handle() {
        let domain = Domain::builder().retire_threshold(1_000).build_shared();
        let queue = Queue::with_domain(domain.clone());
        let handle = domain.register();
        for i in 0..10 {
            queue.enqueue_with(&handle, i).unwrap();
        }
        for _ in 0..4 {
            queue.dequeue_with(&handle).unwrap();
        }
        assert_eq!(handle.retired_len(), 4);
        assert_eq!(handle.reclaim(), 4);
        assert_eq!(handle.slots_owned(), 0);
    }

    #[test]
    fn counter_never_reports_negative() {
        let queue: Queue<u8> = Queue::new();
        queue.len.fetch_sub(1, Ordering::Relaxed);
        assert_eq!(queue.approximate_len(), 0);
    }
}
