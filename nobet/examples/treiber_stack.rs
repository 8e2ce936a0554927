//! Treiber stack reclaimed with nobet hazard pointers

use nobet::{Domain, Error, Handle, drop_boxed};
use std::mem::ManuallyDrop;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::thread;

struct Node<T> {
    /// Moved out by the popping thread; never dropped with the node.
    value: ManuallyDrop<T>,
    next: *mut Node<T>,
}

/// Lock-free Treiber stack
pub struct TreiberStack<T> {
    head: AtomicPtr<Node<T>>,
}

unsafe impl<T: Send> Send for TreiberStack<T> {}
unsafe impl<T: Send> Sync for TreiberStack<T> {}

impl<T: Send + 'static> TreiberStack<T> {
    pub fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    pub fn push(&self, value: T) {
        let node = Box::into_raw(Box::new(Node {
            value: ManuallyDrop::new(value),
            next: ptr::null_mut(),
        }));

        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            unsafe { (*node).next = head };
            match self
                .head
                .compare_exchange_weak(head, node, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(current) => head = current,
            }
        }
    }

    pub fn pop(&self, handle: &Handle) -> Result<Option<T>, Error> {
        let guard = handle.acquire()?;
        loop {
            let head = guard.protect(&self.head);
            if head.is_null() {
                return Ok(None);
            }

            // `head` is published and was current when published.
            let next = unsafe { (*head).next };
            if self
                .head
                .compare_exchange(head, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let value = unsafe { ptr::read(&*(*head).value) };
                drop(guard);
                unsafe { handle.retire_with(head.cast(), drop_boxed::<Node<T>>) };
                return Ok(Some(value));
            }
        }
    }
}

impl<T: Send + 'static> Default for TreiberStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for TreiberStack<T> {
    fn drop(&mut self) {
        let mut curr = *self.head.get_mut();
        while !curr.is_null() {
            let mut node = unsafe { Box::from_raw(curr) };
            unsafe { ManuallyDrop::drop(&mut node.value) };
            curr = node.next;
        }
    }
}

fn main() -> Result<(), Error> {
    println!("Treiber Stack Example");
    println!("=====================\n");

    let domain = Arc::new(Domain::new());

    println!("Single-threaded test:");
    {
        let handle = domain.register();
        let stack = TreiberStack::default();

        stack.push(1);
        stack.push(2);
        stack.push(3);

        assert_eq!(stack.pop(&handle)?, Some(3));
        assert_eq!(stack.pop(&handle)?, Some(2));
        assert_eq!(stack.pop(&handle)?, Some(1));
        assert_eq!(stack.pop(&handle)?, None);

        println!("Push and pop work correctly.");
    }

    println!("\nMulti-threaded test (8 threads, 50000 ops each):");
    {
        let stack = Arc::new(TreiberStack::new());
        let start = std::time::Instant::now();

        let workers: Vec<_> = (0..8)
            .map(|thread_id| {
                let stack = stack.clone();
                let domain = domain.clone();
                thread::spawn(move || -> Result<(), Error> {
                    let handle = domain.register();
                    for i in 0..50000 {
                        if i % 3 == 0 {
                            stack.push(thread_id * 50000 + i);
                        } else {
                            stack.pop(&handle)?;
                        }
                    }
                    Ok(())
                })
            })
            .collect();

        for worker in workers {
            worker.join().expect("worker panicked")?;
        }

        let elapsed = start.elapsed();
        let total_ops = 8 * 50000;
        println!("Completed {} operations in {:?}", total_ops, elapsed);
        println!(
            "Throughput: {:.0} ops/sec",
            total_ops as f64 / elapsed.as_secs_f64()
        );
    }

    println!("\nAll tests passed!");
    Ok(())
}
