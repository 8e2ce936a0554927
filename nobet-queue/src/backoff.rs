//! Retry policies applied between failed CAS rounds.
//!
//! Retries are unbounded: a lost CAS means another thread's CAS succeeded,
//! so the queue as a whole progresses. A policy only decides how long this
//! thread waits before trying again.

use core::hint::spin_loop;
use std::thread;

/// Pluggable pause between retries of a contended queue operation.
pub trait BackoffStrategy: Send + Sync {
    /// Pause before retry number `attempt` (0-indexed).
    fn backoff(&self, attempt: u32);
}

/// Retry immediately. The tight loop of the classic algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl BackoffStrategy for NoBackoff {
    #[inline]
    fn backoff(&self, _attempt: u32) {}
}

/// Spin a fixed number of `spin_loop` hints per retry.
///
/// Low latency, but burns the core while contended.
#[derive(Debug, Clone, Copy)]
pub struct BusySpinBackoff {
    /// Spin-loop hints issued per retry.
    pub spins: u32,
}

impl Default for BusySpinBackoff {
    fn default() -> Self {
        Self { spins: 1 }
    }
}

impl BackoffStrategy for BusySpinBackoff {
    #[inline]
    fn backoff(&self, _attempt: u32) {
        for _ in 0..self.spins {
            spin_loop();
        }
    }
}

/// Exponential spinning, then yielding the thread.
///
/// Retry `n` spins `2^n` times while `n <= spin_limit`; later retries call
/// `thread::yield_now`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    /// Last attempt that spins instead of yielding.
    pub spin_limit: u32,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self { spin_limit: 6 }
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn backoff(&self, attempt: u32) {
        if attempt <= self.spin_limit {
            for _ in 0..1u32 << attempt.min(31) {
                spin_loop();
            }
        } else {
            thread::yield_now();
        }
    }
}
