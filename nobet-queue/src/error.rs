use core::fmt;

use thiserror::Error;

/// A rejected enqueue. Owns the value that could not be queued.
#[derive(Error)]
#[error("enqueue failed: {source}")]
pub struct EnqueueError<T> {
    value: T,
    #[source]
    source: nobet::Error,
}

impl<T> EnqueueError<T> {
    pub(crate) fn new(value: T, source: nobet::Error) -> Self {
        Self { value, source }
    }

    /// Why the enqueue failed.
    pub fn error(&self) -> nobet::Error {
        self.source
    }

    /// The rejected value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Take the rejected value back.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> fmt::Debug for EnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnqueueError")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl<T> From<EnqueueError<T>> for nobet::Error {
    fn from(err: EnqueueError<T>) -> Self {
        err.source
    }
}
