use thiserror::Error;

/// Errors reported by the logger.
#[derive(Debug, Error)]
pub enum LogError {
    /// Creating the log directory, opening the file or spawning the drain
    /// thread failed.
    #[error("log i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The queue could not take or hand out a line.
    #[error("log queue error: {0}")]
    Queue(#[from] nobet::Error),
    /// The logger has been shut down.
    #[error("logger is closed")]
    Closed,
    /// The drain thread panicked; lines still queued were not written.
    #[error("log drain thread panicked")]
    DrainPanicked,
}
