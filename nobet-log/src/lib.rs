//! Asynchronous line logger on top of [`nobet_queue::Queue`].
//!
//! Any number of threads format lines and enqueue them; one background
//! thread dequeues them and writes each line to every configured [`Sink`],
//! flushing after each write. Producers never block on I/O.
//!
//! ```no_run
//! use nobet_log::{Level, Logger};
//!
//! # fn main() -> Result<(), nobet_log::LogError> {
//! let mut logger = Logger::builder("service").dir("/tmp/logs").build()?;
//! logger.info("request served")?;
//! logger.log(Level::Warning, format_args!("retrying in {}ms", 50))?;
//! logger.shutdown()?;
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]

mod error;
mod level;
mod logger;
mod sink;

pub use error::LogError;
pub use level::Level;
pub use logger::{Builder, Config, Logger};
pub use sink::{ConsoleSink, FileSink, Sink};
