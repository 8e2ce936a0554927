//! Logger front end and its drain thread.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Local;
use nobet::Domain;
use nobet_queue::Queue;
use tracing::{debug, warn};

use crate::error::LogError;
use crate::level::Level;
use crate::sink::{ConsoleSink, FileSink, Sink};

const DEFAULT_DIR: &str = "./logs/";
const DEFAULT_IDLE: Duration = Duration::from_millis(1);
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Logger settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `<name>.log`; created if missing.
    pub dir: PathBuf,
    /// Append lines to `<dir>/<name>.log`.
    pub file: bool,
    /// Echo lines to standard output.
    pub console: bool,
    /// How long the drain thread sleeps when the queue is empty.
    pub idle: Duration,
    /// Limits of the queue's reclamation domain.
    pub domain: nobet::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_DIR),
            file: true,
            console: true,
            idle: DEFAULT_IDLE,
            domain: nobet::Config::default(),
        }
    }
}

/// Builder for [`Logger`].
pub struct Builder {
    name: String,
    config: Config,
    sinks: Vec<Box<dyn Sink>>,
}

impl Builder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Config::default(),
            sinks: Vec::new(),
        }
    }

    /// Replace every setting at once.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Directory for the log file.
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dir = dir.into();
        self
    }

    /// Enable or disable the file sink.
    pub fn file(mut self, enabled: bool) -> Self {
        self.config.file = enabled;
        self
    }

    /// Enable or disable the console sink.
    pub fn console(mut self, enabled: bool) -> Self {
        self.config.console = enabled;
        self
    }

    /// Drain thread sleep when there is nothing to write.
    pub fn idle(mut self, idle: Duration) -> Self {
        self.config.idle = idle;
        self
    }

    /// Limits of the queue's reclamation domain.
    pub fn domain(mut self, domain: nobet::Config) -> Self {
        self.config.domain = domain;
        self
    }

    /// Add a sink next to the configured console and file sinks.
    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Open the sinks, start the drain thread and log `Logger started`.
    pub fn build(self) -> Result<Logger, LogError> {
        let Builder {
            name,
            config,
            mut sinks,
        } = self;

        let mut path = None;
        if config.file {
            std::fs::create_dir_all(&config.dir)?;
            let file = FileSink::open(config.dir.join(format!("{name}.log")))?;
            debug!(path = %file.path().display(), "log file opened");
            path = Some(file.path().to_path_buf());
            sinks.insert(0, Box::new(file));
        }
        if config.console {
            sinks.insert(0, Box::new(ConsoleSink));
        }

        let shared = Arc::new(Shared {
            queue: Queue::with_domain(Arc::new(Domain::with_config(config.domain))),
            running: AtomicBool::new(true),
        });
        let worker = {
            let shared = shared.clone();
            let idle = config.idle;
            thread::Builder::new()
                .name(format!("nobet-log-{name}"))
                .spawn(move || drain(&shared, sinks, idle))?
        };

        let logger = Logger {
            name,
            path,
            shared,
            worker: Some(worker),
        };
        logger.info("Logger started")?;
        Ok(logger)
    }
}

struct Shared {
    queue: Queue<String>,
    running: AtomicBool,
}

/// Asynchronous logger.
///
/// Logging methods take `&self`; share the logger across threads with an
/// `Arc`. Lines are written by a background thread in the order they were
/// enqueued. Dropping the logger shuts it down.
pub struct Logger {
    name: String,
    path: Option<PathBuf>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<Vec<Box<dyn Sink>>>>,
}

impl Logger {
    /// Start configuring a logger called `name`.
    pub fn builder(name: impl Into<String>) -> Builder {
        Builder::new(name)
    }

    /// Name the log file is derived from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Log file, if the file sink is enabled.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Format and enqueue one line.
    pub fn log(&self, level: Level, message: impl Display) -> Result<(), LogError> {
        if !self.shared.running.load(Ordering::Acquire) {
            return Err(LogError::Closed);
        }
        self.shared
            .queue
            .enqueue(format_line(level, message))
            .map_err(nobet::Error::from)?;
        Ok(())
    }

    /// Log at [`Level::Debug`].
    pub fn debug(&self, message: impl Display) -> Result<(), LogError> {
        self.log(Level::Debug, message)
    }

    /// Log at [`Level::Info`].
    pub fn info(&self, message: impl Display) -> Result<(), LogError> {
        self.log(Level::Info, message)
    }

    /// Log at [`Level::Warning`].
    pub fn warn(&self, message: impl Display) -> Result<(), LogError> {
        self.log(Level::Warning, message)
    }

    /// Log at [`Level::Error`].
    pub fn error(&self, message: impl Display) -> Result<(), LogError> {
        self.log(Level::Error, message)
    }

    /// Stop the drain thread, then write every line still queued.
    ///
    /// Calling it again is a no-op. Later logging returns
    /// [`LogError::Closed`].
    pub fn shutdown(&mut self) -> Result<(), LogError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.shared.running.store(false, Ordering::Release);
        let mut sinks = worker.join().map_err(|_| LogError::DrainPanicked)?;

        // Exclusive access now: drain until empty rather than by length.
        let mut remaining = 0usize;
        while let Some(line) = self.shared.queue.dequeue()? {
            write_line(&mut sinks, &line);
            remaining += 1;
        }
        debug!(logger = %self.name, remaining, "logger stopped");
        Ok(())
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!(logger = %self.name, error = %err, "logger shutdown failed");
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("running", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}

fn format_line(level: Level, message: impl Display) -> String {
    format!(
        "[{}] [{}]: {}",
        Local::now().format(TIMESTAMP_FORMAT),
        level,
        message
    )
}

fn drain(shared: &Shared, mut sinks: Vec<Box<dyn Sink>>, idle: Duration) -> Vec<Box<dyn Sink>> {
    while shared.running.load(Ordering::Acquire) {
        match shared.queue.dequeue() {
            Ok(Some(line)) => write_line(&mut sinks, &line),
            Ok(None) => thread::sleep(idle),
            Err(err) => {
                debug!(error = %err, "log drain backing off");
                thread::sleep(idle);
            }
        }
    }
    sinks
}

fn write_line(sinks: &mut [Box<dyn Sink>], line: &str) {
    for sink in sinks.iter_mut() {
        if let Err(err) = sink.write_line(line).and_then(|()| sink.flush()) {
            warn!(error = %err, "log sink write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format() {
        let line = format_line(Level::Warning, format_args!("disk at {}%", 91));
        // [YYYY-MM-DD HH:MM:SS] is 21 bytes.
        assert_eq!(&line[..1], "[");
        assert_eq!(&line[20..], "] [WARNING]: disk at 91%");
        assert!(chrono::NaiveDateTime::parse_from_str(&line[1..20], TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.dir, PathBuf::from("./logs/"));
        assert!(config.file && config.console);
        assert_eq!(config.idle, Duration::from_millis(1));
        assert_eq!(config.domain, nobet::Config::default());
    }
}
