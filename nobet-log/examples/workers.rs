//! Worker threads logging until SIGINT or SIGTERM.
//!
//! ```text
//! RUST_LOG=nobet_log=debug cargo run -p nobet-log --example workers
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use nobet_log::{LogError, Logger};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const NUM_THREADS: usize = 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nobet_log=info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            println!("Caught signal, exiting gracefully.");
            running.store(false, Ordering::Release);
        })?;
    }

    let logger = Arc::new(Logger::builder("workers").build()?);

    let workers: Vec<_> = (0..NUM_THREADS)
        .map(|worker| {
            let logger = logger.clone();
            let running = running.clone();
            thread::spawn(move || -> Result<(), LogError> {
                let mut count = 0u64;
                while running.load(Ordering::Acquire) {
                    thread::sleep(Duration::from_millis(100));
                    logger.info(format_args!("Worker {worker} is working, counter {count}"))?;
                    count += 1;
                }
                Ok(())
            })
        })
        .collect();

    for worker in workers {
        worker.join().map_err(|_| "worker panicked")??;
    }

    if let Some(mut logger) = Arc::into_inner(logger) {
        logger.shutdown()?;
    }
    Ok(())
}
