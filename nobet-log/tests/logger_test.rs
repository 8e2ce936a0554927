use nobet_log::{Level, LogError, Logger, Sink};
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;

/// Collects lines in memory.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<String>>>);

impl Capture {
    fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Sink for Capture {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.0.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Always fails.
struct Broken;

impl Sink for Broken {
    fn write_line(&mut self, _line: &str) -> io::Result<()> {
        Err(io::Error::other("broken sink"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn message(line: &str) -> &str {
    line.split_once("]: ").map(|(_, msg)| msg).unwrap()
}

#[test]
fn test_file_sink_receives_lines() {
    let dir = tempfile::tempdir().unwrap();
    let mut logger = Logger::builder("app")
        .dir(dir.path().join("nested/logs"))
        .console(false)
        .build()
        .unwrap();
    let path = logger.path().unwrap().to_path_buf();
    assert_eq!(path, dir.path().join("nested/logs/app.log"));

    logger.info("hello").unwrap();
    logger.log(Level::Error, format_args!("code {}", 7)).unwrap();
    logger.shutdown().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("] [INFO]: Logger started"));
    assert!(lines[1].ends_with("] [INFO]: hello"));
    assert!(lines[2].ends_with("] [ERROR]: code 7"));
    assert!(lines.iter().all(|l| l.starts_with('[')));
}

#[test]
fn test_file_is_appended_across_loggers() {
    let dir = tempfile::tempdir().unwrap();
    for run in 0..2 {
        let logger = Logger::builder("svc")
            .dir(dir.path())
            .console(false)
            .build()
            .unwrap();
        logger.warn(format_args!("run {run}")).unwrap();
        // Drop shuts down and drains.
    }
    let contents = std::fs::read_to_string(dir.path().join("svc.log")).unwrap();
    let messages: Vec<&str> = contents.lines().map(message).collect();
    assert_eq!(messages, ["Logger started", "run 0", "Logger started", "run 1"]);
}

#[test]
fn test_custom_sink_and_levels() {
    let capture = Capture::default();
    let mut logger = Logger::builder("custom")
        .file(false)
        .console(false)
        .sink(capture.clone())
        .build()
        .unwrap();
    assert!(logger.path().is_none());

    logger.debug("d").unwrap();
    logger.info("i").unwrap();
    logger.warn("w").unwrap();
    logger.error("e").unwrap();
    logger.shutdown().unwrap();

    let lines = capture.lines();
    let tags: Vec<&str> = lines
        .iter()
        .map(|l| l.split("] [").nth(1).unwrap().split(']').next().unwrap())
        .collect();
    assert_eq!(tags, ["INFO", "DEBUG", "INFO", "WARNING", "ERROR"]);
}

#[test]
fn test_logging_after_shutdown_is_closed() {
    let mut logger = Logger::builder("closed")
        .file(false)
        .console(false)
        .build()
        .unwrap();
    logger.shutdown().unwrap();
    logger.shutdown().unwrap();
    assert!(matches!(logger.info("late"), Err(LogError::Closed)));
}

#[test]
fn test_failing_sink_does_not_stop_others() {
    let capture = Capture::default();
    let mut logger = Logger::builder("broken")
        .file(false)
        .console(false)
        .sink(Broken)
        .sink(capture.clone())
        .build()
        .unwrap();
    logger.info("still written").unwrap();
    logger.shutdown().unwrap();
    assert_eq!(capture.lines().len(), 2);
}

#[test]
fn test_missing_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, b"").unwrap();

    let err = Logger::builder("x")
        .dir(&file)
        .console(false)
        .build()
        .unwrap_err();
    assert!(matches!(err, LogError::Io(_)));
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_many_producers_lose_nothing() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 500;

    let capture = Capture::default();
    let logger = Arc::new(
        Logger::builder("mp")
            .file(false)
            .console(false)
            .sink(capture.clone())
            .build()
            .unwrap(),
    );

    let producers: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = logger.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    logger.info(format_args!("{t} {i}")).unwrap();
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }
    let mut logger = Arc::into_inner(logger).unwrap();
    logger.shutdown().unwrap();

    let lines = capture.lines();
    assert_eq!(lines.len(), 1 + THREADS * PER_THREAD);
    // Per-producer order is kept.
    for t in 0..THREADS {
        let seq: Vec<usize> = lines[1..]
            .iter()
            .filter_map(|l| {
                let (producer, i) = message(l).split_once(' ').unwrap();
                (producer.parse::<usize>().unwrap() == t).then(|| i.parse().unwrap())
            })
            .collect();
        assert_eq!(seq, (0..PER_THREAD).collect::<Vec<_>>());
    }
}
