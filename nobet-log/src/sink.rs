//! Destinations for formatted lines.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A destination the drain thread writes lines to.
///
/// Sinks are owned by the drain thread, so they need to be `Send` but not
/// `Sync`.
pub trait Sink: Send {
    /// Write one line; `line` carries no trailing newline.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Push buffered output to its destination.
    fn flush(&mut self) -> io::Result<()>;
}

/// Writes lines to standard output.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(io::stdout().lock(), "{line}")
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// Appends lines to a file, creating it if missing.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Open `path` in append mode.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// File being appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        let mut sink = FileSink::open(&path).unwrap();
        sink.write_line("first").unwrap();
        sink.flush().unwrap();
        drop(sink);

        let mut sink = FileSink::open(&path).unwrap();
        assert_eq!(sink.path(), path);
        sink.write_line("second").unwrap();
        sink.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
