//! Destinations for sweep reports and console output.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Where a sweep writes its results. Opened once per sweep.
pub trait ReportTarget {
    fn open(&self) -> io::Result<Box<dyn Write>>;

    /// Human-readable location, for log messages.
    fn describe(&self) -> String;
}

/// Plain-text report file, truncated on every sweep.
#[derive(Debug, Clone)]
pub struct FileReport {
    path: PathBuf,
}

impl FileReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportTarget for FileReport {
    fn open(&self) -> io::Result<Box<dyn Write>> {
        let file = File::create(&self.path)?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory sink whose writers all append to one shared buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryReport {
    buffer: Rc<RefCell<Vec<u8>>>,
}

impl MemoryReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writer(&self) -> Box<dyn Write> {
        Box::new(SharedWriter(Rc::clone(&self.buffer)))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.borrow()).into_owned()
    }
}

impl ReportTarget for MemoryReport {
    fn open(&self) -> io::Result<Box<dyn Write>> {
        self.buffer.borrow_mut().clear();
        Ok(self.writer())
    }

    fn describe(&self) -> String {
        "memory".to_owned()
    }
}

struct SharedWriter(Rc<RefCell<Vec<u8>>>);

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
