#![allow(dead_code)]
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use std::rc::Rc;
use uslm_ingest::ingest::{SectionStore, StatuteRecord, UpsertOutcome};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub fn fixtures_dir() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures")
}

pub fn load_fixture(filename: &str) -> String {
    let path = Path::new(fixtures_dir()).join(filename);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e))
}

/// In-memory ZIP; names ending in `/` become directory entries.
pub fn build_zip(entries: &[(&str, &str)], method: CompressionMethod) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(method);
    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// In-memory store keyed by identifier. Identifiers listed in `failing` are
/// rejected.
#[derive(Default)]
pub struct MemoryStore {
    pub records: HashMap<String, StatuteRecord>,
    pub upserts: Vec<String>,
    pub failing: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(identifiers: &[&str]) -> Self {
        Self {
            failing: identifiers.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl SectionStore for MemoryStore {
    fn upsert(&mut self, record: StatuteRecord) -> Result<UpsertOutcome, String> {
        let identifier = record.identifier().to_string();
        if self.failing.contains(&identifier) {
            return Err("constraint violation".to_string());
        }
        self.upserts.push(identifier.clone());
        match self.records.insert(identifier, record) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Inserted),
        }
    }
}

/// Reader that reports how many bytes it has handed out so far.
pub struct CountingReader<R> {
    inner: R,
    consumed: Rc<Cell<usize>>,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> (Self, Rc<Cell<usize>>) {
        let consumed = Rc::new(Cell::new(0));
        (
            Self {
                inner,
                consumed: Rc::clone(&consumed),
            },
            consumed,
        )
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed.set(self.consumed.get() + n);
        Ok(n)
    }
}

/// Reader that fails once `limit` bytes have been read.
pub struct FailingReader<R> {
    inner: R,
    remaining: usize,
}

impl<R: Read> FailingReader<R> {
    pub fn new(inner: R, limit: usize) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }
}

impl<R: Read> Read for FailingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
        }
        let len = buf.len().min(self.remaining);
        let n = self.inner.read(&mut buf[..len])?;
        self.remaining -= n;
        Ok(n)
    }
}
