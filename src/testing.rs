//! Test doubles shared by unit tests

use std::collections::HashMap;
use std::io::{self, Cursor, Seek, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::backend::{Backend, BackendError};
use crate::cache::{DiskSpace, FileCache, SpaceProbe};
use crate::config::CacheConfig;
use crate::stream::Stream;

const GB: u64 = 1024 * 1024 * 1024;

/// How `FakeBackend::open` hands out content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Spooled temp file, like a downloaded object
    TempFile,
    /// Bytes held in memory
    Memory,
    /// Opaque non-seekable reader
    Remote,
}

/// In-memory backend that counts calls
pub struct FakeBackend {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    delivery: Delivery,
    open_delay: Option<Duration>,
    open_calls: AtomicUsize,
    size_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new(delivery: Delivery) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            delivery,
            open_delay: None,
            open_calls: AtomicUsize::new(0),
            size_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_object(self, id: &str, data: &[u8]) -> Self {
        self.objects.lock().unwrap().insert(id.to_string(), data.to_vec());
        self
    }

    /// Sleep inside every `open`, simulating a slow download
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub fn size_calls(&self) -> usize {
        self.size_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn get(&self, id: &str) -> Result<Vec<u8>, BackendError> {
        self.objects
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }
}

impl Backend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn open(&self, id: &str) -> Result<Stream, BackendError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.open_delay {
            thread::sleep(delay);
        }
        let data = self.get(id)?;

        Ok(match self.delivery {
            Delivery::TempFile => {
                let mut tmp = NamedTempFile::new()?;
                tmp.write_all(&data)?;
                tmp.rewind()?;
                Stream::Temp(tmp)
            }
            Delivery::Memory => Stream::memory(data),
            Delivery::Remote => Stream::remote(Cursor::new(data)),
        })
    }

    fn size(&self, id: &str) -> Result<u64, BackendError> {
        self.size_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.get(id)?.len() as u64)
    }

    fn exists(&self, id: &str) -> Result<bool, BackendError> {
        Ok(self.objects.lock().unwrap().contains_key(id))
    }

    fn delete(&self, id: &str) -> Result<(), BackendError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }
}

/// Probe reporting a fixed capacity
pub struct FixedSpace(pub DiskSpace);

impl SpaceProbe for FixedSpace {
    fn measure(&self, _dir: &Path) -> io::Result<DiskSpace> {
        Ok(self.0)
    }
}

/// Probe that always fails
pub struct FailingProbe;

impl SpaceProbe for FailingProbe {
    fn measure(&self, _dir: &Path) -> io::Result<DiskSpace> {
        Err(io::Error::other("statvfs unavailable"))
    }
}

/// Half of a 100 GB disk free
pub fn plenty_of_space() -> FixedSpace {
    FixedSpace(DiskSpace {
        total: 100 * GB,
        available: 50 * GB,
    })
}

/// 1% of a 100 GB disk free, below the default 5% threshold
pub fn low_space() -> FixedSpace {
    FixedSpace(DiskSpace {
        total: 100 * GB,
        available: GB,
    })
}

/// Cache rooted at `dir` that always has room
pub fn cache_in(dir: &Path) -> Arc<FileCache> {
    Arc::new(FileCache::new(&CacheConfig::with_root(dir)).with_space_probe(plenty_of_space()))
}
