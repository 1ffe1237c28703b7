use fwp_crm_store::{BlobError, BlobStore, MemoryBlobStore};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory blob store whose reads can be switched to fail with an IO error.
#[derive(Debug)]
pub struct FlakyBlobStore {
    inner: MemoryBlobStore,
    failing_reads: AtomicBool,
}

impl FlakyBlobStore {
    pub fn new(quota: usize) -> Self {
        Self {
            inner: MemoryBlobStore::new(quota),
            failing_reads: AtomicBool::new(false),
        }
    }

    pub fn set_failing_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }
}

impl BlobStore for FlakyBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, BlobError> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(BlobError::Io(io::Error::other("forced read failure")));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BlobError> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), BlobError> {
        self.inner.remove(key)
    }

    fn quota(&self) -> usize {
        self.inner.quota()
    }
}
