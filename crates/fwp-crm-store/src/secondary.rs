//! Secondary tier: synchronous, quota-bounded blob storage.
//!
//! All records live in a single JSON blob under a well-known key. Writes that
//! exceed the quota get one retry with the target record's heavy payload
//! dropped.

use crate::error::{BlobError, StoreError};
use crate::model::CustomerRecord;
use fwp_crm_config::{DEFAULT_QUOTA_BYTES, DEFAULT_STORAGE_KEY, SecondaryConfig};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Key-indexed text storage with a hard capacity limit.
///
/// Usage counts the bytes of every stored key and value.
pub trait BlobStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, BlobError>;
    /// Replace the value under `key`, failing if total usage would exceed the quota.
    fn set(&self, key: &str, value: &str) -> Result<(), BlobError>;
    /// Remove `key`; a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), BlobError>;
    /// Capacity in bytes.
    fn quota(&self) -> usize;
}

/// File-backed blob storage with one file per key.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    /// Directory holding the blob files.
    root: PathBuf,
    quota: usize,
}

impl FileBlobStore {
    /// Create a blob store under the given root.
    pub fn new(root: impl AsRef<Path>, quota: usize) -> Result<Self, BlobError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!(
            "initialized file blob store (root={}, quota={quota})",
            root.display()
        );
        Ok(Self { root, quota })
    }

    /// Path to the blob file for a key.
    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Path to the temporary file used while rewriting a blob.
    fn temp_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json.tmp"))
    }

    /// Bytes used by every key other than `key`.
    fn usage_excluding(&self, key: &str) -> Result<usize, BlobError> {
        let mut total = 0usize;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(other) = file_name.to_str().and_then(|name| name.strip_suffix(".json"))
            else {
                continue;
            };
            if other == key {
                continue;
            }
            let len = usize::try_from(entry.metadata()?.len()).unwrap_or(usize::MAX);
            total = total.saturating_add(other.len()).saturating_add(len);
        }
        Ok(total)
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, BlobError> {
        match fs::read_to_string(self.blob_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(BlobError::Io(err)),
        }
    }

    /// Rewrite a blob atomically after checking the quota.
    fn set(&self, key: &str, value: &str) -> Result<(), BlobError> {
        let required = self
            .usage_excluding(key)?
            .saturating_add(key.len())
            .saturating_add(value.len());
        if required > self.quota {
            return Err(BlobError::QuotaExceeded {
                required,
                quota: self.quota,
            });
        }
        let temp_path = self.temp_path(key);
        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(temp_path, self.blob_path(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BlobError> {
        match fs::remove_file(self.blob_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(BlobError::Io(err)),
        }
    }

    fn quota(&self) -> usize {
        self.quota
    }
}

/// In-process blob storage, mainly for tests and ephemeral sessions.
#[derive(Debug)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, String>>,
    quota: usize,
}

impl MemoryBlobStore {
    pub fn new(quota: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota,
        }
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTA_BYTES)
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, BlobError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BlobError> {
        let mut entries = self.entries.lock();
        let others: usize = entries
            .iter()
            .filter(|(other, _)| other.as_str() != key)
            .map(|(other, stored)| other.len() + stored.len())
            .sum();
        let required = others + key.len() + value.len();
        if required > self.quota {
            return Err(BlobError::QuotaExceeded {
                required,
                quota: self.quota,
            });
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BlobError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn quota(&self) -> usize {
        self.quota
    }
}

/// Customer records kept in one blob of a [`BlobStore`].
#[derive(Clone)]
pub struct SecondaryStore {
    backend: Arc<dyn BlobStore>,
    key: String,
}

impl SecondaryStore {
    /// Store records under the default well-known key.
    pub fn new(backend: Arc<dyn BlobStore>) -> Self {
        Self::with_key(backend, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(backend: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Build a file-backed secondary tier from configuration.
    pub fn from_config(config: &SecondaryConfig) -> Result<Self, StoreError> {
        let backend = FileBlobStore::new(config.resolved_root(), config.quota_bytes)
            .map_err(|err| StoreError::StoreUnavailable(err.to_string()))?;
        Ok(Self::with_key(Arc::new(backend), config.storage_key.clone()))
    }

    /// Key addressing the records blob.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// All stored records; an unreadable blob is treated as empty.
    pub fn get_all(&self) -> Vec<CustomerRecord> {
        match self.load() {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    "secondary store unreadable, treating as empty (key={}): {err}",
                    self.key
                );
                Vec::new()
            }
        }
    }

    /// Upsert a record, dropping its heavy payload once if the quota is hit.
    ///
    /// An existing record keeps its original `created_at`.
    pub fn save(&self, record: &CustomerRecord) -> Result<(), StoreError> {
        let mut records = self.load_for_write()?;
        match records.iter().position(|existing| existing.id == record.id) {
            Some(index) => {
                let created_at = records[index].created_at;
                records[index] = record.clone();
                records[index].created_at = created_at;
            }
            None => records.push(record.clone()),
        }
        match self.write(&records) {
            Ok(()) => {
                debug!(
                    "secondary store saved record (id={}, total={})",
                    record.id,
                    records.len()
                );
                Ok(())
            }
            Err(StoreError::QuotaExceeded { required, quota }) => {
                self.save_degraded(records, &record.id, required, quota)
            }
            Err(err) => Err(err),
        }
    }

    /// Retry a quota-rejected write once with the target's payload removed.
    fn save_degraded(
        &self,
        mut records: Vec<CustomerRecord>,
        id: &str,
        required: usize,
        quota: usize,
    ) -> Result<(), StoreError> {
        let target = records
            .iter_mut()
            .find(|existing| existing.id == id)
            .filter(|existing| existing.has_heavy_payload());
        let Some(target) = target else {
            warn!(
                "secondary store quota exceeded with no payload to drop (id={id}, required={required}, quota={quota})"
            );
            return Err(StoreError::QuotaExceeded { required, quota });
        };
        warn!(
            "secondary store quota exceeded, dropping heavy payload (id={id}, required={required}, quota={quota})"
        );
        target.drop_heavy_payload();
        self.write(&records)?;
        info!("secondary store saved degraded record (id={id})");
        Ok(())
    }

    /// Remove a record; a missing id is a successful no-op.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.load_for_write()?;
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            debug!("secondary store delete found nothing (id={id})");
            return Ok(());
        }
        self.write(&records)
    }

    /// Remove the records blob entirely.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove(&self.key)?;
        Ok(())
    }

    fn load(&self) -> Result<Vec<CustomerRecord>, StoreError> {
        let raw = self
            .backend
            .get(&self.key)
            .map_err(|err| StoreError::ReadFailure(err.to_string()))?;
        match raw {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Current records for a rewrite. A corrupt blob may be overwritten; a
    /// failed read must not be, or every record in it would be lost.
    fn load_for_write(&self) -> Result<Vec<CustomerRecord>, StoreError> {
        match self.load() {
            Err(StoreError::Serialization(err)) => {
                warn!(
                    "secondary store blob is corrupt and will be replaced (key={}): {err}",
                    self.key
                );
                Ok(Vec::new())
            }
            other => other,
        }
    }

    fn write(&self, records: &[CustomerRecord]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(records)?;
        self.backend.set(&self.key, &raw)?;
        Ok(())
    }
}
