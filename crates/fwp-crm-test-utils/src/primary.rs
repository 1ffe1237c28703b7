use async_trait::async_trait;
use fwp_crm_store::{CustomerRecord, PrimaryStore, StoreError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Primary tier whose connection can never be opened.
#[derive(Debug, Clone, Default)]
pub struct FailingPrimary;

impl FailingPrimary {
    pub fn new() -> Self {
        Self
    }

    fn unavailable<T>() -> Result<T, StoreError> {
        Err(StoreError::StoreUnavailable("forced open failure".to_string()))
    }
}

#[async_trait]
impl PrimaryStore for FailingPrimary {
    async fn get_all(&self) -> Result<Vec<CustomerRecord>, StoreError> {
        Self::unavailable()
    }

    async fn add(&self, _record: &CustomerRecord) -> Result<(), StoreError> {
        Self::unavailable()
    }

    async fn update(&self, _record: &CustomerRecord) -> Result<(), StoreError> {
        Self::unavailable()
    }

    async fn delete(&self, _id: &str) -> Result<(), StoreError> {
        Self::unavailable()
    }

    async fn clear(&self) -> Result<(), StoreError> {
        Self::unavailable()
    }
}

/// In-memory primary tier that records calls and can be switched to fail.
#[derive(Debug, Default)]
pub struct StubPrimary {
    records: Mutex<Vec<CustomerRecord>>,
    calls: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl StubPrimary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<CustomerRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail with a write or read failure.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Operation names in call order, e.g. `add:a`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn records(&self) -> Vec<CustomerRecord> {
        self.records.lock().clone()
    }

    fn enter(&self, call: String) -> bool {
        self.calls.lock().push(call);
        self.failing.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrimaryStore for StubPrimary {
    async fn get_all(&self) -> Result<Vec<CustomerRecord>, StoreError> {
        if self.enter("get_all".to_string()) {
            return Err(StoreError::ReadFailure("forced read failure".to_string()));
        }
        Ok(self.records())
    }

    async fn add(&self, record: &CustomerRecord) -> Result<(), StoreError> {
        if self.enter(format!("add:{}", record.id)) {
            return Err(StoreError::WriteFailure("forced write failure".to_string()));
        }
        let mut records = self.records.lock();
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::WriteFailure(format!(
                "record already exists: {}",
                record.id
            )));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn update(&self, record: &CustomerRecord) -> Result<(), StoreError> {
        if self.enter(format!("update:{}", record.id)) {
            return Err(StoreError::WriteFailure("forced write failure".to_string()));
        }
        let mut records = self.records.lock();
        match records.iter().position(|existing| existing.id == record.id) {
            Some(index) => {
                let created_at = records[index].created_at;
                records[index] = record.clone();
                records[index].created_at = created_at;
            }
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        if self.enter(format!("delete:{id}")) {
            return Err(StoreError::WriteFailure("forced write failure".to_string()));
        }
        self.records.lock().retain(|record| record.id != id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        if self.enter("clear".to_string()) {
            return Err(StoreError::WriteFailure("forced write failure".to_string()));
        }
        self.records.lock().clear();
        Ok(())
    }
}
