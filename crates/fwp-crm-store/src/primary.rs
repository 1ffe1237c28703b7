//! Primary tier: asynchronous SQLite storage with a lazily opened connection.
//!
//! Every failure here is a routing signal for the customer store, which falls
//! back to the secondary tier instead of giving up.

use crate::error::StoreError;
use crate::model::CustomerRecord;
use async_trait::async_trait;
use fwp_crm_config::PrimaryConfig;
use log::{debug, info, warn};
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OpenFlags, params};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS customers (
    id TEXT PRIMARY KEY NOT NULL,
    created_at INTEGER NOT NULL,
    record_json TEXT NOT NULL
);";

#[async_trait]
/// Higher-capacity record storage that may be unavailable at any time.
pub trait PrimaryStore: Send + Sync {
    /// Load every stored record.
    async fn get_all(&self) -> Result<Vec<CustomerRecord>, StoreError>;

    /// Insert a record; fails if the id already exists.
    async fn add(&self, record: &CustomerRecord) -> Result<(), StoreError>;

    /// Insert or replace a record; an existing record keeps its `created_at`.
    async fn update(&self, record: &CustomerRecord) -> Result<(), StoreError>;

    /// Delete a record; a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Delete every record.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// SQLite-backed primary tier.
///
/// The connection is opened on first use and reused until the store is
/// dropped. A failed open is not cached, so a later call tries again.
pub struct SqlitePrimaryStore {
    path: PathBuf,
    open_timeout: Duration,
    connection: OnceCell<Arc<Mutex<Connection>>>,
}

impl SqlitePrimaryStore {
    /// Create a store for the database at `path`; nothing is opened yet.
    pub fn new(path: impl AsRef<Path>, open_timeout: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            open_timeout,
            connection: OnceCell::new(),
        }
    }

    pub fn from_config(config: &PrimaryConfig) -> Self {
        Self::new(
            config.resolved_path(),
            Duration::from_millis(config.open_timeout_ms),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the connection has been opened.
    pub fn is_open(&self) -> bool {
        self.connection.initialized()
    }

    /// Shared connection, opening it within the configured timeout.
    async fn connection(&self) -> Result<Arc<Mutex<Connection>>, StoreError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let path = self.path.clone();
                let open = tokio::task::spawn_blocking(move || open_connection(&path));
                match tokio::time::timeout(self.open_timeout, open).await {
                    Ok(Ok(Ok(connection))) => {
                        info!("opened primary store (path={})", self.path.display());
                        Ok(Arc::new(Mutex::new(connection)))
                    }
                    Ok(Ok(Err(err))) => Err(err),
                    Ok(Err(err)) => Err(StoreError::StoreUnavailable(format!(
                        "open task failed: {err}"
                    ))),
                    Err(_) => Err(StoreError::StoreUnavailable(format!(
                        "open timed out after {}ms",
                        self.open_timeout.as_millis()
                    ))),
                }
            })
            .await?;
        Ok(connection.clone())
    }

    /// Run a statement against the shared connection on the blocking pool.
    async fn run<T, F>(&self, on_join_error: fn(String) -> StoreError, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let connection = self.connection().await?;
        tokio::task::spawn_blocking(move || {
            let guard = connection.lock();
            op(&guard)
        })
        .await
        .map_err(|err| on_join_error(format!("primary store task failed: {err}")))?
    }
}

#[async_trait]
impl PrimaryStore for SqlitePrimaryStore {
    async fn get_all(&self) -> Result<Vec<CustomerRecord>, StoreError> {
        let records = self
            .run(StoreError::ReadFailure, |connection| {
                let mut statement = connection
                    .prepare("SELECT id, record_json FROM customers ORDER BY created_at DESC, rowid")
                    .map_err(read_failure)?;
                let rows = statement
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
                    .map_err(read_failure)?;
                let mut records = Vec::new();
                for row in rows {
                    let (id, json) = row.map_err(read_failure)?;
                    match serde_json::from_str::<CustomerRecord>(&json) {
                        Ok(record) => records.push(record),
                        Err(err) => warn!("invalid primary record ignored (id={id}): {err}"),
                    }
                }
                Ok(records)
            })
            .await?;
        debug!("primary store read (records={})", records.len());
        Ok(records)
    }

    async fn add(&self, record: &CustomerRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let id = record.id.clone();
        let created_at = record.created_at;
        self.run(StoreError::WriteFailure, move |connection| {
            match connection.execute(
                "INSERT INTO customers (id, created_at, record_json) VALUES (?1, ?2, ?3)",
                params![&id, created_at, &json],
            ) {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::WriteFailure(format!(
                        "record already exists: {id}"
                    )))
                }
                Err(err) => Err(write_failure(err)),
            }
        })
        .await?;
        debug!("primary store added record (id={})", record.id);
        Ok(())
    }

    async fn update(&self, record: &CustomerRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let id = record.id.clone();
        let created_at = record.created_at;
        self.run(StoreError::WriteFailure, move |connection| {
            connection
                .execute(
                    "INSERT INTO customers (id, created_at, record_json) VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO UPDATE SET
                         record_json = json_set(
                             excluded.record_json, '$.createdAt', customers.created_at
                         )",
                    params![&id, created_at, &json],
                )
                .map_err(write_failure)?;
            Ok(())
        })
        .await?;
        debug!("primary store updated record (id={})", record.id);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let key = id.to_string();
        let removed = self
            .run(StoreError::WriteFailure, move |connection| {
                connection
                    .execute("DELETE FROM customers WHERE id = ?1", params![&key])
                    .map_err(write_failure)
            })
            .await?;
        debug!("primary store delete (id={id}, removed={removed})");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let removed = self
            .run(StoreError::WriteFailure, |connection| {
                connection
                    .execute("DELETE FROM customers", [])
                    .map_err(write_failure)
            })
            .await?;
        info!("primary store cleared (removed={removed})");
        Ok(())
    }
}

/// Primary tier for environments where it is switched off.
#[derive(Debug, Clone, Default)]
pub struct DisabledPrimaryStore;

impl DisabledPrimaryStore {
    fn unavailable<T>() -> Result<T, StoreError> {
        Err(StoreError::StoreUnavailable(
            "primary store disabled by configuration".to_string(),
        ))
    }
}

#[async_trait]
impl PrimaryStore for DisabledPrimaryStore {
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

/// Open the database file and make sure the schema exists.
fn open_connection(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| {
            StoreError::StoreUnavailable(format!(
                "cannot create {}: {err}",
                parent.display()
            ))
        })?;
    }
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(path, flags)
        .map_err(|err| StoreError::StoreUnavailable(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_secs(5))
        .map_err(|err| StoreError::StoreUnavailable(err.to_string()))?;
    connection
        .execute_batch(SCHEMA)
        .map_err(|err| StoreError::StoreUnavailable(err.to_string()))?;
    Ok(connection)
}

fn read_failure(err: rusqlite::Error) -> StoreError {
    StoreError::ReadFailure(err.to_string())
}

fn write_failure(err: rusqlite::Error) -> StoreError {
    StoreError::WriteFailure(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::{DisabledPrimaryStore, PrimaryStore, SqlitePrimaryStore};
    use crate::error::StoreError;
    use crate::model::{CustomerRecord, Gender};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::tempdir;

    fn record(id: &str, created_at: i64) -> CustomerRecord {
        CustomerRecord::new(id, format!("customer {id}"), Gender::Male, created_at)
    }

    fn open_store(dir: &std::path::Path) -> SqlitePrimaryStore {
        SqlitePrimaryStore::new(dir.join("db").join("customers.sqlite3"), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn opens_lazily_and_reuses_connection() {
        let temp = tempdir().expect("tempdir");
        let store = open_store(temp.path());
        assert!(!store.is_open());

        store.add(&record("a", 1)).await.expect("add");
        assert!(store.is_open());
        assert_eq!(store.get_all().await.expect("get_all"), vec![record("a", 1)]);
    }

    #[tokio::test]
    async fn add_rejects_existing_id_but_update_upserts() {
        let temp = tempdir().expect("tempdir");
        let store = open_store(temp.path());
        store.add(&record("a", 1)).await.expect("add");

        let err = store.add(&record("a", 1)).await.expect_err("duplicate");
        assert!(matches!(err, StoreError::WriteFailure(_)));

        let mut changed = record("a", 1);
        changed.name = "changed".to_string();
        store.update(&changed).await.expect("update existing");
        store.update(&record("b", 2)).await.expect("update inserts");

        let records = store.get_all().await.expect("get_all");
        assert_eq!(records, vec![record("b", 2), changed]);
    }

    #[tokio::test]
    async fn delete_and_clear_tolerate_missing_records() {
        let temp = tempdir().expect("tempdir");
        let store = open_store(temp.path());
        store.delete("missing").await.expect("delete missing");
        store.add(&record("a", 1)).await.expect("add");
        store.add(&record("b", 2)).await.expect("add");
        store.delete("a").await.expect("delete");
        assert_eq!(store.get_all().await.expect("get_all"), vec![record("b", 2)]);
        store.clear().await.expect("clear");
        assert!(store.get_all().await.expect("get_all").is_empty());
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let temp = tempdir().expect("tempdir");
        open_store(temp.path())
            .add(&record("a", 1))
            .await
            .expect("add");
        let reopened = open_store(temp.path());
        assert_eq!(reopened.get_all().await.expect("get_all"), vec![record("a", 1)]);
    }

    #[tokio::test]
    async fn unopenable_path_reports_unavailable() {
        let temp = tempdir().expect("tempdir");
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").expect("write blocker");
        let store = SqlitePrimaryStore::new(blocker.join("customers.sqlite3"), Duration::from_secs(5));

        let err = store.get_all().await.expect_err("unavailable");
        assert!(matches!(err, StoreError::StoreUnavailable(_)));
        assert!(!store.is_open());
    }

    #[tokio::test]
    async fn open_exceeding_timeout_reports_unavailable() {
        let temp = tempdir().expect("tempdir");
        let store = SqlitePrimaryStore::new(
            temp.path().join("customers.sqlite3"),
            Duration::from_nanos(1),
        );

        let err = store.get_all().await.expect_err("timed out");
        match err {
            StoreError::StoreUnavailable(message) => {
                assert!(message.contains("open timed out"), "{message}")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!store.is_open());
    }

    #[tokio::test]
    async fn failed_open_is_retried_on_next_call() {
        let temp = tempdir().expect("tempdir");
        let blocker = temp.path().join("db");
        std::fs::write(&blocker, b"file").expect("write blocker");
        let store = open_store(temp.path());

        assert!(store.add(&record("a", 1)).await.is_err());
        assert!(!store.is_open());

        std::fs::remove_file(&blocker).expect("remove blocker");
        store.add(&record("a", 1)).await.expect("add after retry");
        assert!(store.is_open());
        assert_eq!(store.get_all().await.expect("get_all"), vec![record("a", 1)]);
    }

    #[tokio::test]
    async fn update_keeps_original_created_at() {
        let temp = tempdir().expect("tempdir");
        let store = open_store(temp.path());
        store.add(&record("a", 1_000)).await.expect("add");
        store.add(&record("b", 2_000)).await.expect("add");

        let mut moved = record("a", 9_000);
        moved.name = "renamed".to_string();
        store.update(&moved).await.expect("update");

        let records = store.get_all().await.expect("get_all");
        assert_eq!(records[0].id, "b");
        assert_eq!(records[1].name, "renamed");
        assert_eq!(records[1].created_at, 1_000);
    }

    #[tokio::test]
    async fn disabled_store_is_always_unavailable() {
        let store = DisabledPrimaryStore;
        assert!(matches!(
            store.get_all().await,
            Err(StoreError::StoreUnavailable(_))
        ));
        assert!(matches!(
            store.add(&record("a", 1)).await,
            Err(StoreError::StoreUnavailable(_))
        ));
    }
}
