//! Caller-facing customer store routing between the two tiers.

use crate::error::StoreError;
use crate::model::CustomerRecord;
use crate::primary::{DisabledPrimaryStore, PrimaryStore, SqlitePrimaryStore};
use crate::reconcile::reconcile;
use crate::secondary::SecondaryStore;
use fwp_crm_config::StoreConfig;
use log::{debug, info, warn};
use std::sync::Arc;

/// Which primary write a mutation uses.
#[derive(Debug, Clone, Copy)]
enum WriteMode {
    Insert,
    Upsert,
}

impl WriteMode {
    fn label(self) -> &'static str {
        match self {
            WriteMode::Insert => "add",
            WriteMode::Upsert => "update",
        }
    }
}

/// Single logical customer record store over a primary and a secondary tier.
///
/// Mutations try the primary tier first and fall back to the secondary tier.
/// Reads merge both tiers. Only the failure of the last option for an
/// operation reaches the caller.
#[derive(Clone)]
pub struct CustomerStore {
    primary: Arc<dyn PrimaryStore>,
    secondary: SecondaryStore,
}

impl CustomerStore {
    pub fn new(primary: Arc<dyn PrimaryStore>, secondary: SecondaryStore) -> Self {
        Self { primary, secondary }
    }

    /// Build both tiers from configuration.
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let primary: Arc<dyn PrimaryStore> = if config.primary.enabled {
            let store = SqlitePrimaryStore::from_config(&config.primary);
            info!("primary store configured (path={})", store.path().display());
            Arc::new(store)
        } else {
            info!("primary store disabled; using secondary store only");
            Arc::new(DisabledPrimaryStore)
        };
        let secondary = SecondaryStore::from_config(&config.secondary)?;
        Ok(Self::new(primary, secondary))
    }

    pub fn secondary(&self) -> &SecondaryStore {
        &self.secondary
    }

    /// All visible records, newest first. Never fails.
    pub async fn get_all_customers(&self) -> Vec<CustomerRecord> {
        let primary = match self.primary.get_all().await {
            Ok(records) => records,
            Err(err) => {
                warn!("primary store read failed, relying on secondary store: {err}");
                Vec::new()
            }
        };
        let secondary = self.secondary.get_all();
        debug!(
            "merging tiers (primary={}, secondary={})",
            primary.len(),
            secondary.len()
        );
        reconcile(secondary, primary)
    }

    /// Look up one record in the merged view.
    pub async fn get_customer(&self, id: &str) -> Option<CustomerRecord> {
        self.get_all_customers()
            .await
            .into_iter()
            .find(|record| record.id == id)
    }

    /// Insert a new record.
    pub async fn add_customer(&self, record: &CustomerRecord) -> Result<(), StoreError> {
        self.write(record, WriteMode::Insert).await
    }

    /// Replace an existing record, or insert it if absent.
    pub async fn update_customer(&self, record: &CustomerRecord) -> Result<(), StoreError> {
        self.write(record, WriteMode::Upsert).await
    }

    /// Remove a record from both tiers. Failures are logged, never returned.
    pub async fn delete_customer(&self, id: &str) {
        if let Err(err) = self.primary.delete(id).await {
            warn!("primary store delete failed (id={id}): {err}");
        }
        if let Err(err) = self.secondary.delete(id) {
            warn!("secondary store delete failed (id={id}): {err}");
        }
        info!("customer deleted (id={id})");
    }

    /// Wipe both tiers, best effort.
    pub async fn clear_all(&self) {
        if let Err(err) = self.primary.clear().await {
            warn!("primary store clear failed: {err}");
        }
        if let Err(err) = self.secondary.clear() {
            warn!("secondary store clear failed: {err}");
        }
        info!("customer store cleared");
    }

    async fn write(&self, record: &CustomerRecord, mode: WriteMode) -> Result<(), StoreError> {
        let attempt = match mode {
            WriteMode::Insert => self.primary.add(record).await,
            WriteMode::Upsert => self.primary.update(record).await,
        };
        let primary_err = match attempt {
            Ok(()) => {
                debug!(
                    "customer {} stored in primary store (id={})",
                    mode.label(),
                    record.id
                );
                return Ok(());
            }
            Err(err) => err,
        };
        warn!(
            "primary store {} failed, falling back to secondary store (id={}): {primary_err}",
            mode.label(),
            record.id
        );
        match self.secondary.save(record) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(
                    "customer {} could not be persisted (id={}): {err}",
                    mode.label(),
                    record.id
                );
                Err(StoreError::NotPersisted {
                    id: record.id.clone(),
                    primary: primary_err.to_string(),
                    source: Box::new(err),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CustomerStore;
    use crate::model::{CustomerRecord, Gender};
    use crate::primary::{DisabledPrimaryStore, SqlitePrimaryStore};
    use crate::secondary::{MemoryBlobStore, SecondaryStore};
    use crate::error::StoreError;
    use fwp_crm_config::{PrimaryConfig, SecondaryConfig, StoreConfig};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn record(id: &str, created_at: i64) -> CustomerRecord {
        CustomerRecord::new(id, format!("customer {id}"), Gender::Female, created_at)
    }

    #[tokio::test]
    async fn primary_success_leaves_secondary_untouched() {
        let temp = tempdir().expect("tempdir");
        let primary = SqlitePrimaryStore::new(temp.path().join("c.sqlite3"), Duration::from_secs(5));
        let secondary = SecondaryStore::new(Arc::new(MemoryBlobStore::default()));
        let store = CustomerStore::new(Arc::new(primary), secondary.clone());

        store.add_customer(&record("a", 1_000)).await.expect("add");
        store.add_customer(&record("b", 2_000)).await.expect("add");

        assert!(secondary.get_all().is_empty());
        assert_eq!(
            store.get_all_customers().await,
            vec![record("b", 2_000), record("a", 1_000)]
        );
    }

    #[tokio::test]
    async fn duplicate_add_falls_back_without_duplicating_identity() {
        let temp = tempdir().expect("tempdir");
        let primary = SqlitePrimaryStore::new(temp.path().join("c.sqlite3"), Duration::from_secs(5));
        let secondary = SecondaryStore::new(Arc::new(MemoryBlobStore::default()));
        let store = CustomerStore::new(Arc::new(primary), secondary.clone());

        store.add_customer(&record("a", 1_000)).await.expect("add");
        store.add_customer(&record("a", 1_000)).await.expect("fallback add");

        assert_eq!(secondary.get_all().len(), 1);
        assert_eq!(store.get_all_customers().await, vec![record("a", 1_000)]);
    }

    #[tokio::test]
    async fn both_tiers_failing_reports_not_persisted() {
        let secondary = SecondaryStore::new(Arc::new(MemoryBlobStore::new(16)));
        let store = CustomerStore::new(Arc::new(DisabledPrimaryStore), secondary);

        let err = store
            .update_customer(&record("a", 1))
            .await
            .expect_err("not persisted");
        assert!(err.is_quota_exceeded());
        assert!(format!("{err}").contains("record a was not persisted"));
        assert!(store.get_all_customers().await.is_empty());
    }

    #[test]
    fn from_config_rejects_invalid_storage_key() {
        let temp = tempdir().expect("tempdir");
        let config = StoreConfig::builder()
            .data_dir(temp.path())
            .secondary(SecondaryConfig {
                path: Some(temp.path().join("backup").to_string_lossy().to_string()),
                storage_key: "../escape".to_string(),
                ..SecondaryConfig::default()
            })
            .build();

        let err = CustomerStore::from_config(&config).err().expect("invalid key");
        assert!(matches!(err, StoreError::Config(_)));
        assert!(!temp.path().join("backup").exists());
    }

    #[test]
    fn from_config_reports_unusable_secondary_root() {
        let temp = tempdir().expect("tempdir");
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"file").expect("write blocker");
        let config = StoreConfig::builder()
            .data_dir(temp.path())
            .secondary(SecondaryConfig {
                path: Some(blocker.to_string_lossy().to_string()),
                ..SecondaryConfig::default()
            })
            .build();

        let err = CustomerStore::from_config(&config).err().expect("unusable root");
        assert!(matches!(err, StoreError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn from_config_respects_disabled_primary() {
        let temp = tempdir().expect("tempdir");
        let config = StoreConfig::builder()
            .data_dir(temp.path())
            .primary(PrimaryConfig {
                enabled: false,
                ..PrimaryConfig::default()
            })
            .build();
        let store = CustomerStore::from_config(&config).expect("store");

        store.add_customer(&record("a", 1)).await.expect("add");
        assert_eq!(store.secondary().get_all(), vec![record("a", 1)]);
        assert!(!temp.path().join("customers.sqlite3").exists());
    }
}
