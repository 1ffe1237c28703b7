//! Handlers for each CLI subcommand.

use anyhow::{Context, bail};
use chrono::Utc;
use fwp_crm::store::{CustomerRecord, CustomerStore, ShippingDetails};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

pub(crate) async fn list(
    store: &CustomerStore,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let records = store.get_all_customers().await;
    if json {
        serde_json::to_writer_pretty(&mut *out, &records)?;
        writeln!(out)?;
        return Ok(());
    }
    for record in &records {
        writeln!(out, "{}", format_row(record))?;
    }
    writeln!(out, "{} customer(s)", records.len())?;
    Ok(())
}

pub(crate) async fn show(
    store: &CustomerStore,
    id: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let record = store
        .get_customer(id)
        .await
        .with_context(|| format!("no customer with id {id}"))?;
    serde_json::to_writer_pretty(&mut *out, &record)?;
    writeln!(out)?;
    Ok(())
}

pub(crate) async fn add(
    store: &CustomerStore,
    file: &Path,
    new_id: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut value: Value = read_json(file)?;
    if new_id {
        let object = value
            .as_object_mut()
            .with_context(|| format!("{} does not hold a JSON object", file.display()))?;
        object.insert("id".to_string(), Value::from(Uuid::new_v4().to_string()));
        object.insert("createdAt".to_string(), Value::from(Utc::now().timestamp_millis()));
    }
    let record: CustomerRecord = serde_json::from_value(value)
        .with_context(|| format!("{} is not a customer record", file.display()))?;
    store.add_customer(&record).await?;
    writeln!(out, "added {}", record.id)?;
    Ok(())
}

pub(crate) async fn update(
    store: &CustomerStore,
    file: &Path,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let record: CustomerRecord = read_json(file)?;
    store.update_customer(&record).await?;
    writeln!(out, "updated {}", record.id)?;
    Ok(())
}

/// Attach shipping details, completing the order.
pub(crate) async fn ship(
    store: &CustomerStore,
    id: &str,
    file: &Path,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut record = store
        .get_customer(id)
        .await
        .with_context(|| format!("no customer with id {id}"))?;
    let details: ShippingDetails = read_json(file)?;
    record.shipping_details = Some(details);
    store.update_customer(&record).await?;
    writeln!(out, "completed {id}")?;
    Ok(())
}

pub(crate) async fn delete(
    store: &CustomerStore,
    id: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    store.delete_customer(id).await;
    writeln!(out, "deleted {id}")?;
    Ok(())
}

pub(crate) async fn clear(
    store: &CustomerStore,
    yes: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if !yes {
        bail!("refusing to clear the store without --yes");
    }
    store.clear_all().await;
    writeln!(out, "cleared")?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    debug!("reading JSON input (path={})", path.display());
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

/// One tab-separated listing line.
fn format_row(record: &CustomerRecord) -> String {
    let created = record
        .created_at_utc()
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| record.created_at.to_string());
    let status = if record.is_completed() {
        "completed"
    } else {
        "pending"
    };
    let mut row = format!("{}\t{created}\t{}\t{status}", record.id, record.name);
    if record.is_degraded() {
        row.push_str("\timage dropped");
    }
    row
}

#[cfg(test)]
mod tests {
    use super::{add, clear, format_row, list, ship};
    use fwp_crm::store::{
        CustomerRecord, CustomerStore, DisabledPrimaryStore, Gender, MemoryBlobStore,
        SecondaryStore,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn memory_store() -> CustomerStore {
        CustomerStore::new(
            Arc::new(DisabledPrimaryStore),
            SecondaryStore::new(Arc::new(MemoryBlobStore::default())),
        )
    }

    #[test]
    fn row_shows_status_and_degradation() {
        let mut record = CustomerRecord::new("a", "Amy", Gender::Female, 0);
        assert_eq!(format_row(&record), "a\t1970-01-01 00:00\tAmy\tpending");

        record.generated_image_url = Some("data".to_string());
        let record = record.without_heavy_payload();
        assert!(format_row(&record).ends_with("\timage dropped"));
    }

    #[tokio::test]
    async fn add_with_new_id_assigns_identity() {
        let temp = tempdir().expect("tempdir");
        let file = temp.path().join("order.json");
        std::fs::write(
            &file,
            json!({
                "name": "Amy",
                "birthDate": "1990-01-01",
                "birthTime": "08:00",
                "gender": "女",
                "wishes": []
            })
            .to_string(),
        )
        .expect("write");
        let store = memory_store();
        let mut out = Vec::new();

        add(&store, &file, true, &mut out).await.expect("add");

        let records = store.get_all_customers().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].created_at > 0);
        let printed = String::from_utf8(out).expect("utf8");
        assert_eq!(printed, format!("added {}\n", records[0].id));
    }

    #[tokio::test]
    async fn ship_completes_existing_order() {
        let temp = tempdir().expect("tempdir");
        let file = temp.path().join("ship.json");
        std::fs::write(
            &file,
            json!({
                "realName": "Lin Mei",
                "phone": "0912345678",
                "storeCode": "123456",
                "storeName": "Xinyi",
                "socialId": "@lin",
                "wristSize": "15",
                "purificationBagQty": 0,
                "preferredColors": [],
                "totalQuantity": 1,
                "totalPrice": 1280
            })
            .to_string(),
        )
        .expect("write");
        let store = memory_store();
        store
            .add_customer(&CustomerRecord::new("a", "Amy", Gender::Female, 5))
            .await
            .expect("add");

        ship(&store, "a", &file, &mut Vec::new()).await.expect("ship");
        assert!(store.get_customer("a").await.expect("record").is_completed());

        let err = ship(&store, "missing", &file, &mut Vec::new())
            .await
            .expect_err("missing id");
        assert!(format!("{err}").contains("no customer with id missing"));
    }

    #[tokio::test]
    async fn clear_requires_confirmation() {
        let store = memory_store();
        store
            .add_customer(&CustomerRecord::new("a", "Amy", Gender::Female, 5))
            .await
            .expect("add");

        assert!(clear(&store, false, &mut Vec::new()).await.is_err());
        assert_eq!(store.get_all_customers().await.len(), 1);

        clear(&store, true, &mut Vec::new()).await.expect("clear");
        let mut out = Vec::new();
        list(&store, false, &mut out).await.expect("list");
        assert_eq!(String::from_utf8(out).expect("utf8"), "0 customer(s)\n");
    }
}
