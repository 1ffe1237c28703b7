//! Dual-tier local persistence for FWP customer order records.
//!
//! Writes go to the primary (SQLite) tier first and fall back to the
//! quota-bounded secondary tier when the primary cannot take them. Reads
//! always consult both tiers and reconcile the results into one view.

pub mod error;
pub mod model;
pub mod orchestrator;
pub mod primary;
pub mod reconcile;
pub mod secondary;

/// Store error types.
pub use error::{BlobError, StoreError};
/// Customer record model.
pub use model::{
    Bazi, CartItem, CrystalAnalysis, CustomerRecord, FiveElements, Gender,
    PAYLOAD_DROPPED_MARKER, ShippingDetails, WishItem,
};
/// Caller-facing store.
pub use orchestrator::CustomerStore;
/// Primary tier interface and implementations.
pub use primary::{DisabledPrimaryStore, PrimaryStore, SqlitePrimaryStore};
/// Merge of both tiers into one view.
pub use reconcile::reconcile;
/// Secondary tier adapter and blob backends.
pub use secondary::{BlobStore, FileBlobStore, MemoryBlobStore, SecondaryStore};
