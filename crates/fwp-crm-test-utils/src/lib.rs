//! Test helpers shared across FWP CRM crates.

pub mod blob;
pub mod fixtures;
pub mod primary;

pub use blob::FlakyBlobStore;
pub use fixtures::{memory_secondary, record_with_image, sample_record, sample_shipping};
pub use primary::{FailingPrimary, StubPrimary};
