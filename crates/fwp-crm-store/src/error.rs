//! Error types for store operations.

/// Errors returned by the tier adapters and the customer store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A tier could not be opened.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    /// A read against an open tier failed.
    #[error("read failed: {0}")]
    ReadFailure(String),
    /// A write against an open tier failed.
    #[error("write failed: {0}")]
    WriteFailure(String),
    /// The secondary tier's capacity would be exceeded.
    #[error("storage quota exceeded (required={required} bytes, quota={quota} bytes)")]
    QuotaExceeded { required: usize, quota: usize },
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] fwp_crm_config::ConfigError),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Neither tier accepted the write.
    #[error("record {id} was not persisted (primary: {primary}): {source}")]
    NotPersisted {
        id: String,
        primary: String,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// The error of the last tier that was tried.
    pub fn last_resort(&self) -> &StoreError {
        match self {
            StoreError::NotPersisted { source, .. } => source.last_resort(),
            other => other,
        }
    }

    /// Whether the write ultimately failed on capacity.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self.last_resort(), StoreError::QuotaExceeded { .. })
    }
}

/// Errors returned by secondary tier blob backends.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The write would push total usage past the quota.
    #[error("quota exceeded (required={required} bytes, quota={quota} bytes)")]
    QuotaExceeded { required: usize, quota: usize },
}

impl From<BlobError> for StoreError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::QuotaExceeded { required, quota } => {
                StoreError::QuotaExceeded { required, quota }
            }
            BlobError::Io(err) => StoreError::WriteFailure(err.to_string()),
        }
    }
}
