//! Read-only contract for the durable manifest store.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::manifest::ManifestType;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("manifest document not found at `{path}`")]
    NotFound { path: String },
    #[error("failed to read `{path}`")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{path}` does not contain valid JSON")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("reading `{path}` exceeded {limit_ms}ms")]
    Timeout { path: String, limit_ms: u64 },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Ground truth for manifest documents, written by an external producer.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    async fn read(&self, ty: ManifestType) -> Result<Value, StoreError>;

    /// Modification time of the backing document, if the store tracks one.
    async fn modified_at(&self, ty: ManifestType) -> Result<Option<OffsetDateTime>, StoreError>;
}
