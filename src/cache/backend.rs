//! Key/value backend contract used by the manifest cache.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Failures raised by a cache backend.
///
/// None of these are surfaced to HTTP callers; the resolver degrades to the
/// durable store instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache backend `{backend}` is unavailable")]
    Unavailable { backend: &'static str },
    #[error("cache operation `{op}` timed out after {limit_ms}ms")]
    Timeout { op: &'static str, limit_ms: u64 },
    #[error("cache entry `{key}` could not be decoded: {message}")]
    Codec { key: String, message: String },
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// External key/value store with per-key expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short identifier reported by the stats endpoints.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    /// Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Live keys starting with `prefix`, in lexical order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError>;

    /// Remaining lifetime; `None` when the key is absent or never expires.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;

    /// Backend-reported footprint of an entry, when the backend can tell.
    async fn memory_usage(&self, _key: &str) -> Result<Option<u64>, CacheError> {
        Ok(None)
    }
}

/// Backend installed when caching is switched off; every call reports an outage.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledBackend;

const DISABLED: CacheError = CacheError::Unavailable {
    backend: "disabled",
};

#[async_trait]
impl CacheBackend for DisabledBackend {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Err(DISABLED)
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheError> {
        Err(DISABLED)
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Err(DISABLED)
    }

    async fn keys(&self, _prefix: &str) -> Result<Vec<String>, CacheError> {
        Err(DISABLED)
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, CacheError> {
        Err(DISABLED)
    }
}
