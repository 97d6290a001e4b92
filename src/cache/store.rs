//! Manifest-aware view over a [`CacheBackend`].
//!
//! Every backend call is bounded by the configured operation timeout and
//! documents are encoded with their canonical serialization.

use std::{future::Future, sync::Arc, time::Duration};

use bytes::Bytes;
use serde_json::Value;
use tokio::time::timeout;

use crate::domain::{
    document::canonical_bytes,
    manifest::{MANIFEST_KEY_PREFIX, ManifestType},
};

use super::{
    backend::{CacheBackend, CacheError},
    config::CacheConfig,
};

/// Result of a populate attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Stored,
    SkippedOversize { size_bytes: usize },
}

#[derive(Clone)]
pub struct ManifestCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
}

impl ManifestCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Cached document for `ty`; a stored JSON `null` counts as absent.
    pub async fn load(&self, ty: ManifestType) -> Result<Option<Value>, CacheError> {
        let key = ty.cache_key();
        let Some(raw) = self.get_raw(&key).await? else {
            return Ok(None);
        };
        let value: Value = serde_json::from_slice(&raw).map_err(|err| CacheError::Codec {
            key,
            message: err.to_string(),
        })?;
        Ok((!value.is_null()).then_some(value))
    }

    pub async fn store(&self, ty: ManifestType, document: &Value) -> Result<StoreOutcome, CacheError> {
        let bytes = canonical_bytes(document);
        if bytes.len() > self.config.max_entry_bytes {
            return Ok(StoreOutcome::SkippedOversize {
                size_bytes: bytes.len(),
            });
        }
        let key = ty.cache_key();
        let ttl = self.config.default_ttl;
        self.timed("set", self.backend.set(&key, Bytes::from(bytes), ttl))
            .await?;
        Ok(StoreOutcome::Stored)
    }

    pub async fn get_raw(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        self.timed("get", self.backend.get(key)).await
    }

    /// Live keys under the manifest namespace.
    pub async fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.timed("keys", self.backend.keys(MANIFEST_KEY_PREFIX))
            .await
    }

    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        self.timed("ttl", self.backend.ttl(key)).await
    }

    pub async fn memory_usage(&self, key: &str) -> Result<Option<u64>, CacheError> {
        self.timed("memory_usage", self.backend.memory_usage(key))
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.timed("delete", self.backend.delete(key)).await
    }

    async fn timed<T, F>(&self, op: &'static str, call: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        let limit = self.config.operation_timeout;
        match timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                op,
                limit_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}
