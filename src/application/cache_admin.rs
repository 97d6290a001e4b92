//! Cache introspection and secured invalidation.

use futures::future::join_all;
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::{
    application::error::ManifestError,
    cache::{CacheError, ManifestCache},
    domain::{document::item_count, manifest::ManifestType},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub backend: &'static str,
    pub connected: bool,
    pub key_count: usize,
    pub default_ttl_seconds: u64,
}

/// One row of the administrative listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheItemReport {
    Entry {
        key: String,
        item_count: usize,
        size_bytes: u64,
        ttl_seconds: Option<u64>,
        cached: bool,
    },
    Failed {
        key: String,
        error: String,
    },
}

impl CacheItemReport {
    pub fn key(&self) -> &str {
        match self {
            CacheItemReport::Entry { key, .. } | CacheItemReport::Failed { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheInspection {
    pub stats: CacheStats,
    pub items: Vec<CacheItemReport>,
}

/// Which entries an invalidation sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
    All,
    Only(ManifestType),
}

#[derive(Debug, Clone)]
pub struct InvalidationReport {
    pub scope: InvalidationScope,
    pub cleared: usize,
    pub failed: Vec<DeleteFailure>,
}

/// A key left in the cache because its delete failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub key: String,
    pub error: String,
}

impl InvalidationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct CacheAdminService {
    cache: ManifestCache,
    secret_digest: Option<Vec<u8>>,
}

impl CacheAdminService {
    /// `secret` of `None` leaves invalidation open to any caller.
    pub fn new(cache: ManifestCache, secret: Option<&str>) -> Self {
        Self {
            cache,
            secret_digest: secret.map(digest),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let keys = self.cache.keys().await;
        self.stats_from(&keys)
    }

    /// List every manifest entry; a failing key is reported inline.
    pub async fn inspect(&self) -> CacheInspection {
        let keys = self.cache.keys().await;
        let stats = self.stats_from(&keys);
        let keys = match keys {
            Ok(keys) => keys,
            Err(err) => {
                warn!(
                    target = "manifestd::admin",
                    backend = self.cache.backend_name(),
                    error = %err,
                    "cache key enumeration failed"
                );
                Vec::new()
            }
        };

        let items = join_all(keys.into_iter().map(|key| self.inspect_key(key))).await;
        CacheInspection { stats, items }
    }

    /// Delete manifest entries after checking `credential`.
    ///
    /// The credential is checked before `manifest_type` is parsed, and an
    /// unauthorized call performs no backend operation at all. Keys whose
    /// delete fails are listed in the report; the rest of the sweep proceeds.
    pub async fn invalidate(
        &self,
        credential: Option<&str>,
        manifest_type: Option<&str>,
    ) -> Result<InvalidationReport, ManifestError> {
        self.authorize(credential)?;

        let scope = match manifest_type {
            Some(name) => InvalidationScope::Only(name.parse::<ManifestType>()?),
            None => InvalidationScope::All,
        };
        let keys = match scope {
            InvalidationScope::All => self
                .cache
                .keys()
                .await
                .map_err(|err| ManifestError::CacheAdmin(err.to_string()))?,
            InvalidationScope::Only(ty) => vec![ty.cache_key()],
        };

        let mut report = InvalidationReport {
            scope,
            cleared: 0,
            failed: Vec::new(),
        };
        for key in keys {
            match self.cache.delete(&key).await {
                Ok(true) => report.cleared += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(
                        target = "manifestd::admin",
                        key = %key,
                        error = %err,
                        "failed to delete cache entry"
                    );
                    report.failed.push(DeleteFailure {
                        key,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            target = "manifestd::admin",
            cleared = report.cleared,
            failed = report.failed.len(),
            scope = ?scope,
            "manifest cache invalidated"
        );
        Ok(report)
    }

    fn authorize(&self, credential: Option<&str>) -> Result<(), ManifestError> {
        let Some(expected) = self.secret_digest.as_deref() else {
            return Ok(());
        };
        let supplied = digest(credential.unwrap_or_default());
        if bool::from(supplied.as_slice().ct_eq(expected)) {
            Ok(())
        } else {
            Err(ManifestError::Unauthorized)
        }
    }

    fn stats_from(&self, keys: &Result<Vec<String>, CacheError>) -> CacheStats {
        CacheStats {
            backend: self.cache.backend_name(),
            connected: keys.is_ok(),
            key_count: keys.as_ref().map_or(0, Vec::len),
            default_ttl_seconds: self.cache.config().default_ttl_seconds(),
        }
    }

    async fn inspect_key(&self, key: String) -> CacheItemReport {
        match self.describe(&key).await {
            Ok(report) => report,
            Err(err) => {
                warn!(
                    target = "manifestd::admin",
                    key = %key,
                    error = %err,
                    "cache entry inspection failed"
                );
                CacheItemReport::Failed {
                    key,
                    error: err.to_string(),
                }
            }
        }
    }

    async fn describe(&self, key: &str) -> Result<CacheItemReport, CacheError> {
        let Some(raw) = self.cache.get_raw(key).await? else {
            return Ok(CacheItemReport::Entry {
                key: key.to_string(),
                item_count: 0,
                size_bytes: 0,
                ttl_seconds: None,
                cached: false,
            });
        };

        let document: Value = serde_json::from_slice(&raw).map_err(|err| CacheError::Codec {
            key: key.to_string(),
            message: err.to_string(),
        })?;

        let serialized_len = raw.len() as u64;
        let size_bytes = match self.cache.memory_usage(key).await {
            Ok(Some(reported)) => reported,
            Ok(None) => serialized_len,
            Err(err) => {
                debug!(key, error = %err, "memory usage probe failed");
                serialized_len
            }
        };

        let ttl_seconds = self.cache.ttl(key).await?.map(|ttl| ttl.as_secs());

        Ok(CacheItemReport::Entry {
            key: key.to_string(),
            item_count: item_count(&document),
            size_bytes,
            ttl_seconds,
            cached: true,
        })
    }
}

fn digest(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}
