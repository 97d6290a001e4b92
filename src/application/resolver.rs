//! Cache-aside manifest resolution.

use std::{sync::Arc, time::Instant};

use metrics::{counter, histogram};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

use crate::{
    application::{error::ManifestError, repos::ManifestStore},
    cache::{ManifestCache, StoreOutcome},
    domain::manifest::ManifestType,
};

/// Where a resolved document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    CacheHit,
    CacheMissRefilled,
}

impl Provenance {
    /// Value of the `X-Cache` header.
    pub fn as_header(self) -> &'static str {
        match self {
            Provenance::CacheHit => "HIT",
            Provenance::CacheMissRefilled => "MISS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    pub manifest_type: ManifestType,
    pub document: Value,
    pub provenance: Provenance,
    pub resolved_at: OffsetDateTime,
}

/// Serves documents from the cache and refills it from durable storage on miss.
///
/// Concurrent misses for the same type each read storage and each write the
/// cache; both operations are idempotent.
#[derive(Clone)]
pub struct ManifestResolver {
    store: Arc<dyn ManifestStore>,
    cache: ManifestCache,
}

impl ManifestResolver {
    pub fn new(store: Arc<dyn ManifestStore>, cache: ManifestCache) -> Self {
        Self { store, cache }
    }

    /// Parse `name` and resolve it; unknown names fail before any I/O.
    pub async fn resolve_named(&self, name: &str) -> Result<ResolvedManifest, ManifestError> {
        let ty: ManifestType = name.parse()?;
        self.resolve(ty).await
    }

    #[instrument(skip(self), fields(manifest = %ty))]
    pub async fn resolve(&self, ty: ManifestType) -> Result<ResolvedManifest, ManifestError> {
        if !self.cache.config().enabled {
            debug!(cache = "manifest", outcome = "bypass", "caching disabled; loading from storage");
            return self.load_from_storage(ty).await;
        }

        match self.cache.load(ty).await {
            Ok(Some(document)) => {
                counter!("manifestd_cache_hit_total", "manifest" => ty.as_str()).increment(1);
                debug!(cache = "manifest", outcome = "hit", "serving cached manifest");
                return Ok(resolved(ty, document, Provenance::CacheHit));
            }
            Ok(None) => {
                debug!(cache = "manifest", outcome = "miss", "loading manifest from storage");
            }
            Err(err) => {
                counter!("manifestd_cache_error_total", "op" => "load").increment(1);
                warn!(
                    target = "manifestd::cache",
                    backend = self.cache.backend_name(),
                    error = %err,
                    "cache lookup failed; falling back to storage"
                );
            }
        }
        counter!("manifestd_cache_miss_total", "manifest" => ty.as_str()).increment(1);

        let fresh = self.load_from_storage(ty).await?;
        self.populate(ty, &fresh.document).await;
        Ok(fresh)
    }

    async fn load_from_storage(&self, ty: ManifestType) -> Result<ResolvedManifest, ManifestError> {
        let started = Instant::now();
        let document = self
            .store
            .read(ty)
            .await
            .map_err(|err| ManifestError::storage(ty, err))?;
        histogram!("manifestd_storage_read_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        Ok(resolved(ty, document, Provenance::CacheMissRefilled))
    }

    /// Best-effort cache write: failures are logged and counted, never returned.
    async fn populate(&self, ty: ManifestType, document: &Value) {
        match self.cache.store(ty, document).await {
            Ok(StoreOutcome::Stored) => {}
            Ok(StoreOutcome::SkippedOversize { size_bytes }) => {
                counter!("manifestd_cache_skip_oversize_total").increment(1);
                warn!(
                    target = "manifestd::cache",
                    manifest = %ty,
                    size_bytes,
                    limit_bytes = self.cache.config().max_entry_bytes,
                    "manifest exceeds cache entry limit; serving uncached"
                );
            }
            Err(err) => {
                counter!("manifestd_cache_error_total", "op" => "store").increment(1);
                warn!(
                    target = "manifestd::cache",
                    backend = self.cache.backend_name(),
                    manifest = %ty,
                    error = %err,
                    "cache populate failed"
                );
            }
        }
    }
}

fn resolved(ty: ManifestType, document: Value, provenance: Provenance) -> ResolvedManifest {
    ResolvedManifest {
        manifest_type: ty,
        document,
        provenance,
        resolved_at: OffsetDateTime::now_utc(),
    }
}
