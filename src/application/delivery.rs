//! Conditional delivery: fingerprints, `If-None-Match` and freshness headers.

use std::{sync::Arc, time::Duration};

use manifestd_api_types::{ManifestEnvelope, ManifestMeta};
use metrics::counter;
use time::OffsetDateTime;
use tracing::debug;

use crate::{
    application::{
        repos::ManifestStore,
        resolver::{Provenance, ResolvedManifest},
    },
    domain::document::Fingerprint,
    util::timestamp::{http_date, rfc3339},
};

const DEFAULT_MAX_AGE_SECS: u64 = 300;

/// Public cache lifetime advertised to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub max_age: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(DEFAULT_MAX_AGE_SECS),
        }
    }
}

impl DeliveryPolicy {
    pub fn cache_control(&self) -> String {
        format!(
            "public, max-age={}, must-revalidate",
            self.max_age.as_secs()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshnessHeaders {
    pub etag: Fingerprint,
    pub cache_status: &'static str,
    pub cache_control: String,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Delivery {
    NotModified {
        etag: Fingerprint,
        cache_control: String,
    },
    Full {
        envelope: ManifestEnvelope,
        headers: FreshnessHeaders,
    },
}

/// Decide between a 304 and a full body.
///
/// Pure over its inputs; `last_modified` is only consulted for full bodies.
pub fn negotiate(
    resolved: ResolvedManifest,
    if_none_match: Option<&str>,
    policy: &DeliveryPolicy,
    last_modified: Option<OffsetDateTime>,
) -> Delivery {
    let etag = Fingerprint::of(&resolved.document);
    if if_none_match.is_some_and(|candidate| etag.matches(candidate)) {
        return Delivery::NotModified {
            etag,
            cache_control: policy.cache_control(),
        };
    }

    let headers = FreshnessHeaders {
        etag,
        cache_status: resolved.provenance.as_header(),
        cache_control: policy.cache_control(),
        last_modified: last_modified.and_then(http_date),
    };
    let envelope = ManifestEnvelope {
        manifest_type: resolved.manifest_type.as_str().to_string(),
        meta: ManifestMeta {
            timestamp: rfc3339(resolved.resolved_at),
            cached: resolved.provenance == Provenance::CacheHit,
        },
        data: resolved.document,
    };
    Delivery::Full { envelope, headers }
}

/// Negotiator bound to the store used for the `Last-Modified` probe.
#[derive(Clone)]
pub struct DeliveryService {
    store: Arc<dyn ManifestStore>,
    policy: DeliveryPolicy,
}

impl DeliveryService {
    pub fn new(store: Arc<dyn ManifestStore>, policy: DeliveryPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn deliver(&self, resolved: ResolvedManifest, if_none_match: Option<&str>) -> Delivery {
        // Best-effort: a failed probe only drops the Last-Modified header.
        let last_modified = match self.store.modified_at(resolved.manifest_type).await {
            Ok(at) => at,
            Err(err) => {
                debug!(
                    manifest = %resolved.manifest_type,
                    error = %err,
                    "modification time unavailable"
                );
                None
            }
        };

        let delivery = negotiate(resolved, if_none_match, &self.policy, last_modified);
        if matches!(delivery, Delivery::NotModified { .. }) {
            counter!("manifestd_not_modified_total").increment(1);
        }
        delivery
    }
}
