//! Cache endpoints served by both listeners.

use axum::{Json, http::HeaderMap};
use manifestd_api_types::{CacheClearBody, CacheItemFailure, CacheStatsBody};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    application::cache_admin::{
        CacheAdminService, CacheStats, DeleteFailure, InvalidationScope,
    },
    util::timestamp::rfc3339,
};

use super::error::ApiError;

pub(super) const CACHE_SECRET_HEADER: &str = "x-cache-secret";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ClearQuery {
    secret: Option<String>,
    #[serde(rename = "type")]
    manifest_type: Option<String>,
}

/// Header credential wins over the query parameter.
fn credential<'a>(headers: &'a HeaderMap, query: &'a ClearQuery) -> Option<&'a str> {
    headers
        .get(CACHE_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .or(query.secret.as_deref())
}

pub(super) async fn clear_cache(
    admin: &CacheAdminService,
    headers: &HeaderMap,
    query: &ClearQuery,
) -> Result<Json<CacheClearBody>, ApiError> {
    let report = admin
        .invalidate(credential(headers, query), query.manifest_type.as_deref())
        .await?;

    let cleared_count = report.cleared;
    let mut message = match report.scope {
        InvalidationScope::All => format!("Cleared {cleared_count} manifest cache entries"),
        InvalidationScope::Only(ty) => {
            format!("Cleared {cleared_count} cache entries for manifest '{ty}'")
        }
    };
    if !report.is_complete() {
        message.push_str(&format!("; {} entries could not be removed", report.failed.len()));
    }

    let failed = report
        .failed
        .into_iter()
        .map(|DeleteFailure { key, error }| CacheItemFailure { key, error })
        .collect();

    Ok(Json(CacheClearBody {
        message,
        cleared_count,
        failed,
        timestamp: rfc3339(OffsetDateTime::now_utc()),
    }))
}

pub(super) fn stats_body(stats: CacheStats) -> CacheStatsBody {
    CacheStatsBody {
        backend: stats.backend.to_string(),
        connected: stats.connected,
        key_count: stats.key_count,
        default_ttl_seconds: stats.default_ttl_seconds,
    }
}
