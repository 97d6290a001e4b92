//! Administrative listener: cache inspection and invalidation.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderMap,
    middleware,
    routing::{get, post},
};
use manifestd_api_types::{
    CacheClearBody, CacheEntryBody, CacheInspectionBody, CacheItemBody, CacheItemFailure,
};
use time::OffsetDateTime;

use crate::{
    application::cache_admin::{CacheAdminService, CacheItemReport},
    util::timestamp::rfc3339,
};

use super::{
    error::ApiError,
    middleware::{log_responses, set_request_context},
    shared::{ClearQuery, clear_cache, stats_body},
};

#[derive(Clone)]
pub struct AdminState {
    pub cache_admin: CacheAdminService,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/cache", get(inspect_cache))
        .route("/admin/cache/clear", post(clear_admin_cache))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn inspect_cache(State(state): State<AdminState>) -> Json<CacheInspectionBody> {
    let inspection = state.cache_admin.inspect().await;
    let success = inspection.stats.connected;

    Json(CacheInspectionBody {
        success,
        cache: stats_body(inspection.stats),
        items: inspection.items.into_iter().map(item_body).collect(),
        timestamp: rfc3339(OffsetDateTime::now_utc()),
    })
}

async fn clear_admin_cache(
    State(state): State<AdminState>,
    headers: HeaderMap,
    Query(query): Query<ClearQuery>,
) -> Result<Json<CacheClearBody>, ApiError> {
    clear_cache(&state.cache_admin, &headers, &query).await
}

fn item_body(report: CacheItemReport) -> CacheItemBody {
    match report {
        CacheItemReport::Entry {
            key,
            item_count,
            size_bytes,
            ttl_seconds,
            cached,
        } => CacheItemBody::Entry(CacheEntryBody {
            key,
            item_count,
            size_bytes,
            ttl_seconds,
            cached,
        }),
        CacheItemReport::Failed { key, error } => {
            CacheItemBody::Failed(CacheItemFailure { key, error })
        }
    }
}
