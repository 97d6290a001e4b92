//! Public listener: manifest delivery plus the cache stats and clear endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{
        HeaderMap, HeaderName, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, ETAG, IF_NONE_MATCH, LAST_MODIFIED},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use manifestd_api_types::{CacheClearBody, CacheStatsBody, ManifestIndex, ManifestIndexEntry};

use crate::{
    application::{
        cache_admin::CacheAdminService,
        delivery::{Delivery, DeliveryService},
        resolver::ManifestResolver,
    },
    domain::manifest::ManifestType,
};

use super::{
    error::ApiError,
    middleware::{log_responses, set_request_context},
    shared::{ClearQuery, clear_cache, stats_body},
};

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

#[derive(Clone)]
pub struct HttpState {
    pub resolver: ManifestResolver,
    pub delivery: DeliveryService,
    pub cache_admin: CacheAdminService,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/manifests", get(list_manifests))
        .route("/manifests/{manifest_type}", get(get_manifest))
        .route("/manifests/cache/clear", post(clear_manifest_cache))
        .route("/manifests/cache/stats", get(cache_stats))
        .route("/_health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn list_manifests(State(state): State<HttpState>) -> Json<ManifestIndex> {
    let manifests = ManifestType::ALL
        .into_iter()
        .map(|ty| ManifestIndexEntry {
            manifest_type: ty.as_str().to_string(),
            endpoint: ty.endpoint(),
            path: ty.relative_path().to_string(),
        })
        .collect();

    Json(ManifestIndex {
        manifests,
        cache: stats_body(state.cache_admin.stats().await),
    })
}

async fn get_manifest(
    State(state): State<HttpState>,
    Path(manifest_type): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let resolved = state.resolver.resolve_named(&manifest_type).await?;
    let if_none_match = headers
        .get(IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok());

    let response = match state.delivery.deliver(resolved, if_none_match).await {
        Delivery::NotModified {
            etag,
            cache_control,
        } => {
            let mut response = StatusCode::NOT_MODIFIED.into_response();
            let headers = response.headers_mut();
            insert_header(headers, ETAG, etag.as_str());
            insert_header(headers, CACHE_CONTROL, &cache_control);
            response
        }
        Delivery::Full {
            envelope,
            headers: freshness,
        } => {
            let mut response = Json(envelope).into_response();
            let headers = response.headers_mut();
            insert_header(headers, ETAG, freshness.etag.as_str());
            insert_header(headers, X_CACHE, freshness.cache_status);
            insert_header(headers, CACHE_CONTROL, &freshness.cache_control);
            if let Some(last_modified) = freshness.last_modified.as_deref() {
                insert_header(headers, LAST_MODIFIED, last_modified);
            }
            response
        }
    };

    Ok(response)
}

async fn clear_manifest_cache(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Query(query): Query<ClearQuery>,
) -> Result<Json<CacheClearBody>, ApiError> {
    clear_cache(&state.cache_admin, &headers, &query).await
}

async fn cache_stats(State(state): State<HttpState>) -> Json<CacheStatsBody> {
    Json(stats_body(state.cache_admin.stats().await))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

