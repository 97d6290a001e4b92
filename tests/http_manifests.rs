use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use async_trait::async_trait;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;

use manifestd::application::cache_admin::CacheAdminService;
use manifestd::application::delivery::{DeliveryPolicy, DeliveryService};
use manifestd::application::repos::{ManifestStore, StoreError};
use manifestd::application::resolver::ManifestResolver;
use manifestd::cache::{CacheConfig, ManifestCache, MemoryBackend};
use manifestd::domain::document::Fingerprint;
use manifestd::domain::manifest::ManifestType;
use manifestd::infra::http::{AdminState, HttpState, build_admin_router, build_router};
use manifestd::infra::storage::FsManifestStore;

const SECRET: &str = "let-me-in";

struct Harness {
    root: TempDir,
    public: Router,
    admin: Router,
}

fn write_manifest(root: &Path, ty: ManifestType, document: &Value) {
    let path = root.join(ty.relative_path());
    fs::create_dir_all(path.parent().expect("parent dir")).expect("create dir");
    fs::write(path, document.to_string()).expect("write manifest");
}

fn harness(secret: Option<&str>) -> Harness {
    harness_with(secret, |root| {
        Arc::new(FsManifestStore::new(root, Duration::from_secs(2)))
    })
}

fn harness_with(
    secret: Option<&str>,
    open_store: impl FnOnce(&Path) -> Arc<dyn ManifestStore>,
) -> Harness {
    let root = TempDir::new().expect("tempdir");
    write_manifest(
        root.path(),
        ManifestType::Events,
        &json!({"events": [{"slug": "a"}, {"slug": "b"}]}),
    );
    write_manifest(
        root.path(),
        ManifestType::Universal,
        &json!({"items": [{"id": 1}]}),
    );

    let store = open_store(root.path());
    let cache = ManifestCache::new(Arc::new(MemoryBackend::new()), CacheConfig::default());
    let cache_admin = CacheAdminService::new(cache.clone(), secret);

    let http_state = HttpState {
        resolver: ManifestResolver::new(store.clone(), cache),
        delivery: DeliveryService::new(store, DeliveryPolicy::default()),
        cache_admin: cache_admin.clone(),
    };

    Harness {
        root,
        public: build_router(http_state),
        admin: build_admin_router(AdminState { cache_admin }),
    }
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

async fn json_body(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn full_body_carries_freshness_headers() {
    let h = harness(None);

    let response = send(&h.public, get("/manifests/events")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let expected_etag = Fingerprint::of(&json!({"events": [{"slug": "a"}, {"slug": "b"}]}));
    assert_eq!(header_str(&response, "etag"), Some(expected_etag.as_str()));
    assert_eq!(header_str(&response, "x-cache"), Some("MISS"));
    assert_eq!(
        header_str(&response, "cache-control"),
        Some("public, max-age=300, must-revalidate")
    );
    assert!(
        header_str(&response, "last-modified").is_some_and(|value| value.ends_with(" GMT"))
    );

    let body = json_body(response).await;
    assert_eq!(body["type"], "events");
    assert_eq!(body["data"]["events"][0]["slug"], "a");
    assert_eq!(body["meta"]["cached"], false);
    assert!(body["meta"]["timestamp"].is_string());

    let again = send(&h.public, get("/manifests/events")).await;
    assert_eq!(header_str(&again, "x-cache"), Some("HIT"));
    assert_eq!(json_body(again).await["meta"]["cached"], true);
}

/// Filesystem store whose modification-time lookups always fail.
struct NoClockStore(FsManifestStore);

#[async_trait]
impl ManifestStore for NoClockStore {
    async fn read(&self, ty: ManifestType) -> Result<Value, StoreError> {
        self.0.read(ty).await
    }

    async fn modified_at(&self, ty: ManifestType) -> Result<Option<OffsetDateTime>, StoreError> {
        Err(StoreError::Timeout {
            path: ty.relative_path().to_string(),
            limit_ms: 1,
        })
    }
}

#[tokio::test]
async fn failed_mtime_lookup_only_drops_last_modified() {
    let h = harness_with(None, |root| {
        Arc::new(NoClockStore(FsManifestStore::new(
            root,
            Duration::from_secs(2),
        )))
    });

    let response = send(&h.public, get("/manifests/events")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_str(&response, "etag").is_some());
    assert!(header_str(&response, "cache-control").is_some());
    assert!(header_str(&response, "last-modified").is_none());
    assert_eq!(json_body(response).await["data"]["events"][1]["slug"], "b");
}

#[tokio::test]
async fn matching_if_none_match_returns_304() {
    let h = harness(None);

    let first = send(&h.public, get("/manifests/universal")).await;
    let etag = header_str(&first, "etag").expect("etag").to_string();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/manifests/universal")
        .header(header::IF_NONE_MATCH, &etag)
        .body(Body::empty())
        .expect("request should build");
    let response = send(&h.public, request).await;

    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(header_str(&response, "etag"), Some(etag.as_str()));
    assert!(header_str(&response, "cache-control").is_some());
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn stale_if_none_match_returns_full_body() {
    let h = harness(None);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/manifests/universal")
        .header(header::IF_NONE_MATCH, "\"not-the-current-version\"")
        .body(Body::empty())
        .expect("request should build");
    let response = send(&h.public, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_str(&response, "etag").is_some());
}

#[tokio::test]
async fn unknown_type_lists_available_types() {
    let h = harness(None);

    let response = send(&h.public, get("/manifests/gallery")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["error"], "unknown_manifest_type");
    assert!(body["message"].as_str().is_some_and(|m| m.contains("gallery")));
    assert_eq!(
        body["availableTypes"],
        json!(["concert", "events", "universal"])
    );
    assert!(body.get("suggestion").is_none());
}

#[tokio::test]
async fn unproduced_type_suggests_remediation() {
    let h = harness(None);

    let response = send(&h.public, get("/manifests/concert")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["error"], "manifest_not_found");
    assert!(body["suggestion"].is_string());
    assert!(body.get("availableTypes").is_none());
}

#[tokio::test]
async fn malformed_document_is_a_server_error() {
    let h = harness(None);
    let path = h.root.path().join(ManifestType::Concert.relative_path());
    fs::create_dir_all(path.parent().expect("parent dir")).expect("create dir");
    fs::write(&path, "{\"items\": [").expect("write");

    let response = send(&h.public, get("/manifests/concert")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(response).await;
    assert_eq!(body["error"], "storage_error");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn index_lists_every_type_with_cache_summary() {
    let h = harness(None);
    send(&h.public, get("/manifests/events")).await;

    let response = send(&h.public, get("/manifests")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let manifests = body["manifests"].as_array().expect("manifests array");
    assert_eq!(manifests.len(), 3);
    assert_eq!(manifests[1]["type"], "events");
    assert_eq!(manifests[1]["endpoint"], "/manifests/events");
    assert_eq!(manifests[1]["path"], "events/manifest.json");
    assert_eq!(body["cache"]["backend"], "memory");
    assert_eq!(body["cache"]["connected"], true);
    assert_eq!(body["cache"]["keyCount"], 1);
    assert_eq!(body["cache"]["defaultTtlSeconds"], 3600);
}

#[tokio::test]
async fn stats_endpoint_reports_backend_summary() {
    let h = harness(None);

    let response = send(&h.public, get("/manifests/cache/stats")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["keyCount"], 0);
    assert_eq!(body["connected"], true);
}

#[tokio::test]
async fn clear_requires_matching_secret() {
    let h = harness(Some(SECRET));
    send(&h.public, get("/manifests/events")).await;
    send(&h.public, get("/manifests/universal")).await;

    let denied = send(&h.public, post("/manifests/cache/clear?secret=wrong")).await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(denied).await["error"], "unauthorized");

    let missing = send(&h.public, post("/manifests/cache/clear")).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let still_cached = send(&h.public, get("/manifests/events")).await;
    assert_eq!(header_str(&still_cached, "x-cache"), Some("HIT"));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/manifests/cache/clear")
        .header("x-cache-secret", SECRET)
        .body(Body::empty())
        .expect("request should build");
    let cleared = send(&h.public, request).await;
    assert_eq!(cleared.status(), StatusCode::OK);

    let body = json_body(cleared).await;
    assert_eq!(body["clearedCount"], 2);
    assert!(body.get("failed").is_none());
    assert!(body["message"].is_string());
    assert!(body["timestamp"].is_string());

    let refilled = send(&h.public, get("/manifests/events")).await;
    assert_eq!(header_str(&refilled, "x-cache"), Some("MISS"));
}

#[tokio::test]
async fn clear_without_configured_secret_is_open() {
    let h = harness(None);
    send(&h.public, get("/manifests/events")).await;

    let response = send(&h.public, post("/manifests/cache/clear")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["clearedCount"], 1);
}

#[tokio::test]
async fn clear_can_target_one_type() {
    let h = harness(Some(SECRET));
    send(&h.public, get("/manifests/events")).await;
    send(&h.public, get("/manifests/universal")).await;

    let uri = format!("/manifests/cache/clear?secret={SECRET}&type=events");
    let response = send(&h.public, post(&uri)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["clearedCount"], 1);

    let universal = send(&h.public, get("/manifests/universal")).await;
    assert_eq!(header_str(&universal, "x-cache"), Some("HIT"));
    let events = send(&h.public, get("/manifests/events")).await;
    assert_eq!(header_str(&events, "x-cache"), Some("MISS"));

    let unknown = format!("/manifests/cache/clear?secret={SECRET}&type=gallery");
    let response = send(&h.public, post(&unknown)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_listing_describes_cached_entries() {
    let h = harness(None);
    send(&h.public, get("/manifests/events")).await;

    let response = send(&h.admin, get("/admin/cache")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["cache"]["keyCount"], 1);
    let items = body["items"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["key"], "manifest:events");
    assert_eq!(items[0]["itemCount"], 2);
    assert_eq!(items[0]["cached"], true);
    assert!(items[0]["sizeBytes"].as_u64().is_some_and(|size| size > 0));
    assert!(
        items[0]["ttlSeconds"]
            .as_u64()
            .is_some_and(|ttl| ttl > 0 && ttl <= 3600)
    );
}

#[tokio::test]
async fn admin_clear_shares_the_public_contract() {
    let h = harness(Some(SECRET));
    send(&h.public, get("/manifests/events")).await;

    let denied = send(&h.admin, post("/admin/cache/clear")).await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let uri = format!("/admin/cache/clear?secret={SECRET}");
    let response = send(&h.admin, post(&uri)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["clearedCount"], 1);
}

#[tokio::test]
async fn health_returns_no_content() {
    let h = harness(None);
    let response = send(&h.public, get("/_health")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
