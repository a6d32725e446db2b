// lookout/src/api.rs
//
// HTTP/JSON API.
//
//   POST /api/extensiontracking/track           anonymous, always 204
//   GET  /api/extensiontracking/statistics      admin
//   POST /api/extensiontracking/delete-my-data  anonymous (erasure request)
//   GET  /api/admin/features                    admin
//   GET  /api/admin/features/:name              admin, 404 if never configured
//   PUT  /api/admin/features/:name              admin, upsert, 204
//   GET  /api/admin/features/:name/enabled      anonymous
//   GET  /healthz
//
// Admin requests carry the configured key in `x-api-key` or as a bearer
// token. With no key configured every admin request is rejected.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use thiserror::Error;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::events::{
    DeleteDataRequest, DeleteDataResponse, FeatureEnabledResponse, FeatureSettings, TrackRequest,
    TrackingStatistics, UpdateFeatureRequest,
};
use crate::features::FeatureToggles;
use crate::store::StoreError;
use crate::tracking::TrackingService;

const MAX_FEATURE_NAME: usize = 100;

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    tracking:  TrackingService,
    admin_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(tracking: TrackingService, admin_key: Option<&str>) -> Self {
        Self { tracking, admin_key: admin_key.map(Arc::from) }
    }

    fn toggles(&self) -> &FeatureToggles {
        self.tracking.toggles()
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("admin credentials required")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::Unauthorized  => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::NotFound(_)   => (StatusCode::NOT_FOUND, "not_found"),
            Self::Store(_)      => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        Self::BadRequest(r.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.code();
        let message = match &self {
            Self::Store(e) => {
                error!(error = %e, "store failure");
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

// ── Admin extractor ───────────────────────────────────────────────────────────

/// Authenticated admin; carries the identity recorded on feature changes.
pub struct Admin(pub String);

#[async_trait]
impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let expected = state.admin_key.as_deref().ok_or(ApiError::Unauthorized)?;
        let presented = header_str(&parts.headers, "x-api-key")
            .or_else(|| {
                header_str(&parts.headers, "authorization")
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .map(str::trim)
            })
            .ok_or(ApiError::Unauthorized)?;

        if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            warn!(path = %parts.uri.path(), "rejected admin request with wrong key");
            return Err(ApiError::Unauthorized);
        }

        let who = header_str(&parts.headers, "x-admin-user")
            .filter(|u| !u.is_empty())
            .unwrap_or("admin");
        Ok(Admin(who.to_string()))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() { return false; }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ── Client IP ─────────────────────────────────────────────────────────────────

/// Proxy headers first (CF-Connecting-IP, leftmost X-Forwarded-For,
/// X-Real-IP), then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(ip) = header_str(headers, "cf-connecting-ip").filter(|s| is_ip(s)) {
        return ip.to_string();
    }
    if let Some(ip) = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| is_ip(s))
    {
        return ip.to_string();
    }
    if let Some(ip) = header_str(headers, "x-real-ip").filter(|s| is_ip(s)) {
        return ip.to_string();
    }
    peer.map(|p| p.ip().to_string()).unwrap_or_default()
}

fn is_ip(s: &str) -> bool {
    s.parse::<IpAddr>().is_ok()
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: AppState, cfg: &ServerConfig) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/api/extensiontracking/track", post(track_handler))
        .route("/api/extensiontracking/statistics", get(statistics_handler))
        .route("/api/extensiontracking/delete-my-data", post(delete_my_data_handler))
        .route("/api/admin/features", get(list_features_handler))
        .route(
            "/api/admin/features/:name",
            get(get_feature_handler).put(put_feature_handler),
        )
        .route("/api/admin/features/:name/enabled", get(feature_enabled_handler))
        .layer(DefaultBodyLimit::max(cfg.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(cfg.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, cfg: &ServerConfig) -> anyhow::Result<()> {
    let addr     = cfg.bind_addr()?;
    let app      = build_router(state, cfg);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("lookout API listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn healthz_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Never reports failure to the visitor.
async fn track_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<TrackRequest>, JsonRejection>,
) -> StatusCode {
    let Json(req) = match body {
        Ok(b)  => b,
        Err(e) => {
            warn!(error = %e.body_text(), "discarding malformed tracking report");
            return StatusCode::NO_CONTENT;
        }
    };
    let ip = client_ip(&headers, peer.map(|ConnectInfo(a)| a));
    let ua = if req.user_agent.is_empty() {
        header_str(&headers, "user-agent").unwrap_or_default().to_string()
    } else {
        req.user_agent.clone()
    };

    let tracking = state.tracking.clone();
    let task = tokio::task::spawn_blocking(move || {
        tracking.track(&req.fingerprint_hash, &req.extensions, &ua, &ip)
    });
    if let Err(e) = task.await {
        error!(error = %e, "tracking task failed");
    }
    StatusCode::NO_CONTENT
}

async fn statistics_handler(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<Json<TrackingStatistics>, ApiError> {
    let tracking = state.tracking.clone();
    Ok(Json(blocking(move || tracking.statistics()).await?))
}

async fn delete_my_data_handler(
    State(state): State<AppState>,
    body: Result<Json<DeleteDataRequest>, JsonRejection>,
) -> Result<Json<DeleteDataResponse>, ApiError> {
    let Json(req) = body?;
    let hash = req.fingerprint_hash.trim().to_string();
    if hash.is_empty() {
        return Err(ApiError::BadRequest("fingerprintHash is required".into()));
    }
    let tracking = state.tracking.clone();
    Ok(Json(blocking(move || tracking.delete_all_data(&hash)).await?))
}

async fn list_features_handler(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<Json<Vec<FeatureSettings>>, ApiError> {
    let toggles = state.toggles().clone();
    Ok(Json(blocking(move || toggles.list()).await?))
}

async fn get_feature_handler(
    State(state): State<AppState>,
    _admin: Admin,
    Path(name): Path<String>,
) -> Result<Json<FeatureSettings>, ApiError> {
    let name    = validate_feature_name(&name)?.to_string();
    let toggles = state.toggles().clone();
    let lookup  = name.clone();
    blocking(move || toggles.get_settings(&lookup))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("feature {} is not configured", name)))
}

async fn put_feature_handler(
    State(state): State<AppState>,
    Admin(who): Admin,
    Path(name): Path<String>,
    body: Result<Json<UpdateFeatureRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let name      = validate_feature_name(&name)?.to_string();
    let Json(req) = body?;
    let toggles   = state.toggles().clone();
    blocking(move || toggles.set_enabled(&name, req.is_enabled, &who, req.reason.as_deref())).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn feature_enabled_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<FeatureEnabledResponse> {
    let name    = name.trim().to_string();
    let toggles = state.toggles().clone();
    let is_enabled = blocking(move || Ok(toggles.is_enabled(&name))).await.unwrap_or(false);
    Json(FeatureEnabledResponse { is_enabled })
}

/// Runs store work on the blocking pool so SQLite I/O never holds a runtime
/// worker thread.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {}", e)))?
        .map_err(ApiError::from)
}

fn validate_feature_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    if name.is_empty() || name.len() > MAX_FEATURE_NAME {
        return Err(ApiError::BadRequest(format!(
            "feature name must be 1-{} characters",
            MAX_FEATURE_NAME
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EXTENSION_TRACKING;
    use crate::store::contract::BrokenStore;
    use crate::store::{EventStore, FeatureStore, MemoryStore, SqliteStore};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    const KEY: &str = "test-admin-key";

    fn app_with(store: Arc<MemoryStore>, admin_key: Option<&str>) -> Router {
        let toggles  = FeatureToggles::new(store.clone());
        let tracking = TrackingService::new(store, toggles);
        build_router(AppState::new(tracking, admin_key), &ServerConfig::default())
    }

    fn app() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (app_with(store.clone(), Some(KEY)), store)
    }

    fn enable_tracking(store: &Arc<MemoryStore>) {
        FeatureToggles::new(store.clone())
            .set_enabled(EXTENSION_TRACKING, true, "test", None)
            .unwrap();
    }

    fn json_req(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn admin(mut req: Request<Body>) -> Request<Body> {
        req.headers_mut().insert("x-api-key", KEY.parse().unwrap());
        req
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn track_body(fp: &str, exts: &[&str]) -> Value {
        let exts: Vec<Value> = exts.iter()
            .map(|id| json!({ "id": id, "name": id, "isHarmful": true }))
            .collect();
        json!({ "fingerprintHash": fp, "extensions": exts, "userAgent": "Mozilla/5.0" })
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let (app, _) = app();
        let resp = app.oneshot(get("/healthz")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn track_is_no_content_when_disabled_and_stores_nothing() {
        let (app, store) = app();
        let resp = app
            .oneshot(json_req("POST", "/api/extensiontracking/track", track_body("fp1", &["honey"])))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(store.n_events(), 0);
    }

    #[tokio::test]
    async fn track_stores_with_hashed_forwarded_ip() {
        let (app, store) = app();
        enable_tracking(&store);

        let mut req = json_req("POST", "/api/extensiontracking/track", track_body("fp1", &["honey", "rakuten"]));
        req.headers_mut().insert("x-forwarded-for", "198.51.100.7, 10.0.0.1".parse().unwrap());
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let rows = store.events_for("fp1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ip_address_hash, crate::fingerprint::hash_ip("198.51.100.7"));
    }

    #[tokio::test]
    async fn malformed_track_body_is_still_no_content() {
        let (app, store) = app();
        enable_tracking(&store);
        let req = Request::builder()
            .method("POST")
            .uri("/api/extensiontracking/track")
            .header("content-type", "application/json")
            .body(Body::from("{nope"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(store.n_events(), 0);
    }

    #[tokio::test]
    async fn statistics_require_admin() {
        let (app, _) = app();
        let resp = app.clone().oneshot(get("/api/extensiontracking/statistics")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let mut wrong = get("/api/extensiontracking/statistics");
        wrong.headers_mut().insert("x-api-key", "nope".parse().unwrap());
        let resp = app.oneshot(wrong).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn statistics_count_distinct_visitors() {
        let (app, store) = app();
        enable_tracking(&store);
        for (fp, exts) in [("a", vec!["honey"]), ("b", vec!["honey", "rakuten"])] {
            let resp = app.clone()
                .oneshot(json_req("POST", "/api/extensiontracking/track", track_body(fp, &exts)))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        }

        let mut req = get("/api/extensiontracking/statistics");
        req.headers_mut().insert("authorization", format!("Bearer {}", KEY).parse().unwrap());
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["totalUniqueVisitors"], 2);
        assert_eq!(v["extensionCounts"]["honey"], 2);
        assert_eq!(v["extensionCounts"]["rakuten"], 1);
    }

    #[tokio::test]
    async fn delete_my_data_reports_count_then_zero() {
        let (app, store) = app();
        enable_tracking(&store);
        app.clone()
            .oneshot(json_req("POST", "/api/extensiontracking/track", track_body("fp1", &["honey", "karma", "coupert"])))
            .await
            .unwrap();

        let del = || json_req("POST", "/api/extensiontracking/delete-my-data", json!({ "fingerprintHash": "fp1" }));
        let first = body_json(app.clone().oneshot(del()).await.unwrap()).await;
        assert_eq!(first["deletedRecords"], 3);
        let second = body_json(app.oneshot(del()).await.unwrap()).await;
        assert_eq!(second["deletedRecords"], 0);
        assert!(!second["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_my_data_rejects_blank_hash() {
        let (app, _) = app();
        let resp = app
            .oneshot(json_req("POST", "/api/extensiontracking/delete-my-data", json!({ "fingerprintHash": " " })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "bad_request");
    }

    #[tokio::test]
    async fn feature_lifecycle() {
        let (app, _) = app();

        let resp = app.clone().oneshot(admin(get("/api/admin/features/ExtensionTracking"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let v = body_json(app.clone().oneshot(get("/api/admin/features/ExtensionTracking/enabled")).await.unwrap()).await;
        assert_eq!(v["isEnabled"], false);

        let mut put = admin(json_req("PUT", "/api/admin/features/ExtensionTracking", json!({ "isEnabled": true })));
        put.headers_mut().insert("x-admin-user", "alice".parse().unwrap());
        let resp = app.clone().oneshot(put).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let v = body_json(app.clone().oneshot(admin(get("/api/admin/features/ExtensionTracking"))).await.unwrap()).await;
        assert_eq!(v["featureName"], "ExtensionTracking");
        assert_eq!(v["isEnabled"], true);
        assert_eq!(v["lastModifiedBy"], "alice");

        let v = body_json(app.clone().oneshot(get("/api/admin/features/ExtensionTracking/enabled")).await.unwrap()).await;
        assert_eq!(v["isEnabled"], true);

        let list = body_json(app.oneshot(admin(get("/api/admin/features"))).await.unwrap()).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn put_feature_requires_admin() {
        let (app, store) = app();
        let resp = app
            .oneshot(json_req("PUT", "/api/admin/features/ExtensionTracking", json!({ "isEnabled": true })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(FeatureToggles::new(store).get_settings(EXTENSION_TRACKING).unwrap().is_none());
    }

    #[tokio::test]
    async fn put_feature_rejects_malformed_body() {
        let (app, _) = app();
        let resp = app
            .oneshot(admin(json_req("PUT", "/api/admin/features/ExtensionTracking", json!({ "enabled": "yes" }))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_routes_closed_without_configured_key() {
        let store = Arc::new(MemoryStore::new());
        let app   = app_with(store, None);
        let resp  = app.oneshot(admin(get("/api/admin/features"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    fn app_over(events: Arc<dyn EventStore>, features: Arc<dyn FeatureStore>) -> Router {
        let tracking = TrackingService::new(events, FeatureToggles::new(features));
        build_router(AppState::new(tracking, Some(KEY)), &ServerConfig::default())
    }

    #[tokio::test]
    async fn store_failures_are_opaque_500s() {
        let broken = Arc::new(BrokenStore);
        let app    = app_over(broken.clone(), broken);

        let requests = [
            admin(get("/api/extensiontracking/statistics")),
            json_req("POST", "/api/extensiontracking/delete-my-data", json!({ "fingerprintHash": "fp1" })),
            admin(get("/api/admin/features")),
            admin(get("/api/admin/features/ExtensionTracking")),
            admin(json_req("PUT", "/api/admin/features/ExtensionTracking", json!({ "isEnabled": true }))),
        ];
        for req in requests {
            let uri  = req.uri().to_string();
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
            let body = body_json(resp).await;
            assert_eq!(body["error"], "store_error", "{}", uri);
            assert_eq!(body["message"], "internal storage error", "{}", uri);
        }
    }

    #[tokio::test]
    async fn anonymous_flag_reads_false_when_store_is_down() {
        let broken = Arc::new(BrokenStore);
        let resp   = app_over(broken.clone(), broken)
            .oneshot(get("/api/admin/features/ExtensionTracking/enabled"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["isEnabled"], false);
    }

    #[tokio::test]
    async fn track_swallows_event_store_failure() {
        let features = Arc::new(MemoryStore::new());
        enable_tracking(&features);
        let resp = app_over(Arc::new(BrokenStore), features)
            .oneshot(json_req("POST", "/api/extensiontracking/track", track_body("fp1", &["honey"])))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn sqlite_backed_router_serves_concurrent_reports() {
        let dir   = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(dir.path().join("lookout.db")).unwrap());
        let app   = app_over(store.clone(), store.clone());

        let resp = app.clone()
            .oneshot(admin(json_req("PUT", "/api/admin/features/ExtensionTracking", json!({ "isEnabled": true }))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let sends = (0..16).map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let body = track_body(&format!("fp{}", i % 4), &["honey"]);
                app.oneshot(json_req("POST", "/api/extensiontracking/track", body)).await.unwrap().status()
            })
        });
        for status in futures::future::join_all(sends).await {
            assert_eq!(status.unwrap(), StatusCode::NO_CONTENT);
        }

        let resp = app.oneshot(admin(get("/api/extensiontracking/statistics"))).await.unwrap();
        let body = body_json(resp).await;
        assert_eq!(body["totalUniqueVisitors"], 4);
        assert_eq!(body["extensionCounts"]["honey"], 4);
        assert_eq!(store.events_for("fp0").unwrap().len(), 4);
    }

    #[test]
    fn client_ip_prefers_proxy_headers() {
        let peer = Some("192.0.2.1:5555".parse().unwrap());
        let mut h = HeaderMap::new();
        assert_eq!(client_ip(&h, peer), "192.0.2.1");

        h.insert("x-real-ip", "192.0.2.3".parse().unwrap());
        assert_eq!(client_ip(&h, peer), "192.0.2.3");

        h.insert("x-forwarded-for", "192.0.2.4, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&h, peer), "192.0.2.4");

        h.insert("cf-connecting-ip", "192.0.2.5".parse().unwrap());
        assert_eq!(client_ip(&h, peer), "192.0.2.5");

        h.insert("cf-connecting-ip", "not-an-ip".parse().unwrap());
        assert_eq!(client_ip(&h, peer), "192.0.2.4");
    }
}
