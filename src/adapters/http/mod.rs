//! HTTP adapters - REST API implementations.
//!
//! Each area has its own router; `app_router` mounts them and applies the
//! auth middleware, `with_http_layers` adds the tower-http stack.

pub mod admin;
pub mod middleware;
pub mod payment;

use axum::{http::HeaderValue, middleware::from_fn_with_state, routing::get, Json, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;

pub use admin::{admin_routes, AdminAppState};
pub use middleware::{auth_middleware, AuthState};
pub use payment::{payment_routes, PaymentAppState};

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Mounts every route and resolves the caller's session on each request.
///
/// ```text
/// /health
/// /api/payment/...
/// /api/admin/...
/// ```
pub fn app_router(payment: PaymentAppState, admin: AdminAppState, auth: AuthState) -> Router {
    Router::new()
        .nest("/api/payment", payment_routes().with_state(payment))
        .nest("/api/admin", admin_routes().with_state(admin))
        .layer(from_fn_with_state(auth, auth_middleware))
        .route("/health", get(health))
}

/// Tracing, CORS, timeout, request id and compression.
pub fn with_http_layers(router: Router, server: &ServerConfig) -> Router {
    router
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(cors_layer(server))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Without configured origins any origin is allowed, without credentials.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .into_iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
        .allow_credentials(true)
}
