//! Unified API router for the data service
//!
//! ## Endpoint Map
//!
//! | Path        | Methods         | Description                   |
//! |-------------|-----------------|-------------------------------|
//! | `/health`   | GET             | Load balancer health probe    |
//! | `/api/data` | GET, POST, PUT  | Fetch / replace the snapshot  |

use crate::server::{data_router, DataState};
use axum::{
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete HTTP application
///
/// Merges the data routes with the health probe, adds CORS and request
/// tracing, and returns a `Router` ready to be served by `axum::serve`.
pub fn build_app(data_state: DataState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(data_router(data_state))
        .layer(build_cors(cors_origins))
        .layer(TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}
