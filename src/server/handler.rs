//! HTTP handlers for the data API
//!
//! - GET  /api/data : full snapshot; missing collections come back empty
//! - POST /api/data : replace the snapshot wholesale
//! - PUT  /api/data : same as POST

use crate::backup::validate_document;
use crate::server::file_store::FileStore;
use crate::server::types::{ApiError, SaveResponse};
use crate::sync::DataService;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

/// Shared state for data handlers
#[derive(Clone)]
pub struct DataState {
    pub store: Arc<FileStore>,
}

/// Create the data router
pub fn data_router(state: DataState) -> Router {
    Router::new()
        .route("/api/data", get(get_data).post(save_data).put(save_data))
        .with_state(state)
}

/// GET /api/data
async fn get_data(State(state): State<DataState>) -> Response {
    match state.store.fetch().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            tracing::error!("Error reading data file: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal("Failed to read data")),
            )
                .into_response()
        }
    }
}

/// POST|PUT /api/data
async fn save_data(
    State(state): State<DataState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let snapshot = match validate_document(&body) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!("Rejected snapshot write: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::bad_request(format!("Invalid data structure: {}", e))),
            )
                .into_response();
        }
    };

    match state.store.write_snapshot(&snapshot).await {
        Ok(()) => {
            tracing::debug!(
                people = snapshot.people.len(),
                assignments = snapshot.assignments.len(),
                "Data file updated"
            );
            Json(SaveResponse::saved()).into_response()
        }
        Err(e) => {
            tracing::error!("Error writing data file: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal("Failed to save data")),
            )
                .into_response()
        }
    }
}
