//! HTTP API for pod clients.
//!
//! Peer-to-peer replication does not go through here; see
//! [`ReplicationListener`](crate::replication::ReplicationListener).

use crate::error::Error;
use crate::models::{VideoMetadata, VideoRecord};
use crate::service::VideoService;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type AppState = Arc<VideoService>;

/// Build the API router.
pub fn build_router(service: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/videos", get(list_videos).post(add_video))
        .route("/api/v1/search", get(search_videos))
        .route("/api/v1/videos/:id", get(get_video).delete(remove_video))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Error body returned to clients.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized(_) => StatusCode::FORBIDDEN,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::AlreadyExists(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.0.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn health() -> &'static str {
    "OK"
}

async fn list_videos(State(service): State<AppState>) -> ApiResult<Json<Vec<VideoRecord>>> {
    Ok(Json(service.list().await?))
}

#[derive(Debug, Deserialize)]
struct AddVideoRequest {
    /// File already placed in the upload directory
    file_name: String,
    #[serde(flatten)]
    metadata: VideoMetadata,
}

async fn add_video(
    State(service): State<AppState>,
    Json(req): Json<AddVideoRequest>,
) -> ApiResult<(StatusCode, Json<VideoRecord>)> {
    let video = service.add(&req.file_name, req.metadata).await?;
    Ok((StatusCode::CREATED, Json(video)))
}

async fn get_video(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<VideoRecord>> {
    Ok(Json(service.get(&id).await?))
}

async fn remove_video(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    service.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    /// Regular expression matched against video names
    name: String,
}

async fn search_videos(
    State(service): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<VideoRecord>>> {
    Ok(Json(service.search(&query.name).await?))
}
