//! HTTP handlers for the public gateway: upload init/complete, catalog listing and
//! stream URL resolution. Bodies follow JSON:API (`{"data": {"type", "id",
//! "attributes"}}`) and all business rules live in the services.

use crate::{
    errors::{AppError, JSON_API_MEDIA_TYPE},
    models::video::VideoRecord,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

/// Body of `POST /api/upload/init`.
#[derive(Debug, Deserialize)]
pub struct InitUploadRequest {
    pub title: String,
    pub filename: String,
}

/// Body of `POST /api/upload/complete`.
#[derive(Debug, Deserialize)]
pub struct CompleteUploadRequest {
    pub video_id: String,
}

/// Query params of `GET /api/videos`.
#[derive(Debug, Deserialize)]
pub struct ListVideosQuery {
    /// Full-text search terms; absent or blank lists everything ready.
    pub q: Option<String>,
}

/// POST `/api/upload/init`: create a pending video and return a presigned PUT URL.
pub async fn init_upload(
    State(state): State<AppState>,
    payload: Result<Json<InitUploadRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let ticket = state.uploads.init_upload(&req.title, &req.filename).await?;

    Ok(document(resource(
        "upload-init",
        &ticket.video_id,
        json!({ "presigned_url": ticket.upload_url }),
    )))
}

/// POST `/api/upload/complete`: the client asserts its PUT finished; mark ready.
pub async fn complete_upload(
    State(state): State<AppState>,
    payload: Result<Json<CompleteUploadRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    info!("complete upload requested for video {}", req.video_id);

    state.uploads.complete_upload(&req.video_id).await?;

    Ok(document(resource(
        "upload-status",
        &req.video_id,
        json!({ "status": "success" }),
    )))
}

/// GET `/api/videos?q=`: ready videos, optionally full-text filtered.
pub async fn list_videos(
    State(state): State<AppState>,
    Query(q): Query<ListVideosQuery>,
) -> Result<Response, AppError> {
    let query = q.q.unwrap_or_default();
    let videos = state.lifecycle.list_videos(&query).await?;

    let data = videos.iter().map(video_resource).collect::<Vec<_>>();
    Ok(document(Value::Array(data)))
}

/// GET `/api/videos/{id}`: one video, whatever its status.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Response, AppError> {
    let video = state.lifecycle.get_video(&video_id).await?;
    Ok(document(video_resource(&video)))
}

/// GET `/api/stream/videos/{id}`: presigned download URL for a video.
pub async fn stream_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Response, AppError> {
    let url = state.streams.get_stream_url(&video_id).await?;
    Ok(document(resource("video-stream", &video_id, json!({ "url": url }))))
}

fn video_resource(video: &VideoRecord) -> Value {
    resource(
        "video",
        &video.id,
        json!({
            "title": video.title,
            "description": video.description,
            "status": video.status,
            "created_at": video.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            "bucket_name": video.bucket_name,
            "object_key": video.object_key,
        }),
    )
}

fn resource(kind: &str, id: &str, attributes: Value) -> Value {
    json!({
        "type": kind,
        "id": id,
        "attributes": attributes,
    })
}

/// Wrap primary data in a top-level document with the JSON:API media type.
fn document(data: Value) -> Response {
    let mut response = (StatusCode::OK, Json(json!({ "data": data }))).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_API_MEDIA_TYPE),
    );
    response
}
