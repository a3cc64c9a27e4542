//! Defines the public gateway routes.
//!
//! ## Structure
//! - **Upload**
//!   - `POST /api/upload/init`: create a pending video, get a presigned PUT URL
//!   - `POST /api/upload/complete`: mark an uploaded video ready
//!
//! - **Catalog**
//!   - `GET /api/videos?q=`: list ready videos, optionally full-text filtered
//!   - `GET /api/videos/{id}`: fetch one video
//!
//! - **Streaming**
//!   - `GET /api/stream/videos/{id}`: presigned download URL
//!
//! Health probes are mounted at `/healthz` and `/readyz`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        video_handlers::{complete_upload, get_video, init_upload, list_videos, stream_video},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Build the router for all gateway routes.
///
/// Every request is traced, subject to a `request_timeout` deadline and answered with
/// permissive CORS headers so browser clients on other origins can call the API.
pub fn routes(request_timeout: Duration) -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // upload protocol
        .route("/api/upload/init", post(init_upload))
        .route("/api/upload/complete", post(complete_upload))
        // catalog
        .route("/api/videos", get(list_videos))
        .route("/api/videos/{id}", get(get_video))
        // streaming
        .route("/api/stream/videos/{id}", get(stream_video))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
