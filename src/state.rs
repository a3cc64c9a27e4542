//! Shared handler state.

use crate::services::{
    lifecycle_service::VideoLifecycle, stream_service::StreamService,
    upload_service::UploadService, video_store::VideoStore,
};
use std::sync::Arc;

/// Everything handlers need, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    /// Direct store access, used only by the readiness probe.
    pub store: VideoStore,
    pub lifecycle: Arc<dyn VideoLifecycle>,
    pub uploads: UploadService,
    pub streams: StreamService,
}
