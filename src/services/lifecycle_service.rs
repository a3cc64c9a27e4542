//! Video lifecycle: creation and status transitions on top of [`VideoStore`].
//!
//! Other components reach video state only through the [`VideoLifecycle`] trait, which
//! keeps them indifferent to whether the lifecycle runs in-process or behind RPC.

use crate::{
    models::video::{VideoRecord, VideoStatus},
    services::video_store::{VideoError, VideoResult, VideoStore},
};
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

/// Contract every reader and writer of video state goes through.
#[async_trait]
pub trait VideoLifecycle: Send + Sync {
    /// Create a pending record and return its freshly minted id.
    async fn create_video(
        &self,
        title: &str,
        bucket: &str,
        object_key: &str,
    ) -> VideoResult<String>;

    async fn get_video(&self, id: &str) -> VideoResult<VideoRecord>;

    /// Ready records only, optionally full-text filtered.
    async fn list_videos(&self, query: &str) -> VideoResult<Vec<VideoRecord>>;

    /// Move a record to `status` (`ready` or `error`).
    async fn update_video_status(&self, id: &str, status: &str) -> VideoResult<()>;
}

/// Stateless lifecycle layer over the metadata store.
#[derive(Clone)]
pub struct LifecycleService {
    store: VideoStore,
}

impl LifecycleService {
    pub fn new(store: VideoStore) -> Self {
        Self { store }
    }
}

/// Parse a requested status and reject targets a record may never move to.
///
/// Records are born `pending` and never return to it, so `pending` is never a valid
/// target, whatever the current status.
fn parse_target_status(status: &str) -> VideoResult<VideoStatus> {
    let target = status
        .parse::<VideoStatus>()
        .map_err(|unknown| VideoError::Validation(format!("unknown status `{}`", unknown.0)))?;

    if target == VideoStatus::Pending {
        return Err(VideoError::InvalidTransition { to: target });
    }
    Ok(target)
}

#[async_trait]
impl VideoLifecycle for LifecycleService {
    async fn create_video(
        &self,
        title: &str,
        bucket: &str,
        object_key: &str,
    ) -> VideoResult<String> {
        if title.trim().is_empty() {
            return Err(VideoError::Validation("title must not be empty".into()));
        }

        let record = VideoRecord {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: None,
            bucket_name: bucket.to_string(),
            object_key: object_key.to_string(),
            status: VideoStatus::Pending,
            created_at: Utc::now(),
        };
        self.store.create(&record).await?;

        info!("video {} created in {}/{}", record.id, bucket, object_key);
        Ok(record.id)
    }

    async fn get_video(&self, id: &str) -> VideoResult<VideoRecord> {
        self.store.get(id).await
    }

    async fn list_videos(&self, query: &str) -> VideoResult<Vec<VideoRecord>> {
        self.store.list(query).await
    }

    async fn update_video_status(&self, id: &str, status: &str) -> VideoResult<()> {
        let target = parse_target_status(status)?;
        self.store.update_status(id, target).await?;
        info!("video {} is now {}", id, target);
        Ok(())
    }
}
