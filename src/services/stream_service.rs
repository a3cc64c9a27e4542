//! Resolves a video id to a time-limited download URL.

use crate::services::{
    lifecycle_service::VideoLifecycle, object_storage::ObjectStorage, video_store::VideoResult,
};
use std::{sync::Arc, time::Duration};
use tracing::debug;

/// Lifetime of issued stream URLs.
pub const STREAM_URL_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone)]
pub struct StreamService {
    lifecycle: Arc<dyn VideoLifecycle>,
    storage: Arc<dyn ObjectStorage>,
    /// Used when a record carries no bucket of its own.
    default_bucket: String,
}

impl StreamService {
    pub fn new(
        lifecycle: Arc<dyn VideoLifecycle>,
        storage: Arc<dyn ObjectStorage>,
        default_bucket: impl Into<String>,
    ) -> Self {
        Self {
            lifecycle,
            storage,
            default_bucket: default_bucket.into(),
        }
    }

    /// Presigned GET URL for the video's object. Lookup and signing errors pass through.
    pub async fn get_stream_url(&self, video_id: &str) -> VideoResult<String> {
        let video = self.lifecycle.get_video(video_id).await?;

        let bucket = if video.bucket_name.is_empty() {
            debug!("video {} has no bucket, using {}", video_id, self.default_bucket);
            self.default_bucket.as_str()
        } else {
            video.bucket_name.as_str()
        };

        let url = self
            .storage
            .issue_download_url(bucket, &video.object_key, STREAM_URL_TTL)
            .await?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::video::{VideoRecord, VideoStatus},
        services::{
            lifecycle_service::LifecycleService,
            object_storage::testing::FakeObjectStorage,
            video_store::{VideoError, tests::memory_store},
        },
    };
    use chrono::Utc;
    use http::Method;

    async fn setup(
        storage: FakeObjectStorage,
    ) -> (StreamService, Arc<LifecycleService>, Arc<FakeObjectStorage>) {
        let lifecycle = Arc::new(LifecycleService::new(memory_store().await));
        let storage = Arc::new(storage);
        let streams = StreamService::new(lifecycle.clone(), storage.clone(), "fallback");
        (streams, lifecycle, storage)
    }

    #[tokio::test]
    async fn uses_record_bucket_when_present() {
        let (streams, lifecycle, storage) = setup(FakeObjectStorage::default()).await;
        let id = lifecycle
            .create_video("Clip", "archive", "u/clip.mp4")
            .await
            .unwrap();

        let url = streams.get_stream_url(&id).await.unwrap();
        assert!(!url.is_empty());

        let issued = storage.issued();
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].method, Method::GET);
        assert_eq!(issued[0].bucket, "archive");
        assert_eq!(issued[0].key, "u/clip.mp4");
        assert_eq!(issued[0].ttl, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn falls_back_to_default_bucket_when_record_has_none() {
        let store = memory_store().await;
        store
            .create(&VideoRecord {
                id: "legacy".into(),
                title: "Legacy".into(),
                description: None,
                bucket_name: String::new(),
                object_key: "old/legacy.mp4".into(),
                status: VideoStatus::Pending,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let storage = Arc::new(FakeObjectStorage::default());
        let streams = StreamService::new(
            Arc::new(LifecycleService::new(store)),
            storage.clone(),
            "fallback",
        );

        streams.get_stream_url("legacy").await.unwrap();
        let issued = storage.issued();
        assert_eq!(issued[0].bucket, "fallback");
        assert_eq!(issued[0].key, "old/legacy.mp4");
    }

    #[tokio::test]
    async fn unknown_video_is_not_found_without_presigning() {
        let (streams, _, storage) = setup(FakeObjectStorage::default()).await;
        let err = streams.get_stream_url("nonexistent").await.unwrap_err();
        assert!(matches!(err, VideoError::NotFound(_)));
        assert!(storage.issued().is_empty());
    }

    #[tokio::test]
    async fn presign_failure_propagates() {
        let (streams, lifecycle, _) = setup(FakeObjectStorage::failing()).await;
        let id = lifecycle
            .create_video("Clip", "videos", "u/clip.mp4")
            .await
            .unwrap();

        let err = streams.get_stream_url(&id).await.unwrap_err();
        assert!(matches!(err, VideoError::ObjectStorage(_)));
    }
}
