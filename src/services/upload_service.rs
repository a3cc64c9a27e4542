//! UploadService drives a video from "not yet stored" to "ready to view":
//! - `init_upload` allocates a unique object key, creates the pending record through the
//!   lifecycle and hands back a presigned PUT URL.
//! - `complete_upload` marks the record ready once the client says the PUT finished.
//!
//! A failure after the record was created (e.g. presigning) leaves that record pending.
//! Pending records are invisible to listing and nothing here cleans them up.

use crate::services::{
    lifecycle_service::VideoLifecycle,
    object_storage::ObjectStorage,
    video_store::{VideoError, VideoResult},
};
use std::{sync::Arc, time::Duration};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Lifetime of issued upload URLs.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(60 * 60);

const MAX_FILENAME_LEN: usize = 255;

/// Result of `init_upload`.
#[derive(Debug, Clone)]
pub struct UploadTicket {
    /// Canonical id minted by the lifecycle.
    pub video_id: String,
    /// Object key the client must upload to (`{uuid}/{filename}`).
    pub object_key: String,
    /// Presigned PUT URL for `object_key`.
    pub upload_url: String,
}

#[derive(Clone)]
pub struct UploadService {
    lifecycle: Arc<dyn VideoLifecycle>,
    storage: Arc<dyn ObjectStorage>,
    /// Bucket every upload lands in.
    bucket: String,
}

impl UploadService {
    pub fn new(
        lifecycle: Arc<dyn VideoLifecycle>,
        storage: Arc<dyn ObjectStorage>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            lifecycle,
            storage,
            bucket: bucket.into(),
        }
    }

    /// Create a pending video and return where to PUT its bytes.
    #[instrument(skip(self))]
    pub async fn init_upload(&self, title: &str, filename: &str) -> VideoResult<UploadTicket> {
        ensure_filename_safe(filename)?;

        // Namespaced by a fresh uuid so identical filenames never share a key.
        let object_key = format!("{}/{}", Uuid::new_v4(), filename);

        let video_id = self
            .lifecycle
            .create_video(title, &self.bucket, &object_key)
            .await?;

        let upload_url = match self
            .storage
            .issue_upload_url(&self.bucket, &object_key, UPLOAD_URL_TTL)
            .await
        {
            Ok(url) => url,
            Err(err) => {
                warn!("video {} left pending, presign failed: {}", video_id, err);
                return Err(VideoError::ObjectStorage(err));
            }
        };

        info!("upload initialized for video {} at {}", video_id, object_key);
        Ok(UploadTicket {
            video_id,
            object_key,
            upload_url,
        })
    }

    /// Mark the upload finished. The object's presence in storage is not checked.
    #[instrument(skip(self))]
    pub async fn complete_upload(&self, video_id: &str) -> VideoResult<()> {
        self.lifecycle
            .update_video_status(video_id, "ready")
            .await?;
        info!("upload completed for video {}", video_id);
        Ok(())
    }
}

/// Reject filenames that would escape or reshape the `{uuid}/{filename}` key layout.
fn ensure_filename_safe(filename: &str) -> VideoResult<()> {
    let invalid = |reason: &str| Err(VideoError::Validation(format!("filename {reason}")));

    if filename.trim().is_empty() {
        return invalid("must not be empty");
    }
    if filename.len() > MAX_FILENAME_LEN {
        return invalid("is too long");
    }
    if filename.contains('/') || filename.contains('\\') {
        return invalid("must not contain path separators");
    }
    if filename == "." || filename == ".." {
        return invalid("must not be a relative path component");
    }
    if filename.chars().any(char::is_control) {
        return invalid("must not contain control characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::video::VideoStatus,
        services::{
            lifecycle_service::LifecycleService,
            object_storage::testing::{FakeObjectStorage, local_minio},
            video_store::{VideoStore, tests::memory_store},
        },
    };
    use http::Method;

    struct Harness {
        uploads: UploadService,
        lifecycle: Arc<LifecycleService>,
        storage: Arc<FakeObjectStorage>,
        store: VideoStore,
    }

    async fn setup(storage: FakeObjectStorage) -> Harness {
        let store = memory_store().await;
        let lifecycle = Arc::new(LifecycleService::new(store.clone()));
        let storage = Arc::new(storage);
        let uploads = UploadService::new(lifecycle.clone(), storage.clone(), "videos");
        Harness {
            uploads,
            lifecycle,
            storage,
            store,
        }
    }

    #[tokio::test]
    async fn init_creates_pending_video_and_presigns_put() {
        let Harness { uploads, lifecycle, storage, .. } = setup(FakeObjectStorage::default()).await;

        let ticket = uploads.init_upload("T", "f.mp4").await.unwrap();
        assert!(!ticket.upload_url.is_empty());

        let video = lifecycle.get_video(&ticket.video_id).await.unwrap();
        assert_eq!(video.status, VideoStatus::Pending);
        assert_eq!(video.bucket_name, "videos");
        assert_eq!(video.object_key, ticket.object_key);

        let issued = storage.issued();
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].method, Method::PUT);
        assert_eq!(issued[0].bucket, "videos");
        assert_eq!(issued[0].key, ticket.object_key);
        assert_eq!(issued[0].ttl, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn object_key_is_uuid_slash_filename() {
        let Harness { uploads, .. } = setup(FakeObjectStorage::default()).await;

        let ticket = uploads.init_upload("My Video", "video.mp4").await.unwrap();
        let (segment, name) = ticket.object_key.split_once('/').unwrap();
        assert_eq!(segment.len(), 36);
        assert!(Uuid::parse_str(segment).is_ok());
        assert_eq!(name, "video.mp4");
    }

    #[tokio::test]
    async fn identical_uploads_get_distinct_ids_and_keys() {
        let Harness { uploads, .. } = setup(FakeObjectStorage::default()).await;

        let a = uploads.init_upload("Same", "same.mp4").await.unwrap();
        let b = uploads.init_upload("Same", "same.mp4").await.unwrap();
        assert_ne!(a.video_id, b.video_id);
        assert_ne!(a.object_key, b.object_key);
        assert!(a.object_key.ends_with("/same.mp4"));
        assert!(b.object_key.ends_with("/same.mp4"));
    }

    #[tokio::test]
    async fn complete_marks_ready_and_lists_video() {
        let Harness { uploads, lifecycle, .. } = setup(FakeObjectStorage::default()).await;

        let ticket = uploads.init_upload("My Video", "video.mp4").await.unwrap();
        uploads.complete_upload(&ticket.video_id).await.unwrap();

        let video = lifecycle.get_video(&ticket.video_id).await.unwrap();
        assert_eq!(video.status, VideoStatus::Ready);

        let listed = lifecycle.list_videos("").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "My Video");
        assert_eq!(listed[0].status, VideoStatus::Ready);
    }

    #[tokio::test]
    async fn complete_unknown_video_is_not_found() {
        let Harness { uploads, .. } = setup(FakeObjectStorage::default()).await;
        let err = uploads.complete_upload("nonexistent").await.unwrap_err();
        assert!(matches!(err, VideoError::NotFound(_)));
    }

    #[tokio::test]
    async fn presign_failure_propagates_and_leaves_record_pending() {
        let Harness {
            uploads,
            lifecycle,
            store,
            ..
        } = setup(FakeObjectStorage::failing()).await;

        let err = uploads.init_upload("Orphan", "o.mp4").await.unwrap_err();
        assert!(matches!(err, VideoError::ObjectStorage(_)));

        // The record exists but stays pending, so listing never shows it.
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM videos WHERE status = 'pending'")
                .fetch_one(&*store.db)
                .await
                .unwrap();
        assert_eq!(count, 1);
        assert!(lifecycle.list_videos("Orphan").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn metadata_failure_skips_presigning() {
        let Harness { uploads, storage, .. } = setup(FakeObjectStorage::default()).await;

        let err = uploads.init_upload("", "a.mp4").await.unwrap_err();
        assert!(matches!(err, VideoError::Validation(_)));
        assert!(storage.issued().is_empty());
    }

    #[tokio::test]
    async fn unsafe_filenames_are_rejected() {
        let Harness { uploads, storage, .. } = setup(FakeObjectStorage::default()).await;

        for name in ["", "../x.mp4", "a/b.mp4", "a\\b.mp4", "..", "bad\nname.mp4"] {
            let err = uploads.init_upload("T", name).await.unwrap_err();
            assert!(matches!(err, VideoError::Validation(_)), "{name:?}");
        }
        assert!(storage.issued().is_empty());
    }

    #[tokio::test]
    async fn presigned_url_names_the_stored_object_key() {
        let store = memory_store().await;
        let lifecycle = Arc::new(LifecycleService::new(store));
        let uploads = UploadService::new(lifecycle.clone(), Arc::new(local_minio()), "videos");

        let cases = [("clip[1].mp4", "clip%5B1%5D.mp4"), ("100%.mp4", "100%25.mp4")];
        for (filename, encoded) in cases {
            let ticket = uploads.init_upload("T", filename).await.unwrap();
            let video = lifecycle.get_video(&ticket.video_id).await.unwrap();
            let (segment, name) = video.object_key.split_once('/').unwrap();
            assert_eq!(name, filename);

            let expected = format!("http://localhost:9000/videos/{segment}/{encoded}?");
            assert!(ticket.upload_url.starts_with(&expected), "{}", ticket.upload_url);
        }
    }
}
