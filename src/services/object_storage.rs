//! Presigned URL issuance for the object store holding video bytes.
//!
//! The rest of the crate only sees the [`ObjectStorage`] trait. The production
//! implementation signs S3-compatible (MinIO, AWS) URLs locally with `object_store`.

use async_trait::async_trait;
use http::Method;
use object_store::{
    aws::{AmazonS3, AmazonS3Builder},
    path::Path,
    signer::Signer,
};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ObjectStorageError {
    #[error("object storage configuration invalid: {0}")]
    Config(#[source] object_store::Error),
    #[error("presigning {method} for {bucket}/{key} failed: {source}")]
    Presign {
        method: Method,
        bucket: String,
        key: String,
        #[source]
        source: object_store::Error,
    },
}

pub type ObjectStorageResult<T> = Result<T, ObjectStorageError>;

/// Issues time-limited, credential-free URLs for single objects.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// URL a client can HTTP PUT the object bytes to.
    async fn issue_upload_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> ObjectStorageResult<String>;

    /// URL a client can HTTP GET the object bytes from.
    async fn issue_download_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> ObjectStorageResult<String>;
}

/// Connection settings for an S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// Endpoint embedded in issued URLs, so it must be reachable by clients
    /// (e.g. "http://localhost:9000" for a local MinIO).
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

/// S3 presigner.
///
/// Buckets are chosen per call, so a client is built for each signature. Building is
/// purely local and signing needs no network round-trip with static credentials.
#[derive(Clone)]
pub struct S3ObjectStorage {
    settings: S3Settings,
}

impl S3ObjectStorage {
    /// Validate `settings` by building a client for `probe_bucket`.
    pub fn new(settings: S3Settings, probe_bucket: &str) -> ObjectStorageResult<Self> {
        let storage = Self { settings };
        storage
            .client_for(probe_bucket)
            .map_err(ObjectStorageError::Config)?;
        Ok(storage)
    }

    fn client_for(&self, bucket: &str) -> object_store::Result<AmazonS3> {
        let allow_http = self.settings.endpoint.starts_with("http://");
        AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&self.settings.region)
            .with_endpoint(&self.settings.endpoint)
            .with_access_key_id(&self.settings.access_key)
            .with_secret_access_key(&self.settings.secret_key)
            .with_virtual_hosted_style_request(false)
            .with_allow_http(allow_http)
            .build()
    }

    async fn sign(
        &self,
        method: Method,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> ObjectStorageResult<String> {
        let presign_err = |source: object_store::Error| ObjectStorageError::Presign {
            method: method.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            source,
        };

        // Parsed, not `Path::from`: the signed URL must name exactly `key`, encoded once.
        let path = Path::parse(key).map_err(|err| presign_err(err.into()))?;
        let client = self.client_for(bucket).map_err(presign_err)?;
        let url = client
            .signed_url(method.clone(), &path, ttl)
            .await
            .map_err(presign_err)?;

        debug!("signed {} url for {}/{}", method, bucket, key);
        Ok(url.to_string())
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn issue_upload_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> ObjectStorageResult<String> {
        self.sign(Method::PUT, bucket, key, ttl).await
    }

    async fn issue_download_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> ObjectStorageResult<String> {
        self.sign(Method::GET, bucket, key, ttl).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// One recorded presign request.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct IssuedUrl {
        pub method: Method,
        pub bucket: String,
        pub key: String,
        pub ttl: Duration,
    }

    /// In-memory stand-in that returns predictable URLs and records every request.
    #[derive(Default)]
    pub(crate) struct FakeObjectStorage {
        pub issued: Mutex<Vec<IssuedUrl>>,
        pub fail: bool,
    }

    /// Presigner pointed at a local MinIO with its default credentials.
    pub(crate) fn local_minio() -> S3ObjectStorage {
        S3ObjectStorage::new(
            S3Settings {
                endpoint: "http://localhost:9000".into(),
                region: "us-east-1".into(),
                access_key: "minioadmin".into(),
                secret_key: "minioadmin".into(),
            },
            "videos",
        )
        .unwrap()
    }

    impl FakeObjectStorage {
        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub(crate) fn issued(&self) -> Vec<IssuedUrl> {
            self.issued.lock().unwrap().clone()
        }

        fn record(
            &self,
            method: Method,
            bucket: &str,
            key: &str,
            ttl: Duration,
        ) -> ObjectStorageResult<String> {
            if self.fail {
                return Err(ObjectStorageError::Presign {
                    method,
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    source: object_store::Error::Generic {
                        store: "fake",
                        source: "presigning disabled".into(),
                    },
                });
            }
            let url = format!(
                "https://storage.test/{bucket}/{key}?method={method}&expires={}",
                ttl.as_secs()
            );
            self.issued.lock().unwrap().push(IssuedUrl {
                method,
                bucket: bucket.to_string(),
                key: key.to_string(),
                ttl,
            });
            Ok(url)
        }
    }

    #[async_trait]
    impl ObjectStorage for FakeObjectStorage {
        async fn issue_upload_url(
            &self,
            bucket: &str,
            key: &str,
            ttl: Duration,
        ) -> ObjectStorageResult<String> {
            self.record(Method::PUT, bucket, key, ttl)
        }

        async fn issue_download_url(
            &self,
            bucket: &str,
            key: &str,
            ttl: Duration,
        ) -> ObjectStorageResult<String> {
            self.record(Method::GET, bucket, key, ttl)
        }
    }
}
