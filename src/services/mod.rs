//! Business services. Leaves first: the SQLite-backed store, the lifecycle that is the
//! only way other services touch video state, presigned URL issuance, and the upload
//! and stream services built on those.

pub mod lifecycle_service;
pub mod object_storage;
pub mod stream_service;
pub mod upload_service;
pub mod video_store;
