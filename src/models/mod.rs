//! Core data models for the video catalog.
//!
//! `VideoRecord` maps to the `videos` table via `sqlx::FromRow` and serializes as JSON
//! via `serde`. `SearchIndexEntry` mirrors the `videos_fts` search table.

pub mod video;
