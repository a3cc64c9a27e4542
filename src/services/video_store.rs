//! VideoStore: the store of record for video metadata, backed by SQLite. Every write to
//! the `videos` table performs the matching write to the `videos_fts` search table inside
//! the same transaction, so a record and its index entry are never observed apart.

use crate::{
    models::video::{SearchIndexEntry, VideoRecord, VideoStatus},
    services::object_storage::ObjectStorageError,
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const MIGRATION_SQL: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("video `{0}` not found")]
    NotFound(String),
    #[error("video `{0}` already exists")]
    DuplicateId(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("status cannot move to `{to}`")]
    InvalidTransition { to: VideoStatus },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    ObjectStorage(#[from] ObjectStorageError),
}

pub type VideoResult<T> = Result<T, VideoError>;

/// Outcome of a search index repair sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Index entries created for records that had none.
    pub inserted: u64,
    /// Index entries removed because their record no longer exists.
    pub removed: u64,
}

/// VideoStore provides the metadata operations of the platform:
/// - Create a record (row + search entry, one transaction)
/// - Get a record by id
/// - List ready records, optionally full-text filtered and relevance ordered
/// - Update a record's status (row + search entry resync, one transaction)
///
/// No method writes `videos` without also writing `videos_fts`.
#[derive(Clone)]
pub struct VideoStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl VideoStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Create tables and indexes from the embedded migration. Safe to run repeatedly.
    pub async fn run_migrations(&self) -> VideoResult<()> {
        let statements = MIGRATION_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        debug!("running {} migration statements", statements.len());
        for stmt in statements {
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Lightweight connectivity check (`SELECT 1`).
    pub async fn ping(&self) -> VideoResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }

    /// Insert a new record in `pending` state together with its search entry.
    ///
    /// The status and `created_at` of `record` are ignored: new rows always start pending
    /// and are stamped with the insertion time.
    pub async fn create(&self, record: &VideoRecord) -> VideoResult<()> {
        let entry = SearchIndexEntry::from(record);
        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO videos (id, title, description, bucket_name, object_key, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.bucket_name)
        .bind(&record.object_key)
        .bind(VideoStatus::Pending)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(VideoError::DuplicateId(record.id.clone()));
            }
            Err(err) => return Err(VideoError::Database(err)),
        }

        sqlx::query("INSERT INTO videos_fts (id, title, description) VALUES (?, ?, ?)")
            .bind(&entry.id)
            .bind(&entry.title)
            .bind(&entry.description)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!("created video {} at {}", record.id, record.object_key);
        Ok(())
    }

    /// Fetch a record by id, whatever its status.
    pub async fn get(&self, id: &str) -> VideoResult<VideoRecord> {
        sqlx::query_as::<_, VideoRecord>(
            "SELECT id, title, description, bucket_name, object_key, status, created_at
             FROM videos WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => VideoError::NotFound(id.to_string()),
            other => VideoError::Database(other),
        })
    }

    /// List ready records.
    ///
    /// With a blank query every ready record is returned in creation order. Otherwise the
    /// query is matched against title and description through the search table and
    /// results come back best match first, ties in creation order.
    pub async fn list(&self, query: &str) -> VideoResult<Vec<VideoRecord>> {
        if query.trim().is_empty() {
            let rows = sqlx::query_as::<_, VideoRecord>(
                "SELECT id, title, description, bucket_name, object_key, status, created_at
                 FROM videos
                 WHERE status = ?
                 ORDER BY rowid ASC",
            )
            .bind(VideoStatus::Ready)
            .fetch_all(&*self.db)
            .await?;
            return Ok(rows);
        }

        // Input made only of punctuation has nothing the tokenizer could match.
        let Some(fts_query) = to_fts_query(query) else {
            return Ok(Vec::new());
        };

        debug!("searching videos with fts query {}", fts_query);
        let rows = sqlx::query_as::<_, VideoRecord>(
            "SELECT v.id, v.title, v.description, v.bucket_name, v.object_key, v.status, v.created_at
             FROM videos v
             JOIN videos_fts ON videos_fts.id = v.id
             WHERE v.status = ? AND videos_fts MATCH ?
             ORDER BY bm25(videos_fts) ASC, v.rowid ASC",
        )
        .bind(VideoStatus::Ready)
        .bind(&fts_query)
        .fetch_all(&*self.db)
        .await?;

        Ok(rows)
    }

    /// Set the status of exactly one record.
    ///
    /// The search entry is rewritten from the row in the same transaction. The value is
    /// stored as given; transition rules live in the lifecycle service.
    pub async fn update_status(&self, id: &str, status: VideoStatus) -> VideoResult<()> {
        let mut tx = self.db.begin().await?;

        let entry = sqlx::query_as::<_, SearchIndexEntry>(
            "UPDATE videos SET status = ? WHERE id = ?
             RETURNING id, title, description",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| VideoError::NotFound(id.to_string()))?;

        sqlx::query("UPDATE videos_fts SET title = ?, description = ? WHERE id = ?")
            .bind(&entry.title)
            .bind(&entry.description)
            .bind(&entry.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!("video {} status -> {}", id, status);
        Ok(())
    }

    /// Bring the search table back in line with `videos`.
    ///
    /// Adds entries for records without one and drops entries without a record.
    pub async fn sync_search_index(&self) -> VideoResult<SyncReport> {
        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO videos_fts (id, title, description)
             SELECT id, title, description FROM videos
             WHERE id NOT IN (SELECT id FROM videos_fts)",
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let removed =
            sqlx::query("DELETE FROM videos_fts WHERE id NOT IN (SELECT id FROM videos)")
                .execute(&mut *tx)
                .await?
                .rows_affected();

        tx.commit().await?;
        Ok(SyncReport { inserted, removed })
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

/// Turn free user text into an FTS5 query.
///
/// Each whitespace-separated token becomes a quoted string (embedded quotes doubled), so
/// operators and punctuation in user input are matched literally instead of parsed.
/// Tokens without any alphanumeric character are dropped. Tokens are joined with
/// implicit AND. Returns None when nothing searchable is left.
fn to_fts_query(query: &str) -> Option<String> {
    let tokens = query
        .split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .map(|token| format!("\"{}\"", token.replace('"', "\"\"")))
        .collect::<Vec<_>>();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}
