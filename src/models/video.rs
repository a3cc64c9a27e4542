//! Represents a video and its search index entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};

/// Upload/visibility state of a video.
///
/// Records are born `Pending`; only `Ready` records are visible to listing and search.
/// `Error` is reserved for failure detection and is not set by any current code path.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Pending,
    Ready,
    Error,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Ready => "ready",
            VideoStatus::Error => "error",
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status string is not one of `pending`, `ready`, `error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl FromStr for VideoStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VideoStatus::Pending),
            "ready" => Ok(VideoStatus::Ready),
            "error" => Ok(VideoStatus::Error),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// The canonical persisted record of one video.
///
/// `bucket_name` and `object_key` locate the bytes in object storage. Both are decided
/// by whoever creates the record and are never rewritten afterwards.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct VideoRecord {
    /// UUID v4 in hyphenated text form.
    pub id: String,

    /// Human-readable title, never empty.
    pub title: String,

    /// Optional free-text description.
    pub description: Option<String>,

    /// Bucket holding the object. May be empty on legacy rows.
    pub bucket_name: String,

    /// Key of the object inside the bucket, `{uuid}/{filename}` for uploads.
    pub object_key: String,

    /// Current lifecycle state.
    pub status: VideoStatus,

    /// Insertion time, assigned by the store.
    pub created_at: DateTime<Utc>,
}

/// Full-text index row derived from a [`VideoRecord`].
#[derive(Clone, FromRow, Debug, PartialEq, Eq)]
pub struct SearchIndexEntry {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

impl From<&VideoRecord> for SearchIndexEntry {
    fn from(record: &VideoRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_known_values_only() {
        assert_eq!("ready".parse::<VideoStatus>(), Ok(VideoStatus::Ready));
        assert_eq!("error".parse::<VideoStatus>(), Ok(VideoStatus::Error));
        assert_eq!(
            "READY".parse::<VideoStatus>(),
            Err(UnknownStatus("READY".into()))
        );
        assert_eq!(VideoStatus::Pending.to_string(), "pending");
    }
}
