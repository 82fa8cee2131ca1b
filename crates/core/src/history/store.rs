//! History storage trait and types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("History store lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for HistoryError {
    fn from(e: rusqlite::Error) -> Self {
        HistoryError::Database(e.to_string())
    }
}

/// Media identification attached to an accepted item, when known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMeta {
    /// e.g. "movie", "tv".
    pub media_type: String,
    pub title: String,
    pub year: Option<String>,
    pub season: Option<String>,
    pub episode: Option<String>,
}

/// One accepted item, keyed by `(torrent_name, enclosure)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupRecord {
    pub torrent_name: String,
    pub enclosure: Option<String>,
    pub media: Option<MediaMeta>,
    pub recorded_at: DateTime<Utc>,
}

impl DedupRecord {
    pub fn new(torrent_name: impl Into<String>, enclosure: Option<String>) -> Self {
        Self {
            torrent_name: torrent_name.into(),
            enclosure: enclosure.filter(|e| !e.is_empty()),
            media: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_media(mut self, media: MediaMeta) -> Self {
        self.media = Some(media);
        self
    }
}

/// Persistent set of accepted items.
///
/// Records are never updated; inserting an existing key is a no-op.
pub trait HistoryStore: Send + Sync {
    /// Whether any record has this enclosure.
    fn contains_enclosure(&self, enclosure: &str) -> Result<bool, HistoryError>;

    /// Whether any record has this torrent name.
    fn contains_name(&self, torrent_name: &str) -> Result<bool, HistoryError>;

    /// Insert a record. Returns `false` when the key was already present.
    fn insert(&self, record: &DedupRecord) -> Result<bool, HistoryError>;

    /// Delete records with this name, restricted to one enclosure when given.
    fn delete(&self, torrent_name: &str, enclosure: Option<&str>) -> Result<usize, HistoryError>;

    /// Delete every record.
    fn clear(&self) -> Result<usize, HistoryError>;

    /// All records, most recent first.
    fn list(&self, limit: usize) -> Result<Vec<DedupRecord>, HistoryError>;

    /// Number of records.
    fn count(&self) -> Result<u64, HistoryError>;
}
