//! SQLite-backed history store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{DedupRecord, HistoryError, HistoryStore, MediaMeta};

/// SQLite-backed history store.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Create a new SQLite history store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, HistoryError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite history store (useful for testing).
    pub fn in_memory() -> Result<Self, HistoryError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), HistoryError> {
        // An absent enclosure is stored as '' so the unique key still applies.
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS rss_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                torrent_name TEXT NOT NULL,
                enclosure TEXT NOT NULL DEFAULT '',
                media_type TEXT,
                title TEXT,
                year TEXT,
                season TEXT,
                episode TEXT,
                recorded_at TEXT NOT NULL,
                UNIQUE(torrent_name, enclosure)
            );

            CREATE INDEX IF NOT EXISTS idx_rss_history_enclosure ON rss_history(enclosure);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, HistoryError> {
        self.conn.lock().map_err(|_| HistoryError::LockPoisoned)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<DedupRecord> {
        let torrent_name: String = row.get(0)?;
        let enclosure: String = row.get(1)?;
        let media_type: Option<String> = row.get(2)?;
        let title: Option<String> = row.get(3)?;
        let year: Option<String> = row.get(4)?;
        let season: Option<String> = row.get(5)?;
        let episode: Option<String> = row.get(6)?;
        let recorded_at_str: String = row.get(7)?;

        let recorded_at = DateTime::parse_from_rfc3339(&recorded_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let media = media_type.map(|media_type| MediaMeta {
            media_type,
            title: title.unwrap_or_default(),
            year,
            season,
            episode,
        });

        Ok(DedupRecord {
            torrent_name,
            enclosure: Some(enclosure).filter(|e| !e.is_empty()),
            media,
            recorded_at,
        })
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn contains_enclosure(&self, enclosure: &str) -> Result<bool, HistoryError> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM rss_history WHERE enclosure = ? LIMIT 1",
                params![enclosure],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn contains_name(&self, torrent_name: &str) -> Result<bool, HistoryError> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM rss_history WHERE torrent_name = ? LIMIT 1",
                params![torrent_name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&self, record: &DedupRecord) -> Result<bool, HistoryError> {
        let conn = self.conn()?;
        let media = record.media.as_ref();
        let inserted = conn.execute(
            "INSERT INTO rss_history (torrent_name, enclosure, media_type, title, year, season, episode, recorded_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(torrent_name, enclosure) DO NOTHING",
            params![
                record.torrent_name,
                record.enclosure.as_deref().unwrap_or_default(),
                media.map(|m| m.media_type.as_str()),
                media.map(|m| m.title.as_str()),
                media.and_then(|m| m.year.as_deref()),
                media.and_then(|m| m.season.as_deref()),
                media.and_then(|m| m.episode.as_deref()),
                record.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted > 0)
    }

    fn delete(&self, torrent_name: &str, enclosure: Option<&str>) -> Result<usize, HistoryError> {
        let conn = self.conn()?;
        let deleted = match enclosure {
            Some(enclosure) => conn.execute(
                "DELETE FROM rss_history WHERE torrent_name = ? AND enclosure = ?",
                params![torrent_name, enclosure],
            )?,
            None => conn.execute(
                "DELETE FROM rss_history WHERE torrent_name = ?",
                params![torrent_name],
            )?,
        };
        Ok(deleted)
    }

    fn clear(&self) -> Result<usize, HistoryError> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM rss_history", [])?)
    }

    fn list(&self, limit: usize) -> Result<Vec<DedupRecord>, HistoryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT torrent_name, enclosure, media_type, title, year, season, episode, recorded_at \
             FROM rss_history ORDER BY id DESC LIMIT ?",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![limit], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn count(&self) -> Result<u64, HistoryError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM rss_history", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> SqliteHistoryStore {
        SqliteHistoryStore::in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_lookup() {
        let store = create_test_store();
        let record = DedupRecord::new("Movie.2023", Some("https://e/1".to_string()));

        assert!(store.insert(&record).unwrap());
        assert!(store.contains_enclosure("https://e/1").unwrap());
        assert!(store.contains_name("Movie.2023").unwrap());
        assert!(!store.contains_enclosure("https://e/2").unwrap());
        assert!(!store.contains_name("Other").unwrap());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let store = create_test_store();
        let record = DedupRecord::new("Movie.2023", Some("https://e/1".to_string()));

        assert!(store.insert(&record).unwrap());
        assert!(!store.insert(&record).unwrap());
        assert_eq!(store.count().unwrap(), 1);

        // Same name without enclosure is a different key, and also unique.
        let bare = DedupRecord::new("Movie.2023", None);
        assert!(store.insert(&bare).unwrap());
        assert!(!store.insert(&bare).unwrap());
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_media_round_trip() {
        let store = create_test_store();
        let media = MediaMeta {
            media_type: "tv".to_string(),
            title: "Show".to_string(),
            year: Some("2023".to_string()),
            season: Some("S01".to_string()),
            episode: Some("E02".to_string()),
        };
        store
            .insert(&DedupRecord::new("Show.S01E02", None).with_media(media.clone()))
            .unwrap();

        let records = store.list(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].media, Some(media));
        assert_eq!(records[0].enclosure, None);
    }

    #[test]
    fn test_delete_by_name_and_enclosure() {
        let store = create_test_store();
        store
            .insert(&DedupRecord::new("A", Some("e1".to_string())))
            .unwrap();
        store
            .insert(&DedupRecord::new("A", Some("e2".to_string())))
            .unwrap();
        store.insert(&DedupRecord::new("B", None)).unwrap();

        assert_eq!(store.delete("A", Some("e1")).unwrap(), 1);
        assert!(!store.contains_enclosure("e1").unwrap());
        assert!(store.contains_enclosure("e2").unwrap());

        assert_eq!(store.delete("A", None).unwrap(), 1);
        assert!(!store.contains_name("A").unwrap());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_clear() {
        let store = create_test_store();
        store.insert(&DedupRecord::new("A", None)).unwrap();
        store.insert(&DedupRecord::new("B", None)).unwrap();
        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_list_most_recent_first() {
        let store = create_test_store();
        for name in ["first", "second", "third"] {
            store.insert(&DedupRecord::new(name, None)).unwrap();
        }
        let names: Vec<_> = store
            .list(2)
            .unwrap()
            .into_iter()
            .map(|r| r.torrent_name)
            .collect();
        assert_eq!(names, vec!["third", "second"]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.db");

        {
            let store = SqliteHistoryStore::new(&path).unwrap();
            store
                .insert(&DedupRecord::new("A", Some("e".to_string())))
                .unwrap();
        }

        let store = SqliteHistoryStore::new(&path).unwrap();
        assert!(store.contains_enclosure("e").unwrap());
    }
}
