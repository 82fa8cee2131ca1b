//! History of accepted feed items and the dedup gate in front of it.

mod gate;
mod sqlite_store;
mod store;

pub use gate::DedupGate;
pub use sqlite_store::SqliteHistoryStore;
pub use store::{DedupRecord, HistoryError, HistoryStore, MediaMeta};
