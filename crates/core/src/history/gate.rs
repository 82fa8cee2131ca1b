use std::sync::Arc;

use tracing::debug;

use crate::feed::FeedItem;
use crate::metrics::{ITEMS_DEDUPLICATED, ITEMS_RECORDED};

use super::{DedupRecord, HistoryError, HistoryStore, MediaMeta};

/// Membership check against the history of accepted items.
///
/// Empty keys count as seen, so items without anything to key on never pass.
#[derive(Clone)]
pub struct DedupGate {
    store: Arc<dyn HistoryStore>,
}

impl DedupGate {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Whether an item with this enclosure was accepted before.
    pub fn seen_by_enclosure(&self, enclosure: &str) -> Result<bool, HistoryError> {
        if enclosure.is_empty() {
            return Ok(true);
        }
        self.store.contains_enclosure(enclosure)
    }

    /// Whether an item was accepted before: by enclosure when one is given,
    /// by title otherwise.
    pub fn seen(&self, title: &str, enclosure: &str) -> Result<bool, HistoryError> {
        if !enclosure.is_empty() {
            return self.store.contains_enclosure(enclosure);
        }
        if title.is_empty() {
            return Ok(true);
        }
        self.store.contains_name(title)
    }

    /// Record `item` as accepted. Returns `false` if it already was.
    pub fn accept(&self, item: &FeedItem, media: Option<&MediaMeta>) -> Result<bool, HistoryError> {
        let mut record = DedupRecord::new(item.title.clone(), item.enclosure.clone());
        if let Some(media) = media {
            record = record.with_media(media.clone());
        }
        let inserted = self.store.insert(&record)?;
        if inserted {
            ITEMS_RECORDED.inc();
            debug!(title = %item.title, "Item recorded in history");
        }
        Ok(inserted)
    }

    /// Forget every accepted item.
    pub fn clear_history(&self) -> Result<usize, HistoryError> {
        self.store.clear()
    }

    /// Forget the items named `title`, optionally only the one with `enclosure`.
    pub fn delete(&self, title: &str, enclosure: Option<&str>) -> Result<usize, HistoryError> {
        self.store.delete(title, enclosure)
    }

    /// Split `items` into those not seen before, keeping their order, and the
    /// number dropped. With `by_title` only titles are compared.
    pub fn retain_unseen(
        &self,
        items: Vec<FeedItem>,
        by_title: bool,
    ) -> Result<(Vec<FeedItem>, u32), HistoryError> {
        let mut fresh = Vec::with_capacity(items.len());
        let mut dropped = 0u32;
        for item in items {
            let enclosure = if by_title { "" } else { item.enclosure_str() };
            if self.seen(&item.title, enclosure)? {
                dropped += 1;
                ITEMS_DEDUPLICATED.inc();
            } else {
                fresh.push(item);
            }
        }
        Ok((fresh, dropped))
    }
}
