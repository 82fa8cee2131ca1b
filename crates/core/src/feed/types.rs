//! Types shared by the feed readers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::discount::EconomicAttributes;

/// Canonical feed record produced by both the XML and the API readers.
///
/// Built only through the normalizer, which guarantees a non-empty title and
/// at least one of `link` / `enclosure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Human-facing detail page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Resolvable download reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosure: Option<String>,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Only set for items read from the site API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<EconomicAttributes>,
}

impl FeedItem {
    /// Enclosure or `""` when absent.
    pub fn enclosure_str(&self) -> &str {
        self.enclosure.as_deref().unwrap_or_default()
    }

    /// Replace the enclosure. Empty strings are stored as `None`.
    pub fn with_enclosure(mut self, enclosure: Option<String>) -> Self {
        self.enclosure = enclosure.filter(|e| !e.is_empty());
        self
    }
}

/// One `<item>` as found in an RSS document, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawXmlItem {
    pub title: String,
    pub description: String,
    pub link: String,
    pub enclosure_url: String,
    pub enclosure_length: String,
    pub pub_date: String,
}

/// One entry of the site search API (`data.data[]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawApiResult {
    /// Numeric torrent id; the site sends it as a string.
    pub id: serde_json::Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<serde_json::Value>,
    #[serde(default)]
    pub small_descr: Option<String>,
    #[serde(default)]
    pub last_modified_date: Option<String>,
    #[serde(default)]
    pub status: Option<RawApiStatus>,
}

/// `status` block of an API search result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawApiStatus {
    #[serde(default)]
    pub discount: Option<String>,
    #[serde(default)]
    pub seeders: Option<serde_json::Value>,
}

/// Why a raw record did not become a [`FeedItem`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("missing title")]
    MissingTitle,

    #[error("neither link nor enclosure present")]
    MissingLink,

    #[error("invalid torrent id: {0}")]
    InvalidId(String),

    #[error("invalid size: {0}")]
    InvalidSize(String),
}

impl Rejection {
    /// Rejections caused by broken data rather than by acceptance policy.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Rejection::InvalidId(_) | Rejection::InvalidSize(_))
    }
}

/// Per-batch accounting of what happened to the records of one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Records turned into feed items.
    pub accepted: u32,
    /// Records skipped by acceptance policy (no title, no link).
    pub rejected: u32,
    /// Records that could not be parsed.
    pub malformed: u32,
    /// Items dropped because they were already in the history.
    pub deduplicated: u32,
    /// Pages that returned no usable response.
    pub page_failures: u32,
    /// Download-link lookups that failed.
    pub resolver_failures: u32,
    /// The document or crawl ended early (parse error, cancellation, page failure).
    pub truncated: bool,
}

impl IngestReport {
    /// Count a normalization result.
    pub fn record(&mut self, result: &Result<FeedItem, Rejection>) {
        match result {
            Ok(_) => self.accepted += 1,
            Err(r) if r.is_malformed() => self.malformed += 1,
            Err(_) => self.rejected += 1,
        }
    }

    pub fn merge(&mut self, other: &IngestReport) {
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.malformed += other.malformed;
        self.deduplicated += other.deduplicated;
        self.page_failures += other.page_failures;
        self.resolver_failures += other.resolver_failures;
        self.truncated |= other.truncated;
    }
}

/// Result of reading one feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome {
    Items {
        items: Vec<FeedItem>,
        report: IngestReport,
    },
    /// The subscription URL has expired and must be renewed.
    Expired,
}

impl FeedOutcome {
    pub fn empty() -> Self {
        FeedOutcome::Items {
            items: Vec::new(),
            report: IngestReport::default(),
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, FeedOutcome::Expired)
    }

    /// Items of the outcome; empty when expired.
    pub fn items(&self) -> &[FeedItem] {
        match self {
            FeedOutcome::Items { items, .. } => items,
            FeedOutcome::Expired => &[],
        }
    }
}
