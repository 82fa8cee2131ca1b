//! Source ingestion: read a feed, drop what was seen before.

mod orchestrator;

pub use orchestrator::IngestionOrchestrator;

use serde::Serialize;
use thiserror::Error;

use crate::feed::FeedOutcome;
use crate::history::HistoryError;

/// Errors that abort the ingestion of a source.
///
/// Fetch and parse problems are not errors; they show up in the report.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("History store error: {0}")]
    History(#[from] HistoryError),
}

/// Outcome of ingesting one configured source.
#[derive(Debug)]
pub struct SourceResult {
    pub source: String,
    pub outcome: Result<FeedOutcome, IngestError>,
}

/// Per-source line of an ingestion summary.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub status: &'static str,
    pub new_items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&SourceResult> for SourceSummary {
    fn from(result: &SourceResult) -> Self {
        let (status, new_items, error) = match &result.outcome {
            Ok(FeedOutcome::Items { items, .. }) => ("ok", items.len(), None),
            Ok(FeedOutcome::Expired) => ("expired", 0, None),
            Err(e) => ("error", 0, Some(e.to_string())),
        };
        Self {
            source: result.source.clone(),
            status,
            new_items,
            error,
        }
    }
}
