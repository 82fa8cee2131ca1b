use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, SiteConfig, SourceConfig, SourceKind};
use crate::feed::{FeedOutcome, XmlFeedReader};
use crate::history::{DedupGate, HistoryStore};
use crate::http::RequestExecutor;
use crate::site::{CrawlSettings, PagedApiCrawler, SiteApi, TokenLinkResolver};

use super::{IngestError, SourceResult};

/// Reads sources through the matching reader and filters out items already
/// in the history. Never records anything itself.
pub struct IngestionOrchestrator {
    xml: XmlFeedReader,
    crawler: PagedApiCrawler,
    gate: DedupGate,
    site: SiteConfig,
}

impl IngestionOrchestrator {
    pub fn new(
        xml: XmlFeedReader,
        crawler: PagedApiCrawler,
        gate: DedupGate,
        site: SiteConfig,
    ) -> Self {
        Self {
            xml,
            crawler,
            gate,
            site,
        }
    }

    /// Wire the readers from configuration, resolving download links with
    /// the site's token endpoint.
    pub fn from_config(
        config: &Config,
        executor: Arc<dyn RequestExecutor>,
        store: Arc<dyn HistoryStore>,
    ) -> Self {
        let resolver =
            TokenLinkResolver::new(SiteApi::new(executor.clone(), config.site.api_key.as_str()));
        let crawler = PagedApiCrawler::new(
            executor.clone(),
            Arc::new(resolver),
            CrawlSettings::from(&config.site),
        );
        Self::new(
            XmlFeedReader::new(executor),
            crawler,
            DedupGate::new(store),
            config.site.clone(),
        )
    }

    /// Stop API crawls early once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.crawler = self.crawler.with_cancellation(token);
        self
    }

    pub fn gate(&self) -> &DedupGate {
        &self.gate
    }

    /// Reader used for `source`, see [`SourceConfig::kind_for`].
    pub fn classify(&self, source: &SourceConfig) -> SourceKind {
        source.kind_for(&self.site)
    }

    /// Read `source` and return the items not seen before, in source order.
    ///
    /// API items are compared by title only: their enclosures are single-use
    /// download tokens and differ on every crawl.
    pub async fn ingest(&self, source: &SourceConfig) -> Result<FeedOutcome, IngestError> {
        let kind = self.classify(source);
        let outcome = match kind {
            SourceKind::Xml => self.xml.fetch(&source.url, source.proxy).await,
            SourceKind::Api => {
                self.crawler
                    .crawl(&self.site.search_url, &self.site.api_key, source.proxy)
                    .await
            }
        };

        let (items, mut report) = match outcome {
            FeedOutcome::Expired => {
                warn!(source = %source.name, "Feed link expired, renew the subscription url");
                return Ok(FeedOutcome::Expired);
            }
            FeedOutcome::Items { items, report } => (items, report),
        };

        let fetched = items.len();
        let (items, dropped) = self.gate.retain_unseen(items, kind == SourceKind::Api)?;
        report.deduplicated += dropped;

        info!(
            source = %source.name,
            kind = ?kind,
            fetched = fetched,
            new = items.len(),
            deduplicated = dropped,
            "Source ingested"
        );
        Ok(FeedOutcome::Items { items, report })
    }

    /// Ingest every source concurrently. Results keep the order of `sources`.
    pub async fn ingest_all(&self, sources: &[SourceConfig]) -> Vec<SourceResult> {
        let futures = sources.iter().map(|source| async move {
            SourceResult {
                source: source.name.clone(),
                outcome: self.ingest(source).await,
            }
        });
        join_all(futures).await
    }
}
