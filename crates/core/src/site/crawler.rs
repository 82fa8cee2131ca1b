use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SiteConfig;
use crate::feed::{json_u64, normalize_api_result, FeedOutcome, IngestReport, RawApiResult};
use crate::http::RequestExecutor;
use crate::metrics::{API_PAGES, FEED_ITEMS};

use super::client::SiteApi;
use super::resolver::DetailLinkResolver;
use super::types::SearchPage;

/// Search and paging parameters of a crawl.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub mode: String,
    pub page_size: u32,
    pub max_pages: u32,
    /// Delay between consecutive download-link lookups.
    pub pacing: Duration,
    pub detail_url_prefix: String,
}

impl From<&SiteConfig> for CrawlSettings {
    fn from(site: &SiteConfig) -> Self {
        Self {
            mode: site.mode.clone(),
            page_size: site.page_size,
            max_pages: site.max_pages,
            pacing: site.pacing(),
            detail_url_prefix: site.detail_url_prefix.clone(),
        }
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self::from(&SiteConfig::default())
    }
}

/// Crawls the paged JSON search endpoint of the site.
pub struct PagedApiCrawler {
    executor: Arc<dyn RequestExecutor>,
    resolver: Arc<dyn DetailLinkResolver>,
    settings: CrawlSettings,
    cancel: Option<CancellationToken>,
}

impl PagedApiCrawler {
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        resolver: Arc<dyn DetailLinkResolver>,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            executor,
            resolver,
            settings,
            cancel: None,
        }
    }

    /// Stop the crawl at the next page boundary or resolver call once `token`
    /// is cancelled. Items collected so far are kept.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Crawl up to `max_pages` pages of `search_url`.
    ///
    /// Never fails: a missing key gives an empty outcome, a failed page ends
    /// the crawl with the pages already collected.
    pub async fn crawl(&self, search_url: &str, api_key: &str, use_proxy: bool) -> FeedOutcome {
        if api_key.is_empty() {
            warn!(url = %search_url, "Site API key not configured, skipping crawl");
            return FeedOutcome::empty();
        }

        let api = SiteApi::new(self.executor.clone(), api_key).with_proxy(use_proxy);
        let mut items = Vec::new();
        let mut report = IngestReport::default();
        let mut lookups = 0u32;

        'pages: for page_number in 1..=self.settings.max_pages {
            if self.is_cancelled() {
                report.truncated = true;
                break;
            }

            let Some(page) = self.fetch_page(&api, search_url, page_number).await else {
                API_PAGES.with_label_values(&["failed"]).inc();
                report.page_failures += 1;
                report.truncated = true;
                break;
            };
            API_PAGES.with_label_values(&["ok"]).inc();
            let total_pages = page.total_pages.as_ref().and_then(json_u64);
            let records = page.data.unwrap_or_default();
            debug!(page = page_number, results = records.len(), "Search page fetched");

            if records.is_empty() {
                break;
            }

            for record in records {
                let raw: RawApiResult = match serde_json::from_value(record) {
                    Ok(raw) => raw,
                    Err(e) => {
                        debug!(error = %e, "Skipping malformed search result");
                        report.malformed += 1;
                        FEED_ITEMS.with_label_values(&["api", "malformed"]).inc();
                        continue;
                    }
                };
                let item = match normalize_api_result(&raw, &self.settings.detail_url_prefix) {
                    Ok(item) => item,
                    Err(rejection) => {
                        debug!(id = %raw.id, reason = %rejection, "Skipping search result");
                        let outcome = if rejection.is_malformed() {
                            "malformed"
                        } else {
                            "rejected"
                        };
                        FEED_ITEMS.with_label_values(&["api", outcome]).inc();
                        report.record(&Err(rejection));
                        continue;
                    }
                };

                if lookups > 0 && !self.pause().await {
                    report.truncated = true;
                    break 'pages;
                }
                if self.is_cancelled() {
                    report.truncated = true;
                    break 'pages;
                }
                lookups += 1;

                let link = item.link.clone().unwrap_or_default();
                let enclosure = self.resolver.resolve(&link, use_proxy).await;
                if enclosure.as_deref().map_or(true, str::is_empty) {
                    warn!(detail_url = %link, "No download link for search result");
                    report.resolver_failures += 1;
                }

                report.accepted += 1;
                FEED_ITEMS.with_label_values(&["api", "accepted"]).inc();
                items.push(item.with_enclosure(enclosure));
            }

            if total_pages.is_some_and(|total| u64::from(page_number) >= total) {
                break;
            }
        }

        info!(
            url = %search_url,
            items = items.len(),
            malformed = report.malformed,
            resolver_failures = report.resolver_failures,
            page_failures = report.page_failures,
            "Site crawl complete"
        );
        FeedOutcome::Items { items, report }
    }

    async fn fetch_page(
        &self,
        api: &SiteApi,
        search_url: &str,
        page_number: u32,
    ) -> Option<SearchPage> {
        let body = json!({
            "mode": self.settings.mode,
            "categories": [],
            "visible": 1,
            "pageNumber": page_number,
            "pageSize": self.settings.page_size,
        });
        let data = api.post_json(search_url, body, "search").await?;
        if data.is_null() {
            return Some(SearchPage::default());
        }
        match serde_json::from_value(data) {
            Ok(page) => Some(page),
            Err(e) => {
                warn!(url = %search_url, page = page_number, error = %e, "Unexpected search page shape");
                None
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Wait out the pacing delay. Returns `false` if cancelled meanwhile.
    async fn pause(&self) -> bool {
        let pacing = self.settings.pacing;
        if pacing.is_zero() {
            return true;
        }
        match &self.cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => false,
                _ = tokio::time::sleep(pacing) => true,
            },
            None => {
                tokio::time::sleep(pacing).await;
                true
            }
        }
    }
}
