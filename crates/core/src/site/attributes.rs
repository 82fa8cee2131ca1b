use serde_json::Value;
use tracing::debug;

use crate::discount::classify;

use super::client::SiteApi;
use super::types::{lenient_int, TorrentAttributes};
use super::{api_base_url, detail_id};

/// Looks up discount and seeder count of a single torrent.
pub struct TorrentAttributeLookup {
    api: SiteApi,
}

impl TorrentAttributeLookup {
    pub fn new(api: SiteApi) -> Self {
        Self { api }
    }

    /// Attributes of the torrent behind `detail_url`.
    ///
    /// Falls back to normal attributes and zero seeders when the torrent
    /// cannot be looked up.
    pub async fn lookup(&self, detail_url: &str) -> TorrentAttributes {
        match self.fetch_status(detail_url).await {
            Some(status) => {
                let discount = status.get("discount").and_then(Value::as_str);
                let seeders = status.get("seeders").map(lenient_int).unwrap_or(0);
                TorrentAttributes {
                    economics: classify(discount),
                    seeders: u32::try_from(seeders).unwrap_or(0),
                }
            }
            None => TorrentAttributes::default(),
        }
    }

    async fn fetch_status(&self, detail_url: &str) -> Option<Value> {
        let Some(id) = detail_id(detail_url) else {
            debug!(detail_url = %detail_url, "No torrent id in detail url");
            return None;
        };
        let api_base = api_base_url(detail_url)?;
        let data = self
            .api
            .post_form(
                &format!("{}/api/torrent/detail", api_base),
                format!("id={}", id),
                "detail",
            )
            .await?;
        data.get("status").cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discount::EconomicAttributes;
    use crate::testing::MockExecutor;
    use serde_json::json;
    use std::sync::Arc;

    const DETAIL_API: &str = "https://api.m-team.cc/api/torrent/detail";

    #[tokio::test]
    async fn test_lookup_reads_status() {
        let executor = Arc::new(MockExecutor::new());
        executor.respond_json(
            DETAIL_API,
            json!({"message": "SUCCESS", "data": {"id": "9", "status": {"discount": "PERCENT_50", "seeders": "17"}}}),
        );
        let lookup = TorrentAttributeLookup::new(SiteApi::new(executor.clone(), "key"));

        let attrs = lookup.lookup("https://kp.m-team.cc/detail/9").await;

        assert_eq!(attrs.seeders, 17);
        assert_eq!(attrs.economics.download_factor, 0.5);
        assert!(!attrs.economics.is_free);
        assert_eq!(
            executor.requests()[0].body,
            Some(crate::http::RequestBody::Form("id=9".to_string()))
        );
    }

    #[tokio::test]
    async fn test_lookup_defaults_on_failure() {
        let executor = Arc::new(MockExecutor::new());
        executor.fail(DETAIL_API);
        let lookup = TorrentAttributeLookup::new(SiteApi::new(executor, "key"));

        let attrs = lookup.lookup("https://kp.m-team.cc/detail/9").await;
        assert_eq!(attrs.seeders, 0);
        assert_eq!(attrs.economics, EconomicAttributes::default());

        let attrs = lookup.lookup("https://kp.m-team.cc/nothing").await;
        assert_eq!(attrs, TorrentAttributes::default());
    }
}
