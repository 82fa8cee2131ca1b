use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::metrics::LINK_RESOLUTIONS;

use super::client::SiteApi;
use super::{api_base_url, detail_id};

/// Turns a torrent detail page into a download link.
#[async_trait]
pub trait DetailLinkResolver: Send + Sync {
    /// Download link for `detail_url`, or `None` when it cannot be obtained.
    /// `use_proxy` routes the lookup through the configured proxy.
    async fn resolve(&self, detail_url: &str, use_proxy: bool) -> Option<String>;
}

/// Resolver that asks the site API for a single-use download token.
pub struct TokenLinkResolver {
    api: SiteApi,
}

impl TokenLinkResolver {
    pub fn new(api: SiteApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DetailLinkResolver for TokenLinkResolver {
    async fn resolve(&self, detail_url: &str, use_proxy: bool) -> Option<String> {
        let link = self.request_token(detail_url, use_proxy).await;
        let result = if link.is_some() { "ok" } else { "failed" };
        LINK_RESOLUTIONS.with_label_values(&[result]).inc();
        link
    }
}

impl TokenLinkResolver {
    async fn request_token(&self, detail_url: &str, use_proxy: bool) -> Option<String> {
        if !self.api.has_key() {
            warn!("Site API key not configured, cannot resolve download links");
            return None;
        }
        let Some(id) = detail_id(detail_url) else {
            debug!(detail_url = %detail_url, "No torrent id in detail url");
            return None;
        };
        let api_base = api_base_url(detail_url)?;

        let data = self
            .api
            .clone()
            .with_proxy(use_proxy)
            .post_form(
                &format!("{}/api/torrent/genDlToken", api_base),
                format!("id={}", id),
                "gen_dl_token",
            )
            .await?;

        match data {
            Value::String(link) if !link.is_empty() => Some(link),
            other => {
                debug!(detail_url = %detail_url, data = %other, "Download token response has no link");
                None
            }
        }
    }
}
