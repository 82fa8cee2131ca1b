//! Site API access: paged search crawling, download link resolution,
//! per-torrent attributes and member roles.

mod attributes;
mod client;
mod crawler;
mod resolver;
mod roles;
mod types;

pub use attributes::TorrentAttributeLookup;
pub use client::SiteApi;
pub use crawler::{CrawlSettings, PagedApiCrawler};
pub use resolver::{DetailLinkResolver, TokenLinkResolver};
pub use roles::RoleCache;
pub use types::*;

use once_cell::sync::Lazy;
use regex_lite::Regex;

static DETAIL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r".+/detail/([0-9]+)").unwrap());

/// API base for a site URL: the first host label becomes `api`, or `api.` is
/// prepended to two-label hosts.
///
/// `https://kp.m-team.cc/detail/1` gives `https://api.m-team.cc`.
pub fn api_base_url(site_url: &str) -> Option<String> {
    let url = reqwest::Url::parse(site_url).ok()?;
    let host = url.host_str()?;

    let mut labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 2 {
        labels[0] = "api";
    } else {
        labels.insert(0, "api");
    }

    let mut base = format!("{}://{}", url.scheme(), labels.join("."));
    if let Some(port) = url.port() {
        base.push_str(&format!(":{}", port));
    }
    Some(base)
}

/// Numeric torrent id of a `.../detail/<id>` URL.
pub fn detail_id(detail_url: &str) -> Option<u64> {
    DETAIL_ID
        .captures(detail_url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_url() {
        assert_eq!(
            api_base_url("https://kp.m-team.cc/detail/1").as_deref(),
            Some("https://api.m-team.cc")
        );
        assert_eq!(
            api_base_url("https://m-team.cc/detail/1").as_deref(),
            Some("https://api.m-team.cc")
        );
        assert_eq!(
            api_base_url("http://a.b.site.io:8080/x").as_deref(),
            Some("http://api.b.site.io:8080")
        );
        assert_eq!(api_base_url("no url"), None);
    }

    #[test]
    fn test_detail_id() {
        assert_eq!(detail_id("https://kp.m-team.cc/detail/663345"), Some(663345));
        assert_eq!(detail_id("https://s/detail/7?from=rss"), Some(7));
        assert_eq!(detail_id("https://s/browse/7"), None);
        assert_eq!(detail_id("/detail/"), None);
    }
}
