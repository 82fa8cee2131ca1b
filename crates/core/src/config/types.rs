use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("feedwarden.db")
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Proxy URL used by sources with `proxy = true`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs as u64)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            proxy: None,
        }
    }
}

fn default_timeout() -> u32 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

/// Configuration of the site served through its JSON search API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Site API key (sent as `x-api-key`)
    #[serde(default)]
    pub api_key: String,
    /// Search endpoint
    #[serde(default = "default_search_url")]
    pub search_url: String,
    /// Detail page prefix; the numeric torrent id is appended
    #[serde(default = "default_detail_url_prefix")]
    pub detail_url_prefix: String,
    /// Search mode (e.g. "movie", "adult", "normal")
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Results per page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Maximum number of pages fetched per crawl (default: 1)
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Delay between download-link lookups in milliseconds (default: 2000)
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// How long the role list stays fresh in seconds (default: 3600)
    #[serde(default = "default_role_cache_ttl")]
    pub role_cache_ttl_secs: u64,
    /// URL fragments identifying sources served by this site's API
    #[serde(default = "default_host_markers")]
    pub host_markers: Vec<String>,
}

impl SiteConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn role_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.role_cache_ttl_secs)
    }

    /// Whether `url` belongs to this site.
    pub fn matches(&self, url: &str) -> bool {
        self.host_markers
            .iter()
            .any(|marker| !marker.is_empty() && url.contains(marker.as_str()))
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            search_url: default_search_url(),
            detail_url_prefix: default_detail_url_prefix(),
            mode: default_mode(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            pacing_ms: default_pacing_ms(),
            role_cache_ttl_secs: default_role_cache_ttl(),
            host_markers: default_host_markers(),
        }
    }
}

fn default_search_url() -> String {
    "https://api.m-team.cc/api/torrent/search".to_string()
}

fn default_detail_url_prefix() -> String {
    "https://kp.m-team.cc/detail/".to_string()
}

fn default_mode() -> String {
    "movie".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    1
}

fn default_pacing_ms() -> u64 {
    2000
}

fn default_role_cache_ttl() -> u64 {
    3600
}

fn default_host_markers() -> Vec<String> {
    vec!["m-team".to_string()]
}

/// How a source is read
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// RSS/XML subscription feed
    Xml,
    /// Paginated JSON search API of the configured site
    Api,
}

/// A feed subscription
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Display name used in logs
    pub name: String,
    /// Feed or search URL
    pub url: String,
    /// Route requests for this source through the configured proxy
    #[serde(default)]
    pub proxy: bool,
    /// Force a source kind instead of classifying by URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SourceKind>,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            proxy: false,
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_proxy(mut self, proxy: bool) -> Self {
        self.proxy = proxy;
        self
    }

    /// Reader for this source: its explicit kind, else the site API for URLs
    /// carrying a site marker, else XML.
    pub fn kind_for(&self, site: &SiteConfig) -> SourceKind {
        self.kind.unwrap_or_else(|| {
            if site.matches(&self.url) {
                SourceKind::Api
            } else {
                SourceKind::Xml
            }
        })
    }
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub database: DatabaseConfig,
    pub http: SanitizedHttpConfig,
    pub site: SanitizedSiteConfig,
    pub sources: Vec<SanitizedSourceConfig>,
}

/// Sanitized source (query values and URL credentials hidden)
///
/// Feed URLs usually carry a tracker passkey in the query string.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSourceConfig {
    pub name: String,
    pub url: String,
    pub proxy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<SourceKind>,
}

impl From<&SourceConfig> for SanitizedSourceConfig {
    fn from(source: &SourceConfig) -> Self {
        Self {
            name: source.name.clone(),
            url: redact_url(&source.url),
            proxy: source.proxy,
            kind: source.kind,
        }
    }
}

/// Replace every query value and any userinfo in `raw` with placeholders.
fn redact_url(raw: &str) -> String {
    let Ok(mut url) = reqwest::Url::parse(raw) else {
        return raw.split('?').next().unwrap_or_default().to_string();
    };
    let _ = url.set_username("");
    let _ = url.set_password(None);
    let names: Vec<String> = url.query_pairs().map(|(name, _)| name.into_owned()).collect();
    if !names.is_empty() {
        url.query_pairs_mut()
            .clear()
            .extend_pairs(names.iter().map(|name| (name.as_str(), "***")));
    }
    url.to_string()
}

/// Sanitized HTTP config (proxy credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedHttpConfig {
    pub timeout_secs: u32,
    pub user_agent: String,
    pub proxy_configured: bool,
}

/// Sanitized site config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSiteConfig {
    pub api_key_configured: bool,
    pub search_url: String,
    pub detail_url_prefix: String,
    pub mode: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub pacing_ms: u64,
    pub role_cache_ttl_secs: u64,
    pub host_markers: Vec<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            database: config.database.clone(),
            http: SanitizedHttpConfig {
                timeout_secs: config.http.timeout_secs,
                user_agent: config.http.user_agent.clone(),
                proxy_configured: config.http.proxy.is_some(),
            },
            site: SanitizedSiteConfig {
                api_key_configured: !config.site.api_key.is_empty(),
                search_url: config.site.search_url.clone(),
                detail_url_prefix: config.site.detail_url_prefix.clone(),
                mode: config.site.mode.clone(),
                page_size: config.site.page_size,
                max_pages: config.site.max_pages,
                pacing_ms: config.site.pacing_ms,
                role_cache_ttl_secs: config.site.role_cache_ttl_secs,
                host_markers: config.site.host_markers.clone(),
            },
            sources: config.sources.iter().map(SanitizedSourceConfig::from).collect(),
        }
    }
}
