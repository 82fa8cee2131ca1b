pub mod config;
pub mod discount;
pub mod feed;
pub mod history;
pub mod http;
pub mod ingest;
pub mod metrics;
pub mod site;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    SourceConfig, SourceKind,
};
pub use discount::{classify, DiscountCode, EconomicAttributes};
pub use feed::{FeedItem, FeedOutcome, IngestReport, XmlFeedReader};
pub use history::{DedupGate, HistoryError, HistoryStore, MediaMeta, SqliteHistoryStore};
pub use http::{HttpError, ReqwestExecutor, RequestExecutor};
pub use ingest::{IngestError, IngestionOrchestrator, SourceResult, SourceSummary};
pub use site::{DetailLinkResolver, PagedApiCrawler, RoleCache, TokenLinkResolver};
