//! Feed records: the canonical item type, its normalization and the RSS reader.

mod normalize;
mod title;
mod types;
mod xml;

pub use normalize::{
    json_u64, normalize_api_result, normalize_xml_item, parse_pub_date, parse_site_timestamp,
};
pub use title::{rewrite_title, site_domain};
pub use types::*;
pub use xml::{is_expired_body, parse_feed, XmlFeedReader, EXPIRED_MESSAGES};
