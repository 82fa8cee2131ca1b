//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external seams, allowing
//! the readers and the orchestrator to be tested without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use feedwarden_core::testing::{fixtures, MockExecutor, MockResolver};
//!
//! let executor = Arc::new(MockExecutor::new());
//! executor.respond_json(SEARCH_URL, fixtures::search_response(vec![/* results */], 1));
//!
//! let resolver = Arc::new(MockResolver::new().with_link(detail, "https://site/dl/5"));
//! ```

mod mock_executor;
mod mock_resolver;

pub use mock_executor::MockExecutor;
pub use mock_resolver::MockResolver;

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Value};

    use crate::feed::FeedItem;

    /// Feed item with an enclosure and sensible defaults.
    pub fn feed_item(title: &str, enclosure: &str) -> FeedItem {
        FeedItem {
            title: title.to_string(),
            description: String::new(),
            link: None,
            enclosure: Some(enclosure.to_string()).filter(|e| !e.is_empty()),
            size_bytes: 0,
            published_at: None,
            attributes: None,
        }
    }

    /// RSS document with one `<item>` per `(title, link, enclosure)` triple.
    /// Empty parts are left out of the item.
    pub fn rss_document(items: &[(&str, &str, &str)]) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\"><channel><title>fixture</title>\n",
        );
        for (title, link, enclosure) in items {
            xml.push_str("<item>");
            if !title.is_empty() {
                xml.push_str(&format!("<title>{}</title>", title));
            }
            if !link.is_empty() {
                xml.push_str(&format!("<link>{}</link>", link));
            }
            if !enclosure.is_empty() {
                xml.push_str(&format!(
                    "<enclosure url=\"{}\" length=\"0\" type=\"application/x-bittorrent\"/>",
                    enclosure
                ));
            }
            xml.push_str("</item>\n");
        }
        xml.push_str("</channel></rss>");
        xml
    }

    /// One search result as the site API returns it.
    pub fn search_result(id: u64, name: &str, size: &str, discount: &str) -> Value {
        json!({
            "id": id.to_string(),
            "name": name,
            "size": size,
            "smallDescr": format!("{} description", name),
            "lastModifiedDate": "2023-03-21 09:45:51",
            "status": {"discount": discount, "seeders": "3"}
        })
    }

    /// Successful search envelope around `results`.
    pub fn search_response(results: Vec<Value>, total_pages: u32) -> Value {
        json!({
            "message": "SUCCESS",
            "data": {
                "pageNumber": "1",
                "pageSize": "100",
                "total": results.len().to_string(),
                "totalPages": total_pages.to_string(),
                "data": results
            }
        })
    }
}
