//! RSS feed reader.

use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, info, warn};

use crate::http::{HttpRequest, RequestExecutor};
use crate::metrics::{FEEDS_EXPIRED, FEED_ITEMS, FETCH_FAILURES};

use super::normalize::normalize_xml_item;
use super::title::site_domain;
use super::types::{FeedOutcome, IngestReport, RawXmlItem};

/// Bodies some trackers return instead of XML once a subscription link expires.
pub const EXPIRED_MESSAGES: [&str; 2] = [
    "RSS 链接已过期, 您需要获得一个新的!",
    "RSS Link has expired, You need to get a new one!",
];

/// Fetches and parses RSS documents.
pub struct XmlFeedReader {
    executor: Arc<dyn RequestExecutor>,
}

impl XmlFeedReader {
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Fetch `url` and return its items.
    ///
    /// Transport failures and non-success statuses give an empty outcome.
    pub async fn fetch(&self, url: &str, use_proxy: bool) -> FeedOutcome {
        if url.trim().is_empty() {
            return FeedOutcome::empty();
        }

        let request = HttpRequest::get(url).proxy(use_proxy);
        let response = match self.executor.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Feed fetch failed");
                FETCH_FAILURES.with_label_values(&["xml"]).inc();
                return FeedOutcome::empty();
            }
        };
        if !response.is_success() {
            warn!(url = %url, status = response.status, "Feed returned error status");
            FETCH_FAILURES.with_label_values(&["xml"]).inc();
            return FeedOutcome::empty();
        }

        let outcome = parse_feed(&response.text(), site_domain(url).as_deref());
        match &outcome {
            FeedOutcome::Expired => info!(url = %url, "Feed link has expired"),
            FeedOutcome::Items { items, report } => debug!(
                url = %url,
                items = items.len(),
                rejected = report.rejected,
                malformed = report.malformed,
                "Feed parsed"
            ),
        }
        outcome
    }
}

/// Whether `body` is one of the expired-link sentinels.
pub fn is_expired_body(body: &str) -> bool {
    let body = body.trim();
    EXPIRED_MESSAGES.iter().any(|m| *m == body)
}

/// Parse an RSS document into feed items.
///
/// Items that fail to parse are counted as malformed and skipped. A
/// document-level error stops parsing; items completed before it are kept.
pub fn parse_feed(body: &str, site_domain: Option<&str>) -> FeedOutcome {
    if is_expired_body(body) {
        FEEDS_EXPIRED.inc();
        return FeedOutcome::Expired;
    }

    let parsed = read_items(body);
    let mut report = IngestReport {
        truncated: parsed.document_error.is_some(),
        ..Default::default()
    };
    if let Some(error) = &parsed.document_error {
        warn!(error = %error, items = parsed.items.len(), "Feed document is malformed, keeping parsed items");
    }

    let mut items = Vec::new();
    for raw in parsed.items {
        let result = match raw {
            Ok(raw) => normalize_xml_item(raw, site_domain),
            Err(error) => {
                debug!(error = %error, "Skipping malformed feed item");
                report.malformed += 1;
                FEED_ITEMS.with_label_values(&["xml", "malformed"]).inc();
                continue;
            }
        };
        report.record(&result);
        match result {
            Ok(item) => {
                FEED_ITEMS.with_label_values(&["xml", "accepted"]).inc();
                items.push(item);
            }
            Err(rejection) => {
                debug!(reason = %rejection, "Skipping feed item");
                FEED_ITEMS.with_label_values(&["xml", "rejected"]).inc();
            }
        }
    }

    FeedOutcome::Items { items, report }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    Link,
    PubDate,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"description" => Some(Field::Description),
            b"link" => Some(Field::Link),
            b"pubDate" => Some(Field::PubDate),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ItemBuilder {
    raw: RawXmlItem,
    has_enclosure: bool,
    error: Option<String>,
}

impl ItemBuilder {
    fn push_text(&mut self, field: Field, text: &str) {
        let target = match field {
            Field::Title => &mut self.raw.title,
            Field::Description => &mut self.raw.description,
            Field::Link => &mut self.raw.link,
            Field::PubDate => &mut self.raw.pub_date,
        };
        target.push_str(text);
    }

    /// First `<enclosure>` wins.
    fn read_enclosure(&mut self, element: &BytesStart<'_>) {
        if self.has_enclosure {
            return;
        }
        self.has_enclosure = true;
        for attr in element.attributes() {
            let attr = match attr {
                Ok(attr) => attr,
                Err(e) => {
                    self.fail(e.to_string());
                    return;
                }
            };
            let target = match attr.key.as_ref() {
                b"url" => &mut self.raw.enclosure_url,
                b"length" => &mut self.raw.enclosure_length,
                _ => continue,
            };
            match attr.unescape_value() {
                Ok(value) => *target = value.into_owned(),
                Err(e) => {
                    self.fail(e.to_string());
                    return;
                }
            }
        }
    }

    fn fail(&mut self, error: String) {
        self.error.get_or_insert(error);
    }

    fn finish(self) -> Result<RawXmlItem, String> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.raw),
        }
    }
}

struct ParsedItems {
    items: Vec<Result<RawXmlItem, String>>,
    document_error: Option<String>,
}

/// Walk the document and collect the direct children of every `<item>`.
fn read_items(body: &str) -> ParsedItems {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<ItemBuilder> = None;
    // Element depth below the current <item>.
    let mut depth = 0usize;
    let mut field: Option<Field> = None;

    let document_error = loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if let Some(builder) = current.as_mut() {
                    depth += 1;
                    if depth == 1 {
                        field = Field::from_name(e.name().as_ref());
                        if e.name().as_ref() == b"enclosure" {
                            builder.read_enclosure(&e);
                        }
                    }
                } else if e.name().as_ref() == b"item" {
                    current = Some(ItemBuilder::default());
                    depth = 0;
                    field = None;
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(builder) = current.as_mut() {
                    if depth == 0 && e.name().as_ref() == b"enclosure" {
                        builder.read_enclosure(&e);
                    }
                }
            }
            Ok(Event::End(_)) => {
                if current.is_some() {
                    if depth == 0 {
                        if let Some(builder) = current.take() {
                            items.push(builder.finish());
                        }
                    } else {
                        depth -= 1;
                        if depth == 0 {
                            field = None;
                        }
                    }
                }
            }
            Ok(Event::Text(text)) => {
                if let (Some(builder), Some(f), 1) = (current.as_mut(), field, depth) {
                    match text.unescape() {
                        Ok(value) => builder.push_text(f, &value),
                        Err(e) => builder.fail(e.to_string()),
                    }
                }
            }
            Ok(Event::CData(data)) => {
                if let (Some(builder), Some(f), 1) = (current.as_mut(), field, depth) {
                    let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    builder.push_text(f, value.trim());
                }
            }
            Ok(Event::Eof) => break None,
            Err(e) => break Some(format!("at byte {}: {}", reader.buffer_position(), e)),
            Ok(_) => {}
        }
    };

    ParsedItems {
        items,
        document_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::testing::MockExecutor;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Tracker</title>
    <link>https://tracker.example/</link>
    <item>
      <title>Movie.A.2023.1080p</title>
      <description><![CDATA[<b>first</b>]]></description>
      <link>https://tracker.example/details.php?id=1</link>
      <enclosure url="https://tracker.example/download.php?id=1&amp;passkey=x" length="1073741824" type="application/x-bittorrent"/>
      <pubDate>Tue, 21 Mar 2023 01:45:51 +0000</pubDate>
    </item>
    <item>
      <title>Movie.B.2023.720p</title>
      <link>https://tracker.example/download.php?id=2</link>
    </item>
    <item>
      <title></title>
      <link>https://tracker.example/download.php?id=3</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_items() {
        let outcome = parse_feed(FEED, None);
        let FeedOutcome::Items { items, report } = outcome else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected, 1);
        assert!(!report.truncated);

        let first = &items[0];
        assert_eq!(first.title, "Movie.A.2023.1080p");
        assert_eq!(first.description, "<b>first</b>");
        assert_eq!(
            first.enclosure.as_deref(),
            Some("https://tracker.example/download.php?id=1&passkey=x")
        );
        assert_eq!(first.link.as_deref(), Some("https://tracker.example/details.php?id=1"));
        assert_eq!(first.size_bytes, 1_073_741_824);
        assert!(first.published_at.is_some());

        let second = &items[1];
        assert_eq!(
            second.enclosure.as_deref(),
            Some("https://tracker.example/download.php?id=2")
        );
        assert!(second.link.is_none());
        assert_eq!(second.size_bytes, 0);
    }

    #[test]
    fn test_channel_fields_not_captured() {
        let outcome = parse_feed(FEED, None);
        assert!(outcome.items().iter().all(|i| i.title != "Tracker"));
    }

    #[test]
    fn test_nested_elements_ignored() {
        let xml = r#"<rss><channel><item>
            <title>Outer</title>
            <extra><title>Inner</title></extra>
            <link>https://e/1</link>
        </item></channel></rss>"#;
        let outcome = parse_feed(xml, None);
        assert_eq!(outcome.items().len(), 1);
        assert_eq!(outcome.items()[0].title, "Outer");
    }

    #[test]
    fn test_expired_sentinels() {
        for body in EXPIRED_MESSAGES {
            assert!(parse_feed(body, None).is_expired());
            assert!(parse_feed(&format!("  {}\n", body), None).is_expired());
        }
        assert!(!parse_feed("RSS Link has expired", None).is_expired());
    }

    #[test]
    fn test_document_error_keeps_completed_items() {
        let xml = r#"<rss><channel>
            <item><title>Good</title><link>https://e/1</link></item>
            <item><title>Broken</title></wrong>
        </channel></rss>"#;
        let FeedOutcome::Items { items, report } = parse_feed(xml, None) else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Good");
        assert!(report.truncated);
    }

    #[test]
    fn test_bad_entity_marks_item_malformed() {
        let xml = r#"<rss><channel>
            <item><title>Bad &nosuch; title</title><link>https://e/1</link></item>
            <item><title>Good</title><link>https://e/2</link></item>
        </channel></rss>"#;
        let FeedOutcome::Items { items, report } = parse_feed(xml, None) else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Good");
        assert_eq!(report.malformed, 1);
    }

    #[test]
    fn test_empty_document() {
        let outcome = parse_feed("", None);
        assert!(outcome.items().is_empty());
        assert!(!outcome.is_expired());
    }

    #[tokio::test]
    async fn test_fetch_uses_proxy_flag_and_site_rewrite() {
        let executor = Arc::new(MockExecutor::new());
        let url = "https://pt.keepfrds.com/rss.php";
        executor.respond(
            url,
            HttpResponse::new(
                200,
                r#"<rss><channel><item><title>电影 [Movie.2020]</title><link>https://pt.keepfrds.com/dl/1</link></item></channel></rss>"#,
            ),
        );

        let reader = XmlFeedReader::new(executor.clone());
        let outcome = reader.fetch(url, true).await;

        assert_eq!(outcome.items().len(), 1);
        assert_eq!(outcome.items()[0].title, "电影 Movie.2020");
        let requests = executor.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].use_proxy);
    }

    #[tokio::test]
    async fn test_fetch_failures_are_empty() {
        let executor = Arc::new(MockExecutor::new());
        executor.respond("https://e/500", HttpResponse::new(500, "oops"));
        executor.fail("https://e/down");
        let reader = XmlFeedReader::new(executor.clone());

        assert!(reader.fetch("https://e/500", false).await.items().is_empty());
        assert!(reader.fetch("https://e/down", false).await.items().is_empty());
        assert!(reader.fetch("", false).await.items().is_empty());
        assert_eq!(executor.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_expired() {
        let executor = Arc::new(MockExecutor::new());
        executor.respond("https://e/rss", HttpResponse::new(200, EXPIRED_MESSAGES[1]));
        let reader = XmlFeedReader::new(executor);
        assert!(reader.fetch("https://e/rss", false).await.is_expired());
    }
}
