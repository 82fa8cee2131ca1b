//! Conversion of raw XML and API records into [`FeedItem`]s.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::discount::classify;

use super::title::rewrite_title;
use super::types::{FeedItem, RawApiResult, RawXmlItem, Rejection};

/// The site API reports local times in UTC+8.
const SITE_UTC_OFFSET_SECS: i32 = 8 * 3600;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Normalize one RSS `<item>`.
///
/// The site-specific title rewrite runs before the empty-title check. A
/// missing enclosure is filled from the link, which is then cleared.
pub fn normalize_xml_item(
    raw: RawXmlItem,
    site_domain: Option<&str>,
) -> Result<FeedItem, Rejection> {
    let title = rewrite_title(site_domain, raw.title.trim());
    if title.trim().is_empty() {
        return Err(Rejection::MissingTitle);
    }

    let mut link = non_empty(raw.link);
    let mut enclosure = non_empty(raw.enclosure_url);
    if enclosure.is_none() {
        enclosure = link.take();
    }
    if enclosure.is_none() {
        return Err(Rejection::MissingLink);
    }

    Ok(FeedItem {
        title,
        description: raw.description,
        link,
        enclosure,
        size_bytes: parse_length(&raw.enclosure_length),
        published_at: parse_pub_date(&raw.pub_date),
        attributes: None,
    })
}

/// Normalize one API search result.
///
/// The returned item has no enclosure yet; the caller resolves it from the
/// detail link.
pub fn normalize_api_result(
    raw: &RawApiResult,
    detail_url_prefix: &str,
) -> Result<FeedItem, Rejection> {
    let title = raw.name.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(Rejection::MissingTitle);
    }

    let id = json_u64(&raw.id).ok_or_else(|| Rejection::InvalidId(raw.id.to_string()))?;
    let size_bytes = match &raw.size {
        Some(size) => json_u64(size).ok_or_else(|| Rejection::InvalidSize(size.to_string()))?,
        None => return Err(Rejection::InvalidSize("missing".to_string())),
    };
    let discount = raw.status.as_ref().and_then(|s| s.discount.as_deref());

    Ok(FeedItem {
        title: title.to_string(),
        description: raw.small_descr.clone().unwrap_or_default(),
        link: Some(format!("{}{}", detail_url_prefix, id)),
        enclosure: None,
        size_bytes,
        published_at: raw.last_modified_date.as_deref().and_then(parse_site_timestamp),
        attributes: Some(classify(discount)),
    })
}

/// Parse an RSS `pubDate`. Accepts RFC 2822, RFC 3339 and a few naive
/// formats (taken as UTC).
pub fn parse_pub_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_naive(value).map(|naive| naive.and_utc())
}

/// Parse a site API timestamp such as `2023-03-21 09:45:51` (UTC+8).
pub fn parse_site_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let offset = FixedOffset::east_opt(SITE_UTC_OFFSET_SECS)?;
    let naive = parse_naive(value.trim())?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Unsigned integer from a JSON number or a string of ASCII digits.
pub fn json_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => parse_digits(s.trim()),
        _ => None,
    }
}

/// Enclosure `length` attribute: digits only, anything else is 0.
fn parse_length(value: &str) -> u64 {
    parse_digits(value.trim()).unwrap_or(0)
}

fn parse_digits(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::RawApiStatus;
    use serde_json::json;

    fn raw_xml(title: &str, link: &str, enclosure: &str, length: &str) -> RawXmlItem {
        RawXmlItem {
            title: title.to_string(),
            description: "desc".to_string(),
            link: link.to_string(),
            enclosure_url: enclosure.to_string(),
            enclosure_length: length.to_string(),
            pub_date: "Tue, 21 Mar 2023 01:45:51 +0000".to_string(),
        }
    }

    fn raw_api(id: Value, size: Option<Value>, discount: Option<&str>) -> RawApiResult {
        RawApiResult {
            id,
            name: Some("Some.Movie.2023.1080p".to_string()),
            size,
            small_descr: Some("small".to_string()),
            last_modified_date: Some("2023-03-21 09:45:51".to_string()),
            status: Some(RawApiStatus {
                discount: discount.map(str::to_string),
                seeders: None,
            }),
        }
    }

    #[test]
    fn test_xml_item_complete() {
        let item = normalize_xml_item(
            raw_xml("Title", "https://site/details.php?id=1", "https://site/dl/1", "1024"),
            None,
        )
        .unwrap();
        assert_eq!(item.title, "Title");
        assert_eq!(item.link.as_deref(), Some("https://site/details.php?id=1"));
        assert_eq!(item.enclosure.as_deref(), Some("https://site/dl/1"));
        assert_eq!(item.size_bytes, 1024);
        assert_eq!(
            item.published_at.unwrap().to_rfc3339(),
            "2023-03-21T01:45:51+00:00"
        );
        assert!(item.attributes.is_none());
    }

    #[test]
    fn test_xml_item_link_promoted_to_enclosure() {
        let item =
            normalize_xml_item(raw_xml("Title", "https://site/dl/9", "", ""), None).unwrap();
        assert_eq!(item.enclosure.as_deref(), Some("https://site/dl/9"));
        assert!(item.link.is_none());
    }

    #[test]
    fn test_xml_item_without_links_rejected() {
        let result = normalize_xml_item(raw_xml("Title", "", "  ", ""), None);
        assert_eq!(result, Err(Rejection::MissingLink));
    }

    #[test]
    fn test_xml_item_empty_title_rejected() {
        let result = normalize_xml_item(raw_xml("   ", "https://a", "", ""), None);
        assert_eq!(result, Err(Rejection::MissingTitle));
    }

    #[test]
    fn test_xml_item_non_numeric_length_is_zero() {
        for length in ["", "12a", "-5", "+5", "1.5"] {
            let item =
                normalize_xml_item(raw_xml("T", "", "https://e", length), None).unwrap();
            assert_eq!(item.size_bytes, 0, "length {:?}", length);
        }
    }

    #[test]
    fn test_xml_item_title_rewrite_applies() {
        let item = normalize_xml_item(
            raw_xml("电影 [Movie.2020]", "", "https://e", ""),
            Some("pt.keepfrds.com"),
        )
        .unwrap();
        assert_eq!(item.title, "电影 Movie.2020");
    }

    #[test]
    fn test_xml_item_bad_date_is_absent() {
        let mut raw = raw_xml("T", "", "https://e", "");
        raw.pub_date = "yesterday".to_string();
        assert!(normalize_xml_item(raw, None).unwrap().published_at.is_none());
    }

    #[test]
    fn test_parse_pub_date_formats() {
        assert!(parse_pub_date("Tue, 21 Mar 2023 01:45:51 GMT").is_some());
        assert!(parse_pub_date("2023-03-21T01:45:51+08:00").is_some());
        assert_eq!(
            parse_pub_date("2023-03-21 01:45:51").unwrap().to_rfc3339(),
            "2023-03-21T01:45:51+00:00"
        );
        assert!(parse_pub_date("").is_none());
    }

    #[test]
    fn test_api_result_normalized() {
        let item = normalize_api_result(
            &raw_api(json!("663345"), Some(json!("4423761920")), Some("FREE")),
            "https://kp.m-team.cc/detail/",
        )
        .unwrap();
        assert_eq!(item.title, "Some.Movie.2023.1080p");
        assert_eq!(item.description, "small");
        assert_eq!(item.link.as_deref(), Some("https://kp.m-team.cc/detail/663345"));
        assert!(item.enclosure.is_none());
        assert_eq!(item.size_bytes, 4_423_761_920);
        assert_eq!(
            item.published_at.unwrap().to_rfc3339(),
            "2023-03-21T01:45:51+00:00"
        );
        let attrs = item.attributes.unwrap();
        assert!(attrs.is_free);
        assert_eq!(attrs.download_factor, 0.0);
    }

    #[test]
    fn test_api_result_numeric_fields() {
        let item = normalize_api_result(&raw_api(json!(7), Some(json!(100)), None), "p/").unwrap();
        assert_eq!(item.link.as_deref(), Some("p/7"));
        assert_eq!(item.size_bytes, 100);
        assert_eq!(item.attributes.unwrap(), classify(None));
    }

    #[test]
    fn test_api_result_invalid_size_is_malformed() {
        let err = normalize_api_result(&raw_api(json!("1"), Some(json!("big")), None), "p/")
            .unwrap_err();
        assert!(matches!(err, Rejection::InvalidSize(_)));
        assert!(err.is_malformed());

        let err = normalize_api_result(&raw_api(json!("1"), None, None), "p/").unwrap_err();
        assert!(matches!(err, Rejection::InvalidSize(_)));
    }

    #[test]
    fn test_api_result_invalid_id() {
        let err = normalize_api_result(&raw_api(json!("abc"), Some(json!(1)), None), "p/")
            .unwrap_err();
        assert!(matches!(err, Rejection::InvalidId(_)));
    }

    #[test]
    fn test_api_result_missing_name() {
        let mut raw = raw_api(json!("1"), Some(json!(1)), None);
        raw.name = None;
        assert_eq!(
            normalize_api_result(&raw, "p/").unwrap_err(),
            Rejection::MissingTitle
        );
    }

    #[test]
    fn test_json_u64() {
        assert_eq!(json_u64(&json!(5)), Some(5));
        assert_eq!(json_u64(&json!(" 42 ")), Some(42));
        assert_eq!(json_u64(&json!(-1)), None);
        assert_eq!(json_u64(&json!(1.5)), None);
        assert_eq!(json_u64(&json!(null)), None);
    }
}
