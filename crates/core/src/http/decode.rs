use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Pick the encoding of a response body: BOM, then Content-Type charset, then
/// the XML declaration, then statistical detection over the bytes.
pub fn detect_encoding(bytes: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    if let Some(enc) = content_type
        .and_then(extract_charset)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return enc;
    }

    if let Some(enc) =
        xml_declared_encoding(bytes).and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return enc;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// Decode `bytes` with `encoding`, replacing malformed sequences.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// `encoding` pseudo-attribute of a leading `<?xml ... ?>` declaration.
fn xml_declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(256)];
    let end = head.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&head[..end]).ok()?;
    let decl = decl.trim_start().strip_prefix("<?xml")?;
    let (_, rest) = decl.split_once("encoding")?;
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = rest[1..].split(quote).next()?;
    Some(value.to_string())
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let part = part.trim();
            let (key, value) = part.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("charset") {
                Some(value.trim().trim_matches(['"', '\'']).to_string())
            } else {
                None
            }
        })
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{GBK, UTF_16LE, UTF_8};

    #[test]
    fn test_bom_wins() {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend_from_slice(&[b'a', 0]);
        assert_eq!(detect_encoding(&bytes, Some("text/xml; charset=utf-8")), UTF_16LE);
    }

    #[test]
    fn test_content_type_charset() {
        let enc = detect_encoding(b"<rss/>", Some("application/xml; Charset=\"GBK\""));
        assert_eq!(enc, GBK);
    }

    #[test]
    fn test_detection_fallback_utf8() {
        let enc = detect_encoding("<title>种子标题</title>".as_bytes(), None);
        assert_eq!(enc, UTF_8);
    }

    #[test]
    fn test_xml_declaration() {
        let (bytes, _, _) =
            GBK.encode("<?xml version=\"1.0\" encoding='gbk'?><title>种子</title>");
        assert_eq!(detect_encoding(&bytes, Some("application/xml")), GBK);
        assert_eq!(
            xml_declared_encoding(b"<?xml version=\"1.0\"?><rss/>"),
            None
        );
        assert_eq!(xml_declared_encoding(b"<rss encoding=\"gbk\"/>"), None);
    }

    #[test]
    fn test_decode_text_replaces_invalid() {
        let text = decode_text(&[b'a', 0xFF, b'b'], UTF_8);
        assert_eq!(text, "a\u{FFFD}b");
    }

    #[test]
    fn test_extract_charset() {
        assert_eq!(
            extract_charset("text/html; charset=utf-8"),
            Some("utf-8".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }
}
