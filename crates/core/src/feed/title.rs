//! Site-specific title rewriting.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex_lite::Regex;

type TitleRewrite = fn(&str) -> String;

/// Sites whose feeds put titles in a non-standard shape.
static SPECIAL_TITLE_SITES: Lazy<HashMap<&'static str, TitleRewrite>> = Lazy::new(|| {
    let mut sites: HashMap<&'static str, TitleRewrite> = HashMap::new();
    sites.insert("pt.keepfrds.com", keepfrds_title);
    sites
});

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*)\]").unwrap());

/// Lowercased host of `url`, without port.
pub fn site_domain(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

/// Apply the rewrite registered for `domain`, if any.
pub fn rewrite_title(domain: Option<&str>, title: &str) -> String {
    match domain.and_then(|d| SPECIAL_TITLE_SITES.get(d)) {
        Some(rewrite) => rewrite(title),
        None => title.to_string(),
    }
}

/// keepfrds puts the release name inside brackets; move it after the title.
fn keepfrds_title(title: &str) -> String {
    let Some(caps) = BRACKETED.captures(title) else {
        return title.to_string();
    };
    let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let rest = BRACKETED.replace(title, "");
    format!("{} {}", rest.trim(), inner.trim()).trim().to_string()
}
