//! Mock detail-link resolver for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::site::DetailLinkResolver;

/// Mock implementation of the DetailLinkResolver trait.
///
/// Answers from a fixed map of detail URL to download link and records every
/// lookup. Unknown URLs resolve to `None`.
#[derive(Debug, Default)]
pub struct MockResolver {
    links: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `detail_url` to `link`.
    pub fn set_link(&self, detail_url: impl Into<String>, link: impl Into<String>) {
        self.links
            .lock()
            .unwrap()
            .insert(detail_url.into(), link.into());
    }

    /// Builder form of [`MockResolver::set_link`].
    pub fn with_link(self, detail_url: impl Into<String>, link: impl Into<String>) -> Self {
        self.set_link(detail_url, link);
        self
    }

    /// Detail URLs looked up so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DetailLinkResolver for MockResolver {
    async fn resolve(&self, detail_url: &str, _use_proxy: bool) -> Option<String> {
        self.calls.lock().unwrap().push(detail_url.to_string());
        self.links.lock().unwrap().get(detail_url).cloned()
    }
}
