//! Mock request executor for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::http::{HttpError, HttpRequest, HttpResponse, RequestExecutor};

/// `None` simulates a request that got no response.
type Reply = Option<HttpResponse>;

/// Mock implementation of the RequestExecutor trait.
///
/// Replies are configured per exact URL:
/// - `respond` / `respond_json` / `fail` set a single reply that repeats
/// - `respond_sequence` queues replies; the last one repeats
/// - Unconfigured URLs fail with `ConnectionFailed`
///
/// Every executed request is recorded for assertions.
///
/// # Example
///
/// ```rust,ignore
/// use feedwarden_core::testing::MockExecutor;
///
/// let executor = Arc::new(MockExecutor::new());
/// executor.respond("https://tracker/rss", HttpResponse::new(200, "<rss/>"));
///
/// let reader = XmlFeedReader::new(executor.clone());
/// reader.fetch("https://tracker/rss", false).await;
///
/// assert_eq!(executor.requests().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockExecutor {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `url` with `response`.
    pub fn respond(&self, url: impl Into<String>, response: HttpResponse) {
        self.set_route(url.into(), VecDeque::from([Some(response)]));
    }

    /// Always answer `url` with a 200 JSON body.
    pub fn respond_json(&self, url: impl Into<String>, body: serde_json::Value) {
        self.respond(url, HttpResponse::new(200, body.to_string()));
    }

    /// Answer `url` with each response in turn, repeating the last one.
    pub fn respond_sequence(&self, url: impl Into<String>, responses: Vec<HttpResponse>) {
        self.set_route(url.into(), responses.into_iter().map(Some).collect());
    }

    /// Make every request to `url` fail without a response.
    pub fn fail(&self, url: impl Into<String>) {
        self.set_route(url.into(), VecDeque::from([None]));
    }

    /// All requests executed so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests executed against `url`.
    pub fn requests_to(&self, url: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url == url)
            .collect()
    }

    fn set_route(&self, url: String, replies: VecDeque<Reply>) {
        self.routes.lock().unwrap().insert(url, replies);
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl RequestExecutor for MockExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        match self.next_reply(&url) {
            Some(Some(response)) => Ok(response),
            Some(None) => Err(HttpError::ConnectionFailed(format!(
                "simulated failure for {}",
                url
            ))),
            None => Err(HttpError::ConnectionFailed(format!("no route for {}", url))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequence_repeats_last() {
        let executor = MockExecutor::new();
        executor.respond_sequence(
            "u",
            vec![HttpResponse::new(500, ""), HttpResponse::new(200, "ok")],
        );

        let statuses = [
            executor.execute(HttpRequest::get("u")).await.unwrap().status,
            executor.execute(HttpRequest::get("u")).await.unwrap().status,
            executor.execute(HttpRequest::get("u")).await.unwrap().status,
        ];
        assert_eq!(statuses, [500, 200, 200]);
        assert_eq!(executor.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_and_failed_routes() {
        let executor = MockExecutor::new();
        executor.fail("down");
        assert!(executor.execute(HttpRequest::get("down")).await.is_err());
        assert!(executor.execute(HttpRequest::get("other")).await.is_err());
        assert_eq!(executor.requests_to("down").len(), 1);
    }
}
