use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use crate::http::{HttpRequest, RequestExecutor};
use crate::metrics::API_REQUEST_DURATION;

use super::types::Envelope;

/// Authenticated access to the site API.
///
/// Every call answers `None` on transport failure, non-success status or a
/// non-`SUCCESS` envelope. Callers decide what that means for them.
#[derive(Clone)]
pub struct SiteApi {
    executor: Arc<dyn RequestExecutor>,
    api_key: String,
    use_proxy: bool,
}

impl SiteApi {
    pub fn new(executor: Arc<dyn RequestExecutor>, api_key: impl Into<String>) -> Self {
        Self {
            executor,
            api_key: api_key.into(),
            use_proxy: false,
        }
    }

    pub fn with_proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = use_proxy;
        self
    }

    pub fn has_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// POST a JSON body and return the envelope payload.
    pub async fn post_json(&self, url: &str, body: Value, endpoint: &str) -> Option<Value> {
        let request = self
            .request(url)
            .header("Content-Type", "application/json")
            .json(body);
        self.send(request, endpoint).await
    }

    /// POST a form body and return the envelope payload.
    pub async fn post_form(&self, url: &str, form: String, endpoint: &str) -> Option<Value> {
        let request = self
            .request(url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(form);
        self.send(request, endpoint).await
    }

    fn request(&self, url: &str) -> HttpRequest {
        HttpRequest::post(url)
            .header("x-api-key", self.api_key.as_str())
            .header("Accept", "application/json")
            .proxy(self.use_proxy)
    }

    async fn send(&self, request: HttpRequest, endpoint: &str) -> Option<Value> {
        let url = request.url.clone();
        let start = Instant::now();
        let result = self.executor.execute(request).await;
        API_REQUEST_DURATION
            .with_label_values(&[endpoint])
            .observe(start.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, endpoint = endpoint, error = %e, "Site API request failed");
                return None;
            }
        };
        if !response.is_success() {
            warn!(url = %url, endpoint = endpoint, status = response.status, "Site API returned error status");
            return None;
        }

        let envelope: Envelope = match response.json() {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(url = %url, endpoint = endpoint, error = %e, "Site API returned invalid JSON");
                return None;
            }
        };
        let message = envelope.message.clone();
        let data = envelope.into_success();
        if data.is_none() {
            debug!(url = %url, endpoint = endpoint, message = %message, "Site API call unsuccessful");
        }
        data
    }
}
