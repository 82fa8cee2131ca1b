//! `reqwest`-backed request executor.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Proxy};
use tracing::{debug, warn};

use crate::config::HttpConfig;

use super::{
    detect_encoding, HttpError, HttpMethod, HttpRequest, HttpResponse, RequestBody,
    RequestExecutor,
};

/// Request executor built on two `reqwest` clients: a direct one and, when a
/// proxy is configured, a proxied one.
pub struct ReqwestExecutor {
    direct: Client,
    proxied: Option<Client>,
}

impl ReqwestExecutor {
    /// Create a new executor with the given configuration.
    pub fn new(config: &HttpConfig) -> Result<Self, HttpError> {
        let direct = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        let proxied = match &config.proxy {
            Some(proxy_url) => {
                let proxy = Proxy::all(proxy_url.as_str())
                    .map_err(|e| HttpError::Config(format!("invalid proxy url: {}", e)))?;
                Some(
                    Client::builder()
                        .timeout(config.timeout())
                        .user_agent(config.user_agent.as_str())
                        .proxy(proxy)
                        .build()?,
                )
            }
            None => None,
        };

        Ok(Self { direct, proxied })
    }

    fn client_for(&self, request: &HttpRequest) -> &Client {
        match (&self.proxied, request.use_proxy) {
            (Some(proxied), true) => proxied,
            (None, true) => {
                warn!(url = %request.url, "Proxy requested but none configured, going direct");
                &self.direct
            }
            _ => &self.direct,
        }
    }
}

#[async_trait]
impl RequestExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let client = self.client_for(&request);

        let mut builder = match request.method {
            HttpMethod::Get => client.get(&request.url),
            HttpMethod::Post => client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Form(body)) => builder.body(body.clone()),
            None => builder,
        };
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();
        let encoding = detect_encoding(&body, content_type.as_deref());

        debug!(
            url = %request.url,
            status = status,
            bytes = body.len(),
            encoding = encoding.name(),
            "HTTP request complete"
        );

        Ok(HttpResponse {
            status,
            body,
            encoding,
        })
    }
}
