//! Request execution abstraction.
//!
//! Everything in the crate that talks to a remote site goes through the
//! [`RequestExecutor`] trait. Non-2xx statuses are returned as regular
//! responses; only "no response at all" is an error.

mod decode;
mod reqwest_executor;

pub use decode::{decode_text, detect_encoding};
pub use reqwest_executor::ReqwestExecutor;

use std::time::Duration;

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// JSON document, sent with `application/json` unless overridden.
    Json(serde_json::Value),
    /// Pre-encoded `application/x-www-form-urlencoded` body.
    Form(String),
}

/// A request handed to a [`RequestExecutor`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Route the request through the configured proxy, if any.
    pub use_proxy: bool,
    /// Per-request timeout; the executor default applies when `None`.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            use_proxy: false,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Form(body.into()));
        self
    }

    pub fn proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = use_proxy;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Value of the first header with this name (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as seen by the crate: status, raw body and detected encoding.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub encoding: &'static Encoding,
}

impl HttpResponse {
    /// Response with a UTF-8 body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            encoding: UTF_8,
        }
    }

    /// Response whose body must be decoded with `encoding`.
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded with the detected encoding. Invalid sequences are replaced.
    pub fn text(&self) -> String {
        decode_text(&self.body, self.encoding)
    }

    /// Body decoded as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.text())
    }
}

/// Errors meaning "no response was obtained".
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP client configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_connect() {
            HttpError::ConnectionFailed(e.to_string())
        } else if e.is_builder() {
            HttpError::Config(e.to_string())
        } else {
            HttpError::Request(e.to_string())
        }
    }
}

/// Executes HTTP requests on behalf of the feed readers.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Execute a request. Any status code is returned as `Ok`.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = HttpRequest::post("https://api.example.org/search")
            .header("x-api-key", "k")
            .json(serde_json::json!({"pageNumber": 1}))
            .proxy(true)
            .timeout(Duration::from_secs(5));

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header_value("X-API-KEY"), Some("k"));
        assert!(req.use_proxy);
        assert_eq!(req.timeout, Some(Duration::from_secs(5)));
        assert!(matches!(req.body, Some(RequestBody::Json(_))));
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }

    #[test]
    fn test_response_text_uses_encoding() {
        let (bytes, _, _) = encoding_rs::GBK.encode("种子");
        let resp = HttpResponse::new(200, bytes.into_owned()).with_encoding(encoding_rs::GBK);
        assert_eq!(resp.text(), "种子");
    }

    #[test]
    fn test_response_json() {
        let resp = HttpResponse::new(200, r#"{"message":"SUCCESS"}"#);
        let value: serde_json::Value = resp.json().unwrap();
        assert_eq!(value["message"], "SUCCESS");
    }
}
