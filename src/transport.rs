//! The pluggable HTTP transport contract.
//!
//! This crate never constructs a `reqwest::Client` or any other concrete
//! HTTP client. Every outbound request goes through a single function value
//! supplied by the embedder, so the core stays usable inside WASM, behind a
//! proxy, under test, or against any runtime the embedder already uses for
//! its own networking.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::Method;

/// A future boxed for storage behind the [`RequestFn`] trait object.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A transport-agnostic HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Request method (`GET` for discovery fetches, `POST` for token/registration).
    pub method: Method,
    /// Fully-qualified target URL.
    pub url: String,
    /// Request headers, in insertion order.
    pub headers: Vec<(String, String)>,
    /// Raw request body, already encoded (form-urlencoded or JSON).
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Builds a `GET` request with no body.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Builds a `POST` request with the given body bytes.
    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    /// Adds a header, returning `self` for chaining.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A transport-agnostic HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, in the order the transport returned them.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// True for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a response header case-insensitively, returning the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parses the body as JSON into `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// An error raised by the transport function itself (connection refused,
/// TLS failure, timeout) — distinct from a non-2xx HTTP response, which is
/// still a successful transport round trip.
#[derive(Debug, Clone)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TransportError {}

/// The single function value through which every HTTP request flows.
///
/// Build one from an async closure or function: `Arc::new(|req| Box::pin(async move { ... }))`.
pub type RequestFn =
    Arc<dyn Fn(HttpRequest) -> BoxFuture<'static, Result<HttpResponse, TransportError>> + Send + Sync>;
