// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! The promise-based `fetch` primitive
//!
//! A [`Fetch`] implementation is what a window's `fetch` binding holds.
//! The native one goes over [`HttpClient`]; interceptors wrap whatever is
//! bound behind the same trait.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Method;
use thiserror::Error;
use url::Url;

use super::value::JsValue;
use crate::http::{HttpClient, Request, Response};

/// Settled outcome of a fetch call
pub type FetchResult = std::result::Result<FetchResponse, FetchError>;

/// A `fetch`-style network primitive
///
/// Arguments follow the host calling convention: `fetch(url)`,
/// `fetch(requestLike)` or `fetch(url, init)`.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Issue the request and settle with a response or a transport error
    async fn fetch(&self, args: &[JsValue]) -> FetchResult;

    /// Whether this binding is already an instrumentation wrapper
    fn is_instrumented(&self) -> bool {
        false
    }
}

/// Response object a fetch call settles with
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    /// Status code
    pub status: u16,
    /// Status text
    pub status_text: String,
    /// Final URL (after redirects); may be empty for synthetic responses
    pub url: String,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Bytes,
    /// Whether a redirect was followed
    pub redirected: bool,
}

impl FetchResponse {
    /// Create a response with the given status line
    pub fn new(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            url: String::new(),
            headers: Vec::new(),
            body: Bytes::new(),
            redirected: false,
        }
    }

    /// Set the final URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// `response.ok` - status in the 2xx range
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossy conversion
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl From<Response> for FetchResponse {
    fn from(response: Response) -> Self {
        Self {
            status: response.status_code(),
            status_text: response.status_text().to_string(),
            url: response.url.to_string(),
            headers: response.header_pairs(),
            body: response.body,
            redirected: response.redirected,
        }
    }
}

/// Host error names a fetch rejection can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Network failure or invalid arguments
    TypeError,
    /// Request was aborted
    AbortError,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::TypeError => f.write_str("TypeError"),
            FetchErrorKind::AbortError => f.write_str("AbortError"),
        }
    }
}

/// Transport-level failure a fetch call rejects with
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
    /// Stack trace, when the primitive captured one
    pub stack: Option<String>,
}

impl FetchError {
    /// `TypeError` rejection
    pub fn type_error(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::TypeError,
            message: message.into(),
            stack: None,
        }
    }

    /// The generic network failure rejection
    pub fn network() -> Self {
        Self::type_error("Failed to fetch")
    }

    /// `AbortError` rejection
    pub fn abort() -> Self {
        Self {
            kind: FetchErrorKind::AbortError,
            message: "The user aborted a request.".to_string(),
            stack: None,
        }
    }

    /// Attach a stack trace
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Stack trace if present, otherwise the display form
    pub fn stack_or_description(&self) -> String {
        self.stack.clone().unwrap_or_else(|| self.to_string())
    }
}

/// Native `fetch` backed by the HTTP client
#[derive(Clone)]
pub struct NativeFetch {
    client: HttpClient,
    /// Document URL relative request URLs resolve against
    base_url: Option<Url>,
}

impl NativeFetch {
    /// Create a native fetch
    pub fn new(client: HttpClient, base_url: Option<Url>) -> Self {
        Self { client, base_url }
    }

    /// Translate host arguments into an HTTP request
    fn build_request(&self, args: &[JsValue]) -> std::result::Result<Request, FetchError> {
        let input = args
            .first()
            .ok_or_else(|| FetchError::type_error("fetch requires at least 1 argument"))?;

        let (raw_url, init) = match input {
            JsValue::Object(_) => (
                input
                    .get_defined("url")
                    .map(JsValue::to_string_value)
                    .unwrap_or_default(),
                Some(input),
            ),
            other => (other.to_string_value(), args.get(1)),
        };

        let url = resolve_url(self.base_url.as_ref(), &raw_url)
            .map_err(|e| FetchError::type_error(format!("Failed to parse URL from {}: {}", raw_url, e)))?;

        let method = init
            .and_then(|i| i.get_defined("method"))
            .map(|m| m.to_string_value().to_uppercase())
            .unwrap_or_else(|| "GET".to_string());
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| FetchError::type_error(format!("'{}' is not a valid HTTP method", method)))?;

        let mut request = Request::from_url(method, url);

        if let Some(JsValue::Object(headers)) = init.and_then(|i| i.get("headers")) {
            for (name, value) in headers {
                request = request.header(name, value.to_string_value());
            }
        }

        if let Some(body) = init.and_then(|i| i.get_defined("body")) {
            request = request.body(body.to_string_value());
        }

        Ok(request)
    }
}

#[async_trait]
impl Fetch for NativeFetch {
    async fn fetch(&self, args: &[JsValue]) -> FetchResult {
        let request = self.build_request(args)?;
        let url = request.url.to_string();

        match self.client.execute(request).await {
            Ok(response) => Ok(FetchResponse::from(response)),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "native fetch failed");
                Err(FetchError::network().with_stack(format!("TypeError: Failed to fetch\n    at {} ({})", url, e)))
            }
        }
    }
}

/// Resolve a possibly relative URL against the document base
pub(crate) fn resolve_url(base: Option<&Url>, raw: &str) -> std::result::Result<Url, url::ParseError> {
    match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    }
}

type BoxedFetchFn = Box<dyn Fn(Vec<JsValue>) -> BoxFuture<'static, FetchResult> + Send + Sync>;

/// Fetch binding backed by a closure
///
/// Handy for embedding hosts that route requests themselves, and for tests.
pub struct FetchFn {
    f: BoxedFetchFn,
}

impl FetchFn {
    /// Wrap a closure returning a future
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<JsValue>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FetchResult> + Send + 'static,
    {
        Self {
            f: Box::new(move |args| f(args).boxed()),
        }
    }
}

#[async_trait]
impl Fetch for FetchFn {
    async fn fetch(&self, args: &[JsValue]) -> FetchResult {
        (self.f)(args.to_vec()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn native(base: &str) -> NativeFetch {
        NativeFetch::new(HttpClient::new().unwrap(), Some(Url::parse(base).unwrap()))
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::network();
        assert_eq!(err.to_string(), "TypeError: Failed to fetch");
        assert_eq!(err.stack_or_description(), "TypeError: Failed to fetch");

        let err = err.with_stack("TypeError: Failed to fetch\n    at app.js:1");
        assert_eq!(err.stack_or_description(), "TypeError: Failed to fetch\n    at app.js:1");
    }

    #[test]
    fn test_build_request_variants() {
        let fetch = native("https://example.com/app/");

        let req = fetch.build_request(&[JsValue::from("/api/x")]).unwrap();
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.url_str(), "https://example.com/api/x");

        let req = fetch
            .build_request(&[JsValue::object([
                ("url", JsValue::from("items")),
                ("method", JsValue::from("put")),
                ("body", JsValue::from("{}")),
            ])])
            .unwrap();
        assert_eq!(req.method, Method::PUT);
        assert_eq!(req.url_str(), "https://example.com/app/items");
        assert_eq!(req.body.as_deref(), Some(&b"{}"[..]));

        let req = fetch
            .build_request(&[
                JsValue::from("https://other.test/x"),
                JsValue::object([(
                    "headers",
                    JsValue::object([("x-trace", "abc")]),
                )]),
            ])
            .unwrap();
        assert_eq!(req.url.host_str(), Some("other.test"));
        assert_eq!(
            req.headers.get("x-trace").map(|v| v.to_str().unwrap()),
            Some("abc")
        );
    }

    #[test]
    fn test_build_request_rejects_bad_input() {
        let fetch = NativeFetch::new(HttpClient::new().unwrap(), None);
        assert_eq!(
            fetch.build_request(&[]).unwrap_err().kind,
            FetchErrorKind::TypeError
        );
        assert!(fetch.build_request(&[JsValue::from("/relative")]).is_err());
    }

    #[tokio::test]
    async fn test_native_fetch_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/items"))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"{"a":1}"#))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .mount(&server)
            .await;

        let fetch = native(&server.uri());
        let response = fetch
            .fetch(&[
                JsValue::from("/api/items"),
                JsValue::object([
                    ("method", JsValue::from("POST")),
                    ("body", JsValue::from(r#"{"a":1}"#)),
                    (
                        "headers",
                        JsValue::object([("content-type", "application/json")]),
                    ),
                ]),
            ])
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.status_text, "Created");
        assert_eq!(response.text(), "created");
        assert!(response.url.ends_with("/api/items"));
    }

    #[tokio::test]
    async fn test_native_fetch_transport_failure() {
        let fetch = NativeFetch::new(HttpClient::new().unwrap(), None);
        let err = fetch
            .fetch(&[JsValue::from("http://127.0.0.1:1/unreachable")])
            .await
            .unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::TypeError);
        assert_eq!(err.message, "Failed to fetch");
        assert!(err.stack.is_some());
    }

    #[tokio::test]
    async fn test_fetch_fn_adapter() {
        let fetch = FetchFn::new(|args: Vec<JsValue>| async move {
            Ok::<_, FetchError>(
                FetchResponse::new(418, "I'm a teapot").with_url(args[0].to_string_value()),
            )
        });
        let response = fetch.fetch(&[JsValue::from("/brew")]).await.unwrap();
        assert_eq!(response.status, 418);
        assert_eq!(response.url, "/brew");
        assert!(!fetch.is_instrumented());
    }
}
