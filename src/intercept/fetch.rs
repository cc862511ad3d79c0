// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! `fetch` interceptor

use std::sync::Arc;

use async_trait::async_trait;

use super::boundary::fault_boundary;
use super::{InstallOutcome, Reporter, SUCCESS_STATUS};
use crate::host::{Fetch, FetchError, FetchResult, JsValue, Window};
use crate::report::{ErrorRecord, RecordSource, RequestSnapshot};

/// Replaces a window's `fetch` binding with [`InstrumentedFetch`]
pub struct FetchInterceptor {
    reporter: Reporter,
}

impl FetchInterceptor {
    pub fn new(reporter: Reporter) -> Self {
        Self { reporter }
    }

    /// Wrap the current binding unless it is missing or already wrapped
    pub fn install(&self, window: &Window) -> InstallOutcome {
        let Some(original) = window.fetch_binding() else {
            tracing::debug!("no fetch binding, fetch interceptor skipped");
            return InstallOutcome::Unavailable;
        };
        if original.is_instrumented() {
            return InstallOutcome::AlreadyInstalled;
        }

        window.set_fetch(Arc::new(InstrumentedFetch::new(original, self.reporter.clone())));
        InstallOutcome::Installed
    }
}

/// `fetch` wrapper that reports non-200 and rejected calls
pub struct InstrumentedFetch {
    original: Arc<dyn Fetch>,
    reporter: Reporter,
}

impl InstrumentedFetch {
    pub fn new(original: Arc<dyn Fetch>, reporter: Reporter) -> Self {
        Self { original, reporter }
    }

    /// The wrapped binding
    pub fn original(&self) -> &Arc<dyn Fetch> {
        &self.original
    }
}

#[async_trait]
impl Fetch for InstrumentedFetch {
    async fn fetch(&self, args: &[JsValue]) -> FetchResult {
        if args.is_empty() {
            return Err(FetchError::type_error("fetch requires at least 1 argument"));
        }

        let request = fault_boundary("fetch.request", || Ok(describe_fetch_call(args)));
        let outcome = self.original.fetch(args).await;

        let Some(request) = request else {
            return outcome;
        };

        match &outcome {
            Ok(response) if response.status != SUCCESS_STATUS => {
                self.reporter.report("fetch.response", || {
                    let url = if response.url.is_empty() {
                        request.url.clone()
                    } else {
                        response.url.clone()
                    };
                    Ok(Some(ErrorRecord::http_failure(
                        RecordSource::Fetch,
                        request,
                        &url,
                        response.status,
                        &response.status_text,
                        response.status_text.clone(),
                    )))
                });
            }
            Ok(_) => {}
            Err(error) => {
                self.reporter.report("fetch.rejection", || {
                    Ok(Some(ErrorRecord::transport_failure(
                        RecordSource::Fetch,
                        request,
                        error.stack_or_description(),
                    )))
                });
            }
        }

        outcome
    }

    fn is_instrumented(&self) -> bool {
        true
    }
}

/// Request metadata for one fetch call
///
/// `fetch(url)`, `fetch({url, method, body})` and `fetch(url, {method, body})`
/// are understood. The method defaults to GET; the body is parsed into
/// `params`.
pub fn describe_fetch_call(args: &[JsValue]) -> RequestSnapshot {
    let (url, options) = match args {
        [] => (String::new(), None),
        [single] if single.is_object() => (
            single.get_defined("url").map(JsValue::to_string_value).unwrap_or_default(),
            Some(single),
        ),
        [single] => (single.to_string_value(), None),
        [first, second, ..] => {
            let url = if first.is_object() {
                first.get_defined("url").map(JsValue::to_string_value).unwrap_or_default()
            } else {
                first.to_string_value()
            };
            (url, Some(second))
        }
    };

    let method = options
        .and_then(|o| o.get("method"))
        .filter(|m| m.is_truthy())
        .map(JsValue::to_string_value)
        .unwrap_or_else(|| "GET".to_string());

    RequestSnapshot::new(method, url, options.and_then(|o| o.get("body")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportContext;
    use crate::host::{FetchFn, FetchResponse};
    use crate::report::MemorySink;
    use serde_json::json;

    fn reporter(sink: &MemorySink) -> Reporter {
        Reporter::new(Arc::new(sink.clone()), ReportContext::new())
    }

    #[test]
    fn test_describe_single_string() {
        let request = describe_fetch_call(&[JsValue::from("/api/x")]);
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "/api/x");
        assert_eq!(request.params, json!({}));
    }

    #[test]
    fn test_describe_request_object() {
        let request = describe_fetch_call(&[JsValue::object([
            ("url", "/api/items"),
            ("method", "PUT"),
            ("body", r#"{"id":3}"#),
        ])]);
        assert_eq!(request.method, "PUT");
        assert_eq!(request.url, "/api/items");
        assert_eq!(request.params, json!({ "id": 3 }));

        let request = describe_fetch_call(&[JsValue::object([("url", "/api/items")])]);
        assert_eq!(request.method, "GET");
    }

    #[test]
    fn test_describe_url_and_options() {
        let request = describe_fetch_call(&[
            JsValue::from("/api/pay"),
            JsValue::object([("method", "POST"), ("body", "not json")]),
        ]);
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "/api/pay");
        assert_eq!(request.params, json!({}));

        let request = describe_fetch_call(&[JsValue::from("/api/pay"), JsValue::Undefined]);
        assert_eq!(request.method, "GET");
    }

    #[tokio::test]
    async fn test_zero_arguments_reject_without_delegating() {
        let calls = Arc::new(parking_lot::Mutex::new(0));
        let counter = calls.clone();
        let original = Arc::new(FetchFn::new(move |_| {
            *counter.lock() += 1;
            async { Ok::<_, FetchError>(FetchResponse::new(200, "OK")) }
        }));
        let sink = MemorySink::new();
        let fetch = InstrumentedFetch::new(original, reporter(&sink));

        let err = fetch.fetch(&[]).await.unwrap_err();
        assert_eq!(err.message, "fetch requires at least 1 argument");
        assert_eq!(*calls.lock(), 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_arguments_forwarded_untouched() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let original = Arc::new(FetchFn::new(move |args: Vec<JsValue>| {
            *recorder.lock() = args;
            async { Ok::<_, FetchError>(FetchResponse::new(200, "OK")) }
        }));
        let sink = MemorySink::new();
        let fetch = InstrumentedFetch::new(original, reporter(&sink));

        let args = vec![
            JsValue::from("/api/x"),
            JsValue::object([("method", "DELETE"), ("keepalive", "true")]),
            JsValue::from(3),
        ];
        let response = fetch.fetch(&args).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(*seen.lock(), args);
        assert!(sink.is_empty());
        assert!(fetch.is_instrumented());
        assert!(!fetch.original().is_instrumented());
    }

    #[tokio::test]
    async fn test_message_falls_back_to_request_url() {
        let original = Arc::new(FetchFn::new(|_| async {
            Ok::<_, FetchError>(FetchResponse::new(500, "Internal Server Error"))
        }));
        let sink = MemorySink::new();
        let fetch = InstrumentedFetch::new(original, reporter(&sink));

        fetch
            .fetch(&[JsValue::from("/api/x"), JsValue::object([("method", "PATCH")])])
            .await
            .unwrap();

        let records = sink.records();
        assert_eq!(records[0].message, "PATCH /api/x 500 (Internal Server Error)");
        let response = records[0].response.as_ref().unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.response_text, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_each_call_has_its_own_metadata() {
        let original = Arc::new(FetchFn::new(|args: Vec<JsValue>| async move {
            let status = if args[0].to_string_value() == "/a" { 404 } else { 410 };
            Ok::<_, FetchError>(FetchResponse::new(status, "Gone"))
        }));
        let sink = MemorySink::new();
        let fetch = Arc::new(InstrumentedFetch::new(original, reporter(&sink)));

        let a_args = [JsValue::from("/a"), JsValue::object([("method", "POST")])];
        let b_args = [JsValue::from("/b")];
        let (a, b) = tokio::join!(fetch.fetch(&a_args), fetch.fetch(&b_args));
        assert_eq!(a.unwrap().status, 404);
        assert_eq!(b.unwrap().status, 410);

        let mut messages: Vec<String> = sink.records().into_iter().map(|r| r.message).collect();
        messages.sort();
        assert_eq!(messages, vec!["GET /b 410 (Gone)", "POST /a 404 (Gone)"]);
    }
}
