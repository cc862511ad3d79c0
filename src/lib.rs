// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Ajaxguard - Network Error Interception
//!
//! Wraps a page's `fetch` and `XMLHttpRequest` primitives so that every
//! request ending in anything other than HTTP 200 produces a structured
//! error record, without changing what the page observes.
//!
//! ## Features
//!
//! - Transparent wrappers: arguments, results and rejections pass through untouched
//! - Per-call and per-send request metadata, safe under concurrency
//! - Idempotent installation: a window is never double-wrapped
//! - Fault boundary: a broken sink cannot break the page's requests
//! - Pluggable sinks: in-memory, tracing, HTTP beacon, fan-out
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ajaxguard::{AjaxErrorDispatcher, HttpClient, JsValue, LibraryKind, MemorySink, ReportContext, Window};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let base = url::Url::parse("https://example.com/")?;
//!     let window = Window::with_http_client(HttpClient::new()?, Some(base));
//!
//!     let sink = MemorySink::new();
//!     let dispatcher = AjaxErrorDispatcher::new(ReportContext::new(), Arc::new(sink.clone()));
//!     dispatcher.handle_error(&window, LibraryKind::Unspecified);
//!
//!     let _ = window.fetch(&[JsValue::from("/missing")]).await;
//!     for record in sink.records() {
//!         println!("{}", record.message);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod http;
pub mod intercept;
pub mod report;

// Re-exports for convenience

// Configuration
pub use config::ReportContext;

// Errors
pub use error::{Error, Result};

// Host environment
pub use host::{EventLoop, Fetch, FetchError, FetchErrorKind, FetchFn, FetchResponse, FetchResult, NativeFetch};
pub use host::{JsValue, Window, WindowBuilder};
pub use host::{HttpXhrBackend, ReadyState, XhrBackend, XhrEvent, XhrEventKind, XmlHttpRequest};

// HTTP
pub use http::{HttpClient, HttpClientConfig, Request, Response};

// Interception
pub use intercept::{AjaxErrorDispatcher, InstallOutcome, InstallReport, LibraryKind, Reporter};
pub use intercept::{fault_boundary, SUCCESS_STATUS};

// Reporting
pub use report::{ErrorCategory, ErrorLevel, ErrorRecord, RecordSource, RequestSnapshot, ResponseSnapshot};
pub use report::{FanoutSink, HttpSink, MemorySink, ReportingSink, TracingSink};

/// Ajaxguard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
