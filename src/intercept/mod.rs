// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Network-call interception
//!
//! [`AjaxErrorDispatcher`] installs wrappers around a window's `fetch`
//! binding and `XMLHttpRequest` prototype. The wrappers delegate every call
//! unchanged and, when a call ends in anything but status 200, hand one
//! [`ErrorRecord`] to the configured sink.

pub mod boundary;
mod fetch;
mod xhr;

pub use boundary::fault_boundary;
pub use fetch::{describe_fetch_call, FetchInterceptor, InstrumentedFetch};
pub use xhr::XhrInterceptor;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ReportContext;
use crate::error::Result;
use crate::host::Window;
use crate::report::{ErrorRecord, ReportingSink};

/// The only status treated as success
///
/// Deliberately narrow: 201, 204 and 304 are reported too.
pub const SUCCESS_STATUS: u16 = 200;

/// Which network library to instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LibraryKind {
    /// Promise-based `fetch` only
    Fetch,
    /// Event-based `XMLHttpRequest` only
    Ajax,
    /// Both
    #[default]
    Unspecified,
}

impl FromStr for LibraryKind {
    type Err = std::convert::Infallible;

    /// Never fails; unknown names select both libraries
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "fetch" => LibraryKind::Fetch,
            "ajax" | "xhr" | "xmlhttprequest" => LibraryKind::Ajax,
            _ => LibraryKind::Unspecified,
        })
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryKind::Fetch => f.write_str("fetch"),
            LibraryKind::Ajax => f.write_str("ajax"),
            LibraryKind::Unspecified => f.write_str("all"),
        }
    }
}

/// Result of installing one interceptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The binding now holds the instrumented wrapper
    Installed,
    /// The binding was already instrumented and was left alone
    AlreadyInstalled,
    /// The window has no such primitive
    Unavailable,
}

/// Per-interceptor outcomes of one `handle_error` call
///
/// `None` means the interceptor was not selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstallReport {
    pub fetch: Option<InstallOutcome>,
    pub xhr: Option<InstallOutcome>,
}

impl InstallReport {
    /// At least one interceptor was freshly installed
    pub fn any_installed(&self) -> bool {
        self.fetch == Some(InstallOutcome::Installed) || self.xhr == Some(InstallOutcome::Installed)
    }
}

/// Sink plus context, shared by every wrapper
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn ReportingSink>,
    context: Arc<ReportContext>,
}

impl Reporter {
    /// Create a reporter
    pub fn new(sink: Arc<dyn ReportingSink>, context: ReportContext) -> Self {
        Self {
            sink,
            context: Arc::new(context),
        }
    }

    /// The context handed to the sink
    pub fn context(&self) -> &ReportContext {
        &self.context
    }

    /// Build a record and hand it to the sink, inside the fault boundary
    ///
    /// `build` returns `None` when there is nothing to report.
    pub fn report(&self, scope: &'static str, build: impl FnOnce() -> Result<Option<ErrorRecord>>) {
        fault_boundary(scope, || {
            if let Some(record) = build()? {
                tracing::debug!(scope, sink = self.sink.name(), message = %record.message, "reporting network error");
                self.sink.record_error(record, &self.context)?;
            }
            Ok(())
        });
    }
}

/// Entry point: installs the interceptors a [`LibraryKind`] selects
pub struct AjaxErrorDispatcher {
    fetch: FetchInterceptor,
    xhr: XhrInterceptor,
}

impl AjaxErrorDispatcher {
    /// Create a dispatcher reporting to `sink`
    pub fn new(context: ReportContext, sink: Arc<dyn ReportingSink>) -> Self {
        let reporter = Reporter::new(sink, context);
        Self {
            fetch: FetchInterceptor::new(reporter.clone()),
            xhr: XhrInterceptor::new(reporter),
        }
    }

    /// Install the selected interceptors on `window`
    ///
    /// Never fails: a missing primitive is `Unavailable`, an existing
    /// wrapper is `AlreadyInstalled`.
    pub fn handle_error(&self, window: &Window, kind: LibraryKind) -> InstallReport {
        let mut report = InstallReport::default();

        if matches!(kind, LibraryKind::Fetch | LibraryKind::Unspecified) {
            report.fetch = Some(self.fetch.install(window));
        }
        if matches!(kind, LibraryKind::Ajax | LibraryKind::Unspecified) {
            report.xhr = Some(self.xhr.install(window));
        }

        tracing::info!(
            kind = %kind,
            fetch = ?report.fetch,
            xhr = ?report.xhr,
            "network error interception configured"
        );
        report
    }
}
