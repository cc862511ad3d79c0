// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Window: the host environment's global scope
//!
//! Holds the two process-wide network bindings that interceptors replace.

use std::sync::Arc;

use parking_lot::RwLock;
use url::Url;

use super::event_loop::EventLoop;
use super::fetch::{Fetch, FetchError, FetchResult, NativeFetch};
use super::value::JsValue;
use super::xhr::{HttpXhrBackend, XhrBackend, XhrConstructor, XhrPrototype, XmlHttpRequest};
use crate::http::HttpClient;

/// Host global scope with replaceable `fetch` and `XMLHttpRequest` bindings
pub struct Window {
    fetch: RwLock<Option<Arc<dyn Fetch>>>,
    xhr: Option<XhrConstructor>,
    event_loop: EventLoop,
}

impl Window {
    /// Start building a window
    pub fn builder() -> WindowBuilder {
        WindowBuilder::default()
    }

    /// Window whose primitives go over the HTTP client
    ///
    /// Relative request URLs resolve against `base_url` (the document URL).
    pub fn with_http_client(client: HttpClient, base_url: Option<Url>) -> Self {
        Self::builder()
            .fetch(Arc::new(NativeFetch::new(client.clone(), base_url.clone())))
            .xhr_backend(Arc::new(HttpXhrBackend::new(client, base_url)))
            .build()
    }

    /// Call whatever is bound to `fetch`
    pub async fn fetch(&self, args: &[JsValue]) -> FetchResult {
        let binding = self.fetch_binding();
        match binding {
            Some(fetch) => fetch.fetch(args).await,
            None => Err(FetchError::type_error("fetch is not defined")),
        }
    }

    /// Current `fetch` binding
    pub fn fetch_binding(&self) -> Option<Arc<dyn Fetch>> {
        self.fetch.read().clone()
    }

    /// Replace the `fetch` binding
    pub fn set_fetch(&self, fetch: Arc<dyn Fetch>) {
        *self.fetch.write() = Some(fetch);
    }

    /// `new XMLHttpRequest()`; `None` when the host has no such constructor
    pub fn xml_http_request(&self) -> Option<XmlHttpRequest> {
        self.xhr.as_ref().map(XhrConstructor::construct)
    }

    /// Whether the host provides `XMLHttpRequest`
    pub fn has_xml_http_request(&self) -> bool {
        self.xhr.is_some()
    }

    /// Snapshot of the request-object prototype
    pub fn xhr_prototype(&self) -> Option<XhrPrototype> {
        self.xhr.as_ref().map(|ctor| ctor.prototype.read().clone())
    }

    /// Replace the request-object prototype; false when there is none to replace
    pub fn set_xhr_prototype(&self, prototype: XhrPrototype) -> bool {
        match &self.xhr {
            Some(ctor) => {
                *ctor.prototype.write() = prototype;
                true
            }
            None => false,
        }
    }

    /// The window's event loop
    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Drive the event loop until nothing is pending
    pub async fn run_until_idle(&self) -> usize {
        self.event_loop.run_until_idle().await
    }
}

/// Builder for [`Window`]
#[derive(Default)]
pub struct WindowBuilder {
    fetch: Option<Arc<dyn Fetch>>,
    xhr_backend: Option<Arc<dyn XhrBackend>>,
    legacy_xhr: bool,
    max_tasks: Option<usize>,
}

impl WindowBuilder {
    /// Bind `fetch`
    pub fn fetch(mut self, fetch: Arc<dyn Fetch>) -> Self {
        self.fetch = Some(fetch);
        self
    }

    /// Provide `XMLHttpRequest`, performing network work through `backend`
    pub fn xhr_backend(mut self, backend: Arc<dyn XhrBackend>) -> Self {
        self.xhr_backend = Some(backend);
        self
    }

    /// Request objects without `addEventListener`
    pub fn legacy_xhr(mut self, legacy: bool) -> Self {
        self.legacy_xhr = legacy;
        self
    }

    /// Limit on tasks per event loop drain
    pub fn max_tasks(mut self, max: usize) -> Self {
        self.max_tasks = Some(max);
        self
    }

    /// Build the window
    pub fn build(self) -> Window {
        let event_loop = match self.max_tasks {
            Some(max) => EventLoop::with_max_tasks(max),
            None => EventLoop::new(),
        };

        let xhr = self.xhr_backend.map(|backend| XhrConstructor {
            prototype: Arc::new(RwLock::new(XhrPrototype::native())),
            backend,
            event_loop: event_loop.clone(),
            legacy: self.legacy_xhr,
        });

        Window {
            fetch: RwLock::new(self.fetch),
            xhr,
            event_loop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FetchFn, FetchResponse};

    #[tokio::test]
    async fn test_window_without_primitives() {
        let window = Window::builder().build();
        assert!(window.fetch_binding().is_none());
        assert!(!window.has_xml_http_request());
        assert!(window.xml_http_request().is_none());
        assert!(window.xhr_prototype().is_none());

        let err = window.fetch(&[JsValue::from("/x")]).await.unwrap_err();
        assert_eq!(err.message, "fetch is not defined");
    }

    #[tokio::test]
    async fn test_set_fetch_replaces_binding() {
        let window = Window::builder()
            .fetch(Arc::new(FetchFn::new(|_| async {
                Ok::<_, FetchError>(FetchResponse::new(200, "OK"))
            })))
            .build();
        assert_eq!(window.fetch(&[JsValue::from("/x")]).await.unwrap().status, 200);

        window.set_fetch(Arc::new(FetchFn::new(|_| async {
            Ok::<_, FetchError>(FetchResponse::new(503, "Service Unavailable"))
        })));
        assert_eq!(window.fetch(&[JsValue::from("/x")]).await.unwrap().status, 503);
    }

    #[test]
    fn test_http_window_has_both_primitives() {
        let window = Window::with_http_client(
            HttpClient::new().unwrap(),
            Some(Url::parse("https://example.com/").unwrap()),
        );
        assert!(window.fetch_binding().is_some());
        assert!(window.has_xml_http_request());
        assert!(!window.xhr_prototype().unwrap().is_instrumented());
    }
}
