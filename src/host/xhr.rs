// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! The event-driven `XMLHttpRequest` primitive
//!
//! Request objects are two-phase (`open`, then `send`) and report their
//! outcome through events. `open` and `send` are looked up on a prototype
//! shared by every object a window creates, so replacing a prototype method
//! affects existing objects too.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use reqwest::Method;
use url::Url;

use super::event_loop::{EventLoop, Task};
use super::fetch::resolve_url;
use super::value::JsValue;
use crate::error::{Error, Result};
use crate::http::{HttpClient, Request};

static NEXT_XHR_ID: AtomicU64 = AtomicU64::new(1);

/// `readyState` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadyState {
    #[default]
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

/// Event types a request object dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XhrEventKind {
    ReadyStateChange,
    Load,
    Error,
    Abort,
    LoadEnd,
}

impl XhrEventKind {
    /// DOM event name
    pub fn as_str(&self) -> &'static str {
        match self {
            XhrEventKind::ReadyStateChange => "readystatechange",
            XhrEventKind::Load => "load",
            XhrEventKind::Error => "error",
            XhrEventKind::Abort => "abort",
            XhrEventKind::LoadEnd => "loadend",
        }
    }

    /// One of the three outcomes that finish a request
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            XhrEventKind::Load | XhrEventKind::Error | XhrEventKind::Abort
        )
    }
}

/// Event delivered to listeners and handlers
#[derive(Clone)]
pub struct XhrEvent {
    pub kind: XhrEventKind,
    /// Milliseconds since the window's time origin
    pub time_stamp: f64,
    pub target: XmlHttpRequest,
}

impl XhrEvent {
    /// The object the listener is registered on
    pub fn current_target(&self) -> &XmlHttpRequest {
        &self.target
    }
}

/// Listener / handler callback
pub type EventListener = Arc<dyn Fn(&XhrEvent) + Send + Sync>;

/// A method on the request-object prototype (`open` or `send`)
pub trait XhrMethod: Send + Sync {
    /// Invoke with `this` bound to the request object
    fn call(&self, this: &XmlHttpRequest, args: &[JsValue]) -> Result<JsValue>;

    /// Whether this method is already an instrumentation wrapper
    fn is_instrumented(&self) -> bool {
        false
    }
}

/// The replaceable part of the request-object prototype
#[derive(Clone)]
pub struct XhrPrototype {
    pub open: Arc<dyn XhrMethod>,
    pub send: Arc<dyn XhrMethod>,
}

impl XhrPrototype {
    /// Prototype with the native `open` and `send`
    pub fn native() -> Self {
        Self {
            open: Arc::new(NativeOpen),
            send: Arc::new(NativeSend),
        }
    }

    /// Both methods are instrumentation wrappers
    pub fn is_instrumented(&self) -> bool {
        self.open.is_instrumented() && self.send.is_instrumented()
    }
}

struct NativeOpen;

impl XhrMethod for NativeOpen {
    fn call(&self, this: &XmlHttpRequest, args: &[JsValue]) -> Result<JsValue> {
        this.native_open(args)?;
        Ok(JsValue::Undefined)
    }
}

struct NativeSend;

impl XhrMethod for NativeSend {
    fn call(&self, this: &XmlHttpRequest, args: &[JsValue]) -> Result<JsValue> {
        this.native_send(args)?;
        Ok(JsValue::Undefined)
    }
}

/// Request handed to an [`XhrBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct XhrRequest {
    pub method: String,
    pub url: String,
    pub body: Option<String>,
}

/// Response produced by an [`XhrBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct XhrResponse {
    pub status: u16,
    pub status_text: String,
    /// Final URL after redirects
    pub url: String,
    pub body: String,
}

/// Network side of the request object
#[async_trait]
pub trait XhrBackend: Send + Sync {
    /// Perform the exchange; `Err` becomes an `error` event
    async fn execute(&self, request: XhrRequest) -> Result<XhrResponse>;
}

/// Backend over the HTTP client
#[derive(Clone)]
pub struct HttpXhrBackend {
    client: HttpClient,
    base_url: Option<Url>,
}

impl HttpXhrBackend {
    /// Create a backend; relative URLs resolve against `base_url`
    pub fn new(client: HttpClient, base_url: Option<Url>) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl XhrBackend for HttpXhrBackend {
    async fn execute(&self, request: XhrRequest) -> Result<XhrResponse> {
        let url = resolve_url(self.base_url.as_ref(), &request.url)?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::network(format!("invalid method {}", request.method)))?;

        let mut http_request = Request::from_url(method, url);
        if let Some(body) = request.body {
            http_request = http_request.body(body);
        }

        let response = self.client.execute(http_request).await?;
        Ok(XhrResponse {
            status: response.status_code(),
            status_text: response.status_text().to_string(),
            url: response.url_str().to_string(),
            body: response.text_lossy(),
        })
    }
}

/// Per-window constructor state shared by every request object
#[derive(Clone)]
pub(crate) struct XhrConstructor {
    pub(crate) prototype: Arc<RwLock<XhrPrototype>>,
    pub(crate) backend: Arc<dyn XhrBackend>,
    pub(crate) event_loop: EventLoop,
    /// Objects lack `addEventListener` (legacy hosts)
    pub(crate) legacy: bool,
}

impl XhrConstructor {
    pub(crate) fn construct(&self) -> XmlHttpRequest {
        XmlHttpRequest {
            inner: Arc::new(XhrInner {
                id: NEXT_XHR_ID.fetch_add(1, Ordering::Relaxed),
                prototype: self.prototype.clone(),
                backend: self.backend.clone(),
                event_loop: self.event_loop.clone(),
                supports_listeners: !self.legacy,
                state: Mutex::new(XhrState::default()),
                listeners: Mutex::new(Vec::new()),
                onreadystatechange: Mutex::new(None),
            }),
        }
    }
}

#[derive(Default)]
struct XhrState {
    ready_state: ReadyState,
    status: u16,
    status_text: String,
    response_url: String,
    response_text: String,
    method: String,
    url: String,
    /// A send is in flight
    send_flag: bool,
    /// Bumped by open/abort so stale completions are dropped
    generation: u64,
}

struct XhrInner {
    id: u64,
    prototype: Arc<RwLock<XhrPrototype>>,
    backend: Arc<dyn XhrBackend>,
    event_loop: EventLoop,
    supports_listeners: bool,
    state: Mutex<XhrState>,
    listeners: Mutex<Vec<(XhrEventKind, EventListener)>>,
    onreadystatechange: Mutex<Option<EventListener>>,
}

/// An `XMLHttpRequest` instance
#[derive(Clone)]
pub struct XmlHttpRequest {
    inner: Arc<XhrInner>,
}

impl std::fmt::Debug for XmlHttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("XmlHttpRequest")
            .field("id", &self.inner.id)
            .field("ready_state", &state.ready_state)
            .field("status", &state.status)
            .field("response_url", &state.response_url)
            .finish()
    }
}

impl XmlHttpRequest {
    /// Identity of this object, unique within the process
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn ready_state(&self) -> ReadyState {
        self.inner.state.lock().ready_state
    }

    pub fn status(&self) -> u16 {
        self.inner.state.lock().status
    }

    pub fn status_text(&self) -> String {
        self.inner.state.lock().status_text.clone()
    }

    pub fn response_url(&self) -> String {
        self.inner.state.lock().response_url.clone()
    }

    pub fn response_text(&self) -> String {
        self.inner.state.lock().response_text.clone()
    }

    /// Handle that does not keep the object alive
    pub fn downgrade(&self) -> WeakXmlHttpRequest {
        WeakXmlHttpRequest {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether `addEventListener` exists on this object
    pub fn supports_event_listeners(&self) -> bool {
        self.inner.supports_listeners
    }

    /// `xhr.open(method, url, ...)` through the prototype
    pub fn open(&self, args: &[JsValue]) -> Result<JsValue> {
        let open = self.inner.prototype.read().open.clone();
        open.call(self, args)
    }

    /// `xhr.send(body?)` through the prototype
    pub fn send(&self, args: &[JsValue]) -> Result<JsValue> {
        let send = self.inner.prototype.read().send.clone();
        send.call(self, args)
    }

    /// `xhr.abort()`
    pub fn abort(&self) {
        {
            let mut state = self.inner.state.lock();
            if !state.send_flag {
                return;
            }
            state.generation += 1;
            state.send_flag = false;
            state.status = 0;
            state.status_text.clear();
            state.response_text.clear();
            state.ready_state = ReadyState::Done;
        }

        self.dispatch(XhrEventKind::ReadyStateChange);
        self.dispatch(XhrEventKind::Abort);
        self.dispatch(XhrEventKind::LoadEnd);

        self.inner.state.lock().ready_state = ReadyState::Unsent;
    }

    /// `addEventListener`; returns false when the object has no listener support
    pub fn add_event_listener(&self, kind: XhrEventKind, listener: EventListener) -> bool {
        if !self.inner.supports_listeners {
            return false;
        }
        self.inner.listeners.lock().push((kind, listener));
        true
    }

    /// Current `onreadystatechange` handler
    pub fn onreadystatechange(&self) -> Option<EventListener> {
        self.inner.onreadystatechange.lock().clone()
    }

    /// Assign `onreadystatechange`
    pub fn set_onreadystatechange(&self, handler: Option<EventListener>) {
        *self.inner.onreadystatechange.lock() = handler;
    }

    fn native_open(&self, args: &[JsValue]) -> Result<()> {
        if args.len() < 2 {
            return Err(Error::other(format!(
                "TypeError: XMLHttpRequest.open requires 2 arguments, but only {} present",
                args.len()
            )));
        }

        let method = normalize_method(&args[0].to_string_value());
        let url = args[1].to_string_value();

        {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.send_flag = false;
            state.method = method;
            state.url = url;
            state.status = 0;
            state.status_text.clear();
            state.response_url.clear();
            state.response_text.clear();
            state.ready_state = ReadyState::Opened;
        }

        self.dispatch(XhrEventKind::ReadyStateChange);
        Ok(())
    }

    fn native_send(&self, args: &[JsValue]) -> Result<()> {
        let (request, generation) = {
            let mut state = self.inner.state.lock();
            if state.ready_state != ReadyState::Opened || state.send_flag {
                return Err(Error::invalid_state(
                    "send",
                    "the object's state must be OPENED",
                ));
            }
            state.send_flag = true;

            let body = args
                .first()
                .filter(|b| !b.is_nullish())
                .filter(|_| !matches!(state.method.as_str(), "GET" | "HEAD"))
                .map(JsValue::to_string_value);

            (
                XhrRequest {
                    method: state.method.clone(),
                    url: state.url.clone(),
                    body,
                },
                state.generation,
            )
        };

        let backend = self.inner.backend.clone();
        let this = self.clone();
        let spawned = self.inner.event_loop.spawn_io(async move {
            let outcome = backend.execute(request).await;
            Box::new(move || this.complete(generation, outcome)) as Task
        });

        if let Err(e) = spawned {
            self.inner.state.lock().send_flag = false;
            return Err(e);
        }
        Ok(())
    }

    /// Apply a backend outcome and fire the terminal events
    fn complete(&self, generation: u64, outcome: Result<XhrResponse>) {
        let terminal = {
            let mut state = self.inner.state.lock();
            if state.generation != generation || !state.send_flag {
                return;
            }
            state.send_flag = false;
            state.ready_state = ReadyState::Done;

            match outcome {
                Ok(response) => {
                    state.status = response.status;
                    state.status_text = response.status_text;
                    state.response_url = response.url;
                    state.response_text = response.body;
                    XhrEventKind::Load
                }
                Err(e) => {
                    tracing::debug!(xhr = self.inner.id, url = %state.url, error = %e, "XHR network error");
                    state.status = 0;
                    state.status_text.clear();
                    state.response_text.clear();
                    XhrEventKind::Error
                }
            }
        };

        self.dispatch(XhrEventKind::ReadyStateChange);
        self.dispatch(terminal);
        self.dispatch(XhrEventKind::LoadEnd);
    }

    /// Deliver an event to the handler and registered listeners
    ///
    /// A panicking callback is logged and does not stop the others.
    fn dispatch(&self, kind: XhrEventKind) {
        let event = XhrEvent {
            kind,
            time_stamp: self.inner.event_loop.now(),
            target: self.clone(),
        };

        let mut callbacks: Vec<EventListener> = Vec::new();
        if kind == XhrEventKind::ReadyStateChange {
            if let Some(handler) = self.onreadystatechange() {
                callbacks.push(handler);
            }
        }
        if self.inner.supports_listeners {
            callbacks.extend(
                self.inner
                    .listeners
                    .lock()
                    .iter()
                    .filter(|(k, _)| *k == kind)
                    .map(|(_, l)| l.clone()),
            );
        }

        for callback in callbacks {
            if std::panic::catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                tracing::error!(xhr = self.inner.id, event = kind.as_str(), "event listener panicked");
            }
        }
    }
}

/// Non-owning handle to an [`XmlHttpRequest`]
#[derive(Clone)]
pub struct WeakXmlHttpRequest {
    inner: Weak<XhrInner>,
}

impl WeakXmlHttpRequest {
    /// Whether the object still exists
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

/// Upper-case the standard methods, leave extension methods alone
fn normalize_method(method: &str) -> String {
    const STANDARD: [&str; 7] = ["DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT"];
    let upper = method.to_ascii_uppercase();
    if STANDARD.contains(&upper.as_str()) {
        upper
    } else {
        method.to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::host::Window;

    /// Backend answering every request with a fixed outcome
    pub(crate) struct StaticBackend {
        pub(crate) status: u16,
        pub(crate) status_text: &'static str,
        pub(crate) fail: bool,
        pub(crate) seen: Mutex<Vec<XhrRequest>>,
    }

    impl StaticBackend {
        pub(crate) fn status(status: u16, status_text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                status_text,
                fail: false,
                seen: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing() -> Arc<Self> {
            Arc::new(Self {
                status: 0,
                status_text: "",
                fail: true,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl XhrBackend for StaticBackend {
        async fn execute(&self, request: XhrRequest) -> Result<XhrResponse> {
            self.seen.lock().push(request.clone());
            if self.fail {
                return Err(Error::network("connection refused"));
            }
            Ok(XhrResponse {
                status: self.status,
                status_text: self.status_text.to_string(),
                url: format!("https://app.test{}", request.url),
                body: format!("{} body", self.status),
            })
        }
    }

    fn record_events(xhr: &XmlHttpRequest) -> Arc<Mutex<Vec<&'static str>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [
            XhrEventKind::ReadyStateChange,
            XhrEventKind::Load,
            XhrEventKind::Error,
            XhrEventKind::Abort,
            XhrEventKind::LoadEnd,
        ] {
            let seen = seen.clone();
            xhr.add_event_listener(kind, Arc::new(move |e: &XhrEvent| seen.lock().push(e.kind.as_str())));
        }
        seen
    }

    #[tokio::test]
    async fn test_load_lifecycle() {
        let backend = StaticBackend::status(404, "Not Found");
        let window = Window::builder().xhr_backend(backend.clone()).build();
        let xhr = window.xml_http_request().unwrap();
        let seen = record_events(&xhr);

        xhr.open(&["post".into(), "/api/items".into()]).unwrap();
        assert_eq!(xhr.ready_state(), ReadyState::Opened);
        xhr.send(&[r#"{"b":2}"#.into()]).unwrap();

        window.run_until_idle().await;

        assert_eq!(xhr.ready_state(), ReadyState::Done);
        assert_eq!(xhr.status(), 404);
        assert_eq!(xhr.status_text(), "Not Found");
        assert_eq!(xhr.response_url(), "https://app.test/api/items");
        assert_eq!(xhr.response_text(), "404 body");
        assert_eq!(
            *seen.lock(),
            vec!["readystatechange", "readystatechange", "load", "loadend"]
        );

        let requests = backend.seen.lock();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"b":2}"#));
    }

    #[tokio::test]
    async fn test_network_error_fires_error_event() {
        let window = Window::builder().xhr_backend(StaticBackend::failing()).build();
        let xhr = window.xml_http_request().unwrap();
        let seen = record_events(&xhr);

        xhr.open(&["GET".into(), "/down".into()]).unwrap();
        xhr.send(&[]).unwrap();
        window.run_until_idle().await;

        assert_eq!(xhr.status(), 0);
        assert_eq!(xhr.response_url(), "");
        assert!(seen.lock().contains(&"error"));
        assert!(!seen.lock().contains(&"load"));
    }

    #[tokio::test]
    async fn test_abort_drops_late_completion() {
        let window = Window::builder()
            .xhr_backend(StaticBackend::status(200, "OK"))
            .build();
        let xhr = window.xml_http_request().unwrap();
        let seen = record_events(&xhr);

        xhr.open(&["GET".into(), "/slow".into()]).unwrap();
        xhr.send(&[]).unwrap();
        xhr.abort();
        window.run_until_idle().await;

        assert_eq!(xhr.status(), 0);
        assert_eq!(xhr.ready_state(), ReadyState::Unsent);
        let seen = seen.lock();
        assert_eq!(seen.iter().filter(|k| **k == "abort").count(), 1);
        assert!(!seen.contains(&"load"));
    }

    #[tokio::test]
    async fn test_send_requires_open() {
        let window = Window::builder()
            .xhr_backend(StaticBackend::status(200, "OK"))
            .build();
        let xhr = window.xml_http_request().unwrap();

        let err = xhr.send(&[]).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        assert!(xhr.open(&["GET".into()]).is_err());
    }

    #[tokio::test]
    async fn test_legacy_object_uses_onreadystatechange() {
        let window = Window::builder()
            .xhr_backend(StaticBackend::status(200, "OK"))
            .legacy_xhr(true)
            .build();
        let xhr = window.xml_http_request().unwrap();
        assert!(!xhr.supports_event_listeners());
        assert!(!xhr.add_event_listener(XhrEventKind::Load, Arc::new(|_: &XhrEvent| {})));

        let states = Arc::new(Mutex::new(Vec::new()));
        let handler_states = states.clone();
        xhr.set_onreadystatechange(Some(Arc::new(move |e: &XhrEvent| {
            handler_states.lock().push(e.target.ready_state());
        })));

        xhr.open(&["GET".into(), "/legacy".into()]).unwrap();
        xhr.send(&[]).unwrap();
        window.run_until_idle().await;

        assert_eq!(*states.lock(), vec![ReadyState::Opened, ReadyState::Done]);
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_stop_others() {
        let window = Window::builder()
            .xhr_backend(StaticBackend::status(200, "OK"))
            .build();
        let xhr = window.xml_http_request().unwrap();

        xhr.add_event_listener(XhrEventKind::Load, Arc::new(|_: &XhrEvent| panic!("listener bug")));
        let seen = record_events(&xhr);

        xhr.open(&["GET".into(), "/x".into()]).unwrap();
        xhr.send(&[]).unwrap();
        window.run_until_idle().await;

        assert!(seen.lock().contains(&"load"));
    }

    #[tokio::test]
    async fn test_weak_handle_tracks_lifetime() {
        let window = Window::builder()
            .xhr_backend(StaticBackend::status(200, "OK"))
            .build();
        let xhr = window.xml_http_request().unwrap();
        let weak = xhr.downgrade();
        let clone = xhr.clone();
        assert!(weak.is_alive());

        drop(xhr);
        assert!(weak.is_alive());
        drop(clone);
        assert!(!weak.is_alive());
    }

    #[test]
    fn test_normalize_method() {
        assert_eq!(normalize_method("put"), "PUT");
        assert_eq!(normalize_method("Patch"), "PATCH");
        assert_eq!(normalize_method("propfind"), "propfind");
    }
}
