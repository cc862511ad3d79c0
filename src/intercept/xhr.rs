// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! `XMLHttpRequest` interceptor
//!
//! `open` remembers the method per request object; `send` attaches a
//! terminal observer for that one send and then delegates. The observer is
//! registered as `error`/`load`/`abort` listeners, or composed into
//! `onreadystatechange` on objects without listener support.

use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::boundary::fault_boundary;
use super::{InstallOutcome, Reporter, SUCCESS_STATUS};
use crate::error::Result;
use crate::host::{
    EventListener, JsValue, ReadyState, WeakXmlHttpRequest, Window, XhrEvent, XhrEventKind, XhrMethod,
    XhrPrototype, XmlHttpRequest,
};
use crate::report::{ErrorRecord, RecordSource, RequestSnapshot};

/// Method recorded by `open` for one request object
struct OpenedRequest {
    handle: WeakXmlHttpRequest,
    method: String,
}

/// Keyed by request-object id; taken by `send`, pruned once the object is gone
type OpenedMethods = Arc<DashMap<u64, OpenedRequest>>;

/// Replaces `open` and `send` on a window's request-object prototype
pub struct XhrInterceptor {
    reporter: Reporter,
    opened: OpenedMethods,
}

impl XhrInterceptor {
    pub fn new(reporter: Reporter) -> Self {
        Self {
            reporter,
            opened: Arc::new(DashMap::new()),
        }
    }

    /// Wrap the prototype methods unless missing or already wrapped
    pub fn install(&self, window: &Window) -> InstallOutcome {
        let Some(prototype) = window.xhr_prototype() else {
            tracing::debug!("no XMLHttpRequest constructor, XHR interceptor skipped");
            return InstallOutcome::Unavailable;
        };
        if prototype.is_instrumented() {
            return InstallOutcome::AlreadyInstalled;
        }

        let instrumented = XhrPrototype {
            open: Arc::new(InstrumentedOpen {
                original: prototype.open,
                opened: self.opened.clone(),
            }),
            send: Arc::new(InstrumentedSend {
                original: prototype.send,
                reporter: self.reporter.clone(),
                opened: self.opened.clone(),
            }),
        };

        if window.set_xhr_prototype(instrumented) {
            InstallOutcome::Installed
        } else {
            InstallOutcome::Unavailable
        }
    }

    /// Live request objects opened but not yet sent
    pub fn pending_opens(&self) -> usize {
        self.opened.len()
    }
}

struct InstrumentedOpen {
    original: Arc<dyn XhrMethod>,
    opened: OpenedMethods,
}

impl XhrMethod for InstrumentedOpen {
    fn call(&self, this: &XmlHttpRequest, args: &[JsValue]) -> Result<JsValue> {
        let replaced = fault_boundary("xhr.open", || {
            let method = args
                .first()
                .filter(|m| !m.is_nullish())
                .map(JsValue::to_string_value)
                .unwrap_or_else(|| "GET".to_string());
            self.opened.retain(|_, entry| entry.handle.is_alive());
            Ok(self.opened.insert(
                this.id(),
                OpenedRequest {
                    handle: this.downgrade(),
                    method,
                },
            ))
        });

        let result = self.original.call(this, args);
        if result.is_err() {
            // The object keeps whatever the last successful open gave it
            match replaced {
                Some(Some(previous)) => {
                    self.opened.insert(this.id(), previous);
                }
                Some(None) => {
                    self.opened.remove(&this.id());
                }
                None => {}
            }
        }
        result
    }

    fn is_instrumented(&self) -> bool {
        true
    }
}

struct InstrumentedSend {
    original: Arc<dyn XhrMethod>,
    reporter: Reporter,
    opened: OpenedMethods,
}

impl InstrumentedSend {
    /// Returns the observer and the `open` entry it consumed
    fn attach_observer(
        &self,
        this: &XmlHttpRequest,
        args: &[JsValue],
    ) -> (Arc<TerminalObserver>, Option<OpenedRequest>) {
        let taken = self.opened.remove(&this.id()).map(|(_, entry)| entry);
        let method = taken
            .as_ref()
            .map(|entry| entry.method.clone())
            .unwrap_or_else(|| "GET".to_string());

        let observer = Arc::new(TerminalObserver {
            reporter: self.reporter.clone(),
            method,
            body: args.first().cloned(),
            fired: AtomicBool::new(false),
        });

        if this.supports_event_listeners() {
            for kind in [XhrEventKind::Error, XhrEventKind::Load, XhrEventKind::Abort] {
                let observer = observer.clone();
                this.add_event_listener(kind, Arc::new(move |event: &XhrEvent| observer.observe(event)));
            }
        } else {
            this.set_onreadystatechange(Some(compose_handler(this.onreadystatechange(), observer.clone())));
        }

        (observer, taken)
    }
}

impl XhrMethod for InstrumentedSend {
    fn call(&self, this: &XmlHttpRequest, args: &[JsValue]) -> Result<JsValue> {
        let attached = fault_boundary("xhr.send", || Ok(self.attach_observer(this, args)));

        let result = self.original.call(this, args);
        if result.is_err() {
            // Nothing was sent, so this observer must never report
            if let Some((observer, taken)) = attached {
                observer.disarm();
                if let Some(entry) = taken {
                    self.opened.insert(this.id(), entry);
                }
            }
        }
        result
    }

    fn is_instrumented(&self) -> bool {
        true
    }
}

/// `onreadystatechange` running `previous` first, then the observer once DONE
///
/// A panic in `previous` still propagates to the dispatcher after the
/// observer has run.
fn compose_handler(previous: Option<EventListener>, observer: Arc<TerminalObserver>) -> EventListener {
    Arc::new(move |event: &XhrEvent| {
        let previous_outcome = previous
            .as_ref()
            .map(|handler| catch_unwind(AssertUnwindSafe(|| handler(event))));

        if event.current_target().ready_state() == ReadyState::Done {
            observer.observe(event);
        }

        if let Some(Err(payload)) = previous_outcome {
            resume_unwind(payload);
        }
    })
}

/// Reports the outcome of one send
struct TerminalObserver {
    reporter: Reporter,
    method: String,
    body: Option<JsValue>,
    fired: AtomicBool,
}

impl TerminalObserver {
    fn disarm(&self) {
        self.fired.store(true, Ordering::SeqCst);
    }

    fn observe(&self, event: &XhrEvent) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }

        self.reporter.report("xhr.terminal", || {
            let target = event.current_target();
            let status = target.status();
            if status == SUCCESS_STATUS {
                return Ok(None);
            }

            let url = target.response_url();
            let request = RequestSnapshot::new(self.method.clone(), url.clone(), self.body.as_ref());
            Ok(Some(
                ErrorRecord::http_failure(
                    RecordSource::Xhr,
                    request,
                    &url,
                    status,
                    &target.status_text(),
                    target.response_text(),
                )
                .with_response_time(event.time_stamp),
            ))
        });
    }
}
