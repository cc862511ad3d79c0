// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Host environment the interceptors patch
//!
//! A [`Window`] exposes `fetch` and `XMLHttpRequest` the way a browser page
//! does, with an event loop that delivers request callbacks.

mod event_loop;
mod fetch;
mod value;
mod window;
pub(crate) mod xhr;

pub use event_loop::{EventLoop, Task};
pub use fetch::{Fetch, FetchError, FetchErrorKind, FetchFn, FetchResponse, FetchResult, NativeFetch};
pub use value::JsValue;
pub use window::{Window, WindowBuilder};
pub use xhr::{
    EventListener, HttpXhrBackend, ReadyState, XhrBackend, XhrEvent, XhrEventKind, XhrMethod,
    WeakXmlHttpRequest, XhrPrototype, XhrRequest, XhrResponse, XmlHttpRequest,
};
