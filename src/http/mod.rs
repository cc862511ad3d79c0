// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP client layer
//!
//! Backs the native `fetch` and `XMLHttpRequest` primitives of a
//! [`crate::host::Window`] and the HTTP beacon sink.

mod client;
mod request;
mod response;

pub use client::{HttpClient, HttpClientConfig};
pub use request::Request;
pub use response::Response;

/// Default user agent string
pub const DEFAULT_USER_AGENT: &str = concat!("ajaxguard/", env!("CARGO_PKG_VERSION"));
