// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error records and the sinks that receive them

mod sink;

pub use sink::{FanoutSink, HttpSink, MemorySink, ReportingSink, TracingSink};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::host::JsValue;

/// Severity tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Error,
    Warning,
    Info,
}

/// Category tag shared with the wider monitoring taxonomy
///
/// Network interception only ever produces [`ErrorCategory::AjaxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    JsError,
    ResourceError,
    PromiseError,
    AjaxError,
    ConsoleError,
    UnknownError,
}

/// Which interceptor built a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    Fetch,
    Xhr,
}

/// Request half of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    /// Parsed request body, `{}` when absent or unparseable
    pub params: serde_json::Value,
}

impl RequestSnapshot {
    /// Snapshot with the body parsed into `params`
    pub fn new(method: impl Into<String>, url: impl Into<String>, body: Option<&JsValue>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            params: parse_params(body),
        }
    }
}

/// Response half of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSnapshot {
    pub status: u16,
    pub response_text: String,
}

/// One detected network failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub level: ErrorLevel,
    pub category: ErrorCategory,
    pub message: String,
    /// Terminal event timestamp (ms since the window's time origin)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    pub request: RequestSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSnapshot>,
    pub source: RecordSource,
    /// Wall-clock time the record was built
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    /// Record for a settled request whose status is not the success code
    ///
    /// `url` is the URL named in the message: the final response URL.
    pub fn http_failure(
        source: RecordSource,
        request: RequestSnapshot,
        url: &str,
        status: u16,
        status_text: &str,
        response_text: impl Into<String>,
    ) -> Self {
        Self {
            level: ErrorLevel::Warning,
            category: ErrorCategory::AjaxError,
            message: status_message(&request.method, url, status, status_text),
            response_time: None,
            request,
            response: Some(ResponseSnapshot {
                status,
                response_text: response_text.into(),
            }),
            source,
            timestamp: Utc::now(),
        }
    }

    /// Record for a request that failed to settle
    pub fn transport_failure(
        source: RecordSource,
        request: RequestSnapshot,
        description: impl Into<String>,
    ) -> Self {
        Self {
            level: ErrorLevel::Warning,
            category: ErrorCategory::AjaxError,
            message: description.into(),
            response_time: None,
            request,
            response: None,
            source,
            timestamp: Utc::now(),
        }
    }

    /// Attach the terminal event timestamp
    pub fn with_response_time(mut self, time_stamp: f64) -> Self {
        self.response_time = Some(time_stamp);
        self
    }

    /// Serialize to the wire format
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// `"<METHOD> <URL> <STATUS> (<STATUS_TEXT>)"`
pub fn status_message(method: &str, url: &str, status: u16, status_text: &str) -> String {
    format!("{} {} {} ({})", method, url, status, status_text)
}

/// Parse a request body into record params
///
/// The body is coerced to a string and parsed as JSON. Anything that does
/// not parse, and any falsy JSON value, yields an empty object.
pub fn parse_params(body: Option<&JsValue>) -> serde_json::Value {
    let empty = || serde_json::Value::Object(serde_json::Map::new());

    let Some(body) = body else {
        return empty();
    };

    match serde_json::from_str::<serde_json::Value>(&body.to_string_value()) {
        Ok(value) if is_truthy_json(&value) => value,
        _ => empty(),
    }
}

fn is_truthy_json(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_params() {
        assert_eq!(parse_params(Some(&JsValue::from(r#"{"a":1}"#))), json!({ "a": 1 }));
        assert_eq!(parse_params(Some(&JsValue::from("[1,2]"))), json!([1, 2]));
        assert_eq!(parse_params(Some(&JsValue::from(5))), json!(5));

        assert_eq!(parse_params(None), json!({}));
        assert_eq!(parse_params(Some(&JsValue::from("{not json"))), json!({}));
        assert_eq!(parse_params(Some(&JsValue::from("null"))), json!({}));
        assert_eq!(parse_params(Some(&JsValue::from("0"))), json!({}));
        assert_eq!(parse_params(Some(&JsValue::Undefined)), json!({}));
        assert_eq!(parse_params(Some(&JsValue::object([("a", 1)]))), json!({}));
    }

    #[test]
    fn test_http_failure_record() {
        let record = ErrorRecord::http_failure(
            RecordSource::Fetch,
            RequestSnapshot::new("GET", "/api/x", None),
            "/api/x",
            404,
            "Not Found",
            "Not Found",
        );

        assert_eq!(record.message, "GET /api/x 404 (Not Found)");
        assert_eq!(record.level, ErrorLevel::Warning);
        assert_eq!(record.category, ErrorCategory::AjaxError);
        assert_eq!(record.response.as_ref().map(|r| r.status), Some(404));
    }

    #[test]
    fn test_wire_format() {
        let record = ErrorRecord::http_failure(
            RecordSource::Xhr,
            RequestSnapshot::new("PUT", "https://app.test/b", Some(&JsValue::from(r#"{"b":2}"#))),
            "https://app.test/b",
            500,
            "Internal Server Error",
            "boom",
        )
        .with_response_time(12.5);

        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(value["level"], "warning");
        assert_eq!(value["category"], "ajax_error");
        assert_eq!(value["source"], "xhr");
        assert_eq!(value["responseTime"], 12.5);
        assert_eq!(value["request"]["params"], json!({ "b": 2 }));
        assert_eq!(value["response"]["responseText"], "boom");
    }

    #[test]
    fn test_transport_record_omits_response() {
        let record = ErrorRecord::transport_failure(
            RecordSource::Fetch,
            RequestSnapshot::new("POST", "/api/x", None),
            "TypeError: Failed to fetch",
        );
        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert!(value.get("response").is_none());
        assert!(value.get("responseTime").is_none());
        assert_eq!(value["message"], "TypeError: Failed to fetch");
    }
}
