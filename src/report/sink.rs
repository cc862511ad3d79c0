// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Reporting sinks
//!
//! A sink persists or forwards finished records. Interceptors call
//! [`ReportingSink::record_error`] inside a fault boundary and only log what
//! it returns.

use std::sync::Arc;

use parking_lot::RwLock;

use super::ErrorRecord;
use crate::config::ReportContext;
use crate::error::{Error, Result};
use crate::http::{HttpClient, Request};

/// Receiver of finished error records
pub trait ReportingSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Accept one record
    fn record_error(&self, record: ErrorRecord, context: &ReportContext) -> Result<()>;
}

/// Keeps records in memory, dropping the oldest past `context.max_records`
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<RwLock<Vec<ErrorRecord>>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored records, oldest first
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.records.read().clone()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no record is stored
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Drop every stored record
    pub fn clear(&self) {
        self.records.write().clear();
    }

    /// Export stored records as a JSON array
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&*self.records.read())
    }
}

impl ReportingSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn record_error(&self, record: ErrorRecord, context: &ReportContext) -> Result<()> {
        if context.max_records == 0 {
            return Ok(());
        }
        let mut records = self.records.write();
        while records.len() >= context.max_records {
            records.remove(0);
        }
        records.push(record);
        Ok(())
    }
}

/// Emits every record as a structured log event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReportingSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn record_error(&self, record: ErrorRecord, context: &ReportContext) -> Result<()> {
        tracing::warn!(
            source = ?record.source,
            method = %record.request.method,
            url = %record.request.url,
            status = record.response.as_ref().map(|r| r.status),
            app_id = context.app_id.as_deref().unwrap_or(""),
            "{}",
            record.message
        );
        Ok(())
    }
}

/// Posts records as JSON to `context.report_url`
///
/// The upload runs on a spawned tokio task; its outcome is only logged. It
/// goes straight through the HTTP client, never through an instrumented
/// window binding, so uploads are not themselves observed.
#[derive(Clone)]
pub struct HttpSink {
    client: HttpClient,
}

impl HttpSink {
    /// Create a sink using `client` for uploads
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Record plus the context identifiers, as posted
    fn payload(record: &ErrorRecord, context: &ReportContext) -> Result<serde_json::Value> {
        let mut payload = serde_json::to_value(record)?;
        if let Some(obj) = payload.as_object_mut() {
            if let Some(ref app_id) = context.app_id {
                obj.insert("appId".to_string(), app_id.clone().into());
            }
            if let Some(ref user_id) = context.user_id {
                obj.insert("userId".to_string(), user_id.clone().into());
            }
            if !context.extra.is_empty() {
                obj.insert("extra".to_string(), context.extra.clone().into());
            }
        }
        Ok(payload)
    }
}

impl ReportingSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    fn record_error(&self, record: ErrorRecord, context: &ReportContext) -> Result<()> {
        let url = context
            .report_url
            .as_deref()
            .ok_or_else(|| Error::config("HttpSink requires report_url"))?;
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::config(format!("HttpSink requires a tokio runtime: {}", e)))?;

        let request = Request::post(url)?.json(&Self::payload(&record, context)?)?;
        let client = self.client.clone();

        handle.spawn(async move {
            let url = request.url.to_string();
            match client.execute(request).await {
                Ok(response) if response.status.is_success() => {
                    tracing::debug!(url = %url, "error record uploaded");
                }
                Ok(response) => {
                    tracing::warn!(url = %url, status = response.status_code(), "error record upload rejected");
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "error record upload failed");
                }
            }
        });
        Ok(())
    }
}

/// Forwards each record to several sinks
///
/// Every sink is tried; the first failure is returned.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ReportingSink>>,
}

impl FanoutSink {
    /// Create an empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with(mut self, sink: Arc<dyn ReportingSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no sinks
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ReportingSink for FanoutSink {
    fn name(&self) -> &str {
        "fanout"
    }

    fn record_error(&self, record: ErrorRecord, context: &ReportContext) -> Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record_error(record.clone(), context) {
                tracing::debug!(sink = sink.name(), error = %e, "fan-out sink failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
