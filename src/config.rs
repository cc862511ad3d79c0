// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Reporting context configuration

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration handed to the dispatcher and passed to every sink call
///
/// The interceptors never look inside it; sinks use whichever fields they
/// need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportContext {
    /// Endpoint the HTTP beacon sink posts records to
    pub report_url: Option<String>,
    /// Application identifier attached by sinks
    pub app_id: Option<String>,
    /// Current user identifier attached by sinks
    pub user_id: Option<String>,
    /// Maximum records an in-memory sink keeps
    pub max_records: usize,
    /// Free-form values forwarded to sinks
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for ReportContext {
    fn default() -> Self {
        Self {
            report_url: None,
            app_id: None,
            user_id: None,
            max_records: 1000,
            extra: serde_json::Map::new(),
        }
    }
}

impl ReportContext {
    /// Create a new context
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the beacon endpoint
    pub fn report_url(mut self, url: impl Into<String>) -> Self {
        self.report_url = Some(url.into());
        self
    }

    /// Set the application identifier
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Set the user identifier
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the in-memory record cap
    pub fn max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }

    /// Add a free-form value
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
