// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Dynamic values passed to host primitives
//!
//! `fetch(...)`, `xhr.open(...)` and `xhr.send(...)` accept loosely typed
//! arguments in the host; this is the Rust shape of those arguments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JavaScript value type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum JsValue {
    /// Undefined value
    #[default]
    Undefined,
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number value (JavaScript only has f64)
    Number(f64),
    /// String value
    String(String),
    /// Array value
    Array(Vec<JsValue>),
    /// Plain object with own enumerable properties
    Object(BTreeMap<String, JsValue>),
    /// Function reference
    Function,
    /// Symbol
    Symbol(String),
}

impl JsValue {
    /// Build a plain object from key/value pairs
    pub fn object<K, V, I>(props: I) -> Self
    where
        K: Into<String>,
        V: Into<JsValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        JsValue::Object(
            props
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Check if value is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Array(_) | JsValue::Object(_) | JsValue::Function => true,
            JsValue::Symbol(_) => true,
        }
    }

    /// Check if null or undefined
    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    /// Check if plain object
    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    /// Property lookup; `None` for missing keys and non-objects
    pub fn get(&self, key: &str) -> Option<&JsValue> {
        match self {
            JsValue::Object(props) => props.get(key),
            _ => None,
        }
    }

    /// Property lookup that treats `undefined`/`null` as absent
    pub fn get_defined(&self, key: &str) -> Option<&JsValue> {
        self.get(key).filter(|v| !v.is_nullish())
    }

    /// Convert to string (JavaScript-style coercion)
    pub fn to_string_value(&self) -> String {
        match self {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Boolean(b) => b.to_string(),
            JsValue::Number(n) => {
                if n.is_nan() {
                    "NaN".to_string()
                } else if n.is_infinite() {
                    if *n > 0.0 {
                        "Infinity".to_string()
                    } else {
                        "-Infinity".to_string()
                    }
                } else {
                    n.to_string()
                }
            }
            JsValue::String(s) => s.clone(),
            JsValue::Array(a) => a
                .iter()
                .map(|v| v.to_string_value())
                .collect::<Vec<_>>()
                .join(","),
            JsValue::Object(_) => "[object Object]".to_string(),
            JsValue::Function => "[function]".to_string(),
            JsValue::Symbol(s) => format!("Symbol({})", s),
        }
    }

}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i32> for JsValue {
    fn from(n: i32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(s)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(s.to_string())
    }
}

impl std::fmt::Display for JsValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_value())
    }
}
