// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Fault boundary for instrumentation code
//!
//! Everything an interceptor does besides delegating runs inside
//! [`fault_boundary`]. Errors and panics stop there: they are logged and
//! the intercepted call carries on as if it were not instrumented.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::Result;

/// Run `f`, logging and swallowing any error or panic
///
/// Returns `None` when `f` failed.
pub fn fault_boundary<T>(scope: &'static str, f: impl FnOnce() -> Result<T>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!(scope, error = %e, "instrumentation error suppressed");
            None
        }
        Err(payload) => {
            tracing::error!(
                scope,
                panic = %panic_message(payload.as_ref()),
                "instrumentation panic suppressed"
            );
            None
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_passes_value_through() {
        assert_eq!(fault_boundary("test", || Ok(7)), Some(7));
    }

    #[test]
    fn test_swallows_error() {
        let out: Option<()> = fault_boundary("test", || Err(Error::sink("memory", "full")));
        assert!(out.is_none());
    }

    #[test]
    fn test_swallows_panic() {
        let out: Option<()> = fault_boundary("test", || panic!("sink bug"));
        assert!(out.is_none());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
