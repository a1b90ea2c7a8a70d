use std::time::Instant;

use crate::{ENV_FUNCTION_NAME, ENV_REQUEST_ID, UNKNOWN};

/// Context handed to a handler alongside its event.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub function_name: String,
    pub request_id: String,
    /// Monotonic start of the invocation inside the sandbox.
    pub start: Instant,
}

impl InvocationContext {
    /// Build from a variable lookup the way the entrypoints read their
    /// environment. Missing or empty values become [`UNKNOWN`].
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string())
        };
        Self {
            function_name: get(ENV_FUNCTION_NAME),
            request_id: get(ENV_REQUEST_ID),
            start: Instant::now(),
        }
    }

    /// Environment the host must inject so the sandbox can build this context.
    pub fn env_pairs(function_name: &str, request_id: &str) -> Vec<(String, String)> {
        vec![
            (ENV_FUNCTION_NAME.to_string(), function_name.to_string()),
            (ENV_REQUEST_ID.to_string(), request_id.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn reads_supplied_values() {
        let env: HashMap<String, String> = InvocationContext::env_pairs("hello", "req-1")
            .into_iter()
            .collect();
        let ctx = InvocationContext::from_lookup(|k| env.get(k).cloned());
        assert_eq!(ctx.function_name, "hello");
        assert_eq!(ctx.request_id, "req-1");
    }

    #[test]
    fn missing_values_default_to_sentinel() {
        let ctx = InvocationContext::from_lookup(|_| None);
        assert_eq!(ctx.function_name, UNKNOWN);
        assert_eq!(ctx.request_id, UNKNOWN);
    }

    #[test]
    fn empty_values_default_to_sentinel() {
        let ctx = InvocationContext::from_lookup(|_| Some(String::new()));
        assert_eq!(ctx.function_name, UNKNOWN);
    }

    #[test]
    fn start_is_monotonic() {
        let a = InvocationContext::from_lookup(|_| None);
        let b = InvocationContext::from_lookup(|_| None);
        assert!(b.start >= a.start);
    }
}
