use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Longest function-id fragment carried into a sandbox name.
const MAX_ID_LEN: usize = 40;

/// One request to run a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub function_id: String,
    pub function_name: String,
    /// Wire name of the runtime, e.g. `python`. Validated by the engine.
    pub language: String,
    /// Source of the handler module.
    pub code: String,
    pub event: Value,
    pub timeout_ms: u64,
}

impl Invocation {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Unique sandbox name for one invocation: `function-<id>-<8 hex>`.
///
/// The function id is reduced to the container-name alphabet so that any
/// caller-supplied id produces a valid name; the suffix comes from the
/// invocation id, which keeps concurrent runs of one function apart.
pub fn sandbox_name(function_id: &str, invocation_id: Uuid) -> String {
    let suffix: String = invocation_id.simple().to_string().chars().take(8).collect();
    format!("function-{}-{suffix}", sanitize(function_id))
}

fn sanitize(function_id: &str) -> String {
    let cleaned: String = function_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .take(MAX_ID_LEN)
        .collect();
    if cleaned.is_empty() {
        "anon".to_string()
    } else {
        cleaned
    }
}
