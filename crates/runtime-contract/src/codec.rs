use std::time::Duration;

use serde_json::Value;

use crate::SLEEP_FIELD;

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("no input received on stdin")]
    EmptyInput,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Serialize an event for the sandbox's stdin: one compact JSON document,
/// no trailing newline.
pub fn encode_event(event: &Value) -> Result<Vec<u8>, ContractError> {
    Ok(serde_json::to_vec(event)?)
}

/// Parse the sandbox side of [`encode_event`]. Empty or whitespace-only input
/// is an invocation error, not a parse error.
pub fn decode_event(input: &[u8]) -> Result<Value, ContractError> {
    if input.iter().all(u8::is_ascii_whitespace) {
        return Err(ContractError::EmptyInput);
    }
    Ok(serde_json::from_slice(input)?)
}

/// Parse a sandbox's stdout. Exactly one JSON document is accepted;
/// surrounding whitespace is ignored and any trailing data is rejected.
pub fn decode_response(output: &str) -> Result<Value, ContractError> {
    Ok(serde_json::from_str(output)?)
}

/// Delay requested by an event's `sleep` field, in seconds.
///
/// Only objects with a finite, non-negative number qualify; anything else
/// (strings, booleans, negative values) is ignored.
pub fn sleep_hint(event: &Value) -> Option<Duration> {
    let secs = event.as_object()?.get(SLEEP_FIELD)?.as_f64()?;
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn encode_has_no_framing() {
        let bytes = encode_event(&json!({"a": 1})).unwrap();
        assert_eq!(bytes, br#"{"a":1}"#);
    }

    #[test]
    fn decode_event_accepts_encoded_event() {
        let event = json!({"name": "world", "nested": [1, 2, {"x": null}]});
        let decoded = decode_event(&encode_event(&event).unwrap()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn decode_event_rejects_empty_input() {
        assert!(matches!(decode_event(b""), Err(ContractError::EmptyInput)));
        assert!(matches!(
            decode_event(b" \n\t"),
            Err(ContractError::EmptyInput)
        ));
    }

    #[test]
    fn decode_event_rejects_invalid_json() {
        assert!(matches!(
            decode_event(b"{not json"),
            Err(ContractError::InvalidJson(_))
        ));
    }

    #[test]
    fn decode_event_accepts_non_object_documents() {
        assert_eq!(decode_event(b"42").unwrap(), json!(42));
        assert_eq!(decode_event(b"\"hi\"").unwrap(), json!("hi"));
    }

    #[test]
    fn decode_response_allows_surrounding_whitespace() {
        assert_eq!(decode_response("  {\"ok\":true}\n").unwrap(), json!({"ok": true}));
    }

    #[test]
    fn decode_response_rejects_multiple_documents() {
        assert!(decode_response("{} {}").is_err());
        assert!(decode_response("1\n2").is_err());
    }

    #[test]
    fn decode_response_rejects_plain_text() {
        assert!(decode_response("hello world").is_err());
        assert!(decode_response("").is_err());
    }

    #[test]
    fn sleep_hint_reads_numbers() {
        assert_eq!(sleep_hint(&json!({"sleep": 2})), Some(Duration::from_secs(2)));
        assert_eq!(
            sleep_hint(&json!({"sleep": 0.5})),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn sleep_hint_ignores_non_numbers() {
        assert_eq!(sleep_hint(&json!({"sleep": "2"})), None);
        assert_eq!(sleep_hint(&json!({"sleep": true})), None);
        assert_eq!(sleep_hint(&json!({"sleep": null})), None);
        assert_eq!(sleep_hint(&json!({})), None);
    }

    #[test]
    fn sleep_hint_ignores_negative_values() {
        assert_eq!(sleep_hint(&json!({"sleep": -1})), None);
    }

    #[test]
    fn sleep_hint_requires_an_object() {
        assert_eq!(sleep_hint(&json!([2])), None);
        assert_eq!(sleep_hint(&json!(2)), None);
    }
}
