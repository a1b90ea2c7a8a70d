use runtime_contract::decode_response;

use crate::outcome::Outcome;

/// Map a finished sandbox's exit status and captured streams to an outcome.
///
/// A non-zero exit wins over anything on stdout. Stream bytes are decoded
/// as lossy UTF-8.
pub fn classify(exit_code: i32, stdout: &[u8], stderr: &[u8]) -> Outcome {
    if exit_code != 0 {
        return Outcome::RuntimeFailure {
            exit_code,
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        };
    }
    let stdout = String::from_utf8_lossy(stdout);
    match decode_response(&stdout) {
        Ok(value) => Outcome::Success { value },
        Err(_) => Outcome::MalformedOutput {
            raw: stdout.into_owned(),
        },
    }
}
