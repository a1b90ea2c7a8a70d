//! Runtime contract between the host and a function sandbox.
//!
//! ## Protocol
//!
//! ```text
//! host ──stdin──▶ sandbox     exactly one UTF-8 JSON document (the event), then EOF
//! host ◀─stdout── sandbox     exactly one UTF-8 JSON document (the handler's return value)
//! host ◀─stderr── sandbox     free-form diagnostics, never parsed
//! ```
//!
//! There is no envelope, framing, or version marker: the first and only
//! document on each stream is the message.
//!
//! ## Sandbox environment
//!
//! | Variable        | Meaning                         | Absent    |
//! |-----------------|---------------------------------|-----------|
//! | `FUNCTION_NAME` | display name of the function    | `unknown` |
//! | `REQUEST_ID`    | unique id of this invocation    | `unknown` |
//!
//! The user's code is mounted at [`FUNCTION_DIR`] under the language's
//! [`Language::handler_file`] and must expose `handler(event, context)`.
//!
//! ## Exit status
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0    | success, stdout holds the result |
//! | 1    | [`EXIT_INVOCATION_ERROR`]: bad input, load error, or the handler raised |
//! | 2    | [`EXIT_HANDLER_NOT_FOUND`]: no handler file or no callable `handler` |

mod build_context;
mod codec;
mod context;
mod language;

pub use build_context::BuildFile;
pub use codec::{ContractError, decode_event, decode_response, encode_event, sleep_hint};
pub use context::InvocationContext;
pub use language::Language;

/// Mount point of the function's code inside every sandbox.
pub const FUNCTION_DIR: &str = "/function";

pub const ENV_FUNCTION_NAME: &str = "FUNCTION_NAME";
pub const ENV_REQUEST_ID: &str = "REQUEST_ID";

/// Value used for any context field whose environment variable is missing.
pub const UNKNOWN: &str = "unknown";

pub const EXIT_INVOCATION_ERROR: i32 = 1;
pub const EXIT_HANDLER_NOT_FOUND: i32 = 2;

/// Event field that makes the entrypoint block for that many seconds
/// before loading the handler. Exists for deterministic timeout tests.
pub const SLEEP_FIELD: &str = "sleep";
