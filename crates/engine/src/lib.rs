//! Sandboxed function execution.
//!
//! [`Engine::execute`] runs one [`Invocation`] in a fresh sandbox and always
//! answers with an [`InvocationReport`]; failures are values, never errors.
//! The sandbox is removed before `execute` returns, whatever the outcome.

mod classify;
mod config;
mod engine;
mod error;
mod guard;
mod invocation;
mod outcome;
mod registry;
mod staging;
mod table;

pub use classify::classify;
pub use config::{DEFAULT_CPU_COUNT, DEFAULT_MEMORY_MB, DEFAULT_PROVISION_TIMEOUT, EngineConfig};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use invocation::{Invocation, sandbox_name};
pub use outcome::{FailureStage, InvocationReport, Outcome};
pub use registry::{ImageRef, ImageRegistry};
pub use table::SandboxEntry;
