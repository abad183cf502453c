//! Error types for trace replay, provenance search and test runs.

use strandline_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    /// A lookup in the program data model failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The executor could not run a function.
    #[error("execution failed: {message}")]
    Executor { message: String },

    /// Provenance search was started without a frame to search in.
    #[error("call stack is empty")]
    EmptyCallStack,

    /// `start` was called with a token that is no longer the scheduled one.
    #[error("schedule token {token} is stale")]
    StaleToken { token: u64 },
}
