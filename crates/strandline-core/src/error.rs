//! Core error types for strandline-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of the program data model: lookups, call-target resolution,
//! handle-based edits and module dependency ordering.

use thiserror::Error;

use crate::id::{FunctionId, ListId, ModuleUrl, OpId};

/// Core errors produced by the strandline-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A module URL is not present in the store.
    #[error("module not found: {url}")]
    ModuleNotFound { url: ModuleUrl },

    /// A function id is not present in the given module.
    #[error("function not found: {function} in module {module}")]
    FunctionNotFound { module: ModuleUrl, function: FunctionId },

    /// A `<ref-index>:<function-id>` target names a ref the module lacks.
    #[error("module {module} has no ref with index {index}")]
    UnknownRef { module: ModuleUrl, index: usize },

    /// A call target string could not be parsed.
    #[error("malformed call target: '{target}'")]
    MalformedTarget { target: String },

    /// A function id is already taken in the given module.
    #[error("function {function} already exists in module {module}")]
    DuplicateFunction { module: ModuleUrl, function: FunctionId },

    /// An operation-list handle is not present in the module.
    #[error("operation list not found: ListId({id})", id = id.0)]
    ListNotFound { id: ListId },

    /// An operation handle is not present in the module.
    #[error("operation not found: OpId({id})", id = id.0)]
    OperationNotFound { id: OpId },

    /// The operation exists but is not a conditional.
    #[error("operation OpId({id}) is not a conditional", id = id.0)]
    NotAConditional { id: OpId },

    /// Modules being saved reference each other in a cycle.
    #[error("circular dependency detected among modules: {modules:?}")]
    CircularDependency { modules: Vec<ModuleUrl> },

    /// An operation's JSON form is missing a field its kind requires.
    #[error("operation '{op}' is missing field '{field}'")]
    MissingField { op: String, field: &'static str },

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
