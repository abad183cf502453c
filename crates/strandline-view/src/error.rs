//! Error types for strand building, layout and editing.

use strandline_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    /// A lookup in the program data model failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A call target names neither a store function nor a built-in.
    #[error("cannot resolve call target '{target}'")]
    UnresolvedCall { target: String },

    /// A strand item with non-zero nesting depth reached a merge.
    #[error("strand item depth {depth} is not supported")]
    UnsupportedDepth { depth: u32 },

    /// The operation needs a selected anchor and there is none.
    #[error("no anchor is selected")]
    NoSelection,

    /// The selected anchor is not inside an operation list.
    #[error("the selected anchor is not an insertion point")]
    NotAnInsertionPoint,

    /// The selected anchor is not a function header.
    #[error("the selected anchor is not a function header")]
    NotAFunction,

    /// A layout configuration could not be parsed.
    #[error("invalid layout configuration: {0}")]
    Config(#[from] serde_json::Error),
}
