//! Trace records and call frames.

use serde::{Deserialize, Serialize};
use strandline_core::{FunctionId, ModuleUrl, OpId, ResolvedCall};

use crate::value::Value;

/// One executed operation and the stack just before it ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub op: OpId,
    /// For calls, the function the call resolved to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<ResolvedCall>,
    /// Stack snapshot, bottom first.
    pub inputs: Vec<Value>,
}

impl TraceEntry {
    pub fn new(op: OpId, inputs: Vec<Value>) -> Self {
        TraceEntry { op, call: None, inputs }
    }

    pub fn call(op: OpId, call: ResolvedCall, inputs: Vec<Value>) -> Self {
        TraceEntry {
            op,
            call: Some(call),
            inputs,
        }
    }
}

/// A function invocation that can be replayed: which function, and the
/// stack it started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub module: ModuleUrl,
    pub function: FunctionId,
    pub stack: Vec<Value>,
    /// Index of the entry in the caller's trace that called this frame.
    /// `None` for the outermost frame.
    pub call_site: Option<usize>,
}

impl Frame {
    /// An outermost frame starting from an empty stack.
    pub fn root(module: ModuleUrl, function: FunctionId) -> Self {
        Frame {
            module,
            function,
            stack: Vec::new(),
            call_site: None,
        }
    }

    /// The frame entered by the call recorded at `call_site`.
    pub fn callee(call: &ResolvedCall, inputs: Vec<Value>, call_site: usize) -> Self {
        Frame {
            module: call.module.clone(),
            function: call.function.clone(),
            stack: inputs,
            call_site: Some(call_site),
        }
    }
}
