//! Finding the operation that produced a runtime value.
//!
//! The search works on a call stack of [`Frame`]s, innermost last. Within a
//! frame it scans the frame's trace for the first entry whose input stack
//! already holds the value:
//!
//! - found at entry 0: the value predates the frame. The search pops to the
//!   caller and rescans it, but only over the entries strictly before the
//!   call site of the popped frame. At the outermost frame the answer is
//!   [`Origin::StartOfExecution`].
//! - found at entry `i > 0`: entry `i - 1` produced it.
//! - not found: the frame's last operation produced it.
//!
//! When the producer is a call into a function that is not native for the
//! configured interpreter, the search descends into a new frame for the
//! callee, seeded with the stack recorded at the call site. Calls into
//! native functions, and into functions the store does not hold, are
//! reported as the origin.
//!
//! Every pop shrinks the scan window of the frame it returns to, and every
//! descent enters a call that finished during the traced execution, so the
//! search terminates.

use serde::Serialize;
use strandline_core::{FunctionId, ModuleStore, ModuleUrl, OpId, ResolvedCall};

use crate::error::TraceError;
use crate::trace::{Frame, TraceEntry};
use crate::tracer::TraceSource;
use crate::value::{find_in_stack, Value};

/// Where a value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Origin {
    Operation {
        module: ModuleUrl,
        function: FunctionId,
        op: OpId,
    },
    /// The value was already on the stack when execution began.
    StartOfExecution,
}

pub struct ProvenanceResolver<'a> {
    store: &'a ModuleStore,
    source: &'a dyn TraceSource,
    interpreter: String,
}

impl<'a> ProvenanceResolver<'a> {
    /// `interpreter` is the interpreter id whose native code marks a
    /// function as primitive.
    pub fn new(store: &'a ModuleStore, source: &'a dyn TraceSource, interpreter: impl Into<String>) -> Self {
        ProvenanceResolver {
            store,
            source,
            interpreter: interpreter.into(),
        }
    }

    /// Finds the origin of `value`, starting in the innermost frame of
    /// `call_stack`. On return the call stack ends at the frame holding the
    /// origin (the outermost frame for [`Origin::StartOfExecution`]).
    pub fn find_origin(&self, value: &Value, call_stack: &mut Vec<Frame>) -> Result<Origin, TraceError> {
        let mut window: Option<usize> = None;
        loop {
            let frame = call_stack.last().ok_or(TraceError::EmptyCallStack)?;
            let mut entries = self.source.frame_trace(frame)?;
            if let Some(end) = window.take() {
                entries.truncate(end);
            }

            let hit = entries
                .iter()
                .position(|entry| find_in_stack(&entry.inputs, value).is_some());
            let producer = match hit {
                Some(0) => None,
                Some(idx) => Some(idx - 1),
                None => entries.len().checked_sub(1),
            };

            let Some(producer) = producer else {
                // The value predates this frame.
                if call_stack.len() == 1 {
                    tracing::debug!("value predates {}; start of execution", frame.function);
                    return Ok(Origin::StartOfExecution);
                }
                let popped = call_stack.pop().ok_or(TraceError::EmptyCallStack)?;
                tracing::debug!("value predates {}; back to caller", popped.function);
                window = Some(popped.call_site.unwrap_or(0));
                continue;
            };

            let entry = &entries[producer];
            match &entry.call {
                Some(call) if self.is_user_function(call) => {
                    tracing::debug!(
                        "descending into {} in {} at entry {}",
                        call.function,
                        call.module,
                        producer
                    );
                    let callee = Frame::callee(call, entry.inputs.clone(), producer);
                    call_stack.push(callee);
                }
                _ => {
                    return Ok(Origin::Operation {
                        module: frame.module.clone(),
                        function: frame.function.clone(),
                        op: entry.op,
                    })
                }
            }
        }
    }

    /// The stack recorded just before the first execution of `op` in
    /// `frame`.
    pub fn stack_at(&self, frame: &Frame, op: OpId) -> Result<Option<Vec<Value>>, TraceError> {
        Ok(self
            .source
            .frame_trace(frame)?
            .into_iter()
            .find(|entry| entry.op == op)
            .map(|entry: TraceEntry| entry.inputs))
    }

    fn is_user_function(&self, call: &ResolvedCall) -> bool {
        match self.store.function(&call.module, &call.function) {
            Ok(function) => !function.is_native_for(&self.interpreter),
            Err(_) => false,
        }
    }
}
