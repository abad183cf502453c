//! The execution seam: executors run functions, tracers watch them.
//!
//! - [`Executor`]: runs a function from a given stack, reporting every
//!   operation it executes to a [`Tracer`]. Execution semantics live entirely
//!   on the other side of this trait.
//! - [`TraceSource`]: produces the trace of one [`Frame`] on demand.
//!   [`ReplaySource`] does it by re-running the frame through an executor.
//! - [`FrameRecorder`] keeps only the replayed frame's own operations;
//!   [`SavingTracer`] keeps everything, nested calls included.

use serde::Serialize;
use strandline_core::{FunctionId, ModuleUrl};

use crate::error::TraceError;
use crate::trace::{Frame, TraceEntry};
use crate::value::Value;

/// Receives executed operations.
pub trait Tracer {
    /// Called before each operation runs. `depth` is the call depth relative
    /// to the function the executor was asked to run (0 for its own body,
    /// lambdas it calls included).
    fn record(&mut self, depth: usize, entry: TraceEntry);
}

/// Runs functions.
pub trait Executor {
    /// Runs `function` of `module` on `stack` and returns the final stack.
    fn execute(
        &self,
        module: &ModuleUrl,
        function: &FunctionId,
        stack: Vec<Value>,
        tracer: &mut dyn Tracer,
    ) -> Result<Vec<Value>, TraceError>;
}

/// Produces the trace of a frame.
pub trait TraceSource {
    fn frame_trace(&self, frame: &Frame) -> Result<Vec<TraceEntry>, TraceError>;
}

/// Records the operations of the outermost function only.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    entries: Vec<TraceEntry>,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_entries(self) -> Vec<TraceEntry> {
        self.entries
    }
}

impl Tracer for FrameRecorder {
    fn record(&mut self, depth: usize, entry: TraceEntry) {
        if depth == 0 {
            self.entries.push(entry);
        }
    }
}

/// Records every operation with its call depth.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SavingTracer {
    entries: Vec<(usize, TraceEntry)>,
}

impl SavingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[(usize, TraceEntry)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The outermost function's own operations.
    pub fn frame_entries(&self) -> Vec<TraceEntry> {
        self.entries
            .iter()
            .filter(|(depth, _)| *depth == 0)
            .map(|(_, entry)| entry.clone())
            .collect()
    }
}

impl Tracer for SavingTracer {
    fn record(&mut self, depth: usize, entry: TraceEntry) {
        self.entries.push((depth, entry));
    }
}

/// Traces frames by replaying them.
pub struct ReplaySource<E> {
    executor: E,
}

impl<E: Executor> ReplaySource<E> {
    pub fn new(executor: E) -> Self {
        ReplaySource { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

impl<E: Executor> TraceSource for ReplaySource<E> {
    fn frame_trace(&self, frame: &Frame) -> Result<Vec<TraceEntry>, TraceError> {
        let mut recorder = FrameRecorder::new();
        self.executor
            .execute(&frame.module, &frame.function, frame.stack.clone(), &mut recorder)?;
        let entries = recorder.into_entries();
        tracing::debug!(
            "replayed {} in {}: {} entries",
            frame.function,
            frame.module,
            entries.len()
        );
        Ok(entries)
    }
}
