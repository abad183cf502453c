//! Execution traces and value provenance.
//!
//! Execution itself is external: an [`Executor`] runs functions and reports
//! each operation with the stack it saw to a [`Tracer`]. On top of that this
//! crate finds which operation produced a value ([`ProvenanceResolver`]),
//! runs assertion functions ([`run_assertions`]) and debounces those runs
//! ([`TestScheduler`]).

pub mod error;
pub mod provenance;
pub mod runner;
pub mod scheduler;
pub mod trace;
pub mod tracer;
pub mod value;

// Re-export commonly used types
pub use error::TraceError;
pub use provenance::{Origin, ProvenanceResolver};
pub use runner::{run_assertions, run_test, ModuleReport, TestOutcome, TestReport};
pub use scheduler::{ScheduleState, ScheduleToken, TestScheduler};
pub use trace::{Frame, TraceEntry};
pub use tracer::{Executor, FrameRecorder, ReplaySource, SavingTracer, TraceSource, Tracer};
pub use value::{find_in_stack, PathSegment, Value, ValuePath};
