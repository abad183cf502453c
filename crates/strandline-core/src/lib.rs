//! Program data model: modules, functions, blocks and operations, plus the
//! store that resolves calls between modules and hands out stable handles.

pub mod block;
pub mod edit;
pub mod effect;
pub mod error;
pub mod function;
pub mod id;
pub mod module;
pub mod ops;
pub mod save;
pub mod store;

// Re-export commonly used types
pub use block::{Block, OpList};
pub use edit::GrowOutcome;
pub use effect::StackEffect;
pub use error::CoreError;
pub use function::Function;
pub use id::{FunctionId, HandleAllocator, ListId, ModuleUrl, OpId};
pub use module::{Module, ModuleRef};
pub use ops::{CallTarget, OpKind, Operation};
pub use store::{ModuleStore, ResolvedCall};
