//! The in-memory module store.
//!
//! [`ModuleStore`] maps module URLs to [`Module`] records and owns the
//! [`HandleAllocator`]: every module that enters the store, and every
//! operation created by an edit, gets its handles from here, so handles are
//! unique across all loaded modules.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::function::Function;
use crate::id::{FunctionId, HandleAllocator, ModuleUrl};
use crate::module::Module;
use crate::ops::{CallTarget, Operation};

/// A call target pinned to a concrete module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ResolvedCall {
    pub module: ModuleUrl,
    pub function: FunctionId,
}

#[derive(Debug, Default)]
pub struct ModuleStore {
    modules: HashMap<ModuleUrl, Module>,
    handles: HandleAllocator,
}

impl ModuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a module, assigning handles to anything that lacks
    /// one.
    pub fn insert(&mut self, url: ModuleUrl, mut module: Module) {
        module.assign_handles(&mut self.handles);
        self.modules.insert(url, module);
    }

    pub fn remove(&mut self, url: &ModuleUrl) -> Option<Module> {
        self.modules.remove(url)
    }

    pub fn contains(&self, url: &ModuleUrl) -> bool {
        self.modules.contains_key(url)
    }

    pub fn module(&self, url: &ModuleUrl) -> Result<&Module, CoreError> {
        self.modules
            .get(url)
            .ok_or_else(|| CoreError::ModuleNotFound { url: url.clone() })
    }

    pub fn module_mut(&mut self, url: &ModuleUrl) -> Result<&mut Module, CoreError> {
        self.modules
            .get_mut(url)
            .ok_or_else(|| CoreError::ModuleNotFound { url: url.clone() })
    }

    pub fn function(&self, module: &ModuleUrl, function: &FunctionId) -> Result<&Function, CoreError> {
        self.module(module)?
            .function(function)
            .ok_or_else(|| CoreError::FunctionNotFound {
                module: module.clone(),
                function: function.clone(),
            })
    }

    pub fn urls(&self) -> impl Iterator<Item = &ModuleUrl> {
        self.modules.keys()
    }

    /// Gives a freshly built operation (and anything nested in it) handles
    /// before it is inserted into a module.
    pub fn adopt(&mut self, mut op: Operation) -> Operation {
        op.assign_handles(&mut self.handles);
        op
    }

    /// Re-runs handle assignment on a module after structural edits that
    /// created lists (for example a new conditional branch).
    pub fn assign_missing_handles(&mut self, url: &ModuleUrl) -> Result<(), CoreError> {
        let module = self
            .modules
            .get_mut(url)
            .ok_or_else(|| CoreError::ModuleNotFound { url: url.clone() })?;
        module.assign_handles(&mut self.handles);
        Ok(())
    }

    /// Pins a call target written inside module `from` to a concrete module.
    ///
    /// Local targets stay in `from`; imported targets follow
    /// `from.refs[ref_index]`. The target function is not required to exist
    /// (built-in names resolve elsewhere); use [`ModuleStore::function`] to
    /// look it up.
    pub fn resolve_call(&self, from: &ModuleUrl, target: &CallTarget) -> Result<ResolvedCall, CoreError> {
        match target {
            CallTarget::Local(function) => Ok(ResolvedCall {
                module: from.clone(),
                function: function.clone(),
            }),
            CallTarget::Imported {
                ref_index,
                function,
            } => {
                let module = self.module(from)?;
                let module_ref = module.refs.get(*ref_index).ok_or_else(|| CoreError::UnknownRef {
                    module: from.clone(),
                    index: *ref_index,
                })?;
                Ok(ResolvedCall {
                    module: module_ref.url.clone(),
                    function: function.clone(),
                })
            }
        }
    }

    /// Resolves a call target and looks up the function record it names.
    pub fn resolve_function(
        &self,
        from: &ModuleUrl,
        target: &CallTarget,
    ) -> Result<(ResolvedCall, &Function), CoreError> {
        let resolved = self.resolve_call(from, target)?;
        let function = self.function(&resolved.module, &resolved.function)?;
        Ok((resolved, function))
    }
}
