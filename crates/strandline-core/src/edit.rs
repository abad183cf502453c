//! Handle-addressed structural edits.
//!
//! Every edit names its target by handle ([`ListId`] / [`OpId`]), never by
//! position, so an edit stays valid however the surrounding code was
//! rearranged since the caller last looked. Operations created by an edit
//! get their handles from the store before insertion.

use crate::block::Block;
use crate::error::CoreError;
use crate::function::Function;
use crate::id::{FunctionId, ListId, ModuleUrl, OpId};
use crate::ops::{OpKind, Operation};
use crate::store::ModuleStore;

/// What advancing past the tail of a conditional did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowOutcome {
    /// A new empty branch was appended; `guard` is its guard list.
    Appended { guard: ListId },
    /// The trailing empty branch was removed; other branches remain.
    RemovedEmptyBranch,
    /// The trailing empty branch was the only one. The conditional itself is
    /// left in place, with no branches.
    NoBranchesLeft,
}

impl ModuleStore {
    /// Inserts `op` into list `list` of module `url`, before the operation
    /// `before` or at the end when `before` is `None`. Returns the new
    /// operation's handle.
    pub fn insert_operation(
        &mut self,
        url: &ModuleUrl,
        list: ListId,
        before: Option<OpId>,
        op: Operation,
    ) -> Result<OpId, CoreError> {
        let op = self.adopt(op);
        let id = op.id;
        let target = self
            .module_mut(url)?
            .find_list_mut(list)
            .ok_or(CoreError::ListNotFound { id: list })?;
        let index = match before {
            Some(before) => target
                .position(before)
                .ok_or(CoreError::OperationNotFound { id: before })?,
            None => target.len(),
        };
        target.ops.insert(index, op);
        tracing::debug!("inserted op {} at {} of list {} in {}", id, index, list, url);
        Ok(id)
    }

    /// Removes the operation `op` (and everything nested in it) from module
    /// `url`.
    pub fn remove_operation(&mut self, url: &ModuleUrl, op: OpId) -> Result<Operation, CoreError> {
        let list = self
            .module_mut(url)?
            .list_containing_op_mut(op)
            .ok_or(CoreError::OperationNotFound { id: op })?;
        let index = list.position(op).ok_or(CoreError::OperationNotFound { id: op })?;
        tracing::debug!("removed op {} at {} of list {} in {}", op, index, list.id, url);
        Ok(list.ops.remove(index))
    }

    /// Replaces the kind of an existing operation, keeping its handle.
    pub fn replace_operation(&mut self, url: &ModuleUrl, op: OpId, kind: OpKind) -> Result<(), CoreError> {
        let target = self
            .module_mut(url)?
            .find_op_mut(op)
            .ok_or(CoreError::OperationNotFound { id: op })?;
        target.kind = kind;
        self.assign_missing_handles(url)
    }

    /// Grows or shrinks the branch list of conditional `cond`.
    ///
    /// If the last branch has anything in its guard or body, a new empty
    /// branch is appended. Otherwise the empty last branch is removed.
    pub fn grow_conditional(&mut self, url: &ModuleUrl, cond: OpId) -> Result<GrowOutcome, CoreError> {
        let op = self
            .module_mut(url)?
            .find_op_mut(cond)
            .ok_or(CoreError::OperationNotFound { id: cond })?;
        let OpKind::Cond { branches } = &mut op.kind else {
            return Err(CoreError::NotAConditional { id: cond });
        };

        let last_is_empty = branches.last().is_some_and(Block::is_empty);
        if !last_is_empty {
            branches.push(Block::guarded(Vec::new(), Vec::new()));
            self.assign_missing_handles(url)?;
            let guard = self
                .module(url)?
                .conditional(cond)
                .and_then(|op| match &op.kind {
                    OpKind::Cond { branches } => branches.last(),
                    _ => None,
                })
                .and_then(|branch| branch.condition.as_ref())
                .map(|guard| guard.id)
                .ok_or(CoreError::NotAConditional { id: cond })?;
            tracing::debug!("appended empty branch to cond {} in {}", cond, url);
            return Ok(GrowOutcome::Appended { guard });
        }

        branches.pop();
        if branches.is_empty() {
            tracing::warn!("cond {} in {} has no branches left; deleting it is not implemented", cond, url);
            Ok(GrowOutcome::NoBranchesLeft)
        } else {
            tracing::debug!("removed trailing empty branch of cond {} in {}", cond, url);
            Ok(GrowOutcome::RemovedEmptyBranch)
        }
    }

    /// Adds a function to module `url` under a fresh id.
    pub fn add_function(&mut self, url: &ModuleUrl, function: Function) -> Result<FunctionId, CoreError> {
        let id = FunctionId::fresh();
        self.module_mut(url)?.functions.insert(id.clone(), function);
        self.assign_missing_handles(url)?;
        tracing::debug!("added function {} to {}", id, url);
        Ok(id)
    }

    /// Removes a function, keeping the order of the remaining ones.
    pub fn remove_function(&mut self, url: &ModuleUrl, id: &FunctionId) -> Result<Function, CoreError> {
        self.module_mut(url)?
            .functions
            .shift_remove(id)
            .ok_or_else(|| CoreError::FunctionNotFound {
                module: url.clone(),
                function: id.clone(),
            })
    }

    /// Moves function `old` to the id `new`, keeping its place in the
    /// module's function order. Call sites are not rewritten.
    pub fn rekey_function(&mut self, url: &ModuleUrl, old: &FunctionId, new: FunctionId) -> Result<(), CoreError> {
        let module = self.module_mut(url)?;
        if !module.functions.contains_key(old) {
            return Err(CoreError::FunctionNotFound {
                module: url.clone(),
                function: old.clone(),
            });
        }
        if new == *old {
            return Ok(());
        }
        if module.functions.contains_key(&new) {
            return Err(CoreError::DuplicateFunction {
                module: url.clone(),
                function: new,
            });
        }
        module.functions = std::mem::take(&mut module.functions)
            .into_iter()
            .map(|(id, function)| if id == *old { (new.clone(), function) } else { (id, function) })
            .collect();
        tracing::debug!("function {} in {} is now {}", old, url, new);
        Ok(())
    }

    /// Sets the native implementation of a function for `interpreter`, or
    /// removes it when `code` is `None`.
    pub fn set_native_code(
        &mut self,
        url: &ModuleUrl,
        function: &FunctionId,
        interpreter: &str,
        code: Option<serde_json::Value>,
    ) -> Result<(), CoreError> {
        let record = self
            .module_mut(url)?
            .function_mut(function)
            .ok_or_else(|| CoreError::FunctionNotFound {
                module: url.clone(),
                function: function.clone(),
            })?;
        match code {
            Some(code) => {
                record.native_code.insert(interpreter.to_string(), code);
            }
            None => {
                record.native_code.remove(interpreter);
            }
        }
        Ok(())
    }
}
