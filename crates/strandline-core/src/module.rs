//! Module records.
//!
//! A [`Module`] is a named table of functions plus an ordered list of refs to
//! other modules. Call targets of the form `<ref-index>:<function-id>` index
//! into `refs`; by convention ref 0 is the core module that provides the
//! built-ins.
//!
//! Functions are kept in an [`IndexMap`] so that layout, test runs and
//! renumbering all see them in insertion order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::block::OpList;
use crate::effect::StackEffect;
use crate::function::Function;
use crate::id::{FunctionId, HandleAllocator, ListId, ModuleUrl, OpId};
use crate::ops::{Operation, OpKind};

/// Current module source version written by this crate.
pub const SRC_VERSION: &str = "0.1";

/// A dependency of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
    pub url: ModuleUrl,
    /// Content hash of the referenced module as it was saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ModuleRef {
    pub fn new(url: ModuleUrl) -> Self {
        ModuleRef {
            url,
            hash: None,
            size: None,
        }
    }
}

/// Where a published module was forked from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkRecord {
    #[serde(rename = "ref")]
    pub saved: Option<ModuleRef>,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    #[serde(rename = "src_version", default = "default_src_version")]
    pub src_version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub refs: Vec<ModuleRef>,
    #[serde(default)]
    pub work_in_progress: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forked_from: Option<ForkRecord>,
    #[serde(default)]
    pub functions: IndexMap<FunctionId, Function>,
}

fn default_src_version() -> String {
    SRC_VERSION.to_string()
}

impl Module {
    /// A new work-in-progress module referencing only the core module.
    pub fn new(name: impl Into<String>, core: ModuleUrl) -> Self {
        Module {
            src_version: default_src_version(),
            name: name.into(),
            refs: vec![ModuleRef::new(core)],
            work_in_progress: true,
            forked_from: None,
            functions: IndexMap::new(),
        }
    }

    pub fn with_function(mut self, id: impl Into<String>, function: Function) -> Self {
        self.functions.insert(FunctionId::new(id), function);
        self
    }

    pub fn function(&self, id: &FunctionId) -> Option<&Function> {
        self.functions.get(id)
    }

    pub fn function_mut(&mut self, id: &FunctionId) -> Option<&mut Function> {
        self.functions.get_mut(id)
    }

    pub fn assign_handles(&mut self, alloc: &mut HandleAllocator) {
        for function in self.functions.values_mut() {
            function.block.assign_handles(alloc);
        }
    }

    pub fn find_list(&self, id: ListId) -> Option<&OpList> {
        self.functions
            .values()
            .find_map(|function| function.block.find_list(id))
    }

    pub fn find_list_mut(&mut self, id: ListId) -> Option<&mut OpList> {
        self.functions
            .values_mut()
            .find_map(|function| function.block.find_list_mut(id))
    }

    pub fn find_op(&self, id: OpId) -> Option<&Operation> {
        self.functions
            .values()
            .find_map(|function| function.block.find_op(id))
    }

    pub fn find_op_mut(&mut self, id: OpId) -> Option<&mut Operation> {
        self.functions
            .values_mut()
            .find_map(|function| function.block.find_op_mut(id))
    }

    pub fn list_containing_op(&self, id: OpId) -> Option<&OpList> {
        self.functions
            .values()
            .find_map(|function| function.block.list_containing(id))
    }

    pub fn list_containing_op_mut(&mut self, id: OpId) -> Option<&mut OpList> {
        self.functions
            .values_mut()
            .find_map(|function| function.block.list_containing_mut(id))
    }

    /// The function whose body holds the given operation.
    pub fn function_containing_op(&self, id: OpId) -> Option<&FunctionId> {
        self.functions
            .iter()
            .find(|(_, function)| function.block.find_op(id).is_some())
            .map(|(fid, _)| fid)
    }

    /// The function whose body holds the given list.
    pub fn function_containing_list(&self, id: ListId) -> Option<&FunctionId> {
        self.functions
            .iter()
            .find(|(_, function)| function.block.find_list(id).is_some())
            .map(|(fid, _)| fid)
    }

    /// The conditional operation (if any) with the given handle.
    pub fn conditional(&self, id: OpId) -> Option<&Operation> {
        self.find_op(id)
            .filter(|op| matches!(op.kind, OpKind::Cond { .. }))
    }

    /// Replaces every function id with its insertion index in lowercase hex.
    ///
    /// Returns the old -> new mapping. Call sites are not rewritten.
    pub fn renumber_function_ids(&mut self) -> Vec<(FunctionId, FunctionId)> {
        let old = std::mem::take(&mut self.functions);
        let mut mapping = Vec::with_capacity(old.len());
        for (idx, (old_id, function)) in old.into_iter().enumerate() {
            let new_id = FunctionId::new(format!("{idx:x}"));
            mapping.push((old_id, new_id.clone()));
            self.functions.insert(new_id, function);
        }
        mapping
    }

    /// Builds a module that extends `base`: it refs the core module and
    /// `base`, and holds one overriding stub per function of `base`. Each stub
    /// keeps the base function's name and declared effect, has a `[true]`
    /// guard and an empty body, and overrides `1:<function-id>`.
    pub fn extending(base: &Module, base_url: ModuleUrl, core: ModuleUrl) -> Module {
        let mut module = Module::new(base.name.clone(), core);
        module.refs.push(ModuleRef::new(base_url));
        for (fid, base_fn) in &base.functions {
            let mut stub = Function::new(base_fn.name.clone());
            stub.set_effect(base_fn.effect());
            stub.overrides = Some(format!("1:{fid}"));
            module.functions.insert(fid.clone(), stub);
        }
        module
    }

    /// Declared effect of every function, in insertion order.
    pub fn declared_effects(&self) -> Vec<(&FunctionId, StackEffect)> {
        self.functions
            .iter()
            .map(|(fid, function)| (fid, function.effect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::ops::CallTarget;
    use serde_json::json;

    fn core() -> ModuleUrl {
        ModuleUrl::new("mem://core")
    }

    #[test]
    fn parses_stored_module_shape() {
        let module: Module = serde_json::from_value(json!({
            "src_version": "0.1",
            "name": "demo",
            "refs": [{"url": "mem://core"}],
            "workInProgress": true,
            "functions": {
                "0": {"name": "five", "tags": [], "condition": [], "code": [{"op": "literal", "val": 5}],
                      "numConsumed": 0, "numProduced": 1}
            }
        }))
        .unwrap();

        assert_eq!(module.name, "demo");
        assert!(module.work_in_progress);
        assert_eq!(module.refs[0].url, core());
        assert_eq!(module.functions.len(), 1);
    }

    #[test]
    fn function_order_is_insertion_order() {
        let module = Module::new("m", core())
            .with_function("b", Function::new("second"))
            .with_function("a", Function::new("first"));
        let names: Vec<_> = module.functions.values().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn locates_the_function_owning_a_handle() {
        let mut module = Module::new("m", core())
            .with_function("f", Function::new("f").with_code(vec![Operation::literal(1)]))
            .with_function(
                "g",
                Function::new("g").with_code(vec![Operation::lambda(vec![Operation::load("x")])]),
            );
        module.assign_handles(&mut HandleAllocator::new());

        let g = &module.functions[&FunctionId::new("g")];
        let lambda_body = g.block.code.ops[0].nested_lists()[0];
        let inner = lambda_body.ops[0].id;

        assert_eq!(module.function_containing_op(inner), Some(&FunctionId::new("g")));
        assert_eq!(
            module.function_containing_list(lambda_body.id),
            Some(&FunctionId::new("g"))
        );
        assert!(module.function_containing_op(OpId(9999)).is_none());
    }

    #[test]
    fn renumbers_in_insertion_order() {
        let mut module = Module::new("m", core())
            .with_function("zz", Function::new("a"))
            .with_function("yy", Function::new("b"));
        let mapping = module.renumber_function_ids();
        assert_eq!(mapping[0], (FunctionId::new("zz"), FunctionId::new("0")));
        assert_eq!(mapping[1], (FunctionId::new("yy"), FunctionId::new("1")));
        assert_eq!(module.functions[&FunctionId::new("1")].name, "b");
    }

    #[test]
    fn extending_creates_overriding_stubs() {
        let mut base_fn = Function::new("area");
        base_fn.set_effect(StackEffect::new(2, 1));
        let base = Module::new("shapes", core()).with_function("3", base_fn);

        let ext = Module::extending(&base, ModuleUrl::new("mem://shapes"), core());
        assert_eq!(ext.refs.len(), 2);
        assert_eq!(ext.refs[1].url, ModuleUrl::new("mem://shapes"));
        let stub = &ext.functions[&FunctionId::new("3")];
        assert_eq!(stub.overrides.as_deref(), Some("1:3"));
        assert_eq!(stub.effect(), StackEffect::new(2, 1));
        assert!(stub.block.code.is_empty());
    }

    #[test]
    fn conditional_lookup_rejects_other_kinds() {
        let mut module = Module::new("m", core()).with_function(
            "f",
            Function::new("f").with_code(vec![
                Operation::call(CallTarget::local("x")),
                Operation::cond(vec![Block::guarded(vec![], vec![])]),
            ]),
        );
        module.assign_handles(&mut HandleAllocator::new());
        let code = &module.functions[&FunctionId::new("f")].block.code;
        assert!(module.conditional(code.ops[0].id).is_none());
        assert!(module.conditional(code.ops[1].id).is_some());
    }
}
