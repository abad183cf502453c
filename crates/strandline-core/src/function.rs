//! Function records.
//!
//! A [`Function`] is a named, tagged [`Block`] with a cached declared stack
//! effect. The cache is what call sites see: resolving a call never looks at
//! the callee's body, only at `num_consumed` / `num_produced`.
//!
//! Functions whose `native_code` has an entry for an interpreter are
//! primitives for that interpreter; provenance search stops at calls into
//! them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::effect::StackEffect;
use crate::ops::Operation;

/// Tag marking a function as an assertion run by the test runner.
pub const ASSERT_TAG: &str = "assert";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub block: Block,
    #[serde(default)]
    pub num_consumed: u32,
    #[serde(default)]
    pub num_produced: u32,
    /// Interpreter id -> native implementation, opaque to this crate.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub native_code: BTreeMap<String, serde_json::Value>,
    /// `<ref-index>:<function-id>` of the function this one overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<String>,
}

impl Function {
    /// A function with a `[true]` guard, an empty body and no inputs or
    /// outputs, which is what a freshly created function looks like.
    pub fn new(name: impl Into<String>) -> Self {
        Function {
            name: name.into(),
            tags: Vec::new(),
            block: Block::guarded(vec![Operation::literal(true)], Vec::new()),
            num_consumed: 0,
            num_produced: 0,
            native_code: BTreeMap::new(),
            overrides: None,
        }
    }

    /// A declaration-only function: a `[false]` guard and a declared effect.
    pub fn interface(name: impl Into<String>, effect: StackEffect) -> Self {
        let mut function = Function::new(name);
        function.block = Block::guarded(vec![Operation::literal(false)], Vec::new());
        function.set_effect(effect);
        function
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_code(mut self, code: Vec<Operation>) -> Self {
        self.block.code.ops = code;
        self
    }

    pub fn with_native(mut self, interpreter: impl Into<String>, code: serde_json::Value) -> Self {
        self.native_code.insert(interpreter.into(), code);
        self
    }

    /// The cached declared effect.
    pub fn effect(&self) -> StackEffect {
        StackEffect::new(self.num_consumed, self.num_produced)
    }

    pub fn set_effect(&mut self, effect: StackEffect) {
        self.num_consumed = effect.consumed;
        self.num_produced = effect.produced;
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// An assertion the runner can execute: tagged `assert`, takes no inputs.
    pub fn is_runnable_assertion(&self) -> bool {
        self.has_tag(ASSERT_TAG) && self.num_consumed == 0
    }

    pub fn is_native_for(&self, interpreter: &str) -> bool {
        self.native_code.contains_key(interpreter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_stored_function_shape() {
        let f: Function = serde_json::from_value(json!({
            "name": "double",
            "tags": ["math"],
            "condition": [{"op": "literal", "val": true}],
            "code": [{"op": "literal", "val": 2}, {"op": "0:mul"}],
            "numConsumed": 1,
            "numProduced": 1
        }))
        .unwrap();

        assert_eq!(f.name, "double");
        assert!(f.has_tag("math"));
        assert_eq!(f.effect(), StackEffect::new(1, 1));
        assert_eq!(f.block.code.len(), 2);
        assert_eq!(f.block.condition.as_ref().unwrap().len(), 1);
        assert!(f.native_code.is_empty());
    }

    #[test]
    fn native_code_is_per_interpreter() {
        let f = Function::interface("add", StackEffect::new(2, 1))
            .with_native("rust", json!({"builtin": "add"}));
        assert!(f.is_native_for("rust"));
        assert!(!f.is_native_for("js"));
    }

    #[test]
    fn runnable_assertions_need_the_tag_and_no_inputs() {
        let plain = Function::new("t");
        assert!(!plain.is_runnable_assertion());

        let test = Function::new("t").with_tags(["assert"]);
        assert!(test.is_runnable_assertion());

        let mut needs_input = Function::new("t").with_tags(["assert"]);
        needs_input.set_effect(StackEffect::new(1, 1));
        assert!(!needs_input.is_runnable_assertion());
    }

    #[test]
    fn serde_roundtrip_keeps_overrides() {
        let mut f = Function::new("extended");
        f.overrides = Some("1:4a".into());
        let json = serde_json::to_string(&f).unwrap();
        let back: Function = serde_json::from_str(&json).unwrap();
        assert_eq!(back.overrides.as_deref(), Some("1:4a"));
        assert_eq!(back.block, f.block);
    }
}
