//! The operation vocabulary of a stack program.
//!
//! Every operation has an implicit stack effect. Seven kinds are built in
//! ([`OpKind::Literal`] through [`OpKind::DynamicScope`]); everything else is a
//! [`OpKind::Call`] to a function, either local to the current module or
//! imported through one of its refs as `<ref-index>:<function-id>`.
//!
//! # JSON form
//!
//! Operations keep the compact on-disk shape `{"op": "<kind>", ...}`, where an
//! `op` string that is not one of the reserved kind names is a call target:
//!
//! ```json
//! {"op": "literal", "val": 5}
//! {"op": "save", "name": "x"}
//! {"op": "cond", "branches": [{"condition": [...], "code": [...]}]}
//! {"op": "0:add"}
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::block::{Block, OpList};
use crate::error::CoreError;
use crate::id::{FunctionId, HandleAllocator, OpId};

const LITERAL: &str = "literal";
const LAMBDA: &str = "lambda";
const CALL_LAMBDA: &str = "callLambda";
const SAVE: &str = "save";
const LOAD: &str = "load";
const COND: &str = "cond";
const DYNAMIC_SCOPE: &str = "dynamicScope";

/// Where a call operation points.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallTarget {
    /// A function of the calling module, or a built-in name.
    Local(FunctionId),
    /// A function of the module at `refs[ref_index]` of the calling module.
    Imported { ref_index: usize, function: FunctionId },
}

impl CallTarget {
    pub fn local(function: impl Into<String>) -> Self {
        CallTarget::Local(FunctionId::new(function))
    }

    pub fn imported(ref_index: usize, function: impl Into<String>) -> Self {
        CallTarget::Imported {
            ref_index,
            function: FunctionId::new(function),
        }
    }

    /// The function id, ignoring which module it lives in.
    pub fn function(&self) -> &FunctionId {
        match self {
            CallTarget::Local(function) => function,
            CallTarget::Imported { function, .. } => function,
        }
    }
}

impl FromStr for CallTarget {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if !s.is_empty() => Ok(CallTarget::local(s)),
            Some((index, function)) if !function.is_empty() => {
                let ref_index = index.parse::<usize>().map_err(|_| CoreError::MalformedTarget {
                    target: s.to_string(),
                })?;
                Ok(CallTarget::imported(ref_index, function))
            }
            _ => Err(CoreError::MalformedTarget {
                target: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallTarget::Local(function) => write!(f, "{function}"),
            CallTarget::Imported {
                ref_index,
                function,
            } => write!(f, "{ref_index}:{function}"),
        }
    }
}

/// The closed set of operation kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum OpKind {
    /// Pushes a constant. Effect (0, 1).
    Literal { value: serde_json::Value },
    /// Pushes a closure over `body`. Effect (0, 1).
    Lambda { body: OpList },
    /// Pops a closure plus `num_consumed` arguments and pushes
    /// `num_produced` results. Effect (N + 1, M).
    CallLambda { num_consumed: u32, num_produced: u32 },
    /// Pops a value into a named variable. Effect (1, 0).
    Save { name: String },
    /// Pushes a named variable. Effect (0, 1).
    Load { name: String },
    /// Runs the first branch whose guard holds.
    Cond { branches: Vec<Block> },
    /// Runs `body` with a dynamically scoped binding named `name`.
    DynamicScope { name: String, body: OpList },
    /// Calls a function.
    Call { target: CallTarget },
}

/// One instruction of an operation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOperation", into = "RawOperation")]
pub struct Operation {
    /// Stable handle; [`OpId::UNASSIGNED`] until the module enters a store.
    pub id: OpId,
    pub kind: OpKind,
}

impl Operation {
    pub fn new(kind: OpKind) -> Self {
        Operation {
            id: OpId::UNASSIGNED,
            kind,
        }
    }

    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Self::new(OpKind::Literal {
            value: value.into(),
        })
    }

    pub fn call(target: CallTarget) -> Self {
        Self::new(OpKind::Call { target })
    }

    pub fn save(name: impl Into<String>) -> Self {
        Self::new(OpKind::Save { name: name.into() })
    }

    pub fn load(name: impl Into<String>) -> Self {
        Self::new(OpKind::Load { name: name.into() })
    }

    pub fn lambda(body: Vec<Operation>) -> Self {
        Self::new(OpKind::Lambda {
            body: OpList::new(body),
        })
    }

    pub fn call_lambda(num_consumed: u32, num_produced: u32) -> Self {
        Self::new(OpKind::CallLambda {
            num_consumed,
            num_produced,
        })
    }

    pub fn cond(branches: Vec<Block>) -> Self {
        Self::new(OpKind::Cond { branches })
    }

    pub fn dynamic_scope(name: impl Into<String>, body: Vec<Operation>) -> Self {
        Self::new(OpKind::DynamicScope {
            name: name.into(),
            body: OpList::new(body),
        })
    }

    /// The `op` string used on disk.
    pub fn op_name(&self) -> String {
        match &self.kind {
            OpKind::Literal { .. } => LITERAL.to_string(),
            OpKind::Lambda { .. } => LAMBDA.to_string(),
            OpKind::CallLambda { .. } => CALL_LAMBDA.to_string(),
            OpKind::Save { .. } => SAVE.to_string(),
            OpKind::Load { .. } => LOAD.to_string(),
            OpKind::Cond { .. } => COND.to_string(),
            OpKind::DynamicScope { .. } => DYNAMIC_SCOPE.to_string(),
            OpKind::Call { target } => target.to_string(),
        }
    }

    /// Operation lists nested directly inside this operation, in layout order.
    pub fn nested_lists(&self) -> Vec<&OpList> {
        match &self.kind {
            OpKind::Lambda { body } | OpKind::DynamicScope { body, .. } => vec![body],
            OpKind::Cond { branches } => branches.iter().flat_map(Block::lists).collect(),
            _ => Vec::new(),
        }
    }

    pub fn nested_lists_mut(&mut self) -> Vec<&mut OpList> {
        match &mut self.kind {
            OpKind::Lambda { body } | OpKind::DynamicScope { body, .. } => vec![body],
            OpKind::Cond { branches } => branches.iter_mut().flat_map(Block::lists_mut).collect(),
            _ => Vec::new(),
        }
    }

    /// Gives this operation and everything nested in it handles, keeping any
    /// handle that is already assigned.
    pub fn assign_handles(&mut self, alloc: &mut HandleAllocator) {
        if !self.id.is_assigned() {
            self.id = alloc.op();
        }
        for list in self.nested_lists_mut() {
            list.assign_handles(alloc);
        }
    }
}

// ---------------------------------------------------------------------------
// JSON form
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOperation {
    op: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    val: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<OpList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branches: Option<Vec<Block>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    num_consumed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    num_produced: Option<u32>,
}

/// Distinguishes `"val": null` (a null literal) from a missing `val`.
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl RawOperation {
    fn bare(op: &str) -> Self {
        RawOperation {
            op: op.to_string(),
            val: None,
            name: None,
            code: None,
            branches: None,
            num_consumed: None,
            num_produced: None,
        }
    }

    fn take_name(&mut self) -> Result<String, CoreError> {
        self.name.take().ok_or_else(|| CoreError::MissingField {
            op: self.op.clone(),
            field: "name",
        })
    }
}

impl TryFrom<RawOperation> for Operation {
    type Error = CoreError;

    fn try_from(mut raw: RawOperation) -> Result<Self, Self::Error> {
        let op = raw.op.clone();
        let kind = match op.as_str() {
            LITERAL => OpKind::Literal {
                value: raw.val.take().ok_or_else(|| CoreError::MissingField {
                    op: op.clone(),
                    field: "val",
                })?,
            },
            LAMBDA => OpKind::Lambda {
                body: raw.code.take().unwrap_or_default(),
            },
            CALL_LAMBDA => OpKind::CallLambda {
                num_consumed: raw.num_consumed.unwrap_or(0),
                num_produced: raw.num_produced.unwrap_or(0),
            },
            SAVE => OpKind::Save {
                name: raw.take_name()?,
            },
            LOAD => OpKind::Load {
                name: raw.take_name()?,
            },
            COND => OpKind::Cond {
                branches: raw.branches.take().unwrap_or_default(),
            },
            DYNAMIC_SCOPE => OpKind::DynamicScope {
                name: raw.take_name()?,
                body: raw.code.take().unwrap_or_default(),
            },
            other => OpKind::Call {
                target: other.parse()?,
            },
        };
        Ok(Operation::new(kind))
    }
}

impl From<Operation> for RawOperation {
    fn from(op: Operation) -> Self {
        let mut raw = RawOperation::bare(&op.op_name());
        match op.kind {
            OpKind::Literal { value } => raw.val = Some(value),
            OpKind::Lambda { body } => raw.code = Some(body),
            OpKind::CallLambda {
                num_consumed,
                num_produced,
            } => {
                raw.num_consumed = Some(num_consumed);
                raw.num_produced = Some(num_produced);
            }
            OpKind::Save { name } | OpKind::Load { name } => raw.name = Some(name),
            OpKind::Cond { branches } => raw.branches = Some(branches),
            OpKind::DynamicScope { name, body } => {
                raw.name = Some(name);
                raw.code = Some(body);
            }
            OpKind::Call { .. } => {}
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_local_and_imported_targets() {
        assert_eq!("add".parse::<CallTarget>().unwrap(), CallTarget::local("add"));
        assert_eq!(
            "1:3f".parse::<CallTarget>().unwrap(),
            CallTarget::imported(1, "3f")
        );
        assert!("x:3f".parse::<CallTarget>().is_err());
        assert!("".parse::<CallTarget>().is_err());
        assert!("2:".parse::<CallTarget>().is_err());
    }

    #[test]
    fn call_target_display_round_trips() {
        let target = CallTarget::imported(0, "add");
        assert_eq!(target.to_string(), "0:add");
        assert_eq!(target.to_string().parse::<CallTarget>().unwrap(), target);
    }

    #[test]
    fn reserved_names_become_kinds_and_the_rest_calls() {
        let ops: Vec<Operation> = serde_json::from_value(json!([
            {"op": "literal", "val": 5},
            {"op": "literal", "val": null},
            {"op": "save", "name": "x"},
            {"op": "load", "name": "x"},
            {"op": "callLambda", "numConsumed": 2, "numProduced": 1},
            {"op": "0:add"},
        ]))
        .unwrap();

        assert_eq!(ops[0].kind, OpKind::Literal { value: json!(5) });
        assert_eq!(ops[1].kind, OpKind::Literal { value: json!(null) });
        assert_eq!(ops[2].kind, OpKind::Save { name: "x".into() });
        assert_eq!(ops[3].kind, OpKind::Load { name: "x".into() });
        assert_eq!(
            ops[4].kind,
            OpKind::CallLambda {
                num_consumed: 2,
                num_produced: 1
            }
        );
        assert_eq!(
            ops[5].kind,
            OpKind::Call {
                target: CallTarget::imported(0, "add")
            }
        );
        assert!(ops.iter().all(|op| !op.id.is_assigned()));
    }

    #[test]
    fn literal_without_val_is_rejected() {
        let result: Result<Operation, _> = serde_json::from_value(json!({"op": "literal"}));
        assert!(result.is_err());
    }

    #[test]
    fn nested_cond_keeps_its_shape_through_json() {
        let source = json!({
            "op": "cond",
            "branches": [
                {"condition": [{"op": "load", "name": "x"}], "code": [{"op": "literal", "val": 1}]},
                {"condition": [], "code": []}
            ]
        });
        let op: Operation = serde_json::from_value(source.clone()).unwrap();
        assert_eq!(op.nested_lists().len(), 4);
        assert_eq!(serde_json::to_value(&op).unwrap(), source);
    }

    #[test]
    fn assign_handles_reaches_nested_lists() {
        let mut op = Operation::lambda(vec![Operation::literal(1), Operation::lambda(vec![])]);
        let mut alloc = HandleAllocator::new();
        op.assign_handles(&mut alloc);
        assert!(op.id.is_assigned());
        let body = op.nested_lists()[0];
        assert!(body.id.is_assigned());
        assert!(body.ops.iter().all(|inner| inner.id.is_assigned()));
        assert!(body.ops[1].nested_lists()[0].id.is_assigned());
    }
}
