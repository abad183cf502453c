//! Operation lists and blocks.
//!
//! An [`OpList`] is an ordered run of operations with its own [`ListId`]
//! handle; the handle is what a trailing "append here" anchor points at. A
//! [`Block`] pairs a code list with an optional guard list and is the shape
//! of both function bodies and conditional branches.

use serde::{Deserialize, Serialize};

use crate::id::{HandleAllocator, ListId, OpId};
use crate::ops::{OpKind, Operation};

/// An ordered operation sequence. Serialized as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpList {
    #[serde(skip)]
    pub id: ListId,
    pub ops: Vec<Operation>,
}

impl OpList {
    pub fn new(ops: Vec<Operation>) -> Self {
        OpList {
            id: ListId::UNASSIGNED,
            ops,
        }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn assign_handles(&mut self, alloc: &mut HandleAllocator) {
        if !self.id.is_assigned() {
            self.id = alloc.list();
        }
        for op in &mut self.ops {
            op.assign_handles(alloc);
        }
    }

    /// Position of `op` in this list (not searching nested lists).
    pub fn position(&self, op: OpId) -> Option<usize> {
        self.ops.iter().position(|candidate| candidate.id == op)
    }

    /// Finds a list by handle: this one or any list nested below it.
    pub fn find_list(&self, id: ListId) -> Option<&OpList> {
        if self.id == id {
            return Some(self);
        }
        self.ops
            .iter()
            .flat_map(Operation::nested_lists)
            .find_map(|nested| nested.find_list(id))
    }

    pub fn find_list_mut(&mut self, id: ListId) -> Option<&mut OpList> {
        if self.id == id {
            return Some(self);
        }
        for op in &mut self.ops {
            for nested in op.nested_lists_mut() {
                if let Some(found) = nested.find_list_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Finds an operation by handle anywhere at or below this list.
    pub fn find_op(&self, id: OpId) -> Option<&Operation> {
        for op in &self.ops {
            if op.id == id {
                return Some(op);
            }
            if let Some(found) = op.nested_lists().into_iter().find_map(|l| l.find_op(id)) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_op_mut(&mut self, id: OpId) -> Option<&mut Operation> {
        for op in &mut self.ops {
            if op.id == id {
                return Some(op);
            }
            for nested in op.nested_lists_mut() {
                if let Some(found) = nested.find_op_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// The list (this one or a nested one) that directly holds `op`.
    pub fn list_containing(&self, op: OpId) -> Option<&OpList> {
        if self.position(op).is_some() {
            return Some(self);
        }
        self.ops
            .iter()
            .flat_map(Operation::nested_lists)
            .find_map(|nested| nested.list_containing(op))
    }

    pub fn list_containing_mut(&mut self, op: OpId) -> Option<&mut OpList> {
        if self.position(op).is_some() {
            return Some(self);
        }
        self.ops
            .iter_mut()
            .flat_map(Operation::nested_lists_mut)
            .find_map(|nested| nested.list_containing_mut(op))
    }

    /// Visits every operation at or below this list, depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Operation)) {
        for op in &self.ops {
            visit(op);
            for nested in op.nested_lists() {
                nested.walk(visit);
            }
        }
    }

    /// Call targets used at or below this list, in order of appearance.
    pub fn call_targets(&self) -> Vec<&crate::ops::CallTarget> {
        let mut targets = Vec::new();
        self.walk(&mut |op| {
            if let OpKind::Call { target } = &op.kind {
                targets.push(target);
            }
        });
        targets
    }
}

/// A code list plus an optional guard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<OpList>,
    #[serde(default)]
    pub code: OpList,
}

impl Block {
    pub fn new(code: Vec<Operation>) -> Self {
        Block {
            condition: None,
            code: OpList::new(code),
        }
    }

    pub fn guarded(condition: Vec<Operation>, code: Vec<Operation>) -> Self {
        Block {
            condition: Some(OpList::new(condition)),
            code: OpList::new(code),
        }
    }

    /// A branch with nothing in either its guard or its body.
    pub fn is_empty(&self) -> bool {
        self.condition.as_ref().map_or(0, OpList::len) + self.code.len() == 0
    }

    /// The guard (if any) followed by the code list.
    pub fn lists(&self) -> Vec<&OpList> {
        self.condition.iter().chain(std::iter::once(&self.code)).collect()
    }

    pub fn lists_mut(&mut self) -> Vec<&mut OpList> {
        self.condition
            .iter_mut()
            .chain(std::iter::once(&mut self.code))
            .collect()
    }

    pub fn assign_handles(&mut self, alloc: &mut HandleAllocator) {
        for list in self.lists_mut() {
            list.assign_handles(alloc);
        }
    }

    pub fn find_list(&self, id: ListId) -> Option<&OpList> {
        self.lists().into_iter().find_map(|list| list.find_list(id))
    }

    pub fn find_list_mut(&mut self, id: ListId) -> Option<&mut OpList> {
        self.lists_mut().into_iter().find_map(|list| list.find_list_mut(id))
    }

    pub fn find_op(&self, id: OpId) -> Option<&Operation> {
        self.lists().into_iter().find_map(|list| list.find_op(id))
    }

    pub fn find_op_mut(&mut self, id: OpId) -> Option<&mut Operation> {
        self.lists_mut().into_iter().find_map(|list| list.find_op_mut(id))
    }

    pub fn list_containing(&self, op: OpId) -> Option<&OpList> {
        self.lists().into_iter().find_map(|list| list.list_containing(op))
    }

    pub fn list_containing_mut(&mut self, op: OpId) -> Option<&mut OpList> {
        self.lists_mut()
            .into_iter()
            .find_map(|list| list.list_containing_mut(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::CallTarget;

    fn assigned(mut block: Block) -> Block {
        block.assign_handles(&mut HandleAllocator::new());
        block
    }

    #[test]
    fn serializes_as_bare_array() {
        let list = OpList::new(vec![Operation::literal(1)]);
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, r#"[{"op":"literal","val":1}]"#);
    }

    #[test]
    fn empty_branch_detection_counts_guard_and_code() {
        assert!(Block::guarded(vec![], vec![]).is_empty());
        assert!(Block::new(vec![]).is_empty());
        assert!(!Block::guarded(vec![Operation::literal(true)], vec![]).is_empty());
    }

    #[test]
    fn finds_lists_and_ops_inside_lambdas_and_conds() {
        let block = assigned(Block::guarded(
            vec![Operation::literal(true)],
            vec![
                Operation::lambda(vec![Operation::load("x")]),
                Operation::cond(vec![Block::guarded(
                    vec![Operation::load("y")],
                    vec![Operation::literal(2)],
                )]),
            ],
        ));

        let lambda = &block.code.ops[0];
        let inner_list = lambda.nested_lists()[0];
        let inner_op = inner_list.ops[0].id;

        assert_eq!(block.find_list(inner_list.id).unwrap().id, inner_list.id);
        assert_eq!(block.find_op(inner_op).unwrap().id, inner_op);

        let cond = &block.code.ops[1];
        let branch_guard = cond.nested_lists()[0];
        assert_eq!(
            block.find_op(branch_guard.ops[0].id).unwrap().kind,
            OpKind::Load { name: "y".into() }
        );
    }

    #[test]
    fn find_mut_allows_editing_nested_lists() {
        let mut block = assigned(Block::new(vec![Operation::lambda(vec![])]));
        let body_id = block.code.ops[0].nested_lists()[0].id;
        block
            .find_list_mut(body_id)
            .unwrap()
            .ops
            .push(Operation::literal("hi"));
        assert_eq!(block.code.ops[0].nested_lists()[0].len(), 1);
    }

    #[test]
    fn list_containing_returns_the_direct_parent() {
        let block = assigned(Block::new(vec![
            Operation::literal(1),
            Operation::lambda(vec![Operation::load("x")]),
        ]));
        let outer = block.code.ops[0].id;
        let body = block.code.ops[1].nested_lists()[0];
        assert_eq!(block.list_containing(outer).unwrap().id, block.code.id);
        assert_eq!(block.list_containing(body.ops[0].id).unwrap().id, body.id);
        assert!(block.list_containing(OpId(4242)).is_none());
    }

    #[test]
    fn call_targets_walks_everything() {
        let block = Block::new(vec![
            Operation::call(CallTarget::local("f")),
            Operation::lambda(vec![Operation::call(CallTarget::imported(0, "add"))]),
        ]);
        let targets = block.code.call_targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1], &CallTarget::imported(0, "add"));
    }
}
