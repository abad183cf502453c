//! Anchors: navigable places in a laid-out module.
//!
//! An anchor ties a box in layout space to a position in the program. The
//! position is expressed through handles, so the same [`AnchorTarget`] can be
//! looked up again in the anchors of a later layout.

use serde::Serialize;
use strandline_core::{FunctionId, ListId, OpId};

use crate::geometry::{Affine, Rect};

/// The program position an anchor stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnchorTarget {
    /// An operation inside `list`; inserting here inserts before `op`.
    Operation { list: ListId, op: OpId },
    /// The end of `list`; inserting here appends.
    ListTail { list: ListId },
    /// A function header.
    Function { function: FunctionId },
}

impl AnchorTarget {
    /// The list an insertion at this target goes into, if any.
    pub fn list(&self) -> Option<ListId> {
        match self {
            AnchorTarget::Operation { list, .. } | AnchorTarget::ListTail { list } => Some(*list),
            AnchorTarget::Function { .. } => None,
        }
    }

    pub fn op(&self) -> Option<OpId> {
        match self {
            AnchorTarget::Operation { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// Whether both targets name the same program entity. Operations are
    /// matched by operation handle alone.
    pub fn same_entity(&self, other: &AnchorTarget) -> bool {
        match (self, other) {
            (AnchorTarget::Operation { op: a, .. }, AnchorTarget::Operation { op: b, .. }) => a == b,
            _ => self == other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorKind {
    Operation,
    FunctionHeader,
}

/// Runs when the cursor advances past the anchor that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GrowAction {
    /// Add a branch to (or drop the empty last branch of) a conditional.
    GrowConditional { cond: OpId },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anchor {
    pub target: AnchorTarget,
    pub kind: AnchorKind,
    /// Box in the frame of the layout that holds the anchor.
    pub bounds: Rect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grow: Option<GrowAction>,
}

impl Anchor {
    pub fn operation(target: AnchorTarget, bounds: Rect) -> Self {
        Anchor {
            target,
            kind: AnchorKind::Operation,
            bounds,
            grow: None,
        }
    }

    pub fn function_header(function: FunctionId, bounds: Rect) -> Self {
        Anchor {
            target: AnchorTarget::Function { function },
            kind: AnchorKind::FunctionHeader,
            bounds,
            grow: None,
        }
    }

    pub fn is_tail(&self) -> bool {
        matches!(self.target, AnchorTarget::ListTail { .. })
    }

    /// The same anchor in a parent frame.
    pub fn transformed(mut self, transform: &Affine) -> Self {
        self.bounds = transform.map_rect(&self.bounds);
        self
    }
}
