//! Greedy merging of adjacent strand items.
//!
//! Runs of simple operations that feed each other (`5 3 add`) read better as
//! one line than as three. A pass walks the items left to right and merges
//! each candidate into the item accepted just before it when:
//!
//! - at least `merge_complexity` of their combined arity cancels
//!   (`2 * min(a.produced, b.consumed) / (a.arity + b.arity)`),
//! - neither is a branching item, and
//! - their combined width stays within `max_merge_width`.
//!
//! Passes repeat until one leaves the item count unchanged. Every merging
//! pass removes at least one item, so there are at most `items.len()` passes.

use crate::config::LayoutConfig;
use crate::error::ViewError;
use crate::strand::{collapse, StrandItem};
use strandline_core::StackEffect;

/// Share of the combined arity of `a` followed by `b` that cancels out.
///
/// `None` when both effects are `(0, 0)`.
pub fn merge_complexity(a: StackEffect, b: StackEffect) -> Option<f64> {
    let arity = a.arity() + b.arity();
    if arity == 0 {
        return None;
    }
    Some(2.0 * f64::from(a.produced.min(b.consumed)) / f64::from(arity))
}

pub fn can_merge(a: &StrandItem, b: &StrandItem, config: &LayoutConfig) -> bool {
    let complex_enough = merge_complexity(a.effect, b.effect).map_or(true, |c| c >= config.merge_complexity);
    complex_enough
        && !a.is_branching()
        && !b.is_branching()
        && a.width() + b.width() <= config.max_merge_width
}

/// Merges items to a fixed point.
pub fn optimize(items: Vec<StrandItem>, config: &LayoutConfig) -> Result<Vec<StrandItem>, ViewError> {
    let mut items = items;
    loop {
        let before = items.len();
        items = optimize_pass(items, config)?;
        if items.len() == before {
            return Ok(items);
        }
    }
}

/// One left-to-right pass.
pub fn optimize_pass(items: Vec<StrandItem>, config: &LayoutConfig) -> Result<Vec<StrandItem>, ViewError> {
    let mut accepted: Vec<StrandItem> = Vec::with_capacity(items.len());
    for item in items {
        match accepted.pop() {
            Some(last) if can_merge(&last, &item, config) => {
                tracing::debug!(
                    "merging {:?} with {:?}",
                    last.tokens.iter().map(|t| t.label.as_str()).collect::<Vec<_>>(),
                    item.tokens.iter().map(|t| t.label.as_str()).collect::<Vec<_>>()
                );
                accepted.push(collapse(vec![last, item])?);
            }
            Some(last) => {
                accepted.push(last);
                accepted.push(item);
            }
            None => accepted.push(item),
        }
    }
    Ok(accepted)
}
