//! Strands: stack-effect-annotated trees derived from operation lists.
//!
//! A [`Strand`] is what layout consumes. It is rebuilt from the program on
//! every edit and never edited in place; the only link back to the program
//! is through the [`TokenSource`] handles carried by each token and the
//! [`ListId`] of each flat strand.

use serde::Serialize;
use smallvec::SmallVec;
use strandline_core::{ListId, OpId, StackEffect};

use crate::error::ViewError;

/// Which operation a token was rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TokenSource {
    pub list: ListId,
    pub op: OpId,
}

/// One label of a strand item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub label: String,
    pub source: TokenSource,
}

/// Token run of an item. Most items hold one or two tokens.
pub type Tokens = SmallVec<[Token; 2]>;

#[derive(Debug, Clone, PartialEq)]
pub struct StrandItem {
    pub tokens: Tokens,
    pub effect: StackEffect,
    /// Nesting depth relative to the containing strand. Only 0 is supported.
    pub depth: u32,
    /// Nested strands of a branching item (lambda body, conditional
    /// branches). `None` for leaves; a conditional with no branches has
    /// `Some(vec![])` and still never merges.
    pub sub_strands: Option<Vec<Strand>>,
    /// Whether every sub-strand is expected to match `effect`.
    pub sync_effects: bool,
    /// Items collapsed into this one by a dynamic scope.
    pub inner: Vec<StrandItem>,
}

impl StrandItem {
    pub fn leaf(token: Token, effect: StackEffect) -> Self {
        StrandItem {
            tokens: SmallVec::from_elem(token, 1),
            effect,
            depth: 0,
            sub_strands: None,
            sync_effects: false,
            inner: Vec::new(),
        }
    }

    pub fn branching(token: Token, effect: StackEffect, sub_strands: Vec<Strand>, sync_effects: bool) -> Self {
        StrandItem {
            sub_strands: Some(sub_strands),
            sync_effects,
            ..StrandItem::leaf(token, effect)
        }
    }

    pub fn is_branching(&self) -> bool {
        self.sub_strands.is_some()
    }

    /// Rendered width in characters: each label plus one separator.
    pub fn width(&self) -> usize {
        self.tokens
            .iter()
            .map(|token| token.label.chars().count() + 1)
            .sum()
    }
}

/// Sequential composition of a run of items into a single leaf.
///
/// Fails if any item has non-zero depth. The `inner` items of scopes in the
/// run are kept, in order.
pub fn collapse(items: Vec<StrandItem>) -> Result<StrandItem, ViewError> {
    let effect = collapse_effect(&items)?;
    let mut tokens = Tokens::new();
    let mut inner = Vec::new();
    for item in items {
        tokens.extend(item.tokens);
        inner.extend(item.inner);
    }
    Ok(StrandItem {
        tokens,
        effect,
        depth: 0,
        sub_strands: None,
        sync_effects: false,
        inner,
    })
}

/// The aggregate effect of a run of items.
pub fn collapse_effect(items: &[StrandItem]) -> Result<StackEffect, ViewError> {
    if let Some(item) = items.iter().find(|item| item.depth != 0) {
        return Err(ViewError::UnsupportedDepth { depth: item.depth });
    }
    Ok(StackEffect::sequence(items.iter().map(|item| item.effect)))
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrandBody {
    /// The strand of one operation list.
    Flat { list: ListId, items: Vec<StrandItem> },
    /// A guarded block: the guard's strand above the code's strand.
    Guarded { guard: Box<Strand>, code: Box<Strand> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strand {
    pub body: StrandBody,
    pub effect: StackEffect,
    /// Set on the last branch of a conditional: the conditional that grows
    /// when the cursor advances past this branch.
    pub tail_of_conditional: Option<OpId>,
}

impl Strand {
    pub fn flat(list: ListId, items: Vec<StrandItem>, effect: StackEffect) -> Self {
        Strand {
            body: StrandBody::Flat { list, items },
            effect,
            tail_of_conditional: None,
        }
    }

    pub fn guarded(guard: Strand, code: Strand, effect: StackEffect) -> Self {
        Strand {
            body: StrandBody::Guarded {
                guard: Box::new(guard),
                code: Box::new(code),
            },
            effect,
            tail_of_conditional: None,
        }
    }

    /// Items of a flat strand; empty for a guarded one.
    pub fn items(&self) -> &[StrandItem] {
        match &self.body {
            StrandBody::Flat { items, .. } => items,
            StrandBody::Guarded { .. } => &[],
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn token(label: &str, op: u32) -> Token {
        Token {
            label: label.to_string(),
            source: TokenSource {
                list: ListId(1),
                op: OpId(op),
            },
        }
    }

    pub fn item(label: &str, op: u32, consumed: u32, produced: u32) -> StrandItem {
        StrandItem::leaf(token(label, op), StackEffect::new(consumed, produced))
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::item;
    use super::*;

    #[test]
    fn collapse_cancels_production_against_consumption() {
        let merged = collapse(vec![item("5", 1, 0, 1), item("3", 2, 0, 1), item("add", 3, 2, 1)]).unwrap();
        assert_eq!(merged.effect, StackEffect::new(0, 1));
        let labels: Vec<_> = merged.tokens.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["5", "3", "add"]);
    }

    #[test]
    fn collapse_rejects_nested_depth() {
        let mut deep = item("x>", 1, 0, 1);
        deep.depth = 1;
        assert!(matches!(
            collapse(vec![deep]),
            Err(ViewError::UnsupportedDepth { depth: 1 })
        ));
    }

    #[test]
    fn width_counts_one_separator_per_token() {
        let merged = collapse(vec![item("ab", 1, 0, 1), item(">x", 2, 1, 0)]).unwrap();
        assert_eq!(merged.width(), 6);
    }
}
