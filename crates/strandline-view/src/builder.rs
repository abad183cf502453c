//! Building strands from blocks.
//!
//! [`StrandBuilder`] walks an operation list, turns every operation into a
//! [`StrandItem`] with its stack effect, optimizes the run and sums it up.
//! The effect of a call comes from an [`EffectResolver`]: the builder never
//! looks into a callee's body, only at its declared effect.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strandline_core::{
    Block, CallTarget, CoreError, ListId, ModuleStore, ModuleUrl, OpKind, OpList, Operation, StackEffect,
};

use crate::config::LayoutConfig;
use crate::error::ViewError;
use crate::optimizer::optimize;
use crate::strand::{collapse, collapse_effect, Strand, StrandItem, Token, TokenSource};

/// What a call target looks like from a call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub label: String,
    #[serde(flatten)]
    pub effect: StackEffect,
}

/// Resolves call targets to their display label and declared effect.
pub trait EffectResolver {
    fn resolve(&self, target: &CallTarget) -> Result<Resolution, ViewError>;
}

/// Built-in functions that live outside any loaded module, keyed by
/// function id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuiltinTable {
    entries: IndexMap<String, Resolution>,
}

impl BuiltinTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, label: impl Into<String>, effect: StackEffect) -> Self {
        self.entries.insert(
            id.into(),
            Resolution {
                label: label.into(),
                effect,
            },
        );
        self
    }

    pub fn get(&self, id: &str) -> Option<&Resolution> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EffectResolver for BuiltinTable {
    fn resolve(&self, target: &CallTarget) -> Result<Resolution, ViewError> {
        self.get(target.function().as_str())
            .cloned()
            .ok_or_else(|| ViewError::UnresolvedCall {
                target: target.to_string(),
            })
    }
}

/// Resolves calls made from one module against the store, falling back to
/// built-ins for targets the store does not hold.
pub struct ModuleResolver<'a> {
    store: &'a ModuleStore,
    module: &'a ModuleUrl,
    builtins: &'a BuiltinTable,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(store: &'a ModuleStore, module: &'a ModuleUrl, builtins: &'a BuiltinTable) -> Self {
        ModuleResolver {
            store,
            module,
            builtins,
        }
    }
}

impl EffectResolver for ModuleResolver<'_> {
    fn resolve(&self, target: &CallTarget) -> Result<Resolution, ViewError> {
        match self.store.resolve_function(self.module, target) {
            Ok((_, function)) => Ok(Resolution {
                label: function.name.clone(),
                effect: function.effect(),
            }),
            Err(CoreError::FunctionNotFound { .. } | CoreError::ModuleNotFound { .. }) => {
                self.builtins.resolve(target)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Builds strands. Every flat strand is optimized as soon as its items
/// exist.
pub struct StrandBuilder<'a> {
    resolver: &'a dyn EffectResolver,
    config: &'a LayoutConfig,
}

impl<'a> StrandBuilder<'a> {
    pub fn new(resolver: &'a dyn EffectResolver, config: &'a LayoutConfig) -> Self {
        StrandBuilder { resolver, config }
    }

    /// Strand of a block. An unguarded block is just its code strand.
    ///
    /// For a guarded block, guard and code present one interface: both
    /// consume `max(guard.consumed, code.consumed)`, and the code's
    /// production is raised by whatever extra the guard made it consume.
    pub fn block(&self, block: &Block) -> Result<Strand, ViewError> {
        let mut code = self.code(&block.code)?;
        let Some(condition) = &block.condition else {
            return Ok(code);
        };
        let mut guard = self.code(condition)?;

        let consumed = guard.effect.consumed.max(code.effect.consumed);
        let produced = code.effect.produced.saturating_add(consumed - code.effect.consumed);
        guard.effect.consumed = consumed;
        code.effect.consumed = consumed;
        Ok(Strand::guarded(guard, code, StackEffect::new(consumed, produced)))
    }

    /// Strand of one operation list.
    pub fn code(&self, list: &OpList) -> Result<Strand, ViewError> {
        let items = list
            .ops
            .iter()
            .map(|op| self.item(op, list.id))
            .collect::<Result<Vec<_>, _>>()?;
        let items = optimize(items, self.config)?;
        let effect = collapse_effect(&items)?;
        Ok(Strand::flat(list.id, items, effect))
    }

    fn item(&self, op: &Operation, list: ListId) -> Result<StrandItem, ViewError> {
        let token = |label: String| Token {
            label,
            source: TokenSource { list, op: op.id },
        };
        let item = match &op.kind {
            OpKind::Literal { value } => StrandItem::leaf(token(value.to_string()), StackEffect::new(0, 1)),
            OpKind::Lambda { body } => StrandItem::branching(
                token(String::new()),
                StackEffect::new(0, 1),
                vec![self.code(body)?],
                false,
            ),
            OpKind::CallLambda {
                num_consumed,
                num_produced,
            } => StrandItem::leaf(
                token("call".to_string()),
                StackEffect::new(num_consumed.saturating_add(1), *num_produced),
            ),
            OpKind::Save { name } => StrandItem::leaf(token(format!(">{name}")), StackEffect::new(1, 0)),
            OpKind::Load { name } => StrandItem::leaf(token(format!("{name}>")), StackEffect::new(0, 1)),
            OpKind::Cond { branches } => {
                let mut strands = branches
                    .iter()
                    .map(|branch| self.block(branch))
                    .collect::<Result<Vec<_>, _>>()?;
                let effect = strands
                    .iter()
                    .fold(StackEffect::NONE, |acc, strand| acc.max(strand.effect));
                if let Some(last) = strands.last_mut() {
                    last.tail_of_conditional = Some(op.id);
                }
                StrandItem::branching(token(String::new()), effect, strands, true)
            }
            OpKind::DynamicScope { name, body } => {
                let inner = self.code(body)?.items().to_vec();
                let mut item = collapse(inner.clone())?;
                item.tokens = std::iter::once(token(format!("[{name}]"))).collect();
                item.inner = inner;
                item
            }
            OpKind::Call { target } => {
                let resolved = self.resolver.resolve(target)?;
                StrandItem::leaf(token(resolved.label), resolved.effect)
            }
        };
        Ok(item)
    }
}
