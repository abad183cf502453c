//! The editing session.
//!
//! [`Editor`] owns everything an interactive view of one module needs: the
//! module store, the current layout, the navigation session and the view
//! transform. Every edit goes through the store by handle, then rebuilds
//! effects, layout and anchors from scratch and re-resolves the cursor by
//! identity.

use strandline_core::function::ASSERT_TAG;
use strandline_core::{
    Block, CoreError, Function, FunctionId, GrowOutcome, ListId, ModuleStore, ModuleUrl, OpId, OpKind, Operation,
    StackEffect,
};

use crate::anchor::{AnchorKind, AnchorTarget, GrowAction};
use crate::builder::BuiltinTable;
use crate::config::LayoutConfig;
use crate::cursor::{NavigationSession, SelectionChange};
use crate::error::ViewError;
use crate::geometry::Point;
use crate::module_layout::{annotate_effects, layout_module, ModuleLayout};
use crate::viewer::ViewTransform;

/// What a cut removed.
#[derive(Debug, Clone, PartialEq)]
pub enum Cut {
    Operation(Operation),
    Function(FunctionId, Function),
}

/// What a cursor move did. `selection.mode` is set when the input mode
/// has to switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub selection: SelectionChange,
    /// Set when the move grew or shrank a conditional.
    pub grow: Option<GrowOutcome>,
}

pub struct Editor {
    store: ModuleStore,
    module: ModuleUrl,
    builtins: BuiltinTable,
    config: LayoutConfig,
    layout: ModuleLayout,
    session: NavigationSession,
    viewer: ViewTransform,
    revision: u64,
}

impl Editor {
    /// Opens `module` for editing with the view centered on `center`. The
    /// cursor starts on the first anchor.
    pub fn new(
        mut store: ModuleStore,
        module: ModuleUrl,
        builtins: BuiltinTable,
        config: LayoutConfig,
        center: Point,
    ) -> Result<Self, ViewError> {
        annotate_effects(&mut store, &module, &builtins, &config)?;
        let layout = layout_module(&store, &module, &builtins, &config)?;
        let session = NavigationSession::new(layout.layout.anchors.clone());
        let mut editor = Editor {
            store,
            module,
            builtins,
            config,
            layout,
            session,
            viewer: ViewTransform::new(center),
            revision: 0,
        };
        editor.select_and_center(Some(0));
        Ok(editor)
    }

    pub fn store(&self) -> &ModuleStore {
        &self.store
    }

    pub fn module_url(&self) -> &ModuleUrl {
        &self.module
    }

    pub fn layout(&self) -> &ModuleLayout {
        &self.layout
    }

    pub fn session(&self) -> &NavigationSession {
        &self.session
    }

    pub fn viewer(&self) -> &ViewTransform {
        &self.viewer
    }

    /// Bumped by every rebuild.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Input mode implied by the cursor.
    pub fn mode(&self) -> Option<AnchorKind> {
        self.session.current().map(|anchor| anchor.kind)
    }

    /// Rebuilds effects, layout and anchors, keeping the cursor on the same
    /// entity when it still exists.
    ///
    /// On error the store keeps the edit but the layout is the previous one.
    pub fn relayout(&mut self) -> Result<(), ViewError> {
        annotate_effects(&mut self.store, &self.module, &self.builtins, &self.config)?;
        self.layout = layout_module(&self.store, &self.module, &self.builtins, &self.config)?;
        self.session.replace_anchors(self.layout.layout.anchors.clone());
        self.revision += 1;
        tracing::debug!(
            "revision {}: {} anchors, cursor at {:?}",
            self.revision,
            self.session.anchors().len(),
            self.session.current_index()
        );
        self.center_on_cursor();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // View
    // -----------------------------------------------------------------------

    /// Re-selects the anchor nearest the view center.
    pub fn refresh_selection(&mut self) -> SelectionChange {
        self.session.select_at_focus(&self.viewer)
    }

    pub fn pan(&mut self, dx: f64, dy: f64) -> SelectionChange {
        self.viewer.translate(dx, dy);
        self.refresh_selection()
    }

    pub fn zoom(&mut self, factor: f64) -> SelectionChange {
        self.viewer.scale(factor);
        self.refresh_selection()
    }

    pub fn center_on_cursor(&mut self) {
        if let Some(anchor) = self.session.current() {
            let bounds = anchor.bounds;
            self.viewer.center_on(&bounds);
        }
    }

    fn select_and_center(&mut self, idx: Option<usize>) -> SelectionChange {
        let change = self.session.select(idx);
        self.center_on_cursor();
        change
    }

    /// Moves the cursor to `target`; logs and stays put when it has no
    /// anchor.
    pub fn focus(&mut self, target: &AnchorTarget) -> Option<SelectionChange> {
        let change = self.session.focus_target(target)?;
        self.center_on_cursor();
        Some(change)
    }

    /// Moves the cursor to operation `op`, wherever it is in the module.
    pub fn focus_op(&mut self, op: OpId) -> Option<SelectionChange> {
        let list = self
            .store
            .module(&self.module)
            .ok()
            .and_then(|module| module.list_containing_op(op))
            .map(|list| list.id);
        let Some(list) = list else {
            tracing::info!("op {} is not in {}", op, self.module);
            return None;
        };
        self.focus(&AnchorTarget::Operation { list, op })
    }

    /// The function the cursor is in.
    pub fn current_function(&self) -> Option<FunctionId> {
        let module = self.store.module(&self.module).ok()?;
        match &self.session.current()?.target {
            AnchorTarget::Function { function } => Some(function.clone()),
            AnchorTarget::Operation { op, .. } => module.function_containing_op(*op).cloned(),
            AnchorTarget::ListTail { list } => module.function_containing_list(*list).cloned(),
        }
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Advances to the next anchor in layout order, wrapping at the end.
    ///
    /// When the cursor carries a grow action the conditional is grown first:
    /// the cursor then lands in the new branch's guard, or on whatever
    /// followed the branch that was removed.
    pub fn next(&mut self) -> Result<Step, ViewError> {
        let grow = self.session.current().and_then(|anchor| anchor.grow);
        let (Some(current), Some(GrowAction::GrowConditional { cond })) = (self.session.current_index(), grow)
        else {
            let selection = self.select_and_center(self.session.next_index());
            return Ok(Step { selection, grow: None });
        };

        let following = self
            .session
            .next_index()
            .map(|idx| self.session.anchors()[idx].target.clone());
        let outcome = self.store.grow_conditional(&self.module, cond)?;
        self.relayout()?;
        let landed = match outcome {
            GrowOutcome::Appended { guard } => self.focus(&AnchorTarget::ListTail { list: guard }),
            GrowOutcome::RemovedEmptyBranch | GrowOutcome::NoBranchesLeft => {
                following.and_then(|target| self.focus(&target))
            }
        };
        let selection = match landed {
            Some(change) => change,
            None => self.select_clamped(current),
        };
        Ok(Step {
            selection,
            grow: Some(outcome),
        })
    }

    fn select_clamped(&mut self, idx: usize) -> SelectionChange {
        let len = self.session.anchors().len();
        let idx = (len > 0).then(|| idx.min(len - 1));
        self.select_and_center(idx)
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    fn insertion_point(&self) -> Result<(ListId, Option<OpId>), ViewError> {
        let anchor = self.session.current().ok_or(ViewError::NoSelection)?;
        match &anchor.target {
            AnchorTarget::Operation { list, op } => Ok((*list, Some(*op))),
            AnchorTarget::ListTail { list } => Ok((*list, None)),
            AnchorTarget::Function { .. } => Err(ViewError::NotAnInsertionPoint),
        }
    }

    fn insert(&mut self, op: Operation) -> Result<(ListId, OpId), ViewError> {
        let (list, before) = self.insertion_point()?;
        let id = self.store.insert_operation(&self.module, list, before, op)?;
        self.relayout()?;
        Ok((list, id))
    }

    /// Inserts `op` before the cursor's operation, or appends it when the
    /// cursor is at a list tail. The cursor stays where it was, which is
    /// now just past the new operation.
    pub fn insert_at_cursor(&mut self, op: Operation) -> Result<OpId, ViewError> {
        self.insert(op).map(|(_, id)| id)
    }

    /// Inserts `op` like [`Editor::insert_at_cursor`] but leaves the cursor
    /// on the new operation.
    pub fn insert_in_place(&mut self, op: Operation) -> Result<OpId, ViewError> {
        let (list, id) = self.insert(op)?;
        self.focus(&AnchorTarget::Operation { list, op: id });
        Ok(id)
    }

    /// Inserts a conditional with one empty branch and moves the cursor into
    /// that branch's guard.
    pub fn new_cond(&mut self) -> Result<OpId, ViewError> {
        let id = self.insert_in_place(Operation::cond(vec![Block::guarded(Vec::new(), Vec::new())]))?;
        let guard = self
            .store
            .module(&self.module)?
            .conditional(id)
            .and_then(|op| match &op.kind {
                OpKind::Cond { branches } => branches.first(),
                _ => None,
            })
            .and_then(|branch| branch.condition.as_ref())
            .map(|guard| guard.id)
            .ok_or(CoreError::NotAConditional { id })?;
        self.focus(&AnchorTarget::ListTail { list: guard });
        Ok(id)
    }

    /// Inserts an empty lambda, leaving the cursor on it.
    pub fn new_lambda(&mut self) -> Result<OpId, ViewError> {
        self.insert_in_place(Operation::lambda(Vec::new()))
    }

    /// Adds a function with a `[true]` guard and an empty body, and moves
    /// the cursor to the end of its body.
    pub fn new_function<I, S>(&mut self, name: &str, tags: I) -> Result<FunctionId, ViewError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_and_enter(Function::new(name).with_tags(tags))
    }

    /// Declares a function by its interface alone: a `[false]` guard, an
    /// empty body and the given effect.
    pub fn new_interface(&mut self, name: &str, effect: StackEffect) -> Result<FunctionId, ViewError> {
        self.add_and_enter(Function::interface(name, effect))
    }

    fn add_and_enter(&mut self, function: Function) -> Result<FunctionId, ViewError> {
        let id = self.store.add_function(&self.module, function)?;
        self.relayout()?;
        let body = self.store.function(&self.module, &id)?.block.code.id;
        self.focus(&AnchorTarget::ListTail { list: body });
        Ok(id)
    }

    /// Adds an unnamed assertion function.
    pub fn new_assertion(&mut self) -> Result<FunctionId, ViewError> {
        self.new_function("", [ASSERT_TAG])
    }

    fn selected_function(&self) -> Result<FunctionId, ViewError> {
        let anchor = self.session.current().ok_or(ViewError::NoSelection)?;
        match &anchor.target {
            AnchorTarget::Function { function } => Ok(function.clone()),
            _ => Err(ViewError::NotAFunction),
        }
    }

    fn selected_function_mut(&mut self) -> Result<&mut Function, ViewError> {
        let function = self.selected_function()?;
        let url = self.module.clone();
        self.store
            .module_mut(&url)?
            .function_mut(&function)
            .ok_or(ViewError::Core(CoreError::FunctionNotFound { module: url, function }))
    }

    /// Renames the function under the cursor.
    pub fn rename_function(&mut self, name: &str) -> Result<(), ViewError> {
        self.selected_function_mut()?.name = name.to_string();
        self.relayout()
    }

    /// Replaces the tags of the function under the cursor with the
    /// space/comma separated words of `tags`.
    pub fn retag_function(&mut self, tags: &str) -> Result<(), ViewError> {
        let tags = split_tags(tags);
        self.selected_function_mut()?.tags = tags;
        self.relayout()
    }

    /// Moves the function under the cursor to the id `new_id`. An empty id
    /// changes nothing. The cursor stays on the function.
    pub fn rekey_function(&mut self, new_id: &str) -> Result<FunctionId, ViewError> {
        let old = self.selected_function()?;
        if new_id.is_empty() {
            return Ok(old);
        }
        let new = FunctionId::new(new_id);
        self.store.rekey_function(&self.module, &old, new.clone())?;
        self.relayout()?;
        self.focus(&AnchorTarget::Function { function: new.clone() });
        Ok(new)
    }

    /// Sets the native implementation of the function under the cursor for
    /// `interpreter`; `None` removes it.
    pub fn set_native(&mut self, interpreter: &str, code: Option<serde_json::Value>) -> Result<(), ViewError> {
        let function = self.selected_function()?;
        self.store
            .set_native_code(&self.module, &function, interpreter, code)?;
        self.relayout()
    }

    /// Removes the operation or function under the cursor. Nothing happens
    /// at a list tail. After cutting an operation the cursor moves to the
    /// anchor that followed it.
    pub fn cut(&mut self) -> Result<Option<(Cut, SelectionChange)>, ViewError> {
        let idx = self.session.current_index().ok_or(ViewError::NoSelection)?;
        let target = self.session.anchors()[idx].target.clone();
        let cut = match target {
            AnchorTarget::ListTail { .. } => return Ok(None),
            AnchorTarget::Operation { op, .. } => {
                let following = self
                    .session
                    .next_index()
                    .map(|next| self.session.anchors()[next].target.clone());
                let removed = self.store.remove_operation(&self.module, op)?;
                self.relayout()?;
                let selection = match following.and_then(|target| self.focus(&target)) {
                    Some(change) => change,
                    None => self.select_clamped(idx),
                };
                (Cut::Operation(removed), selection)
            }
            AnchorTarget::Function { function } => {
                let removed = self.store.remove_function(&self.module, &function)?;
                self.relayout()?;
                let selection = self.select_clamped(idx);
                (Cut::Function(function, removed), selection)
            }
        };
        Ok(Some(cut))
    }
}

fn split_tags(tags: &str) -> Vec<String> {
    tags.split([' ', ','])
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
