//! End-to-end editing sessions.
//!
//! Each test opens a small module in an [`Editor`], drives it the way the
//! touch controls would (cursor moves, insertions, cuts, conditional growth,
//! function edits) and checks both the program in the store and where the
//! cursor ended up after the rebuild.

use strandline_core::{
    CallTarget, Function, FunctionId, GrowOutcome, ListId, Module, ModuleStore, ModuleUrl, OpId, OpKind, Operation,
    StackEffect,
};
use serde_json::json;
use strandline_core::CoreError;
use strandline_view::editor::Cut;
use strandline_view::{AnchorKind, AnchorTarget, BuiltinTable, Editor, LayoutConfig, Point, ViewError};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn app_url() -> ModuleUrl {
    ModuleUrl::new("mem://app")
}

fn builtins() -> BuiltinTable {
    BuiltinTable::new()
        .with("add", "add", StackEffect::new(2, 1))
        .with("dup", "dup", StackEffect::new(1, 2))
}

/// Opens a module holding `five() = [true] 5`.
fn open_editor() -> Editor {
    open_with(Vec::new())
}

/// Opens a module holding `five` followed by `others`.
fn open_with(others: Vec<(&str, Function)>) -> Editor {
    let mut module = Module::new("demo", ModuleUrl::new("mem://core"))
        .with_function("f", Function::new("five").with_code(vec![Operation::literal(5)]));
    for (id, function) in others {
        module = module.with_function(id, function);
    }
    let mut store = ModuleStore::new();
    store.insert(app_url(), module);
    Editor::new(store, app_url(), builtins(), LayoutConfig::default(), Point::new(160.0, 120.0)).unwrap()
}

fn five(editor: &Editor) -> &Function {
    editor.store().function(&app_url(), &FunctionId::new("f")).unwrap()
}

fn code_list(editor: &Editor) -> ListId {
    five(editor).block.code.id
}

fn code_ops(editor: &Editor) -> Vec<OpId> {
    five(editor).block.code.ops.iter().map(|op| op.id).collect()
}

fn current_target(editor: &Editor) -> AnchorTarget {
    editor.session().current().unwrap().target.clone()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn cursor_starts_on_the_function_header() {
    let editor = open_editor();
    assert_eq!(editor.mode(), Some(AnchorKind::FunctionHeader));
    assert_eq!(
        current_target(&editor),
        AnchorTarget::Function {
            function: FunctionId::new("f")
        }
    );
    assert_eq!(editor.current_function(), Some(FunctionId::new("f")));
    assert_eq!(editor.revision(), 0);
}

#[test]
fn header_is_not_an_insertion_point() {
    let mut editor = open_editor();
    let err = editor.insert_at_cursor(Operation::literal(1)).unwrap_err();
    assert!(matches!(err, ViewError::NotAnInsertionPoint));
}

#[test]
fn next_walks_guard_then_code() {
    let mut editor = open_editor();
    let step = editor.next().unwrap();
    assert_eq!(step.selection.mode, Some(AnchorKind::Operation));
    assert_eq!(step.grow, None);
    assert_eq!(editor.mode(), Some(AnchorKind::Operation));
    let (guard_list, guard_op) = {
        let guard = five(&editor).block.condition.as_ref().unwrap();
        (guard.id, guard.ops[0].id)
    };
    assert_eq!(current_target(&editor).op(), Some(guard_op));

    let step = editor.next().unwrap();
    assert!(step.selection.changed);
    assert_eq!(step.selection.mode, None);
    assert_eq!(current_target(&editor), AnchorTarget::ListTail { list: guard_list });
}

#[test]
fn next_into_another_function_switches_to_header_mode() {
    let mut editor = open_with(vec![(
        "g",
        Function::new("seven").with_code(vec![Operation::literal(7)]),
    )]);
    let body = code_list(&editor);
    editor.focus(&AnchorTarget::ListTail { list: body }).unwrap();
    assert_eq!(editor.mode(), Some(AnchorKind::Operation));

    let step = editor.next().unwrap();
    assert_eq!(step.selection.mode, Some(AnchorKind::FunctionHeader));
    assert_eq!(
        current_target(&editor),
        AnchorTarget::Function {
            function: FunctionId::new("g")
        }
    );

    // Back into the guard of `g`.
    let step = editor.next().unwrap();
    assert_eq!(step.selection.mode, Some(AnchorKind::Operation));
    assert_eq!(editor.current_function(), Some(FunctionId::new("g")));
}

#[test]
fn appending_at_the_tail_keeps_the_cursor_there() {
    let mut editor = open_editor();
    let body = code_list(&editor);
    editor.focus(&AnchorTarget::ListTail { list: body }).unwrap();

    editor.insert_at_cursor(Operation::literal(3)).unwrap();
    editor
        .insert_at_cursor(Operation::call(CallTarget::local("add")))
        .unwrap();

    assert_eq!(code_ops(&editor).len(), 3);
    assert_eq!(current_target(&editor), AnchorTarget::ListTail { list: body });
    assert_eq!(five(&editor).effect(), StackEffect::new(0, 1));
    assert_eq!(editor.revision(), 2);
}

#[test]
fn inserting_before_an_operation_advances_past_the_new_one() {
    let mut editor = open_editor();
    let five_op = code_ops(&editor)[0];
    editor.focus_op(five_op).unwrap();

    let new_op = editor.insert_at_cursor(Operation::literal(1)).unwrap();
    assert_eq!(code_ops(&editor), vec![new_op, five_op]);
    assert_eq!(current_target(&editor).op(), Some(five_op));
    assert_eq!(five(&editor).effect(), StackEffect::new(0, 2));
}

#[test]
fn cut_moves_to_the_following_anchor() {
    let mut editor = open_editor();
    let body = code_list(&editor);
    editor.focus(&AnchorTarget::ListTail { list: body }).unwrap();
    editor.insert_at_cursor(Operation::load("x")).unwrap();
    editor.insert_at_cursor(Operation::save("y")).unwrap();
    let ops = code_ops(&editor);

    // At a tail, cut does nothing.
    assert_eq!(editor.cut().unwrap(), None);

    editor.focus_op(ops[1]).unwrap();
    let Some((Cut::Operation(removed), selection)) = editor.cut().unwrap() else {
        panic!("expected an operation to be cut");
    };
    assert_eq!(removed.id, ops[1]);
    assert_eq!(selection.mode, None);
    assert_eq!(code_ops(&editor), vec![ops[0], ops[2]]);
    assert_eq!(current_target(&editor).op(), Some(ops[2]));
}

#[test]
fn conditional_grows_and_shrinks_from_its_last_tail() {
    let mut editor = open_editor();
    let five_op = code_ops(&editor)[0];
    editor.focus_op(five_op).unwrap();

    let cond = editor.new_cond().unwrap();
    let guard = match &editor.store().module(&app_url()).unwrap().find_op(cond).unwrap().kind {
        OpKind::Cond { branches } => branches[0].condition.as_ref().unwrap().id,
        other => panic!("expected a conditional, got {other:?}"),
    };
    assert_eq!(current_target(&editor), AnchorTarget::ListTail { list: guard });

    // Fill the guard so the branch is no longer empty.
    editor.insert_at_cursor(Operation::literal(true)).unwrap();
    assert_eq!(editor.next().unwrap().grow, None);
    assert!(editor.session().current().unwrap().grow.is_some());

    // Past the last branch: a new empty branch appears and the cursor enters
    // its guard.
    let Some(GrowOutcome::Appended { guard: second_guard }) = editor.next().unwrap().grow else {
        panic!("expected a new branch");
    };
    assert_eq!(current_target(&editor), AnchorTarget::ListTail { list: second_guard });

    // Past the (still empty) new branch: it is removed again and the cursor
    // lands on what followed it.
    assert_eq!(editor.next().unwrap().grow, None);
    assert_eq!(editor.next().unwrap().grow, Some(GrowOutcome::RemovedEmptyBranch));
    assert_eq!(current_target(&editor).op(), Some(five_op));

    let branches = match &editor.store().module(&app_url()).unwrap().find_op(cond).unwrap().kind {
        OpKind::Cond { branches } => branches.len(),
        _ => 0,
    };
    assert_eq!(branches, 1);
}

#[test]
fn new_lambda_keeps_the_cursor_on_it() {
    let mut editor = open_editor();
    let body = code_list(&editor);
    editor.focus(&AnchorTarget::ListTail { list: body }).unwrap();

    let lambda = editor.new_lambda().unwrap();
    assert_eq!(current_target(&editor).op(), Some(lambda));
    assert_eq!(five(&editor).effect(), StackEffect::new(0, 2));
}

#[test]
fn function_lifecycle() {
    let mut editor = open_editor();
    let id = editor.new_function("double", ["util"]).unwrap();
    let body = editor.store().function(&app_url(), &id).unwrap().block.code.id;
    assert_eq!(current_target(&editor), AnchorTarget::ListTail { list: body });
    assert_eq!(editor.current_function(), Some(id.clone()));

    editor
        .focus(&AnchorTarget::Function { function: id.clone() })
        .unwrap();
    editor.rename_function("twice").unwrap();
    editor.retag_function("assert, slow").unwrap();
    let function = editor.store().function(&app_url(), &id).unwrap();
    assert_eq!(function.name, "twice");
    assert_eq!(function.tags, vec!["assert", "slow"]);
    assert_eq!(
        current_target(&editor),
        AnchorTarget::Function { function: id.clone() }
    );

    let Some((Cut::Function(cut_id, cut), _)) = editor.cut().unwrap() else {
        panic!("expected a function to be cut");
    };
    assert_eq!(cut_id, id);
    assert_eq!(cut.name, "twice");
    assert_eq!(editor.store().module(&app_url()).unwrap().functions.len(), 1);
    assert!(editor.session().current().is_some());
}

#[test]
fn interface_keeps_its_declared_effect() {
    let mut editor = open_editor();
    let id = editor.new_interface("area", StackEffect::new(2, 1)).unwrap();
    let function = editor.store().function(&app_url(), &id).unwrap();
    assert_eq!(function.effect(), StackEffect::new(2, 1));
    let guard = function.block.condition.as_ref().unwrap();
    assert!(matches!(&guard.ops[0].kind, OpKind::Literal { value } if *value == json!(false)));

    let body = function.block.code.id;
    assert_eq!(current_target(&editor), AnchorTarget::ListTail { list: body });
}

#[test]
fn rekeyed_function_keeps_its_place_and_the_cursor() {
    let mut editor = open_editor();
    let other = editor.new_function("other", Vec::<String>::new()).unwrap();
    editor
        .focus(&AnchorTarget::Function {
            function: FunctionId::new("f"),
        })
        .unwrap();

    let main = editor.rekey_function("main").unwrap();
    assert_eq!(main, FunctionId::new("main"));
    let ids: Vec<_> = editor
        .store()
        .module(&app_url())
        .unwrap()
        .functions
        .keys()
        .cloned()
        .collect();
    assert_eq!(ids, vec![main.clone(), other.clone()]);
    assert_eq!(current_target(&editor), AnchorTarget::Function { function: main.clone() });

    // An empty id is ignored; a taken one is refused.
    assert_eq!(editor.rekey_function("").unwrap(), main);
    let err = editor.rekey_function(other.as_str()).unwrap_err();
    assert!(matches!(err, ViewError::Core(CoreError::DuplicateFunction { .. })));
}

#[test]
fn native_code_is_edited_on_the_selected_function() {
    let mut editor = open_editor();
    let body = code_list(&editor);
    editor.focus(&AnchorTarget::ListTail { list: body }).unwrap();
    let err = editor.set_native("js", Some(json!("x"))).unwrap_err();
    assert!(matches!(err, ViewError::NotAFunction));

    editor
        .focus(&AnchorTarget::Function {
            function: FunctionId::new("f"),
        })
        .unwrap();
    editor.set_native("js", Some(json!("return 5"))).unwrap();
    assert_eq!(five(&editor).native_code["js"], json!("return 5"));
    editor.set_native("js", None).unwrap();
    assert!(five(&editor).native_code.is_empty());
}

#[test]
fn new_assertion_is_tagged() {
    let mut editor = open_editor();
    let id = editor.new_assertion().unwrap();
    let function = editor.store().function(&app_url(), &id).unwrap();
    assert!(function.has_tag("assert"));
    assert!(function.is_runnable_assertion());
}

#[test]
fn centering_puts_the_cursor_under_the_focus() {
    let mut editor = open_editor();
    let body = code_list(&editor);
    editor.focus(&AnchorTarget::ListTail { list: body }).unwrap();
    let bounds = editor.session().current().unwrap().bounds;
    let mid = editor.viewer().to_screen_rect(&bounds).center();
    assert!((mid.x - 160.0).abs() < 1e-6);
    assert!((mid.y - 120.0).abs() < 1e-6);

    // Zooming keeps the focus point fixed, so something stays selected.
    editor.zoom(2.0);
    editor.center_on_cursor();
    let bounds = editor.session().current().unwrap().bounds;
    let mid = editor.viewer().to_screen_rect(&bounds).center();
    assert!((mid.x - 160.0).abs() < 1e-6);
    assert!((mid.y - 120.0).abs() < 1e-6);
}

#[test]
fn focusing_a_missing_op_changes_nothing() {
    let mut editor = open_editor();
    let before = editor.session().current_index();
    assert_eq!(editor.focus_op(OpId(9999)), None);
    assert_eq!(editor.session().current_index(), before);
}
