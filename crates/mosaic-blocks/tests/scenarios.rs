//! Integration tests for the core editing scenarios.
//!
//! These tests exercise:
//! - Typed connects between literals and operators
//! - Nominal checks rejecting a connect without touching the tree
//! - `let` scoping, reference binding, and unresolving on delete
//! - Stack healing when a middle statement is deleted
//! - Input reordering leaving children and types alone

use std::cell::Cell;
use std::rc::Rc;

use mosaic_blocks::{BlockId, BlockKind, ConnectError, ConnectionId, FieldValue, Workspace};
use mosaic_typeck::Ty;

// ── Helpers ────────────────────────────────────────────────────────────

fn int(ws: &mut Workspace, n: f64) -> BlockId {
    let block = ws.new_block(BlockKind::IntLiteral);
    ws.set_field_value(block, "NUM", FieldValue::Number(n));
    block
}

fn output(ws: &Workspace, block: BlockId) -> ConnectionId {
    ws.block(block).output().expect("block has an output")
}

fn input(ws: &Workspace, block: BlockId, name: &str) -> ConnectionId {
    ws.input_connection(block, name)
        .unwrap_or_else(|| panic!("block {} has no input {}", block, name))
}

fn plug(ws: &mut Workspace, parent: BlockId, name: &str, child: BlockId) {
    let socket = input(ws, parent, name);
    let plug = output(ws, child);
    ws.connect(socket, plug)
        .unwrap_or_else(|err| panic!("cannot plug {} into {}.{}: {}", child, parent, name, err));
}

fn stack(ws: &mut Workspace, blocks: &[BlockId]) {
    for pair in blocks.windows(2) {
        let next = ws.block(pair[0]).next().unwrap();
        let previous = ws.block(pair[1]).previous().unwrap();
        ws.connect(next, previous).unwrap();
    }
}

fn bound_value(ws: &Workspace, block: BlockId) -> Option<mosaic_blocks::VariableId> {
    let reference = ws.field_variable(block, "VAR").unwrap();
    ws.variable(reference).as_reference().unwrap().value()
}

/// Build `let x = 3 in x` and return (let, literal, get).
fn let_x_3_in_x(ws: &mut Workspace) -> (BlockId, BlockId, BlockId) {
    let let_block = ws.new_block(BlockKind::Let);
    let three = int(ws, 3.0);
    let get = ws.new_block(BlockKind::VariablesGet);
    plug(ws, let_block, "EXP1", three);
    plug(ws, let_block, "EXP2", get);
    (let_block, three, get)
}

// ── Typed connect ──────────────────────────────────────────────────────

#[test]
fn int_literal_into_arithmetic_resolves_to_int() {
    let mut ws = Workspace::typed();
    let lit = int(&mut ws, 3.0);
    let add = ws.new_block(BlockKind::IntArithmetic);
    let a = input(&ws, add, "A");
    let out = output(&ws, lit);

    assert!(ws.can_connect(out, a));
    ws.connect(out, a).unwrap();

    assert_eq!(ws.type_of(a), Some(Ty::int()));
    assert_eq!(ws.type_of(out), Some(Ty::int()));
    assert_eq!(ws.get_parent(lit), Some(add));
    assert_eq!(ws.top_blocks(), &[add]);
    assert!(ws.type_errors().is_empty());
    assert!(ws.verify().is_empty());
}

#[test]
fn structural_gate_rejects_unifiable_check_but_wrong_type() {
    let mut ws = Workspace::typed();
    let ternary = ws.new_block(BlockKind::LogicTernary);
    let lit = int(&mut ws, 1.0);
    plug(&mut ws, ternary, "THEN", lit);

    let flag = ws.new_block(BlockKind::BoolLiteral);
    let socket = input(&ws, ternary, "ELSE");
    let plug_conn = output(&ws, flag);
    assert_eq!(
        ws.connect(socket, plug_conn),
        Err(ConnectError::TypeMismatch {
            expected: Ty::int(),
            found: Ty::bool(),
        })
    );
    assert_eq!(ws.get_parent(flag), None);
    assert_eq!(ws.output_type(ternary), Some(Ty::int()));
}

// ── Nominal check ──────────────────────────────────────────────────────

#[test]
fn bool_into_int_socket_is_refused_without_mutation() {
    let mut ws = Workspace::typed();
    let flag = ws.new_block(BlockKind::BoolLiteral);
    let add = ws.new_block(BlockKind::IntArithmetic);
    let fired = Rc::new(Cell::new(0));
    let counter = Rc::clone(&fired);
    ws.subscribe(move |_| counter.set(counter.get() + 1));

    let a = input(&ws, add, "A");
    let out = output(&ws, flag);
    assert!(!ws.can_connect(out, a));
    assert!(matches!(ws.connect(out, a), Err(ConnectError::ChecksFailed(..))));

    assert_eq!(ws.connection(a).target(), None);
    assert_eq!(ws.connection(out).target(), None);
    assert_eq!(ws.get_parent(flag), None);
    assert_eq!(ws.top_blocks(), &[flag, add]);
    assert_eq!(fired.get(), 0);
    assert!(ws.verify().is_empty());
}

// ── Scoping ────────────────────────────────────────────────────────────

#[test]
fn let_binds_reference_and_infers_int() {
    let mut ws = Workspace::typed();
    let (let_block, _, get) = let_x_3_in_x(&mut ws);

    assert_eq!(bound_value(&ws, get), ws.field_variable(let_block, "VAR"));
    assert_eq!(ws.output_type(get), Some(Ty::int()));
    assert_eq!(ws.output_type(let_block), Some(Ty::int()));
    assert!(ws.type_errors().is_empty());
    insta::assert_snapshot!(ws.summary(let_block), @"let x = 3 in x");
}

#[test]
fn deleting_the_let_leaves_the_reference_unresolved() {
    let mut ws = Workspace::typed();
    let (let_block, _, get) = let_x_3_in_x(&mut ws);
    let reference = ws.field_variable(get, "VAR").unwrap();

    ws.unplug(get, false);
    assert_eq!(bound_value(&ws, get), None);

    // Bind against the let's body socket without attaching.
    let body = input(&ws, let_block, "EXP2");
    assert!(ws.resolve_reference(get, Some(body), true));
    assert_eq!(bound_value(&ws, get), ws.field_variable(let_block, "VAR"));

    ws.dispose(let_block, false);
    assert_eq!(bound_value(&ws, get), None);
    assert!(!ws.resolve_reference(get, None, true));
    assert_eq!(ws.unresolved_references(get), vec![reference]);
    assert!(ws.verify().is_empty());
}

#[test]
fn reference_outside_scope_cannot_connect() {
    let mut ws = Workspace::typed();
    let let_block = ws.new_block(BlockKind::Let);
    let get = ws.new_block(BlockKind::VariablesGet);

    // `x` is visible in the body, not in the bound expression.
    let exp1 = input(&ws, let_block, "EXP1");
    let out = output(&ws, get);
    assert_eq!(
        ws.connect(exp1, out),
        Err(ConnectError::UnresolvedReferences(get))
    );
    assert!(ws.can_connect(input(&ws, let_block, "EXP2"), out));
}

#[test]
fn late_binding_mismatch_is_flagged_on_the_reference() {
    let mut ws = Workspace::typed();
    let let_block = ws.new_block(BlockKind::Let);
    let three = int(&mut ws, 3.0);
    let negate = ws.new_block(BlockKind::LogicNegate);
    plug(&mut ws, let_block, "EXP1", three);
    plug(&mut ws, let_block, "EXP2", negate);

    // Unbound at the gate, bound to an Int once attached.
    let get = ws.new_block(BlockKind::VariablesGet);
    plug(&mut ws, negate, "BOOL", get);

    assert_eq!(ws.get_parent(get), Some(negate));
    let errors = ws.type_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, output(&ws, get));
    insta::assert_snapshot!(
        errors[0].1,
        @"type mismatch at reference `x` in block #4: expected Bool, found Int"
    );
    assert!(ws
        .connection(input(&ws, let_block, "EXP1"))
        .type_error()
        .is_none());

    ws.unplug(get, false);
    assert!(ws.type_errors().is_empty());
}

// ── Stack healing ──────────────────────────────────────────────────────

#[test]
fn deleting_middle_statement_heals_the_stack() {
    let mut ws = Workspace::typed();
    let prints: Vec<BlockId> = (0..3).map(|_| ws.new_block(BlockKind::PrintValue)).collect();
    stack(&mut ws, &prints);

    ws.dispose(prints[1], true);

    assert!(!ws.contains_block(prints[1]));
    assert_eq!(ws.get_next_block(prints[0]), Some(prints[2]));
    assert_eq!(ws.get_parent(prints[2]), Some(prints[0]));
    assert_eq!(ws.top_blocks(), &[prints[0]]);
    assert!(ws.verify().is_empty());
}

#[test]
fn deleting_without_heal_leaves_a_new_stack() {
    let mut ws = Workspace::typed();
    let prints: Vec<BlockId> = (0..4).map(|_| ws.new_block(BlockKind::PrintValue)).collect();
    stack(&mut ws, &prints);

    ws.dispose(prints[1], false);

    assert_eq!(ws.get_next_block(prints[0]), None);
    assert_eq!(ws.get_parent(prints[2]), None);
    assert!(ws.top_blocks().contains(&prints[2]));
    assert_eq!(ws.get_next_block(prints[2]), Some(prints[3]));
    assert_eq!(ws.get_parent(prints[3]), Some(prints[2]));
    assert!(ws.verify().is_empty());
}

#[test]
fn incompatible_checks_prevent_healing() {
    let mut ws = Workspace::typed();
    let prints: Vec<BlockId> = (0..3).map(|_| ws.new_block(BlockKind::PrintValue)).collect();
    stack(&mut ws, &prints);
    let top_next = ws.block(prints[0]).next().unwrap();
    let bottom_previous = ws.block(prints[2]).previous().unwrap();
    ws.set_check(top_next, Some(&["Loop"]));
    ws.set_check(bottom_previous, Some(&["Print"]));
    assert_eq!(ws.get_next_block(prints[0]), Some(prints[1]));

    ws.dispose(prints[1], true);

    assert_eq!(ws.get_next_block(prints[0]), None);
    assert_eq!(ws.get_parent(prints[2]), None);
    assert_eq!(ws.top_blocks().len(), 2);
    assert!(ws.verify().is_empty());
}

#[test]
fn unplug_without_heal_carries_the_rest_of_the_stack() {
    let mut ws = Workspace::typed();
    let prints: Vec<BlockId> = (0..3).map(|_| ws.new_block(BlockKind::PrintValue)).collect();
    stack(&mut ws, &prints);

    ws.unplug(prints[1], false);

    assert_eq!(ws.get_next_block(prints[0]), None);
    assert_eq!(ws.get_next_block(prints[1]), Some(prints[2]));
    assert_eq!(ws.top_blocks(), &[prints[0], prints[1]]);
}

// ── Reordering ─────────────────────────────────────────────────────────

#[test]
fn reordering_inputs_keeps_children_and_types() {
    let mut ws = Workspace::typed();
    let add = ws.new_block(BlockKind::IntArithmetic);
    let one = int(&mut ws, 1.0);
    let two = int(&mut ws, 2.0);
    plug(&mut ws, add, "A", one);
    plug(&mut ws, add, "B", two);
    let a = input(&ws, add, "A");
    let before = ws.connection(a).type_expr().cloned();

    ws.move_input_before(add, "B", Some("A"));

    let names: Vec<&str> = ws.block(add).inputs().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["B", "A"]);
    assert_eq!(ws.input_target_block(add, "A"), Some(one));
    assert_eq!(ws.input_target_block(add, "B"), Some(two));
    assert_eq!(ws.connection(a).type_expr().cloned(), before);
    assert_eq!(ws.type_of(a), Some(Ty::int()));
    insta::assert_snapshot!(ws.summary(add), @"+ 2 1");
}

#[test]
fn reordering_let_inputs_keeps_reference_binding() {
    let mut ws = Workspace::typed();
    let (let_block, _, get) = let_x_3_in_x(&mut ws);
    let value = ws.field_variable(let_block, "VAR");

    ws.move_input_before(let_block, "EXP2", Some("EXP1"));
    assert_eq!(bound_value(&ws, get), value);
    assert_eq!(ws.output_type(get), Some(Ty::int()));

    ws.move_numbered_input_before(let_block, 0, 2);
    let names: Vec<&str> = ws.block(let_block).inputs().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["EXP1", "EXP2"]);
    assert_eq!(bound_value(&ws, get), value);
}

#[test]
#[should_panic(expected = "cannot move input 1 before itself")]
fn moving_an_input_before_itself_panics() {
    let mut ws = Workspace::typed();
    let add = ws.new_block(BlockKind::IntArithmetic);
    ws.move_numbered_input_before(add, 1, 1);
}
