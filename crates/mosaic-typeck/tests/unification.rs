//! Integration tests for the unification table as block sockets use it.

use mosaic_common::BlockId;
use mosaic_typeck::{ConstraintOrigin, InferCtx, Ty, TypeError};

fn socket(block: u32, input: &str) -> ConstraintOrigin {
    ConstraintOrigin::Input {
        block: BlockId(block),
        input: input.to_string(),
    }
}

#[test]
fn unified_variables_share_a_representative() {
    let mut ctx = InferCtx::new();
    let a = ctx.fresh_var();
    let b = ctx.fresh_var();
    ctx.unify(a.clone(), b.clone(), socket(1, "A")).unwrap();

    let ra = ctx.resolve(a.clone());
    let rb = ctx.resolve(b.clone());
    assert!(ra.is_var());
    assert_eq!(ra, rb);

    ctx.unify(b.clone(), Ty::int(), socket(1, "B")).unwrap();
    assert_eq!(ctx.resolve(a), Ty::int());
    assert_eq!(ctx.resolve(b), Ty::int());
}

#[test]
fn chains_of_sockets_agree() {
    let mut ctx = InferCtx::new();
    let vars: Vec<Ty> = (0..5).map(|_| ctx.fresh_var()).collect();
    for pair in vars.windows(2) {
        ctx.unify(pair[0].clone(), pair[1].clone(), ConstraintOrigin::Builtin)
            .unwrap();
    }
    let list = Ty::list(vars[0].clone());
    ctx.unify(vars[4].clone(), Ty::pair(Ty::bool(), Ty::float()), ConstraintOrigin::Builtin)
        .unwrap();
    insta::assert_snapshot!(ctx.resolve(list), @"List<Pair<Bool, Float>>");
}

#[test]
fn mismatch_reports_the_socket() {
    let mut ctx = InferCtx::new();
    let elem = ctx.fresh_var();
    ctx.unify(Ty::list(elem.clone()), Ty::list(Ty::int()), socket(4, "REST"))
        .unwrap();
    let err = ctx
        .unify(elem, Ty::bool(), socket(4, "FIRST"))
        .unwrap_err();
    insta::assert_snapshot!(
        err,
        @"type mismatch at input `FIRST` of block #4: expected Int, found Bool"
    );
    assert!(matches!(err, TypeError::Mismatch { .. }));
    assert_eq!(ctx.take_errors().len(), 1);
}

#[test]
fn probing_never_binds() {
    let mut ctx = InferCtx::new();
    let arg = ctx.fresh_var();
    let ret = ctx.fresh_var();
    let f = Ty::fun(arg.clone(), ret.clone());

    assert!(ctx.probe_unify(&f, &Ty::fun(Ty::int(), Ty::bool())));
    assert!(ctx.is_unbound(&arg));
    assert!(ctx.is_unbound(&ret));
    assert!(!ctx.probe_unify(&f, &Ty::int()));
    assert!(ctx.errors.is_empty());
}

#[test]
fn cleared_slots_forget_old_bindings() {
    let mut ctx = InferCtx::new();
    let mut slot = ctx.fresh_var();
    ctx.unify(slot.clone(), Ty::int(), ConstraintOrigin::Builtin).unwrap();
    ctx.clear(&mut slot);
    assert!(ctx.is_unbound(&slot));
    ctx.unify(slot.clone(), Ty::bool(), ConstraintOrigin::Builtin).unwrap();
    assert_eq!(ctx.resolve(slot), Ty::bool());
}

#[test]
fn function_types_print_right_nested() {
    let mut ctx = InferCtx::new();
    let a = ctx.fresh_var();
    let f = Ty::fun(Ty::fun(a.clone(), Ty::bool()), Ty::fun(Ty::list(a), Ty::int()));
    let rest = ctx.fresh_var();
    ctx.unify(f.clone(), Ty::fun(Ty::fun(Ty::float(), Ty::bool()), rest), ConstraintOrigin::Builtin)
        .unwrap();
    insta::assert_snapshot!(ctx.resolve(f), @"((Float) -> Bool) -> (List<Float>) -> Int");
}

// ── Deep types ─────────────────────────────────────────────────────────

/// Bind `head = List<v1>, v1 = List<v2>, ...` and return (head, tail).
fn list_chain(ctx: &mut InferCtx, depth: usize) -> (Ty, Ty) {
    let head = ctx.fresh_var();
    let mut tail = head.clone();
    for _ in 0..depth {
        let next = ctx.fresh_var();
        ctx.unify(tail, Ty::list(next.clone()), ConstraintOrigin::Builtin)
            .unwrap();
        tail = next;
    }
    (head, tail)
}

#[test]
fn deep_chains_unify_and_occurs_check() {
    const DEPTH: usize = 100_000;
    let mut ctx = InferCtx::new();

    let (left, left_tail) = list_chain(&mut ctx, DEPTH);
    let (right, right_tail) = list_chain(&mut ctx, DEPTH);
    ctx.unify(left_tail, Ty::int(), ConstraintOrigin::Builtin).unwrap();
    ctx.unify(left, right, ConstraintOrigin::Builtin).unwrap();
    assert_eq!(ctx.resolve(right_tail), Ty::int());

    let (head, tail) = list_chain(&mut ctx, DEPTH);
    let err = ctx
        .unify(tail.clone(), Ty::list(head), ConstraintOrigin::Builtin)
        .unwrap_err();
    assert!(matches!(err, TypeError::InfiniteType { .. }));
    assert!(ctx.is_unbound(&tail));
}
