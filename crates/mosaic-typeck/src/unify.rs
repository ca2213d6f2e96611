//! Unification engine for socket type expressions.
//!
//! Implements unification on top of `ena`'s union-find table. Unification only
//! ever adds equivalences; a socket that must be re-inferred is reset by
//! giving it a fresh variable (see [`InferCtx::clear`]) before the next pass.

use ena::unify::InPlaceUnificationTable;

use crate::error::{ConstraintOrigin, TypeError};
use crate::ty::{Ty, TyCon, TyVar};

/// The inference context -- owns the unification table and collected errors.
///
/// All type inference happens through this context. It creates fresh type
/// variables, unifies types, answers trial unifications, and collects errors.
pub struct InferCtx {
    /// The union-find unification table (ena).
    table: InPlaceUnificationTable<TyVar>,
    /// Type errors accumulated during inference.
    pub errors: Vec<TypeError>,
}

impl InferCtx {
    /// Create a new, empty inference context.
    pub fn new() -> Self {
        InferCtx {
            table: InPlaceUnificationTable::new(),
            errors: Vec::new(),
        }
    }

    // ── Type Variable Creation ──────────────────────────────────────────

    /// Create a fresh, unbound type variable.
    pub fn fresh_var(&mut self) -> Ty {
        Ty::Var(self.table.new_key(None))
    }

    /// Number of variables ever allocated by this context.
    pub fn var_count(&self) -> usize {
        self.table.len()
    }

    /// Detach a socket type from every equivalence it took part in.
    ///
    /// The old variable keeps its class; the slot simply stops pointing at it.
    /// Anything else that was unified with the old variable must be cleared
    /// too before it is re-inferred.
    pub fn clear(&mut self, slot: &mut Ty) {
        *slot = self.fresh_var();
    }

    // ── Resolution ──────────────────────────────────────────────────────

    /// Resolve a type by following union-find indirection.
    ///
    /// Bound variables are replaced by their value; unbound variables are
    /// normalized to the root key of their class, so two unified-but-unbound
    /// variables resolve to the same representative. The walk keeps its own
    /// stack, so nesting depth is bounded by memory only.
    pub fn resolve(&mut self, ty: Ty) -> Ty {
        enum Step {
            Visit(Ty),
            App(TyCon, usize),
            Fun,
        }

        let mut work = vec![Step::Visit(ty)];
        let mut done: Vec<Ty> = Vec::new();
        while let Some(step) = work.pop() {
            match step {
                Step::Visit(Ty::Var(v)) => match self.table.probe_value(v) {
                    Some(inner) => work.push(Step::Visit(inner)),
                    None => done.push(Ty::Var(self.table.find(v))),
                },
                Step::Visit(Ty::App(con, args)) => {
                    work.push(Step::App(con, args.len()));
                    work.extend(args.into_iter().rev().map(Step::Visit));
                }
                Step::Visit(Ty::Fun(arg, ret)) => {
                    work.push(Step::Fun);
                    work.push(Step::Visit(*ret));
                    work.push(Step::Visit(*arg));
                }
                Step::Visit(other) => done.push(other),
                Step::App(con, arity) => {
                    let args = done.split_off(done.len() - arity);
                    done.push(Ty::App(con, args));
                }
                Step::Fun => {
                    let ret = done.pop().expect("resolved function result");
                    let arg = done.pop().expect("resolved function argument");
                    done.push(Ty::fun(arg, ret));
                }
            }
        }
        done.pop().expect("resolve produces exactly one type")
    }

    /// Follow bindings until `ty` is a constructor or an unbound root key.
    fn shallow_resolve(&mut self, mut ty: Ty) -> Ty {
        loop {
            match ty {
                Ty::Var(v) => match self.table.probe_value(v) {
                    Some(inner) => ty = inner,
                    None => return Ty::Var(self.table.find(v)),
                },
                other => return other,
            }
        }
    }

    /// Whether `ty` currently resolves to an unbound variable.
    pub fn is_unbound(&mut self, ty: &Ty) -> bool {
        self.shallow_resolve(ty.clone()).is_var()
    }

    // ── Occurs Check ────────────────────────────────────────────────────

    /// Check if a type variable occurs anywhere within a type.
    ///
    /// This prevents infinite types like `a ~ List<a>`.
    pub fn occurs_in(&mut self, var: TyVar, ty: &Ty) -> bool {
        let root = self.table.find(var);
        let mut stack = vec![ty.clone()];
        while let Some(ty) = stack.pop() {
            match ty {
                Ty::Var(v) => {
                    if self.table.find(v) == root {
                        return true;
                    }
                    if let Some(inner) = self.table.probe_value(v) {
                        stack.push(inner);
                    }
                }
                Ty::Con(_) => {}
                Ty::App(_, args) => stack.extend(args),
                Ty::Fun(arg, ret) => {
                    stack.push(*ret);
                    stack.push(*arg);
                }
            }
        }
        false
    }

    // ── Unification ─────────────────────────────────────────────────────

    /// Unify two types, making them equal.
    ///
    /// Pairs of sub-terms are compared left to right from a worklist, each
    /// side resolved only as far as its head. On failure the error is
    /// recorded in [`InferCtx::errors`] and also returned; equivalences added
    /// before the failing sub-term are kept.
    pub fn unify(&mut self, a: Ty, b: Ty, origin: ConstraintOrigin) -> Result<(), TypeError> {
        let mut pending = vec![(a, b)];
        while let Some((a, b)) = pending.pop() {
            let a = self.shallow_resolve(a);
            let b = self.shallow_resolve(b);

            match (a, b) {
                // Two identical variables -- already unified.
                (Ty::Var(v1), Ty::Var(v2)) if v1 == v2 => {}

                // Variable meets variable -- union them.
                (Ty::Var(v1), Ty::Var(v2)) => {
                    self.table
                        .unify_var_var(v1, v2)
                        .expect("unifying two unbound vars should not fail");
                }

                // Variable meets concrete type -- bind the variable (with occurs check).
                (Ty::Var(v), ty) | (ty, Ty::Var(v)) => {
                    if self.occurs_in(v, &ty) {
                        return Err(self.fail(TypeError::InfiniteType { var: v, ty, origin }));
                    }
                    self.table
                        .unify_var_value(v, Some(ty))
                        .expect("binding a var to a concrete type after occurs check should not fail");
                }

                // Nullary constructors -- names must match.
                (Ty::Con(c1), Ty::Con(c2)) if c1 == c2 => {}

                // Applications -- same head and arity, then unify args pairwise.
                (Ty::App(c1, a1), Ty::App(c2, a2)) if c1 == c2 && a1.len() == a2.len() => {
                    pending.extend(a1.into_iter().zip(a2).rev());
                }

                // Function types -- arguments first, then results.
                (Ty::Fun(p1, r1), Ty::Fun(p2, r2)) => {
                    pending.push((*r1, *r2));
                    pending.push((*p1, *p2));
                }

                // Everything else is a mismatch.
                (expected, found) => {
                    let expected = self.resolve(expected);
                    let found = self.resolve(found);
                    return Err(self.fail(TypeError::Mismatch {
                        expected,
                        found,
                        origin,
                    }));
                }
            }
        }
        Ok(())
    }

    fn fail(&mut self, err: TypeError) -> TypeError {
        self.errors.push(err.clone());
        err
    }

    /// Check whether two types could be unified, without changing anything.
    ///
    /// The unification runs inside a table snapshot that is always rolled
    /// back, and errors it produces are discarded.
    pub fn probe_unify(&mut self, a: &Ty, b: &Ty) -> bool {
        let error_count = self.errors.len();
        let snapshot = self.table.snapshot();
        let ok = self
            .unify(a.clone(), b.clone(), ConstraintOrigin::ConnectCheck)
            .is_ok();
        self.table.rollback_to(snapshot);
        self.errors.truncate(error_count);
        ok
    }

    /// Drain the collected errors.
    pub fn take_errors(&mut self) -> Vec<TypeError> {
        std::mem::take(&mut self.errors)
    }
}

impl Default for InferCtx {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
