//! Type representation for block sockets.
//!
//! Defines the core `Ty` enum, type constructors (`TyCon`) and type variables
//! (`TyVar`). Sockets store a `Ty` whose variables index into the
//! unification table owned by [`crate::unify::InferCtx`].

use std::fmt;

/// A type variable, identified by a `u32` index into the unification table.
///
/// Type variables are created during inference and unified with concrete types
/// or other variables. The `ena` crate handles the union-find mechanics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TyVar(pub u32);

/// A type constructor, identified by name (`Int`, `List`, `Pair`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TyCon {
    pub name: String,
}

impl TyCon {
    pub fn new(name: impl Into<String>) -> Self {
        TyCon { name: name.into() }
    }
}

impl fmt::Display for TyCon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Name used for function types in nominal checks.
pub const FUNCTION_TAG: &str = "Function";

/// A socket type.
///
/// - `Var`: an inference variable (to be resolved by unification)
/// - `Con`: a nullary constructor (Int, Float, Bool)
/// - `App`: a constructor applied to arguments (List<Int>, Pair<Int, Bool>)
/// - `Fun`: a function from one argument to a result
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// A type variable (unresolved during inference).
    Var(TyVar),
    /// A nullary type constructor.
    Con(TyCon),
    /// A type constructor applied to arguments.
    App(TyCon, Vec<Ty>),
    /// A function type: `(arg) -> result`.
    Fun(Box<Ty>, Box<Ty>),
}

impl Ty {
    /// Create an `Int` type.
    pub fn int() -> Ty {
        Ty::Con(TyCon::new("Int"))
    }

    /// Create a `Float` type.
    pub fn float() -> Ty {
        Ty::Con(TyCon::new("Float"))
    }

    /// Create a `Bool` type.
    pub fn bool() -> Ty {
        Ty::Con(TyCon::new("Bool"))
    }

    /// Create a `List<T>` type.
    pub fn list(elem: Ty) -> Ty {
        Ty::App(TyCon::new("List"), vec![elem])
    }

    /// Create a `Pair<A, B>` type.
    pub fn pair(first: Ty, second: Ty) -> Ty {
        Ty::App(TyCon::new("Pair"), vec![first, second])
    }

    /// Create a function type.
    pub fn fun(arg: Ty, ret: Ty) -> Ty {
        Ty::Fun(Box::new(arg), Box::new(ret))
    }

    /// The head constructor name, or `None` for a variable.
    ///
    /// This is the tag nominal connection checks compare against.
    pub fn head(&self) -> Option<&str> {
        match self {
            Ty::Var(_) => None,
            Ty::Con(c) | Ty::App(c, _) => Some(&c.name),
            Ty::Fun(..) => Some(FUNCTION_TAG),
        }
    }

    /// Whether this type is an inference variable.
    pub fn is_var(&self) -> bool {
        matches!(self, Ty::Var(_))
    }

    /// Collect every variable mentioned in this type, in order of appearance.
    pub fn vars(&self) -> Vec<TyVar> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(ty) = stack.pop() {
            match ty {
                Ty::Var(v) => {
                    if !out.contains(v) {
                        out.push(*v);
                    }
                }
                Ty::Con(_) => {}
                Ty::App(_, args) => stack.extend(args.iter().rev()),
                Ty::Fun(arg, ret) => {
                    stack.push(ret);
                    stack.push(arg);
                }
            }
        }
        out
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Piece<'a> {
            Ty(&'a Ty),
            Text(&'static str),
        }

        let mut work = vec![Piece::Ty(self)];
        while let Some(piece) = work.pop() {
            match piece {
                Piece::Text(text) => f.write_str(text)?,
                Piece::Ty(Ty::Var(v)) => write!(f, "?{}", v.0)?,
                Piece::Ty(Ty::Con(c)) => write!(f, "{}", c)?,
                Piece::Ty(Ty::App(con, args)) => {
                    write!(f, "{}", con)?;
                    if !args.is_empty() {
                        work.push(Piece::Text(">"));
                        for (i, a) in args.iter().enumerate().rev() {
                            work.push(Piece::Ty(a));
                            if i > 0 {
                                work.push(Piece::Text(", "));
                            }
                        }
                        work.push(Piece::Text("<"));
                    }
                }
                Piece::Ty(Ty::Fun(arg, ret)) => {
                    f.write_str("(")?;
                    work.push(Piece::Ty(ret));
                    work.push(Piece::Text(") -> "));
                    work.push(Piece::Ty(arg));
                }
            }
        }
        Ok(())
    }
}

// ── ena trait implementations ──────────────────────────────────────────

impl ena::unify::UnifyKey for TyVar {
    type Value = Option<Ty>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TyVar(u)
    }

    fn tag() -> &'static str {
        "TyVar"
    }
}

impl ena::unify::EqUnifyValue for Ty {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ty_display() {
        assert_eq!(format!("{}", Ty::int()), "Int");
        assert_eq!(format!("{}", Ty::list(Ty::bool())), "List<Bool>");
        assert_eq!(
            format!("{}", Ty::pair(Ty::int(), Ty::float())),
            "Pair<Int, Float>"
        );
        assert_eq!(
            format!("{}", Ty::fun(Ty::int(), Ty::fun(Ty::bool(), Ty::int()))),
            "(Int) -> (Bool) -> Int"
        );
        assert_eq!(format!("{}", Ty::Var(TyVar(4))), "?4");
    }

    #[test]
    fn head_names() {
        assert_eq!(Ty::int().head(), Some("Int"));
        assert_eq!(Ty::list(Ty::int()).head(), Some("List"));
        assert_eq!(Ty::fun(Ty::int(), Ty::int()).head(), Some("Function"));
        assert_eq!(Ty::Var(TyVar(0)).head(), None);
    }

    #[test]
    fn vars_in_order_without_duplicates() {
        let a = Ty::Var(TyVar(1));
        let b = Ty::Var(TyVar(2));
        let ty = Ty::fun(Ty::pair(a.clone(), b.clone()), a);
        assert_eq!(ty.vars(), vec![TyVar(1), TyVar(2)]);
    }
}
