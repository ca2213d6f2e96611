//! Type error types with provenance tracking.
//!
//! Every type error carries a `ConstraintOrigin` that records which socket or
//! reference produced the constraint, so the graph layer can attach the
//! failure to the right place.

use std::fmt;

use mosaic_common::BlockId;

use crate::ty::{Ty, TyVar};

/// The origin of a type constraint -- where in the block graph did we
/// decide these two types should be equal?
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstraintOrigin {
    /// A child plugged into a value or statement input of `block`.
    Input { block: BlockId, input: String },
    /// A variable reference owned by `block` bound to a declaration.
    Reference { block: BlockId, name: String },
    /// Trial unification performed before a connection is made.
    ConnectCheck,
    /// Synthetic origin for engine-internal constraints.
    Builtin,
}

impl fmt::Display for ConstraintOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintOrigin::Input { block, input } => {
                write!(f, "input `{}` of block {}", input, block)
            }
            ConstraintOrigin::Reference { block, name } => {
                write!(f, "reference `{}` in block {}", name, block)
            }
            ConstraintOrigin::ConnectCheck => write!(f, "connection check"),
            ConstraintOrigin::Builtin => write!(f, "builtin constraint"),
        }
    }
}

/// A type error encountered during inference.
///
/// Type errors never abort an inference pass; they are collected and
/// attached to the sockets that produced them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeError {
    /// Two types that should be equal are not.
    Mismatch {
        expected: Ty,
        found: Ty,
        origin: ConstraintOrigin,
    },
    /// A type variable appears in its own definition (infinite type).
    ///
    /// Example: unifying `a` with `List<a>`.
    InfiniteType {
        var: TyVar,
        ty: Ty,
        origin: ConstraintOrigin,
    },
}

impl TypeError {
    /// Where the failing constraint came from.
    pub fn origin(&self) -> &ConstraintOrigin {
        match self {
            TypeError::Mismatch { origin, .. } | TypeError::InfiniteType { origin, .. } => origin,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Mismatch {
                expected,
                found,
                origin,
            } => write!(
                f,
                "type mismatch at {}: expected {}, found {}",
                origin, expected, found
            ),
            TypeError::InfiniteType { var, ty, origin } => write!(
                f,
                "infinite type at {}: ?{} occurs in {}",
                origin, var.0, ty
            ),
        }
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_display() {
        let err = TypeError::Mismatch {
            expected: Ty::int(),
            found: Ty::bool(),
            origin: ConstraintOrigin::Input {
                block: BlockId(3),
                input: "A".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "type mismatch at input `A` of block #3: expected Int, found Bool"
        );
    }

    #[test]
    fn infinite_type_display() {
        let err = TypeError::InfiniteType {
            var: TyVar(2),
            ty: Ty::list(Ty::Var(TyVar(2))),
            origin: ConstraintOrigin::Builtin,
        };
        assert_eq!(
            err.to_string(),
            "infinite type at builtin constraint: ?2 occurs in List<?2>"
        );
        assert_eq!(err.origin(), &ConstraintOrigin::Builtin);
    }
}
