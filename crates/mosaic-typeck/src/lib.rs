//! Mosaic type engine: union-find type expressions for block graphs.
//!
//! Sockets of a block graph carry type expressions built from a small set of
//! constructors (`Int`, `Float`, `Bool`, `List<a>`, `Pair<a, b>`,
//! `(a) -> b`) and inference variables. Inference is best effort: a failed
//! unification is recorded and reported, never raised.
//!
//! # Architecture
//!
//! - [`ty`]: Core type representation (Ty, TyCon, TyVar)
//! - [`unify`]: Unification table with occurs check, trial unification and reset
//! - [`error`]: Type error types with provenance tracking

pub mod error;
pub mod ty;
pub mod unify;

pub use error::{ConstraintOrigin, TypeError};
pub use ty::{Ty, TyCon, TyVar};
pub use unify::InferCtx;
