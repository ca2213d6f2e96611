//! Bound variables: declarations (values) and uses (references).

use mosaic_common::{BlockId, VariableId};
use mosaic_typeck::Ty;

/// A declaration site, e.g. a lambda parameter or a `let` name.
#[derive(Debug, Clone)]
pub struct ValueVar {
    pub name: String,
    /// The declaring block; the value is disposed with it.
    pub block: BlockId,
    /// Present only in typed workspaces.
    pub(crate) ty: Option<Ty>,
}

/// A use site. Resolution is either a bound value or explicitly unresolved.
#[derive(Debug, Clone)]
pub struct ReferenceVar {
    pub name: String,
    pub block: BlockId,
    pub(crate) value: Option<VariableId>,
}

impl ReferenceVar {
    /// The value this reference currently resolves to.
    pub fn value(&self) -> Option<VariableId> {
        self.value
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone)]
pub enum BoundVariable {
    Value(ValueVar),
    Reference(ReferenceVar),
}

impl BoundVariable {
    pub fn name(&self) -> &str {
        match self {
            BoundVariable::Value(v) => &v.name,
            BoundVariable::Reference(r) => &r.name,
        }
    }

    pub fn block(&self) -> BlockId {
        match self {
            BoundVariable::Value(v) => v.block,
            BoundVariable::Reference(r) => r.block,
        }
    }

    pub fn as_value(&self) -> Option<&ValueVar> {
        match self {
            BoundVariable::Value(v) => Some(v),
            BoundVariable::Reference(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ReferenceVar> {
        match self {
            BoundVariable::Reference(r) => Some(r),
            BoundVariable::Value(_) => None,
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        match self {
            BoundVariable::Value(v) => v.name = name,
            BoundVariable::Reference(r) => r.name = name,
        }
    }
}
