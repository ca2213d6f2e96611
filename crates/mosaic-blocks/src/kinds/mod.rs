//! Block types and their per-type behaviour.
//!
//! Every block carries a [`BlockKind`] tag. Behaviour (socket layout, type
//! shape, inference, variable visibility) is looked up from the tag through
//! [`BlockKind::behavior`], never attached to individual blocks.

mod functions;
mod literals;
mod operators;
mod statements;
mod structures;

use mosaic_common::{BlockId, ConnectionId, VariableId};
use mosaic_typeck::Ty;

use crate::workspace::Workspace;

pub use structures::set_item_count;

/// Per-type behaviour of a block.
pub trait BlockType: Sync {
    /// Declare the sockets and fields of a freshly created block.
    fn init(&self, ws: &mut Workspace, block: BlockId);

    /// Reset every type expression this block owns to its declared shape,
    /// built from fresh variables. Children are cleared by the caller.
    fn clear_types(&self, ws: &mut Workspace, block: BlockId);

    /// Unify each connected child against its socket and return the block's
    /// own result type (`None` for statements).
    fn infer(&self, ws: &mut Workspace, block: BlockId) -> Option<Ty> {
        ws.unify_inputs(block)
    }

    /// Constraints against declarations elsewhere in the tree. Runs after
    /// every block of the tree has inferred, so binders have their final
    /// types and a conflict is reported at the use.
    fn infer_references(&self, _ws: &mut Workspace, _block: BlockId) {}

    /// Variables this block declares into the child slot behind `conn`.
    fn visible_variables(&self, _ws: &Workspace, _block: BlockId, _conn: ConnectionId) -> Vec<VariableId> {
        Vec::new()
    }

    /// Shape information beyond fields and children, for records.
    fn save_extra_state(&self, _ws: &Workspace, _block: BlockId) -> Option<serde_json::Value> {
        None
    }

    fn load_extra_state(&self, _ws: &mut Workspace, _block: BlockId, _state: &serde_json::Value) {}
}

/// The closed set of block types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    IntLiteral,
    FloatLiteral,
    BoolLiteral,
    IntArithmetic,
    FloatArithmetic,
    IntCompare,
    LogicOperation,
    LogicNegate,
    LogicTernary,
    PairCreate,
    PairFirst,
    PairSecond,
    ListEmpty,
    ListCons,
    ListCreateWith,
    Lambda,
    LambdaApp,
    Let,
    VariablesGet,
    PrintValue,
    RepeatTimes,
}

impl BlockKind {
    pub const ALL: [BlockKind; 21] = [
        BlockKind::IntLiteral,
        BlockKind::FloatLiteral,
        BlockKind::BoolLiteral,
        BlockKind::IntArithmetic,
        BlockKind::FloatArithmetic,
        BlockKind::IntCompare,
        BlockKind::LogicOperation,
        BlockKind::LogicNegate,
        BlockKind::LogicTernary,
        BlockKind::PairCreate,
        BlockKind::PairFirst,
        BlockKind::PairSecond,
        BlockKind::ListEmpty,
        BlockKind::ListCons,
        BlockKind::ListCreateWith,
        BlockKind::Lambda,
        BlockKind::LambdaApp,
        BlockKind::Let,
        BlockKind::VariablesGet,
        BlockKind::PrintValue,
        BlockKind::RepeatTimes,
    ];

    /// The type tag used in records.
    pub fn tag(self) -> &'static str {
        match self {
            BlockKind::IntLiteral => "int_literal",
            BlockKind::FloatLiteral => "float_literal",
            BlockKind::BoolLiteral => "bool_literal",
            BlockKind::IntArithmetic => "int_arithmetic",
            BlockKind::FloatArithmetic => "float_arithmetic",
            BlockKind::IntCompare => "int_compare",
            BlockKind::LogicOperation => "logic_operation",
            BlockKind::LogicNegate => "logic_negate",
            BlockKind::LogicTernary => "logic_ternary",
            BlockKind::PairCreate => "pair_create",
            BlockKind::PairFirst => "pair_first",
            BlockKind::PairSecond => "pair_second",
            BlockKind::ListEmpty => "list_empty",
            BlockKind::ListCons => "list_cons",
            BlockKind::ListCreateWith => "list_create_with",
            BlockKind::Lambda => "lambda",
            BlockKind::LambdaApp => "lambda_app",
            BlockKind::Let => "let",
            BlockKind::VariablesGet => "variables_get",
            BlockKind::PrintValue => "print_value",
            BlockKind::RepeatTimes => "repeat_times",
        }
    }

    pub fn from_tag(tag: &str) -> Option<BlockKind> {
        BlockKind::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }

    pub fn behavior(self) -> &'static dyn BlockType {
        match self {
            BlockKind::IntLiteral => &literals::INT_LITERAL,
            BlockKind::FloatLiteral => &literals::FLOAT_LITERAL,
            BlockKind::BoolLiteral => &literals::BoolLiteral,
            BlockKind::IntArithmetic => &operators::INT_ARITHMETIC,
            BlockKind::FloatArithmetic => &operators::FLOAT_ARITHMETIC,
            BlockKind::IntCompare => &operators::INT_COMPARE,
            BlockKind::LogicOperation => &operators::LOGIC_OPERATION,
            BlockKind::LogicNegate => &operators::LogicNegate,
            BlockKind::LogicTernary => &operators::LogicTernary,
            BlockKind::PairCreate => &structures::PairCreate,
            BlockKind::PairFirst => &structures::PAIR_FIRST,
            BlockKind::PairSecond => &structures::PAIR_SECOND,
            BlockKind::ListEmpty => &structures::ListEmpty,
            BlockKind::ListCons => &structures::ListCons,
            BlockKind::ListCreateWith => &structures::ListCreateWith,
            BlockKind::Lambda => &functions::Lambda,
            BlockKind::LambdaApp => &functions::LambdaApp,
            BlockKind::Let => &functions::Let,
            BlockKind::VariablesGet => &functions::VariablesGet,
            BlockKind::PrintValue => &statements::PrintValue,
            BlockKind::RepeatTimes => &statements::RepeatTimes,
        }
    }
}

/// The concrete type named by a nominal tag.
pub(crate) fn concrete(tag: &str) -> Ty {
    match tag {
        "Int" => Ty::int(),
        "Float" => Ty::float(),
        "Bool" => Ty::bool(),
        other => panic!("`{}` is not a nullary type", other),
    }
}
