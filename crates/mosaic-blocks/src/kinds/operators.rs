use mosaic_common::BlockId;

use super::{concrete, BlockType};
use crate::block::{Field, FieldValue};
use crate::workspace::Workspace;

/// `A op B` over one operand type.
pub(crate) struct BinaryOperator {
    operand: &'static str,
    result: &'static str,
    ops: &'static [&'static str],
}

pub(crate) static INT_ARITHMETIC: BinaryOperator = BinaryOperator {
    operand: "Int",
    result: "Int",
    ops: &["+", "-", "*", "/"],
};

pub(crate) static FLOAT_ARITHMETIC: BinaryOperator = BinaryOperator {
    operand: "Float",
    result: "Float",
    ops: &["+.", "-.", "*.", "/."],
};

pub(crate) static INT_COMPARE: BinaryOperator = BinaryOperator {
    operand: "Int",
    result: "Bool",
    ops: &["=", "<>", "<", "<=", ">", ">="],
};

pub(crate) static LOGIC_OPERATION: BinaryOperator = BinaryOperator {
    operand: "Bool",
    result: "Bool",
    ops: &["&&", "||"],
};

impl BlockType for BinaryOperator {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, Some(&[self.result]));
        ws.append_value_input(block, "A", Some(&[self.operand]));
        let b = ws.append_value_input(block, "B", Some(&[self.operand]));
        ws.append_field(block, b, Field::new("OP", FieldValue::Dropdown(self.ops[0].to_string())));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_input_type(block, "A", concrete(self.operand));
        ws.set_input_type(block, "B", concrete(self.operand));
        ws.set_output_type(block, concrete(self.result));
    }
}

pub(crate) struct LogicNegate;

impl BlockType for LogicNegate {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, Some(&["Bool"]));
        let input = ws.append_value_input(block, "BOOL", Some(&["Bool"]));
        ws.append_field(block, input, Field::label("not"));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_input_type(block, "BOOL", concrete("Bool"));
        ws.set_output_type(block, concrete("Bool"));
    }
}

/// `if c then a else b`; both branches share the result type.
pub(crate) struct LogicTernary;

impl BlockType for LogicTernary {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, None);
        let cond = ws.append_value_input(block, "IF", Some(&["Bool"]));
        ws.append_field(block, cond, Field::label("if"));
        let then = ws.append_value_input(block, "THEN", None);
        ws.append_field(block, then, Field::label("then"));
        let otherwise = ws.append_value_input(block, "ELSE", None);
        ws.append_field(block, otherwise, Field::label("else"));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        let a = ws.fresh_type();
        ws.set_input_type(block, "IF", concrete("Bool"));
        ws.set_input_type(block, "THEN", a.clone());
        ws.set_input_type(block, "ELSE", a.clone());
        ws.set_output_type(block, a);
    }
}
