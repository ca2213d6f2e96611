use mosaic_common::BlockId;

use super::{concrete, BlockType};
use crate::block::{Field, FieldValue};
use crate::workspace::Workspace;

/// A numeric literal with a fixed result type.
pub(crate) struct NumberLiteral {
    tag: &'static str,
}

pub(crate) static INT_LITERAL: NumberLiteral = NumberLiteral { tag: "Int" };
pub(crate) static FLOAT_LITERAL: NumberLiteral = NumberLiteral { tag: "Float" };

impl BlockType for NumberLiteral {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, Some(&[self.tag]));
        let row = ws.append_dummy_input(block, "");
        ws.append_field(block, row, Field::new("NUM", FieldValue::Number(0.0)));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output_type(block, concrete(self.tag));
    }
}

pub(crate) struct BoolLiteral;

impl BlockType for BoolLiteral {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, Some(&["Bool"]));
        let row = ws.append_dummy_input(block, "");
        ws.append_field(block, row, Field::new("BOOL", FieldValue::Checkbox(true)));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output_type(block, concrete("Bool"));
    }
}
