use mosaic_common::BlockId;

use super::{concrete, BlockType};
use crate::block::Field;
use crate::workspace::Workspace;

pub(crate) struct PrintValue;

impl BlockType for PrintValue {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_previous_statement(block, None);
        ws.set_next_statement(block, None);
        let value = ws.append_value_input(block, "VALUE", None);
        ws.append_field(block, value, Field::label("print"));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        let any = ws.fresh_type();
        ws.set_input_type(block, "VALUE", any);
    }
}

pub(crate) struct RepeatTimes;

impl BlockType for RepeatTimes {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_previous_statement(block, None);
        ws.set_next_statement(block, None);
        let times = ws.append_value_input(block, "TIMES", Some(&["Int"]));
        ws.append_field(block, times, Field::label("repeat"));
        let body = ws.append_statement_input(block, "DO", None);
        ws.append_field(block, body, Field::label("do"));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_input_type(block, "TIMES", concrete("Int"));
    }
}
