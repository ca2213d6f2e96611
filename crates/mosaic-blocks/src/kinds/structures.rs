use mosaic_common::BlockId;
use mosaic_typeck::Ty;

use super::{BlockKind, BlockType};
use crate::block::Field;
use crate::workspace::Workspace;

pub(crate) struct PairCreate;

impl BlockType for PairCreate {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, Some(&["Pair"]));
        let first = ws.append_value_input(block, "FIRST", None);
        ws.append_field(block, first, Field::label("pair"));
        let second = ws.append_value_input(block, "SECOND", None);
        ws.append_field(block, second, Field::label(","));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        let a = ws.fresh_type();
        let b = ws.fresh_type();
        ws.set_input_type(block, "FIRST", a.clone());
        ws.set_input_type(block, "SECOND", b.clone());
        ws.set_output_type(block, Ty::pair(a, b));
    }
}

/// Projection out of a pair.
pub(crate) struct PairProjection {
    label: &'static str,
    first: bool,
}

pub(crate) static PAIR_FIRST: PairProjection = PairProjection {
    label: "first of",
    first: true,
};

pub(crate) static PAIR_SECOND: PairProjection = PairProjection {
    label: "second of",
    first: false,
};

impl BlockType for PairProjection {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, None);
        let pair = ws.append_value_input(block, "PAIR", Some(&["Pair"]));
        ws.append_field(block, pair, Field::label(self.label));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        let a = ws.fresh_type();
        let b = ws.fresh_type();
        let result = if self.first { a.clone() } else { b.clone() };
        ws.set_input_type(block, "PAIR", Ty::pair(a, b));
        ws.set_output_type(block, result);
    }
}

pub(crate) struct ListEmpty;

impl BlockType for ListEmpty {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, Some(&["List"]));
        let row = ws.append_dummy_input(block, "");
        ws.append_field(block, row, Field::label("[]"));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        let elem = ws.fresh_type();
        ws.set_output_type(block, Ty::list(elem));
    }
}

pub(crate) struct ListCons;

impl BlockType for ListCons {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, Some(&["List"]));
        ws.append_value_input(block, "FIRST", None);
        let rest = ws.append_value_input(block, "REST", Some(&["List"]));
        ws.append_field(block, rest, Field::label("::"));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        let elem = ws.fresh_type();
        ws.set_input_type(block, "FIRST", elem.clone());
        ws.set_input_type(block, "REST", Ty::list(elem.clone()));
        ws.set_output_type(block, Ty::list(elem));
    }
}

const ITEM_PREFIX: &str = "ADD";
const DEFAULT_ITEMS: usize = 2;

/// A list literal whose item sockets are reconfigured by a mutator.
pub(crate) struct ListCreateWith;

fn item_inputs(ws: &Workspace, block: BlockId) -> Vec<String> {
    ws.block(block)
        .inputs()
        .iter()
        .filter(|input| input.name.starts_with(ITEM_PREFIX))
        .map(|input| input.name.clone())
        .collect()
}

impl BlockType for ListCreateWith {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, Some(&["List"]));
        let head = ws.append_dummy_input(block, "HEAD");
        ws.append_field(block, head, Field::label("list"));
        for i in 0..DEFAULT_ITEMS {
            ws.append_value_input(block, &format!("{}{}", ITEM_PREFIX, i), None);
        }
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        let elem = ws.fresh_type();
        for name in item_inputs(ws, block) {
            ws.set_input_type(block, &name, elem.clone());
        }
        ws.set_output_type(block, Ty::list(elem));
    }

    fn save_extra_state(&self, ws: &Workspace, block: BlockId) -> Option<serde_json::Value> {
        Some(serde_json::json!({ "items": item_inputs(ws, block).len() }))
    }

    fn load_extra_state(&self, ws: &mut Workspace, block: BlockId, state: &serde_json::Value) {
        match state.get("items").and_then(serde_json::Value::as_u64) {
            Some(items) => set_item_count(ws, block, items as usize),
            None => tracing::warn!(block = %block, %state, "ignoring malformed list state"),
        }
    }
}

/// Reconfigure a `list_create_with` block to hold `count` item sockets.
///
/// New sockets are appended at the end; surplus sockets are removed from the
/// highest index down, disposing whatever is plugged into them. The block's
/// tree is re-inferred afterwards.
///
/// # Panics
///
/// Panics if `block` is not a `list_create_with` block.
pub fn set_item_count(ws: &mut Workspace, block: BlockId, count: usize) {
    assert_eq!(
        ws.block(block).kind,
        BlockKind::ListCreateWith,
        "set_item_count needs a list_create_with block"
    );
    let current = item_inputs(ws, block).len();
    for i in current..count {
        ws.append_value_input(block, &format!("{}{}", ITEM_PREFIX, i), None);
    }
    for i in (count..current).rev() {
        ws.remove_input(block, &format!("{}{}", ITEM_PREFIX, i));
    }
    if ws.is_typed() {
        ws.refresh_trees(&[block]);
    }
}
