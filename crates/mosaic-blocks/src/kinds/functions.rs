use mosaic_common::{BlockId, ConnectionId, VariableId};
use mosaic_typeck::{ConstraintOrigin, Ty};

use super::BlockType;
use crate::block::{Field, FieldValue};
use crate::workspace::Workspace;

const DEFAULT_NAME: &str = "x";

fn var_field(ws: &Workspace, block: BlockId) -> VariableId {
    ws.field_variable(block, "VAR")
        .unwrap_or_else(|| panic!("block {} has no VAR field", block))
}

/// Variables declared only into the socket named `scope_input`.
fn declared_into(ws: &Workspace, block: BlockId, conn: ConnectionId, scope_input: &str) -> Vec<VariableId> {
    if ws.input_connection(block, scope_input) == Some(conn) {
        vec![var_field(ws, block)]
    } else {
        Vec::new()
    }
}

/// `fun x -> body`.
pub(crate) struct Lambda;

impl BlockType for Lambda {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, Some(&["Function"]));
        let body = ws.append_value_input(block, "RETURN", None);
        let value = ws.new_value(block, DEFAULT_NAME);
        ws.append_field(block, body, Field::label("fun"));
        ws.append_field(block, body, Field::new("VAR", FieldValue::Variable(value)));
        ws.append_field(block, body, Field::label("->"));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        let arg = ws.fresh_type();
        let ret = ws.fresh_type();
        let value = var_field(ws, block);
        ws.set_variable_type(value, arg.clone());
        ws.set_input_type(block, "RETURN", ret.clone());
        ws.set_output_type(block, Ty::fun(arg, ret));
    }

    fn visible_variables(&self, ws: &Workspace, block: BlockId, conn: ConnectionId) -> Vec<VariableId> {
        declared_into(ws, block, conn, "RETURN")
    }
}

/// Function application `f a`.
pub(crate) struct LambdaApp;

impl BlockType for LambdaApp {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, None);
        ws.append_value_input(block, "FUN", Some(&["Function"]));
        ws.append_value_input(block, "ARG", None);
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        let arg = ws.fresh_type();
        let ret = ws.fresh_type();
        ws.set_input_type(block, "FUN", Ty::fun(arg.clone(), ret.clone()));
        ws.set_input_type(block, "ARG", arg);
        ws.set_output_type(block, ret);
    }
}

/// `let x = e1 in e2`; `x` is visible only inside `e2`.
pub(crate) struct Let;

impl BlockType for Let {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, None);
        let bound = ws.append_value_input(block, "EXP1", None);
        let value = ws.new_value(block, DEFAULT_NAME);
        ws.append_field(block, bound, Field::label("let"));
        ws.append_field(block, bound, Field::new("VAR", FieldValue::Variable(value)));
        ws.append_field(block, bound, Field::label("="));
        let body = ws.append_value_input(block, "EXP2", None);
        ws.append_field(block, body, Field::label("in"));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        let bound = ws.fresh_type();
        let result = ws.fresh_type();
        let value = var_field(ws, block);
        ws.set_variable_type(value, bound.clone());
        ws.set_input_type(block, "EXP1", bound);
        ws.set_input_type(block, "EXP2", result.clone());
        ws.set_output_type(block, result);
    }

    fn visible_variables(&self, ws: &Workspace, block: BlockId, conn: ConnectionId) -> Vec<VariableId> {
        declared_into(ws, block, conn, "EXP2")
    }
}

/// A use of a variable; its type is the type of the value it resolves to.
pub(crate) struct VariablesGet;

impl BlockType for VariablesGet {
    fn init(&self, ws: &mut Workspace, block: BlockId) {
        ws.set_output(block, None);
        let row = ws.append_dummy_input(block, "");
        let reference = ws.new_reference(block, DEFAULT_NAME);
        ws.append_field(block, row, Field::new("VAR", FieldValue::Variable(reference)));
    }

    fn clear_types(&self, ws: &mut Workspace, block: BlockId) {
        let ty = ws.fresh_type();
        ws.set_output_type(block, ty);
    }

    fn infer_references(&self, ws: &mut Workspace, block: BlockId) {
        let reference = var_field(ws, block);
        let bound = ws
            .variable(reference)
            .as_reference()
            .and_then(|r| r.value())
            .and_then(|value| ws.variable_type(value).cloned());
        let Some(value_ty) = bound else {
            return;
        };
        let Some(out_conn) = ws.block(block).output() else {
            return;
        };
        let Some(output) = ws.connection(out_conn).type_expr().cloned() else {
            return;
        };
        let origin = ConstraintOrigin::Reference {
            block,
            name: ws.variable(reference).name().to_string(),
        };
        ws.record_unify(out_conn, output, value_ty, origin);
    }
}
