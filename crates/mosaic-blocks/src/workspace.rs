//! The workspace: arenas for blocks, connections and bound variables.
//!
//! Structural edits live in [`crate::edit`], inference in
//! [`crate::infer`], scope resolution in [`crate::scope`]. This module holds
//! the arenas, block construction, and read-only enumeration.

use mosaic_common::{BlockId, ConnectionId, VariableId, WorkspaceOptions};
use mosaic_typeck::{InferCtx, Ty};
use rustc_hash::FxHashMap;

use crate::block::{Block, Coordinate, Field, FieldValue, Input, InputKind};
use crate::connection::{Connection, ConnectionDb, ConnectionKind};
use crate::event::{BatchToken, ChangeElement, Event, EventBus};
use crate::kinds::BlockKind;
use crate::variable::{BoundVariable, ReferenceVar, ValueVar};

/// Owner of a block graph.
///
/// Holds the block identity table, the top-level block list, the connection
/// and variable arenas, the registry of free connections, the unification
/// table, and the event bus.
pub struct Workspace {
    pub(crate) options: WorkspaceOptions,
    pub(crate) blocks: FxHashMap<BlockId, Block>,
    pub(crate) top_blocks: Vec<BlockId>,
    pub(crate) connections: Vec<Option<Connection>>,
    pub(crate) variables: Vec<Option<BoundVariable>>,
    pub(crate) connection_db: ConnectionDb,
    pub(crate) types: InferCtx,
    /// Table size right after the last rebuild.
    pub(crate) types_baseline: usize,
    pub(crate) events: EventBus,
    next_block_id: u32,
}

impl Workspace {
    pub fn new(options: WorkspaceOptions) -> Self {
        Workspace {
            options,
            blocks: FxHashMap::default(),
            top_blocks: Vec::new(),
            connections: Vec::new(),
            variables: Vec::new(),
            connection_db: ConnectionDb::new(),
            types: InferCtx::new(),
            types_baseline: 0,
            events: EventBus::new(),
            next_block_id: 1,
        }
    }

    pub fn typed() -> Self {
        Self::new(WorkspaceOptions::default())
    }

    pub fn untyped() -> Self {
        Self::new(WorkspaceOptions::untyped())
    }

    pub fn options(&self) -> &WorkspaceOptions {
        &self.options
    }

    pub fn is_typed(&self) -> bool {
        self.options.typed
    }

    // ── Events ──────────────────────────────────────────────────────────

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Event) + 'static) {
        self.events.subscribe(listener);
    }

    pub fn begin_batch(&mut self) -> BatchToken {
        self.events.begin_batch()
    }

    pub fn end_batch(&mut self, token: BatchToken) {
        self.events.end_batch(token);
    }

    // ── Block creation ──────────────────────────────────────────────────

    /// Create a block of the given kind as a new top-level block.
    pub fn new_block(&mut self, kind: BlockKind) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.new_block_with_id(kind, id)
    }

    /// Create a block with a caller-chosen id.
    ///
    /// # Panics
    ///
    /// Panics if the id is already in use.
    pub fn new_block_with_id(&mut self, kind: BlockKind, id: BlockId) -> BlockId {
        assert!(
            !self.blocks.contains_key(&id),
            "block id {} is already in use",
            id
        );
        self.next_block_id = self.next_block_id.max(id.0 + 1);
        self.blocks.insert(id, Block::new(id, kind));
        self.top_blocks.push(id);

        let behavior = kind.behavior();
        behavior.init(self, id);
        if self.is_typed() {
            behavior.clear_types(self, id);
        }
        tracing::trace!(block = %id, kind = kind.tag(), "created block");
        self.events.fire(Event::Create {
            block: id,
            kind: kind.tag(),
        });
        id
    }

    pub(crate) fn create_connection(
        &mut self,
        block: BlockId,
        kind: ConnectionKind,
        check: Option<&[&str]>,
    ) -> ConnectionId {
        let id = ConnectionId(self.connections.len() as u32);
        let mut conn = Connection::new(id, block, kind);
        conn.check = check.map(|tags| tags.iter().map(|t| t.to_string()).collect());
        if self.is_typed() && kind.is_value() {
            conn.type_expr = Some(self.types.fresh_var());
        }
        self.connections.push(Some(conn));
        self.connection_db.register(id);
        id
    }

    /// Give the block an output connection.
    ///
    /// # Panics
    ///
    /// Panics if the block already has a previous connection.
    pub fn set_output(&mut self, block: BlockId, check: Option<&[&str]>) {
        assert!(
            self.block(block).previous.is_none(),
            "block {} cannot have both an output and a previous connection",
            block
        );
        let conn = self.create_connection(block, ConnectionKind::Output, check);
        self.block_mut(block).output = Some(conn);
    }

    /// # Panics
    ///
    /// Panics if the block already has an output connection.
    pub fn set_previous_statement(&mut self, block: BlockId, check: Option<&[&str]>) {
        assert!(
            self.block(block).output.is_none(),
            "block {} cannot have both an output and a previous connection",
            block
        );
        let conn = self.create_connection(block, ConnectionKind::PreviousStatement, check);
        self.block_mut(block).previous = Some(conn);
    }

    pub fn set_next_statement(&mut self, block: BlockId, check: Option<&[&str]>) {
        let conn = self.create_connection(block, ConnectionKind::NextStatement, check);
        self.block_mut(block).next = Some(conn);
    }

    /// Create a bound-variable declaration owned by `block`.
    pub fn new_value(&mut self, block: BlockId, name: impl Into<String>) -> VariableId {
        let ty = if self.is_typed() {
            Some(self.types.fresh_var())
        } else {
            None
        };
        self.push_variable(BoundVariable::Value(ValueVar {
            name: name.into(),
            block,
            ty,
        }))
    }

    /// Create an unresolved bound-variable use owned by `block`.
    pub fn new_reference(&mut self, block: BlockId, name: impl Into<String>) -> VariableId {
        self.push_variable(BoundVariable::Reference(ReferenceVar {
            name: name.into(),
            block,
            value: None,
        }))
    }

    fn push_variable(&mut self, var: BoundVariable) -> VariableId {
        let id = VariableId(self.variables.len() as u32);
        self.variables.push(Some(var));
        id
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    pub fn get_block_by_id(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn contains_block(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    /// # Panics
    ///
    /// Panics if the block does not exist (never created, or disposed).
    pub fn block(&self, id: BlockId) -> &Block {
        self.blocks
            .get(&id)
            .unwrap_or_else(|| panic!("block {} does not exist", id))
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut Block {
        self.blocks
            .get_mut(&id)
            .unwrap_or_else(|| panic!("block {} does not exist", id))
    }

    /// # Panics
    ///
    /// Panics if the connection has been disposed.
    pub fn connection(&self, id: ConnectionId) -> &Connection {
        self.connections
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .unwrap_or_else(|| panic!("connection {} does not exist", id))
    }

    pub(crate) fn connection_mut(&mut self, id: ConnectionId) -> &mut Connection {
        self.connections
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("connection {} does not exist", id))
    }

    pub fn connection_exists(&self, id: ConnectionId) -> bool {
        matches!(self.connections.get(id.0 as usize), Some(Some(_)))
    }

    /// # Panics
    ///
    /// Panics if the variable has been disposed.
    pub fn variable(&self, id: VariableId) -> &BoundVariable {
        self.variables
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .unwrap_or_else(|| panic!("variable {} does not exist", id))
    }

    pub(crate) fn variable_mut(&mut self, id: VariableId) -> &mut BoundVariable {
        self.variables
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("variable {} does not exist", id))
    }

    pub fn variable_exists(&self, id: VariableId) -> bool {
        matches!(self.variables.get(id.0 as usize), Some(Some(_)))
    }

    pub fn connection_db(&self) -> &ConnectionDb {
        &self.connection_db
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// All live block ids, sorted.
    pub fn all_blocks(&self) -> Vec<BlockId> {
        let mut ids: Vec<_> = self.blocks.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Blocks with no parent, in the order they became top-level.
    pub fn top_blocks(&self) -> &[BlockId] {
        &self.top_blocks
    }

    pub(crate) fn add_top_block(&mut self, id: BlockId) {
        if !self.top_blocks.contains(&id) {
            self.top_blocks.push(id);
        }
    }

    /// Searches from the back: the block leaving the list is usually the
    /// one that joined it last.
    pub(crate) fn remove_top_block(&mut self, id: BlockId) {
        if let Some(pos) = self.top_blocks.iter().rposition(|b| *b == id) {
            self.top_blocks.remove(pos);
        }
    }

    // ── Enumeration ─────────────────────────────────────────────────────

    /// The block plugged into `conn`, if any.
    pub fn target_block(&self, conn: ConnectionId) -> Option<BlockId> {
        self.connection(conn)
            .target
            .map(|target| self.connection(target).block)
    }

    /// Children in socket order: value and statement inputs, then next.
    pub fn get_children(&self, block: BlockId) -> Vec<BlockId> {
        self.block(block)
            .inferior_connections()
            .into_iter()
            .filter_map(|conn| self.target_block(conn))
            .collect()
    }

    /// This block and every block below it, in pre-order.
    pub fn get_descendants(&self, block: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = vec![block];
        while let Some(id) = stack.pop() {
            out.push(id);
            let children = self.get_children(id);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    pub fn get_connections(&self, block: BlockId) -> Vec<ConnectionId> {
        self.block(block).connections()
    }

    pub fn get_parent(&self, block: BlockId) -> Option<BlockId> {
        self.block(block).parent
    }

    pub fn get_root_block(&self, block: BlockId) -> BlockId {
        let mut current = block;
        while let Some(parent) = self.block(current).parent {
            current = parent;
        }
        current
    }

    /// The block directly below in a statement stack.
    pub fn get_next_block(&self, block: BlockId) -> Option<BlockId> {
        self.block(block).next.and_then(|next| self.target_block(next))
    }

    /// The parent-side connection this block is plugged into.
    pub fn parent_connection(&self, block: BlockId) -> Option<ConnectionId> {
        self.block(block)
            .superior_connection()
            .and_then(|conn| self.connection(conn).target)
    }

    pub fn input_connection(&self, block: BlockId, input: &str) -> Option<ConnectionId> {
        self.block(block).input(input).and_then(|i| i.connection)
    }

    /// The child plugged into the named input.
    pub fn input_target_block(&self, block: BlockId, input: &str) -> Option<BlockId> {
        self.input_connection(block, input)
            .and_then(|conn| self.target_block(conn))
    }

    /// Whether `ancestor` is `block` or above it.
    pub fn is_ancestor_or_self(&self, ancestor: BlockId, block: BlockId) -> bool {
        let mut current = Some(block);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.block(id).parent;
        }
        false
    }

    // ── Inputs and fields ───────────────────────────────────────────────

    /// Append an input and return its index.
    ///
    /// # Panics
    ///
    /// Panics if a non-empty name is already used by another input.
    pub fn append_input(
        &mut self,
        block: BlockId,
        kind: InputKind,
        name: &str,
        check: Option<&[&str]>,
    ) -> usize {
        assert!(
            name.is_empty() || self.block(block).input(name).is_none(),
            "block {} already has an input named `{}`",
            block,
            name
        );
        let connection = match kind {
            InputKind::Value => {
                Some(self.create_connection(block, ConnectionKind::InputValue, check))
            }
            InputKind::Statement => {
                Some(self.create_connection(block, ConnectionKind::NextStatement, check))
            }
            InputKind::Dummy => None,
        };
        let inputs = &mut self.block_mut(block).inputs;
        inputs.push(Input {
            name: name.to_string(),
            kind,
            fields: Vec::new(),
            connection,
        });
        inputs.len() - 1
    }

    pub fn append_value_input(&mut self, block: BlockId, name: &str, check: Option<&[&str]>) -> usize {
        self.append_input(block, InputKind::Value, name, check)
    }

    pub fn append_statement_input(
        &mut self,
        block: BlockId,
        name: &str,
        check: Option<&[&str]>,
    ) -> usize {
        self.append_input(block, InputKind::Statement, name, check)
    }

    pub fn append_dummy_input(&mut self, block: BlockId, name: &str) -> usize {
        self.append_input(block, InputKind::Dummy, name, None)
    }

    /// Append a field to the input at `input_index`.
    pub fn append_field(&mut self, block: BlockId, input_index: usize, field: Field) {
        let inputs = &mut self.block_mut(block).inputs;
        assert!(
            input_index < inputs.len(),
            "input index {} out of range for block {}",
            input_index,
            block
        );
        inputs[input_index].fields.push(field);
    }

    /// Display text of a field value.
    pub fn field_text(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Label(s) | FieldValue::Text(s) | FieldValue::Dropdown(s) => s.clone(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Checkbox(b) => b.to_string(),
            FieldValue::Variable(id) => self.variable(*id).name().to_string(),
        }
    }

    pub fn get_field_value(&self, block: BlockId, name: &str) -> Option<&FieldValue> {
        self.block(block).field(name).map(|f| &f.value)
    }

    /// Replace a field's value and fire a change event.
    ///
    /// # Panics
    ///
    /// Panics if the field does not exist, or if either the old or new value is
    /// a variable (use [`Workspace::rename_variable`] for those).
    pub fn set_field_value(&mut self, block: BlockId, name: &str, value: FieldValue) {
        assert!(
            !matches!(value, FieldValue::Variable(_)),
            "variable fields are changed with rename_variable"
        );
        let old = {
            let field = self
                .block_mut(block)
                .field_mut(name)
                .unwrap_or_else(|| panic!("block {} has no field `{}`", block, name));
            assert!(
                !matches!(field.value, FieldValue::Variable(_)),
                "variable fields are changed with rename_variable"
            );
            std::mem::replace(&mut field.value, value.clone())
        };
        let old_value = self.field_text(&old);
        let new_value = self.field_text(&value);
        self.events.fire(Event::Change {
            block,
            element: ChangeElement::Field,
            name: Some(name.to_string()),
            old_value,
            new_value,
        });
    }

    /// The variable held by a variable field.
    pub fn field_variable(&self, block: BlockId, name: &str) -> Option<VariableId> {
        match self.get_field_value(block, name) {
            Some(FieldValue::Variable(id)) => Some(*id),
            _ => None,
        }
    }

    // ── Properties ──────────────────────────────────────────────────────

    pub fn set_disabled(&mut self, block: BlockId, disabled: bool) {
        let old = std::mem::replace(&mut self.block_mut(block).disabled, disabled);
        self.fire_property_change(block, ChangeElement::Disabled, old.to_string(), disabled.to_string());
    }

    pub fn set_collapsed(&mut self, block: BlockId, collapsed: bool) {
        let old = std::mem::replace(&mut self.block_mut(block).collapsed, collapsed);
        self.fire_property_change(block, ChangeElement::Collapsed, old.to_string(), collapsed.to_string());
    }

    pub fn set_comment(&mut self, block: BlockId, comment: Option<String>) {
        let old = std::mem::replace(&mut self.block_mut(block).comment, comment.clone());
        self.fire_property_change(
            block,
            ChangeElement::Comment,
            old.unwrap_or_default(),
            comment.unwrap_or_default(),
        );
    }

    fn fire_property_change(
        &mut self,
        block: BlockId,
        element: ChangeElement,
        old_value: String,
        new_value: String,
    ) {
        if old_value == new_value {
            return;
        }
        self.events.fire(Event::Change {
            block,
            element,
            name: None,
            old_value,
            new_value,
        });
    }

    /// Shift a top-level block's placement offset.
    pub fn move_by(&mut self, block: BlockId, dx: f64, dy: f64) {
        assert!(
            self.block(block).parent.is_none(),
            "only top-level blocks can be moved by offset"
        );
        let old = self.block(block).offset;
        let new = Coordinate::new(old.x + dx, old.y + dy);
        self.block_mut(block).offset = new;
        self.events.fire(Event::Move {
            block,
            old_parent: None,
            old_input: None,
            old_coordinate: Some(old),
            new_parent: None,
            new_input: None,
            new_coordinate: Some(new),
        });
    }

    // ── Typed helpers for block kinds ───────────────────────────────────

    /// A fresh inference variable.
    pub fn fresh_type(&mut self) -> Ty {
        self.types.fresh_var()
    }

    /// Size of the unification table, dead variables included.
    pub fn type_var_count(&self) -> usize {
        self.types.var_count()
    }

    pub fn set_output_type(&mut self, block: BlockId, ty: Ty) {
        let conn = self
            .block(block)
            .output
            .unwrap_or_else(|| panic!("block {} has no output", block));
        self.connection_mut(conn).type_expr = Some(ty);
    }

    pub fn set_input_type(&mut self, block: BlockId, input: &str, ty: Ty) {
        let conn = self
            .input_connection(block, input)
            .unwrap_or_else(|| panic!("block {} has no value input `{}`", block, input));
        self.connection_mut(conn).type_expr = Some(ty);
    }

    pub fn set_variable_type(&mut self, var: VariableId, ty: Ty) {
        match self.variable_mut(var) {
            BoundVariable::Value(value) => value.ty = Some(ty),
            BoundVariable::Reference(_) => panic!("references do not own a type"),
        }
    }

    /// The declared type of a value variable.
    pub fn variable_type(&self, var: VariableId) -> Option<&Ty> {
        self.variable(var).as_value().and_then(|v| v.ty.as_ref())
    }

    // ── Consistency ─────────────────────────────────────────────────────

    /// Check the structural invariants and describe every violation.
    ///
    /// Covers target symmetry, parent/child agreement with connections,
    /// top-level membership, and registry membership of free connections.
    pub fn verify(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for conn in self.connections.iter().flatten() {
            if !self.blocks.contains_key(&conn.block) {
                problems.push(format!("{} belongs to missing block {}", conn.id, conn.block));
            }
            match conn.target {
                Some(target) => {
                    if !self.connection_exists(target) {
                        problems.push(format!("{} targets disposed {}", conn.id, target));
                    } else if self.connection(target).target != Some(conn.id) {
                        problems.push(format!("{} -> {} is not symmetric", conn.id, target));
                    }
                    if self.connection_db.contains(conn.id) {
                        problems.push(format!("connected {} is still registered", conn.id));
                    }
                }
                None => {
                    if !self.connection_db.contains(conn.id) {
                        problems.push(format!("free {} is not registered", conn.id));
                    }
                }
            }
        }
        for id in self.connection_db.iter() {
            if !self.connection_exists(id) {
                problems.push(format!("registry holds disposed {}", id));
            }
        }
        for block in self.blocks.values() {
            let attached_to = self.parent_connection(block.id).map(|c| self.connection(c).block);
            if attached_to != block.parent {
                problems.push(format!(
                    "{} has parent {:?} but is attached to {:?}",
                    block.id, block.parent, attached_to
                ));
            }
            match block.parent {
                Some(parent) => {
                    let listed = self
                        .blocks
                        .get(&parent)
                        .is_some_and(|p| p.children.contains(&block.id));
                    if !listed {
                        problems.push(format!("{} missing from children of {}", block.id, parent));
                    }
                    if self.top_blocks.contains(&block.id) {
                        problems.push(format!("child {} is listed as top-level", block.id));
                    }
                }
                None => {
                    if !self.top_blocks.contains(&block.id) {
                        problems.push(format!("{} is not listed as top-level", block.id));
                    }
                }
            }
        }
        problems
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::typed()
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("options", &self.options)
            .field("blocks", &self.blocks.len())
            .field("top_blocks", &self.top_blocks)
            .field("free_connections", &self.connection_db.len())
            .finish()
    }
}

/// Integral numbers print without a fractional part.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_format_like_literals() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn new_block_is_top_level_and_registered() {
        let mut ws = Workspace::typed();
        let id = ws.new_block(BlockKind::IntArithmetic);
        assert_eq!(ws.top_blocks(), &[id]);
        // output + A + B
        assert_eq!(ws.get_connections(id).len(), 3);
        for conn in ws.get_connections(id) {
            assert!(ws.connection_db().contains(conn));
        }
        assert!(ws.verify().is_empty());
    }

    #[test]
    fn untyped_connections_have_no_type() {
        let mut ws = Workspace::untyped();
        let id = ws.new_block(BlockKind::IntLiteral);
        let out = ws.block(id).output().unwrap();
        assert!(ws.connection(out).type_expr().is_none());
        assert_eq!(ws.connection(out).check(), Some(&["Int".to_string()][..]));
    }

    #[test]
    #[should_panic(expected = "already has an input named `A`")]
    fn duplicate_input_name_panics() {
        let mut ws = Workspace::typed();
        let id = ws.new_block(BlockKind::IntArithmetic);
        ws.append_value_input(id, "A", None);
    }

    #[test]
    fn explicit_ids_advance_the_counter() {
        let mut ws = Workspace::typed();
        ws.new_block_with_id(BlockKind::IntLiteral, BlockId(10));
        let next = ws.new_block(BlockKind::IntLiteral);
        assert_eq!(next, BlockId(11));
    }

    #[test]
    fn property_changes_fire_events_only_on_change() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut ws = Workspace::typed();
        let id = ws.new_block(BlockKind::BoolLiteral);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        ws.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        ws.set_disabled(id, true);
        ws.set_disabled(id, true);
        ws.set_collapsed(id, true);
        ws.set_comment(id, Some("note".into()));
        ws.move_by(id, 10.0, 5.0);

        let log = log.borrow();
        assert_eq!(log.len(), 4);
        assert!(matches!(
            &log[0],
            Event::Change { element: ChangeElement::Disabled, new_value, .. } if new_value == "true"
        ));
        assert!(matches!(
            &log[3],
            Event::Move { new_coordinate: Some(c), .. } if *c == Coordinate::new(10.0, 5.0)
        ));
        assert!(ws.block(id).is_disabled());
        assert_eq!(ws.block(id).comment(), Some("note"));
    }
}
