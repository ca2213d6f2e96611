//! Nested record form of a block tree, for saving and loading.
//!
//! A record carries the block type tag, the id, every serializable field,
//! the block type's extra state, and the records plugged into each input and
//! into `next`. Loading preserves ids, then resolves references and
//! re-runs inference once for the whole tree.
//!
//! Stacks can be arbitrarily long, so saving, loading and dropping a record
//! all walk the tree with explicit stacks.

use std::collections::BTreeMap;

use mosaic_common::{BlockId, ConnectionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::{Coordinate, FieldValue};
use crate::edit::ConnectError;
use crate::kinds::BlockKind;
use crate::workspace::Workspace;

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: BlockId,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_state: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, BlockRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<BlockRecord>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub collapsed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Only written for top-level blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Coordinate>,
}

impl Drop for BlockRecord {
    fn drop(&mut self) {
        let mut stack: Vec<BlockRecord> = std::mem::take(&mut self.inputs).into_values().collect();
        stack.extend(self.next.take().map(|next| *next));
        while let Some(mut record) = stack.pop() {
            stack.extend(std::mem::take(&mut record.inputs).into_values());
            stack.extend(record.next.take().map(|next| *next));
        }
    }
}

/// Where a child record hangs off its parent.
enum Slot {
    Input(String),
    Next,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("unknown block type `{0}`")]
    UnknownBlockType(String),
    #[error("block id {0} is already in use")]
    DuplicateId(BlockId),
    #[error("block {block} has no input named `{input}`")]
    UnknownInput { block: BlockId, input: String },
    #[error("block {block} has no field named `{field}`")]
    UnknownField { block: BlockId, field: String },
    #[error("value {value} does not fit field `{field}` of block {block}")]
    BadFieldValue {
        block: BlockId,
        field: String,
        value: Value,
    },
    #[error("block {block} has no {socket} connection")]
    NoSocket { block: BlockId, socket: &'static str },
    #[error("cannot attach block {child}: {source}")]
    Connect {
        child: BlockId,
        #[source]
        source: ConnectError,
    },
}

fn field_to_json(ws: &Workspace, value: &FieldValue) -> Value {
    match value {
        FieldValue::Number(n) => Value::from(*n),
        FieldValue::Checkbox(b) => Value::Bool(*b),
        FieldValue::Text(s) | FieldValue::Dropdown(s) | FieldValue::Label(s) => Value::from(s.as_str()),
        FieldValue::Variable(id) => Value::from(ws.variable(*id).name()),
    }
}

fn push_child_records<'a>(
    record: &'a BlockRecord,
    block: BlockId,
    stack: &mut Vec<(&'a BlockRecord, BlockId, Slot)>,
) {
    if let Some(next) = &record.next {
        stack.push((next.as_ref(), block, Slot::Next));
    }
    for (name, child) in record.inputs.iter().rev() {
        stack.push((child, block, Slot::Input(name.clone())));
    }
}

impl Workspace {
    /// Snapshot `block`, its inputs and the stack below it.
    pub fn to_record(&self, block: BlockId) -> BlockRecord {
        // Pre-order; entry `i` has index `i + 1`, `block` itself is index 0.
        let mut placed: Vec<(BlockId, usize, Slot)> = Vec::new();
        let mut stack = Vec::new();
        self.push_child_blocks(block, 0, &mut stack);
        while let Some((child, parent, slot)) = stack.pop() {
            placed.push((child, parent, slot));
            self.push_child_blocks(child, placed.len(), &mut stack);
        }

        let mut root = self.record_shell(block);
        let mut records: Vec<BlockRecord> = placed.iter().map(|&(id, _, _)| self.record_shell(id)).collect();
        // Children sit after their parent, so back to front every subtree is
        // complete before it moves.
        while let (Some(record), Some((_, parent, slot))) = (records.pop(), placed.pop()) {
            let owner = match parent {
                0 => &mut root,
                p => &mut records[p - 1],
            };
            match slot {
                Slot::Input(name) => {
                    owner.inputs.insert(name, record);
                }
                Slot::Next => owner.next = Some(Box::new(record)),
            }
        }
        root
    }

    fn push_child_blocks(&self, block: BlockId, index: usize, stack: &mut Vec<(BlockId, usize, Slot)>) {
        if let Some(next) = self.get_next_block(block) {
            stack.push((next, index, Slot::Next));
        }
        for input in self.block(block).inputs().iter().rev() {
            if let Some(child) = input.connection.and_then(|c| self.target_block(c)) {
                stack.push((child, index, Slot::Input(input.name.clone())));
            }
        }
    }

    /// The record of `block` alone, without children.
    fn record_shell(&self, block: BlockId) -> BlockRecord {
        let b = self.block(block);
        let mut fields = BTreeMap::new();
        for input in b.inputs() {
            for field in input.fields.iter().filter(|f| f.is_serializable()) {
                fields.insert(field.name.clone(), field_to_json(self, &field.value));
            }
        }
        BlockRecord {
            kind: b.kind.tag().to_string(),
            id: block,
            fields,
            extra_state: b.kind.behavior().save_extra_state(self, block),
            inputs: BTreeMap::new(),
            next: None,
            disabled: b.is_disabled(),
            collapsed: b.is_collapsed(),
            comment: b.comment().map(str::to_string),
            position: b.parent().is_none().then(|| b.offset()),
        }
    }

    /// Rebuild a tree from `record` with the recorded ids.
    ///
    /// Events are delivered as one batch. On error every block created so
    /// far is disposed again and the workspace is left as it was.
    pub fn from_record(&mut self, record: &BlockRecord) -> Result<BlockId, RecordError> {
        let token = self.begin_batch();
        let mut created = Vec::new();
        let result = self.build_record(record, &mut created);
        match result {
            Ok(root) => {
                self.end_batch(token);
                self.refresh_trees(&[root]);
                tracing::debug!(block = %root, blocks = created.len(), "loaded record");
                Ok(root)
            }
            Err(err) => {
                for &id in created.iter().rev() {
                    if self.contains_block(id) {
                        self.dispose(id, false);
                    }
                }
                self.end_batch(token);
                tracing::warn!(%err, "record rejected");
                Err(err)
            }
        }
    }

    /// Create every block in pre-order, then plug children in back to
    /// front so each parent is still top-level when its children attach.
    fn build_record(
        &mut self,
        record: &BlockRecord,
        created: &mut Vec<BlockId>,
    ) -> Result<BlockId, RecordError> {
        let root = self.build_record_block(record, created)?;
        let mut pending: Vec<(ConnectionId, BlockId)> = Vec::new();
        let mut stack = Vec::new();
        push_child_records(record, root, &mut stack);
        while let Some((child_record, parent, slot)) = stack.pop() {
            let conn = match slot {
                Slot::Input(name) => self
                    .input_connection(parent, &name)
                    .ok_or(RecordError::UnknownInput {
                        block: parent,
                        input: name,
                    })?,
                Slot::Next => self.block(parent).next().ok_or(RecordError::NoSocket {
                    block: parent,
                    socket: "next",
                })?,
            };
            let child = self.build_record_block(child_record, created)?;
            pending.push((conn, child));
            push_child_records(child_record, child, &mut stack);
        }
        for (conn, child) in pending.into_iter().rev() {
            self.attach_record_child(conn, child)?;
        }
        Ok(root)
    }

    /// Create one block with its fields, extra state and properties.
    fn build_record_block(
        &mut self,
        record: &BlockRecord,
        created: &mut Vec<BlockId>,
    ) -> Result<BlockId, RecordError> {
        let kind = BlockKind::from_tag(&record.kind)
            .ok_or_else(|| RecordError::UnknownBlockType(record.kind.clone()))?;
        if self.contains_block(record.id) {
            return Err(RecordError::DuplicateId(record.id));
        }
        let block = self.new_block_with_id(kind, record.id);
        created.push(block);

        if let Some(state) = &record.extra_state {
            kind.behavior().load_extra_state(self, block, state);
        }
        for (name, value) in &record.fields {
            self.load_field(block, name, value)?;
        }
        let b = self.block_mut(block);
        b.disabled = record.disabled;
        b.collapsed = record.collapsed;
        b.comment = record.comment.clone();
        if let Some(position) = record.position {
            b.offset = position;
        }
        Ok(block)
    }

    fn attach_record_child(
        &mut self,
        conn: ConnectionId,
        child: BlockId,
    ) -> Result<(), RecordError> {
        let superior = self
            .block(child)
            .superior_connection()
            .ok_or(RecordError::NoSocket {
                block: child,
                socket: "output or previous",
            })?;
        self.check_structure(conn, superior)
            .map_err(|source| RecordError::Connect { child, source })?;
        self.link(conn, superior);
        Ok(())
    }

    fn load_field(&mut self, block: BlockId, name: &str, value: &Value) -> Result<(), RecordError> {
        let bad = || RecordError::BadFieldValue {
            block,
            field: name.to_string(),
            value: value.clone(),
        };
        let current = self
            .get_field_value(block, name)
            .cloned()
            .ok_or_else(|| RecordError::UnknownField {
                block,
                field: name.to_string(),
            })?;
        let loaded = match current {
            FieldValue::Number(_) => FieldValue::Number(value.as_f64().ok_or_else(bad)?),
            FieldValue::Checkbox(_) => FieldValue::Checkbox(value.as_bool().ok_or_else(bad)?),
            FieldValue::Text(_) => FieldValue::Text(value.as_str().ok_or_else(bad)?.to_string()),
            FieldValue::Dropdown(_) => {
                FieldValue::Dropdown(value.as_str().ok_or_else(bad)?.to_string())
            }
            FieldValue::Label(_) => return Err(bad()),
            FieldValue::Variable(id) => {
                let text = value.as_str().ok_or_else(bad)?;
                self.variable_mut(id).set_name(text.to_string());
                return Ok(());
            }
        };
        if let Some(field) = self.block_mut(block).field_mut(name) {
            field.value = loaded;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_omitted() {
        let record = BlockRecord {
            kind: "int_literal".into(),
            id: BlockId(4),
            fields: BTreeMap::from([("NUM".to_string(), Value::from(3.0))]),
            extra_state: None,
            inputs: BTreeMap::new(),
            next: None,
            disabled: false,
            collapsed: false,
            comment: None,
            position: None,
        };
        insta::assert_snapshot!(
            serde_json::to_string(&record).unwrap(),
            @r#"{"type":"int_literal","id":4,"fields":{"NUM":3.0}}"#
        );
    }

    #[test]
    fn missing_keys_deserialize_to_defaults() {
        let record: BlockRecord =
            serde_json::from_str(r#"{"type":"list_empty","id":1}"#).unwrap();
        assert_eq!(record.kind, "list_empty");
        assert!(record.inputs.is_empty());
        assert!(record.next.is_none());
        assert!(!record.disabled);
    }
}
