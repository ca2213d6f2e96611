//! The block node and its inputs and fields.

use std::fmt;

use mosaic_common::{BlockId, ConnectionId, VariableId};
use serde::{Deserialize, Serialize};

use crate::kinds::BlockKind;

/// Placement offset of a top-level block. Opaque to this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Coordinate { x, y }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// What an input slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A value socket; its connection is an `InputValue`.
    Value,
    /// A statement socket; its connection is a `NextStatement`.
    Statement,
    /// A row of fields with no connection.
    Dummy,
}

/// The value held by a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Static text, not user-editable and not serialized.
    Label(String),
    Text(String),
    Number(f64),
    Checkbox(bool),
    /// The selected option of a dropdown.
    Dropdown(String),
    /// A bound variable (declaration or use) owned by the block.
    Variable(VariableId),
}

/// A leaf widget on an input.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Empty for labels.
    pub name: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Field {
            name: name.into(),
            value,
        }
    }

    pub fn label(text: impl Into<String>) -> Self {
        Field::new("", FieldValue::Label(text.into()))
    }

    pub fn is_serializable(&self) -> bool {
        !self.name.is_empty() && !matches!(self.value, FieldValue::Label(_))
    }
}

/// A named slot on a block.
#[derive(Debug, Clone)]
pub struct Input {
    pub name: String,
    pub kind: InputKind,
    pub fields: Vec<Field>,
    /// Absent for dummy inputs.
    pub connection: Option<ConnectionId>,
}

/// One node of the program graph.
///
/// Blocks are owned by the workspace arena. Parent/child links and
/// connections are ids into the workspace, never references.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub(crate) inputs: Vec<Input>,
    pub(crate) output: Option<ConnectionId>,
    pub(crate) previous: Option<ConnectionId>,
    pub(crate) next: Option<ConnectionId>,
    pub(crate) parent: Option<BlockId>,
    /// Unordered; `Workspace::get_children` gives input order.
    pub(crate) children: Vec<BlockId>,
    pub(crate) disabled: bool,
    pub(crate) collapsed: bool,
    pub(crate) comment: Option<String>,
    pub(crate) offset: Coordinate,
}

impl Block {
    pub(crate) fn new(id: BlockId, kind: BlockKind) -> Self {
        Block {
            id,
            kind,
            inputs: Vec::new(),
            output: None,
            previous: None,
            next: None,
            parent: None,
            children: Vec::new(),
            disabled: false,
            collapsed: false,
            comment: None,
            offset: Coordinate::default(),
        }
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|input| input.name == name)
    }

    pub(crate) fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|input| input.name == name)
    }

    pub fn output(&self) -> Option<ConnectionId> {
        self.output
    }

    pub fn previous(&self) -> Option<ConnectionId> {
        self.previous
    }

    pub fn next(&self) -> Option<ConnectionId> {
        self.next
    }

    /// The connection through which this block plugs into a parent.
    pub fn superior_connection(&self) -> Option<ConnectionId> {
        self.output.or(self.previous)
    }

    pub fn parent(&self) -> Option<BlockId> {
        self.parent
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn offset(&self) -> Coordinate {
        self.offset
    }

    /// Every connection the block owns: output, previous, inputs, next.
    pub fn connections(&self) -> Vec<ConnectionId> {
        let mut out = Vec::new();
        out.extend(self.output);
        out.extend(self.previous);
        out.extend(self.inputs.iter().filter_map(|input| input.connection));
        out.extend(self.next);
        out
    }

    /// Connections below which children hang: input sockets, then next.
    pub fn inferior_connections(&self) -> Vec<ConnectionId> {
        let mut out: Vec<_> = self.inputs.iter().filter_map(|input| input.connection).collect();
        out.extend(self.next);
        out
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.inputs
            .iter()
            .flat_map(|input| input.fields.iter())
            .find(|field| field.name == name)
    }

    pub(crate) fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.inputs
            .iter_mut()
            .flat_map(|input| input.fields.iter_mut())
            .find(|field| field.name == name)
    }

    /// Bound variables held by this block's fields, in field order.
    pub fn variables(&self) -> Vec<VariableId> {
        self.inputs
            .iter()
            .flat_map(|input| input.fields.iter())
            .filter_map(|field| match field.value {
                FieldValue::Variable(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Name of the input that owns `conn`, if any.
    pub fn input_name_for(&self, conn: ConnectionId) -> Option<&str> {
        self.inputs
            .iter()
            .find(|input| input.connection == Some(conn))
            .map(|input| input.name.as_str())
    }
}
