//! JSON descriptions of extra inputs and fields.
//!
//! ```json
//! { "inputs": [
//!     { "kind": "input_value", "name": "LIMIT", "check": ["Int"],
//!       "fields": [{ "kind": "field_label", "value": "up to" }] }
//! ] }
//! ```
//!
//! Elements with an unknown `kind` are skipped. Each skipped element is
//! logged and returned to the caller.

use mosaic_common::BlockId;
use serde::Deserialize;
use serde_json::Value;

use crate::block::{Field, FieldValue, InputKind};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BlockDescriptor {
    #[serde(default)]
    pub inputs: Vec<InputDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InputDescriptor {
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub check: Option<Vec<String>>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldDescriptor {
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl BlockDescriptor {
    pub fn from_json(text: &str) -> Result<BlockDescriptor, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// A descriptor element that was not applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DescriptorError {
    #[error("unknown input kind `{kind}` for input `{input}`")]
    UnknownInputKind { input: String, kind: String },
    #[error("input `{0}` already exists")]
    DuplicateInput(String),
    #[error("unknown field kind `{kind}` for field `{field}`")]
    UnknownFieldKind { field: String, kind: String },
    #[error("field `{field}` has an unusable value {value}")]
    BadFieldValue { field: String, value: Value },
}

fn input_kind(tag: &str) -> Option<InputKind> {
    match tag {
        "input_value" => Some(InputKind::Value),
        "input_statement" => Some(InputKind::Statement),
        "input_dummy" => Some(InputKind::Dummy),
        _ => None,
    }
}

fn field_value(desc: &FieldDescriptor) -> Result<FieldValue, DescriptorError> {
    let value = desc.value.as_ref();
    let bad = || DescriptorError::BadFieldValue {
        field: desc.name.clone(),
        value: value.cloned().unwrap_or(Value::Null),
    };
    let text = |default: &str| -> Result<String, DescriptorError> {
        match value {
            None => Ok(default.to_string()),
            Some(v) => v.as_str().map(str::to_string).ok_or_else(bad),
        }
    };
    match desc.kind.as_str() {
        "field_label" => Ok(FieldValue::Label(text("")?)),
        "field_input" => Ok(FieldValue::Text(text("")?)),
        "field_number" => match value {
            None => Ok(FieldValue::Number(0.0)),
            Some(v) => v.as_f64().map(FieldValue::Number).ok_or_else(bad),
        },
        "field_checkbox" => match value {
            None => Ok(FieldValue::Checkbox(false)),
            Some(v) => v.as_bool().map(FieldValue::Checkbox).ok_or_else(bad),
        },
        "field_dropdown" => value
            .and_then(Value::as_str)
            .map(|s| FieldValue::Dropdown(s.to_string()))
            .ok_or_else(bad),
        other => Err(DescriptorError::UnknownFieldKind {
            field: desc.name.clone(),
            kind: other.to_string(),
        }),
    }
}

impl Workspace {
    /// Append the inputs and fields of `desc` to `block`.
    ///
    /// Returns every element that was skipped. In a typed workspace the
    /// block's tree is re-inferred afterwards.
    pub fn apply_descriptor(&mut self, block: BlockId, desc: &BlockDescriptor) -> Vec<DescriptorError> {
        let mut skipped = Vec::new();
        for input in &desc.inputs {
            let Some(kind) = input_kind(&input.kind) else {
                skipped.push(DescriptorError::UnknownInputKind {
                    input: input.name.clone(),
                    kind: input.kind.clone(),
                });
                continue;
            };
            if !input.name.is_empty() && self.block(block).input(&input.name).is_some() {
                skipped.push(DescriptorError::DuplicateInput(input.name.clone()));
                continue;
            }
            let check: Option<Vec<&str>> = input
                .check
                .as_ref()
                .map(|c| c.iter().map(String::as_str).collect());
            let index = self.append_input(block, kind, &input.name, check.as_deref());
            for field in &input.fields {
                match field_value(field) {
                    Ok(value) => self.append_field(block, index, Field::new(field.name.clone(), value)),
                    Err(err) => skipped.push(err),
                }
            }
        }
        for err in &skipped {
            tracing::warn!(block = %block, %err, "skipped descriptor element");
        }
        self.refresh_trees(&[block]);
        skipped
    }
}
