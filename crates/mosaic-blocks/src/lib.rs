//! Mosaic blocks: a typed block graph with live inference and scoping.
//!
//! A [`Workspace`] owns every block, connection and bound variable in
//! id-indexed arenas. Blocks plug into each other through connections; every
//! structural edit re-resolves variable references and re-runs type
//! inference over the trees it touched, so socket types are always current.
//!
//! # Architecture
//!
//! - [`workspace`]: Arenas, lookup, inputs and fields, block properties
//! - [`block`]: Block nodes, inputs and fields
//! - [`connection`]: Connection sockets and the registry of free ones
//! - [`variable`]: Value (binding) and reference (use) variables
//! - [`edit`]: Connect, disconnect, unplug, dispose, input reconfiguration
//! - [`infer`]: Clear and infer passes over a block tree
//! - [`scope`]: Persistent environments and reference resolution
//! - [`kinds`]: The closed set of block types
//! - [`event`]: Change notifications with batching
//! - [`record`]: Nested record form for saving and loading
//! - [`descriptor`]: JSON-declared inputs and fields
//! - [`summary`]: Human-readable block text

pub mod block;
pub mod connection;
pub mod descriptor;
pub mod edit;
pub mod event;
pub mod infer;
pub mod kinds;
pub mod record;
pub mod scope;
pub mod summary;
pub mod variable;
pub mod workspace;

pub use block::{Block, Coordinate, Field, FieldValue, Input, InputKind};
pub use connection::{Connection, ConnectionKind};
pub use descriptor::{BlockDescriptor, DescriptorError};
pub use edit::ConnectError;
pub use event::{BatchToken, ChangeElement, Event, EventBus};
pub use kinds::{set_item_count, BlockKind, BlockType};
pub use mosaic_common::{BlockId, ConnectionId, VariableId, WorkspaceOptions};
pub use record::{BlockRecord, RecordError};
pub use scope::Env;
pub use variable::BoundVariable;
pub use workspace::Workspace;
