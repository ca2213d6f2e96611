//! Shared types for the Mosaic block graph (identifiers, workspace options).

pub mod ids;
pub mod options;

pub use ids::{BlockId, ConnectionId, VariableId};
pub use options::{OptionsError, WorkspaceOptions};
