//! Workspace configuration.
//!
//! Options are normally built in code, but can also be read from a TOML
//! document. Missing keys fall back to their defaults:
//!
//! ```toml
//! typed = true
//! heal_stack_on_delete = false
//! ```

use serde::{Deserialize, Serialize};

/// Error returned when an options document cannot be parsed.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("invalid workspace options: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Behaviour switches for a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceOptions {
    /// Structural type inference and scope resolution are active. When false
    /// connections carry no type expressions and only nominal checks apply.
    pub typed: bool,
    /// Default for `heal` when a block is deleted through
    /// `Workspace::delete_block`.
    pub heal_stack_on_delete: bool,
    /// Reject connections whose subtree would contain references that cannot
    /// resolve at the target position.
    pub resolve_on_connect: bool,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        WorkspaceOptions {
            typed: true,
            heal_stack_on_delete: true,
            resolve_on_connect: true,
        }
    }
}

impl WorkspaceOptions {
    /// Options for a graph that only uses nominal checks.
    pub fn untyped() -> Self {
        WorkspaceOptions {
            typed: false,
            ..Self::default()
        }
    }

    /// Parse options from a TOML document.
    pub fn from_toml_str(src: &str) -> Result<Self, OptionsError> {
        Ok(toml::from_str(src)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_typed() {
        let opts = WorkspaceOptions::default();
        assert!(opts.typed);
        assert!(opts.heal_stack_on_delete);
        assert!(opts.resolve_on_connect);
        assert!(!WorkspaceOptions::untyped().typed);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let opts = WorkspaceOptions::from_toml_str("heal_stack_on_delete = false\n").unwrap();
        assert!(opts.typed);
        assert!(!opts.heal_stack_on_delete);
    }

    #[test]
    fn empty_toml_is_default() {
        let opts = WorkspaceOptions::from_toml_str("").unwrap();
        assert_eq!(opts, WorkspaceOptions::default());
    }

    #[test]
    fn bad_toml_is_an_error() {
        let err = WorkspaceOptions::from_toml_str("typed = \"yes\"").unwrap_err();
        assert!(err.to_string().starts_with("invalid workspace options"));
    }
}
