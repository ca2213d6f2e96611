//! Structural edits: connect, disconnect, unplug, dispose, and input
//! reconfiguration.
//!
//! Each public edit runs the full protocol before returning: the
//! compatibility gate, the link or unlink itself (tree, targets, registry,
//! event), then, in typed workspaces, reference rebinding followed by a clear
//! and infer pass over every tree the edit touched.

use mosaic_common::{BlockId, ConnectionId};
use mosaic_typeck::Ty;

use crate::block::FieldValue;
use crate::connection::{checks_intersect, ConnectionKind};
use crate::event::Event;
use crate::variable::BoundVariable;
use crate::workspace::Workspace;

/// Why two connections cannot be joined.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectError {
    #[error("{0} and {1} belong to the same block")]
    SelfConnection(ConnectionId, ConnectionId),
    #[error("{kind:?} cannot plug into {other:?}")]
    WrongKind {
        kind: ConnectionKind,
        other: ConnectionKind,
    },
    #[error("{0} is already connected elsewhere")]
    AlreadyConnected(ConnectionId),
    #[error("nominal checks of {0} and {1} do not intersect")]
    ChecksFailed(ConnectionId, ConnectionId),
    #[error("connecting would make block {0} its own ancestor")]
    Cycle(BlockId),
    #[error("type {found} does not fit socket of type {expected}")]
    TypeMismatch { expected: Ty, found: Ty },
    #[error("block {0} has references that are not visible at the target socket")]
    UnresolvedReferences(BlockId),
}

impl Workspace {
    /// Orient a pair of connections as (inferior, superior).
    fn orient(&self, a: ConnectionId, b: ConnectionId) -> (ConnectionId, ConnectionId) {
        if self.connection(a).kind.is_superior() {
            (b, a)
        } else {
            (a, b)
        }
    }

    /// Kind, occupancy, nominal and cycle checks; everything that does not
    /// involve types or scope.
    pub(crate) fn check_structure(&self, a: ConnectionId, b: ConnectionId) -> Result<(), ConnectError> {
        let ca = self.connection(a);
        let cb = self.connection(b);
        if ca.block == cb.block {
            return Err(ConnectError::SelfConnection(a, b));
        }
        if ca.kind.opposite() != cb.kind {
            return Err(ConnectError::WrongKind {
                kind: ca.kind,
                other: cb.kind,
            });
        }
        if ca.target.is_some_and(|t| t != b) {
            return Err(ConnectError::AlreadyConnected(a));
        }
        if cb.target.is_some_and(|t| t != a) {
            return Err(ConnectError::AlreadyConnected(b));
        }
        if !checks_intersect(ca.check(), cb.check()) {
            return Err(ConnectError::ChecksFailed(a, b));
        }
        let (inferior, superior) = self.orient(a, b);
        let parent = self.connection(inferior).block;
        let child = self.connection(superior).block;
        if ca.target != Some(b) && self.is_ancestor_or_self(child, parent) {
            return Err(ConnectError::Cycle(child));
        }
        Ok(())
    }

    /// The full compatibility gate used before every connect.
    pub fn check_connection(&mut self, a: ConnectionId, b: ConnectionId) -> Result<(), ConnectError> {
        self.check_structure(a, b)?;
        if !self.is_typed() || self.connection(a).target == Some(b) {
            return Ok(());
        }
        let (inferior, superior) = self.orient(a, b);
        let expected = self.connection(inferior).type_expr.clone();
        let found = self.connection(superior).type_expr.clone();
        if let (Some(expected), Some(found)) = (expected, found) {
            if !self.types.probe_unify(&expected, &found) {
                return Err(ConnectError::TypeMismatch {
                    expected: self.types.resolve(expected),
                    found: self.types.resolve(found),
                });
            }
        }
        let child = self.connection(superior).block;
        if self.options.resolve_on_connect && !self.references_resolvable(child, Some(inferior)) {
            return Err(ConnectError::UnresolvedReferences(child));
        }
        Ok(())
    }

    pub fn can_connect(&mut self, a: ConnectionId, b: ConnectionId) -> bool {
        self.check_connection(a, b).is_ok()
    }

    /// Plug two connections together.
    ///
    /// Nothing changes when the gate refuses. On success the block owning
    /// the superior side becomes a child of the other block.
    pub fn connect(&mut self, a: ConnectionId, b: ConnectionId) -> Result<(), ConnectError> {
        self.check_connection(a, b)?;
        if self.connection(a).target == Some(b) {
            return Ok(());
        }
        let (inferior, superior) = self.orient(a, b);
        self.link(inferior, superior);
        let child = self.connection(superior).block;
        self.refresh_trees(&[child]);
        Ok(())
    }

    /// Link without any gate, tree passes excluded.
    pub(crate) fn link(&mut self, inferior: ConnectionId, superior: ConnectionId) {
        let parent = self.connection(inferior).block;
        let child = self.connection(superior).block;
        let old_coordinate = self.block(child).offset;

        self.connection_mut(inferior).target = Some(superior);
        self.connection_mut(superior).target = Some(inferior);
        self.connection_db.unregister(inferior);
        self.connection_db.unregister(superior);
        self.set_parent(child, Some(parent));

        let new_input = self.block(parent).input_name_for(inferior).map(str::to_string);
        tracing::debug!(parent = %parent, child = %child, input = ?new_input, "connected");
        self.events.fire(Event::Move {
            block: child,
            old_parent: None,
            old_input: None,
            old_coordinate: Some(old_coordinate),
            new_parent: Some(parent),
            new_input,
            new_coordinate: None,
        });
    }

    /// Unlink a connection from its target, tree passes excluded.
    ///
    /// Returns the (parent, child) pair that was separated.
    pub(crate) fn unlink(&mut self, conn: ConnectionId, fire: bool) -> (BlockId, BlockId) {
        let target = self
            .connection(conn)
            .target
            .unwrap_or_else(|| panic!("{} is not connected", conn));
        let (inferior, superior) = self.orient(conn, target);
        let parent = self.connection(inferior).block;
        let child = self.connection(superior).block;
        let old_input = self.block(parent).input_name_for(inferior).map(str::to_string);

        self.connection_mut(inferior).target = None;
        self.connection_mut(superior).target = None;
        self.connection_db.register(inferior);
        self.connection_db.register(superior);
        self.set_parent(child, None);

        tracing::debug!(parent = %parent, child = %child, input = ?old_input, "disconnected");
        if fire {
            let offset = self.block(child).offset;
            self.events.fire(Event::Move {
                block: child,
                old_parent: Some(parent),
                old_input,
                old_coordinate: None,
                new_parent: None,
                new_input: None,
                new_coordinate: Some(offset),
            });
        }
        (parent, child)
    }

    /// Separate `conn` from its target. Both sides stay valid for reuse.
    ///
    /// # Panics
    ///
    /// Panics if `conn` is not connected.
    pub fn disconnect(&mut self, conn: ConnectionId) {
        let (parent, child) = self.unlink(conn, true);
        self.refresh_trees(&[parent, child]);
    }

    /// Move `child` under `parent` (or to top level) in the tree.
    ///
    /// # Panics
    ///
    /// Panics if the child's superior connection does not agree with the
    /// requested parent.
    fn set_parent(&mut self, child: BlockId, parent: Option<BlockId>) {
        let attached_to = self
            .parent_connection(child)
            .map(|conn| self.connection(conn).block);
        assert_eq!(
            attached_to, parent,
            "block {} must be connected to its new parent through its output or previous connection",
            child
        );
        if let Some(old) = self.block(child).parent {
            self.block_mut(old).children.retain(|c| *c != child);
        }
        self.block_mut(child).parent = parent;
        match parent {
            Some(parent) => {
                self.block_mut(parent).children.push(child);
                self.remove_top_block(child);
            }
            None => self.add_top_block(child),
        }
    }

    /// Detach `block` from whatever it is plugged into.
    ///
    /// For a statement block with `heal`, the block below it is reattached
    /// to the block above it when their connections are still compatible,
    /// otherwise it is left as a new top-level stack. Without `heal` the rest
    /// of the stack moves with the unplugged block.
    pub fn unplug(&mut self, block: BlockId, heal: bool) {
        let mut touched = vec![block];
        let superior = self.block(block).superior_connection();
        let Some(above) = superior.and_then(|c| self.connection(c).target) else {
            return;
        };
        let above_block = self.connection(above).block;
        touched.push(above_block);

        let below = self.block(block).next.and_then(|next| {
            let target = self.connection(next).target?;
            Some((next, target))
        });
        match below {
            Some((next, below_prev)) if heal && self.connection(above).kind == ConnectionKind::NextStatement => {
                let below_block = self.connection(below_prev).block;
                touched.push(below_block);
                self.unlink(next, true);
                self.unlink(above, true);
                match self.check_structure(above, below_prev) {
                    Ok(()) => self.link(above, below_prev),
                    Err(err) => {
                        tracing::debug!(block = %below_block, %err, "stack not healed");
                    }
                }
            }
            _ => {
                self.unlink(above, true);
            }
        }
        self.refresh_trees(&touched);
    }

    /// Dispose a block and everything plugged into its inputs.
    ///
    /// The block is first unplugged (healing the stack if asked). A block
    /// still hanging below it in a statement stack survives as a new
    /// top-level stack. Descendants are then released children first, each
    /// severed from its parent before its connections and variables are
    /// freed; references to freed values become unresolved.
    pub fn dispose(&mut self, block: BlockId, heal: bool) {
        let old_parent = self.block(block).parent;
        self.unplug(block, heal);
        let mut survivors: Vec<BlockId> = old_parent.into_iter().collect();
        if let Some(next) = self.block(block).next {
            if self.connection(next).target.is_some() {
                let (_, below) = self.unlink(next, true);
                survivors.push(below);
            }
        }

        let doomed = self.get_descendants(block);
        for &id in doomed.iter().rev() {
            self.release(id);
        }
        tracing::debug!(block = %block, count = doomed.len(), "disposed");
        self.events.fire(Event::Delete { block, ids: doomed });
        self.refresh_trees(&survivors);
    }

    /// Dispose using the workspace's configured healing default.
    pub fn delete_block(&mut self, block: BlockId) {
        let heal = self.options.heal_stack_on_delete;
        self.dispose(block, heal);
    }

    /// Free one block whose children have already been freed.
    fn release(&mut self, id: BlockId) {
        if let Some(superior) = self.block(id).superior_connection() {
            if self.connection(superior).target.is_some() {
                self.unlink(superior, false);
            }
        }
        for conn in self.block(id).connections() {
            self.dispose_connection(conn);
        }
        for var in self.block(id).variables() {
            self.dispose_variable(var);
        }
        self.remove_top_block(id);
        self.blocks.remove(&id);
    }

    /// # Panics
    ///
    /// Panics if the connection is still connected.
    fn dispose_connection(&mut self, conn: ConnectionId) {
        assert!(
            self.connection(conn).target.is_none(),
            "{} must be disconnected before it is disposed",
            conn
        );
        self.connection_db.unregister(conn);
        self.connections[conn.0 as usize] = None;
    }

    fn dispose_variable(&mut self, var: mosaic_common::VariableId) {
        if let BoundVariable::Value(_) = self.variable(var) {
            for slot in self.variables.iter_mut().flatten() {
                if let BoundVariable::Reference(r) = slot {
                    if r.value == Some(var) {
                        r.value = None;
                    }
                }
            }
        }
        self.variables[var.0 as usize] = None;
    }

    /// Replace the nominal check of a connection. A connection whose target
    /// no longer passes is disconnected.
    pub fn set_check(&mut self, conn: ConnectionId, check: Option<&[&str]>) {
        self.connection_mut(conn).check =
            check.map(|tags| tags.iter().map(|t| t.to_string()).collect());
        if let Some(target) = self.connection(conn).target {
            if !checks_intersect(self.connection(conn).check(), self.connection(target).check()) {
                tracing::debug!(connection = %conn, "check no longer satisfied, disconnecting");
                self.disconnect(conn);
            }
        }
    }

    // ── Input reconfiguration ───────────────────────────────────────────

    /// Remove an input, disposing any block plugged into it (for a statement
    /// input, the whole stack).
    ///
    /// # Panics
    ///
    /// Panics if the block has no input with that name.
    pub fn remove_input(&mut self, block: BlockId, name: &str) {
        let index = self
            .block(block)
            .input_index(name)
            .unwrap_or_else(|| panic!("block {} has no input named `{}`", block, name));
        let mut stack = Vec::new();
        let mut current = self.input_target_block(block, name);
        while let Some(child) = current {
            stack.push(child);
            current = self.get_next_block(child);
        }
        for child in stack.into_iter().rev() {
            self.dispose(child, false);
        }
        let input = self.block_mut(block).inputs.remove(index);
        for field in &input.fields {
            if let FieldValue::Variable(var) = field.value {
                self.dispose_variable(var);
            }
        }
        if let Some(conn) = input.connection {
            self.dispose_connection(conn);
        }
    }

    /// Move the input at `from` so it sits before the input now at `to`
    /// (`to == len` moves it to the end). Connected children stay attached.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range or they are equal.
    pub fn move_numbered_input_before(&mut self, block: BlockId, from: usize, to: usize) {
        let len = self.block(block).inputs.len();
        assert!(from < len, "input index {} out of range for block {}", from, block);
        assert!(to <= len, "reference index {} out of range for block {}", to, block);
        assert_ne!(from, to, "cannot move input {} before itself", from);
        let inputs = &mut self.block_mut(block).inputs;
        let input = inputs.remove(from);
        let to = if from < to { to - 1 } else { to };
        inputs.insert(to, input);
    }

    /// Move the named input before `before`, or to the end when `None`.
    ///
    /// # Panics
    ///
    /// Panics if either name is unknown.
    pub fn move_input_before(&mut self, block: BlockId, name: &str, before: Option<&str>) {
        let b = self.block(block);
        let from = b
            .input_index(name)
            .unwrap_or_else(|| panic!("block {} has no input named `{}`", block, name));
        let to = match before {
            Some(other) => b
                .input_index(other)
                .unwrap_or_else(|| panic!("block {} has no input named `{}`", block, other)),
            None => b.inputs.len(),
        };
        if from == to || from + 1 == to {
            return;
        }
        self.move_numbered_input_before(block, from, to);
    }
}
