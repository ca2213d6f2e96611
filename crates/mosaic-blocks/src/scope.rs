//! Lexical scope resolution for bound variables.
//!
//! A reference resolves against the values visible at its block's position:
//! whatever is visible where the block is attached, plus whatever each
//! enclosing block declares into the particular socket on the path (a
//! lambda's parameter is visible only in its body socket, a `let` name only
//! in its `in` socket).
//!
//! Environments are persistent: extending one allocates a new frame that
//! points at its parent, so sibling branches of a traversal never share
//! mutable state.

use std::collections::VecDeque;
use std::rc::Rc;

use mosaic_common::{BlockId, ConnectionId, VariableId};
use rustc_hash::FxHashMap;

use crate::block::FieldValue;
use crate::variable::BoundVariable;
use crate::workspace::Workspace;

struct Frame {
    bindings: FxHashMap<String, VariableId>,
    parent: Option<Rc<Frame>>,
}

/// An immutable mapping from variable name to the value it denotes.
#[derive(Clone, Default)]
pub struct Env {
    head: Option<Rc<Frame>>,
}

impl Env {
    pub fn empty() -> Self {
        Env::default()
    }

    /// A new environment with `bindings` shadowing this one.
    pub fn extend(&self, bindings: impl IntoIterator<Item = (String, VariableId)>) -> Env {
        let bindings: FxHashMap<_, _> = bindings.into_iter().collect();
        if bindings.is_empty() {
            return self.clone();
        }
        Env {
            head: Some(Rc::new(Frame {
                bindings,
                parent: self.head.clone(),
            })),
        }
    }

    /// Look up a name, innermost frame first.
    pub fn lookup(&self, name: &str) -> Option<VariableId> {
        let mut frame = self.head.as_deref();
        while let Some(current) = frame {
            if let Some(id) = current.bindings.get(name) {
                return Some(*id);
            }
            frame = current.parent.as_deref();
        }
        None
    }

    /// Visible names, innermost first, shadowed names omitted.
    pub fn names(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut frame = self.head.as_deref();
        while let Some(current) = frame {
            let mut names: Vec<_> = current.bindings.keys().cloned().collect();
            names.sort();
            for name in names {
                if !out.contains(&name) {
                    out.push(name);
                }
            }
            frame = current.parent.as_deref();
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl Workspace {
    /// Variables `block` declares into the socket behind `conn`, with names.
    fn declared_at(&self, conn: ConnectionId) -> Vec<(String, VariableId)> {
        let block = self.connection(conn).block;
        let behavior = self.block(block).kind.behavior();
        behavior
            .visible_variables(self, block, conn)
            .into_iter()
            .map(|id| (self.variable(id).name().to_string(), id))
            .collect()
    }

    /// The environment visible through connection `conn`.
    ///
    /// For an input or next connection this is what a child plugged into it
    /// would see. For an output or previous connection it is the environment
    /// of the connection it is plugged into (empty when unattached).
    pub fn env_at(&self, conn: ConnectionId) -> Env {
        let mut path = Vec::new();
        let mut current = Some(conn);
        while let Some(c) = current {
            let connection = self.connection(c);
            if connection.kind.is_superior() {
                current = connection.target;
                continue;
            }
            path.push(c);
            current = self.parent_connection(connection.block);
        }
        path.iter()
            .rev()
            .fold(Env::empty(), |env, &c| env.extend(self.declared_at(c)))
    }

    /// References owned by `block` paired with their names.
    fn references_of(&self, block: BlockId) -> Vec<(VariableId, String)> {
        self.block(block)
            .inputs()
            .iter()
            .flat_map(|input| input.fields.iter())
            .filter_map(|field| match field.value {
                FieldValue::Variable(id) => match self.variable(id) {
                    BoundVariable::Reference(r) => Some((id, r.name.clone())),
                    BoundVariable::Value(_) => None,
                },
                _ => None,
            })
            .collect()
    }

    /// Children of `block` paired with the environment each one sees.
    fn child_envs(&self, block: BlockId, env: &Env) -> Vec<(BlockId, Env)> {
        self.block(block)
            .inferior_connections()
            .into_iter()
            .filter_map(|conn| {
                let child = self.target_block(conn)?;
                Some((child, env.extend(self.declared_at(conn))))
            })
            .collect()
    }

    /// Resolve every reference in the subtree rooted at `block` against the
    /// environment visible at `at` (the inferior connection the subtree is,
    /// or would be, plugged into; `None` for top level).
    ///
    /// With `bind == false` nothing is mutated and the walk stops at the
    /// first reference that cannot resolve. With `bind == true` every
    /// reference is rebound to its value or explicitly unresolved, and the
    /// result reports whether all of them resolved.
    pub fn resolve_reference(&mut self, block: BlockId, at: Option<ConnectionId>, bind: bool) -> bool {
        if !bind {
            return self.references_resolvable(block, at);
        }
        let start = at.map(|c| self.env_at(c)).unwrap_or_default();
        let mut all_resolved = true;
        let mut queue = VecDeque::from([(block, start)]);
        while let Some((current, env)) = queue.pop_front() {
            for (id, name) in self.references_of(current) {
                let value = env.lookup(&name);
                tracing::trace!(reference = %id, name = %name, ?value, "binding reference");
                if let BoundVariable::Reference(r) = self.variable_mut(id) {
                    r.value = value;
                }
                all_resolved &= value.is_some();
            }
            queue.extend(self.child_envs(current, &env));
        }
        all_resolved
    }

    /// Non-mutating form of [`Workspace::resolve_reference`].
    pub fn references_resolvable(&self, block: BlockId, at: Option<ConnectionId>) -> bool {
        let start = at.map(|c| self.env_at(c)).unwrap_or_default();
        let mut queue = VecDeque::from([(block, start)]);
        while let Some((current, env)) = queue.pop_front() {
            if self
                .references_of(current)
                .iter()
                .any(|(_, name)| env.lookup(name).is_none())
            {
                return false;
            }
            queue.extend(self.child_envs(current, &env));
        }
        true
    }

    /// Rebind references under `block` where it currently sits.
    pub fn rebind_subtree(&mut self, block: BlockId) -> bool {
        let at = self.parent_connection(block);
        self.resolve_reference(block, at, true)
    }

    /// References in the subtree that resolve to nothing.
    pub fn unresolved_references(&self, block: BlockId) -> Vec<VariableId> {
        self.get_descendants(block)
            .into_iter()
            .flat_map(|b| self.references_of(b))
            .filter(|(id, _)| {
                self.variable(*id)
                    .as_reference()
                    .is_some_and(|r| !r.is_resolved())
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Rename the variable held by a field, fire a change event, and
    /// re-resolve the tree the block belongs to.
    ///
    /// # Panics
    ///
    /// Panics if the field does not hold a variable.
    pub fn rename_variable(&mut self, block: BlockId, field: &str, name: &str) {
        let id = self
            .field_variable(block, field)
            .unwrap_or_else(|| panic!("field `{}` of block {} is not a variable", field, block));
        let old = self.variable(id).name().to_string();
        self.variable_mut(id).set_name(name.to_string());
        self.events.fire(crate::event::Event::Change {
            block,
            element: crate::event::ChangeElement::Field,
            name: Some(field.to_string()),
            old_value: old,
            new_value: name.to_string(),
        });
        self.refresh_trees(&[block]);
    }
}
