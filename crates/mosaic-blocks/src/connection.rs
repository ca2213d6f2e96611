//! Typed attachment points and the registry of unattached connections.

use mosaic_common::{BlockId, ConnectionId};
use mosaic_typeck::{Ty, TypeError};
use rustc_hash::FxHashSet;

/// The four kinds of attachment point.
///
/// `Output` plugs into `InputValue`, `PreviousStatement` plugs into
/// `NextStatement`. The plugging side (`Output`/`PreviousStatement`) is the
/// superior connection: its block becomes the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    Output,
    InputValue,
    PreviousStatement,
    NextStatement,
}

impl ConnectionKind {
    /// The kind this connection can be plugged into.
    pub fn opposite(self) -> ConnectionKind {
        match self {
            ConnectionKind::Output => ConnectionKind::InputValue,
            ConnectionKind::InputValue => ConnectionKind::Output,
            ConnectionKind::PreviousStatement => ConnectionKind::NextStatement,
            ConnectionKind::NextStatement => ConnectionKind::PreviousStatement,
        }
    }

    /// Whether the owning block becomes the child when this side connects.
    pub fn is_superior(self) -> bool {
        matches!(
            self,
            ConnectionKind::Output | ConnectionKind::PreviousStatement
        )
    }

    /// Whether this connection carries a structural type expression.
    pub fn is_value(self) -> bool {
        matches!(self, ConnectionKind::Output | ConnectionKind::InputValue)
    }
}

/// A typed attachment point on a block.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    /// The block this connection belongs to.
    pub block: BlockId,
    pub kind: ConnectionKind,
    /// Accepted nominal type tags; `None` accepts anything.
    pub(crate) check: Option<Vec<String>>,
    /// Structural type, present only in typed workspaces on value connections.
    pub(crate) type_expr: Option<Ty>,
    /// The connection on another block this one is plugged into.
    pub(crate) target: Option<ConnectionId>,
    /// Failure recorded by the last inference pass for this socket.
    pub(crate) type_error: Option<TypeError>,
}

impl Connection {
    pub(crate) fn new(id: ConnectionId, block: BlockId, kind: ConnectionKind) -> Self {
        Connection {
            id,
            block,
            kind,
            check: None,
            type_expr: None,
            target: None,
            type_error: None,
        }
    }

    pub fn check(&self) -> Option<&[String]> {
        self.check.as_deref()
    }

    pub fn target(&self) -> Option<ConnectionId> {
        self.target
    }

    pub fn is_connected(&self) -> bool {
        self.target.is_some()
    }

    /// The declared (unresolved) type expression of this socket.
    pub fn type_expr(&self) -> Option<&Ty> {
        self.type_expr.as_ref()
    }

    pub fn type_error(&self) -> Option<&TypeError> {
        self.type_error.as_ref()
    }
}

/// Whether two nominal check sets accept each other.
///
/// Unconstrained on either side always passes; otherwise the sets must share
/// at least one tag.
pub fn checks_intersect(a: Option<&[String]>, b: Option<&[String]>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.iter().any(|tag| b.contains(tag)),
        _ => true,
    }
}

/// Registry of connections that are free to be connected.
///
/// Connections register when created or disconnected and unregister when
/// connected or disposed. Spatial indexing for drag search lives outside this
/// crate; this registry only answers membership.
#[derive(Debug, Default)]
pub struct ConnectionDb {
    registered: FxHashSet<ConnectionId>,
}

impl ConnectionDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ConnectionId) {
        self.registered.insert(id);
    }

    pub fn unregister(&mut self, id: ConnectionId) {
        self.registered.remove(&id);
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.registered.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Registered connections in id order.
    pub fn iter(&self) -> impl Iterator<Item = ConnectionId> {
        let mut ids: Vec<_> = self.registered.iter().copied().collect();
        ids.sort();
        ids.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn opposite_kinds_pair_up() {
        for kind in [
            ConnectionKind::Output,
            ConnectionKind::InputValue,
            ConnectionKind::PreviousStatement,
            ConnectionKind::NextStatement,
        ] {
            assert_eq!(kind.opposite().opposite(), kind);
            assert_ne!(kind.is_superior(), kind.opposite().is_superior());
        }
    }

    #[test]
    fn check_intersection() {
        let int = tags(&["Int"]);
        let num = tags(&["Int", "Float"]);
        let boolean = tags(&["Bool"]);
        assert!(checks_intersect(Some(&int), Some(&num)));
        assert!(!checks_intersect(Some(&int), Some(&boolean)));
        assert!(checks_intersect(None, Some(&boolean)));
        assert!(checks_intersect(Some(&int), None));
        assert!(checks_intersect(None, None));
    }

    #[test]
    fn registry_membership() {
        let mut db = ConnectionDb::new();
        db.register(ConnectionId(2));
        db.register(ConnectionId(1));
        db.register(ConnectionId(2));
        assert_eq!(db.len(), 2);
        assert_eq!(db.iter().collect::<Vec<_>>(), vec![ConnectionId(1), ConnectionId(2)]);
        db.unregister(ConnectionId(1));
        assert!(!db.contains(ConnectionId(1)));
        assert!(db.contains(ConnectionId(2)));
    }
}
