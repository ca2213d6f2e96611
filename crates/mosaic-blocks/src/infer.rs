//! Clear and infer passes over block trees.
//!
//! Inference is a reset pass followed by an inference pass over the same
//! subtree. Both passes walk an explicit pre-order list, so arbitrarily deep
//! trees never grow the call stack. Failed unifications are attached to the
//! socket that produced them and never stop the pass.

use mosaic_common::{BlockId, ConnectionId};
use mosaic_typeck::{ConstraintOrigin, InferCtx, Ty, TypeError};

use crate::block::InputKind;
use crate::workspace::Workspace;

/// Tables smaller than this are never rebuilt.
const MIN_TYPE_TABLE: usize = 1024;

impl Workspace {
    /// Reset every type expression owned by `root` and its descendants,
    /// parents before children, and forget recorded type errors.
    ///
    /// Each socket first gets a fresh variable, then the block type
    /// re-declares its shape over it.
    pub fn clear_types(&mut self, root: BlockId) {
        if !self.is_typed() {
            return;
        }
        for block in self.get_descendants(root) {
            for conn in self.block(block).connections() {
                let types = &mut self.types;
                if let Some(Some(c)) = self.connections.get_mut(conn.0 as usize) {
                    c.type_error = None;
                    if let Some(slot) = c.type_expr.as_mut() {
                        types.clear(slot);
                    }
                }
            }
            let behavior = self.block(block).kind.behavior();
            behavior.clear_types(self, block);
        }
    }

    /// Run each block's inference over the subtree, children first, then
    /// unify references with their declarations, and return the resolved
    /// result type of `root`.
    ///
    /// Callers are expected to have cleared the subtree first; on a cleared
    /// subtree the pass is idempotent.
    pub fn infer(&mut self, root: BlockId) -> Option<Ty> {
        if !self.is_typed() {
            return None;
        }
        let order = self.get_descendants(root);
        for &block in order.iter().rev() {
            let behavior = self.block(block).kind.behavior();
            behavior.infer(self, block);
        }
        for &block in &order {
            let behavior = self.block(block).kind.behavior();
            behavior.infer_references(self, block);
        }
        let errors = self.types.take_errors();
        if !errors.is_empty() {
            tracing::debug!(root = %root, count = errors.len(), "inference finished with type errors");
        }
        self.output_type(root)
    }

    /// Clear then infer the subtree rooted at `root`.
    ///
    /// Equivalences with sockets above `root` are not rebuilt; use the tree's
    /// root block for a complete pass.
    pub fn reinfer(&mut self, root: BlockId) -> Option<Ty> {
        self.clear_types(root);
        self.infer(root)
    }

    /// Re-run scope resolution and inference for the trees containing each
    /// of `blocks`. Disposed blocks are skipped; each tree is processed once.
    pub fn refresh_trees(&mut self, blocks: &[BlockId]) {
        if !self.is_typed() {
            return;
        }
        let mut roots: Vec<BlockId> = Vec::new();
        for &block in blocks {
            if !self.contains_block(block) {
                continue;
            }
            let root = self.get_root_block(block);
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        for root in roots {
            self.resolve_reference(root, None, true);
            self.reinfer(root);
        }
        self.compact_types();
    }

    /// Every clear pass leaves the previous variables of its sockets behind.
    /// Once the table has doubled since the last rebuild, start a fresh one
    /// and re-infer every tree into it.
    fn compact_types(&mut self) {
        let before = self.types.var_count();
        if before <= 2 * self.types_baseline.max(MIN_TYPE_TABLE) {
            return;
        }
        self.types = InferCtx::new();
        for root in self.top_blocks.clone() {
            self.reinfer(root);
        }
        self.types_baseline = self.types.var_count();
        tracing::debug!(before, after = self.types_baseline, "rebuilt type table");
    }

    /// Unify every connected value input of `block` with the output type of
    /// the child plugged into it; return the block's output type.
    pub fn unify_inputs(&mut self, block: BlockId) -> Option<Ty> {
        let sockets: Vec<(String, ConnectionId)> = self
            .block(block)
            .inputs()
            .iter()
            .filter(|input| input.kind == InputKind::Value)
            .filter_map(|input| input.connection.map(|c| (input.name.clone(), c)))
            .collect();
        for (input, conn) in sockets {
            let Some(target) = self.connection(conn).target else {
                continue;
            };
            let expected = self.connection(conn).type_expr.clone();
            let found = self.connection(target).type_expr.clone();
            if let (Some(expected), Some(found)) = (expected, found) {
                self.record_unify(conn, expected, found, ConstraintOrigin::Input { block, input });
            }
        }
        let output = self.block(block).output?;
        self.connection(output).type_expr.clone()
    }

    /// Unify two types, attaching any failure to `conn`.
    pub fn record_unify(&mut self, conn: ConnectionId, expected: Ty, found: Ty, origin: ConstraintOrigin) {
        if let Err(err) = self.types.unify(expected, found, origin) {
            tracing::warn!(connection = %conn, "{}", err);
            self.connection_mut(conn).type_error = Some(err);
        }
    }

    /// The resolved type of a connection's type expression.
    pub fn type_of(&mut self, conn: ConnectionId) -> Option<Ty> {
        let ty = self.connection(conn).type_expr.clone()?;
        Some(self.types.resolve(ty))
    }

    /// The resolved type of a block's output.
    pub fn output_type(&mut self, block: BlockId) -> Option<Ty> {
        let output = self.block(block).output?;
        self.type_of(output)
    }

    /// The resolved type of a named value input.
    pub fn input_type(&mut self, block: BlockId, input: &str) -> Option<Ty> {
        let conn = self.input_connection(block, input)?;
        self.type_of(conn)
    }

    /// Resolve an arbitrary type through the workspace's unification table.
    pub fn resolve_type(&mut self, ty: Ty) -> Ty {
        self.types.resolve(ty)
    }

    /// Every socket whose last inference pass failed, in connection order.
    pub fn type_errors(&self) -> Vec<(ConnectionId, TypeError)> {
        self.connections
            .iter()
            .flatten()
            .filter_map(|conn| conn.type_error.clone().map(|err| (conn.id, err)))
            .collect()
    }

    /// Transplant type expressions from `other`'s tree onto the
    /// structurally identical tree rooted at `this`, then infer `other`'s
    /// tree so both share its equivalences.
    ///
    /// # Panics
    ///
    /// Panics if the two trees differ in block kinds, socket layout, or which
    /// sockets are occupied.
    pub fn replace_type_exprs_with(&mut self, this: BlockId, other: BlockId) {
        if !self.is_typed() {
            return;
        }
        let mut stack = vec![(this, other)];
        while let Some((a, b)) = stack.pop() {
            assert_eq!(
                self.block(a).kind,
                self.block(b).kind,
                "blocks {} and {} have different types",
                a,
                b
            );
            let conns_a = self.block(a).connections();
            let conns_b = self.block(b).connections();
            assert_eq!(
                conns_a.len(),
                conns_b.len(),
                "blocks {} and {} have different sockets",
                a,
                b
            );
            for (&ca, &cb) in conns_a.iter().zip(&conns_b) {
                let ty = self.connection(cb).type_expr.clone();
                self.connection_mut(ca).type_expr = ty;
            }

            let vars_a = self.block(a).variables();
            let vars_b = self.block(b).variables();
            for (&va, &vb) in vars_a.iter().zip(&vars_b) {
                if let Some(ty) = self.variable_type(vb).cloned() {
                    self.set_variable_type(va, ty);
                }
            }

            let below_a = self.block(a).inferior_connections();
            let below_b = self.block(b).inferior_connections();
            for (&ca, &cb) in below_a.iter().zip(&below_b) {
                match (self.target_block(ca), self.target_block(cb)) {
                    (Some(child_a), Some(child_b)) => stack.push((child_a, child_b)),
                    (None, None) => {}
                    _ => panic!("blocks {} and {} have different children", a, b),
                }
            }
        }
        let root = self.get_root_block(other);
        self.infer(root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::BlockKind;

    #[test]
    fn literal_types() {
        let mut ws = Workspace::typed();
        let i = ws.new_block(BlockKind::IntLiteral);
        let f = ws.new_block(BlockKind::FloatLiteral);
        let b = ws.new_block(BlockKind::BoolLiteral);
        assert_eq!(ws.reinfer(i), Some(Ty::int()));
        assert_eq!(ws.reinfer(f), Some(Ty::float()));
        assert_eq!(ws.reinfer(b), Some(Ty::bool()));
    }

    #[test]
    fn untyped_workspace_skips_inference() {
        let mut ws = Workspace::untyped();
        let i = ws.new_block(BlockKind::IntLiteral);
        assert_eq!(ws.reinfer(i), None);
        assert_eq!(ws.output_type(i), None);
    }

    #[test]
    fn clear_gives_fresh_variables() {
        let mut ws = Workspace::typed();
        let pair = ws.new_block(BlockKind::PairCreate);
        let before = ws.block(pair).output().and_then(|c| ws.connection(c).type_expr().cloned());
        ws.clear_types(pair);
        let after = ws.block(pair).output().and_then(|c| ws.connection(c).type_expr().cloned());
        assert_ne!(before, after);
        let out = ws.output_type(pair).unwrap();
        assert_eq!(out.head(), Some("Pair"));
    }
}
