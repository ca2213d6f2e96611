//! Human-readable block text, e.g. `let x = (1 + 2) in x`.

use mosaic_common::BlockId;

use crate::block::InputKind;
use crate::workspace::Workspace;

enum Piece {
    Text(String),
    Block { id: BlockId, parens: bool },
    Stack(BlockId),
}

/// Append a token, keeping punctuation tight.
fn push_token(out: &mut String, token: &str) {
    if token.is_empty() {
        return;
    }
    let tight = matches!(token, ";" | ")" | ",") || out.ends_with('(');
    if !out.is_empty() && !tight {
        out.push(' ');
    }
    out.push_str(token);
}

impl Workspace {
    /// Text for `block` and every statement below it.
    ///
    /// Field texts and children appear in input order, empty value sockets
    /// as `?`, statement sockets in braces, and value children that have
    /// sockets of their own in parentheses.
    pub fn summary(&self, block: BlockId) -> String {
        let mut out = String::new();
        let mut work = vec![Piece::Stack(block)];
        while let Some(piece) = work.pop() {
            match piece {
                Piece::Text(text) => push_token(&mut out, &text),
                Piece::Stack(id) => {
                    if let Some(next) = self.get_next_block(id) {
                        work.push(Piece::Stack(next));
                        work.push(Piece::Text(";".into()));
                    }
                    work.push(Piece::Block { id, parens: false });
                }
                Piece::Block { id, parens } => {
                    let pieces = self.block_pieces(id, parens);
                    work.extend(pieces.into_iter().rev());
                }
            }
        }
        out
    }

    fn block_pieces(&self, id: BlockId, parens: bool) -> Vec<Piece> {
        let mut pieces = Vec::new();
        if parens {
            pieces.push(Piece::Text("(".into()));
        }
        for input in self.block(id).inputs() {
            for field in &input.fields {
                pieces.push(Piece::Text(self.field_text(&field.value)));
            }
            let child = input.connection.and_then(|c| self.target_block(c));
            match (input.kind, child) {
                (InputKind::Value, Some(child)) => pieces.push(Piece::Block {
                    id: child,
                    parens: self.has_sockets(child),
                }),
                (InputKind::Value, None) => pieces.push(Piece::Text("?".into())),
                (InputKind::Statement, child) => {
                    pieces.push(Piece::Text("{".into()));
                    if let Some(child) = child {
                        pieces.push(Piece::Stack(child));
                    }
                    pieces.push(Piece::Text("}".into()));
                }
                (InputKind::Dummy, _) => {}
            }
        }
        if parens {
            pieces.push(Piece::Text(")".into()));
        }
        pieces
    }

    fn has_sockets(&self, id: BlockId) -> bool {
        self.block(id)
            .inputs()
            .iter()
            .any(|input| input.kind != InputKind::Dummy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_is_tight() {
        let mut out = String::new();
        for token in ["pair", "(", "1", ")", ",", "2", ";", "next"] {
            push_token(&mut out, token);
        }
        assert_eq!(out, "pair (1), 2; next");
    }
}
