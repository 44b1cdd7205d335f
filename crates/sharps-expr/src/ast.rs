//! Expression AST storage.
//!
//! Nodes live in an [`ExprArena`] and reference each other by [`ExprId`].
//! The compiler rewrites trees in place through `replace`, so a parent's
//! child slot stays valid while the child's content changes.

use serde::Serialize;

/// Handle to a node in an [`ExprArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ExprId(pub u32);

/// Arena-based storage for expression nodes.
#[derive(Debug, Default, Serialize)]
pub struct ExprArena {
    pub nodes: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> ExprArena {
        ExprArena { nodes: Vec::new() }
    }

    pub fn alloc(&mut self, expr: Expr) -> ExprId {
        let index = self.nodes.len() as u32;
        self.nodes.push(expr);
        ExprId(index)
    }

    pub fn get(&self, id: ExprId) -> Option<&Expr> {
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ExprId) -> Option<&mut Expr> {
        self.nodes.get_mut(id.0 as usize)
    }

    /// Replace the node at `id`, returning the old node.
    pub fn replace(&mut self, id: ExprId, new_expr: Expr) -> Option<Expr> {
        self.nodes
            .get_mut(id.0 as usize)
            .map(|old| std::mem::replace(old, new_expr))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A parsed single-expression program: arena, root, and the original
/// source text (returned verbatim when compilation turns out to be the
/// identity).
#[derive(Debug, Serialize)]
pub struct ExprProgram {
    pub arena: ExprArena,
    pub root: ExprId,
    pub source: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Minus,
    Void,
}

/// An object literal property name as written in source.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum PropertyKey {
    Identifier(String),
    String(String),
    Number(String),
}

impl PropertyKey {
    /// The property name this key denotes.
    pub fn name(&self) -> &str {
        match self {
            PropertyKey::Identifier(s) | PropertyKey::String(s) | PropertyKey::Number(s) => s,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PropertyKind {
    /// `key: value`
    Init,
    /// `get key(…) {…}`
    Get,
    /// `set key(…) {…}`
    Set,
}

#[derive(Clone, Debug, Serialize)]
pub struct Property {
    pub key: PropertyKey,
    pub kind: PropertyKind,
    pub value: ExprId,
}

/// An expression node.
#[derive(Clone, Debug, Serialize)]
pub enum Expr {
    /// Numeric literal, as source text.
    Number { text: String },
    /// String literal, decoded.
    String { value: String },
    Bool { value: bool },
    Null,
    Identifier { name: String },
    /// `[a, , b]` - `None` elements are elisions.
    ArrayLit { elements: Vec<Option<ExprId>> },
    ObjectLit { properties: Vec<Property> },
    /// Function literal, opaque: its full source text.
    Function { text: String },
    /// Regexp literal, opaque: its full source text.
    Regex { text: String },
    Paren { expression: ExprId },
    Call { callee: ExprId, arguments: Vec<ExprId> },
    New { callee: ExprId, arguments: Vec<ExprId> },
    /// `object.property`
    Member { object: ExprId, property: String },
    /// `object[index]`
    Index { object: ExprId, index: ExprId },
    /// `target = value`
    Assign { target: ExprId, value: ExprId },
    /// `a, b, c`
    Comma { expressions: Vec<ExprId> },
    Unary { op: UnaryOp, operand: ExprId },
    /// `#n=` applied to the immediately following object or array literal.
    SharpDef { label: u32, body: ExprId },
    /// `#n#`
    SharpRef { label: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_in_place() {
        let mut arena = ExprArena::new();
        let id = arena.alloc(Expr::SharpRef { label: 1 });
        let old = arena.replace(id, Expr::Number { text: "0".to_string() });
        assert!(matches!(old, Some(Expr::SharpRef { label: 1 })));
        assert!(matches!(arena.get(id), Some(Expr::Number { .. })));
    }
}
