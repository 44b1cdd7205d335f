//! Host-expression collaborator for the sharps compiler.
//!
//! The expression literal compiler does not parse source itself; it
//! consumes the AST produced here and renders its rewritten result back
//! through the [`Printer`]. The grammar covers literal expression shapes
//! (objects, arrays, primitives), the sharp pseudo-nodes, and the
//! expression forms serialized source text uses: function and regexp
//! literals (kept as opaque text), call/new/member/index syntax,
//! assignment, comma sequences, and the `-`/`void` prefixes.

pub mod ast;
pub mod parser;
pub mod printer;

pub use ast::{Expr, ExprArena, ExprId, ExprProgram, Property, PropertyKey, PropertyKind, UnaryOp};
pub use parser::parse_expression;
pub use printer::Printer;
