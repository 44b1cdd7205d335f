//! Lexical analysis for the sharps notation.
//!
//! Two token surfaces share this crate:
//! - `literal` - The JSON-plus-sharps token set consumed by the literal
//!   graph parser
//! - `source` - The host-expression token set consumed by the expression
//!   parser (`sharps-expr`)
//! - `chars` - Character classification shared by both

pub mod chars;
pub mod literal;
pub mod source;

pub use literal::{LiteralToken, LiteralTokenKind, tokenize};
pub use source::{SourceScanner, SourceToken, SourceTokenKind};
