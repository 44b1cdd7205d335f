//! Literal graph parser.
//!
//! Parses sharp object text whose leaf values are plain literals directly
//! into a live graph, in one pass with one token of lookahead and no
//! backtracking. Cycles need no later link-fixing: a labeled container is
//! allocated and registered in the sharp table *before* its members are
//! parsed, so a backreference anywhere inside its own subtree resolves
//! immediately to the still-incomplete container.

use rustc_hash::FxHashMap;
use sharps_common::{SharpError, SharpResult, limits};
use sharps_graph::{PropertySlot, ValueArena, ValueId};
use sharps_scanner::{LiteralToken, LiteralTokenKind, tokenize};
use tracing::debug;

/// A parsed graph: the arena holding every node, plus the root handle.
#[derive(Debug)]
pub struct ParsedGraph {
    pub arena: ValueArena,
    pub root: ValueId,
}

/// Parse `text` as exactly one value. Trailing content after the
/// top-level value is an error.
pub fn parse_literal(text: &str) -> SharpResult<ParsedGraph> {
    debug!(len = text.len(), "parsing sharp object literal");
    let tokens = tokenize(text)?;
    let mut parser = Parser::new(tokens, text.len() as u32);
    let root = parser.parse_value()?;

    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(SharpError::grammar(
            extra.span.start,
            "unexpected trailing characters after the top-level value",
        ));
    }

    debug!(
        nodes = parser.arena.len(),
        labels = parser.sharps.len(),
        "parsed sharp object literal"
    );
    Ok(ParsedGraph {
        arena: parser.arena,
        root,
    })
}

struct Parser {
    tokens: Vec<LiteralToken>,
    pos: usize,
    /// Byte length of the input, where "unexpected end" errors point.
    end_offset: u32,
    arena: ValueArena,
    /// The sharp table: labels defined so far, open or complete.
    sharps: FxHashMap<u32, ValueId>,
    depth: u32,
}

impl Parser {
    fn new(tokens: Vec<LiteralToken>, end_offset: u32) -> Parser {
        Parser {
            tokens,
            pos: 0,
            end_offset,
            arena: ValueArena::new(),
            sharps: FxHashMap::default(),
            depth: 0,
        }
    }

    fn peek(&self) -> SharpResult<&LiteralToken> {
        self.tokens
            .get(self.pos)
            .ok_or_else(|| SharpError::grammar(self.end_offset, "unexpected end of input"))
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Current offset for error reporting.
    fn offset(&self) -> u32 {
        self.tokens
            .get(self.pos)
            .map_or(self.end_offset, |t| t.span.start)
    }

    fn parse_value(&mut self) -> SharpResult<ValueId> {
        if self.depth >= limits::MAX_NESTING_DEPTH {
            return Err(SharpError::grammar(self.offset(), "nesting too deep"));
        }
        self.depth += 1;
        let result = self.parse_value_inner();
        self.depth -= 1;
        result
    }

    fn parse_value_inner(&mut self) -> SharpResult<ValueId> {
        let token = self.peek()?;
        let offset = token.span.start;
        match &token.kind {
            LiteralTokenKind::OpenBrace => self.parse_object(None),
            LiteralTokenKind::OpenBracket => self.parse_array(None),
            LiteralTokenKind::True => {
                self.advance();
                Ok(self.arena.alloc_bool(true))
            }
            LiteralTokenKind::False => {
                self.advance();
                Ok(self.arena.alloc_bool(false))
            }
            LiteralTokenKind::Null => {
                self.advance();
                Ok(self.arena.alloc_null())
            }
            LiteralTokenKind::Number(n) => {
                let n = *n;
                self.advance();
                Ok(self.arena.alloc_number(n))
            }
            LiteralTokenKind::String(s) => {
                let s = s.clone();
                self.advance();
                Ok(self.arena.alloc_string(s))
            }
            LiteralTokenKind::SharpRef(label) => {
                let label = *label;
                let id = *self
                    .sharps
                    .get(&label)
                    .ok_or(SharpError::UndefinedLabel { label })?;
                self.advance();
                Ok(id)
            }
            LiteralTokenKind::SharpDef(label) => {
                let label = *label;
                if self.sharps.contains_key(&label) {
                    return Err(SharpError::DuplicateLabel { label });
                }
                self.advance();
                match self.peek()?.kind {
                    LiteralTokenKind::OpenBrace => self.parse_object(Some(label)),
                    LiteralTokenKind::OpenBracket => self.parse_array(Some(label)),
                    _ => Err(SharpError::grammar(
                        self.offset(),
                        format!("object or array literal expected after #{label}="),
                    )),
                }
            }
            _ => Err(SharpError::grammar(offset, "unexpected token")),
        }
    }

    /// `object := "{" (member ("," member)*)? "}"`. When `label` is set,
    /// the empty object is registered in the sharp table before any member
    /// is parsed.
    fn parse_object(&mut self, label: Option<u32>) -> SharpResult<ValueId> {
        self.advance(); // {
        let obj = self.arena.alloc_object();
        if let Some(label) = label {
            self.sharps.insert(label, obj);
        }

        if self.peek()?.kind != LiteralTokenKind::CloseBrace {
            loop {
                let key = match &self.peek()?.kind {
                    LiteralTokenKind::String(s) => s.clone(),
                    _ => {
                        return Err(SharpError::grammar(
                            self.offset(),
                            "expected string property name in object literal",
                        ));
                    }
                };
                self.advance();

                if self.peek()?.kind != LiteralTokenKind::Colon {
                    return Err(SharpError::grammar(
                        self.offset(),
                        "expected ':' after property name in object literal",
                    ));
                }
                self.advance();

                let value = self.parse_value()?;
                // Ordinary literal attributes: enumerable, writable,
                // configurable.
                if let Some(object) = self.arena.object_mut(obj) {
                    object.define(key, PropertySlot::data(value));
                }

                match self.peek()?.kind {
                    LiteralTokenKind::Comma => self.advance(),
                    LiteralTokenKind::CloseBrace => break,
                    _ => {
                        return Err(SharpError::grammar(
                            self.offset(),
                            "expected ',' or '}' next in an object literal",
                        ));
                    }
                }
            }
        }
        self.advance(); // }
        Ok(obj)
    }

    /// `array := "[" elements? "]"` with elision: a `,` where a value
    /// would start contributes a hole, and `[1,,]` has a trailing hole
    /// while `[1,]` does not.
    fn parse_array(&mut self, label: Option<u32>) -> SharpResult<ValueId> {
        self.advance(); // [
        let arr = self.arena.alloc_array();
        if let Some(label) = label {
            self.sharps.insert(label, arr);
        }

        loop {
            match self.peek()?.kind {
                LiteralTokenKind::CloseBracket => break,
                LiteralTokenKind::Comma => {
                    // Elided element.
                    if let Some(array) = self.arena.array_mut(arr) {
                        array.push_hole();
                    }
                    self.advance();
                }
                _ => {
                    let value = self.parse_value()?;
                    if let Some(array) = self.arena.array_mut(arr) {
                        array.push(PropertySlot::data(value));
                    }
                    match self.peek()?.kind {
                        LiteralTokenKind::Comma => self.advance(),
                        LiteralTokenKind::CloseBracket => break,
                        _ => {
                            return Err(SharpError::grammar(
                                self.offset(),
                                "expected ',' or ']' after an array element",
                            ));
                        }
                    }
                }
            }
        }
        self.advance(); // ]
        Ok(arr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharps_graph::Value;

    fn value_of(graph: &ParsedGraph, slot: &Option<PropertySlot>) -> ValueId {
        match slot {
            Some(PropertySlot::Value { value, .. }) => *value,
            other => panic!("expected value slot, got {other:?} in {graph:?}"),
        }
    }

    #[test]
    fn test_primitives() {
        let graph = parse_literal("true").unwrap();
        assert_eq!(graph.arena.get(graph.root), Some(&Value::Bool(true)));

        let graph = parse_literal("-0").unwrap();
        match graph.arena.get(graph.root) {
            Some(Value::Number(n)) => assert!(*n == 0.0 && n.is_sign_negative()),
            other => panic!("unexpected {other:?}"),
        }

        let graph = parse_literal("\"hi\\n\"").unwrap();
        assert_eq!(
            graph.arena.get(graph.root),
            Some(&Value::String("hi\n".to_string()))
        );
    }

    #[test]
    fn test_key_order_preserved() {
        let graph = parse_literal(r#"{"b":1,"a":2,"0":3}"#).unwrap();
        let obj = graph.arena.object(graph.root).unwrap();
        let keys: Vec<&str> = obj.properties.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["b", "a", "0"]);
    }

    #[test]
    fn test_self_cycle_object() {
        let graph = parse_literal(r##"#1={"me":#1#}"##).unwrap();
        let obj = graph.arena.object(graph.root).unwrap();
        let me = match &obj.properties["me"] {
            PropertySlot::Value { value, .. } => *value,
            other => panic!("unexpected slot {other:?}"),
        };
        assert_eq!(me, graph.root);
    }

    #[test]
    fn test_self_cycle_array() {
        let graph = parse_literal("#1=[#1#]").unwrap();
        let arr = graph.arena.array(graph.root).unwrap();
        assert_eq!(value_of(&graph, &arr.elements[0]), graph.root);
    }

    #[test]
    fn test_shared_subobject() {
        let graph = parse_literal("[#1=[], #1#]").unwrap();
        let arr = graph.arena.array(graph.root).unwrap();
        let first = value_of(&graph, &arr.elements[0]);
        let second = value_of(&graph, &arr.elements[1]);
        assert_eq!(first, second);
        assert_ne!(first, graph.root);
    }

    #[test]
    fn test_holes() {
        let graph = parse_literal("[1,,3]").unwrap();
        let arr = graph.arena.array(graph.root).unwrap();
        assert_eq!(arr.elements.len(), 3);
        assert!(arr.elements[0].is_some());
        assert!(arr.elements[1].is_none());
        assert!(arr.elements[2].is_some());

        // A single trailing comma adds nothing; a doubled one adds a hole.
        let graph = parse_literal("[1,]").unwrap();
        assert_eq!(graph.arena.array(graph.root).unwrap().elements.len(), 1);
        let graph = parse_literal("[1,,]").unwrap();
        let arr = graph.arena.array(graph.root).unwrap();
        assert_eq!(arr.elements.len(), 2);
        assert!(arr.elements[1].is_none());
    }

    #[test]
    fn test_undefined_label() {
        assert_eq!(
            parse_literal("#1#").unwrap_err(),
            SharpError::UndefinedLabel { label: 1 }
        );
    }

    #[test]
    fn test_duplicate_label() {
        assert_eq!(
            parse_literal(r##"#1={"a":1}#1={"b":2}"##).unwrap_err(),
            SharpError::DuplicateLabel { label: 1 }
        );
    }

    #[test]
    fn test_unterminated_array_is_grammar_error() {
        match parse_literal("[1,2").unwrap_err() {
            SharpError::Grammar { offset, .. } => assert_eq!(offset, 4),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_trailing_characters() {
        match parse_literal(r#"{"a":1} 2"#).unwrap_err() {
            SharpError::Grammar { offset, message } => {
                assert_eq!(offset, 8);
                assert!(message.contains("trailing"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_label_requires_container() {
        match parse_literal("#1=5").unwrap_err() {
            SharpError::Grammar { message, .. } => {
                assert!(message.contains("object or array literal expected"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_labelled_nested_forward_structure() {
        // Circular doubly-linked list of three nodes, from the format's
        // documentation.
        let text = r##"#1={"prev": #3={"prev":#2={"prev": #1#, "next": #3#}, "next": #1#}, "next": #2#}"##;
        let graph = parse_literal(text).unwrap();
        let one = graph.root;
        let obj1 = graph.arena.object(one).unwrap();
        let three = match obj1.properties["prev"] {
            PropertySlot::Value { value, .. } => value,
            _ => unreachable!(),
        };
        let two = match obj1.properties["next"] {
            PropertySlot::Value { value, .. } => value,
            _ => unreachable!(),
        };
        let obj2 = graph.arena.object(two).unwrap();
        match obj2.properties["prev"] {
            PropertySlot::Value { value, .. } => assert_eq!(value, one),
            _ => unreachable!(),
        }
        match obj2.properties["next"] {
            PropertySlot::Value { value, .. } => assert_eq!(value, three),
            _ => unreachable!(),
        }
    }
}
