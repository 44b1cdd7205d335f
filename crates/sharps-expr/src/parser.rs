//! Recursive-descent parser for the host-expression surface.

use sharps_common::{SharpError, SharpResult, limits};
use sharps_scanner::{SourceScanner, SourceToken, SourceTokenKind};
use tracing::debug;

use crate::ast::{Expr, ExprArena, ExprId, ExprProgram, Property, PropertyKey, PropertyKind, UnaryOp};

/// Parse `text` as exactly one expression. Anything left over after the
/// expression is a "not a single expression" error.
pub fn parse_expression(text: &str) -> SharpResult<ExprProgram> {
    debug!(len = text.len(), "parsing expression source");
    let mut parser = Parser::new(text)?;
    let root = parser.parse_comma_sequence()?;
    if parser.current.kind != SourceTokenKind::EndOfInput {
        return Err(SharpError::grammar(
            parser.current.span.start,
            "expected a single expression",
        ));
    }
    Ok(ExprProgram {
        arena: parser.arena,
        root,
        source: text.to_string(),
    })
}

struct Parser<'a> {
    scanner: SourceScanner<'a>,
    current: SourceToken,
    arena: ExprArena,
    depth: u32,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> SharpResult<Parser<'a>> {
        let mut scanner = SourceScanner::new(text);
        let current = scanner.next_token()?;
        Ok(Parser {
            scanner,
            current,
            arena: ExprArena::new(),
            depth: 0,
        })
    }

    fn bump(&mut self) -> SharpResult<()> {
        self.current = self.scanner.next_token()?;
        Ok(())
    }

    fn offset(&self) -> u32 {
        self.current.span.start
    }

    fn expect(&mut self, kind: SourceTokenKind, what: &str) -> SharpResult<()> {
        if self.current.kind == kind {
            self.bump()
        } else {
            Err(SharpError::grammar(self.offset(), format!("expected {what}")))
        }
    }

    fn alloc(&mut self, expr: Expr) -> ExprId {
        self.arena.alloc(expr)
    }

    // =========================================================================
    // Expression levels
    // =========================================================================

    /// `expression := assignment ("," assignment)*`
    fn parse_comma_sequence(&mut self) -> SharpResult<ExprId> {
        let first = self.parse_assignment()?;
        if self.current.kind != SourceTokenKind::Comma {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.current.kind == SourceTokenKind::Comma {
            self.bump()?;
            expressions.push(self.parse_assignment()?);
        }
        Ok(self.alloc(Expr::Comma { expressions }))
    }

    /// `assignment := unary ("=" assignment)?`
    fn parse_assignment(&mut self) -> SharpResult<ExprId> {
        if self.depth >= limits::MAX_NESTING_DEPTH {
            return Err(SharpError::grammar(self.offset(), "nesting too deep"));
        }
        self.depth += 1;
        let result = self.parse_assignment_inner();
        self.depth -= 1;
        result
    }

    fn parse_assignment_inner(&mut self) -> SharpResult<ExprId> {
        let left = self.parse_unary()?;
        if self.current.kind != SourceTokenKind::Equals {
            return Ok(left);
        }
        self.bump()?;
        let value = self.parse_assignment()?;
        Ok(self.alloc(Expr::Assign {
            target: left,
            value,
        }))
    }

    fn parse_unary(&mut self) -> SharpResult<ExprId> {
        let op = match self.current.kind {
            SourceTokenKind::Minus => Some(UnaryOp::Minus),
            SourceTokenKind::VoidKeyword => Some(UnaryOp::Void),
            _ => None,
        };
        if let Some(op) = op {
            self.bump()?;
            let operand = self.parse_unary()?;
            return Ok(self.alloc(Expr::Unary { op, operand }));
        }
        self.parse_postfix()
    }

    /// `postfix := primary ("." ident | "[" expression "]" | "(" args ")")*`
    fn parse_postfix(&mut self) -> SharpResult<ExprId> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current.kind {
                SourceTokenKind::Dot => {
                    self.bump()?;
                    let property = match &self.current.kind {
                        SourceTokenKind::Identifier(name) => name.clone(),
                        _ => {
                            return Err(SharpError::grammar(
                                self.offset(),
                                "expected property name after '.'",
                            ));
                        }
                    };
                    self.bump()?;
                    expr = self.alloc(Expr::Member {
                        object: expr,
                        property,
                    });
                }
                SourceTokenKind::OpenBracket => {
                    self.bump()?;
                    let index = self.parse_comma_sequence()?;
                    self.expect(SourceTokenKind::CloseBracket, "']'")?;
                    expr = self.alloc(Expr::Index {
                        object: expr,
                        index,
                    });
                }
                SourceTokenKind::OpenParen => {
                    let arguments = self.parse_arguments()?;
                    expr = self.alloc(Expr::Call {
                        callee: expr,
                        arguments,
                    });
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_arguments(&mut self) -> SharpResult<Vec<ExprId>> {
        self.expect(SourceTokenKind::OpenParen, "'('")?;
        let mut arguments = Vec::new();
        if self.current.kind != SourceTokenKind::CloseParen {
            loop {
                arguments.push(self.parse_assignment()?);
                match self.current.kind {
                    SourceTokenKind::Comma => self.bump()?,
                    SourceTokenKind::CloseParen => break,
                    _ => {
                        return Err(SharpError::grammar(
                            self.offset(),
                            "expected ',' or ')' in argument list",
                        ));
                    }
                }
            }
        }
        self.bump()?; // )
        Ok(arguments)
    }

    // =========================================================================
    // Primary expressions
    // =========================================================================

    fn parse_primary(&mut self) -> SharpResult<ExprId> {
        match &self.current.kind {
            SourceTokenKind::Number(text) => {
                let text = text.clone();
                self.bump()?;
                Ok(self.alloc(Expr::Number { text }))
            }
            SourceTokenKind::String(value) => {
                let value = value.clone();
                self.bump()?;
                Ok(self.alloc(Expr::String { value }))
            }
            SourceTokenKind::Regex(text) => {
                let text = text.clone();
                self.bump()?;
                Ok(self.alloc(Expr::Regex { text }))
            }
            SourceTokenKind::TrueKeyword => {
                self.bump()?;
                Ok(self.alloc(Expr::Bool { value: true }))
            }
            SourceTokenKind::FalseKeyword => {
                self.bump()?;
                Ok(self.alloc(Expr::Bool { value: false }))
            }
            SourceTokenKind::NullKeyword => {
                self.bump()?;
                Ok(self.alloc(Expr::Null))
            }
            SourceTokenKind::Identifier(name) => {
                let name = name.clone();
                self.bump()?;
                Ok(self.alloc(Expr::Identifier { name }))
            }
            SourceTokenKind::NewKeyword => {
                self.bump()?;
                // Parse the callee with its trailing call; fold the call's
                // arguments into the new-expression.
                let callee = self.parse_postfix()?;
                match self.arena.get(callee) {
                    Some(Expr::Call { .. }) => {
                        let Some(Expr::Call { callee, arguments }) = self.arena.replace(
                            callee,
                            Expr::Null,
                        ) else {
                            unreachable!("checked call expression above");
                        };
                        Ok(self.alloc(Expr::New { callee, arguments }))
                    }
                    _ => Ok(self.alloc(Expr::New {
                        callee,
                        arguments: Vec::new(),
                    })),
                }
            }
            SourceTokenKind::FunctionKeyword => {
                let span = self.scanner.capture_function(self.current.span.start)?;
                let text = span.text(self.scanner.text()).to_string();
                self.bump()?;
                Ok(self.alloc(Expr::Function { text }))
            }
            SourceTokenKind::OpenParen => {
                self.bump()?;
                let expression = self.parse_comma_sequence()?;
                self.expect(SourceTokenKind::CloseParen, "')'")?;
                Ok(self.alloc(Expr::Paren { expression }))
            }
            SourceTokenKind::OpenBracket => self.parse_array_literal(),
            SourceTokenKind::OpenBrace => self.parse_object_literal(),
            SourceTokenKind::SharpRef(label) => {
                let label = *label;
                self.bump()?;
                Ok(self.alloc(Expr::SharpRef { label }))
            }
            SourceTokenKind::SharpDef(label) => {
                let label = *label;
                self.bump()?;
                let body = match self.current.kind {
                    SourceTokenKind::OpenBrace => self.parse_object_literal()?,
                    SourceTokenKind::OpenBracket => self.parse_array_literal()?,
                    _ => {
                        return Err(SharpError::grammar(
                            self.offset(),
                            format!("object or array literal expected after #{label}="),
                        ));
                    }
                };
                Ok(self.alloc(Expr::SharpDef { label, body }))
            }
            SourceTokenKind::EndOfInput => {
                Err(SharpError::grammar(self.offset(), "unexpected end of input"))
            }
            _ => Err(SharpError::grammar(self.offset(), "unexpected token")),
        }
    }

    /// Array literal with elision, as in the literal grammar.
    fn parse_array_literal(&mut self) -> SharpResult<ExprId> {
        self.bump()?; // [
        let mut elements = Vec::new();
        loop {
            match self.current.kind {
                SourceTokenKind::CloseBracket => break,
                SourceTokenKind::Comma => {
                    elements.push(None);
                    self.bump()?;
                }
                _ => {
                    elements.push(Some(self.parse_assignment()?));
                    match self.current.kind {
                        SourceTokenKind::Comma => self.bump()?,
                        SourceTokenKind::CloseBracket => break,
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
        self.bump()?; // ]
        Ok(self.alloc(Expr::ArrayLit { elements }))
    }

    fn parse_object_literal(&mut self) -> SharpResult<ExprId> {
        self.bump()?; // {
        let mut properties = Vec::new();
        if self.current.kind != SourceTokenKind::CloseBrace {
            loop {
                properties.push(self.parse_property()?);
                match self.current.kind {
                    SourceTokenKind::Comma => self.bump()?,
                    SourceTokenKind::CloseBrace => break,
                    _ => {
                        return Err(SharpError::grammar(
                            self.offset(),
                            "expected ',' or '}' next in an object literal",
                        ));
                    }
                }
            }
        }
        self.bump()?; // }
        Ok(self.alloc(Expr::ObjectLit { properties }))
    }

    fn parse_property(&mut self) -> SharpResult<Property> {
        let key = self.parse_property_key()?;

        // `get`/`set` followed by another property name begins an accessor;
        // followed by `:` it is an ordinary key.
        if let PropertyKey::Identifier(name) = &key {
            let kind = match name.as_str() {
                "get" => Some(PropertyKind::Get),
                "set" => Some(PropertyKind::Set),
                _ => None,
            };
            if let Some(kind) = kind
                && self.current.kind != SourceTokenKind::Colon
            {
                let key = self.parse_property_key()?;
                if self.current.kind != SourceTokenKind::OpenParen {
                    return Err(SharpError::grammar(
                        self.offset(),
                        "expected '(' after accessor property name",
                    ));
                }
                let span = self
                    .scanner
                    .capture_params_and_body(self.current.span.start)?;
                let text = span.text(self.scanner.text()).to_string();
                self.bump()?;
                let value = self.alloc(Expr::Function { text });
                return Ok(Property { key, kind, value });
            }
        }

        self.expect(SourceTokenKind::Colon, "':' after property name")?;
        let value = self.parse_assignment()?;
        Ok(Property {
            key,
            kind: PropertyKind::Init,
            value,
        })
    }

    fn parse_property_key(&mut self) -> SharpResult<PropertyKey> {
        let key = match &self.current.kind {
            SourceTokenKind::Identifier(name) => PropertyKey::Identifier(name.clone()),
            // Keywords are valid bare property names.
            SourceTokenKind::TrueKeyword => PropertyKey::Identifier("true".to_string()),
            SourceTokenKind::FalseKeyword => PropertyKey::Identifier("false".to_string()),
            SourceTokenKind::NullKeyword => PropertyKey::Identifier("null".to_string()),
            SourceTokenKind::NewKeyword => PropertyKey::Identifier("new".to_string()),
            SourceTokenKind::VoidKeyword => PropertyKey::Identifier("void".to_string()),
            SourceTokenKind::FunctionKeyword => PropertyKey::Identifier("function".to_string()),
            SourceTokenKind::String(value) => PropertyKey::String(value.clone()),
            SourceTokenKind::Number(text) => PropertyKey::Number(text.clone()),
            _ => {
                return Err(SharpError::grammar(
                    self.offset(),
                    "expected property name in object literal",
                ));
            }
        };
        self.bump()?;
        Ok(key)
    }
}
