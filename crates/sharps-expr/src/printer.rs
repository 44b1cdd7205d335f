//! Renderer from expression ASTs back to source text.

use crate::ast::{Expr, ExprArena, ExprId, Property, PropertyKey, PropertyKind, UnaryOp};

/// Renders any expression node back into syntactically valid source text.
pub struct Printer<'a> {
    arena: &'a ExprArena,
    out: String,
}

impl<'a> Printer<'a> {
    pub fn new(arena: &'a ExprArena) -> Printer<'a> {
        Printer {
            arena,
            out: String::new(),
        }
    }

    /// Render `root` and return the accumulated text.
    pub fn print(mut self, root: ExprId) -> String {
        self.emit(root);
        self.out
    }

    // =========================================================================
    // Output helpers
    // =========================================================================

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn write_char(&mut self, ch: char) {
        self.out.push(ch);
    }

    fn emit_comma_separated(&mut self, nodes: &[ExprId]) {
        let mut first = true;
        for &id in nodes {
            if !first {
                self.write(", ");
            }
            first = false;
            self.emit(id);
        }
    }

    fn emit_escaped_string(&mut self, s: &str, quote_char: char) {
        for ch in s.chars() {
            match ch {
                '\n' => self.write("\\n"),
                '\r' => self.write("\\r"),
                '\t' => self.write("\\t"),
                '\\' => self.write("\\\\"),
                c if c == quote_char => {
                    self.write_char('\\');
                    self.write_char(c);
                }
                c if (c as u32) < 0x20 => {
                    let code = c as u32;
                    self.write("\\x");
                    self.write(&format!("{code:02X}"));
                }
                c => self.write_char(c),
            }
        }
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    fn emit(&mut self, id: ExprId) {
        let Some(node) = self.arena.get(id) else {
            return;
        };
        match node {
            Expr::Number { text } => self.write(text),
            Expr::String { value } => {
                self.write_char('"');
                self.emit_escaped_string(value, '"');
                self.write_char('"');
            }
            Expr::Bool { value } => self.write(if *value { "true" } else { "false" }),
            Expr::Null => self.write("null"),
            Expr::Identifier { name } => self.write(name),
            Expr::Function { text } | Expr::Regex { text } => self.write(text),
            Expr::ArrayLit { elements } => self.emit_array_literal(elements),
            Expr::ObjectLit { properties } => self.emit_object_literal(properties),
            Expr::Paren { expression } => {
                self.write("(");
                self.emit(*expression);
                self.write(")");
            }
            Expr::Call { callee, arguments } => {
                self.emit(*callee);
                self.write("(");
                self.emit_comma_separated(arguments);
                self.write(")");
            }
            Expr::New { callee, arguments } => {
                self.write("new ");
                self.emit(*callee);
                self.write("(");
                self.emit_comma_separated(arguments);
                self.write(")");
            }
            Expr::Member { object, property } => {
                self.emit(*object);
                self.write(".");
                self.write(property);
            }
            Expr::Index { object, index } => {
                self.emit(*object);
                self.write("[");
                self.emit(*index);
                self.write("]");
            }
            Expr::Assign { target, value } => {
                self.emit(*target);
                self.write(" = ");
                self.emit(*value);
            }
            Expr::Comma { expressions } => self.emit_comma_separated(expressions),
            Expr::Unary { op, operand } => {
                match op {
                    UnaryOp::Minus => self.write("-"),
                    UnaryOp::Void => self.write("void "),
                }
                self.emit(*operand);
            }
            Expr::SharpDef { label, body } => {
                self.write(&format!("#{label}="));
                self.emit(*body);
            }
            Expr::SharpRef { label } => self.write(&format!("#{label}#")),
        }
    }

    fn emit_array_literal(&mut self, elements: &[Option<ExprId>]) {
        self.write("[");
        let length = elements.len();
        for (i, element) in elements.iter().enumerate() {
            if let Some(id) = element {
                self.emit(*id);
            }
            if i + 1 != length {
                self.write(", ");
            } else if element.is_none() {
                self.write(",");
            }
        }
        self.write("]");
    }

    fn emit_object_literal(&mut self, properties: &[Property]) {
        self.write("{");
        let mut first = true;
        for property in properties {
            if !first {
                self.write(", ");
            }
            first = false;
            match property.kind {
                PropertyKind::Init => {
                    self.emit_property_key(&property.key);
                    self.write(": ");
                    self.emit(property.value);
                }
                PropertyKind::Get | PropertyKind::Set => {
                    self.write(if property.kind == PropertyKind::Get {
                        "get "
                    } else {
                        "set "
                    });
                    self.emit_property_key(&property.key);
                    self.write(" ");
                    self.emit(property.value);
                }
            }
        }
        self.write("}");
    }

    fn emit_property_key(&mut self, key: &PropertyKey) {
        match key {
            PropertyKey::Identifier(name) | PropertyKey::Number(name) => {
                self.write(&name.clone());
            }
            PropertyKey::String(value) => {
                let value = value.clone();
                self.write_char('\'');
                self.emit_escaped_string(&value, '\'');
                self.write_char('\'');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn round_trip(text: &str) -> String {
        let program = parse_expression(text).unwrap();
        Printer::new(&program.arena).print(program.root)
    }

    #[test]
    fn test_literal_rendering() {
        assert_eq!(round_trip("{a: 1, 'b c': \"s\"}"), "{a: 1, 'b c': \"s\"}");
        assert_eq!(round_trip("[1, , 2,]"), "[1, , 2]");
        assert_eq!(round_trip("[1, ,]"), "[1, ,]");
    }

    #[test]
    fn test_expression_rendering() {
        assert_eq!(round_trip("$S[1].a = $S[2]"), "$S[1].a = $S[2]");
        assert_eq!(round_trip("(new Date(0))"), "(new Date(0))");
        assert_eq!(round_trip("(void 0)"), "(void 0)");
        assert_eq!(round_trip("-0"), "-0");
        assert_eq!(round_trip("a, b, 0"), "a, b, 0");
    }

    #[test]
    fn test_sharp_rendering() {
        assert_eq!(round_trip("#1=[#1#]"), "#1=[#1#]");
        assert_eq!(round_trip("#2={me: #2#}"), "#2={me: #2#}");
    }

    #[test]
    fn test_function_and_accessor_rendering() {
        assert_eq!(
            round_trip("{f: function (x) { return x; }}"),
            "{f: function (x) { return x; }}"
        );
        assert_eq!(
            round_trip("{get x () { return 1; }}"),
            "{get x () { return 1; }}"
        );
    }
}
