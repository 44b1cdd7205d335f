//! Tokenizer for the host-expression surface.
//!
//! This is the lexical layer under the expression parser in `sharps-expr`.
//! It covers the expression shapes that sharp object source text uses:
//! literals, identifiers, function and regexp literals, call/new/member
//! syntax, assignment, comma sequences, and the sharp tokens. Function
//! literals are not tokenized into their parts; the parser asks this
//! scanner to capture their balanced raw text instead, because the
//! compiler treats them as opaque leaves.

use serde::Serialize;
use sharps_common::{SharpError, SharpResult, Span};

use crate::chars;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SourceTokenKind {
    Identifier(String),
    FunctionKeyword,
    NewKeyword,
    VoidKeyword,
    TrueKeyword,
    FalseKeyword,
    NullKeyword,
    /// Numeric literal, kept as source text.
    Number(String),
    /// String literal, decoded.
    String(String),
    /// Regexp literal, kept as source text including delimiters and flags.
    Regex(String),
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    Colon,
    Comma,
    Dot,
    Equals,
    Minus,
    Semicolon,
    SharpDef(u32),
    SharpRef(u32),
    EndOfInput,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceToken {
    pub kind: SourceTokenKind,
    pub span: Span,
}

pub struct SourceScanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> SourceScanner<'a> {
    pub fn new(text: &'a str) -> SourceScanner<'a> {
        SourceScanner { text, pos: 0 }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    fn bytes(&self) -> &'a [u8] {
        let text: &'a str = self.text;
        text.as_bytes()
    }

    fn unmatched(&self, pos: usize) -> SharpError {
        let found = self.text[pos..].chars().next().unwrap_or('\u{0}');
        SharpError::Tokenization {
            offset: pos as u32,
            found,
        }
    }

    /// Skip whitespace and `//` / `/* */` comments.
    fn skip_trivia(&mut self) -> SharpResult<()> {
        let bytes = self.bytes();
        loop {
            match bytes.get(self.pos) {
                Some(b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c) => self.pos += 1,
                Some(b'/') if bytes.get(self.pos + 1) == Some(&b'/') => {
                    self.pos += 2;
                    while !matches!(bytes.get(self.pos), None | Some(b'\n')) {
                        self.pos += 1;
                    }
                }
                Some(b'/') if bytes.get(self.pos + 1) == Some(&b'*') => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        match bytes.get(self.pos) {
                            Some(b'*') if bytes.get(self.pos + 1) == Some(&b'/') => {
                                self.pos += 2;
                                break;
                            }
                            Some(_) => self.pos += 1,
                            None => return Err(self.unmatched(start)),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    pub fn next_token(&mut self) -> SharpResult<SourceToken> {
        self.skip_trivia()?;
        let start = self.pos;
        let bytes = self.bytes();

        let Some(&b) = bytes.get(self.pos) else {
            return Ok(SourceToken {
                kind: SourceTokenKind::EndOfInput,
                span: Span::at(start as u32),
            });
        };

        let kind = match b {
            b'{' => self.punct(SourceTokenKind::OpenBrace),
            b'}' => self.punct(SourceTokenKind::CloseBrace),
            b'[' => self.punct(SourceTokenKind::OpenBracket),
            b']' => self.punct(SourceTokenKind::CloseBracket),
            b'(' => self.punct(SourceTokenKind::OpenParen),
            b')' => self.punct(SourceTokenKind::CloseParen),
            b':' => self.punct(SourceTokenKind::Colon),
            b',' => self.punct(SourceTokenKind::Comma),
            b'.' => self.punct(SourceTokenKind::Dot),
            b'=' => self.punct(SourceTokenKind::Equals),
            b'-' => self.punct(SourceTokenKind::Minus),
            b';' => self.punct(SourceTokenKind::Semicolon),
            b'#' => self.scan_sharp()?,
            b'"' | b'\'' => self.scan_string()?,
            b'/' => self.scan_regex()?,
            b'0'..=b'9' => self.scan_number()?,
            c if chars::is_identifier_start(c as char) => self.scan_identifier(),
            _ => return Err(self.unmatched(start)),
        };

        Ok(SourceToken {
            kind,
            span: Span::new(start as u32, self.pos as u32),
        })
    }

    fn punct(&mut self, kind: SourceTokenKind) -> SourceTokenKind {
        self.pos += 1;
        kind
    }

    fn scan_identifier(&mut self) -> SourceTokenKind {
        let start = self.pos;
        let bytes = self.bytes();
        while matches!(bytes.get(self.pos), Some(&c) if chars::is_identifier_part(c as char)) {
            self.pos += 1;
        }
        match &self.text[start..self.pos] {
            "function" => SourceTokenKind::FunctionKeyword,
            "new" => SourceTokenKind::NewKeyword,
            "void" => SourceTokenKind::VoidKeyword,
            "true" => SourceTokenKind::TrueKeyword,
            "false" => SourceTokenKind::FalseKeyword,
            "null" => SourceTokenKind::NullKeyword,
            name => SourceTokenKind::Identifier(name.to_string()),
        }
    }

    fn scan_sharp(&mut self) -> SharpResult<SourceTokenKind> {
        let start = self.pos;
        let bytes = self.bytes();
        let mut pos = self.pos + 1;
        if !matches!(bytes.get(pos), Some(b'1'..=b'9')) {
            return Err(self.unmatched(start));
        }
        while matches!(bytes.get(pos), Some(b'0'..=b'9')) {
            pos += 1;
        }
        let label: u32 = self.text[start + 1..pos]
            .parse()
            .map_err(|_| self.unmatched(start))?;
        let kind = match bytes.get(pos) {
            Some(b'=') => SourceTokenKind::SharpDef(label),
            Some(b'#') => SourceTokenKind::SharpRef(label),
            _ => return Err(self.unmatched(start)),
        };
        self.pos = pos + 1;
        Ok(kind)
    }

    /// Scan a decimal numeric literal, keeping its source text.
    fn scan_number(&mut self) -> SharpResult<SourceTokenKind> {
        let start = self.pos;
        let bytes = self.bytes();
        if bytes[self.pos] == b'0' {
            self.pos += 1;
        } else {
            while matches!(bytes.get(self.pos), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if bytes.get(self.pos) == Some(&b'.') {
            self.pos += 1;
            while matches!(bytes.get(self.pos), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if matches!(bytes.get(self.pos), Some(b'e' | b'E')) {
            let mut lookahead = self.pos + 1;
            if matches!(bytes.get(lookahead), Some(b'+' | b'-')) {
                lookahead += 1;
            }
            if matches!(bytes.get(lookahead), Some(b'0'..=b'9')) {
                self.pos = lookahead;
                while matches!(bytes.get(self.pos), Some(b'0'..=b'9')) {
                    self.pos += 1;
                }
            }
        }
        Ok(SourceTokenKind::Number(self.text[start..self.pos].to_string()))
    }

    /// Scan a single- or double-quoted string literal and decode its
    /// escapes: the named escapes, `\xHH`, `\uHHHH`, and the identity
    /// escape for any other character.
    fn scan_string(&mut self) -> SharpResult<SourceTokenKind> {
        let start = self.pos;
        let quote = self.text[self.pos..].chars().next().unwrap_or('"');
        self.pos += quote.len_utf8();
        let mut value = String::new();

        loop {
            let rest = &self.text[self.pos..];
            let mut iter = rest.char_indices();
            let Some((_, c)) = iter.next() else {
                return Err(self.unmatched(start));
            };
            match c {
                c if c == quote => {
                    self.pos += c.len_utf8();
                    return Ok(SourceTokenKind::String(value));
                }
                '\n' | '\r' => return Err(self.unmatched(self.pos)),
                '\\' => {
                    let esc_at = self.pos;
                    let Some((_, e)) = iter.next() else {
                        return Err(self.unmatched(esc_at));
                    };
                    self.pos += 1 + e.len_utf8();
                    match e {
                        'b' => value.push('\u{8}'),
                        'f' => value.push('\u{c}'),
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        'v' => value.push('\u{b}'),
                        '0' => value.push('\u{0}'),
                        'x' => value.push(self.scan_hex_escape(esc_at, 2)?),
                        'u' => value.push(self.scan_hex_escape(esc_at, 4)?),
                        other => value.push(other),
                    }
                }
                c => {
                    self.pos += c.len_utf8();
                    value.push(c);
                }
            }
        }
    }

    fn scan_hex_escape(&mut self, esc_at: usize, digits: usize) -> SharpResult<char> {
        let hex = self
            .text
            .get(self.pos..self.pos + digits)
            .ok_or_else(|| self.unmatched(esc_at))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.unmatched(esc_at))?;
        self.pos += digits;
        char::from_u32(code).ok_or_else(|| self.unmatched(esc_at))
    }

    /// Scan a regexp literal. There is no division operator in this
    /// grammar, so `/` always begins a regexp.
    fn scan_regex(&mut self) -> SharpResult<SourceTokenKind> {
        let start = self.pos;
        let bytes = self.bytes();
        let mut pos = self.pos + 1;
        let mut in_class = false;
        loop {
            match bytes.get(pos) {
                None | Some(b'\n') => return Err(self.unmatched(start)),
                Some(b'\\') => pos += 2,
                Some(b'[') => {
                    in_class = true;
                    pos += 1;
                }
                Some(b']') => {
                    in_class = false;
                    pos += 1;
                }
                Some(b'/') if !in_class => {
                    pos += 1;
                    break;
                }
                Some(_) => pos += 1,
            }
        }
        while matches!(bytes.get(pos), Some(&c) if chars::is_identifier_part(c as char)) {
            pos += 1;
        }
        self.pos = pos;
        Ok(SourceTokenKind::Regex(self.text[start..pos].to_string()))
    }

    // --- Raw captures for opaque function literals ---

    /// Capture a whole function literal starting at `start`, which must be
    /// the offset of its `function` keyword: keyword, optional name,
    /// parameter list, body. Leaves the scanner positioned just past the
    /// closing brace and returns the covered span.
    pub fn capture_function(&mut self, start: u32) -> SharpResult<Span> {
        self.pos = start as usize;
        if !self.text[self.pos..].starts_with("function") {
            return Err(self.unmatched(self.pos));
        }
        self.pos += "function".len();
        self.skip_trivia()?;
        let bytes = self.bytes();
        if matches!(bytes.get(self.pos), Some(&c) if chars::is_identifier_start(c as char)) {
            while matches!(self.bytes().get(self.pos), Some(&c) if chars::is_identifier_part(c as char))
            {
                self.pos += 1;
            }
            self.skip_trivia()?;
        }
        self.capture_params_and_body(self.pos as u32)
            .map(|span| Span::new(start, span.end))
    }

    /// Capture `(params) { body }` starting at `start`, which must be the
    /// offset of the opening parenthesis. Used for accessor functions,
    /// whose `function` keyword and name are not present in source.
    pub fn capture_params_and_body(&mut self, start: u32) -> SharpResult<Span> {
        self.pos = start as usize;
        self.balanced(b'(', b')')?;
        self.skip_trivia()?;
        self.balanced(b'{', b'}')?;
        Ok(Span::new(start, self.pos as u32))
    }

    /// Skip a balanced `open`..`close` region starting at the current
    /// position, ignoring delimiters inside string literals and comments.
    fn balanced(&mut self, open: u8, close: u8) -> SharpResult<()> {
        let start = self.pos;
        let bytes = self.bytes();
        if bytes.get(self.pos) != Some(&open) {
            return Err(self.unmatched(self.pos));
        }
        let mut depth = 0usize;
        while let Some(&b) = bytes.get(self.pos) {
            match b {
                b'\'' | b'"' => self.skip_quoted(b)?,
                b'/' if bytes.get(self.pos + 1) == Some(&b'/') => {
                    while !matches!(bytes.get(self.pos), None | Some(b'\n')) {
                        self.pos += 1;
                    }
                }
                b'/' if bytes.get(self.pos + 1) == Some(&b'*') => {
                    self.pos += 2;
                    while let Some(&c) = bytes.get(self.pos) {
                        if c == b'*' && bytes.get(self.pos + 1) == Some(&b'/') {
                            self.pos += 2;
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => {
                    if b == open {
                        depth += 1;
                    } else if b == close {
                        depth -= 1;
                        if depth == 0 {
                            self.pos += 1;
                            return Ok(());
                        }
                    }
                    self.pos += 1;
                }
            }
        }
        Err(self.unmatched(start))
    }

    fn skip_quoted(&mut self, quote: u8) -> SharpResult<()> {
        let start = self.pos;
        let bytes = self.bytes();
        self.pos += 1;
        while let Some(&b) = bytes.get(self.pos) {
            match b {
                b'\\' => self.pos += 2,
                b if b == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => self.pos += 1,
            }
        }
        Err(self.unmatched(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<SourceTokenKind> {
        let mut scanner = SourceScanner::new(text);
        let mut out = Vec::new();
        loop {
            let token = scanner.next_token().unwrap();
            let done = token.kind == SourceTokenKind::EndOfInput;
            out.push(token.kind);
            if done {
                return out;
            }
        }
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("new Date(0)"),
            vec![
                SourceTokenKind::NewKeyword,
                SourceTokenKind::Identifier("Date".to_string()),
                SourceTokenKind::OpenParen,
                SourceTokenKind::Number("0".to_string()),
                SourceTokenKind::CloseParen,
                SourceTokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn test_single_quoted_string_escapes() {
        assert_eq!(
            kinds(r"'a\x41B\n'"),
            vec![
                SourceTokenKind::String("aAB\n".to_string()),
                SourceTokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn test_regex_literal() {
        assert_eq!(
            kinds("/a[/]b/gi"),
            vec![
                SourceTokenKind::Regex("/a[/]b/gi".to_string()),
                SourceTokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn test_sharp_tokens() {
        assert_eq!(
            kinds("#2={}"),
            vec![
                SourceTokenKind::SharpDef(2),
                SourceTokenKind::OpenBrace,
                SourceTokenKind::CloseBrace,
                SourceTokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn test_capture_function() {
        let text = "function f(a, b) { return {x: '}'}; }";
        let mut scanner = SourceScanner::new(text);
        let token = scanner.next_token().unwrap();
        assert_eq!(token.kind, SourceTokenKind::FunctionKeyword);
        let span = scanner.capture_function(token.span.start).unwrap();
        assert_eq!(span.text(text), text);
        assert_eq!(
            scanner.next_token().unwrap().kind,
            SourceTokenKind::EndOfInput
        );
    }

    #[test]
    fn test_capture_params_and_body() {
        let text = "(x) { return x; } rest";
        let mut scanner = SourceScanner::new(text);
        let span = scanner.capture_params_and_body(0).unwrap();
        assert_eq!(span.text(text), "(x) { return x; }");
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("/* a */ null // tail"),
            vec![SourceTokenKind::NullKeyword, SourceTokenKind::EndOfInput]
        );
    }
}
