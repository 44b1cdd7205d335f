//! Tokenizer for the literal interchange format.
//!
//! A single left-to-right scan producing the longest token at each
//! position from the set `{ [ ] { } : , true false null, JSON number,
//! JSON double-quoted string, #<digits>= , #<digits># }`, with ASCII
//! whitespace permitted between tokens. Any position where no token
//! matches is a fatal tokenization error carrying the offending character
//! and its byte offset, so the accepted tokens always tile the input
//! contiguously from offset 0.

use memchr::memchr2;
use serde::Serialize;
use sharps_common::{SharpError, SharpResult, Span};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum LiteralTokenKind {
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Colon,
    Comma,
    True,
    False,
    Null,
    Number(f64),
    String(String),
    /// `#<label>=`
    SharpDef(u32),
    /// `#<label>#`
    SharpRef(u32),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LiteralToken {
    pub kind: LiteralTokenKind,
    pub span: Span,
}

impl LiteralToken {
    fn new(kind: LiteralTokenKind, start: usize, end: usize) -> LiteralToken {
        LiteralToken {
            kind,
            span: Span::new(start as u32, end as u32),
        }
    }
}

/// Tokenize the whole input.
pub fn tokenize(text: &str) -> SharpResult<Vec<LiteralToken>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let start = pos;
        match bytes[pos] {
            b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => {
                pos += 1;
            }
            b'[' => {
                pos += 1;
                tokens.push(LiteralToken::new(LiteralTokenKind::OpenBracket, start, pos));
            }
            b']' => {
                pos += 1;
                tokens.push(LiteralToken::new(LiteralTokenKind::CloseBracket, start, pos));
            }
            b'{' => {
                pos += 1;
                tokens.push(LiteralToken::new(LiteralTokenKind::OpenBrace, start, pos));
            }
            b'}' => {
                pos += 1;
                tokens.push(LiteralToken::new(LiteralTokenKind::CloseBrace, start, pos));
            }
            b':' => {
                pos += 1;
                tokens.push(LiteralToken::new(LiteralTokenKind::Colon, start, pos));
            }
            b',' => {
                pos += 1;
                tokens.push(LiteralToken::new(LiteralTokenKind::Comma, start, pos));
            }
            b't' => {
                pos = scan_word(text, pos, "true")?;
                tokens.push(LiteralToken::new(LiteralTokenKind::True, start, pos));
            }
            b'f' => {
                pos = scan_word(text, pos, "false")?;
                tokens.push(LiteralToken::new(LiteralTokenKind::False, start, pos));
            }
            b'n' => {
                pos = scan_word(text, pos, "null")?;
                tokens.push(LiteralToken::new(LiteralTokenKind::Null, start, pos));
            }
            b'"' => {
                let (value, end) = scan_string(text, pos)?;
                pos = end;
                tokens.push(LiteralToken::new(LiteralTokenKind::String(value), start, pos));
            }
            b'#' => {
                let (kind, end) = scan_sharp(text, pos)?;
                pos = end;
                tokens.push(LiteralToken::new(kind, start, pos));
            }
            b'-' | b'0'..=b'9' => {
                let (value, end) = scan_number(text, pos)?;
                pos = end;
                tokens.push(LiteralToken::new(LiteralTokenKind::Number(value), start, pos));
            }
            _ => return Err(unmatched(text, pos)),
        }
    }

    Ok(tokens)
}

fn unmatched(text: &str, pos: usize) -> SharpError {
    let found = text[pos..].chars().next().unwrap_or('\u{0}');
    SharpError::Tokenization {
        offset: pos as u32,
        found,
    }
}

fn scan_word(text: &str, pos: usize, word: &str) -> SharpResult<usize> {
    if text[pos..].starts_with(word) {
        Ok(pos + word.len())
    } else {
        Err(unmatched(text, pos))
    }
}

/// Scan a JSON string token starting at the opening quote. Returns the
/// decoded value and the offset just past the closing quote.
fn scan_string(text: &str, start: usize) -> SharpResult<(String, usize)> {
    let bytes = text.as_bytes();
    let mut pos = start + 1;

    loop {
        let rest = &bytes[pos..];
        let found = memchr2(b'"', b'\\', rest).ok_or_else(|| unmatched(text, start))?;
        if let Some(bad) = rest[..found].iter().position(|&b| b < 0x20) {
            return Err(unmatched(text, pos + bad));
        }
        pos += found;
        if bytes[pos] == b'"' {
            pos += 1;
            break;
        }
        // Backslash escape: one of " \ / b f n r t, or u plus four hex.
        match bytes.get(pos + 1) {
            Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => pos += 2,
            Some(b'u') => {
                let hex = bytes.get(pos + 2..pos + 6).ok_or_else(|| unmatched(text, pos))?;
                if !hex.iter().all(|b| b.is_ascii_hexdigit()) {
                    return Err(unmatched(text, pos));
                }
                pos += 6;
            }
            _ => return Err(unmatched(text, pos)),
        }
    }

    // The token is exactly a JSON string; serde_json decodes the identical
    // grammar, including surrogate pairs.
    let value: String = serde_json::from_str(&text[start..pos]).map_err(|_| unmatched(text, start))?;
    Ok((value, pos))
}

/// Scan `#<digits>=` or `#<digits>#`. Labels start at 1 and carry no
/// leading zero.
fn scan_sharp(text: &str, start: usize) -> SharpResult<(LiteralTokenKind, usize)> {
    let bytes = text.as_bytes();
    let mut pos = start + 1;

    if !matches!(bytes.get(pos), Some(b'1'..=b'9')) {
        return Err(unmatched(text, start));
    }
    while matches!(bytes.get(pos), Some(b'0'..=b'9')) {
        pos += 1;
    }
    let label: u32 = text[start + 1..pos]
        .parse()
        .map_err(|_| unmatched(text, start))?;

    match bytes.get(pos) {
        Some(b'=') => Ok((LiteralTokenKind::SharpDef(label), pos + 1)),
        Some(b'#') => Ok((LiteralTokenKind::SharpRef(label), pos + 1)),
        _ => Err(unmatched(text, start)),
    }
}

/// Scan a JSON number: `-?(0|[1-9][0-9]*)(\.[0-9]*)?([Ee][+-]?[0-9]+)?`.
/// The fraction may be empty (`1.` is accepted), and the exponent part is
/// only taken when a digit follows, so `1e` leaves `e` unmatched.
fn scan_number(text: &str, start: usize) -> SharpResult<(f64, usize)> {
    let bytes = text.as_bytes();
    let mut pos = start;

    if bytes[pos] == b'-' {
        pos += 1;
    }
    match bytes.get(pos) {
        Some(b'0') => pos += 1,
        Some(b'1'..=b'9') => {
            while matches!(bytes.get(pos), Some(b'0'..=b'9')) {
                pos += 1;
            }
        }
        _ => return Err(unmatched(text, start)),
    }
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        while matches!(bytes.get(pos), Some(b'0'..=b'9')) {
            pos += 1;
        }
    }
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        let mut lookahead = pos + 1;
        if matches!(bytes.get(lookahead), Some(b'+' | b'-')) {
            lookahead += 1;
        }
        if matches!(bytes.get(lookahead), Some(b'0'..=b'9')) {
            pos = lookahead;
            while matches!(bytes.get(pos), Some(b'0'..=b'9')) {
                pos += 1;
            }
        }
    }

    let value: f64 = text[start..pos]
        .parse()
        .map_err(|_| unmatched(text, start))?;
    Ok((value, pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<LiteralTokenKind> {
        tokenize(text).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_punctuation_and_keywords() {
        assert_eq!(
            kinds("[true, false, null]"),
            vec![
                LiteralTokenKind::OpenBracket,
                LiteralTokenKind::True,
                LiteralTokenKind::Comma,
                LiteralTokenKind::False,
                LiteralTokenKind::Comma,
                LiteralTokenKind::Null,
                LiteralTokenKind::CloseBracket,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("-0 1.5 2e3 1."),
            vec![
                LiteralTokenKind::Number(-0.0),
                LiteralTokenKind::Number(1.5),
                LiteralTokenKind::Number(2000.0),
                LiteralTokenKind::Number(1.0),
            ]
        );
        // -0 keeps its sign through tokenization
        match &tokenize("-0").unwrap()[0].kind {
            LiteralTokenKind::Number(n) => assert!(n.is_sign_negative()),
            other => panic!("unexpected token {other:?}"),
        }
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#""a\nb" "A""#),
            vec![
                LiteralTokenKind::String("a\nb".to_string()),
                LiteralTokenKind::String("A".to_string()),
            ]
        );
    }

    #[test]
    fn test_sharp_tokens() {
        assert_eq!(
            kinds("#1=[#1#]"),
            vec![
                LiteralTokenKind::SharpDef(1),
                LiteralTokenKind::OpenBracket,
                LiteralTokenKind::SharpRef(1),
                LiteralTokenKind::CloseBracket,
            ]
        );
    }

    #[test]
    fn test_spans_tile_input() {
        let tokens = tokenize(" #12=[ 1 ]").unwrap();
        assert_eq!(tokens[0].span, Span::new(1, 5));
        assert_eq!(tokens[1].span, Span::new(5, 6));
        assert_eq!(tokens[2].span, Span::new(7, 8));
        assert_eq!(tokens[3].span, Span::new(9, 10));
    }

    #[test]
    fn test_unmatched_character() {
        let err = tokenize("[1, @]").unwrap_err();
        assert_eq!(
            err,
            SharpError::Tokenization {
                offset: 4,
                found: '@'
            }
        );
    }

    #[test]
    fn test_sharp_zero_rejected() {
        // Labels start at 1; #0= fails where the regex would fail, at '#'.
        let err = tokenize("#0={}").unwrap_err();
        assert_eq!(err.offset(), Some(0));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(tokenize("\"abc").is_err());
    }

    #[test]
    fn test_bare_minus_rejected() {
        let err = tokenize("[-]").unwrap_err();
        assert_eq!(err.offset(), Some(1));
    }
}
