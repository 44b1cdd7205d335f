//! Quoting and primitive rendering for the source style.

use sharps_scanner::chars;

/// Quote `s` with the given quote character, escaping with the two-char
/// table `\b \f \n \r \t \v \' \" \\` and hex escapes `\xHH` / `\uHHHH`
/// for other non-printable or non-ASCII characters. Characters beyond the
/// basic plane emit a surrogate pair of `\u` escapes.
pub(crate) fn quote_string(s: &str, quote: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        if c >= '\u{20}' && c < '\u{7f}' && c != quote && c != '\\' {
            out.push(c);
        } else if let Some(escape) = short_escape(c) {
            out.push_str(escape);
        } else if (c as u32) < 0x100 {
            out.push_str(&format!("\\x{:02X}", c as u32));
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04X}"));
            }
        }
    }
    out.push(quote);
    out
}

fn short_escape(c: char) -> Option<&'static str> {
    Some(match c {
        '\u{8}' => "\\b",
        '\u{c}' => "\\f",
        '\n' => "\\n",
        '\r' => "\\r",
        '\t' => "\\t",
        '\u{b}' => "\\v",
        '"' => "\\\"",
        '\'' => "\\'",
        '\\' => "\\\\",
        _ => return None,
    })
}

/// Render an object key: bare when it is an identifier or a canonical
/// integer index, single-quoted otherwise.
pub(crate) fn key_source(key: &str) -> String {
    if chars::is_identifier(key) || chars::is_canonical_index(key) {
        key.to_string()
    } else {
        quote_string(key, '\'')
    }
}

/// Standard decimal formatting, except that negative zero renders as the
/// literal `-0` to stay distinguishable from `0`.
pub(crate) fn number_source(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    format!("{n}")
}

/// Milliseconds for the Date template: integral values print with no
/// fraction.
pub(crate) fn millis_source(millis: f64) -> String {
    if millis.is_finite() && millis.fract() == 0.0 && millis.abs() < 9e15 {
        format!("{}", millis as i64)
    } else {
        number_source(millis)
    }
}

/// Strip the `function` keyword and name from a function's source text,
/// leaving the parameter list and body for embedding after `get`/`set`.
/// Returns `None` when the text is not function-shaped; the caller then
/// falls back to a plain data-property rendering.
pub(crate) fn accessor_text(source: &str) -> Option<String> {
    let s = source.trim();
    let s = if let Some(inner) = s.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        inner
    } else {
        s
    };
    let rest = s.trim_start().strip_prefix("function")?;
    let paren = rest.find('(')?;
    if !rest[..paren]
        .chars()
        .all(|c| c.is_whitespace() || chars::is_identifier_part(c))
    {
        return None;
    }
    Some(rest[paren..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_string_basic() {
        assert_eq!(quote_string("ab", '"'), "\"ab\"");
        assert_eq!(quote_string("a\"b", '"'), "\"a\\\"b\"");
        assert_eq!(quote_string("a'b", '"'), "\"a'b\"");
        assert_eq!(quote_string("a'b", '\''), "'a\\'b'");
    }

    #[test]
    fn test_quote_string_escapes() {
        assert_eq!(quote_string("\n\t\u{b}", '"'), "\"\\n\\t\\v\"");
        assert_eq!(quote_string("\u{1}", '"'), "\"\\x01\"");
        assert_eq!(quote_string("é", '"'), "\"\\xE9\"");
        assert_eq!(quote_string("☃", '"'), "\"\\u2603\"");
        assert_eq!(quote_string("\u{1F600}", '"'), "\"\\uD83D\\uDE00\"");
    }

    #[test]
    fn test_key_source() {
        assert_eq!(key_source("foo"), "foo");
        assert_eq!(key_source("0"), "0");
        assert_eq!(key_source("12"), "12");
        assert_eq!(key_source("a b"), "'a b'");
        assert_eq!(key_source("012"), "'012'");
    }

    #[test]
    fn test_number_source() {
        assert_eq!(number_source(1.0), "1");
        assert_eq!(number_source(1.5), "1.5");
        assert_eq!(number_source(-0.0), "-0");
        assert_eq!(number_source(0.0), "0");
        assert_eq!(number_source(f64::NAN), "NaN");
        assert_eq!(number_source(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_accessor_text() {
        assert_eq!(
            accessor_text("function (a) { return a; }").as_deref(),
            Some("(a) { return a; }")
        );
        assert_eq!(
            accessor_text("(function named(a) {})").as_deref(),
            Some("(a) {}")
        );
        assert_eq!(accessor_text("42"), None);
    }
}
