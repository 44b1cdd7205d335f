//! Byte spans into source text.

use serde::{Deserialize, Serialize};

/// A half-open byte range `[start, end)` into the source text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Span {
        Span { start, end }
    }

    /// A zero-width span at the given offset.
    pub fn at(offset: u32) -> Span {
        Span {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Slice the source text covered by this span.
    ///
    /// Returns an empty string when the span is out of bounds rather than
    /// panicking on a bad index.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        let start = self.start as usize;
        let end = self.end as usize;
        if start <= end && end <= source.len() {
            &source[start..end]
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_text() {
        let span = Span::new(1, 4);
        assert_eq!(span.text("#1=[]"), "1=[");
        assert_eq!(span.len(), 3);
    }

    #[test]
    fn test_span_out_of_bounds() {
        let span = Span::new(3, 10);
        assert_eq!(span.text("ab"), "");
    }
}
