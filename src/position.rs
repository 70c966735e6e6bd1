//! Byte-offset source spans.
//!
//! A [`Position`] is a half-open range `[start, end)` over the original
//! source bytes. Every token and every expression carries one, so that
//! lexer, parser, expander and transpiler errors can all point back at
//! the exact bytes responsible.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A half-open byte range `[start, end)` into the original source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

impl Position {
    /// Builds a new position, widening a zero-length range to width one so
    /// that downstream row/column rendering stays monotone.
    pub fn new(start: usize, end: usize) -> Self {
        let end = if start == end { end + 1 } else { end };
        Self { start, end }
    }

    /// The smallest position spanning both `a` and `b`.
    pub fn between(a: Position, b: Position) -> Self {
        Position {
            start: a.start,
            end: b.end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[byte index {}-{}]", self.start + 1, self.end + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_is_widened_to_one() {
        let p = Position::new(4, 4);
        assert_eq!(p, Position { start: 4, end: 5 });
    }

    #[test]
    fn between_spans_both_endpoints() {
        let a = Position::new(0, 3);
        let b = Position::new(10, 14);
        assert_eq!(Position::between(a, b), Position { start: 0, end: 14 });
    }
}
