//! Character cursor over source text with line/column tracking.

use super::token::Span;
use std::str::CharIndices;

#[derive(Debug, Clone, Copy)]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub fn span_to(self, end: &Position) -> Span {
        Span::new(self.offset, end.offset, self.line, self.column)
    }

    #[must_use]
    pub fn span_here(self) -> Span {
        Span::new(self.offset, self.offset, self.line, self.column)
    }
}

/// Walks source text one `char` at a time. Columns count characters, not
/// bytes; offsets are byte offsets into the source.
pub struct Cursor<'a> {
    source: &'a str,
    chars: CharIndices<'a>,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            line: 1,
            column: 1,
        }
    }

    fn offset(&self) -> usize {
        self.source.len() - self.chars.as_str().len()
    }

    pub fn position(&self) -> Position {
        Position {
            offset: self.offset(),
            line: self.line,
            column: self.column,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.clone().next().map(|(_, c)| c)
    }

    pub fn peek_second(&self) -> Option<char> {
        self.chars.clone().nth(1).map(|(_, c)| c)
    }

    pub fn advance(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            _ => self.column += 1,
        }
        Some(c)
    }

    /// Returns the number of characters consumed.
    pub fn skip_while(&mut self, predicate: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        while self.peek().is_some_and(&predicate) {
            self.advance();
            count += 1;
        }
        count
    }

    /// Source text from `start` up to the current position.
    pub fn slice_from(&self, start: &Position) -> &'a str {
        &self.source[start.offset..self.offset()]
    }

    pub fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let start = self.position();
        self.skip_while(predicate);
        self.slice_from(&start)
    }
}
