//! Lexer for the text format.
//!
//! The lexer is an iterator yielding `Result<Token, WatError>`; iteration
//! should stop at the first error.
//!
//! ```
//! use wasm_interp::wat::{Lexer, TokenKind};
//!
//! let tokens: Vec<_> = Lexer::new("(i32.const -7)").collect::<Result<_, _>>().unwrap();
//! assert_eq!(tokens.len(), 4);
//! assert!(matches!(tokens[1].kind, TokenKind::Keyword(ref k) if k == "i32.const"));
//! ```

use super::cursor::{Cursor, Position};
use super::error::WatError;
use super::token::{FloatLit, IntLit, Token, TokenKind};

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
        }
    }

    pub fn tokenise(source: &str) -> Result<Vec<Token>, WatError> {
        Lexer::new(source).collect()
    }

    fn error_span(&self, message: impl Into<String>, start: Position) -> WatError {
        WatError::new(message, start.span_to(&self.cursor.position()))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, WatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(e) = self.skip_whitespace_and_comments() {
            return Some(Err(e));
        }
        let start = self.cursor.position();
        let c = self.cursor.peek()?;
        let kind = match c {
            '(' => {
                self.cursor.advance();
                Ok(TokenKind::LeftParen)
            }
            ')' => {
                self.cursor.advance();
                Ok(TokenKind::RightParen)
            }
            '"' => self.lex_string(),
            '$' => self.lex_id(),
            c if is_idchar(c) => self.lex_word(),
            c => {
                self.cursor.advance();
                Err(self.error_span(format!("unexpected character: {c:?}"), start))
            }
        };
        let kind = match kind {
            Ok(kind @ (TokenKind::LeftParen | TokenKind::RightParen)) => kind,
            Ok(kind) => match self.check_token_boundary(start) {
                Ok(()) => kind,
                Err(e) => return Some(Err(e)),
            },
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(Token {
            kind,
            span: start.span_to(&self.cursor.position()),
        }))
    }
}

impl Lexer<'_> {
    fn skip_whitespace_and_comments(&mut self) -> Result<(), WatError> {
        loop {
            self.cursor.skip_while(|c| c.is_ascii_whitespace());
            match (self.cursor.peek(), self.cursor.peek_second()) {
                (Some(';'), Some(';')) => {
                    self.cursor.skip_while(|c| c != '\n');
                }
                (Some('('), Some(';')) => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    /// Block comments nest: `(; outer (; inner ;) still outer ;)`.
    fn skip_block_comment(&mut self) -> Result<(), WatError> {
        let start = self.cursor.position();
        self.cursor.advance();
        self.cursor.advance();
        let mut depth = 1;
        while depth > 0 {
            match (self.cursor.peek(), self.cursor.peek_second()) {
                (None, _) => return Err(self.error_span("unterminated block comment", start)),
                (Some('('), Some(';')) => {
                    self.cursor.advance();
                    self.cursor.advance();
                    depth += 1;
                }
                (Some(';'), Some(')')) => {
                    self.cursor.advance();
                    self.cursor.advance();
                    depth -= 1;
                }
                _ => {
                    self.cursor.advance();
                }
            }
        }
        Ok(())
    }

    /// Tokens must be followed by whitespace, a parenthesis, a comment or
    /// the end of input.
    fn check_token_boundary(&self, start: Position) -> Result<(), WatError> {
        match self.cursor.peek() {
            None | Some('(') | Some(')') | Some(';') => Ok(()),
            Some(c) if c.is_ascii_whitespace() => Ok(()),
            Some(_) => Err(self.error_span("unknown operator", start)),
        }
    }

    fn lex_string(&mut self) -> Result<TokenKind, WatError> {
        let start = self.cursor.position();
        self.cursor.advance();
        let mut bytes = Vec::new();
        loop {
            match self.cursor.advance() {
                None | Some('\n') => return Err(self.error_span("unterminated string", start)),
                Some('"') => return Ok(TokenKind::String(bytes)),
                Some('\\') => self.lex_escape(start, &mut bytes)?,
                Some(c) => {
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
        }
    }

    fn lex_escape(&mut self, start: Position, bytes: &mut Vec<u8>) -> Result<(), WatError> {
        match self.cursor.advance() {
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some('r') => bytes.push(b'\r'),
            Some('"') => bytes.push(b'"'),
            Some('\'') => bytes.push(b'\''),
            Some('\\') => bytes.push(b'\\'),
            Some('u') => {
                if self.cursor.advance() != Some('{') {
                    return Err(self.error_span("malformed unicode escape", start));
                }
                let digits = self.cursor.take_while(|c| c.is_ascii_hexdigit() || c == '_');
                let code = parse_digits(digits, 16)
                    .and_then(|code| u32::try_from(code).ok())
                    .and_then(char::from_u32);
                match (code, self.cursor.advance()) {
                    (Some(c), Some('}')) => {
                        let mut buf = [0u8; 4];
                        bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    }
                    _ => return Err(self.error_span("malformed unicode escape", start)),
                }
            }
            Some(hi) if hi.is_ascii_hexdigit() => match self.cursor.advance() {
                Some(lo) if lo.is_ascii_hexdigit() => {
                    let hi = hi.to_digit(16).unwrap_or(0) as u8;
                    let lo = lo.to_digit(16).unwrap_or(0) as u8;
                    bytes.push(hi << 4 | lo);
                }
                _ => return Err(self.error_span("malformed byte escape", start)),
            },
            _ => return Err(self.error_span("unknown escape sequence", start)),
        }
        Ok(())
    }

    fn lex_id(&mut self) -> Result<TokenKind, WatError> {
        let start = self.cursor.position();
        self.cursor.advance();
        let name = self.cursor.take_while(is_idchar);
        if name.is_empty() {
            return Err(self.error_span("empty identifier", start));
        }
        Ok(TokenKind::Id(name.to_string()))
    }

    /// Keywords and numbers share the same character class; a word is a
    /// number when it starts with an optional sign and a digit, or is one of
    /// the `inf`/`nan` forms.
    fn lex_word(&mut self) -> Result<TokenKind, WatError> {
        let start = self.cursor.position();
        let text = self.cursor.take_while(is_idchar);
        let (negative, unsigned) = match text.as_bytes()[0] {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };
        let numeric = unsigned.starts_with(|c: char| c.is_ascii_digit())
            || unsigned == "inf"
            || unsigned == "nan"
            || unsigned.starts_with("nan:");
        if !numeric {
            return Ok(TokenKind::Keyword(text.to_string()));
        }
        lex_number(negative, unsigned).ok_or_else(|| self.error_span(format!("malformed number: {text}"), start))
    }
}

fn lex_number(negative: bool, text: &str) -> Option<TokenKind> {
    if text == "inf" {
        return Some(TokenKind::Float(FloatLit::Inf { negative }));
    }
    if text == "nan" {
        return Some(TokenKind::Float(FloatLit::Nan {
            negative,
            payload: None,
        }));
    }
    if let Some(payload) = text.strip_prefix("nan:0x") {
        let payload = parse_digits(payload, 16).filter(|p| *p != 0)?;
        return Some(TokenKind::Float(FloatLit::Nan {
            negative,
            payload: Some(payload),
        }));
    }

    if let Some(hex) = text.strip_prefix("0x") {
        if !hex.contains(['.', 'p', 'P']) {
            let magnitude = parse_digits(hex, 16)?;
            return Some(TokenKind::Integer(IntLit { negative, magnitude }));
        }
        let (mantissa, exponent) = match hex.split_once(['p', 'P']) {
            Some((mantissa, exponent)) => (mantissa, Some(exponent)),
            None => (hex, None),
        };
        let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if !valid_digits(int, 16) || !(frac.is_empty() || valid_digits(frac, 16)) {
            return None;
        }
        if let Some(exponent) = exponent {
            let exponent = exponent.trim_start_matches(['+', '-']);
            if !valid_digits(exponent, 10) {
                return None;
            }
        }
        return Some(TokenKind::Float(FloatLit::Hex {
            negative,
            text: format!("0x{}", hex.replace('_', "")),
        }));
    }

    if !text.contains(['.', 'e', 'E']) {
        let magnitude = parse_digits(text, 10)?;
        return Some(TokenKind::Integer(IntLit { negative, magnitude }));
    }
    let (mantissa, exponent) = match text.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (text, None),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if !valid_digits(int, 10) || !(frac.is_empty() || valid_digits(frac, 10)) {
        return None;
    }
    if let Some(exponent) = exponent {
        if !valid_digits(exponent.trim_start_matches(['+', '-']), 10) {
            return None;
        }
    }
    Some(TokenKind::Float(FloatLit::Decimal {
        negative,
        text: text.replace('_', ""),
    }))
}

/// Digits with single underscores allowed between them.
fn valid_digits(text: &str, radix: u32) -> bool {
    !text.is_empty()
        && !text.starts_with('_')
        && !text.ends_with('_')
        && !text.contains("__")
        && text.chars().all(|c| c == '_' || c.is_digit(radix))
}

fn parse_digits(text: &str, radix: u32) -> Option<u64> {
    if !valid_digits(text, radix) {
        return None;
    }
    u64::from_str_radix(&text.replace('_', ""), radix).ok()
}

/// Characters permitted in keywords, ids and numbers.
fn is_idchar(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '/' | ':' | '<' | '=' | '>' | '?' | '@' | '\\'
                | '^' | '_' | '`' | '|' | '~'
        )
}
