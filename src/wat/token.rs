//! Tokens of the text format.

use fhex::FromHex;
use std::fmt;

/// A location in source text: byte range plus the line and column (both
/// 1-indexed, columns in characters) where it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// From the start of `self` to the end of `other`.
    pub fn to(self, other: Span) -> Span {
        Span { end: other.end, ..self }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    /// Bare word: `module`, `i32.add`, `offset=8`
    Keyword(String),
    /// `$name`, stored without the `$`
    Id(String),
    /// String literal with escapes resolved; may hold arbitrary bytes
    String(Vec<u8>),
    Integer(IntLit),
    Float(FloatLit),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LeftParen => write!(f, "'('"),
            TokenKind::RightParen => write!(f, "')'"),
            TokenKind::Keyword(kw) => write!(f, "'{kw}'"),
            TokenKind::Id(id) => write!(f, "'${id}'"),
            TokenKind::String(_) => write!(f, "string"),
            TokenKind::Integer(_) => write!(f, "integer"),
            TokenKind::Float(_) => write!(f, "float"),
        }
    }
}

/// Integer literal as sign and magnitude, so both the full u64 range and
/// i64::MIN are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntLit {
    pub negative: bool,
    pub magnitude: u64,
}

impl IntLit {
    /// Value as an N-bit integer pattern: negative literals must fit the
    /// signed range, non-negative ones the unsigned range.
    pub fn to_bits(self, bits: u32) -> Option<u64> {
        let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
        if self.negative {
            if self.magnitude > 1u64 << (bits - 1) {
                return None;
            }
            Some(self.magnitude.wrapping_neg() & mask)
        } else if self.magnitude > mask {
            None
        } else {
            Some(self.magnitude)
        }
    }

    pub fn to_i32(self) -> Option<i32> {
        self.to_bits(32).map(|bits| bits as u32 as i32)
    }

    pub fn to_i64(self) -> Option<i64> {
        self.to_bits(64).map(|bits| bits as i64)
    }

    /// Non-negative value fitting in u32, for indices and limits.
    pub fn to_u32(self) -> Option<u32> {
        if self.negative {
            return None;
        }
        u32::try_from(self.magnitude).ok()
    }
}

/// Float literal, kept as source text so f32 and f64 each round once.
#[derive(Debug, Clone, PartialEq)]
pub enum FloatLit {
    Decimal { negative: bool, text: String },
    Hex { negative: bool, text: String },
    Inf { negative: bool },
    /// `nan` or `nan:0x...` with an explicit payload
    Nan { negative: bool, payload: Option<u64> },
}

impl FloatLit {
    pub fn to_f64(&self) -> f64 {
        let (negative, magnitude) = match self {
            FloatLit::Decimal { negative, text } => (*negative, text.parse().unwrap_or(f64::NAN)),
            FloatLit::Hex { negative, text } => (*negative, f64::from_hex(text).unwrap_or(f64::NAN)),
            FloatLit::Inf { negative } => (*negative, f64::INFINITY),
            FloatLit::Nan { negative, payload } => {
                let payload = payload.unwrap_or(1 << 51) & ((1 << 52) - 1);
                (*negative, f64::from_bits(0x7ff0_0000_0000_0000 | payload))
            }
        };
        if negative {
            -magnitude
        } else {
            magnitude
        }
    }

    pub fn to_f32(&self) -> f32 {
        let (negative, magnitude) = match self {
            FloatLit::Decimal { negative, text } => (*negative, text.parse().unwrap_or(f32::NAN)),
            FloatLit::Hex { negative, text } => (*negative, f32::from_hex(text).unwrap_or(f32::NAN)),
            FloatLit::Inf { negative } => (*negative, f32::INFINITY),
            FloatLit::Nan { negative, payload } => {
                let payload = payload.unwrap_or(1 << 22) as u32 & ((1 << 23) - 1);
                (*negative, f32::from_bits(0x7f80_0000 | payload))
            }
        };
        if negative {
            -magnitude
        } else {
            magnitude
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_bits() {
        let int = |negative, magnitude| IntLit { negative, magnitude };
        assert_eq!(int(false, 0xffff_ffff).to_i32(), Some(-1));
        assert_eq!(int(true, 0x8000_0000).to_i32(), Some(i32::MIN));
        assert_eq!(int(true, 0x8000_0001).to_i32(), None);
        assert_eq!(int(false, 0x1_0000_0000).to_i32(), None);
        assert_eq!(int(true, 1 << 63).to_i64(), Some(i64::MIN));
        assert_eq!(int(false, u64::MAX).to_i64(), Some(-1));
        assert_eq!(int(true, 0).to_u32(), None);
        assert_eq!(int(false, 7).to_u32(), Some(7));
    }

    #[test]
    fn test_float_values() {
        let decimal = FloatLit::Decimal {
            negative: true,
            text: "1.5".to_string(),
        };
        assert_eq!(decimal.to_f64(), -1.5);
        assert_eq!(decimal.to_f32(), -1.5);
        assert_eq!(FloatLit::Inf { negative: false }.to_f32(), f32::INFINITY);

        let nan = FloatLit::Nan {
            negative: false,
            payload: Some(1),
        };
        assert_eq!(nan.to_f32().to_bits(), 0x7f80_0001);
        let canonical = FloatLit::Nan {
            negative: true,
            payload: None,
        };
        assert_eq!(canonical.to_f64().to_bits(), 0xfff8_0000_0000_0000);
    }

    #[test]
    fn test_span_display() {
        let span = Span::new(4, 9, 2, 3);
        assert_eq!(span.to_string(), "2:3");
        assert_eq!(span.to(Span::new(12, 14, 2, 11)), Span::new(4, 14, 2, 3));
    }
}
