use super::token::Span;
use std::fmt;

/// Error from any stage of reading text: lexing, matching parentheses or
/// translating fields into a module.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct WatError {
    pub message: String,
    pub span: Span,
}

impl WatError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    pub fn expected(expected: &str, found: impl fmt::Display, span: Span) -> Self {
        Self::new(format!("expected {expected}, found {found}"), span)
    }

    pub fn undefined(kind: &str, name: &str, span: Span) -> Self {
        Self::new(format!("undefined {kind}: ${name}"), span)
    }
}

impl fmt::Display for WatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.message)
    }
}

impl std::error::Error for WatError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let span = Span::new(10, 11, 3, 5);
        assert_eq!(WatError::new("unexpected character", span).to_string(), "3:5: unexpected character");
        assert_eq!(
            WatError::undefined("function", "main", span).to_string(),
            "3:5: undefined function: $main"
        );
    }
}
