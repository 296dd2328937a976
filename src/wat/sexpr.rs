//! S-expression reader.
//!
//! Text is read in two phases: tokens are first matched into a tree of
//! atoms and lists, then the tree is translated into a module. Having the
//! whole list in hand removes the need for speculative lookahead while
//! translating.
//!
//! ```
//! use wasm_interp::wat::sexpr::read;
//!
//! let sexpr = read("(module (func $add (param i32 i32) (result i32)))").unwrap();
//! let list = sexpr.as_list().unwrap();
//! assert_eq!(list.head_keyword(), Some("module"));
//! assert_eq!(list.items.len(), 2);
//! ```

use super::error::WatError;
use super::lexer::Lexer;
use super::token::{Span, Token, TokenKind};
use std::iter::Peekable;

#[derive(Debug, Clone)]
pub enum SExpr {
    Atom(Token),
    /// The span covers both parentheses.
    List { span: Span, items: Vec<SExpr> },
}

impl SExpr {
    pub fn span(&self) -> Span {
        match self {
            SExpr::Atom(token) => token.span,
            SExpr::List { span, .. } => *span,
        }
    }

    pub fn as_atom(&self) -> Option<&Token> {
        match self {
            SExpr::Atom(token) => Some(token),
            SExpr::List { .. } => None,
        }
    }

    pub fn as_list(&self) -> Option<SExprList<'_>> {
        match self {
            SExpr::Atom(_) => None,
            SExpr::List { span, items } => Some(SExprList { span: *span, items }),
        }
    }

    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            SExpr::Atom(Token {
                kind: TokenKind::Keyword(kw),
                ..
            }) => Some(kw),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<&str> {
        match self {
            SExpr::Atom(Token {
                kind: TokenKind::Id(id),
                ..
            }) => Some(id),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            SExpr::Atom(Token {
                kind: TokenKind::String(bytes),
                ..
            }) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_list_headed_by(&self, keyword: &str) -> bool {
        self.as_list().is_some_and(|list| list.head_keyword() == Some(keyword))
    }

    pub fn expect_list(&self) -> Result<SExprList<'_>, WatError> {
        self.as_list().ok_or_else(|| WatError::new("expected list", self.span()))
    }

    pub fn expect_keyword(&self) -> Result<&str, WatError> {
        self.as_keyword()
            .ok_or_else(|| WatError::new("expected keyword", self.span()))
    }

    /// A short description for "expected X, found Y" errors.
    pub fn describe(&self) -> String {
        match self {
            SExpr::Atom(token) => token.kind.to_string(),
            SExpr::List { items, .. } => match items.first().and_then(SExpr::as_keyword) {
                Some(head) => format!("'({head} ...)'"),
                None => "list".to_string(),
            },
        }
    }
}

/// Borrowed view of a list.
#[derive(Debug, Clone, Copy)]
pub struct SExprList<'a> {
    pub span: Span,
    pub items: &'a [SExpr],
}

impl<'a> SExprList<'a> {
    pub fn head_keyword(&self) -> Option<&'a str> {
        self.items.first().and_then(SExpr::as_keyword)
    }

    pub fn tail(&self) -> &'a [SExpr] {
        self.items.get(1..).unwrap_or(&[])
    }

    pub fn filter_lists<'b>(&'b self, keyword: &'b str) -> impl Iterator<Item = SExprList<'a>> + 'b {
        self.items
            .iter()
            .filter(move |s| s.is_list_headed_by(keyword))
            .filter_map(SExpr::as_list)
    }
}

/// Read exactly one expression from `source`.
pub fn read(source: &str) -> Result<SExpr, WatError> {
    let mut tokens = Lexer::new(source).peekable();
    let sexpr = match tokens.peek() {
        Some(_) => read_sexpr(&mut tokens)?,
        None => return Err(WatError::new("unexpected end of input", Span::new(0, 0, 1, 1))),
    };
    match tokens.next() {
        Some(Ok(token)) => Err(WatError::new("unexpected token after expression", token.span)),
        Some(Err(e)) => Err(e),
        None => Ok(sexpr),
    }
}

/// Read every top-level expression in `source`.
pub fn read_all(source: &str) -> Result<Vec<SExpr>, WatError> {
    let mut tokens = Lexer::new(source).peekable();
    let mut results = Vec::new();
    while tokens.peek().is_some() {
        results.push(read_sexpr(&mut tokens)?);
    }
    Ok(results)
}

fn read_sexpr<I>(tokens: &mut Peekable<I>) -> Result<SExpr, WatError>
where
    I: Iterator<Item = Result<Token, WatError>>,
{
    let open = match tokens.next() {
        Some(token) => token?,
        None => return Err(WatError::new("unexpected end of input", Span::new(0, 0, 1, 1))),
    };
    match open.kind {
        TokenKind::LeftParen => {}
        TokenKind::RightParen => return Err(WatError::new("unexpected ')'", open.span)),
        _ => return Ok(SExpr::Atom(open)),
    }

    let mut items = Vec::new();
    loop {
        match tokens.peek() {
            None => return Err(WatError::new("unclosed '('", open.span)),
            Some(Err(_)) => {
                if let Some(Err(e)) = tokens.next() {
                    return Err(e);
                }
            }
            Some(Ok(Token {
                kind: TokenKind::RightParen,
                span,
            })) => {
                let span = open.span.to(*span);
                tokens.next();
                return Ok(SExpr::List { span, items });
            }
            Some(Ok(_)) => items.push(read_sexpr(tokens)?),
        }
    }
}
