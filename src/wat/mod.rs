//! Text format support.
//!
//! Source is lexed, matched into s-expressions and translated into the same
//! [`Module`](crate::parser::module::Module) the binary decoder produces, so
//! both paths run on the same interpreter.
//!
//! ```
//! use wasm_interp::runtime::Value;
//! use wasm_interp::{instantiate, invoke, wat};
//!
//! let module = wat::parse(
//!     r#"(module
//!         (func (export "add") (param i32 i32) (result i32)
//!             local.get 0
//!             local.get 1
//!             i32.add))"#,
//! )
//! .unwrap();
//! let mut store = instantiate(&module).unwrap();
//! let results = invoke(&module, &mut store, "add", &[Value::I32(7), Value::I32(35)]).unwrap();
//! assert_eq!(results, vec![Value::I32(42)]);
//! ```
//!
//! Errors carry the line and column where they were found:
//!
//! ```
//! let err = wasm_interp::wat::parse("(module\n  (func i32.bogus))").unwrap_err();
//! assert_eq!(err.to_string(), "2:9: unknown operator: i32.bogus");
//! ```

mod cursor;
mod error;
mod lexer;
mod parser;
mod printer;
pub mod sexpr;
mod token;

pub use error::WatError;
pub use lexer::Lexer;
pub use parser::parse;
pub use printer::module_to_text;
pub use token::{FloatLit, IntLit, Span, Token, TokenKind};
