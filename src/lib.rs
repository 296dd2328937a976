//! A WebAssembly 1.0 decoder and interpreter.
//!
//! wasm-interp reads a module from its binary or text encoding into one
//! in-memory representation, instantiates it into a [`runtime::Store`] and
//! executes exported functions on a stack-machine interpreter.
//!
//! # Modules
//!
//! - [`parser`] -- Binary format decoder. Reads `.wasm` bytes into a [`parser::module::Module`].
//! - [`wat`] -- Text format translator. Reads WAT source into the same `Module`, and prints it back.
//! - [`encoder`] -- Binary encoder. Serialises a `Module` back to `.wasm` bytes.
//! - [`runtime`] -- Store, instantiation, and the interpreter.
//!
//! # Example
//!
//! Decode a binary module, instantiate it, and call an exported function:
//!
//! ```
//! use wasm_interp::runtime::Value;
//! use wasm_interp::{instantiate, invoke, parse};
//!
//! // (func (export "add") (param i32 i32) (result i32) local.get 0 local.get 1 i32.add)
//! let bytes = [
//!     0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, // preamble
//!     0x01, 0x07, 0x01, 0x60, 0x02, 0x7f, 0x7f, 0x01, 0x7f, // type
//!     0x03, 0x02, 0x01, 0x00, // function
//!     0x07, 0x07, 0x01, 0x03, b'a', b'd', b'd', 0x00, 0x00, // export
//!     0x0a, 0x09, 0x01, 0x07, 0x00, 0x20, 0x00, 0x20, 0x01, 0x6a, 0x0b, // code
//! ];
//! let module = parse(&bytes).unwrap();
//! let mut store = instantiate(&module).unwrap();
//! let results = invoke(&module, &mut store, "add", &[Value::I32(7), Value::I32(35)]).unwrap();
//! assert_eq!(results, vec![Value::I32(42)]);
//! ```

pub mod encoder;
pub mod parser;
pub mod runtime;
pub mod wat;

pub use parser::{parse, parse_file, DecodeError};
pub use runtime::{instantiate, instantiate_with_imports, invoke, RuntimeError};

use parser::instruction::Instruction;
use runtime::Value;

/// Evaluate a constant expression that does not refer to any global.
///
/// ```
/// use wasm_interp::parser::instruction::Instruction;
/// use wasm_interp::runtime::Value;
///
/// let value = wasm_interp::evaluate_const(&[Instruction::I64Const { value: -1 }]).unwrap();
/// assert_eq!(value, Value::I64(-1));
/// ```
pub fn evaluate_const(expr: &[Instruction]) -> Result<Value, RuntimeError> {
    runtime::evaluate_const(expr, &[])
}
