//! WebAssembly runtime implementation
//!
//! This module provides the execution engine for decoded modules: the store
//! produced by instantiation, the value and operand stack representation, and
//! the recursive instruction interpreter.

pub mod control;
pub mod executor;
pub mod frame;
pub mod imports;
pub mod memory;
pub mod ops;
pub mod stack;
pub mod store;
pub mod table;
pub mod test_utils;
pub mod value;

pub use executor::{evaluate_const, invoke, Executor};
pub use imports::{HostFunction, Imports};
pub use memory::Memory;
pub use store::{instantiate, instantiate_with_imports, GlobalInstance, Store};
pub use table::Table;
pub use value::Value;

use crate::parser::module::ValueType;

/// Coarse classification of a [`RuntimeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Abrupt termination of an invocation caused by the running code
    Trap,
    /// Instantiation failed: unresolved imports or bad segment initializers
    Link,
    /// The caller asked for something the module does not offer
    Invocation,
    /// Malformed code or an engine bug
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    // Traps
    #[error("unreachable executed")]
    Unreachable,
    #[error("integer divide by zero")]
    IntegerDivideByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("invalid conversion to integer")]
    InvalidConversionToInteger,
    #[error("out of bounds memory access")]
    MemoryOutOfBounds,
    #[error("undefined element: table index {0} out of bounds")]
    TableOutOfBounds(u32),
    #[error("uninitialized element {0}")]
    UninitializedElement(u32),
    #[error("indirect call type mismatch")]
    IndirectCallTypeMismatch,
    #[error("global {0} is immutable")]
    ImmutableGlobal(u32),
    #[error("call stack exhausted")]
    CallStackExhausted,

    // Link / instantiation
    #[error("unknown import: {module}.{name}")]
    MissingImport { module: String, name: String },
    #[error("incompatible import type for {module}.{name}")]
    ImportTypeMismatch { module: String, name: String },
    #[error("element segment {0} does not fit in its table")]
    ElementOutOfBounds(usize),
    #[error("data segment {0} does not fit in memory")]
    DataOutOfBounds(usize),
    #[error("invalid constant expression: {0}")]
    InvalidConstExpr(String),
    #[error("memory error: {0}")]
    MemoryError(String),

    // Invocation
    #[error("unknown export: {0}")]
    UnknownExport(String),
    #[error("export {0} is not a function")]
    NotAFunction(String),
    #[error("wrong number of arguments: expected {expected}, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },
    #[error("argument {index} has type {actual}, expected {expected}")]
    ArgumentType {
        index: usize,
        expected: ValueType,
        actual: ValueType,
    },

    // Internal
    #[error("stack underflow")]
    StackUnderflow,
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: ValueType, actual: ValueType },
    #[error("local index out of bounds: {0}")]
    LocalIndexOutOfBounds(u32),
    #[error("global index out of bounds: {0}")]
    GlobalIndexOutOfBounds(u32),
    #[error("function index out of bounds: {0}")]
    FunctionIndexOutOfBounds(u32),
    #[error("type index out of bounds: {0}")]
    TypeIndexOutOfBounds(u32),
    #[error("invalid label: {0}")]
    InvalidLabel(u32),
    #[error("no memory instance")]
    NoMemory,
    #[error("no table instance")]
    NoTable,
    #[error("instruction not supported by the interpreter: {0}")]
    UnsupportedInstruction(String),
    #[error("cannot start execution thread: {0}")]
    ExecutionThread(String),
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        use RuntimeError::*;
        match self {
            Unreachable
            | IntegerDivideByZero
            | IntegerOverflow
            | InvalidConversionToInteger
            | MemoryOutOfBounds
            | TableOutOfBounds(_)
            | UninitializedElement(_)
            | IndirectCallTypeMismatch
            | ImmutableGlobal(_)
            | CallStackExhausted => ErrorKind::Trap,
            MissingImport { .. }
            | ImportTypeMismatch { .. }
            | ElementOutOfBounds(_)
            | DataOutOfBounds(_)
            | InvalidConstExpr(_)
            | MemoryError(_) => ErrorKind::Link,
            UnknownExport(_) | NotAFunction(_) | ArgumentCount { .. } | ArgumentType { .. } => ErrorKind::Invocation,
            StackUnderflow
            | TypeMismatch { .. }
            | LocalIndexOutOfBounds(_)
            | GlobalIndexOutOfBounds(_)
            | FunctionIndexOutOfBounds(_)
            | TypeIndexOutOfBounds(_)
            | UnsupportedInstruction(_)
            | ExecutionThread(_)
            | InvalidLabel(_)
            | NoMemory
            | NoTable => ErrorKind::Internal,
        }
    }

    /// Whether this error is a trap raised by executing code.
    pub fn is_trap(&self) -> bool {
        self.kind() == ErrorKind::Trap
    }
}
