//! Host imports
//!
//! An [`Imports`] registry maps `(module, name)` pairs to host functions and
//! host global values. Instantiation resolves each function and global import
//! of a module against it; anything missing is a link error.

use super::{RuntimeError, Value};
use crate::parser::module::FunctionType;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type HostFn = dyn Fn(&[Value]) -> Result<Vec<Value>, RuntimeError> + Send + Sync;

/// A host function together with the signature it was registered under.
#[derive(Clone)]
pub struct HostFunction {
    pub func_type: FunctionType,
    func: Arc<HostFn>,
}

impl HostFunction {
    pub fn new<F>(func_type: FunctionType, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Vec<Value>, RuntimeError> + Send + Sync + 'static,
    {
        HostFunction {
            func_type,
            func: Arc::new(func),
        }
    }

    /// Call the host closure, checking its results against the signature.
    pub fn call(&self, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        let results = (self.func)(args)?;
        if results.len() != self.func_type.return_types.len() {
            return Err(RuntimeError::ArgumentCount {
                expected: self.func_type.return_types.len(),
                actual: results.len(),
            });
        }
        for (value, expected) in results.iter().zip(&self.func_type.return_types) {
            if value.typ() != *expected {
                return Err(RuntimeError::TypeMismatch {
                    expected: *expected,
                    actual: value.typ(),
                });
            }
        }
        Ok(results)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostFunction{}", self.func_type)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Imports {
    functions: HashMap<(String, String), HostFunction>,
    globals: HashMap<(String, String), Value>,
}

impl Imports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host function under `module.name`.
    pub fn add_function<F>(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        func_type: FunctionType,
        func: F,
    ) where
        F: Fn(&[Value]) -> Result<Vec<Value>, RuntimeError> + Send + Sync + 'static,
    {
        self.functions
            .insert((module.into(), name.into()), HostFunction::new(func_type, func));
    }

    /// Register a host global value under `module.name`.
    pub fn add_global(&mut self, module: impl Into<String>, name: impl Into<String>, value: Value) {
        self.globals.insert((module.into(), name.into()), value);
    }

    pub fn function(&self, module: &str, name: &str) -> Option<&HostFunction> {
        self.functions.get(&(module.to_string(), name.to_string()))
    }

    pub fn global(&self, module: &str, name: &str) -> Option<Value> {
        self.globals.get(&(module.to_string(), name.to_string())).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.globals.is_empty()
    }
}
