//! Activation record of a single function call

use super::{RuntimeError, Value};
use crate::parser::module::Module;

/// Locals of the running function plus the module its code belongs to.
/// Parameters come first, followed by the zeroed declared locals.
#[derive(Debug)]
pub struct Frame<'a> {
    pub locals: Vec<Value>,
    pub module: &'a Module,
}

impl<'a> Frame<'a> {
    pub fn new(locals: Vec<Value>, module: &'a Module) -> Self {
        Frame { locals, module }
    }

    pub fn local(&self, local_idx: u32) -> Result<Value, RuntimeError> {
        self.locals
            .get(local_idx as usize)
            .copied()
            .ok_or(RuntimeError::LocalIndexOutOfBounds(local_idx))
    }

    pub fn set_local(&mut self, local_idx: u32, value: Value) -> Result<(), RuntimeError> {
        let slot = self
            .locals
            .get_mut(local_idx as usize)
            .ok_or(RuntimeError::LocalIndexOutOfBounds(local_idx))?;
        if slot.typ() != value.typ() {
            return Err(RuntimeError::TypeMismatch {
                expected: slot.typ(),
                actual: value.typ(),
            });
        }
        *slot = value;
        Ok(())
    }
}
