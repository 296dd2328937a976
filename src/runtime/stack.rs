//! Operand stack
//!
//! Every entry keeps its type tag, so popping with the wrong type is reported
//! as an internal `TypeMismatch` rather than silently reinterpreting bits.

use super::{RuntimeError, Value};
use crate::parser::module::ValueType;

#[derive(Debug, Default)]
pub struct Stack {
    values: Vec<Value>,
}

impl Stack {
    pub fn new() -> Self {
        Stack { values: Vec::new() }
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn push_all(&mut self, values: impl IntoIterator<Item = Value>) {
        self.values.extend(values);
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.values.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pop a value and check its type
    pub fn pop_typed(&mut self, expected: ValueType) -> Result<Value, RuntimeError> {
        let value = self.pop()?;
        if value.typ() != expected {
            return Err(RuntimeError::TypeMismatch {
                expected,
                actual: value.typ(),
            });
        }
        Ok(value)
    }

    /// Pop `types.len()` values, checking each against `types`; the top of the
    /// stack matches the last type. Values come back in declaration order.
    pub fn pop_values(&mut self, types: &[ValueType]) -> Result<Vec<Value>, RuntimeError> {
        let mut values = Vec::with_capacity(types.len());
        for value_type in types.iter().rev() {
            values.push(self.pop_typed(*value_type)?);
        }
        values.reverse();
        Ok(values)
    }

    /// Pop the top `n` values regardless of type, in stack order.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, RuntimeError> {
        if n > self.values.len() {
            return Err(RuntimeError::StackUnderflow);
        }
        Ok(self.values.split_off(self.values.len() - n))
    }

    pub fn pop_i32(&mut self) -> Result<i32, RuntimeError> {
        match self.pop()? {
            Value::I32(v) => Ok(v),
            other => Err(mismatch(ValueType::I32, &other)),
        }
    }

    pub fn pop_i64(&mut self) -> Result<i64, RuntimeError> {
        match self.pop()? {
            Value::I64(v) => Ok(v),
            other => Err(mismatch(ValueType::I64, &other)),
        }
    }

    pub fn pop_f32(&mut self) -> Result<f32, RuntimeError> {
        match self.pop()? {
            Value::F32(v) => Ok(v),
            other => Err(mismatch(ValueType::F32, &other)),
        }
    }

    pub fn pop_f64(&mut self) -> Result<f64, RuntimeError> {
        match self.pop()? {
            Value::F64(v) => Ok(v),
            other => Err(mismatch(ValueType::F64, &other)),
        }
    }

    /// Current stack depth
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop everything above `height`.
    pub fn truncate(&mut self, height: usize) {
        self.values.truncate(height);
    }

    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }

    /// Take all values, bottom first.
    pub fn drain(&mut self) -> Vec<Value> {
        self.values.drain(..).collect()
    }
}

fn mismatch(expected: ValueType, actual: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected,
        actual: actual.typ(),
    }
}
