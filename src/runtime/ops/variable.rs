//! Variable operations: locals of the current frame and module globals.

use super::{RuntimeError, Stack};
use crate::runtime::frame::Frame;
use crate::runtime::store::GlobalInstance;

/// local.get x: push a copy of local x.
pub fn local_get(stack: &mut Stack, frame: &Frame, local_idx: u32) -> Result<(), RuntimeError> {
    stack.push(frame.local(local_idx)?);
    Ok(())
}

/// local.set x: pop a value into local x.
pub fn local_set(stack: &mut Stack, frame: &mut Frame, local_idx: u32) -> Result<(), RuntimeError> {
    let value = stack.pop()?;
    frame.set_local(local_idx, value)
}

/// local.tee x: like local.set, leaving the value on the stack.
pub fn local_tee(stack: &mut Stack, frame: &mut Frame, local_idx: u32) -> Result<(), RuntimeError> {
    let value = stack.pop()?;
    frame.set_local(local_idx, value)?;
    stack.push(value);
    Ok(())
}

pub fn global_get(stack: &mut Stack, globals: &[GlobalInstance], global_idx: u32) -> Result<(), RuntimeError> {
    let global = globals
        .get(global_idx as usize)
        .ok_or(RuntimeError::GlobalIndexOutOfBounds(global_idx))?;
    stack.push(global.value);
    Ok(())
}

/// global.set x
/// 1. Global x must be mutable.
/// 2. Pop a value of the global's type and store it.
pub fn global_set(stack: &mut Stack, globals: &mut [GlobalInstance], global_idx: u32) -> Result<(), RuntimeError> {
    let global = globals
        .get_mut(global_idx as usize)
        .ok_or(RuntimeError::GlobalIndexOutOfBounds(global_idx))?;
    if !global.mutable {
        return Err(RuntimeError::ImmutableGlobal(global_idx));
    }
    global.value = stack.pop_typed(global.value.typ())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::parser::instruction::Instruction;
    use crate::parser::module::ValueType;
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::Value;

    #[test]
    fn params_are_locals() {
        ExecutorTest::new()
            .args(vec![Value::I32(3), Value::I64(4)])
            .inst(Instruction::LocalGet { local_idx: 1 })
            .inst(Instruction::LocalGet { local_idx: 0 })
            .returns(vec![ValueType::I64, ValueType::I32])
            .expect_stack(vec![Value::I64(4), Value::I32(3)]);
    }

    #[test]
    fn declared_locals_start_at_zero() {
        ExecutorTest::new()
            .local(ValueType::F64)
            .inst(Instruction::LocalGet { local_idx: 0 })
            .returns(vec![ValueType::F64])
            .expect_stack(vec![Value::F64(0.0)]);
    }

    #[test]
    fn set_and_tee() {
        ExecutorTest::new()
            .arg(Value::I32(1))
            .local(ValueType::I32)
            .inst(Instruction::I32Const { value: 9 })
            .inst(Instruction::LocalTee { local_idx: 1 })
            .inst(Instruction::LocalSet { local_idx: 0 })
            .inst(Instruction::LocalGet { local_idx: 0 })
            .inst(Instruction::LocalGet { local_idx: 1 })
            .inst(Instruction::I32Add)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(18)]);
    }

    #[test]
    fn set_wrong_type() {
        ExecutorTest::new()
            .arg(Value::I32(1))
            .inst(Instruction::F32Const { value: 1.0 })
            .inst(Instruction::LocalSet { local_idx: 0 })
            .expect_error("type mismatch");
    }

    #[test]
    fn local_out_of_range() {
        ExecutorTest::new()
            .inst(Instruction::LocalGet { local_idx: 0 })
            .returns(vec![ValueType::I32])
            .expect_error("local index out of bounds: 0");
    }

    #[test]
    fn globals() {
        ExecutorTest::new()
            .global(Value::I64(5), true)
            .inst(Instruction::GlobalGet { global_idx: 0 })
            .inst(Instruction::I64Const { value: 2 })
            .inst(Instruction::I64Mul)
            .inst(Instruction::GlobalSet { global_idx: 0 })
            .inst(Instruction::GlobalGet { global_idx: 0 })
            .returns(vec![ValueType::I64])
            .expect_stack(vec![Value::I64(10)]);
    }

    #[test]
    fn immutable_global() {
        ExecutorTest::new()
            .global(Value::I32(5), false)
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::GlobalSet { global_idx: 0 })
            .expect_error("global 0 is immutable");
    }
}
