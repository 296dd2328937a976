//! Bitwise operations: logic, shifts and rotations.
//!
//! Shift and rotate counts are taken modulo the operand width.

use super::{RuntimeError, Stack, Value};

fn binary_i32(stack: &mut Stack, op: impl FnOnce(i32, i32) -> i32) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(op(c1, c2)));
    Ok(())
}

fn binary_i64(stack: &mut Stack, op: impl FnOnce(i64, i64) -> i64) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(op(c1, c2)));
    Ok(())
}

pub fn i32_and(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |a, b| a & b)
}

pub fn i32_or(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |a, b| a | b)
}

pub fn i32_xor(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |a, b| a ^ b)
}

/// i32.shl: `wrapping_shl` masks the count to 5 bits.
pub fn i32_shl(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |a, b| a.wrapping_shl(b as u32))
}

/// i32.shr_s: arithmetic shift, sign bit fills in.
pub fn i32_shr_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |a, b| a.wrapping_shr(b as u32))
}

/// i32.shr_u: logical shift, zeros fill in.
pub fn i32_shr_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |a, b| (a as u32).wrapping_shr(b as u32) as i32)
}

pub fn i32_rotl(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |a, b| a.rotate_left(b as u32 % 32))
}

pub fn i32_rotr(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |a, b| a.rotate_right(b as u32 % 32))
}

pub fn i64_and(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |a, b| a & b)
}

pub fn i64_or(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |a, b| a | b)
}

pub fn i64_xor(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |a, b| a ^ b)
}

pub fn i64_shl(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |a, b| a.wrapping_shl(b as u32))
}

pub fn i64_shr_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |a, b| a.wrapping_shr(b as u32))
}

pub fn i64_shr_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |a, b| (a as u64).wrapping_shr(b as u32) as i64)
}

pub fn i64_rotl(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |a, b| a.rotate_left((b as u64 % 64) as u32))
}

pub fn i64_rotr(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |a, b| a.rotate_right((b as u64 % 64) as u32))
}

#[cfg(test)]
mod tests {
    use crate::parser::instruction::Instruction;
    use crate::parser::module::ValueType;
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::Value;
    use rstest::rstest;

    #[rstest]
    #[case(Instruction::I32And, 0b1100, 0b1010, 0b1000)]
    #[case(Instruction::I32Or, 0b1100, 0b1010, 0b1110)]
    #[case(Instruction::I32Xor, 0b1100, 0b1010, 0b0110)]
    #[case(Instruction::I32Shl, 1, 33, 2)]
    #[case(Instruction::I32ShrS, -8, 1, -4)]
    #[case(Instruction::I32ShrU, -8, 28, 0xf)]
    #[case(Instruction::I32Rotl, 0x8000_0001_u32 as i32, 1, 3)]
    #[case(Instruction::I32Rotr, 1, 1, 0x8000_0000_u32 as i32)]
    fn i32_bitwise(#[case] inst: Instruction, #[case] c1: i32, #[case] c2: i32, #[case] expected: i32) {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: c1 })
            .inst(Instruction::I32Const { value: c2 })
            .inst(inst)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(expected)]);
    }

    #[rstest]
    #[case(Instruction::I64Shl, 1, 64, 1)]
    #[case(Instruction::I64ShrU, -1, 60, 0xf)]
    #[case(Instruction::I64ShrS, i64::MIN, 63, -1)]
    #[case(Instruction::I64Rotl, i64::MIN, 1, 1)]
    #[case(Instruction::I64Rotr, 1, -1, 2)]
    fn i64_bitwise(#[case] inst: Instruction, #[case] c1: i64, #[case] c2: i64, #[case] expected: i64) {
        ExecutorTest::new()
            .inst(Instruction::I64Const { value: c1 })
            .inst(Instruction::I64Const { value: c2 })
            .inst(inst)
            .returns(vec![ValueType::I64])
            .expect_stack(vec![Value::I64(expected)]);
    }
}
