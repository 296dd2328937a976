//! Comparison operations
//!
//! Every comparison pops its operands and pushes an i32 boolean: 1 for true,
//! 0 for false. Unsigned variants reinterpret the operand bits. Float
//! comparisons follow IEEE 754, so any comparison with NaN is false except
//! `ne`.

use super::{RuntimeError, Stack, Value};

fn push_bool(stack: &mut Stack, b: bool) {
    stack.push(Value::I32(b as i32));
}

fn compare_i32(stack: &mut Stack, op: impl FnOnce(i32, i32) -> bool) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    push_bool(stack, op(c1, c2));
    Ok(())
}

fn compare_i64(stack: &mut Stack, op: impl FnOnce(i64, i64) -> bool) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    push_bool(stack, op(c1, c2));
    Ok(())
}

fn compare_f32(stack: &mut Stack, op: impl FnOnce(f32, f32) -> bool) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    push_bool(stack, op(c1, c2));
    Ok(())
}

fn compare_f64(stack: &mut Stack, op: impl FnOnce(f64, f64) -> bool) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    push_bool(stack, op(c1, c2));
    Ok(())
}

/// i32.eqz: 1 if the operand is zero
pub fn i32_eqz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i32()?;
    push_bool(stack, c1 == 0);
    Ok(())
}

pub fn i32_eq(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i32(stack, |a, b| a == b)
}

pub fn i32_ne(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i32(stack, |a, b| a != b)
}

pub fn i32_lt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i32(stack, |a, b| a < b)
}

pub fn i32_lt_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i32(stack, |a, b| (a as u32) < (b as u32))
}

pub fn i32_gt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i32(stack, |a, b| a > b)
}

pub fn i32_gt_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i32(stack, |a, b| (a as u32) > (b as u32))
}

pub fn i32_le_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i32(stack, |a, b| a <= b)
}

pub fn i32_le_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i32(stack, |a, b| (a as u32) <= (b as u32))
}

pub fn i32_ge_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i32(stack, |a, b| a >= b)
}

pub fn i32_ge_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i32(stack, |a, b| (a as u32) >= (b as u32))
}

pub fn i64_eqz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i64()?;
    push_bool(stack, c1 == 0);
    Ok(())
}

pub fn i64_eq(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i64(stack, |a, b| a == b)
}

pub fn i64_ne(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i64(stack, |a, b| a != b)
}

pub fn i64_lt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i64(stack, |a, b| a < b)
}

pub fn i64_lt_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i64(stack, |a, b| (a as u64) < (b as u64))
}

pub fn i64_gt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i64(stack, |a, b| a > b)
}

pub fn i64_gt_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i64(stack, |a, b| (a as u64) > (b as u64))
}

pub fn i64_le_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i64(stack, |a, b| a <= b)
}

pub fn i64_le_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i64(stack, |a, b| (a as u64) <= (b as u64))
}

pub fn i64_ge_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i64(stack, |a, b| a >= b)
}

pub fn i64_ge_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_i64(stack, |a, b| (a as u64) >= (b as u64))
}

pub fn f32_eq(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_f32(stack, |a, b| a == b)
}

/// f32.ne: true when either operand is NaN
pub fn f32_ne(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_f32(stack, |a, b| a != b)
}

pub fn f32_lt(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_f32(stack, |a, b| a < b)
}

pub fn f32_gt(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_f32(stack, |a, b| a > b)
}

pub fn f32_le(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_f32(stack, |a, b| a <= b)
}

pub fn f32_ge(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_f32(stack, |a, b| a >= b)
}

pub fn f64_eq(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_f64(stack, |a, b| a == b)
}

pub fn f64_ne(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_f64(stack, |a, b| a != b)
}

pub fn f64_lt(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_f64(stack, |a, b| a < b)
}

pub fn f64_gt(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_f64(stack, |a, b| a > b)
}

pub fn f64_le(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_f64(stack, |a, b| a <= b)
}

pub fn f64_ge(stack: &mut Stack) -> Result<(), RuntimeError> {
    compare_f64(stack, |a, b| a >= b)
}

#[cfg(test)]
mod tests {
    use crate::parser::instruction::Instruction;
    use crate::parser::module::ValueType;
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::Value;
    use rstest::rstest;

    #[rstest]
    #[case(Instruction::I32LtS, -1, 1, 1)]
    #[case(Instruction::I32LtU, -1, 1, 0)]
    #[case(Instruction::I32GeU, -1, 1, 1)]
    #[case(Instruction::I32Eq, 5, 5, 1)]
    #[case(Instruction::I32Ne, 5, 5, 0)]
    #[case(Instruction::I32LeS, i32::MIN, i32::MAX, 1)]
    fn i32_comparisons(#[case] inst: Instruction, #[case] c1: i32, #[case] c2: i32, #[case] expected: i32) {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: c1 })
            .inst(Instruction::I32Const { value: c2 })
            .inst(inst)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(expected)]);
    }

    #[test]
    fn i64_unsigned() {
        ExecutorTest::new()
            .inst(Instruction::I64Const { value: -1 })
            .inst(Instruction::I64Const { value: 0 })
            .inst(Instruction::I64GtU)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(1)]);
    }

    #[test]
    fn eqz() {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: 0 })
            .inst(Instruction::I32Eqz)
            .inst(Instruction::I64Const { value: 3 })
            .inst(Instruction::I64Eqz)
            .returns(vec![ValueType::I32, ValueType::I32])
            .expect_stack(vec![Value::I32(1), Value::I32(0)]);
    }

    #[test]
    fn nan_compares_unequal() {
        ExecutorTest::new()
            .inst(Instruction::F64Const { value: f64::NAN })
            .inst(Instruction::F64Const { value: f64::NAN })
            .inst(Instruction::F64Eq)
            .inst(Instruction::F32Const { value: f32::NAN })
            .inst(Instruction::F32Const { value: 1.0 })
            .inst(Instruction::F32Ne)
            .returns(vec![ValueType::I32, ValueType::I32])
            .expect_stack(vec![Value::I32(0), Value::I32(1)]);
    }

    #[test]
    fn operand_type_checked() {
        ExecutorTest::new()
            .inst(Instruction::I64Const { value: 1 })
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Eq)
            .returns(vec![ValueType::I32])
            .expect_error("type mismatch");
    }
}
