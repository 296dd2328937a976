//! Numeric operations for WebAssembly
//!
//! Constants, integer arithmetic with two's complement wraparound, the
//! trapping division family, bit counting, and IEEE-754 float arithmetic.

use super::{RuntimeError, Stack, Value};

fn binary_i32(stack: &mut Stack, op: impl FnOnce(i32, i32) -> Result<i32, RuntimeError>) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(op(c1, c2)?));
    Ok(())
}

fn binary_i64(stack: &mut Stack, op: impl FnOnce(i64, i64) -> Result<i64, RuntimeError>) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(op(c1, c2)?));
    Ok(())
}

fn unary_f32(stack: &mut Stack, op: impl FnOnce(f32) -> f32) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f32()?;
    stack.push(Value::F32(op(c1)));
    Ok(())
}

fn unary_f64(stack: &mut Stack, op: impl FnOnce(f64) -> f64) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f64()?;
    stack.push(Value::F64(op(c1)));
    Ok(())
}

fn binary_f32(stack: &mut Stack, op: impl FnOnce(f32, f32) -> f32) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    stack.push(Value::F32(op(c1, c2)));
    Ok(())
}

fn binary_f64(stack: &mut Stack, op: impl FnOnce(f64, f64) -> f64) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push(Value::F64(op(c1, c2)));
    Ok(())
}

// ============================================================================
// Constants
// ============================================================================

pub fn i32_const(stack: &mut Stack, value: i32) -> Result<(), RuntimeError> {
    stack.push(Value::I32(value));
    Ok(())
}

pub fn i64_const(stack: &mut Stack, value: i64) -> Result<(), RuntimeError> {
    stack.push(Value::I64(value));
    Ok(())
}

pub fn f32_const(stack: &mut Stack, value: f32) -> Result<(), RuntimeError> {
    stack.push(Value::F32(value));
    Ok(())
}

pub fn f64_const(stack: &mut Stack, value: f64) -> Result<(), RuntimeError> {
    stack.push(Value::F64(value));
    Ok(())
}

// ============================================================================
// Integer arithmetic
// ============================================================================

/// i32.add: c1 + c2 modulo 2^32
pub fn i32_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |c1, c2| Ok(c1.wrapping_add(c2)))
}

pub fn i32_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |c1, c2| Ok(c1.wrapping_sub(c2)))
}

pub fn i32_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |c1, c2| Ok(c1.wrapping_mul(c2)))
}

/// i32.div_s
/// 1. Pop c2, then c1.
/// 2. If c2 is 0, trap.
/// 3. If c1 is INT32_MIN and c2 is -1 the quotient 2^31 is unrepresentable, trap.
/// 4. Push c1 / c2 truncated toward zero.
pub fn i32_div_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |c1, c2| {
        if c2 == 0 {
            return Err(RuntimeError::IntegerDivideByZero);
        }
        c1.checked_div(c2).ok_or(RuntimeError::IntegerOverflow)
    })
}

/// i32.div_u: unsigned quotient, trapping on a zero divisor.
pub fn i32_div_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |c1, c2| {
        let q = (c1 as u32)
            .checked_div(c2 as u32)
            .ok_or(RuntimeError::IntegerDivideByZero)?;
        Ok(q as i32)
    })
}

/// i32.rem_s
/// Traps on a zero divisor. INT32_MIN rem -1 is 0, not a trap.
pub fn i32_rem_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |c1, c2| {
        if c2 == 0 {
            return Err(RuntimeError::IntegerDivideByZero);
        }
        Ok(c1.wrapping_rem(c2))
    })
}

pub fn i32_rem_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i32(stack, |c1, c2| {
        let r = (c1 as u32)
            .checked_rem(c2 as u32)
            .ok_or(RuntimeError::IntegerDivideByZero)?;
        Ok(r as i32)
    })
}

pub fn i64_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |c1, c2| Ok(c1.wrapping_add(c2)))
}

pub fn i64_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |c1, c2| Ok(c1.wrapping_sub(c2)))
}

pub fn i64_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |c1, c2| Ok(c1.wrapping_mul(c2)))
}

/// i64.div_s: as i32.div_s, at 64 bits.
pub fn i64_div_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |c1, c2| {
        if c2 == 0 {
            return Err(RuntimeError::IntegerDivideByZero);
        }
        c1.checked_div(c2).ok_or(RuntimeError::IntegerOverflow)
    })
}

pub fn i64_div_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |c1, c2| {
        let q = (c1 as u64)
            .checked_div(c2 as u64)
            .ok_or(RuntimeError::IntegerDivideByZero)?;
        Ok(q as i64)
    })
}

pub fn i64_rem_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |c1, c2| {
        if c2 == 0 {
            return Err(RuntimeError::IntegerDivideByZero);
        }
        Ok(c1.wrapping_rem(c2))
    })
}

pub fn i64_rem_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_i64(stack, |c1, c2| {
        let r = (c1 as u64)
            .checked_rem(c2 as u64)
            .ok_or(RuntimeError::IntegerDivideByZero)?;
        Ok(r as i64)
    })
}

// ============================================================================
// Bit counting
// ============================================================================

pub fn i32_clz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1.leading_zeros() as i32));
    Ok(())
}

pub fn i32_ctz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1.trailing_zeros() as i32));
    Ok(())
}

pub fn i32_popcnt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1.count_ones() as i32));
    Ok(())
}

pub fn i64_clz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(i64::from(c1.leading_zeros())));
    Ok(())
}

pub fn i64_ctz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(i64::from(c1.trailing_zeros())));
    Ok(())
}

pub fn i64_popcnt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(i64::from(c1.count_ones())));
    Ok(())
}

// ============================================================================
// Float unary operations
// ============================================================================

pub fn f32_abs(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f32(stack, f32::abs)
}

pub fn f32_neg(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f32(stack, |v| -v)
}

pub fn f32_ceil(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f32(stack, f32::ceil)
}

pub fn f32_floor(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f32(stack, f32::floor)
}

pub fn f32_trunc(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f32(stack, f32::trunc)
}

/// f32.nearest: round to nearest, ties to even.
pub fn f32_nearest(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f32(stack, f32::round_ties_even)
}

pub fn f32_sqrt(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f32(stack, f32::sqrt)
}

pub fn f64_abs(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f64(stack, f64::abs)
}

pub fn f64_neg(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f64(stack, |v| -v)
}

pub fn f64_ceil(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f64(stack, f64::ceil)
}

pub fn f64_floor(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f64(stack, f64::floor)
}

pub fn f64_trunc(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f64(stack, f64::trunc)
}

pub fn f64_nearest(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f64(stack, f64::round_ties_even)
}

pub fn f64_sqrt(stack: &mut Stack) -> Result<(), RuntimeError> {
    unary_f64(stack, f64::sqrt)
}

// ============================================================================
// Float binary operations
// ============================================================================

pub fn f32_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f32(stack, |c1, c2| c1 + c2)
}

pub fn f32_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f32(stack, |c1, c2| c1 - c2)
}

pub fn f32_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f32(stack, |c1, c2| c1 * c2)
}

/// f32.div: division by zero gives ±inf or NaN per IEEE 754, never a trap.
pub fn f32_div(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f32(stack, |c1, c2| c1 / c2)
}

/// f32.min
/// NaN if either operand is NaN; -0.0 is smaller than +0.0.
pub fn f32_min(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f32(stack, |c1, c2| {
        if c1.is_nan() || c2.is_nan() {
            f32::NAN
        } else if c1 == 0.0 && c2 == 0.0 {
            if c1.is_sign_negative() {
                c1
            } else {
                c2
            }
        } else {
            c1.min(c2)
        }
    })
}

/// f32.max
/// NaN if either operand is NaN; +0.0 is larger than -0.0.
pub fn f32_max(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f32(stack, |c1, c2| {
        if c1.is_nan() || c2.is_nan() {
            f32::NAN
        } else if c1 == 0.0 && c2 == 0.0 {
            if c1.is_sign_negative() {
                c2
            } else {
                c1
            }
        } else {
            c1.max(c2)
        }
    })
}

pub fn f32_copysign(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f32(stack, f32::copysign)
}

pub fn f64_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f64(stack, |c1, c2| c1 + c2)
}

pub fn f64_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f64(stack, |c1, c2| c1 - c2)
}

pub fn f64_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f64(stack, |c1, c2| c1 * c2)
}

pub fn f64_div(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f64(stack, |c1, c2| c1 / c2)
}

pub fn f64_min(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f64(stack, |c1, c2| {
        if c1.is_nan() || c2.is_nan() {
            f64::NAN
        } else if c1 == 0.0 && c2 == 0.0 {
            if c1.is_sign_negative() {
                c1
            } else {
                c2
            }
        } else {
            c1.min(c2)
        }
    })
}

pub fn f64_max(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f64(stack, |c1, c2| {
        if c1.is_nan() || c2.is_nan() {
            f64::NAN
        } else if c1 == 0.0 && c2 == 0.0 {
            if c1.is_sign_negative() {
                c2
            } else {
                c1
            }
        } else {
            c1.max(c2)
        }
    })
}

pub fn f64_copysign(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary_f64(stack, f64::copysign)
}

#[cfg(test)]
mod tests {
    use crate::parser::instruction::Instruction;
    use crate::parser::module::ValueType;
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::Value;

    fn i32_binop(inst: Instruction, c1: i32, c2: i32) -> ExecutorTest {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: c1 })
            .inst(Instruction::I32Const { value: c2 })
            .inst(inst)
            .returns(vec![ValueType::I32])
    }

    fn i64_binop(inst: Instruction, c1: i64, c2: i64) -> ExecutorTest {
        ExecutorTest::new()
            .inst(Instruction::I64Const { value: c1 })
            .inst(Instruction::I64Const { value: c2 })
            .inst(inst)
            .returns(vec![ValueType::I64])
    }

    fn f32_binop(inst: Instruction, c1: f32, c2: f32) -> ExecutorTest {
        ExecutorTest::new()
            .inst(Instruction::F32Const { value: c1 })
            .inst(Instruction::F32Const { value: c2 })
            .inst(inst)
            .returns(vec![ValueType::F32])
    }

    #[test]
    fn i32_add_wraps() {
        i32_binop(Instruction::I32Add, 7, 35).expect_stack(vec![Value::I32(42)]);
        i32_binop(Instruction::I32Add, i32::MAX, 1).expect_stack(vec![Value::I32(i32::MIN)]);
    }

    #[test]
    fn i32_sub_mul() {
        i32_binop(Instruction::I32Sub, 0, 1).expect_stack(vec![Value::I32(-1)]);
        i32_binop(Instruction::I32Mul, 0x10000, 0x10000).expect_stack(vec![Value::I32(0)]);
    }

    #[test]
    fn i32_div_s_traps() {
        i32_binop(Instruction::I32DivS, 1, 0).expect_error("integer divide by zero");
        i32_binop(Instruction::I32DivS, i32::MIN, -1).expect_error("integer overflow");
        i32_binop(Instruction::I32DivS, -7, 2).expect_stack(vec![Value::I32(-3)]);
    }

    #[test]
    fn i32_unsigned_division() {
        i32_binop(Instruction::I32DivU, -1, 2).expect_stack(vec![Value::I32(0x7fffffff)]);
        i32_binop(Instruction::I32RemU, -1, 10).expect_stack(vec![Value::I32(5)]);
        i32_binop(Instruction::I32DivU, 1, 0).expect_error("integer divide by zero");
        i32_binop(Instruction::I32RemU, 1, 0).expect_error("integer divide by zero");
    }

    #[test]
    fn i32_rem_s_min_by_minus_one() {
        i32_binop(Instruction::I32RemS, i32::MIN, -1).expect_stack(vec![Value::I32(0)]);
        i32_binop(Instruction::I32RemS, -7, 2).expect_stack(vec![Value::I32(-1)]);
        i32_binop(Instruction::I32RemS, 5, 0).expect_error("integer divide by zero");
    }

    #[test]
    fn i64_arithmetic() {
        i64_binop(Instruction::I64Mul, 5, 24).expect_stack(vec![Value::I64(120)]);
        i64_binop(Instruction::I64Sub, i64::MIN, 1).expect_stack(vec![Value::I64(i64::MAX)]);
        i64_binop(Instruction::I64DivS, i64::MIN, -1).expect_error("integer overflow");
        i64_binop(Instruction::I64DivU, -1, 0).expect_error("integer divide by zero");
        i64_binop(Instruction::I64RemS, i64::MIN, -1).expect_stack(vec![Value::I64(0)]);
    }

    #[test]
    fn bit_counting() {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Clz)
            .inst(Instruction::I32Const { value: 0 })
            .inst(Instruction::I32Ctz)
            .inst(Instruction::I64Const { value: -1 })
            .inst(Instruction::I64Popcnt)
            .returns(vec![ValueType::I32, ValueType::I32, ValueType::I64])
            .expect_stack(vec![Value::I32(31), Value::I32(32), Value::I64(64)]);
    }

    #[test]
    fn float_arithmetic() {
        f32_binop(Instruction::F32Add, 1.5, 2.25).expect_stack(vec![Value::F32(3.75)]);
        f32_binop(Instruction::F32Div, 1.0, 0.0).expect_stack(vec![Value::F32(f32::INFINITY)]);
        f32_binop(Instruction::F32Copysign, 2.0, -0.0).expect_stack(vec![Value::F32(-2.0)]);
    }

    #[test]
    fn float_min_max_zero_sign() {
        let result = f32_binop(Instruction::F32Min, 0.0, -0.0).run().unwrap();
        assert!(result[0].as_f32().unwrap().is_sign_negative());
        let result = f32_binop(Instruction::F32Max, -0.0, 0.0).run().unwrap();
        assert!(result[0].as_f32().unwrap().is_sign_positive());
        let result = f32_binop(Instruction::F32Min, f32::NAN, 1.0).run().unwrap();
        assert!(result[0].as_f32().unwrap().is_nan());
    }

    #[test]
    fn float_rounding() {
        ExecutorTest::new()
            .inst(Instruction::F64Const { value: 2.5 })
            .inst(Instruction::F64Nearest)
            .inst(Instruction::F64Const { value: -1.5 })
            .inst(Instruction::F64Ceil)
            .inst(Instruction::F64Const { value: 16.0 })
            .inst(Instruction::F64Sqrt)
            .returns(vec![ValueType::F64, ValueType::F64, ValueType::F64])
            .expect_stack(vec![Value::F64(2.0), Value::F64(-1.0), Value::F64(4.0)]);
    }
}
