//! Conversion operations
//!
//! Wrapping, extension, float to integer truncation, integer to float
//! conversion, float precision changes and bit reinterpretation.
//!
//! Truncation traps when the operand is NaN, infinite, or its truncated value
//! does not fit the target integer type.

use super::{RuntimeError, Stack, Value};

// Float bounds for truncation. Each range is [lower, upper) after truncation
// toward zero: the upper bound is the first power of two past the target
// type's maximum, which every float format represents exactly.
const I32_LOWER: f64 = -2147483648.0;
const I32_UPPER: f64 = 2147483648.0;
const U32_UPPER: f64 = 4294967296.0;
const I64_LOWER: f64 = -9223372036854775808.0;
const I64_UPPER: f64 = 9223372036854775808.0;
const U64_UPPER: f64 = 18446744073709551616.0;

fn truncate(value: f64, lower: f64, upper: f64) -> Result<f64, RuntimeError> {
    if !value.is_finite() {
        return Err(RuntimeError::InvalidConversionToInteger);
    }
    let t = value.trunc();
    // -0.0 and anything in (-1, 0) truncate to zero, which fits unsigned types
    if t == 0.0 {
        return Ok(0.0);
    }
    if t < lower || t >= upper {
        return Err(RuntimeError::InvalidConversionToInteger);
    }
    Ok(t)
}

/// i32.wrap_i64: keep the low 32 bits.
pub fn i32_wrap_i64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i64()?;
    stack.push(Value::I32(c1 as i32));
    Ok(())
}

pub fn i32_trunc_f32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f32()?;
    let t = truncate(f64::from(c1), I32_LOWER, I32_UPPER)?;
    stack.push(Value::I32(t as i32));
    Ok(())
}

pub fn i32_trunc_f32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f32()?;
    let t = truncate(f64::from(c1), 0.0, U32_UPPER)?;
    stack.push(Value::I32(t as u32 as i32));
    Ok(())
}

pub fn i32_trunc_f64_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f64()?;
    let t = truncate(c1, I32_LOWER, I32_UPPER)?;
    stack.push(Value::I32(t as i32));
    Ok(())
}

pub fn i32_trunc_f64_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f64()?;
    let t = truncate(c1, 0.0, U32_UPPER)?;
    stack.push(Value::I32(t as u32 as i32));
    Ok(())
}

pub fn i64_extend_i32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i32()?;
    stack.push(Value::I64(i64::from(c1)));
    Ok(())
}

pub fn i64_extend_i32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i32()?;
    stack.push(Value::I64(i64::from(c1 as u32)));
    Ok(())
}

pub fn i64_trunc_f32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f32()?;
    let t = truncate(f64::from(c1), I64_LOWER, I64_UPPER)?;
    stack.push(Value::I64(t as i64));
    Ok(())
}

pub fn i64_trunc_f32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f32()?;
    let t = truncate(f64::from(c1), 0.0, U64_UPPER)?;
    stack.push(Value::I64(t as u64 as i64));
    Ok(())
}

pub fn i64_trunc_f64_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f64()?;
    let t = truncate(c1, I64_LOWER, I64_UPPER)?;
    stack.push(Value::I64(t as i64));
    Ok(())
}

pub fn i64_trunc_f64_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f64()?;
    let t = truncate(c1, 0.0, U64_UPPER)?;
    stack.push(Value::I64(t as u64 as i64));
    Ok(())
}

pub fn f32_convert_i32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i32()?;
    stack.push(Value::F32(c1 as f32));
    Ok(())
}

pub fn f32_convert_i32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i32()?;
    stack.push(Value::F32(c1 as u32 as f32));
    Ok(())
}

pub fn f32_convert_i64_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i64()?;
    stack.push(Value::F32(c1 as f32));
    Ok(())
}

pub fn f32_convert_i64_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i64()?;
    stack.push(Value::F32(c1 as u64 as f32));
    Ok(())
}

/// f32.demote_f64: round to nearest; out of range values become ±inf.
pub fn f32_demote_f64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f64()?;
    stack.push(Value::F32(c1 as f32));
    Ok(())
}

pub fn f64_convert_i32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i32()?;
    stack.push(Value::F64(f64::from(c1)));
    Ok(())
}

pub fn f64_convert_i32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i32()?;
    stack.push(Value::F64(f64::from(c1 as u32)));
    Ok(())
}

pub fn f64_convert_i64_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i64()?;
    stack.push(Value::F64(c1 as f64));
    Ok(())
}

pub fn f64_convert_i64_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i64()?;
    stack.push(Value::F64(c1 as u64 as f64));
    Ok(())
}

pub fn f64_promote_f32(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f32()?;
    stack.push(Value::F64(f64::from(c1)));
    Ok(())
}

pub fn i32_reinterpret_f32(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f32()?;
    stack.push(Value::I32(c1.to_bits() as i32));
    Ok(())
}

pub fn i64_reinterpret_f64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_f64()?;
    stack.push(Value::I64(c1.to_bits() as i64));
    Ok(())
}

pub fn f32_reinterpret_i32(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i32()?;
    stack.push(Value::F32(f32::from_bits(c1 as u32)));
    Ok(())
}

pub fn f64_reinterpret_i64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i64()?;
    stack.push(Value::F64(f64::from_bits(c1 as u64)));
    Ok(())
}

// Sign extension

pub fn i32_extend8_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(i32::from(c1 as i8)));
    Ok(())
}

pub fn i32_extend16_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(i32::from(c1 as i16)));
    Ok(())
}

pub fn i64_extend8_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(i64::from(c1 as i8)));
    Ok(())
}

pub fn i64_extend16_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(i64::from(c1 as i16)));
    Ok(())
}

pub fn i64_extend32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(i64::from(c1 as i32)));
    Ok(())
}
