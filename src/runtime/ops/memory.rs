//! Memory operations
//!
//! Loads and stores compute the effective address as the unsigned i32 operand
//! plus the static offset, in 64-bit arithmetic so the sum cannot wrap. Any
//! access extending past the current memory size traps.

use super::{MemArg, Memory, RuntimeError, Stack, Value};
use crate::parser::instruction::Instruction;

/// A load or store against the instance's memory.
pub type MemoryOp = fn(&mut Stack, &mut Memory, MemArg) -> Result<(), RuntimeError>;

/// Operation and immediate for a load/store instruction; `None` otherwise.
pub fn memory_op(instruction: &Instruction) -> Option<(MemoryOp, MemArg)> {
    use Instruction::*;
    let (op, memarg): (MemoryOp, &MemArg) = match instruction {
        I32Load { memarg } => (i32_load, memarg),
        I64Load { memarg } => (i64_load, memarg),
        F32Load { memarg } => (f32_load, memarg),
        F64Load { memarg } => (f64_load, memarg),
        I32Load8S { memarg } => (i32_load8_s, memarg),
        I32Load8U { memarg } => (i32_load8_u, memarg),
        I32Load16S { memarg } => (i32_load16_s, memarg),
        I32Load16U { memarg } => (i32_load16_u, memarg),
        I64Load8S { memarg } => (i64_load8_s, memarg),
        I64Load8U { memarg } => (i64_load8_u, memarg),
        I64Load16S { memarg } => (i64_load16_s, memarg),
        I64Load16U { memarg } => (i64_load16_u, memarg),
        I64Load32S { memarg } => (i64_load32_s, memarg),
        I64Load32U { memarg } => (i64_load32_u, memarg),
        I32Store { memarg } => (i32_store, memarg),
        I64Store { memarg } => (i64_store, memarg),
        F32Store { memarg } => (f32_store, memarg),
        F64Store { memarg } => (f64_store, memarg),
        I32Store8 { memarg } => (i32_store8, memarg),
        I32Store16 { memarg } => (i32_store16, memarg),
        I64Store8 { memarg } => (i64_store8, memarg),
        I64Store16 { memarg } => (i64_store16, memarg),
        I64Store32 { memarg } => (i64_store32, memarg),
        _ => return None,
    };
    Some((op, *memarg))
}

fn effective_address(stack: &mut Stack, memarg: MemArg) -> Result<u64, RuntimeError> {
    let base = stack.pop_i32()? as u32;
    Ok(u64::from(base) + u64::from(memarg.offset))
}

pub fn i32_load(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::I32(memory.read_u32(ea)? as i32));
    Ok(())
}

pub fn i64_load(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::I64(memory.read_u64(ea)? as i64));
    Ok(())
}

pub fn f32_load(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::F32(f32::from_bits(memory.read_u32(ea)?)));
    Ok(())
}

pub fn f64_load(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::F64(f64::from_bits(memory.read_u64(ea)?)));
    Ok(())
}

pub fn i32_load8_s(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::I32(i32::from(memory.read_u8(ea)? as i8)));
    Ok(())
}

pub fn i32_load8_u(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::I32(i32::from(memory.read_u8(ea)?)));
    Ok(())
}

pub fn i32_load16_s(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::I32(i32::from(memory.read_u16(ea)? as i16)));
    Ok(())
}

pub fn i32_load16_u(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::I32(i32::from(memory.read_u16(ea)?)));
    Ok(())
}

pub fn i64_load8_s(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::I64(i64::from(memory.read_u8(ea)? as i8)));
    Ok(())
}

pub fn i64_load8_u(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::I64(i64::from(memory.read_u8(ea)?)));
    Ok(())
}

pub fn i64_load16_s(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::I64(i64::from(memory.read_u16(ea)? as i16)));
    Ok(())
}

pub fn i64_load16_u(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::I64(i64::from(memory.read_u16(ea)?)));
    Ok(())
}

pub fn i64_load32_s(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::I64(i64::from(memory.read_u32(ea)? as i32)));
    Ok(())
}

pub fn i64_load32_u(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    stack.push(Value::I64(i64::from(memory.read_u32(ea)?)));
    Ok(())
}

// Stores pop the value first, then the address.

pub fn i32_store(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u32(ea, c as u32)
}

pub fn i64_store(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u64(ea, c as u64)
}

pub fn f32_store(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let c = stack.pop_f32()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u32(ea, c.to_bits())
}

pub fn f64_store(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let c = stack.pop_f64()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u64(ea, c.to_bits())
}

pub fn i32_store8(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u8(ea, c as u8)
}

pub fn i32_store16(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u16(ea, c as u16)
}

pub fn i64_store8(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u8(ea, c as u8)
}

pub fn i64_store16(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u16(ea, c as u16)
}

pub fn i64_store32(stack: &mut Stack, memory: &mut Memory, memarg: MemArg) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u32(ea, c as u32)
}

/// memory.size: current size in pages
pub fn memory_size(stack: &mut Stack, memory: &Memory) -> Result<(), RuntimeError> {
    stack.push(Value::I32(memory.size() as i32));
    Ok(())
}

/// memory.grow
/// 1. Pop the i32 page delta n.
/// 2. Grow by n pages, pushing the old size, or -1 if the memory cannot grow
///    that far. A negative n is a request beyond any limit.
pub fn memory_grow(stack: &mut Stack, memory: &mut Memory) -> Result<(), RuntimeError> {
    let n = stack.pop_i32()?;
    let result = if n < 0 { -1 } else { memory.grow(n as u32) };
    stack.push(Value::I32(result));
    Ok(())
}
