//! WebAssembly operation implementations
//!
//! This module contains the semantics of every instruction, organised by
//! category. Each operation takes the operand stack (plus whatever state it
//! touches) and reports traps as `RuntimeError`s.

pub mod bitwise;
pub mod comparison;
pub mod control;
pub mod conversion;
pub mod memory;
pub mod numeric;
pub mod parametric;
pub mod variable;

pub(crate) use crate::parser::instruction::MemArg;
pub(crate) use crate::runtime::memory::Memory;
pub(crate) use crate::runtime::stack::Stack;
pub(crate) use crate::runtime::{RuntimeError, Value};

use crate::parser::instruction::Instruction;

/// An operation that only reads and writes the operand stack.
pub type StackOp = fn(&mut Stack) -> Result<(), RuntimeError>;

/// Operation for an instruction with no immediates and no state beyond the
/// operand stack; `None` for everything else.
pub fn stack_op(instruction: &Instruction) -> Option<StackOp> {
    use Instruction::*;
    let op: StackOp = match instruction {
        Drop => parametric::drop,
        Select => parametric::select,

        I32Eqz => comparison::i32_eqz,
        I32Eq => comparison::i32_eq,
        I32Ne => comparison::i32_ne,
        I32LtS => comparison::i32_lt_s,
        I32LtU => comparison::i32_lt_u,
        I32GtS => comparison::i32_gt_s,
        I32GtU => comparison::i32_gt_u,
        I32LeS => comparison::i32_le_s,
        I32LeU => comparison::i32_le_u,
        I32GeS => comparison::i32_ge_s,
        I32GeU => comparison::i32_ge_u,
        I64Eqz => comparison::i64_eqz,
        I64Eq => comparison::i64_eq,
        I64Ne => comparison::i64_ne,
        I64LtS => comparison::i64_lt_s,
        I64LtU => comparison::i64_lt_u,
        I64GtS => comparison::i64_gt_s,
        I64GtU => comparison::i64_gt_u,
        I64LeS => comparison::i64_le_s,
        I64LeU => comparison::i64_le_u,
        I64GeS => comparison::i64_ge_s,
        I64GeU => comparison::i64_ge_u,
        F32Eq => comparison::f32_eq,
        F32Ne => comparison::f32_ne,
        F32Lt => comparison::f32_lt,
        F32Gt => comparison::f32_gt,
        F32Le => comparison::f32_le,
        F32Ge => comparison::f32_ge,
        F64Eq => comparison::f64_eq,
        F64Ne => comparison::f64_ne,
        F64Lt => comparison::f64_lt,
        F64Gt => comparison::f64_gt,
        F64Le => comparison::f64_le,
        F64Ge => comparison::f64_ge,

        I32Clz => numeric::i32_clz,
        I32Ctz => numeric::i32_ctz,
        I32Popcnt => numeric::i32_popcnt,
        I32Add => numeric::i32_add,
        I32Sub => numeric::i32_sub,
        I32Mul => numeric::i32_mul,
        I32DivS => numeric::i32_div_s,
        I32DivU => numeric::i32_div_u,
        I32RemS => numeric::i32_rem_s,
        I32RemU => numeric::i32_rem_u,
        I64Clz => numeric::i64_clz,
        I64Ctz => numeric::i64_ctz,
        I64Popcnt => numeric::i64_popcnt,
        I64Add => numeric::i64_add,
        I64Sub => numeric::i64_sub,
        I64Mul => numeric::i64_mul,
        I64DivS => numeric::i64_div_s,
        I64DivU => numeric::i64_div_u,
        I64RemS => numeric::i64_rem_s,
        I64RemU => numeric::i64_rem_u,

        I32And => bitwise::i32_and,
        I32Or => bitwise::i32_or,
        I32Xor => bitwise::i32_xor,
        I32Shl => bitwise::i32_shl,
        I32ShrS => bitwise::i32_shr_s,
        I32ShrU => bitwise::i32_shr_u,
        I32Rotl => bitwise::i32_rotl,
        I32Rotr => bitwise::i32_rotr,
        I64And => bitwise::i64_and,
        I64Or => bitwise::i64_or,
        I64Xor => bitwise::i64_xor,
        I64Shl => bitwise::i64_shl,
        I64ShrS => bitwise::i64_shr_s,
        I64ShrU => bitwise::i64_shr_u,
        I64Rotl => bitwise::i64_rotl,
        I64Rotr => bitwise::i64_rotr,

        F32Abs => numeric::f32_abs,
        F32Neg => numeric::f32_neg,
        F32Ceil => numeric::f32_ceil,
        F32Floor => numeric::f32_floor,
        F32Trunc => numeric::f32_trunc,
        F32Nearest => numeric::f32_nearest,
        F32Sqrt => numeric::f32_sqrt,
        F32Add => numeric::f32_add,
        F32Sub => numeric::f32_sub,
        F32Mul => numeric::f32_mul,
        F32Div => numeric::f32_div,
        F32Min => numeric::f32_min,
        F32Max => numeric::f32_max,
        F32Copysign => numeric::f32_copysign,
        F64Abs => numeric::f64_abs,
        F64Neg => numeric::f64_neg,
        F64Ceil => numeric::f64_ceil,
        F64Floor => numeric::f64_floor,
        F64Trunc => numeric::f64_trunc,
        F64Nearest => numeric::f64_nearest,
        F64Sqrt => numeric::f64_sqrt,
        F64Add => numeric::f64_add,
        F64Sub => numeric::f64_sub,
        F64Mul => numeric::f64_mul,
        F64Div => numeric::f64_div,
        F64Min => numeric::f64_min,
        F64Max => numeric::f64_max,
        F64Copysign => numeric::f64_copysign,

        I32WrapI64 => conversion::i32_wrap_i64,
        I32TruncF32S => conversion::i32_trunc_f32_s,
        I32TruncF32U => conversion::i32_trunc_f32_u,
        I32TruncF64S => conversion::i32_trunc_f64_s,
        I32TruncF64U => conversion::i32_trunc_f64_u,
        I64ExtendI32S => conversion::i64_extend_i32_s,
        I64ExtendI32U => conversion::i64_extend_i32_u,
        I64TruncF32S => conversion::i64_trunc_f32_s,
        I64TruncF32U => conversion::i64_trunc_f32_u,
        I64TruncF64S => conversion::i64_trunc_f64_s,
        I64TruncF64U => conversion::i64_trunc_f64_u,
        F32ConvertI32S => conversion::f32_convert_i32_s,
        F32ConvertI32U => conversion::f32_convert_i32_u,
        F32ConvertI64S => conversion::f32_convert_i64_s,
        F32ConvertI64U => conversion::f32_convert_i64_u,
        F32DemoteF64 => conversion::f32_demote_f64,
        F64ConvertI32S => conversion::f64_convert_i32_s,
        F64ConvertI32U => conversion::f64_convert_i32_u,
        F64ConvertI64S => conversion::f64_convert_i64_s,
        F64ConvertI64U => conversion::f64_convert_i64_u,
        F64PromoteF32 => conversion::f64_promote_f32,
        I32ReinterpretF32 => conversion::i32_reinterpret_f32,
        I64ReinterpretF64 => conversion::i64_reinterpret_f64,
        F32ReinterpretI32 => conversion::f32_reinterpret_i32,
        F64ReinterpretI64 => conversion::f64_reinterpret_i64,
        I32Extend8S => conversion::i32_extend8_s,
        I32Extend16S => conversion::i32_extend16_s,
        I64Extend8S => conversion::i64_extend8_s,
        I64Extend16S => conversion::i64_extend16_s,
        I64Extend32S => conversion::i64_extend32_s,

        _ => return None,
    };
    Some(op)
}
