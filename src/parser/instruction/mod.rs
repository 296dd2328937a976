//! WebAssembly instruction representation
//!
//! Instructions are held as a tree: `block`, `loop` and `if` own their nested
//! instruction sequences, so the executor can evaluate structured control flow
//! recursively without a separate label/jump table.

pub mod decode;
pub mod encode;

pub use decode::{decode_body, decode_const_expr};

use super::module::ValueType;
use fhex::ToHex;
use std::fmt;

/// Memory argument for memory access instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemArg {
    /// Memory alignment (as power of 2)
    pub align: u32,
    /// Memory offset
    pub offset: u32,
}

/// Block type for structured control instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// Empty block type (no parameters or results)
    Empty,
    /// Single value type result
    Value(ValueType),
    /// Function type index for multi-value blocks
    FuncType(u32),
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Empty => Ok(()),
            BlockType::Value(vt) => write!(f, " (result {vt})"),
            BlockType::FuncType(idx) => write!(f, " (type {idx})"),
        }
    }
}

/// Algebraic data type representing all supported WebAssembly instructions
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // Control instructions
    Unreachable,
    Nop,
    Block {
        block_type: BlockType,
        body: Vec<Instruction>,
    },
    Loop {
        block_type: BlockType,
        body: Vec<Instruction>,
    },
    If {
        block_type: BlockType,
        then_branch: Vec<Instruction>,
        else_branch: Option<Vec<Instruction>>,
    },
    Br { label_idx: u32 },
    BrIf { label_idx: u32 },
    BrTable { labels: Vec<u32>, default: u32 },
    Return,
    Call { func_idx: u32 },
    CallIndirect { type_idx: u32, table_idx: u32 },

    // Parametric instructions
    Drop,
    Select,

    // Variable instructions
    LocalGet { local_idx: u32 },
    LocalSet { local_idx: u32 },
    LocalTee { local_idx: u32 },
    GlobalGet { global_idx: u32 },
    GlobalSet { global_idx: u32 },

    // Memory instructions
    I32Load { memarg: MemArg },
    I64Load { memarg: MemArg },
    F32Load { memarg: MemArg },
    F64Load { memarg: MemArg },
    I32Load8S { memarg: MemArg },
    I32Load8U { memarg: MemArg },
    I32Load16S { memarg: MemArg },
    I32Load16U { memarg: MemArg },
    I64Load8S { memarg: MemArg },
    I64Load8U { memarg: MemArg },
    I64Load16S { memarg: MemArg },
    I64Load16U { memarg: MemArg },
    I64Load32S { memarg: MemArg },
    I64Load32U { memarg: MemArg },
    I32Store { memarg: MemArg },
    I64Store { memarg: MemArg },
    F32Store { memarg: MemArg },
    F64Store { memarg: MemArg },
    I32Store8 { memarg: MemArg },
    I32Store16 { memarg: MemArg },
    I64Store8 { memarg: MemArg },
    I64Store16 { memarg: MemArg },
    I64Store32 { memarg: MemArg },
    MemorySize,
    MemoryGrow,

    // Numeric instructions - Constants
    I32Const { value: i32 },
    I64Const { value: i64 },
    F32Const { value: f32 },
    F64Const { value: f64 },

    // Numeric instructions - i32 operations
    I32Eqz,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,

    // Numeric instructions - i64 comparisons
    I64Eqz,
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,

    // Numeric instructions - float comparisons
    F32Eq,
    F32Ne,
    F32Lt,
    F32Gt,
    F32Le,
    F32Ge,
    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,

    // Numeric instructions - i32 arithmetic
    I32Clz,
    I32Ctz,
    I32Popcnt,
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I32Rotl,
    I32Rotr,

    // Numeric instructions - i64 arithmetic
    I64Clz,
    I64Ctz,
    I64Popcnt,
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    I64Rotl,
    I64Rotr,

    // Numeric instructions - f32 arithmetic
    F32Abs,
    F32Neg,
    F32Ceil,
    F32Floor,
    F32Trunc,
    F32Nearest,
    F32Sqrt,
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F32Min,
    F32Max,
    F32Copysign,

    // Numeric instructions - f64 arithmetic
    F64Abs,
    F64Neg,
    F64Ceil,
    F64Floor,
    F64Trunc,
    F64Nearest,
    F64Sqrt,
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
    F64Min,
    F64Max,
    F64Copysign,

    // Conversions
    I32WrapI64,
    I32TruncF32S,
    I32TruncF32U,
    I32TruncF64S,
    I32TruncF64U,
    I64ExtendI32S,
    I64ExtendI32U,
    I64TruncF32S,
    I64TruncF32U,
    I64TruncF64S,
    I64TruncF64U,
    F32ConvertI32S,
    F32ConvertI32U,
    F32ConvertI64S,
    F32ConvertI64U,
    F32DemoteF64,
    F64ConvertI32S,
    F64ConvertI32U,
    F64ConvertI64S,
    F64ConvertI64U,
    F64PromoteF32,
    I32ReinterpretF32,
    I64ReinterpretF64,
    F32ReinterpretI32,
    F64ReinterpretI64,

    // Sign extension
    I32Extend8S,
    I32Extend16S,
    I64Extend8S,
    I64Extend16S,
    I64Extend32S,
}

/// Declares the argumentless instructions once, producing the lookups the
/// decoder, encoder, printer and text translator share.
macro_rules! plain_instructions {
    ($(($variant:ident, $opcode:literal, $name:literal)),* $(,)?) => {
        impl Instruction {
            /// Instruction for an opcode that carries no immediates.
            pub fn plain_from_opcode(opcode: u8) -> Option<Instruction> {
                match opcode {
                    $($opcode => Some(Instruction::$variant),)*
                    _ => None,
                }
            }

            /// Instruction for the text mnemonic of an argumentless opcode.
            pub fn plain_from_mnemonic(name: &str) -> Option<Instruction> {
                match name {
                    $($name => Some(Instruction::$variant),)*
                    _ => None,
                }
            }

            pub(crate) fn plain_opcode(&self) -> Option<u8> {
                match self {
                    $(Instruction::$variant => Some($opcode),)*
                    _ => None,
                }
            }

            fn plain_mnemonic(&self) -> Option<&'static str> {
                match self {
                    $(Instruction::$variant => Some($name),)*
                    _ => None,
                }
            }
        }
    };
}

plain_instructions! {
    (Unreachable, 0x00, "unreachable"),
    (Nop, 0x01, "nop"),
    (Return, 0x0F, "return"),
    (Drop, 0x1A, "drop"),
    (Select, 0x1B, "select"),
    (I32Eqz, 0x45, "i32.eqz"),
    (I32Eq, 0x46, "i32.eq"),
    (I32Ne, 0x47, "i32.ne"),
    (I32LtS, 0x48, "i32.lt_s"),
    (I32LtU, 0x49, "i32.lt_u"),
    (I32GtS, 0x4A, "i32.gt_s"),
    (I32GtU, 0x4B, "i32.gt_u"),
    (I32LeS, 0x4C, "i32.le_s"),
    (I32LeU, 0x4D, "i32.le_u"),
    (I32GeS, 0x4E, "i32.ge_s"),
    (I32GeU, 0x4F, "i32.ge_u"),
    (I64Eqz, 0x50, "i64.eqz"),
    (I64Eq, 0x51, "i64.eq"),
    (I64Ne, 0x52, "i64.ne"),
    (I64LtS, 0x53, "i64.lt_s"),
    (I64LtU, 0x54, "i64.lt_u"),
    (I64GtS, 0x55, "i64.gt_s"),
    (I64GtU, 0x56, "i64.gt_u"),
    (I64LeS, 0x57, "i64.le_s"),
    (I64LeU, 0x58, "i64.le_u"),
    (I64GeS, 0x59, "i64.ge_s"),
    (I64GeU, 0x5A, "i64.ge_u"),
    (F32Eq, 0x5B, "f32.eq"),
    (F32Ne, 0x5C, "f32.ne"),
    (F32Lt, 0x5D, "f32.lt"),
    (F32Gt, 0x5E, "f32.gt"),
    (F32Le, 0x5F, "f32.le"),
    (F32Ge, 0x60, "f32.ge"),
    (F64Eq, 0x61, "f64.eq"),
    (F64Ne, 0x62, "f64.ne"),
    (F64Lt, 0x63, "f64.lt"),
    (F64Gt, 0x64, "f64.gt"),
    (F64Le, 0x65, "f64.le"),
    (F64Ge, 0x66, "f64.ge"),
    (I32Clz, 0x67, "i32.clz"),
    (I32Ctz, 0x68, "i32.ctz"),
    (I32Popcnt, 0x69, "i32.popcnt"),
    (I32Add, 0x6A, "i32.add"),
    (I32Sub, 0x6B, "i32.sub"),
    (I32Mul, 0x6C, "i32.mul"),
    (I32DivS, 0x6D, "i32.div_s"),
    (I32DivU, 0x6E, "i32.div_u"),
    (I32RemS, 0x6F, "i32.rem_s"),
    (I32RemU, 0x70, "i32.rem_u"),
    (I32And, 0x71, "i32.and"),
    (I32Or, 0x72, "i32.or"),
    (I32Xor, 0x73, "i32.xor"),
    (I32Shl, 0x74, "i32.shl"),
    (I32ShrS, 0x75, "i32.shr_s"),
    (I32ShrU, 0x76, "i32.shr_u"),
    (I32Rotl, 0x77, "i32.rotl"),
    (I32Rotr, 0x78, "i32.rotr"),
    (I64Clz, 0x79, "i64.clz"),
    (I64Ctz, 0x7A, "i64.ctz"),
    (I64Popcnt, 0x7B, "i64.popcnt"),
    (I64Add, 0x7C, "i64.add"),
    (I64Sub, 0x7D, "i64.sub"),
    (I64Mul, 0x7E, "i64.mul"),
    (I64DivS, 0x7F, "i64.div_s"),
    (I64DivU, 0x80, "i64.div_u"),
    (I64RemS, 0x81, "i64.rem_s"),
    (I64RemU, 0x82, "i64.rem_u"),
    (I64And, 0x83, "i64.and"),
    (I64Or, 0x84, "i64.or"),
    (I64Xor, 0x85, "i64.xor"),
    (I64Shl, 0x86, "i64.shl"),
    (I64ShrS, 0x87, "i64.shr_s"),
    (I64ShrU, 0x88, "i64.shr_u"),
    (I64Rotl, 0x89, "i64.rotl"),
    (I64Rotr, 0x8A, "i64.rotr"),
    (F32Abs, 0x8B, "f32.abs"),
    (F32Neg, 0x8C, "f32.neg"),
    (F32Ceil, 0x8D, "f32.ceil"),
    (F32Floor, 0x8E, "f32.floor"),
    (F32Trunc, 0x8F, "f32.trunc"),
    (F32Nearest, 0x90, "f32.nearest"),
    (F32Sqrt, 0x91, "f32.sqrt"),
    (F32Add, 0x92, "f32.add"),
    (F32Sub, 0x93, "f32.sub"),
    (F32Mul, 0x94, "f32.mul"),
    (F32Div, 0x95, "f32.div"),
    (F32Min, 0x96, "f32.min"),
    (F32Max, 0x97, "f32.max"),
    (F32Copysign, 0x98, "f32.copysign"),
    (F64Abs, 0x99, "f64.abs"),
    (F64Neg, 0x9A, "f64.neg"),
    (F64Ceil, 0x9B, "f64.ceil"),
    (F64Floor, 0x9C, "f64.floor"),
    (F64Trunc, 0x9D, "f64.trunc"),
    (F64Nearest, 0x9E, "f64.nearest"),
    (F64Sqrt, 0x9F, "f64.sqrt"),
    (F64Add, 0xA0, "f64.add"),
    (F64Sub, 0xA1, "f64.sub"),
    (F64Mul, 0xA2, "f64.mul"),
    (F64Div, 0xA3, "f64.div"),
    (F64Min, 0xA4, "f64.min"),
    (F64Max, 0xA5, "f64.max"),
    (F64Copysign, 0xA6, "f64.copysign"),
    (I32WrapI64, 0xA7, "i32.wrap_i64"),
    (I32TruncF32S, 0xA8, "i32.trunc_f32_s"),
    (I32TruncF32U, 0xA9, "i32.trunc_f32_u"),
    (I32TruncF64S, 0xAA, "i32.trunc_f64_s"),
    (I32TruncF64U, 0xAB, "i32.trunc_f64_u"),
    (I64ExtendI32S, 0xAC, "i64.extend_i32_s"),
    (I64ExtendI32U, 0xAD, "i64.extend_i32_u"),
    (I64TruncF32S, 0xAE, "i64.trunc_f32_s"),
    (I64TruncF32U, 0xAF, "i64.trunc_f32_u"),
    (I64TruncF64S, 0xB0, "i64.trunc_f64_s"),
    (I64TruncF64U, 0xB1, "i64.trunc_f64_u"),
    (F32ConvertI32S, 0xB2, "f32.convert_i32_s"),
    (F32ConvertI32U, 0xB3, "f32.convert_i32_u"),
    (F32ConvertI64S, 0xB4, "f32.convert_i64_s"),
    (F32ConvertI64U, 0xB5, "f32.convert_i64_u"),
    (F32DemoteF64, 0xB6, "f32.demote_f64"),
    (F64ConvertI32S, 0xB7, "f64.convert_i32_s"),
    (F64ConvertI32U, 0xB8, "f64.convert_i32_u"),
    (F64ConvertI64S, 0xB9, "f64.convert_i64_s"),
    (F64ConvertI64U, 0xBA, "f64.convert_i64_u"),
    (F64PromoteF32, 0xBB, "f64.promote_f32"),
    (I32ReinterpretF32, 0xBC, "i32.reinterpret_f32"),
    (I64ReinterpretF64, 0xBD, "i64.reinterpret_f64"),
    (F32ReinterpretI32, 0xBE, "f32.reinterpret_i32"),
    (F64ReinterpretI64, 0xBF, "f64.reinterpret_i64"),
    (I32Extend8S, 0xC0, "i32.extend8_s"),
    (I32Extend16S, 0xC1, "i32.extend16_s"),
    (I64Extend8S, 0xC2, "i64.extend8_s"),
    (I64Extend16S, 0xC3, "i64.extend16_s"),
    (I64Extend32S, 0xC4, "i64.extend32_s"),
}

/// Same idea for loads and stores; the trailing number is the natural
/// alignment exponent, used when text omits `align=`.
macro_rules! memory_instructions {
    ($(($variant:ident, $opcode:literal, $name:literal, $align:literal)),* $(,)?) => {
        impl Instruction {
            pub fn memory_from_opcode(opcode: u8, memarg: MemArg) -> Option<Instruction> {
                match opcode {
                    $($opcode => Some(Instruction::$variant { memarg }),)*
                    _ => None,
                }
            }

            /// Instruction and natural alignment for a load/store mnemonic.
            pub fn memory_from_mnemonic(name: &str) -> Option<(fn(MemArg) -> Instruction, u32)> {
                match name {
                    $($name => Some((
                        (|memarg| Instruction::$variant { memarg }) as fn(MemArg) -> Instruction,
                        $align,
                    )),)*
                    _ => None,
                }
            }

            pub(crate) fn memory_access(&self) -> Option<(u8, &'static str, MemArg)> {
                match self {
                    $(Instruction::$variant { memarg } => Some(($opcode, $name, *memarg)),)*
                    _ => None,
                }
            }
        }
    };
}

memory_instructions! {
    (I32Load, 0x28, "i32.load", 2),
    (I64Load, 0x29, "i64.load", 3),
    (F32Load, 0x2A, "f32.load", 2),
    (F64Load, 0x2B, "f64.load", 3),
    (I32Load8S, 0x2C, "i32.load8_s", 0),
    (I32Load8U, 0x2D, "i32.load8_u", 0),
    (I32Load16S, 0x2E, "i32.load16_s", 1),
    (I32Load16U, 0x2F, "i32.load16_u", 1),
    (I64Load8S, 0x30, "i64.load8_s", 0),
    (I64Load8U, 0x31, "i64.load8_u", 0),
    (I64Load16S, 0x32, "i64.load16_s", 1),
    (I64Load16U, 0x33, "i64.load16_u", 1),
    (I64Load32S, 0x34, "i64.load32_s", 2),
    (I64Load32U, 0x35, "i64.load32_u", 2),
    (I32Store, 0x36, "i32.store", 2),
    (I64Store, 0x37, "i64.store", 3),
    (F32Store, 0x38, "f32.store", 2),
    (F64Store, 0x39, "f64.store", 3),
    (I32Store8, 0x3A, "i32.store8", 0),
    (I32Store16, 0x3B, "i32.store16", 1),
    (I64Store8, 0x3C, "i64.store8", 0),
    (I64Store16, 0x3D, "i64.store16", 1),
    (I64Store32, 0x3E, "i64.store32", 2),
}

fn write_sequence(f: &mut fmt::Formatter<'_>, instructions: &[Instruction]) -> fmt::Result {
    for instruction in instructions {
        write!(f, " {instruction}")?;
    }
    Ok(())
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.plain_mnemonic() {
            return write!(f, "{name}");
        }
        if let Some((_, name, memarg)) = self.memory_access() {
            write!(f, "{name}")?;
            if memarg.offset != 0 {
                write!(f, " offset={}", memarg.offset)?;
            }
            return write!(f, " align={}", 1u64 << memarg.align.min(63));
        }

        use Instruction::*;
        match self {
            Block { block_type, body } => {
                write!(f, "block{block_type}")?;
                write_sequence(f, body)?;
                write!(f, " end")
            }
            Loop { block_type, body } => {
                write!(f, "loop{block_type}")?;
                write_sequence(f, body)?;
                write!(f, " end")
            }
            If {
                block_type,
                then_branch,
                else_branch,
            } => {
                write!(f, "if{block_type}")?;
                write_sequence(f, then_branch)?;
                if let Some(else_branch) = else_branch {
                    write!(f, " else")?;
                    write_sequence(f, else_branch)?;
                }
                write!(f, " end")
            }
            Br { label_idx } => write!(f, "br {label_idx}"),
            BrIf { label_idx } => write!(f, "br_if {label_idx}"),
            BrTable { labels, default } => {
                write!(f, "br_table")?;
                for label in labels {
                    write!(f, " {label}")?;
                }
                write!(f, " {default}")
            }
            Call { func_idx } => write!(f, "call {func_idx}"),
            CallIndirect { type_idx, table_idx } => {
                if *table_idx == 0 {
                    write!(f, "call_indirect (type {type_idx})")
                } else {
                    write!(f, "call_indirect {table_idx} (type {type_idx})")
                }
            }
            LocalGet { local_idx } => write!(f, "local.get {local_idx}"),
            LocalSet { local_idx } => write!(f, "local.set {local_idx}"),
            LocalTee { local_idx } => write!(f, "local.tee {local_idx}"),
            GlobalGet { global_idx } => write!(f, "global.get {global_idx}"),
            GlobalSet { global_idx } => write!(f, "global.set {global_idx}"),
            MemorySize => write!(f, "memory.size"),
            MemoryGrow => write!(f, "memory.grow"),
            I32Const { value } => write!(f, "i32.const {value}"),
            I64Const { value } => write!(f, "i64.const {value}"),
            F32Const { value } => write!(f, "f32.const {}", value.to_hex()),
            F64Const { value } => write!(f, "f64.const {}", value.to_hex()),
            // every other variant is covered by the tables above
            _ => write!(f, "<unknown>"),
        }
    }
}
