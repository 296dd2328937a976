//! Instruction decoding from binary format

use super::{BlockType, Instruction, MemArg};
use crate::parser::encoding;
use crate::parser::limits;
use crate::parser::module::ValueType;
use crate::parser::reader::{read_vs, Reader};
use crate::parser::DecodeError;

/// A structured instruction whose body is still being decoded.
enum OpenBlock {
    Block(BlockType),
    Loop(BlockType),
    If(BlockType),
    Else {
        block_type: BlockType,
        then_branch: Vec<Instruction>,
    },
}

impl OpenBlock {
    /// Close the block around its decoded `body`.
    fn close(self, body: Vec<Instruction>) -> Instruction {
        match self {
            OpenBlock::Block(block_type) => Instruction::Block { block_type, body },
            OpenBlock::Loop(block_type) => Instruction::Loop { block_type, body },
            OpenBlock::If(block_type) => Instruction::If {
                block_type,
                then_branch: body,
                else_branch: None,
            },
            OpenBlock::Else {
                block_type,
                then_branch,
            } => Instruction::If {
                block_type,
                then_branch,
                else_branch: Some(body),
            },
        }
    }
}

impl MemArg {
    /// Decode a memory argument from the reader
    pub fn decode(reader: &mut Reader) -> Result<Self, DecodeError> {
        let align = reader.read_vu32()?;
        let offset = reader.read_vu32()?;
        Ok(MemArg { align, offset })
    }
}

impl BlockType {
    /// Decode a block type: 0x40, a single value type, or a non-negative
    /// s33 type index.
    pub fn decode(reader: &mut Reader) -> Result<Self, DecodeError> {
        let b = reader.read_byte()?;
        if b == encoding::BLOCK_TYPE_EMPTY {
            return Ok(BlockType::Empty);
        }
        if let Some(vt) = ValueType::from_byte(b) {
            return Ok(BlockType::Value(vt));
        }

        // first byte already consumed
        let mut first_byte = Some(b);
        let type_idx = read_vs(
            &mut || match first_byte.take() {
                Some(byte) => Ok(byte),
                None => reader.read_byte(),
            },
            33,
        )?;
        if type_idx < 0 || type_idx > i64::from(u32::MAX) {
            return Err(DecodeError::InvalidBlockType);
        }
        Ok(BlockType::FuncType(type_idx as u32))
    }
}

/// Decode a function body: instructions up to and including the final `end`.
///
/// Nesting is tracked on an explicit stack of open blocks, so deep bodies do
/// not consume host stack.
pub fn decode_body(reader: &mut Reader) -> Result<Vec<Instruction>, DecodeError> {
    let mut open: Vec<(Vec<Instruction>, OpenBlock)> = Vec::new();
    let mut current = Vec::new();
    loop {
        let opcode = reader.read_byte()?;
        let block = match opcode {
            encoding::OP_END => {
                match open.pop() {
                    Some((mut outer, block)) => {
                        outer.push(block.close(current));
                        current = outer;
                    }
                    None => return Ok(current),
                }
                continue;
            }
            encoding::OP_ELSE => match open.pop() {
                Some((outer, OpenBlock::If(block_type))) => {
                    let then_branch = std::mem::take(&mut current);
                    open.push((
                        outer,
                        OpenBlock::Else {
                            block_type,
                            then_branch,
                        },
                    ));
                    continue;
                }
                _ => return Err(DecodeError::UnexpectedElse),
            },
            encoding::OP_BLOCK => OpenBlock::Block(BlockType::decode(reader)?),
            encoding::OP_LOOP => OpenBlock::Loop(BlockType::decode(reader)?),
            encoding::OP_IF => OpenBlock::If(BlockType::decode(reader)?),
            _ => {
                current.push(decode_instruction(opcode, reader)?);
                continue;
            }
        };
        if open.len() >= limits::MAX_BLOCK_DEPTH {
            return Err(DecodeError::NestingTooDeep);
        }
        open.push((std::mem::take(&mut current), block));
    }
}

/// Decode a constant expression. Any instruction is accepted here; whether
/// it is actually constant is checked when the expression is evaluated.
pub fn decode_const_expr(reader: &mut Reader) -> Result<Vec<Instruction>, DecodeError> {
    decode_body(reader)
}

fn decode_instruction(opcode: u8, reader: &mut Reader) -> Result<Instruction, DecodeError> {
    if let Some(inst) = Instruction::plain_from_opcode(opcode) {
        return Ok(inst);
    }
    if (0x28..=0x3E).contains(&opcode) {
        let memarg = MemArg::decode(reader)?;
        return Instruction::memory_from_opcode(opcode, memarg).ok_or(DecodeError::UnknownOpcode(opcode));
    }

    use Instruction::*;
    let inst = match opcode {
        0x0C => Br {
            label_idx: reader.read_vu32()?,
        },
        0x0D => BrIf {
            label_idx: reader.read_vu32()?,
        },
        0x0E => {
            let count = reader.read_vu32()?;
            if count > limits::MAX_BR_TABLE_LABELS {
                return Err(DecodeError::TooManyLabels(count));
            }
            let mut labels = Vec::with_capacity(count as usize);
            for _ in 0..count {
                labels.push(reader.read_vu32()?);
            }
            let default = reader.read_vu32()?;
            BrTable { labels, default }
        }
        0x10 => Call {
            func_idx: reader.read_vu32()?,
        },
        0x11 => CallIndirect {
            type_idx: reader.read_vu32()?,
            table_idx: reader.read_vu32()?,
        },
        0x20 => LocalGet {
            local_idx: reader.read_vu32()?,
        },
        0x21 => LocalSet {
            local_idx: reader.read_vu32()?,
        },
        0x22 => LocalTee {
            local_idx: reader.read_vu32()?,
        },
        0x23 => GlobalGet {
            global_idx: reader.read_vu32()?,
        },
        0x24 => GlobalSet {
            global_idx: reader.read_vu32()?,
        },
        0x3F | 0x40 => {
            let reserved = reader.read_byte()?;
            if reserved != 0 {
                return Err(DecodeError::NonZeroReserved(reserved));
            }
            if opcode == 0x3F {
                MemorySize
            } else {
                MemoryGrow
            }
        }
        0x41 => I32Const {
            value: reader.read_vs32()?,
        },
        0x42 => I64Const {
            value: reader.read_vs64()?,
        },
        0x43 => F32Const {
            value: reader.read_f32()?,
        },
        0x44 => F64Const {
            value: reader.read_f64()?,
        },
        _ => return Err(DecodeError::UnknownOpcode(opcode)),
    };
    Ok(inst)
}
