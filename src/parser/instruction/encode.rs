//! Instruction encoding to binary format

use super::{BlockType, Instruction};
use crate::parser::encoding;

impl BlockType {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            BlockType::Empty => buf.push(encoding::BLOCK_TYPE_EMPTY),
            BlockType::Value(vt) => buf.push(vt.to_byte()),
            BlockType::FuncType(idx) => encoding::write_vs64(buf, i64::from(*idx)),
        }
    }
}

impl Instruction {
    /// Append the binary encoding of this instruction, including any nested
    /// bodies and their `else`/`end` markers.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        if let Some(opcode) = self.plain_opcode() {
            buf.push(opcode);
            return;
        }
        if let Some((opcode, _, memarg)) = self.memory_access() {
            buf.push(opcode);
            encoding::write_vu32(buf, memarg.align);
            encoding::write_vu32(buf, memarg.offset);
            return;
        }

        use Instruction::*;
        match self {
            Block { block_type, body } => {
                buf.push(encoding::OP_BLOCK);
                block_type.encode(buf);
                encode_body(body, buf);
            }
            Loop { block_type, body } => {
                buf.push(encoding::OP_LOOP);
                block_type.encode(buf);
                encode_body(body, buf);
            }
            If {
                block_type,
                then_branch,
                else_branch,
            } => {
                buf.push(encoding::OP_IF);
                block_type.encode(buf);
                for inst in then_branch {
                    inst.encode(buf);
                }
                if let Some(else_branch) = else_branch {
                    buf.push(encoding::OP_ELSE);
                    for inst in else_branch {
                        inst.encode(buf);
                    }
                }
                buf.push(encoding::OP_END);
            }
            Br { label_idx } => with_index(buf, 0x0C, *label_idx),
            BrIf { label_idx } => with_index(buf, 0x0D, *label_idx),
            BrTable { labels, default } => {
                buf.push(0x0E);
                encoding::write_vu32(buf, labels.len() as u32);
                for label in labels {
                    encoding::write_vu32(buf, *label);
                }
                encoding::write_vu32(buf, *default);
            }
            Call { func_idx } => with_index(buf, 0x10, *func_idx),
            CallIndirect { type_idx, table_idx } => {
                with_index(buf, 0x11, *type_idx);
                encoding::write_vu32(buf, *table_idx);
            }
            LocalGet { local_idx } => with_index(buf, 0x20, *local_idx),
            LocalSet { local_idx } => with_index(buf, 0x21, *local_idx),
            LocalTee { local_idx } => with_index(buf, 0x22, *local_idx),
            GlobalGet { global_idx } => with_index(buf, 0x23, *global_idx),
            GlobalSet { global_idx } => with_index(buf, 0x24, *global_idx),
            MemorySize => buf.extend_from_slice(&[0x3F, 0x00]),
            MemoryGrow => buf.extend_from_slice(&[0x40, 0x00]),
            I32Const { value } => {
                buf.push(0x41);
                encoding::write_vs32(buf, *value);
            }
            I64Const { value } => {
                buf.push(0x42);
                encoding::write_vs64(buf, *value);
            }
            F32Const { value } => {
                buf.push(0x43);
                encoding::write_f32(buf, *value);
            }
            F64Const { value } => {
                buf.push(0x44);
                encoding::write_f64(buf, *value);
            }
            // argumentless and memory instructions returned above
            _ => {}
        }
    }
}

fn with_index(buf: &mut Vec<u8>, opcode: u8, idx: u32) {
    buf.push(opcode);
    encoding::write_vu32(buf, idx);
}

/// Encode a sequence followed by its closing `end`.
pub fn encode_body(instructions: &[Instruction], buf: &mut Vec<u8>) {
    for inst in instructions {
        inst.encode(buf);
    }
    buf.push(encoding::OP_END);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::instruction::{decode_body, MemArg};
    use crate::parser::module::ValueType;
    use crate::parser::reader::Reader;

    #[test]
    fn test_encode_add() {
        let mut buf = Vec::new();
        encode_body(
            &[
                Instruction::LocalGet { local_idx: 0 },
                Instruction::LocalGet { local_idx: 1 },
                Instruction::I32Add,
            ],
            &mut buf,
        );
        assert_eq!(buf, vec![0x20, 0x00, 0x20, 0x01, 0x6a, 0x0b]);
    }

    #[test]
    fn test_encode_structured() {
        let body = vec![
            Instruction::Block {
                block_type: BlockType::Value(ValueType::I32),
                body: vec![
                    Instruction::I32Const { value: -1 },
                    Instruction::If {
                        block_type: BlockType::Empty,
                        then_branch: vec![Instruction::Br { label_idx: 1 }],
                        else_branch: Some(vec![Instruction::Nop]),
                    },
                ],
            },
            Instruction::I64Store32 {
                memarg: MemArg { align: 2, offset: 300 },
            },
        ];
        let mut buf = Vec::new();
        encode_body(&body, &mut buf);
        assert_eq!(
            buf,
            vec![
                0x02, 0x7f, 0x41, 0x7f, 0x04, 0x40, 0x0c, 0x01, 0x05, 0x01, 0x0b, 0x0b, 0x3e, 0x02, 0xac, 0x02,
                0x0b
            ]
        );

        let mut reader = Reader::new(buf);
        assert_eq!(decode_body(&mut reader).unwrap(), body);
    }
}
