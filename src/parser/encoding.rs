//! Binary encoding primitives for WebAssembly values.
//!
//! Constants for the module binary format plus LEB128, float and byte vector
//! writers. All writers append to a caller-provided `&mut Vec<u8>`.

use byteorder::{ByteOrder, LittleEndian};

// ---------------------------------------------------------------------------
// WebAssembly binary format constants
// ---------------------------------------------------------------------------

pub const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
pub const VERSION: u32 = 1;

// Section IDs
pub const SECTION_CUSTOM: u8 = 0;
pub const SECTION_TYPE: u8 = 1;
pub const SECTION_IMPORT: u8 = 2;
pub const SECTION_FUNCTION: u8 = 3;
pub const SECTION_TABLE: u8 = 4;
pub const SECTION_MEMORY: u8 = 5;
pub const SECTION_GLOBAL: u8 = 6;
pub const SECTION_EXPORT: u8 = 7;
pub const SECTION_START: u8 = 8;
pub const SECTION_ELEMENT: u8 = 9;
pub const SECTION_CODE: u8 = 10;
pub const SECTION_DATA: u8 = 11;

// Value types
pub const VALTYPE_I32: u8 = 0x7f;
pub const VALTYPE_I64: u8 = 0x7e;
pub const VALTYPE_F32: u8 = 0x7d;
pub const VALTYPE_F64: u8 = 0x7c;

// Reference types
pub const REFTYPE_FUNCREF: u8 = 0x70;
pub const REFTYPE_EXTERNREF: u8 = 0x6f;

// Type constructors
pub const TYPE_FUNC: u8 = 0x60;

// Import/export descriptor kinds
pub const DESC_FUNC: u8 = 0x00;
pub const DESC_TABLE: u8 = 0x01;
pub const DESC_MEMORY: u8 = 0x02;
pub const DESC_GLOBAL: u8 = 0x03;

// Limits flags
pub const LIMITS_MIN: u8 = 0x00;
pub const LIMITS_MIN_MAX: u8 = 0x01;

// Global mutability
pub const GLOBAL_CONST: u8 = 0x00;
pub const GLOBAL_VAR: u8 = 0x01;

// Element segment flags, 3-bit encoding:
// bit 0 = non-active mode, bit 1 = explicit table, bit 2 = expressions
pub const ELEM_ACTIVE_FUNCS: u32 = 0;
pub const ELEM_PASSIVE_FUNCS: u32 = 1;
pub const ELEM_ACTIVE_TABLE_FUNCS: u32 = 2;
pub const ELEM_DECLARATIVE_FUNCS: u32 = 3;
pub const ELEM_ACTIVE_EXPRS: u32 = 4;
pub const ELEM_PASSIVE_EXPRS: u32 = 5;
pub const ELEM_ACTIVE_TABLE_EXPRS: u32 = 6;
pub const ELEM_DECLARATIVE_EXPRS: u32 = 7;

// Control opcodes the decoder treats structurally
pub const OP_BLOCK: u8 = 0x02;
pub const OP_LOOP: u8 = 0x03;
pub const OP_IF: u8 = 0x04;
pub const OP_ELSE: u8 = 0x05;
pub const OP_END: u8 = 0x0B;

// Block type: empty
pub const BLOCK_TYPE_EMPTY: u8 = 0x40;

// ---------------------------------------------------------------------------
// Unsigned LEB128
// ---------------------------------------------------------------------------

/// Appends the unsigned LEB128 encoding of a u64 value to `buf`.
fn write_vu(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

pub fn write_vu32(buf: &mut Vec<u8>, v: u32) {
    write_vu(buf, u64::from(v));
}

pub fn write_vu64(buf: &mut Vec<u8>, v: u64) {
    write_vu(buf, v);
}

// ---------------------------------------------------------------------------
// Signed LEB128
// ---------------------------------------------------------------------------

/// Appends the signed LEB128 encoding of an i64 value to `buf`.
fn write_vs(buf: &mut Vec<u8>, mut value: i64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if (value == 0 && (byte & 0x40) == 0) || (value == -1 && (byte & 0x40) != 0) {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

pub fn write_vs32(buf: &mut Vec<u8>, v: i32) {
    write_vs(buf, i64::from(v));
}

pub fn write_vs64(buf: &mut Vec<u8>, v: i64) {
    write_vs(buf, v);
}

// ---------------------------------------------------------------------------
// Fixed width, little-endian
// ---------------------------------------------------------------------------

pub fn write_u32(buf: &mut Vec<u8>, v: u32) {
    let mut bytes = [0u8; 4];
    LittleEndian::write_u32(&mut bytes, v);
    buf.extend_from_slice(&bytes);
}

pub fn write_f32(buf: &mut Vec<u8>, v: f32) {
    let mut bytes = [0u8; 4];
    LittleEndian::write_f32(&mut bytes, v);
    buf.extend_from_slice(&bytes);
}

pub fn write_f64(buf: &mut Vec<u8>, v: f64) {
    let mut bytes = [0u8; 8];
    LittleEndian::write_f64(&mut bytes, v);
    buf.extend_from_slice(&bytes);
}

// ---------------------------------------------------------------------------
// Length-prefixed vectors
// ---------------------------------------------------------------------------

/// Appends a length-prefixed byte vector (vu32 length + raw bytes) to `buf`.
pub fn write_byte_vec(buf: &mut Vec<u8>, v: &[u8]) {
    write_vu32(buf, v.len() as u32);
    buf.extend_from_slice(v);
}

pub fn write_name(buf: &mut Vec<u8>, name: &str) {
    write_byte_vec(buf, name.as_bytes());
}
