//! Encodes a [`Module`] to WebAssembly binary format (`.wasm`).
//!
//! This is the inverse of [`crate::parser::parse`]: sections are written in
//! the order the module holds them, each as
//!
//! ```text
//! section_id: u8 | byte_length: vu32 | contents: byte*
//! ```
//!
//! with minimal LEB128 for every integer, so decoding the output yields a
//! module equal to the input.
//!
//! # Example
//!
//! ```
//! use wasm_interp::{encoder, parser, wat};
//!
//! let module = wat::parse("(module (func (export \"f\") (result i32) i32.const 7))").unwrap();
//! let bytes = encoder::encode(&module);
//! assert_eq!(&bytes[0..4], b"\0asm");
//! assert_eq!(parser::parse(&bytes).unwrap(), module);
//! ```

use crate::parser::encoding::{
    write_byte_vec, write_name, write_u32, write_vu32, DESC_FUNC, DESC_GLOBAL, DESC_MEMORY, DESC_TABLE,
    ELEM_ACTIVE_FUNCS, GLOBAL_CONST, GLOBAL_VAR, LIMITS_MIN, LIMITS_MIN_MAX, MAGIC, REFTYPE_EXTERNREF,
    REFTYPE_FUNCREF, TYPE_FUNC,
};
use crate::parser::instruction::encode::encode_body;
use crate::parser::module::{
    ExportIndex, ExternalKind, FunctionType, GlobalType, Limits, Module, RefType, Section, TableType,
};

/// Encodes a module to binary format.
pub fn encode(module: &Module) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&MAGIC);
    write_u32(&mut buf, module.version);

    for section in &module.sections {
        let mut contents = Vec::new();
        encode_section(section, &mut contents);
        buf.push(section.id());
        write_byte_vec(&mut buf, &contents);
    }
    buf
}

fn encode_section(section: &Section, buf: &mut Vec<u8>) {
    match section {
        Section::Custom(custom) => {
            write_name(buf, &custom.name);
            buf.extend_from_slice(&custom.data);
        }
        Section::Type(types) => write_vec(buf, types, encode_function_type),
        Section::Import(imports) => write_vec(buf, imports, |buf, import| {
            write_name(buf, &import.module);
            write_name(buf, &import.name);
            match &import.external_kind {
                ExternalKind::Function(type_idx) => {
                    buf.push(DESC_FUNC);
                    write_vu32(buf, *type_idx);
                }
                ExternalKind::Table(table_type) => {
                    buf.push(DESC_TABLE);
                    encode_table_type(buf, table_type);
                }
                ExternalKind::Memory(memory_type) => {
                    buf.push(DESC_MEMORY);
                    encode_limits(buf, &memory_type.limits);
                }
                ExternalKind::Global(global_type) => {
                    buf.push(DESC_GLOBAL);
                    encode_global_type(buf, global_type);
                }
            }
        }),
        Section::Function(type_indices) => write_vec(buf, type_indices, |buf, idx| write_vu32(buf, *idx)),
        Section::Table(tables) => write_vec(buf, tables, encode_table_type),
        Section::Memory(memories) => write_vec(buf, memories, |buf, memory| encode_limits(buf, &memory.limits)),
        Section::Global(globals) => write_vec(buf, globals, |buf, global| {
            encode_global_type(buf, &global.global_type);
            encode_body(&global.init, buf);
        }),
        Section::Export(exports) => write_vec(buf, exports, |buf, export| {
            write_name(buf, &export.name);
            let (kind, idx) = match export.index {
                ExportIndex::Function(idx) => (DESC_FUNC, idx),
                ExportIndex::Table(idx) => (DESC_TABLE, idx),
                ExportIndex::Memory(idx) => (DESC_MEMORY, idx),
                ExportIndex::Global(idx) => (DESC_GLOBAL, idx),
            };
            buf.push(kind);
            write_vu32(buf, idx);
        }),
        Section::Start(idx) => write_vu32(buf, *idx),
        Section::Element(elements) => write_vec(buf, elements, |buf, element| {
            write_vu32(buf, ELEM_ACTIVE_FUNCS);
            encode_body(&element.offset, buf);
            write_vec(buf, &element.init, |buf, idx| write_vu32(buf, *idx));
        }),
        Section::Code(bodies) => write_vec(buf, bodies, |buf, function| {
            let mut code = Vec::new();
            write_vec(&mut code, function.locals.entries(), |code, (count, value_type)| {
                write_vu32(code, *count);
                code.push(value_type.to_byte());
            });
            encode_body(&function.body, &mut code);
            write_byte_vec(buf, &code);
        }),
        Section::Data(segments) => write_vec(buf, segments, |buf, data| {
            write_vu32(buf, data.memory_index);
            encode_body(&data.offset, buf);
            write_byte_vec(buf, &data.init);
        }),
    }
}

fn write_vec<T, F>(buf: &mut Vec<u8>, items: &[T], mut item: F)
where
    F: FnMut(&mut Vec<u8>, &T),
{
    write_vu32(buf, items.len() as u32);
    for value in items {
        item(buf, value);
    }
}

fn encode_function_type(buf: &mut Vec<u8>, func_type: &FunctionType) {
    buf.push(TYPE_FUNC);
    write_vec(buf, &func_type.parameters, |buf, vt| buf.push(vt.to_byte()));
    write_vec(buf, &func_type.return_types, |buf, vt| buf.push(vt.to_byte()));
}

fn encode_limits(buf: &mut Vec<u8>, limits: &Limits) {
    match limits.max {
        Some(max) => {
            buf.push(LIMITS_MIN_MAX);
            write_vu32(buf, limits.min);
            write_vu32(buf, max);
        }
        None => {
            buf.push(LIMITS_MIN);
            write_vu32(buf, limits.min);
        }
    }
}

fn encode_table_type(buf: &mut Vec<u8>, table_type: &TableType) {
    buf.push(match table_type.ref_type {
        RefType::FuncRef => REFTYPE_FUNCREF,
        RefType::ExternRef => REFTYPE_EXTERNREF,
    });
    encode_limits(buf, &table_type.limits);
}

fn encode_global_type(buf: &mut Vec<u8>, global_type: &GlobalType) {
    buf.push(global_type.value_type.to_byte());
    buf.push(if global_type.mutable { GLOBAL_VAR } else { GLOBAL_CONST });
}
