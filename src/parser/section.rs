//! Per-section decoders
//!
//! Each decoder receives a reader bounded to the section payload; the caller
//! checks that nothing is left over once the decoder returns.

use super::encoding;
use super::instruction::{decode_body, decode_const_expr};
use super::limits;
use super::module::{
    CustomSection, Data, Element, Export, ExportIndex, ExternalKind, FunctionBody, FunctionType, Global,
    GlobalType, Import, Limits, Locals, MemoryType, RefType, Section, TableType, ValueType,
};
use super::reader::Reader;
use super::DecodeError;
use log::{debug, trace};

/// Decode the payload of section `id`.
pub fn decode_section(id: u8, reader: &mut Reader) -> Result<Section, DecodeError> {
    let section = match id {
        encoding::SECTION_CUSTOM => {
            let name = reader.read_name()?;
            Section::Custom(CustomSection {
                name,
                data: reader.read_rest(),
            })
        }
        encoding::SECTION_TYPE => Section::Type(reader.read_vec(decode_function_type)?),
        encoding::SECTION_IMPORT => Section::Import(reader.read_vec(decode_import)?),
        encoding::SECTION_FUNCTION => Section::Function(reader.read_vec(|r| r.read_vu32())?),
        encoding::SECTION_TABLE => Section::Table(reader.read_vec(decode_table_type)?),
        encoding::SECTION_MEMORY => Section::Memory(reader.read_vec(decode_memory_type)?),
        encoding::SECTION_GLOBAL => Section::Global(reader.read_vec(decode_global)?),
        encoding::SECTION_EXPORT => Section::Export(reader.read_vec(decode_export)?),
        encoding::SECTION_START => Section::Start(reader.read_vu32()?),
        encoding::SECTION_ELEMENT => Section::Element(decode_elements(reader)?),
        encoding::SECTION_CODE => Section::Code(reader.read_vec(decode_code)?),
        encoding::SECTION_DATA => Section::Data(reader.read_vec(decode_data)?),
        _ => return Err(DecodeError::UnknownSection(id)),
    };
    debug!("decoded {} section with {} entries", section.name(), section.len());
    Ok(section)
}

// Types -----------------------------------------------------------------------

pub fn decode_value_type(reader: &mut Reader) -> Result<ValueType, DecodeError> {
    let byte = reader.read_byte()?;
    ValueType::from_byte(byte).ok_or(DecodeError::InvalidValueType(byte))
}

fn decode_function_type(reader: &mut Reader) -> Result<FunctionType, DecodeError> {
    let form = reader.read_byte()?;
    if form != encoding::TYPE_FUNC {
        return Err(DecodeError::InvalidTypeForm(form));
    }
    let parameters = reader.read_vec(decode_value_type)?;
    let return_types = reader.read_vec(decode_value_type)?;
    Ok(FunctionType {
        parameters,
        return_types,
    })
}

fn decode_limits(reader: &mut Reader) -> Result<Limits, DecodeError> {
    let flag = reader.read_byte()?;
    let limits = match flag {
        encoding::LIMITS_MIN => Limits {
            min: reader.read_vu32()?,
            max: None,
        },
        encoding::LIMITS_MIN_MAX => Limits {
            min: reader.read_vu32()?,
            max: Some(reader.read_vu32()?),
        },
        _ => return Err(DecodeError::InvalidLimitsFlag(flag)),
    };
    if let Some(max) = limits.max {
        if limits.min > max {
            return Err(DecodeError::InvalidLimits { min: limits.min, max });
        }
    }
    Ok(limits)
}

fn decode_ref_type(reader: &mut Reader) -> Result<RefType, DecodeError> {
    match reader.read_byte()? {
        encoding::REFTYPE_FUNCREF => Ok(RefType::FuncRef),
        encoding::REFTYPE_EXTERNREF => Ok(RefType::ExternRef),
        other => Err(DecodeError::InvalidRefType(other)),
    }
}

fn decode_table_type(reader: &mut Reader) -> Result<TableType, DecodeError> {
    let ref_type = decode_ref_type(reader)?;
    let limits = decode_limits(reader)?;
    Ok(TableType { ref_type, limits })
}

fn decode_memory_type(reader: &mut Reader) -> Result<MemoryType, DecodeError> {
    Ok(MemoryType {
        limits: decode_limits(reader)?,
    })
}

fn decode_global_type(reader: &mut Reader) -> Result<GlobalType, DecodeError> {
    let value_type = decode_value_type(reader)?;
    let mutable = match reader.read_byte()? {
        encoding::GLOBAL_CONST => false,
        encoding::GLOBAL_VAR => true,
        other => return Err(DecodeError::InvalidMutability(other)),
    };
    Ok(GlobalType { value_type, mutable })
}

// Imports and exports -----------------------------------------------------------

fn decode_import(reader: &mut Reader) -> Result<Import, DecodeError> {
    let module = reader.read_name()?;
    let name = reader.read_name()?;
    let external_kind = match reader.read_byte()? {
        encoding::DESC_FUNC => ExternalKind::Function(reader.read_vu32()?),
        encoding::DESC_TABLE => ExternalKind::Table(decode_table_type(reader)?),
        encoding::DESC_MEMORY => ExternalKind::Memory(decode_memory_type(reader)?),
        encoding::DESC_GLOBAL => ExternalKind::Global(decode_global_type(reader)?),
        other => return Err(DecodeError::InvalidImportKind(other)),
    };
    Ok(Import {
        module,
        name,
        external_kind,
    })
}

fn decode_export(reader: &mut Reader) -> Result<Export, DecodeError> {
    let name = reader.read_name()?;
    let kind = reader.read_byte()?;
    let idx = reader.read_vu32()?;
    let index = match kind {
        encoding::DESC_FUNC => ExportIndex::Function(idx),
        encoding::DESC_TABLE => ExportIndex::Table(idx),
        encoding::DESC_MEMORY => ExportIndex::Memory(idx),
        encoding::DESC_GLOBAL => ExportIndex::Global(idx),
        other => return Err(DecodeError::InvalidExportKind(other)),
    };
    Ok(Export { name, index })
}

// Globals, elements, data -------------------------------------------------------

fn decode_global(reader: &mut Reader) -> Result<Global, DecodeError> {
    let global_type = decode_global_type(reader)?;
    let init = decode_const_expr(reader)?;
    Ok(Global { global_type, init })
}

/// Only kind 0 segments (active, table 0, function indices) are kept. The
/// other kinds are read far enough to be stepped over.
fn decode_elements(reader: &mut Reader) -> Result<Vec<Element>, DecodeError> {
    let count = reader.read_vu32()?;
    let mut elements = Vec::new();
    for _ in 0..count {
        let kind = reader.read_vu32()?;
        match kind {
            encoding::ELEM_ACTIVE_FUNCS => {
                let offset = decode_const_expr(reader)?;
                let init = reader.read_vec(|r| r.read_vu32())?;
                elements.push(Element {
                    table_index: 0,
                    offset,
                    init,
                });
            }
            encoding::ELEM_PASSIVE_FUNCS | encoding::ELEM_DECLARATIVE_FUNCS => {
                reader.read_byte()?;
                reader.read_vec(|r| r.read_vu32())?;
            }
            encoding::ELEM_ACTIVE_TABLE_FUNCS => {
                reader.read_vu32()?;
                skip_const_expr(reader)?;
                reader.read_byte()?;
                reader.read_vec(|r| r.read_vu32())?;
            }
            encoding::ELEM_ACTIVE_EXPRS => {
                skip_const_expr(reader)?;
                reader.read_vec(skip_const_expr)?;
            }
            encoding::ELEM_PASSIVE_EXPRS | encoding::ELEM_DECLARATIVE_EXPRS => {
                decode_ref_type(reader)?;
                reader.read_vec(skip_const_expr)?;
            }
            encoding::ELEM_ACTIVE_TABLE_EXPRS => {
                reader.read_vu32()?;
                skip_const_expr(reader)?;
                decode_ref_type(reader)?;
                reader.read_vec(skip_const_expr)?;
            }
            other => return Err(DecodeError::InvalidElementKind(other)),
        }
        if kind != encoding::ELEM_ACTIVE_FUNCS {
            debug!("skipped element segment of kind {kind}");
        }
    }
    Ok(elements)
}

/// Step over a constant expression without building it. Reference
/// instructions are accepted here even though they are never executed.
fn skip_const_expr(reader: &mut Reader) -> Result<(), DecodeError> {
    loop {
        match reader.read_byte()? {
            encoding::OP_END => return Ok(()),
            0x41 => {
                reader.read_vs32()?;
            }
            0x42 => {
                reader.read_vs64()?;
            }
            0x43 => {
                reader.read_bytes(4)?;
            }
            0x44 => {
                reader.read_bytes(8)?;
            }
            // global.get, ref.func
            0x23 | 0xD2 => {
                reader.read_vu32()?;
            }
            // ref.null
            0xD0 => {
                reader.read_byte()?;
            }
            other => return Err(DecodeError::UnknownOpcode(other)),
        }
    }
}

fn decode_data(reader: &mut Reader) -> Result<Data, DecodeError> {
    let memory_index = reader.read_vu32()?;
    let offset = decode_const_expr(reader)?;
    let init = reader.read_byte_vec()?;
    Ok(Data {
        memory_index,
        offset,
        init,
    })
}

// Code --------------------------------------------------------------------------

fn decode_code(reader: &mut Reader) -> Result<FunctionBody, DecodeError> {
    let size = reader.read_vu32()? as usize;
    let mut body_reader = reader.sub_reader(size)?;

    let entries = body_reader.read_vec(|r| {
        let count = r.read_vu32()?;
        let value_type = decode_value_type(r)?;
        Ok((count, value_type))
    })?;
    let locals = Locals::new(entries);
    if locals.len() > limits::MAX_FUNCTION_LOCALS {
        return Err(DecodeError::TooManyLocals(locals.len()));
    }

    let body = decode_body(&mut body_reader)?;
    if !body_reader.at_end() {
        return Err(DecodeError::SectionUnderread {
            id: encoding::SECTION_CODE,
            remaining: body_reader.remaining(),
        });
    }
    trace!("function body: {} locals, {} instructions", locals.len(), body.len());

    Ok(FunctionBody { locals, body })
}
