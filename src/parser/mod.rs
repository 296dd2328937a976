//! WebAssembly binary decoder
//!
//! `parse` turns a `.wasm` byte stream into a [`module::Module`]. The preamble
//! is checked first, then sections are read one at a time: an id byte, a u32
//! size, and exactly `size` bytes handed to the matching section decoder
//! through a bounded reader.

pub mod encoding;
pub mod instruction;
pub mod limits;
pub mod module;
pub mod reader;
pub mod section;

use log::{debug, warn};
use module::Module;
use reader::Reader;
use std::io;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("magic header not detected")]
    BadMagic,
    #[error("malformed LEB128 integer")]
    BadLEB128,
    #[error("malformed UTF-8 encoding")]
    BadUtf8,
    #[error("name or byte vector too long: {0} bytes")]
    NameTooLong(usize),
    #[error("unknown section id: {0}")]
    UnknownSection(u8),
    #[error("section {id} not fully consumed, {remaining} bytes left")]
    SectionUnderread { id: u8, remaining: usize },
    #[error("section {0} out of order or duplicated")]
    SectionOutOfOrder(u8),
    #[error("illegal opcode: {0:#04x}")]
    UnknownOpcode(u8),
    #[error("invalid value type: {0:#04x}")]
    InvalidValueType(u8),
    #[error("invalid reference type: {0:#04x}")]
    InvalidRefType(u8),
    #[error("invalid block type")]
    InvalidBlockType,
    #[error("invalid function type form: {0:#04x}")]
    InvalidTypeForm(u8),
    #[error("invalid limits flag: {0:#04x}")]
    InvalidLimitsFlag(u8),
    #[error("size minimum must not be greater than maximum: {min} > {max}")]
    InvalidLimits { min: u32, max: u32 },
    #[error("invalid mutability flag: {0:#04x}")]
    InvalidMutability(u8),
    #[error("invalid import kind: {0:#04x}")]
    InvalidImportKind(u8),
    #[error("invalid export kind: {0:#04x}")]
    InvalidExportKind(u8),
    #[error("invalid element segment kind: {0}")]
    InvalidElementKind(u32),
    #[error("zero byte expected, got {0:#04x}")]
    NonZeroReserved(u8),
    #[error("function and code section have inconsistent lengths: {functions} != {bodies}")]
    FunctionCodeMismatch { functions: usize, bodies: usize },
    #[error("else without matching if")]
    UnexpectedElse,
    #[error("too many locals: {0}")]
    TooManyLocals(u64),
    #[error("br_table has too many labels: {0}")]
    TooManyLabels(u32),
    #[error("blocks nested too deeply")]
    NestingTooDeep,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Decode a module from its binary encoding.
pub fn parse(bytes: &[u8]) -> Result<Module, DecodeError> {
    let mut reader = Reader::new(bytes.to_vec());
    let version = read_preamble(&mut reader)?;

    let mut module = Module::new();
    module.version = version;

    let mut last_id = 0u8;
    // EOF where a section would start ends the module
    while !reader.at_end() {
        let id = reader.read_byte()?;
        if id > encoding::SECTION_DATA {
            return Err(DecodeError::UnknownSection(id));
        }
        let size = reader.read_vu32()? as usize;
        debug!("section id={id} size={size} at offset {}", reader.pos());

        let mut body = reader.sub_reader(size)?;
        let section = section::decode_section(id, &mut body)?;
        if !body.at_end() {
            return Err(DecodeError::SectionUnderread {
                id,
                remaining: body.remaining(),
            });
        }

        if id != encoding::SECTION_CUSTOM {
            if id <= last_id {
                return Err(DecodeError::SectionOutOfOrder(id));
            }
            last_id = id;
        }
        module.push_section(section);
    }

    let functions = module.functions().len();
    let bodies = module.code_bodies().len();
    if functions != bodies {
        return Err(DecodeError::FunctionCodeMismatch { functions, bodies });
    }

    debug!("decoded {module}");
    Ok(module)
}

/// Read a `.wasm` file and decode it.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Module, DecodeError> {
    let bytes = std::fs::read(path)?;
    parse(&bytes)
}

fn read_preamble(reader: &mut Reader) -> Result<u32, DecodeError> {
    let magic = reader.read_bytes(4).map_err(|_| DecodeError::BadMagic)?;
    if magic != encoding::MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let version = reader.read_u32()?;
    if version != encoding::VERSION {
        warn!("unexpected binary version {version}, continuing anyway");
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::module::{ExportIndex, Section, ValueType};
    use super::*;

    const PREAMBLE: [u8; 8] = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];

    fn with_preamble(sections: &[u8]) -> Vec<u8> {
        let mut bytes = PREAMBLE.to_vec();
        bytes.extend_from_slice(sections);
        bytes
    }

    #[test]
    fn test_empty_module() {
        let module = parse(&PREAMBLE).unwrap();
        assert_eq!(module.version, 1);
        assert!(module.sections.is_empty());
    }

    #[test]
    fn test_other_version_is_accepted() {
        let module = parse(&[0x00, 0x61, 0x73, 0x6d, 0x02, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(module.version, 2);
    }

    #[test]
    fn test_bad_magic() {
        assert!(matches!(
            parse(&[0x00, 0x61, 0x73, 0x6e, 0x01, 0x00, 0x00, 0x00]),
            Err(DecodeError::BadMagic)
        ));
        assert!(matches!(parse(&[0x00, 0x61]), Err(DecodeError::BadMagic)));
    }

    #[test]
    fn test_truncated_version() {
        assert!(matches!(
            parse(&[0x00, 0x61, 0x73, 0x6d, 0x01]),
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_unknown_section() {
        assert!(matches!(
            parse(&with_preamble(&[0x0d, 0x00])),
            Err(DecodeError::UnknownSection(13))
        ));
    }

    #[test]
    fn test_section_underread() {
        // type section claiming 2 bytes but holding an empty vector plus junk
        assert!(matches!(
            parse(&with_preamble(&[0x01, 0x02, 0x00, 0x00])),
            Err(DecodeError::SectionUnderread { id: 1, remaining: 1 })
        ));
    }

    #[test]
    fn test_section_truncated() {
        assert!(matches!(
            parse(&with_preamble(&[0x01, 0x05, 0x01, 0x60])),
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_sections_out_of_order() {
        // memory section followed by type section
        let bytes = with_preamble(&[0x05, 0x03, 0x01, 0x00, 0x01, 0x01, 0x01, 0x00]);
        assert!(matches!(parse(&bytes), Err(DecodeError::SectionOutOfOrder(1))));
    }

    #[test]
    fn test_custom_section_anywhere() {
        let bytes = with_preamble(&[
            0x00, 0x04, 0x02, b'h', b'i', 0xff, // custom "hi" [ff]
            0x01, 0x01, 0x00, // empty type section
            0x00, 0x02, 0x01, b'x', // custom "x"
        ]);
        let module = parse(&bytes).unwrap();
        let names: Vec<_> = module.custom_sections().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["hi".to_string(), "x".to_string()]);
        assert_eq!(module.custom_sections().next().unwrap().data, vec![0xff]);
    }

    #[test]
    fn test_add_module() {
        let bytes = with_preamble(&[
            0x01, 0x07, 0x01, 0x60, 0x02, 0x7f, 0x7f, 0x01, 0x7f, // type
            0x03, 0x02, 0x01, 0x00, // function
            0x07, 0x07, 0x01, 0x03, b'a', b'd', b'd', 0x00, 0x00, // export
            0x0a, 0x09, 0x01, 0x07, 0x00, 0x20, 0x00, 0x20, 0x01, 0x6a, 0x0b, // code
        ]);
        let module = parse(&bytes).unwrap();
        assert_eq!(module.sections.len(), 4);
        assert!(matches!(module.sections[0], Section::Type(_)));
        assert_eq!(
            module.function_type(0).unwrap().parameters,
            vec![ValueType::I32, ValueType::I32]
        );
        assert_eq!(module.export_by_name("add").unwrap().index, ExportIndex::Function(0));
        assert_eq!(module.code(0).unwrap().body.len(), 3);
    }

    #[test]
    fn test_function_without_code() {
        let bytes = with_preamble(&[
            0x01, 0x04, 0x01, 0x60, 0x00, 0x00, // type
            0x03, 0x02, 0x01, 0x00, // function
        ]);
        assert!(matches!(
            parse(&bytes),
            Err(DecodeError::FunctionCodeMismatch { functions: 1, bodies: 0 })
        ));
    }
}
