//! Decoder tests over hand-assembled binaries.
//!
//! Modules are written as hex, one section per literal, so a failing case
//! points at the bytes it is about.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use wasm_interp::parser::encoding::write_vu32;
    use wasm_interp::parser::instruction::Instruction;
    use wasm_interp::parser::module::{ExportIndex, ValueType};
    use wasm_interp::{parse, DecodeError};

    const PREAMBLE: &str = "0061736d01000000";
    // (type (func))
    const TYPE_VOID: &str = "010401600000";
    // (func (type 0))
    const FUNC_0: &str = "03020100";

    fn module(sections: &[&str]) -> Vec<u8> {
        let mut text = String::from(PREAMBLE);
        for section in sections {
            text.push_str(section);
        }
        hex::decode(text).unwrap()
    }

    /// A void function whose body is `body_hex` (without locals or `end`).
    fn module_with_body(body_hex: &str) -> Vec<u8> {
        let body = format!("00{body_hex}0b");
        let body_len = body.len() / 2;
        let code = format!("0a{:02x}01{:02x}{body}", body_len + 2, body_len);
        module(&[TYPE_VOID, FUNC_0, &code])
    }

    // =======================================================================
    // Well-formed modules
    // =======================================================================

    #[test]
    fn empty_module() {
        let module = parse(&module(&[])).unwrap();
        assert_eq!(module.version, 1);
        assert!(module.sections.is_empty());
    }

    #[test]
    fn add_function() {
        let bytes = module(&[
            "01070160027f7f017f",
            "03020100",
            "070701036164640000",
            "0a09010700200020016a0b",
        ]);
        let module = parse(&bytes).unwrap();

        let func_type = module.function_type(0).unwrap();
        assert_eq!(func_type.parameters, vec![ValueType::I32, ValueType::I32]);
        assert_eq!(func_type.return_types, vec![ValueType::I32]);

        let export = module.export_by_name("add").unwrap();
        assert_eq!(export.index, ExportIndex::Function(0));

        assert_eq!(
            module.code(0).unwrap().body,
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::LocalGet { local_idx: 1 },
                Instruction::I32Add,
            ]
        );
    }

    #[test]
    fn imported_functions_shift_indices() {
        // (import "env" "f" (func (type 0))) (func (type 0))
        let bytes = module(&[TYPE_VOID, "02090103656e7601660000", FUNC_0, "0a040102000b"]);
        let module = parse(&bytes).unwrap();
        assert_eq!(module.import_function_count(), 1);
        assert!(module.code(0).is_none());
        assert!(module.code(1).is_some());
        assert!(module.function_type(1).is_some());
    }

    #[test]
    fn custom_sections_anywhere() {
        // custom "x" [0xaa] before and after the type section
        let bytes = module(&["00030178aa", TYPE_VOID, "00030178aa"]);
        let module = parse(&bytes).unwrap();
        assert_eq!(module.sections.len(), 3);
        assert_eq!(module.types().len(), 1);
    }

    #[test]
    fn memory_and_data() {
        // (memory 1 2) (data (i32.const 8) "hi")
        let bytes = module(&["050401010102", "0b08010041080b026869"]);
        let module = parse(&bytes).unwrap();
        let memory = &module.memories()[0];
        assert_eq!((memory.limits.min, memory.limits.max), (1, Some(2)));
        let data = &module.data()[0];
        assert_eq!(data.offset, vec![Instruction::I32Const { value: 8 }]);
        assert_eq!(data.init, b"hi");
    }

    #[test]
    fn nested_blocks() {
        // block (result i32) i32.const 1 if nop else nop end end drop
        let bytes = module_with_body("027f410104400105010b0b1a");
        let module = parse(&bytes).unwrap();
        let body = &module.code(0).unwrap().body;
        assert_eq!(body.len(), 2);
        match &body[0] {
            Instruction::Block { body, .. } => {
                assert_eq!(body.len(), 2);
                assert!(matches!(
                    &body[1],
                    Instruction::If {
                        else_branch: Some(_),
                        ..
                    }
                ));
            }
            other => panic!("expected block, got {other}"),
        }
    }

    #[test]
    fn large_data_segment() {
        // (memory 256) (data (i32.const 0) <11 MiB>)
        let len = 11 * 1024 * 1024;
        // one segment for memory 0 at i32.const 0
        let mut payload = hex::decode("010041000b").unwrap();
        write_vu32(&mut payload, len as u32);
        payload.resize(payload.len() + len, 0x5a);

        let mut bytes = module(&["050401008002"]);
        bytes.push(0x0b);
        write_vu32(&mut bytes, payload.len() as u32);
        bytes.extend_from_slice(&payload);

        let module = parse(&bytes).unwrap();
        let data = &module.data()[0];
        assert_eq!(data.init.len(), len);
        assert!(data.init.iter().all(|&b| b == 0x5a));
    }

    #[test]
    fn unexpected_version_is_accepted() {
        let bytes = hex::decode("0061736d02000000").unwrap();
        assert_eq!(parse(&bytes).unwrap().version, 2);
    }

    // =======================================================================
    // Malformed modules
    // =======================================================================

    #[rstest]
    #[case::bad_magic("0061736e01000000", "magic header not detected")]
    #[case::short_preamble("0061736d0100", "unexpected end of input")]
    #[case::unknown_section("0061736d010000000d00", "unknown section id: 13")]
    #[case::section_out_of_order("0061736d01000000030100010100", "section 1 out of order or duplicated")]
    #[case::duplicate_section("0061736d01000000010100010100", "section 1 out of order or duplicated")]
    #[case::section_underread("0061736d0100000001020000", "section 1 not fully consumed, 1 bytes left")]
    #[case::section_overrun("0061736d0100000001050160", "unexpected end of input")]
    #[case::over_long_leb128("0061736d0100000001808080808000", "malformed LEB128 integer")]
    #[case::bad_value_type("0061736d0100000001050160017b00", "invalid value type: 0x7b")]
    #[case::bad_type_form("0061736d01000000010401610000", "invalid function type form: 0x61")]
    #[case::bad_limits("0061736d010000000504010102 01", "size minimum must not be greater than maximum: 2 > 1")]
    #[case::bad_limits_flag("0061736d0100000005030104 01", "invalid limits flag: 0x04")]
    #[case::bad_utf8("0061736d01000000070501 01ff 0000", "malformed UTF-8 encoding")]
    #[case::function_without_code("0061736d0100000001040160000003020100", "function and code section have inconsistent lengths: 1 != 0")]
    fn malformed(#[case] hex_bytes: &str, #[case] message: &str) {
        let bytes = hex::decode(hex_bytes.replace(' ', "")).unwrap();
        let err = parse(&bytes).unwrap_err();
        assert_eq!(err.to_string(), message);
    }

    #[rstest]
    #[case::unknown_opcode("d0")]
    #[case::reserved_opcode("06")]
    #[case::truncated_immediate("41")]
    fn malformed_code(#[case] body_hex: &str) {
        assert!(parse(&module_with_body(body_hex)).is_err());
    }

    #[test]
    fn memory_size_reserved_byte() {
        let err = parse(&module_with_body("3f011a")).unwrap_err();
        assert!(matches!(err, DecodeError::NonZeroReserved(1)));
    }

    #[test]
    fn unknown_opcode_is_reported() {
        let err = parse(&module_with_body("d0")).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownOpcode(0xd0)));
    }

    #[test]
    fn else_outside_if() {
        let err = parse(&module_with_body("05")).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedElse));
    }

    #[test]
    fn truncating_a_section_fails() {
        let bytes = module(&["01070160027f7f017f", "03020100", "0a09010700200020016a0b"]);
        // every cut that lands inside the code section payload
        for cut in 1..=9 {
            let truncated = &bytes[..bytes.len() - cut];
            assert!(parse(truncated).is_err(), "cut of {cut} bytes decoded");
        }
    }

    #[test]
    fn parse_file_reports_io_errors() {
        let err = wasm_interp::parse_file("does/not/exist.wasm").unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }
}
