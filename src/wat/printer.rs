//! Module to text.
//!
//! Every reference is printed as a numeric index and every function carries
//! an explicit `(type N)`, so translating the output again yields the same
//! module. Custom sections have no text form and are dropped.

use crate::parser::instruction::Instruction;
use crate::parser::module::{ExternalKind, FunctionType, GlobalType, Module, TableType, ValueType};
use std::fmt::Write;

pub fn module_to_text(module: &Module) -> String {
    let mut out = String::from("(module");

    for func_type in module.types() {
        out.push_str("\n  (type (func");
        write_signature(&mut out, func_type);
        out.push_str("))");
    }
    for import in module.imports() {
        out.push_str("\n  (import ");
        write_string(&mut out, import.module.as_bytes());
        out.push(' ');
        write_string(&mut out, import.name.as_bytes());
        match &import.external_kind {
            ExternalKind::Function(type_idx) => {
                let _ = write!(out, " (func (type {type_idx}))");
            }
            ExternalKind::Table(table_type) => {
                let _ = write!(out, " (table {})", table_text(table_type));
            }
            ExternalKind::Memory(memory_type) => {
                let _ = write!(out, " (memory {})", memory_type.limits);
            }
            ExternalKind::Global(global_type) => {
                let _ = write!(out, " (global {})", global_type_text(global_type));
            }
        }
        out.push(')');
    }
    for (type_idx, body) in module.functions().iter().zip(module.code_bodies()) {
        let _ = write!(out, "\n  (func (type {type_idx})");
        for (count, value_type) in body.locals.entries() {
            out.push_str(" (local");
            for _ in 0..*count {
                let _ = write!(out, " {value_type}");
            }
            out.push(')');
        }
        write_instructions(&mut out, &body.body);
        out.push(')');
    }
    for table_type in module.tables() {
        let _ = write!(out, "\n  (table {})", table_text(table_type));
    }
    for memory_type in module.memories() {
        let _ = write!(out, "\n  (memory {})", memory_type.limits);
    }
    for global in module.globals() {
        let _ = write!(out, "\n  (global {}", global_type_text(&global.global_type));
        write_instructions(&mut out, &global.init);
        out.push(')');
    }
    for export in module.exports() {
        out.push_str("\n  (export ");
        write_string(&mut out, export.name.as_bytes());
        let _ = write!(out, " ({}))", export.index);
    }
    if let Some(start) = module.start() {
        let _ = write!(out, "\n  (start {start})");
    }
    for element in module.elements() {
        out.push_str("\n  (elem");
        if element.table_index != 0 {
            let _ = write!(out, " (table {})", element.table_index);
        }
        out.push_str(" (offset");
        write_instructions(&mut out, &element.offset);
        out.push_str(") func");
        for func_idx in &element.init {
            let _ = write!(out, " {func_idx}");
        }
        out.push(')');
    }
    for data in module.data() {
        out.push_str("\n  (data");
        if data.memory_index != 0 {
            let _ = write!(out, " (memory {})", data.memory_index);
        }
        out.push_str(" (offset");
        write_instructions(&mut out, &data.offset);
        out.push_str(") ");
        write_string(&mut out, &data.init);
        out.push(')');
    }

    out.push_str(")\n");
    out
}

fn write_signature(out: &mut String, func_type: &FunctionType) {
    write_types(out, "param", &func_type.parameters);
    write_types(out, "result", &func_type.return_types);
}

fn write_types(out: &mut String, keyword: &str, types: &[ValueType]) {
    if types.is_empty() {
        return;
    }
    let _ = write!(out, " ({keyword}");
    for value_type in types {
        let _ = write!(out, " {value_type}");
    }
    out.push(')');
}

fn write_instructions(out: &mut String, instructions: &[Instruction]) {
    for instruction in instructions {
        let _ = write!(out, " {instruction}");
    }
}

fn table_text(table_type: &TableType) -> String {
    format!("{} {}", table_type.limits, table_type.ref_type)
}

fn global_type_text(global_type: &GlobalType) -> String {
    if global_type.mutable {
        format!("(mut {})", global_type.value_type)
    } else {
        global_type.value_type.to_string()
    }
}

/// Printable ASCII is written as is; everything else as `\hh`.
fn write_string(out: &mut String, bytes: &[u8]) {
    out.push('"');
    for &byte in bytes {
        match byte {
            b'"' | b'\\' => {
                let _ = write!(out, "\\{}", byte as char);
            }
            0x20..=0x7e => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\{byte:02x}");
            }
        }
    }
    out.push('"');
}
