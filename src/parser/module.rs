//! In-memory representation of a decoded module
//!
//! A `Module` keeps its sections in the order they were read. Accessors scan
//! for the wanted section variant and return an empty slice when it is absent,
//! so callers never need to distinguish "missing" from "empty".

use super::encoding;
use super::instruction::Instruction;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    pub fn from_byte(byte: u8) -> Option<ValueType> {
        match byte {
            encoding::VALTYPE_I32 => Some(ValueType::I32),
            encoding::VALTYPE_I64 => Some(ValueType::I64),
            encoding::VALTYPE_F32 => Some(ValueType::F32),
            encoding::VALTYPE_F64 => Some(ValueType::F64),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            ValueType::I32 => encoding::VALTYPE_I32,
            ValueType::I64 => encoding::VALTYPE_I64,
            ValueType::F32 => encoding::VALTYPE_F32,
            ValueType::F64 => encoding::VALTYPE_F64,
        }
    }

    pub fn from_name(name: &str) -> Option<ValueType> {
        match name {
            "i32" => Some(ValueType::I32),
            "i64" => Some(ValueType::I64),
            "f32" => Some(ValueType::F32),
            "f64" => Some(ValueType::F64),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionType {
    pub parameters: Vec<ValueType>,
    pub return_types: Vec<ValueType>,
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let join = |types: &[ValueType]| {
            types
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(", ")
        };
        write!(f, "({}) -> ({})", join(&self.parameters), join(&self.return_types))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{} {}", self.min, max),
            None => write!(f, "{}", self.min),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefType {
    FuncRef,
    ExternRef,
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RefType::FuncRef => write!(f, "funcref"),
            RefType::ExternRef => write!(f, "externref"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub ref_type: RefType,
    pub limits: Limits,
}

/// Linear memory type; sizes are in 64KiB pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutable: bool,
}

/// What an import brings in.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalKind {
    /// Imported function, by type index
    Function(u32),
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub external_kind: ExternalKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportIndex {
    Function(u32),
    Table(u32),
    Memory(u32),
    Global(u32),
}

impl fmt::Display for ExportIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExportIndex::Function(idx) => write!(f, "func {idx}"),
            ExportIndex::Table(idx) => write!(f, "table {idx}"),
            ExportIndex::Memory(idx) => write!(f, "memory {idx}"),
            ExportIndex::Global(idx) => write!(f, "global {idx}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub name: String,
    pub index: ExportIndex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub global_type: GlobalType,
    pub init: Vec<Instruction>,
}

/// Active element segment targeting a table with function indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub table_index: u32,
    pub offset: Vec<Instruction>,
    pub init: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    pub memory_index: u32,
    pub offset: Vec<Instruction>,
    pub init: Vec<u8>,
}

/// Run-length encoded local declarations of a function body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Locals {
    entries: Vec<(u32, ValueType)>,
}

impl Locals {
    pub fn new(entries: Vec<(u32, ValueType)>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> u64 {
        self.entries.iter().map(|(count, _)| u64::from(*count)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (u32, ValueType)> {
        self.entries.iter()
    }

    /// The `(count, type)` runs as declared.
    pub fn entries(&self) -> &[(u32, ValueType)] {
        &self.entries
    }

    /// One `ValueType` per declared local, in index order.
    pub fn expand(&self) -> impl Iterator<Item = ValueType> + '_ {
        self.entries
            .iter()
            .flat_map(|(count, value_type)| std::iter::repeat(*value_type).take(*count as usize))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    pub locals: Locals,
    pub body: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomSection {
    pub name: String,
    pub data: Vec<u8>,
}

/// One decoded section.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Custom(CustomSection),
    Type(Vec<FunctionType>),
    Import(Vec<Import>),
    /// Type index of every locally defined function
    Function(Vec<u32>),
    Table(Vec<TableType>),
    Memory(Vec<MemoryType>),
    Global(Vec<Global>),
    Export(Vec<Export>),
    Start(u32),
    Element(Vec<Element>),
    Code(Vec<FunctionBody>),
    Data(Vec<Data>),
}

impl Section {
    pub fn id(&self) -> u8 {
        match self {
            Section::Custom(_) => encoding::SECTION_CUSTOM,
            Section::Type(_) => encoding::SECTION_TYPE,
            Section::Import(_) => encoding::SECTION_IMPORT,
            Section::Function(_) => encoding::SECTION_FUNCTION,
            Section::Table(_) => encoding::SECTION_TABLE,
            Section::Memory(_) => encoding::SECTION_MEMORY,
            Section::Global(_) => encoding::SECTION_GLOBAL,
            Section::Export(_) => encoding::SECTION_EXPORT,
            Section::Start(_) => encoding::SECTION_START,
            Section::Element(_) => encoding::SECTION_ELEMENT,
            Section::Code(_) => encoding::SECTION_CODE,
            Section::Data(_) => encoding::SECTION_DATA,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Section::Custom(_) => "custom",
            Section::Type(_) => "type",
            Section::Import(_) => "import",
            Section::Function(_) => "function",
            Section::Table(_) => "table",
            Section::Memory(_) => "memory",
            Section::Global(_) => "global",
            Section::Export(_) => "export",
            Section::Start(_) => "start",
            Section::Element(_) => "element",
            Section::Code(_) => "code",
            Section::Data(_) => "data",
        }
    }

    /// Number of entries, for summaries.
    pub fn len(&self) -> usize {
        match self {
            Section::Custom(_) | Section::Start(_) => 1,
            Section::Type(v) => v.len(),
            Section::Import(v) => v.len(),
            Section::Function(v) => v.len(),
            Section::Table(v) => v.len(),
            Section::Memory(v) => v.len(),
            Section::Global(v) => v.len(),
            Section::Export(v) => v.len(),
            Section::Element(v) => v.len(),
            Section::Code(v) => v.len(),
            Section::Data(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A decoded module. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub version: u32,
    pub sections: Vec<Section>,
}

impl Default for Module {
    fn default() -> Self {
        Module::new()
    }
}

impl Module {
    pub fn new() -> Module {
        Module {
            version: encoding::VERSION,
            sections: Vec::new(),
        }
    }

    pub fn with_sections(sections: Vec<Section>) -> Module {
        Module {
            version: encoding::VERSION,
            sections,
        }
    }

    pub fn push_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn types(&self) -> &[FunctionType] {
        self.sections
            .iter()
            .find_map(|s| match s {
                Section::Type(v) => Some(v.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn imports(&self) -> &[Import] {
        self.sections
            .iter()
            .find_map(|s| match s {
                Section::Import(v) => Some(v.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn functions(&self) -> &[u32] {
        self.sections
            .iter()
            .find_map(|s| match s {
                Section::Function(v) => Some(v.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn tables(&self) -> &[TableType] {
        self.sections
            .iter()
            .find_map(|s| match s {
                Section::Table(v) => Some(v.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn memories(&self) -> &[MemoryType] {
        self.sections
            .iter()
            .find_map(|s| match s {
                Section::Memory(v) => Some(v.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn globals(&self) -> &[Global] {
        self.sections
            .iter()
            .find_map(|s| match s {
                Section::Global(v) => Some(v.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn exports(&self) -> &[Export] {
        self.sections
            .iter()
            .find_map(|s| match s {
                Section::Export(v) => Some(v.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn start(&self) -> Option<u32> {
        self.sections.iter().find_map(|s| match s {
            Section::Start(idx) => Some(*idx),
            _ => None,
        })
    }

    pub fn elements(&self) -> &[Element] {
        self.sections
            .iter()
            .find_map(|s| match s {
                Section::Element(v) => Some(v.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn code_bodies(&self) -> &[FunctionBody] {
        self.sections
            .iter()
            .find_map(|s| match s {
                Section::Code(v) => Some(v.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn data(&self) -> &[Data] {
        self.sections
            .iter()
            .find_map(|s| match s {
                Section::Data(v) => Some(v.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn custom_sections(&self) -> impl Iterator<Item = &CustomSection> {
        self.sections.iter().filter_map(|s| match s {
            Section::Custom(c) => Some(c),
            _ => None,
        })
    }

    // Cross-section lookups ---------------------------------------------------

    /// Imported functions, in import order; they own the lowest function indices.
    pub fn imported_functions(&self) -> impl Iterator<Item = (&Import, u32)> {
        self.imports().iter().filter_map(|import| match import.external_kind {
            ExternalKind::Function(type_idx) => Some((import, type_idx)),
            _ => None,
        })
    }

    pub fn import_function_count(&self) -> u32 {
        self.imported_functions().count() as u32
    }

    /// Imported globals, in import order; they own the lowest global indices.
    pub fn imported_globals(&self) -> impl Iterator<Item = (&Import, GlobalType)> {
        self.imports().iter().filter_map(|import| match import.external_kind {
            ExternalKind::Global(global_type) => Some((import, global_type)),
            _ => None,
        })
    }

    pub fn import_global_count(&self) -> u32 {
        self.imported_globals().count() as u32
    }

    /// Imports plus local definitions.
    pub fn function_count(&self) -> u32 {
        self.import_function_count() + self.functions().len() as u32
    }

    /// Type index of function `func_idx`, imported or local.
    pub fn function_type_index(&self, func_idx: u32) -> Option<u32> {
        let imported = self.import_function_count();
        if func_idx < imported {
            self.imported_functions()
                .nth(func_idx as usize)
                .map(|(_, type_idx)| type_idx)
        } else {
            self.functions().get((func_idx - imported) as usize).copied()
        }
    }

    pub fn function_type(&self, func_idx: u32) -> Option<&FunctionType> {
        let type_idx = self.function_type_index(func_idx)?;
        self.types().get(type_idx as usize)
    }

    /// Body of function `func_idx`; `None` for imports and out-of-range indices.
    pub fn code(&self, func_idx: u32) -> Option<&FunctionBody> {
        let imported = self.import_function_count();
        if func_idx < imported {
            return None;
        }
        self.code_bodies().get((func_idx - imported) as usize)
    }

    pub fn export_by_name(&self, name: &str) -> Option<&Export> {
        self.exports().iter().find(|export| export.name == name)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "module version={}", self.version)?;
        for section in &self.sections {
            match section {
                Section::Custom(custom) => write!(f, " custom[\"{}\"]", custom.name)?,
                Section::Start(idx) => write!(f, " start[{idx}]")?,
                other => write!(f, " {}[{}]", other.name(), other.len())?,
            }
        }
        Ok(())
    }
}
