//! Translation of an s-expression tree into a [`Module`].
//!
//! Fields are walked three times: type definitions first, then every
//! function, table, memory and global is given its index (imports before
//! definitions), and finally each field is translated. Because all names are
//! bound before any body is read, calls and `global.get` may refer forward.
//!
//! Both plain (`local.get 0 i32.const 1 i32.add`) and folded
//! (`(i32.add (local.get 0) (i32.const 1))`) instruction syntax are accepted
//! and may be mixed freely.

use super::error::WatError;
use super::sexpr::{read_all, SExpr, SExprList};
use super::token::{FloatLit, Span, Token, TokenKind};
use crate::parser::instruction::{BlockType, Instruction, MemArg};
use crate::parser::module::{
    Data, Element, Export, ExportIndex, ExternalKind, FunctionBody, FunctionType, Global, GlobalType, Import, Limits,
    Locals, MemoryType, Module, RefType, Section, TableType, ValueType,
};
use log::debug;
use std::collections::HashMap;

const PAGE_SIZE: usize = 65536;

/// Index spaces that can be named with `$id` at module level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Namespace {
    Type,
    Func,
    Table,
    Memory,
    Global,
}

impl Namespace {
    fn name(self) -> &'static str {
        match self {
            Namespace::Type => "type",
            Namespace::Func => "function",
            Namespace::Table => "table",
            Namespace::Memory => "memory",
            Namespace::Global => "global",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Namespace> {
        match keyword {
            "func" => Some(Namespace::Func),
            "table" => Some(Namespace::Table),
            "memory" => Some(Namespace::Memory),
            "global" => Some(Namespace::Global),
            _ => None,
        }
    }

    fn matches(self, kind: &ExternalKind) -> bool {
        matches!(
            (self, kind),
            (Namespace::Func, ExternalKind::Function(_))
                | (Namespace::Table, ExternalKind::Table(_))
                | (Namespace::Memory, ExternalKind::Memory(_))
                | (Namespace::Global, ExternalKind::Global(_))
        )
    }
}

#[derive(Default)]
struct Space {
    names: HashMap<String, u32>,
    count: u32,
    defined: bool,
}

/// Translation state: name tables, the label stack of the function being
/// read, and the sections being collected.
#[derive(Default)]
struct Context {
    spaces: [Space; 5],
    locals: HashMap<String, u32>,
    labels: Vec<Option<String>>,

    types: Vec<FunctionType>,
    imports: Vec<Import>,
    functions: Vec<u32>,
    tables: Vec<TableType>,
    memories: Vec<MemoryType>,
    globals: Vec<Global>,
    exports: Vec<Export>,
    start: Option<u32>,
    elements: Vec<Element>,
    code: Vec<FunctionBody>,
    data: Vec<Data>,
}

/// Translate module text into a [`Module`].
///
/// The source is either a single `(module ...)` form or a bare sequence of
/// module fields.
///
/// ```
/// use wasm_interp::wat::parse;
///
/// let module = parse(r#"(module (func (export "one") (result i32) i32.const 1))"#).unwrap();
/// assert_eq!(module.functions().len(), 1);
/// assert!(module.export_by_name("one").is_some());
/// ```
pub fn parse(source: &str) -> Result<Module, WatError> {
    let forms = read_all(source)?;
    let fields: &[SExpr] = match forms.as_slice() {
        [single] if single.is_list_headed_by("module") => {
            let list = single.expect_list()?;
            let mut pos = 1;
            take_id(list.items, &mut pos);
            &list.items[pos..]
        }
        other => other,
    };

    let mut ctx = Context::default();
    for field in fields {
        let list = field.expect_list()?;
        if list.head_keyword() == Some("type") {
            ctx.define_type(list)?;
        }
    }
    for field in fields {
        ctx.bind_field(field.expect_list()?)?;
    }
    for field in fields {
        ctx.translate_field(field.expect_list()?)?;
    }

    let module = ctx.into_module();
    debug!("translated text: {module}");
    Ok(module)
}

impl Context {
    fn space(&mut self, ns: Namespace) -> &mut Space {
        &mut self.spaces[ns as usize]
    }

    fn bind(&mut self, ns: Namespace, name: &str, idx: u32, span: Span) -> Result<(), WatError> {
        let names = &mut self.space(ns).names;
        if names.contains_key(name) {
            return Err(WatError::new(format!("duplicate {}: ${name}", ns.name()), span));
        }
        names.insert(name.to_string(), idx);
        Ok(())
    }

    fn resolve(&self, ns: Namespace, name: &str, span: Span) -> Result<u32, WatError> {
        self.spaces[ns as usize]
            .names
            .get(name)
            .copied()
            .ok_or_else(|| WatError::undefined(ns.name(), name, span))
    }

    /// Resolve a numeric or `$named` index in `ns`.
    fn index(&self, item: Option<&SExpr>, ns: Namespace, span: Span) -> Result<u32, WatError> {
        match item {
            Some(SExpr::Atom(Token {
                kind: TokenKind::Integer(int),
                span,
            })) => int
                .to_u32()
                .ok_or_else(|| WatError::new(format!("{} index out of range", ns.name()), *span)),
            Some(SExpr::Atom(Token {
                kind: TokenKind::Id(name),
                span,
            })) => self.resolve(ns, name, *span),
            Some(other) => Err(WatError::expected(
                &format!("{} index", ns.name()),
                other.describe(),
                other.span(),
            )),
            None => Err(WatError::new(format!("expected {} index", ns.name()), span)),
        }
    }

    fn local(&self, item: Option<&SExpr>, span: Span) -> Result<u32, WatError> {
        match item {
            Some(SExpr::Atom(Token {
                kind: TokenKind::Id(name),
                span,
            })) => self
                .locals
                .get(name.as_str())
                .copied()
                .ok_or_else(|| WatError::undefined("local", name, *span)),
            Some(SExpr::Atom(Token {
                kind: TokenKind::Integer(int),
                span,
            })) => int.to_u32().ok_or_else(|| WatError::new("local index out of range", *span)),
            Some(other) => Err(WatError::expected("local index", other.describe(), other.span())),
            None => Err(WatError::new("expected local index", span)),
        }
    }

    /// Labels resolve to their depth: 0 is the innermost enclosing block.
    fn label(&self, item: Option<&SExpr>, span: Span) -> Result<u32, WatError> {
        match item {
            Some(SExpr::Atom(Token {
                kind: TokenKind::Id(name),
                span,
            })) => self
                .labels
                .iter()
                .rev()
                .position(|label| label.as_deref() == Some(name.as_str()))
                .map(|depth| depth as u32)
                .ok_or_else(|| WatError::undefined("label", name, *span)),
            Some(SExpr::Atom(Token {
                kind: TokenKind::Integer(int),
                span,
            })) => int.to_u32().ok_or_else(|| WatError::new("label index out of range", *span)),
            Some(other) => Err(WatError::expected("label", other.describe(), other.span())),
            None => Err(WatError::new("expected label", span)),
        }
    }

    /// Number of imports of the given kind, which own the lowest indices.
    fn imported(&self, ns: Namespace) -> u32 {
        self.imports
            .iter()
            .filter(|import| ns.matches(&import.external_kind))
            .count() as u32
    }

    fn find_or_add_type(&mut self, func_type: FunctionType) -> u32 {
        match self.types.iter().position(|existing| *existing == func_type) {
            Some(idx) => idx as u32,
            None => {
                self.types.push(func_type);
                self.types.len() as u32 - 1
            }
        }
    }

    // Pass 1: `(type $id? (func param* result*))`
    fn define_type(&mut self, list: SExprList<'_>) -> Result<(), WatError> {
        let mut pos = 1;
        let name = take_id(list.items, &mut pos);
        let func = list
            .items
            .get(pos)
            .filter(|item| item.is_list_headed_by("func"))
            .and_then(SExpr::as_list)
            .ok_or_else(|| WatError::new("expected function type", list.span))?;
        expect_end_of(list.items, pos + 1)?;

        let mut inner = 1;
        let func_type = parse_signature(func.items, &mut inner, None)?;
        expect_end_of(func.items, inner)?;

        let idx = self.types.len() as u32;
        self.types.push(func_type);
        if let Some(name) = name {
            self.bind(Namespace::Type, name, idx, list.span)?;
        }
        Ok(())
    }

    // Pass 2: assign indices and bind names
    fn bind_field(&mut self, list: SExprList<'_>) -> Result<(), WatError> {
        let (ns, name, imported) = match list.head_keyword() {
            Some("import") => {
                let Some(desc) = list.items.get(3).and_then(SExpr::as_list) else {
                    return Ok(());
                };
                let Some(ns) = desc.head_keyword().and_then(Namespace::from_keyword) else {
                    return Ok(());
                };
                (ns, desc.items.get(1).and_then(SExpr::as_id), true)
            }
            Some(keyword) => {
                let Some(ns) = Namespace::from_keyword(keyword) else {
                    return Ok(());
                };
                let mut pos = 1;
                let name = take_id(list.items, &mut pos);
                while list.items.get(pos).is_some_and(|item| item.is_list_headed_by("export")) {
                    pos += 1;
                }
                let imported = list.items.get(pos).is_some_and(|item| item.is_list_headed_by("import"));
                (ns, name, imported)
            }
            None => return Ok(()),
        };

        let space = self.space(ns);
        if imported && space.defined {
            return Err(WatError::new(format!("import after {} definition", ns.name()), list.span));
        }
        space.defined |= !imported;
        let idx = space.count;
        space.count += 1;
        if let Some(name) = name {
            self.bind(ns, name, idx, list.span)?;
        }
        Ok(())
    }

    // Pass 3
    fn translate_field(&mut self, list: SExprList<'_>) -> Result<(), WatError> {
        let keyword = list
            .head_keyword()
            .ok_or_else(|| WatError::new("expected field keyword", list.span))?;
        match keyword {
            "type" => Ok(()),
            "import" => self.translate_import(list),
            "func" => self.translate_func(list),
            "table" => self.translate_table(list),
            "memory" => self.translate_memory(list),
            "global" => self.translate_global(list),
            "export" => self.translate_export(list),
            "start" => self.translate_start(list),
            "elem" => self.translate_elem(list),
            "data" => self.translate_data(list),
            other => Err(WatError::new(format!("unknown field: {other}"), list.span)),
        }
    }

    /// `(type x)? (param ..)* (result ..)*`
    ///
    /// Without an explicit index the signature is matched against the known
    /// types, appending a new one if none is equal. Parameter names are
    /// bound in `names` when given.
    fn type_use(
        &mut self,
        items: &[SExpr],
        pos: &mut usize,
        names: Option<&mut HashMap<String, u32>>,
        span: Span,
    ) -> Result<(u32, FunctionType), WatError> {
        let explicit = match items.get(*pos).and_then(SExpr::as_list) {
            Some(list) if list.head_keyword() == Some("type") => {
                *pos += 1;
                expect_end_of(list.items, 2)?;
                Some(self.index(list.items.get(1), Namespace::Type, list.span)?)
            }
            _ => None,
        };
        let inline = parse_signature(items, pos, names)?;

        let Some(type_idx) = explicit else {
            let type_idx = self.find_or_add_type(inline.clone());
            return Ok((type_idx, inline));
        };
        let declared = self
            .types
            .get(type_idx as usize)
            .cloned()
            .ok_or_else(|| WatError::new(format!("unknown type: {type_idx}"), span))?;
        let has_inline = !inline.parameters.is_empty() || !inline.return_types.is_empty();
        if has_inline && inline != declared {
            return Err(WatError::new("inline function type does not match type use", span));
        }
        Ok((type_idx, declared))
    }

    /// Block types: nothing, a single `(result t)`, or a full type use.
    fn block_type(&mut self, items: &[SExpr], pos: &mut usize, span: Span) -> Result<BlockType, WatError> {
        if items.get(*pos).is_some_and(|item| item.is_list_headed_by("type")) {
            let (type_idx, _) = self.type_use(items, pos, None, span)?;
            return Ok(BlockType::FuncType(type_idx));
        }
        let signature = parse_signature(items, pos, None)?;
        Ok(match (signature.parameters.as_slice(), signature.return_types.as_slice()) {
            ([], []) => BlockType::Empty,
            ([], [result]) => BlockType::Value(*result),
            _ => BlockType::FuncType(self.find_or_add_type(signature)),
        })
    }

    /// Inline `(export "name")` abbreviations.
    fn inline_exports(&self, items: &[SExpr], pos: &mut usize) -> Result<Vec<String>, WatError> {
        let mut names = Vec::new();
        while let Some(export) = items
            .get(*pos)
            .filter(|item| item.is_list_headed_by("export"))
            .and_then(SExpr::as_list)
        {
            names.push(parse_name(export.items.get(1), export.span)?);
            expect_end_of(export.items, 2)?;
            *pos += 1;
        }
        Ok(names)
    }

    fn push_exports(&mut self, names: Vec<String>, index: ExportIndex) {
        self.exports
            .extend(names.into_iter().map(|name| Export { name, index }));
    }

    /// The import descriptor of `desc`, read from `pos` onward. `desc` is
    /// either the descriptor of an `(import ..)` field or a definition
    /// carrying an inline `(import ..)`.
    fn import_kind(&mut self, desc: SExprList<'_>, mut pos: usize) -> Result<ExternalKind, WatError> {
        let kind = match desc.head_keyword() {
            Some("func") => ExternalKind::Function(self.type_use(desc.items, &mut pos, None, desc.span)?.0),
            Some("table") => ExternalKind::Table(parse_table_type(desc.items, &mut pos, desc.span)?),
            Some("memory") => ExternalKind::Memory(MemoryType {
                limits: parse_limits(desc.items, &mut pos, desc.span)?,
            }),
            Some("global") => {
                let global_type = parse_global_type(desc.items.get(pos), desc.span)?;
                pos += 1;
                ExternalKind::Global(global_type)
            }
            Some(other) => return Err(WatError::new(format!("unknown import kind: {other}"), desc.span)),
            None => return Err(WatError::new("expected import kind", desc.span)),
        };
        expect_end_of(desc.items, pos)?;
        Ok(kind)
    }

    /// Handles an inline `(import "m" "n")` on a definition, returning
    /// whether the definition was an import.
    fn inline_import(
        &mut self,
        list: SExprList<'_>,
        pos: usize,
        ns: Namespace,
        exports: Vec<String>,
        export_index: fn(u32) -> ExportIndex,
    ) -> Result<bool, WatError> {
        let Some(import) = list
            .items
            .get(pos)
            .filter(|item| item.is_list_headed_by("import"))
            .and_then(SExpr::as_list)
        else {
            return Ok(false);
        };
        let module = parse_name(import.items.get(1), import.span)?;
        let name = parse_name(import.items.get(2), import.span)?;
        expect_end_of(import.items, 3)?;
        let external_kind = self.import_kind(list, pos + 1)?;
        let idx = self.imported(ns);
        self.imports.push(Import {
            module,
            name,
            external_kind,
        });
        self.push_exports(exports, export_index(idx));
        Ok(true)
    }

    // (import "m" "n" (func|table|memory|global $id? ..))
    fn translate_import(&mut self, list: SExprList<'_>) -> Result<(), WatError> {
        let module = parse_name(list.items.get(1), list.span)?;
        let name = parse_name(list.items.get(2), list.span)?;
        let desc = list
            .items
            .get(3)
            .and_then(SExpr::as_list)
            .ok_or_else(|| WatError::new("expected import descriptor", list.span))?;
        expect_end_of(list.items, 4)?;

        let mut pos = 1;
        take_id(desc.items, &mut pos);
        let external_kind = self.import_kind(desc, pos)?;
        self.imports.push(Import {
            module,
            name,
            external_kind,
        });
        Ok(())
    }

    // (func $id? (export "n")* (import "m" "n")? typeuse (local ..)* instr*)
    fn translate_func(&mut self, list: SExprList<'_>) -> Result<(), WatError> {
        let items = list.items;
        let mut pos = 1;
        take_id(items, &mut pos);
        let exports = self.inline_exports(items, &mut pos)?;
        if self.inline_import(list, pos, Namespace::Func, exports.clone(), ExportIndex::Function)? {
            return Ok(());
        }
        let func_idx = self.imported(Namespace::Func) + self.functions.len() as u32;

        let mut locals = HashMap::new();
        let (type_idx, func_type) = self.type_use(items, &mut pos, Some(&mut locals), list.span)?;
        self.locals = locals;
        self.labels.clear();

        let mut next_local = func_type.parameters.len() as u32;
        let mut runs = Vec::new();
        while let Some(local) = items
            .get(pos)
            .filter(|item| item.is_list_headed_by("local"))
            .and_then(SExpr::as_list)
        {
            self.declare_locals(local, &mut next_local, &mut runs)?;
            pos += 1;
        }
        let body = self.body(items, &mut pos)?;

        self.functions.push(type_idx);
        self.code.push(FunctionBody {
            locals: Locals::new(runs),
            body,
        });
        self.push_exports(exports, ExportIndex::Function(func_idx));
        Ok(())
    }

    /// `(local $id t)` or `(local t*)`; each list becomes its own runs of
    /// equal consecutive types.
    fn declare_locals(
        &mut self,
        list: SExprList<'_>,
        next_local: &mut u32,
        runs: &mut Vec<(u32, ValueType)>,
    ) -> Result<(), WatError> {
        let mut pos = 1;
        if let Some(name) = take_id(list.items, &mut pos) {
            if self.locals.insert(name.to_string(), *next_local).is_some() {
                return Err(WatError::new(format!("duplicate local: ${name}"), list.span));
            }
            expect_end_of(list.items, pos + 1)?;
        }
        let mut list_runs: Vec<(u32, ValueType)> = Vec::new();
        for item in &list.items[pos..] {
            let value_type = parse_valtype(Some(item), list.span)?;
            match list_runs.last_mut() {
                Some((count, last)) if *last == value_type => *count += 1,
                _ => list_runs.push((1, value_type)),
            }
            *next_local += 1;
        }
        runs.extend(list_runs);
        Ok(())
    }

    // (table $id? (export "n")* (import "m" "n")? min max? reftype)
    // (table $id? (export "n")* reftype (elem funcidx*))
    fn translate_table(&mut self, list: SExprList<'_>) -> Result<(), WatError> {
        let items = list.items;
        let mut pos = 1;
        take_id(items, &mut pos);
        let exports = self.inline_exports(items, &mut pos)?;
        if self.inline_import(list, pos, Namespace::Table, exports.clone(), ExportIndex::Table)? {
            return Ok(());
        }
        let table_idx = self.imported(Namespace::Table) + self.tables.len() as u32;

        let inline_elem = items
            .get(pos + 1)
            .filter(|item| item.is_list_headed_by("elem"))
            .and_then(SExpr::as_list);
        match inline_elem {
            Some(elem) => {
                let ref_type = parse_ref_type(items.get(pos), list.span)?;
                let init = elem
                    .tail()
                    .iter()
                    .map(|item| self.index(Some(item), Namespace::Func, elem.span))
                    .collect::<Result<Vec<_>, _>>()?;
                let size = init.len() as u32;
                self.tables.push(TableType {
                    ref_type,
                    limits: Limits {
                        min: size,
                        max: Some(size),
                    },
                });
                self.elements.push(Element {
                    table_index: table_idx,
                    offset: vec![Instruction::I32Const { value: 0 }],
                    init,
                });
                pos += 2;
            }
            None => self.tables.push(parse_table_type(items, &mut pos, list.span)?),
        }
        expect_end_of(items, pos)?;
        self.push_exports(exports, ExportIndex::Table(table_idx));
        Ok(())
    }

    // (memory $id? (export "n")* (import "m" "n")? min max?)
    // (memory $id? (export "n")* (data "bytes"*))
    fn translate_memory(&mut self, list: SExprList<'_>) -> Result<(), WatError> {
        let items = list.items;
        let mut pos = 1;
        take_id(items, &mut pos);
        let exports = self.inline_exports(items, &mut pos)?;
        if self.inline_import(list, pos, Namespace::Memory, exports.clone(), ExportIndex::Memory)? {
            return Ok(());
        }
        let memory_idx = self.imported(Namespace::Memory) + self.memories.len() as u32;

        let inline_data = items
            .get(pos)
            .filter(|item| item.is_list_headed_by("data"))
            .and_then(SExpr::as_list);
        match inline_data {
            Some(data) => {
                let init = parse_strings(data.tail())?;
                let pages = init.len().div_ceil(PAGE_SIZE) as u32;
                self.memories.push(MemoryType {
                    limits: Limits {
                        min: pages,
                        max: Some(pages),
                    },
                });
                self.data.push(Data {
                    memory_index: memory_idx,
                    offset: vec![Instruction::I32Const { value: 0 }],
                    init,
                });
                pos += 1;
            }
            None => self.memories.push(MemoryType {
                limits: parse_limits(items, &mut pos, list.span)?,
            }),
        }
        expect_end_of(items, pos)?;
        self.push_exports(exports, ExportIndex::Memory(memory_idx));
        Ok(())
    }

    // (global $id? (export "n")* (import "m" "n")? globaltype instr*)
    fn translate_global(&mut self, list: SExprList<'_>) -> Result<(), WatError> {
        let items = list.items;
        let mut pos = 1;
        take_id(items, &mut pos);
        let exports = self.inline_exports(items, &mut pos)?;
        if self.inline_import(list, pos, Namespace::Global, exports.clone(), ExportIndex::Global)? {
            return Ok(());
        }
        let global_idx = self.imported(Namespace::Global) + self.globals.len() as u32;

        let global_type = parse_global_type(items.get(pos), list.span)?;
        pos += 1;
        self.labels.clear();
        let init = self.body(items, &mut pos)?;
        self.globals.push(Global { global_type, init });
        self.push_exports(exports, ExportIndex::Global(global_idx));
        Ok(())
    }

    // (export "name" (func|table|memory|global idx))
    fn translate_export(&mut self, list: SExprList<'_>) -> Result<(), WatError> {
        let name = parse_name(list.items.get(1), list.span)?;
        let desc = list
            .items
            .get(2)
            .and_then(SExpr::as_list)
            .ok_or_else(|| WatError::new("expected export descriptor", list.span))?;
        expect_end_of(list.items, 3)?;
        expect_end_of(desc.items, 2)?;

        let ns = desc
            .head_keyword()
            .and_then(Namespace::from_keyword)
            .ok_or_else(|| WatError::new("unknown export kind", desc.span))?;
        let idx = self.index(desc.items.get(1), ns, desc.span)?;
        let index = match ns {
            Namespace::Func => ExportIndex::Function(idx),
            Namespace::Table => ExportIndex::Table(idx),
            Namespace::Memory => ExportIndex::Memory(idx),
            _ => ExportIndex::Global(idx),
        };
        self.exports.push(Export { name, index });
        Ok(())
    }

    fn translate_start(&mut self, list: SExprList<'_>) -> Result<(), WatError> {
        if self.start.is_some() {
            return Err(WatError::new("multiple start sections", list.span));
        }
        self.start = Some(self.index(list.items.get(1), Namespace::Func, list.span)?);
        expect_end_of(list.items, 2)
    }

    /// `tableidx?` or `(table idx)` ahead of a segment's offset.
    fn segment_target(&self, items: &[SExpr], pos: &mut usize, ns: Namespace, span: Span) -> Result<u32, WatError> {
        let Some(item) = items.get(*pos) else {
            return Ok(0);
        };
        let keyword = match ns {
            Namespace::Table => "table",
            _ => "memory",
        };
        if is_index(item) {
            *pos += 1;
            return self.index(Some(item), ns, span);
        }
        match item.as_list() {
            Some(list) if list.head_keyword() == Some(keyword) => {
                *pos += 1;
                expect_end_of(list.items, 2)?;
                self.index(list.items.get(1), ns, list.span)
            }
            _ => Ok(0),
        }
    }

    /// `(offset instr*)` or a single folded instruction.
    fn offset_expr(&mut self, item: Option<&SExpr>, span: Span) -> Result<Vec<Instruction>, WatError> {
        let list = item
            .and_then(SExpr::as_list)
            .ok_or_else(|| WatError::new("expected offset expression", span))?;
        self.labels.clear();
        if list.head_keyword() == Some("offset") {
            return self.body(list.items, &mut 1);
        }
        let mut out = Vec::new();
        self.folded(list, &mut out)?;
        Ok(out)
    }

    // (elem tableidx? (offset ..) func? funcidx*)
    fn translate_elem(&mut self, list: SExprList<'_>) -> Result<(), WatError> {
        let items = list.items;
        let mut pos = 1;
        let table_index = self.segment_target(items, &mut pos, Namespace::Table, list.span)?;
        let offset = self.offset_expr(items.get(pos), list.span)?;
        pos += 1;
        if items.get(pos).and_then(SExpr::as_keyword) == Some("func") {
            pos += 1;
        }
        let init = items[pos..]
            .iter()
            .map(|item| self.index(Some(item), Namespace::Func, list.span))
            .collect::<Result<Vec<_>, _>>()?;
        self.elements.push(Element {
            table_index,
            offset,
            init,
        });
        Ok(())
    }

    // (data memidx? (offset ..) "bytes"*)
    fn translate_data(&mut self, list: SExprList<'_>) -> Result<(), WatError> {
        let items = list.items;
        let mut pos = 1;
        let memory_index = self.segment_target(items, &mut pos, Namespace::Memory, list.span)?;
        let offset = self.offset_expr(items.get(pos), list.span)?;
        let init = parse_strings(&items[pos + 1..])?;
        self.data.push(Data {
            memory_index,
            offset,
            init,
        });
        Ok(())
    }

    /// Instructions from `items[*pos..]` up to the end of the slice or an
    /// `end`/`else` keyword, which is left for the caller.
    fn instructions(&mut self, items: &[SExpr], pos: &mut usize) -> Result<Vec<Instruction>, WatError> {
        let mut out = Vec::new();
        while let Some(item) = items.get(*pos) {
            match item {
                SExpr::List { span, items: inner } => {
                    *pos += 1;
                    self.folded(SExprList { span: *span, items: inner }, &mut out)?;
                }
                SExpr::Atom(Token {
                    kind: TokenKind::Keyword(keyword),
                    span,
                }) => {
                    if keyword == "end" || keyword == "else" {
                        break;
                    }
                    *pos += 1;
                    self.plain(keyword, *span, items, pos, &mut out)?;
                }
                other => return Err(WatError::expected("instruction", other.describe(), other.span())),
            }
        }
        Ok(out)
    }

    /// A complete sequence running to the end of `items`.
    fn body(&mut self, items: &[SExpr], pos: &mut usize) -> Result<Vec<Instruction>, WatError> {
        let out = self.instructions(items, pos)?;
        expect_end_of(items, *pos)?;
        Ok(out)
    }

    /// Plain syntax; structured instructions run to their `end`.
    fn plain(
        &mut self,
        keyword: &str,
        span: Span,
        items: &[SExpr],
        pos: &mut usize,
        out: &mut Vec<Instruction>,
    ) -> Result<(), WatError> {
        match keyword {
            "block" | "loop" => {
                let label = take_id(items, pos).map(str::to_string);
                let block_type = self.block_type(items, pos, span)?;
                self.labels.push(label.clone());
                let body = self.instructions(items, pos)?;
                self.labels.pop();
                expect_end_keyword(items, pos, &label, span)?;
                out.push(if keyword == "block" {
                    Instruction::Block { block_type, body }
                } else {
                    Instruction::Loop { block_type, body }
                });
            }
            "if" => {
                let label = take_id(items, pos).map(str::to_string);
                let block_type = self.block_type(items, pos, span)?;
                self.labels.push(label.clone());
                let then_branch = self.instructions(items, pos)?;
                let else_branch = if items.get(*pos).and_then(SExpr::as_keyword) == Some("else") {
                    *pos += 1;
                    check_label(items, pos, &label)?;
                    Some(self.instructions(items, pos)?)
                } else {
                    None
                };
                self.labels.pop();
                expect_end_keyword(items, pos, &label, span)?;
                out.push(Instruction::If {
                    block_type,
                    then_branch,
                    else_branch,
                });
            }
            _ => out.push(self.operator(keyword, span, items, pos)?),
        }
        Ok(())
    }

    /// Folded syntax: operands are emitted before the operator.
    fn folded(&mut self, list: SExprList<'_>, out: &mut Vec<Instruction>) -> Result<(), WatError> {
        let (keyword, span) = match list.items.first() {
            Some(SExpr::Atom(Token {
                kind: TokenKind::Keyword(keyword),
                span,
            })) => (keyword.as_str(), *span),
            _ => return Err(WatError::new("expected instruction", list.span)),
        };
        let items = list.items;
        let mut pos = 1;
        match keyword {
            "block" | "loop" => {
                let label = take_id(items, &mut pos).map(str::to_string);
                let block_type = self.block_type(items, &mut pos, span)?;
                self.labels.push(label);
                let body = self.body(items, &mut pos)?;
                self.labels.pop();
                out.push(if keyword == "block" {
                    Instruction::Block { block_type, body }
                } else {
                    Instruction::Loop { block_type, body }
                });
            }
            "if" => {
                let label = take_id(items, &mut pos).map(str::to_string);
                let block_type = self.block_type(items, &mut pos, span)?;
                while let Some(condition) = items.get(pos).filter(|item| !item.is_list_headed_by("then")) {
                    self.folded(condition.expect_list()?, out)?;
                    pos += 1;
                }
                let then = items
                    .get(pos)
                    .and_then(SExpr::as_list)
                    .ok_or_else(|| WatError::new("expected '(then ...)'", list.span))?;
                pos += 1;

                self.labels.push(label);
                let then_branch = self.body(then.items, &mut 1)?;
                let else_branch = match items
                    .get(pos)
                    .filter(|item| item.is_list_headed_by("else"))
                    .and_then(SExpr::as_list)
                {
                    Some(otherwise) => {
                        pos += 1;
                        Some(self.body(otherwise.items, &mut 1)?)
                    }
                    None => None,
                };
                self.labels.pop();
                expect_end_of(items, pos)?;
                out.push(Instruction::If {
                    block_type,
                    then_branch,
                    else_branch,
                });
            }
            _ => {
                let instruction = self.operator(keyword, span, items, &mut pos)?;
                for operand in &items[pos..] {
                    self.folded(operand.expect_list()?, out)?;
                }
                out.push(instruction);
            }
        }
        Ok(())
    }

    /// A non-structured instruction and its immediates.
    fn operator(&mut self, keyword: &str, span: Span, items: &[SExpr], pos: &mut usize) -> Result<Instruction, WatError> {
        if let Some(instruction) = Instruction::plain_from_mnemonic(keyword) {
            return Ok(instruction);
        }
        if let Some((make, natural_align)) = Instruction::memory_from_mnemonic(keyword) {
            return Ok(make(parse_memarg(items, pos, natural_align)?));
        }

        let instruction = match keyword {
            "br" => Instruction::Br {
                label_idx: self.label(next_item(items, pos), span)?,
            },
            "br_if" => Instruction::BrIf {
                label_idx: self.label(next_item(items, pos), span)?,
            },
            "br_table" => {
                let mut labels = Vec::new();
                while items.get(*pos).is_some_and(is_index) {
                    labels.push(self.label(next_item(items, pos), span)?);
                }
                let default = labels
                    .pop()
                    .ok_or_else(|| WatError::new("br_table requires at least one label", span))?;
                Instruction::BrTable { labels, default }
            }
            "call" => Instruction::Call {
                func_idx: self.index(next_item(items, pos), Namespace::Func, span)?,
            },
            "call_indirect" => {
                let table_idx = match items.get(*pos).filter(|item| is_index(item)) {
                    Some(_) => self.index(next_item(items, pos), Namespace::Table, span)?,
                    None => 0,
                };
                let (type_idx, _) = self.type_use(items, pos, None, span)?;
                Instruction::CallIndirect { type_idx, table_idx }
            }
            "local.get" => Instruction::LocalGet {
                local_idx: self.local(next_item(items, pos), span)?,
            },
            "local.set" => Instruction::LocalSet {
                local_idx: self.local(next_item(items, pos), span)?,
            },
            "local.tee" => Instruction::LocalTee {
                local_idx: self.local(next_item(items, pos), span)?,
            },
            "global.get" => Instruction::GlobalGet {
                global_idx: self.index(next_item(items, pos), Namespace::Global, span)?,
            },
            "global.set" => Instruction::GlobalSet {
                global_idx: self.index(next_item(items, pos), Namespace::Global, span)?,
            },
            "memory.size" | "memory.grow" => {
                if items.get(*pos).is_some_and(is_index) {
                    let memory_idx = self.index(next_item(items, pos), Namespace::Memory, span)?;
                    if memory_idx != 0 {
                        return Err(WatError::new("only memory 0 is addressable", span));
                    }
                }
                if keyword == "memory.size" {
                    Instruction::MemorySize
                } else {
                    Instruction::MemoryGrow
                }
            }
            "i32.const" => Instruction::I32Const {
                value: int_literal(next_item(items, pos), 32, span)? as u32 as i32,
            },
            "i64.const" => Instruction::I64Const {
                value: int_literal(next_item(items, pos), 64, span)? as i64,
            },
            "f32.const" => Instruction::F32Const {
                value: float_literal(next_item(items, pos), span)?.to_f32(),
            },
            "f64.const" => Instruction::F64Const {
                value: float_literal(next_item(items, pos), span)?.to_f64(),
            },
            _ => return Err(WatError::new(format!("unknown operator: {keyword}"), span)),
        };
        Ok(instruction)
    }

    fn into_module(self) -> Module {
        let mut module = Module::new();
        if !self.types.is_empty() {
            module.push_section(Section::Type(self.types));
        }
        if !self.imports.is_empty() {
            module.push_section(Section::Import(self.imports));
        }
        if !self.functions.is_empty() {
            module.push_section(Section::Function(self.functions));
        }
        if !self.tables.is_empty() {
            module.push_section(Section::Table(self.tables));
        }
        if !self.memories.is_empty() {
            module.push_section(Section::Memory(self.memories));
        }
        if !self.globals.is_empty() {
            module.push_section(Section::Global(self.globals));
        }
        if !self.exports.is_empty() {
            module.push_section(Section::Export(self.exports));
        }
        if let Some(start) = self.start {
            module.push_section(Section::Start(start));
        }
        if !self.elements.is_empty() {
            module.push_section(Section::Element(self.elements));
        }
        if !self.code.is_empty() {
            module.push_section(Section::Code(self.code));
        }
        if !self.data.is_empty() {
            module.push_section(Section::Data(self.data));
        }
        module
    }
}

fn next_item<'a>(items: &'a [SExpr], pos: &mut usize) -> Option<&'a SExpr> {
    let item = items.get(*pos);
    if item.is_some() {
        *pos += 1;
    }
    item
}

fn take_id<'a>(items: &'a [SExpr], pos: &mut usize) -> Option<&'a str> {
    let name = items.get(*pos).and_then(SExpr::as_id);
    if name.is_some() {
        *pos += 1;
    }
    name
}

fn is_index(item: &SExpr) -> bool {
    matches!(
        item,
        SExpr::Atom(Token {
            kind: TokenKind::Integer(_) | TokenKind::Id(_),
            ..
        })
    )
}

fn expect_end_of(items: &[SExpr], pos: usize) -> Result<(), WatError> {
    match items.get(pos) {
        Some(item) => Err(WatError::new(format!("unexpected {}", item.describe()), item.span())),
        None => Ok(()),
    }
}

/// An optional `$label` after `else` or `end` must repeat the block's label.
fn check_label(items: &[SExpr], pos: &mut usize, label: &Option<String>) -> Result<(), WatError> {
    if let Some(item) = items.get(*pos) {
        if let Some(name) = item.as_id() {
            if label.as_deref() != Some(name) {
                return Err(WatError::new(format!("mismatching label: ${name}"), item.span()));
            }
            *pos += 1;
        }
    }
    Ok(())
}

fn expect_end_keyword(items: &[SExpr], pos: &mut usize, label: &Option<String>, span: Span) -> Result<(), WatError> {
    if items.get(*pos).and_then(SExpr::as_keyword) != Some("end") {
        return Err(WatError::new("expected 'end'", span));
    }
    *pos += 1;
    check_label(items, pos, label)
}

/// `(param ..)* (result ..)*`; a named parameter declares exactly one type.
fn parse_signature(
    items: &[SExpr],
    pos: &mut usize,
    mut names: Option<&mut HashMap<String, u32>>,
) -> Result<FunctionType, WatError> {
    let mut func_type = FunctionType::default();
    while let Some(list) = items.get(*pos).and_then(SExpr::as_list) {
        match list.head_keyword() {
            Some("param") => {
                if !func_type.return_types.is_empty() {
                    return Err(WatError::new("parameter after result", list.span));
                }
                let mut inner = 1;
                match take_id(list.items, &mut inner) {
                    Some(name) => {
                        expect_end_of(list.items, inner + 1)?;
                        let idx = func_type.parameters.len() as u32;
                        if let Some(names) = names.as_deref_mut() {
                            if names.insert(name.to_string(), idx).is_some() {
                                return Err(WatError::new(format!("duplicate local: ${name}"), list.span));
                            }
                        }
                        func_type
                            .parameters
                            .push(parse_valtype(list.items.get(inner), list.span)?);
                    }
                    None => {
                        for item in list.tail() {
                            func_type.parameters.push(parse_valtype(Some(item), list.span)?);
                        }
                    }
                }
            }
            Some("result") => {
                for item in list.tail() {
                    func_type.return_types.push(parse_valtype(Some(item), list.span)?);
                }
            }
            _ => break,
        }
        *pos += 1;
    }
    Ok(func_type)
}

fn parse_valtype(item: Option<&SExpr>, span: Span) -> Result<ValueType, WatError> {
    match item {
        Some(item) => item
            .as_keyword()
            .and_then(ValueType::from_name)
            .ok_or_else(|| WatError::expected("value type", item.describe(), item.span())),
        None => Err(WatError::new("expected value type", span)),
    }
}

/// `t` or `(mut t)`
fn parse_global_type(item: Option<&SExpr>, span: Span) -> Result<GlobalType, WatError> {
    match item.and_then(SExpr::as_list) {
        Some(list) if list.head_keyword() == Some("mut") => {
            expect_end_of(list.items, 2)?;
            Ok(GlobalType {
                value_type: parse_valtype(list.items.get(1), list.span)?,
                mutable: true,
            })
        }
        _ => Ok(GlobalType {
            value_type: parse_valtype(item, span)?,
            mutable: false,
        }),
    }
}

fn parse_u32(item: Option<&SExpr>, span: Span) -> Result<u32, WatError> {
    match item {
        Some(SExpr::Atom(Token {
            kind: TokenKind::Integer(int),
            span,
        })) => int.to_u32().ok_or_else(|| WatError::new("constant out of range", *span)),
        Some(other) => Err(WatError::expected("integer", other.describe(), other.span())),
        None => Err(WatError::new("expected integer", span)),
    }
}

fn parse_limits(items: &[SExpr], pos: &mut usize, span: Span) -> Result<Limits, WatError> {
    let min = parse_u32(next_item(items, pos), span)?;
    let max = match items.get(*pos) {
        Some(SExpr::Atom(Token {
            kind: TokenKind::Integer(_),
            ..
        })) => Some(parse_u32(next_item(items, pos), span)?),
        _ => None,
    };
    if let Some(max) = max {
        if min > max {
            return Err(WatError::new(
                "size minimum must not be greater than maximum",
                span,
            ));
        }
    }
    Ok(Limits { min, max })
}

fn parse_ref_type(item: Option<&SExpr>, span: Span) -> Result<RefType, WatError> {
    match item.and_then(SExpr::as_keyword) {
        Some("funcref") | Some("anyfunc") => Ok(RefType::FuncRef),
        Some("externref") => Ok(RefType::ExternRef),
        _ => Err(WatError::new("expected reference type", item.map_or(span, SExpr::span))),
    }
}

fn parse_table_type(items: &[SExpr], pos: &mut usize, span: Span) -> Result<TableType, WatError> {
    let limits = parse_limits(items, pos, span)?;
    let ref_type = parse_ref_type(next_item(items, pos), span)?;
    Ok(TableType { ref_type, limits })
}

fn parse_name(item: Option<&SExpr>, span: Span) -> Result<String, WatError> {
    let item = item.ok_or_else(|| WatError::new("expected name string", span))?;
    let bytes = item
        .as_string()
        .ok_or_else(|| WatError::expected("name string", item.describe(), item.span()))?;
    String::from_utf8(bytes.to_vec()).map_err(|_| WatError::new("malformed UTF-8 encoding", item.span()))
}

fn parse_strings(items: &[SExpr]) -> Result<Vec<u8>, WatError> {
    let mut bytes = Vec::new();
    for item in items {
        let string = item
            .as_string()
            .ok_or_else(|| WatError::expected("string", item.describe(), item.span()))?;
        bytes.extend_from_slice(string);
    }
    Ok(bytes)
}

/// `offset=N` and `align=N` in that order, both optional. Alignment is
/// written in bytes and stored as its log2.
fn parse_memarg(items: &[SExpr], pos: &mut usize, natural_align: u32) -> Result<MemArg, WatError> {
    let mut memarg = MemArg {
        align: natural_align,
        offset: 0,
    };
    if let Some((value, span)) = keyword_value(items.get(*pos), "offset=") {
        memarg.offset = parse_u32_text(value).ok_or_else(|| WatError::new("malformed offset", span))?;
        *pos += 1;
    }
    if let Some((value, span)) = keyword_value(items.get(*pos), "align=") {
        let bytes = parse_u32_text(value).ok_or_else(|| WatError::new("malformed alignment", span))?;
        if !bytes.is_power_of_two() {
            return Err(WatError::new("alignment must be a power of two", span));
        }
        memarg.align = bytes.trailing_zeros();
        *pos += 1;
    }
    Ok(memarg)
}

fn keyword_value<'a>(item: Option<&'a SExpr>, prefix: &str) -> Option<(&'a str, Span)> {
    let item = item?;
    item.as_keyword()?
        .strip_prefix(prefix)
        .map(|value| (value, item.span()))
}

fn parse_u32_text(text: &str) -> Option<u32> {
    let (digits, radix) = match text.strip_prefix("0x") {
        Some(hex) => (hex, 16),
        None => (text, 10),
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') {
        return None;
    }
    u32::from_str_radix(&digits.replace('_', ""), radix).ok()
}

/// Integer literal as a `bits`-wide pattern.
fn int_literal(item: Option<&SExpr>, bits: u32, span: Span) -> Result<u64, WatError> {
    match item {
        Some(SExpr::Atom(Token {
            kind: TokenKind::Integer(int),
            span,
        })) => int
            .to_bits(bits)
            .ok_or_else(|| WatError::new("constant out of range", *span)),
        Some(other) => Err(WatError::expected("integer", other.describe(), other.span())),
        None => Err(WatError::new("expected integer", span)),
    }
}

/// Float literal; integers are accepted and read as decimal floats.
fn float_literal(item: Option<&SExpr>, span: Span) -> Result<FloatLit, WatError> {
    match item {
        Some(SExpr::Atom(Token {
            kind: TokenKind::Float(float),
            ..
        })) => Ok(float.clone()),
        Some(SExpr::Atom(Token {
            kind: TokenKind::Integer(int),
            ..
        })) => Ok(FloatLit::Decimal {
            negative: int.negative,
            text: int.magnitude.to_string(),
        }),
        Some(other) => Err(WatError::expected("float", other.describe(), other.span())),
        None => Err(WatError::new("expected float", span)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn body(source: &str) -> Vec<Instruction> {
        let module = parse(source).expect("module should translate");
        module.code_bodies()[0].body.clone()
    }

    #[test]
    fn test_add_function() {
        let module = parse(
            r#"(module
                (func (export "add") (param i32 i32) (result i32)
                    local.get 0
                    local.get 1
                    i32.add))"#,
        )
        .unwrap();
        assert_eq!(
            module.types(),
            &[FunctionType {
                parameters: vec![ValueType::I32, ValueType::I32],
                return_types: vec![ValueType::I32],
            }]
        );
        assert_eq!(module.functions(), &[0]);
        assert_eq!(
            module.exports(),
            &[Export {
                name: "add".to_string(),
                index: ExportIndex::Function(0),
            }]
        );
        assert_eq!(
            module.code_bodies()[0].body,
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::LocalGet { local_idx: 1 },
                Instruction::I32Add,
            ]
        );
    }

    #[test]
    fn test_folded_matches_plain() {
        let folded = body("(func (param i32) (result i32) (i32.add (local.get 0) (i32.const 1)))");
        let plain = body("(func (param i32) (result i32) local.get 0 i32.const 1 i32.add)");
        assert_eq!(folded, plain);
    }

    #[test]
    fn test_names_resolve() {
        let module = parse(
            r#"(module
                (global $counter (mut i32) (i32.const 0))
                (func $main (param $x i32) (result i32) (local $y i32)
                    (local.set $y (call $helper (local.get $x)))
                    (global.set $counter (local.get $y))
                    local.get $y)
                (func $helper (param i32) (result i32) local.get 0))"#,
        )
        .unwrap();
        assert_eq!(module.types().len(), 1);
        assert_eq!(module.functions(), &[0, 0]);
        assert_eq!(
            module.code_bodies()[0].body,
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::Call { func_idx: 1 },
                Instruction::LocalSet { local_idx: 1 },
                Instruction::LocalGet { local_idx: 1 },
                Instruction::GlobalSet { global_idx: 0 },
                Instruction::LocalGet { local_idx: 1 },
            ]
        );
        assert_eq!(module.code_bodies()[0].locals.entries(), &[(1, ValueType::I32)]);
    }

    #[test]
    fn test_fact() {
        let instructions = body(
            "(func (param i64) (result i64)
                local.get 0
                i64.eqz
                if (result i64)
                    i64.const 1
                else
                    local.get 0
                    local.get 0
                    i64.const 1
                    i64.sub
                    call 0
                    i64.mul
                end)",
        );
        assert_eq!(instructions.len(), 3);
        match &instructions[2] {
            Instruction::If {
                block_type,
                then_branch,
                else_branch,
            } => {
                assert_eq!(*block_type, BlockType::Value(ValueType::I64));
                assert_eq!(then_branch, &vec![Instruction::I64Const { value: 1 }]);
                assert_eq!(else_branch.as_ref().map(Vec::len), Some(6));
            }
            other => panic!("expected if, got {other}"),
        }
    }

    #[test]
    fn test_folded_if() {
        let instructions = body(
            "(func (param i32) (result i32)
                (if (result i32) (local.get 0)
                    (then (i32.const 1))
                    (else (i32.const 2))))",
        );
        assert_eq!(
            instructions,
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::If {
                    block_type: BlockType::Value(ValueType::I32),
                    then_branch: vec![Instruction::I32Const { value: 1 }],
                    else_branch: Some(vec![Instruction::I32Const { value: 2 }]),
                },
            ]
        );
    }

    #[test]
    fn test_labels() {
        let instructions = body(
            "(func
                block $outer
                    loop $inner
                        br $inner
                        br $outer
                        br_table $inner $outer 1
                    end $inner
                end)",
        );
        let Instruction::Block { body: outer, .. } = &instructions[0] else {
            panic!("expected block");
        };
        let Instruction::Loop { body: inner, .. } = &outer[0] else {
            panic!("expected loop");
        };
        assert_eq!(
            inner,
            &vec![
                Instruction::Br { label_idx: 0 },
                Instruction::Br { label_idx: 1 },
                Instruction::BrTable {
                    labels: vec![0, 1],
                    default: 1,
                },
            ]
        );
    }

    #[test]
    fn test_memory_and_data() {
        let module = parse(
            r#"(module
                (memory $mem (export "mem") 1 2)
                (data (i32.const 8) "hi" "\00")
                (func (param i32) (result i32)
                    (i32.load8_u offset=4 (local.get 0))
                    (i32.store align=2 (i32.const 0) (i32.const 1))
                    ))"#,
        )
        .unwrap();
        assert_eq!(
            module.memories(),
            &[MemoryType {
                limits: Limits { min: 1, max: Some(2) }
            }]
        );
        assert_eq!(module.exports()[0].index, ExportIndex::Memory(0));
        assert_eq!(
            module.data(),
            &[Data {
                memory_index: 0,
                offset: vec![Instruction::I32Const { value: 8 }],
                init: b"hi\0".to_vec(),
            }]
        );
        let code = &module.code_bodies()[0].body;
        assert_eq!(
            code[1],
            Instruction::I32Load8U {
                memarg: MemArg { align: 0, offset: 4 }
            }
        );
        assert_eq!(
            code[4],
            Instruction::I32Store {
                memarg: MemArg { align: 1, offset: 0 }
            }
        );
    }

    #[test]
    fn test_table_and_elem() {
        let module = parse(
            r#"(module
                (type $v (func))
                (table 2 funcref)
                (elem (i32.const 0) $a $b)
                (func $a)
                (func $b)
                (func (call_indirect (type $v) (i32.const 1))))"#,
        )
        .unwrap();
        assert_eq!(
            module.tables(),
            &[TableType {
                ref_type: RefType::FuncRef,
                limits: Limits { min: 2, max: None },
            }]
        );
        assert_eq!(module.elements()[0].init, vec![0, 1]);
        assert_eq!(
            module.code_bodies()[2].body,
            vec![
                Instruction::I32Const { value: 1 },
                Instruction::CallIndirect {
                    type_idx: 0,
                    table_idx: 0,
                },
            ]
        );
    }

    #[test]
    fn test_inline_table_elem() {
        let module = parse("(module (table funcref (elem $f $f)) (func $f))").unwrap();
        assert_eq!(module.tables()[0].limits, Limits { min: 2, max: Some(2) });
        assert_eq!(module.elements()[0].init, vec![0, 0]);
    }

    #[test]
    fn test_imports_come_first() {
        let module = parse(
            r#"(module
                (import "env" "log" (func $log (param i32)))
                (import "env" "base" (global $base i32))
                (global $g i32 (global.get $base))
                (func (export "run") (call $log (global.get $g))))"#,
        )
        .unwrap();
        assert_eq!(module.import_function_count(), 1);
        assert_eq!(module.import_global_count(), 1);
        assert_eq!(module.globals()[0].init, vec![Instruction::GlobalGet { global_idx: 0 }]);
        assert_eq!(module.exports()[0].index, ExportIndex::Function(1));
        assert_eq!(
            module.code_bodies()[0].body,
            vec![Instruction::GlobalGet { global_idx: 1 }, Instruction::Call { func_idx: 0 }]
        );
    }

    #[test]
    fn test_start_and_bare_fields() {
        let module = parse("(func $init) (start $init)").unwrap();
        assert_eq!(module.start(), Some(0));
    }

    #[test]
    fn test_constants() {
        let instructions = body(
            "(func i32.const 0xffffffff i64.const -9223372036854775808 f32.const 1.5 f64.const -2 f64.const 0x1p-1)",
        );
        assert_eq!(
            instructions,
            vec![
                Instruction::I32Const { value: -1 },
                Instruction::I64Const { value: i64::MIN },
                Instruction::F32Const { value: 1.5 },
                Instruction::F64Const { value: -2.0 },
                Instruction::F64Const { value: 0.5 },
            ]
        );
    }

    #[rstest]
    #[case("(func call $missing)", "undefined function: $missing")]
    #[case("(func i32.bogus)", "unknown operator: i32.bogus")]
    #[case("(func $f) (func $f)", "duplicate function: $f")]
    #[case("(func block $a end $b)", "mismatching label: $b")]
    #[case("(func block nop)", "expected 'end'")]
    #[case("(func i32.const 4294967296)", "constant out of range")]
    #[case("(func) (import \"m\" \"f\" (func))", "import after function definition")]
    #[case("(memory 2 1)", "size minimum must not be greater than maximum")]
    #[case("(func i32.load align=3)", "alignment must be a power of two")]
    #[case("(func br $nowhere)", "undefined label: $nowhere")]
    #[case("(bogus)", "unknown field: bogus")]
    fn test_errors(#[case] source: &str, #[case] message: &str) {
        let err = parse(source).unwrap_err();
        assert!(err.message.contains(message), "{source} gave {err}");
    }
}
