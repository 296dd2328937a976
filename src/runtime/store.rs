//! Store and instantiation
//!
//! The store holds the runtime state of one instantiated module: its linear
//! memories, function tables, global values and the host functions bound to
//! its imports. Function code stays in the [`Module`]; tables and calls refer
//! to functions by index.
//!
//! Instantiation proceeds in order:
//! 1. resolve imports against an [`Imports`] registry,
//! 2. allocate tables and memories at their minimum sizes,
//! 3. evaluate global initializers,
//! 4. copy element segments into tables,
//! 5. copy data segments into memory,
//! 6. run the start function, if any.
//!
//! Segments are applied one at a time, so a segment that does not fit fails
//! instantiation after earlier segments have been written.

use super::executor::{evaluate_const, on_execution_stack, Executor};
use super::imports::{HostFunction, Imports};
use super::{Memory, RuntimeError, Table, Value};
use crate::parser::instruction::Instruction;
use crate::parser::module::{ExternalKind, Module};
use log::debug;

/// A global variable and whether `global.set` may change it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalInstance {
    pub value: Value,
    pub mutable: bool,
}

#[derive(Debug, Default)]
pub struct Store {
    pub memories: Vec<Memory>,
    pub tables: Vec<Table>,
    /// Imported globals first, then the module's own
    pub globals: Vec<GlobalInstance>,
    /// One entry per imported function, in import order
    pub host_functions: Vec<HostFunction>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn memory(&self, idx: u32) -> Option<&Memory> {
        self.memories.get(idx as usize)
    }

    pub fn global(&self, idx: u32) -> Option<Value> {
        self.globals.get(idx as usize).map(|global| global.value)
    }
}

/// Instantiate a module that imports nothing.
///
/// # Errors
/// `MissingImport` for any import; otherwise as [`instantiate_with_imports`].
pub fn instantiate(module: &Module) -> Result<Store, RuntimeError> {
    instantiate_with_imports(module, &Imports::new())
}

/// Instantiate a module, binding its imports from `imports`.
///
/// # Errors
/// - `MissingImport` / `ImportTypeMismatch` when an import cannot be bound
/// - `InvalidConstExpr` for a malformed or mistyped initializer
/// - `ElementOutOfBounds` / `DataOutOfBounds` for a segment that does not fit
/// - any trap raised by the start function
pub fn instantiate_with_imports(module: &Module, imports: &Imports) -> Result<Store, RuntimeError> {
    let mut store = Store::new();
    resolve_imports(module, imports, &mut store)?;

    for table_type in module.tables() {
        store.tables.push(Table::new(table_type.limits)?);
    }
    for memory_type in module.memories() {
        store
            .memories
            .push(Memory::new(memory_type.limits.min, memory_type.limits.max)?);
    }

    let imported_globals = store.globals.len();
    for global in module.globals() {
        let value = evaluate_const(&global.init, &store.globals[..imported_globals])?;
        if value.typ() != global.global_type.value_type {
            return Err(RuntimeError::InvalidConstExpr(format!(
                "global initializer produced {}, expected {}",
                value.typ(),
                global.global_type.value_type
            )));
        }
        store.globals.push(GlobalInstance {
            value,
            mutable: global.global_type.mutable,
        });
    }

    init_elements(module, &mut store, imported_globals)?;
    init_data(module, &mut store, imported_globals)?;

    if let Some(start) = module.start() {
        debug!("running start function {start}");
        let store = &mut store;
        on_execution_stack(move || Executor::new(module, store).call_function(start, Vec::new()))?;
    }
    Ok(store)
}

fn resolve_imports(module: &Module, imports: &Imports, store: &mut Store) -> Result<(), RuntimeError> {
    for import in module.imports() {
        let missing = || RuntimeError::MissingImport {
            module: import.module.clone(),
            name: import.name.clone(),
        };
        let mismatch = || RuntimeError::ImportTypeMismatch {
            module: import.module.clone(),
            name: import.name.clone(),
        };

        match &import.external_kind {
            ExternalKind::Function(type_idx) => {
                let expected = module
                    .types()
                    .get(*type_idx as usize)
                    .ok_or(RuntimeError::TypeIndexOutOfBounds(*type_idx))?;
                let host = imports.function(&import.module, &import.name).ok_or_else(missing)?;
                if host.func_type != *expected {
                    return Err(mismatch());
                }
                store.host_functions.push(host.clone());
            }
            ExternalKind::Global(global_type) => {
                let value = imports.global(&import.module, &import.name).ok_or_else(missing)?;
                if value.typ() != global_type.value_type {
                    return Err(mismatch());
                }
                store.globals.push(GlobalInstance {
                    value,
                    mutable: global_type.mutable,
                });
            }
            // no host-provided tables or memories
            ExternalKind::Table(_) | ExternalKind::Memory(_) => return Err(missing()),
        }
        debug!("bound import {}.{}", import.module, import.name);
    }
    Ok(())
}

/// Offset of a segment: its constant expression must produce an i32, read
/// unsigned.
fn segment_offset(expr: &[Instruction], store: &Store, imported_globals: usize) -> Result<u32, RuntimeError> {
    match evaluate_const(expr, &store.globals[..imported_globals])? {
        Value::I32(offset) => Ok(offset as u32),
        other => Err(RuntimeError::InvalidConstExpr(format!(
            "segment offset has type {}, expected i32",
            other.typ()
        ))),
    }
}

fn init_elements(module: &Module, store: &mut Store, imported_globals: usize) -> Result<(), RuntimeError> {
    for (idx, element) in module.elements().iter().enumerate() {
        let offset = segment_offset(&element.offset, store, imported_globals)?;
        let table = store
            .tables
            .get_mut(element.table_index as usize)
            .ok_or(RuntimeError::NoTable)?;
        if !table.fits(offset, element.init.len()) {
            return Err(RuntimeError::ElementOutOfBounds(idx));
        }
        for (i, func_idx) in element.init.iter().enumerate() {
            table.set(offset + i as u32, Some(*func_idx))?;
        }
        debug!("element segment {idx}: {} entries at {offset}", element.init.len());
    }
    Ok(())
}

fn init_data(module: &Module, store: &mut Store, imported_globals: usize) -> Result<(), RuntimeError> {
    for (idx, data) in module.data().iter().enumerate() {
        let offset = segment_offset(&data.offset, store, imported_globals)?;
        let memory = store
            .memories
            .get_mut(data.memory_index as usize)
            .ok_or(RuntimeError::NoMemory)?;
        memory
            .write_bytes(u64::from(offset), &data.init)
            .map_err(|_| RuntimeError::DataOutOfBounds(idx))?;
        debug!("data segment {idx}: {} bytes at {offset}", data.init.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::module::{
        Data, Element, Export, ExportIndex, FunctionBody, FunctionType, Global, GlobalType, Import, Limits,
        Locals, MemoryType, RefType, Section, TableType, ValueType,
    };
    use crate::runtime::{invoke, ErrorKind};

    fn memory(min: u32) -> Section {
        Section::Memory(vec![MemoryType {
            limits: Limits { min, max: None },
        }])
    }

    fn data(offset: i32, bytes: &[u8]) -> Data {
        Data {
            memory_index: 0,
            offset: vec![Instruction::I32Const { value: offset }],
            init: bytes.to_vec(),
        }
    }

    #[test]
    fn test_empty_module() {
        let store = instantiate(&Module::new()).unwrap();
        assert!(store.memories.is_empty());
        assert!(store.tables.is_empty());
        assert!(store.globals.is_empty());
    }

    #[test]
    fn test_data_segments() {
        let module = Module::with_sections(vec![
            memory(1),
            Section::Data(vec![data(0, b"hello"), data(65534, &[1, 2])]),
        ]);
        let store = instantiate(&module).unwrap();
        let memory = store.memory(0).unwrap();
        assert_eq!(memory.size(), 1);
        assert_eq!(memory.read_bytes(0, 5).unwrap(), b"hello");
        assert_eq!(memory.read_u16(65534).unwrap(), 0x0201);
    }

    #[test]
    fn test_data_out_of_bounds() {
        let module = Module::with_sections(vec![
            memory(1),
            Section::Data(vec![data(0, b"ok"), data(65535, &[1, 2])]),
        ]);
        assert!(matches!(instantiate(&module), Err(RuntimeError::DataOutOfBounds(1))));

        // negative offsets are large unsigned addresses
        let module = Module::with_sections(vec![memory(1), Section::Data(vec![data(-1, &[1])])]);
        assert!(matches!(instantiate(&module), Err(RuntimeError::DataOutOfBounds(0))));
    }

    #[test]
    fn test_element_segments() {
        let module = Module::with_sections(vec![
            Section::Table(vec![TableType {
                ref_type: RefType::FuncRef,
                limits: Limits { min: 3, max: None },
            }]),
            Section::Element(vec![Element {
                table_index: 0,
                offset: vec![Instruction::I32Const { value: 1 }],
                init: vec![7, 8],
            }]),
        ]);
        let store = instantiate(&module).unwrap();
        let table = &store.tables[0];
        assert!(table.get(0).is_err());
        assert_eq!(table.get(1).unwrap(), 7);
        assert_eq!(table.get(2).unwrap(), 8);
    }

    #[test]
    fn test_element_out_of_bounds() {
        let module = Module::with_sections(vec![
            Section::Table(vec![TableType {
                ref_type: RefType::FuncRef,
                limits: Limits { min: 2, max: None },
            }]),
            Section::Element(vec![Element {
                table_index: 0,
                offset: vec![Instruction::I32Const { value: 1 }],
                init: vec![0, 0],
            }]),
        ]);
        assert!(matches!(instantiate(&module), Err(RuntimeError::ElementOutOfBounds(0))));
    }

    #[test]
    fn test_globals() {
        let module = Module::with_sections(vec![Section::Global(vec![
            Global {
                global_type: GlobalType {
                    value_type: ValueType::F64,
                    mutable: false,
                },
                init: vec![Instruction::F64Const { value: 2.5 }],
            },
            Global {
                global_type: GlobalType {
                    value_type: ValueType::I32,
                    mutable: true,
                },
                init: vec![Instruction::I32Const { value: -4 }],
            },
        ])]);
        let store = instantiate(&module).unwrap();
        assert_eq!(store.global(0), Some(Value::F64(2.5)));
        assert_eq!(
            store.globals[1],
            GlobalInstance {
                value: Value::I32(-4),
                mutable: true
            }
        );
    }

    #[test]
    fn test_global_initializer_type_checked() {
        let module = Module::with_sections(vec![Section::Global(vec![Global {
            global_type: GlobalType {
                value_type: ValueType::I64,
                mutable: false,
            },
            init: vec![Instruction::I32Const { value: 1 }],
        }])]);
        assert!(matches!(instantiate(&module), Err(RuntimeError::InvalidConstExpr(_))));
    }

    fn global_import_module(mutable: bool) -> Module {
        Module::with_sections(vec![
            Section::Import(vec![Import {
                module: "env".to_string(),
                name: "base".to_string(),
                external_kind: ExternalKind::Global(GlobalType {
                    value_type: ValueType::I32,
                    mutable,
                }),
            }]),
            memory(1),
            Section::Global(vec![Global {
                global_type: GlobalType {
                    value_type: ValueType::I32,
                    mutable: false,
                },
                init: vec![Instruction::GlobalGet { global_idx: 0 }],
            }]),
            Section::Data(vec![Data {
                memory_index: 0,
                offset: vec![Instruction::GlobalGet { global_idx: 0 }],
                init: vec![0xaa],
            }]),
        ])
    }

    #[test]
    fn test_imported_global() {
        let module = global_import_module(false);
        assert!(matches!(
            instantiate(&module),
            Err(RuntimeError::MissingImport { module, name }) if module == "env" && name == "base"
        ));

        let mut imports = Imports::new();
        imports.add_global("env", "base", Value::I32(100));
        let store = instantiate_with_imports(&module, &imports).unwrap();
        assert_eq!(store.global(0), Some(Value::I32(100)));
        assert_eq!(store.global(1), Some(Value::I32(100)));
        assert_eq!(store.memory(0).unwrap().read_u8(100).unwrap(), 0xaa);

        let mut imports = Imports::new();
        imports.add_global("env", "base", Value::I64(100));
        assert!(matches!(
            instantiate_with_imports(&module, &imports),
            Err(RuntimeError::ImportTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_mutable_imported_global_is_not_constant() {
        let module = global_import_module(true);
        let mut imports = Imports::new();
        imports.add_global("env", "base", Value::I32(100));
        let err = instantiate_with_imports(&module, &imports).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConstExpr(_)));
        assert_eq!(err.kind(), ErrorKind::Link);
    }

    #[test]
    fn test_function_import_type_mismatch() {
        let module = Module::with_sections(vec![
            Section::Type(vec![FunctionType {
                parameters: vec![ValueType::I32],
                return_types: vec![],
            }]),
            Section::Import(vec![Import {
                module: "env".to_string(),
                name: "log".to_string(),
                external_kind: ExternalKind::Function(0),
            }]),
        ]);
        let mut imports = Imports::new();
        imports.add_function("env", "log", FunctionType::default(), |_| Ok(vec![]));
        assert!(matches!(
            instantiate_with_imports(&module, &imports),
            Err(RuntimeError::ImportTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_memory_import_unsupported() {
        let module = Module::with_sections(vec![Section::Import(vec![Import {
            module: "env".to_string(),
            name: "memory".to_string(),
            external_kind: ExternalKind::Memory(MemoryType {
                limits: Limits { min: 1, max: None },
            }),
        }])]);
        assert!(matches!(instantiate(&module), Err(RuntimeError::MissingImport { .. })));
    }

    #[test]
    fn test_start_function_runs() {
        let module = Module::with_sections(vec![
            Section::Type(vec![FunctionType::default(), FunctionType {
                parameters: vec![],
                return_types: vec![ValueType::I32],
            }]),
            Section::Function(vec![0, 1]),
            Section::Global(vec![Global {
                global_type: GlobalType {
                    value_type: ValueType::I32,
                    mutable: true,
                },
                init: vec![Instruction::I32Const { value: 0 }],
            }]),
            Section::Export(vec![Export {
                name: "get".to_string(),
                index: ExportIndex::Function(1),
            }]),
            Section::Start(0),
            Section::Code(vec![
                FunctionBody {
                    locals: Locals::empty(),
                    body: vec![
                        Instruction::I32Const { value: 42 },
                        Instruction::GlobalSet { global_idx: 0 },
                    ],
                },
                FunctionBody {
                    locals: Locals::empty(),
                    body: vec![Instruction::GlobalGet { global_idx: 0 }],
                },
            ]),
        ]);
        let mut store = instantiate(&module).unwrap();
        assert_eq!(invoke(&module, &mut store, "get", &[]).unwrap(), vec![Value::I32(42)]);
    }

    #[test]
    fn test_start_function_trap_fails_instantiation() {
        let module = Module::with_sections(vec![
            Section::Type(vec![FunctionType::default()]),
            Section::Function(vec![0]),
            Section::Start(0),
            Section::Code(vec![FunctionBody {
                locals: Locals::empty(),
                body: vec![Instruction::Unreachable],
            }]),
        ]);
        assert!(matches!(instantiate(&module), Err(RuntimeError::Unreachable)));
    }
}
