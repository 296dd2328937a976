//! WebAssembly instruction executor
//!
//! Function bodies are evaluated recursively over the nested instruction
//! tree. Every call gets its own operand stack, frame and label stack; the
//! store is shared by the whole call chain of one invocation.
//!
//! Structured control flow is reported upwards as a [`BlockEnd`]: a branch
//! returns `Branch(n)` out of `n` enclosing sequences, each of which consumes
//! one level as it leaves its label.
//!
//! Every nested sequence, whether a call or a block, costs host stack, so
//! invocations run on a dedicated thread sized for [`MAX_NESTING`] levels and
//! deeper programs trap with [`RuntimeError::CallStackExhausted`].

use super::{
    control::{BlockEnd, Label, LabelStack, LabelType},
    frame::Frame,
    ops,
    stack::Stack,
    store::{GlobalInstance, Store},
    RuntimeError, Value,
};
use crate::parser::instruction::{BlockType, Instruction};
use crate::parser::module::{ExportIndex, Module};
use log::{debug, trace};
use std::thread;

/// Nested calls beyond this depth trap instead of exhausting the host stack.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Nested instruction sequences (function bodies and blocks) per invocation.
pub const MAX_NESTING: usize = 4 * MAX_CALL_DEPTH;

/// Upper bound of host stack used by one nesting level in unoptimised builds.
const STACK_PER_LEVEL: usize = 64 * 1024;

const EXECUTION_STACK_SIZE: usize = MAX_NESTING * STACK_PER_LEVEL + (1 << 20);

/// State of a single function activation.
struct Activation<'m> {
    stack: Stack,
    frame: Frame<'m>,
    labels: LabelStack,
}

/// Executes functions of one module against its store
pub struct Executor<'a> {
    module: &'a Module,
    store: &'a mut Store,
    depth: usize,
    nesting: usize,
}

impl<'a> Executor<'a> {
    pub fn new(module: &'a Module, store: &'a mut Store) -> Self {
        Executor {
            module,
            store,
            depth: 0,
            nesting: 0,
        }
    }

    /// Call function `func_idx` with `args` already matching its parameter
    /// types, returning its results in declaration order.
    ///
    /// Imported functions dispatch to the host closure bound at
    /// instantiation.
    pub fn call_function(&mut self, func_idx: u32, args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
        let module = self.module;
        let func_type = module
            .function_type(func_idx)
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(func_idx))?;
        trace!("call func[{func_idx}] {func_type} with {} args, depth {}", args.len(), self.depth);

        if func_idx < module.import_function_count() {
            let host = self
                .store
                .host_functions
                .get(func_idx as usize)
                .ok_or(RuntimeError::FunctionIndexOutOfBounds(func_idx))?;
            return host.call(&args);
        }

        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::CallStackExhausted);
        }
        let code = module
            .code(func_idx)
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(func_idx))?;

        let mut locals = args;
        locals.extend(code.locals.expand().map(Value::default_for));
        let mut activation = Activation {
            stack: Stack::new(),
            frame: Frame::new(locals, module),
            labels: LabelStack::new(),
        };
        activation.labels.push(Label {
            label_type: LabelType::Function,
            arity: func_type.return_types.len(),
            stack_height: 0,
        });

        self.depth += 1;
        let end = self.execute_sequence(&mut activation, &code.body);
        self.depth -= 1;

        // Falling off the end, `return` and a branch to the function label
        // all leave the results on top of the stack.
        end?;
        activation.stack.pop_values(&func_type.return_types)
    }

    fn execute_sequence(
        &mut self,
        activation: &mut Activation<'_>,
        instructions: &[Instruction],
    ) -> Result<BlockEnd, RuntimeError> {
        if self.nesting >= MAX_NESTING {
            return Err(RuntimeError::CallStackExhausted);
        }
        self.nesting += 1;
        let end = self.run_sequence(activation, instructions);
        self.nesting -= 1;
        end
    }

    fn run_sequence(
        &mut self,
        activation: &mut Activation<'_>,
        instructions: &[Instruction],
    ) -> Result<BlockEnd, RuntimeError> {
        for instruction in instructions {
            match self.execute_instruction(activation, instruction)? {
                BlockEnd::Normal => continue,
                other => return Ok(other),
            }
        }
        Ok(BlockEnd::Normal)
    }

    fn execute_instruction(
        &mut self,
        activation: &mut Activation<'_>,
        instruction: &Instruction,
    ) -> Result<BlockEnd, RuntimeError> {
        use Instruction::*;

        let stack = &mut activation.stack;
        match instruction {
            Unreachable => ops::control::unreachable(),
            Nop => Ok(BlockEnd::Normal),

            Block { block_type, body } => {
                let arity = self.block_arity(*block_type)?;
                self.enter_block(activation, LabelType::Block, arity, body)
            }

            Loop { body, .. } => {
                // A branch to a loop carries no values and restarts the body.
                activation.labels.push(Label {
                    label_type: LabelType::Loop,
                    arity: 0,
                    stack_height: activation.stack.len(),
                });
                loop {
                    match self.execute_sequence(activation, body) {
                        Ok(BlockEnd::Branch(0)) => continue,
                        result => {
                            activation.labels.pop();
                            return Ok(result?.exit_label());
                        }
                    }
                }
            }

            If {
                block_type,
                then_branch,
                else_branch,
            } => {
                let condition = stack.pop_i32()?;
                let arity = self.block_arity(*block_type)?;
                let body = if condition != 0 {
                    then_branch.as_slice()
                } else {
                    else_branch.as_deref().unwrap_or(&[])
                };
                self.enter_block(activation, LabelType::If, arity, body)
            }

            Br { label_idx } => ops::control::br(stack, &activation.labels, *label_idx),
            BrIf { label_idx } => ops::control::br_if(stack, &activation.labels, *label_idx),
            BrTable { labels, default } => ops::control::br_table(stack, &activation.labels, labels, *default),
            Return => ops::control::return_op(),

            Call { func_idx } => self.call(activation, *func_idx),
            CallIndirect { type_idx, table_idx } => self.call_indirect(activation, *type_idx, *table_idx),

            LocalGet { local_idx } => {
                ops::variable::local_get(stack, &activation.frame, *local_idx)?;
                Ok(BlockEnd::Normal)
            }
            LocalSet { local_idx } => {
                ops::variable::local_set(stack, &mut activation.frame, *local_idx)?;
                Ok(BlockEnd::Normal)
            }
            LocalTee { local_idx } => {
                ops::variable::local_tee(stack, &mut activation.frame, *local_idx)?;
                Ok(BlockEnd::Normal)
            }
            GlobalGet { global_idx } => {
                ops::variable::global_get(stack, &self.store.globals, *global_idx)?;
                Ok(BlockEnd::Normal)
            }
            GlobalSet { global_idx } => {
                ops::variable::global_set(stack, &mut self.store.globals, *global_idx)?;
                Ok(BlockEnd::Normal)
            }

            MemorySize => {
                let memory = self.store.memories.first().ok_or(RuntimeError::NoMemory)?;
                ops::memory::memory_size(stack, memory)?;
                Ok(BlockEnd::Normal)
            }
            MemoryGrow => {
                let memory = self.store.memories.first_mut().ok_or(RuntimeError::NoMemory)?;
                ops::memory::memory_grow(stack, memory)?;
                Ok(BlockEnd::Normal)
            }

            I32Const { value } => {
                ops::numeric::i32_const(stack, *value)?;
                Ok(BlockEnd::Normal)
            }
            I64Const { value } => {
                ops::numeric::i64_const(stack, *value)?;
                Ok(BlockEnd::Normal)
            }
            F32Const { value } => {
                ops::numeric::f32_const(stack, *value)?;
                Ok(BlockEnd::Normal)
            }
            F64Const { value } => {
                ops::numeric::f64_const(stack, *value)?;
                Ok(BlockEnd::Normal)
            }

            other => {
                if let Some(op) = ops::stack_op(other) {
                    op(stack)?;
                } else if let Some((op, memarg)) = ops::memory::memory_op(other) {
                    let memory = self.store.memories.first_mut().ok_or(RuntimeError::NoMemory)?;
                    op(stack, memory, memarg)?;
                } else {
                    return Err(RuntimeError::UnsupportedInstruction(other.to_string()));
                }
                Ok(BlockEnd::Normal)
            }
        }
    }

    /// Run `body` under a fresh block or if label.
    fn enter_block(
        &mut self,
        activation: &mut Activation<'_>,
        label_type: LabelType,
        arity: usize,
        body: &[Instruction],
    ) -> Result<BlockEnd, RuntimeError> {
        activation.labels.push(Label {
            label_type,
            arity,
            stack_height: activation.stack.len(),
        });
        let end = self.execute_sequence(activation, body);
        activation.labels.pop();
        Ok(end?.exit_label())
    }

    /// Number of values a block leaves behind.
    fn block_arity(&self, block_type: BlockType) -> Result<usize, RuntimeError> {
        match block_type {
            BlockType::Empty => Ok(0),
            BlockType::Value(_) => Ok(1),
            BlockType::FuncType(type_idx) => self
                .module
                .types()
                .get(type_idx as usize)
                .map(|func_type| func_type.return_types.len())
                .ok_or(RuntimeError::TypeIndexOutOfBounds(type_idx)),
        }
    }

    fn call(&mut self, activation: &mut Activation<'_>, func_idx: u32) -> Result<BlockEnd, RuntimeError> {
        let func_type = self
            .module
            .function_type(func_idx)
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(func_idx))?;
        let args = activation.stack.pop_values(&func_type.parameters)?;
        let results = self.call_function(func_idx, args)?;
        activation.stack.push_all(results);
        Ok(BlockEnd::Normal)
    }

    /// call_indirect
    /// 1. Pop the i32 table index i and look up table[i].
    /// 2. The element's function type must equal `types[type_idx]`.
    /// 3. Continue as `call`.
    fn call_indirect(
        &mut self,
        activation: &mut Activation<'_>,
        type_idx: u32,
        table_idx: u32,
    ) -> Result<BlockEnd, RuntimeError> {
        let table = self.store.tables.get(table_idx as usize).ok_or(RuntimeError::NoTable)?;
        let i = activation.stack.pop_i32()? as u32;
        let func_idx = table.get(i)?;

        let expected = self
            .module
            .types()
            .get(type_idx as usize)
            .ok_or(RuntimeError::TypeIndexOutOfBounds(type_idx))?;
        let actual = self
            .module
            .function_type(func_idx)
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(func_idx))?;
        if expected != actual {
            return Err(RuntimeError::IndirectCallTypeMismatch);
        }
        self.call(activation, func_idx)
    }
}

/// Invoke the function exported as `name`.
///
/// # Errors
/// Invocation errors when the export is missing, is not a function, or the
/// arguments do not match its parameters; any trap raised while running.
pub fn invoke(module: &Module, store: &mut Store, name: &str, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
    let export = module
        .export_by_name(name)
        .ok_or_else(|| RuntimeError::UnknownExport(name.to_string()))?;
    let func_idx = match export.index {
        ExportIndex::Function(idx) => idx,
        _ => return Err(RuntimeError::NotAFunction(name.to_string())),
    };
    let func_type = module
        .function_type(func_idx)
        .ok_or(RuntimeError::FunctionIndexOutOfBounds(func_idx))?;

    if args.len() != func_type.parameters.len() {
        return Err(RuntimeError::ArgumentCount {
            expected: func_type.parameters.len(),
            actual: args.len(),
        });
    }
    for (index, (arg, expected)) in args.iter().zip(&func_type.parameters).enumerate() {
        if arg.typ() != *expected {
            return Err(RuntimeError::ArgumentType {
                index,
                expected: *expected,
                actual: arg.typ(),
            });
        }
    }

    debug!("invoke {name} (func[{func_idx}])");
    let args = args.to_vec();
    on_execution_stack(move || Executor::new(module, store).call_function(func_idx, args))
}

/// Run `f` on a scoped thread whose stack holds [`MAX_NESTING`] levels.
///
/// Panics inside `f` are resumed on the calling thread.
pub(crate) fn on_execution_stack<T, F>(f: F) -> Result<T, RuntimeError>
where
    F: FnOnce() -> Result<T, RuntimeError> + Send,
    T: Send,
{
    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name("wasm-exec".to_string())
            .stack_size(EXECUTION_STACK_SIZE)
            .spawn_scoped(scope, f)
            .map_err(|e| RuntimeError::ExecutionThread(e.to_string()))?;
        handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })
}

/// Evaluate a constant expression.
///
/// Only `*.const` and `global.get` of an immutable entry in `globals` (the
/// imported globals, during instantiation) are allowed, and the expression
/// must leave exactly one value.
pub fn evaluate_const(expr: &[Instruction], globals: &[GlobalInstance]) -> Result<Value, RuntimeError> {
    let mut stack = Stack::new();
    for instruction in expr {
        match instruction {
            Instruction::I32Const { value } => stack.push(Value::I32(*value)),
            Instruction::I64Const { value } => stack.push(Value::I64(*value)),
            Instruction::F32Const { value } => stack.push(Value::F32(*value)),
            Instruction::F64Const { value } => stack.push(Value::F64(*value)),
            Instruction::GlobalGet { global_idx } => {
                let global = globals
                    .get(*global_idx as usize)
                    .filter(|global| !global.mutable)
                    .ok_or_else(|| RuntimeError::InvalidConstExpr(instruction.to_string()))?;
                stack.push(global.value);
            }
            other => return Err(RuntimeError::InvalidConstExpr(other.to_string())),
        }
    }
    if stack.len() != 1 {
        return Err(RuntimeError::InvalidConstExpr(format!(
            "expected a single value, found {}",
            stack.len()
        )));
    }
    stack.pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::module::{
        Element, Export, FunctionBody, FunctionType, Limits, Locals, RefType, Section, TableType, ValueType,
    };
    use crate::runtime::{instantiate, Imports};

    fn func_type(params: Vec<ValueType>, results: Vec<ValueType>) -> FunctionType {
        FunctionType {
            parameters: params,
            return_types: results,
        }
    }

    fn body(instructions: Vec<Instruction>) -> FunctionBody {
        FunctionBody {
            locals: Locals::empty(),
            body: instructions,
        }
    }

    fn export(name: &str, func_idx: u32) -> Export {
        Export {
            name: name.to_string(),
            index: ExportIndex::Function(func_idx),
        }
    }

    /// fact(n: i64) -> i64, recursive
    fn fact_module() -> Module {
        Module::with_sections(vec![
            Section::Type(vec![func_type(vec![ValueType::I64], vec![ValueType::I64])]),
            Section::Function(vec![0]),
            Section::Export(vec![export("fact", 0)]),
            Section::Code(vec![body(vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::I64Eqz,
                Instruction::If {
                    block_type: BlockType::Value(ValueType::I64),
                    then_branch: vec![Instruction::I64Const { value: 1 }],
                    else_branch: Some(vec![
                        Instruction::LocalGet { local_idx: 0 },
                        Instruction::LocalGet { local_idx: 0 },
                        Instruction::I64Const { value: 1 },
                        Instruction::I64Sub,
                        Instruction::Call { func_idx: 0 },
                        Instruction::I64Mul,
                    ]),
                }])]),
        ])
    }

    #[test]
    fn test_recursive_call() {
        let module = fact_module();
        let mut store = instantiate(&module).unwrap();
        let results = invoke(&module, &mut store, "fact", &[Value::I64(5)]).unwrap();
        assert_eq!(results, vec![Value::I64(120)]);
        let results = invoke(&module, &mut store, "fact", &[Value::I64(20)]).unwrap();
        assert_eq!(results, vec![Value::I64(2432902008176640000)]);
    }

    #[test]
    fn test_invoke_checks() {
        let module = fact_module();
        let mut store = instantiate(&module).unwrap();
        assert!(matches!(
            invoke(&module, &mut store, "nope", &[]),
            Err(RuntimeError::UnknownExport(_))
        ));
        assert!(matches!(
            invoke(&module, &mut store, "fact", &[]),
            Err(RuntimeError::ArgumentCount { expected: 1, actual: 0 })
        ));
        assert!(matches!(
            invoke(&module, &mut store, "fact", &[Value::I32(5)]),
            Err(RuntimeError::ArgumentType {
                index: 0,
                expected: ValueType::I64,
                actual: ValueType::I32
            })
        ));
    }

    #[test]
    fn test_not_a_function() {
        let module = Module::with_sections(vec![
            Section::Memory(vec![crate::parser::module::MemoryType {
                limits: Limits { min: 0, max: None },
            }]),
            Section::Export(vec![Export {
                name: "mem".to_string(),
                index: ExportIndex::Memory(0),
            }]),
        ]);
        let mut store = instantiate(&module).unwrap();
        assert!(matches!(
            invoke(&module, &mut store, "mem", &[]),
            Err(RuntimeError::NotAFunction(_))
        ));
    }

    #[test]
    fn test_unbounded_recursion_traps() {
        let module = Module::with_sections(vec![
            Section::Type(vec![func_type(vec![], vec![])]),
            Section::Function(vec![0]),
            Section::Export(vec![export("forever", 0)]),
            Section::Code(vec![body(vec![Instruction::Call { func_idx: 0 }])]),
        ]);
        let mut store = instantiate(&module).unwrap();
        let err = invoke(&module, &mut store, "forever", &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::CallStackExhausted));
        assert!(err.is_trap());
    }

    /// `depth` nested `block (result i32)` around `i32.const 7`.
    fn nested_blocks(depth: usize) -> Vec<Instruction> {
        let mut body = vec![Instruction::I32Const { value: 7 }];
        for _ in 0..depth {
            body = vec![Instruction::Block {
                block_type: BlockType::Value(ValueType::I32),
                body,
            }];
        }
        body
    }

    #[test]
    fn test_deepest_decodable_nesting_runs() {
        let module = Module::with_sections(vec![
            Section::Type(vec![func_type(vec![], vec![ValueType::I32])]),
            Section::Function(vec![0]),
            Section::Export(vec![export("deep", 0)]),
            Section::Code(vec![body(nested_blocks(crate::parser::limits::MAX_BLOCK_DEPTH))]),
        ]);
        let mut store = instantiate(&module).unwrap();
        assert_eq!(invoke(&module, &mut store, "deep", &[]).unwrap(), vec![Value::I32(7)]);
    }

    #[test]
    fn test_recursion_through_blocks_traps() {
        // every call adds eight block levels, so nesting runs out before calls do
        let mut recurse = vec![Instruction::Call { func_idx: 0 }];
        for _ in 0..8 {
            recurse = vec![Instruction::Block {
                block_type: BlockType::Empty,
                body: recurse,
            }];
        }
        let module = Module::with_sections(vec![
            Section::Type(vec![func_type(vec![], vec![])]),
            Section::Function(vec![0]),
            Section::Export(vec![export("forever", 0)]),
            Section::Code(vec![body(recurse)]),
        ]);
        let mut store = instantiate(&module).unwrap();
        let err = invoke(&module, &mut store, "forever", &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::CallStackExhausted));
    }

    #[test]
    fn test_host_panic_reaches_caller() {
        use crate::parser::module::{ExternalKind, Import};
        use crate::runtime::instantiate_with_imports;

        let module = Module::with_sections(vec![
            Section::Type(vec![func_type(vec![], vec![])]),
            Section::Import(vec![Import {
                module: "env".to_string(),
                name: "boom".to_string(),
                external_kind: ExternalKind::Function(0),
            }]),
            Section::Export(vec![export("boom", 0)]),
        ]);
        let mut imports = Imports::new();
        imports.add_function("env", "boom", func_type(vec![], vec![]), |_| panic!("host failure"));
        let mut store = instantiate_with_imports(&module, &imports).unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            invoke(&module, &mut store, "boom", &[])
        }));
        assert!(result.is_err());
    }

    /// Table of [add, sub, <null>] dispatched by index.
    fn dispatch_module() -> Module {
        let binary = func_type(vec![ValueType::I32, ValueType::I32], vec![ValueType::I32]);
        Module::with_sections(vec![
            Section::Type(vec![binary, func_type(vec![ValueType::I32], vec![ValueType::I32])]),
            Section::Function(vec![0, 0, 1, 1]),
            Section::Table(vec![TableType {
                ref_type: RefType::FuncRef,
                limits: Limits { min: 4, max: None },
            }]),
            Section::Export(vec![export("dispatch", 2), export("wrong", 3)]),
            Section::Element(vec![Element {
                table_index: 0,
                offset: vec![Instruction::I32Const { value: 0 }],
                init: vec![0, 1],
            }]),
            Section::Code(vec![
                body(vec![
                    Instruction::LocalGet { local_idx: 0 },
                    Instruction::LocalGet { local_idx: 1 },
                    Instruction::I32Add,
                ]),
                body(vec![
                    Instruction::LocalGet { local_idx: 0 },
                    Instruction::LocalGet { local_idx: 1 },
                    Instruction::I32Sub,
                ]),
                body(vec![
                    Instruction::I32Const { value: 10 },
                    Instruction::I32Const { value: 3 },
                    Instruction::LocalGet { local_idx: 0 },
                    Instruction::CallIndirect {
                        type_idx: 0,
                        table_idx: 0,
                    },
                ]),
                body(vec![
                    Instruction::I32Const { value: 10 },
                    Instruction::LocalGet { local_idx: 0 },
                    Instruction::CallIndirect {
                        type_idx: 1,
                        table_idx: 0,
                    },
                ]),
            ]),
        ])
    }

    #[test]
    fn test_call_indirect() {
        let module = dispatch_module();
        let mut store = instantiate(&module).unwrap();
        assert_eq!(
            invoke(&module, &mut store, "dispatch", &[Value::I32(0)]).unwrap(),
            vec![Value::I32(13)]
        );
        assert_eq!(
            invoke(&module, &mut store, "dispatch", &[Value::I32(1)]).unwrap(),
            vec![Value::I32(7)]
        );
    }

    #[test]
    fn test_call_indirect_traps() {
        let module = dispatch_module();
        let mut store = instantiate(&module).unwrap();
        assert!(matches!(
            invoke(&module, &mut store, "dispatch", &[Value::I32(2)]),
            Err(RuntimeError::UninitializedElement(2))
        ));
        assert!(matches!(
            invoke(&module, &mut store, "dispatch", &[Value::I32(4)]),
            Err(RuntimeError::TableOutOfBounds(4))
        ));
        assert!(matches!(
            invoke(&module, &mut store, "wrong", &[Value::I32(0)]),
            Err(RuntimeError::IndirectCallTypeMismatch)
        ));
    }

    #[test]
    fn test_host_function_call() {
        use crate::parser::module::{ExternalKind, Import};
        use crate::runtime::instantiate_with_imports;

        let unary = func_type(vec![ValueType::I32], vec![ValueType::I32]);
        let module = Module::with_sections(vec![
            Section::Type(vec![unary.clone()]),
            Section::Import(vec![Import {
                module: "env".to_string(),
                name: "square".to_string(),
                external_kind: ExternalKind::Function(0),
            }]),
            Section::Function(vec![0]),
            Section::Export(vec![export("plus_square", 1)]),
            Section::Code(vec![body(vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::LocalGet { local_idx: 0 },
                Instruction::Call { func_idx: 0 },
                Instruction::I32Add,
            ])]),
        ]);

        let mut imports = Imports::new();
        imports.add_function("env", "square", unary, |args| {
            let x = args[0].as_i32().unwrap_or_default();
            Ok(vec![Value::I32(x * x)])
        });
        let mut store = instantiate_with_imports(&module, &imports).unwrap();
        assert_eq!(
            invoke(&module, &mut store, "plus_square", &[Value::I32(3)]).unwrap(),
            vec![Value::I32(12)]
        );
    }

    #[test]
    fn test_block_type_index_arity() {
        let module = Module::with_sections(vec![
            Section::Type(vec![
                func_type(vec![], vec![ValueType::I32]),
                func_type(vec![], vec![ValueType::I32, ValueType::I64]),
            ]),
            Section::Function(vec![0]),
            Section::Export(vec![export("pair", 0)]),
            Section::Code(vec![body(vec![
                Instruction::Block {
                    block_type: BlockType::FuncType(1),
                    body: vec![
                        Instruction::I32Const { value: 99 },
                        Instruction::I32Const { value: 4 },
                        Instruction::I64Const { value: 5 },
                        Instruction::Br { label_idx: 0 },
                    ],
                },
                Instruction::Drop,
            ])]),
        ]);
        let mut store = instantiate(&module).unwrap();
        assert_eq!(
            invoke(&module, &mut store, "pair", &[]).unwrap(),
            vec![Value::I32(4)]
        );
    }

    #[test]
    fn test_loop_counts_down() {
        let module = Module::with_sections(vec![
            Section::Type(vec![func_type(vec![ValueType::I32], vec![ValueType::I32])]),
            Section::Function(vec![0]),
            Section::Export(vec![export("sum", 0)]),
            Section::Code(vec![FunctionBody {
                locals: Locals::new(vec![(1, ValueType::I32)]),
                body: vec![
                    Instruction::Block {
                        block_type: BlockType::Empty,
                        body: vec![Instruction::Loop {
                            block_type: BlockType::Empty,
                            body: vec![
                                Instruction::LocalGet { local_idx: 0 },
                                Instruction::I32Eqz,
                                Instruction::BrIf { label_idx: 1 },
                                Instruction::LocalGet { local_idx: 1 },
                                Instruction::LocalGet { local_idx: 0 },
                                Instruction::I32Add,
                                Instruction::LocalSet { local_idx: 1 },
                                Instruction::LocalGet { local_idx: 0 },
                                Instruction::I32Const { value: 1 },
                                Instruction::I32Sub,
                                Instruction::LocalSet { local_idx: 0 },
                                Instruction::Br { label_idx: 0 },
                            ],
                        }],
                    },
                    Instruction::LocalGet { local_idx: 1 },
                ],
            }]),
        ]);
        let mut store = instantiate(&module).unwrap();
        assert_eq!(
            invoke(&module, &mut store, "sum", &[Value::I32(100)]).unwrap(),
            vec![Value::I32(5050)]
        );
    }

    #[test]
    fn test_evaluate_const() {
        assert_eq!(
            evaluate_const(&[Instruction::I64Const { value: -3 }], &[]).unwrap(),
            Value::I64(-3)
        );
        let globals = [GlobalInstance {
            value: Value::F32(1.5),
            mutable: false,
        }];
        assert_eq!(
            evaluate_const(&[Instruction::GlobalGet { global_idx: 0 }], &globals).unwrap(),
            Value::F32(1.5)
        );
        assert!(matches!(
            evaluate_const(&[Instruction::GlobalGet { global_idx: 1 }], &globals),
            Err(RuntimeError::InvalidConstExpr(_))
        ));
        let mutable = [GlobalInstance {
            value: Value::I32(4),
            mutable: true,
        }];
        assert!(matches!(
            evaluate_const(&[Instruction::GlobalGet { global_idx: 0 }], &mutable),
            Err(RuntimeError::InvalidConstExpr(msg)) if msg == "global.get 0"
        ));
        assert!(matches!(
            evaluate_const(
                &[
                    Instruction::I32Const { value: 1 },
                    Instruction::I32Const { value: 2 },
                    Instruction::I32Add
                ],
                &[]
            ),
            Err(RuntimeError::InvalidConstExpr(msg)) if msg == "i32.add"
        ));
        assert!(evaluate_const(&[], &[]).is_err());
        assert!(evaluate_const(
            &[Instruction::I32Const { value: 1 }, Instruction::I32Const { value: 2 }],
            &[]
        )
        .is_err());
    }
}
