use std::cmp::Ordering;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use ilvm_bytecode::Instruction;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use crate::plugs::{self, PlugContext, PlugRegistry, SharedRegistry};
use crate::{
    EvalStack, InterpreterError, LocalBank, MethodSignature, MethodTarget, Program, StackFault,
    StringTable, Value,
};

/// Interpreter-wide knobs. Per-method limits come from the method body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpreterSettings {
    /// Fail with [`InterpreterError::InstructionLimitExceeded`] after this
    /// many instructions. `None` runs until `ret` or an error.
    pub max_instructions: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Nothing loaded.
    Empty,
    /// Loaded and ready to run.
    Ready,
    Running,
    /// Returned normally.
    Halted,
    /// Stopped on an error.
    Faulted,
}

pub struct Interpreter {
    settings: InterpreterSettings,
    registry: SharedRegistry,
    console: Box<dyn Write + Send>,
    strings: StringTable,
    program: Option<Program>,
    stack: EvalStack,
    locals: LocalBank,
    state: ExecutionState,
    executed: u64,
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .field("program", &self.program)
            .field("stack", &self.stack.as_slice())
            .field("locals", &self.locals.as_slice())
            .field("strings", &self.strings.len())
            .field("executed", &self.executed)
            .finish_non_exhaustive()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(InterpreterSettings::default())
    }
}

impl Interpreter {
    /// An interpreter using the process-wide plug registry and writing
    /// console output to stdout.
    pub fn new(settings: InterpreterSettings) -> Self {
        Self {
            settings,
            registry: plugs::global(),
            console: Box::new(io::stdout()),
            strings: StringTable::new(),
            program: None,
            stack: EvalStack::new(0),
            locals: LocalBank::new(0),
            state: ExecutionState::Empty,
            executed: 0,
        }
    }

    /// Use a private registry instead of the process-wide one.
    #[must_use]
    pub fn with_registry(self, registry: PlugRegistry) -> Self {
        self.with_shared_registry(Arc::new(RwLock::new(registry)))
    }

    #[must_use]
    pub fn with_shared_registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_console(mut self, console: Box<dyn Write + Send>) -> Self {
        self.console = console;
        self
    }

    /// Load a method, replacing whatever was loaded before.
    ///
    /// The stack and locals are sized from the method body. Interned strings
    /// are kept. The program counter is rewound, so a program taken back out
    /// of [`program`](Self::program) runs from its first instruction again.
    pub fn load(&mut self, mut program: Program) {
        program.reset();
        let body = program.body();
        log::debug!(
            "loading method: {} byte(s), max stack {}, {} local(s)",
            body.code.len(),
            body.max_stack,
            body.local_count
        );
        self.stack = EvalStack::new(usize::from(body.max_stack));
        self.locals = LocalBank::new(usize::from(body.local_count));
        self.program = Some(program);
        self.state = ExecutionState::Ready;
        self.executed = 0;
    }

    /// Run the loaded method to completion.
    ///
    /// Returns the top of the stack at `ret`, or `None` if it was empty.
    pub fn run(&mut self) -> Result<Option<Value>, InterpreterError> {
        if self.state != ExecutionState::Ready {
            return Err(InterpreterError::NoProgramLoaded);
        }
        let mut program = self
            .program
            .take()
            .ok_or(InterpreterError::NoProgramLoaded)?;
        self.seal_registry();

        self.state = ExecutionState::Running;
        let result = self.execute(&mut program);
        self.program = Some(program);

        match &result {
            Ok(value) => {
                self.state = ExecutionState::Halted;
                log::debug!(
                    "halted after {} instruction(s) with {value:?}",
                    self.executed
                );
            }
            Err(err) => {
                self.state = ExecutionState::Faulted;
                log::debug!("faulted after {} instruction(s): {err}", self.executed);
            }
        }
        result
    }

    fn seal_registry(&self) {
        let registry = self.registry.upgradable_read();
        if !registry.is_sealed() {
            RwLockUpgradableReadGuard::upgrade(registry).seal();
        }
    }

    fn execute(&mut self, program: &mut Program) -> Result<Option<Value>, InterpreterError> {
        loop {
            if let Some(limit) = self
                .settings
                .max_instructions
                .filter(|&limit| self.executed >= limit)
            {
                return Err(InterpreterError::InstructionLimitExceeded { limit });
            }

            let (offset, instruction) = program.fetch()?;
            self.executed += 1;
            if log::log_enabled!(log::Level::Trace) {
                log::trace!("{offset:04x}: {instruction} (depth {})", self.stack.depth());
            }

            match instruction {
                Instruction::Nop => {}
                Instruction::Ldloc { index } => {
                    let value = self.locals.get(usize::from(index))?;
                    self.stack.push(value)?;
                }
                Instruction::Stloc { index } => {
                    let value = self.stack.pop()?;
                    self.locals.set(usize::from(index), value)?;
                }
                Instruction::Ldloca { index } => {
                    let address = self.locals.address_of(usize::from(index))?;
                    self.stack.push(address)?;
                }
                Instruction::LdcI4 { value } => self.stack.push(Value::Int32(value))?,
                Instruction::LdcR8 { value } => self.stack.push(Value::Float(value))?,
                Instruction::Call { token } => self.call(program, token)?,
                Instruction::Ret => return Ok(self.stack.peek().ok()),
                Instruction::Br { offset: delta } => program.branch(offset, delta)?,
                Instruction::Brfalse { offset: delta } => {
                    if self.pop_condition("brfalse")? == 0 {
                        program.branch(offset, delta)?;
                    }
                }
                Instruction::Brtrue { offset: delta } => {
                    if self.pop_condition("brtrue")? == 1 {
                        program.branch(offset, delta)?;
                    }
                }
                Instruction::Add => self.binary(Value::add)?,
                Instruction::Div => self.binary(Value::div)?,
                Instruction::Rem => self.binary(Value::rem)?,
                Instruction::ConvR8 => {
                    let value = self.stack.pop()?;
                    self.stack.push(value.to_float())?;
                }
                Instruction::Ldstr { token } => {
                    let text = program.user_string(token)?;
                    let handle = self.strings.intern(&text);
                    self.stack.push(Value::String(handle))?;
                }
                Instruction::Ceq => self.compare("ceq", Ordering::Equal)?,
                Instruction::Cgt => self.compare("cgt", Ordering::Greater)?,
                Instruction::Clt => self.compare("clt", Ordering::Less)?,
            }
        }
    }

    #[inline]
    fn binary(
        &mut self,
        op: fn(Value, Value) -> Result<Value, InterpreterError>,
    ) -> Result<(), InterpreterError> {
        let (a, b) = self.stack.pop2()?;
        self.stack.push(op(a, b)?)
    }

    #[inline]
    fn compare(&mut self, op: &'static str, wanted: Ordering) -> Result<(), InterpreterError> {
        let (a, b) = self.stack.pop2()?;
        let ordering = a.compare(b, op)?;
        self.stack.push(Value::from(ordering == Some(wanted)))
    }

    fn pop_condition(&mut self, op: &'static str) -> Result<i64, InterpreterError> {
        let value = self.stack.pop()?;
        value.integer_payload().ok_or(InterpreterError::InvalidOperand {
            op,
            kind: value.kind(),
        })
    }

    fn call(&mut self, program: &Program, token: u32) -> Result<(), InterpreterError> {
        let signature = match program.resolve_method(token) {
            Some(MethodTarget::External(signature)) => signature,
            Some(MethodTarget::Body(_)) => {
                return Err(InterpreterError::UnsupportedManagedCall { token });
            }
            None => return Err(InterpreterError::unresolved(token, None)),
        };
        let handler = self
            .registry
            .read()
            .lookup(&signature)
            .ok_or_else(|| InterpreterError::unresolved(token, Some(&*signature)))?;

        self.check_arguments(&signature)?;
        let before = self.stack.depth();
        let mut ctx = PlugContext {
            stack: &mut self.stack,
            locals: &mut self.locals,
            strings: &mut self.strings,
            console: &mut *self.console,
        };
        handler(&mut ctx)?;

        let expected = before - signature.arity() + usize::from(signature.returns.is_some());
        let actual = self.stack.depth();
        if actual != expected {
            return Err(InterpreterError::StackImbalance(StackFault::PlugEffect {
                expected,
                actual,
            }));
        }
        if let Some(kind) = signature.returns {
            let result = self.stack.peek()?;
            if result.kind() != kind {
                return Err(InterpreterError::TypeMismatch {
                    op: "call",
                    left: kind,
                    right: result.kind(),
                });
            }
        }
        Ok(())
    }

    /// The receiver of an instance method may be of any kind; declared
    /// parameters must match exactly.
    fn check_arguments(&self, signature: &MethodSignature) -> Result<(), InterpreterError> {
        let argc = signature.arity();
        let depth = self.stack.depth();
        if depth < argc {
            return Err(InterpreterError::underflow(argc, depth));
        }
        let args = &self.stack.as_slice()[depth - argc..];
        let declared = &args[usize::from(signature.instance)..];
        for (value, &kind) in declared.iter().zip(&signature.params) {
            if value.kind() != kind {
                return Err(InterpreterError::TypeMismatch {
                    op: "call",
                    left: kind,
                    right: value.kind(),
                });
            }
        }
        Ok(())
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn stack(&self) -> &EvalStack {
        &self.stack
    }

    pub fn locals(&self) -> &LocalBank {
        &self.locals
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// Instructions executed by the current or last run.
    pub fn executed_instructions(&self) -> u64 {
        self.executed
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Resolve a string handle produced by this interpreter.
    pub fn resolve_string(&self, value: Value) -> Option<&str> {
        self.strings.get(value.as_string()?)
    }
}
