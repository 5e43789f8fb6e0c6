//! Native method registry.
//!
//! A `call` whose token names an external method is dispatched to the plug
//! registered under the exact same signature. Plugs pop their own arguments
//! and push their own result through a [`PlugContext`].
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use crate::ValueKind::{Float, Int32, String as Str};
use crate::{
    EvalStack, InterpreterError, LocalBank, MethodSignature, RegistryError, StringHandle,
    StringTable, Value, ValueKind,
};

mod console;
mod math;
mod string;

pub type PlugHandler = fn(&mut PlugContext<'_>) -> Result<(), InterpreterError>;

/// Capabilities a plug is handed for the duration of one call.
pub struct PlugContext<'a> {
    pub stack: &'a mut EvalStack,
    pub locals: &'a mut LocalBank,
    pub strings: &'a mut StringTable,
    pub console: &'a mut dyn Write,
}

impl PlugContext<'_> {
    #[inline]
    pub fn pop(&mut self) -> Result<Value, InterpreterError> {
        self.stack.pop()
    }

    #[inline]
    pub fn push(&mut self, value: impl Into<Value>) -> Result<(), InterpreterError> {
        self.stack.push(value.into())
    }

    pub fn pop_int32(&mut self) -> Result<i32, InterpreterError> {
        let value = self.pop()?;
        value.as_int32().ok_or(InterpreterError::InvalidOperand {
            op: "plug argument",
            kind: value.kind(),
        })
    }

    pub fn pop_float(&mut self) -> Result<f64, InterpreterError> {
        let value = self.pop()?;
        value.float_payload().ok_or(InterpreterError::InvalidOperand {
            op: "plug argument",
            kind: value.kind(),
        })
    }

    pub fn pop_string_handle(&mut self) -> Result<StringHandle, InterpreterError> {
        let value = self.pop()?;
        value.as_string().ok_or(InterpreterError::InvalidOperand {
            op: "plug argument",
            kind: value.kind(),
        })
    }

    /// Pops a string argument and returns its text.
    pub fn pop_string(&mut self) -> Result<Arc<str>, InterpreterError> {
        let handle = self.pop_string_handle()?;
        self.strings.resolve(handle).map(Arc::from)
    }

    pub fn push_string(&mut self, text: &str) -> Result<(), InterpreterError> {
        let handle = self.strings.intern(text);
        self.push(handle)
    }
}

/// A signature bound to its native handler.
#[derive(Debug, Clone)]
pub struct Plug {
    pub signature: MethodSignature,
    pub handler: PlugHandler,
}

impl Plug {
    pub fn new(
        owner: &str,
        name: &str,
        returns: Option<ValueKind>,
        params: &[ValueKind],
        handler: PlugHandler,
    ) -> Self {
        Self {
            signature: MethodSignature::new(owner, name, returns, params),
            handler,
        }
    }

    /// An instance plug; the receiver sits below `params` on the stack.
    pub fn instance(
        owner: &str,
        name: &str,
        returns: Option<ValueKind>,
        params: &[ValueKind],
        handler: PlugHandler,
    ) -> Self {
        Self {
            signature: MethodSignature::new(owner, name, returns, params).with_instance(),
            handler,
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct BuiltinPlug {
    owner: &'static str,
    name: &'static str,
    returns: Option<ValueKind>,
    params: &'static [ValueKind],
    instance: bool,
    handler: PlugHandler,
}

impl BuiltinPlug {
    const fn new(
        owner: &'static str,
        name: &'static str,
        returns: Option<ValueKind>,
        params: &'static [ValueKind],
        handler: PlugHandler,
    ) -> Self {
        Self {
            owner,
            name,
            returns,
            params,
            instance: false,
            handler,
        }
    }

    const fn instance(mut self) -> Self {
        self.instance = true;
        self
    }

    fn to_plug(self) -> Plug {
        if self.instance {
            Plug::instance(self.owner, self.name, self.returns, self.params, self.handler)
        } else {
            Plug::new(self.owner, self.name, self.returns, self.params, self.handler)
        }
    }
}

const BUILTINS: &[BuiltinPlug] = &[
    BuiltinPlug::new("System.Console", "WriteLine", None, &[Str], console::write_line_string),
    BuiltinPlug::new("System.Console", "WriteLine", None, &[Int32], console::write_line_int32),
    BuiltinPlug::new("System.Console", "WriteLine", None, &[], console::write_line),
    BuiltinPlug::new("System.Console", "Write", None, &[Str], console::write_string),
    BuiltinPlug::new("System.Console", "Write", None, &[Int32], console::write_int32),
    BuiltinPlug::new("System.Math", "Sqrt", Some(Float), &[Float], math::sqrt),
    BuiltinPlug::new("System.String", "get_Length", Some(Int32), &[], string::length).instance(),
    BuiltinPlug::new("System.String", "Concat", Some(Str), &[Str, Str], string::concat),
];

/// The plugs every registry created with [`PlugRegistry::with_builtins`]
/// starts with.
pub fn builtin_plugs() -> impl Iterator<Item = Plug> {
    BUILTINS.iter().map(|builtin| builtin.to_plug())
}

/// Signature to handler table.
///
/// Sealing freezes the table; the global registry is sealed by the first
/// interpreter run.
#[derive(Debug, Default, Clone)]
pub struct PlugRegistry {
    plugs: HashMap<MethodSignature, PlugHandler>,
    sealed: bool,
}

impl PlugRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for plug in builtin_plugs() {
            registry.plugs.insert(plug.signature, plug.handler);
        }
        registry
    }

    pub fn register(&mut self, plug: Plug) -> Result<(), RegistryError> {
        if self.sealed {
            return Err(RegistryError::Sealed(plug.signature));
        }
        if self.plugs.contains_key(&plug.signature) {
            return Err(RegistryError::DuplicateSignature(plug.signature));
        }
        log::debug!("registered plug {}", plug.signature);
        self.plugs.insert(plug.signature, plug.handler);
        Ok(())
    }

    #[inline]
    pub fn lookup(&self, signature: &MethodSignature) -> Option<PlugHandler> {
        self.plugs.get(signature).copied()
    }

    pub fn seal(&mut self) {
        if !self.sealed {
            log::debug!("sealing plug registry with {} plug(s)", self.plugs.len());
        }
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn len(&self) -> usize {
        self.plugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugs.is_empty()
    }
}

pub type SharedRegistry = Arc<RwLock<PlugRegistry>>;

static GLOBAL: LazyLock<SharedRegistry> =
    LazyLock::new(|| Arc::new(RwLock::new(PlugRegistry::with_builtins())));

/// The process-wide registry, seeded with the built-in plugs.
pub fn global() -> SharedRegistry {
    Arc::clone(&GLOBAL)
}

/// Add a plug to the process-wide registry. Fails once any interpreter
/// using it has run.
pub fn register_global(plug: Plug) -> Result<(), RegistryError> {
    GLOBAL.write().register(plug)
}
