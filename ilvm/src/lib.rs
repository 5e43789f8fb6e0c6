//! An interpreter for a CIL-style stack bytecode.
//!
//! Load a [`Program`] into an [`Interpreter`] and [`Interpreter::run`] it.
//! External calls are served by native plugs from a [`PlugRegistry`].

pub mod demo;
mod error;
mod interpreter;
mod locals;
mod metadata;
pub mod plugs;
mod program;
mod stack;
mod strings;
mod value;

pub use error::{InterpreterError, MetadataError, RegistryError, StackFault};
pub use interpreter::{ExecutionState, Interpreter, InterpreterSettings};
pub use locals::LocalBank;
pub use metadata::{MEMBER_REF_TABLE, METHOD_DEF_TABLE, MetadataImage};
pub use plugs::{Plug, PlugContext, PlugHandler, PlugRegistry};
pub use program::{
    MetadataResolver, MethodBody, MethodSignature, MethodTarget, Program, decode_user_string,
};
pub use stack::EvalStack;
pub use strings::{StringHandle, StringTable};
pub use value::{Value, ValueKind};
