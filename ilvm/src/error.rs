//! Interpreter errors.
//!
//! Every variant is fatal: the interpreter halts and hands the error to its
//! embedder. Nothing is retried or recovered internally.

use ilvm_bytecode::DecodeError;
use thiserror::Error;

use crate::{MethodSignature, ValueKind};

/// Why the stack depth went out of balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StackFault {
    /// Push onto a full stack.
    #[error("push onto a full stack of {capacity}")]
    Overflow { capacity: usize },
    /// Pop or peek on an empty stack (or fewer values than an operation needs).
    #[error("needed {needed} value(s) but the stack holds {depth}")]
    Underflow { needed: usize, depth: usize },
    /// A plug left the stack at the wrong depth.
    #[error("plug left depth {actual}, expected {expected}")]
    PlugEffect { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpreterError {
    #[error("stack imbalance: {0}")]
    StackImbalance(StackFault),

    #[error("local index {index} out of range for a bank of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("type mismatch in {op}: {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: ValueKind,
        right: ValueKind,
    },

    #[error("{op} is not defined for {kind}")]
    InvalidOperand { op: &'static str, kind: ValueKind },

    #[error("unsupported opcode 0x{opcode:04x} at offset {offset}")]
    UnsupportedOpcode { opcode: u16, offset: usize },

    #[error("truncated instruction at offset {offset}")]
    TruncatedInstruction { offset: usize },

    #[error("branch at offset {offset} targets {target}, outside the method")]
    BranchOutOfBounds { offset: usize, target: i64 },

    #[error("execution ran past the end of the method without ret")]
    UnexpectedEndOfCode,

    #[error("user string 0x{token:04x} uses unsupported blob length byte 0x{length_byte:02x}")]
    UnsupportedBlobEncoding { token: u16, length_byte: u8 },

    #[error("user string 0x{token:04x} is malformed")]
    MalformedUserString { token: u16 },

    #[error("unknown user string token 0x{token:04x}")]
    UnknownStringToken { token: u16 },

    #[error("invalid string handle {handle}")]
    InvalidStringHandle { handle: usize },

    #[error("unresolved external call 0x{token:08x}: {signature}")]
    UnresolvedExternalCall { token: u32, signature: String },

    #[error("call 0x{token:08x} targets a managed method body, which cannot be interpreted")]
    UnsupportedManagedCall { token: u32 },

    #[error("integer division by zero")]
    DivideByZero,

    #[error("instruction limit of {limit} exceeded")]
    InstructionLimitExceeded { limit: u64 },

    #[error("no program loaded")]
    NoProgramLoaded,

    #[error("plug failed: {message}")]
    Plug { message: String },
}

impl InterpreterError {
    pub(crate) fn underflow(needed: usize, depth: usize) -> Self {
        Self::StackImbalance(StackFault::Underflow { needed, depth })
    }

    pub(crate) fn unresolved(token: u32, signature: Option<&MethodSignature>) -> Self {
        let signature = match signature {
            Some(signature) => signature.to_string(),
            None => String::from("token does not resolve"),
        };
        Self::UnresolvedExternalCall { token, signature }
    }

    /// An error reported by a plug handler.
    pub fn plug(message: impl Into<String>) -> Self {
        Self::Plug {
            message: message.into(),
        }
    }
}

impl From<DecodeError> for InterpreterError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnsupportedOpcode { opcode, offset } => {
                Self::UnsupportedOpcode { opcode, offset }
            }
            DecodeError::Truncated { offset } => Self::TruncatedInstruction { offset },
        }
    }
}

/// Plug registry configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a plug is already registered for {0}")]
    DuplicateSignature(MethodSignature),

    #[error("the plug registry is sealed, cannot register {0}")]
    Sealed(MethodSignature),
}

/// Errors building an in-memory metadata image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("user string of {len} UTF-16 units does not fit a single-byte blob length")]
    StringTooLong { len: usize },

    #[error("user string heap exceeds the 16-bit token range")]
    HeapFull,
}
