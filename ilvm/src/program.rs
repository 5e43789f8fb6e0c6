//! A loaded method and the metadata capabilities it needs.
//!
//! The metadata reader itself lives outside this crate; [`MetadataResolver`]
//! is the seam it plugs into. [`crate::MetadataImage`] is the in-memory
//! implementation used by tests and the command line tool.
use std::fmt;
use std::sync::Arc;

use ilvm_bytecode::{Instruction, decode_at};

use crate::{InterpreterError, ValueKind};

/// The bytecode and declared limits of one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    pub code: Arc<[u8]>,
    /// Maximum evaluation stack depth.
    pub max_stack: u16,
    /// Size of the local variable bank.
    pub local_count: u16,
}

impl MethodBody {
    pub fn new(code: impl Into<Arc<[u8]>>, max_stack: u16, local_count: u16) -> Self {
        Self {
            code: code.into(),
            max_stack,
            local_count,
        }
    }
}

/// Symbolic signature of a method, as used for plug matching.
///
/// Every field takes part in equality; `returns: None` is `void`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub owner: String,
    pub name: String,
    pub returns: Option<ValueKind>,
    pub params: Vec<ValueKind>,
    pub instance: bool,
}

impl MethodSignature {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        returns: Option<ValueKind>,
        params: &[ValueKind],
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            returns,
            params: params.to_vec(),
            instance: false,
        }
    }

    /// Mark the method as an instance method; its receiver is passed below
    /// the declared parameters.
    #[must_use]
    pub fn with_instance(mut self) -> Self {
        self.instance = true;
        self
    }

    /// Number of stack values the call consumes, receiver included.
    pub fn arity(&self) -> usize {
        self.params.len() + usize::from(self.instance)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance {
            f.write_str("instance ")?;
        }
        match self.returns {
            Some(kind) => write!(f, "{kind} ")?,
            None => f.write_str("void ")?,
        }
        write!(f, "{}::{}(", self.owner, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

/// What a method token refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodTarget {
    /// A body defined in the loaded image.
    Body(MethodBody),
    /// A method defined elsewhere, known only by signature.
    External(Arc<MethodSignature>),
}

/// Token resolution provided by the metadata reader.
pub trait MetadataResolver: Send + Sync {
    /// The user-string blob for `token`, starting at its length byte.
    fn user_string_blob(&self, token: u16) -> Option<&[u8]>;

    fn resolve_method(&self, token: u32) -> Option<MethodTarget>;
}

/// Decode a user-string blob.
///
/// Only single-byte lengths are supported: the first byte is the blob length
/// with the top bit clear. The blob holds UTF-16LE text followed by one
/// terminal flag byte that is not part of the text.
pub fn decode_user_string(token: u16, blob: &[u8]) -> Result<String, InterpreterError> {
    let Some((&length_byte, rest)) = blob.split_first() else {
        return Err(InterpreterError::MalformedUserString { token });
    };
    if length_byte & 0x80 != 0 || length_byte == 0 {
        return Err(InterpreterError::UnsupportedBlobEncoding { token, length_byte });
    }

    let declared = usize::from(length_byte);
    let Some(contents) = rest.get(..declared) else {
        return Err(InterpreterError::MalformedUserString { token });
    };
    let payload = &contents[..declared - 1];
    if payload.len() % 2 != 0 {
        return Err(InterpreterError::MalformedUserString { token });
    }

    let units: Vec<u16> = payload
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| InterpreterError::MalformedUserString { token })
}

/// One loaded method: its code, the program counter and the resolver for
/// the tokens it references.
#[derive(Clone)]
pub struct Program {
    body: MethodBody,
    pc: usize,
    resolver: Arc<dyn MetadataResolver>,
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("body", &self.body)
            .field("pc", &self.pc)
            .finish_non_exhaustive()
    }
}

impl Program {
    pub fn new(body: MethodBody, resolver: Arc<dyn MetadataResolver>) -> Self {
        Self {
            body,
            pc: 0,
            resolver,
        }
    }

    pub fn body(&self) -> &MethodBody {
        &self.body
    }

    pub fn code(&self) -> &[u8] {
        &self.body.code
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Rewind to the first instruction.
    pub fn reset(&mut self) {
        self.pc = 0;
    }

    /// Decode the instruction at the program counter and advance past it.
    ///
    /// Returns the instruction's offset along with it.
    #[inline]
    pub fn fetch(&mut self) -> Result<(usize, Instruction), InterpreterError> {
        let offset = self.pc;
        if offset >= self.body.code.len() {
            return Err(InterpreterError::UnexpectedEndOfCode);
        }
        let (instruction, next) = decode_at(&self.body.code, offset)?;
        self.pc = next;
        Ok((offset, instruction))
    }

    /// Move the program counter by `offset`, relative to the instruction
    /// following the branch. `from` is the branch's own offset.
    ///
    /// The target may be the end of the code; running from there fails with
    /// [`InterpreterError::UnexpectedEndOfCode`].
    pub fn branch(&mut self, from: usize, offset: i32) -> Result<(), InterpreterError> {
        let target = self.pc as i64 + i64::from(offset);
        if target < 0 || target > self.body.code.len() as i64 {
            return Err(InterpreterError::BranchOutOfBounds {
                offset: from,
                target,
            });
        }
        self.pc = target as usize;
        Ok(())
    }

    pub fn user_string(&self, token: u16) -> Result<String, InterpreterError> {
        let blob = self
            .resolver
            .user_string_blob(token)
            .ok_or(InterpreterError::UnknownStringToken { token })?;
        decode_user_string(token, blob)
    }

    pub fn resolve_method(&self, token: u32) -> Option<MethodTarget> {
        self.resolver.resolve_method(token)
    }
}
