use thiserror::Error;

use crate::instruction::{Instruction, Listing};
use crate::op::Op;

/// Why a byte sequence could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The opcode (one byte, or prefix + byte) is not part of the executable
    /// subset.
    #[error("unsupported opcode 0x{opcode:04x} at offset {offset}")]
    UnsupportedOpcode { opcode: u16, offset: usize },

    /// The opcode or one of its operands runs past the end of the code.
    #[error("truncated instruction at offset {offset}")]
    Truncated { offset: usize },
}

/// Decode the instruction starting at `pc`.
///
/// Returns the instruction and the offset of the next one.
#[inline]
pub fn decode_at(bytes: &[u8], pc: usize) -> Result<(Instruction, usize), DecodeError> {
    let mut decoder = BytecodeDecoder::at(bytes, pc);
    let instruction = decoder.decode()?;
    Ok((instruction, decoder.offset()))
}

/// Decodes a bytecode byte slice into [`Instruction`]s.
///
/// Every read is bounds-checked; malformed input yields a [`DecodeError`]
/// rather than undefined behaviour. As an iterator it stops after the first
/// error.
#[derive(Debug, Clone)]
pub struct BytecodeDecoder<'a> {
    bytes: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> BytecodeDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::at(bytes, 0)
    }

    pub fn at(bytes: &'a [u8], pos: usize) -> Self {
        Self {
            bytes,
            pos,
            failed: false,
        }
    }

    /// Current byte offset in the stream.
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Whether the decoder has reached the end of the bytecode.
    #[inline(always)]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Decode the next instruction, or `None` at end-of-stream.
    pub fn decode_next(&mut self) -> Option<Result<Instruction, DecodeError>> {
        if self.is_at_end() || self.failed {
            return None;
        }
        let result = self.decode();
        self.failed = result.is_err();
        Some(result)
    }

    /// Decode one instruction at the current position.
    #[inline]
    pub fn decode(&mut self) -> Result<Instruction, DecodeError> {
        self.decode_listing().map(|listing| listing.instruction)
    }

    /// Like [`decode`](Self::decode), but keeps the opcode the instruction
    /// was encoded with.
    pub fn decode_listing(&mut self) -> Result<Listing, DecodeError> {
        let start = self.pos;
        let first = self.read_u8(start)?;
        let opcode = if first == Op::PREFIX {
            let second = self.read_u8(start)?;
            u16::from_be_bytes([first, second])
        } else {
            u16::from(first)
        };

        let op = Op::try_from(opcode)
            .map_err(|opcode| DecodeError::UnsupportedOpcode { opcode, offset: start })?;
        let instruction = self.decode_op(op, start)?;
        Ok(Listing { op, instruction })
    }

    fn decode_op(&mut self, op: Op, start: usize) -> Result<Instruction, DecodeError> {
        let instruction = match op {
            Op::Nop => Instruction::Nop,

            Op::Ldloc0 => Instruction::Ldloc { index: 0 },
            Op::Ldloc1 => Instruction::Ldloc { index: 1 },
            Op::Ldloc2 => Instruction::Ldloc { index: 2 },
            Op::Ldloc3 => Instruction::Ldloc { index: 3 },
            Op::LdlocS => Instruction::Ldloc { index: self.read_u8(start)? },

            Op::Stloc0 => Instruction::Stloc { index: 0 },
            Op::Stloc1 => Instruction::Stloc { index: 1 },
            Op::Stloc2 => Instruction::Stloc { index: 2 },
            Op::Stloc3 => Instruction::Stloc { index: 3 },
            Op::StlocS => Instruction::Stloc { index: self.read_u8(start)? },

            Op::LdlocaS => Instruction::Ldloca { index: self.read_u8(start)? },

            Op::LdcI4_0 => Instruction::LdcI4 { value: 0 },
            Op::LdcI4_1 => Instruction::LdcI4 { value: 1 },
            Op::LdcI4_2 => Instruction::LdcI4 { value: 2 },
            Op::LdcI4_3 => Instruction::LdcI4 { value: 3 },
            Op::LdcI4_4 => Instruction::LdcI4 { value: 4 },
            Op::LdcI4_5 => Instruction::LdcI4 { value: 5 },
            Op::LdcI4_6 => Instruction::LdcI4 { value: 6 },
            Op::LdcI4_7 => Instruction::LdcI4 { value: 7 },
            Op::LdcI4_8 => Instruction::LdcI4 { value: 8 },
            // zero-extended, not sign-extended
            Op::LdcI4S => Instruction::LdcI4 { value: i32::from(self.read_u8(start)?) },
            Op::LdcI4 => Instruction::LdcI4 { value: self.read_i32(start)? },
            Op::LdcR8 => Instruction::LdcR8 { value: f64::from_le_bytes(self.read_array(start)?) },

            Op::Call => Instruction::Call { token: self.read_u32(start)? },
            Op::Ret => Instruction::Ret,

            Op::BrS => Instruction::Br { offset: i32::from(self.read_i8(start)?) },
            Op::BrfalseS => Instruction::Brfalse { offset: i32::from(self.read_i8(start)?) },
            Op::BrtrueS => Instruction::Brtrue { offset: i32::from(self.read_i8(start)?) },
            Op::Brtrue => Instruction::Brtrue { offset: self.read_i32(start)? },

            Op::Add => Instruction::Add,
            Op::Div => Instruction::Div,
            Op::Rem => Instruction::Rem,
            Op::ConvR8 => Instruction::ConvR8,

            Op::Ldstr => {
                let token = self.read_u16(start)?;
                // high half of the 4-byte token is the table tag
                let _reserved = self.read_u16(start)?;
                Instruction::Ldstr { token }
            }

            Op::Ceq => Instruction::Ceq,
            Op::Cgt => Instruction::Cgt,
            Op::Clt => Instruction::Clt,
        };
        Ok(instruction)
    }

    #[inline(always)]
    fn read_array<const N: usize>(&mut self, start: usize) -> Result<[u8; N], DecodeError> {
        let end = self.pos + N;
        let bytes = self
            .bytes
            .get(self.pos..end)
            .ok_or(DecodeError::Truncated { offset: start })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.pos = end;
        Ok(out)
    }

    #[inline(always)]
    fn read_u8(&mut self, start: usize) -> Result<u8, DecodeError> {
        let [v] = self.read_array::<1>(start)?;
        Ok(v)
    }

    #[inline(always)]
    fn read_i8(&mut self, start: usize) -> Result<i8, DecodeError> {
        Ok(i8::from_le_bytes(self.read_array(start)?))
    }

    #[inline(always)]
    fn read_u16(&mut self, start: usize) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array(start)?))
    }

    #[inline(always)]
    fn read_u32(&mut self, start: usize) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array(start)?))
    }

    #[inline(always)]
    fn read_i32(&mut self, start: usize) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array(start)?))
    }
}

impl<'a> Iterator for BytecodeDecoder<'a> {
    type Item = Result<Instruction, DecodeError>;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        self.decode_next()
    }
}
