/// Bytecode opcodes.
///
/// Opcodes are one byte, except for the ones behind the [`Op::PREFIX`]
/// extension byte, which are encoded as `0xFE <second byte>` and carry the
/// prefix in the high byte of their 16-bit value. Multi-byte operands are
/// little-endian.
///
/// Only the subset listed here is executable; everything else decodes to
/// [`DecodeError::UnsupportedOpcode`](crate::DecodeError::UnsupportedOpcode).
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Op {
    /// No operation.
    Nop = 0x00,

    /// Push local 0.
    Ldloc0 = 0x06,
    /// Push local 1.
    Ldloc1 = 0x07,
    /// Push local 2.
    Ldloc2 = 0x08,
    /// Push local 3.
    Ldloc3 = 0x09,

    /// Pop into local 0.
    Stloc0 = 0x0A,
    /// Pop into local 1.
    Stloc1 = 0x0B,
    /// Pop into local 2.
    Stloc2 = 0x0C,
    /// Pop into local 3.
    Stloc3 = 0x0D,

    /// Push a local.
    /// Operands: `index:u8`
    LdlocS = 0x11,

    /// Push the address (index) of a local.
    /// Operands: `index:u8`
    LdlocaS = 0x12,

    /// Pop into a local.
    /// Operands: `index:u8`
    StlocS = 0x13,

    /// Push `Int32` 0.
    LdcI4_0 = 0x16,
    /// Push `Int32` 1.
    LdcI4_1 = 0x17,
    /// Push `Int32` 2.
    LdcI4_2 = 0x18,
    /// Push `Int32` 3.
    LdcI4_3 = 0x19,
    /// Push `Int32` 4.
    LdcI4_4 = 0x1A,
    /// Push `Int32` 5.
    LdcI4_5 = 0x1B,
    /// Push `Int32` 6.
    LdcI4_6 = 0x1C,
    /// Push `Int32` 7.
    LdcI4_7 = 0x1D,
    /// Push `Int32` 8.
    LdcI4_8 = 0x1E,

    /// Push a small `Int32`. The operand byte is zero-extended.
    /// Operands: `value:u8`
    LdcI4S = 0x1F,

    /// Push an `Int32`.
    /// Operands: `value:i32`
    LdcI4 = 0x20,

    /// Push a `Float`.
    /// Operands: `value:f64`
    LdcR8 = 0x23,

    /// Call a method by metadata token.
    /// Operands: `token:u32`
    Call = 0x28,

    /// Return from the method. The top of the stack (if any) is the result.
    Ret = 0x2A,

    /// Unconditional short branch.
    /// Operands: `offset:i8` (relative to the end of the instruction)
    BrS = 0x2B,

    /// Pop and branch if zero.
    /// Operands: `offset:i8`
    BrfalseS = 0x2C,

    /// Pop and branch if one.
    /// Operands: `offset:i8`
    BrtrueS = 0x2D,

    /// Pop and branch if one, long form.
    /// Operands: `offset:i32`
    Brtrue = 0x3A,

    /// Same-kind addition.
    Add = 0x58,

    /// Same-kind division.
    Div = 0x5B,

    /// Same-kind remainder.
    Rem = 0x5D,

    /// Convert the top of the stack to `Float`.
    ConvR8 = 0x6C,

    /// Push an interned user string.
    /// Operands: `token:u16`, `reserved:u16`
    Ldstr = 0x72,

    /// Compare equal.
    Ceq = 0xFE01,

    /// Compare greater than.
    Cgt = 0xFE02,

    /// Compare less than.
    Clt = 0xFE04,
}

impl Op {
    /// First byte of every two-byte opcode.
    pub const PREFIX: u8 = 0xFE;

    /// Whether this opcode is encoded behind [`Op::PREFIX`].
    #[inline]
    pub const fn is_extended(self) -> bool {
        (self as u16) >> 8 == Self::PREFIX as u16
    }

    /// Number of operand bytes following the opcode.
    pub const fn operand_size(self) -> usize {
        match self {
            Op::LdlocS
            | Op::LdlocaS
            | Op::StlocS
            | Op::LdcI4S
            | Op::BrS
            | Op::BrfalseS
            | Op::BrtrueS => 1,
            Op::LdcI4 | Op::Call | Op::Brtrue | Op::Ldstr => 4,
            Op::LdcR8 => 8,
            _ => 0,
        }
    }

    /// Lowercase assembler mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Op::Nop => "nop",
            Op::Ldloc0 => "ldloc.0",
            Op::Ldloc1 => "ldloc.1",
            Op::Ldloc2 => "ldloc.2",
            Op::Ldloc3 => "ldloc.3",
            Op::Stloc0 => "stloc.0",
            Op::Stloc1 => "stloc.1",
            Op::Stloc2 => "stloc.2",
            Op::Stloc3 => "stloc.3",
            Op::LdlocS => "ldloc.s",
            Op::LdlocaS => "ldloca.s",
            Op::StlocS => "stloc.s",
            Op::LdcI4_0 => "ldc.i4.0",
            Op::LdcI4_1 => "ldc.i4.1",
            Op::LdcI4_2 => "ldc.i4.2",
            Op::LdcI4_3 => "ldc.i4.3",
            Op::LdcI4_4 => "ldc.i4.4",
            Op::LdcI4_5 => "ldc.i4.5",
            Op::LdcI4_6 => "ldc.i4.6",
            Op::LdcI4_7 => "ldc.i4.7",
            Op::LdcI4_8 => "ldc.i4.8",
            Op::LdcI4S => "ldc.i4.s",
            Op::LdcI4 => "ldc.i4",
            Op::LdcR8 => "ldc.r8",
            Op::Call => "call",
            Op::Ret => "ret",
            Op::BrS => "br.s",
            Op::BrfalseS => "brfalse.s",
            Op::BrtrueS => "brtrue.s",
            Op::Brtrue => "brtrue",
            Op::Add => "add",
            Op::Div => "div",
            Op::Rem => "rem",
            Op::ConvR8 => "conv.r8",
            Op::Ldstr => "ldstr",
            Op::Ceq => "ceq",
            Op::Cgt => "cgt",
            Op::Clt => "clt",
        }
    }

    /// Write the opcode bytes (one, or prefix + one) into `buf`.
    pub fn encode_into(self, buf: &mut Vec<u8>) {
        let value = self as u16;
        if self.is_extended() {
            buf.push(Self::PREFIX);
        }
        buf.push((value & 0xFF) as u8);
    }
}

impl TryFrom<u16> for Op {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, u16> {
        let op = match value {
            0x00 => Op::Nop,
            0x06 => Op::Ldloc0,
            0x07 => Op::Ldloc1,
            0x08 => Op::Ldloc2,
            0x09 => Op::Ldloc3,
            0x0A => Op::Stloc0,
            0x0B => Op::Stloc1,
            0x0C => Op::Stloc2,
            0x0D => Op::Stloc3,
            0x11 => Op::LdlocS,
            0x12 => Op::LdlocaS,
            0x13 => Op::StlocS,
            0x16 => Op::LdcI4_0,
            0x17 => Op::LdcI4_1,
            0x18 => Op::LdcI4_2,
            0x19 => Op::LdcI4_3,
            0x1A => Op::LdcI4_4,
            0x1B => Op::LdcI4_5,
            0x1C => Op::LdcI4_6,
            0x1D => Op::LdcI4_7,
            0x1E => Op::LdcI4_8,
            0x1F => Op::LdcI4S,
            0x20 => Op::LdcI4,
            0x23 => Op::LdcR8,
            0x28 => Op::Call,
            0x2A => Op::Ret,
            0x2B => Op::BrS,
            0x2C => Op::BrfalseS,
            0x2D => Op::BrtrueS,
            0x3A => Op::Brtrue,
            0x58 => Op::Add,
            0x5B => Op::Div,
            0x5D => Op::Rem,
            0x6C => Op::ConvR8,
            0x72 => Op::Ldstr,
            0xFE01 => Op::Ceq,
            0xFE02 => Op::Cgt,
            0xFE04 => Op::Clt,
            other => return Err(other),
        };
        Ok(op)
    }
}
