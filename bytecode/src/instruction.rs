use core::fmt;

use crate::op::Op;

/// A decoded instruction with all operands resolved to their widest types.
///
/// Short and long encodings of the same operation decode to the same variant:
/// `ldloc.2` and `ldloc.s 2` are both [`Instruction::Ldloc`], and every
/// `ldc.i4*` form is [`Instruction::LdcI4`]. Branch offsets are relative to
/// the end of the instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    Nop,
    Ldloc {
        index: u8,
    },
    Stloc {
        index: u8,
    },
    Ldloca {
        index: u8,
    },
    LdcI4 {
        value: i32,
    },
    LdcR8 {
        value: f64,
    },
    Call {
        token: u32,
    },
    Ret,
    Br {
        offset: i32,
    },
    Brfalse {
        offset: i32,
    },
    Brtrue {
        offset: i32,
    },
    Add,
    Div,
    Rem,
    ConvR8,
    Ldstr {
        token: u16,
    },
    Ceq,
    Cgt,
    Clt,
}

impl Instruction {
    /// Branch offset, for the three branch forms.
    pub fn branch_offset(&self) -> Option<i32> {
        match *self {
            Self::Br { offset } | Self::Brfalse { offset } | Self::Brtrue { offset } => {
                Some(offset)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nop => write!(f, "nop"),
            Self::Ldloc { index } => write!(f, "ldloc {index}"),
            Self::Stloc { index } => write!(f, "stloc {index}"),
            Self::Ldloca { index } => write!(f, "ldloca {index}"),
            Self::LdcI4 { value } => write!(f, "ldc.i4 {value}"),
            Self::LdcR8 { value } => write!(f, "ldc.r8 {value:?}"),
            Self::Call { token } => write!(f, "call 0x{token:08x}"),
            Self::Ret => write!(f, "ret"),
            Self::Br { offset } => write!(f, "br {offset:+}"),
            Self::Brfalse { offset } => write!(f, "brfalse {offset:+}"),
            Self::Brtrue { offset } => write!(f, "brtrue {offset:+}"),
            Self::Add => write!(f, "add"),
            Self::Div => write!(f, "div"),
            Self::Rem => write!(f, "rem"),
            Self::ConvR8 => write!(f, "conv.r8"),
            Self::Ldstr { token } => write!(f, "ldstr #0x{token:04x}"),
            Self::Ceq => write!(f, "ceq"),
            Self::Cgt => write!(f, "cgt"),
            Self::Clt => write!(f, "clt"),
        }
    }
}

/// An instruction paired with the opcode it was decoded from.
///
/// Displays in assembler syntax under the opcode's own mnemonic, so
/// `ldloc.2` and `ldloc.s 2` stay distinct. Implicit operands are not
/// repeated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listing {
    pub op: Op,
    pub instruction: Instruction,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.op.mnemonic())?;
        if self.op.operand_size() == 0 {
            return Ok(());
        }
        match self.instruction {
            Instruction::Ldloc { index }
            | Instruction::Stloc { index }
            | Instruction::Ldloca { index } => write!(f, " {index}"),
            Instruction::LdcI4 { value } => write!(f, " {value}"),
            Instruction::LdcR8 { value } => write!(f, " {value:?}"),
            Instruction::Call { token } => write!(f, " 0x{token:08x}"),
            Instruction::Br { offset }
            | Instruction::Brfalse { offset }
            | Instruction::Brtrue { offset } => write!(f, " {offset:+}"),
            Instruction::Ldstr { token } => write!(f, " #0x{token:04x}"),
            _ => Ok(()),
        }
    }
}
