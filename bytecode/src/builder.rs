use crate::op::Op;

/// A forward branch whose offset has not yet been resolved.
///
/// Created by the branch emitters of [`BytecodeBuilder`] and resolved with
/// [`BytecodeBuilder::bind`].
#[derive(Debug)]
#[must_use = "an unbound label leaves a zero branch offset"]
pub struct Label {
    /// Position of the offset bytes in the buffer.
    offset_pos: usize,
    /// Position right after the branch instruction (base for relative offset).
    base: usize,
    /// Operand width: 1 for the short forms, 4 for `brtrue`.
    width: usize,
}

/// Builds a bytecode byte sequence.
///
/// Load and store emitters pick the shortest encoding for their operand, so
/// `ldloc(2)` emits `ldloc.2` and `ldc_i4(7)` emits `ldc.i4.7`.
#[derive(Debug, Clone)]
pub struct BytecodeBuilder {
    buf: Vec<u8>,
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Current byte offset in the bytecode stream.
    pub fn current_offset(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    // ── emit helpers ───────────────────────────────────────────────

    fn emit_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn emit_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn emit_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn emit_op(&mut self, op: Op) {
        op.encode_into(&mut self.buf);
    }

    /// Append raw bytes, e.g. to produce opcodes outside the supported set.
    pub fn emit_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// `nop`
    pub fn nop(&mut self) {
        self.emit_op(Op::Nop);
    }

    /// `ldloc.N` for locals 0 to 3, `ldloc.s <index>` otherwise.
    pub fn ldloc(&mut self, index: u8) {
        match index {
            0 => self.emit_op(Op::Ldloc0),
            1 => self.emit_op(Op::Ldloc1),
            2 => self.emit_op(Op::Ldloc2),
            3 => self.emit_op(Op::Ldloc3),
            _ => self.ldloc_s(index),
        }
    }

    /// `ldloc.s <index>`, even for the locals that have a one-byte form.
    pub fn ldloc_s(&mut self, index: u8) {
        self.emit_op(Op::LdlocS);
        self.emit_u8(index);
    }

    /// `stloc.N` for locals 0 to 3, `stloc.s <index>` otherwise.
    pub fn stloc(&mut self, index: u8) {
        match index {
            0 => self.emit_op(Op::Stloc0),
            1 => self.emit_op(Op::Stloc1),
            2 => self.emit_op(Op::Stloc2),
            3 => self.emit_op(Op::Stloc3),
            _ => self.stloc_s(index),
        }
    }

    /// `stloc.s <index>`
    pub fn stloc_s(&mut self, index: u8) {
        self.emit_op(Op::StlocS);
        self.emit_u8(index);
    }

    /// `ldloca.s <index>`
    pub fn ldloca_s(&mut self, index: u8) {
        self.emit_op(Op::LdlocaS);
        self.emit_u8(index);
    }

    /// Push an `Int32` constant using the shortest encoding.
    ///
    /// 0 to 8 use `ldc.i4.N`, 9 to 255 use the zero-extending `ldc.i4.s`,
    /// everything else `ldc.i4`.
    pub fn ldc_i4(&mut self, value: i32) {
        match value {
            0 => self.emit_op(Op::LdcI4_0),
            1 => self.emit_op(Op::LdcI4_1),
            2 => self.emit_op(Op::LdcI4_2),
            3 => self.emit_op(Op::LdcI4_3),
            4 => self.emit_op(Op::LdcI4_4),
            5 => self.emit_op(Op::LdcI4_5),
            6 => self.emit_op(Op::LdcI4_6),
            7 => self.emit_op(Op::LdcI4_7),
            8 => self.emit_op(Op::LdcI4_8),
            _ => match u8::try_from(value) {
                Ok(byte) => self.ldc_i4_s(byte),
                Err(_) => {
                    self.emit_op(Op::LdcI4);
                    self.emit_u32(value as u32);
                }
            },
        }
    }

    /// `ldc.i4.s <value>`
    pub fn ldc_i4_s(&mut self, value: u8) {
        self.emit_op(Op::LdcI4S);
        self.emit_u8(value);
    }

    /// `ldc.r8 <value>`
    pub fn ldc_r8(&mut self, value: f64) {
        self.emit_op(Op::LdcR8);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// `call <token:u32>`
    pub fn call(&mut self, token: u32) {
        self.emit_op(Op::Call);
        self.emit_u32(token);
    }

    /// `ret`
    pub fn ret(&mut self) {
        self.emit_op(Op::Ret);
    }

    /// `add`
    pub fn add(&mut self) {
        self.emit_op(Op::Add);
    }

    /// `div`
    pub fn div(&mut self) {
        self.emit_op(Op::Div);
    }

    /// `rem`
    pub fn rem(&mut self) {
        self.emit_op(Op::Rem);
    }

    /// `conv.r8`
    pub fn conv_r8(&mut self) {
        self.emit_op(Op::ConvR8);
    }

    /// `ldstr <token:u16> <0x0000 0x70>`: the user-string table tag fills the
    /// high half of the 4-byte token.
    pub fn ldstr(&mut self, token: u16) {
        self.emit_op(Op::Ldstr);
        self.emit_u16(token);
        self.emit_u16(0x7000);
    }

    /// `ceq`
    pub fn ceq(&mut self) {
        self.emit_op(Op::Ceq);
    }

    /// `cgt`
    pub fn cgt(&mut self) {
        self.emit_op(Op::Cgt);
    }

    /// `clt`
    pub fn clt(&mut self) {
        self.emit_op(Op::Clt);
    }

    // ── branches ───────────────────────────────────────────────────

    /// Emit an unconditional forward `br.s`. Returns a [`Label`].
    pub fn br_s(&mut self) -> Label {
        self.emit_branch_placeholder(Op::BrS)
    }

    /// Emit a forward `brfalse.s`. Returns a [`Label`].
    pub fn brfalse_s(&mut self) -> Label {
        self.emit_branch_placeholder(Op::BrfalseS)
    }

    /// Emit a forward `brtrue.s`. Returns a [`Label`].
    pub fn brtrue_s(&mut self) -> Label {
        self.emit_branch_placeholder(Op::BrtrueS)
    }

    /// Emit a forward `brtrue` with a 4-byte offset. Returns a [`Label`].
    pub fn brtrue(&mut self) -> Label {
        self.emit_branch_placeholder(Op::Brtrue)
    }

    /// Bind a forward branch label to the current position.
    ///
    /// # Panics
    ///
    /// If a short branch would need an offset outside `i8`.
    pub fn bind(&mut self, label: Label) {
        let target = self.buf.len();
        let offset = target as isize - label.base as isize;
        self.patch_offset(label.offset_pos, label.width, offset);
    }

    /// Emit a backward `br.s` to `target` (a byte offset obtained from
    /// [`current_offset`](Self::current_offset)).
    pub fn br_s_back(&mut self, target: usize) {
        self.emit_branch_to(Op::BrS, target);
    }

    /// Emit a backward `brtrue` to `target`.
    pub fn brtrue_back(&mut self, target: usize) {
        self.emit_branch_to(Op::Brtrue, target);
    }

    /// Emit a branch with an explicit relative offset.
    pub fn branch_with_offset(&mut self, op: Op, offset: i32) {
        let label = self.emit_branch_placeholder(op);
        self.patch_offset(label.offset_pos, label.width, offset as isize);
    }

    fn emit_branch_to(&mut self, op: Op, target: usize) {
        let label = self.emit_branch_placeholder(op);
        let offset = target as isize - label.base as isize;
        self.patch_offset(label.offset_pos, label.width, offset);
    }

    fn emit_branch_placeholder(&mut self, op: Op) -> Label {
        debug_assert!(
            matches!(op, Op::BrS | Op::BrfalseS | Op::BrtrueS | Op::Brtrue),
            "{op:?} is not a branch"
        );
        self.emit_op(op);
        let offset_pos = self.buf.len();
        let width = op.operand_size();
        self.buf.resize(offset_pos + width, 0); // placeholder
        let base = self.buf.len();
        Label {
            offset_pos,
            base,
            width,
        }
    }

    fn patch_offset(&mut self, pos: usize, width: usize, offset: isize) {
        if width == 1 {
            let Ok(short) = i8::try_from(offset) else {
                panic!("short branch offset {offset} does not fit in i8");
            };
            self.buf[pos] = short as u8;
        } else {
            let Ok(long) = i32::try_from(offset) else {
                panic!("branch offset {offset} does not fit in i32");
            };
            self.buf[pos..pos + 4].copy_from_slice(&long.to_le_bytes());
        }
    }
}

impl Default for BytecodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
