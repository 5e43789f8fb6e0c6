mod builder;
mod decoder;
mod instruction;
mod op;

pub use builder::{BytecodeBuilder, Label};
pub use decoder::{BytecodeDecoder, DecodeError, decode_at};
pub use instruction::{Instruction, Listing};
pub use op::Op;

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> Vec<Instruction> {
        BytecodeDecoder::new(bytes)
            .collect::<Result<_, _>>()
            .expect("well-formed bytecode")
    }

    #[test]
    fn locals_use_short_forms() {
        let mut b = BytecodeBuilder::new();
        b.ldloc(0);
        b.ldloc(3);
        b.ldloc(4);
        b.stloc(1);
        b.stloc(200);
        b.ldloca_s(9);

        assert_eq!(b.as_bytes(), &[0x06, 0x09, 0x11, 4, 0x0B, 0x13, 200, 0x12, 9]);
        assert_eq!(decode_all(b.as_bytes()), vec![
            Instruction::Ldloc { index: 0 },
            Instruction::Ldloc { index: 3 },
            Instruction::Ldloc { index: 4 },
            Instruction::Stloc { index: 1 },
            Instruction::Stloc { index: 200 },
            Instruction::Ldloca { index: 9 },
        ]);
    }

    #[test]
    fn long_local_forms_decode_like_short_ones() {
        let mut b = BytecodeBuilder::new();
        b.ldloc_s(2);
        b.stloc_s(2);
        assert_eq!(decode_all(b.as_bytes()), vec![
            Instruction::Ldloc { index: 2 },
            Instruction::Stloc { index: 2 },
        ]);
    }

    #[test]
    fn constants_pick_shortest_encoding() {
        let mut b = BytecodeBuilder::new();
        b.ldc_i4(0);
        b.ldc_i4(8);
        b.ldc_i4(9);
        b.ldc_i4(255);
        b.ldc_i4(256);
        b.ldc_i4(-1);

        let bytes = b.into_bytes();
        assert_eq!(&bytes[..6], &[0x16, 0x1E, 0x1F, 9, 0x1F, 255]);
        assert_eq!(decode_all(&bytes), vec![
            Instruction::LdcI4 { value: 0 },
            Instruction::LdcI4 { value: 8 },
            Instruction::LdcI4 { value: 9 },
            Instruction::LdcI4 { value: 255 },
            Instruction::LdcI4 { value: 256 },
            Instruction::LdcI4 { value: -1 },
        ]);
    }

    #[test]
    fn short_constant_is_zero_extended() {
        assert_eq!(decode_all(&[0x1F, 0xFF]), vec![Instruction::LdcI4 { value: 255 }]);
    }

    #[test]
    fn float_constant() {
        let mut b = BytecodeBuilder::new();
        b.ldc_r8(2.5);
        assert_eq!(b.as_bytes().len(), 9);
        assert_eq!(decode_all(b.as_bytes()), vec![Instruction::LdcR8 { value: 2.5 }]);
    }

    #[test]
    fn call_and_ldstr_operands() {
        let mut b = BytecodeBuilder::new();
        b.ldstr(0x0001);
        b.call(0x0A00_0003);
        b.ret();

        assert_eq!(
            b.as_bytes(),
            &[0x72, 0x01, 0x00, 0x00, 0x70, 0x28, 0x03, 0x00, 0x00, 0x0A, 0x2A]
        );
        assert_eq!(decode_all(b.as_bytes()), vec![
            Instruction::Ldstr { token: 1 },
            Instruction::Call { token: 0x0A00_0003 },
            Instruction::Ret,
        ]);
    }

    #[test]
    fn prefixed_comparisons() {
        let mut b = BytecodeBuilder::new();
        b.ceq();
        b.cgt();
        b.clt();
        assert_eq!(b.as_bytes(), &[0xFE, 0x01, 0xFE, 0x02, 0xFE, 0x04]);
        assert_eq!(decode_all(b.as_bytes()), vec![
            Instruction::Ceq,
            Instruction::Cgt,
            Instruction::Clt,
        ]);
    }

    #[test]
    fn forward_branch() {
        let mut b = BytecodeBuilder::new();
        b.ldc_i4(0);
        let label = b.brfalse_s();
        b.ldc_i4(1);
        b.bind(label);
        b.ret();

        assert_eq!(decode_all(b.as_bytes()), vec![
            Instruction::LdcI4 { value: 0 },
            Instruction::Brfalse { offset: 1 },
            Instruction::LdcI4 { value: 1 },
            Instruction::Ret,
        ]);
    }

    #[test]
    fn backward_branch() {
        let mut b = BytecodeBuilder::new();
        let top = b.current_offset();
        b.ldloc(0);
        b.br_s_back(top);

        assert_eq!(decode_all(b.as_bytes()), vec![
            Instruction::Ldloc { index: 0 },
            Instruction::Br { offset: -3 },
        ]);
    }

    #[test]
    fn wide_branch_uses_four_byte_offset() {
        let mut b = BytecodeBuilder::new();
        let top = b.current_offset();
        b.nop();
        b.brtrue_back(top);
        let label = b.brtrue();
        b.nop();
        b.bind(label);

        assert_eq!(b.as_bytes().len(), 1 + 5 + 5 + 1);
        assert_eq!(decode_all(b.as_bytes()), vec![
            Instruction::Nop,
            Instruction::Brtrue { offset: -6 },
            Instruction::Brtrue { offset: 1 },
            Instruction::Nop,
        ]);
    }

    #[test]
    #[should_panic(expected = "does not fit in i8")]
    fn short_branch_out_of_range_panics() {
        let mut b = BytecodeBuilder::new();
        let label = b.br_s();
        for _ in 0..200 {
            b.nop();
        }
        b.bind(label);
    }

    #[test]
    fn unsupported_single_byte_opcode() {
        let mut decoder = BytecodeDecoder::new(&[0x00, 0x01]);
        assert_eq!(decoder.next(), Some(Ok(Instruction::Nop)));
        assert_eq!(
            decoder.next(),
            Some(Err(DecodeError::UnsupportedOpcode { opcode: 0x01, offset: 1 }))
        );
        assert_eq!(decoder.next(), None);
    }

    #[test]
    fn unsupported_prefixed_opcode() {
        assert_eq!(
            decode_at(&[0xFE, 0x03], 0),
            Err(DecodeError::UnsupportedOpcode { opcode: 0xFE03, offset: 0 })
        );
    }

    #[test]
    fn truncated_operands() {
        assert_eq!(decode_at(&[0x20, 1, 2], 0), Err(DecodeError::Truncated { offset: 0 }));
        assert_eq!(decode_at(&[0x00, 0x11], 1), Err(DecodeError::Truncated { offset: 1 }));
        assert_eq!(decode_at(&[0xFE], 0), Err(DecodeError::Truncated { offset: 0 }));
    }

    #[test]
    fn decode_at_reports_next_offset() {
        let mut b = BytecodeBuilder::new();
        b.nop();
        b.ldc_i4(1000);
        b.ceq();
        let bytes = b.into_bytes();

        assert_eq!(decode_at(&bytes, 1), Ok((Instruction::LdcI4 { value: 1000 }, 6)));
        assert_eq!(decode_at(&bytes, 6), Ok((Instruction::Ceq, 8)));
    }

    #[test]
    fn opcode_values() {
        assert_eq!(Op::try_from(0xFE01), Ok(Op::Ceq));
        assert_eq!(Op::try_from(0x2A), Ok(Op::Ret));
        assert_eq!(Op::try_from(0x59), Err(0x59));
        assert!(Op::Clt.is_extended());
        assert!(!Op::Ldstr.is_extended());
        assert_eq!(Op::Ldstr.operand_size(), 4);
        assert_eq!(Op::LdcR8.operand_size(), 8);
        assert_eq!(Op::BrfalseS.mnemonic(), "brfalse.s");
    }

    #[test]
    fn display_instructions() {
        assert_eq!(Instruction::Call { token: 0x0A00_0001 }.to_string(), "call 0x0a000001");
        assert_eq!(Instruction::Br { offset: -7 }.to_string(), "br -7");
        assert_eq!(Instruction::Brfalse { offset: 3 }.to_string(), "brfalse +3");
        assert_eq!(Instruction::Ldstr { token: 0x17 }.to_string(), "ldstr #0x0017");
        assert_eq!(Instruction::LdcR8 { value: 1.0 }.to_string(), "ldc.r8 1.0");
    }

    #[test]
    fn listings_keep_the_encoded_form() {
        let mut b = BytecodeBuilder::new();
        b.ldloc(2);
        b.ldloc(7);
        b.ldc_i4(3);
        b.ldc_i4_s(13);
        b.ldc_i4(1000);
        let top = b.current_offset();
        b.br_s_back(top);
        b.cgt();
        let bytes = b.into_bytes();

        let mut decoder = BytecodeDecoder::new(&bytes);
        let mut lines = Vec::new();
        while !decoder.is_at_end() {
            lines.push(decoder.decode_listing().unwrap().to_string());
        }
        assert_eq!(
            lines,
            [
                "ldloc.2",
                "ldloc.s 7",
                "ldc.i4.3",
                "ldc.i4.s 13",
                "ldc.i4 1000",
                "br.s -2",
                "cgt"
            ]
        );

        let listing = BytecodeDecoder::new(&[0x2A]).decode_listing();
        assert_eq!(
            listing,
            Ok(Listing {
                op: Op::Ret,
                instruction: Instruction::Ret
            })
        );
    }
}
