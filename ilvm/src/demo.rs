//! Small ready-made methods, used by the command line tool and benchmarks.
use std::sync::Arc;

use ilvm_bytecode::BytecodeBuilder;

use crate::{MetadataError, MetadataImage, MethodBody, MethodSignature, Program, ValueKind};

/// Byte offset of the candidate in [`primality_program`]'s code.
pub const PRIME_CANDIDATE_OFFSET: usize = 1;

/// Trial division: returns `Int32(1)` when `candidate` is prime, else
/// `Int32(0)`.
///
/// The candidate is the only constant in the method, a single `ldc.i4.s`
/// operand byte at [`PRIME_CANDIDATE_OFFSET`].
pub fn primality_program(candidate: u8) -> MethodBody {
    let mut b = BytecodeBuilder::new();
    // local 0: n, local 1: divisor
    b.ldc_i4_s(candidate);
    b.stloc(0);

    b.ldloc(0);
    b.ldc_i4(2);
    b.clt();
    let small = b.brtrue_s();

    b.ldc_i4(2);
    b.stloc(1);

    let head = b.current_offset();
    b.ldloc(1);
    b.ldloc(0);
    b.clt();
    let prime = b.brfalse_s();

    b.ldloc(0);
    b.ldloc(1);
    b.rem();
    b.ldc_i4(0);
    b.ceq();
    let divisible = b.brtrue_s();

    b.ldloc(1);
    b.ldc_i4(1);
    b.add();
    b.stloc(1);
    b.br_s_back(head);

    b.bind(prime);
    b.ldc_i4(1);
    b.ret();

    b.bind(small);
    b.bind(divisible);
    b.ldc_i4(0);
    b.ret();

    MethodBody::new(b.into_bytes(), 2, 2)
}

/// `Console.WriteLine(text)` followed by `ret`, with the metadata it needs.
pub fn hello_program(text: &str) -> Result<Program, MetadataError> {
    let mut image = MetadataImage::new();
    let token = image.add_user_string(text)?;
    let write_line = image.add_method_ref(MethodSignature::new(
        "System.Console",
        "WriteLine",
        None,
        &[ValueKind::String],
    ));

    let mut b = BytecodeBuilder::new();
    b.ldstr(token);
    b.call(write_line);
    b.ret();
    Ok(Program::new(
        MethodBody::new(b.into_bytes(), 1, 0),
        Arc::new(image),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_is_patchable() {
        let body = primality_program(13);
        assert_eq!(body.code[0], 0x1F);
        assert_eq!(body.code[PRIME_CANDIDATE_OFFSET], 13);

        let mut code = body.code.to_vec();
        code[PRIME_CANDIDATE_OFFSET] = 14;
        assert_eq!(code, primality_program(14).code.to_vec());
    }
}
