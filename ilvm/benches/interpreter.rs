//! Run with:
//!   cargo bench --bench interpreter

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use ilvm::{Interpreter, MetadataImage, PlugRegistry, Program, demo};
use ilvm_bytecode::{BytecodeDecoder, Instruction};

fn interpreter() -> Interpreter {
    Interpreter::default()
        .with_registry(PlugRegistry::with_builtins())
        .with_console(Box::new(std::io::sink()))
}

fn bench_primality(c: &mut Criterion) {
    let image = Arc::new(MetadataImage::new());
    let mut group = c.benchmark_group("primality");
    for candidate in [13u8, 97, 251] {
        let body = demo::primality_program(candidate);
        group.bench_function(candidate.to_string(), |b| {
            let mut interp = interpreter();
            b.iter(|| {
                interp.load(Program::new(body.clone(), image.clone()));
                black_box(interp.run())
            });
        });
    }
    group.finish();
}

fn bench_console(c: &mut Criterion) {
    let program = demo::hello_program("hello").expect("short string");
    c.bench_function("console_write_line", |b| {
        let mut interp = interpreter();
        b.iter(|| {
            interp.load(program.clone());
            black_box(interp.run())
        });
    });
}

fn bench_decode(c: &mut Criterion) {
    let body = demo::primality_program(251);
    c.bench_function("decode_primality", |b| {
        b.iter(|| {
            BytecodeDecoder::new(black_box(&body.code))
                .filter_map(Result::ok)
                .filter(|instruction| matches!(instruction, Instruction::Ldloc { .. }))
                .count()
        });
    });
}

criterion_group!(benches, bench_primality, bench_console, bench_decode);
criterion_main!(benches);
