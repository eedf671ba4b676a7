//! Benchmarks for the decompilation pipeline.
//!
//! Measures the whole pipeline on assembled methods:
//! - A counting loop (loop detection, propagation, `x++` rendering)
//! - A dense switch (case grouping, follows, breaks)
//! - A class of several methods, sequential and on the rayon pool

extern crate dexscope;

use criterion::{criterion_group, criterion_main, Criterion};
use dexscope::prelude::*;
use std::hint::black_box;

fn loop_method(name: &str) -> MethodInfo {
    MethodBuilder::new("Lbench/Loops;", name, "(I)I")
        .access(AccessFlags::PUBLIC | AccessFlags::STATIC)
        .registers(3)
        .code(|c| {
            c.const_int(0, 0)
                .const_int(1, 0)
                .label("head")
                .if_cmp(Opcode::IfGe, 1, 2, "end")
                .op(Opcode::AddInt2addr, &[0, 1])
                .binop_lit(Opcode::AddIntLit8, 1, 1, 1)
                .goto("head")
                .label("end")
                .ret(Opcode::Return, 0);
        })
        .build()
        .unwrap()
}

fn switch_method() -> MethodInfo {
    let keys: Vec<(i32, String)> = (0..16).map(|k| (k, format!("case{k}"))).collect();
    let arms: Vec<(i32, &str)> = keys.iter().map(|(k, l)| (*k, l.as_str())).collect();
    MethodBuilder::new("Lbench/Switch;", "pick", "(I)I")
        .access(AccessFlags::PUBLIC | AccessFlags::STATIC)
        .registers(2)
        .code(|c| {
            c.switch(Opcode::PackedSwitch, 1, &arms)
                .const_int(0, -1)
                .goto("end");
            for (key, label) in &keys {
                c.label(label).const_int(0, key * 10).goto("end");
            }
            c.label("end").ret(Opcode::Return, 0);
        })
        .build()
        .unwrap()
}

/// Benchmark a single loop method end to end.
fn bench_decompile_loop(c: &mut Criterion) {
    let method = loop_method("sum");
    let decompiler = Decompiler::new(DecompilerConfig::sequential());

    c.bench_function("decompile_loop", |b| {
        b.iter(|| {
            let output = decompiler.decompile_method(black_box(&method)).unwrap();
            black_box(output)
        });
    });
}

/// Benchmark a sixteen-way switch end to end.
fn bench_decompile_switch(c: &mut Criterion) {
    let method = switch_method();
    let decompiler = Decompiler::new(DecompilerConfig::sequential());

    c.bench_function("decompile_switch", |b| {
        b.iter(|| {
            let output = decompiler.decompile_method(black_box(&method)).unwrap();
            black_box(output)
        });
    });
}

/// Benchmark a class of 32 methods, sequential against parallel.
fn bench_decompile_class(c: &mut Criterion) {
    let mut class = ClassInfo::new("Lbench/Loops;", AccessFlags::PUBLIC);
    class.methods = (0..32).map(|i| loop_method(&format!("sum{i}"))).collect();

    let sequential = Decompiler::new(DecompilerConfig::sequential());
    c.bench_function("decompile_class_sequential", |b| {
        b.iter(|| black_box(sequential.decompile_class(black_box(&class))));
    });

    let parallel = Decompiler::new(DecompilerConfig::default());
    c.bench_function("decompile_class_parallel", |b| {
        b.iter(|| black_box(parallel.decompile_class(black_box(&class))));
    });
}

criterion_group!(
    benches,
    bench_decompile_loop,
    bench_decompile_switch,
    bench_decompile_class
);
criterion_main!(benches);
