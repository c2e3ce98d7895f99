//! Benchmarks for structure recovery.
//!
//! Measures the full pipeline on synthesized procedures with growing loop
//! chains, plus the VMA-interval-set operations every scope mutation leans
//! on.

extern crate binscope;

use binscope::prelude::*;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// Synthesizes a procedure containing `loops` sequential counted loops,
/// each a header block plus a conditional latch, with full line info.
fn sequential_loops(loops: u32) -> (ProcedureRecord, Vec<Instruction>, MapResolver) {
    let mut instrs = Vec::new();
    let mut resolver = MapResolver::new();
    let mut vma = 0x1000u64;
    let mut line = 10u32;
    for _ in 0..loops {
        let header = vma;
        instrs.push(Instruction::simple(header, 4));
        resolver.insert_full(header, "bench", "bench.c", line);
        vma += 4;
        instrs.push(Instruction::branch(vma, 4, BranchKind::CondRelative, header));
        resolver.insert_full(vma, "bench", "bench.c", line + 1);
        vma += 4;
        line += 10;
    }
    instrs.push(Instruction::ret(vma, 4));
    resolver.insert_full(vma, "bench", "bench.c", line);
    vma += 4;
    let record = ProcedureRecord {
        name: "bench".into(),
        link_name: "bench".into(),
        file_name: Some("bench.c".into()),
        begin_vma: 0x1000,
        end_vma: vma,
        begin_line: 10,
    };
    (record, instrs, resolver)
}

fn bench_build_and_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_and_normalize");
    for loops in [8u32, 64, 256] {
        let (record, instrs, resolver) = sequential_loops(loops);
        let config = StructureConfig::default();
        group.bench_function(format!("loops_{loops}"), |b| {
            b.iter(|| {
                let tree = build_and_normalize(
                    black_box(&config),
                    black_box(&resolver),
                    "bench.out",
                    &[(record.clone(), instrs.clone())],
                )
                .unwrap();
                black_box(tree)
            });
        });
    }
    group.finish();
}

fn bench_vma_interval_set(c: &mut Criterion) {
    c.bench_function("vma_set_insert_erase", |b| {
        b.iter(|| {
            let mut set = VmaIntervalSet::new();
            for i in 0..256u64 {
                set.insert(i * 16, i * 16 + 8);
            }
            for i in 0..128u64 {
                set.erase(i * 32 + 2, i * 32 + 6);
            }
            black_box(set)
        });
    });
}

criterion_group!(benches, bench_build_and_normalize, bench_vma_interval_set);
criterion_main!(benches);
