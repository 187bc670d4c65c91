// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use std::collections::VecDeque;

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion,
};
use weft_vm::arch::Word;
use weft_vm::vm::Machine;

/// Decrements a counter cell until it reaches zero, two instructions per
/// iteration.
fn countdown(iterations: Word) -> Vec<Word> {
    vec![1001, 9, -1, 9, 1005, 9, 0, 99, 0, iterations]
}

fn bench_countdown(c: &mut Criterion) {
    let mut group = c.benchmark_group("countdown");
    for &iterations in &[10 as Word, 100, 1_000, 10_000] {
        let program = countdown(iterations);
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            &program,
            |b, program| {
                b.iter(|| {
                    let mut machine =
                        Machine::new(program, VecDeque::new(), Vec::new());
                    machine.run().expect("countdown halts");
                    black_box(machine.memory().len());
                });
            },
        );
    }
    group.finish();
}

fn bench_straight_line_arithmetic(c: &mut Criterion) {
    let program = [1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50];
    c.bench_function("straight_line_arithmetic", |b| {
        b.iter(|| {
            let mut machine =
                Machine::new(&program, VecDeque::new(), Vec::new());
            machine.run().expect("program halts");
            black_box(machine.memory().get(0).unwrap());
        });
    });
}

criterion_group!(benches, bench_countdown, bench_straight_line_arithmetic);
criterion_main!(benches);
