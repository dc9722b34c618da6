//! Engine benchmarks for mud_core.
//!
//! Run with: `cargo bench -p mud_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use mud_core::effects::{Effect, EffectList, JoinMode};
use mud_core::prelude::{EffectFlag, SpellId};
use mud_test_utils::fixtures::skirmish;

/// Pulse throughput on a busy world.
pub fn pulse_benchmark(c: &mut Criterion) {
    c.bench_function("pulse_skirmish_8_rooms", |b| {
        b.iter_batched(
            || skirmish(3, 8),
            |mut engine| {
                for _ in 0..100 {
                    black_box(engine.pulse());
                }
            },
            BatchSize::SmallInput,
        );
    });
}

/// Effect list churn: apply, join and sweep.
pub fn effect_list_benchmark(c: &mut Criterion) {
    c.bench_function("effect_list_apply_sweep", |b| {
        b.iter(|| {
            let mut list = EffectList::new();
            for n in 0..32u16 {
                let effect = Effect::new(SpellId(10 + n % 8), 5 + i32::from(n % 4))
                    .with_flag(EffectFlag::ALL[usize::from(n) % EffectFlag::ALL.len()]);
                let _ = list.apply(effect, JoinMode::REFRESH);
            }
            while !list.is_empty() {
                black_box(list.sweep());
            }
        });
    });
}

/// Snapshot cost.
pub fn snapshot_benchmark(c: &mut Criterion) {
    let mut engine = skirmish(3, 8);
    engine.advance(200);
    c.bench_function("snapshot_skirmish_8_rooms", |b| {
        b.iter(|| black_box(engine.snapshot()));
    });
}

criterion_group!(benches, pulse_benchmark, effect_list_benchmark, snapshot_benchmark);
criterion_main!(benches);
