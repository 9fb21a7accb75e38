//! Simulation benchmarks for voxelscape_core.
//!
//! Run with: `cargo bench -p voxelscape_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use voxelscape_core::config::SimConfig;
use voxelscape_core::math::{Fixed, Vec2Fixed};
use voxelscape_core::progression::{level_for_xp, max_hit_for_level};
use voxelscape_core::simulation::Simulation;

/// Level arithmetic runs on every XP change and every tick.
pub fn progression_benchmark(c: &mut Criterion) {
    c.bench_function("level_for_xp", |b| {
        let xp = Fixed::from_num(123_456);
        b.iter(|| level_for_xp(black_box(xp)));
    });

    c.bench_function("max_hit_for_level", |b| {
        b.iter(|| max_hit_for_level(black_box(57)));
    });
}

/// One engaged combat tick, including the respawn sweep.
pub fn combat_tick_benchmark(c: &mut Criterion) {
    c.bench_function("combat_tick_engaged", |b| {
        b.iter_batched(
            || {
                let mut sim = Simulation::with_seed(SimConfig::default(), 42).expect("default config is valid");
                let session = sim.session_mut();
                session.player_mut().position = Vec2Fixed::from_ints(5, -4);
                session.issue_attack(1);
                sim
            },
            |mut sim| black_box(sim.combat_tick()),
            BatchSize::SmallInput,
        );
    });

    c.bench_function("advance_one_minute", |b| {
        b.iter_batched(
            || {
                let mut sim = Simulation::with_seed(SimConfig::default(), 42).expect("default config is valid");
                sim.session_mut().issue_attack(2);
                sim
            },
            |mut sim| {
                sim.advance(60_000);
                black_box(sim.state_hash())
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, progression_benchmark, combat_tick_benchmark);
criterion_main!(benches);
