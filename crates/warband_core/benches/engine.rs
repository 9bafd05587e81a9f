//! Engine benchmarks for warband_core.
//!
//! Run with: `cargo bench -p warband_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use warband_core::body::{Body, PartKind};
use warband_core::components::Role;
use warband_core::config::{EngineConfig, RoleWeights};
use warband_core::math::{Fixed, TilePos};
use warband_core::snapshot::{Target, TargetKind};
use warband_core::targeting::weighted_priority;
use warband_test_utils::arena::{Arena, Side};
use warband_test_utils::fixtures::{engine_for, spawn_role, standard_arena};

/// Eight harvesters, sixteen ranged soldiers and a dozen raiders.
fn populated_arena() -> Arena {
    let mut arena = standard_arena();
    for i in 0..8 {
        spawn_role(&mut arena, Role::Harvester, TilePos::new(12 + i % 4, 15 + i / 4));
    }
    for i in 0..16 {
        spawn_role(&mut arena, Role::RangedAttacker, TilePos::new(5 + i % 4, 5 + i / 4));
    }
    for i in 0..12 {
        arena.add_unit(
            Side::Enemy,
            TilePos::new(30 + i % 6, 30 + i / 6),
            Body::new(vec![PartKind::Move, PartKind::Attack, PartKind::Heal]),
        );
    }
    arena
}

fn benchmark_advance(c: &mut Criterion) {
    let arena = populated_arena();
    let config = EngineConfig::default();

    c.bench_function("engine_advance_36_units", |b| {
        b.iter_batched(
            || engine_for(arena.clone(), config.clone()),
            |mut engine| black_box(engine.advance()),
            BatchSize::SmallInput,
        );
    });
}

fn benchmark_weighted_priority(c: &mut Criterion) {
    let kinds = [
        TargetKind::ProductionFacility,
        TargetKind::Healer,
        TargetKind::Worker,
        TargetKind::Attacker,
        TargetKind::Other,
    ];
    let targets: Vec<Target> = (0..200u64)
        .map(|id| Target {
            id,
            position: TilePos::new((id * 7 % 100) as i32, (id * 13 % 100) as i32),
            kind: kinds[(id % 5) as usize],
        })
        .collect();
    let weights = RoleWeights::default();
    let distance_weight = Fixed::from_num(0.5);

    c.bench_function("weighted_priority_200_targets", |b| {
        b.iter(|| {
            black_box(weighted_priority(
                black_box(TilePos::new(50, 50)),
                &targets,
                &weights,
                distance_weight,
            ))
        });
    });
}

criterion_group!(benches, benchmark_advance, benchmark_weighted_priority);
criterion_main!(benches);
