//! Test fixtures and helpers.
//!
//! Pre-built arenas and unit configurations for consistent testing.

use fixed::types::I32F32;
use warband_core::body::Body;
use warband_core::components::{ObjectId, Role, SquadId};
use warband_core::config::EngineConfig;
use warband_core::engine::{rally_point, Engine};
use warband_core::math::TilePos;
use warband_core::memory::UnitMemory;

use crate::arena::Arena;

/// Map used by [`standard_arena`].
pub const MAP_SIZE: (i32, i32) = (100, 100);
/// Own base position in [`standard_arena`].
pub const BASE: TilePos = TilePos::new(10, 10);
/// Enemy base position in [`standard_arena`].
pub const ENEMY_BASE: TilePos = TilePos::new(90, 90);
/// Storage node position in [`standard_arena`].
pub const STORAGE: TilePos = TilePos::new(14, 14);

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Decision code never uses floats; this is only for test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A 100x100 arena: own base at (10, 10) holding 500, enemy base at
/// (90, 90), one storage node with 2000 at (14, 14).
#[must_use]
pub fn standard_arena() -> Arena {
    let mut arena = Arena::new(MAP_SIZE, BASE, 500).with_enemy_base(ENEMY_BASE);
    arena.add_storage(STORAGE, 2000);
    arena
}

/// Rally point the engine computes for [`standard_arena`] with default
/// config.
#[must_use]
pub fn standard_rally() -> TilePos {
    rally_point(BASE, MAP_SIZE, EngineConfig::default().rally_offset)
}

/// Memory of a tier-1 unit of `role`.
#[must_use]
pub fn stamped(role: Role, serial: u64) -> UnitMemory {
    UnitMemory::stamped(role, 1, format!("{}-0-{serial}", role.tag()))
}

/// Add a tier-1 own unit of `role` with stamped memory.
pub fn spawn_role(arena: &mut Arena, role: Role, position: TilePos) -> ObjectId {
    let serial = arena.own_unit_ids().len() as u64;
    arena.add_own_unit(position, Body::for_role(role, 1), &stamped(role, serial))
}

/// Add a committed squad of `role`: one unit per position, the first one
/// leading.
pub fn spawn_squad(arena: &mut Arena, role: Role, squad: SquadId, positions: &[TilePos]) -> Vec<ObjectId> {
    positions
        .iter()
        .enumerate()
        .map(|(index, &position)| {
            let mut memory = stamped(role, index as u64);
            memory.join_squad(squad);
            if index == 0 {
                memory.promote();
            }
            arena.add_own_unit(position, Body::for_role(role, 1), &memory)
        })
        .collect()
}

/// Bind an engine to `arena`.
///
/// # Panics
///
/// Panics if the engine refuses the arena or the config.
#[must_use]
pub fn engine_for(arena: Arena, config: EngineConfig) -> Engine<Arena> {
    Engine::new(arena, config).expect("arena has an own base")
}

/// Advance the engine and then the world, `ticks` times.
pub fn run_ticks(engine: &mut Engine<Arena>, ticks: u64) -> Vec<u64> {
    (0..ticks)
        .map(|_| {
            let report = engine.advance();
            engine.host_mut().step();
            report.digest
        })
        .collect()
}
