//! Read-only per-tick view of the world.
//!
//! A [`WorldSnapshot`] is captured once at the start of every tick and never
//! mutated. It decodes every own unit's memory as committed by the previous
//! tick and memoizes the lists every unit needs (attack candidates, wounded
//! allies), so per-unit decisions do not rebuild them.

use crate::body::{Body, PartKind};
use crate::components::{ObjectId, Role, Store};
use crate::error::EngineError;
use crate::host::{BaseRecord, MemoryStore, Observation, StructureRecord, UnitRecord, WorldQuery};
use crate::math::TilePos;
use crate::memory::UnitMemory;

/// Classification of an attack candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// The enemy production facility.
    ProductionFacility,
    /// A unit with a heal part.
    Healer,
    /// A unit with cargo or work parts.
    Worker,
    /// A unit with attack or ranged attack parts.
    Attacker,
    /// Anything else.
    Other,
}

impl TargetKind {
    /// Classify an enemy unit by its body.
    ///
    /// Healers outrank attackers, attackers outrank workers.
    #[must_use]
    pub fn classify(body: &Body) -> Self {
        if body.has(PartKind::Heal) {
            Self::Healer
        } else if body.can_fight() {
            Self::Attacker
        } else if body.has(PartKind::Carry) || body.has(PartKind::Work) {
            Self::Worker
        } else {
            Self::Other
        }
    }
}

/// A visible enemy object that can be attacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Object id.
    pub id: ObjectId,
    /// Current tile.
    pub position: TilePos,
    /// Classification used for weighting.
    pub kind: TargetKind,
}

/// One of our units together with its committed memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitView {
    /// Host-assigned id.
    pub id: ObjectId,
    /// Current tile.
    pub position: TilePos,
    /// Current hit points.
    pub hits: u32,
    /// Maximum hit points.
    pub hits_max: u32,
    /// Equipment.
    pub body: Body,
    /// Carried resource.
    pub cargo: Store,
    /// Whether the unit is still being produced.
    pub spawning: bool,
    /// Memory as committed by the previous tick.
    pub memory: UnitMemory,
}

impl UnitView {
    fn from_record(record: UnitRecord, memory: UnitMemory) -> Self {
        Self {
            id: record.id,
            position: record.position,
            hits: record.hits,
            hits_max: record.hits_max,
            body: record.body,
            cargo: record.cargo,
            spawning: record.spawning,
            memory,
        }
    }

    /// Check if the unit has lost hit points.
    #[must_use]
    pub const fn is_wounded(&self) -> bool {
        self.hits < self.hits_max
    }

    /// Role the unit acts as: the stamped role, or one inferred from the body
    /// when nothing was stamped.
    #[must_use]
    pub fn effective_role(&self) -> Role {
        match self.memory.role {
            Role::Generic => self.body.inferred_role(),
            role => role,
        }
    }
}

/// Immutable view of the world for one tick.
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    /// Host tick this snapshot was taken at.
    pub tick: u64,
    /// Map width and height.
    pub map_size: (i32, i32),
    /// Living own units, sorted by id.
    pub own_units: Vec<UnitView>,
    /// Living visible enemy units.
    pub enemy_units: Vec<UnitRecord>,
    /// Our base.
    pub own_base: Option<BaseRecord>,
    /// The enemy base.
    pub enemy_base: Option<StructureRecord>,
    /// Storage nodes.
    pub storages: Vec<StructureRecord>,
    /// Attack candidates: the enemy base first, then enemy units in host order.
    pub targets: Vec<Target>,
    /// Ids of own units below max hits.
    pub wounded: Vec<ObjectId>,
    /// Ids holding a memory record whose unit is no longer present.
    pub departed: Vec<ObjectId>,
    /// Blobs that failed to decode this tick.
    pub decode_failures: Vec<EngineError>,
}

impl WorldSnapshot {
    /// Observe the host and decode committed memory.
    pub fn capture<H: WorldQuery + MemoryStore + ?Sized>(host: &H) -> Self {
        let observation = host.observe();
        let mut decode_failures = Vec::new();

        let mut read_memory = |id: ObjectId| -> UnitMemory {
            match host.read(id) {
                Some(blob) => UnitMemory::decode(id, &blob).unwrap_or_else(|err| {
                    tracing::warn!(unit = id, error = %err, "resetting undecodable memory");
                    decode_failures.push(err);
                    UnitMemory::default()
                }),
                None => UnitMemory::default(),
            }
        };

        let mut own_units: Vec<UnitView> = Vec::with_capacity(observation.own_units.len());
        for record in observation.own_units {
            if record.hits == 0 {
                continue;
            }
            let memory = read_memory(record.id);
            own_units.push(UnitView::from_record(record, memory));
        }
        own_units.sort_by_key(|unit| unit.id);

        let departed = host
            .ids()
            .into_iter()
            .filter(|id| own_units.binary_search_by_key(id, |unit| unit.id).is_err())
            .collect();

        Self::assemble(
            observation.tick,
            observation.map_size,
            own_units,
            observation.enemy_units,
            observation.own_base,
            observation.enemy_base,
            observation.storages,
            departed,
            decode_failures,
        )
    }

    /// Build a snapshot from an observation whose memories are already
    /// decoded. Used where no memory store is involved.
    #[must_use]
    pub fn from_parts(observation: Observation, memories: &[(ObjectId, UnitMemory)]) -> Self {
        let mut own_units: Vec<UnitView> = observation
            .own_units
            .into_iter()
            .filter(|record| record.hits > 0)
            .map(|record| {
                let memory = memories
                    .iter()
                    .find(|(id, _)| *id == record.id)
                    .map(|(_, memory)| memory.clone())
                    .unwrap_or_default();
                UnitView::from_record(record, memory)
            })
            .collect();
        own_units.sort_by_key(|unit| unit.id);

        Self::assemble(
            observation.tick,
            observation.map_size,
            own_units,
            observation.enemy_units,
            observation.own_base,
            observation.enemy_base,
            observation.storages,
            Vec::new(),
            Vec::new(),
        )
    }

    fn assemble(
        tick: u64,
        map_size: (i32, i32),
        own_units: Vec<UnitView>,
        enemy_units: Vec<UnitRecord>,
        own_base: Option<BaseRecord>,
        enemy_base: Option<StructureRecord>,
        storages: Vec<StructureRecord>,
        departed: Vec<ObjectId>,
        decode_failures: Vec<EngineError>,
    ) -> Self {
        let enemy_units: Vec<UnitRecord> = enemy_units
            .into_iter()
            .filter(|record| record.hits > 0)
            .collect();

        let mut targets = Vec::with_capacity(enemy_units.len() + 1);
        if let Some(base) = enemy_base {
            targets.push(Target {
                id: base.id,
                position: base.position,
                kind: TargetKind::ProductionFacility,
            });
        }
        targets.extend(enemy_units.iter().map(|enemy| Target {
            id: enemy.id,
            position: enemy.position,
            kind: TargetKind::classify(&enemy.body),
        }));

        let wounded = own_units
            .iter()
            .filter(|unit| unit.is_wounded())
            .map(|unit| unit.id)
            .collect();

        Self {
            tick,
            map_size,
            own_units,
            enemy_units,
            own_base,
            enemy_base,
            storages,
            targets,
            wounded,
            departed,
            decode_failures,
        }
    }

    /// Look up one of our units.
    #[must_use]
    pub fn unit(&self, id: ObjectId) -> Option<&UnitView> {
        self.own_units
            .binary_search_by_key(&id, |unit| unit.id)
            .ok()
            .map(|index| &self.own_units[index])
    }

    /// Look up an attack candidate.
    #[must_use]
    pub fn target(&self, id: ObjectId) -> Option<&Target> {
        self.targets.iter().find(|target| target.id == id)
    }

    /// Check whether any enemy unit lies within `range` of `from`.
    #[must_use]
    pub fn enemy_within(&self, from: TilePos, range: u32) -> bool {
        self.enemy_units
            .iter()
            .any(|enemy| from.in_range_of(enemy.position, range))
    }

    /// Nearest enemy unit by range, ties by host order.
    #[must_use]
    pub fn nearest_enemy_unit(&self, from: TilePos) -> Option<&UnitRecord> {
        self.enemy_units
            .iter()
            .min_by_key(|enemy| from.range_to(enemy.position))
    }

    /// Whether the enemy still has anything we could fight.
    #[must_use]
    pub fn has_enemies(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Nearest wounded own unit other than `exclude`, by range.
    #[must_use]
    pub fn nearest_wounded(&self, from: TilePos, exclude: ObjectId) -> Option<&UnitView> {
        self.wounded
            .iter()
            .filter(|&&id| id != exclude)
            .filter_map(|&id| self.unit(id))
            .min_by_key(|unit| from.range_to(unit.position))
    }

    /// Storage nodes that still hold resource.
    pub fn stocked_storages(&self) -> impl Iterator<Item = &StructureRecord> {
        self.storages.iter().filter(|storage| !storage.store.is_empty())
    }

    /// Living, fully produced units of a role (by stamped role).
    pub fn units_with_role(&self, role: Role) -> impl Iterator<Item = &UnitView> {
        self.own_units
            .iter()
            .filter(move |unit| unit.memory.role == role && !unit.spawning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::PartKind::{Attack, Carry, Heal, Move, RangedAttack};

    fn record(id: ObjectId, x: i32, y: i32, parts: Vec<PartKind>, hits: u32) -> UnitRecord {
        UnitRecord {
            id,
            position: TilePos::new(x, y),
            hits,
            hits_max: 100,
            body: Body::new(parts),
            cargo: Store::default(),
            spawning: false,
        }
    }

    fn observation() -> Observation {
        Observation {
            tick: 12,
            map_size: (100, 100),
            own_units: vec![
                record(3, 0, 0, vec![Move, Carry], 100),
                record(1, 1, 1, vec![Move, Attack], 40),
                record(2, 2, 2, vec![Move, Attack], 0),
            ],
            enemy_units: vec![
                record(10, 5, 5, vec![Move, Heal], 100),
                record(11, 9, 9, vec![Move, RangedAttack], 100),
                record(12, 9, 9, vec![Move, Carry], 0),
            ],
            own_base: None,
            enemy_base: Some(StructureRecord {
                id: 99,
                position: TilePos::new(50, 50),
                store: Store::default(),
            }),
            storages: Vec::new(),
        }
    }

    #[test]
    fn test_dead_units_are_dropped_and_sorted() {
        let snapshot = WorldSnapshot::from_parts(observation(), &[]);
        let ids: Vec<_> = snapshot.own_units.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(snapshot.unit(2).is_none());
        assert_eq!(snapshot.enemy_units.len(), 2);
    }

    #[test]
    fn test_targets_put_enemy_base_first() {
        let snapshot = WorldSnapshot::from_parts(observation(), &[]);
        let kinds: Vec<_> = snapshot.targets.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TargetKind::ProductionFacility,
                TargetKind::Healer,
                TargetKind::Attacker
            ]
        );
        assert!(snapshot.target(12).is_none());
    }

    #[test]
    fn test_wounded_and_lookups() {
        let snapshot = WorldSnapshot::from_parts(observation(), &[]);
        assert_eq!(snapshot.wounded, vec![1]);
        assert!(snapshot.nearest_wounded(TilePos::new(0, 0), 1).is_none());
        assert_eq!(snapshot.nearest_wounded(TilePos::new(0, 0), 3).map(|u| u.id), Some(1));
        assert!(snapshot.enemy_within(TilePos::new(2, 2), 3));
        assert!(!snapshot.enemy_within(TilePos::new(0, 0), 3));
    }

    #[test]
    fn test_effective_role_falls_back_to_body() {
        let memories = [(1, UnitMemory::stamped(Role::Attacker, 1, "a"))];
        let snapshot = WorldSnapshot::from_parts(observation(), &memories);
        assert_eq!(snapshot.unit(1).unwrap().effective_role(), Role::Attacker);
        assert_eq!(snapshot.unit(3).unwrap().effective_role(), Role::Harvester);
        assert_eq!(snapshot.unit(3).unwrap().memory.role, Role::Generic);
    }
}
