//! In-memory host for engine tests.
//!
//! [`Arena`] implements every host trait over plain collections. It resolves
//! actions with simple, fixed rules so that tests can predict the world
//! after each [`Arena::step`]:
//!
//! | Action | Reach | Effect |
//! |---|---|---|
//! | attack | 1 | 30 damage per attack part |
//! | ranged attack | 3 | 10 damage per ranged part |
//! | heal | 1 | 12 hits per heal part |
//! | ranged heal | 3 | 4 hits per heal part |
//! | withdraw / transfer | 1 | moves as much resource as fits |
//!
//! Damage and healing are applied at the next [`Arena::step`], after which
//! units at zero hits disappear. The enemy base falls after 3000 damage.
//! Movement and resource transfers happen immediately. Enemy units never act
//! on their own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use warband_core::body::{Body, PartKind};
use warband_core::components::{ObjectId, Store};
use warband_core::host::{
    ActionApi, BaseRecord, MemoryStore, Observation, OutcomeCode, StructureRecord, UnitRecord,
    WorldQuery,
};
use warband_core::math::{Direction, TilePos};
use warband_core::memory::UnitMemory;

/// Id of the own base.
pub const OWN_BASE_ID: ObjectId = 1;
/// Id of the enemy base.
pub const ENEMY_BASE_ID: ObjectId = 2;

const FIRST_STORAGE_ID: ObjectId = 10;
const FIRST_UNIT_ID: ObjectId = 100;
const HITS_PER_PART: u32 = 100;
const CARRY_PER_PART: u32 = 50;
const BASE_CAPACITY: u32 = 10_000;
const ENEMY_BASE_HITS: i64 = 3_000;

/// Which side a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// Controlled by the engine.
    Own,
    /// Hostile.
    Enemy,
}

/// One recorded host call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    /// `move_toward`
    Move(ObjectId, TilePos),
    /// `step`
    Step(ObjectId, Direction),
    /// `attack`
    Attack(ObjectId, ObjectId),
    /// `ranged_attack`
    RangedAttack(ObjectId, ObjectId),
    /// `heal`
    Heal(ObjectId, ObjectId),
    /// `ranged_heal`
    RangedHeal(ObjectId, ObjectId),
    /// `withdraw`
    Withdraw(ObjectId, ObjectId),
    /// `transfer`
    Transfer(ObjectId, ObjectId),
    /// `produce`
    Produce(String),
}

#[derive(Debug, Clone)]
struct ArenaUnit {
    record: UnitRecord,
    side: Side,
}

#[derive(Debug, Clone, Copy)]
struct Build {
    unit: ObjectId,
    ticks_left: u32,
}

/// In-memory world implementing [`WorldQuery`], [`ActionApi`] and
/// [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct Arena {
    tick: u64,
    map_size: (i32, i32),
    next_storage: ObjectId,
    next_unit: ObjectId,
    units: BTreeMap<ObjectId, ArenaUnit>,
    own_base: StructureRecord,
    enemy_base: Option<StructureRecord>,
    storages: BTreeMap<ObjectId, StructureRecord>,
    memory: BTreeMap<ObjectId, Vec<u8>>,
    pending: BTreeMap<ObjectId, i64>,
    enemy_base_hits: i64,
    build: Option<Build>,
    ticks_per_part: u32,
    calls: Vec<Call>,
}

impl Arena {
    /// Create an arena with an own base holding `stored` resource.
    #[must_use]
    pub fn new(map_size: (i32, i32), base: TilePos, stored: u32) -> Self {
        Self {
            tick: 0,
            map_size,
            next_storage: FIRST_STORAGE_ID,
            next_unit: FIRST_UNIT_ID,
            units: BTreeMap::new(),
            own_base: StructureRecord {
                id: OWN_BASE_ID,
                position: base,
                store: Store::new(stored, BASE_CAPACITY),
            },
            enemy_base: None,
            storages: BTreeMap::new(),
            memory: BTreeMap::new(),
            pending: BTreeMap::new(),
            enemy_base_hits: ENEMY_BASE_HITS,
            build: None,
            ticks_per_part: 3,
            calls: Vec::new(),
        }
    }

    /// Place the enemy base.
    #[must_use]
    pub fn with_enemy_base(mut self, position: TilePos) -> Self {
        self.enemy_base = Some(StructureRecord {
            id: ENEMY_BASE_ID,
            position,
            store: Store::default(),
        });
        self
    }

    /// Set how many ticks each body part takes to produce.
    #[must_use]
    pub fn with_ticks_per_part(mut self, ticks: u32) -> Self {
        self.ticks_per_part = ticks;
        self
    }

    /// Add a storage node holding `amount`.
    pub fn add_storage(&mut self, position: TilePos, amount: u32) -> ObjectId {
        let id = self.next_storage;
        self.next_storage += 1;
        self.storages.insert(
            id,
            StructureRecord {
                id,
                position,
                store: Store::new(amount, amount.max(1)),
            },
        );
        id
    }

    /// Add a fully produced unit with no memory.
    pub fn add_unit(&mut self, side: Side, position: TilePos, body: Body) -> ObjectId {
        let id = self.next_unit;
        self.next_unit += 1;
        let hits_max = HITS_PER_PART * u32::try_from(body.len()).unwrap_or(u32::MAX / HITS_PER_PART);
        let capacity = CARRY_PER_PART * u32::try_from(body.count(PartKind::Carry)).unwrap_or(0);
        self.units.insert(
            id,
            ArenaUnit {
                record: UnitRecord {
                    id,
                    position,
                    hits: hits_max,
                    hits_max,
                    body,
                    cargo: Store::new(0, capacity),
                    spawning: false,
                },
                side,
            },
        );
        id
    }

    /// Add an own unit and commit `memory` for it.
    ///
    /// # Panics
    ///
    /// Panics if the memory cannot be encoded.
    pub fn add_own_unit(&mut self, position: TilePos, body: Body, memory: &UnitMemory) -> ObjectId {
        let id = self.add_unit(Side::Own, position, body);
        self.set_memory(id, memory);
        id
    }

    /// Overwrite the committed memory of a unit.
    ///
    /// # Panics
    ///
    /// Panics if the memory cannot be encoded.
    pub fn set_memory(&mut self, unit: ObjectId, memory: &UnitMemory) {
        let blob = memory.encode(unit).expect("memory encodes");
        self.memory.insert(unit, blob);
    }

    /// Store a raw blob for a unit.
    pub fn set_raw_memory(&mut self, unit: ObjectId, blob: Vec<u8>) {
        self.memory.insert(unit, blob);
    }

    /// Decoded committed memory of a unit.
    #[must_use]
    pub fn memory_of(&self, unit: ObjectId) -> Option<UnitMemory> {
        self.memory
            .get(&unit)
            .and_then(|blob| UnitMemory::decode(unit, blob).ok())
    }

    /// Remove a unit without notice. Its memory blob stays until the engine
    /// retires it.
    pub fn kill(&mut self, unit: ObjectId) {
        self.units.remove(&unit);
        self.pending.remove(&unit);
    }

    /// Set a unit's hit points directly.
    pub fn set_hits(&mut self, unit: ObjectId, hits: u32) {
        if let Some(entry) = self.units.get_mut(&unit) {
            entry.record.hits = hits.min(entry.record.hits_max);
        }
    }

    /// Set a unit's carried resource directly.
    pub fn set_cargo(&mut self, unit: ObjectId, used: u32) {
        if let Some(entry) = self.units.get_mut(&unit) {
            entry.record.cargo.used = used.min(entry.record.cargo.capacity);
        }
    }

    /// Set the resource held by the own base.
    pub fn set_base_store(&mut self, used: u32) {
        self.own_base.store.used = used.min(self.own_base.store.capacity);
    }

    /// Set the own base's capacity.
    pub fn set_base_capacity(&mut self, capacity: u32) {
        self.own_base.store.capacity = capacity;
        self.own_base.store.used = self.own_base.store.used.min(capacity);
    }

    /// Current tick.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// The own base.
    #[must_use]
    pub const fn own_base(&self) -> &StructureRecord {
        &self.own_base
    }

    /// Whether the own base is producing.
    #[must_use]
    pub const fn is_producing(&self) -> bool {
        self.build.is_some()
    }

    /// A unit of either side.
    #[must_use]
    pub fn unit(&self, id: ObjectId) -> Option<&UnitRecord> {
        self.units.get(&id).map(|entry| &entry.record)
    }

    /// A storage node.
    #[must_use]
    pub fn storage(&self, id: ObjectId) -> Option<&StructureRecord> {
        self.storages.get(&id)
    }

    /// Ids of living own units.
    #[must_use]
    pub fn own_unit_ids(&self) -> Vec<ObjectId> {
        self.units
            .values()
            .filter(|entry| entry.side == Side::Own)
            .map(|entry| entry.record.id)
            .collect()
    }

    /// Calls recorded since the last [`Arena::take_calls`].
    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Drain the recorded calls.
    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    /// Advance the world by one tick: apply queued damage and healing,
    /// remove dead units and progress production.
    pub fn step(&mut self) {
        for (id, delta) in std::mem::take(&mut self.pending) {
            if id == ENEMY_BASE_ID {
                self.enemy_base_hits = self.enemy_base_hits.saturating_add(delta);
                if self.enemy_base_hits <= 0 {
                    self.enemy_base = None;
                }
                continue;
            }
            if let Some(entry) = self.units.get_mut(&id) {
                let hits = i64::from(entry.record.hits) + delta;
                let clamped = hits.clamp(0, i64::from(entry.record.hits_max));
                entry.record.hits = u32::try_from(clamped).unwrap_or(0);
            }
        }
        self.units.retain(|_, entry| entry.record.hits > 0);


        if let Some(mut build) = self.build {
            build.ticks_left = build.ticks_left.saturating_sub(1);
            if build.ticks_left == 0 {
                if let Some(entry) = self.units.get_mut(&build.unit) {
                    entry.record.spawning = false;
                }
                self.build = None;
            } else {
                self.build = Some(build);
            }
        }

        self.tick += 1;
    }

    fn own_unit(&self, id: ObjectId) -> Option<&UnitRecord> {
        self.units
            .get(&id)
            .filter(|entry| entry.side == Side::Own && !entry.record.spawning)
            .map(|entry| &entry.record)
    }

    fn hostile_position(&self, id: ObjectId) -> Option<TilePos> {
        if let Some(base) = self.enemy_base.filter(|base| base.id == id) {
            return Some(base.position);
        }
        self.units
            .get(&id)
            .filter(|entry| entry.side == Side::Enemy)
            .map(|entry| entry.record.position)
    }

    fn strike(&mut self, unit: ObjectId, target: ObjectId, part: PartKind, reach: u32, per_part: u32) -> OutcomeCode {
        let Some(attacker) = self.own_unit(unit) else {
            return OutcomeCode::Other;
        };
        let parts = attacker.body.count(part);
        if parts == 0 {
            return OutcomeCode::MissingCapability;
        }
        let from = attacker.position;
        let Some(position) = self.hostile_position(target) else {
            return OutcomeCode::InvalidTarget;
        };
        if !from.in_range_of(position, reach) {
            return OutcomeCode::NotInRange;
        }
        let damage = i64::from(per_part) * i64::try_from(parts).unwrap_or(0);
        *self.pending.entry(target).or_insert(0) -= damage;
        OutcomeCode::Ok
    }

    fn mend(&mut self, unit: ObjectId, target: ObjectId, reach: u32, per_part: u32) -> OutcomeCode {
        let Some(healer) = self.own_unit(unit) else {
            return OutcomeCode::Other;
        };
        let parts = healer.body.count(PartKind::Heal);
        if parts == 0 {
            return OutcomeCode::MissingCapability;
        }
        let from = healer.position;
        let Some(patient) = self.units.get(&target).filter(|entry| entry.side == Side::Own) else {
            return OutcomeCode::InvalidTarget;
        };
        if !from.in_range_of(patient.record.position, reach) {
            return OutcomeCode::NotInRange;
        }
        let amount = i64::from(per_part) * i64::try_from(parts).unwrap_or(0);
        *self.pending.entry(target).or_insert(0) += amount;
        OutcomeCode::Ok
    }

    fn spawn_tile(&self) -> TilePos {
        let base = self.own_base.position;
        Direction::ALL
            .iter()
            .map(|direction| base.step(*direction))
            .find(|tile| !self.units.values().any(|entry| entry.record.position == *tile))
            .unwrap_or(base)
    }
}

impl WorldQuery for Arena {
    fn observe(&self) -> Observation {
        let (own, enemy): (Vec<_>, Vec<_>) = self
            .units
            .values()
            .partition(|entry| entry.side == Side::Own);
        Observation {
            tick: self.tick,
            map_size: self.map_size,
            own_units: own.into_iter().map(|entry| entry.record.clone()).collect(),
            enemy_units: enemy.into_iter().map(|entry| entry.record.clone()).collect(),
            own_base: Some(BaseRecord {
                structure: self.own_base,
                producing: self.build.is_some(),
            }),
            enemy_base: self.enemy_base,
            storages: self.storages.values().copied().collect(),
        }
    }
}

impl ActionApi for Arena {
    fn move_toward(&mut self, unit: ObjectId, to: TilePos) -> OutcomeCode {
        self.calls.push(Call::Move(unit, to));
        let Some(from) = self.own_unit(unit).map(|record| record.position) else {
            return OutcomeCode::Other;
        };
        if let Some(direction) = from.direction_to(to) {
            if let Some(entry) = self.units.get_mut(&unit) {
                entry.record.position = from.step(direction);
            }
        }
        OutcomeCode::Ok
    }

    fn step(&mut self, unit: ObjectId, direction: Direction) -> OutcomeCode {
        self.calls.push(Call::Step(unit, direction));
        if self.own_unit(unit).is_none() {
            return OutcomeCode::Other;
        }
        if let Some(entry) = self.units.get_mut(&unit) {
            entry.record.position = entry.record.position.step(direction);
        }
        OutcomeCode::Ok
    }

    fn attack(&mut self, unit: ObjectId, target: ObjectId) -> OutcomeCode {
        self.calls.push(Call::Attack(unit, target));
        self.strike(unit, target, PartKind::Attack, 1, 30)
    }

    fn ranged_attack(&mut self, unit: ObjectId, target: ObjectId) -> OutcomeCode {
        self.calls.push(Call::RangedAttack(unit, target));
        self.strike(unit, target, PartKind::RangedAttack, 3, 10)
    }

    fn heal(&mut self, unit: ObjectId, target: ObjectId) -> OutcomeCode {
        self.calls.push(Call::Heal(unit, target));
        self.mend(unit, target, 1, 12)
    }

    fn ranged_heal(&mut self, unit: ObjectId, target: ObjectId) -> OutcomeCode {
        self.calls.push(Call::RangedHeal(unit, target));
        self.mend(unit, target, 3, 4)
    }

    fn withdraw(&mut self, unit: ObjectId, source: ObjectId) -> OutcomeCode {
        self.calls.push(Call::Withdraw(unit, source));
        let Some(record) = self.own_unit(unit) else {
            return OutcomeCode::Other;
        };
        if !record.body.has(PartKind::Carry) {
            return OutcomeCode::MissingCapability;
        }
        let (from, free) = (record.position, record.cargo.free());
        let Some(storage) = self.storages.get_mut(&source) else {
            return OutcomeCode::InvalidTarget;
        };
        if !from.in_range_of(storage.position, 1) {
            return OutcomeCode::NotInRange;
        }
        if storage.store.is_empty() {
            return OutcomeCode::InsufficientResource;
        }
        if free == 0 {
            return OutcomeCode::DestinationFull;
        }
        let amount = free.min(storage.store.used);
        storage.store.used -= amount;
        if let Some(entry) = self.units.get_mut(&unit) {
            entry.record.cargo.used += amount;
        }
        OutcomeCode::Ok
    }

    fn transfer(&mut self, unit: ObjectId, destination: ObjectId) -> OutcomeCode {
        self.calls.push(Call::Transfer(unit, destination));
        let Some(record) = self.own_unit(unit) else {
            return OutcomeCode::Other;
        };
        if destination != self.own_base.id {
            return OutcomeCode::InvalidTarget;
        }
        if !record.position.in_range_of(self.own_base.position, 1) {
            return OutcomeCode::NotInRange;
        }
        let carried = record.cargo.used;
        if carried == 0 {
            return OutcomeCode::InsufficientResource;
        }
        let free = self.own_base.store.free();
        if free == 0 {
            return OutcomeCode::DestinationFull;
        }
        let amount = carried.min(free);
        self.own_base.store.used += amount;
        if let Some(entry) = self.units.get_mut(&unit) {
            entry.record.cargo.used -= amount;
        }
        OutcomeCode::Ok
    }

    fn produce(&mut self, body: &Body, name: &str) -> Result<ObjectId, OutcomeCode> {
        self.calls.push(Call::Produce(name.to_string()));
        if self.build.is_some() {
            return Err(OutcomeCode::Other);
        }
        let cost = body.cost();
        if !self.own_base.store.can_afford(cost) {
            return Err(OutcomeCode::InsufficientResource);
        }
        self.own_base.store.used -= cost;

        let tile = self.spawn_tile();
        let id = self.add_unit(Side::Own, tile, body.clone());
        let parts = u32::try_from(body.len()).unwrap_or(u32::MAX);
        let ticks_left = parts.saturating_mul(self.ticks_per_part).max(1);
        if let Some(entry) = self.units.get_mut(&id) {
            entry.record.spawning = true;
        }
        self.build = Some(Build {
            unit: id,
            ticks_left,
        });
        Ok(id)
    }
}

impl MemoryStore for Arena {
    fn read(&self, unit: ObjectId) -> Option<Vec<u8>> {
        self.memory.get(&unit).cloned()
    }

    fn write(&mut self, unit: ObjectId, blob: Vec<u8>) {
        self.memory.insert(unit, blob);
    }

    fn ids(&self) -> Vec<ObjectId> {
        self.memory.keys().copied().collect()
    }

    fn remove(&mut self, unit: ObjectId) {
        self.memory.remove(&unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warband_core::components::Role;

    #[test]
    fn test_produce_spends_and_spawns() {
        let mut arena = Arena::new((50, 50), TilePos::new(5, 5), 500);
        let body = Body::for_role(Role::Harvester, 1);
        let id = arena.produce(&body, "harvester-0-0").unwrap();

        assert_eq!(arena.own_base().store.used, 350);
        assert!(arena.is_producing());
        assert!(arena.unit(id).unwrap().spawning);
        assert_eq!(arena.produce(&body, "again"), Err(OutcomeCode::Other));

        for _ in 0..9 {
            arena.step();
        }
        assert!(!arena.is_producing());
        assert!(!arena.unit(id).unwrap().spawning);
    }

    #[test]
    fn test_ranged_attack_applies_on_step() {
        let mut arena = Arena::new((50, 50), TilePos::new(5, 5), 0);
        let shooter = arena.add_unit(Side::Own, TilePos::new(10, 10), Body::for_role(Role::RangedAttacker, 1));
        let target = arena.add_unit(Side::Enemy, TilePos::new(12, 12), Body::new(vec![PartKind::Move]));

        assert_eq!(arena.ranged_attack(shooter, target), OutcomeCode::Ok);
        assert_eq!(arena.unit(target).unwrap().hits, 100);
        arena.step();
        assert_eq!(arena.unit(target).unwrap().hits, 90);

        assert_eq!(arena.attack(shooter, target), OutcomeCode::MissingCapability);
        assert_eq!(arena.ranged_attack(shooter, 999), OutcomeCode::InvalidTarget);
    }

    #[test]
    fn test_withdraw_and_transfer() {
        let mut arena = Arena::new((50, 50), TilePos::new(5, 5), 0);
        let storage = arena.add_storage(TilePos::new(6, 6), 500);
        let worker = arena.add_unit(Side::Own, TilePos::new(5, 6), Body::for_role(Role::Harvester, 1));

        assert_eq!(arena.withdraw(worker, storage), OutcomeCode::Ok);
        assert_eq!(arena.unit(worker).unwrap().cargo.used, 50);
        assert_eq!(arena.withdraw(worker, storage), OutcomeCode::DestinationFull);
        assert_eq!(arena.transfer(worker, OWN_BASE_ID), OutcomeCode::Ok);
        assert_eq!(arena.own_base().store.used, 50);
        assert_eq!(arena.transfer(worker, OWN_BASE_ID), OutcomeCode::InsufficientResource);
    }

    #[test]
    fn test_killed_unit_keeps_memory() {
        let mut arena = Arena::new((50, 50), TilePos::new(5, 5), 0);
        let memory = UnitMemory::stamped(Role::Attacker, 1, "attacker-0-0");
        let id = arena.add_own_unit(TilePos::new(7, 7), Body::for_role(Role::Attacker, 1), &memory);
        arena.kill(id);
        assert!(arena.unit(id).is_none());
        assert_eq!(arena.ids(), vec![id]);
        assert_eq!(arena.memory_of(id), Some(memory));
    }
}
