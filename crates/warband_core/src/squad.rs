//! Squad coordination.
//!
//! Squads are not stored anywhere. A squad is the set of living units whose
//! memory carries the same [`SquadId`]; all coordination happens through
//! those memory fields.
//!
//! Two views exist during a tick:
//!
//! - The [`SquadBoard`] is the squad state as of the end of the previous tick,
//!   built once from the snapshot. Followers read their leader's target only
//!   from the board, so the order in which units act never matters.
//! - The in-tick roster tracks structural changes made during this tick
//!   (disband, rejoin, recruit, form, election). Every change is also staged
//!   in the [`MemoryLedger`] and committed at the end of the tick.
//!
//! # Election
//!
//! Each member checks its squad's roster when it takes its turn. With no
//! living leader it promotes itself; with several (only after corrupt state)
//! the lowest id keeps the flag. Promotions land in the roster immediately, so
//! a squad gets at most one new leader per tick.

use std::collections::{BTreeMap, BTreeSet};

use crate::behavior::{current_memory, gather, Action, Attempt, TurnContext};
use crate::combat::CombatKit;
use crate::components::{ObjectId, Role, SquadId};
use crate::host::ActionApi;
use crate::math::TilePos;
use crate::memory::{MemoryLedger, UnitMemory};
use crate::snapshot::{UnitView, WorldSnapshot};
use crate::targeting::weighted_priority;

/// A squad member as committed at the end of the previous tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    /// Unit id.
    pub id: ObjectId,
    /// Position at tick start.
    pub position: TilePos,
    /// Leader flag.
    pub leader: bool,
    /// Stored target.
    pub target: Option<ObjectId>,
}

/// One squad as committed at the end of the previous tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquadView {
    /// Squad id.
    pub id: SquadId,
    /// Role shared by the members.
    pub role: Role,
    /// Living members, sorted by id.
    pub members: Vec<Member>,
}

impl SquadView {
    /// The committed leader. With several flagged members the lowest id wins.
    #[must_use]
    pub fn leader(&self) -> Option<&Member> {
        self.members.iter().find(|member| member.leader)
    }

    /// Target the leader stored last tick.
    #[must_use]
    pub fn leader_target(&self) -> Option<ObjectId> {
        self.leader().and_then(|leader| leader.target)
    }
}

/// Squad state as of last tick.
#[derive(Debug, Clone, Default)]
pub struct SquadBoard {
    squads: BTreeMap<SquadId, SquadView>,
}

impl SquadBoard {
    /// Group the snapshot's units by committed squad id.
    #[must_use]
    pub fn from_snapshot(snapshot: &WorldSnapshot) -> Self {
        let mut squads: BTreeMap<SquadId, SquadView> = BTreeMap::new();
        for unit in &snapshot.own_units {
            let Some(id) = unit.memory.squad() else {
                continue;
            };
            let view = squads.entry(id).or_insert_with(|| SquadView {
                id,
                role: unit.memory.role,
                members: Vec::new(),
            });
            view.members.push(Member {
                id: unit.id,
                position: unit.position,
                leader: unit.memory.is_leader(),
                target: unit.memory.target,
            });
        }
        Self { squads }
    }

    /// Look up a squad.
    #[must_use]
    pub fn get(&self, id: SquadId) -> Option<&SquadView> {
        self.squads.get(&id)
    }

    /// All squads in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SquadView> {
        self.squads.values()
    }

    /// Number of squads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.squads.len()
    }

    /// Check if there are no squads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.squads.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Roster {
    role: Role,
    members: Vec<ObjectId>,
    leaders: Vec<ObjectId>,
}

impl Roster {
    fn add(&mut self, unit: ObjectId) {
        if let Err(index) = self.members.binary_search(&unit) {
            self.members.insert(index, unit);
        }
    }
}

/// Structural changes made by [`SquadCoordinator::prepare`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Readiness {
    /// Squads created this tick.
    pub formed: Vec<SquadId>,
    /// Squads dissolved this tick.
    pub disbanded: Vec<SquadId>,
    /// Roles that have a live squad after this tick's changes.
    pub active_roles: BTreeSet<Role>,
}

/// Owns the board and the in-tick roster for one tick.
#[derive(Debug, Clone, Default)]
pub struct SquadCoordinator {
    board: SquadBoard,
    roster: BTreeMap<SquadId, Roster>,
}

impl SquadCoordinator {
    /// Build the board and seed the roster from the snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &WorldSnapshot) -> Self {
        let board = SquadBoard::from_snapshot(snapshot);
        let mut roster: BTreeMap<SquadId, Roster> = board
            .iter()
            .map(|view| {
                let members = view.members.iter().map(|m| m.id).collect();
                let leaders = view.members.iter().filter(|m| m.leader).map(|m| m.id).collect();
                (
                    view.id,
                    Roster {
                        role: view.role,
                        members,
                        leaders,
                    },
                )
            })
            .collect();

        Self { board, roster }
    }

    /// The last-tick board.
    #[must_use]
    pub const fn board(&self) -> &SquadBoard {
        &self.board
    }

    /// Current members of a squad, including this tick's changes.
    #[must_use]
    pub fn members(&self, squad: SquadId) -> &[ObjectId] {
        self.roster
            .get(&squad)
            .map_or(&[][..], |entry| entry.members.as_slice())
    }

    /// Current leader of a squad, including this tick's elections.
    #[must_use]
    pub fn leader_of(&self, squad: SquadId) -> Option<ObjectId> {
        self.roster
            .get(&squad)
            .and_then(|entry| entry.leaders.first().copied())
    }

    /// Number of leader flags currently held in each squad.
    pub fn leader_counts(&self) -> impl Iterator<Item = (SquadId, usize)> + '_ {
        self.roster.iter().map(|(id, entry)| (*id, entry.leaders.len()))
    }

    /// Roles with at least one live squad.
    #[must_use]
    pub fn active_roles(&self) -> BTreeSet<Role> {
        self.roster
            .values()
            .filter(|entry| !entry.members.is_empty())
            .map(|entry| entry.role)
            .collect()
    }

    /// Run readiness for this tick: release departed records, disband weak
    /// squads (with optional rejoin), recruit, then form new squads.
    pub fn prepare(&mut self, ctx: &TurnContext<'_>, ledger: &mut MemoryLedger) -> Readiness {
        let snapshot = ctx.snapshot;
        let config = ctx.config;
        let mut readiness = Readiness::default();

        release_departed(snapshot, ledger);

        let weak: Vec<SquadId> = self
            .roster
            .iter()
            .filter(|(_, entry)| entry.members.len() < config.squad_min)
            .map(|(id, _)| *id)
            .collect();
        let mut released = Vec::new();
        for squad in weak {
            if let Some(units) = self.disband(squad, snapshot, ledger) {
                readiness.disbanded.push(squad);
                released.extend(units);
            }
        }
        if config.rejoin_after_disband {
            for unit in released {
                self.rejoin(unit, ctx, ledger);
            }
        }

        self.recruit(ctx, ledger);

        let mut seq: u16 = 0;
        for &role in &config.squad_roles {
            if let Some(squad) = self.form(role, seq, ctx, ledger) {
                readiness.formed.push(squad);
                seq = seq.saturating_add(1);
            }
        }

        readiness.active_roles = self.active_roles();
        readiness
    }

    /// Dissolve a squad, clearing squad id and leader flag on every member.
    ///
    /// Returns the released units, or `None` when the squad is unknown or was
    /// already disbanded. Calling it twice is harmless.
    pub fn disband(
        &mut self,
        squad: SquadId,
        snapshot: &WorldSnapshot,
        ledger: &mut MemoryLedger,
    ) -> Option<Vec<ObjectId>> {
        let entry = self.roster.remove(&squad)?;
        for &unit in &entry.members {
            restage(snapshot, ledger, unit, UnitMemory::leave_squad);
        }
        tracing::info!(%squad, members = entry.members.len(), "squad disbanded");
        Some(entry.members)
    }

    fn anchor(&self, squad: SquadId, snapshot: &WorldSnapshot) -> Option<TilePos> {
        let entry = self.roster.get(&squad)?;
        let anchor = entry.leaders.first().or_else(|| entry.members.first())?;
        snapshot.unit(*anchor).map(|unit| unit.position)
    }

    fn rejoin(&mut self, unit: ObjectId, ctx: &TurnContext<'_>, ledger: &mut MemoryLedger) {
        let Some(view) = ctx.snapshot.unit(unit) else {
            return;
        };
        let role = view.memory.role;
        let capacity = ctx.config.squad_capacity;

        let mut best: Option<(SquadId, u32)> = None;
        for (id, entry) in &self.roster {
            if entry.role != role || entry.members.len() >= capacity {
                continue;
            }
            let Some(anchor) = self.anchor(*id, ctx.snapshot) else {
                continue;
            };
            let range = view.position.range_to(anchor);
            if best.map_or(true, |(_, nearest)| range < nearest) {
                best = Some((*id, range));
            }
        }

        if let Some((squad, _)) = best {
            self.enlist(squad, unit, ctx.snapshot, ledger);
            tracing::debug!(unit, %squad, "rejoined squad after disband");
        }
    }

    fn recruit(&mut self, ctx: &TurnContext<'_>, ledger: &mut MemoryLedger) {
        let threshold = ctx.config.squad_threshold;
        let squads: Vec<SquadId> = self.roster.keys().copied().collect();

        for squad in squads {
            let Some(entry) = self.roster.get(&squad) else {
                continue;
            };
            let wanted = threshold.saturating_sub(entry.members.len());
            if wanted == 0 {
                continue;
            }
            let role = entry.role;
            let Some(anchor) = self.anchor(squad, ctx.snapshot) else {
                continue;
            };

            let mut candidates: Vec<(u32, ObjectId)> = ctx
                .snapshot
                .own_units
                .iter()
                .filter(|unit| is_available(unit, role, ledger))
                .map(|unit| (unit.position.range_to(anchor), unit.id))
                .filter(|(range, _)| *range <= ctx.config.recruit_range)
                .collect();
            candidates.sort_unstable();

            for (_, unit) in candidates.into_iter().take(wanted) {
                self.enlist(squad, unit, ctx.snapshot, ledger);
                tracing::debug!(unit, %squad, "recruited into squad");
            }
        }
    }

    fn form(
        &mut self,
        role: Role,
        seq: u16,
        ctx: &TurnContext<'_>,
        ledger: &mut MemoryLedger,
    ) -> Option<SquadId> {
        let gathered: Vec<ObjectId> = ctx
            .snapshot
            .own_units
            .iter()
            .filter(|unit| is_available(unit, role, ledger))
            .filter(|unit| unit.position.in_range_of(ctx.rally, ctx.config.rally_radius))
            .map(|unit| unit.id)
            .collect();

        if gathered.len() < ctx.config.squad_threshold {
            return None;
        }

        let squad = SquadId::generate(ctx.snapshot.tick, seq);
        self.roster.insert(
            squad,
            Roster {
                role,
                members: Vec::with_capacity(gathered.len()),
                leaders: Vec::new(),
            },
        );
        for &unit in &gathered {
            self.enlist(squad, unit, ctx.snapshot, ledger);
        }
        tracing::info!(%squad, ?role, members = gathered.len(), "squad formed");
        Some(squad)
    }

    fn enlist(
        &mut self,
        squad: SquadId,
        unit: ObjectId,
        snapshot: &WorldSnapshot,
        ledger: &mut MemoryLedger,
    ) {
        if let Some(entry) = self.roster.get_mut(&squad) {
            entry.add(unit);
            restage(snapshot, ledger, unit, |memory| memory.join_squad(squad));
        }
    }

    /// Settle the leader question for `unit`'s squad and report whether
    /// `unit` leads it. `memory` is the unit's working copy.
    pub fn elect(
        &mut self,
        unit: &UnitView,
        memory: &mut UnitMemory,
        snapshot: &WorldSnapshot,
        ledger: &mut MemoryLedger,
    ) -> bool {
        let Some(squad) = memory.squad() else {
            return false;
        };
        let entry = self.roster.entry(squad).or_insert_with(|| Roster {
            role: memory.role,
            members: vec![unit.id],
            leaders: Vec::new(),
        });

        if entry.leaders.len() > 1 {
            tracing::warn!(%squad, leaders = ?entry.leaders, "several leaders, keeping lowest id");
            for &extra in &entry.leaders[1..] {
                if extra != unit.id {
                    restage(snapshot, ledger, extra, UnitMemory::demote);
                }
            }
            entry.leaders.truncate(1);
        }

        if entry.leaders.is_empty() {
            tracing::debug!(unit = unit.id, %squad, "self-elected as leader");
            entry.leaders.push(unit.id);
        }

        let leads = entry.leaders.first() == Some(&unit.id);
        if leads {
            memory.promote();
        } else {
            memory.demote();
        }
        leads
    }

    /// Take a squad member's attacking turn.
    pub fn take_turn(
        &mut self,
        unit: &UnitView,
        kit: &CombatKit,
        ctx: &TurnContext<'_>,
        api: &mut dyn ActionApi,
        ledger: &mut MemoryLedger,
        memory: &mut UnitMemory,
    ) -> Attempt {
        let Some(squad) = memory.squad() else {
            return gather(unit, ctx, api);
        };
        let attempt = if self.elect(unit, memory, ctx.snapshot, ledger) {
            lead(unit, kit, ctx, api, memory)
        } else {
            self.follow(squad, unit, kit, ctx, api, memory)
        };
        if memory.crippled {
            self.discharge(squad, unit.id);
            memory.leave_squad();
        }
        attempt
    }

    /// Drop a unit from a squad's in-tick roster, leader flag included.
    ///
    /// A squad left without a leader elects one from the next member to act.
    pub fn discharge(&mut self, squad: SquadId, unit: ObjectId) {
        if let Some(entry) = self.roster.get_mut(&squad) {
            entry.members.retain(|&member| member != unit);
            let was_leader = entry.leaders.contains(&unit);
            entry.leaders.retain(|&leader| leader != unit);
            tracing::info!(unit, %squad, was_leader, "crippled unit left squad");
        }
    }

    fn follow(
        &self,
        squad: SquadId,
        unit: &UnitView,
        kit: &CombatKit,
        ctx: &TurnContext<'_>,
        api: &mut dyn ActionApi,
        memory: &mut UnitMemory,
    ) -> Attempt {
        let shared = self
            .board
            .get(squad)
            .and_then(SquadView::leader_target)
            .and_then(|id| ctx.snapshot.target(id))
            .filter(|target| unit.position.in_range_of(target.position, ctx.config.follow_range));

        if let Some(target) = shared {
            memory.target = Some(target.id);
            return (kit.strike)(unit, target, ctx, api, memory);
        }

        memory.target = None;
        let leader = self
            .leader_of(squad)
            .and_then(|id| ctx.snapshot.unit(id))
            .map(|leader| leader.position);
        match leader {
            Some(position) if position != unit.position => {
                api.move_toward(unit.id, position);
                Attempt::done(Action::Move { to: position })
            }
            Some(_) => Attempt::done(Action::Hold),
            None => gather(unit, ctx, api),
        }
    }
}

fn lead(
    unit: &UnitView,
    kit: &CombatKit,
    ctx: &TurnContext<'_>,
    api: &mut dyn ActionApi,
    memory: &mut UnitMemory,
) -> Attempt {
    let target = weighted_priority(
        unit.position,
        &ctx.snapshot.targets,
        &ctx.config.role_weights,
        ctx.config.distance_weight,
    );
    match target {
        Some(target) => {
            memory.target = Some(target.id);
            (kit.strike)(unit, target, ctx, api, memory)
        }
        None => {
            memory.target = None;
            gather(unit, ctx, api)
        }
    }
}

/// Check if a unit can be enlisted into a squad of `role` right now.
fn is_available(unit: &UnitView, role: Role, ledger: &MemoryLedger) -> bool {
    if unit.spawning || unit.memory.role != role {
        return false;
    }
    let memory = current_memory(unit, ledger);
    memory.is_idle() && !memory.crippled
}

/// Apply `change` to a live unit's latest memory and stage the result.
fn restage(
    snapshot: &WorldSnapshot,
    ledger: &mut MemoryLedger,
    unit: ObjectId,
    change: impl FnOnce(&mut UnitMemory),
) {
    let latest = ledger
        .get(unit)
        .cloned()
        .or_else(|| snapshot.unit(unit).map(|view| view.memory.clone()));
    if let Some(mut memory) = latest {
        change(&mut memory);
        ledger.stage(unit, memory);
    }
}

/// Drop the records of units that no longer exist.
fn release_departed(snapshot: &WorldSnapshot, ledger: &mut MemoryLedger) {
    for &unit in &snapshot.departed {
        ledger.retire(unit);
        tracing::debug!(unit, "retired record of departed unit");
    }
}
