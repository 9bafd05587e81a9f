//! Per-unit state machine and role dispatch.
//!
//! Every living, fully produced unit gets exactly one turn per tick. A turn
//! commits at most one primary action (attack, ranged attack, withdraw,
//! transfer or movement). Heals and the step after a hit run on separate host
//! pipelines and never replace the primary decision.
//!
//! Soldier state is re-derived every tick:
//!
//! 1. squad membership forces [`BehaviorState::Attacking`];
//! 2. an enemy within the detection radius also means `Attacking`;
//! 3. otherwise a unit at the rally point is `Guarding`, any other unit is
//!    `Gathering`.

use serde::{Deserialize, Serialize};

use crate::combat::{support_heal, CombatKit};
use crate::components::{BehaviorState, ObjectId, Role};
use crate::config::EngineConfig;
use crate::economy;
use crate::error::ActionError;
use crate::host::ActionApi;
use crate::math::TilePos;
use crate::memory::{MemoryLedger, UnitMemory};
use crate::snapshot::{UnitView, WorldSnapshot};
use crate::squad::SquadCoordinator;
use crate::targeting::{nearest_by_path, PathCost};

/// Primary action committed during a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Nothing to do.
    Idle,
    /// Deliberately stayed in place.
    Hold,
    /// Moved one step toward a tile.
    Move {
        /// Destination.
        to: TilePos,
    },
    /// Melee attack.
    Attack {
        /// Target id.
        target: ObjectId,
    },
    /// Ranged attack.
    RangedAttack {
        /// Target id.
        target: ObjectId,
    },
    /// Withdrew resource.
    Withdraw {
        /// Storage node id.
        source: ObjectId,
    },
    /// Delivered resource.
    Transfer {
        /// Receiving structure id.
        destination: ObjectId,
    },
}

/// An action together with the failure it ran into, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// The action committed or attempted.
    pub action: Action,
    /// Failure, already recovered from locally.
    pub error: Option<ActionError>,
}

impl Attempt {
    /// A successfully committed action.
    #[must_use]
    pub const fn done(action: Action) -> Self {
        Self {
            action,
            error: None,
        }
    }

    /// An attempted action that failed.
    #[must_use]
    pub const fn failed(action: Action, error: ActionError) -> Self {
        Self {
            action,
            error: Some(error),
        }
    }
}

/// Everything a unit may read during its turn.
#[derive(Clone, Copy)]
pub struct TurnContext<'a> {
    /// The tick-start snapshot.
    pub snapshot: &'a WorldSnapshot,
    /// Engine tuning.
    pub config: &'a EngineConfig,
    /// Where soldiers gather.
    pub rally: TilePos,
    /// Travel cost metric.
    pub path: &'a dyn PathCost,
}

/// Summary of one unit's turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Acting unit.
    pub unit: ObjectId,
    /// Role the unit acted as.
    pub role: Role,
    /// State after the turn, for soldiers.
    pub state: Option<BehaviorState>,
    /// Primary action.
    pub action: Action,
    /// Contained failure.
    pub error: Option<ActionError>,
}

/// Decide a soldier's state for this tick.
#[must_use]
pub fn next_state(unit: &UnitView, memory: &UnitMemory, ctx: &TurnContext<'_>) -> BehaviorState {
    if memory.crippled {
        return BehaviorState::Gathering;
    }
    if memory.squad().is_some() {
        return BehaviorState::Attacking;
    }
    if ctx
        .snapshot
        .enemy_within(unit.position, ctx.config.detection_radius)
    {
        return BehaviorState::Attacking;
    }
    if unit.position.in_range_of(ctx.rally, ctx.config.rally_radius) {
        BehaviorState::Guarding
    } else {
        BehaviorState::Gathering
    }
}

/// Memory a unit starts its turn with: its own staged write from earlier in
/// this tick, else the committed record.
#[must_use]
pub fn current_memory<'a>(unit: &'a UnitView, ledger: &'a MemoryLedger) -> &'a UnitMemory {
    ledger.get(unit.id).unwrap_or(&unit.memory)
}

/// Run one unit's turn.
pub fn dispatch(
    unit: &UnitView,
    ctx: &TurnContext<'_>,
    squads: &mut SquadCoordinator,
    api: &mut dyn ActionApi,
    ledger: &mut MemoryLedger,
) -> Turn {
    let before = current_memory(unit, ledger).clone();
    let mut memory = before.clone();
    let role = unit.effective_role();

    let (state, attempt) = match role {
        Role::Harvester => (None, economy::harvest(unit, ctx, api)),
        Role::Attacker | Role::RangedAttacker => match CombatKit::for_role(role) {
            Some(kit) => {
                let (state, attempt) = soldier_turn(unit, kit, ctx, squads, api, ledger, &mut memory);
                (Some(state), attempt)
            }
            None => (None, Attempt::done(Action::Idle)),
        },
        Role::Generic => (None, Attempt::done(Action::Idle)),
    };

    if memory != before {
        ledger.stage(unit.id, memory);
    }

    tracing::trace!(unit = unit.id, ?role, ?state, action = ?attempt.action, "turn");
    Turn {
        unit: unit.id,
        role,
        state,
        action: attempt.action,
        error: attempt.error,
    }
}

fn soldier_turn(
    unit: &UnitView,
    kit: &CombatKit,
    ctx: &TurnContext<'_>,
    squads: &mut SquadCoordinator,
    api: &mut dyn ActionApi,
    ledger: &mut MemoryLedger,
    memory: &mut UnitMemory,
) -> (BehaviorState, Attempt) {
    (kit.pre_action)(unit, api);

    if memory.crippled {
        if let Some(squad) = memory.squad() {
            squads.discharge(squad, unit.id);
            memory.leave_squad();
        }
    }

    let state = next_state(unit, memory, ctx);
    memory.state = state;

    let attempt = match state {
        BehaviorState::Gathering => gather(unit, ctx, api),
        BehaviorState::Attacking if memory.squad().is_some() => {
            squads.take_turn(unit, kit, ctx, api, ledger, memory)
        }
        BehaviorState::Attacking => attack_alone(unit, kit, ctx, api, memory),
        BehaviorState::Guarding => guard(unit, kit, ctx, api, memory),
    };
    (state, attempt)
}

/// Travel to the rally point, healing on the way.
pub fn gather(unit: &UnitView, ctx: &TurnContext<'_>, api: &mut dyn ActionApi) -> Attempt {
    support_heal(unit, ctx, api);
    if unit.position == ctx.rally {
        return Attempt::done(Action::Hold);
    }
    api.move_toward(unit.id, ctx.rally);
    Attempt::done(Action::Move { to: ctx.rally })
}

fn attack_alone(
    unit: &UnitView,
    kit: &CombatKit,
    ctx: &TurnContext<'_>,
    api: &mut dyn ActionApi,
    memory: &mut UnitMemory,
) -> Attempt {
    let target = nearest_by_path(
        unit.position,
        &ctx.snapshot.targets,
        |target| target.position,
        ctx.path,
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

fn guard(
    unit: &UnitView,
    kit: &CombatKit,
    ctx: &TurnContext<'_>,
    api: &mut dyn ActionApi,
    memory: &mut UnitMemory,
) -> Attempt {
    let intruder = ctx
        .snapshot
        .nearest_enemy_unit(unit.position)
        .filter(|enemy| unit.position.in_range_of(enemy.position, ctx.config.guard_radius))
        .and_then(|enemy| ctx.snapshot.target(enemy.id));

    match intruder {
        Some(target) => {
            memory.target = Some(target.id);
            (kit.strike)(unit, target, ctx, api, memory)
        }
        None => {
            memory.target = None;
            support_heal(unit, ctx, api);
            Attempt::done(Action::Hold)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, PartKind};
    use crate::components::{SquadId, Store};
    use crate::host::{OutcomeCode, UnitRecord};
    use crate::math::Direction;
    use crate::targeting::ChebyshevRange;

    /// Records every call and answers with a fixed attack outcome.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        attack_outcome: Option<OutcomeCode>,
    }

    impl ActionApi for Recorder {
        fn move_toward(&mut self, unit: ObjectId, to: TilePos) -> OutcomeCode {
            self.calls.push(format!("move {unit} {},{}", to.x, to.y));
            OutcomeCode::Ok
        }
        fn step(&mut self, unit: ObjectId, direction: Direction) -> OutcomeCode {
            self.calls.push(format!("step {unit} {direction:?}"));
            OutcomeCode::Ok
        }
        fn attack(&mut self, unit: ObjectId, target: ObjectId) -> OutcomeCode {
            self.calls.push(format!("attack {unit} {target}"));
            self.attack_outcome.unwrap_or(OutcomeCode::Ok)
        }
        fn ranged_attack(&mut self, unit: ObjectId, target: ObjectId) -> OutcomeCode {
            self.calls.push(format!("ranged {unit} {target}"));
            self.attack_outcome.unwrap_or(OutcomeCode::Ok)
        }
        fn heal(&mut self, unit: ObjectId, target: ObjectId) -> OutcomeCode {
            self.calls.push(format!("heal {unit} {target}"));
            OutcomeCode::Ok
        }
        fn ranged_heal(&mut self, unit: ObjectId, target: ObjectId) -> OutcomeCode {
            self.calls.push(format!("ranged_heal {unit} {target}"));
            OutcomeCode::Ok
        }
        fn withdraw(&mut self, _unit: ObjectId, _source: ObjectId) -> OutcomeCode {
            OutcomeCode::Ok
        }
        fn transfer(&mut self, _unit: ObjectId, _destination: ObjectId) -> OutcomeCode {
            OutcomeCode::Ok
        }
        fn produce(&mut self, _body: &Body, _name: &str) -> Result<ObjectId, OutcomeCode> {
            Err(OutcomeCode::Other)
        }
    }

    fn ranged(id: ObjectId, x: i32, y: i32) -> UnitView {
        UnitView {
            id,
            position: TilePos::new(x, y),
            hits: 100,
            hits_max: 100,
            body: Body::new(vec![PartKind::Move, PartKind::RangedAttack, PartKind::Heal]),
            cargo: Store::default(),
            spawning: false,
            memory: UnitMemory::stamped(Role::RangedAttacker, 1, "ranged-0-0"),
        }
    }

    fn enemy(id: ObjectId, x: i32, y: i32) -> UnitRecord {
        UnitRecord {
            id,
            position: TilePos::new(x, y),
            hits: 100,
            hits_max: 100,
            body: Body::new(vec![PartKind::Move, PartKind::Attack]),
            cargo: Store::default(),
            spawning: false,
        }
    }

    fn snapshot(own: Vec<UnitView>, enemies: Vec<UnitRecord>) -> WorldSnapshot {
        WorldSnapshot {
            tick: 1,
            map_size: (100, 100),
            own_units: own,
            enemy_units: enemies.clone(),
            targets: enemies
                .iter()
                .map(|e| crate::snapshot::Target {
                    id: e.id,
                    position: e.position,
                    kind: crate::snapshot::TargetKind::Attacker,
                })
                .collect(),
            ..WorldSnapshot::default()
        }
    }

    fn context<'a>(snapshot: &'a WorldSnapshot, config: &'a EngineConfig) -> TurnContext<'a> {
        TurnContext {
            snapshot,
            config,
            rally: TilePos::new(10, 10),
            path: &ChebyshevRange,
        }
    }

    fn run(unit: &UnitView, snapshot: &WorldSnapshot, api: &mut Recorder, ledger: &mut MemoryLedger) -> Turn {
        let config = EngineConfig::default();
        let ctx = context(snapshot, &config);
        let mut squads = SquadCoordinator::from_snapshot(snapshot);
        dispatch(unit, &ctx, &mut squads, api, ledger)
    }

    #[test]
    fn test_state_transitions() {
        let config = EngineConfig::default();
        let far = snapshot(vec![], vec![enemy(50, 40, 40)]);
        let near = snapshot(vec![], vec![enemy(50, 12, 12)]);

        let away = ranged(1, 30, 30);
        assert_eq!(next_state(&away, &away.memory, &context(&far, &config)), BehaviorState::Gathering);

        let at_rally = ranged(1, 11, 10);
        assert_eq!(next_state(&at_rally, &at_rally.memory, &context(&far, &config)), BehaviorState::Guarding);
        assert_eq!(next_state(&at_rally, &at_rally.memory, &context(&near, &config)), BehaviorState::Attacking);

        let mut in_squad = away.memory.clone();
        in_squad.join_squad(SquadId(1));
        assert_eq!(next_state(&away, &in_squad, &context(&far, &config)), BehaviorState::Attacking);

        in_squad.crippled = true;
        assert_eq!(next_state(&away, &in_squad, &context(&near, &config)), BehaviorState::Gathering);
    }

    #[test]
    fn test_gathering_moves_to_rally_and_stages_state() {
        let unit = ranged(1, 30, 30);
        let snap = snapshot(vec![unit.clone()], vec![]);
        let mut api = Recorder::default();
        let mut ledger = MemoryLedger::new();

        let turn = run(&unit, &snap, &mut api, &mut ledger);
        assert_eq!(turn.state, Some(BehaviorState::Gathering));
        assert_eq!(turn.action, Action::Move { to: TilePos::new(10, 10) });
        assert_eq!(api.calls, vec!["move 1 10,10".to_string()]);
        // Gathering is the default state, so nothing changed.
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_missing_capability_cripples_unit() {
        let unit = ranged(1, 5, 5);
        let snap = snapshot(vec![unit.clone()], vec![enemy(50, 6, 6)]);
        let mut api = Recorder {
            attack_outcome: Some(OutcomeCode::MissingCapability),
            ..Recorder::default()
        };
        let mut ledger = MemoryLedger::new();

        let turn = run(&unit, &snap, &mut api, &mut ledger);
        assert_eq!(turn.error, Some(ActionError::Capability));
        assert!(ledger.get(1).unwrap().crippled);

        // Next turn the unit retreats without attacking.
        api.calls.clear();
        let turn = run(&unit, &snap, &mut api, &mut ledger);
        assert_eq!(turn.state, Some(BehaviorState::Gathering));
        assert!(api.calls.iter().all(|call| !call.starts_with("ranged ")));
    }

    #[test]
    fn test_invalid_target_clears_stored_target() {
        let unit = ranged(1, 5, 5);
        let snap = snapshot(vec![unit.clone()], vec![enemy(50, 6, 6)]);
        let mut api = Recorder {
            attack_outcome: Some(OutcomeCode::InvalidTarget),
            ..Recorder::default()
        };
        let mut ledger = MemoryLedger::new();

        let turn = run(&unit, &snap, &mut api, &mut ledger);
        assert_eq!(turn.error, Some(ActionError::InvalidTarget));
        assert_eq!(ledger.get(1).unwrap().target, None);
    }

    #[test]
    fn test_ranged_hit_steps_away() {
        let unit = ranged(1, 5, 5);
        let snap = snapshot(vec![unit.clone()], vec![enemy(50, 6, 5)]);
        let mut api = Recorder::default();
        let mut ledger = MemoryLedger::new();

        let turn = run(&unit, &snap, &mut api, &mut ledger);
        assert_eq!(turn.action, Action::RangedAttack { target: 50 });
        assert_eq!(api.calls, vec!["ranged 1 50".to_string(), "step 1 Left".to_string()]);
        assert_eq!(ledger.get(1).unwrap().target, Some(50));
    }

    #[test]
    fn test_ranged_hit_at_full_range_still_steps_away() {
        let unit = ranged(1, 5, 5);
        let snap = snapshot(vec![unit.clone()], vec![enemy(50, 8, 5)]);
        let mut api = Recorder::default();
        let mut ledger = MemoryLedger::new();

        let turn = run(&unit, &snap, &mut api, &mut ledger);
        assert_eq!(turn.action, Action::RangedAttack { target: 50 });
        assert_eq!(api.calls, vec!["ranged 1 50".to_string(), "step 1 Left".to_string()]);
    }

    #[test]
    fn test_crippled_unit_leaves_its_squad() {
        let mut unit = ranged(1, 30, 30);
        unit.memory.join_squad(SquadId(4));
        unit.memory.promote();
        unit.memory.crippled = true;
        let snap = snapshot(vec![unit.clone()], vec![]);
        let mut api = Recorder::default();
        let mut ledger = MemoryLedger::new();

        let turn = run(&unit, &snap, &mut api, &mut ledger);
        assert_eq!(turn.state, Some(BehaviorState::Gathering));
        let memory = ledger.get(1).unwrap();
        assert_eq!(memory.squad(), None);
        assert!(!memory.is_leader());
    }

    #[test]
    fn test_turn_with_error_encodes() {
        let turn = Turn {
            unit: 3,
            role: Role::RangedAttacker,
            state: Some(BehaviorState::Attacking),
            action: Action::RangedAttack { target: 9 },
            error: Some(ActionError::InvalidTarget),
        };
        let blob = bincode::serialize(&turn).unwrap();
        assert_eq!(bincode::deserialize::<Turn>(&blob).unwrap(), turn);
    }
}
