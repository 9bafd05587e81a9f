//! Role capability kits.
//!
//! Soldier roles differ only in two functions: a pre-action hook run before
//! any decision and the strike used to engage a target. A [`CombatKit`] is a
//! static table of the two, looked up by role.

use crate::behavior::{Action, Attempt, TurnContext};
use crate::body::PartKind;
use crate::components::Role;
use crate::error::ActionError;
use crate::host::ActionApi;
use crate::memory::UnitMemory;
use crate::snapshot::{Target, TargetKind, UnitView};

/// Reach of melee attacks and direct heals.
pub const MELEE_RANGE: u32 = 1;
/// Reach of ranged attacks and ranged heals.
pub const RANGED_RANGE: u32 = 3;

/// Hook run at the start of a soldier's turn.
pub type PreAction = fn(&UnitView, &mut dyn ActionApi);

/// Engage `target` and report the primary action taken.
pub type Strike = fn(&UnitView, &Target, &TurnContext<'_>, &mut dyn ActionApi, &mut UnitMemory) -> Attempt;

/// Capabilities of one soldier role.
#[derive(Clone, Copy)]
pub struct CombatKit {
    /// Runs before the state machine decides.
    pub pre_action: PreAction,
    /// Engages a target.
    pub strike: Strike,
}

impl std::fmt::Debug for CombatKit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatKit").finish_non_exhaustive()
    }
}

/// Melee fighter: heals itself below half hits, prefers adjacent enemies.
pub static MELEE: CombatKit = CombatKit {
    pre_action: heal_self_below_half,
    strike: melee_strike,
};

/// Ranged fighter: heals itself whenever damaged, kites after hitting.
pub static RANGED: CombatKit = CombatKit {
    pre_action: heal_self_when_damaged,
    strike: ranged_strike,
};

impl CombatKit {
    /// Kit for a role, `None` for roles that do not fight.
    #[must_use]
    pub fn for_role(role: Role) -> Option<&'static Self> {
        match role {
            Role::Attacker => Some(&MELEE),
            Role::RangedAttacker => Some(&RANGED),
            Role::Harvester | Role::Generic => None,
        }
    }
}

fn heal_self_below_half(unit: &UnitView, api: &mut dyn ActionApi) {
    if unit.hits < unit.hits_max / 2 && unit.body.has(PartKind::Heal) {
        let code = api.heal(unit.id, unit.id);
        tracing::trace!(unit = unit.id, ?code, "self heal");
    }
}

fn heal_self_when_damaged(unit: &UnitView, api: &mut dyn ActionApi) {
    if unit.is_wounded() && unit.body.has(PartKind::Heal) {
        let code = api.heal(unit.id, unit.id);
        tracing::trace!(unit = unit.id, ?code, "self heal");
    }
}

/// Heal self if damaged, otherwise the nearest wounded ally in reach.
///
/// Heals run on their own host pipeline and never replace the primary action.
pub fn support_heal(unit: &UnitView, ctx: &TurnContext<'_>, api: &mut dyn ActionApi) {
    if !unit.body.has(PartKind::Heal) {
        return;
    }
    if unit.is_wounded() {
        api.heal(unit.id, unit.id);
        return;
    }
    let Some(ally) = ctx.snapshot.nearest_wounded(unit.position, unit.id) else {
        return;
    };
    let range = unit.position.range_to(ally.position);
    if range <= MELEE_RANGE {
        api.heal(unit.id, ally.id);
    } else if range <= RANGED_RANGE {
        api.ranged_heal(unit.id, ally.id);
    }
}

fn melee_strike(
    unit: &UnitView,
    target: &Target,
    ctx: &TurnContext<'_>,
    api: &mut dyn ActionApi,
    memory: &mut UnitMemory,
) -> Attempt {
    let adjacent = ctx.snapshot.targets.iter().find(|candidate| {
        candidate.kind != TargetKind::ProductionFacility
            && unit.position.in_range_of(candidate.position, MELEE_RANGE)
    });
    let target = adjacent.unwrap_or(target);

    let code = api.attack(unit.id, target.id);
    match code.into_result() {
        Ok(()) => {
            api.move_toward(unit.id, target.position);
            Attempt::done(Action::Attack { target: target.id })
        }
        Err(ActionError::Range) => {
            api.move_toward(unit.id, target.position);
            support_heal(unit, ctx, api);
            Attempt::done(Action::Move {
                to: target.position,
            })
        }
        Err(error) => recover(unit, target, error, ctx, api, memory, Action::Attack { target: target.id }),
    }
}

fn ranged_strike(
    unit: &UnitView,
    target: &Target,
    ctx: &TurnContext<'_>,
    api: &mut dyn ActionApi,
    memory: &mut UnitMemory,
) -> Attempt {
    let code = api.ranged_attack(unit.id, target.id);
    match code.into_result() {
        Ok(()) => {
            if let Some(direction) = unit.position.direction_away_from(target.position) {
                api.step(unit.id, direction);
            }
            Attempt::done(Action::RangedAttack { target: target.id })
        }
        Err(ActionError::Range) => {
            api.move_toward(unit.id, target.position);
            support_heal(unit, ctx, api);
            Attempt::done(Action::Move {
                to: target.position,
            })
        }
        Err(error) => recover(
            unit,
            target,
            error,
            ctx,
            api,
            memory,
            Action::RangedAttack { target: target.id },
        ),
    }
}

/// Unit-local recovery shared by both strikes.
fn recover(
    unit: &UnitView,
    target: &Target,
    error: ActionError,
    ctx: &TurnContext<'_>,
    api: &mut dyn ActionApi,
    memory: &mut UnitMemory,
    attempted: Action,
) -> Attempt {
    match error {
        ActionError::Capability => {
            tracing::info!(unit = unit.id, "missing capability, retreating for good");
            memory.crippled = true;
            memory.target = None;
            api.move_toward(unit.id, ctx.rally);
            Attempt::failed(Action::Move { to: ctx.rally }, error)
        }
        ActionError::InvalidTarget => {
            tracing::debug!(unit = unit.id, target = target.id, "clearing stale target");
            if memory.target == Some(target.id) {
                memory.target = None;
            }
            Attempt::failed(attempted, error)
        }
        ActionError::Unknown => {
            tracing::warn!(unit = unit.id, target = target.id, "unrecognized attack outcome");
            Attempt::failed(attempted, error)
        }
        ActionError::Range | ActionError::Resource | ActionError::Capacity => {
            tracing::debug!(unit = unit.id, %error, "attack not possible this tick");
            Attempt::failed(attempted, error)
        }
    }
}
